// SPDX-License-Identifier: Apache-2.0
// Copyright (c) 2026 Mcbridge Team

//! Boolean half-space regions

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::error::Result;

/// A cell volume as a boolean combination of surface half-spaces.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum Region {
    Halfspace { surface: u32, positive: bool },
    Intersection(Vec<Region>),
    Union(Vec<Region>),
    Complement(Box<Region>),
}

impl Region {
    /// Half-space from a signed surface id; the sign selects the side.
    pub fn halfspace(signed: i32) -> Self {
        Region::Halfspace {
            surface: signed.unsigned_abs(),
            positive: signed > 0,
        }
    }

    /// Lazy complement: half-spaces flip in place, a double complement
    /// unwraps, anything else gains a complement node.
    pub fn complement(&self) -> Self {
        match self {
            Region::Halfspace { surface, positive } => Region::Halfspace {
                surface: *surface,
                positive: !positive,
            },
            Region::Complement(inner) => (**inner).clone(),
            other => Region::Complement(Box::new(other.clone())),
        }
    }

    /// Structural complement pushed down to the leaves by De Morgan's laws.
    pub fn inverse(&self) -> Self {
        match self {
            Region::Halfspace { surface, positive } => Region::Halfspace {
                surface: *surface,
                positive: !positive,
            },
            Region::Intersection(children) => {
                Region::Union(children.iter().map(Region::inverse).collect())
            }
            Region::Union(children) => {
                Region::Intersection(children.iter().map(Region::inverse).collect())
            }
            Region::Complement(inner) => (**inner).clone(),
        }
    }

    /// Rewrite every leaf through a signed id map. The argument to `map` is
    /// negative for negative half-spaces, and the sign of its result selects
    /// the new side.
    pub fn remapped(&self, map: &impl Fn(i32) -> i32) -> Self {
        match self {
            Region::Halfspace { surface, positive } => {
                let signed = if *positive {
                    *surface as i32
                } else {
                    -(*surface as i32)
                };
                Region::halfspace(map(signed))
            }
            Region::Intersection(children) => {
                Region::Intersection(children.iter().map(|child| child.remapped(map)).collect())
            }
            Region::Union(children) => {
                Region::Union(children.iter().map(|child| child.remapped(map)).collect())
            }
            Region::Complement(inner) => Region::Complement(Box::new(inner.remapped(map))),
        }
    }

    /// Rewrite every leaf surface id through a fallible map, keeping sides.
    pub fn transformed(&self, map: &mut impl FnMut(u32) -> Result<u32>) -> Result<Self> {
        Ok(match self {
            Region::Halfspace { surface, positive } => Region::Halfspace {
                surface: map(*surface)?,
                positive: *positive,
            },
            Region::Intersection(children) => Region::Intersection(
                children
                    .iter()
                    .map(|child| child.transformed(map))
                    .collect::<Result<_>>()?,
            ),
            Region::Union(children) => Region::Union(
                children
                    .iter()
                    .map(|child| child.transformed(map))
                    .collect::<Result<_>>()?,
            ),
            Region::Complement(inner) => Region::Complement(Box::new(inner.transformed(map)?)),
        })
    }

    /// Signed leaves of a region that is one half-space or a single-level
    /// combination of half-spaces. `None` as soon as any nesting appears.
    pub fn flat_halfspaces(&self) -> Option<Vec<(u32, bool)>> {
        match self {
            Region::Halfspace { surface, positive } => Some(vec![(*surface, *positive)]),
            Region::Intersection(children) | Region::Union(children) => children
                .iter()
                .map(|child| match child {
                    Region::Halfspace { surface, positive } => Some((*surface, *positive)),
                    _ => None,
                })
                .collect(),
            Region::Complement(_) => None,
        }
    }

    /// Children of an intersection, or the region itself as a single operand.
    pub fn operands(&self) -> &[Region] {
        match self {
            Region::Intersection(children) => children,
            other => std::slice::from_ref(other),
        }
    }
}

impl fmt::Display for Region {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Region::Halfspace { surface, positive } => {
                write!(f, "{}{}", if *positive { '+' } else { '-' }, surface)
            }
            Region::Intersection(children) => {
                write!(f, "(")?;
                for (i, child) in children.iter().enumerate() {
                    if i > 0 {
                        write!(f, " ")?;
                    }
                    write!(f, "{child}")?;
                }
                write!(f, ")")
            }
            Region::Union(children) => {
                write!(f, "(")?;
                for (i, child) in children.iter().enumerate() {
                    if i > 0 {
                        write!(f, " | ")?;
                    }
                    write!(f, "{child}")?;
                }
                write!(f, ")")
            }
            Region::Complement(inner) => write!(f, "~{inner}"),
        }
    }
}
