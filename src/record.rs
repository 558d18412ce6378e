// SPDX-License-Identifier: Apache-2.0
// Copyright (c) 2026 Mcbridge Team

//! Input records handed over by the deck parser
//!
//! These are plain data carriers: one record per surface or cell card, with
//! card parameters already split out but geometry text left raw. The
//! resolution passes in [`crate::convert`] turn them into model objects.

use ahash::AHashMap;
use nalgebra::{Matrix3, Vector3};
use serde::{Deserialize, Serialize};

/// A surface card: id, mnemonic and raw coefficients.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SurfaceRecord {
    pub id: u32,
    pub mnemonic: String,
    pub coefficients: Vec<f64>,
    /// `*`-prefixed card: the surface is a reflective boundary.
    pub reflective: bool,
    /// `n tr` entry referencing [`ModelRecords::transforms`].
    pub transform: Option<u32>,
}

impl SurfaceRecord {
    pub fn new(id: u32, mnemonic: &str, coefficients: Vec<f64>) -> Self {
        Self {
            id,
            mnemonic: mnemonic.to_string(),
            coefficients,
            reflective: false,
            transform: None,
        }
    }
}

/// A cell card: id, material binding and the raw region expression.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CellRecord {
    pub id: u32,
    /// MCNP material number; `0` marks a void cell.
    pub material: i32,
    /// Card density entry; ignored for void cells.
    pub density: f64,
    /// Region expression exactly as written on the card.
    pub region: String,
    pub parameters: CellParameters,
}

impl CellRecord {
    pub fn new(id: u32, material: i32, density: f64, region: &str) -> Self {
        Self {
            id,
            material,
            density,
            region: region.to_string(),
            parameters: CellParameters::default(),
        }
    }
}

/// Keyword parameters from a cell card.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct CellParameters {
    /// `u` entry; negative values mark non-truncated cells.
    pub universe: Option<i32>,
    /// `lat` entry; `1` rectangular, `2` hexagonal.
    pub lattice: Option<i32>,
    /// `fill`/`*fill` entry.
    pub fill: Option<RawSpec>,
    /// `trcl`/`*trcl` entry.
    pub transform: Option<RawSpec>,
    /// `vol` entry.
    pub volume: Option<f64>,
    /// `imp:n` entry.
    pub importance: Option<f64>,
}

/// Raw text of a `fill` or `trcl` entry.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct RawSpec {
    pub text: String,
    /// Starred (`*fill`/`*trcl`) card form: rotation entries are degrees.
    pub degrees: bool,
}

impl RawSpec {
    pub fn new(text: &str) -> Self {
        Self {
            text: text.to_string(),
            degrees: false,
        }
    }

    pub fn degrees(text: &str) -> Self {
        Self {
            text: text.to_string(),
            degrees: true,
        }
    }
}

/// A `TRn` card: displacement plus optional rotation.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Transform {
    pub translation: Vector3<f64>,
    pub rotation: Option<Matrix3<f64>>,
    /// `*TRn` card form: rotation entries are degrees.
    pub degrees: bool,
}

impl Transform {
    pub fn translation(v: Vector3<f64>) -> Self {
        Self {
            translation: v,
            rotation: None,
            degrees: false,
        }
    }
}

impl Default for Transform {
    fn default() -> Self {
        Self {
            translation: Vector3::zeros(),
            rotation: None,
            degrees: false,
        }
    }
}

/// Transform cards keyed by id.
pub type TransformTable = AHashMap<u32, Transform>;

/// Everything the resolver consumes: the parsed deck.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ModelRecords {
    pub surfaces: Vec<SurfaceRecord>,
    pub cells: Vec<CellRecord>,
    pub transforms: TransformTable,
}
