// SPDX-License-Identifier: Apache-2.0
// Copyright (c) 2026 Mcbridge Team

//! Surface builder
//!
//! Turns surface records into typed surfaces. Single-surface mnemonics
//! register under the record id; macrobodies expand into member surfaces
//! with generated ids plus a composite entry under the record id holding
//! the interior region. All deck ids are reserved before any member id is
//! handed out, so generated ids never shadow explicit ones.

use nalgebra::{Matrix3, Vector3};

use crate::error::{ConvertError, Result};
use crate::geometry::transform::{align_z_to, degrees_to_cosines, is_rotation};
use crate::geometry::{Axis, Boundary, CompositeSurface, Region, Surface, SurfaceKind};
use crate::model::SurfaceTable;
use crate::record::{SurfaceRecord, TransformTable};

/// Build the surface table for a full record set.
pub(crate) fn build_surface_table(
    records: &[SurfaceRecord],
    transforms: &TransformTable,
) -> Result<SurfaceTable> {
    let mut table = SurfaceTable::new();
    for record in records {
        table.reserve(record.id);
    }
    for record in records {
        build_surface(record, transforms, &mut table)?;
    }
    Ok(table)
}

/// Expansion of one record: a lone surface, or macrobody members paired
/// with the side each contributes to the interior intersection.
enum Parts {
    Single(SurfaceKind),
    Composite(Vec<(SurfaceKind, bool)>),
}

fn build_surface(
    record: &SurfaceRecord,
    transforms: &TransformTable,
    table: &mut SurfaceTable,
) -> Result<()> {
    let boundary = if record.reflective {
        Boundary::Reflective
    } else {
        Boundary::Transmission
    };
    let motion = resolve_transform(record, transforms)?;
    match expand(record)? {
        Parts::Single(kind) => {
            let kind = apply_motion(kind, record.id, motion.as_ref())?;
            table.insert(Surface {
                id: record.id,
                boundary,
                kind,
            });
        }
        Parts::Composite(parts) => {
            let mut components = Vec::with_capacity(parts.len());
            let mut leaves = Vec::with_capacity(parts.len());
            for (kind, positive) in parts {
                let kind = apply_motion(kind, record.id, motion.as_ref())?;
                let id = table.insert_auto(boundary, kind);
                components.push(id);
                leaves.push(Region::Halfspace {
                    surface: id,
                    positive,
                });
            }
            table.insert(Surface {
                id: record.id,
                boundary,
                kind: SurfaceKind::Composite(CompositeSurface {
                    components,
                    interior: Region::Intersection(leaves),
                }),
            });
        }
    }
    Ok(())
}

fn expand(record: &SurfaceRecord) -> Result<Parts> {
    let coeffs = record.coefficients.as_slice();
    let mnemonic = record.mnemonic.to_ascii_lowercase();
    let kind = match mnemonic.as_str() {
        "p" => match coeffs.len() {
            4 => SurfaceKind::Plane {
                a: coeffs[0],
                b: coeffs[1],
                c: coeffs[2],
                d: coeffs[3],
            },
            9 => canonical_plane(record.id, coeffs)?,
            _ => {
                return Err(wrong_count(record, "4 or 9"));
            }
        },
        "px" => plane_on(Axis::X, fixed::<1>(record)?[0]),
        "py" => plane_on(Axis::Y, fixed::<1>(record)?[0]),
        "pz" => plane_on(Axis::Z, fixed::<1>(record)?[0]),
        "so" => SurfaceKind::Sphere {
            center: Vector3::zeros(),
            radius: fixed::<1>(record)?[0],
        },
        "s" => {
            let [x, y, z, radius] = fixed(record)?;
            SurfaceKind::Sphere {
                center: Vector3::new(x, y, z),
                radius,
            }
        }
        "sx" | "sy" | "sz" => {
            let [offset, radius] = fixed(record)?;
            let axis = named_axis(&mnemonic);
            SurfaceKind::Sphere {
                center: offset * axis.unit(),
                radius,
            }
        }
        "c/x" | "c/y" | "c/z" => {
            let [t0, t1, radius] = fixed(record)?;
            let axis = named_axis(&mnemonic);
            let [i0, i1] = axis.transverse();
            let mut center = Vector3::zeros();
            center[i0] = t0;
            center[i1] = t1;
            SurfaceKind::cylinder(axis, center, radius)
        }
        "cx" | "cy" | "cz" => {
            let [radius] = fixed(record)?;
            SurfaceKind::cylinder(named_axis(&mnemonic), Vector3::zeros(), radius)
        }
        "k/x" | "k/y" | "k/z" => {
            let axis = named_axis(&mnemonic);
            match coeffs.len() {
                4 => SurfaceKind::Cone {
                    axis,
                    apex: Vector3::new(coeffs[0], coeffs[1], coeffs[2]),
                    r2: coeffs[3],
                },
                5 => {
                    let apex = Vector3::new(coeffs[0], coeffs[1], coeffs[2]);
                    return Ok(Parts::Composite(one_sided_cone(
                        axis,
                        apex,
                        coeffs[3],
                        coeffs[4] == 1.0,
                    )));
                }
                _ => {
                    return Err(wrong_count(record, "4 or 5"));
                }
            }
        }
        "kx" | "ky" | "kz" => {
            let axis = named_axis(&mnemonic);
            match coeffs.len() {
                2 => SurfaceKind::Cone {
                    axis,
                    apex: coeffs[0] * axis.unit(),
                    r2: coeffs[1],
                },
                3 => {
                    return Ok(Parts::Composite(one_sided_cone(
                        axis,
                        coeffs[0] * axis.unit(),
                        coeffs[1],
                        coeffs[2] == 1.0,
                    )));
                }
                _ => {
                    return Err(wrong_count(record, "2 or 3"));
                }
            }
        }
        "gq" => SurfaceKind::Quadric {
            coefficients: fixed(record)?,
        },
        "tx" | "ty" | "tz" => {
            let [x, y, z, a, b, c] = fixed(record)?;
            SurfaceKind::Torus {
                axis: named_axis(&mnemonic),
                center: Vector3::new(x, y, z),
                a,
                b,
                c,
            }
        }
        "x" | "y" | "z" => {
            if coeffs.len() != 4 {
                return Err(ConvertError::unsupported(format!(
                    "{} surface with {} parameters",
                    mnemonic,
                    coeffs.len()
                )));
            }
            return two_point(named_axis(&mnemonic), coeffs);
        }
        "rcc" => {
            let [vx, vy, vz, hx, hy, hz, radius] = fixed(record)?;
            let base = Vector3::new(vx, vy, vz);
            let parts = if hx == 0.0 && hy == 0.0 {
                can(&base, hz, radius, Axis::Z)
            } else if hy == 0.0 && hz == 0.0 {
                can(&base, hx, radius, Axis::X)
            } else if hx == 0.0 && hz == 0.0 {
                can(&base, hy, radius, Axis::Y)
            } else {
                let height = Vector3::new(hx, hy, hz);
                let rotation = align_z_to(&height.normalize());
                let mut parts = can(&base, height.norm(), radius, Axis::Z);
                for (kind, _) in &mut parts {
                    *kind = kind.rotated(&rotation, &base).ok_or_else(|| {
                        ConvertError::unsupported(format!("rotation of surface {}", record.id))
                    })?;
                }
                parts
            };
            return Ok(Parts::Composite(parts));
        }
        "rpp" => {
            let [xmin, xmax, ymin, ymax, zmin, zmax] = fixed(record)?;
            return Ok(Parts::Composite(vec![
                (plane_on(Axis::X, xmin), true),
                (plane_on(Axis::X, xmax), false),
                (plane_on(Axis::Y, ymin), true),
                (plane_on(Axis::Y, ymax), false),
                (plane_on(Axis::Z, zmin), true),
                (plane_on(Axis::Z, zmax), false),
            ]));
        }
        "box" => {
            if coeffs.len() == 9 {
                return Err(ConvertError::unsupported(
                    "box macrobody with one infinite dimension",
                ));
            }
            if coeffs.len() != 12 {
                return Err(ConvertError::unsupported(
                    "box macrobody should have 12 coefficients",
                ));
            }
            let corner = Vector3::new(coeffs[0], coeffs[1], coeffs[2]);
            let mut parts = Vec::with_capacity(6);
            for edge in coeffs[3..].chunks_exact(3) {
                let edge = Vector3::new(edge[0], edge[1], edge[2]);
                parts.push((skew_plane(&edge, edge.dot(&corner)), true));
                parts.push((skew_plane(&edge, edge.dot(&(corner + edge))), false));
            }
            return Ok(Parts::Composite(parts));
        }
        other => {
            return Err(ConvertError::unsupported(format!(
                "surface type `{other}`"
            )));
        }
    };
    Ok(Parts::Single(kind))
}

/// Plane through three points with the MCNP sense convention: the first
/// nonzero of (d, c, b, a) is made positive.
fn canonical_plane(id: u32, coeffs: &[f64]) -> Result<SurfaceKind> {
    let p1 = Vector3::new(coeffs[0], coeffs[1], coeffs[2]);
    let p2 = Vector3::new(coeffs[3], coeffs[4], coeffs[5]);
    let p3 = Vector3::new(coeffs[6], coeffs[7], coeffs[8]);
    let normal = (p2 - p1).cross(&(p3 - p1));
    let d = normal.dot(&p1);
    for probe in [d, normal.z, normal.y, normal.x] {
        if probe != 0.0 {
            let sign = if probe < 0.0 { -1.0 } else { 1.0 };
            return Ok(SurfaceKind::Plane {
                a: sign * normal.x,
                b: sign * normal.y,
                c: sign * normal.z,
                d: sign * d,
            });
        }
    }
    Err(ConvertError::GeometricDegeneracy { surface: id })
}

/// Degenerate-pair classification of two-point `x`/`y`/`z` surfaces: equal
/// axis coordinates give a plane, equal radii a cylinder, anything else one
/// sheet of a cone.
fn two_point(axis: Axis, coeffs: &[f64]) -> Result<Parts> {
    let [x1, r1, x2, r2] = [coeffs[0], coeffs[1], coeffs[2], coeffs[3]];
    if x1 == x2 {
        return Ok(Parts::Single(SurfaceKind::AxisPlane { axis, offset: x1 }));
    }
    if r1 == r2 {
        return Ok(Parts::Single(SurfaceKind::cylinder(
            axis,
            Vector3::zeros(),
            r1,
        )));
    }
    let grad = (x2 - x1) / (r2 - r1);
    let offset = x2 - grad * r2;
    let r2_slope = (1.0 / grad).powi(2);
    Ok(Parts::Composite(one_sided_cone(
        axis,
        offset * axis.unit(),
        r2_slope,
        grad >= 0.0,
    )))
}

/// One sheet of a cone: the two-sided cone intersected with the half-space
/// on the chosen side of the apex plane.
fn one_sided_cone(axis: Axis, apex: Vector3<f64>, r2: f64, up: bool) -> Vec<(SurfaceKind, bool)> {
    let ambiguity = plane_on(axis, apex[axis.index()]);
    vec![(SurfaceKind::Cone { axis, apex, r2 }, false), (ambiguity, up)]
}

/// Finite cylinder as members: lateral surface plus the two end planes, with
/// the ends ordered bottom first regardless of the height's sign.
fn can(base: &Vector3<f64>, height: f64, radius: f64, axis: Axis) -> Vec<(SurfaceKind, bool)> {
    let along = base[axis.index()];
    let (bottom, top) = if height < 0.0 {
        (along + height, along)
    } else {
        (along, along + height)
    };
    vec![
        (SurfaceKind::cylinder(axis, *base, radius), false),
        (plane_on(axis, bottom), true),
        (plane_on(axis, top), false),
    ]
}

/// Axis-perpendicular plane in generic form, as macrobody faces and
/// `px`/`py`/`pz` cards register.
fn plane_on(axis: Axis, offset: f64) -> SurfaceKind {
    let unit = axis.unit();
    SurfaceKind::Plane {
        a: unit.x,
        b: unit.y,
        c: unit.z,
        d: offset,
    }
}

fn skew_plane(normal: &Vector3<f64>, d: f64) -> SurfaceKind {
    SurfaceKind::Plane {
        a: normal.x,
        b: normal.y,
        c: normal.z,
        d,
    }
}

fn named_axis(mnemonic: &str) -> Axis {
    match mnemonic.as_bytes()[mnemonic.len() - 1] {
        b'x' => Axis::X,
        b'y' => Axis::Y,
        _ => Axis::Z,
    }
}

fn fixed<const N: usize>(record: &SurfaceRecord) -> Result<[f64; N]> {
    record
        .coefficients
        .as_slice()
        .try_into()
        .map_err(|_| wrong_count(record, &N.to_string()))
}

fn wrong_count(record: &SurfaceRecord, expected: &str) -> ConvertError {
    ConvertError::malformed(
        format!("surface {}", record.id),
        format!("{:?}", record.coefficients),
        format!("{} surface expects {expected} coefficients", record.mnemonic),
    )
}

/// Deck transform resolved to a displacement and an optional rotation in
/// direction cosines. Degree matrices are converted and validated here.
fn resolve_transform(
    record: &SurfaceRecord,
    transforms: &TransformTable,
) -> Result<Option<(Vector3<f64>, Option<Matrix3<f64>>)>> {
    let Some(number) = record.transform else {
        return Ok(None);
    };
    let entry = transforms.get(&number).ok_or_else(|| {
        ConvertError::malformed(
            format!("surface {}", record.id),
            format!("tr={number}"),
            "unknown transformation",
        )
    })?;
    let rotation = match &entry.rotation {
        None => None,
        Some(matrix) if entry.degrees => {
            let converted = degrees_to_cosines(matrix);
            if !is_rotation(&converted) {
                return Err(ConvertError::malformed(
                    format!("surface {}", record.id),
                    format!("tr={number}"),
                    "transformation matrix is not a rotation",
                ));
            }
            Some(converted)
        }
        Some(matrix) => Some(*matrix),
    };
    Ok(Some((entry.translation, rotation)))
}

/// Displace, then rotate about the displaced origin.
fn apply_motion(
    kind: SurfaceKind,
    id: u32,
    motion: Option<&(Vector3<f64>, Option<Matrix3<f64>>)>,
) -> Result<SurfaceKind> {
    let Some((shift, rotation)) = motion else {
        return Ok(kind);
    };
    let moved = kind.translated(shift);
    match rotation {
        None => Ok(moved),
        Some(rotation) => moved.rotated(rotation, shift).ok_or_else(|| {
            ConvertError::unsupported(format!(
                "rotation of torus surface {id} off the coordinate axes"
            ))
        }),
    }
}

/// Retype generic planes whose normals are exact unit axes. Runs late so
/// that duplicate detection has already seen the generic forms. Macrobody
/// member surfaces keep their generic representation.
pub(crate) fn reduce_axis_planes(table: &mut SurfaceTable) {
    let mut members = Vec::new();
    for surface in table.iter() {
        if let SurfaceKind::Composite(composite) = &surface.kind {
            members.extend_from_slice(&composite.components);
        }
    }
    for id in table.ids() {
        if members.contains(&id) {
            continue;
        }
        if let Some(surface) = table.get_mut(id) {
            if let Some(kind) = surface.kind.reduced() {
                surface.kind = kind;
            }
        }
    }
}
