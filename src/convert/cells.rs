// SPDX-License-Identifier: Apache-2.0
// Copyright (c) 2026 Mcbridge Team

//! Region resolver
//!
//! Resolves every cell's region text into a boolean tree over the surface
//! table, applies cell transformations, and finally places cells into their
//! universes. Cells whose regions complement other cells resolve in a second
//! pass, in dependency order, because the referenced region may itself carry
//! an applied transformation.

use ahash::AHashMap;
use nalgebra::{Matrix3, Vector3};

use crate::error::{ConvertError, Result};
use crate::geometry::parser::{self, Expr, LatticeFill};
use crate::geometry::transform::{degrees_to_cosines, is_rotation};
use crate::geometry::{Boundary, CompositeSurface, Region, SurfaceKind};
use crate::model::{Cell, CellFill, IdAllocator, MaterialTable, SurfaceTable, UniverseTable};
use crate::record::{CellRecord, RawSpec, TransformTable};

use super::lattice;

/// Importances below this are zero; matches a five-decimal rendering of the
/// `imp:n` entry comparing equal to zero.
const IMPORTANCE_EPSILON: f64 = 5e-6;

/// A cell's resolved region plus its effective fill entry. A `trcl` on a
/// filled cell folds its constants into the fill entry so that the filling
/// universe moves together with the region.
#[derive(Debug, Clone)]
pub(crate) struct ResolvedCell {
    pub region: Region,
    pub fill: Option<RawSpec>,
}

/// MCNP region operators rewritten to the expression grammar's symbols.
fn rewrite_operators(text: &str) -> String {
    text.replace('#', "~").replace(':', "|")
}

/// Resolve every cell's region, registering any surfaces created by cell
/// transformations in the shared table.
pub(crate) fn resolve_cell_regions(
    records: &[CellRecord],
    surfaces: &mut SurfaceTable,
) -> Result<AHashMap<u32, ResolvedCell>> {
    let mut exprs = Vec::with_capacity(records.len());
    for record in records {
        let rewritten = rewrite_operators(&record.region);
        let expr = parser::parse_region(&rewritten).map_err(|reason| {
            ConvertError::malformed(format!("cell {}", record.id), &record.region, reason)
        })?;
        exprs.push(expr);
    }

    let mut resolved: AHashMap<u32, ResolvedCell> = AHashMap::with_capacity(records.len());

    // First pass: cells whose regions stand on surfaces alone.
    for (record, expr) in records.iter().zip(&exprs) {
        if expr.references_cells() {
            continue;
        }
        let region = resolve_expr(expr, record, &resolved, surfaces)?;
        let (region, fill) = apply_cell_transform(record, region, surfaces)?;
        resolved.insert(record.id, ResolvedCell { region, fill });
    }

    // Second pass: cells with cell complements, each after the cells it
    // references. Transform composition with a substituted sub-region is not
    // supported, so these cells must not carry a transformation.
    for index in complement_order(records, &exprs)? {
        let record = &records[index];
        if record.parameters.transform.is_some() {
            return Err(ConvertError::unsupported(format!(
                "transformation on cell {}, which complements another cell",
                record.id
            )));
        }
        let region = resolve_expr(&exprs[index], record, &resolved, surfaces)?;
        resolved.insert(
            record.id,
            ResolvedCell {
                region,
                fill: record.parameters.fill.clone(),
            },
        );
    }
    Ok(resolved)
}

#[derive(Clone, Copy, PartialEq)]
enum Mark {
    Untouched,
    Visiting,
    Ordered,
}

/// Depth-first ordering of the cells with cell complements, so that every
/// cell comes after the cells it references. A cycle cannot resolve.
fn complement_order(records: &[CellRecord], exprs: &[Expr]) -> Result<Vec<usize>> {
    let index_of: AHashMap<u32, usize> = records
        .iter()
        .enumerate()
        .map(|(index, record)| (record.id, index))
        .collect();
    let mut marks = vec![Mark::Untouched; records.len()];
    let mut order = Vec::new();
    for index in 0..records.len() {
        if exprs[index].references_cells() && marks[index] == Mark::Untouched {
            visit(index, records, exprs, &index_of, &mut marks, &mut order)?;
        }
    }
    Ok(order)
}

fn visit(
    index: usize,
    records: &[CellRecord],
    exprs: &[Expr],
    index_of: &AHashMap<u32, usize>,
    marks: &mut [Mark],
    order: &mut Vec<usize>,
) -> Result<()> {
    marks[index] = Mark::Visiting;
    for reference in exprs[index].referenced_cells() {
        let other = *index_of
            .get(&reference)
            .ok_or(ConvertError::UnresolvableReference {
                cell: records[index].id,
                reference,
            })?;
        if !exprs[other].references_cells() {
            // Resolved in the first pass.
            continue;
        }
        match marks[other] {
            Mark::Ordered => {}
            Mark::Visiting => {
                return Err(ConvertError::UnresolvableReference {
                    cell: records[index].id,
                    reference,
                });
            }
            Mark::Untouched => visit(other, records, exprs, index_of, marks, order)?,
        }
    }
    marks[index] = Mark::Ordered;
    order.push(index);
    Ok(())
}

/// Map an expression onto the surface table. Composite leaves expand into
/// their interior (negative sense) or its De Morgan inverse (positive
/// sense); `~cell` leaves clone the referenced cell's resolved region.
fn resolve_expr(
    expr: &Expr,
    record: &CellRecord,
    resolved: &AHashMap<u32, ResolvedCell>,
    surfaces: &SurfaceTable,
) -> Result<Region> {
    Ok(match expr {
        Expr::Halfspace(signed) => {
            let id = signed.unsigned_abs();
            let surface = surfaces.get(id).ok_or_else(|| {
                ConvertError::malformed(
                    format!("cell {}", record.id),
                    &record.region,
                    format!("unknown surface {id}"),
                )
            })?;
            match &surface.kind {
                SurfaceKind::Composite(composite) => {
                    if *signed < 0 {
                        composite.interior.clone()
                    } else {
                        composite.interior.inverse()
                    }
                }
                _ => Region::halfspace(*signed),
            }
        }
        Expr::CellComplement(reference) => resolved
            .get(reference)
            .map(|other| other.region.complement())
            .ok_or(ConvertError::UnresolvableReference {
                cell: record.id,
                reference: *reference,
            })?,
        Expr::Complement(inner) => resolve_expr(inner, record, resolved, surfaces)?.inverse(),
        Expr::Intersection(children) => Region::Intersection(
            children
                .iter()
                .map(|child| resolve_expr(child, record, resolved, surfaces))
                .collect::<Result<_>>()?,
        ),
        Expr::Union(children) => Region::Union(
            children
                .iter()
                .map(|child| resolve_expr(child, record, resolved, surfaces))
                .collect::<Result<_>>()?,
        ),
    })
}

/// Displacement plus optional rotation of a cell or its filling universe.
struct Motion {
    translation: Vector3<f64>,
    rotation: Option<Matrix3<f64>>,
}

/// Apply a `trcl` entry to the resolved region. Returns the moved region and
/// the cell's effective fill entry, which absorbs the transform constants so
/// the filling universe follows.
fn apply_cell_transform(
    record: &CellRecord,
    region: Region,
    surfaces: &mut SurfaceTable,
) -> Result<(Region, Option<RawSpec>)> {
    let Some(spec) = &record.parameters.transform else {
        return Ok((region, record.parameters.fill.clone()));
    };
    let text = spec.text.trim();
    if !text.starts_with('(') {
        return Err(ConvertError::unsupported(format!(
            "TRn card on cell {}",
            record.id
        )));
    }
    let fill = record.parameters.fill.as_ref().map(|fill| RawSpec {
        text: format!("{} {}", fill.text, text),
        degrees: fill.degrees || spec.degrees,
    });
    let constants = parser::parse_trcl_numbers(text)
        .map_err(|reason| ConvertError::malformed(format!("cell {}", record.id), text, reason))?;
    let motion = cell_motion(&constants, spec.degrees, record.id, text)?;
    let moved = transform_region(&region, &motion, surfaces)?;
    Ok((moved, fill))
}

fn cell_motion(constants: &[f64], degrees: bool, cell: u32, text: &str) -> Result<Motion> {
    if constants.len() != 3 && constants.len() != 12 {
        return Err(ConvertError::malformed(
            format!("cell {cell}"),
            text,
            "cell transformation expects 3 or 12 constants",
        ));
    }
    let translation = Vector3::new(constants[0], constants[1], constants[2]);
    let rotation = if constants.len() == 12 {
        let mut matrix = Matrix3::from_row_slice(&constants[3..]);
        if degrees {
            matrix = degrees_to_cosines(&matrix);
            if !is_rotation(&matrix) {
                return Err(ConvertError::malformed(
                    format!("cell {cell}"),
                    text,
                    "transformation matrix is not a rotation",
                ));
            }
        }
        // MCNP rows map the new axes onto the old; geometry applies the
        // transpose.
        Some(matrix.transpose())
    } else {
        None
    };
    Ok(Motion {
        translation,
        rotation,
    })
}

/// Rebuild a region over transformed copies of its surfaces. Every distinct
/// surface transforms once per application; copies register under fresh ids.
fn transform_region(
    region: &Region,
    motion: &Motion,
    surfaces: &mut SurfaceTable,
) -> Result<Region> {
    let mut memo: AHashMap<u32, u32> = AHashMap::new();
    region.transformed(&mut |id| transform_surface(id, motion, surfaces, &mut memo))
}

fn transform_surface(
    id: u32,
    motion: &Motion,
    surfaces: &mut SurfaceTable,
    memo: &mut AHashMap<u32, u32>,
) -> Result<u32> {
    if let Some(&new_id) = memo.get(&id) {
        return Ok(new_id);
    }
    let surface = surfaces.get(id).cloned().ok_or_else(|| {
        ConvertError::malformed(
            "region transformation",
            id.to_string(),
            "unknown surface",
        )
    })?;
    let kind = match &surface.kind {
        SurfaceKind::Composite(composite) => {
            let components = composite
                .components
                .iter()
                .map(|&component| transform_surface(component, motion, surfaces, memo))
                .collect::<Result<Vec<_>>>()?;
            let interior = composite
                .interior
                .transformed(&mut |component| transform_surface(component, motion, surfaces, memo))?;
            SurfaceKind::Composite(CompositeSurface {
                components,
                interior,
            })
        }
        kind => {
            let moved = kind.translated(&motion.translation);
            match &motion.rotation {
                None => moved,
                Some(rotation) => {
                    moved
                        .rotated(rotation, &motion.translation)
                        .ok_or_else(|| {
                            ConvertError::unsupported(format!(
                                "rotation of torus surface {id} off the coordinate axes"
                            ))
                        })?
                }
            }
        }
    };
    let new_id = surfaces.insert_auto(surface.boundary, kind);
    memo.insert(id, new_id);
    Ok(new_id)
}

/// Place every cell into its universe, assign fills, upgrade boundary cells
/// to vacuum and build lattices. Lattice-defining cells are consumed by the
/// lattice constructor and never placed.
pub(crate) fn populate_universes(
    records: &[CellRecord],
    resolved: &AHashMap<u32, ResolvedCell>,
    surfaces: &mut SurfaceTable,
    materials: &MaterialTable,
    transforms: &TransformTable,
    universes: &mut UniverseTable,
) -> Result<()> {
    reserve_universe_ids(records, resolved, universes);
    let mut cell_ids = IdAllocator::new();
    for record in records {
        cell_ids.reserve(record.id);
    }

    let mut lattices = Vec::new();
    for record in records {
        let resolved_cell = resolved
            .get(&record.id)
            .expect("every cell resolves before placement");
        if let Some(lattice_type) = record.parameters.lattice {
            lattices.push((record, resolved_cell, lattice_type));
            continue;
        }

        let mut cell = Cell::new(record.id);
        cell.region = Some(resolved_cell.region.clone());
        cell.volume = record.parameters.volume;

        if let Some(spec) = &resolved_cell.fill {
            let (universe, constants) = parser::parse_fill(spec.text.trim()).map_err(|reason| {
                ConvertError::malformed(format!("cell {}", record.id), &spec.text, reason)
            })?;
            universes.ensure(universe);
            cell.fill = CellFill::Universe(universe);
            if let Some(constants) = constants {
                apply_fill_motion(&mut cell, &constants, spec, transforms)?;
            }
        } else if let Some(material) = materials.lookup(record.material, record.density) {
            cell.fill = CellFill::Material(material);
        }

        // Zero importance marks problem-boundary cells: flat regions promote
        // their transmission surfaces to vacuum and stay out of the root
        // universe.
        let boundary_cell =
            is_zero_importance(record) && upgrade_vacuum(&resolved_cell.region, surfaces);

        match record.parameters.universe {
            // Negative entries flag non-truncated cells; the magnitude is
            // the universe id either way.
            Some(universe) => universes.add_cell(universe.unsigned_abs(), cell)?,
            None if boundary_cell => {}
            None => universes.add_cell(universes.root(), cell)?,
        }
    }

    for (record, resolved_cell, lattice_type) in lattices {
        lattice::build_lattice(
            record,
            resolved_cell,
            lattice_type,
            surfaces,
            materials,
            universes,
            &mut cell_ids,
        )?;
    }
    Ok(())
}

/// Reserve every universe id the deck mentions, so auxiliary universes
/// created during lattice construction never collide with explicit ids.
/// Fill entries that fail to parse are reported by the placement loop.
fn reserve_universe_ids(
    records: &[CellRecord],
    resolved: &AHashMap<u32, ResolvedCell>,
    universes: &mut UniverseTable,
) {
    for record in records {
        if let Some(universe) = record.parameters.universe {
            universes.reserve(universe.unsigned_abs());
        }
        let Some(fill) = resolved.get(&record.id).and_then(|cell| cell.fill.as_ref()) else {
            continue;
        };
        if record.parameters.lattice.is_some() {
            match parser::parse_lattice_fill(fill.text.trim()) {
                Ok(LatticeFill::Infinite(id)) => universes.reserve(id),
                Ok(LatticeFill::Window { ids, .. }) => {
                    for id in ids {
                        universes.reserve(id);
                    }
                }
                Err(_) => {}
            }
        } else if let Ok((universe, _)) = parser::parse_fill(fill.text.trim()) {
            universes.reserve(universe);
        }
    }
}

fn is_zero_importance(record: &CellRecord) -> bool {
    record
        .parameters
        .importance
        .is_some_and(|importance| importance.abs() < IMPORTANCE_EPSILON)
}

/// Promote the transmission surfaces of a flat region to vacuum. Nested
/// regions are left alone and keep their cell in the model.
fn upgrade_vacuum(region: &Region, surfaces: &mut SurfaceTable) -> bool {
    let Some(halfspaces) = region.flat_halfspaces() else {
        return false;
    };
    for (id, _) in halfspaces {
        if let Some(surface) = surfaces.get_mut(id) {
            if surface.boundary == Boundary::Transmission {
                surface.boundary = Boundary::Vacuum;
            }
        }
    }
    true
}

/// Set a cell's fill displacement and rotation from the constants trailing
/// its fill entry: one TR reference, a bare displacement, or a displacement
/// with a row-major rotation matrix.
fn apply_fill_motion(
    cell: &mut Cell,
    constants: &[f64],
    spec: &RawSpec,
    transforms: &TransformTable,
) -> Result<()> {
    match constants.len() {
        1 => {
            let number = constants[0] as u32;
            let entry = transforms.get(&number).ok_or_else(|| {
                ConvertError::malformed(
                    format!("cell {}", cell.id),
                    &spec.text,
                    format!("unknown transformation {number}"),
                )
            })?;
            cell.translation = Some(entry.translation);
            if let Some(rotation) = &entry.rotation {
                let rotation = if entry.degrees {
                    let converted = degrees_to_cosines(rotation);
                    if !is_rotation(&converted) {
                        return Err(ConvertError::malformed(
                            format!("cell {}", cell.id),
                            &spec.text,
                            "transformation matrix is not a rotation",
                        ));
                    }
                    converted
                } else {
                    *rotation
                };
                cell.rotation = Some(rotation.transpose());
            }
        }
        3 => {
            cell.translation = Some(Vector3::new(constants[0], constants[1], constants[2]));
        }
        12 => {
            cell.translation = Some(Vector3::new(constants[0], constants[1], constants[2]));
            let mut matrix = Matrix3::from_row_slice(&constants[3..]);
            if spec.degrees {
                matrix = degrees_to_cosines(&matrix);
                if !is_rotation(&matrix) {
                    return Err(ConvertError::malformed(
                        format!("cell {}", cell.id),
                        &spec.text,
                        "transformation matrix is not a rotation",
                    ));
                }
            }
            cell.rotation = Some(matrix);
        }
        _ => {
            return Err(ConvertError::malformed(
                format!("cell {}", cell.id),
                &spec.text,
                "fill transformation expects 1, 3 or 12 constants",
            ));
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::convert::surfaces::build_surface_table;
    use crate::record::{SurfaceRecord, Transform};
    use approx::assert_relative_eq;

    fn sphere(id: u32, x: f64, radius: f64) -> SurfaceRecord {
        SurfaceRecord::new(id, "s", vec![x, 0.0, 0.0, radius])
    }

    fn table(records: &[SurfaceRecord]) -> SurfaceTable {
        build_surface_table(records, &TransformTable::new()).unwrap()
    }

    #[test]
    fn test_plain_regions_resolve() {
        let mut surfaces = table(&[sphere(1, 0.0, 1.0), sphere(2, 3.0, 1.0)]);
        let cells = vec![
            CellRecord::new(10, 1, 1.0, "-1 : -2"),
            CellRecord::new(11, 0, 0.0, "#(-1 : -2)"),
        ];
        let resolved = resolve_cell_regions(&cells, &mut surfaces).unwrap();
        assert_eq!(
            resolved[&10].region,
            Region::Union(vec![Region::halfspace(-1), Region::halfspace(-2)])
        );
        // Expression complement pushes down to the leaves.
        assert_eq!(
            resolved[&11].region,
            Region::Intersection(vec![Region::halfspace(1), Region::halfspace(2)])
        );
    }

    #[test]
    fn test_composite_leaf_expansion() {
        let mut surfaces = table(&[SurfaceRecord::new(
            1,
            "rpp",
            vec![0.0, 1.0, 0.0, 1.0, 0.0, 1.0],
        )]);
        let cells = vec![
            CellRecord::new(10, 0, 0.0, "-1"),
            CellRecord::new(11, 0, 0.0, "1"),
        ];
        let resolved = resolve_cell_regions(&cells, &mut surfaces).unwrap();
        let Region::Intersection(inside) = &resolved[&10].region else {
            panic!("expected expanded interior");
        };
        assert_eq!(inside.len(), 6);
        assert!(matches!(&resolved[&11].region, Region::Union(outside) if outside.len() == 6));
    }

    #[test]
    fn test_complement_chain_resolves_in_order() {
        let mut surfaces = table(&[sphere(1, 0.0, 1.0)]);
        let cells = vec![
            CellRecord::new(3, 0, 0.0, "#2"),
            CellRecord::new(1, 0, 0.0, "-1"),
            CellRecord::new(2, 0, 0.0, "#1"),
        ];
        let resolved = resolve_cell_regions(&cells, &mut surfaces).unwrap();
        assert_eq!(resolved[&2].region, Region::halfspace(1));
        // Double complement cancels back to the original region.
        assert_eq!(resolved[&3].region, resolved[&1].region);
    }

    #[test]
    fn test_complement_cycle_fails() {
        let mut surfaces = table(&[sphere(1, 0.0, 1.0)]);
        let cells = vec![
            CellRecord::new(1, 0, 0.0, "#3"),
            CellRecord::new(2, 0, 0.0, "#1"),
            CellRecord::new(3, 0, 0.0, "#2"),
        ];
        let error = resolve_cell_regions(&cells, &mut surfaces).unwrap_err();
        assert!(matches!(
            error,
            ConvertError::UnresolvableReference { .. }
        ));
    }

    #[test]
    fn test_complement_of_unknown_cell_fails() {
        let mut surfaces = table(&[sphere(1, 0.0, 1.0)]);
        let cells = vec![CellRecord::new(1, 0, 0.0, "#9")];
        let error = resolve_cell_regions(&cells, &mut surfaces).unwrap_err();
        assert_eq!(
            error,
            ConvertError::UnresolvableReference {
                cell: 1,
                reference: 9
            }
        );
    }

    #[test]
    fn test_transform_on_complementing_cell_fails() {
        let mut surfaces = table(&[sphere(1, 0.0, 1.0)]);
        let mut complementing = CellRecord::new(2, 0, 0.0, "#1");
        complementing.parameters.transform = Some(RawSpec::new("(1 0 0)"));
        let cells = vec![CellRecord::new(1, 0, 0.0, "-1"), complementing];
        let error = resolve_cell_regions(&cells, &mut surfaces).unwrap_err();
        assert!(matches!(error, ConvertError::UnsupportedConstruct(_)));
    }

    #[test]
    fn test_trcl_registers_fresh_surfaces() {
        let mut surfaces = table(&[sphere(1, 0.0, 1.0), sphere(2, 3.0, 1.0)]);
        let mut record = CellRecord::new(10, 0, 0.0, "-1 -2");
        record.parameters.transform = Some(RawSpec::new("(0 0 5)"));
        let resolved = resolve_cell_regions(&[record], &mut surfaces).unwrap();

        // Originals untouched, copies registered past the highest deck id.
        assert_eq!(surfaces.len(), 4);
        let SurfaceKind::Sphere { center, .. } = surfaces.get(1).unwrap().kind else {
            panic!("expected sphere");
        };
        assert_relative_eq!(center.z, 0.0);
        assert_eq!(
            resolved[&10].region,
            Region::Intersection(vec![Region::halfspace(-3), Region::halfspace(-4)])
        );
        let SurfaceKind::Sphere { center, .. } = surfaces.get(3).unwrap().kind else {
            panic!("expected sphere");
        };
        assert_relative_eq!(center.z, 5.0);
    }

    #[test]
    fn test_trcl_rotation_applies_transposed_about_translation() {
        let mut surfaces = table(&[sphere(1, 2.0, 1.0)]);
        let mut record = CellRecord::new(10, 0, 0.0, "-1");
        // Quarter turn about z written in MCNP row convention.
        record.parameters.transform =
            Some(RawSpec::new("(0 0 0 0 -1 0 1 0 0 0 0 1)"));
        let resolved = resolve_cell_regions(&[record], &mut surfaces).unwrap();
        let Region::Halfspace { surface, .. } = resolved[&10].region else {
            panic!("expected halfspace");
        };
        let SurfaceKind::Sphere { center, .. } = surfaces.get(surface).unwrap().kind else {
            panic!("expected sphere");
        };
        // The transpose of the row matrix sends +x to -y.
        assert_relative_eq!(center.x, 0.0, epsilon = 1e-12);
        assert_relative_eq!(center.y, -2.0, epsilon = 1e-12);
    }

    #[test]
    fn test_trcl_degrees_validation() {
        let mut surfaces = table(&[sphere(1, 0.0, 1.0)]);
        let mut record = CellRecord::new(10, 0, 0.0, "-1");
        record.parameters.transform =
            Some(RawSpec::degrees("(0 0 0 0 90 90 90 45 90 90 90 0)"));
        let error = resolve_cell_regions(&[record], &mut surfaces).unwrap_err();
        assert!(matches!(error, ConvertError::MalformedExpression { .. }));
    }

    #[test]
    fn test_trcl_tr_reference_unsupported() {
        let mut surfaces = table(&[sphere(1, 0.0, 1.0)]);
        let mut record = CellRecord::new(10, 0, 0.0, "-1");
        record.parameters.transform = Some(RawSpec::new("4"));
        let error = resolve_cell_regions(&[record], &mut surfaces).unwrap_err();
        assert_eq!(error, ConvertError::unsupported("TRn card on cell 10"));
    }

    #[test]
    fn test_trcl_folds_into_fill() {
        let mut surfaces = table(&[sphere(1, 0.0, 1.0)]);
        let mut record = CellRecord::new(10, 0, 0.0, "-1");
        record.parameters.fill = Some(RawSpec::new("6"));
        record.parameters.transform = Some(RawSpec::degrees("(1 2 3)"));
        let resolved = resolve_cell_regions(&[record], &mut surfaces).unwrap();
        let fill = resolved[&10].fill.as_ref().unwrap();
        assert_eq!(fill.text, "6 (1 2 3)");
        assert!(fill.degrees);
    }

    #[test]
    fn test_trcl_memoizes_shared_surfaces() {
        let mut surfaces = table(&[sphere(1, 0.0, 1.0)]);
        let mut record = CellRecord::new(10, 0, 0.0, "(-1) : (1 -1)");
        record.parameters.transform = Some(RawSpec::new("(1 0 0)"));
        let resolved = resolve_cell_regions(&[record], &mut surfaces).unwrap();
        // Surface 1 appears three times but transforms once.
        assert_eq!(surfaces.len(), 2);
        assert_eq!(
            resolved[&10].region,
            Region::Union(vec![
                Region::halfspace(-2),
                Region::Intersection(vec![Region::halfspace(2), Region::halfspace(-2)]),
            ])
        );
    }

    #[test]
    fn test_malformed_region_reports_cell() {
        let mut surfaces = table(&[sphere(1, 0.0, 1.0)]);
        let cells = vec![CellRecord::new(7, 0, 0.0, "-1 &")];
        let error = resolve_cell_regions(&cells, &mut surfaces).unwrap_err();
        let ConvertError::MalformedExpression { context, .. } = error else {
            panic!("expected malformed expression");
        };
        assert_eq!(context, "cell 7");
    }

    #[test]
    fn test_unknown_surface_reports_cell() {
        let mut surfaces = table(&[sphere(1, 0.0, 1.0)]);
        let cells = vec![CellRecord::new(7, 0, 0.0, "-1 44")];
        let error = resolve_cell_regions(&cells, &mut surfaces).unwrap_err();
        assert!(matches!(
            error,
            ConvertError::MalformedExpression { ref reason, .. } if reason == "unknown surface 44"
        ));
    }

    #[test]
    fn test_vacuum_upgrade_and_root_removal() {
        let mut surfaces = table(&[sphere(5, 0.0, 10.0)]);
        let mut outside = CellRecord::new(2, 0, 0.0, "+5");
        outside.parameters.importance = Some(0.0);
        let cells = vec![CellRecord::new(1, 0, 0.0, "-5"), outside];
        let resolved = resolve_cell_regions(&cells, &mut surfaces).unwrap();
        let materials = MaterialTable::from_cells(&cells);
        let mut universes = UniverseTable::new();
        populate_universes(
            &cells,
            &resolved,
            &mut surfaces,
            &materials,
            &TransformTable::new(),
            &mut universes,
        )
        .unwrap();

        assert_eq!(surfaces.get(5).unwrap().boundary, Boundary::Vacuum);
        let Some(crate::model::Universe::Cells(root)) = universes.get(universes.root()) else {
            panic!("expected root cell universe");
        };
        assert!(root.cells.contains_key(&1));
        assert!(!root.cells.contains_key(&2));
    }

    #[test]
    fn test_nonzero_importance_keeps_boundary() {
        let mut surfaces = table(&[sphere(5, 0.0, 10.0)]);
        let mut outside = CellRecord::new(2, 0, 0.0, "+5");
        outside.parameters.importance = Some(1.0);
        let cells = vec![outside];
        let resolved = resolve_cell_regions(&cells, &mut surfaces).unwrap();
        let materials = MaterialTable::from_cells(&cells);
        let mut universes = UniverseTable::new();
        populate_universes(
            &cells,
            &resolved,
            &mut surfaces,
            &materials,
            &TransformTable::new(),
            &mut universes,
        )
        .unwrap();

        assert_eq!(surfaces.get(5).unwrap().boundary, Boundary::Transmission);
        let Some(crate::model::Universe::Cells(root)) = universes.get(universes.root()) else {
            panic!("expected root cell universe");
        };
        assert!(root.cells.contains_key(&2));
    }

    #[test]
    fn test_fill_motion_variants() {
        let mut surfaces = table(&[sphere(1, 0.0, 5.0)]);
        let mut transforms = TransformTable::new();
        transforms.insert(
            2,
            Transform {
                translation: Vector3::new(0.0, 0.0, 9.0),
                rotation: Some(Matrix3::identity()),
                degrees: false,
            },
        );

        let mut translated = CellRecord::new(1, 0, 0.0, "-1");
        translated.parameters.fill = Some(RawSpec::new("10 (1 2 3)"));
        let mut rotated = CellRecord::new(2, 0, 0.0, "-1");
        rotated.parameters.fill = Some(RawSpec::degrees(
            "11 (0 0 0 0 90 90 90 0 90 90 90 0)",
        ));
        let mut referenced = CellRecord::new(3, 0, 0.0, "-1");
        referenced.parameters.fill = Some(RawSpec::new("12 (2)"));
        let cells = vec![translated, rotated, referenced];

        let resolved = resolve_cell_regions(&cells, &mut surfaces).unwrap();
        let materials = MaterialTable::from_cells(&cells);
        let mut universes = UniverseTable::new();
        populate_universes(
            &cells,
            &resolved,
            &mut surfaces,
            &materials,
            &transforms,
            &mut universes,
        )
        .unwrap();

        let Some(crate::model::Universe::Cells(root)) = universes.get(universes.root()) else {
            panic!("expected root cell universe");
        };
        let cell = &root.cells[&1];
        assert_eq!(cell.fill, CellFill::Universe(10));
        assert_eq!(cell.translation, Some(Vector3::new(1.0, 2.0, 3.0)));
        assert!(cell.rotation.is_none());

        let cell = &root.cells[&2];
        let rotation = cell.rotation.unwrap();
        assert_relative_eq!(rotation, Matrix3::identity(), epsilon = 1e-12);

        let cell = &root.cells[&3];
        assert_eq!(cell.translation, Some(Vector3::new(0.0, 0.0, 9.0)));
        assert!(cell.rotation.is_some());

        // Filled universes exist as placeholders.
        assert!(universes.get(10).is_some());
        assert!(universes.get(11).is_some());
        assert!(universes.get(12).is_some());
    }
}
