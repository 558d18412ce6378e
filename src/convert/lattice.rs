// SPDX-License-Identifier: Apache-2.0
// Copyright (c) 2026 Mcbridge Team

//! Lattice constructor
//!
//! Builds a rectangular lattice from a lattice-flagged cell: the cell's
//! bounding axis planes give the element pitch, its fill entry gives the
//! index window and the universe grid. MCNP's convention is that across the
//! first listed surface of an axis lies the `+1` element and across the
//! second the `-1` element; the stored grid is rearranged into
//! increasing-coordinate order.

use nalgebra::Vector3;

use crate::error::{ConvertError, Result};
use crate::geometry::parser::{self, LatticeFill};
use crate::geometry::{Region, SurfaceKind};
use crate::model::{
    Cell, CellFill, IdAllocator, LatticeGrid, MaterialTable, RectLattice, SurfaceTable, Universe,
    UniverseTable,
};
use crate::record::CellRecord;

use super::cells::ResolvedCell;

pub(crate) fn build_lattice(
    record: &CellRecord,
    resolved: &ResolvedCell,
    lattice_type: i32,
    surfaces: &SurfaceTable,
    materials: &MaterialTable,
    universes: &mut UniverseTable,
    cell_ids: &mut IdAllocator,
) -> Result<()> {
    match lattice_type {
        1 => {}
        2 => {
            return Err(ConvertError::unsupported(format!(
                "hexagonal lattice on cell {}",
                record.id
            )));
        }
        other => {
            return Err(ConvertError::unsupported(format!(
                "lattice type {other} on cell {}",
                record.id
            )));
        }
    }
    let Some(universe_entry) = record.parameters.universe else {
        return Err(ConvertError::malformed(
            format!("cell {}", record.id),
            &record.region,
            "lattice cell carries no universe id",
        ));
    };
    let universe_id = universe_entry.unsigned_abs();
    let Some(fill) = &resolved.fill else {
        return Err(ConvertError::malformed(
            format!("cell {}", record.id),
            &record.region,
            "lattice cell carries no fill",
        ));
    };

    let (v0, v1, two_d) = bounding_planes(record, &resolved.region, surfaces)?;
    let ndim = if two_d { 2 } else { 3 };
    let step = v1 - v0;
    let pitch: Vec<f64> = (0..ndim).map(|axis| step[axis].abs()).collect();

    let fill_spec = parser::parse_lattice_fill(fill.text.trim()).map_err(|reason| {
        ConvertError::malformed(format!("cell {}", record.id), &fill.text, reason)
    })?;
    let (index0, index1, ids, infinite) = match fill_spec {
        LatticeFill::Infinite(id) => ([0; 3], [0; 3], vec![id], true),
        LatticeFill::Window {
            index0,
            index1,
            ids,
        } => {
            for axis in 0..3 {
                if index1[axis] < index0[axis] {
                    return Err(ConvertError::malformed(
                        format!("cell {}", record.id),
                        &fill.text,
                        "lattice index range maximum below minimum",
                    ));
                }
            }
            (index0, index1, ids, false)
        }
    };

    let mut dims = [1usize; 3];
    for axis in 0..3 {
        dims[axis] = (index1[axis] - index0[axis] + 1) as usize;
    }
    if two_d && dims[2] != 1 {
        return Err(ConvertError::malformed(
            format!("cell {}", record.id),
            &fill.text,
            "z index range on a lattice without z bounding planes",
        ));
    }
    let elements = dims[0] * dims[1] * dims[2];
    if ids.len() != elements {
        return Err(ConvertError::malformed(
            format!("cell {}", record.id),
            &fill.text,
            format!("expected {elements} lattice entries, found {}", ids.len()),
        ));
    }

    // Entries load x-fastest in index order; axes whose listed plane order
    // runs against the coordinate direction flip to restore it.
    let mut grid = LatticeGrid::new(dims, ids);
    for axis in 0..ndim {
        if step[axis] < 0.0 {
            grid.flip(axis);
        }
    }

    let shape: Vec<usize> = dims[..ndim].to_vec();
    let lower_left: Vec<f64> = (0..ndim)
        .map(|axis| {
            let corner0 = v0[axis] + f64::from(index0[axis]) * step[axis];
            let corner1 = v1[axis] + f64::from(index1[axis]) * step[axis];
            corner0.min(corner1)
        })
        .collect();

    // A grid element naming the lattice's own universe would nest the
    // lattice inside itself; it becomes a fresh single-cell universe
    // carrying the cell's material instead.
    if grid.contains(universe_id) {
        let mut aux = Cell::new(cell_ids.allocate());
        if let Some(material) = materials.lookup(record.material, record.density) {
            aux.fill = CellFill::Material(material);
        }
        let aux_universe = universes.insert_auto();
        universes.add_cell(aux_universe, aux)?;
        grid.replace(universe_id, aux_universe);
    }

    // Element placement assumes the unit cell is centered on the origin.
    // When it is not, every grid universe is wrapped in one whose single
    // cell shifts it back.
    let center = (v0 + v1) / 2.0;
    if center != Vector3::zeros() {
        for id in grid.distinct() {
            universes.ensure(id);
            let mut wrapper = Cell::new(cell_ids.allocate());
            wrapper.fill = CellFill::Universe(id);
            wrapper.translation = Some(-center);
            let wrapped = universes.insert_auto();
            universes.add_cell(wrapped, wrapper)?;
            grid.replace(id, wrapped);
        }
    }

    for id in grid.distinct() {
        universes.ensure(id);
    }
    let outer = infinite.then(|| grid.get(0, 0, 0));

    universes.insert(Universe::Lattice(RectLattice {
        id: universe_id,
        pitch,
        lower_left,
        shape,
        grid,
        outer,
    }));
    Ok(())
}

/// Per-axis offsets of the two bounding planes, first listed first. The
/// region must be a flat intersection whose axis planes pair up on x and y;
/// a missing z pair makes the lattice two-dimensional.
fn bounding_planes(
    record: &CellRecord,
    region: &Region,
    surfaces: &SurfaceTable,
) -> Result<(Vector3<f64>, Vector3<f64>, bool)> {
    let operands = region.operands();
    if operands.len() < 4 {
        return Err(ConvertError::unsupported(format!(
            "one-dimensional lattice on cell {}",
            record.id
        )));
    }
    let mut sides: [Vec<f64>; 3] = [Vec::new(), Vec::new(), Vec::new()];
    for operand in operands {
        let Region::Halfspace { surface, .. } = operand else {
            return Err(ConvertError::unsupported(format!(
                "lattice cell {} bounded by a nested region",
                record.id
            )));
        };
        if let Some(SurfaceKind::AxisPlane { axis, offset }) =
            surfaces.get(*surface).map(|surface| &surface.kind)
        {
            sides[axis.index()].push(*offset);
        }
    }
    for (axis, offsets) in sides.iter().enumerate() {
        if offsets.len() > 2 {
            return Err(ConvertError::unsupported(format!(
                "lattice on cell {} with more than two bounding planes on the {} axis",
                record.id,
                ["x", "y", "z"][axis]
            )));
        }
    }
    if sides[0].len() != 2 || sides[1].len() != 2 {
        return Err(ConvertError::unsupported(format!(
            "lattice on cell {} with basis other than x-y",
            record.id
        )));
    }
    let two_d = sides[2].is_empty();
    if !two_d && sides[2].len() != 2 {
        return Err(ConvertError::unsupported(format!(
            "lattice on cell {} with a single z bounding plane",
            record.id
        )));
    }
    let third = |index: usize| if two_d { 0.0 } else { sides[2][index] };
    let v1 = Vector3::new(sides[0][0], sides[1][0], third(0));
    let v0 = Vector3::new(sides[0][1], sides[1][1], third(1));
    Ok((v0, v1, two_d))
}
