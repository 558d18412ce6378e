// SPDX-License-Identifier: Apache-2.0
// Copyright (c) 2026 Mcbridge Team

//! Conversion module - the resolution pipeline
//!
//! Four passes turn parsed records into a resolved model: the surface
//! builder types every surface card, the region resolver turns cell text
//! into boolean trees and may add transformed surfaces, the canonicalizer
//! folds duplicate surfaces onto one id, and universe population places
//! cells and constructs lattices.

mod cells;
pub mod dedup;
mod lattice;
pub(crate) mod surfaces;

use serde::{Deserialize, Serialize};

use crate::error::Result;
use crate::model::{CsgModel, MaterialTable, UniverseTable};
use crate::record::ModelRecords;

pub use dedup::{
    default_comparator, find_identical_surfaces, find_identical_surfaces_with, SurfaceEquivalence,
    SurfaceMatch,
};

/// Pipeline switches.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ConvertOptions {
    /// Fold surfaces describing the same locus onto one id before regions
    /// materialize. Disabling it yields an equivalent model with more
    /// surfaces.
    pub merge_surfaces: bool,
}

impl Default for ConvertOptions {
    fn default() -> Self {
        ConvertOptions {
            merge_surfaces: true,
        }
    }
}

/// Resolve a parsed deck into a complete model rooted at universe 0.
pub fn convert_model(records: &ModelRecords, options: &ConvertOptions) -> Result<CsgModel> {
    let mut surfaces = surfaces::build_surface_table(&records.surfaces, &records.transforms)?;
    let mut resolved = cells::resolve_cell_regions(&records.cells, &mut surfaces)?;

    if options.merge_surfaces {
        let equivalence = find_identical_surfaces(&surfaces);
        for cell in resolved.values_mut() {
            cell.region = cell
                .region
                .remapped(&|signed| equivalence.lookup_signed(signed));
        }
    }
    surfaces::reduce_axis_planes(&mut surfaces);

    let materials = MaterialTable::from_cells(&records.cells);
    let mut universes = UniverseTable::new();
    cells::populate_universes(
        &records.cells,
        &resolved,
        &mut surfaces,
        &materials,
        &records.transforms,
        &mut universes,
    )?;

    let root = universes.root();
    Ok(CsgModel {
        surfaces,
        universes,
        materials,
        root,
    })
}
