// SPDX-License-Identifier: Apache-2.0
// Copyright (c) 2026 Mcbridge Team

//! Model module - resolved cells, universes, materials and their tables

mod cell;
mod material;
mod registry;
mod universe;

pub use cell::{Cell, CellFill};
pub use material::{DensityUnits, Material, MaterialTable};
pub use registry::{IdAllocator, SurfaceTable, UniverseTable};
pub use universe::{CellUniverse, LatticeGrid, RectLattice, Universe};

use serde::{Deserialize, Serialize};

/// A fully resolved constructive-solid-geometry model.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CsgModel {
    pub surfaces: SurfaceTable,
    pub universes: UniverseTable,
    pub materials: MaterialTable,
    /// Id of the top-level universe.
    pub root: u32,
}
