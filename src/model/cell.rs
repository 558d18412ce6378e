// SPDX-License-Identifier: Apache-2.0
// Copyright (c) 2026 Mcbridge Team

//! Resolved cells

use nalgebra::{Matrix3, Vector3};
use serde::{Deserialize, Serialize};

use crate::geometry::Region;

/// What occupies a cell's volume.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub enum CellFill {
    Void,
    Material(u32),
    Universe(u32),
}

/// A cell with its resolved region. Auxiliary cells generated during lattice
/// construction span their whole universe and carry no region.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Cell {
    pub id: u32,
    pub region: Option<Region>,
    pub fill: CellFill,
    /// Displacement applied to the filling universe.
    pub translation: Option<Vector3<f64>>,
    /// Rotation applied to the filling universe.
    pub rotation: Option<Matrix3<f64>>,
    pub volume: Option<f64>,
}

impl Cell {
    pub fn new(id: u32) -> Self {
        Cell {
            id,
            region: None,
            fill: CellFill::Void,
            translation: None,
            rotation: None,
            volume: None,
        }
    }
}
