// SPDX-License-Identifier: Apache-2.0
// Copyright (c) 2026 Mcbridge Team

//! Mcbridge geometry resolution engine
//!
//! Resolves an MCNP-style constructive-solid-geometry description into a
//! fully resolved model: a typed surface table, boolean cell regions, nested
//! universes and rectangular lattices. The deck parser and the exporter live
//! outside this crate; it consumes their [`record::ModelRecords`] and hands
//! back a [`model::CsgModel`] rooted at universe 0.

pub mod convert;
pub mod error;
pub mod geometry;
pub mod model;
pub mod record;

pub use convert::{convert_model, ConvertOptions, SurfaceEquivalence};
pub use error::ConvertError;
pub use geometry::{Axis, Boundary, Region, Surface, SurfaceKind};
pub use model::{Cell, CellFill, CsgModel, Material, RectLattice, Universe};
pub use record::{CellRecord, ModelRecords, SurfaceRecord, Transform};

use anyhow::{Context, Result};

/// Resolve a parsed deck with default options.
pub fn resolve(records: &ModelRecords) -> Result<CsgModel> {
    resolve_with_options(records, &ConvertOptions::default())
}

/// Resolve a parsed deck. The typed [`ConvertError`] stays recoverable
/// through a downcast.
pub fn resolve_with_options(records: &ModelRecords, options: &ConvertOptions) -> Result<CsgModel> {
    convert_model(records, options).context("failed to resolve geometry")
}
