// SPDX-License-Identifier: Apache-2.0
// Copyright (c) 2026 Mcbridge Team

//! Geometry module - surfaces, half-space regions and affine transforms

pub(crate) mod parser;
mod region;
mod surface;
pub mod transform;

pub use region::Region;
pub use surface::{Axis, Boundary, CompositeSurface, Surface, SurfaceClass, SurfaceKind};
