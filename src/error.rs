// SPDX-License-Identifier: Apache-2.0
// Copyright (c) 2026 Mcbridge Team

//! Conversion error types

use thiserror::Error;

/// Result alias used throughout the resolution pipeline
pub type Result<T> = std::result::Result<T, ConvertError>;

/// Fatal conversion failures. Every variant carries the offending id so the
/// caller can point back at the input deck; there is no partial output.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum ConvertError {
    /// Geometry the output model cannot represent (unknown mnemonics,
    /// hexagonal lattices, off-axis torus rotations, ...)
    #[error("unsupported construct: {0}")]
    UnsupportedConstruct(String),

    /// Region, fill or transform text that fails to parse or validate
    #[error("{context}: malformed expression `{expression}`: {reason}")]
    MalformedExpression {
        context: String,
        expression: String,
        reason: String,
    },

    /// Cell complement pointing at a cell that never resolves
    #[error("cell {cell}: cannot resolve nested cell complement of cell {reference}")]
    UnresolvableReference { cell: u32, reference: u32 },

    /// Surface coefficients that describe no valid surface
    #[error("surface {surface}: degenerate surface coefficients")]
    GeometricDegeneracy { surface: u32 },
}

impl ConvertError {
    /// Shorthand for [`ConvertError::MalformedExpression`]
    pub fn malformed(
        context: impl Into<String>,
        expression: impl Into<String>,
        reason: impl Into<String>,
    ) -> Self {
        ConvertError::MalformedExpression {
            context: context.into(),
            expression: expression.into(),
            reason: reason.into(),
        }
    }

    /// Shorthand for [`ConvertError::UnsupportedConstruct`]
    pub fn unsupported(what: impl Into<String>) -> Self {
        ConvertError::UnsupportedConstruct(what.into())
    }
}
