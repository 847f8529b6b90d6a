// src/error.rs

use thiserror::Error;

/// Errors surfaced by the conflict detection core.
///
/// Geometric negatives inside conflict detection (stationary agents,
/// parallel motion, diverging agents, past closest-approach) are normal
/// no-conflict results, never errors. Unavailable interpolation is `None`.
#[derive(Debug, Error)]
pub enum ConflictError {
    /// Malformed input the caller must fix, e.g. a point quad that does
    /// not contain exactly 4 coordinate pairs.
    #[error("invalid {argument}: {reason}")]
    Validation {
        argument: &'static str,
        reason: String,
    },

    /// Singular or non-invertible homography, zero homogeneous coordinate,
    /// or a point selection that cannot be canonicalized. The caller must
    /// supply a better point selection.
    #[error("degenerate geometry: {reason}")]
    DegenerateGeometry { reason: String },

    /// A read accessor was called before any trajectory data was collected.
    #[error("no trajectory data collected; call collect() first")]
    NotReady,

    /// A minimum-TTC query was made for a pair that was never analyzed.
    #[error("pair ({a}, {b}) has not been analyzed; run analyze_all() first")]
    UnknownPair { a: u32, b: u32 },
}

impl ConflictError {
    pub fn kind(&self) -> &'static str {
        match self {
            ConflictError::Validation { .. } => "validation",
            ConflictError::DegenerateGeometry { .. } => "degenerate_geometry",
            ConflictError::NotReady => "not_ready",
            ConflictError::UnknownPair { .. } => "unknown_pair",
        }
    }
}
