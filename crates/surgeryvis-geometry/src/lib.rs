//! # Surgeryvis Geometry
//!
//! CPU-side geometry construction for lattice-surgery schedules.
//!
//! ## Features
//! - Face builder shared by every box generator
//! - Fixed-capacity batched box accumulator with trim-on-finish
//! - Subdivided boxes with normals, UVs and per-face material groups
//! - Chunked line-segment batches for defect graphs

pub mod accumulator;
pub mod face;
pub mod lines;
pub mod mesh;
pub mod segmented;

pub use accumulator::{BoxMeshAccumulator, MAX_VERTICES, VERTICES_PER_FACE};
pub use face::{BoxFace, FaceMask, FaceQuad, FaceSpec, build_face};
pub use lines::{LineBatch, LineChunks};
pub use mesh::{FinalizedMesh, Group};
pub use segmented::{BoxParameters, SegmentedBoxGeometry};

use surgeryvis_core::BufferFull;
use thiserror::Error;

/// Geometry construction errors
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum GeometryError {
    #[error("box needs {requested} vertices, {remaining} of {capacity} remain")]
    CapacityExceeded {
        requested: usize,
        remaining: usize,
        capacity: usize,
    },

    #[error("accumulator capacity {0} exceeds the u32 index range")]
    InvalidCapacity(usize),

    #[error("geometry buffers were already handed out")]
    UseAfterFinalize,

    #[error("line chunks must hold at least 2 vertices, got {0}")]
    InvalidChunkSize(usize),
}

impl From<BufferFull> for GeometryError {
    fn from(err: BufferFull) -> Self {
        GeometryError::CapacityExceeded {
            requested: err.requested,
            remaining: err.remaining,
            capacity: err.capacity,
        }
    }
}

/// Result type for geometry operations
pub type GeometryResult<T> = Result<T, GeometryError>;
