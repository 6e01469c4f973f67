//! # Surgeryvis Scene
//!
//! Turns lattice-surgery schedules into renderer resources.
//!
//! ## Features
//! - Serde descriptors for box, plumbing-piece, defect and lattice schedules
//! - Scene builders staging batched meshes and line chunks per layer
//! - A `RenderBackend` seam with an in-memory headless backend
//! - Scoped rebuild cycles that never leak uploaded meshes across frames

pub mod backend;
pub mod builders;
pub mod lifecycle;
pub mod schedule;

pub use backend::{
    HeadlessBackend, HeadlessError, Layer, MeshHandle, MeshPayload, Primitive, RenderBackend,
    ResidentMesh, SurfaceStyle,
};
pub use builders::{DefectBatches, StagedScene};
pub use lifecycle::{FrameSummary, LiveMesh, RebuildCycle, SceneLifecycleManager};
pub use schedule::{BoxSchedule, DefectGraph, DefectScene, LatticeLayout, PlumbingSchedule};

use surgeryvis_geometry::GeometryError;
use thiserror::Error;

/// Scene errors
#[derive(Error, Debug)]
pub enum SceneError {
    #[error(transparent)]
    Geometry(#[from] GeometryError),

    #[error("box type {0} is not defined in the schedule")]
    UnknownBoxType(u32),

    #[error("reference {reference} is out of range for {nodes} entries")]
    DanglingNode { reference: usize, nodes: usize },

    #[error("link references unknown cell {0}")]
    UnknownCell(u64),

    #[error("render backend failed: {0}")]
    Backend(#[source] Box<dyn std::error::Error + Send + Sync>),

    #[error("invalid schedule JSON: {0}")]
    Json(#[from] serde_json::Error),
}

impl SceneError {
    /// Wrap a backend error
    pub fn backend(err: impl std::error::Error + Send + Sync + 'static) -> Self {
        SceneError::Backend(Box::new(err))
    }

    /// Whether a batched accumulator ran out of room
    pub fn is_capacity_exceeded(&self) -> bool {
        matches!(
            self,
            SceneError::Geometry(GeometryError::CapacityExceeded { .. })
        )
    }
}

/// Result type for scene operations
pub type SceneResult<T> = Result<T, SceneError>;
