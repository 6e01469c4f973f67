//! # Surgeryvis Core
//!
//! Foundations for the lattice-surgery schedule viewer.
//!
//! This crate provides the pieces shared by geometry construction and the scene:
//! - **Math**: glam vectors, axes and the running bounding-box tracker
//! - **Memory**: fixed-capacity buffers with trim-on-finish and memory stats
//! - **Config**: capacities, plumbing-piece sizes and draw options

pub mod math;
pub mod memory;

pub use math::{Axis, BoundsTracker, BoxDescriptor, Vec3};
pub use memory::{BoundedBuffer, BufferFull, MemoryStats};

use bitflags::bitflags;
use serde::{Deserialize, Serialize};

/// Default vertex capacity of a batched box accumulator
pub const DEFAULT_ACCUMULATOR_CAPACITY: usize = 500_000;

/// Default number of vertices per line-segment buffer chunk
pub const DEFAULT_LINE_CHUNK_VERTICES: usize = 4_000_000;

bitflags! {
    /// Which parts of a defect scene get attached to the renderer
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
    pub struct DrawOptions: u8 {
        const BOXES = 0b0_0001;
        const GEOMETRY = 0b0_0010;
        const PRIMALS = 0b0_0100;
        const DUALS = 0b0_1000;
        const DEBUG = 0b1_0000;
    }
}

impl DrawOptions {
    /// Parse a `noboxes&nogeom&noprimals&noduals` style query string.
    ///
    /// A parameter without a value, or with a non-empty value, switches its
    /// part off. `debug` switches the debug lattices on. Unknown parameters
    /// are ignored.
    pub fn from_query(query: &str) -> Self {
        let mut options = Self::default();
        let query = query.strip_prefix('?').unwrap_or(query);

        for param in query.split('&').filter(|p| !p.is_empty()) {
            let (name, enabled) = match param.split_once('=') {
                Some((name, value)) => (name, !value.is_empty()),
                None => (param, true),
            };
            if !enabled {
                continue;
            }

            match name {
                "noboxes" => options.remove(Self::BOXES),
                "nogeom" => options.remove(Self::GEOMETRY),
                "noprimals" => options.remove(Self::PRIMALS),
                "noduals" => options.remove(Self::DUALS),
                "debug" => options.insert(Self::DEBUG),
                other => log::debug!("ignoring unknown draw option '{}'", other),
            }
        }

        options
    }
}

impl Default for DrawOptions {
    fn default() -> Self {
        Self::BOXES | Self::GEOMETRY | Self::PRIMALS | Self::DUALS
    }
}

/// Sizes used when expanding a plumbing-piece descriptor into boxes
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PlumbingConfig {
    /// Edge length of the unit bounding box of a piece
    pub unit_size: f32,
    /// Edge length of the primal/dual core box
    pub core_size: f32,
    /// Length of an arm along its axis
    pub arm_length: f32,
    /// Shift of an arm away from the core along its axis
    pub arm_offset: f32,
    /// Shift of the dual core from the piece origin on every axis
    pub dual_offset: f32,
}

impl Default for PlumbingConfig {
    fn default() -> Self {
        Self {
            unit_size: 1.0,
            core_size: 0.3,
            arm_length: 0.7,
            arm_offset: 0.3,
            dual_offset: 0.5,
        }
    }
}

/// Viewer configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct VisualiserConfig {
    /// Maximum vertices per batched box accumulator
    pub accumulator_capacity: usize,
    /// Maximum vertices per line-segment buffer chunk
    pub line_chunk_vertices: usize,
    /// Edge length of a plumbing piece in lattice units, used for reporting
    pub piece_unit: f32,
    /// Plumbing-piece box sizes
    pub plumbing: PlumbingConfig,
    /// Parts of the scene to attach
    pub draw: DrawOptions,
}

impl Default for VisualiserConfig {
    fn default() -> Self {
        Self {
            accumulator_capacity: DEFAULT_ACCUMULATOR_CAPACITY,
            line_chunk_vertices: DEFAULT_LINE_CHUNK_VERTICES,
            piece_unit: 6.0,
            plumbing: PlumbingConfig::default(),
            draw: DrawOptions::default(),
        }
    }
}
