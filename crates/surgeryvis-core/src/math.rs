//! Math utilities
//!
//! Re-exports from glam plus the axis and bounding-volume types shared by the
//! geometry builders and the scene.

pub use glam::Vec3;

use serde::{Deserialize, Serialize};

/// One of the three coordinate axes
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Axis {
    X,
    Y,
    Z,
}

impl Axis {
    /// All axes in component order
    pub const ALL: [Axis; 3] = [Axis::X, Axis::Y, Axis::Z];

    /// Component index of this axis in a `Vec3`
    pub const fn index(self) -> usize {
        match self {
            Axis::X => 0,
            Axis::Y => 1,
            Axis::Z => 2,
        }
    }

    /// Unit vector along this axis
    pub fn unit(self) -> Vec3 {
        match self {
            Axis::X => Vec3::X,
            Axis::Y => Vec3::Y,
            Axis::Z => Vec3::Z,
        }
    }
}

/// An axis-aligned box given by its minimum corner and its extents.
///
/// Extents may be zero or negative; callers use a negative extent to request
/// inward-facing geometry.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct BoxDescriptor {
    /// Minimum corner
    pub position: Vec3,
    /// Width, height and depth
    pub dimensions: Vec3,
}

impl BoxDescriptor {
    /// Create a descriptor from a corner and extents
    pub fn new(position: Vec3, dimensions: Vec3) -> Self {
        Self {
            position,
            dimensions,
        }
    }

    /// Centre of the box
    pub fn center(&self) -> Vec3 {
        self.position + self.dimensions * 0.5
    }

    /// Corner opposite to `position`
    pub fn max(&self) -> Vec3 {
        self.position + self.dimensions
    }
}

/// Running axis-aligned bounding box over every point fed to it.
///
/// Each axis is tracked independently, so `min` and `max` describe the union
/// envelope rather than corners of any single inserted point. The tracker
/// never shrinks until [`BoundsTracker::reset`] is called.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct BoundsTracker {
    min: Vec3,
    max: Vec3,
}

impl BoundsTracker {
    /// Tracker that has not seen any point yet
    pub const EMPTY: Self = Self {
        min: Vec3::splat(f32::INFINITY),
        max: Vec3::splat(f32::NEG_INFINITY),
    };

    /// Create an empty tracker
    pub fn new() -> Self {
        Self::EMPTY
    }

    /// Create a tracker that already contains all given points
    pub fn from_points(points: impl IntoIterator<Item = Vec3>) -> Self {
        let mut bounds = Self::EMPTY;
        for point in points {
            bounds.update(point);
        }
        bounds
    }

    /// Grow the envelope to include a point
    pub fn update(&mut self, point: Vec3) {
        self.min = self.min.min(point);
        self.max = self.max.max(point);
    }

    /// Forget every tracked point
    pub fn reset(&mut self) {
        *self = Self::EMPTY;
    }

    /// Merge another tracker into this one
    pub fn union(&mut self, other: &BoundsTracker) {
        self.min = self.min.min(other.min);
        self.max = self.max.max(other.max);
    }

    /// Check whether no point has been tracked
    pub fn is_empty(&self) -> bool {
        self.min.x > self.max.x || self.min.y > self.max.y || self.min.z > self.max.z
    }

    /// Minimum corner of the envelope
    pub fn min(&self) -> Vec3 {
        self.min
    }

    /// Maximum corner of the envelope
    pub fn max(&self) -> Vec3 {
        self.max
    }

    /// Full extents of the envelope
    pub fn size(&self) -> Vec3 {
        self.max - self.min
    }

    /// Centre of the envelope
    pub fn center(&self) -> Vec3 {
        (self.min + self.max) * 0.5
    }

    /// Check if a point lies inside the envelope
    pub fn contains_point(&self, point: Vec3) -> bool {
        point.cmpge(self.min).all() && point.cmple(self.max).all()
    }

    /// The minimal box enclosing every tracked point, or `None` when empty
    pub fn to_box_descriptor(&self) -> Option<BoxDescriptor> {
        if self.is_empty() {
            return None;
        }
        Some(BoxDescriptor::new(self.min, self.size()))
    }
}

impl Default for BoundsTracker {
    fn default() -> Self {
        Self::EMPTY
    }
}
