//! Mesh buffers
//!
//! Exactly-sized, renderer-ready buffers produced by the builders.

use serde::{Deserialize, Serialize};
use surgeryvis_core::{BoundsTracker, Vec3};

/// A contiguous run of indices drawn with one material
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Group {
    /// First index of the run
    pub start: u32,
    /// Number of indices in the run
    pub count: u32,
    /// Material slot used for the run
    pub material_slot: u32,
}

/// Flat position and index buffers trimmed to their used length
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct FinalizedMesh {
    /// Position triples
    pub positions: Vec<f32>,
    /// Triangle (or line) indices
    pub indices: Vec<u32>,
}

impl FinalizedMesh {
    /// Number of vertices
    pub fn vertex_count(&self) -> usize {
        self.positions.len() / 3
    }

    /// Number of indices
    pub fn index_count(&self) -> usize {
        self.indices.len()
    }

    /// Number of triangles when the indices describe a triangle list
    pub fn triangle_count(&self) -> usize {
        self.indices.len() / 3
    }

    /// Check if the mesh has no vertex
    pub fn is_empty(&self) -> bool {
        self.positions.is_empty()
    }

    /// Vertex position at `index`
    pub fn vertex(&self, index: usize) -> Option<Vec3> {
        let start = index.checked_mul(3)?;
        let xyz = self.positions.get(start..start + 3)?;
        Some(Vec3::from_slice(xyz))
    }

    /// Iterate over all vertex positions
    pub fn vertices(&self) -> impl Iterator<Item = Vec3> + '_ {
        self.positions.chunks_exact(3).map(Vec3::from_slice)
    }

    /// Envelope of every vertex
    pub fn bounds(&self) -> BoundsTracker {
        BoundsTracker::from_points(self.vertices())
    }

    /// Bytes held by the position and index buffers
    pub fn byte_size(&self) -> usize {
        std::mem::size_of_val(self.positions.as_slice())
            + std::mem::size_of_val(self.indices.as_slice())
    }

    /// Per-vertex normals of a triangle list, each equal to the normal of
    /// the triangle it belongs to.
    ///
    /// Vertices are never shared between triangles in the batched buffers,
    /// so no averaging happens. Degenerate triangles get a zero normal.
    pub fn flat_normals(&self) -> Vec<f32> {
        let mut normals = vec![0.0; self.positions.len()];

        for triangle in self.indices.chunks_exact(3) {
            let corners = [triangle[0], triangle[1], triangle[2]]
                .map(|i| self.vertex(i as usize));
            let [Some(a), Some(b), Some(c)] = corners else {
                continue;
            };
            let normal = (b - a).cross(c - a).normalize_or_zero();
            for &i in triangle {
                let start = i as usize * 3;
                normals[start..start + 3].copy_from_slice(&normal.to_array());
            }
        }

        normals
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn triangle() -> FinalizedMesh {
        FinalizedMesh {
            positions: vec![0.0, 0.0, 0.0, 1.0, 0.0, 0.0, 0.0, 1.0, 0.0],
            indices: vec![0, 1, 2],
        }
    }

    #[test]
    fn test_counts() {
        let mesh = triangle();
        assert_eq!(mesh.vertex_count(), 3);
        assert_eq!(mesh.triangle_count(), 1);
        assert_eq!(mesh.byte_size(), 9 * 4 + 3 * 4);
        assert_eq!(mesh.vertex(1), Some(Vec3::X));
        assert_eq!(mesh.vertex(3), None);
    }

    #[test]
    fn test_flat_normals() {
        let normals = triangle().flat_normals();
        assert_eq!(normals, vec![0.0, 0.0, 1.0, 0.0, 0.0, 1.0, 0.0, 0.0, 1.0]);
    }

    #[test]
    fn test_flat_normals_degenerate() {
        let mesh = FinalizedMesh {
            positions: vec![0.0; 9],
            indices: vec![0, 1, 2],
        };
        assert_eq!(mesh.flat_normals(), vec![0.0; 9]);
    }

    #[test]
    fn test_bounds() {
        let bounds = triangle().bounds();
        assert_eq!(bounds.min(), Vec3::ZERO);
        assert_eq!(bounds.max(), Vec3::new(1.0, 1.0, 0.0));
        assert!(FinalizedMesh::default().bounds().is_empty());
    }
}
