//! Multi-segment box geometry
//!
//! A standalone box centred at the origin whose faces are subdivided into
//! grids, with per-vertex normals and UVs and one draw group per face so each
//! face can use its own material.

use serde::{Deserialize, Serialize};
use surgeryvis_core::Vec3;

use crate::face::{BoxFace, FaceMask, cell_triangles, grid_points};
use crate::mesh::Group;

/// Construction parameters after defaults have been applied
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct BoxParameters {
    /// Width, height and depth
    pub dimensions: Vec3,
    /// Segments along width, height and depth
    pub segments: [u32; 3],
    /// Faces that were generated
    pub faces: FaceMask,
}

/// Subdivided box with normals, UVs and per-face groups
#[derive(Debug, Clone, PartialEq)]
pub struct SegmentedBoxGeometry {
    parameters: BoxParameters,
    positions: Vec<f32>,
    normals: Vec<f32>,
    uvs: Vec<f32>,
    indices: Vec<u32>,
    groups: Vec<Group>,
}

fn extent_or_unit(extent: f32) -> f32 {
    if extent == 0.0 || extent.is_nan() {
        1.0
    } else {
        extent
    }
}

impl SegmentedBoxGeometry {
    /// Build the faces selected by `mask`.
    ///
    /// Unlike the batched accumulator, an empty mask here means every face.
    /// Zero (or NaN) extents fall back to 1 and zero segment counts to 1;
    /// negative extents are kept and turn the affected faces inward.
    pub fn new(mask: FaceMask, dimensions: Vec3, segments: [u32; 3]) -> Self {
        let faces = if mask.is_empty() { FaceMask::ALL } else { mask };
        let dimensions = Vec3::new(
            extent_or_unit(dimensions.x),
            extent_or_unit(dimensions.y),
            extent_or_unit(dimensions.z),
        );
        let segments = segments.map(|s| s.max(1));

        let (vertex_total, index_total) = faces.faces().fold((0, 0), |(v, i), face| {
            let (gx, gy) = face.segments(segments);
            let (gx, gy) = (gx as usize, gy as usize);
            (v + (gx + 1) * (gy + 1), i + gx * gy * 6)
        });

        let mut geometry = Self {
            parameters: BoxParameters {
                dimensions,
                segments,
                faces,
            },
            positions: Vec::with_capacity(vertex_total * 3),
            normals: Vec::with_capacity(vertex_total * 3),
            uvs: Vec::with_capacity(vertex_total * 2),
            indices: Vec::with_capacity(index_total),
            groups: Vec::with_capacity(faces.face_count()),
        };

        for face in faces.faces() {
            geometry.build_plane(face);
        }

        geometry
    }

    /// Build a box with every face
    pub fn all_faces(dimensions: Vec3, segments: [u32; 3]) -> Self {
        Self::new(FaceMask::ALL, dimensions, segments)
    }

    fn build_plane(&mut self, face: BoxFace) {
        let spec = face.spec();
        let extents = face.extents(self.parameters.dimensions);
        let (grid_x, grid_y) = face.segments(self.parameters.segments);
        let row_width = grid_x as usize + 1;
        let vertex_offset = self.vertex_count() as u32;
        let normal = spec.normal(extents.2);
        let group_start = self.indices.len() as u32;

        for (ix, iy, point) in grid_points(Vec3::ZERO, spec, extents, grid_x, grid_y) {
            self.positions.extend_from_slice(&point.to_array());
            self.normals.extend_from_slice(&normal.to_array());
            self.uvs.push(ix as f32 / grid_x as f32);
            self.uvs.push(1.0 - iy as f32 / grid_y as f32);
        }

        for iy in 0..grid_y as usize {
            for ix in 0..grid_x as usize {
                for triangle in cell_triangles(ix, iy, row_width) {
                    self.indices
                        .extend(triangle.map(|corner| vertex_offset + corner as u32));
                }
            }
        }

        self.groups.push(Group {
            start: group_start,
            count: self.indices.len() as u32 - group_start,
            material_slot: face.slot(),
        });
    }

    /// Parameters the box was built with
    pub fn parameters(&self) -> &BoxParameters {
        &self.parameters
    }

    /// Position triples
    pub fn positions(&self) -> &[f32] {
        &self.positions
    }

    /// Normal triples
    pub fn normals(&self) -> &[f32] {
        &self.normals
    }

    /// UV pairs
    pub fn uvs(&self) -> &[f32] {
        &self.uvs
    }

    /// Triangle indices
    pub fn indices(&self) -> &[u32] {
        &self.indices
    }

    /// One group per generated face
    pub fn groups(&self) -> &[Group] {
        &self.groups
    }

    /// Number of vertices
    pub fn vertex_count(&self) -> usize {
        self.positions.len() / 3
    }

    /// Number of triangles
    pub fn triangle_count(&self) -> usize {
        self.indices.len() / 3
    }

    /// Take the buffers as `(positions, normals, uvs, indices, groups)`
    pub fn into_parts(self) -> (Vec<f32>, Vec<f32>, Vec<f32>, Vec<u32>, Vec<Group>) {
        (
            self.positions,
            self.normals,
            self.uvs,
            self.indices,
            self.groups,
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use surgeryvis_core::BoundsTracker;

    #[test]
    fn test_zero_mask_means_all_faces() {
        let geometry = SegmentedBoxGeometry::new(FaceMask::empty(), Vec3::ONE, [1, 1, 1]);
        assert_eq!(geometry.parameters().faces, FaceMask::ALL);
        assert_eq!(geometry.groups().len(), 6);
        assert_eq!(geometry.vertex_count(), 24);
        assert_eq!(geometry.triangle_count(), 12);
    }

    #[test]
    fn test_segment_counts() {
        let geometry = SegmentedBoxGeometry::new(FaceMask::POS_Z, Vec3::ONE, [2, 3, 1]);
        // +Z uses width and height segments
        assert_eq!(geometry.vertex_count(), 3 * 4);
        assert_eq!(geometry.triangle_count(), 2 * 3 * 2);
        assert_eq!(
            geometry.groups(),
            &[Group {
                start: 0,
                count: 36,
                material_slot: 4
            }]
        );
    }

    #[test]
    fn test_groups_are_contiguous() {
        let geometry = SegmentedBoxGeometry::all_faces(Vec3::new(1.0, 2.0, 3.0), [2, 1, 3]);
        let mut expected_start = 0;
        for (slot, group) in geometry.groups().iter().enumerate() {
            assert_eq!(group.start, expected_start);
            assert_eq!(group.material_slot, slot as u32);
            expected_start += group.count;
        }
        assert_eq!(expected_start as usize, geometry.indices().len());
    }

    #[test]
    fn test_indices_offset_per_face() {
        let mask = FaceMask::POS_X | FaceMask::NEG_X;
        let geometry = SegmentedBoxGeometry::new(mask, Vec3::ONE, [1, 1, 1]);
        assert_eq!(geometry.indices(), &[0, 2, 1, 2, 3, 1, 4, 6, 5, 6, 7, 5]);
    }

    #[test]
    fn test_normals_and_uvs() {
        let geometry = SegmentedBoxGeometry::new(FaceMask::NEG_Y, Vec3::ONE, [1, 1, 1]);
        for normal in geometry.normals().chunks_exact(3) {
            assert_eq!(normal, &[0.0, -1.0, 0.0]);
        }
        assert_eq!(geometry.uvs(), &[0.0, 1.0, 1.0, 1.0, 0.0, 0.0, 1.0, 0.0]);
    }

    #[test]
    fn test_negative_depth_flips_normal() {
        let outward = SegmentedBoxGeometry::new(FaceMask::POS_Z, Vec3::ONE, [1, 1, 1]);
        let flipped = Vec3::new(1.0, 1.0, -1.0);
        let inward = SegmentedBoxGeometry::new(FaceMask::POS_Z, flipped, [1, 1, 1]);

        assert_eq!(&outward.normals()[..3], &[0.0, 0.0, 1.0]);
        assert_eq!(&inward.normals()[..3], &[0.0, 0.0, -1.0]);
        assert_eq!(outward.indices(), inward.indices());
    }

    #[test]
    fn test_defaults_for_zero_inputs() {
        let flat = Vec3::new(0.0, 2.0, 0.0);
        let geometry = SegmentedBoxGeometry::new(FaceMask::ALL, flat, [0, 0, 0]);
        assert_eq!(geometry.parameters().dimensions, Vec3::new(1.0, 2.0, 1.0));
        assert_eq!(geometry.parameters().segments, [1, 1, 1]);
    }

    #[test]
    fn test_centred_at_origin() {
        let geometry = SegmentedBoxGeometry::all_faces(Vec3::new(2.0, 4.0, 6.0), [3, 2, 1]);
        let (positions, normals, uvs, indices, groups) = geometry.into_parts();
        let bounds = BoundsTracker::from_points(positions.chunks_exact(3).map(Vec3::from_slice));
        assert_eq!(bounds.min(), Vec3::new(-1.0, -2.0, -3.0));
        assert_eq!(bounds.max(), Vec3::new(1.0, 2.0, 3.0));
        assert_eq!(normals.len(), positions.len());
        assert_eq!(uvs.len() / 2, positions.len() / 3);
        assert_eq!(groups.len(), 6);
        assert!(indices.iter().all(|&i| (i as usize) < positions.len() / 3));
    }
}
