//! Batched box accumulator
//!
//! Packs the faces of many boxes into one pair of flat position/index
//! buffers so a whole schedule draws in a single call. Storage is reserved
//! once for a known vertex budget; every vertex is emitted separately and
//! indexed by its own position, so `indices[k] == k` always holds.

use surgeryvis_core::{BoundedBuffer, BoundsTracker, BoxDescriptor, Vec3};

use crate::face::{FaceMask, build_face};
use crate::mesh::FinalizedMesh;
use crate::{GeometryError, GeometryResult};

/// Vertices (and indices) emitted per box face: two triangles, no sharing
pub const VERTICES_PER_FACE: usize = 6;

/// Largest vertex budget whose indices still fit in `u32`
pub const MAX_VERTICES: usize = u32::MAX as usize;

/// Fixed-capacity builder for batched box geometry
#[derive(Debug)]
pub struct BoxMeshAccumulator {
    /// Position triples, capacity `3 * max_vertices`
    positions: BoundedBuffer<f32>,
    /// One index per vertex, capacity `max_vertices`
    indices: BoundedBuffer<u32>,
    /// Envelope of every emitted vertex
    bounds: BoundsTracker,
    /// Set once the buffers have been handed out
    finished: bool,
}

impl BoxMeshAccumulator {
    /// Create an accumulator holding at most `max_vertices` vertices.
    ///
    /// Budgets above [`MAX_VERTICES`] are rejected with `InvalidCapacity`.
    pub fn new(max_vertices: usize) -> GeometryResult<Self> {
        let position_slots = max_vertices
            .checked_mul(3)
            .filter(|_| max_vertices <= MAX_VERTICES)
            .ok_or(GeometryError::InvalidCapacity(max_vertices))?;

        Ok(Self {
            positions: BoundedBuffer::new(position_slots),
            indices: BoundedBuffer::new(max_vertices),
            bounds: BoundsTracker::new(),
            finished: false,
        })
    }

    /// Append the faces selected by `mask` of a box centred on `position`.
    ///
    /// A zero mask appends nothing. The box is rejected whole when its faces
    /// do not fit in the remaining capacity. Zero or negative dimensions are
    /// accepted as given.
    pub fn add_box(
        &mut self,
        mask: FaceMask,
        position: Vec3,
        dimensions: Vec3,
    ) -> GeometryResult<()> {
        if self.finished {
            return Err(GeometryError::UseAfterFinalize);
        }
        if mask.is_empty() {
            return Ok(());
        }

        let requested = mask.face_count() * VERTICES_PER_FACE;
        if requested > self.remaining() {
            return Err(GeometryError::CapacityExceeded {
                requested,
                remaining: self.remaining(),
                capacity: self.capacity(),
            });
        }

        for face in mask.faces() {
            let (width, height, depth) = face.extents(dimensions);
            let quad = build_face(position, face.spec(), width, height, depth);
            for vertex in quad.triangle_vertices() {
                self.push_vertex(vertex)?;
            }
        }

        Ok(())
    }

    /// Append the faces of a box given by its minimum corner
    pub fn add_box_descriptor(
        &mut self,
        mask: FaceMask,
        descriptor: &BoxDescriptor,
    ) -> GeometryResult<()> {
        self.add_box(mask, descriptor.center(), descriptor.dimensions)
    }

    fn push_vertex(&mut self, vertex: Vec3) -> GeometryResult<()> {
        let index = self.indices.len() as u32;
        self.positions.extend_from_slice(&vertex.to_array())?;
        self.indices.push(index)?;
        self.bounds.update(vertex);
        Ok(())
    }

    /// Trim the buffers to their used length and hand them out.
    ///
    /// The oversized backing storage is released when this returns.
    pub fn finalize(self) -> FinalizedMesh {
        log::debug!(
            "finalized {} vertices of {} reserved",
            self.vertex_count(),
            self.capacity()
        );
        FinalizedMesh {
            positions: self.positions.trim(),
            indices: self.indices.trim(),
        }
    }

    /// Same as [`BoxMeshAccumulator::finalize`] for callers that cannot give
    /// up ownership. Any later call to `add_box` or `finish` fails.
    pub fn finish(&mut self) -> GeometryResult<FinalizedMesh> {
        if self.finished {
            return Err(GeometryError::UseAfterFinalize);
        }
        self.finished = true;
        log::debug!(
            "finished {} vertices of {} reserved",
            self.vertex_count(),
            self.capacity()
        );
        Ok(FinalizedMesh {
            positions: self.positions.take_trimmed(),
            indices: self.indices.take_trimmed(),
        })
    }

    /// Check whether the buffers have already been handed out by `finish`
    pub fn is_finished(&self) -> bool {
        self.finished
    }

    /// Vertices emitted so far
    pub fn vertex_count(&self) -> usize {
        self.indices.len()
    }

    /// Indices emitted so far
    pub fn index_count(&self) -> usize {
        self.indices.len()
    }

    /// Check if no vertex has been emitted
    pub fn is_empty(&self) -> bool {
        self.indices.is_empty()
    }

    /// Maximum number of vertices
    pub fn capacity(&self) -> usize {
        self.indices.capacity()
    }

    /// Vertices that can still be emitted
    pub fn remaining(&self) -> usize {
        self.indices.remaining()
    }

    /// Envelope of every emitted vertex
    pub fn bounds(&self) -> &BoundsTracker {
        &self.bounds
    }

    /// Positions emitted so far
    pub fn positions(&self) -> &[f32] {
        self.positions.as_slice()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::face::BoxFace;

    fn accumulator(max_vertices: usize) -> BoxMeshAccumulator {
        BoxMeshAccumulator::new(max_vertices).unwrap()
    }

    #[test]
    fn test_vertex_count_follows_popcount() {
        for bits in 1..=63u32 {
            let mask = FaceMask::from_raw(bits);
            let mut acc = accumulator(36);
            acc.add_box(mask, Vec3::ZERO, Vec3::ONE).unwrap();
            let expected = bits.count_ones() as usize * 6;
            assert_eq!(acc.vertex_count(), expected, "mask {bits}");
            assert_eq!(acc.index_count(), expected, "mask {bits}");
            assert_eq!(acc.positions().len(), expected * 3);
        }
    }

    #[test]
    fn test_zero_mask_is_noop() {
        let mut acc = accumulator(6);
        acc.add_box(FaceMask::empty(), Vec3::ZERO, Vec3::ONE).unwrap();
        assert!(acc.is_empty());
        assert!(acc.bounds().is_empty());
    }

    #[test]
    fn test_capacity_beyond_index_range() {
        assert_eq!(
            BoxMeshAccumulator::new(usize::MAX / 2).unwrap_err(),
            GeometryError::InvalidCapacity(usize::MAX / 2)
        );
        if let Some(over) = MAX_VERTICES.checked_add(1) {
            assert_eq!(
                BoxMeshAccumulator::new(over).unwrap_err(),
                GeometryError::InvalidCapacity(over)
            );
        }
        assert_eq!(accumulator(0).capacity(), 0);
    }

    #[test]
    fn test_finalize_exact_lengths_and_identity_indices() {
        let mut acc = accumulator(1000);
        acc.add_box(FaceMask::ALL, Vec3::ZERO, Vec3::ONE).unwrap();
        acc.add_box(
            FaceMask::POS_X | FaceMask::NEG_Y,
            Vec3::new(3.0, 0.0, 0.0),
            Vec3::splat(2.0),
        )
        .unwrap();

        let vertices = acc.vertex_count();
        let mesh = acc.finalize();

        assert_eq!(vertices, 48);
        assert_eq!(mesh.positions.len(), 3 * vertices);
        assert_eq!(mesh.indices.len(), vertices);
        for (k, &index) in mesh.indices.iter().enumerate() {
            assert_eq!(index as usize, k);
        }
    }

    #[test]
    fn test_unit_box_geometry() {
        let mut acc = accumulator(36);
        acc.add_box(FaceMask::ALL, Vec3::ZERO, Vec3::ONE).unwrap();
        let bounds = *acc.bounds();
        let mesh = acc.finalize();

        assert_eq!(bounds.min(), Vec3::splat(-0.5));
        assert_eq!(bounds.max(), Vec3::splat(0.5));

        // Replaying the emitted vertices gives the same envelope
        assert_eq!(mesh.bounds(), bounds);

        // Every face is a planar quad on its own side of the box
        for (face_index, face) in BoxFace::ALL.into_iter().enumerate() {
            let spec = face.spec();
            let side = if face.slot() % 2 == 0 { 0.5 } else { -0.5 };
            let vertices: Vec<Vec3> = (0..6)
                .filter_map(|i| mesh.vertex(face_index * 6 + i))
                .collect();
            assert_eq!(vertices.len(), 6);

            let mut corners: Vec<[i32; 3]> = Vec::new();
            for v in &vertices {
                assert_eq!(v[spec.w.index()], side, "{:?}", face);
                let key = (*v * 2.0).round().as_ivec3().to_array();
                if !corners.contains(&key) {
                    corners.push(key);
                }
            }
            assert_eq!(corners.len(), 4, "{:?}", face);
        }
    }

    #[test]
    fn test_capacity_boundary() {
        let mut acc = accumulator(36);
        acc.add_box(FaceMask::ALL, Vec3::ZERO, Vec3::ONE).unwrap();

        let err = acc
            .add_box(FaceMask::ALL, Vec3::ONE, Vec3::ONE)
            .unwrap_err();
        assert_eq!(
            err,
            GeometryError::CapacityExceeded {
                requested: 36,
                remaining: 0,
                capacity: 36
            }
        );
        assert_eq!(acc.vertex_count(), 36);
    }

    // A full box is 6 faces of 6 vertices. The "maxVertices = 24 accepts
    // exactly one full 6-face unit box" property cannot hold under that
    // layout, so 24 vertices hold one 4-face box and reject a full one.
    #[test]
    fn test_capacity_of_24_fits_four_faces() {
        let mut acc = accumulator(24);
        assert!(acc.add_box(FaceMask::ALL, Vec3::ZERO, Vec3::ONE).is_err());
        assert!(acc.is_empty());

        let four = FaceMask::POS_X | FaceMask::NEG_X | FaceMask::POS_Y | FaceMask::NEG_Y;
        acc.add_box(four, Vec3::ZERO, Vec3::ONE).unwrap();
        assert_eq!(acc.remaining(), 0);
        assert!(acc.add_box(FaceMask::POS_Z, Vec3::ZERO, Vec3::ONE).is_err());
    }

    #[test]
    fn test_rejected_box_leaves_bounds_untouched() {
        let mut acc = accumulator(12);
        acc.add_box(FaceMask::POS_X, Vec3::ZERO, Vec3::ONE).unwrap();
        let before = *acc.bounds();

        let far = Vec3::splat(100.0);
        assert!(acc.add_box(FaceMask::ALL, far, Vec3::ONE).is_err());
        assert_eq!(*acc.bounds(), before);
    }

    #[test]
    fn test_use_after_finish() {
        let mut acc = accumulator(12);
        acc.add_box(FaceMask::POS_Z, Vec3::ZERO, Vec3::ONE).unwrap();

        let mesh = acc.finish().unwrap();
        assert_eq!(mesh.vertex_count(), 6);
        assert!(acc.is_finished());

        assert_eq!(
            acc.add_box(FaceMask::POS_Z, Vec3::ZERO, Vec3::ONE),
            Err(GeometryError::UseAfterFinalize)
        );
        assert_eq!(acc.finish(), Err(GeometryError::UseAfterFinalize));
    }

    #[test]
    fn test_deterministic_output() {
        let build = || {
            let mut acc = accumulator(1000);
            let dimensions = Vec3::new(0.3, 0.7, 1.1);
            for i in 0..10 {
                let position = Vec3::new(i as f32 * 0.1, 1.0 / 3.0, -(i as f32));
                acc.add_box(FaceMask::from_raw(i * 7), position, dimensions)
                    .unwrap();
            }
            acc.finalize()
        };

        let a = build();
        let b = build();
        let bits = |m: &FinalizedMesh| m.positions.iter().map(|p| p.to_bits()).collect::<Vec<_>>();
        assert_eq!(bits(&a), bits(&b));
        assert_eq!(a.indices, b.indices);
    }

    #[test]
    fn test_negative_dimensions_are_accepted() {
        let mut acc = accumulator(36);
        acc.add_box(FaceMask::ALL, Vec3::ZERO, Vec3::splat(-1.0))
            .unwrap();
        assert_eq!(acc.vertex_count(), 36);
        assert_eq!(acc.bounds().min(), Vec3::splat(-0.5));
    }

    #[test]
    fn test_add_box_descriptor_uses_corner() {
        let mut acc = accumulator(36);
        let descriptor = BoxDescriptor::new(Vec3::new(1.0, 2.0, 3.0), Vec3::new(2.0, 2.0, 2.0));
        acc.add_box_descriptor(FaceMask::ALL, &descriptor).unwrap();
        assert_eq!(acc.bounds().min(), Vec3::new(1.0, 2.0, 3.0));
        assert_eq!(acc.bounds().max(), Vec3::new(3.0, 4.0, 5.0));
    }
}
