//! Line-segment batches
//!
//! Defect graphs are drawn as plain line lists. Segments are collected into
//! one flat position buffer and split into draw chunks no larger than a
//! configured vertex count, each chunk indexed from zero.

use smallvec::SmallVec;
use surgeryvis_core::{BoundsTracker, Vec3};

use crate::mesh::FinalizedMesh;
use crate::{GeometryError, GeometryResult};

/// Chunks produced by splitting a batch; almost always a single one
pub type LineChunks = SmallVec<[FinalizedMesh; 1]>;

/// Growable list of line segments with a running envelope
#[derive(Debug, Clone, Default, PartialEq)]
pub struct LineBatch {
    /// Endpoint triples, two endpoints per segment
    positions: Vec<f32>,
    bounds: BoundsTracker,
}

impl LineBatch {
    /// Create an empty batch
    pub fn new() -> Self {
        Self::default()
    }

    /// Append the segment from `start` to `end`
    pub fn add_segment(&mut self, start: Vec3, end: Vec3) {
        self.positions.extend_from_slice(&start.to_array());
        self.positions.extend_from_slice(&end.to_array());
        self.bounds.update(start);
        self.bounds.update(end);
    }

    /// Number of segments
    pub fn segment_count(&self) -> usize {
        self.positions.len() / 6
    }

    /// Number of endpoints
    pub fn vertex_count(&self) -> usize {
        self.positions.len() / 3
    }

    pub fn is_empty(&self) -> bool {
        self.positions.is_empty()
    }

    /// Envelope of every endpoint
    pub fn bounds(&self) -> &BoundsTracker {
        &self.bounds
    }

    /// Flat endpoint positions
    pub fn positions(&self) -> &[f32] {
        &self.positions
    }

    /// Split into chunks of at most `max_vertices` endpoints.
    ///
    /// Odd limits are rounded down so a segment never straddles two chunks.
    /// An empty batch yields no chunk.
    pub fn chunks(&self, max_vertices: usize) -> GeometryResult<LineChunks> {
        if max_vertices < 2 {
            return Err(GeometryError::InvalidChunkSize(max_vertices));
        }
        if self.is_empty() {
            return Ok(LineChunks::new());
        }
        let per_chunk = (max_vertices - max_vertices % 2).min(self.vertex_count());
        let stride = per_chunk
            .checked_mul(3)
            .ok_or(GeometryError::InvalidChunkSize(max_vertices))?;

        let chunks: LineChunks = self
            .positions
            .chunks(stride)
            .map(|slice| FinalizedMesh {
                positions: slice.to_vec(),
                indices: (0..(slice.len() / 3) as u32).collect(),
            })
            .collect();

        log::debug!(
            "split {} line segments into {} chunk(s)",
            self.segment_count(),
            chunks.len()
        );
        Ok(chunks)
    }

    /// Consume the batch into chunks, see [`LineBatch::chunks`]
    pub fn into_chunks(self, max_vertices: usize) -> GeometryResult<LineChunks> {
        if self.vertex_count() <= max_vertices && max_vertices >= 2 && !self.is_empty() {
            let vertices = self.vertex_count() as u32;
            let mut chunks = LineChunks::new();
            chunks.push(FinalizedMesh {
                positions: self.positions,
                indices: (0..vertices).collect(),
            });
            return Ok(chunks);
        }
        self.chunks(max_vertices)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn batch(segments: usize) -> LineBatch {
        let mut batch = LineBatch::new();
        for i in 0..segments {
            let x = i as f32;
            batch.add_segment(Vec3::new(x, 0.0, 0.0), Vec3::new(x, 1.0, 0.0));
        }
        batch
    }

    #[test]
    fn test_bounds_cover_both_endpoints() {
        let mut batch = LineBatch::new();
        batch.add_segment(Vec3::new(1.0, 5.0, -2.0), Vec3::new(-3.0, 0.0, 4.0));
        assert_eq!(batch.bounds().min(), Vec3::new(-3.0, 0.0, -2.0));
        assert_eq!(batch.bounds().max(), Vec3::new(1.0, 5.0, 4.0));
        assert_eq!(batch.segment_count(), 1);
        assert_eq!(batch.vertex_count(), 2);
    }

    #[test]
    fn test_empty_batch_has_no_chunks() {
        assert!(LineBatch::new().chunks(4).unwrap().is_empty());
        assert!(LineBatch::new().into_chunks(4).unwrap().is_empty());
    }

    #[test]
    fn test_unbounded_chunk_size() {
        assert!(LineBatch::new().chunks(usize::MAX).unwrap().is_empty());
        assert!(LineBatch::new().into_chunks(usize::MAX).unwrap().is_empty());

        let chunks = batch(3).chunks(usize::MAX).unwrap();
        assert_eq!(chunks.len(), 1);
        assert_eq!(chunks[0].vertex_count(), 6);
        assert_eq!(batch(3).into_chunks(usize::MAX).unwrap(), chunks);
    }

    #[test]
    fn test_chunk_sizes() {
        let chunks = batch(5).chunks(4).unwrap();
        let sizes: Vec<_> = chunks.iter().map(|c| c.vertex_count()).collect();
        assert_eq!(sizes, vec![4, 4, 2]);
        for chunk in &chunks {
            let expected: Vec<u32> = (0..chunk.vertex_count() as u32).collect();
            assert_eq!(chunk.indices, expected);
        }
    }

    #[test]
    fn test_odd_chunk_size_keeps_segments_whole() {
        let chunks = batch(3).chunks(5).unwrap();
        let sizes: Vec<_> = chunks.iter().map(|c| c.vertex_count()).collect();
        assert_eq!(sizes, vec![4, 2]);
        // Second chunk starts with the third segment's first endpoint
        assert_eq!(chunks[1].vertex(0), Some(Vec3::new(2.0, 0.0, 0.0)));
    }

    #[test]
    fn test_invalid_chunk_size() {
        assert_eq!(batch(1).chunks(1), Err(GeometryError::InvalidChunkSize(1)));
        assert_eq!(
            batch(1).into_chunks(0),
            Err(GeometryError::InvalidChunkSize(0))
        );
    }

    #[test]
    fn test_into_chunks_matches_chunks() {
        for max in [2, 3, 6, 100] {
            let source = batch(7);
            let borrowed = source.chunks(max).unwrap();
            let owned = source.into_chunks(max).unwrap();
            assert_eq!(borrowed, owned, "chunk size {max}");
        }
    }
}
