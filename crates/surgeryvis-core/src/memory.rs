//! Memory Management
//!
//! Fixed-capacity buffers for batched geometry construction:
//! - Bounded buffer with a running cursor and trim-on-finish
//! - Memory tracking for resident renderer resources

use thiserror::Error;

/// Raised when a bounded buffer cannot take the requested elements
#[derive(Error, Debug, Clone, Copy, PartialEq, Eq)]
#[error("buffer full: {requested} requested, {remaining} of {capacity} free")]
pub struct BufferFull {
    /// Elements the caller tried to append
    pub requested: usize,
    /// Free slots left in the buffer
    pub remaining: usize,
    /// Total slots in the buffer
    pub capacity: usize,
}

/// Pre-allocated buffer with a hard capacity.
///
/// Storage is allocated once at creation; appends only advance a cursor and
/// never reallocate. Appends that would pass the capacity are rejected whole,
/// leaving the buffer untouched. [`BoundedBuffer::trim`] copies the live
/// prefix into exactly-sized storage and releases the oversized block.
pub struct BoundedBuffer<T> {
    /// Backing storage, sized to the capacity
    storage: Box<[T]>,
    /// Number of live elements
    len: usize,
}

impl<T: Copy + Default> BoundedBuffer<T> {
    /// Create a buffer that can hold exactly `capacity` elements
    pub fn new(capacity: usize) -> Self {
        Self {
            storage: vec![T::default(); capacity].into_boxed_slice(),
            len: 0,
        }
    }

    /// Check that `additional` elements fit without writing anything
    pub fn check_fits(&self, additional: usize) -> Result<(), BufferFull> {
        if additional > self.remaining() {
            return Err(BufferFull {
                requested: additional,
                remaining: self.remaining(),
                capacity: self.capacity(),
            });
        }
        Ok(())
    }

    /// Append one element
    pub fn push(&mut self, value: T) -> Result<(), BufferFull> {
        self.check_fits(1)?;
        self.storage[self.len] = value;
        self.len += 1;
        Ok(())
    }

    /// Append a slice of elements, all or nothing
    pub fn extend_from_slice(&mut self, values: &[T]) -> Result<(), BufferFull> {
        self.check_fits(values.len())?;
        self.storage[self.len..self.len + values.len()].copy_from_slice(values);
        self.len += values.len();
        Ok(())
    }

    /// Copy the live prefix into an exactly-sized vector, consuming the buffer
    pub fn trim(self) -> Vec<T> {
        self.storage[..self.len].to_vec()
    }

    /// Copy the live prefix out and release the backing storage in place
    pub fn take_trimmed(&mut self) -> Vec<T> {
        let trimmed = self.storage[..self.len].to_vec();
        self.storage = Box::default();
        self.len = 0;
        trimmed
    }
}

impl<T> BoundedBuffer<T> {
    /// Live elements
    pub fn as_slice(&self) -> &[T] {
        &self.storage[..self.len]
    }

    /// Number of live elements
    pub fn len(&self) -> usize {
        self.len
    }

    /// Check if no element has been appended
    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    /// Total number of slots
    pub fn capacity(&self) -> usize {
        self.storage.len()
    }

    /// Free slots left
    pub fn remaining(&self) -> usize {
        self.capacity() - self.len
    }

    /// Bytes held by the backing storage
    pub fn allocated_bytes(&self) -> usize {
        std::mem::size_of_val(&*self.storage)
    }

    /// Drop every live element, keeping the storage
    pub fn clear(&mut self) {
        self.len = 0;
    }
}

impl<T> std::fmt::Debug for BoundedBuffer<T> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("BoundedBuffer")
            .field("len", &self.len)
            .field("capacity", &self.storage.len())
            .finish()
    }
}

/// Memory tracking statistics
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct MemoryStats {
    /// Bytes currently allocated
    allocated: usize,
    /// Peak bytes allocated
    peak: usize,
    /// Number of allocations
    allocation_count: usize,
    /// Number of releases
    release_count: usize,
}

impl MemoryStats {
    /// Create new memory stats
    pub fn new() -> Self {
        Self::default()
    }

    /// Record an allocation
    pub fn record_alloc(&mut self, size: usize) {
        self.allocated += size;
        self.allocation_count += 1;
        self.peak = self.peak.max(self.allocated);
    }

    /// Record a release
    pub fn record_dealloc(&mut self, size: usize) {
        self.allocated = self.allocated.saturating_sub(size);
        self.release_count += 1;
    }

    /// Get current allocated bytes
    pub fn current(&self) -> usize {
        self.allocated
    }

    /// Get peak allocated bytes
    pub fn peak_usage(&self) -> usize {
        self.peak
    }

    /// Get total allocation count
    pub fn count(&self) -> usize {
        self.allocation_count
    }

    /// Get total release count
    pub fn release_count(&self) -> usize {
        self.release_count
    }

    /// Allocations not yet released
    pub fn live_allocations(&self) -> usize {
        self.allocation_count - self.release_count.min(self.allocation_count)
    }

    /// Reset statistics
    pub fn reset(&mut self) {
        *self = Self::default();
    }
}
