//! Containers that carry an assigned partition set over their index space.

use std::ops::{Deref, DerefMut};

use crate::error::ParError;
use crate::constants::DEFAULT_GRAIN_SIZE;
use crate::partitioner::{check_coverage, partition_len, partition_range_with_grain};
use crate::range::Range1D;

/// An object whose index space `[0, index_len())` has been split into
/// partitions, one per worker.
pub trait Partitioned {
    /// Size of the index space the partitions cover.
    fn index_len(&self) -> usize;

    /// The assigned partitions, in index order. Empty when unassigned.
    fn partitions(&self) -> &[Range1D];

    fn has_partitions(&self) -> bool {
        !self.partitions().is_empty()
    }

    fn n_partitions(&self) -> usize {
        self.partitions().len()
    }

    fn partition(&self, id: usize) -> Option<&Range1D> {
        self.partitions().get(id)
    }

    /// Verify that partitions are assigned and that there is exactly one per
    /// processing element.
    fn check_partitions(&self, n_processing_elements: usize) -> Result<(), ParError> {
        if !self.has_partitions() {
            return Err(ParError::missing_partitions());
        }
        if self.n_partitions() != n_processing_elements {
            return Err(ParError::partition_count(
                self.n_partitions(),
                n_processing_elements,
            ));
        }
        Ok(())
    }
}

fn validated(partitions: Vec<Range1D>, len: usize) -> Result<Vec<Range1D>, ParError> {
    if partitions.is_empty() {
        return Ok(partitions);
    }
    check_coverage(&partitions, 0, len)?;
    Ok(partitions)
}

/// A vector together with a partition set over its indices.
///
/// # Example
/// ```
/// use parframe_core::partitioned::{PartitionedVec, Partitioned};
///
/// let mut v = PartitionedVec::filled(10, 0u32);
/// v.partition_into(2).unwrap();
/// assert_eq!(v.n_partitions(), 2);
/// assert_eq!(v.partition(1).unwrap().as_std(), 5..10);
/// ```
#[derive(Debug, Clone, Default, PartialEq)]
pub struct PartitionedVec<T> {
    data: Vec<T>,
    partitions: Vec<Range1D>,
}

impl<T> PartitionedVec<T> {
    /// Wrap `data` with no partitions assigned.
    #[must_use]
    pub fn new(data: Vec<T>) -> Self {
        Self {
            data,
            partitions: Vec::new(),
        }
    }

    /// A vector of `len` copies of `value`, unpartitioned.
    #[must_use]
    pub fn filled(len: usize, value: T) -> Self
    where
        T: Clone,
    {
        Self::new(vec![value; len])
    }

    /// Split the whole index space into `n_parts` partitions.
    pub fn partition_into(&mut self, n_parts: usize) -> Result<(), ParError> {
        self.partition_into_with_grain(n_parts, DEFAULT_GRAIN_SIZE)
    }

    /// [`partition_into`](Self::partition_into) with partitions of the given
    /// grain size.
    pub fn partition_into_with_grain(
        &mut self,
        n_parts: usize,
        grain_size: usize,
    ) -> Result<(), ParError> {
        self.partitions = partition_range_with_grain(0, self.data.len(), n_parts, grain_size)?;
        Ok(())
    }

    /// Assign an explicit partition set. It must cover `[0, len)` without
    /// gaps; an empty set clears the assignment.
    pub fn set_partitions(&mut self, partitions: Vec<Range1D>) -> Result<(), ParError> {
        self.partitions = validated(partitions, self.data.len())?;
        Ok(())
    }

    pub fn clear_partitions(&mut self) {
        self.partitions.clear();
    }

    /// Read-only view of the elements addressed by partition `id`.
    pub fn partition_slice(&self, id: usize) -> Option<&[T]> {
        self.partitions.get(id).map(|r| &self.data[r.as_std()])
    }

    /// Disjoint mutable views, one per partition, in partition order.
    pub fn partition_slices_mut(&mut self) -> Vec<&mut [T]> {
        let mut slices = Vec::with_capacity(self.partitions.len());
        let mut rest: &mut [T] = &mut self.data;
        let mut offset = 0;
        for range in &self.partitions {
            let (head, tail) = std::mem::take(&mut rest).split_at_mut(range.end() - offset);
            slices.push(head);
            rest = tail;
            offset = range.end();
        }
        slices
    }

    #[must_use]
    pub fn into_inner(self) -> Vec<T> {
        self.data
    }
}

impl<T> Partitioned for PartitionedVec<T> {
    fn index_len(&self) -> usize {
        self.data.len()
    }

    fn partitions(&self) -> &[Range1D] {
        &self.partitions
    }
}

impl<T> Deref for PartitionedVec<T> {
    type Target = [T];

    fn deref(&self) -> &[T] {
        &self.data
    }
}

impl<T> DerefMut for PartitionedVec<T> {
    fn deref_mut(&mut self) -> &mut [T] {
        &mut self.data
    }
}

impl<T> From<Vec<T>> for PartitionedVec<T> {
    fn from(data: Vec<T>) -> Self {
        Self::new(data)
    }
}

/// A bare index space `[0, len)` with partitions and no data, used by
/// algorithms that iterate the rows of an external dataset.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PartitionedRange {
    len: usize,
    partitions: Vec<Range1D>,
}

impl PartitionedRange {
    #[must_use]
    pub fn new(len: usize) -> Self {
        Self {
            len,
            partitions: Vec::new(),
        }
    }

    /// `[0, len)` split into `n_parts` partitions.
    pub fn partitioned(len: usize, n_parts: usize) -> Result<Self, ParError> {
        Ok(Self {
            len,
            partitions: partition_len(len, n_parts)?,
        })
    }

    pub fn set_partitions(&mut self, partitions: Vec<Range1D>) -> Result<(), ParError> {
        self.partitions = validated(partitions, self.len)?;
        Ok(())
    }
}

impl Partitioned for PartitionedRange {
    fn index_len(&self) -> usize {
        self.len
    }

    fn partitions(&self) -> &[Range1D] {
        &self.partitions
    }
}
