//! Splitting an index range into contiguous partitions.

use std::time::Instant;

use crate::constants::DEFAULT_GRAIN_SIZE;
use crate::error::ParError;
use crate::range::{Range1D, RangeIndex};

/// Partition `[begin, end)` into `n_parts` contiguous ranges.
///
/// Every partition but the last receives `⌊W / n_parts⌋` indices where
/// `W = end - begin`; the last one also takes the remainder. The partitions
/// are returned in index order and their union is exactly `[begin, end)`.
///
/// # Example
/// ```
/// use parframe_core::partitioner::partition_range;
///
/// let parts = partition_range(0usize, 10, 3).unwrap();
/// let sizes: Vec<usize> = parts.iter().map(|p| p.size()).collect();
/// assert_eq!(sizes, vec![3, 3, 4]);
/// ```
pub fn partition_range<T: RangeIndex>(
    begin: T,
    end: T,
    n_parts: usize,
) -> Result<Vec<Range1D<T>>, ParError> {
    partition_range_with_grain(begin, end, n_parts, DEFAULT_GRAIN_SIZE)
}

/// [`partition_range`] with every partition carrying `grain_size`.
pub fn partition_range_with_grain<T: RangeIndex>(
    begin: T,
    end: T,
    n_parts: usize,
    grain_size: usize,
) -> Result<Vec<Range1D<T>>, ParError> {
    if n_parts == 0 {
        return Err(ParError::InvalidArgument(
            "Cannot partition range into zero parts".into(),
        ));
    }
    if end <= begin {
        return Err(ParError::InvalidArgument(
            "Cannot partition a range with equal start and end points".into(),
        ));
    }

    let start_timing = Instant::now();

    if n_parts == 1 {
        return Ok(vec![Range1D::from_bounds(begin, end, grain_size)]);
    }

    let part_load = T::distance(begin, end) / n_parts;
    let mut partitions = Vec::with_capacity(n_parts);
    let mut start = begin;
    for _ in 0..n_parts - 1 {
        let finish = start.advance(part_load).ok_or_else(|| {
            ParError::InvalidArgument(format!(
                "partition boundary past {start:?} + {part_load} is out of range"
            ))
        })?;
        partitions.push(Range1D::from_bounds(start, finish, grain_size));
        start = finish;
    }
    partitions.push(Range1D::from_bounds(start, end, grain_size));

    tracing::trace!(
        n_parts,
        part_load,
        grain_size,
        elapsed = ?start_timing.elapsed(),
        "partitioned range"
    );
    Ok(partitions)
}

/// Partition the index space `[0, len)` into `n_parts` ranges.
pub fn partition_len(len: usize, n_parts: usize) -> Result<Vec<Range1D>, ParError> {
    partition_range(0, len, n_parts)
}

/// Check that `partitions` cover `[begin, end)` contiguously, in order,
/// without gaps or overlaps.
pub fn check_coverage<T: RangeIndex>(
    partitions: &[Range1D<T>],
    begin: T,
    end: T,
) -> Result<(), ParError> {
    let Some(first) = partitions.first() else {
        return Err(ParError::missing_partitions());
    };
    if first.begin() != begin {
        return Err(ParError::InvalidArgument(format!(
            "partitions start at {:?}, expected {begin:?}",
            first.begin()
        )));
    }
    for pair in partitions.windows(2) {
        if pair[0].end() != pair[1].begin() {
            return Err(ParError::InvalidArgument(format!(
                "partition gap or overlap between {:?} and {:?}",
                pair[0].end(),
                pair[1].begin()
            )));
        }
    }
    let last_end = partitions[partitions.len() - 1].end();
    if last_end != end {
        return Err(ParError::InvalidArgument(format!(
            "partitions end at {last_end:?}, expected {end:?}"
        )));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn single_part_covers_everything() {
        let parts = partition_range(5usize, 17, 1).unwrap();
        assert_eq!(parts.len(), 1);
        assert_eq!(parts[0].as_std(), 5..17);
    }

    #[test]
    fn remainder_goes_to_last() {
        let parts = partition_range(0usize, 10, 4).unwrap();
        let sizes: Vec<usize> = parts.iter().map(Range1D::size).collect();
        assert_eq!(sizes, vec![2, 2, 2, 4]);
    }

    #[test]
    fn even_split() {
        let parts = partition_len(100, 4).unwrap();
        assert!(parts.iter().all(|p| p.size() == 25));
        check_coverage(&parts, 0, 100).unwrap();
    }

    #[test]
    fn more_parts_than_work() {
        let parts = partition_range(0usize, 3, 5).unwrap();
        assert_eq!(parts.len(), 5);
        assert!(parts[..4].iter().all(Range1D::is_empty));
        assert_eq!(parts[4].size(), 3);
        check_coverage(&parts, 0, 3).unwrap();
    }

    #[test]
    fn zero_parts_rejected() {
        let err = partition_range(0usize, 10, 0).unwrap_err();
        assert_eq!(
            err,
            ParError::InvalidArgument("Cannot partition range into zero parts".into())
        );
    }

    #[test]
    fn empty_range_rejected() {
        assert!(matches!(
            partition_range(4usize, 4, 2),
            Err(ParError::InvalidArgument(_))
        ));
        assert!(matches!(
            partition_range(9i64, 4, 2),
            Err(ParError::InvalidArgument(_))
        ));
    }

    #[test]
    fn signed_offsets() {
        let parts = partition_range(-10i64, 10, 3).unwrap();
        check_coverage(&parts, -10, 10).unwrap();
        assert_eq!(parts[2].size(), 8);
    }

    #[test]
    fn wide_signed_range_does_not_overflow() {
        let parts = partition_range(-2_000_000_000i32, 2_000_000_000, 2).unwrap();
        assert_eq!(parts[1].begin(), 0);
        check_coverage(&parts, -2_000_000_000, 2_000_000_000).unwrap();

        let parts = partition_range(i64::MIN, i64::MAX, 3).unwrap();
        check_coverage(&parts, i64::MIN, i64::MAX).unwrap();
    }

    #[test]
    fn grain_size_is_stamped_on_every_part() {
        let parts = partition_range_with_grain(0usize, 100, 4, 10).unwrap();
        assert!(parts.iter().all(|p| p.grain_size() == 10));

        let mut first = parts[0];
        let upper = first.split().unwrap();
        assert_eq!((first.size(), upper.size()), (12, 13));
        assert!(first.split().is_some());
        assert!(partition_range_with_grain(0usize, 100, 4, 25)
            .unwrap()
            .iter()
            .all(|p| !p.is_divisible()));
    }

    #[test]
    fn coverage_detects_gap() {
        let parts = vec![
            Range1D::new(0usize, 4).unwrap(),
            Range1D::new(5usize, 10).unwrap(),
        ];
        assert!(check_coverage(&parts, 0, 10).is_err());
    }

    #[test]
    fn coverage_detects_short_tail() {
        let parts = partition_len(8, 2).unwrap();
        assert!(check_coverage(&parts, 0, 9).is_err());
        assert!(matches!(
            check_coverage::<usize>(&[], 0, 9),
            Err(ParError::InvalidPartitionedObject(_))
        ));
    }
}
