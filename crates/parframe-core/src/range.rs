//! One-dimensional half-open index ranges.

use std::fmt::Debug;

use serde::{Deserialize, Serialize};

use crate::constants::DEFAULT_GRAIN_SIZE;
use crate::error::ParError;

/// Index types a [`Range1D`] can be built over.
pub trait RangeIndex: Copy + Ord + Debug + Send + Sync + 'static {
    /// Number of steps from `from` to `to`. Requires `from <= to`.
    fn distance(from: Self, to: Self) -> usize;

    /// The index `n` steps after `self`, or `None` past the type's bounds.
    #[must_use]
    fn advance(self, n: usize) -> Option<Self>;
}

macro_rules! impl_unsigned_index {
    ($($t:ty),*) => {
        $(
            impl RangeIndex for $t {
                #[inline]
                #[allow(clippy::cast_possible_truncation)]
                fn distance(from: Self, to: Self) -> usize {
                    to.abs_diff(from) as usize
                }

                #[inline]
                fn advance(self, n: usize) -> Option<Self> {
                    self.checked_add(<$t>::try_from(n).ok()?)
                }
            }
        )*
    };
}

macro_rules! impl_signed_index {
    ($($t:ty => $u:ty),*) => {
        $(
            impl RangeIndex for $t {
                #[inline]
                #[allow(clippy::cast_possible_truncation)]
                fn distance(from: Self, to: Self) -> usize {
                    to.abs_diff(from) as usize
                }

                #[inline]
                fn advance(self, n: usize) -> Option<Self> {
                    self.checked_add_unsigned(<$u>::try_from(n).ok()?)
                }
            }
        )*
    };
}

impl_unsigned_index!(usize, u32, u64);
impl_signed_index!(isize => usize, i32 => u32, i64 => u64);

/// A half-open interval `[begin, end)` with a grain size used by [`split`].
///
/// [`split`]: Range1D::split
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Range1D<T = usize> {
    begin: T,
    end: T,
    grain_size: usize,
}

impl<T: RangeIndex> Range1D<T> {
    /// Create `[begin, end)` with the default grain size.
    pub fn new(begin: T, end: T) -> Result<Self, ParError> {
        Self::with_grain_size(begin, end, DEFAULT_GRAIN_SIZE)
    }

    /// Create `[begin, end)` with an explicit grain size.
    pub fn with_grain_size(begin: T, end: T, grain_size: usize) -> Result<Self, ParError> {
        if begin > end {
            return Err(ParError::InvalidArgument(format!(
                "range begin {begin:?} is past its end {end:?}"
            )));
        }
        Ok(Self::from_bounds(begin, end, grain_size))
    }

    /// Callers guarantee `begin <= end`.
    pub(crate) fn from_bounds(begin: T, end: T, grain_size: usize) -> Self {
        Self {
            begin,
            end,
            grain_size,
        }
    }

    /// Inclusive start.
    #[inline]
    pub fn begin(&self) -> T {
        self.begin
    }

    /// Exclusive end.
    #[inline]
    pub fn end(&self) -> T {
        self.end
    }

    #[inline]
    pub fn grain_size(&self) -> usize {
        self.grain_size
    }

    /// Number of indices in the range.
    #[inline]
    pub fn size(&self) -> usize {
        T::distance(self.begin, self.end)
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.begin == self.end
    }

    /// True when the range is larger than its grain size.
    #[inline]
    pub fn is_divisible(&self) -> bool {
        self.size() > self.grain_size
    }

    pub fn contains(&self, index: T) -> bool {
        self.begin <= index && index < self.end
    }

    /// Split off the upper half, shrinking `self` to the lower half.
    ///
    /// Returns `None` and leaves `self` untouched when the range is not
    /// divisible.
    pub fn split(&mut self) -> Option<Self> {
        if !self.is_divisible() {
            return None;
        }
        let mid = self.begin.advance(self.size() / 2)?;
        let upper = Self::from_bounds(mid, self.end, self.grain_size);
        self.end = mid;
        Some(upper)
    }

    /// Iterate over the indices of the range in ascending order.
    pub fn iter(&self) -> RangeIter<T> {
        RangeIter {
            next: self.begin,
            end: self.end,
        }
    }
}

impl Range1D<usize> {
    /// The range as a `std::ops::Range`, suitable for slicing.
    #[inline]
    pub fn as_std(&self) -> std::ops::Range<usize> {
        self.begin..self.end
    }
}

impl<T: RangeIndex> IntoIterator for Range1D<T> {
    type Item = T;
    type IntoIter = RangeIter<T>;

    fn into_iter(self) -> Self::IntoIter {
        self.iter()
    }
}

impl<T: RangeIndex> IntoIterator for &Range1D<T> {
    type Item = T;
    type IntoIter = RangeIter<T>;

    fn into_iter(self) -> Self::IntoIter {
        self.iter()
    }
}

/// Iterator over the indices of a [`Range1D`].
#[derive(Debug, Clone)]
pub struct RangeIter<T> {
    next: T,
    end: T,
}

impl<T: RangeIndex> Iterator for RangeIter<T> {
    type Item = T;

    fn next(&mut self) -> Option<T> {
        if self.next >= self.end {
            return None;
        }
        let current = self.next;
        self.next = current.advance(1).unwrap_or(self.end);
        Some(current)
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        let remaining = if self.next >= self.end {
            0
        } else {
            T::distance(self.next, self.end)
        };
        (remaining, Some(remaining))
    }
}

impl<T: RangeIndex> ExactSizeIterator for RangeIter<T> {}
