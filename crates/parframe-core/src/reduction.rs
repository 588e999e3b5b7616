//! Associative reduction operators.

use std::marker::PhantomData;
use std::ops::{Add, Mul};

use num_traits::{Bounded, One, Zero};

/// An associative combination used by
/// [`parallel_reduce`](crate::parallel_reduce::parallel_reduce).
///
/// Each task starts from [`identity`](Self::identity), folds every item of
/// its partition with [`local_join`](Self::local_join), and the orchestrator
/// combines the per-task values with [`join`](Self::join) in ascending
/// partition order.
pub trait ReductionOp: Sync {
    type Item;
    type Value: Clone + Send;

    fn identity(&self) -> Self::Value;

    fn local_join(&self, item: &Self::Item, acc: &mut Self::Value);

    fn join(&self, acc: &mut Self::Value, other: &Self::Value);
}

macro_rules! scalar_op {
    ($(#[$doc:meta])* $name:ident, [$($bound:tt)+], $identity:expr, $combine:expr) => {
        $(#[$doc])*
        #[derive(Debug, Clone, Copy, Default)]
        pub struct $name<T>(PhantomData<fn() -> T>);

        impl<T> $name<T> {
            #[must_use]
            pub fn new() -> Self {
                Self(PhantomData)
            }
        }

        impl<T> ReductionOp for $name<T>
        where
            T: Copy + Send + $($bound)+,
        {
            type Item = T;
            type Value = T;

            fn identity(&self) -> T {
                $identity
            }

            fn local_join(&self, item: &T, acc: &mut T) {
                *acc = $combine(*acc, *item);
            }

            fn join(&self, acc: &mut T, other: &T) {
                *acc = $combine(*acc, *other);
            }
        }
    };
}

scalar_op!(
    /// Addition, identity zero.
    Sum, [Zero + Add<Output = T>], T::zero(), |a: T, b: T| a + b
);

scalar_op!(
    /// Multiplication, identity one.
    Product, [One + Mul<Output = T>], T::one(), |a: T, b: T| a * b
);

scalar_op!(
    /// Maximum, identity the smallest representable value.
    Max, [Bounded + PartialOrd], T::min_value(), |a: T, b: T| if b > a { b } else { a }
);

scalar_op!(
    /// Minimum, identity the largest representable value.
    Min, [Bounded + PartialOrd], T::max_value(), |a: T, b: T| if b < a { b } else { a }
);

/// A reduction assembled from closures.
///
/// # Example
/// ```
/// use parframe_core::reduction::{FnReduce, ReductionOp};
///
/// // Count the even items.
/// let op = FnReduce::new(
///     0usize,
///     |x: &u32, acc: &mut usize| if x % 2 == 0 { *acc += 1 },
///     |acc: &mut usize, other: &usize| *acc += *other,
/// );
/// let mut acc = op.identity();
/// for x in [1, 2, 4, 5] {
///     op.local_join(&x, &mut acc);
/// }
/// assert_eq!(acc, 2);
/// ```
pub struct FnReduce<I, V, L, J> {
    identity: V,
    local: L,
    combine: J,
    _item: PhantomData<fn(&I)>,
}

impl<I, V, L, J> FnReduce<I, V, L, J>
where
    V: Clone + Send + Sync,
    L: Fn(&I, &mut V) + Sync,
    J: Fn(&mut V, &V) + Sync,
{
    pub fn new(identity: V, local: L, combine: J) -> Self {
        Self {
            identity,
            local,
            combine,
            _item: PhantomData,
        }
    }
}

impl<I, V, L, J> ReductionOp for FnReduce<I, V, L, J>
where
    V: Clone + Send + Sync,
    L: Fn(&I, &mut V) + Sync,
    J: Fn(&mut V, &V) + Sync,
{
    type Item = I;
    type Value = V;

    fn identity(&self) -> V {
        self.identity.clone()
    }

    fn local_join(&self, item: &I, acc: &mut V) {
        (self.local)(item, acc);
    }

    fn join(&self, acc: &mut V, other: &V) {
        (self.combine)(acc, other);
    }
}
