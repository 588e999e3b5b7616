//! Value/validity cells with blocking waits.
//!
//! A [`ResultHolder`] is the output slot of a task and the "future" handed
//! back by the parallel algorithms. Clones share the same slot, so a caller
//! can keep a handle while the owning task writes into it. Waiting is done on
//! a condition variable; no thread spins.

use std::fmt;
use std::sync::Arc;
use std::time::{Duration, Instant};

use parking_lot::{Condvar, Mutex};

use crate::reduction::ReductionOp;

struct Slot<T> {
    value: T,
    valid: bool,
}

struct Shared<T> {
    slot: Mutex<Slot<T>>,
    ready: Condvar,
}

/// A shared `(value, valid)` pair.
///
/// # Example
/// ```
/// use parframe_core::result::ResultHolder;
///
/// let holder = ResultHolder::new(0u64);
/// assert_eq!(holder.get(), (0, false));
///
/// holder.set(42);
/// assert_eq!(holder.get_or_wait(), 42);
/// ```
pub struct ResultHolder<T> {
    shared: Arc<Shared<T>>,
}

impl<T> ResultHolder<T> {
    /// An invalid holder seeded with `value`.
    #[must_use]
    pub fn new(value: T) -> Self {
        Self::from_parts(value, false)
    }

    /// A holder that is already valid.
    #[must_use]
    pub fn valid(value: T) -> Self {
        Self::from_parts(value, true)
    }

    fn from_parts(value: T, valid: bool) -> Self {
        Self {
            shared: Arc::new(Shared {
                slot: Mutex::new(Slot { value, valid }),
                ready: Condvar::new(),
            }),
        }
    }

    #[must_use]
    pub fn is_valid(&self) -> bool {
        self.shared.slot.lock().valid
    }

    /// Store `value` and mark the holder valid, waking every waiter.
    pub fn set(&self, value: T) {
        let mut slot = self.shared.slot.lock();
        slot.value = value;
        slot.valid = true;
        drop(slot);
        self.shared.ready.notify_all();
    }

    /// Mutate the value in place. Validity is left unchanged.
    pub fn update<F: FnOnce(&mut T)>(&self, f: F) {
        f(&mut self.shared.slot.lock().value);
    }

    /// Borrow the value and validity under the lock.
    pub fn with<R, F: FnOnce(&T, bool) -> R>(&self, f: F) -> R {
        let slot = self.shared.slot.lock();
        f(&slot.value, slot.valid)
    }

    pub fn validate(&self) {
        self.shared.slot.lock().valid = true;
        self.shared.ready.notify_all();
    }

    pub fn invalidate(&self) {
        self.shared.slot.lock().valid = false;
    }

    /// Invalidate and reinitialize the value.
    pub fn invalidate_and_reset(&self, value: T) {
        let mut slot = self.shared.slot.lock();
        slot.value = value;
        slot.valid = false;
    }

    /// True when both handles share one slot.
    #[must_use]
    pub fn same_slot(&self, other: &Self) -> bool {
        Arc::ptr_eq(&self.shared, &other.shared)
    }
}

impl<T: Clone> ResultHolder<T> {
    /// Non-blocking snapshot of `(value, valid)`.
    #[must_use]
    pub fn get(&self) -> (T, bool) {
        let slot = self.shared.slot.lock();
        (slot.value.clone(), slot.valid)
    }

    /// Block until the holder is valid, then return the value.
    #[must_use]
    pub fn get_or_wait(&self) -> T {
        let mut slot = self.shared.slot.lock();
        while !slot.valid {
            self.shared.ready.wait(&mut slot);
        }
        slot.value.clone()
    }

    /// Block until the holder is valid or `timeout` elapses, whichever comes
    /// first. The validity flag in the returned pair tells which one it was.
    #[must_use]
    pub fn get_or_wait_for(&self, timeout: Duration) -> (T, bool) {
        let deadline = Instant::now() + timeout;
        let mut slot = self.shared.slot.lock();
        while !slot.valid {
            if self.shared.ready.wait_until(&mut slot, deadline).timed_out() {
                break;
            }
        }
        (slot.value.clone(), slot.valid)
    }

    /// An independent holder with the current value and validity.
    #[must_use]
    pub fn snapshot(&self) -> Self {
        let (value, valid) = self.get();
        Self::from_parts(value, valid)
    }

    /// Fold a valid `other` into this holder with `op`. An invalid `other`
    /// leaves this holder untouched. The validity of `self` is not changed.
    pub fn join<F: FnOnce(&mut T, &T)>(&self, other: &Self, op: F) {
        let (theirs, valid) = other.get();
        if !valid {
            return;
        }
        op(&mut self.shared.slot.lock().value, &theirs);
    }

    /// [`join`](Self::join) using a reduction operator's combinator.
    pub fn join_with<R>(&self, other: &Self, op: &R)
    where
        R: ReductionOp<Value = T> + ?Sized,
    {
        self.join(other, |acc, theirs| op.join(acc, theirs));
    }

    /// A new holder carrying `f(value)` and the same validity.
    #[must_use]
    pub fn map<U, F: FnOnce(&T) -> U>(&self, f: F) -> ResultHolder<U> {
        let slot = self.shared.slot.lock();
        ResultHolder::from_parts(f(&slot.value), slot.valid)
    }
}

impl<T> Clone for ResultHolder<T> {
    fn clone(&self) -> Self {
        Self {
            shared: Arc::clone(&self.shared),
        }
    }
}

impl<T: Default> Default for ResultHolder<T> {
    fn default() -> Self {
        Self::new(T::default())
    }
}

impl<T: fmt::Debug> fmt::Debug for ResultHolder<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let slot = self.shared.slot.lock();
        f.debug_struct("ResultHolder")
            .field("value", &slot.value)
            .field("valid", &slot.valid)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::reduction::Sum;
    use std::thread;

    #[test]
    fn starts_invalid() {
        let h = ResultHolder::new(7i32);
        assert_eq!(h.get(), (7, false));
        assert!(!h.is_valid());
    }

    #[test]
    fn validate_and_invalidate() {
        let h = ResultHolder::new(1.5f64);
        h.validate();
        assert!(h.is_valid());
        h.invalidate();
        assert_eq!(h.get(), (1.5, false));
        h.invalidate_and_reset(0.0);
        assert_eq!(h.get(), (0.0, false));
    }

    #[test]
    fn zero_timeout_returns_immediately_invalid() {
        let h: ResultHolder<u32> = ResultHolder::default();
        let start = Instant::now();
        let (_, valid) = h.get_or_wait_for(Duration::from_millis(0));
        assert!(!valid);
        assert!(start.elapsed() < Duration::from_secs(1));
    }

    #[test]
    fn timed_wait_sees_late_writer() {
        let h = ResultHolder::new(Vec::<u8>::new());
        let writer = h.clone();
        let t = thread::spawn(move || {
            thread::sleep(Duration::from_millis(20));
            writer.set(vec![1, 2, 3]);
        });
        let (value, valid) = h.get_or_wait_for(Duration::from_secs(10));
        t.join().unwrap();
        assert!(valid);
        assert_eq!(value, vec![1, 2, 3]);
    }

    #[test]
    fn wait_blocks_until_set() {
        let h = ResultHolder::new(0u64);
        let writer = h.clone();
        let t = thread::spawn(move || writer.set(99));
        assert_eq!(h.get_or_wait(), 99);
        t.join().unwrap();
    }

    #[test]
    fn join_ignores_invalid_other() {
        let acc = ResultHolder::valid(10i64);
        let other = ResultHolder::new(5i64);
        acc.join(&other, |a, b| *a += *b);
        assert_eq!(acc.get(), (10, true));

        other.validate();
        acc.join(&other, |a, b| *a += *b);
        assert_eq!(acc.get(), (15, true));
    }

    #[test]
    fn join_with_self_does_not_deadlock() {
        let h = ResultHolder::valid(3u32);
        h.join(&h.clone(), |a, b| *a += *b);
        assert_eq!(h.get(), (6, true));
    }

    #[test]
    fn join_with_reduction_op() {
        let acc = ResultHolder::valid(1.0f64);
        acc.join_with(&ResultHolder::valid(2.5), &Sum::new());
        assert_eq!(acc.get(), (3.5, true));
    }

    #[test]
    fn map_keeps_validity() {
        let h = ResultHolder::valid(vec![1, 2, 3]);
        let len = h.map(Vec::len);
        assert_eq!(len.get(), (3, true));
        let invalid = ResultHolder::new(4u8).map(|v| u32::from(*v) * 2);
        assert_eq!(invalid.get(), (8, false));
    }

    #[test]
    fn clones_share_and_snapshots_do_not() {
        let h = ResultHolder::new(1u8);
        let shared = h.clone();
        let snap = h.snapshot();
        h.set(2);
        assert!(h.same_slot(&shared));
        assert_eq!(shared.get(), (2, true));
        assert_eq!(snap.get(), (1, false));
    }

    #[test]
    fn unit_holder_tracks_completion() {
        let done = ResultHolder::new(());
        assert!(!done.is_valid());
        done.validate();
        let () = done.get_or_wait();
        assert!(done.is_valid());
    }
}
