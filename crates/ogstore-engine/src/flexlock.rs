use std::sync::atomic::{AtomicUsize, Ordering};

use parking_lot::RwLock;

#[cfg(debug_assertions)]
use std::sync::atomic::AtomicIsize;

/// A read/write lock with a runtime-toggleable enabled bit.
///
/// When disabled (the common case during single-threaded ingestion),
/// `read()`/`write()` skip `parking_lot::RwLock` entirely and hand back a
/// borrow straight into the cell — there is still exactly one writer or
/// many readers because nothing else is touching the value yet, but we pay
/// no atomic/futex cost doing it. `enable()` (called once, at the boundary
/// into the parallel analyzer phase) makes every subsequent acquire take
/// the real lock.
///
/// `ObjectSet`, every `Index`, and every `Object` share this same
/// enabled/disabled phase; toggling is only valid at a
/// quiescent point with no outstanding guards, which debug builds assert.
#[derive(Debug, Default)]
pub struct FlexLock<T> {
    enabled: AtomicUsize,
    inner: RwLock<T>,
    #[cfg(debug_assertions)]
    outstanding: AtomicIsize,
}

pub enum FlexRead<'a, T> {
    Locked(parking_lot::RwLockReadGuard<'a, T>),
    Unlocked {
        value: &'a T,
        #[cfg(debug_assertions)]
        outstanding: &'a AtomicIsize,
    },
}

pub enum FlexWrite<'a, T> {
    Locked(parking_lot::RwLockWriteGuard<'a, T>),
    Unlocked {
        value: &'a mut T,
        #[cfg(debug_assertions)]
        outstanding: &'a AtomicIsize,
    },
}

impl<'a, T> std::ops::Deref for FlexRead<'a, T> {
    type Target = T;
    fn deref(&self) -> &T {
        match self {
            FlexRead::Locked(g) => g,
            FlexRead::Unlocked { value, .. } => value,
        }
    }
}

impl<'a, T> std::ops::Deref for FlexWrite<'a, T> {
    type Target = T;
    fn deref(&self) -> &T {
        match self {
            FlexWrite::Locked(g) => g,
            FlexWrite::Unlocked { value, .. } => value,
        }
    }
}

impl<'a, T> std::ops::DerefMut for FlexWrite<'a, T> {
    fn deref_mut(&mut self) -> &mut T {
        match self {
            FlexWrite::Locked(g) => g,
            FlexWrite::Unlocked { value, .. } => value,
        }
    }
}

#[cfg(debug_assertions)]
impl<'a, T> Drop for FlexRead<'a, T> {
    fn drop(&mut self) {
        if let FlexRead::Unlocked { outstanding, .. } = self {
            outstanding.fetch_sub(1, Ordering::AcqRel);
        }
    }
}

#[cfg(debug_assertions)]
impl<'a, T> Drop for FlexWrite<'a, T> {
    fn drop(&mut self) {
        if let FlexWrite::Unlocked { outstanding, .. } = self {
            outstanding.fetch_sub(1, Ordering::AcqRel);
        }
    }
}

impl<T> FlexLock<T> {
    pub fn new(value: T) -> Self {
        Self {
            enabled: AtomicUsize::new(0),
            inner: RwLock::new(value),
            #[cfg(debug_assertions)]
            outstanding: AtomicIsize::new(0),
        }
    }

    #[must_use]
    pub fn is_enabled(&self) -> bool {
        self.enabled.load(Ordering::Acquire) > 0
    }

    /// Enable real locking. Must only be called at a quiescent point.
    pub fn enable(&self) {
        #[cfg(debug_assertions)]
        assert_eq!(
            self.outstanding.load(Ordering::Acquire),
            0,
            "FlexLock::enable called with outstanding guards"
        );
        self.enabled.fetch_add(1, Ordering::AcqRel);
    }

    /// Disable real locking. Must only be called at a quiescent point.
    pub fn disable(&self) {
        #[cfg(debug_assertions)]
        assert_eq!(
            self.outstanding.load(Ordering::Acquire),
            0,
            "FlexLock::disable called with outstanding guards"
        );
        let prev = self.enabled.fetch_sub(1, Ordering::AcqRel);
        debug_assert!(prev > 0, "FlexLock::disable called more often than enable");
    }

    pub fn read(&self) -> FlexRead<'_, T> {
        if self.is_enabled() {
            return FlexRead::Locked(self.inner.read());
        }
        #[cfg(debug_assertions)]
        self.outstanding.fetch_add(1, Ordering::AcqRel);
        FlexRead::Unlocked {
            // SAFETY: disabled means no concurrent writer can be live —
            // single-threaded ingestion is the only caller while disabled.
            value: unsafe { &*self.inner.data_ptr() },
            #[cfg(debug_assertions)]
            outstanding: &self.outstanding,
        }
    }

    pub fn write(&self) -> FlexWrite<'_, T> {
        if self.is_enabled() {
            return FlexWrite::Locked(self.inner.write());
        }
        #[cfg(debug_assertions)]
        self.outstanding.fetch_add(1, Ordering::AcqRel);
        FlexWrite::Unlocked {
            // SAFETY: see read().
            value: unsafe { &mut *self.inner.data_ptr() },
            #[cfg(debug_assertions)]
            outstanding: &self.outstanding,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn disabled_is_plain_access() {
        let lock = FlexLock::new(5);
        assert!(!lock.is_enabled());
        *lock.write() = 10;
        assert_eq!(*lock.read(), 10);
    }

    #[test]
    fn toggling_even_number_of_times_is_a_no_op() {
        let lock = FlexLock::new(0);
        for _ in 0..4 {
            lock.enable();
            lock.disable();
        }
        assert!(!lock.is_enabled());
    }

    #[test]
    fn enabled_allows_concurrent_readers() {
        let lock = FlexLock::new(42);
        lock.enable();
        let r1 = lock.read();
        let r2 = lock.read();
        assert_eq!(*r1, 42);
        assert_eq!(*r2, 42);
    }

    #[test]
    fn guards_released_before_next_toggle_do_not_panic() {
        let lock = FlexLock::new(1);
        {
            let _r = lock.read();
        }
        lock.enable();
        lock.disable();
    }
}
