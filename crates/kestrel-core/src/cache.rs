//! CacheSlot<T> - a last-write-wins value holder
//!
//! Readers never block on freshness: [`CacheSlot::get`] returns whatever was
//! written last. Every write bumps a version counter so readers can tell
//! whether the value moved since they last looked.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use parking_lot::RwLock;

struct SlotInner<T> {
    value: RwLock<T>,
    version: AtomicU64,
}

/// A shared, last-write-wins cache slot.
///
/// Cloning a `CacheSlot` yields another handle to the same slot.
///
/// # Example
///
/// ```rust
/// use kestrel_core::cache::CacheSlot;
///
/// let slot = CacheSlot::new(0);
/// let seen = slot.version();
///
/// slot.set(1);
/// slot.set(2);
/// assert_eq!(slot.get(), 2);
/// assert_eq!(slot.version() - seen, 2);
/// ```
pub struct CacheSlot<T> {
    inner: Arc<SlotInner<T>>,
}

impl<T> Clone for CacheSlot<T> {
    fn clone(&self) -> Self {
        Self {
            inner: self.inner.clone(),
        }
    }
}

impl<T: Clone + Send + Sync + 'static> CacheSlot<T> {
    /// Slot holding `value`, at version zero.
    pub fn new(value: T) -> Self {
        Self {
            inner: Arc::new(SlotInner {
                value: RwLock::new(value),
                version: AtomicU64::new(0),
            }),
        }
    }

    /// Current value.
    pub fn get(&self) -> T {
        self.inner.value.read().clone()
    }

    /// Read through a borrow without cloning the whole value.
    pub fn with<R>(&self, f: impl FnOnce(&T) -> R) -> R {
        f(&self.inner.value.read())
    }

    /// Number of writes so far.
    pub fn version(&self) -> u64 {
        self.inner.version.load(Ordering::Acquire)
    }

    /// Overwrite the value.
    pub fn set(&self, value: T) {
        *self.inner.value.write() = value;
        self.inner.version.fetch_add(1, Ordering::Release);
    }
}

impl<T: Clone + Send + Sync + Default + 'static> Default for CacheSlot<T> {
    fn default() -> Self {
        Self::new(T::default())
    }
}

impl<T: std::fmt::Debug> std::fmt::Debug for CacheSlot<T> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CacheSlot")
            .field("value", &*self.inner.value.read())
            .field("version", &self.inner.version.load(Ordering::Acquire))
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn last_write_wins() {
        let slot = CacheSlot::new(String::new());
        let other = slot.clone();

        slot.set("a".to_string());
        other.set("b".to_string());

        assert_eq!(slot.get(), "b");
        assert_eq!(slot.version(), 2);
    }

    #[test]
    fn with_reads_without_cloning() {
        let slot = CacheSlot::new(vec![1, 2, 3]);
        assert_eq!(slot.with(|v| v.len()), 3);
        assert_eq!(slot.version(), 0);
    }
}
