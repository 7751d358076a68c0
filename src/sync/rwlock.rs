//! # Writer-preferring reader-writer lock
//!
//! Any number of readers may hold a [`FairRwLock`] at once, a writer holds
//! it alone. As soon as a writer starts waiting, new readers queue up behind
//! it, so a steady stream of overlapping readers can't keep the writer out
//! forever. Readers already inside finish normally and the writer goes next.
//!
//! This is the task-fair policy of `parking_lot`'s `RwLock`, which the type
//! wraps. Only `read` and `write` are exposed: no upgradable or recursive
//! reads, which would let a reader slip past a queued writer.
//!
//! ```rust
//! use alarm_cond::sync::FairRwLock;
//!
//! let lock = FairRwLock::new(vec![1, 2]);
//! {
//!     let a = lock.read();
//!     let b = lock.read();
//!     assert_eq!(a.len() + b.len(), 4);
//! }
//! lock.write().push(3);
//! assert_eq!(*lock.read(), vec![1, 2, 3]);
//! ```

use parking_lot::RwLock;

pub type ReadGuard<'a, T> = parking_lot::RwLockReadGuard<'a, T>;
pub type WriteGuard<'a, T> = parking_lot::RwLockWriteGuard<'a, T>;

#[derive(Debug, Default)]
pub struct FairRwLock<T> {
    inner: RwLock<T>,
}

impl<T> FairRwLock<T> {
    pub const fn new(data: T) -> Self {
        Self {
            inner: RwLock::new(data),
        }
    }

    /// Shared access. Waits while a writer holds the lock or is queued for it.
    pub fn read(&self) -> ReadGuard<'_, T> {
        self.inner.read()
    }

    /// Exclusive access. Blocks new readers from the moment it starts waiting.
    pub fn write(&self) -> WriteGuard<'_, T> {
        self.inner.write()
    }
}
