use parking_lot::{Condvar, Mutex};

/// Counting semaphore
///
/// # Examples
/// ```
/// use alarm_cond::sync::Semaphore;
///
/// let sema = Semaphore::new(1);
/// sema.down();
/// sema.up();
/// sema.down();
/// ```
#[derive(Debug, Default)]
pub struct Semaphore {
    value: Mutex<usize>,
    waiters: Condvar,
}

impl Semaphore {
    /// Creates a new semaphore of initial value n.
    #[must_use]
    pub const fn new(n: usize) -> Self {
        Self {
            value: parking_lot::const_mutex(n),
            waiters: Condvar::new(),
        }
    }

    /// P operation, blocks while the value is zero
    pub fn down(&self) {
        let mut value = self.value.lock();
        while *value == 0 {
            self.waiters.wait(&mut value);
        }
        *value -= 1;
    }

    /// V operation
    pub fn up(&self) {
        let mut value = self.value.lock();
        *value += 1;
        self.waiters.notify_one();
    }
}
