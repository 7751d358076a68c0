//! Fixed-capacity circular buffer between the alarm coordinator and the
//! display updater.
//!
//! Two counting semaphores track empty and full slots, a mutex guards the
//! read and write cursors. Items are moved in and out by value, the buffer
//! never lends out references to what it holds.

use parking_lot::Mutex;

use crate::sync::Semaphore;

/// Number of slots in the buffer the engine uses.
pub const BUFFER_CAPACITY: usize = 4;

#[derive(Debug)]
struct Ring<T> {
    slots: Vec<Option<T>>,
    write_index: usize,
    read_index: usize,
    occupied: usize,
}

#[derive(Debug)]
pub struct BoundedBuffer<T> {
    ring: Mutex<Ring<T>>,
    empty_slots: Semaphore,
    full_slots: Semaphore,
    capacity: usize,
}

impl<T> BoundedBuffer<T> {
    /// # Panics
    /// if `capacity` is zero
    #[must_use]
    pub fn new(capacity: usize) -> Self {
        assert!(capacity > 0, "a bounded buffer needs at least one slot");
        Self {
            ring: Mutex::new(Ring {
                slots: std::iter::repeat_with(|| None).take(capacity).collect(),
                write_index: 0,
                read_index: 0,
                occupied: 0,
            }),
            empty_slots: Semaphore::new(capacity),
            full_slots: Semaphore::new(0),
            capacity,
        }
    }

    /// Appends `item`, blocking while every slot holds an unread item.
    pub fn push(&self, item: T) {
        self.empty_slots.down();
        {
            let mut ring = self.ring.lock();
            let index = ring.write_index;
            debug_assert!(ring.slots[index].is_none(), "overwrote an unread slot");
            ring.slots[index] = Some(item);
            ring.write_index = (index + 1) % self.capacity;
            ring.occupied += 1;
        }
        self.full_slots.up();
    }

    /// Removes the oldest item, blocking while the buffer is empty.
    pub fn pop(&self) -> T {
        self.full_slots.down();
        let item = {
            let mut ring = self.ring.lock();
            let index = ring.read_index;
            let item = ring.slots[index]
                .take()
                .expect("full-slot count admitted a read of an empty slot");
            ring.read_index = (index + 1) % self.capacity;
            ring.occupied -= 1;
            item
        };
        self.empty_slots.up();
        item
    }

    /// Number of unread items.
    pub fn len(&self) -> usize {
        self.ring.lock().occupied
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub const fn capacity(&self) -> usize {
        self.capacity
    }
}

impl<T> Default for BoundedBuffer<T> {
    fn default() -> Self {
        Self::new(BUFFER_CAPACITY)
    }
}
