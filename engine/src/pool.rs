//! Fixed-capacity object pools with typed `u32` handles.
//!
//! The engine never allocates crust-node or volcano records mid-tick; it
//! acquires and releases slots from pools sized up-front. Pools are plain
//! values injected into the world, never globals, so independent simulation
//! instances can coexist.

/// A record type that can live in a [`Pool`]. `reset` returns the slot to its
/// initial state when released.
pub trait Poolable {
    /// Reset the record to its pristine state.
    fn reset(&mut self);
}

/// Errors raised by pool operations.
#[derive(Debug, thiserror::Error, PartialEq, Eq)]
pub enum PoolError {
    /// All slots are live. Fatal to the tick: the caller must not retry.
    #[error("pool exhausted (capacity {capacity})")]
    Exhausted {
        /// Total number of slots in the pool.
        capacity: usize,
    },
}

/// A bounded pool of `T` records addressed by `u32` handles.
///
/// Handles are plain indices; releasing a handle resets the slot and makes it
/// available again. Double-release is a logic error the pool does not detect.
#[derive(Debug)]
pub struct Pool<T> {
    slots: Vec<T>,
    free: Vec<u32>,
}

impl<T: Default + Poolable> Pool<T> {
    /// Build a pool with `capacity` default-initialized slots, all free.
    pub fn with_capacity(capacity: usize) -> Self {
        let mut slots = Vec::with_capacity(capacity);
        for _ in 0..capacity {
            slots.push(T::default());
        }
        // LIFO free list: lowest index handed out first
        let free: Vec<u32> = (0..capacity as u32).rev().collect();
        Self { slots, free }
    }

    /// Take a free slot. Exhaustion is fatal, not retried.
    pub fn acquire(&mut self) -> Result<u32, PoolError> {
        self.free.pop().ok_or(PoolError::Exhausted { capacity: self.slots.len() })
    }

    /// Reset the slot behind `id` and return it to the free list.
    pub fn release(&mut self, id: u32) {
        self.slots[id as usize].reset();
        self.free.push(id);
    }

    /// Borrow the record behind `id`.
    #[inline]
    pub fn get(&self, id: u32) -> &T {
        &self.slots[id as usize]
    }

    /// Mutably borrow the record behind `id`.
    #[inline]
    pub fn get_mut(&mut self, id: u32) -> &mut T {
        &mut self.slots[id as usize]
    }

    /// Number of live (acquired) records.
    pub fn live(&self) -> usize {
        self.slots.len() - self.free.len()
    }

    /// Total slot count.
    pub fn capacity(&self) -> usize {
        self.slots.len()
    }
}
