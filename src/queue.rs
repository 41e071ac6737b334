use core::cell::RefCell;
use critical_section::{CriticalSection, Mutex};

/// Fixed-capacity circular FIFO of bytes.
///
/// `read` points at the next byte to remove, `write` at the next free slot.
///
/// invariants: 0 <= len <= N, read < N, write == (read + len) % N
#[derive(Debug)]
pub struct ByteQueue<const N: usize> {
    store: [u8; N],
    read: usize,
    write: usize,
    len: usize,
}

impl<const N: usize> ByteQueue<N> {
    pub const fn new() -> Self {
        Self {
            store: [0; N],
            read: 0,
            write: 0,
            len: 0,
        }
    }

    // Empties the queue and zeroes both indices
    pub fn clear(&mut self) {
        self.read = 0;
        self.write = 0;
        self.len = 0;
    }

    pub const fn capacity(&self) -> usize {
        N
    }

    pub fn count(&self) -> usize {
        self.len
    }

    pub fn free_count(&self) -> usize {
        N - self.len
    }

    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    pub fn is_full(&self) -> bool {
        self.len == N
    }

    /// Appends `byte`. Returns false, leaving the queue untouched, if it is full.
    pub fn insert(&mut self, byte: u8) -> bool {
        if self.is_full() {
            return false;
        }

        self.store[self.write] = byte;
        self.write = Self::advance(self.write);
        self.len += 1;
        true
    }

    /// Returns the next byte without removing it.
    pub fn peek(&self) -> Option<u8> {
        (!self.is_empty()).then(|| self.store[self.read])
    }

    /// Removes the next byte.
    ///
    /// The caller must check `is_empty` first; on an empty queue this returns a stale byte and
    /// leaves the queue as it was.
    pub fn remove(&mut self) -> u8 {
        let byte = self.store[self.read];
        if !self.is_empty() {
            self.read = Self::advance(self.read);
            self.len -= 1;
        }
        byte
    }

    pub fn try_remove(&mut self) -> Option<u8> {
        (!self.is_empty()).then(|| self.remove())
    }

    fn advance(index: usize) -> usize {
        if index + 1 == N {
            0
        } else {
            index + 1
        }
    }
}

impl<const N: usize> Default for ByteQueue<N> {
    fn default() -> Self {
        Self::new()
    }
}

/// A [`ByteQueue`] shared between an interrupt handler and the main loop.
///
/// Every access runs inside a critical section, so the consumer never observes a half-applied
/// insert. Each instance should still have exactly one producer and one consumer.
pub struct SharedQueue<const N: usize> {
    inner: Mutex<RefCell<ByteQueue<N>>>,
}

impl<const N: usize> SharedQueue<N> {
    pub const fn new() -> Self {
        Self {
            inner: Mutex::new(RefCell::new(ByteQueue::new())),
        }
    }

    /// Runs `f` against the queue inside a fresh critical section.
    pub fn with<R>(&self, f: impl FnOnce(&mut ByteQueue<N>) -> R) -> R {
        critical_section::with(|cs| self.with_in(cs, f))
    }

    /// Runs `f` against the queue under a critical section the caller already holds.
    pub fn with_in<R>(&self, cs: CriticalSection<'_>, f: impl FnOnce(&mut ByteQueue<N>) -> R) -> R {
        f(&mut self.inner.borrow_ref_mut(cs))
    }

    pub fn insert(&self, byte: u8) -> bool {
        self.with(|q| q.insert(byte))
    }

    pub fn peek(&self) -> Option<u8> {
        self.with(|q| q.peek())
    }

    pub fn try_remove(&self) -> Option<u8> {
        self.with(|q| q.try_remove())
    }

    pub fn clear(&self) {
        self.with(|q| q.clear())
    }

    pub fn count(&self) -> usize {
        self.with(|q| q.count())
    }

    pub fn free_count(&self) -> usize {
        self.with(|q| q.free_count())
    }

    pub fn is_empty(&self) -> bool {
        self.with(|q| q.is_empty())
    }

    pub fn is_full(&self) -> bool {
        self.with(|q| q.is_full())
    }
}

impl<const N: usize> Default for SharedQueue<N> {
    fn default() -> Self {
        Self::new()
    }
}
