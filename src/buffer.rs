use core::borrow::BorrowMut;
use core::cmp;

/// A linear buffer holding at most one USB packet.
///
/// Bytes are filled in behind `wpos` and consumed from `rpos`. Once everything written has been
/// read, both positions snap back to the start, so a packet always starts at offset zero.
///
/// invariants: 0 <= rpos <= wpos <= store.len()
pub struct Buffer<S: BorrowMut<[u8]>> {
    store: S,
    rpos: usize,
    wpos: usize,
}

impl<S: BorrowMut<[u8]>> Buffer<S> {
    pub fn new(store: S) -> Self {
        Self {
            store,
            rpos: 0,
            wpos: 0,
        }
    }

    // Clears the buffer
    pub fn clear(&mut self) {
        self.rpos = 0;
        self.wpos = 0;
    }

    // Amount of bytes available for reading
    pub fn available_read(&self) -> usize {
        self.wpos - self.rpos
    }

    // Amount of space in bytes available for writing
    pub fn available_write(&self) -> usize {
        self.store.borrow().len() - self.wpos
    }

    /// Appends one byte. Returns false if there is no room.
    pub fn push(&mut self, byte: u8) -> bool {
        if self.available_write() == 0 {
            return false;
        }

        self.store.borrow_mut()[self.wpos] = byte;
        self.wpos += 1;
        true
    }

    /// Takes the next unread byte.
    pub fn pop(&mut self) -> Option<u8> {
        if self.available_read() == 0 {
            return None;
        }

        let byte = self.store.borrow()[self.rpos];
        self.rpos += 1;
        self.rewind_if_drained();
        Some(byte)
    }

    // Passes up to max_count bytes of free space to a closure for writing. The closure returns
    // the number of bytes it actually wrote. If it returns an error, any written data is ignored.
    pub fn write_all<E>(
        &mut self,
        max_count: usize,
        f: impl FnOnce(&mut [u8]) -> Result<usize, E>,
    ) -> Result<usize, E> {
        let count = cmp::min(max_count, self.available_write());
        let wpos = self.wpos;

        f(&mut self.store.borrow_mut()[wpos..wpos + count]).map(|written| {
            let written = cmp::min(written, count);
            self.wpos += written;
            written
        })
    }

    // Passes up to max_count unread bytes to a closure. The closure returns the number of bytes
    // it consumed. If it returns an error, nothing is consumed.
    pub fn read<E>(
        &mut self,
        max_count: usize,
        f: impl FnOnce(&[u8]) -> Result<usize, E>,
    ) -> Result<usize, E> {
        let count = cmp::min(max_count, self.available_read());
        let rpos = self.rpos;

        let result = f(&self.store.borrow()[rpos..rpos + count]).map(|consumed| {
            let consumed = cmp::min(consumed, count);
            self.rpos += consumed;
            consumed
        });
        self.rewind_if_drained();
        result
    }

    fn rewind_if_drained(&mut self) {
        if self.rpos == self.wpos {
            self.clear();
        }
    }
}
