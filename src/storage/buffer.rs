// storage/buffer.rs
// Row buffer with atomic take-all

use std::sync::{Mutex, MutexGuard, PoisonError};

use super::models::Row;

/// Ordered row buffer shared by the worker and the flush path.
///
/// Every operation is one short critical section. The lock is never held
/// across I/O: [`Buffer::pop_all`] moves the rows out, and the caller writes
/// them after the lock is released.
#[derive(Debug, Default)]
pub struct Buffer {
    rows: Mutex<Vec<Row>>,
}

impl Buffer {
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> MutexGuard<'_, Vec<Row>> {
        // A panic while pushing cannot leave the Vec half-updated
        self.rows.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Appends a row and returns the buffer size after the append.
    pub fn append(&self, row: Row) -> usize {
        let mut rows = self.lock();
        rows.push(row);
        rows.len()
    }

    pub fn count(&self) -> usize {
        self.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.lock().is_empty()
    }

    /// Takes every buffered row and leaves an empty buffer behind.
    ///
    /// The swap happens under one lock acquisition, so a concurrent append
    /// lands either in the returned rows or in the fresh buffer, never both.
    pub fn pop_all(&self) -> Vec<Row> {
        std::mem::take(&mut *self.lock())
    }
}
