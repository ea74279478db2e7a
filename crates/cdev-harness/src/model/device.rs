//! Model device.
//!
//! Plain fields, no locking, no atomics. The lock is an `Option` naming the
//! holder and the cursor lives with the caller.

use cdev_core::{BUFFER_CAPACITY, WriteMode};

use super::operation::{CallerId, OperationError};

/// Reference device state.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ModelDevice {
    contents: Vec<u8>,
    written: usize,
    holder: Option<CallerId>,
    write_mode: WriteMode,
}

impl ModelDevice {
    /// Create an empty, unlocked model.
    pub fn new(write_mode: WriteMode) -> Self {
        Self { contents: vec![0; BUFFER_CAPACITY], written: 0, holder: None, write_mode }
    }

    /// Caller currently holding the device.
    pub fn holder(&self) -> Option<CallerId> {
        self.holder
    }

    /// High-water mark of valid bytes.
    pub fn written(&self) -> usize {
        self.written
    }

    /// Valid bytes, `contents[..written]`.
    pub fn valid_bytes(&self) -> &[u8] {
        &self.contents[..self.written]
    }

    /// Take the lock for `caller`.
    pub fn open(&mut self, caller: CallerId) -> Result<(), OperationError> {
        if self.holder.is_some() {
            return Err(OperationError::Busy);
        }
        self.holder = Some(caller);
        Ok(())
    }

    /// Drop the lock.
    pub fn release(&mut self) {
        self.holder = None;
    }

    /// Bytes a read of `max` at `offset` returns.
    pub fn read(&self, offset: usize, max: usize) -> Vec<u8> {
        if offset >= self.written {
            return Vec::new();
        }
        let end = self.written.min(offset + max);
        self.contents[offset..end].to_vec()
    }

    /// Apply a write at `offset`, returning the new cursor.
    pub fn write(&mut self, offset: usize, data: &[u8]) -> Result<usize, OperationError> {
        let end = offset + data.len();
        if end > BUFFER_CAPACITY {
            return Err(OperationError::CapacityExceeded);
        }

        let start = match self.write_mode {
            WriteMode::Rewind => 0,
            WriteMode::Positional => offset,
        };
        self.contents[start..start + data.len()].copy_from_slice(data);
        self.written = self.written.max(end);

        Ok(end)
    }

    /// Check a write at `offset` of `len` bytes would fit, without applying it.
    pub fn check_write(&self, offset: usize, len: usize) -> Result<(), OperationError> {
        if offset + len > BUFFER_CAPACITY {
            return Err(OperationError::CapacityExceeded);
        }
        Ok(())
    }
}
