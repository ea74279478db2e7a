//! Per-open session handle.

use std::{fmt, sync::MutexGuard, sync::atomic::Ordering};

use bytes::{Bytes, BytesMut};

use crate::{
    config::WriteMode,
    device::{BUFFER_CAPACITY, Claim, Device, Storage},
    error::{CopyDirection, DeviceError},
    user::{UserSink, UserSource},
};

/// Exclusive handle on a [`Device`], created by [`Device::open`].
///
/// Holding a `Session` is holding the device lock. [`Session::release`] or
/// dropping the value gives it back. Because release consumes the session,
/// a caller can never release a lock it does not own.
pub struct Session<'d> {
    device: &'d Device,
    storage: MutexGuard<'d, Storage>,
    offset: usize,
    id: u64,
    /// Declared after `storage` so it drops after the lock is released.
    _claim: Claim<'d>,
}

impl<'d> Session<'d> {
    pub(crate) fn new(
        device: &'d Device,
        storage: MutexGuard<'d, Storage>,
        claim: Claim<'d>,
        id: u64,
    ) -> Self {
        Self { device, storage, offset: 0, id, _claim: claim }
    }

    /// Session number, unique per device.
    pub const fn id(&self) -> u64 {
        self.id
    }

    /// Current read/write cursor.
    pub const fn offset(&self) -> usize {
        self.offset
    }

    /// Move the cursor to an absolute position.
    ///
    /// Positions up to and including the capacity are valid; seeking past
    /// the written length is allowed and makes reads return 0 bytes.
    pub fn seek(&mut self, pos: usize) -> Result<usize, DeviceError> {
        if pos > BUFFER_CAPACITY {
            return Err(DeviceError::InvalidOffset { requested: pos, capacity: BUFFER_CAPACITY });
        }
        self.offset = pos;
        Ok(pos)
    }

    /// Read up to `dst.len()` bytes at the cursor.
    ///
    /// Returns the number of bytes copied, which is 0 once the cursor has
    /// reached the written length. A failing copy leaves the cursor where it
    /// was.
    pub fn read<S>(&mut self, dst: &mut S) -> Result<usize, DeviceError>
    where
        S: UserSink + ?Sized,
    {
        let written = self.storage.written;
        if self.offset >= written {
            return Ok(0);
        }

        let count = dst.len().min(written - self.offset);
        let src = &self.storage.buffer[self.offset..self.offset + count];

        if dst.copy_from(src).is_err() {
            tracing::error!("/dev/{}: failed to copy data to caller", self.device.name());
            return Err(DeviceError::Fault { direction: CopyDirection::ToCaller });
        }

        self.offset += count;
        self.device.counters.bytes_read.fetch_add(count as u64, Ordering::Relaxed);
        tracing::debug!("/dev/{}: sent {} bytes to caller", self.device.name(), count);

        Ok(count)
    }

    /// Read up to `max` bytes at the cursor into a fresh buffer.
    pub fn read_to_bytes(&mut self, max: usize) -> Result<Bytes, DeviceError> {
        let mut buf = BytesMut::zeroed(max.min(BUFFER_CAPACITY));
        let count = self.read(&mut buf)?;
        buf.truncate(count);
        Ok(buf.freeze())
    }

    /// Write all of `src`.
    ///
    /// The cursor advances by `src.len()` and the written length grows to
    /// the new cursor if it was shorter. Where the bytes land depends on the
    /// device's [`WriteMode`].
    ///
    /// Rejected with [`DeviceError::CapacityExceeded`] when the cursor would
    /// move past the end of the buffer, and with [`DeviceError::Fault`] when
    /// the source cannot be read. Neither leaves any trace in the device.
    pub fn write<S>(&mut self, src: &S) -> Result<usize, DeviceError>
    where
        S: UserSource + ?Sized,
    {
        let count = src.len();
        let end = self.offset.checked_add(count).filter(|&end| end <= BUFFER_CAPACITY).ok_or(
            DeviceError::CapacityExceeded {
                offset: self.offset,
                requested: count,
                capacity: BUFFER_CAPACITY,
            },
        )?;

        // Stage first so a faulting source cannot leave a partial copy.
        let mut staged = [0u8; BUFFER_CAPACITY];
        if src.copy_into(&mut staged[..count]).is_err() {
            tracing::error!("/dev/{}: failed to copy data from caller", self.device.name());
            return Err(DeviceError::Fault { direction: CopyDirection::FromCaller });
        }

        let start = match self.device.write_mode() {
            WriteMode::Rewind => 0,
            WriteMode::Positional => self.offset,
        };
        self.storage.buffer[start..start + count].copy_from_slice(&staged[..count]);

        self.offset = end;
        if self.storage.written < end {
            self.storage.written = end;
            self.device.publish_written(end);
        }

        self.device.counters.bytes_written.fetch_add(count as u64, Ordering::Relaxed);
        tracing::debug!("/dev/{}: received {} bytes from caller", self.device.name(), count);

        Ok(count)
    }

    /// Give the device back.
    ///
    /// Always succeeds. The buffer and written length stay in the device;
    /// the cursor is discarded.
    pub fn release(self) {
        drop(self);
    }
}

impl Drop for Session<'_> {
    fn drop(&mut self) {
        // The guard unlocks after this body runs, then the claim is dropped.
        tracing::info!("/dev/{} released (session {})", self.device.name(), self.id);
    }
}

impl fmt::Debug for Session<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Session")
            .field("device", &self.device.name())
            .field("id", &self.id)
            .field("offset", &self.offset)
            .finish_non_exhaustive()
    }
}
