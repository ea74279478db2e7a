//! Caller memory.
//!
//! A read copies device bytes into a [`UserSink`]; a write copies bytes out
//! of a [`UserSource`]. Either copy may fail with [`UserFault`], which the
//! device surfaces as [`DeviceError::Fault`](crate::DeviceError::Fault).
//!
//! Plain slices, vectors and `bytes` buffers never fault. Harnesses provide
//! their own implementations to inject failures.

use bytes::{Bytes, BytesMut};
use thiserror::Error;

/// Caller memory could not be accessed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
#[error("caller memory is inaccessible")]
pub struct UserFault;

/// Destination for a read.
pub trait UserSink {
    /// Number of bytes the caller is prepared to receive.
    fn len(&self) -> usize;

    /// Returns true if the sink cannot receive any bytes.
    fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Copy `src` into the front of the sink.
    ///
    /// Callers guarantee `src.len() <= self.len()`.
    fn copy_from(&mut self, src: &[u8]) -> Result<(), UserFault>;
}

/// Source for a write.
pub trait UserSource {
    /// Number of bytes the caller wants to write.
    fn len(&self) -> usize;

    /// Returns true if there is nothing to write.
    fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Copy the whole source into `dst`.
    ///
    /// Callers guarantee `dst.len() == self.len()`.
    fn copy_into(&self, dst: &mut [u8]) -> Result<(), UserFault>;
}

impl UserSink for [u8] {
    fn len(&self) -> usize {
        <[u8]>::len(self)
    }

    fn copy_from(&mut self, src: &[u8]) -> Result<(), UserFault> {
        let dst = self.get_mut(..src.len()).ok_or(UserFault)?;
        dst.copy_from_slice(src);
        Ok(())
    }
}

impl UserSink for Vec<u8> {
    fn len(&self) -> usize {
        Vec::len(self)
    }

    fn copy_from(&mut self, src: &[u8]) -> Result<(), UserFault> {
        UserSink::copy_from(self.as_mut_slice(), src)
    }
}

impl UserSink for BytesMut {
    fn len(&self) -> usize {
        BytesMut::len(self)
    }

    fn copy_from(&mut self, src: &[u8]) -> Result<(), UserFault> {
        UserSink::copy_from(&mut self[..], src)
    }
}

impl UserSource for [u8] {
    fn len(&self) -> usize {
        <[u8]>::len(self)
    }

    fn copy_into(&self, dst: &mut [u8]) -> Result<(), UserFault> {
        if dst.len() != self.len() {
            return Err(UserFault);
        }
        dst.copy_from_slice(self);
        Ok(())
    }
}

impl UserSource for Vec<u8> {
    fn len(&self) -> usize {
        Vec::len(self)
    }

    fn copy_into(&self, dst: &mut [u8]) -> Result<(), UserFault> {
        self.as_slice().copy_into(dst)
    }
}

impl UserSource for Bytes {
    fn len(&self) -> usize {
        Bytes::len(self)
    }

    fn copy_into(&self, dst: &mut [u8]) -> Result<(), UserFault> {
        self[..].copy_into(dst)
    }
}

impl UserSource for str {
    fn len(&self) -> usize {
        str::len(self)
    }

    fn copy_into(&self, dst: &mut [u8]) -> Result<(), UserFault> {
        self.as_bytes().copy_into(dst)
    }
}
