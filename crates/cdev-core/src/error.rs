//! Device error types.

use std::fmt;

use thiserror::Error;

/// Direction of a copy between the device buffer and caller memory.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CopyDirection {
    /// Device buffer to caller memory (read).
    ToCaller,
    /// Caller memory to device buffer (write).
    FromCaller,
}

impl fmt::Display for CopyDirection {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::ToCaller => write!(f, "to caller"),
            Self::FromCaller => write!(f, "from caller"),
        }
    }
}

/// Errors from device operations.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum DeviceError {
    /// Another session currently holds the device.
    #[error("device busy: /dev/{device} is already open")]
    Busy {
        /// Name of the device that refused the open.
        device: String,
    },

    /// Copying to or from caller memory failed.
    #[error("bad address while copying {direction}")]
    Fault {
        /// Which way the failed copy was going.
        direction: CopyDirection,
    },

    /// Write would run past the end of the buffer.
    #[error("write of {requested} bytes at offset {offset} exceeds capacity {capacity}")]
    CapacityExceeded {
        /// Session offset at the time of the write.
        offset: usize,
        /// Number of bytes the caller asked to write.
        requested: usize,
        /// Buffer capacity.
        capacity: usize,
    },

    /// Seek target lies outside the buffer.
    #[error("offset {requested} is outside the buffer (capacity {capacity})")]
    InvalidOffset {
        /// Requested absolute offset.
        requested: usize,
        /// Buffer capacity.
        capacity: usize,
    },
}

/// POSIX `EFAULT`.
pub const EFAULT: i32 = 14;
/// POSIX `EBUSY`.
pub const EBUSY: i32 = 16;
/// POSIX `EINVAL`.
pub const EINVAL: i32 = 22;
/// POSIX `ENOSPC`.
pub const ENOSPC: i32 = 28;

impl DeviceError {
    /// The errno a character device would report for this error.
    pub fn errno(&self) -> i32 {
        match self {
            Self::Busy { .. } => EBUSY,
            Self::Fault { .. } => EFAULT,
            Self::CapacityExceeded { .. } => ENOSPC,
            Self::InvalidOffset { .. } => EINVAL,
        }
    }

    /// Returns true if retrying the same call later may succeed.
    ///
    /// Only `Busy` clears on its own once the holder releases. Every other
    /// error is a property of the call itself.
    pub fn is_retryable(&self) -> bool {
        match self {
            Self::Busy { .. } => true,
            Self::Fault { .. } | Self::CapacityExceeded { .. } | Self::InvalidOffset { .. } => {
                false
            },
        }
    }
}
