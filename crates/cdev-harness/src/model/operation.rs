//! Operations for model-based testing.
//!
//! Operations represent every call a caller can make against the device.
//! They are generated randomly by proptest (or decoded by the fuzzer) and
//! applied to both the model and the real device.

use arbitrary::Arbitrary;

/// Caller identifier (0-indexed).
pub type CallerId = u8;

/// Operations that can be applied to the system.
#[derive(Debug, Clone, Arbitrary)]
pub enum Operation {
    /// Caller tries to open the device.
    Open {
        /// Caller performing the operation.
        caller: CallerId,
    },

    /// Caller releases its session.
    Release {
        /// Caller releasing.
        caller: CallerId,
    },

    /// Caller reads up to `max` bytes.
    Read {
        /// Caller reading.
        caller: CallerId,
        /// Destination size.
        max: u16,
    },

    /// Caller writes a payload.
    Write {
        /// Caller writing.
        caller: CallerId,
        /// Bytes to write.
        payload: Payload,
    },

    /// Caller moves its cursor.
    Seek {
        /// Caller seeking.
        caller: CallerId,
        /// Absolute target position.
        pos: u16,
    },

    /// Caller reads into memory that faults on copy.
    FaultyRead {
        /// Caller reading.
        caller: CallerId,
        /// Destination size.
        max: u16,
    },

    /// Caller writes from memory that faults on copy.
    FaultyWrite {
        /// Caller writing.
        caller: CallerId,
        /// Bytes the caller claims to write.
        payload: Payload,
    },
}

impl Operation {
    /// Caller the operation targets.
    pub fn caller(&self) -> CallerId {
        match self {
            Self::Open { caller }
            | Self::Release { caller }
            | Self::Read { caller, .. }
            | Self::Write { caller, .. }
            | Self::Seek { caller, .. }
            | Self::FaultyRead { caller, .. }
            | Self::FaultyWrite { caller, .. } => *caller,
        }
    }

    /// Same operation retargeted at `caller % num_callers`.
    #[must_use]
    pub fn clamp_caller(self, num_callers: usize) -> Self {
        let clamp = |c: CallerId| (c as usize % num_callers.max(1)) as CallerId;
        match self {
            Self::Open { caller } => Self::Open { caller: clamp(caller) },
            Self::Release { caller } => Self::Release { caller: clamp(caller) },
            Self::Read { caller, max } => Self::Read { caller: clamp(caller), max },
            Self::Write { caller, payload } => Self::Write { caller: clamp(caller), payload },
            Self::Seek { caller, pos } => Self::Seek { caller: clamp(caller), pos },
            Self::FaultyRead { caller, max } => Self::FaultyRead { caller: clamp(caller), max },
            Self::FaultyWrite { caller, payload } => {
                Self::FaultyWrite { caller: clamp(caller), payload }
            },
        }
    }
}

/// Compact write payload.
///
/// Lengths run a little past the buffer capacity so oversized writes are
/// exercised. Content is deterministic from the seed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Arbitrary)]
pub struct Payload {
    /// Content seed.
    pub seed: u8,
    /// Length hint, reduced modulo [`Payload::MAX_LEN`] + 1.
    pub len: u16,
}

impl Payload {
    /// Largest payload length produced.
    pub const MAX_LEN: usize = 320;

    /// Expand to actual bytes.
    pub fn to_bytes(self) -> Vec<u8> {
        let len = self.len as usize % (Self::MAX_LEN + 1);
        (0..len).map(|i| self.seed.wrapping_add(i as u8)).collect()
    }
}

/// Result of applying an operation.
///
/// Model and real results are compared with `==`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum OperationResult {
    /// Open succeeded.
    Opened,
    /// Release succeeded.
    Released,
    /// Read returned these bytes (possibly none).
    Read(Vec<u8>),
    /// Write accepted this many bytes.
    Wrote(usize),
    /// Cursor moved to this position.
    Seeked(usize),
    /// Operation failed.
    Error(OperationError),
}

/// Errors that can occur during operations.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OperationError {
    /// Device held by another session.
    Busy,
    /// Caller memory faulted.
    Fault,
    /// Write past the end of the buffer.
    CapacityExceeded,
    /// Seek outside the buffer.
    InvalidOffset,
    /// Caller has no open session.
    NoSession,
    /// Caller ID out of range.
    InvalidCaller,
}

impl From<&cdev_core::DeviceError> for OperationError {
    fn from(err: &cdev_core::DeviceError) -> Self {
        use cdev_core::DeviceError;

        match err {
            DeviceError::Busy { .. } => Self::Busy,
            DeviceError::Fault { .. } => Self::Fault,
            DeviceError::CapacityExceeded { .. } => Self::CapacityExceeded,
            DeviceError::InvalidOffset { .. } => Self::InvalidOffset,
        }
    }
}

impl OperationResult {
    /// Check if operation failed.
    pub fn is_err(&self) -> bool {
        matches!(self, Self::Error(_))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn payload_is_deterministic() {
        let payload = Payload { seed: 10, len: 4 };
        assert_eq!(payload.to_bytes(), vec![10, 11, 12, 13]);
        assert_eq!(payload.to_bytes(), payload.to_bytes());
    }

    #[test]
    fn payload_can_exceed_capacity() {
        let payload = Payload { seed: 0, len: 300 };
        assert_eq!(payload.to_bytes().len(), 300);
    }

    #[test]
    fn clamp_caller_wraps() {
        let op = Operation::Open { caller: 7 }.clamp_caller(3);
        assert_eq!(op.caller(), 1);
    }
}
