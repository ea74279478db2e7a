//! Model world - a device plus the callers competing for it.
//!
//! The world is the oracle against which the real device is verified.

use cdev_core::{BUFFER_CAPACITY, WriteMode};

use super::{
    device::ModelDevice,
    operation::{CallerId, Operation, OperationError, OperationResult},
};

/// Observable state for oracle comparison.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ObservableState {
    /// Whether some caller holds the device.
    pub locked: bool,
    /// Written length.
    pub written: usize,
    /// Per-caller cursor, `None` without a session.
    pub offsets: Vec<Option<usize>>,
}

/// Model world - the reference implementation.
#[derive(Debug, Clone)]
pub struct ModelWorld {
    device: ModelDevice,
    /// Cursor per caller, present while that caller holds a session.
    sessions: Vec<Option<usize>>,
}

impl ModelWorld {
    /// Create a world with `num_callers` callers.
    pub fn new(num_callers: usize, write_mode: WriteMode) -> Self {
        Self { device: ModelDevice::new(write_mode), sessions: vec![None; num_callers] }
    }

    /// Number of callers.
    pub fn num_callers(&self) -> usize {
        self.sessions.len()
    }

    /// The model device.
    pub fn device(&self) -> &ModelDevice {
        &self.device
    }

    /// Apply an operation and return the result.
    pub fn apply(&mut self, op: &Operation) -> OperationResult {
        let caller = op.caller();
        if caller as usize >= self.num_callers() {
            return OperationResult::Error(OperationError::InvalidCaller);
        }

        match op {
            Operation::Open { .. } => self.apply_open(caller),
            Operation::Release { .. } => self.apply_release(caller),
            Operation::Read { max, .. } => self.apply_read(caller, *max as usize),
            Operation::Write { payload, .. } => self.apply_write(caller, &payload.to_bytes()),
            Operation::Seek { pos, .. } => self.apply_seek(caller, *pos as usize),
            Operation::FaultyRead { .. } => self.apply_faulty_read(caller),
            Operation::FaultyWrite { payload, .. } => {
                self.apply_faulty_write(caller, payload.to_bytes().len())
            },
        }
    }

    /// Extract observable state for comparison.
    pub fn observable_state(&self) -> ObservableState {
        ObservableState {
            locked: self.device.holder().is_some(),
            written: self.device.written(),
            offsets: self.sessions.clone(),
        }
    }

    fn apply_open(&mut self, caller: CallerId) -> OperationResult {
        match self.device.open(caller) {
            Ok(()) => {
                self.sessions[caller as usize] = Some(0);
                OperationResult::Opened
            },
            Err(e) => OperationResult::Error(e),
        }
    }

    fn apply_release(&mut self, caller: CallerId) -> OperationResult {
        if self.sessions[caller as usize].take().is_none() {
            return OperationResult::Error(OperationError::NoSession);
        }
        self.device.release();
        OperationResult::Released
    }

    fn apply_read(&mut self, caller: CallerId, max: usize) -> OperationResult {
        let Some(offset) = self.sessions[caller as usize].as_mut() else {
            return OperationResult::Error(OperationError::NoSession);
        };

        let data = self.device.read(*offset, max.min(BUFFER_CAPACITY));
        *offset += data.len();
        OperationResult::Read(data)
    }

    fn apply_write(&mut self, caller: CallerId, data: &[u8]) -> OperationResult {
        let Some(offset) = self.sessions[caller as usize].as_mut() else {
            return OperationResult::Error(OperationError::NoSession);
        };

        match self.device.write(*offset, data) {
            Ok(end) => {
                *offset = end;
                OperationResult::Wrote(data.len())
            },
            Err(e) => OperationResult::Error(e),
        }
    }

    fn apply_seek(&mut self, caller: CallerId, pos: usize) -> OperationResult {
        let Some(offset) = self.sessions[caller as usize].as_mut() else {
            return OperationResult::Error(OperationError::NoSession);
        };

        if pos > BUFFER_CAPACITY {
            return OperationResult::Error(OperationError::InvalidOffset);
        }
        *offset = pos;
        OperationResult::Seeked(pos)
    }

    /// End of data is reported before the destination is touched.
    fn apply_faulty_read(&self, caller: CallerId) -> OperationResult {
        let Some(offset) = self.sessions[caller as usize] else {
            return OperationResult::Error(OperationError::NoSession);
        };

        if offset >= self.device.written() {
            return OperationResult::Read(Vec::new());
        }
        OperationResult::Error(OperationError::Fault)
    }

    /// Capacity is checked before the source is touched.
    fn apply_faulty_write(&self, caller: CallerId, len: usize) -> OperationResult {
        let Some(offset) = self.sessions[caller as usize] else {
            return OperationResult::Error(OperationError::NoSession);
        };

        match self.device.check_write(offset, len) {
            Ok(()) => OperationResult::Error(OperationError::Fault),
            Err(e) => OperationResult::Error(e),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::Payload;

    #[test]
    fn open_is_exclusive() {
        let mut world = ModelWorld::new(2, WriteMode::Rewind);

        assert_eq!(world.apply(&Operation::Open { caller: 0 }), OperationResult::Opened);
        assert_eq!(
            world.apply(&Operation::Open { caller: 1 }),
            OperationResult::Error(OperationError::Busy)
        );
        assert_eq!(world.apply(&Operation::Release { caller: 0 }), OperationResult::Released);
        assert_eq!(world.apply(&Operation::Open { caller: 1 }), OperationResult::Opened);
    }

    #[test]
    fn release_without_session_does_not_unlock() {
        let mut world = ModelWorld::new(2, WriteMode::Rewind);
        world.apply(&Operation::Open { caller: 0 });

        assert_eq!(
            world.apply(&Operation::Release { caller: 1 }),
            OperationResult::Error(OperationError::NoSession)
        );
        assert!(world.observable_state().locked);
    }

    #[test]
    fn out_of_range_caller_is_rejected() {
        let mut world = ModelWorld::new(2, WriteMode::Rewind);
        assert_eq!(world.num_callers(), 2);
        assert_eq!(
            world.apply(&Operation::Open { caller: 2 }),
            OperationResult::Error(OperationError::InvalidCaller)
        );
        assert!(world.device().holder().is_none());
    }

    #[test]
    fn write_and_read_back() {
        let mut world = ModelWorld::new(1, WriteMode::Rewind);
        world.apply(&Operation::Open { caller: 0 });
        world.apply(&Operation::Write { caller: 0, payload: Payload { seed: 1, len: 3 } });
        world.apply(&Operation::Release { caller: 0 });
        world.apply(&Operation::Open { caller: 0 });

        assert_eq!(
            world.apply(&Operation::Read { caller: 0, max: 256 }),
            OperationResult::Read(vec![1, 2, 3])
        );
        assert_eq!(world.device().valid_bytes(), &[1, 2, 3]);
    }
}
