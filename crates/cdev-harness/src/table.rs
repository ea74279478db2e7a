//! Real device driven by [`Operation`]s.
//!
//! [`SessionTable`] mirrors [`ModelWorld`](crate::ModelWorld)'s interface on
//! top of a real [`Device`]: each caller slot holds the [`Session`] that
//! caller opened, if any.

use bytes::Bytes;
use cdev_core::{BUFFER_CAPACITY, Device, DeviceError, Session};

use crate::{
    fault::FaultyBuffer,
    model::{CallerId, Operation, OperationError, OperationResult},
};

/// Sessions on a real device, one slot per caller.
#[derive(Debug)]
pub struct SessionTable<'d> {
    device: &'d Device,
    sessions: Vec<Option<Session<'d>>>,
}

impl<'d> SessionTable<'d> {
    /// Create a table of `num_callers` empty slots on `device`.
    pub fn new(device: &'d Device, num_callers: usize) -> Self {
        Self { device, sessions: (0..num_callers).map(|_| None).collect() }
    }

    /// The device under test.
    pub fn device(&self) -> &'d Device {
        self.device
    }

    /// Cursor per caller, `None` without a session.
    pub fn offsets(&self) -> Vec<Option<usize>> {
        self.sessions.iter().map(|s| s.as_ref().map(Session::offset)).collect()
    }

    /// Apply an operation and return the result.
    pub fn apply(&mut self, op: &Operation) -> OperationResult {
        let caller = op.caller();
        if caller as usize >= self.sessions.len() {
            return OperationResult::Error(OperationError::InvalidCaller);
        }

        match op {
            Operation::Open { .. } => self.apply_open(caller),
            Operation::Release { .. } => self.apply_release(caller),
            Operation::Read { max, .. } => self.with_session(caller, |session| {
                let data = session.read_to_bytes(*max as usize)?;
                Ok(OperationResult::Read(data.to_vec()))
            }),
            Operation::Write { payload, .. } => self.with_session(caller, |session| {
                session.write(&payload.to_bytes()).map(OperationResult::Wrote)
            }),
            Operation::Seek { pos, .. } => self.with_session(caller, |session| {
                session.seek(*pos as usize).map(OperationResult::Seeked)
            }),
            Operation::FaultyRead { max, .. } => self.with_session(caller, |session| {
                let mut dst = FaultyBuffer::faulting(*max as usize);
                session.read(&mut dst).map(|_| OperationResult::Read(Vec::new()))
            }),
            Operation::FaultyWrite { payload, .. } => self.with_session(caller, |session| {
                let src = FaultyBuffer::faulting(payload.to_bytes().len());
                session.write(&src).map(OperationResult::Wrote)
            }),
        }
    }

    /// Release every session and read the whole written region back.
    ///
    /// The reread goes through a fresh session of its own, so the table is
    /// left with every slot empty.
    pub fn reread(&mut self) -> Result<Bytes, DeviceError> {
        self.release_all();
        let mut session = self.device.open()?;
        session.read_to_bytes(BUFFER_CAPACITY)
    }

    /// Release every open session.
    pub fn release_all(&mut self) {
        for slot in &mut self.sessions {
            if let Some(session) = slot.take() {
                session.release();
            }
        }
    }

    fn apply_open(&mut self, caller: CallerId) -> OperationResult {
        match self.device.open() {
            Ok(session) => {
                self.sessions[caller as usize] = Some(session);
                OperationResult::Opened
            },
            Err(e) => OperationResult::Error((&e).into()),
        }
    }

    fn apply_release(&mut self, caller: CallerId) -> OperationResult {
        match self.sessions[caller as usize].take() {
            Some(session) => {
                session.release();
                OperationResult::Released
            },
            None => OperationResult::Error(OperationError::NoSession),
        }
    }

    fn with_session<F>(&mut self, caller: CallerId, f: F) -> OperationResult
    where
        F: FnOnce(&mut Session<'d>) -> Result<OperationResult, DeviceError>,
    {
        let Some(session) = self.sessions.get_mut(caller as usize).and_then(Option::as_mut) else {
            return OperationResult::Error(OperationError::NoSession);
        };

        f(session).unwrap_or_else(|e| OperationResult::Error((&e).into()))
    }
}
