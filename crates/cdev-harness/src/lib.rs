//! Test harness for the cdev device.
//!
//! Stands in for the processes that open, read and write the device.
//!
//! # Model-Based Testing
//!
//! The `model` module provides a reference implementation. Operations are
//! applied to both the model and a real device through [`SessionTable`], and
//! their results and observable states are compared.
//!
//! # Fault Injection
//!
//! [`FaultyBuffer`] and [`FaultInjector`] provide caller memory that refuses
//! copies, the only way to reach `DeviceError::Fault`.
//!
//! # Races
//!
//! [`race_open`] lines threads up on a barrier and has them open the device
//! simultaneously.

#![forbid(unsafe_code)]
#![warn(missing_docs)]

pub mod fault;
pub mod model;
pub mod race;
pub mod table;

pub use fault::{FaultInjector, FaultyBuffer};
pub use model::{
    CallerId, ModelDevice, ModelWorld, ObservableState, Operation, OperationError,
    OperationResult, Payload,
};
pub use race::{RaceOutcome, race_open};
pub use table::SessionTable;

/// Observable state of a real device, comparable with
/// [`ModelWorld::observable_state`].
pub fn observe(table: &SessionTable<'_>) -> ObservableState {
    let device = table.device();
    ObservableState {
        locked: device.state() == cdev_core::DeviceState::Locked,
        written: device.written_len(),
        offsets: table.offsets(),
    }
}
