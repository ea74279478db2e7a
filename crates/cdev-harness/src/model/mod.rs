//! Reference model for model-based testing.
//!
//! The model captures the device contract without locks, atomics or caller
//! memory. It serves as the oracle against which the real device is
//! verified.
//!
//! # Design Principles
//!
//! - Simplicity: The model should be obviously correct
//! - Contract, not mechanism: Captures WHAT, not HOW
//! - Deterministic: Same inputs produce same outputs

mod device;
pub mod operation;
mod world;

pub use device::ModelDevice;
pub use operation::{CallerId, Operation, OperationError, OperationResult, Payload};
pub use world::{ModelWorld, ObservableState};
