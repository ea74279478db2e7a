//! Host error types.

use cdev_core::DeviceError;
use cdev_harness::RaceOutcome;
use thiserror::Error;

/// Errors that can occur while hosting the device.
#[derive(Debug, Error)]
pub enum HostError {
    /// A device operation failed.
    #[error("device error: {0}")]
    Device(#[from] DeviceError),

    /// Reading input or configuration failed.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Configuration file could not be parsed.
    #[error("configuration error: {0}")]
    Config(String),

    /// A race round saw zero or several simultaneous sessions.
    #[error(
        "exclusivity violated: {} of {} rounds contested, {} concurrent holders",
        .outcome.contested_rounds,
        .outcome.rounds,
        .outcome.max_concurrent_holders
    )]
    ExclusivityViolated {
        /// Race tally that exposed the violation.
        outcome: RaceOutcome,
    },
}

impl From<serde_json::Error> for HostError {
    fn from(err: serde_json::Error) -> Self {
        Self::Config(err.to_string())
    }
}
