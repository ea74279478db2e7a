//! cdev host.
//!
//! Owns the lifetime of a single [`Device`]: constructs it at startup, lends
//! it to whatever drives it, and tears it down at shutdown. This replaces
//! module-scope globals with a value the entry point holds.
//!
//! ## Architecture
//!
//! ```text
//! cdev-host
//!   ├─ Host         (device lifecycle, roundtrip and race drivers)
//!   ├─ load_config  (JSON DeviceConfig)
//!   └─ HostError    (device, I/O, config, exclusivity)
//! ```

#![forbid(unsafe_code)]
#![warn(missing_docs)]

mod error;

use std::{
    io::{self, BufRead},
    path::Path,
};

use bytes::Bytes;
use cdev_core::{BUFFER_CAPACITY, Device, DeviceConfig, DeviceStats};
use cdev_harness::{RaceOutcome, race_open};
pub use error::HostError;

/// Load a device configuration from a JSON file.
///
/// Missing fields take their defaults.
pub fn load_config(path: &Path) -> Result<DeviceConfig, HostError> {
    let raw = std::fs::read_to_string(path)?;
    let config = serde_json::from_str(&raw)?;
    tracing::debug!("Loaded configuration from {}", path.display());
    Ok(config)
}

/// Read one line of at most `BUFFER_CAPACITY - 1` bytes from `reader`.
///
/// The newline is kept when it fits. Longer lines are cut short and the
/// rest is left unread in `reader`.
pub fn read_message<R: BufRead>(reader: R) -> io::Result<Vec<u8>> {
    let mut line = Vec::new();
    reader.take(BUFFER_CAPACITY as u64 - 1).read_until(b'\n', &mut line)?;
    Ok(line)
}

/// Process-level owner of the device.
#[derive(Debug)]
pub struct Host {
    device: Device,
}

impl Host {
    /// Bring the device up.
    pub fn start(config: DeviceConfig) -> Self {
        tracing::info!("{}: Initializing module", config.name);
        let device = Device::new(config);
        tracing::info!("{}: Device successfully added", device.name());
        Self { device }
    }

    /// The hosted device.
    pub fn device(&self) -> &Device {
        &self.device
    }

    /// Write `message`, release, reopen and read the device back.
    ///
    /// Each half opens and releases its own session. Another caller holding
    /// the device in between makes this fail with `Busy`.
    pub fn roundtrip(&self, message: &[u8]) -> Result<Bytes, HostError> {
        tracing::info!("Opening /dev/{} to write", self.device.name());
        let mut session = self.device.open()?;
        let written = session.write(message)?;
        session.release();
        tracing::info!("Wrote {} bytes", written);

        tracing::info!("Opening /dev/{} to read", self.device.name());
        let mut session = self.device.open()?;
        let data = session.read_to_bytes(BUFFER_CAPACITY)?;
        session.release();

        Ok(data)
    }

    /// Race `callers` threads for the device over `rounds` rounds.
    ///
    /// Fails with [`HostError::ExclusivityViolated`] if any round did not
    /// have exactly one winner.
    pub fn race(&self, callers: usize, rounds: usize) -> Result<RaceOutcome, HostError> {
        let outcome = race_open(&self.device, callers, rounds);
        if callers > 0 && !outcome.is_exclusive() {
            tracing::error!("Exclusivity violated: {:?}", outcome);
            return Err(HostError::ExclusivityViolated { outcome });
        }
        Ok(outcome)
    }

    /// Tear the device down, returning its final counters.
    pub fn shutdown(self) -> DeviceStats {
        let stats = self.device.stats();
        tracing::info!(
            "{}: Cleaned up module ({} opens, {} busy, {} bytes in, {} bytes out)",
            self.device.name(),
            stats.opens,
            stats.busy_rejections,
            stats.bytes_written,
            stats.bytes_read
        );
        stats
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn roundtrip_returns_message() {
        let host = Host::start(DeviceConfig::default());
        let data = host.roundtrip(b"hello\n").unwrap();
        assert_eq!(&data[..], b"hello\n");
    }

    #[test]
    fn roundtrip_rejects_oversized_message() {
        let host = Host::start(DeviceConfig::default());
        let err = host.roundtrip(&[b'x'; 300]).unwrap_err();
        assert!(matches!(err, HostError::Device(cdev_core::DeviceError::CapacityExceeded { .. })));
    }

    #[test]
    fn roundtrip_with_device_held_is_busy() {
        let host = Host::start(DeviceConfig::default());
        let _held = host.device().open().unwrap();

        let err = host.roundtrip(b"x").unwrap_err();
        assert!(matches!(err, HostError::Device(cdev_core::DeviceError::Busy { .. })));
    }

    #[test]
    fn read_message_keeps_short_line_with_newline() {
        let mut input = io::Cursor::new(b"hello\nworld\n".to_vec());
        assert_eq!(read_message(&mut input).unwrap(), b"hello\n");
        assert_eq!(read_message(&mut input).unwrap(), b"world\n");
    }

    #[test]
    fn read_message_cuts_long_line_to_fit() {
        let long = vec![b'x'; 400];
        let message = read_message(long.as_slice()).unwrap();
        assert_eq!(message.len(), BUFFER_CAPACITY - 1);

        let host = Host::start(DeviceConfig::default());
        let data = host.roundtrip(&message).unwrap();
        assert_eq!(data.len(), BUFFER_CAPACITY - 1);
    }

    #[test]
    fn race_is_exclusive() {
        let host = Host::start(DeviceConfig::default());
        let outcome = host.race(4, 10).unwrap();
        assert_eq!(outcome.winners, 10);
    }

    #[test]
    fn shutdown_reports_stats() {
        let host = Host::start(DeviceConfig::default());
        host.roundtrip(b"abc").unwrap();

        let stats = host.shutdown();
        assert_eq!(stats.opens, 2);
        assert_eq!(stats.bytes_written, 3);
        assert_eq!(stats.bytes_read, 3);
    }
}
