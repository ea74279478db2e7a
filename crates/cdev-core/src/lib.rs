//! Exclusive-access byte-buffer device.
//!
//! A [`Device`] exposes a fixed 256-byte buffer through open, read, write
//! and release with file-position semantics. Exactly one [`Session`] may be
//! open at a time; a competing [`Device::open`] fails immediately with
//! [`DeviceError::Busy`] instead of waiting.
//!
//! ## Architecture
//!
//! ```text
//! cdev-core
//!   ├─ Device        (buffer, written length, trylock)
//!   ├─ Session       (cursor, read/write/seek/release)
//!   ├─ DeviceConfig  (name, write placement)
//!   ├─ UserSink/Src  (caller memory, may fault)
//!   └─ DeviceError   (Busy, Fault, CapacityExceeded, InvalidOffset)
//! ```
//!
//! The crate does no registration of its own. Whatever process owns the
//! device constructs it, hands references to callers, and drops it at
//! shutdown.
//!
//! ```
//! use cdev_core::{Device, DeviceError};
//!
//! let device = Device::default();
//!
//! let mut session = device.open()?;
//! session.write(b"hello\n".as_slice())?;
//! assert!(matches!(device.open(), Err(DeviceError::Busy { .. })));
//! session.release();
//!
//! let mut session = device.open()?;
//! assert_eq!(&session.read_to_bytes(256)?[..], b"hello\n");
//! # Ok::<(), DeviceError>(())
//! ```

#![forbid(unsafe_code)]
#![warn(missing_docs)]

mod config;
mod device;
mod error;
mod session;
pub mod user;

pub use config::{DEFAULT_DEVICE_NAME, DeviceConfig, WriteMode};
pub use device::{BUFFER_CAPACITY, Device, DeviceState, DeviceStats};
pub use error::{CopyDirection, DeviceError, EBUSY, EFAULT, EINVAL, ENOSPC};
pub use session::Session;
pub use user::{UserFault, UserSink, UserSource};
