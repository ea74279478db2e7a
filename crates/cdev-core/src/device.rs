//! The exclusive-access device.
//!
//! A [`Device`] owns a fixed 256-byte buffer and the high-water mark of valid
//! data in it. Access goes through [`Device::open`], which hands out at most
//! one [`Session`] at a time.
//!
//! # State machine
//!
//! ```text
//! UNLOCKED --open (trylock wins)--> LOCKED   (yields Session)
//! LOCKED   --open (trylock loses)-> LOCKED   (Busy, nothing mutated)
//! LOCKED   --release / drop------> UNLOCKED
//! ```
//!
//! # Invariants
//!
//! - At most one `Session` exists per device at any instant
//! - `0 <= written_len() <= BUFFER_CAPACITY`
//! - `open` never blocks the calling thread
//! - Buffer contents and written length survive release; the offset does not

use std::sync::{
    Mutex, TryLockError,
    atomic::{AtomicU64, AtomicUsize, Ordering},
};

use crate::{
    config::{DeviceConfig, WriteMode},
    error::DeviceError,
    session::Session,
};

/// Size of the device buffer in bytes.
pub const BUFFER_CAPACITY: usize = 256;

/// Observable lock state of a device.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DeviceState {
    /// No session is open; the next `open` succeeds.
    Unlocked,
    /// A session is open; every `open` fails with `Busy`.
    Locked,
}

/// Buffer and written length, reachable only through the lock.
#[derive(Debug)]
pub(crate) struct Storage {
    pub(crate) buffer: [u8; BUFFER_CAPACITY],
    pub(crate) written: usize,
}

impl Storage {
    const fn new() -> Self {
        Self { buffer: [0; BUFFER_CAPACITY], written: 0 }
    }
}

/// Snapshot of device counters.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct DeviceStats {
    /// Successful opens.
    pub opens: u64,
    /// Opens rejected with `Busy`.
    pub busy_rejections: u64,
    /// Bytes returned by reads.
    pub bytes_read: u64,
    /// Bytes accepted by writes.
    pub bytes_written: u64,
}

#[derive(Debug, Default)]
pub(crate) struct Counters {
    opens: AtomicU64,
    busy_rejections: AtomicU64,
    pub(crate) bytes_read: AtomicU64,
    pub(crate) bytes_written: AtomicU64,
}

/// Marks a caller inside the lock region of a device.
///
/// Taken before the trylock and dropped after the guard it accompanies, so
/// the count is non-zero for the whole time the lock is held.
#[derive(Debug)]
pub(crate) struct Claim<'d> {
    claims: &'d AtomicUsize,
}

impl Drop for Claim<'_> {
    fn drop(&mut self) {
        self.claims.fetch_sub(1, Ordering::Release);
    }
}

/// Exclusive-access byte-buffer device.
///
/// `Device` is `Send + Sync`; share it between callers with `Arc` or scoped
/// threads. Each caller opens its own [`Session`].
#[derive(Debug)]
pub struct Device {
    name: String,
    write_mode: WriteMode,
    storage: Mutex<Storage>,
    /// Callers holding or trying to take `storage`, for `state()` without
    /// touching the lock.
    claims: AtomicUsize,
    /// Mirrors `Storage::written`, updated by the lock holder.
    written: AtomicUsize,
    next_session_id: AtomicU64,
    pub(crate) counters: Counters,
}

impl Device {
    /// Create an empty, unlocked device.
    pub fn new(config: DeviceConfig) -> Self {
        tracing::debug!(
            "Device {} created ({} bytes, {:?} writes)",
            config.name,
            BUFFER_CAPACITY,
            config.write_mode
        );

        Self {
            name: config.name,
            write_mode: config.write_mode,
            storage: Mutex::new(Storage::new()),
            claims: AtomicUsize::new(0),
            written: AtomicUsize::new(0),
            next_session_id: AtomicU64::new(1),
            counters: Counters::default(),
        }
    }

    /// Open the device for exclusive use.
    ///
    /// Never blocks: if another session is open this returns
    /// [`DeviceError::Busy`] immediately and leaves the device untouched.
    pub fn open(&self) -> Result<Session<'_>, DeviceError> {
        let claim = self.claim();
        let guard = match self.storage.try_lock() {
            Ok(guard) => guard,
            Err(TryLockError::WouldBlock) => {
                self.counters.busy_rejections.fetch_add(1, Ordering::Relaxed);
                tracing::warn!("/dev/{}: device already in use", self.name);
                return Err(DeviceError::Busy { device: self.name.clone() });
            },
            Err(TryLockError::Poisoned(poisoned)) => {
                // Every session step leaves storage consistent, so a holder
                // that panicked cannot have left it half-updated.
                tracing::warn!("/dev/{}: previous holder panicked, recovering lock", self.name);
                self.storage.clear_poison();
                poisoned.into_inner()
            },
        };

        self.counters.opens.fetch_add(1, Ordering::Relaxed);
        let id = self.next_session_id.fetch_add(1, Ordering::Relaxed);

        tracing::info!("/dev/{} opened (session {})", self.name, id);

        Ok(Session::new(self, guard, claim, id))
    }

    /// Current lock state.
    ///
    /// Advisory: another thread may open or release right after this returns.
    /// `Unlocked` is never reported while a session holds the lock; `Locked`
    /// may be reported briefly while a rejected open is still backing out.
    pub fn state(&self) -> DeviceState {
        if self.claims.load(Ordering::Acquire) > 0 {
            DeviceState::Locked
        } else {
            DeviceState::Unlocked
        }
    }

    /// High-water mark of valid bytes in the buffer.
    pub fn written_len(&self) -> usize {
        self.written.load(Ordering::Acquire)
    }

    /// Buffer capacity in bytes.
    pub const fn capacity(&self) -> usize {
        BUFFER_CAPACITY
    }

    /// Device identifier.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Configured write placement.
    pub const fn write_mode(&self) -> WriteMode {
        self.write_mode
    }

    /// Counter snapshot.
    pub fn stats(&self) -> DeviceStats {
        DeviceStats {
            opens: self.counters.opens.load(Ordering::Relaxed),
            busy_rejections: self.counters.busy_rejections.load(Ordering::Relaxed),
            bytes_read: self.counters.bytes_read.load(Ordering::Relaxed),
            bytes_written: self.counters.bytes_written.load(Ordering::Relaxed),
        }
    }

    pub(crate) fn publish_written(&self, written: usize) {
        self.written.store(written, Ordering::Release);
    }

    fn claim(&self) -> Claim<'_> {
        self.claims.fetch_add(1, Ordering::AcqRel);
        Claim { claims: &self.claims }
    }
}

impl Default for Device {
    fn default() -> Self {
        Self::new(DeviceConfig::default())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn new_device_is_unlocked_and_empty() {
        let device = Device::default();
        assert_eq!(device.state(), DeviceState::Unlocked);
        assert_eq!(device.written_len(), 0);
        assert_eq!(device.capacity(), 256);
        assert_eq!(device.name(), "cdev");
    }

    #[test]
    fn open_locks_and_release_unlocks() {
        let device = Device::default();

        let session = device.open().unwrap();
        assert_eq!(device.state(), DeviceState::Locked);

        session.release();
        assert_eq!(device.state(), DeviceState::Unlocked);
    }

    #[test]
    fn second_open_is_busy() {
        let device = Device::default();
        let _session = device.open().unwrap();

        let err = device.open().unwrap_err();
        assert_eq!(err, DeviceError::Busy { device: "cdev".to_string() });
        assert_eq!(device.state(), DeviceState::Locked);
    }

    #[test]
    fn dropping_session_releases() {
        let device = Device::default();
        {
            let _session = device.open().unwrap();
        }
        assert!(device.open().is_ok());
    }

    #[test]
    fn busy_open_leaves_state_locked_then_released() {
        let device = Device::default();
        let session = device.open().unwrap();

        assert!(device.open().is_err());
        assert_eq!(device.state(), DeviceState::Locked);

        session.release();
        assert_eq!(device.state(), DeviceState::Unlocked);
        assert_eq!(device.claims.load(Ordering::Acquire), 0);
    }

    #[test]
    fn state_stays_locked_until_guard_and_claim_are_gone() {
        let device = Device::default();
        let claim = device.claim();
        let guard = device.storage.lock().unwrap();

        drop(guard);
        assert_eq!(device.state(), DeviceState::Locked);

        drop(claim);
        assert_eq!(device.state(), DeviceState::Unlocked);
    }

    #[test]
    fn holder_always_sees_locked_under_contention() {
        let device = Device::default();

        std::thread::scope(|s| {
            for _ in 0..4 {
                s.spawn(|| {
                    for _ in 0..2_000 {
                        if let Ok(session) = device.open() {
                            assert_eq!(device.state(), DeviceState::Locked);
                            session.release();
                        }
                    }
                });
            }
        });

        assert_eq!(device.state(), DeviceState::Unlocked);
        assert_eq!(device.claims.load(Ordering::Acquire), 0);
        assert!(device.open().is_ok());
    }

    #[test]
    fn stats_count_opens_and_rejections() {
        let device = Device::default();
        let session = device.open().unwrap();
        let _ = device.open();
        let _ = device.open();
        session.release();

        let stats = device.stats();
        assert_eq!(stats.opens, 1);
        assert_eq!(stats.busy_rejections, 2);
    }

    #[test]
    fn session_ids_increase() {
        let device = Device::default();
        let first = device.open().unwrap();
        let first_id = first.id();
        first.release();

        let second = device.open().unwrap();
        assert!(second.id() > first_id);
    }

    #[test]
    #[allow(clippy::panic)]
    fn poisoned_lock_is_recovered() {
        let device = Device::default();

        let result = std::thread::scope(|s| {
            s.spawn(|| {
                let mut session = device.open().unwrap();
                session.write(b"abc".as_slice()).unwrap();
                if session.offset() > 0 {
                    panic!("holder dies with the session open");
                }
            })
            .join()
        });
        assert!(result.is_err());

        let mut session = device.open().unwrap();
        let data = session.read_to_bytes(16).unwrap();
        assert_eq!(&data[..], b"abc");
    }
}
