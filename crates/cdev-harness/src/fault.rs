//! Caller memory with injected faults.
//!
//! [`FaultyBuffer`] stands in for a caller buffer whose pages are not
//! accessible. [`FaultInjector`] hands out buffers that fault at a seeded
//! rate, so a failing run can be replayed from its seed.

use cdev_core::{UserFault, UserSink, UserSource};
use rand::{Rng, SeedableRng};
use rand_chacha::ChaCha8Rng;

/// Caller buffer that may refuse every copy.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FaultyBuffer {
    data: Vec<u8>,
    faulting: bool,
}

impl FaultyBuffer {
    /// Buffer that faults on every copy.
    pub fn faulting(len: usize) -> Self {
        Self { data: vec![0; len], faulting: true }
    }

    /// Buffer that behaves like plain memory.
    pub fn healthy(data: Vec<u8>) -> Self {
        Self { data, faulting: false }
    }

    /// Whether copies fail.
    pub fn is_faulting(&self) -> bool {
        self.faulting
    }

    /// Current contents.
    pub fn as_bytes(&self) -> &[u8] {
        &self.data
    }
}

impl UserSink for FaultyBuffer {
    fn len(&self) -> usize {
        self.data.len()
    }

    fn copy_from(&mut self, src: &[u8]) -> Result<(), UserFault> {
        if self.faulting {
            return Err(UserFault);
        }
        UserSink::copy_from(self.data.as_mut_slice(), src)
    }
}

impl UserSource for FaultyBuffer {
    fn len(&self) -> usize {
        self.data.len()
    }

    fn copy_into(&self, dst: &mut [u8]) -> Result<(), UserFault> {
        if self.faulting {
            return Err(UserFault);
        }
        self.data.as_slice().copy_into(dst)
    }
}

/// Seeded source of sometimes-faulting buffers.
#[derive(Debug, Clone)]
pub struct FaultInjector {
    rng: ChaCha8Rng,
    fault_rate: f64,
    injected: u64,
}

impl FaultInjector {
    /// Create an injector that faults with probability `fault_rate`.
    ///
    /// The rate is clamped to `0.0..=1.0`.
    pub fn new(seed: u64, fault_rate: f64) -> Self {
        tracing::debug!("fault injector seed={} rate={}", seed, fault_rate);
        Self {
            rng: ChaCha8Rng::seed_from_u64(seed),
            fault_rate: fault_rate.clamp(0.0, 1.0),
            injected: 0,
        }
    }

    /// Destination buffer of `len` bytes.
    pub fn sink(&mut self, len: usize) -> FaultyBuffer {
        if self.roll() { FaultyBuffer::faulting(len) } else { FaultyBuffer::healthy(vec![0; len]) }
    }

    /// Source buffer carrying `data`.
    pub fn source(&mut self, data: Vec<u8>) -> FaultyBuffer {
        if self.roll() {
            FaultyBuffer::faulting(data.len())
        } else {
            FaultyBuffer::healthy(data)
        }
    }

    /// Number of faulting buffers handed out so far.
    pub fn injected(&self) -> u64 {
        self.injected
    }

    fn roll(&mut self) -> bool {
        let fault = self.rng.gen_bool(self.fault_rate);
        if fault {
            self.injected += 1;
        }
        fault
    }
}
