//! Fuzz target for the [`Device`] state machine
//!
//! Drive arbitrary open/release/read/write/seek sequences from several
//! callers through the real device and the reference model in lockstep.
//!
//! # Strategy
//!
//! - Caller interleavings: any caller may issue any operation at any time
//! - Oversized writes: payload lengths run past the buffer capacity
//! - Faulting caller memory: reads and writes whose copies fail
//! - Both write placements
//!
//! # Invariants
//!
//! - Real and model results are identical for every operation
//! - At most one caller holds a session at any time
//! - `written_len() <= BUFFER_CAPACITY` and never decreases
//! - A failed operation leaves the observable state unchanged
//! - The bytes left in the device match the model's valid bytes
//! - NEVER panic on any operation sequence

#![no_main]

use arbitrary::Arbitrary;
use cdev_core::{BUFFER_CAPACITY, Device, DeviceConfig, WriteMode};
use cdev_harness::{ModelWorld, Operation, SessionTable, observe};
use libfuzzer_sys::fuzz_target;

/// Fuzz input: device setup plus the operation sequence.
#[derive(Debug, Clone, Arbitrary)]
struct FuzzInput {
    positional: bool,
    num_callers: u8,
    ops: Vec<Operation>,
}

fuzz_target!(|input: FuzzInput| {
    let write_mode = if input.positional { WriteMode::Positional } else { WriteMode::Rewind };
    let num_callers = (input.num_callers as usize % 4) + 1;

    let device = Device::new(DeviceConfig { write_mode, ..DeviceConfig::default() });
    let mut model = ModelWorld::new(num_callers, write_mode);
    let mut real = SessionTable::new(&device, num_callers);
    let mut last_written = 0;

    for op in input.ops {
        let op = op.clamp_caller(num_callers);
        let before = observe(&real);

        let model_result = model.apply(&op);
        let real_result = real.apply(&op);
        assert_eq!(model_result, real_result, "divergence on {op:?}");

        let after = observe(&real);
        assert_eq!(model.observable_state(), after);

        if real_result.is_err() {
            assert_eq!(before, after, "failed {op:?} mutated state");
        }

        let holders = after.offsets.iter().filter(|o| o.is_some()).count();
        assert!(holders <= 1, "{holders} callers hold the device");
        assert_eq!(after.locked, holders == 1);

        assert!(after.written <= BUFFER_CAPACITY);
        assert!(after.written >= last_written);
        last_written = after.written;
    }

    let Ok(data) = real.reread() else {
        panic!("device still held after releasing every session");
    };
    assert_eq!(&data[..], model.device().valid_bytes());
});
