//! Fault injection tests.
//!
//! Caller buffers fault at a seeded rate. Every faulting call must surface
//! `Fault` and leave the device and the cursor exactly as they were; every
//! healthy call must behave as if no faults had happened before it.

use cdev_core::{BUFFER_CAPACITY, Device, DeviceError};
use cdev_harness::{FaultInjector, ModelDevice};
use proptest::prelude::*;
use rand::{Rng, SeedableRng};
use rand_chacha::ChaCha8Rng;

#[test]
fn seeded_faults_leave_no_trace() {
    let device = Device::default();
    let mut model = ModelDevice::new(device.write_mode());
    let mut injector = FaultInjector::new(12345, 0.3);
    let mut rng = ChaCha8Rng::seed_from_u64(12345);

    let mut session = device.open().unwrap();
    let mut offset = 0usize;

    for _ in 0..500 {
        if rng.gen_bool(0.5) {
            let len = rng.gen_range(0..=BUFFER_CAPACITY);
            let data: Vec<u8> = (0..len).map(|_| rng.r#gen()).collect();
            let src = injector.source(data.clone());

            match session.write(&src) {
                Ok(n) => {
                    assert!(!src.is_faulting());
                    assert_eq!(n, len);
                    offset = model.write(offset, &data).unwrap();
                },
                Err(DeviceError::Fault { .. }) => assert!(src.is_faulting()),
                Err(DeviceError::CapacityExceeded { .. }) => {
                    assert!(model.write(offset, &data).is_err());
                },
                Err(e) => panic!("unexpected error {e}"),
            }
        } else {
            let max = rng.gen_range(0..=BUFFER_CAPACITY);
            let mut dst = injector.sink(max);
            let expected = model.read(offset, max);

            match session.read(&mut dst) {
                Ok(n) => {
                    assert_eq!(n, expected.len());
                    if !dst.is_faulting() {
                        assert_eq!(&dst.as_bytes()[..n], expected.as_slice());
                    }
                    offset += n;
                },
                Err(DeviceError::Fault { .. }) => assert!(dst.is_faulting()),
                Err(e) => panic!("unexpected error {e}"),
            }
        }

        assert_eq!(session.offset(), offset);
        assert_eq!(device.written_len(), model.written());

        if rng.gen_bool(0.1) {
            session.seek(0).unwrap();
            offset = 0;
        }
    }

    assert!(injector.injected() > 0, "seed should inject at least one fault");
}

proptest! {
    /// Same seed, same fault pattern, same final device.
    #[test]
    fn prop_fault_runs_are_deterministic(seed in any::<u64>()) {
        let run = |seed: u64| {
            let device = Device::default();
            let mut injector = FaultInjector::new(seed, 0.5);
            let mut session = device.open().unwrap();
            let mut errors = Vec::new();

            for i in 0..32u8 {
                let src = injector.source(vec![i; 4]);
                errors.push(session.write(&src).is_err());
                let _ = session.seek(0);
            }

            let data = session.read_to_bytes(BUFFER_CAPACITY).unwrap();
            (errors, data.to_vec())
        };

        prop_assert_eq!(run(seed), run(seed));
    }
}
