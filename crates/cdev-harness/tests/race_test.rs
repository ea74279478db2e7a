//! Concurrent open races across real threads.

use std::{
    sync::{Arc, Barrier},
    thread,
};

use cdev_core::{Device, DeviceError};
use cdev_harness::race_open;

#[test]
fn exactly_one_winner_per_round() {
    let device = Device::default();
    let outcome = race_open(&device, 8, 50);

    assert_eq!(outcome.rounds, 50);
    assert_eq!(outcome.winners, 50);
    assert_eq!(outcome.busy, 50 * 7);
    assert!(outcome.is_exclusive(), "{outcome:?}");
    assert_eq!(device.stats().opens, 50);
    assert_eq!(device.stats().busy_rejections, 350);
}

#[test]
fn two_overlapping_opens() {
    let device = Arc::new(Device::default());
    let barrier = Arc::new(Barrier::new(2));
    let held = Arc::new(Barrier::new(2));

    let handles: Vec<_> = (0..2)
        .map(|_| {
            let device = Arc::clone(&device);
            let barrier = Arc::clone(&barrier);
            let held = Arc::clone(&held);
            thread::spawn(move || {
                barrier.wait();
                let result = device.open();
                held.wait();
                result.map(|session| session.id())
            })
        })
        .collect();

    let results: Vec<Result<u64, DeviceError>> =
        handles.into_iter().map(|h| h.join().unwrap()).collect();

    // Both attempts happen before either side releases.
    let wins = results.iter().filter(|r| r.is_ok()).count();
    let busy = results.iter().filter(|r| matches!(r, Err(DeviceError::Busy { .. }))).count();
    assert_eq!(wins, 1);
    assert_eq!(busy, 1);
}

#[test]
fn racing_writers_never_interleave() {
    let device = Device::default();

    thread::scope(|s| {
        for byte in 0..4u8 {
            let device = &device;
            s.spawn(move || {
                for _ in 0..200 {
                    if let Ok(mut session) = device.open() {
                        session.write(&vec![byte; 64]).unwrap();
                        session.seek(0).unwrap();
                        let data = session.read_to_bytes(64).unwrap();
                        assert!(data.iter().all(|&b| b == byte), "foreign bytes under lock");
                    }
                }
            });
        }
    });

    assert_eq!(device.written_len(), 64);
}
