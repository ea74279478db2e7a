//! Concurrent open races.
//!
//! Every round, `callers` threads line up on a barrier and call
//! [`Device::open`] at the same instant. A winner keeps its session until
//! every other caller has made its attempt, so each round has exactly one
//! winner if the lock is sound.

use std::{
    sync::{
        Barrier,
        atomic::{AtomicUsize, Ordering},
    },
    thread,
};

use cdev_core::{Device, DeviceError};

/// Tally of one or more race rounds.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct RaceOutcome {
    /// Rounds run.
    pub rounds: usize,
    /// Successful opens across all rounds.
    pub winners: usize,
    /// Opens rejected with `Busy`.
    pub busy: usize,
    /// Rounds that did not have exactly one winner.
    pub contested_rounds: usize,
    /// Highest number of sessions observed open at once.
    pub max_concurrent_holders: usize,
}

impl RaceOutcome {
    /// True if every round had exactly one winner and no overlap was seen.
    pub fn is_exclusive(&self) -> bool {
        self.contested_rounds == 0 && self.max_concurrent_holders <= 1
    }
}

/// Race `callers` threads against `device` for `rounds` rounds.
///
/// The device is left unlocked on return.
pub fn race_open(device: &Device, callers: usize, rounds: usize) -> RaceOutcome {
    let mut outcome = RaceOutcome::default();
    if callers == 0 {
        return outcome;
    }

    for round in 0..rounds {
        let start = Barrier::new(callers);
        let attempted = Barrier::new(callers);
        let holders = AtomicUsize::new(0);
        let max_holders = AtomicUsize::new(0);

        let (start, attempted, holders, max_holders) = (&start, &attempted, &holders, &max_holders);

        let results: Vec<Result<(), DeviceError>> = thread::scope(|s| {
            let handles: Vec<_> = (0..callers)
                .map(move |_| {
                    s.spawn(move || {
                        start.wait();
                        let result = device.open();
                        if let Ok(session) = &result {
                            let now = holders.fetch_add(1, Ordering::SeqCst) + 1;
                            max_holders.fetch_max(now, Ordering::SeqCst);
                            tracing::trace!("round {} won by session {}", round, session.id());
                        }
                        attempted.wait();
                        match result {
                            Ok(session) => {
                                holders.fetch_sub(1, Ordering::SeqCst);
                                session.release();
                                Ok(())
                            },
                            Err(e) => Err(e),
                        }
                    })
                })
                .collect();

            handles.into_iter().filter_map(|h| h.join().ok()).collect()
        });

        let winners = results.iter().filter(|r| r.is_ok()).count();
        let busy = results.iter().filter(|r| matches!(r, Err(DeviceError::Busy { .. }))).count();

        outcome.rounds += 1;
        outcome.winners += winners;
        outcome.busy += busy;
        if winners != 1 {
            outcome.contested_rounds += 1;
        }
        outcome.max_concurrent_holders =
            outcome.max_concurrent_holders.max(max_holders.load(Ordering::SeqCst));
    }

    tracing::debug!(
        "race on /dev/{}: {} rounds, {} winners, {} busy",
        device.name(),
        outcome.rounds,
        outcome.winners,
        outcome.busy
    );

    outcome
}
