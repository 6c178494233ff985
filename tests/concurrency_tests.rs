//! # Concurrency Tests
//!
//! Stress tests for the reference tracker and the update latch under many
//! threads.
//!
//! These tests verify:
//! - Concurrent reconciles on overlapping refs leave a consistent index
//! - Readers never observe a half-applied update
//! - A change marked while a reconcile consumes the latch is never lost

use app_controller::controller::reftracker::{AppKey, AppRefTracker, AppUpdateStatus, RefKey};
use std::collections::HashSet;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::Arc;
use std::thread;

const THREADS: usize = 8;
const APPS_PER_THREAD: usize = 4;
const REFS: usize = 16;
const ITERATIONS: usize = 2_000;

/// Small deterministic generator so every run exercises the same schedule inputs
struct XorShift(u64);

impl XorShift {
    fn next(&mut self) -> u64 {
        self.0 ^= self.0 << 13;
        self.0 ^= self.0 >> 7;
        self.0 ^= self.0 << 17;
        self.0
    }

    fn below(&mut self, n: usize) -> usize {
        (self.next() % n as u64) as usize
    }
}

fn ref_key(i: usize) -> RefKey {
    if i % 2 == 0 {
        RefKey::secret(format!("ref-{i}"), "default")
    } else {
        RefKey::config_map(format!("ref-{i}"), "default")
    }
}

fn random_refs(rng: &mut XorShift) -> HashSet<RefKey> {
    (0..rng.below(5)).map(|_| ref_key(rng.below(REFS))).collect()
}

#[test]
fn test_concurrent_reconciles_leave_consistent_index() {
    let tracker = Arc::new(AppRefTracker::new());

    let handles: Vec<_> = (0..THREADS)
        .map(|t| {
            let tracker = Arc::clone(&tracker);
            thread::spawn(move || {
                let mut rng = XorShift(0x9E37_79B9_7F4A_7C15 ^ (t as u64 + 1));
                // Each thread owns its Apps, as the controller never runs two
                // reconciles of one App at once; refs are shared by everyone.
                let apps: Vec<AppKey> = (0..APPS_PER_THREAD)
                    .map(|a| AppKey::new(format!("app-{t}-{a}"), "default"))
                    .collect();
                let mut last: Vec<HashSet<RefKey>> = vec![HashSet::new(); APPS_PER_THREAD];

                for _ in 0..ITERATIONS {
                    let a = rng.below(APPS_PER_THREAD);
                    if rng.below(10) == 0 {
                        tracker.remove_app_from_all_refs(&apps[a]);
                        last[a] = HashSet::new();
                    } else {
                        let refs = random_refs(&mut rng);
                        tracker.reconcile_refs(refs.clone(), &apps[a]);
                        last[a] = refs;
                    }
                    let _ = tracker.owners_referencing(&ref_key(rng.below(REFS)));
                }
                apps.into_iter().zip(last).collect::<Vec<_>>()
            })
        })
        .collect();

    let mut expected = Vec::new();
    for handle in handles {
        expected.extend(handle.join().expect("worker thread panicked"));
    }

    let snapshot = tracker.snapshot();
    assert!(snapshot.is_consistent());
    for (app, refs) in &expected {
        assert_eq!(&tracker.refs_of(app), refs, "final refs for {app}");
        for r in refs {
            assert!(tracker.owners_referencing(r).contains(app));
        }
    }
    let live_apps = expected.iter().filter(|(_, refs)| !refs.is_empty()).count();
    assert_eq!(tracker.tracked_apps(), live_apps);
}

#[test]
fn test_readers_never_see_partial_updates() {
    let tracker = Arc::new(AppRefTracker::new());
    let done = Arc::new(AtomicBool::new(false));

    let reader = {
        let tracker = Arc::clone(&tracker);
        let done = Arc::clone(&done);
        thread::spawn(move || {
            let mut checks = 0u64;
            while !done.load(Ordering::Acquire) {
                assert!(tracker.snapshot().is_consistent());
                checks += 1;
            }
            checks
        })
    };

    let writers: Vec<_> = (0..4)
        .map(|t| {
            let tracker = Arc::clone(&tracker);
            thread::spawn(move || {
                let mut rng = XorShift(0xDEAD_BEEF ^ (t as u64 + 1));
                let app = AppKey::new(format!("writer-{t}"), "default");
                for _ in 0..ITERATIONS {
                    tracker.reconcile_refs(random_refs(&mut rng), &app);
                }
                tracker.remove_app_from_all_refs(&app);
            })
        })
        .collect();

    for writer in writers {
        writer.join().expect("writer thread panicked");
    }
    done.store(true, Ordering::Release);
    reader.join().expect("reader thread panicked");

    let snapshot = tracker.snapshot();
    assert!(snapshot.app_refs.is_empty());
    assert!(snapshot.ref_apps.is_empty());
}

#[test]
fn test_take_never_loses_final_change() {
    let status = Arc::new(AppUpdateStatus::new());
    let data = Arc::new(AtomicU64::new(0));
    let producing = Arc::new(AtomicBool::new(true));
    let app = AppKey::new("app", "default");
    let writes = 10_000u64;

    let producer = {
        let (status, data, producing, app) = (
            Arc::clone(&status),
            Arc::clone(&data),
            Arc::clone(&producing),
            app.clone(),
        );
        thread::spawn(move || {
            for i in 1..=writes {
                data.store(i, Ordering::SeqCst);
                status.mark_updated(&app);
            }
            producing.store(false, Ordering::SeqCst);
        })
    };

    let consumer = {
        let (status, data, producing, app) = (
            Arc::clone(&status),
            Arc::clone(&data),
            Arc::clone(&producing),
            app.clone(),
        );
        thread::spawn(move || {
            let mut processed = 0;
            while producing.load(Ordering::SeqCst) {
                if status.take_update_needed(&app) {
                    processed = data.load(Ordering::SeqCst);
                }
            }
            processed
        })
    };

    producer.join().expect("producer panicked");
    let mut processed = consumer.join().expect("consumer panicked");

    // The reconcile that runs after the last event
    if status.take_update_needed(&app) {
        processed = data.load(Ordering::SeqCst);
    }

    assert_eq!(processed, writes);
    assert!(!status.is_update_needed(&app));
}

#[test]
fn test_two_step_consume_never_loses_final_change() {
    let status = Arc::new(AppUpdateStatus::new());
    let data = Arc::new(AtomicU64::new(0));
    let producing = Arc::new(AtomicBool::new(true));
    let app = AppKey::new("app", "default");
    let writes = 10_000u64;

    let producer = {
        let (status, data, producing, app) = (
            Arc::clone(&status),
            Arc::clone(&data),
            Arc::clone(&producing),
            app.clone(),
        );
        thread::spawn(move || {
            for i in 1..=writes {
                data.store(i, Ordering::SeqCst);
                status.mark_updated(&app);
            }
            producing.store(false, Ordering::SeqCst);
        })
    };

    let consumer = {
        let (status, data, producing, app) = (
            Arc::clone(&status),
            Arc::clone(&data),
            Arc::clone(&producing),
            app.clone(),
        );
        thread::spawn(move || {
            let mut processed = 0;
            while producing.load(Ordering::SeqCst) {
                if let Some(ticket) = status.observe(&app) {
                    let seen = data.load(Ordering::SeqCst);
                    if status.mark_consumed(&ticket) {
                        processed = seen;
                    }
                }
            }
            processed
        })
    };

    producer.join().expect("producer panicked");
    let mut processed = consumer.join().expect("consumer panicked");

    if let Some(ticket) = status.observe(&app) {
        let seen = data.load(Ordering::SeqCst);
        assert!(status.mark_consumed(&ticket));
        processed = seen;
    }

    assert_eq!(processed, writes);
    assert_eq!(status.pending_count(), 0);
}

#[test]
fn test_marks_for_many_apps_from_many_threads() {
    let status = Arc::new(AppUpdateStatus::new());

    let handles: Vec<_> = (0..THREADS)
        .map(|t| {
            let status = Arc::clone(&status);
            thread::spawn(move || {
                for a in 0..APPS_PER_THREAD {
                    let app = AppKey::new(format!("app-{a}"), "default");
                    status.mark_updated(&app);
                    if t % 2 == 0 {
                        let _ = status.is_update_needed(&app);
                    }
                }
            })
        })
        .collect();
    for handle in handles {
        handle.join().expect("marking thread panicked");
    }

    assert_eq!(status.pending_count(), APPS_PER_THREAD);
    for a in 0..APPS_PER_THREAD {
        let app = AppKey::new(format!("app-{a}"), "default");
        assert!(status.take_update_needed(&app));
        assert!(!status.take_update_needed(&app));
    }
}
