mod common;

use std::sync::atomic::{AtomicUsize, Ordering};
use std::thread;

use common::SimCpu;
use mplock::{CpuId, LockState, MpLock};

const CPUS: usize = 4;
const ROUNDS: usize = 2_000;

fn assert_quiescent(lock: &MpLock<SimCpu>) {
    match lock.state() {
        LockState::Free => assert!(!lock.held_by_current()),
        LockState::Held { owner, depth } => {
            assert!(depth >= 1);
            assert_eq!(lock.held_by_current(), owner == SimCpu::current());
        }
        LockState::Claimed => panic!("transient state visible outside acquire"),
    }
}

#[test]
fn cpus_never_hold_the_lock_together() {
    let lock: MpLock<SimCpu> = MpLock::new();
    let inside = AtomicUsize::new(0);
    let entries = AtomicUsize::new(0);

    thread::scope(|s| {
        for cpu in 0..CPUS {
            let (lock, inside, entries) = (&lock, &inside, &entries);
            s.spawn(move || {
                SimCpu::bind(cpu);
                for round in 0..ROUNDS {
                    let nesting = round % 3 + 1;

                    lock.acquire();
                    assert_eq!(inside.fetch_add(1, Ordering::SeqCst), 0);
                    for _ in 1..nesting {
                        lock.acquire();
                    }
                    assert!(lock.held_by_current());
                    assert_eq!(lock.depth(), nesting);
                    entries.fetch_add(1, Ordering::Relaxed);

                    for _ in 1..nesting {
                        lock.release();
                    }
                    assert_eq!(inside.fetch_sub(1, Ordering::SeqCst), 1);
                    lock.release();
                }
            });
        }
    });

    // Every acquire eventually succeeded.
    assert_eq!(entries.load(Ordering::Relaxed), CPUS * ROUNDS);
    assert_eq!(lock.state(), LockState::Free);
}

#[test]
fn n_acquires_then_n_releases_frees_the_lock() {
    let lock: MpLock<SimCpu> = MpLock::new();
    SimCpu::bind(2);

    for n in 1..=16 {
        for depth in 1..=n {
            lock.acquire();
            assert_eq!(lock.depth(), depth);
            assert_quiescent(&lock);
        }
        for _ in 0..n {
            assert!(lock.held_by_current());
            lock.release();
            assert_quiescent(&lock);
        }
        assert_eq!(lock.state(), LockState::Free);
    }
}

#[test]
fn release_all_round_trips_the_depth() {
    let lock: MpLock<SimCpu> = MpLock::new();
    SimCpu::bind(1);

    for n in 1..=16 {
        lock.acquire_count(n);
        assert_eq!(lock.release_all(), n);
        assert_quiescent(&lock);
        assert_eq!(lock.state(), LockState::Free);

        lock.acquire_count(n);
        assert!(lock.held_by_current());
        assert_eq!(lock.release_all(), n);
    }
}

#[test]
fn release_all_hands_depth_to_another_cpu() {
    let lock: MpLock<SimCpu> = MpLock::new();
    SimCpu::bind(1);
    lock.acquire_count(3);
    let depth = lock.release_all();

    thread::scope(|s| {
        s.spawn(|| {
            SimCpu::bind(5);
            lock.acquire_count(depth);
            assert_eq!(
                lock.state(),
                LockState::Held {
                    owner: CpuId::new(5),
                    depth: 3
                }
            );
            assert_eq!(lock.release_all(), 3);
        })
        .join()
        .unwrap();
    });

    assert_eq!(lock.state(), LockState::Free);
}

#[test]
fn release_all_but_one_keeps_one_hold() {
    let lock: MpLock<SimCpu> = MpLock::new();
    SimCpu::bind(1);

    for n in 1..=16 {
        lock.acquire_count(n);
        assert_eq!(lock.release_all_but_one(), n - 1);
        assert_eq!(lock.depth(), 1);
        assert_quiescent(&lock);

        lock.release();
        assert_eq!(lock.state(), LockState::Free);
    }
}

#[test]
fn depth_dropped_by_release_all_but_one_can_be_restored() {
    let lock: MpLock<SimCpu> = MpLock::new();
    SimCpu::bind(0);

    lock.acquire_count(5);
    let extra = lock.release_all_but_one();
    lock.acquire_count(extra);
    assert_eq!(lock.depth(), 5);
    assert_eq!(lock.release_all(), 5);
}

#[test]
fn contended_release_all_cycles_make_progress() {
    let lock: MpLock<SimCpu> = MpLock::new();
    let entries = AtomicUsize::new(0);

    thread::scope(|s| {
        for cpu in 0..CPUS {
            let (lock, entries) = (&lock, &entries);
            s.spawn(move || {
                SimCpu::bind(cpu);
                for _ in 0..ROUNDS / 4 {
                    lock.acquire_count(2);
                    let depth = lock.release_all();
                    assert_eq!(depth, 2);
                    lock.acquire_count(depth);
                    assert_eq!(lock.release_all_but_one(), 1);
                    entries.fetch_add(1, Ordering::Relaxed);
                    lock.release();
                }
            });
        }
    });

    assert_eq!(entries.load(Ordering::Relaxed), CPUS * (ROUNDS / 4));
    assert_eq!(lock.state(), LockState::Free);
}
