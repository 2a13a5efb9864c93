use parking_lot::Mutex;
use sift_core::{IndexRead, SiftError, ThreadSafeIndex, WorkQueue};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::thread;
use std::time::Duration;

#[test]
fn barrier_sees_every_increment() {
    let queue = WorkQueue::new(4).unwrap();
    let counter = Arc::new(Mutex::new(0usize));
    for _ in 0..100 {
        let counter = Arc::clone(&counter);
        queue.submit(move || {
            thread::sleep(Duration::from_micros(200));
            *counter.lock() += 1;
            Ok(())
        });
    }
    queue.await_completion();
    assert_eq!(*counter.lock(), 100);
}

#[test]
fn barrier_waits_for_tasks_submitted_by_tasks() {
    let queue = WorkQueue::new(3).unwrap();
    let handle = queue.handle();
    let done = Arc::new(AtomicUsize::new(0));
    for _ in 0..10 {
        let handle = handle.clone();
        let done = Arc::clone(&done);
        queue.submit(move || {
            for _ in 0..5 {
                let done = Arc::clone(&done);
                handle.submit(move || {
                    thread::sleep(Duration::from_millis(2));
                    done.fetch_add(1, Ordering::SeqCst);
                    Ok(())
                });
            }
            done.fetch_add(1, Ordering::SeqCst);
            Ok(())
        });
    }
    queue.await_completion();
    assert_eq!(done.load(Ordering::SeqCst), 60);
}

#[test]
fn concurrent_adds_to_one_term() {
    let queue = WorkQueue::new(8).unwrap();
    let index = Arc::new(ThreadSafeIndex::new());
    for i in 0..32 {
        let index = Arc::clone(&index);
        queue.submit(move || {
            index.add_position("shared", &format!("file{i:02}.txt"), i + 1);
            Ok(())
        });
    }
    queue.await_completion();
    assert_eq!(index.num_locations("shared"), 32);
    assert!(index.has_position("shared", "file07.txt", 8));
}

#[test]
fn failing_tasks_do_not_stall_the_barrier() {
    let queue = WorkQueue::new(2).unwrap();
    let ok = Arc::new(AtomicUsize::new(0));
    for i in 0..20 {
        let ok = Arc::clone(&ok);
        queue.submit(move || {
            if i % 2 == 0 {
                return Err(SiftError::NotFound(format!("doc{i}")));
            }
            ok.fetch_add(1, Ordering::SeqCst);
            Ok(())
        });
    }
    queue.await_completion();
    assert_eq!(ok.load(Ordering::SeqCst), 10);
    assert_eq!(queue.pending(), 0);
}

#[test]
fn shutdown_drains_queued_work() {
    let queue = WorkQueue::new(1).unwrap();
    let done = Arc::new(AtomicUsize::new(0));
    for _ in 0..25 {
        let done = Arc::clone(&done);
        queue.submit(move || {
            done.fetch_add(1, Ordering::SeqCst);
            Ok(())
        });
    }
    assert_eq!(queue.size(), 1);
    queue.shutdown();
    assert_eq!(done.load(Ordering::SeqCst), 25);
}

#[test]
fn queue_is_reusable_across_phases() {
    let queue = WorkQueue::new(2).unwrap();
    let done = Arc::new(AtomicUsize::new(0));
    for round in 1..=3 {
        for _ in 0..10 {
            let done = Arc::clone(&done);
            queue.submit(move || {
                done.fetch_add(1, Ordering::SeqCst);
                Ok(())
            });
        }
        queue.await_completion();
        assert_eq!(done.load(Ordering::SeqCst), round * 10);
    }
}
