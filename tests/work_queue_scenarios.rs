//! End-to-end scenarios for the work-queue Disruptor
//!
//! Covers backpressure on a full ring, racing consumers, shutdown while full,
//! concurrent producers, drain-on-stop and value fidelity.

use std::collections::HashSet;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Barrier;
use std::thread;
use std::time::Duration;

use workring::{Disruptor, DisruptorError, Yielding, SENTINEL};

#[test]
fn full_ring_blocks_writer_until_oldest_item_is_finished() {
    let queue = Disruptor::<char>::new(4).unwrap();
    for item in ['A', 'B', 'C', 'D'] {
        queue.write(item).unwrap();
    }

    let fifth_written = AtomicBool::new(false);
    thread::scope(|s| {
        let writer = s.spawn(|| {
            let sequence = queue.write('E').unwrap();
            fifth_written.store(true, Ordering::Release);
            sequence
        });

        thread::sleep(Duration::from_millis(50));
        assert!(!fifth_written.load(Ordering::Acquire), "write must wait for capacity");
        assert_eq!(queue.counters().write_commit, 3);

        {
            let mut reader = queue.reader();
            assert_eq!(reader.sequence(), 0);
            assert_eq!(*reader.content().unwrap(), 'A');
        }

        let sequence = writer.join().unwrap();
        assert_eq!(sequence, 4);
        assert_eq!(queue.slot_index(sequence), 0, "E reuses A's slot");
    });

    for (expected_sequence, expected) in [(1, 'B'), (2, 'C'), (3, 'D'), (4, 'E')] {
        let mut reader = queue.reader();
        assert_eq!(reader.sequence(), expected_sequence);
        assert_eq!(*reader.content().unwrap(), expected);
    }
    assert!(queue.is_empty());
}

#[test]
fn racing_consumers_each_get_one_item() {
    let queue = Disruptor::<&'static str>::new(4).unwrap();
    queue.write("A").unwrap();
    queue.write("B").unwrap();

    let barrier = Barrier::new(2);
    let mut claimed: Vec<(i64, &str)> = thread::scope(|s| {
        let (queue, barrier) = (&queue, &barrier);
        let consumers: Vec<_> = (0..2)
            .map(|_| {
                s.spawn(move || {
                    barrier.wait();
                    let mut reader = queue.reader();
                    (reader.sequence(), *reader.content().unwrap())
                })
            })
            .collect();
        consumers.into_iter().map(|c| c.join().unwrap()).collect()
    });

    claimed.sort_unstable();
    assert_eq!(claimed, vec![(0, "A"), (1, "B")]);
    assert!(queue.is_empty());

    queue.request_stop();
    let reader = queue.reader();
    assert!(reader.is_empty());
    assert_eq!(reader.sequence(), SENTINEL);
}

#[test]
fn write_into_full_ring_after_stop_fails() {
    let queue = Disruptor::<u32>::new(2).unwrap();
    queue.write(1).unwrap();
    queue.write(2).unwrap();

    queue.request_stop();
    assert_eq!(
        queue.write(3).unwrap_err(),
        DisruptorError::ShutdownWrite { sequence: 2 }
    );
}

#[test]
fn stop_releases_writer_spinning_on_full_ring() {
    let queue = Disruptor::<u32>::new(2).unwrap();
    queue.write(1).unwrap();
    queue.write(2).unwrap();

    thread::scope(|s| {
        let writer = s.spawn(|| queue.write(3));
        thread::sleep(Duration::from_millis(20));
        queue.request_stop();
        assert!(matches!(
            writer.join().unwrap(),
            Err(DisruptorError::ShutdownWrite { sequence: 2 })
        ));
    });
}

#[test]
fn concurrent_producers_publish_distinct_sequences() {
    const PRODUCERS: u32 = 8;
    let queue = Disruptor::<u32, Yielding>::with_wait_strategy(16, Yielding::new(32)).unwrap();

    let barrier = Barrier::new(PRODUCERS as usize);
    thread::scope(|s| {
        for tag in 0..PRODUCERS {
            let (queue, barrier) = (&queue, &barrier);
            s.spawn(move || {
                barrier.wait();
                queue.write(tag).unwrap();
            });
        }
    });

    let mut tags = HashSet::new();
    for expected_sequence in 0..i64::from(PRODUCERS) {
        let mut reader = queue.reader();
        assert_eq!(reader.sequence(), expected_sequence);
        assert!(tags.insert(*reader.content().unwrap()), "duplicate item");
    }
    assert_eq!(tags, (0..PRODUCERS).collect::<HashSet<_>>());
    assert!(queue.is_empty());
}

#[test]
fn stop_delivers_pending_items_then_reports_sentinel_to_everyone() {
    const CONSUMERS: usize = 4;
    let queue = Disruptor::<u64, Yielding>::with_wait_strategy(8, Yielding::new(16)).unwrap();

    let mut delivered: Vec<u64> = thread::scope(|s| {
        let queue = &queue;
        let consumers: Vec<_> = (0..CONSUMERS)
            .map(|_| {
                s.spawn(move || {
                    let mut seen = Vec::new();
                    loop {
                        let mut reader = queue.reader();
                        if reader.is_empty() {
                            break seen;
                        }
                        seen.push(reader.take().unwrap());
                    }
                })
            })
            .collect();

        for value in 0..5 {
            queue.write(value).unwrap();
        }
        queue.request_stop();

        consumers
            .into_iter()
            .flat_map(|c| c.join().unwrap())
            .collect()
    });

    delivered.sort_unstable();
    assert_eq!(delivered, vec![0, 1, 2, 3, 4]);
    assert_eq!(queue.claim_read(), SENTINEL);

    let counters = queue.counters();
    assert_eq!(counters.write_commit, 4);
    assert_eq!(counters.read_commit, 4);
}

#[test]
fn values_read_back_unchanged_at_their_sequence() {
    let queue = Disruptor::<String>::new(8).unwrap();
    let items: Vec<String> = (0..20).map(|i| format!("item-{i}")).collect();

    for (expected_sequence, item) in items.iter().enumerate() {
        let sequence = queue.write(item.clone()).unwrap();
        assert_eq!(sequence, expected_sequence as i64);

        let mut reader = queue.reader();
        assert_eq!(reader.sequence(), sequence);
        assert_eq!(&reader.take().unwrap(), item);
    }
}
