//! Blocking behavior of the bounded queue across threads.
//!
//! To see queue events while debugging:
//! ```bash
//! RUST_LOG=msgq=trace cargo test --features tracing --test bounded -- --nocapture
//! ```

use std::sync::Once;
use std::sync::atomic::{AtomicBool, Ordering};
use std::thread;
use std::time::{Duration, Instant};

use msgq::{BoundedQueue, Msg, Timeout};

static INIT_TRACING: Once = Once::new();

fn init_test_tracing() {
    INIT_TRACING.call_once(msgq::init_tracing);
}

fn payloads(queue: &BoundedQueue<Msg<char>>) -> Vec<char> {
    std::iter::from_fn(|| queue.try_get().map(Msg::into_payload)).collect()
}

#[test]
#[serial_test::serial]
fn put_blocks_when_full_until_get_frees_slot() {
    init_test_tracing();
    let queue: BoundedQueue<Msg<char>> = BoundedQueue::new(2).unwrap();

    queue.put(Msg::new(0, 'A'));
    queue.put(Msg::new(0, 'B'));
    assert_eq!(queue.len(), 2);

    let c_done = AtomicBool::new(false);

    thread::scope(|s| {
        let producer = s.spawn(|| {
            queue.put(Msg::new(0, 'C'));
            c_done.store(true, Ordering::Release);
        });

        thread::sleep(Duration::from_millis(50));
        assert!(
            !c_done.load(Ordering::Acquire),
            "put on a full queue returned early"
        );
        assert_eq!(queue.len(), 2);

        let first = queue.get(Timeout::Infinite).unwrap();
        assert_eq!(*first.payload(), 'A');

        producer.join().unwrap();
        assert!(c_done.load(Ordering::Acquire));
    });

    assert_eq!(payloads(&queue), vec!['B', 'C']);
}

#[test]
fn fills_to_capacity_without_blocking() {
    let queue: BoundedQueue<Msg<char>> = BoundedQueue::new(3).unwrap();

    for c in ['x', 'y', 'z'] {
        queue.put(Msg::new(0, c));
    }
    assert!(queue.try_put(Msg::new(0, 'w')).is_err());
    assert_eq!(payloads(&queue), vec!['x', 'y', 'z']);
}

#[test]
#[serial_test::serial]
fn get_timeout_is_honored() {
    init_test_tracing();
    let queue: BoundedQueue<Msg<char>> = BoundedQueue::new(1).unwrap();

    let timeout = Duration::from_millis(40);
    let start = Instant::now();
    assert!(queue.get(timeout.into()).is_none());
    let elapsed = start.elapsed();

    assert!(elapsed >= timeout, "returned after {elapsed:?}");
    assert!(elapsed < Duration::from_secs(5), "blocked for {elapsed:?}");
}

#[test]
fn many_producers_one_consumer_keeps_per_producer_order() {
    init_test_tracing();
    const PRODUCERS: u32 = 4;
    const PER_PRODUCER: u32 = 500;

    let queue: BoundedQueue<Msg<(u32, u32)>> = BoundedQueue::new(8).unwrap();

    let received = thread::scope(|s| {
        for p in 0..PRODUCERS {
            let queue = &queue;
            s.spawn(move || {
                for i in 0..PER_PRODUCER {
                    queue.put(Msg::new(0, (p, i)));
                }
            });
        }

        let consumer = s.spawn(|| {
            let mut received = Vec::new();
            for _ in 0..PRODUCERS * PER_PRODUCER {
                let msg = queue.get(Timeout::from_millis(5_000)).expect("consumer starved");
                received.push(msg.into_payload());
            }
            received
        });

        consumer.join().unwrap()
    });

    assert!(queue.is_empty());
    for p in 0..PRODUCERS {
        let seq: Vec<u32> = received
            .iter()
            .filter(|(producer, _)| *producer == p)
            .map(|(_, i)| *i)
            .collect();
        assert_eq!(seq, (0..PER_PRODUCER).collect::<Vec<_>>());
    }
}

#[test]
fn blocked_consumers_each_get_one_message() {
    let queue: BoundedQueue<Msg<u32>> = BoundedQueue::new(4).unwrap();
    let queue = &queue;

    let mut got = thread::scope(|s| {
        let consumers: Vec<_> = (0..3)
            .map(|_| {
                s.spawn(move || {
                    queue
                        .get(Timeout::from_millis(5_000))
                        .map(Msg::into_payload)
                })
            })
            .collect();

        thread::sleep(Duration::from_millis(20));
        for i in 0..3 {
            queue.put(Msg::new(0, i));
        }

        consumers
            .into_iter()
            .map(|c| c.join().unwrap().expect("consumer timed out"))
            .collect::<Vec<_>>()
    });

    got.sort_unstable();
    assert_eq!(got, vec![0, 1, 2]);
}
