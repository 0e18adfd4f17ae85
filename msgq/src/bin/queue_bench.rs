//! Queue throughput and request round-trip benchmark.
//!
//! Usage:
//!     cargo run --release --features bench --bin queue_bench
//!
//! Environment variables:
//!     PRODUCER_CPU=0       Pin producer/requester to CPU 0 (default: 0, `none` to unpin)
//!     CONSUMER_CPU=2       Pin consumer/responder to CPU 2 (default: 2, `none` to unpin)
//!     QUEUE_CAPACITY=1024  Bounded queue capacity (default: 1024)
//!     ITERATIONS=1000000   Messages per run (default: 1_000_000)

use std::env;
use std::str::FromStr;
use std::thread;

use minstant::Instant;
use msgq::{BoundedQueue, Msg, Timeout};

type Payload = u64;

struct BenchConfig {
    producer_cpu: Option<usize>,
    consumer_cpu: Option<usize>,
    capacity: usize,
    iterations: u64,
}

fn env_or<T: FromStr>(key: &str, default: T) -> T {
    env::var(key)
        .ok()
        .and_then(|s| s.parse().ok())
        .unwrap_or(default)
}

/// CPU to pin to; `none` disables pinning.
fn env_cpu(key: &str, default: usize) -> Option<usize> {
    parse_cpu(env::var(key).ok().as_deref(), default)
}

fn parse_cpu(value: Option<&str>, default: usize) -> Option<usize> {
    match value {
        Some(s) if s.eq_ignore_ascii_case("none") => None,
        Some(s) => Some(s.parse().unwrap_or(default)),
        None => Some(default),
    }
}

impl BenchConfig {
    fn from_env() -> Self {
        Self {
            producer_cpu: env_cpu("PRODUCER_CPU", 0),
            consumer_cpu: env_cpu("CONSUMER_CPU", 2),
            capacity: env_or("QUEUE_CAPACITY", 1024),
            iterations: env_or("ITERATIONS", 1_000_000),
        }
    }
}

fn pin_to_cpu(cpu: Option<usize>) {
    if let Some(id) = cpu {
        core_affinity::set_for_current(core_affinity::CoreId { id });
    }
}

fn bench_throughput(config: &BenchConfig, queue: &BoundedQueue<Msg<Payload>>) {
    let start = thread::scope(|s| {
        s.spawn(|| {
            pin_to_cpu(config.consumer_cpu);
            for expected in 0..config.iterations {
                let Some(msg) = queue.get(Timeout::Infinite) else {
                    unreachable!("infinite get returned without a message");
                };
                assert_eq!(
                    *msg.payload(),
                    expected,
                    "data corruption: expected {expected}, got {}",
                    msg.payload()
                );
            }
        });

        pin_to_cpu(config.producer_cpu);
        let start = Instant::now();
        for i in 0..config.iterations {
            queue.put(Msg::new(0, i));
        }
        start
    });
    let elapsed = start.elapsed();

    let ops_per_ms = u128::from(config.iterations) * 1_000_000 / elapsed.as_nanos().max(1);
    println!("put/get: {ops_per_ms} ops/ms");
}

fn bench_rtt(config: &BenchConfig, queue: &BoundedQueue<Msg<Payload>>) {
    let elapsed = thread::scope(|s| {
        s.spawn(|| {
            pin_to_cpu(config.consumer_cpu);
            for _ in 0..config.iterations {
                let Some(req) = queue.get(Timeout::Infinite) else {
                    unreachable!("infinite get returned without a message");
                };
                let reply = Msg::new(1, *req.payload());
                assert!(queue.respond_to(req.uid(), reply), "requester vanished");
            }
        });

        pin_to_cpu(config.producer_cpu);
        let start = Instant::now();
        for i in 0..config.iterations {
            let reply = queue.request(Msg::new(0, i), Timeout::Infinite);
            assert!(matches!(reply, Ok(Some(_))), "request {i} failed");
        }
        start.elapsed()
    });

    let rtt_ns = elapsed.as_nanos() / u128::from(config.iterations.max(1));
    println!("request/respond_to: {rtt_ns} ns RTT");
}

fn main() {
    msgq::init_tracing();
    let config = BenchConfig::from_env();

    let queue = match BoundedQueue::new(config.capacity) {
        Ok(queue) => queue,
        Err(e) => {
            eprintln!("queue_bench: {e}");
            std::process::exit(1);
        }
    };

    println!(
        "msgq bounded queue (capacity={}, iters={}):",
        config.capacity, config.iterations
    );
    bench_throughput(&config, &queue);
    bench_rtt(&config, &queue);
}
