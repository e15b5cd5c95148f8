//! Throughput harness for the configuration fabric.
//!
//! Streams register transactions through a full fabric and reports
//! simulated cycles per transaction and simulation speed.
//!
//! ## Usage
//!
//! ```sh
//! cargo run -p fabric-core --example throughput_harness
//! ```

#![allow(clippy::pedantic)]

use fabric_core::{ConfigFabric, FabricConfig, FabricInputs, Packet, PushIn};
use log as _;
use proptest as _;
use rstest as _;
#[cfg(feature = "serde")]
use serde as _;
use thiserror as _;

use std::time::{Duration, Instant};

#[derive(Debug, Clone, Copy)]
struct BenchmarkResult {
    name: &'static str,
    transactions: u64,
    cycles: u64,
    cycles_per_second: f64,
}

impl BenchmarkResult {
    fn cycles_per_transaction(&self) -> f64 {
        if self.transactions == 0 {
            return 0.0;
        }
        self.cycles as f64 / self.transactions as f64
    }
}

/// Runs writes and reads spread over every terminal for `duration`.
fn benchmark(name: &'static str, config: FabricConfig, duration: Duration) -> BenchmarkResult {
    let num_terminals = config.num_terminals() as u32;
    let mut fabric = ConfigFabric::new(config).expect("valid benchmark config");
    let mut stalled = false;
    let mut seq: u32 = 0;

    let start = Instant::now();
    while start.elapsed() < duration {
        for _ in 0..1_000 {
            let push = if stalled {
                PushIn::default()
            } else {
                let addr = (seq % num_terminals) * 0x1000 + (seq / num_terminals) % 2;
                seq = seq.wrapping_add(1);
                if seq % 2 == 0 {
                    PushIn::packet(Packet::write(addr, seq))
                } else {
                    PushIn::packet(Packet::read(addr))
                }
            };
            let outputs = fabric.step(&FabricInputs {
                push,
                pull_en: true,
                loopback_en: false,
            });
            stalled = outputs.pull.stall;
        }
    }
    let elapsed = start.elapsed().as_secs_f64();
    let stats = fabric.stats();

    BenchmarkResult {
        name,
        transactions: stats.responses_delivered,
        cycles: stats.cycles,
        cycles_per_second: stats.cycles as f64 / elapsed,
    }
}

fn print_results(results: &[BenchmarkResult]) {
    println!(
        "{:14} {:>14} {:>14} {:>12} {:>16}",
        "Benchmark", "Transactions", "Cycles", "Cyc/txn", "Cycles/sec"
    );
    for result in results {
        println!(
            "{:14} {:>14} {:>14} {:>12.2} {:>16.0}",
            result.name,
            result.transactions,
            result.cycles,
            result.cycles_per_transaction(),
            result.cycles_per_second
        );
    }
}

fn main() {
    let duration = Duration::from_secs(2);
    println!("Running each benchmark for {duration:?}...\n");

    let results = [
        benchmark(
            "depth-1",
            FabricConfig {
                adapter_entries: 1,
                ..FabricConfig::default()
            },
            duration,
        ),
        benchmark("default", FabricConfig::default(), duration),
        benchmark(
            "depth-8",
            FabricConfig {
                adapter_entries: 8,
                ..FabricConfig::default()
            },
            duration,
        ),
        benchmark(
            "16-terminals",
            FabricConfig {
                boundaries: (1..16).map(|i| i * 0x1000).collect(),
                ..FabricConfig::default()
            },
            duration,
        ),
    ];
    print_results(&results);
}
