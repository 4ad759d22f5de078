//! Demo, benchmark, and stress-test runners behind the CLI.

use std::sync::Arc;
use std::time::Duration;

use serde::Serialize;
use tracing::info;

use crate::coordinator::AllocationCoordinator;
use crate::error::Result;
use crate::harness::{SimulationConfig, SimulationHarness, SimulationResult, TrialSummary};
use crate::pool::{SeatLayout, SeatPool};
use crate::types::Strategy;

const BENCH_CSV_HEADER: &str = "strategy,rows,columns,capacity,claimants,elapsed_ms,successful,conflicts,contended,no_seat,reserved,available,expected,lost_updates,invariant_held,cpu_user_s,cpu_sys_s";
const STRESS_CSV_HEADER: &str = "strategy,capacity,claimants,trials,elapsed_ms,violations,expected_mismatches,lost_updates,conflicts,contended,min_reserved,max_reserved,cpu_user_s,cpu_sys_s";

/// Report encoding for single benchmark runs.
#[derive(Clone, Copy, Debug, PartialEq, Eq, clap::ValueEnum)]
pub enum OutputFormat {
    Csv,
    Json,
}

/// Knobs shared by the benchmark and stress runners.
#[derive(Clone, Debug)]
pub struct RunOptions {
    pub layout: SeatLayout,
    pub race_window: Duration,
    pub max_attempts: Option<usize>,
    pub seed: Option<u64>,
    /// Report invariant violations on stderr.
    pub validate: bool,
}

impl Default for RunOptions {
    fn default() -> Self {
        Self {
            layout: SeatLayout::default(),
            race_window: crate::coordinator::DEFAULT_RACE_WINDOW,
            max_attempts: None,
            seed: None,
            validate: false,
        }
    }
}

impl RunOptions {
    fn harness(&self) -> SimulationHarness {
        SimulationHarness::new(
            Arc::new(SeatPool::new(self.layout)),
            Arc::new(AllocationCoordinator::with_race_window(self.race_window)),
        )
    }

    fn config(&self, strategy: Strategy, claimants: usize) -> SimulationConfig {
        let mut config = SimulationConfig::new(strategy, claimants);
        config.max_attempts = self.max_attempts;
        config.seed = self.seed;
        config
    }
}

/// Best-effort CPU user/system time snapshot (seconds) on Unix platforms.
#[cfg(unix)]
fn cpu_times_seconds() -> Option<(f64, f64)> {
    // SAFETY: `rusage` is plain old data; all-zero is a valid value and
    // `getrusage` only writes into the struct we own.
    let mut usage: libc::rusage = unsafe { std::mem::zeroed() };
    let rc = unsafe { libc::getrusage(libc::RUSAGE_SELF, &mut usage) };
    if rc != 0 {
        return None;
    }
    let seconds = |tv: libc::timeval| tv.tv_sec as f64 + tv.tv_usec as f64 / 1_000_000.0;
    Some((seconds(usage.ru_utime), seconds(usage.ru_stime)))
}

#[cfg(not(unix))]
fn cpu_times_seconds() -> Option<(f64, f64)> {
    None
}

/// CPU seconds spent between two snapshots, if both were available.
fn cpu_delta(start: Option<(f64, f64)>) -> (Option<f64>, Option<f64>) {
    match (start, cpu_times_seconds()) {
        (Some((user_start, sys_start)), Some((user_end, sys_end))) => {
            (Some(user_end - user_start), Some(sys_end - sys_start))
        }
        _ => (None, None),
    }
}

fn fmt_cpu(value: Option<f64>) -> String {
    value
        .map(|v| format!("{v:.4}"))
        .unwrap_or_else(|| "NA".to_string())
}

fn verdict(result: &SimulationResult) -> &'static str {
    match (result.strategy, result.invariant_held) {
        (_, false) => "lost update detected",
        (Strategy::Serialized, true) => "correct",
        (Strategy::Unserialized, true) => "no lost update this run",
    }
}

/// Run the reference scenario with both strategies and print a summary.
pub fn run_demo() -> Result<()> {
    info!("demo start");
    let options = RunOptions::default();
    let harness = options.harness();
    let layout = options.layout;
    let claimants = SimulationConfig::reference(Strategy::Serialized, harness.pool()).claimants;

    println!("DEMO SUMMARY");
    println!(
        "layout={}x{} premium_rows={} capacity={} claimants={}",
        layout.rows(),
        layout.columns(),
        layout.premium_rows(),
        layout.capacity(),
        claimants
    );

    for strategy in Strategy::ALL {
        let result = harness.run(&options.config(strategy, claimants))?;
        println!();
        println!("{strategy}_seat_map:");
        for (row, seats) in harness.pool().seat_map().iter().enumerate() {
            println!("  {:>2} {seats}", row + 1);
        }
        println!("{strategy}_successful={}", result.successful_claims);
        println!("{strategy}_conflicts={}", result.conflicts);
        println!("{strategy}_contended={}", result.contended_claims);
        println!("{strategy}_reserved={}", result.final_reserved);
        println!("{strategy}_available={}", result.final_available);
        println!("{strategy}_lost_updates={}", result.lost_updates());
        println!("{strategy}_invariant_held={}", result.invariant_held);
        println!("{strategy}_verdict={}", verdict(&result));
    }
    Ok(())
}

#[derive(Serialize)]
struct BenchRecord<'a> {
    layout: &'a SeatLayout,
    race_window_ms: f64,
    cpu_user_s: Option<f64>,
    cpu_sys_s: Option<f64>,
    #[serde(flatten)]
    result: &'a SimulationResult,
}

/// Run one simulation and print a CSV row or a JSON record.
pub fn run_benchmark(
    strategy: Strategy,
    claimants: Option<usize>,
    options: &RunOptions,
    format: OutputFormat,
) -> Result<()> {
    let harness = options.harness();
    let claimants = claimants.unwrap_or_else(|| (harness.pool().capacity() / 2).max(1));
    let config = options.config(strategy, claimants);

    let cpu_start = cpu_times_seconds();
    let result = harness.run(&config)?;
    let (cpu_user_s, cpu_sys_s) = cpu_delta(cpu_start);

    match format {
        OutputFormat::Csv => {
            println!("{BENCH_CSV_HEADER}");
            println!(
                "{},{},{},{},{},{:.2},{},{},{},{},{},{},{},{},{},{},{}",
                result.strategy,
                options.layout.rows(),
                options.layout.columns(),
                result.capacity,
                result.total_claimants,
                result.elapsed_ms,
                result.successful_claims,
                result.conflicts,
                result.contended_claims,
                result.no_seat_available,
                result.final_reserved,
                result.final_available,
                result.expected_reserved,
                result.lost_updates(),
                result.invariant_held,
                fmt_cpu(cpu_user_s),
                fmt_cpu(cpu_sys_s)
            );
        }
        OutputFormat::Json => {
            let record = BenchRecord {
                layout: &options.layout,
                race_window_ms: options.race_window.as_secs_f64() * 1000.0,
                cpu_user_s,
                cpu_sys_s,
                result: &result,
            };
            println!("{}", serde_json::to_string_pretty(&record)?);
        }
    }

    if options.validate && !result.invariant_held {
        eprintln!(
            "# violation,pool_invariant,successful={},reserved={}",
            result.successful_claims, result.final_reserved
        );
    }
    Ok(())
}

fn print_stress_row(summary: &TrialSummary, capacity: usize, cpu: (Option<f64>, Option<f64>)) {
    println!(
        "{},{},{},{},{:.2},{},{},{},{},{},{},{},{},{}",
        summary.strategy,
        capacity,
        summary.claimants,
        summary.trials,
        summary.elapsed_ms,
        summary.invariant_violations,
        summary.expected_mismatches,
        summary.total_lost_updates,
        summary.total_conflicts,
        summary.total_contended_claims,
        summary.min_reserved,
        summary.max_reserved,
        fmt_cpu(cpu.0),
        fmt_cpu(cpu.1)
    );
}

/// Sweep claimant counts and strategies, repeating each `trials` times.
///
/// Without explicit claimant sets the sweep covers a quarter, half, and all
/// of the pool's capacity.
pub fn run_stress(
    strategies: &[Strategy],
    claimant_sets: Option<Vec<usize>>,
    trials: usize,
    options: &RunOptions,
) -> Result<()> {
    let harness = options.harness();
    let capacity = harness.pool().capacity();
    let mut claimant_sets = claimant_sets
        .unwrap_or_else(|| vec![(capacity / 4).max(1), (capacity / 2).max(1), capacity]);
    let before = claimant_sets.len();
    claimant_sets.retain(|&claimants| claimants > 0);
    let dropped = before - claimant_sets.len();
    if dropped > 0 {
        eprintln!("stress warning: ignored {dropped} claimant set(s) <= 0");
    }

    println!("{STRESS_CSV_HEADER}");
    for &strategy in strategies {
        for &claimants in &claimant_sets {
            let cpu_start = cpu_times_seconds();
            let summary = harness.run_trials(&options.config(strategy, claimants), trials)?;
            let cpu = cpu_delta(cpu_start);
            print_stress_row(&summary, capacity, cpu);
            if options.validate && !summary.all_held() {
                eprintln!(
                    "# violation,pool_invariant,strategy={},claimants={},runs={}/{}",
                    strategy, claimants, summary.invariant_violations, summary.trials
                );
            }
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn verdict_reflects_strategy_and_invariant() {
        let mut result = SimulationResult {
            strategy: Strategy::Serialized,
            total_claimants: 2,
            successful_claims: 2,
            conflicts: 0,
            contended_claims: 0,
            no_seat_available: 0,
            final_reserved: 2,
            final_available: 2,
            capacity: 4,
            expected_reserved: 2,
            invariant_held: true,
            elapsed_ms: 0.5,
        };
        assert_eq!(verdict(&result), "correct");
        result.strategy = Strategy::Unserialized;
        assert_eq!(verdict(&result), "no lost update this run");
        result.invariant_held = false;
        assert_eq!(verdict(&result), "lost update detected");
    }

    #[test]
    fn cpu_placeholder_when_unavailable() {
        assert_eq!(fmt_cpu(None), "NA");
        assert_eq!(fmt_cpu(Some(0.5)), "0.5000");
    }

    #[test]
    fn options_carry_retry_and_seed_into_config() {
        let options = RunOptions {
            max_attempts: Some(3),
            seed: Some(9),
            ..RunOptions::default()
        };
        let config = options.config(Strategy::Unserialized, 12);
        assert_eq!(config.max_attempts, Some(3));
        assert_eq!(config.seed, Some(9));
        assert_eq!(config.claimants, 12);
    }
}
