use std::process::ExitCode;
use std::time::Duration;

use clap::{Args, Parser, Subcommand};

use seat_contention::error::LayoutError;
use seat_contention::logging;
use seat_contention::pool::SeatLayout;
use seat_contention::sim::{self, OutputFormat, RunOptions};
use seat_contention::types::Strategy;

/// Concurrent seat allocation: serialized vs unserialized claims under load.
///
/// Runs the reference demo when no subcommand is given.
#[derive(Parser)]
#[command(name = "seat_contention", version)]
struct Cli {
    #[command(subcommand)]
    command: Option<Command>,
}

#[derive(Subcommand)]
enum Command {
    /// Run the 30x6 reference scenario with both strategies.
    Demo,
    /// Run one simulation and print a CSV row or JSON record.
    Bench(BenchArgs),
    /// Sweep claimant counts and strategies over repeated trials (CSV).
    Stress(StressArgs),
}

#[derive(Args)]
struct PoolArgs {
    /// Seat rows in the cabin.
    #[arg(long, default_value_t = 30)]
    rows: u32,
    /// Seats per row (lettered from A, at most 26).
    #[arg(long, default_value_t = 6)]
    columns: u32,
    /// Leading rows sold as premium.
    #[arg(long, default_value_t = 5)]
    premium_rows: u32,
    #[arg(long, default_value_t = 500.0)]
    base_price: f64,
    /// Pause inside the unserialized claim path, in milliseconds.
    #[arg(long, default_value_t = 2)]
    race_window_ms: u64,
    /// Claim calls per claimant before it gives up (default: until pool full).
    #[arg(long)]
    max_attempts: Option<usize>,
    /// Seed claimant seat choices for reproducible selections.
    #[arg(long)]
    seed: Option<u64>,
    /// Report invariant violations on stderr.
    #[arg(long)]
    validate: bool,
}

impl PoolArgs {
    fn options(&self) -> Result<RunOptions, LayoutError> {
        Ok(RunOptions {
            layout: SeatLayout::new(self.rows, self.columns, self.premium_rows, self.base_price)?,
            race_window: Duration::from_millis(self.race_window_ms),
            max_attempts: self.max_attempts,
            seed: self.seed,
            validate: self.validate,
        })
    }
}

#[derive(Args)]
struct BenchArgs {
    #[arg(long, value_enum, default_value_t = Strategy::Serialized)]
    strategy: Strategy,
    /// Concurrent claimants (default: half the capacity).
    #[arg(long)]
    claimants: Option<usize>,
    #[arg(long, value_enum, default_value_t = OutputFormat::Csv)]
    format: OutputFormat,
    #[command(flatten)]
    pool: PoolArgs,
}

#[derive(Args)]
struct StressArgs {
    /// Only sweep this strategy (default: both).
    #[arg(long, value_enum)]
    strategy: Option<Strategy>,
    /// Comma-separated claimant counts, e.g. 45,90,180.
    #[arg(long, value_delimiter = ',')]
    claimant_sets: Option<Vec<usize>>,
    /// Repetitions per configuration.
    #[arg(long, default_value_t = 10)]
    trials: usize,
    #[command(flatten)]
    pool: PoolArgs,
}

fn run(command: Command) -> seat_contention::Result<()> {
    match command {
        Command::Demo => sim::run_demo(),
        Command::Bench(args) => {
            let options = args.pool.options()?;
            sim::run_benchmark(args.strategy, args.claimants, &options, args.format)
        }
        Command::Stress(args) => {
            let options = args.pool.options()?;
            let strategies = match args.strategy {
                Some(strategy) => vec![strategy],
                None => Strategy::ALL.to_vec(),
            };
            sim::run_stress(&strategies, args.claimant_sets, args.trials, &options)
        }
    }
}

fn main() -> ExitCode {
    logging::init();
    let cli = Cli::parse();
    match run(cli.command.unwrap_or(Command::Demo)) {
        Ok(()) => ExitCode::SUCCESS,
        Err(err) => {
            eprintln!("error: {err}");
            ExitCode::from(2)
        }
    }
}
