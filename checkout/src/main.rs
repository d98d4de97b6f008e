//! Checkout queue simulator
//!
//! Usage:
//!   cargo run --release -p checkout -- --stations 4 --customers 500 --mode shared
//!   cargo run --release -p checkout -- --config runs/baseline.toml --replicates 200
//!   RUST_LOG=debug cargo run -p checkout -- --customers 10

use std::path::PathBuf;

use checkout::config::{self, CheckoutConfig};
use checkout::output::{ReplicateOutput, SimulationOutput};
use checkout::report::{MeanStd, RunSummary, UtilizationAccumulator};
use checkout::simulation;
use clap::Parser;
use log::{error, info};

#[derive(Debug, Parser)]
#[command(name = "checkout", about = "Multi-till checkout queue simulation")]
struct Cli {
    /// TOML run file; flags given here override it
    #[arg(long)]
    config: Option<PathBuf>,

    /// Number of tills, 1-5 (anything else runs 3)
    #[arg(long, allow_hyphen_values = true)]
    stations: Option<String>,

    /// Number of customers (non-positive or unreadable runs 100)
    #[arg(long, allow_hyphen_values = true)]
    customers: Option<String>,

    /// Queueing mode: 1/shared for one line, 2/per-station for a line per till
    #[arg(long)]
    mode: Option<String>,

    /// Mean minutes between arrivals
    #[arg(long)]
    mean_gap: Option<f64>,

    /// Seed of the arrival stream
    #[arg(long)]
    seed: Option<u64>,

    /// Run this many independently seeded replicates and aggregate them
    #[arg(long)]
    replicates: Option<usize>,

    /// Worker threads for replicates (default: all cores)
    #[arg(long)]
    threads: Option<usize>,

    /// Run both queueing modes on the same customers
    #[arg(long)]
    compare: bool,

    /// Directory for CSV and JSON results
    #[arg(long)]
    output: Option<PathBuf>,
}

fn main() {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    if let Err(e) = run(Cli::parse()) {
        error!("{}", e);
        std::process::exit(1);
    }
}

fn run(cli: Cli) -> Result<(), Box<dyn std::error::Error>> {
    let (mut config, file_seed, file_replicates) = match &cli.config {
        Some(path) => {
            info!("loading run file {}", path.display());
            let file = CheckoutConfig::load(path)?;
            (file.config, file.seed, file.replicates)
        }
        None => (CheckoutConfig::default(), None, None),
    };

    if let Some(stations) = &cli.stations {
        config.num_stations = config::parse_station_count(stations);
    }
    if let Some(customers) = &cli.customers {
        config.num_customers = config::parse_customer_count(customers);
    }
    if let Some(mode) = &cli.mode {
        config.queue_mode = config::parse_queue_mode(mode);
    }
    if let Some(mean_gap) = cli.mean_gap {
        config.mean_gap = mean_gap;
    }
    let config = config.validated()?;
    let seed = cli.seed.or(file_seed).unwrap_or_else(rand::random);
    let replicates = cli.replicates.or(file_replicates);

    println!("=== Checkout Queue Simulation ===\n");
    println!(
        "{} tills, {} customers, {}, mean gap {} min, seed {}\n",
        config.num_stations, config.num_customers, config.queue_mode, config.mean_gap, seed
    );

    if cli.compare {
        let comparison = simulation::compare_modes(&config, seed)?;
        print_summary("Shared queue", &comparison.shared_queue);
        print_summary("Queue per station", &comparison.queue_per_station);
        if let Some(dir) = &cli.output {
            std::fs::create_dir_all(dir)?;
            let json = serde_json::to_string_pretty(&comparison)?;
            std::fs::write(dir.join("comparison.json"), json)?;
        }
        return Ok(());
    }

    match replicates {
        Some(n) if n > 1 => run_replicates(&config, seed, n, cli.threads, cli.output.as_ref()),
        _ => {
            let run = simulation::run(&config, seed)?;
            let output = SimulationOutput::new(&config, run);
            print_summary("Run", &output.summary);
            if let Some(dir) = &cli.output {
                output.write_all(dir)?;
                println!("\nResults written to {}", dir.display());
            }
            Ok(())
        }
    }
}

fn run_replicates(
    config: &CheckoutConfig,
    base_seed: u64,
    replicates: usize,
    threads: Option<usize>,
    output: Option<&PathBuf>,
) -> Result<(), Box<dyn std::error::Error>> {
    let start = std::time::Instant::now();
    let results = simulation::run_replicates(config, base_seed, replicates, threads)?;

    let mut accumulator = UtilizationAccumulator::new();
    let mut failed = 0;
    for (replicate_id, result) in results.iter().enumerate() {
        match result {
            Ok(run) => accumulator.push(run),
            Err(e) => {
                failed += 1;
                error!("replicate {} failed: {}", replicate_id, e);
            }
        }
    }
    let aggregate = accumulator.summary();

    println!(
        "{} replicates in {:.2}s ({} failed)\n",
        replicates,
        start.elapsed().as_secs_f64(),
        failed
    );
    for (i, stats) in aggregate.station_utilization.iter().enumerate() {
        print_mean_std(&format!("Till {} utilization", i + 1), stats, "");
    }
    print_mean_std("Mean utilization", &aggregate.utilization, "");
    print_mean_std("Mean wait", &aggregate.mean_wait, " min");
    print_mean_std("Completion time", &aggregate.global_clock, " min");

    if let Some(dir) = output {
        let out = ReplicateOutput {
            config: config.clone(),
            base_seed,
            failed_replicates: failed,
            aggregate,
        };
        out.write_json(dir.join("replicates.json"))?;
        println!("\nResults written to {}", dir.display());
    }
    Ok(())
}

fn print_summary(title: &str, summary: &RunSummary) {
    println!("--- {} ({}) ---", title, summary.policy);
    println!("Completion time: {:.2} min", summary.global_clock);
    print_mean_std("Till busy time", &summary.busy_time, " min");
    print_mean_std("Till utilization", &summary.utilization, "");
    print_mean_std("Customer wait", &summary.wait, " min");
    println!(
        "Customers who waited: {}/{}",
        summary.customers_waiting, summary.num_customers
    );
    for station in &summary.stations {
        println!(
            "  Till {}: {} customers, busy {:.2} min, idle {:.2} min",
            station.station_id, station.customers_served, station.busy_time, station.idle_time
        );
    }
    println!();
}

fn print_mean_std(label: &str, stats: &MeanStd, unit: &str) {
    println!(
        "{}: mean {:.3}{unit}, std {:.3}{unit}",
        label, stats.mean, stats.std
    );
}
