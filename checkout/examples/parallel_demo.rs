//! Parallel replicates of the checkout model
//!
//! Builds the event loops by hand with `des::parallel` and then repeats the
//! comparison through `simulation::run_replicates`.
//!
//! Run with:
//!   cargo run --example parallel_demo -p checkout

use checkout::report::UtilizationAccumulator;
use checkout::simulation;
use checkout::{
    ArrivalProcess, Checkout, CheckoutConfig, CustomerFactory, Event, QueueMode, Stats,
};
use des::parallel::{ParallelRunner, log_progress, run_parallel};
use des::{Agent, EventLoop};

const CUSTOMERS: usize = 200;
const STATIONS: usize = 3;

fn build_loop(factory: &CustomerFactory, mode: QueueMode, seed: u64) -> EventLoop<Event, Stats> {
    let agents: Vec<Box<dyn Agent<Event, Stats>>> = vec![
        Box::new(ArrivalProcess::new(factory.clone(), CUSTOMERS, seed)),
        Box::new(Checkout::new(STATIONS, mode.policy())),
    ];
    EventLoop::new(vec![(0, Event::Start)], agents)
}

fn mean_clock(results: &[Result<Vec<Stats>, String>]) -> f64 {
    let clocks: Vec<f64> = results
        .iter()
        .filter_map(|r| r.as_ref().ok())
        .flatten()
        .filter_map(|s| match s {
            Stats::Checkout(stats) => Some(stats.run.global_clock),
            Stats::Arrivals(_) => None,
        })
        .collect();
    clocks.iter().sum::<f64>() / clocks.len().max(1) as f64
}

fn main() {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    let config = CheckoutConfig {
        num_customers: CUSTOMERS,
        num_stations: STATIONS,
        ..CheckoutConfig::default()
    };
    let factory = match config.samplers() {
        Ok(samplers) => CustomerFactory::new(samplers),
        Err(e) => {
            eprintln!("bad configuration: {}", e);
            return;
        }
    };

    println!("=== Parallel Checkout Demo ===\n");

    // 1: raw event loops, one per seed
    for mode in [QueueMode::SharedQueue, QueueMode::QueuePerStation] {
        let start = std::time::Instant::now();
        let results = run_parallel(
            100,
            |seed| build_loop(&factory, mode, seed as u64),
            usize::MAX,
        );
        println!(
            "{}: {} replicates in {:.2}s, mean completion {:.2} min",
            mode,
            results.len(),
            start.elapsed().as_secs_f64(),
            mean_clock(&results)
        );
    }

    // 2: builder with a thread cap and progress logging
    let results = ParallelRunner::new(50, |seed| {
        build_loop(&factory, QueueMode::SharedQueue, 1000 + seed as u64)
    })
    .num_threads(4)
    .progress(log_progress(10))
    .run(usize::MAX);
    println!(
        "\nthread-capped run: {}/{} succeeded",
        results.iter().filter(|r| r.is_ok()).count(),
        results.len()
    );

    // 3: the library path, aggregated per station
    let results = match simulation::run_replicates(&config, 42, 200, None) {
        Ok(results) => results,
        Err(e) => {
            eprintln!("replicates failed: {}", e);
            return;
        }
    };
    let mut accumulator = UtilizationAccumulator::new();
    accumulator.extend(results.iter().filter_map(|r| r.as_ref().ok()));
    let summary = accumulator.summary();

    println!("\n{} replicates of {}:", summary.runs, config.queue_mode);
    for (i, stats) in summary.station_utilization.iter().enumerate() {
        println!(
            "  till {}: utilization {:.3} ± {:.3} (min {:.3}, max {:.3})",
            i + 1,
            stats.mean,
            stats.std,
            stats.min,
            stats.max
        );
    }
    println!(
        "  mean wait {:.2} ± {:.2} min",
        summary.mean_wait.mean, summary.mean_wait.std
    );
}
