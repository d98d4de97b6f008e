//! Drives a checkout run on the event loop and hands back the finished ledger.
//!
//! One run is strictly sequential: each customer is created from the previous
//! customer's arrival and each assignment depends on the chosen station's
//! prior state. Independent replicates, each with its own seed, can run in
//! parallel.

use std::collections::HashMap;

use des::parallel::{ParallelRunner, log_progress};
use des::{Agent, EventLoop};
use log::info;
use serde::{Deserialize, Serialize};

use crate::arrivals::ArrivalProcess;
use crate::checkout::{Checkout, CheckoutStats};
use crate::config::CheckoutConfig;
use crate::customer::{Customer, CustomerFactory};
use crate::error::{CheckoutError, Result};
use crate::policy::{QueueMode, StationPolicy};
use crate::report::RunSummary;
use crate::station::Station;
use crate::{Event, Stats};

/// A finished run: customers with waits, stations with busy and idle time,
/// and the global clock derived from them.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SimulationRun {
    /// Seed of the arrival stream; `None` for a scripted customer list
    pub seed: Option<u64>,
    pub policy: StationPolicy,
    /// In id order
    pub customers: Vec<Customer>,
    /// In id order
    pub stations: Vec<Station>,
    pub global_clock: f64,
}

impl SimulationRun {
    pub fn total_busy_time(&self) -> f64 {
        self.stations.iter().map(Station::busy_time).sum()
    }

    pub fn total_service_time(&self) -> f64 {
        self.customers.iter().map(|c| c.service_duration).sum()
    }

    pub fn waits(&self) -> Vec<f64> {
        self.customers.iter().map(|c| c.wait_time).collect()
    }

    pub fn station(&self, id: usize) -> Option<&Station> {
        self.stations.iter().find(|s| s.id() == id)
    }

    /// Station that served customer `customer_id`
    pub fn station_of(&self, customer_id: usize) -> Option<usize> {
        self.stations
            .iter()
            .find(|s| s.queue().contains(&customer_id))
            .map(Station::id)
    }

    /// Customer id to serving station id, built in one pass over the queues
    pub fn assignments(&self) -> HashMap<usize, usize> {
        self.stations
            .iter()
            .flat_map(|s| s.queue().iter().map(move |&customer_id| (customer_id, s.id())))
            .collect()
    }
}

/// Event loop for one sampled run: the arrival process feeding the checkout
fn sampled_loop(
    factory: CustomerFactory,
    num_customers: usize,
    num_stations: usize,
    policy: StationPolicy,
    seed: u64,
) -> EventLoop<Event, Stats> {
    let agents: Vec<Box<dyn Agent<Event, Stats>>> = vec![
        Box::new(ArrivalProcess::new(factory, num_customers, seed)),
        Box::new(Checkout::new(num_stations, policy)),
    ];
    EventLoop::new(vec![(0, Event::Start)], agents)
}

/// Pull the checkout's ledger out of a finished loop's stats
fn collect(stats: Vec<Stats>, seed: Option<u64>) -> Result<SimulationRun> {
    let checkout = stats.into_iter().find_map(|s| match s {
        Stats::Checkout(checkout) => Some(checkout),
        Stats::Arrivals(_) => None,
    });
    let Some(CheckoutStats { mut run, violation }) = checkout else {
        return Err(CheckoutError::Simulation(
            "event loop has no checkout agent".to_string(),
        ));
    };
    if let Some(violation) = violation {
        return Err(violation.into());
    }
    run.seed = seed;
    Ok(run)
}

/// Simulate `config.num_customers` customers arriving at
/// `config.num_stations` tills, sampling every draw from `seed`.
pub fn run(config: &CheckoutConfig, seed: u64) -> Result<SimulationRun> {
    run_validated(&config.validated()?, seed)
}

/// [`run`] on a configuration that has already been through
/// [`CheckoutConfig::validated`]
fn run_validated(config: &CheckoutConfig, seed: u64) -> Result<SimulationRun> {
    let factory = CustomerFactory::new(config.samplers()?);
    let policy = config.queue_mode.policy();

    let mut event_loop = sampled_loop(
        factory,
        config.num_customers,
        config.num_stations,
        policy,
        seed,
    );
    event_loop.run(usize::MAX);
    let run = collect(event_loop.stats(), Some(seed))?;

    info!(
        "{} customers over {} stations ({}), clock {:.2}",
        run.customers.len(),
        run.stations.len(),
        policy,
        run.global_clock
    );
    Ok(run)
}

/// [`run`] with the four core parameters and default basket and payment
/// distributions.
pub fn run_with(
    num_customers: usize,
    num_stations: usize,
    mean_gap: f64,
    policy: StationPolicy,
    seed: u64,
) -> Result<SimulationRun> {
    let queue_mode = match policy {
        StationPolicy::EarliestAvailable => QueueMode::SharedQueue,
        StationPolicy::ShortestQueue => QueueMode::QueuePerStation,
    };
    let config = CheckoutConfig {
        num_customers,
        num_stations,
        mean_gap,
        queue_mode,
        ..CheckoutConfig::default()
    };
    run(&config, seed)
}

/// Run a fixed customer list through the tills.
///
/// Customers must be in id order with non-decreasing arrivals; they arrive
/// at their `cumulative_arrival` and any preset wait is overwritten.
pub fn run_customers(
    customers: Vec<Customer>,
    num_stations: usize,
    policy: StationPolicy,
) -> Result<SimulationRun> {
    if num_stations == 0 {
        return Err(CheckoutError::invalid_config("at least one station is required"));
    }
    if let Some(pair) = customers
        .windows(2)
        .find(|pair| pair[1].cumulative_arrival < pair[0].cumulative_arrival)
    {
        return Err(CheckoutError::invalid_config(format!(
            "customer {} arrives before customer {}",
            pair[1].id, pair[0].id
        )));
    }

    let events = customers
        .into_iter()
        .map(|mut customer| {
            customer.wait_time = 0.0;
            (customer.cumulative_arrival as usize, Event::Arrival(customer))
        })
        .collect();
    let agents: Vec<Box<dyn Agent<Event, Stats>>> =
        vec![Box::new(Checkout::new(num_stations, policy))];

    let mut event_loop = EventLoop::new(events, agents);
    event_loop.run(usize::MAX);
    collect(event_loop.stats(), None)
}

/// Run `replicates` independent runs in parallel, replicate `i` seeded with
/// `base_seed + i`. Results are in replicate order; a failed replicate does
/// not stop the others.
pub fn run_replicates(
    config: &CheckoutConfig,
    base_seed: u64,
    replicates: usize,
    threads: Option<usize>,
) -> Result<Vec<Result<SimulationRun>>> {
    let config = config.validated()?;
    let factory = CustomerFactory::new(config.samplers()?);
    let policy = config.queue_mode.policy();
    let (num_customers, num_stations) = (config.num_customers, config.num_stations);

    let mut runner = ParallelRunner::new(replicates, move |replicate_id| {
        sampled_loop(
            factory.clone(),
            num_customers,
            num_stations,
            policy,
            replicate_seed(base_seed, replicate_id),
        )
    })
    .progress(log_progress((replicates / 10).max(1)));
    if let Some(n) = threads {
        runner = runner.num_threads(n);
    }

    let results = runner
        .run(usize::MAX)
        .into_iter()
        .enumerate()
        .map(|(replicate_id, result)| match result {
            Ok(stats) => collect(stats, Some(replicate_seed(base_seed, replicate_id))),
            Err(panic) => Err(CheckoutError::Simulation(format!(
                "replicate {} panicked: {}",
                replicate_id, panic
            ))),
        })
        .collect();
    Ok(results)
}

pub fn replicate_seed(base_seed: u64, replicate_id: usize) -> u64 {
    base_seed.wrapping_add(replicate_id as u64)
}

/// A single shared queue and one queue per station, fed the same customers
#[derive(Debug, Clone, Serialize)]
pub struct ModeComparison {
    pub shared_queue: RunSummary,
    pub queue_per_station: RunSummary,
}

/// Run both queue modes from the same seed. The arrival stream does not
/// depend on the policy, so both modes see identical customers.
pub fn compare_modes(config: &CheckoutConfig, seed: u64) -> Result<ModeComparison> {
    let config = config.validated()?;
    let shared = CheckoutConfig {
        queue_mode: QueueMode::SharedQueue,
        ..config.clone()
    };
    let per_station = CheckoutConfig {
        queue_mode: QueueMode::QueuePerStation,
        ..config
    };
    Ok(ModeComparison {
        shared_queue: RunSummary::from_run(&run_validated(&shared, seed)?),
        queue_per_station: RunSummary::from_run(&run_validated(&per_station, seed)?),
    })
}
