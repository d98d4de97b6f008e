// Invariants that must hold for every sampled run, checked across seeds,
// station counts and both queueing modes

use approx::assert_relative_eq;
use checkout::report::UtilizationAccumulator;
use checkout::simulation::{self, SimulationRun};
use checkout::{CheckoutConfig, QueueMode, Station};

const EPS: f64 = 1e-9;

fn configs() -> Vec<CheckoutConfig> {
    let mut configs = Vec::new();
    for queue_mode in [QueueMode::SharedQueue, QueueMode::QueuePerStation] {
        for num_stations in 1..=5 {
            for mean_gap in [0.0, 1.0, 3.0, 8.0] {
                configs.push(CheckoutConfig {
                    num_stations,
                    num_customers: 120,
                    queue_mode,
                    mean_gap,
                    ..CheckoutConfig::default()
                });
            }
        }
    }
    configs
}

fn for_each_run(mut check: impl FnMut(&CheckoutConfig, &SimulationRun)) {
    for (i, config) in configs().iter().enumerate() {
        for seed in [1, 2, 3] {
            let run = simulation::run(config, seed * 1000 + i as u64).unwrap();
            check(config, &run);
        }
    }
}

#[test]
fn waits_are_non_negative_and_service_positive() {
    for_each_run(|_, run| {
        for c in &run.customers {
            assert!(c.wait_time >= 0.0, "customer {} wait {}", c.id, c.wait_time);
            assert!(c.service_duration > 0.0);
        }
    });
}

#[test]
fn station_times_are_bounded_by_the_clock() {
    for_each_run(|_, run| {
        for s in &run.stations {
            assert!(s.busy_time() >= 0.0);
            assert!(s.idle_time() >= 0.0);
            assert!(s.busy_time() <= run.global_clock + EPS);
            assert!(s.idle_time() <= run.global_clock + EPS);
        }
    });
}

#[test]
fn cumulative_arrivals_never_decrease() {
    for_each_run(|_, run| {
        assert_eq!(run.customers[0].cumulative_arrival, 0);
        for pair in run.customers.windows(2) {
            assert!(pair[1].cumulative_arrival >= pair[0].cumulative_arrival);
            assert_eq!(
                pair[1].cumulative_arrival,
                pair[0].cumulative_arrival + pair[1].arrival_gap
            );
            assert_eq!(pair[1].id, pair[0].id + 1);
        }
    });
}

#[test]
fn first_customer_at_each_station_never_waits() {
    for_each_run(|_, run| {
        for s in run.stations.iter().filter(|s| !s.is_empty()) {
            let first = s.queue()[0];
            assert_eq!(run.customers[first - 1].wait_time, 0.0);
        }
    });
}

#[test]
fn busy_time_is_conserved() {
    for_each_run(|_, run| {
        assert_relative_eq!(run.total_busy_time(), run.total_service_time(), epsilon = 1e-6);
    });
}

#[test]
fn every_customer_is_served_exactly_once() {
    for_each_run(|config, run| {
        assert_eq!(run.customers.len(), config.num_customers);
        let mut served: Vec<usize> = run
            .stations
            .iter()
            .flat_map(|s| s.queue().iter().copied())
            .collect();
        served.sort_unstable();
        assert_eq!(served, (1..=config.num_customers).collect::<Vec<_>>());
    });
}

#[test]
fn global_clock_is_latest_completion() {
    for_each_run(|_, run| {
        let latest = run
            .stations
            .iter()
            .map(Station::completion)
            .fold(0.0, f64::max);
        assert_eq!(run.global_clock, latest);
        let last_departure = run
            .customers
            .iter()
            .map(|c| c.departure())
            .fold(0.0, f64::max);
        assert_relative_eq!(run.global_clock, last_departure, epsilon = EPS);
    });
}

#[test]
fn same_seed_reproduces_the_run() {
    let config = CheckoutConfig {
        num_customers: 300,
        num_stations: 4,
        ..CheckoutConfig::default()
    };

    let first = simulation::run(&config, 2024).unwrap();
    let second = simulation::run(&config, 2024).unwrap();

    assert_eq!(first, second);
}

#[test]
fn different_seeds_give_different_streams() {
    let config = CheckoutConfig::default();

    let a = simulation::run(&config, 1).unwrap();
    let b = simulation::run(&config, 2).unwrap();

    assert_ne!(a.customers, b.customers);
}

#[test]
fn both_modes_see_the_same_customers() {
    let config = CheckoutConfig::default();
    let shared = simulation::run(
        &CheckoutConfig {
            queue_mode: QueueMode::SharedQueue,
            ..config.clone()
        },
        77,
    )
    .unwrap();
    let per_station = simulation::run(&config, 77).unwrap();

    for (a, b) in shared.customers.iter().zip(&per_station.customers) {
        assert_eq!(a.cumulative_arrival, b.cumulative_arrival);
        assert_eq!(a.basket_size, b.basket_size);
        assert_eq!(a.payment, b.payment);
    }
}

#[test]
fn shared_queue_never_waits_longer_in_total_on_one_station() {
    // with a single till both policies must pick the same station
    let config = CheckoutConfig {
        num_stations: 1,
        ..CheckoutConfig::default()
    };
    let comparison = simulation::compare_modes(&config, 5).unwrap();
    assert_eq!(comparison.shared_queue.wait, comparison.queue_per_station.wait);
    assert_eq!(
        comparison.shared_queue.global_clock,
        comparison.queue_per_station.global_clock
    );
}

#[test]
fn replicates_match_sequential_runs() {
    let config = CheckoutConfig {
        num_customers: 60,
        ..CheckoutConfig::default()
    };

    let results = simulation::run_replicates(&config, 500, 12, Some(3)).unwrap();

    assert_eq!(results.len(), 12);
    for (i, result) in results.iter().enumerate() {
        let parallel = result.as_ref().unwrap();
        let sequential = simulation::run(&config, 500 + i as u64).unwrap();
        assert_eq!(parallel, &sequential);
    }
}

#[test]
fn accumulator_aggregates_across_runs() {
    let config = CheckoutConfig {
        num_customers: 80,
        num_stations: 2,
        ..CheckoutConfig::default()
    };
    let runs: Vec<SimulationRun> = (0..25)
        .map(|seed| simulation::run(&config, seed).unwrap())
        .collect();

    let mut accumulator = UtilizationAccumulator::new();
    accumulator.extend(&runs);
    let summary = accumulator.summary();

    assert_eq!(summary.runs, 25);
    assert_eq!(summary.station_utilization.len(), 2);
    for stats in &summary.station_utilization {
        assert!(stats.mean > 0.0 && stats.mean <= 1.0 + EPS);
        assert!(stats.min <= stats.mean && stats.mean <= stats.max);
    }
    let clocks: Vec<f64> = runs.iter().map(|r| r.global_clock).collect();
    let expected = clocks.iter().sum::<f64>() / clocks.len() as f64;
    assert_relative_eq!(summary.global_clock.mean, expected, epsilon = 1e-6);
}
