//! Summary statistics over a run and across many runs

use serde::{Deserialize, Serialize};

use crate::policy::StationPolicy;
use crate::simulation::SimulationRun;

/// Population mean and standard deviation, with the range
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct MeanStd {
    pub mean: f64,
    pub std: f64,
    pub min: f64,
    pub max: f64,
}

impl MeanStd {
    /// All zeros for an empty series
    pub fn from_values(values: &[f64]) -> Self {
        let mut stat = RunningStat::default();
        for &v in values {
            stat.push(v);
        }
        stat.mean_std()
    }
}

/// Welford's online mean and variance
#[derive(Debug, Clone, Copy, PartialEq, Default)]
struct RunningStat {
    n: usize,
    mean: f64,
    m2: f64,
    min: f64,
    max: f64,
}

impl RunningStat {
    fn push(&mut self, x: f64) {
        if self.n == 0 {
            self.min = x;
            self.max = x;
        } else {
            self.min = self.min.min(x);
            self.max = self.max.max(x);
        }
        self.n += 1;
        let delta = x - self.mean;
        self.mean += delta / self.n as f64;
        self.m2 += delta * (x - self.mean);
    }

    fn mean_std(&self) -> MeanStd {
        if self.n == 0 {
            return MeanStd::default();
        }
        MeanStd {
            mean: self.mean,
            std: (self.m2 / self.n as f64).max(0.0).sqrt(),
            min: self.min,
            max: self.max,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StationSummary {
    pub station_id: usize,
    pub customers_served: usize,
    pub busy_time: f64,
    pub idle_time: f64,
    pub completion: f64,
    pub utilization: f64,
}

/// Per-run report: station busy time, utilization and customer waits
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RunSummary {
    pub policy: StationPolicy,
    pub num_customers: usize,
    pub num_stations: usize,
    pub global_clock: f64,
    /// Busy minutes across stations
    pub busy_time: MeanStd,
    /// Busy share of the global clock across stations
    pub utilization: MeanStd,
    /// Wait across customers
    pub wait: MeanStd,
    /// Customers who waited at all
    pub customers_waiting: usize,
    pub stations: Vec<StationSummary>,
}

impl RunSummary {
    pub fn from_run(run: &SimulationRun) -> Self {
        let clock = run.global_clock;
        let stations: Vec<StationSummary> = run
            .stations
            .iter()
            .map(|s| StationSummary {
                station_id: s.id(),
                customers_served: s.queue_len(),
                busy_time: s.busy_time(),
                idle_time: s.idle_time(),
                completion: s.completion(),
                utilization: s.utilization(clock),
            })
            .collect();
        let busy: Vec<f64> = stations.iter().map(|s| s.busy_time).collect();
        let utilization: Vec<f64> = stations.iter().map(|s| s.utilization).collect();
        let waits = run.waits();

        RunSummary {
            policy: run.policy,
            num_customers: run.customers.len(),
            num_stations: run.stations.len(),
            global_clock: clock,
            busy_time: MeanStd::from_values(&busy),
            utilization: MeanStd::from_values(&utilization),
            wait: MeanStd::from_values(&waits),
            customers_waiting: waits.iter().filter(|&&w| w > 0.0).count(),
            stations,
        }
    }
}

/// Streams runs in and keeps per-station utilization, overall utilization,
/// mean wait and global clock statistics without holding the runs.
#[derive(Debug, Clone, Default)]
pub struct UtilizationAccumulator {
    runs: usize,
    by_station: Vec<RunningStat>,
    utilization: RunningStat,
    mean_wait: RunningStat,
    global_clock: RunningStat,
}

/// Statistics across every run pushed into an accumulator
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AggregateSummary {
    pub runs: usize,
    /// Utilization of station `i + 1` across runs
    pub station_utilization: Vec<MeanStd>,
    /// Mean station utilization per run, across runs
    pub utilization: MeanStd,
    /// Mean customer wait per run, across runs
    pub mean_wait: MeanStd,
    pub global_clock: MeanStd,
}

impl UtilizationAccumulator {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn runs(&self) -> usize {
        self.runs
    }

    pub fn push(&mut self, run: &SimulationRun) {
        let clock = run.global_clock;
        if self.by_station.len() < run.stations.len() {
            self.by_station
                .resize(run.stations.len(), RunningStat::default());
        }
        let mut total = 0.0;
        for (stat, station) in self.by_station.iter_mut().zip(&run.stations) {
            let u = station.utilization(clock);
            stat.push(u);
            total += u;
        }
        if !run.stations.is_empty() {
            self.utilization.push(total / run.stations.len() as f64);
        }
        self.mean_wait.push(MeanStd::from_values(&run.waits()).mean);
        self.global_clock.push(clock);
        self.runs += 1;
    }

    pub fn summary(&self) -> AggregateSummary {
        AggregateSummary {
            runs: self.runs,
            station_utilization: self.by_station.iter().map(RunningStat::mean_std).collect(),
            utilization: self.utilization.mean_std(),
            mean_wait: self.mean_wait.mean_std(),
            global_clock: self.global_clock.mean_std(),
        }
    }
}

impl<'a> Extend<&'a SimulationRun> for UtilizationAccumulator {
    fn extend<I: IntoIterator<Item = &'a SimulationRun>>(&mut self, iter: I) {
        for run in iter {
            self.push(run);
        }
    }
}
