//! Export of run results for external analysis and plotting.
//!
//! Customers and stations go to CSV, the summary with its metadata to JSON.

use std::fs;
use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::config::CheckoutConfig;
use crate::error::Result;
use crate::report::{AggregateSummary, RunSummary};
use crate::simulation::SimulationRun;

/// Everything written for one run
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SimulationOutput {
    pub metadata: RunMetadata,
    pub summary: RunSummary,
    #[serde(skip)]
    pub run: Option<SimulationRun>,
}

/// Metadata for reproducibility
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RunMetadata {
    pub config: CheckoutConfig,
    pub seed: Option<u64>,
    pub crate_version: String,
}

impl SimulationOutput {
    pub fn new(config: &CheckoutConfig, run: SimulationRun) -> Self {
        SimulationOutput {
            metadata: RunMetadata {
                config: config.clone(),
                seed: run.seed,
                crate_version: env!("CARGO_PKG_VERSION").to_string(),
            },
            summary: RunSummary::from_run(&run),
            run: Some(run),
        }
    }

    /// One row per customer, in id order
    pub fn write_customers_csv<P: AsRef<Path>>(&self, path: P) -> Result<()> {
        let mut wtr = csv::Writer::from_path(path)?;
        wtr.write_record([
            "customer_id",
            "station_id",
            "arrival_gap",
            "cumulative_arrival",
            "basket_size",
            "payment",
            "service_duration",
            "wait_time",
        ])?;

        if let Some(run) = &self.run {
            let assignments = run.assignments();
            for customer in &run.customers {
                let station = assignments
                    .get(&customer.id)
                    .map(|id| id.to_string())
                    .unwrap_or_default();
                wtr.write_record(&[
                    customer.id.to_string(),
                    station,
                    customer.arrival_gap.to_string(),
                    customer.cumulative_arrival.to_string(),
                    customer.basket_size.to_string(),
                    customer.payment.to_string(),
                    customer.service_duration.to_string(),
                    customer.wait_time.to_string(),
                ])?;
            }
        }

        wtr.flush()?;
        Ok(())
    }

    /// One row per station, in id order
    pub fn write_stations_csv<P: AsRef<Path>>(&self, path: P) -> Result<()> {
        let mut wtr = csv::Writer::from_path(path)?;
        wtr.write_record([
            "station_id",
            "customers_served",
            "busy_time",
            "idle_time",
            "completion",
            "utilization",
        ])?;

        for station in &self.summary.stations {
            wtr.write_record(&[
                station.station_id.to_string(),
                station.customers_served.to_string(),
                station.busy_time.to_string(),
                station.idle_time.to_string(),
                station.completion.to_string(),
                station.utilization.to_string(),
            ])?;
        }

        wtr.flush()?;
        Ok(())
    }

    pub fn write_summary_json<P: AsRef<Path>>(&self, path: P) -> Result<()> {
        let json = serde_json::to_string_pretty(self)?;
        fs::write(path, json)?;
        Ok(())
    }

    /// Creates `dir` if needed and writes customers.csv, stations.csv and
    /// summary.json
    pub fn write_all<P: AsRef<Path>>(&self, dir: P) -> Result<()> {
        let dir = dir.as_ref();
        fs::create_dir_all(dir)?;

        self.write_customers_csv(dir.join("customers.csv"))?;
        self.write_stations_csv(dir.join("stations.csv"))?;
        self.write_summary_json(dir.join("summary.json"))?;

        Ok(())
    }
}

/// Replicate aggregate plus the configuration that produced it
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ReplicateOutput {
    pub config: CheckoutConfig,
    pub base_seed: u64,
    pub failed_replicates: usize,
    pub aggregate: AggregateSummary,
}

impl ReplicateOutput {
    pub fn write_json<P: AsRef<Path>>(&self, path: P) -> Result<()> {
        if let Some(parent) = path.as_ref().parent() {
            fs::create_dir_all(parent)?;
        }
        let json = serde_json::to_string_pretty(self)?;
        fs::write(path, json)?;
        Ok(())
    }
}
