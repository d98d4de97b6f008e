//! Run configuration.
//!
//! Counts that are out of range or unreadable never abort a run: they fall
//! back to a documented default with a warning. Distribution parameters that
//! make no sense (a negative mean gap, a cash probability outside [0, 1]) are
//! rejected instead.

use std::fs;
use std::path::Path;

use log::warn;
use serde::{Deserialize, Serialize};

use crate::error::{CheckoutError, Result};
use crate::policy::QueueMode;
use crate::sampling::{BasketParams, Samplers};

pub const MIN_STATIONS: usize = 1;
pub const MAX_STATIONS: usize = 5;
pub const DEFAULT_STATIONS: usize = 3;
pub const DEFAULT_CUSTOMERS: usize = 100;
/// Mean minutes between arrivals
pub const DEFAULT_MEAN_GAP: f64 = 3.0;
pub const DEFAULT_P_CASH: f64 = 0.4;
/// Upper bound on `num_customers * mean_gap`, in minutes. Keeps cumulative
/// arrivals exact as `f64` and far inside `u64`.
pub const MAX_ARRIVAL_HORIZON: f64 = 4_503_599_627_370_496.0; // 2^52

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CheckoutConfig {
    pub num_stations: usize,
    pub num_customers: usize,
    pub queue_mode: QueueMode,
    pub mean_gap: f64,
    pub p_cash: f64,
    pub basket: BasketParams,
}

impl Default for CheckoutConfig {
    fn default() -> Self {
        CheckoutConfig {
            num_stations: DEFAULT_STATIONS,
            num_customers: DEFAULT_CUSTOMERS,
            queue_mode: QueueMode::default(),
            mean_gap: DEFAULT_MEAN_GAP,
            p_cash: DEFAULT_P_CASH,
            basket: BasketParams::default(),
        }
    }
}

impl CheckoutConfig {
    /// Copy with counts brought into range, after checking the distribution
    /// parameters.
    pub fn validated(&self) -> Result<Self> {
        self.samplers()?;
        let config = CheckoutConfig {
            num_stations: station_count_or_default(count_as_i64(self.num_stations)),
            num_customers: customer_count_or_default(count_as_i64(self.num_customers)),
            ..self.clone()
        };
        let horizon = config.num_customers as f64 * config.mean_gap;
        if horizon > MAX_ARRIVAL_HORIZON {
            return Err(CheckoutError::invalid_config(format!(
                "{} customers at a mean gap of {} minutes exceed the arrival horizon of {} minutes",
                config.num_customers, config.mean_gap, MAX_ARRIVAL_HORIZON
            )));
        }
        Ok(config)
    }

    pub fn samplers(&self) -> Result<Samplers> {
        Samplers::new(self.mean_gap, &self.basket, self.p_cash)
    }

    /// Parse a TOML run file. Every key is optional.
    ///
    /// ```toml
    /// [simulation]
    /// stations = 4
    /// customers = 250
    /// queue_mode = "shared"
    /// mean_gap = 3.0
    /// p_cash = 0.4
    /// seed = 42
    /// replicates = 100
    ///
    /// [basket]
    /// mean = 5.0
    /// std_dev = 3.0
    /// min = 1
    /// max = 10
    /// ```
    pub fn from_toml_str(input: &str) -> Result<RunFile> {
        let file: ConfigFile = toml::from_str(input)?;
        Ok(file.into_run_file())
    }

    pub fn load<P: AsRef<Path>>(path: P) -> Result<RunFile> {
        let contents = fs::read_to_string(path)?;
        Self::from_toml_str(&contents)
    }
}

/// A run file: the configuration plus the seeding it asks for
#[derive(Debug, Clone, PartialEq)]
pub struct RunFile {
    pub config: CheckoutConfig,
    pub seed: Option<u64>,
    pub replicates: Option<usize>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct ConfigFile {
    simulation: SimulationSection,
    basket: Option<BasketParams>,
}

/// Counts are signed so that negative values reach the fallback instead of
/// failing the whole file.
#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct SimulationSection {
    stations: Option<i64>,
    customers: Option<i64>,
    queue_mode: Option<String>,
    mean_gap: Option<f64>,
    p_cash: Option<f64>,
    seed: Option<u64>,
    replicates: Option<i64>,
}

impl ConfigFile {
    fn into_run_file(self) -> RunFile {
        let sim = self.simulation;
        let defaults = CheckoutConfig::default();
        RunFile {
            config: CheckoutConfig {
                num_stations: sim
                    .stations
                    .map_or(defaults.num_stations, station_count_or_default),
                num_customers: sim
                    .customers
                    .map_or(defaults.num_customers, customer_count_or_default),
                queue_mode: sim
                    .queue_mode
                    .as_deref()
                    .map_or(defaults.queue_mode, parse_queue_mode),
                mean_gap: sim.mean_gap.unwrap_or(defaults.mean_gap),
                p_cash: sim.p_cash.unwrap_or(defaults.p_cash),
                basket: self.basket.unwrap_or(defaults.basket),
            },
            seed: sim.seed,
            replicates: sim.replicates.and_then(replicate_count_or_default),
        }
    }
}

fn count_as_i64(n: usize) -> i64 {
    i64::try_from(n).unwrap_or(i64::MAX)
}

/// Stations outside 1–5 fall back to 3
pub fn station_count_or_default(n: i64) -> usize {
    if (MIN_STATIONS as i64..=MAX_STATIONS as i64).contains(&n) {
        n as usize
    } else {
        warn!(
            "station count must be between {} and {}, got {}; using {}",
            MIN_STATIONS, MAX_STATIONS, n, DEFAULT_STATIONS
        );
        DEFAULT_STATIONS
    }
}

/// Non-positive customer counts fall back to 100
pub fn customer_count_or_default(n: i64) -> usize {
    if n > 0 {
        n as usize
    } else {
        warn!(
            "customer count must be positive, got {}; using {}",
            n, DEFAULT_CUSTOMERS
        );
        DEFAULT_CUSTOMERS
    }
}

/// Non-positive replicate counts fall back to a single run
pub fn replicate_count_or_default(n: i64) -> Option<usize> {
    if n > 0 {
        usize::try_from(n).ok()
    } else {
        warn!("replicate count must be positive, got {}; running once", n);
        None
    }
}

/// Station count from free text; anything unreadable or out of range is 3
pub fn parse_station_count(input: &str) -> usize {
    match input.trim().parse::<i64>() {
        Ok(n) => station_count_or_default(n),
        Err(_) => {
            warn!(
                "'{}' is not a station count; using {}",
                input, DEFAULT_STATIONS
            );
            DEFAULT_STATIONS
        }
    }
}

/// Customer count from free text; anything unreadable or non-positive is 100
pub fn parse_customer_count(input: &str) -> usize {
    match input.trim().parse::<i64>() {
        Ok(n) => customer_count_or_default(n),
        Err(_) => {
            warn!(
                "'{}' is not a customer count; using {}",
                input, DEFAULT_CUSTOMERS
            );
            DEFAULT_CUSTOMERS
        }
    }
}

/// `1`/`shared` selects a single shared queue, `2`/`per_station` a queue per
/// till. Anything else falls back to a queue per till.
pub fn parse_queue_mode(input: &str) -> QueueMode {
    match input.trim().to_ascii_lowercase().replace('-', "_").as_str() {
        "1" | "shared" | "shared_queue" | "single" => QueueMode::SharedQueue,
        "2" | "per_station" | "queue_per_station" | "separate" => QueueMode::QueuePerStation,
        _ => {
            warn!(
                "unknown queue mode '{}'; using {}",
                input,
                QueueMode::default()
            );
            QueueMode::default()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn station_count_out_of_range_falls_back() {
        assert_eq!(parse_station_count("0"), 3);
        assert_eq!(parse_station_count("7"), 3);
        assert_eq!(parse_station_count("-2"), 3);
        assert_eq!(parse_station_count("five"), 3);
        assert_eq!(parse_station_count(" 5 "), 5);
        assert_eq!(parse_station_count("1"), 1);
    }

    #[test]
    fn customer_count_falls_back() {
        assert_eq!(parse_customer_count("-5"), 100);
        assert_eq!(parse_customer_count("abc"), 100);
        assert_eq!(parse_customer_count("0"), 100);
        assert_eq!(parse_customer_count("2.5"), 100);
        assert_eq!(parse_customer_count("250"), 250);
    }

    #[test]
    fn queue_mode_parsing() {
        assert_eq!(parse_queue_mode("1"), QueueMode::SharedQueue);
        assert_eq!(parse_queue_mode("Shared-Queue"), QueueMode::SharedQueue);
        assert_eq!(parse_queue_mode("2"), QueueMode::QueuePerStation);
        assert_eq!(parse_queue_mode("per-station"), QueueMode::QueuePerStation);
        assert_eq!(parse_queue_mode("3"), QueueMode::QueuePerStation);
    }

    #[test]
    fn validated_repairs_counts() {
        let config = CheckoutConfig {
            num_stations: 9,
            num_customers: 0,
            ..CheckoutConfig::default()
        };

        let config = config.validated().unwrap();

        assert_eq!(config.num_stations, 3);
        assert_eq!(config.num_customers, 100);
    }

    #[test]
    fn validated_rejects_bad_distributions() {
        let negative_gap = CheckoutConfig {
            mean_gap: -1.0,
            ..CheckoutConfig::default()
        };
        assert!(matches!(
            negative_gap.validated(),
            Err(CheckoutError::InvalidConfig(_))
        ));

        let bad_cash = CheckoutConfig {
            p_cash: 1.2,
            ..CheckoutConfig::default()
        };
        assert!(bad_cash.validated().is_err());
    }

    #[test]
    fn validated_rejects_arrivals_beyond_the_horizon() {
        let huge_gap = CheckoutConfig {
            mean_gap: 1.0e18,
            ..CheckoutConfig::default()
        };
        assert!(matches!(
            huge_gap.validated(),
            Err(CheckoutError::InvalidConfig(_))
        ));

        let too_many = CheckoutConfig {
            mean_gap: 1.0e6,
            num_customers: 10_000_000_000,
            ..CheckoutConfig::default()
        };
        assert!(matches!(
            too_many.validated(),
            Err(CheckoutError::InvalidConfig(_))
        ));

        let long_but_fine = CheckoutConfig {
            mean_gap: 1.0e6,
            num_customers: 1_000,
            ..CheckoutConfig::default()
        };
        assert!(long_but_fine.validated().is_ok());
    }

    #[test]
    fn toml_file_replicates_fall_back() {
        let file = CheckoutConfig::from_toml_str(
            r#"
            [simulation]
            stations = 2
            replicates = -3
            "#,
        )
        .unwrap();

        assert_eq!(file.replicates, None);
        assert_eq!(file.config.num_stations, 2);
        assert_eq!(replicate_count_or_default(0), None);
        assert_eq!(replicate_count_or_default(12), Some(12));
    }

    #[test]
    fn toml_file_with_all_keys() {
        let file = CheckoutConfig::from_toml_str(
            r#"
            [simulation]
            stations = 4
            customers = 250
            queue_mode = "shared"
            mean_gap = 2.5
            p_cash = 0.5
            seed = 42
            replicates = 8

            [basket]
            mean = 6.0
            std_dev = 2.0
            min = 1
            max = 12
            "#,
        )
        .unwrap();

        assert_eq!(file.config.num_stations, 4);
        assert_eq!(file.config.num_customers, 250);
        assert_eq!(file.config.queue_mode, QueueMode::SharedQueue);
        assert_eq!(file.config.mean_gap, 2.5);
        assert_eq!(file.config.p_cash, 0.5);
        assert_eq!(file.config.basket.max, 12);
        assert_eq!(file.seed, Some(42));
        assert_eq!(file.replicates, Some(8));
    }

    #[test]
    fn toml_file_counts_fall_back() {
        let file = CheckoutConfig::from_toml_str(
            r#"
            [simulation]
            stations = 0
            customers = -5
            "#,
        )
        .unwrap();

        assert_eq!(file.config.num_stations, 3);
        assert_eq!(file.config.num_customers, 100);
    }

    #[test]
    fn empty_toml_is_all_defaults() {
        let file = CheckoutConfig::from_toml_str("").unwrap();
        assert_eq!(file.config, CheckoutConfig::default());
        assert_eq!(file.seed, None);
    }

    #[test]
    fn malformed_toml_is_an_error() {
        let result = CheckoutConfig::from_toml_str("[simulation\nstations = ");
        assert!(matches!(result, Err(CheckoutError::Toml(_))));
    }
}
