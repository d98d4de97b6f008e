//! Error types for the checkout simulation

use thiserror::Error;

/// A station assignment that would break time causality.
///
/// The ledger rejects the assignment and leaves the station untouched.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum CausalityViolation {
    /// Customer arrives before the customer previously assigned to the station
    #[error(
        "customer {customer_id} arrives at {arrival} before customer {previous_id} \
         (arrived {previous_arrival}) on station {station_id}"
    )]
    ArrivalOutOfOrder {
        station_id: usize,
        customer_id: usize,
        arrival: f64,
        previous_id: usize,
        previous_arrival: f64,
    },

    /// A derived timing was negative or not a finite number
    #[error("station {station_id}: {quantity} for customer {customer_id} is invalid ({value})")]
    InvalidTiming {
        station_id: usize,
        customer_id: usize,
        quantity: &'static str,
        value: f64,
    },
}

/// Errors surfaced by the checkout simulation
#[derive(Debug, Error)]
pub enum CheckoutError {
    /// Configuration that cannot be repaired with a default
    #[error("invalid configuration: {0}")]
    InvalidConfig(String),

    #[error("causality violation: {0}")]
    Causality(#[from] CausalityViolation),

    /// A run finished without producing checkout stats, or a replicate panicked
    #[error("simulation failed: {0}")]
    Simulation(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("TOML parse error: {0}")]
    Toml(#[from] toml::de::Error),

    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

impl CheckoutError {
    pub fn invalid_config(msg: impl Into<String>) -> Self {
        Self::InvalidConfig(msg.into())
    }
}

pub type Result<T> = std::result::Result<T, CheckoutError>;
