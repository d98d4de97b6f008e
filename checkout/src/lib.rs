pub mod arrivals;
pub mod checkout;
pub mod config;
pub mod customer;
pub mod error;
pub mod output;
pub mod policy;
pub mod report;
pub mod sampling;
pub mod simulation;
pub mod station;

pub use arrivals::{ArrivalProcess, ArrivalStats};
pub use checkout::{Checkout, CheckoutStats};
pub use config::CheckoutConfig;
pub use customer::{Customer, CustomerFactory};
pub use error::{CausalityViolation, CheckoutError};
pub use policy::{QueueMode, StationPolicy};
pub use report::{MeanStd, RunSummary, UtilizationAccumulator};
pub use sampling::{BasketParams, PaymentKind, Samplers};
pub use simulation::SimulationRun;
pub use station::Station;

#[derive(Debug, Clone)]
pub enum Event {
    /// Opens the store; the arrival process schedules the first customer
    Start,
    /// A customer reaches the tills at the event time
    Arrival(Customer),
}

#[derive(Debug, Clone)]
pub enum Stats {
    Arrivals(ArrivalStats),
    Checkout(CheckoutStats),
}
