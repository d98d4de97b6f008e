use rand::Rng;
use serde::{Deserialize, Serialize};

use crate::sampling::{PaymentKind, Samplers};

/// One checkout transaction
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Customer {
    /// Sequential from 1, in arrival order
    pub id: usize,
    /// Minutes since the previous customer arrived
    pub arrival_gap: u64,
    /// Absolute arrival minute: running sum of gaps
    pub cumulative_arrival: u64,
    pub basket_size: u32,
    pub payment: PaymentKind,
    /// Basket size plus the payment's fixed cost, in minutes
    pub service_duration: f64,
    /// Set once when the customer is assigned to a station
    pub wait_time: f64,
}

impl Customer {
    pub fn new(
        id: usize,
        arrival_gap: u64,
        cumulative_arrival: u64,
        basket_size: u32,
        payment: PaymentKind,
    ) -> Self {
        Customer {
            id,
            arrival_gap,
            cumulative_arrival,
            basket_size,
            payment,
            service_duration: basket_size as f64 + payment.service_minutes(),
            wait_time: 0.0,
        }
    }

    pub fn arrival(&self) -> f64 {
        self.cumulative_arrival as f64
    }

    /// Instant the customer's service finishes, once the wait is known
    pub fn departure(&self) -> f64 {
        self.arrival() + self.wait_time + self.service_duration
    }
}

/// Builds customers from the run's samplers
#[derive(Debug, Clone)]
pub struct CustomerFactory {
    samplers: Samplers,
}

impl CustomerFactory {
    pub fn new(samplers: Samplers) -> Self {
        CustomerFactory { samplers }
    }

    /// Create customer `id`, arriving one sampled gap after
    /// `previous_cumulative_arrival`.
    ///
    /// The gap is drawn for every customer, but the first customer's gap
    /// counts as zero so the run opens at minute 0.
    pub fn create_customer<R: Rng + ?Sized>(
        &self,
        id: usize,
        previous_cumulative_arrival: u64,
        rng: &mut R,
    ) -> Customer {
        let drawn = self.samplers.gap(rng);
        let gap = if id <= 1 { 0 } else { drawn };
        let basket_size = self.samplers.basket_size(rng);
        let payment = self.samplers.payment(rng);
        Customer::new(
            id,
            gap,
            previous_cumulative_arrival.saturating_add(gap),
            basket_size,
            payment,
        )
    }
}
