//! Per-station ledger: queue contents, busy and idle time, and the instant the
//! station next becomes free.

use log::debug;
use serde::{Deserialize, Serialize};

use crate::customer::Customer;
use crate::error::CausalityViolation;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Station {
    id: usize,
    /// Customer ids in assignment order; append-only
    queue: Vec<usize>,
    busy_time: f64,
    idle_time: f64,
    /// When the last assigned customer's service completes
    completion: f64,
    /// Id and arrival of the last assigned customer
    last: Option<(usize, f64)>,
    finalized: bool,
}

impl Station {
    pub fn new(id: usize) -> Self {
        Station {
            id,
            queue: Vec::new(),
            busy_time: 0.0,
            idle_time: 0.0,
            completion: 0.0,
            last: None,
            finalized: false,
        }
    }

    pub fn id(&self) -> usize {
        self.id
    }

    pub fn queue(&self) -> &[usize] {
        &self.queue
    }

    pub fn queue_len(&self) -> usize {
        self.queue.len()
    }

    pub fn is_empty(&self) -> bool {
        self.queue.is_empty()
    }

    pub fn busy_time(&self) -> f64 {
        self.busy_time
    }

    pub fn idle_time(&self) -> f64 {
        self.idle_time
    }

    /// Time of next availability; 0 for a station that has served nobody
    pub fn completion(&self) -> f64 {
        self.completion
    }

    pub fn is_finalized(&self) -> bool {
        self.finalized
    }

    /// Share of `global_clock` the station spent serving
    pub fn utilization(&self, global_clock: f64) -> f64 {
        if global_clock > 0.0 {
            self.busy_time / global_clock
        } else {
            0.0
        }
    }

    /// Serve `customer` after whoever is already queued here.
    ///
    /// Sets the customer's wait and returns it. An empty station serves on
    /// arrival. Otherwise service starts at the later of the arrival and the
    /// previous customer's completion, and any gap between that completion and
    /// the arrival is idle time.
    pub fn assign(&mut self, customer: &mut Customer) -> Result<f64, CausalityViolation> {
        let arrival = customer.arrival();

        let (available_at, idle_gap) = match self.last {
            None => (arrival, 0.0),
            Some((previous_id, previous_arrival)) => {
                if arrival < previous_arrival {
                    return Err(CausalityViolation::ArrivalOutOfOrder {
                        station_id: self.id,
                        customer_id: customer.id,
                        arrival,
                        previous_id,
                        previous_arrival,
                    });
                }
                (self.completion, (arrival - self.completion).max(0.0))
            }
        };
        let wait = (available_at - arrival).max(0.0);

        self.check(customer.id, "service duration", customer.service_duration)?;
        self.check(customer.id, "wait", wait)?;
        self.check(customer.id, "idle gap", idle_gap)?;

        customer.wait_time = wait;
        self.busy_time += customer.service_duration;
        self.idle_time += idle_gap;
        self.completion = arrival + wait + customer.service_duration;
        self.queue.push(customer.id);
        self.last = Some((customer.id, arrival));

        debug!(
            "station {} <- customer {} (arrival {}, wait {:.2}, done {:.2})",
            self.id, customer.id, arrival, wait, self.completion
        );
        Ok(wait)
    }

    fn check(&self, customer_id: usize, quantity: &'static str, value: f64) -> Result<(), CausalityViolation> {
        if value.is_finite() && value >= 0.0 {
            Ok(())
        } else {
            Err(CausalityViolation::InvalidTiming {
                station_id: self.id,
                customer_id,
                quantity,
                value,
            })
        }
    }

    /// Add the tail idle time up to `global_clock`. A station that served
    /// nobody was idle for the whole run. Only the first call has any effect.
    pub fn finalize(&mut self, global_clock: f64) {
        if self.finalized {
            return;
        }
        if self.queue.is_empty() {
            self.idle_time = global_clock;
        } else {
            self.idle_time += (global_clock - self.completion).max(0.0);
        }
        self.finalized = true;
    }
}

/// The run's completion instant: the latest completion across stations
pub fn global_clock(stations: &[Station]) -> f64 {
    stations
        .iter()
        .map(Station::completion)
        .fold(0.0, f64::max)
}

/// Stamp every station with the global clock and return it
pub fn finalize_all(stations: &mut [Station]) -> f64 {
    let clock = global_clock(stations);
    for station in stations.iter_mut() {
        station.finalize(clock);
    }
    clock
}
