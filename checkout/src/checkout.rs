use des::{Agent, Response};
use log::warn;

use crate::customer::Customer;
use crate::error::CausalityViolation;
use crate::policy::StationPolicy;
use crate::simulation::SimulationRun;
use crate::station::{self, Station};
use crate::{Event, Stats};

/// The bank of tills: routes each arriving customer to a station and keeps
/// the ledger.
pub struct Checkout {
    stations: Vec<Station>,
    policy: StationPolicy,
    customers: Vec<Customer>,
    violation: Option<CausalityViolation>,
}

#[derive(Debug, Clone)]
pub struct CheckoutStats {
    /// Finalized copy of the run so far
    pub run: SimulationRun,
    /// First assignment the ledger refused, if any
    pub violation: Option<CausalityViolation>,
}

impl Checkout {
    /// Stations are numbered from 1
    pub fn new(num_stations: usize, policy: StationPolicy) -> Self {
        Checkout {
            stations: (1..=num_stations).map(Station::new).collect(),
            policy,
            customers: Vec::new(),
            violation: None,
        }
    }

    pub fn stations(&self) -> &[Station] {
        &self.stations
    }

    pub fn customers(&self) -> &[Customer] {
        &self.customers
    }

    /// Select a station for `customer` and assign it. Returns the station id,
    /// or `None` if there are no stations.
    pub fn admit(&mut self, mut customer: Customer) -> Result<Option<usize>, CausalityViolation> {
        let Some(index) = self.policy.select(&self.stations) else {
            return Ok(None);
        };
        let station = &mut self.stations[index];
        station.assign(&mut customer)?;
        let id = station.id();
        self.customers.push(customer);
        Ok(Some(id))
    }

    /// The run as it would stand if the store closed now: a copy with the
    /// global clock derived and tail idle applied.
    pub fn snapshot(&self) -> CheckoutStats {
        let mut stations = self.stations.clone();
        let global_clock = station::finalize_all(&mut stations);
        CheckoutStats {
            run: SimulationRun {
                seed: None,
                policy: self.policy,
                customers: self.customers.clone(),
                stations,
                global_clock,
            },
            violation: self.violation.clone(),
        }
    }
}

impl Agent<Event, Stats> for Checkout {
    fn act(&mut self, _current_t: usize, data: &Event) -> Response<Event, Stats> {
        let Event::Arrival(customer) = data else {
            return Response::new();
        };
        if self.violation.is_some() {
            return Response::new();
        }
        match self.admit(customer.clone()) {
            Ok(Some(_)) => {}
            Ok(None) => warn!("no station to serve customer {}", customer.id),
            Err(violation) => {
                warn!("rejected assignment: {}", violation);
                self.violation = Some(violation);
            }
        }
        Response::new()
    }

    fn stats(&self) -> Stats {
        Stats::Checkout(self.snapshot())
    }
}
