use des::{Agent, Response};
use rand::SeedableRng;
use rand::rngs::StdRng;

use crate::customer::CustomerFactory;
use crate::{Event, Stats};

/// Generates the customer stream one arrival at a time.
///
/// The next customer is only created when the previous one arrives, chained
/// on its cumulative arrival, so the stream is strictly sequential.
pub struct ArrivalProcess {
    factory: CustomerFactory,
    rng: StdRng,
    total: usize,
    generated: usize,
    last_arrival: u64,
}

#[derive(Debug, Clone, PartialEq)]
pub struct ArrivalStats {
    pub generated: usize,
    pub last_arrival: u64,
}

impl ArrivalProcess {
    pub fn new(factory: CustomerFactory, total: usize, seed: u64) -> Self {
        ArrivalProcess {
            factory,
            rng: StdRng::seed_from_u64(seed),
            total,
            generated: 0,
            last_arrival: 0,
        }
    }

    fn next_arrival(&mut self) -> Option<(usize, Event)> {
        if self.generated >= self.total {
            return None;
        }
        self.generated += 1;
        let customer = self
            .factory
            .create_customer(self.generated, self.last_arrival, &mut self.rng);
        self.last_arrival = customer.cumulative_arrival;
        Some((customer.cumulative_arrival as usize, Event::Arrival(customer)))
    }
}

impl Agent<Event, Stats> for ArrivalProcess {
    fn act(&mut self, _current_t: usize, data: &Event) -> Response<Event, Stats> {
        match data {
            Event::Start if self.generated == 0 => match self.next_arrival() {
                Some((t, event)) => Response::event(t, event),
                None => Response::new(),
            },
            // only the customer we created last triggers the next one
            Event::Arrival(customer) if customer.id == self.generated => {
                match self.next_arrival() {
                    Some((t, event)) => Response::event(t, event),
                    None => Response::new(),
                }
            }
            _ => Response::new(),
        }
    }

    fn stats(&self) -> Stats {
        Stats::Arrivals(ArrivalStats {
            generated: self.generated,
            last_arrival: self.last_arrival,
        })
    }
}
