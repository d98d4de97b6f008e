//! Which station takes the next customer

use serde::{Deserialize, Serialize};

use crate::station::Station;

/// Station selection rule, fixed for a whole run
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StationPolicy {
    /// Fewest customers assigned so far
    ShortestQueue,
    /// Soonest time of next availability
    EarliestAvailable,
}

impl StationPolicy {
    /// Index of the chosen station, or `None` when there are no stations.
    ///
    /// Ties go to the lowest station id: stations are scanned in order and the
    /// first minimum wins.
    pub fn select(self, stations: &[Station]) -> Option<usize> {
        match self {
            StationPolicy::ShortestQueue => first_min_by(stations, |s| s.queue_len() as f64),
            StationPolicy::EarliestAvailable => first_min_by(stations, Station::completion),
        }
    }
}

impl std::fmt::Display for StationPolicy {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            StationPolicy::ShortestQueue => write!(f, "shortest queue"),
            StationPolicy::EarliestAvailable => write!(f, "earliest available"),
        }
    }
}

fn first_min_by<F>(stations: &[Station], key: F) -> Option<usize>
where
    F: Fn(&Station) -> f64,
{
    let mut best: Option<(usize, f64)> = None;
    for (i, station) in stations.iter().enumerate() {
        let k = key(station);
        match best {
            Some((_, best_k)) if k >= best_k => {}
            _ => best = Some((i, k)),
        }
    }
    best.map(|(i, _)| i)
}

/// How customers line up at the tills
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum QueueMode {
    /// One line feeding every till: the next customer goes to the first till
    /// to free up
    SharedQueue,
    /// A line per till: customers join the shortest line
    #[default]
    QueuePerStation,
}

impl QueueMode {
    pub fn policy(self) -> StationPolicy {
        match self {
            QueueMode::SharedQueue => StationPolicy::EarliestAvailable,
            QueueMode::QueuePerStation => StationPolicy::ShortestQueue,
        }
    }
}

impl std::fmt::Display for QueueMode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            QueueMode::SharedQueue => write!(f, "shared queue"),
            QueueMode::QueuePerStation => write!(f, "queue per station"),
        }
    }
}
