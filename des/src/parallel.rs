//! Parallel execution of independent EventLoop replicates
//!
//! Each replicate is built from its replicate id, run to the requested horizon
//! on a rayon pool and reduced to the stats of its agents. Results come back
//! in replicate id order regardless of which thread finished first.
//!
//! # Example
//!
//! ```rust
//! use des::parallel::ParallelRunner;
//! # use des::{Agent, EventLoop};
//! # struct Probe(usize);
//! # impl Agent<u8, usize> for Probe {
//! #     fn stats(&self) -> usize { self.0 }
//! # }
//!
//! let results = ParallelRunner::new(8, |replicate_id| {
//!     let agents: Vec<Box<dyn Agent<u8, usize>>> = vec![Box::new(Probe(replicate_id))];
//!     EventLoop::new(vec![(0, 1)], agents)
//! })
//! .num_threads(2)
//! .run(usize::MAX);
//!
//! assert_eq!(results.len(), 8);
//! assert_eq!(results[3], Ok(vec![3]));
//! ```
//!
//! # Determinism
//!
//! Replicates are reproducible when the builder derives every random seed from
//! `replicate_id` and agents share no mutable state across replicates.
//!
//! # Panics
//!
//! A panic inside one replicate is caught and returned as `Err(String)`; the
//! remaining replicates still run.

use crate::EventLoop;
use log::info;
use rayon::prelude::*;
use std::marker::PhantomData;
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};

type ProgressCallback = Arc<dyn Fn(usize, usize) + Send + Sync>;

/// Runs `num_replicates` independent event loops in parallel
pub struct ParallelRunner<T, S, F>
where
    F: Fn(usize) -> EventLoop<T, S> + Send + Sync,
    S: Send,
{
    num_replicates: usize,
    builder: F,
    num_threads: Option<usize>,
    progress_callback: Option<ProgressCallback>,
    _marker: PhantomData<fn() -> (T, S)>,
}

impl<T, S, F> ParallelRunner<T, S, F>
where
    F: Fn(usize) -> EventLoop<T, S> + Send + Sync,
    S: Send,
{
    pub fn new(num_replicates: usize, builder: F) -> Self {
        ParallelRunner {
            num_replicates,
            builder,
            num_threads: None,
            progress_callback: None,
            _marker: PhantomData,
        }
    }

    /// Use a dedicated pool of `n` threads instead of rayon's global pool
    pub fn num_threads(mut self, n: usize) -> Self {
        self.num_threads = Some(n);
        self
    }

    /// Called with `(completed, total)` after each replicate finishes
    pub fn progress<P>(mut self, callback: P) -> Self
    where
        P: Fn(usize, usize) + Send + Sync + 'static,
    {
        self.progress_callback = Some(Arc::new(callback));
        self
    }

    /// Run every replicate until its queue drains or `run_until` is reached.
    ///
    /// Returns one entry per replicate in replicate id order: the stats of all
    /// agents on success, or the panic message.
    pub fn run(self, run_until: usize) -> Vec<Result<Vec<S>, String>> {
        let completed = AtomicUsize::new(0);

        let execute = || {
            (0..self.num_replicates)
                .into_par_iter()
                .map(|replicate_id| {
                    let result = std::panic::catch_unwind(std::panic::AssertUnwindSafe(|| {
                        let mut event_loop = (self.builder)(replicate_id);
                        event_loop.run(run_until);
                        event_loop.stats()
                    }));

                    let done = completed.fetch_add(1, Ordering::SeqCst) + 1;
                    if let Some(ref callback) = self.progress_callback {
                        callback(done, self.num_replicates);
                    }

                    result.map_err(|panic| {
                        if let Some(s) = panic.downcast_ref::<&str>() {
                            s.to_string()
                        } else if let Some(s) = panic.downcast_ref::<String>() {
                            s.clone()
                        } else {
                            format!("replicate {} panicked", replicate_id)
                        }
                    })
                })
                .collect()
        };

        let pool = self.num_threads.and_then(|n| {
            rayon::ThreadPoolBuilder::new()
                .num_threads(n)
                .build()
                .ok()
        });

        match pool {
            Some(pool) => pool.install(execute),
            None => execute(),
        }
    }
}

/// Run `num_replicates` replicates on the global pool
pub fn run_parallel<T, S, F>(
    num_replicates: usize,
    builder: F,
    run_until: usize,
) -> Vec<Result<Vec<S>, String>>
where
    F: Fn(usize) -> EventLoop<T, S> + Send + Sync,
    S: Send,
{
    ParallelRunner::new(num_replicates, builder).run(run_until)
}

/// Progress callback that logs every `interval` completions and at the end
pub fn log_progress(interval: usize) -> impl Fn(usize, usize) + Send + Sync {
    let interval = interval.max(1);
    move |completed, total| {
        if completed % interval == 0 || completed == total {
            info!("completed {}/{} replicates", completed, total);
        }
    }
}
