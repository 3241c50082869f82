//! Thin worker-pool wrapper over a scoped `rayon` thread pool, used to
//! parallelize the global index's build across distinct lengths (never
//! within a length, which stays serial for determinism).

use rayon::{ThreadPool, ThreadPoolBuilder};

/// A dedicated thread pool sized to `EngineConfig::num_threads`, separate
/// from rayon's global pool so a caller embedding this crate doesn't
/// inherit surprising global parallelism.
pub struct Pool {
    inner: ThreadPool,
}

impl Pool {
    pub fn new(num_threads: usize) -> Self {
        let inner = ThreadPoolBuilder::new()
            .num_threads(num_threads.max(1))
            .build()
            .expect("failed to build genex worker pool");
        Pool { inner }
    }

    /// Runs `jobs` (one per distinct length) to completion inside the
    /// pool's scope, returning their results in the same order.
    pub fn run_all<T, F>(&self, jobs: Vec<F>) -> Vec<T>
    where
        T: Send,
        F: FnOnce() -> T + Send,
    {
        self.inner.install(|| {
            use rayon::prelude::*;
            jobs.into_par_iter().map(|job| job()).collect()
        })
    }
}
