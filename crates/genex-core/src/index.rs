//! Global index: one length space per admissible subsequence length,
//! orchestrating serial or worker-pool build (component F), grounded in
//! `original_source/genex/group/GlobalGroupSpace.cpp`.

use crate::config::EngineConfig;
use crate::distance::DistanceRegistry;
use crate::error::{GenexError, Result};
use crate::length_space::LengthSpace;
use crate::pool::Pool;
use crate::sequence::SampleBlock;
use std::collections::BTreeMap;
use tracing::{debug, info};

/// Every length space for `L ∈ [2, maxLen]`, plus the build-time
/// configuration that produced it.
pub struct GlobalIndex {
    spaces: BTreeMap<usize, LengthSpace>,
    max_len: usize,
    distance_name: String,
    threshold: f64,
    warping_band_ratio: f64,
}

impl GlobalIndex {
    /// Builds every length space serially, in ascending length order.
    pub fn build(block: &SampleBlock, config: &EngineConfig) -> Result<Self> {
        if config.num_threads == 0 {
            return Err(GenexError::InvalidArgument("num_threads must be positive".to_string()));
        }
        let max_len = block.item_length();
        if max_len < 2 {
            return Err(GenexError::InvalidArgument(
                "dataset's shortest row must admit subsequences of length at least 2".to_string(),
            ));
        }
        let kernel = DistanceRegistry::lookup(&config.distance_name)?;

        let mut spaces = BTreeMap::new();
        let mut total_groups = 0usize;
        for length in 2..=max_len {
            let space = LengthSpace::build(block, length, &kernel, config.threshold)?;
            total_groups += space.num_clusters();
            debug!(length, clusters = space.num_clusters(), "built length space");
            spaces.insert(length, space);
        }
        info!(max_len, total_groups, distance = %config.distance_name, "global index build complete");

        Ok(GlobalIndex {
            spaces,
            max_len,
            distance_name: config.distance_name.clone(),
            threshold: config.threshold,
            warping_band_ratio: config.warping_band_ratio,
        })
    }

    /// Builds every length space on a dedicated worker pool, one job per
    /// distinct length. Clusters *within* a length always build serially
    /// (see [`LengthSpace::build`]); only work across lengths parallelizes,
    /// preserving per-length determinism.
    pub fn build_parallel(block: &SampleBlock, config: &EngineConfig) -> Result<Self> {
        if config.num_threads == 0 {
            return Err(GenexError::InvalidArgument("num_threads must be positive".to_string()));
        }
        let max_len = block.item_length();
        if max_len < 2 {
            return Err(GenexError::InvalidArgument(
                "dataset's shortest row must admit subsequences of length at least 2".to_string(),
            ));
        }
        let kernel_name = config.distance_name.clone();
        DistanceRegistry::lookup(&kernel_name)?; // fail fast before spawning workers

        let pool = Pool::new(config.num_threads);
        let threshold = config.threshold;
        let jobs: Vec<_> = (2..=max_len)
            .map(|length| {
                let kernel_name = kernel_name.clone();
                move || -> Result<(usize, LengthSpace)> {
                    let kernel = DistanceRegistry::lookup(&kernel_name)?;
                    let space = LengthSpace::build(block, length, &kernel, threshold)?;
                    Ok((length, space))
                }
            })
            .collect();

        let results = pool.run_all(jobs);
        let mut spaces = BTreeMap::new();
        let mut total_groups = 0usize;
        for result in results {
            let (length, space) = result?;
            total_groups += space.num_clusters();
            spaces.insert(length, space);
        }
        info!(max_len, total_groups, distance = %config.distance_name, threads = config.num_threads, "parallel global index build complete");

        Ok(GlobalIndex {
            spaces,
            max_len,
            distance_name: config.distance_name.clone(),
            threshold: config.threshold,
            warping_band_ratio: config.warping_band_ratio,
        })
    }

    /// Assembles a [`GlobalIndex`] directly from already-built length
    /// spaces, used by the persistence readers to avoid re-running the
    /// leader algorithm on restore.
    pub(crate) fn from_parts(spaces: BTreeMap<usize, LengthSpace>, max_len: usize, distance_name: String, threshold: f64, warping_band_ratio: f64) -> Self {
        GlobalIndex {
            spaces,
            max_len,
            distance_name,
            threshold,
            warping_band_ratio,
        }
    }

    pub fn max_len(&self) -> usize {
        self.max_len
    }

    pub fn distance_name(&self) -> &str {
        &self.distance_name
    }

    pub fn threshold(&self) -> f64 {
        self.threshold
    }

    pub fn warping_band_ratio(&self) -> f64 {
        self.warping_band_ratio
    }

    pub fn total_groups(&self) -> usize {
        self.spaces.values().map(|s| s.num_clusters()).sum()
    }

    pub fn space(&self, length: usize) -> Option<&LengthSpace> {
        self.spaces.get(&length)
    }

    pub(crate) fn spaces(&self) -> &BTreeMap<usize, LengthSpace> {
        &self.spaces
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::EngineConfig;

    fn dataset() -> SampleBlock {
        SampleBlock::new(vec![
            vec![1.0, 2.0, 3.0, 4.0, 5.0],
            vec![5.0, 4.0, 3.0, 2.0, 1.0],
            vec![1.0, 1.0, 1.0, 1.0, 1.0],
        ])
    }

    #[test]
    fn build_covers_every_length_up_to_item_length() {
        let block = dataset();
        let cfg = EngineConfig {
            threshold: 0.5,
            ..Default::default()
        };
        let index = GlobalIndex::build(&block, &cfg).unwrap();
        assert_eq!(index.max_len(), 5);
        for l in 2..=5 {
            assert!(index.space(l).is_some());
        }
        assert!(index.total_groups() > 0);
    }

    #[test]
    fn rejects_zero_threads() {
        let block = dataset();
        let cfg = EngineConfig {
            num_threads: 0,
            ..Default::default()
        };
        assert!(GlobalIndex::build(&block, &cfg).is_err());
    }

    #[test]
    fn serial_and_parallel_build_agree_on_group_counts() {
        let block = dataset();
        let cfg = EngineConfig {
            threshold: 0.5,
            num_threads: 2,
            ..Default::default()
        };
        let serial = GlobalIndex::build(&block, &cfg).unwrap();
        let parallel = GlobalIndex::build_parallel(&block, &cfg).unwrap();
        assert_eq!(serial.total_groups(), parallel.total_groups());
    }
}
