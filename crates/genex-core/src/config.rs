//! Engine configuration.
//!
//! The original source keeps the warping-band ratio as mutable process-wide
//! state (`setWarpingBandRatio` / a free-standing global). We keep a default
//! singleton for the embedding application's convenience (so callers who
//! don't care can omit it entirely) but thread an explicit [`EngineConfig`]
//! through every query entry point, per the REDESIGN FLAG in `spec.md` §9.

use once_cell::sync::OnceCell;
use std::sync::RwLock;

/// Default Sakoe-Chiba warping band ratio, matching the source default.
pub const DEFAULT_WARPING_BAND_RATIO: f64 = 0.1;

static DEFAULT_RATIO: OnceCell<RwLock<f64>> = OnceCell::new();

fn ratio_cell() -> &'static RwLock<f64> {
    DEFAULT_RATIO.get_or_init(|| RwLock::new(DEFAULT_WARPING_BAND_RATIO))
}

/// Sets the process-wide default warping-band ratio used by
/// [`EngineConfig::default`]. Infallible: out-of-range values are clamped to
/// `(0, 1]` by callers when they build the per-sequence band width.
pub fn set_default_warping_band_ratio(ratio: f64) {
    let mut guard = ratio_cell().write().expect("warping band ratio lock poisoned");
    *guard = ratio;
}

/// Reads the process-wide default warping-band ratio.
pub fn default_warping_band_ratio() -> f64 {
    *ratio_cell().read().expect("warping band ratio lock poisoned")
}

/// Explicit configuration for a build or query, replacing the source's
/// ambient global state.
#[derive(Debug, Clone, PartialEq)]
pub struct EngineConfig {
    /// Sakoe-Chiba band as a fraction of sequence length, in `(0, 1]`.
    pub warping_band_ratio: f64,
    /// Distance family name, e.g. `"euclidean"`.
    pub distance_name: String,
    /// Covering-radius bound is `threshold / 2`.
    pub threshold: f64,
    /// Worker-pool size for parallel build over lengths.
    pub num_threads: usize,
}

impl Default for EngineConfig {
    fn default() -> Self {
        EngineConfig {
            warping_band_ratio: default_warping_band_ratio(),
            distance_name: "euclidean".to_string(),
            threshold: 0.0,
            num_threads: 1,
        }
    }
}

impl EngineConfig {
    /// Computes the Sakoe-Chiba band width for a sequence of the given
    /// length: `floor(length * ratio)`, clamped to `length - 1`.
    pub fn band(&self, length: usize) -> usize {
        band_for_ratio(length, self.warping_band_ratio)
    }
}

/// Shared band-width computation used by both `EngineConfig::band` and the
/// distance kernels, which receive the ratio directly so they don't need to
/// carry a whole `EngineConfig`.
pub fn band_for_ratio(length: usize, ratio: f64) -> usize {
    if length == 0 {
        return 0;
    }
    let raw = (length as f64 * ratio).floor() as usize;
    raw.min(length - 1)
}
