//! Elastic distance kernels (component B): the five-function metric
//! capability, banded DTW, Keogh/Kim lower bounds, and the cascaded
//! distance used for the Euclidean fast path.

mod bounds;
mod dtw;
mod metrics;
mod registry;

pub use bounds::{cascade_distance, cross_keogh_lower_bound, keogh_lower_bound, kim_lower_bound};
pub use dtw::{pairwise_distance, warped_distance};
pub use metrics::{Chebyshev, Cosine, Euclidean, Manhattan, Sorensen};
pub use registry::{DistanceKernel, DistanceRegistry, DTW_SUFFIX};

use crate::sequence::Sample;

/// The five-function distance-metric capability described in `spec.md`
/// §4.4. Implementations are small value types monomorphized at the call
/// site (no virtual dispatch in the hot inner loops), per the REDESIGN FLAG
/// in `spec.md` §9.
pub trait Metric: Send + Sync {
    /// Per-alignment-step accumulator. Kept as a small `Copy` value (a
    /// scalar or a short tuple) rather than the source's heap-allocated,
    /// dynamically-dispatched `Cache*`, since Rust generics monomorphize
    /// the hot loop without needing that indirection.
    type Acc: Copy;

    /// The accumulator's initial (identity) value.
    fn init(&self) -> Self::Acc;

    /// Extends `prev` with one more pair of aligned points.
    fn reduce(&self, prev: Self::Acc, a_i: Sample, b_j: Sample) -> Self::Acc;

    /// Normalizes an accumulator into a pairwise-distance scalar, given the
    /// full lengths of the two sequences being compared.
    fn norm(&self, acc: Self::Acc, len_a: usize, len_b: usize) -> Sample;

    /// Normalizes an accumulator into a DTW-distance scalar. Defaults to
    /// [`Metric::norm`]; only Euclidean overrides this (see `spec.md` §4.4).
    fn norm_dtw(&self, acc: Self::Acc, len_a: usize, len_b: usize) -> Sample {
        self.norm(acc, len_a, len_b)
    }

    /// When supported, transforms `dropout` into accumulator space so early
    /// exit can compare the raw accumulator directly instead of calling
    /// [`Metric::norm`] on every step. `None` for all five concrete metrics
    /// in this crate, matching the original source's `hasInverseNorm` trait
    /// never being satisfied by any of them.
    fn inverse_norm(&self, _dropout: Sample, _len_a: usize, _len_b: usize) -> Option<Sample> {
        None
    }

    /// Name used in the distance registry.
    fn name(&self) -> &'static str;
}
