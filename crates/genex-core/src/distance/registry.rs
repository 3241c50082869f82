//! Distance registry: maps a name to a ready-to-call pairwise/warped pair,
//! plus the `<name>_dtw` suffixed form, mirroring
//! `original_source/genex/distance/Distance.hpp`'s `getDistanceFromName`.

use super::metrics::{Chebyshev, Cosine, Euclidean, Manhattan, Sorensen};
use super::{cascade_distance, pairwise_distance, warped_distance, Metric};
use crate::error::{GenexError, Result};
use crate::sequence::{Sample, SequenceView};

/// Suffix appended to a base distance name to request its DTW variant.
pub const DTW_SUFFIX: &str = "_dtw";

/// A resolved distance, ready to call without further name lookups.
pub struct DistanceKernel {
    name: &'static str,
    pairwise: fn(&SequenceView<'_>, &SequenceView<'_>, Sample) -> Result<Sample>,
    warped: fn(&SequenceView<'_>, &SequenceView<'_>, Sample, f64) -> Result<Sample>,
}

impl DistanceKernel {
    pub fn name(&self) -> &'static str {
        self.name
    }

    /// Equal-length distance, per `Metric::norm`.
    pub fn pairwise(&self, a: &SequenceView<'_>, b: &SequenceView<'_>, dropout: Sample) -> Result<Sample> {
        (self.pairwise)(a, b, dropout)
    }

    /// Banded DTW distance. For `"euclidean"` this is the cascaded distance
    /// (cross-Keogh pruning ahead of the full warped distance); every other
    /// metric and every explicit `_dtw` name calls plain warped distance.
    pub fn warped(&self, a: &SequenceView<'_>, b: &SequenceView<'_>, dropout: Sample, warping_band_ratio: f64) -> Result<Sample> {
        (self.warped)(a, b, dropout, warping_band_ratio)
    }
}

fn kernel_for<M: Metric + Default + 'static>(name: &'static str, use_cascade: bool) -> DistanceKernel {
    DistanceKernel {
        name,
        pairwise: |a, b, dropout| pairwise_distance(&M::default(), a, b, dropout),
        warped: if use_cascade {
            |a, b, dropout, ratio| cascade_distance(a, b, dropout, ratio)
        } else {
            |a, b, dropout, ratio| warped_distance(&M::default(), a, b, dropout, ratio, None)
        },
    }
}

/// Resolves a distance by name. Accepts the five base names
/// (`"euclidean"`, `"manhattan"`, `"chebyshev"`, `"cosine"`, `"sorensen"`)
/// and their `_dtw`-suffixed forms; both forms expose the same
/// `pairwise`/`warped` pair, matching the source's registry which stores
/// each distance under both entries.
pub struct DistanceRegistry;

impl DistanceRegistry {
    /// All distance names known to the registry, base names first, then
    /// their `_dtw` forms, matching `getAllDistanceName`'s order.
    pub fn all_names() -> Vec<String> {
        let bases = ["euclidean", "manhattan", "chebyshev", "cosine", "sorensen"];
        let mut names = Vec::with_capacity(bases.len() * 2);
        for b in bases {
            names.push(b.to_string());
            names.push(format!("{b}{DTW_SUFFIX}"));
        }
        names
    }

    pub fn lookup(name: &str) -> Result<DistanceKernel> {
        let base = name.strip_suffix(DTW_SUFFIX).unwrap_or(name);
        match base {
            "euclidean" => Ok(kernel_for::<Euclidean>("euclidean", base == name)),
            "manhattan" => Ok(kernel_for::<Manhattan>("manhattan", false)),
            "chebyshev" => Ok(kernel_for::<Chebyshev>("chebyshev", false)),
            "cosine" => Ok(kernel_for::<Cosine>("cosine", false)),
            "sorensen" => Ok(kernel_for::<Sorensen>("sorensen", false)),
            _ => Err(GenexError::UnknownDistance(name.to_string())),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::sequence::SampleBlock;

    #[test]
    fn unknown_distance_name_is_rejected() {
        assert!(DistanceRegistry::lookup("levenshtein").is_err());
    }

    #[test]
    fn euclidean_uses_cascade_not_dtw_suffix() {
        let block = SampleBlock::new(vec![vec![1.0, 2.0, 3.0, 4.0]]);
        let a = SequenceView::borrowed(&block, 0, 0, 4).unwrap();
        let b = SequenceView::borrowed(&block, 0, 0, 4).unwrap();

        let euclidean = DistanceRegistry::lookup("euclidean").unwrap();
        let euclidean_dtw = DistanceRegistry::lookup("euclidean_dtw").unwrap();
        let cascade = euclidean.warped(&a, &b, Sample::INFINITY, 0.2).unwrap();
        let plain = euclidean_dtw.warped(&a, &b, Sample::INFINITY, 0.2).unwrap();
        assert!((cascade - plain).abs() < 1e-9);
    }

    #[test]
    fn all_names_lists_base_and_dtw_forms() {
        let names = DistanceRegistry::all_names();
        assert!(names.contains(&"euclidean".to_string()));
        assert!(names.contains(&"euclidean_dtw".to_string()));
        assert_eq!(names.len(), 10);
    }
}
