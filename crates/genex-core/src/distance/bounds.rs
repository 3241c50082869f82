//! Kim and Keogh lower bounds, and the cascaded distance used for the
//! Euclidean DTW fast path, grounded in
//! `original_source/src/distance/Distance.cpp`.

use super::metrics::Euclidean;
use super::{warped_distance, Metric};
use crate::config::band_for_ratio;
use crate::envelope::EnvelopeCache;
use crate::error::Result;
use crate::sequence::{Sample, SequenceView};

fn sq_dist(x: Sample, y: Sample) -> Sample {
    (x - y) * (x - y)
}

/// A handful of endpoint-neighborhood squared-distance terms, returned
/// unnormalized as a running sum (matching the source, which never divides
/// by length here). Early-exits to `+∞` as soon as the partial sum crosses
/// `dropout`.
pub fn kim_lower_bound(a: &SequenceView<'_>, b: &SequenceView<'_>, dropout: Sample) -> Result<Sample> {
    let al = a.len();
    let bl = b.len();
    let l = al.min(bl);

    if l == 0 {
        return Ok(0.0);
    }
    if l == 1 {
        return Ok(sq_dist(a.get(0)?, b.get(0)?));
    }

    let mut lb = 0.0;
    lb += sq_dist(a.get(0)?, b.get(0)?);
    lb += sq_dist(a.get(al - 1)?, b.get(bl - 1)?);
    if lb > dropout {
        return Ok(Sample::INFINITY);
    }

    lb += sq_dist(a.get(0)?, b.get(1)?)
        .min(sq_dist(a.get(1)?, b.get(1)?))
        .min(sq_dist(a.get(1)?, b.get(0)?));
    if lb > dropout {
        return Ok(Sample::INFINITY);
    }

    lb += sq_dist(a.get(al - 1)?, b.get(bl - 2)?)
        .min(sq_dist(a.get(al - 2)?, b.get(bl - 2)?))
        .min(sq_dist(a.get(al - 2)?, b.get(bl - 1)?));
    if lb >= dropout {
        return Ok(Sample::INFINITY);
    }

    if l == 4 {
        return Ok(lb);
    }

    lb += sq_dist(a.get(0)?, b.get(2)?)
        .min(sq_dist(a.get(1)?, b.get(2)?))
        .min(sq_dist(a.get(2)?, b.get(2)?))
        .min(sq_dist(a.get(2)?, b.get(1)?))
        .min(sq_dist(a.get(2)?, b.get(0)?));
    if lb > dropout {
        return Ok(Sample::INFINITY);
    }

    lb += sq_dist(a.get(al - 1)?, b.get(bl - 3)?)
        .min(sq_dist(a.get(al - 2)?, b.get(bl - 3)?))
        .min(sq_dist(a.get(al - 3)?, b.get(bl - 3)?))
        .min(sq_dist(a.get(al - 3)?, b.get(bl - 2)?))
        .min(sq_dist(a.get(al - 3)?, b.get(bl - 1)?));

    Ok(lb)
}

/// Accumulates squared excursions of `b` outside `a`'s Keogh envelope
/// (built over a warping band sized from `max(a.len(), b.len())`), then
/// normalizes the raw sum the same way Euclidean's own DTW accumulator
/// would: `sqrt(sum) / (2 * max_len)`.
pub fn keogh_lower_bound(a: &SequenceView<'_>, b: &SequenceView<'_>, dropout: Sample, warping_band_ratio: f64) -> Result<Sample> {
    let max_len = a.len().max(b.len());
    let band = band_for_ratio(max_len, warping_band_ratio);
    let env = EnvelopeCache::build(a, band);
    let len = a.len().min(b.len());

    let idropout = {
        let d = dropout * 2.0 * max_len as Sample;
        d * d
    };

    let mut lb: Sample = 0.0;
    for i in 0..len {
        if lb >= idropout {
            break;
        }
        let bi = b.get(i)?;
        let upper = env.upper()[i];
        let lower = env.lower()[i];
        if bi > upper {
            lb += sq_dist(bi, upper);
        } else if bi < lower {
            lb += sq_dist(bi, lower);
        }
    }

    Ok(Euclidean.norm_dtw(lb.sqrt(), max_len, max_len))
}

/// `max(keogh(a, b), keogh(b, a))`, short-circuiting to `+∞` once the
/// first direction already exceeds `dropout`.
pub fn cross_keogh_lower_bound(a: &SequenceView<'_>, b: &SequenceView<'_>, dropout: Sample, warping_band_ratio: f64) -> Result<Sample> {
    let lb = keogh_lower_bound(a, b, dropout, warping_band_ratio)?;
    if lb > dropout {
        return Ok(Sample::INFINITY);
    }
    Ok(lb.max(keogh_lower_bound(b, a, dropout, warping_band_ratio)?))
}

/// Cross-Keogh pruning ahead of the full Euclidean banded DTW; used for the
/// Euclidean fast path in the global index's inter/intra-cluster search.
pub fn cascade_distance(a: &SequenceView<'_>, b: &SequenceView<'_>, dropout: Sample, warping_band_ratio: f64) -> Result<Sample> {
    let lb = cross_keogh_lower_bound(a, b, dropout, warping_band_ratio)?;
    if lb > dropout {
        return Ok(Sample::INFINITY);
    }
    warped_distance(&Euclidean, a, b, dropout, warping_band_ratio, None)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::sequence::SampleBlock;

    #[test]
    fn keogh_bound_matches_worked_example() {
        let a_block = SampleBlock::new(vec![vec![0., 2., 3., 5., 8., 6., 3., 2., 3., 5.]]);
        let b_block = SampleBlock::new(vec![vec![8., 4., 6., 1., 5., 10., 9.]]);
        let a = SequenceView::borrowed(&a_block, 0, 0, 10).unwrap();
        let b = SequenceView::borrowed(&b_block, 0, 0, 7).unwrap();
        let lb = keogh_lower_bound(&a, &b, 10.0, 0.2).unwrap();
        let expected = (31.0 as Sample).sqrt() / 20.0;
        assert!((lb - expected).abs() < 1e-9, "got {lb} expected {expected}");
    }

    #[test]
    fn kim_bound_is_zero_for_empty_overlap() {
        let a_block = SampleBlock::new(vec![vec![]]);
        let b_block = SampleBlock::new(vec![vec![]]);
        let a = SequenceView::borrowed(&a_block, 0, 0, 0).unwrap();
        let b = SequenceView::borrowed(&b_block, 0, 0, 0).unwrap();
        assert_eq!(kim_lower_bound(&a, &b, 1.0).unwrap(), 0.0);
    }

    #[test]
    fn bounds_never_exceed_full_warped_distance() {
        let block = SampleBlock::new(vec![vec![0., 2., 3., 5., 8., 6., 3., 2., 3., 5.]]);
        let a = SequenceView::borrowed(&block, 0, 0, 10).unwrap();
        let b = SequenceView::borrowed(&block, 0, 0, 10).unwrap();
        let full = warped_distance(&Euclidean, &a, &b, Sample::INFINITY, 0.2, None).unwrap();
        let keogh = keogh_lower_bound(&a, &b, Sample::INFINITY, 0.2).unwrap();
        assert!(keogh <= full + 1e-9);
    }
}
