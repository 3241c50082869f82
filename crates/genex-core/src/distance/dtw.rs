//! Pairwise (equal-length) distance and banded DTW, grounded in
//! `original_source/genex/distance/Distance.hpp` and
//! `original_source/src/distance/Distance.cpp`.

use super::Metric;
use crate::error::{GenexError, Result};
use crate::sequence::{Sample, SequenceView};

/// Equal-length pairwise distance with early abandon against `dropout`.
///
/// Requires `a.len() == b.len()`; compares the accumulator in its own space
/// when `metric.inverse_norm` is available, otherwise renormalizes at every
/// step (matching `spec.md` §4.4).
pub fn pairwise_distance<M: Metric>(
    metric: &M,
    a: &SequenceView<'_>,
    b: &SequenceView<'_>,
    dropout: Sample,
) -> Result<Sample> {
    if a.len() != b.len() {
        return Err(GenexError::LengthMismatch(format!(
            "pairwise distance requires equal length, got {} and {}",
            a.len(),
            b.len()
        )));
    }
    let len = a.len();
    let inverse = metric.inverse_norm(dropout, len, len);
    let mut acc = metric.init();
    for i in 0..len {
        acc = metric.reduce(acc, a.get(i)?, b.get(i)?);
        let exceeded = match inverse {
            Some(dropout_acc) => metric.norm(acc, len, len) > dropout_acc,
            None => metric.norm(acc, len, len) > dropout,
        };
        if exceeded && i + 1 < len {
            return Ok(Sample::INFINITY);
        }
    }
    Ok(metric.norm(acc, len, len))
}

/// Banded dynamic time warping distance between possibly unequal-length
/// views, with early row-abandon against `dropout`. `warping_band_ratio` is
/// applied to `max(a.len(), b.len())` to get the Sakoe-Chiba band width.
///
/// When `trace` is `Some` and empty, fills it with the optimal alignment
/// path (diagonal preferred over left over up on ties), matching the
/// source's tie order.
pub fn warped_distance<M: Metric>(
    metric: &M,
    a: &SequenceView<'_>,
    b: &SequenceView<'_>,
    dropout: Sample,
    warping_band_ratio: f64,
    trace: Option<&mut Vec<(usize, usize)>>,
) -> Result<Sample> {
    let m = a.len();
    let n = b.len();
    if m == 0 || n == 0 {
        return Err(GenexError::InvalidArgument(
            "warped distance requires non-empty sequences".to_string(),
        ));
    }

    if m == 1 && n == 1 {
        let acc = metric.reduce(metric.init(), a.get(0)?, b.get(0)?);
        if let Some(path) = trace {
            path.clear();
            path.push((0, 0));
        }
        return Ok(metric.norm_dtw(acc, m, n));
    }

    let r = crate::config::band_for_ratio(m.max(n), warping_band_ratio);

    // Outside the band is implicitly +infinity, per `spec.md` §4.4; a dense
    // matrix seeded this way lets the recurrence below read any neighbor
    // unconditionally instead of branching on band membership.
    let mut cost: Vec<Vec<Option<M::Acc>>> = vec![vec![None; n]; m];
    let mut ncost: Vec<Vec<Sample>> = vec![vec![Sample::INFINITY; n]; m];

    let a0 = a.get(0)?;
    let b0 = b.get(0)?;
    let seed = metric.reduce(metric.init(), a0, b0);
    cost[0][0] = Some(seed);
    ncost[0][0] = metric.norm_dtw(seed, m, n);

    let first_col_rows = (2 * r).min(m - 1);
    for i in 1..=first_col_rows {
        let prev = cost[i - 1][0].expect("first column predecessor always computed");
        let acc = metric.reduce(prev, a.get(i)?, b0);
        cost[i][0] = Some(acc);
        ncost[i][0] = metric.norm_dtw(acc, m, n);
    }

    let first_row_cols = (2 * r).min(n - 1);
    for j in 1..=first_row_cols {
        let prev = cost[0][j - 1].expect("first row predecessor always computed");
        let acc = metric.reduce(prev, a0, b.get(j)?);
        cost[0][j] = Some(acc);
        ncost[0][j] = metric.norm_dtw(acc, m, n);
    }

    for i in 1..m {
        let lo = i.saturating_sub(r);
        let hi = (i + r).min(n - 1);
        let mut best_so_far = ncost[i][0];

        for j in lo.max(1)..=hi {
            let diag = ncost[i - 1][j - 1];
            let up = ncost[i - 1][j];
            let left = ncost[i][j - 1];

            // Tie-break order matches the source: diagonal only if strictly
            // better than both neighbors, then left, falling back to up.
            // This matters beyond display: for tuple accumulators (cosine,
            // sorensen) two predecessors can share a normalized cost while
            // carrying different raw accumulators.
            let prev = if diag < left && diag < up {
                cost[i - 1][j - 1]
            } else if left < up {
                cost[i][j - 1]
            } else {
                cost[i - 1][j]
            }
            .expect("selected predecessor is always in-band");

            let acc = metric.reduce(prev, a.get(i)?, b.get(j)?);
            cost[i][j] = Some(acc);
            let nc = metric.norm_dtw(acc, m, n);
            ncost[i][j] = nc;
            if nc < best_so_far {
                best_so_far = nc;
            }
        }

        if best_so_far > dropout {
            return Ok(Sample::INFINITY);
        }
    }

    if let Some(path) = trace {
        path.clear();
        backtrace(&ncost, r, m, n, path);
    }

    Ok(ncost[m - 1][n - 1])
}

/// Walks the alignment back from `(m-1, n-1)` to `(0, 0)` following whichever
/// in-band neighbor produced the cell's cost, diagonal preferred on ties.
fn backtrace(ncost: &[Vec<Sample>], r: usize, m: usize, n: usize, path: &mut Vec<(usize, usize)>) {
    let mut i = m - 1;
    let mut j = n - 1;
    path.push((i, j));
    while i > 0 || j > 0 {
        let diag = if i > 0 && j > 0 { ncost[i - 1][j - 1] } else { Sample::INFINITY };
        let up = if i > 0 { ncost[i - 1][j] } else { Sample::INFINITY };
        let left = if j > 0 { ncost[i][j - 1] } else { Sample::INFINITY };

        if i > 0 && j > 0 && diag <= up.min(left) {
            i -= 1;
            j -= 1;
        } else if i > 0 && up <= left {
            i -= 1;
        } else {
            j -= 1;
        }
        path.push((i, j));
    }
    path.reverse();
    let _ = r;
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::distance::Euclidean;
    use crate::sequence::SampleBlock;

    #[test]
    fn identical_sequences_have_zero_distance() {
        let block = SampleBlock::new(vec![vec![1.0, 2.0, 3.0, 4.0, 5.0]]);
        let a = SequenceView::borrowed(&block, 0, 0, 5).unwrap();
        let b = SequenceView::borrowed(&block, 0, 0, 5).unwrap();
        let d = warped_distance(&Euclidean, &a, &b, Sample::INFINITY, 0.4, None).unwrap();
        assert!(d.abs() < 1e-9);
    }

    #[test]
    fn equal_length_pairwise_rejects_mismatch() {
        let block = SampleBlock::new(vec![vec![1.0, 2.0, 3.0], vec![1.0, 2.0]]);
        let a = SequenceView::borrowed(&block, 0, 0, 3).unwrap();
        let b = SequenceView::borrowed(&block, 1, 0, 2).unwrap();
        assert!(pairwise_distance(&Euclidean, &a, &b, Sample::INFINITY).is_err());
    }

    #[test]
    fn pairwise_matches_warped_for_equal_lengths_without_warp() {
        let block = SampleBlock::new(vec![vec![1.0, 2.0, 3.0, 4.0], vec![2.0, 2.0, 4.0, 4.0]]);
        let a = SequenceView::borrowed(&block, 0, 0, 4).unwrap();
        let b = SequenceView::borrowed(&block, 1, 0, 4).unwrap();
        let p = pairwise_distance(&Euclidean, &a, &b, Sample::INFINITY).unwrap();
        // With band 0 (ratio 0), DTW degenerates to the pointwise alignment.
        let w = warped_distance(&Euclidean, &a, &b, Sample::INFINITY, 0.0, None).unwrap();
        assert!((p - w).abs() < 1e-9, "pairwise={p} warped={w}");
    }

    #[test]
    fn dropout_short_circuits_to_infinity() {
        let block = SampleBlock::new(vec![vec![0.0, 0.0, 0.0, 0.0], vec![100.0, 100.0, 100.0, 100.0]]);
        let a = SequenceView::borrowed(&block, 0, 0, 4).unwrap();
        let b = SequenceView::borrowed(&block, 1, 0, 4).unwrap();
        let d = warped_distance(&Euclidean, &a, &b, 0.001, 0.4, None).unwrap();
        assert!(d.is_infinite());
    }
}
