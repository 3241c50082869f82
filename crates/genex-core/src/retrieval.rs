//! Traversal order, best-match, and k-best-match (component G), grounded
//! in `original_source/genex/group/GlobalGroupSpace.cpp`'s query path.

use crate::config::{band_for_ratio, EngineConfig};
use crate::distance::DistanceRegistry;
use crate::error::{GenexError, Result};
use crate::heap::Scored;
use crate::index::GlobalIndex;
use crate::sequence::{Sample, SampleBlock, SequenceView};
use std::collections::BinaryHeap;

/// An identified subsequence and its distance to the query.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct MatchResult {
    pub row: usize,
    pub start: usize,
    pub length: usize,
    pub dist: Sample,
}

/// Produces the lengths to visit for a query of length `q_len`, centered on
/// `q_len` and expanding outward on each side while a banded alignment
/// between the query length and the candidate length is representable
/// under `ratio`. `spec.md` §4.3's worked example: `order(3)` with
/// `ratio = 0.4`, `max_len = 7` returns `[3, 2, 4, 5]`.
pub fn traversal_order(q_len: usize, max_len: usize, ratio: f64) -> Vec<usize> {
    if q_len == 0 {
        return Vec::new();
    }
    let band_q = band_for_ratio(q_len, ratio);
    let mut order = vec![q_len];

    let mut low = q_len;
    while low > 2 {
        let candidate = low - 1;
        if candidate + band_q < q_len {
            break;
        }
        order.push(candidate);
        low = candidate;
    }

    let mut high = q_len;
    loop {
        let candidate = high + 1;
        if candidate > max_len {
            break;
        }
        let band_h = band_for_ratio(candidate, ratio);
        if q_len + band_h < candidate {
            break;
        }
        order.push(candidate);
        high = candidate;
    }

    order
}

/// Finds the single nearest subsequence to `query` across every admissible
/// length, pruning centroids with a tightening dropout before refining the
/// surviving cluster exactly. Fails with [`GenexError::NotIndexed`] if
/// `index` has no length spaces at all.
pub fn best_match(index: &GlobalIndex, block: &SampleBlock, query: &SequenceView<'_>, config: &EngineConfig) -> Result<MatchResult> {
    if index.total_groups() == 0 {
        return Err(GenexError::NotIndexed("dataset has no built index".to_string()));
    }
    let kernel = DistanceRegistry::lookup(&config.distance_name)?;
    let order = traversal_order(query.len(), index.max_len(), config.warping_band_ratio);

    let mut best = Sample::INFINITY;
    let mut remembered: Option<(usize, usize)> = None; // (length, cluster_idx)

    for length in order {
        let Some(space) = index.space(length) else { continue };
        let found = space.get_best_group(
            query,
            |a, b, dropout| kernel.warped(a, b, dropout, config.warping_band_ratio),
            best,
        )?;
        if let Some((idx, d)) = found {
            if d < best {
                best = d;
                remembered = Some((length, idx));
            }
        }
    }

    let (length, cluster_idx) = remembered.ok_or_else(|| GenexError::NotIndexed("no candidate cluster found for query".to_string()))?;
    let space = index.space(length).expect("remembered length must be indexed");
    let (row, start, dist) = space
        .best_match_in_group(block, cluster_idx, query, |a, b, dropout| kernel.warped(a, b, dropout, config.warping_band_ratio))?
        .ok_or_else(|| GenexError::NotIndexed("remembered cluster has no members".to_string()))?;

    Ok(MatchResult { row, start, length, dist })
}

/// A group surviving the inter-cluster phase: enough context to refine it
/// in the intra-cluster phase without re-scanning length spaces.
struct GroupCandidate {
    length: usize,
    cluster_idx: usize,
    members: usize,
}

/// Finds the `k` nearest subsequences to `query`, examining up to `h ≥ k`
/// candidate items across survivor clusters before the final exact
/// recomputation and truncation.
///
/// Inter-cluster phase accumulates clusters into a max-heap keyed by
/// centroid distance, tracking `remaining = h − (members admitted so far)`;
/// once `remaining ≤ 0` it evicts the worst surviving cluster whenever
/// doing so would still leave at least `h` members covered. Intra-cluster
/// phase takes the exact top members of the single borderline (worst
/// surviving) cluster plus every member of every strictly-better cluster,
/// recomputes exact distances, sorts ascending, and truncates to `k`.
pub fn k_best_match(
    index: &GlobalIndex,
    block: &SampleBlock,
    query: &SequenceView<'_>,
    k: usize,
    h: usize,
    config: &EngineConfig,
) -> Result<Vec<MatchResult>> {
    if k == 0 {
        return Ok(Vec::new());
    }
    if h < k {
        return Err(GenexError::InvalidArgument(format!("h ({h}) must be >= k ({k})")));
    }
    if index.total_groups() == 0 {
        return Err(GenexError::NotIndexed("dataset has no built index".to_string()));
    }

    let kernel = DistanceRegistry::lookup(&config.distance_name)?;
    let order = traversal_order(query.len(), index.max_len(), config.warping_band_ratio);

    let mut heap: BinaryHeap<Scored<GroupCandidate>> = BinaryHeap::new();
    let mut remaining: isize = h as isize;

    for length in order {
        let Some(space) = index.space(length) else { continue };
        for (idx, cluster) in space.clusters().iter().enumerate() {
            let dropout = if remaining <= 0 {
                heap.peek().map(|s| s.dist).unwrap_or(Sample::INFINITY)
            } else {
                Sample::INFINITY
            };
            let d = cluster.distance_from_centroid(query, |a, b, drop| kernel.warped(a, b, drop, config.warping_band_ratio), dropout)?;
            let admits = if remaining <= 0 { d < dropout } else { d <= dropout };
            if admits {
                heap.push(Scored {
                    dist: d,
                    item: GroupCandidate {
                        length,
                        cluster_idx: idx,
                        members: cluster.count(),
                    },
                });
                remaining -= cluster.count() as isize;

                while remaining <= 0 {
                    let can_evict = heap.peek().is_some_and(|top| remaining + top.item.members as isize <= 0);
                    if !can_evict {
                        break;
                    }
                    let popped = heap.pop().expect("peeked Some above");
                    remaining += popped.item.members as isize;
                }
            }
        }
    }

    if heap.is_empty() {
        return Err(GenexError::NotIndexed("no candidate clusters survived inter-cluster pruning".to_string()));
    }

    let mut surviving: Vec<Scored<GroupCandidate>> = heap.into_vec();
    surviving.sort_by(|a, b| a.dist.total_cmp(&b.dist));
    let worst = surviving.pop().expect("heap was non-empty");

    let k_prime = (remaining + worst.item.members as isize).max(0) as usize;

    let mut candidates: Vec<MatchResult> = Vec::new();

    let worst_space = index.space(worst.item.length).expect("surviving group length must be indexed");
    let refined = worst_space.intra_k_sim(block, worst.item.cluster_idx, query, k_prime, |a, b, drop| {
        kernel.warped(a, b, drop, config.warping_band_ratio)
    })?;
    for (row, start, dist) in refined {
        candidates.push(MatchResult {
            row,
            start,
            length: worst.item.length,
            dist,
        });
    }

    for better in &surviving {
        let space = index.space(better.item.length).expect("surviving group length must be indexed");
        let cluster = space.cluster(better.item.cluster_idx);
        for (row, start) in space.members_of(cluster) {
            let member = SequenceView::borrowed(block, row, start, start + better.item.length)?;
            let dist = kernel.warped(&member, query, Sample::INFINITY, config.warping_band_ratio)?;
            candidates.push(MatchResult {
                row,
                start,
                length: better.item.length,
                dist,
            });
        }
    }

    candidates.sort_by(|a, b| {
        a.dist
            .total_cmp(&b.dist)
            .then(a.row.cmp(&b.row))
            .then(a.start.cmp(&b.start))
            .then(a.length.cmp(&b.length))
    });
    candidates.truncate(k);
    Ok(candidates)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn traversal_order_matches_worked_example() {
        assert_eq!(traversal_order(3, 7, 0.4), vec![3, 2, 4, 5]);
    }

    #[test]
    fn traversal_order_always_starts_at_query_length() {
        let order = traversal_order(10, 20, 0.1);
        assert_eq!(order[0], 10);
    }

    #[test]
    fn best_match_finds_identity_view() {
        use crate::config::EngineConfig;
        use crate::index::GlobalIndex;

        let block = SampleBlock::new(vec![vec![1.0, 2.0, 3.0, 4.0, 5.0], vec![9.0, 8.0, 7.0, 6.0, 5.0]]);
        let cfg = EngineConfig {
            threshold: 0.5,
            warping_band_ratio: 1.0,
            ..Default::default()
        };
        let index = GlobalIndex::build(&block, &cfg).unwrap();
        let query = SequenceView::borrowed(&block, 0, 0, 5).unwrap();
        let result = best_match(&index, &block, &query, &cfg).unwrap();
        assert_eq!((result.row, result.start, result.length), (0, 0, 5));
        assert!(result.dist.abs() < 1e-9);
    }

    #[test]
    fn k_best_rejects_h_less_than_k() {
        use crate::config::EngineConfig;
        use crate::index::GlobalIndex;

        let block = SampleBlock::new(vec![vec![1.0, 2.0, 3.0, 4.0, 5.0]]);
        let cfg = EngineConfig {
            threshold: 0.5,
            ..Default::default()
        };
        let index = GlobalIndex::build(&block, &cfg).unwrap();
        let query = SequenceView::borrowed(&block, 0, 0, 5).unwrap();
        assert!(k_best_match(&index, &block, &query, 4, 2, &cfg).is_err());
    }

    #[test]
    fn k_best_contains_best_match() {
        use crate::config::EngineConfig;
        use crate::index::GlobalIndex;

        let block = SampleBlock::new(vec![
            vec![1.0, 2.0, 3.0, 4.0, 5.0],
            vec![5.0, 4.0, 3.0, 2.0, 1.0],
            vec![2.0, 2.0, 2.0, 2.0, 2.0],
            vec![0.0, 1.0, 2.0, 3.0, 9.0],
        ]);
        let cfg = EngineConfig {
            threshold: 0.5,
            warping_band_ratio: 1.0,
            ..Default::default()
        };
        let index = GlobalIndex::build(&block, &cfg).unwrap();
        let query = SequenceView::borrowed(&block, 0, 0, 5).unwrap();

        let best = best_match(&index, &block, &query, &cfg).unwrap();
        let k_best = k_best_match(&index, &block, &query, 4, 4, &cfg).unwrap();

        assert!(k_best
            .iter()
            .any(|m| (m.row, m.start, m.length) == (best.row, best.start, best.length)));
    }
}
