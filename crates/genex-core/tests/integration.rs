//! End-to-end scenarios exercising the grouping and retrieval engine
//! together, covering the testable properties and worked scenarios
//! described in `spec.md` §8.

use genex_core::config::EngineConfig;
use genex_core::distance::keogh_lower_bound;
use genex_core::sequence::Sample;
use genex_core::{persist, retrieval, GlobalIndex, SampleBlock, SequenceView};

fn ten_by_twenty() -> SampleBlock {
    let rows: Vec<Vec<f64>> = (0..10)
        .map(|i| (0..20).map(|j| (i as f64) * 3.0 + (j as f64).sin()).collect())
        .collect();
    SampleBlock::new(rows)
}

#[test]
fn identity_best_match_has_zero_distance() {
    let block = ten_by_twenty();
    let config = EngineConfig {
        distance_name: "euclidean".to_string(),
        threshold: 0.5,
        warping_band_ratio: 1.0,
        num_threads: 1,
    };
    let index = GlobalIndex::build(&block, &config).unwrap();

    for row in 0..block.item_count() {
        let query = SequenceView::borrowed(&block, row, 0, 20).unwrap();
        let result = retrieval::best_match(&index, &block, &query, &config).unwrap();
        assert_eq!((result.row, result.start, result.length), (row, 0, 20));
        assert!(result.dist.abs() < 1e-6, "expected zero distance, got {}", result.dist);
    }
}

#[test]
fn k_best_contains_reported_best_match() {
    let block = ten_by_twenty();
    let config = EngineConfig {
        distance_name: "euclidean".to_string(),
        threshold: 0.5,
        warping_band_ratio: 1.0,
        num_threads: 1,
    };
    let index = GlobalIndex::build(&block, &config).unwrap();
    let query = SequenceView::borrowed(&block, 3, 0, 20).unwrap();

    let best = retrieval::best_match(&index, &block, &query, &config).unwrap();
    for k in [1usize, 2, 4] {
        let results = retrieval::k_best_match(&index, &block, &query, k, k, &config).unwrap();
        assert_eq!(results.len(), k.min(results.len()));
        assert!(results
            .iter()
            .any(|m| (m.row, m.start, m.length) == (best.row, best.start, best.length)));
    }
}

#[test]
fn k_best_is_sorted_ascending_by_tie_break_key() {
    let block = ten_by_twenty();
    let config = EngineConfig {
        distance_name: "euclidean".to_string(),
        threshold: 0.5,
        warping_band_ratio: 1.0,
        num_threads: 1,
    };
    let index = GlobalIndex::build(&block, &config).unwrap();
    let query = SequenceView::borrowed(&block, 0, 0, 20).unwrap();
    let results = retrieval::k_best_match(&index, &block, &query, 5, 5, &config).unwrap();

    for pair in results.windows(2) {
        let (a, b) = (pair[0], pair[1]);
        let a_key = (a.dist, a.row, a.start, a.length);
        let b_key = (b.dist, b.row, b.start, b.length);
        assert!(a_key <= b_key, "results not sorted: {a:?} before {b:?}");
    }
}

#[test]
fn covering_radius_holds_for_every_cluster_seed() {
    let block = SampleBlock::new(vec![
        vec![0.0; 10],
        vec![0.1; 10],
        vec![5.0; 10],
        vec![5.1; 10],
        vec![10.0; 10],
    ]);
    let config = EngineConfig {
        distance_name: "euclidean".to_string(),
        threshold: 0.5,
        warping_band_ratio: 1.0,
        num_threads: 1,
    };
    let index = GlobalIndex::build(&block, &config).unwrap();
    let space = index.space(10).unwrap();
    let kernel = genex_core::distance::DistanceRegistry::lookup("euclidean").unwrap();

    for cluster in space.clusters() {
        let members: Vec<(usize, usize)> = space.members_of(cluster).collect();
        let (seed_row, seed_start) = *members.last().unwrap(); // oldest = seed
        let seed_view = SequenceView::borrowed(&block, seed_row, seed_start, seed_start + 10).unwrap();
        for (row, start) in &members {
            let member = SequenceView::borrowed(&block, *row, *start, *start + 10).unwrap();
            let d = kernel.pairwise(&seed_view, &member, f64::INFINITY).unwrap();
            assert!(d <= 0.25 + 1e-9, "member distance {d} exceeds covering radius");
        }
    }
}

#[test]
fn traversal_order_matches_worked_example() {
    assert_eq!(retrieval::traversal_order(3, 7, 0.4), vec![3, 2, 4, 5]);
}

#[test]
fn keogh_bound_matches_worked_example() {
    let a_block = SampleBlock::new(vec![vec![0.0, 2.0, 3.0, 5.0, 8.0, 6.0, 3.0, 2.0, 3.0, 5.0]]);
    let b_block = SampleBlock::new(vec![vec![8.0, 4.0, 6.0, 1.0, 5.0, 10.0, 9.0]]);
    let a = SequenceView::borrowed(&a_block, 0, 0, 10).unwrap();
    let b = SequenceView::borrowed(&b_block, 0, 0, 7).unwrap();
    let bound = keogh_lower_bound(&a, &b, 10.0, 0.2).unwrap();
    let expected: Sample = 31.0_f64.sqrt() / 20.0;
    assert!((bound - expected).abs() < 1e-9, "expected {expected}, got {bound}");
}

#[test]
fn persist_round_trip_preserves_best_match() {
    let rows: Vec<Vec<f64>> = (0..6)
        .map(|i| (0..25).map(|j| (i as f64 * 1.7 + j as f64 * 0.3).cos()).collect())
        .collect();
    let block = SampleBlock::new(rows);
    let config = EngineConfig {
        distance_name: "euclidean".to_string(),
        threshold: 0.6,
        warping_band_ratio: 0.2,
        num_threads: 1,
    };
    let index = GlobalIndex::build(&block, &config).unwrap();

    let mut buf = Vec::new();
    persist::save(&index, block.item_count(), &mut buf).unwrap();
    let restored = persist::load(&block, &buf[..]).unwrap();

    let query = SequenceView::borrowed(&block, 1, 4, 23).unwrap();
    let before = retrieval::best_match(&index, &block, &query, &config).unwrap();
    let restored_config = EngineConfig {
        distance_name: restored.distance_name().to_string(),
        threshold: restored.threshold(),
        warping_band_ratio: restored.warping_band_ratio(),
        num_threads: 1,
    };
    let after = retrieval::best_match(&restored, &block, &query, &restored_config).unwrap();

    assert_eq!((before.row, before.start, before.length), (after.row, after.start, after.length));
    assert!((before.dist - after.dist).abs() < 1e-9);
}

#[test]
fn restoring_into_a_different_dataset_is_rejected() {
    let block_a = SampleBlock::new(vec![vec![1.0, 2.0, 3.0, 4.0, 5.0], vec![5.0, 4.0, 3.0, 2.0, 1.0]]);
    let config = EngineConfig {
        distance_name: "euclidean".to_string(),
        threshold: 0.5,
        warping_band_ratio: 1.0,
        num_threads: 1,
    };
    let index = GlobalIndex::build(&block_a, &config).unwrap();
    let mut buf = Vec::new();
    persist::save(&index, block_a.item_count(), &mut buf).unwrap();

    let block_b = SampleBlock::new(vec![vec![1.0, 2.0, 3.0]]);
    let result = persist::load(&block_b, &buf[..]);
    assert!(matches!(result, Err(genex_core::GenexError::IncompatibleIndex(_))));
}
