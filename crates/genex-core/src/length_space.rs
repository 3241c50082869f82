//! All clusters for one fixed subsequence length: build (the
//! leader/sequential-covering algorithm) and the per-length query
//! operations it exposes to the global index (component E), grounded in
//! `original_source/genex/group/LocalLengthGroupSpace.cpp`.

use crate::distance::DistanceKernel;
use crate::error::{GenexError, Result};
use crate::group::{add_member, seed_cluster, Cluster, MemberMap};
use crate::heap::BoundedMaxHeap;
use crate::sequence::{Sample, SampleBlock, SequenceView};

pub struct LengthSpace {
    length: usize,
    clusters: Vec<Cluster>,
    members: MemberMap,
}

impl LengthSpace {
    /// Builds all clusters for `length` via the leader/sequential-covering
    /// rule: each subsequence joins its nearest existing cluster if within
    /// `threshold / 2`, else seeds a new one. Iterates `start` outer, `row`
    /// inner, per `spec.md` §4.2, so insertion order (and therefore cluster
    /// ids) is deterministic for a fixed dataset and threshold.
    pub fn build(block: &SampleBlock, length: usize, kernel: &DistanceKernel, threshold: Sample) -> Result<Self> {
        if block.item_count() == 0 {
            return Err(GenexError::InvalidArgument("cannot build a length space over an empty dataset".to_string()));
        }
        let sub_seq_count = block.sub_seq_count(length);
        let mut members = MemberMap::new(block.item_count(), sub_seq_count);
        let mut clusters: Vec<Cluster> = Vec::new();
        let half_threshold = threshold / 2.0;

        for start in 0..sub_seq_count {
            for row in 0..block.item_count() {
                let q = SequenceView::borrowed(block, row, start, start + length)?;

                let mut best = Sample::INFINITY;
                let mut best_idx: Option<usize> = None;
                for (idx, cluster) in clusters.iter().enumerate() {
                    let dg = cluster.distance_from_centroid(&q, |a, b, dropout| kernel.pairwise(a, b, dropout), best)?;
                    if dg < best {
                        best = dg;
                        best_idx = Some(idx);
                    }
                }

                if best_idx.is_none() || best > half_threshold {
                    let id = clusters.len() as u32;
                    let cluster = seed_cluster(block, &mut members, id, row, start, length)?;
                    clusters.push(cluster);
                } else {
                    let idx = best_idx.unwrap();
                    add_member(block, &mut members, &mut clusters[idx], row, start, length)?;
                }
            }
        }

        Ok(LengthSpace { length, clusters, members })
    }

    /// Builds an empty length space with no clusters, for the persistence
    /// reader to populate cluster-by-cluster via [`LengthSpace::restore_cluster`].
    pub(crate) fn empty(block: &SampleBlock, length: usize) -> Result<Self> {
        let sub_seq_count = block.sub_seq_count(length);
        let members = MemberMap::new(block.item_count(), sub_seq_count);
        Ok(LengthSpace {
            length,
            clusters: Vec::new(),
            members,
        })
    }

    /// Rehydrates one cluster from a persisted `(id, seed, rest-of-members)`
    /// triple, recomputing its centroid from the raw member values (the
    /// centroid is never itself persisted, per `spec.md` §6).
    pub(crate) fn restore_cluster(&mut self, block: &SampleBlock, id: u32, seed_row: usize, seed_start: usize, rest: Vec<(usize, usize)>) -> Result<()> {
        let mut cluster = seed_cluster(block, &mut self.members, id, seed_row, seed_start, self.length)?;
        for (row, start) in rest {
            add_member(block, &mut self.members, &mut cluster, row, start, self.length)?;
        }
        self.clusters.push(cluster);
        Ok(())
    }

    pub fn length(&self) -> usize {
        self.length
    }

    pub fn num_clusters(&self) -> usize {
        self.clusters.len()
    }

    pub fn clusters(&self) -> &[Cluster] {
        &self.clusters
    }

    pub fn cluster(&self, idx: usize) -> &Cluster {
        &self.clusters[idx]
    }

    /// `(row, start)` pairs belonging to `cluster`, in reverse insertion
    /// order.
    pub fn members_of<'a>(&'a self, cluster: &Cluster) -> impl Iterator<Item = (usize, usize)> + 'a {
        self.members.iter_cluster(cluster)
    }

    /// Scans every cluster's centroid against `query`, returning the index
    /// and distance of the nearest, with dropout tightened as the scan
    /// proceeds. `None` if this length space has no clusters.
    pub fn get_best_group(
        &self,
        query: &SequenceView<'_>,
        dist: impl Fn(&SequenceView<'_>, &SequenceView<'_>, Sample) -> Result<Sample>,
        mut dropout: Sample,
    ) -> Result<Option<(usize, Sample)>> {
        let mut best: Option<(usize, Sample)> = None;
        for (idx, cluster) in self.clusters.iter().enumerate() {
            let dg = cluster.distance_from_centroid(query, &dist, dropout)?;
            if dg < dropout {
                dropout = dg;
                best = Some((idx, dg));
            }
        }
        Ok(best)
    }

    /// Exact nearest member of `cluster_idx`, breaking ties lexicographically
    /// on `(index, start, length)`.
    pub fn best_match_in_group(
        &self,
        block: &SampleBlock,
        cluster_idx: usize,
        query: &SequenceView<'_>,
        dist: impl Fn(&SequenceView<'_>, &SequenceView<'_>, Sample) -> Result<Sample>,
    ) -> Result<Option<(usize, usize, Sample)>> {
        let cluster = &self.clusters[cluster_idx];
        let mut best: Option<(usize, usize, Sample)> = None;
        for (row, start) in self.members.iter_cluster(cluster) {
            let member = SequenceView::borrowed(block, row, start, start + self.length)?;
            let d = dist(&member, query, Sample::INFINITY)?;
            best = Some(match best {
                None => (row, start, d),
                Some((br, bs, bd)) => {
                    if d < bd || (d == bd && (row, start, self.length) < (br, bs, self.length)) {
                        (row, start, d)
                    } else {
                        (br, bs, bd)
                    }
                }
            });
        }
        Ok(best)
    }

    /// Selects the `k` nearest members of `cluster_idx` to `query`, using a
    /// bounded max-heap whose dropout tightens as candidates are admitted.
    pub fn intra_k_sim(
        &self,
        block: &SampleBlock,
        cluster_idx: usize,
        query: &SequenceView<'_>,
        k: usize,
        dist: impl Fn(&SequenceView<'_>, &SequenceView<'_>, Sample) -> Result<Sample>,
    ) -> Result<Vec<(usize, usize, Sample)>> {
        if k == 0 {
            return Ok(Vec::new());
        }
        let cluster = &self.clusters[cluster_idx];
        let mut heap: BoundedMaxHeap<(usize, usize)> = BoundedMaxHeap::new(k);
        for (row, start) in self.members.iter_cluster(cluster) {
            let member = SequenceView::borrowed(block, row, start, start + self.length)?;
            let dropout = heap.dropout();
            let d = dist(&member, query, dropout)?;
            if d <= dropout {
                heap.push(d, (row, start));
            }
        }
        Ok(heap
            .into_sorted_ascending()
            .into_iter()
            .map(|s| (s.item.0, s.item.1, s.dist))
            .collect())
    }
}
