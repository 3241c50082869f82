//! Cluster (Group) and the shared member map threading its membership
//! list (component D), grounded in `original_source/src/Group.cpp` and
//! `original_source/src/GroupCentroid.cpp`.

use crate::error::Result;
use crate::sequence::{Sample, SampleBlock, SequenceView};

/// One slot of the shared member map: which cluster a `(row, start)`
/// subsequence belongs to, and the index of the previously-inserted member
/// of that same cluster (reverse insertion order).
#[derive(Debug, Clone, Copy)]
struct MemberSlot {
    cluster_id: u32,
    next: Option<u32>,
}

/// Flat array of size `itemCount * subSeqCount(L)`, one slot per
/// `(row, start)` subsequence of a fixed length. Replaces the source's
/// cyclic cluster<->member back-pointers with a plain arena owned by the
/// length space: clusters hold only an `id` and a head index into this
/// array, per the REDESIGN FLAG in `spec.md` §9.
pub struct MemberMap {
    slots: Vec<Option<MemberSlot>>,
    sub_seq_count: usize,
}

impl MemberMap {
    pub fn new(item_count: usize, sub_seq_count: usize) -> Self {
        MemberMap {
            slots: vec![None; item_count * sub_seq_count],
            sub_seq_count,
        }
    }

    fn index_of(&self, row: usize, start: usize) -> usize {
        row * self.sub_seq_count + start
    }

    /// Cluster id this subsequence belongs to, if assigned yet.
    pub fn cluster_of(&self, row: usize, start: usize) -> Option<u32> {
        self.slots[self.index_of(row, start)].map(|s| s.cluster_id)
    }

    fn link(&mut self, row: usize, start: usize, cluster_id: u32, prev_head: Option<usize>) {
        let idx = self.index_of(row, start);
        self.slots[idx] = Some(MemberSlot {
            cluster_id,
            next: prev_head.map(|i| i as u32),
        });
    }

    fn next_of(&self, slot_index: usize) -> Option<usize> {
        self.slots[slot_index].and_then(|s| s.next).map(|n| n as usize)
    }

    fn row_start_of(&self, slot_index: usize) -> (usize, usize) {
        (slot_index / self.sub_seq_count, slot_index % self.sub_seq_count)
    }
}

/// Running sum of a cluster's members, one accumulator per sample position.
/// The mean is computed lazily on read by dividing by `count`, never stored,
/// per `spec.md` §3.
#[derive(Debug, Clone)]
pub struct CentroidSum {
    sum: Vec<Sample>,
}

impl CentroidSum {
    fn seeded(values: &[Sample]) -> Self {
        CentroidSum { sum: values.to_vec() }
    }

    fn add(&mut self, values: &[Sample]) {
        for (s, v) in self.sum.iter_mut().zip(values.iter()) {
            *s += *v;
        }
    }

    /// The current mean, as an owned sequence view.
    pub fn mean(&self, count: usize) -> SequenceView<'static> {
        let count = count.max(1) as Sample;
        let values: Vec<Sample> = self.sum.iter().map(|s| s / count).collect();
        SequenceView::owned_values(values)
    }
}

/// Centroid + member set for one fixed subsequence length.
pub struct Cluster {
    id: u32,
    centroid: CentroidSum,
    count: usize,
    head: Option<usize>,
}

impl Cluster {
    fn seed(id: u32, seed_values: &[Sample], head_slot: usize) -> Self {
        Cluster {
            id,
            centroid: CentroidSum::seeded(seed_values),
            count: 1,
            head: Some(head_slot),
        }
    }

    pub fn id(&self) -> u32 {
        self.id
    }

    pub fn count(&self) -> usize {
        self.count
    }

    /// The cluster's current mean centroid.
    pub fn centroid_mean(&self) -> SequenceView<'static> {
        self.centroid.mean(self.count)
    }

    /// Distance between the current mean centroid and `query`, via an
    /// equal-length pairwise metric (both are length `L`).
    pub fn distance_from_centroid(
        &self,
        query: &SequenceView<'_>,
        dist: impl Fn(&SequenceView<'_>, &SequenceView<'_>, Sample) -> Result<Sample>,
        dropout: Sample,
    ) -> Result<Sample> {
        let mean = self.centroid_mean();
        dist(&mean, query, dropout)
    }
}

/// Walks a cluster's membership thread from its head backward, yielding
/// `(row, start)` pairs in reverse insertion order.
pub struct MemberIter<'a> {
    members: &'a MemberMap,
    cursor: Option<usize>,
}

impl<'a> Iterator for MemberIter<'a> {
    type Item = (usize, usize);

    fn next(&mut self) -> Option<Self::Item> {
        let idx = self.cursor?;
        self.cursor = self.members.next_of(idx);
        Some(self.members.row_start_of(idx))
    }
}

impl MemberMap {
    pub fn iter_cluster<'a>(&'a self, cluster: &Cluster) -> MemberIter<'a> {
        MemberIter {
            members: self,
            cursor: cluster.head,
        }
    }
}

/// Adds a new cluster seeded at `(row, start)`, recording the seed in the
/// member map. Returns the new cluster's index within the caller's vector.
pub fn seed_cluster(block: &SampleBlock, members: &mut MemberMap, id: u32, row: usize, start: usize, length: usize) -> Result<Cluster> {
    let view = SequenceView::borrowed(block, row, start, start + length)?;
    let values = view.to_vec();
    let slot_index = members.index_of(row, start);
    members.link(row, start, id, None);
    Ok(Cluster::seed(id, &values, slot_index))
}

/// Adds `(row, start)` as a member of `cluster`, folding its values into
/// the running centroid sum and threading the member map.
pub fn add_member(block: &SampleBlock, members: &mut MemberMap, cluster: &mut Cluster, row: usize, start: usize, length: usize) -> Result<()> {
    let view = SequenceView::borrowed(block, row, start, start + length)?;
    let values = view.to_vec();
    cluster.centroid.add(&values);
    cluster.count += 1;
    let slot_index = members.index_of(row, start);
    members.link(row, start, cluster.id, cluster.head);
    cluster.head = Some(slot_index);
    Ok(())
}
