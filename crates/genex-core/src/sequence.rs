//! Sample storage and zero-copy windowed views over it (component A).

use crate::error::{GenexError, Result};
use std::fmt;

/// Sample precision. A `single_precision` feature switches this to `f32`,
/// mirroring the compile-time toggle called for in `spec.md` §3.
#[cfg(not(feature = "single_precision"))]
pub type Sample = f64;
#[cfg(feature = "single_precision")]
pub type Sample = f32;

/// Epsilon used for value-equality comparisons between sequence views.
pub const EPS: Sample = 1e-12;

/// A dense row-major rectangular buffer of samples. Row `i` has logical
/// length `lengths[i]`; the buffer stride is the max length across rows, so
/// ragged rows are padded but never read past their own length. Immutable
/// after construction.
#[derive(Debug, Clone)]
pub struct SampleBlock {
    data: Vec<Sample>,
    lengths: Vec<usize>,
    stride: usize,
}

impl SampleBlock {
    /// Builds a sample block from per-row data. Rows may have different
    /// lengths; the buffer is padded with zeros up to the longest row.
    pub fn new(rows: Vec<Vec<Sample>>) -> Self {
        let stride = rows.iter().map(|r| r.len()).max().unwrap_or(0);
        let lengths = rows.iter().map(|r| r.len()).collect();
        let mut data = Vec::with_capacity(rows.len() * stride);
        for row in rows {
            data.extend_from_slice(&row);
            data.resize(data.len() + (stride - row.len()), 0.0 as Sample);
        }
        SampleBlock {
            data,
            lengths,
            stride,
        }
    }

    /// Number of rows (items) in the dataset.
    pub fn item_count(&self) -> usize {
        self.lengths.len()
    }

    /// Logical length of row `i`.
    pub fn row_len(&self, row: usize) -> usize {
        self.lengths[row]
    }

    /// Buffer stride (the max row length).
    pub fn stride(&self) -> usize {
        self.stride
    }

    /// The length every row must admit subsequences up to, i.e. the minimum
    /// row length. `GlobalIndex` builds length spaces `2..=item_length()`.
    pub fn item_length(&self) -> usize {
        self.lengths.iter().copied().min().unwrap_or(0)
    }

    /// Reads a single sample, bounds-checked against the row's logical
    /// length (not the padded stride).
    pub fn get(&self, row: usize, idx: usize) -> Result<Sample> {
        if row >= self.item_count() || idx >= self.lengths[row] {
            return Err(GenexError::OutOfRange(format!(
                "sample ({row}, {idx}) out of range"
            )));
        }
        Ok(self.data[row * self.stride + idx])
    }

    fn row_slice(&self, row: usize) -> &[Sample] {
        &self.data[row * self.stride..row * self.stride + self.lengths[row]]
    }

    /// Number of length-`length` subsequences per row, uniform across every
    /// row: `item_length() - length + 1`, or `0` if `length` exceeds the
    /// shortest row. A length space's member map is sized
    /// `item_count() * sub_seq_count(length)`, so every row is indexed only
    /// up to the dataset's shortest row even when it itself is longer.
    pub fn sub_seq_count(&self, length: usize) -> usize {
        let item_length = self.item_length();
        if item_length < length {
            0
        } else {
            item_length - length + 1
        }
    }
}

/// Ownership of the backing storage for a [`SequenceView`]. Replaces the
/// source's raw-pointer + "isOwnerOfData" flag with a single enum, per the
/// DESIGN NOTES move-assignment hazard.
enum SeqStorage<'a> {
    Borrowed {
        block: &'a SampleBlock,
        row: usize,
    },
    Owned(Vec<Sample>),
}

/// A zero-copy windowed view `[start, end)` over a row of a [`SampleBlock`],
/// or an owned buffer when materialized (e.g. a centroid accumulator).
/// Identity is `(row, start, length)`; value equality is within [`EPS`].
pub struct SequenceView<'a> {
    storage: SeqStorage<'a>,
    row: usize,
    start: usize,
    end: usize,
}

impl<'a> SequenceView<'a> {
    /// Builds a borrowed view `[start, end)` over `row` of `block`.
    pub fn borrowed(block: &'a SampleBlock, row: usize, start: usize, end: usize) -> Result<Self> {
        if row >= block.item_count() || end > block.lengths[row] || start > end {
            return Err(GenexError::OutOfRange(format!(
                "view ({row}, {start}, {end}) out of range"
            )));
        }
        Ok(SequenceView {
            storage: SeqStorage::Borrowed { block, row },
            row,
            start,
            end,
        })
    }

    /// Builds an owned, zero-initialized view of the given length, with
    /// identity `(0, 0, length)` as in the source's length-only constructor.
    pub fn owned_zeroed(length: usize) -> Self {
        SequenceView {
            storage: SeqStorage::Owned(vec![0.0 as Sample; length]),
            row: 0,
            start: 0,
            end: length,
        }
    }

    /// Builds an owned view from already-materialized values, with identity
    /// `(0, 0, data.len())`.
    pub fn owned_values(data: Vec<Sample>) -> Self {
        let end = data.len();
        SequenceView {
            storage: SeqStorage::Owned(data),
            row: 0,
            start: 0,
            end,
        }
    }

    /// Builds an owned view by copying an existing view's values.
    pub fn owned_from(view: &SequenceView<'_>) -> Self {
        let data: Vec<Sample> = (0..view.len()).map(|i| view.get(i).unwrap()).collect();
        SequenceView {
            storage: SeqStorage::Owned(data),
            row: view.row,
            start: 0,
            end: view.len(),
        }
    }

    /// Logical length of the view.
    pub fn len(&self) -> usize {
        self.end - self.start
    }

    pub fn is_empty(&self) -> bool {
        self.end == self.start
    }

    /// Row index this view identifies with (0 for owned/synthetic views).
    pub fn index(&self) -> usize {
        self.row
    }

    /// Start offset within the row.
    pub fn start(&self) -> usize {
        self.start
    }

    /// End offset (exclusive) within the row.
    pub fn end(&self) -> usize {
        self.end
    }

    /// Reads value `idx` of the view, bounds-checked.
    pub fn get(&self, idx: usize) -> Result<Sample> {
        if idx >= self.len() {
            return Err(GenexError::OutOfRange(format!(
                "view index {idx} out of range for length {}",
                self.len()
            )));
        }
        match &self.storage {
            SeqStorage::Borrowed { block, row } => block.row_slice(*row).get(self.start + idx).copied().ok_or_else(|| {
                GenexError::OutOfRange(format!("view index {idx} out of range"))
            }),
            SeqStorage::Owned(data) => Ok(data[idx]),
        }
    }

    /// Returns the underlying values as an owned `Vec`.
    pub fn to_vec(&self) -> Vec<Sample> {
        (0..self.len()).map(|i| self.get(i).unwrap()).collect()
    }

    /// In-place pointwise addition; requires equal length. Used only by the
    /// centroid accumulator, which is always an owned view.
    pub fn add_assign(&mut self, other: &SequenceView<'_>) -> Result<()> {
        if self.len() != other.len() {
            return Err(GenexError::LengthMismatch(format!(
                "cannot add sequence of length {} into sequence of length {}",
                other.len(),
                self.len()
            )));
        }
        match &mut self.storage {
            SeqStorage::Owned(data) => {
                for i in 0..data.len() {
                    data[i] += other.get(i)?;
                }
                Ok(())
            }
            SeqStorage::Borrowed { .. } => Err(GenexError::InvalidArgument(
                "cannot mutate a borrowed sequence view".to_string(),
            )),
        }
    }

    /// Value equality within [`EPS`], independent of identity.
    pub fn value_eq(&self, other: &SequenceView<'_>) -> bool {
        if self.len() != other.len() {
            return false;
        }
        (0..self.len()).all(|i| {
            let (a, b) = (self.get(i).unwrap(), other.get(i).unwrap());
            (a - b).abs() < EPS
        })
    }

    /// Lexicographic tie-break key `(index, start, length)`.
    pub fn order_key(&self) -> (usize, usize, usize) {
        (self.row, self.start, self.len())
    }
}

impl fmt::Display for SequenceView<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} [{}, {})", self.row, self.start, self.end)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn block() -> SampleBlock {
        SampleBlock::new(vec![vec![1.0, 2.0, 3.0, 4.0], vec![5.0, 6.0, 7.0]])
    }

    #[test]
    fn borrowed_view_reads_values() {
        let b = block();
        let v = SequenceView::borrowed(&b, 0, 1, 3).unwrap();
        assert_eq!(v.len(), 2);
        assert_eq!(v.get(0).unwrap(), 2.0);
        assert_eq!(v.get(1).unwrap(), 3.0);
        assert_eq!(v.to_string(), "0 [1, 3)");
    }

    #[test]
    fn out_of_range_is_rejected() {
        let b = block();
        assert!(SequenceView::borrowed(&b, 1, 0, 4).is_err());
        let v = SequenceView::borrowed(&b, 0, 0, 2).unwrap();
        assert!(v.get(5).is_err());
    }

    #[test]
    fn owned_add_assign_requires_equal_length() {
        let b = block();
        let a = SequenceView::borrowed(&b, 0, 0, 2).unwrap();
        let mut owned = SequenceView::owned_zeroed(2);
        owned.add_assign(&a).unwrap();
        assert_eq!(owned.to_vec(), vec![1.0, 2.0]);

        let c = SequenceView::borrowed(&b, 1, 0, 3).unwrap();
        assert!(owned.add_assign(&c).is_err());
    }

    #[test]
    fn value_equality_uses_epsilon() {
        let b = block();
        let a = SequenceView::borrowed(&b, 0, 0, 2).unwrap();
        let mut owned = SequenceView::owned_zeroed(2);
        owned.add_assign(&a).unwrap();
        assert!(owned.value_eq(&a));
    }
}
