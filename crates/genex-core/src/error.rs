//! Error taxonomy for the grouping and retrieval engine.
//!
//! Each variant maps to one of the failure classes of the original
//! specification; callers match on variants rather than strings.

use thiserror::Error;

/// Errors produced by `genex-core`.
#[derive(Debug, Error)]
pub enum GenexError {
    /// Non-positive `k`, `h < k`, non-positive thread count, or a PAA block
    /// size smaller than 1.
    #[error("invalid argument: {0}")]
    InvalidArgument(String),

    /// Index, start, or end outside dataset or view bounds.
    #[error("out of range: {0}")]
    OutOfRange(String),

    /// Pairwise distance or centroid addition over unequal-length sequences.
    #[error("length mismatch: {0}")]
    LengthMismatch(String),

    /// Query issued against a dataset that has no built index.
    #[error("dataset is not indexed: {0}")]
    NotIndexed(String),

    /// Persisted index whose item count, item length, or format version
    /// differs from the live dataset.
    #[error("incompatible index: {0}")]
    IncompatibleIndex(String),

    /// Distance-name lookup miss.
    #[error("unknown distance: {0}")]
    UnknownDistance(String),

    /// File open/read/write failure. Constructed by the loader collaborator
    /// (`genex-cli`) and also by `persist.rs`'s binary reader/writer, via the
    /// `From<std::io::Error>` impl below, on a truncated or corrupt index.
    #[error("io error: {0}")]
    IoError(String),

    /// Unparsable or out-of-range numeric literal in the dataset loader.
    /// Only ever constructed by the loader collaborator.
    #[error("parse error: {0}")]
    ParseError(String),
}

impl From<std::io::Error> for GenexError {
    fn from(e: std::io::Error) -> Self {
        GenexError::IoError(e.to_string())
    }
}

/// Convenience alias used throughout the crate.
pub type Result<T> = std::result::Result<T, GenexError>;
