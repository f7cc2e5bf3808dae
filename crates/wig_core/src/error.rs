use thiserror::Error;

/// Shape and capacity violations caught when buffers are built or handed in.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum WigError {
    #[error("segment count {count} outside {min}..={max}")]
    SegmentCountOutOfRange { count: usize, min: usize, max: usize },

    #[error("{buffer} buffer holds {actual} elements, expected {expected}")]
    BufferLengthMismatch {
        buffer: &'static str,
        expected: usize,
        actual: usize,
    },

    #[error("a wig needs at least one root point")]
    EmptyRoots,

    #[error("mesh has {positions} positions but {normals} normals")]
    MeshAttributeMismatch { positions: usize, normals: usize },

    #[error("history window {0} is below the minimum of 2")]
    HistoryWindowTooShort(usize),
}
