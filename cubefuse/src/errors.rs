use std::result;

use thiserror::Error;

/// Failures raised while validating or combining cube collections.
///
#[derive(Debug, Error)]
pub enum Error {
    /// A candidate group differs in more fields than the requested mode
    /// allows. Carries the discriminating field name(s).
    #[error("incompatible metadata: {0}")]
    IncompatibleMetadata(String),

    /// Two cubes in a merge group stack to the same coordinate value.
    #[error("failed to merge into a single cube: duplicate '{name}' cube {detail}")]
    DuplicateData { name: String, detail: String },

    /// A concatenation group cannot form one monotonic coordinate series.
    #[error("coordinate '{coord}' cannot form a monotonic series: {detail}")]
    NonMonotonic { coord: String, detail: String },

    /// A single-result call received zero cubes.
    #[error("no cubes were supplied")]
    EmptyInput,

    /// A single-result call produced more than one group. One diagnostic
    /// per unresolved pair of result cubes.
    #[error("unable to combine into a single cube; {} cubes remain: {}", .count, .details.join("; "))]
    MultipleResults { count: usize, details: Vec<String> },

    /// A coordinate or cube violated a construction-time invariant.
    #[error("invalid coordinate: {0}")]
    Coordinate(String),

    /// Array payloads cannot be combined as requested.
    #[error("shape mismatch: {0}")]
    Shape(String),
}

pub type Result<T> = result::Result<T, Error>;
