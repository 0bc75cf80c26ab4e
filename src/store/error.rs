use thiserror::Error;

use crate::vector::Fid;

/// Failures raised by an [`AttributeWriter`](super::AttributeWriter).
#[derive(Debug, Error, Clone, PartialEq)]
pub enum StoreError {
    #[error("unknown field `{0}`")]
    UnknownField(String),

    #[error("a transaction is already active")]
    TransactionActive,

    #[error("no active transaction")]
    NoTransaction,

    #[error("duplicate key {0}")]
    DuplicateKey(Fid),

    /// Raised once after a batch in which some records were rejected.
    #[error("{failed} of {attempted} records violated a constraint")]
    Constraint { failed: usize, attempted: usize },
}
