use thiserror::Error;

use crate::node::error::NodeError;

/// Failure of an upward query.
///
/// Only these reach the caller. Partial resolution failures and missing
/// fee/difficulty samples are absorbed into the shape of the result instead.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum ExplorerError {
    /// Node down, credentials refused, timed out or answering garbage.
    #[error("node unavailable: {0}")]
    Unavailable(#[source] NodeError),

    #[error("{kind} not found: {id}")]
    NotFound { kind: &'static str, id: String },

    /// The node understood the request and refused it.
    #[error("node rejected the request: {0}")]
    Rejected(#[source] NodeError),

    #[error("invalid input: {0}")]
    InvalidInput(String),
}

impl ExplorerError {
    /// Classifies a failed lookup of `kind` identified by `id`.
    pub fn lookup(kind: &'static str, id: impl ToString) -> impl FnOnce(NodeError) -> Self {
        move |err| {
            if err.is_not_found() {
                ExplorerError::NotFound {
                    kind,
                    id: id.to_string(),
                }
            } else {
                ExplorerError::from(err)
            }
        }
    }

    pub fn is_unavailable(&self) -> bool {
        matches!(self, ExplorerError::Unavailable(_))
    }

    pub fn is_not_found(&self) -> bool {
        matches!(self, ExplorerError::NotFound { .. })
    }
}

impl From<NodeError> for ExplorerError {
    fn from(err: NodeError) -> Self {
        if err.is_unavailable() {
            ExplorerError::Unavailable(err)
        } else {
            ExplorerError::Rejected(err)
        }
    }
}
