//! Domain errors for the search pipeline.
//!
//! Every stage of the pipeline fails with a [`KhojError`]. Nothing is
//! partially recovered: the first error aborts the request and is surfaced
//! to the caller as a single structured response (see [`crate::server`]).
//!
//! Variants are grouped into three [`ErrorKind`]s:
//!
//! | Kind | Variants |
//! |------|----------|
//! | `Input` | `Input`, `NoDishesDetected`, `NoSearchableKeyword` |
//! | `Collaborator` | `Collaborator`, `Timeout { stage: Detection }` |
//! | `Index` | `Index`, `Timeout { stage: Search }` |

use std::fmt;
use std::time::Duration;
use thiserror::Error;

/// The outbound call a timeout belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Stage {
    Detection,
    Search,
}

impl fmt::Display for Stage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Stage::Detection => f.write_str("detection"),
            Stage::Search => f.write_str("search"),
        }
    }
}

/// Coarse error classification, used for HTTP status mapping and logs.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    Input,
    Collaborator,
    Index,
}

#[derive(Debug, Error)]
pub enum KhojError {
    #[error("invalid input: {0}")]
    Input(String),

    #[error("no dishes detected in image")]
    NoDishesDetected,

    #[error("no searchable keyword produced for {dishes} detected dish(es)")]
    NoSearchableKeyword { dishes: usize },

    #[error("detection service error: {0}")]
    Collaborator(String),

    #[error("product index error: {0}")]
    Index(String),

    #[error("{stage} call timed out after {}s", .after.as_secs_f64())]
    Timeout { stage: Stage, after: Duration },
}

impl KhojError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            KhojError::Input(_)
            | KhojError::NoDishesDetected
            | KhojError::NoSearchableKeyword { .. } => ErrorKind::Input,
            KhojError::Collaborator(_)
            | KhojError::Timeout {
                stage: Stage::Detection,
                ..
            } => ErrorKind::Collaborator,
            KhojError::Index(_)
            | KhojError::Timeout {
                stage: Stage::Search,
                ..
            } => ErrorKind::Index,
        }
    }

    /// Machine-readable code used in HTTP error bodies.
    pub fn code(&self) -> &'static str {
        match self {
            KhojError::Input(_) => "bad_request",
            KhojError::NoDishesDetected => "no_dishes_detected",
            KhojError::NoSearchableKeyword { .. } => "no_searchable_keyword",
            KhojError::Collaborator(_) => "detection_failed",
            KhojError::Index(_) => "index_error",
            KhojError::Timeout { .. } => "timeout",
        }
    }
}

pub type Result<T> = std::result::Result<T, KhojError>;
