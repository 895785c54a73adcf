//! Error taxonomy for the import pipeline.
//!
//! Everything fatal funnels into [`ImportError`]; the top level converts it
//! into the plugin result document. There is no retry or rollback anywhere,
//! so an error after `add_network` leaves an orphaned network on the server
//! and the report says so.

use reqwest::StatusCode;
use thiserror::Error;

pub type ImportResult<T> = Result<T, ImportError>;

#[derive(Debug, Error)]
pub enum ImportError {
    /// Non-success HTTP status from a remote fetch.
    #[error("a connection error has occurred with status code: {0}")]
    Transport(StatusCode),

    /// Transport-level failure before any status was received.
    #[error("request failed: {0}")]
    Http(#[from] reqwest::Error),

    /// A project ID was supplied but the server does not know it.
    #[error("project with ID {0} not found")]
    ProjectNotFound(i64),

    /// The Hydra server reported a fault for an RPC call.
    #[error("hydra call '{call}' failed: {fault}")]
    Rpc { call: String, fault: String },

    /// The feed (or a remote response) did not have the shape we need.
    #[error("malformed data: {0}")]
    Data(String),

    /// Referential checks failed before submission (incomplete links,
    /// unresolved node types, missing attribute bindings).
    #[error("validation failed:\n{}", .0.join("\n"))]
    Validation(Vec<String>),

    #[error(transparent)]
    Json(#[from] serde_json::Error),

    #[error(transparent)]
    Io(#[from] std::io::Error),
}
