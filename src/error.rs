//! Error type for everything around the simulation core.
//!
//! The tick loop itself never fails; these errors come from loading the
//! configuration and from streaming snapshots.

use thiserror::Error;

#[derive(Debug, Error)]
pub enum FleetError {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("invalid configuration: {0}")]
    InvalidConfig(String),

    #[error("message of {0} bytes exceeds the snapshot size limit")]
    MessageTooLarge(usize),
}

pub type FleetResult<T> = Result<T, FleetError>;
