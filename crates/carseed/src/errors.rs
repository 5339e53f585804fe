//! 💀 The three ways a batch fails to arrive.
//!
//! None of these are fatal. None of them reach the producer. Every one of them ends
//! with the batch going back into the buffer and a log line explaining which flavor
//! of sadness it was.

use std::fmt;

/// 🏷️ A failed delivery attempt, classified by where it broke.
#[derive(Debug, thiserror::Error)]
pub enum DeliveryError {
    /// 📡 The receiver answered, just not with the status we wanted.
    #[error("receiver responded with {status}: {body}")]
    Status { status: u16, body: String },

    /// 🕳️ The request left, nothing came back (refused, reset, timed out).
    #[error("no response from receiver endpoint {endpoint}")]
    NoResponse {
        endpoint: String,
        #[source]
        source: Box<dyn std::error::Error + Send + Sync>,
    },

    /// 🏗️ We never got as far as sending (serialization, request builder).
    #[error("error setting up request: {reason}")]
    RequestConstruction { reason: String },
}

impl DeliveryError {
    pub fn kind(&self) -> FailureKind {
        match self {
            DeliveryError::Status { .. } => FailureKind::Status,
            DeliveryError::NoResponse { .. } => FailureKind::NoResponse,
            DeliveryError::RequestConstruction { .. } => FailureKind::RequestConstruction,
        }
    }
}

/// 🏷️ The payload-free version of [`DeliveryError`], cheap to copy into outcomes and logs.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum FailureKind {
    Status,
    NoResponse,
    RequestConstruction,
}

impl fmt::Display for FailureKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            FailureKind::Status => "status",
            FailureKind::NoResponse => "no_response",
            FailureKind::RequestConstruction => "request_construction",
        };
        f.write_str(label)
    }
}
