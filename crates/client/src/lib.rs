use async_trait::async_trait;
use rcly_core::models::Transaction;
use rcly_core::DecodeError;
use thiserror::Error;

/// Failures of an outbound call to the billing provider.
#[derive(Debug, Error)]
pub enum BillingError {
    #[error("not found: {0}")]
    NotFound(String),

    #[error("provider temporarily unavailable: {0}")]
    TemporarilyUnavailable(String),

    #[error("request timed out: {0}")]
    Timeout(String),

    #[error("connection failed: {0}")]
    Connection(String),

    #[error("provider responded {status}: {body}")]
    Http { status: u16, body: String },

    #[error("invalid request url: {0}")]
    InvalidUrl(String),

    #[error("malformed provider response: {0}")]
    Decode(#[from] DecodeError),
}

impl From<reqwest::Error> for BillingError {
    fn from(err: reqwest::Error) -> Self {
        if err.is_timeout() {
            BillingError::Timeout(err.to_string())
        } else if err.is_builder() {
            BillingError::InvalidUrl(err.to_string())
        } else if let Some(status) = err.status() {
            BillingError::Http {
                status: status.as_u16(),
                body: err.to_string(),
            }
        } else {
            // connect, request and body errors all happen on the wire
            BillingError::Connection(err.to_string())
        }
    }
}

#[async_trait]
pub trait BillingClient: Send + Sync {
    async fn get_transaction(&self, id: &str) -> Result<Transaction, BillingError>;
}

pub mod fault;
pub mod http;
pub mod mock;
pub mod retry;
pub mod retrying;

pub use http::HttpBillingClient;
pub use mock::MockClient;
pub use retry::{RetryEvent, RetryPolicy, TransientErrorDetection};
pub use retrying::RetryingClient;
