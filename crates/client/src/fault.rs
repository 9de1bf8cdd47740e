//! Decides whether a failed billing call is worth another attempt.

use crate::BillingError;

/// Rules are checked in order and the first one that applies wins.
pub fn is_transient(error: &BillingError) -> bool {
    match error {
        BillingError::NotFound(_) => false,
        BillingError::TemporarilyUnavailable(_) => true,
        other => is_transport_transient(other),
    }
}

/// Generic transport classification: the wire failed or the server asked us
/// to come back later. Anything the provider rejected on its merits is final.
pub fn is_transport_transient(error: &BillingError) -> bool {
    match error {
        BillingError::Timeout(_) | BillingError::Connection(_) => true,
        BillingError::Http { status, .. } => matches!(status, 408 | 429 | 500 | 502 | 503 | 504),
        BillingError::NotFound(_)
        | BillingError::TemporarilyUnavailable(_)
        | BillingError::InvalidUrl(_)
        | BillingError::Decode(_) => false,
    }
}
