use crate::fault;
use crate::retry::RetryPolicy;
use crate::{BillingClient, BillingError};
use async_trait::async_trait;
use rcly_core::models::Transaction;
use std::sync::Arc;

/// Runs every call of the wrapped client through a [`RetryPolicy`], using
/// [`fault::is_transient`] to tell retryable failures from final ones.
#[derive(Clone)]
pub struct RetryingClient {
    inner: Arc<dyn BillingClient>,
    policy: RetryPolicy,
}

impl RetryingClient {
    pub fn new(inner: Arc<dyn BillingClient>, policy: RetryPolicy) -> Arc<Self> {
        Arc::new(Self { inner, policy })
    }
}

#[async_trait]
impl BillingClient for RetryingClient {
    async fn get_transaction(&self, id: &str) -> Result<Transaction, BillingError> {
        self.policy
            .execute(&fault::is_transient, || self.inner.get_transaction(id))
            .await
    }
}
