use super::{BillingClient, BillingError};
use async_trait::async_trait;
use chrono::Utc;
use rand::{distributions::Alphanumeric, Rng};
use rcly_core::models::{Transaction, TransactionAction, TransactionStatus};
use std::collections::VecDeque;
use std::sync::atomic::{AtomicU32, Ordering};
use std::sync::{Arc, Mutex};
use tokio::time::{sleep, Duration};

/// Offline stand-in for the provider. Scripted failures are returned first,
/// one per call; after that every call succeeds with a generated transaction.
#[derive(Default)]
pub struct MockClient {
    failures: Mutex<VecDeque<BillingError>>,
    calls: AtomicU32,
    latency: Duration,
}

impl MockClient {
    pub fn new() -> Arc<Self> {
        Arc::new(Self {
            latency: Duration::from_millis(50),
            ..Self::default()
        })
    }

    pub fn failing_with(failures: impl IntoIterator<Item = BillingError>) -> Arc<Self> {
        Arc::new(Self {
            failures: Mutex::new(failures.into_iter().collect()),
            ..Self::default()
        })
    }

    pub fn calls(&self) -> u32 {
        self.calls.load(Ordering::SeqCst)
    }

    fn next_failure(&self) -> Option<BillingError> {
        self.failures.lock().ok().and_then(|mut queue| queue.pop_front())
    }
}

#[async_trait]
impl BillingClient for MockClient {
    async fn get_transaction(&self, id: &str) -> Result<Transaction, BillingError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        if !self.latency.is_zero() {
            // simulate network latency
            let jitter = rand::thread_rng().gen_range(0..=self.latency.as_millis() as u64);
            sleep(Duration::from_millis(jitter)).await;
        }
        if let Some(failure) = self.next_failure() {
            return Err(failure);
        }

        let account_code: String = rand::thread_rng()
            .sample_iter(&Alphanumeric)
            .take(12)
            .map(char::from)
            .collect();
        Ok(Transaction {
            id: Some(id.to_string()),
            account_code: Some(account_code.to_lowercase()),
            action: TransactionAction::Purchase,
            date: Some(Utc::now()),
            amount_in_cents: rand::thread_rng().gen_range(100..10_000),
            currency: Some("USD".to_string()),
            status: TransactionStatus::Success,
            reference: Some(uuid::Uuid::new_v4().to_string()),
            source: Some("transaction".to_string()),
            test: true,
            refundable: true,
            ..Transaction::default()
        })
    }
}
