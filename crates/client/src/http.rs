use super::{BillingClient, BillingError};
use async_trait::async_trait;
use rcly_core::decode_transaction;
use rcly_core::models::Transaction;
use reqwest::header::ACCEPT;
use reqwest::{StatusCode, Url};
use std::sync::Arc;
use std::time::Duration;

const REQUEST_TIMEOUT: Duration = Duration::from_secs(30);

/// Provider REST client. Resources are fetched as XML and decoded with the
/// same entity decoders the webhook path uses.
#[derive(Clone)]
pub struct HttpBillingClient {
    base_url: Url,
    api_key: Option<String>,
    http_client: reqwest::Client,
}

impl HttpBillingClient {
    pub fn new(base_url: &str, api_key: Option<String>) -> Result<Arc<Self>, BillingError> {
        let base_url =
            Url::parse(base_url).map_err(|e| BillingError::InvalidUrl(format!("{base_url}: {e}")))?;
        if base_url.cannot_be_a_base() {
            return Err(BillingError::InvalidUrl(base_url.to_string()));
        }
        let http_client = reqwest::Client::builder()
            .timeout(REQUEST_TIMEOUT)
            .build()?;
        Ok(Arc::new(Self {
            base_url,
            api_key,
            http_client,
        }))
    }

    /// `{base}/transactions/{id}` with `id` percent-encoded as one segment.
    fn transaction_url(&self, id: &str) -> Result<Url, BillingError> {
        let mut url = self.base_url.clone();
        url.path_segments_mut()
            .map_err(|_| BillingError::InvalidUrl(self.base_url.to_string()))?
            .pop_if_empty()
            .push("transactions")
            .push(id);
        Ok(url)
    }
}

#[async_trait]
impl BillingClient for HttpBillingClient {
    async fn get_transaction(&self, id: &str) -> Result<Transaction, BillingError> {
        let url = self.transaction_url(id)?;
        tracing::debug!(%url, "fetching transaction");

        let mut request = self
            .http_client
            .get(url)
            .header(ACCEPT, "application/xml");
        if let Some(key) = &self.api_key {
            request = request.basic_auth(key, None::<&str>);
        }
        let resp = request.send().await?;

        let status = resp.status();
        if !status.is_success() {
            let body = resp.text().await.unwrap_or_default();
            return Err(match status {
                StatusCode::NOT_FOUND => BillingError::NotFound(format!("transaction {id}")),
                StatusCode::SERVICE_UNAVAILABLE => BillingError::TemporarilyUnavailable(body),
                _ => BillingError::Http {
                    status: status.as_u16(),
                    body,
                },
            });
        }

        let body = resp.bytes().await?;
        let transaction = decode_transaction(&body)?;
        tracing::info!(
            transaction = %id,
            status = ?transaction.status,
            amount_in_cents = transaction.amount_in_cents,
            "transaction fetched"
        );
        Ok(transaction)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn transaction_urls() {
        let client = HttpBillingClient::new("https://api.example.com/v2/", None).unwrap();
        assert_eq!(
            client.transaction_url("abc123").unwrap().as_str(),
            "https://api.example.com/v2/transactions/abc123"
        );

        let bare = HttpBillingClient::new("https://api.example.com", None).unwrap();
        assert_eq!(
            bare.transaction_url("a/b c").unwrap().as_str(),
            "https://api.example.com/transactions/a%2Fb%20c"
        );
    }

    #[test]
    fn rejects_unusable_base_urls() {
        assert!(matches!(
            HttpBillingClient::new("not a url", None),
            Err(BillingError::InvalidUrl(_))
        ));
        assert!(matches!(
            HttpBillingClient::new("mailto:billing@example.com", None),
            Err(BillingError::InvalidUrl(_))
        ));
    }
}
