use crate::catalog;
use crate::parsing::normalize_token;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Account {
    pub account_code: String,
    pub username: Option<String>,
    pub email: Option<String>,
    pub first_name: Option<String>,
    pub last_name: Option<String>,
    pub company_name: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Plan {
    pub plan_code: Option<String>,
    pub name: Option<String>,
    pub version: Option<i32>,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SubscriptionState {
    Active,
    Canceled,
    Expired,
    Future,
    InTrial,
    Live,
    PastDue,
    #[default]
    Unknown,
}

impl SubscriptionState {
    pub fn from_token(raw: &str) -> Self {
        match normalize_token(raw).as_str() {
            "active" => Self::Active,
            "canceled" => Self::Canceled,
            "expired" => Self::Expired,
            "future" => Self::Future,
            "intrial" => Self::InTrial,
            "live" => Self::Live,
            "pastdue" => Self::PastDue,
            _ => Self::Unknown,
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Subscription {
    pub uuid: Option<String>,
    pub plan: Option<Plan>,
    pub state: SubscriptionState,
    pub quantity: i32,
    pub total_amount_in_cents: i64,
    pub activated_at: Option<DateTime<Utc>>,
    pub canceled_at: Option<DateTime<Utc>>,
    pub expires_at: Option<DateTime<Utc>>,
    pub current_period_started_at: Option<DateTime<Utc>>,
    pub current_period_ends_at: Option<DateTime<Utc>>,
    pub trial_started_at: Option<DateTime<Utc>>,
    pub trial_ends_at: Option<DateTime<Utc>>,
    pub collection_method: Option<String>,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum InvoiceState {
    Open,
    Collected,
    Failed,
    PastDue,
    Processing,
    #[default]
    Unknown,
}

impl InvoiceState {
    pub fn from_token(raw: &str) -> Self {
        match normalize_token(raw).as_str() {
            "open" => Self::Open,
            "collected" => Self::Collected,
            "failed" => Self::Failed,
            "pastdue" => Self::PastDue,
            "processing" => Self::Processing,
            _ => Self::Unknown,
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Invoice {
    pub uuid: Option<String>,
    pub subscription_id: Option<String>,
    pub state: InvoiceState,
    pub invoice_number: i32,
    pub po_number: Option<String>,
    pub vat_number: Option<String>,
    pub total_in_cents: i64,
    pub currency: Option<String>,
    pub date: Option<DateTime<Utc>>,
    pub closed_at: Option<DateTime<Utc>>,
    pub net_terms: Option<i32>,
    pub collection_method: Option<String>,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TransactionAction {
    Authorization,
    Purchase,
    Refund,
    Verify,
    #[default]
    Unknown,
}

impl TransactionAction {
    pub fn from_token(raw: &str) -> Self {
        match normalize_token(raw).as_str() {
            "authorization" => Self::Authorization,
            "purchase" => Self::Purchase,
            "refund" => Self::Refund,
            "verify" => Self::Verify,
            _ => Self::Unknown,
        }
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TransactionStatus {
    Success,
    Failed,
    Voided,
    Declined,
    #[default]
    Unknown,
}

impl TransactionStatus {
    pub fn from_token(raw: &str) -> Self {
        match normalize_token(raw).as_str() {
            "success" => Self::Success,
            "failed" => Self::Failed,
            "voided" => Self::Voided,
            "declined" => Self::Declined,
            _ => Self::Unknown,
        }
    }
}

/// Gateway error code assumed when the provider reports a failure code but no
/// gateway code of its own.
pub const GENERIC_DECLINED_GATEWAY_CODE: i32 = 2;

/// Provider failure code with optional per-transaction message overrides.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct FailureType {
    pub failure: String,
    customer_message: Option<String>,
    merchant_message: Option<String>,
}

impl FailureType {
    pub fn new(failure: impl Into<String>) -> Self {
        Self {
            failure: failure.into(),
            ..Self::default()
        }
    }

    /// Override if one was set, otherwise the catalog message for the code.
    pub fn customer_message(&self) -> Option<&str> {
        self.customer_message
            .as_deref()
            .filter(|m| !m.is_empty())
            .or_else(|| catalog::lookup(&self.failure).map(|m| m.customer))
    }

    pub fn merchant_message(&self) -> Option<&str> {
        self.merchant_message
            .as_deref()
            .filter(|m| !m.is_empty())
            .or_else(|| catalog::lookup(&self.failure).map(|m| m.merchant))
    }

    pub fn set_customer_message(&mut self, message: impl Into<String>) {
        self.customer_message = Some(message.into());
    }

    pub fn set_merchant_message(&mut self, message: impl Into<String>) {
        self.merchant_message = Some(message.into());
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Transaction {
    pub id: Option<String>,
    pub account_code: Option<String>,
    pub invoice_id: Option<String>,
    pub invoice_number: i32,
    pub subscription_id: Option<String>,
    pub action: TransactionAction,
    pub date: Option<DateTime<Utc>>,
    pub amount_in_cents: i64,
    pub tax_in_cents: i64,
    pub currency: Option<String>,
    pub status: TransactionStatus,
    pub message: Option<String>,
    pub reference: Option<String>,
    pub source: Option<String>,
    pub cvv_result: Option<String>,
    pub avs_result: Option<String>,
    pub avs_result_street: Option<String>,
    pub avs_result_postal: Option<String>,
    pub test: bool,
    pub voidable: bool,
    pub refundable: bool,
    pub manually_entered: bool,
    pub payment_method: Option<String>,
    pub gateway_error_code: Option<i32>,
    pub failure_type: Option<FailureType>,
}
