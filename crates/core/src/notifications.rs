//! Inbound webhook notifications: the kind table, the decoded envelope and
//! the dispatcher that routes a payload to integrator handlers.

use crate::decoders::Decode;
use crate::error::DecodeError;
use crate::models::{Account, Invoice, Subscription, Transaction};
use crate::parsing::{compute_sha256_hex, local_name, XmlCursor};
use quick_xml::events::{BytesStart, Event};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fmt;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum NotificationKind {
    NewAccount,
    CanceledAccount,
    BillingInfoUpdated,
    ReactivatedAccount,
    NewSubscription,
    UpdatedSubscription,
    CanceledSubscription,
    ExpiredSubscription,
    RenewedSubscription,
    SuccessfulPayment,
    FailedPayment,
    SuccessfulRefund,
    VoidPayment,
    FraudInfoUpdated,
    NewInvoice,
    ClosedInvoice,
    PastDueInvoice,
}

impl NotificationKind {
    pub const ALL: [NotificationKind; 17] = [
        NotificationKind::NewAccount,
        NotificationKind::CanceledAccount,
        NotificationKind::BillingInfoUpdated,
        NotificationKind::ReactivatedAccount,
        NotificationKind::NewSubscription,
        NotificationKind::UpdatedSubscription,
        NotificationKind::CanceledSubscription,
        NotificationKind::ExpiredSubscription,
        NotificationKind::RenewedSubscription,
        NotificationKind::SuccessfulPayment,
        NotificationKind::FailedPayment,
        NotificationKind::SuccessfulRefund,
        NotificationKind::VoidPayment,
        NotificationKind::FraudInfoUpdated,
        NotificationKind::NewInvoice,
        NotificationKind::ClosedInvoice,
        NotificationKind::PastDueInvoice,
    ];

    /// Root element name the provider uses for this kind.
    pub fn element_name(self) -> &'static str {
        match self {
            NotificationKind::NewAccount => "new_account_notification",
            NotificationKind::CanceledAccount => "canceled_account_notification",
            NotificationKind::BillingInfoUpdated => "billing_info_updated_notification",
            NotificationKind::ReactivatedAccount => "reactivated_account_notification",
            NotificationKind::NewSubscription => "new_subscription_notification",
            NotificationKind::UpdatedSubscription => "updated_subscription_notification",
            NotificationKind::CanceledSubscription => "canceled_subscription_notification",
            NotificationKind::ExpiredSubscription => "expired_subscription_notification",
            NotificationKind::RenewedSubscription => "renewed_subscription_notification",
            NotificationKind::SuccessfulPayment => "successful_payment_notification",
            NotificationKind::FailedPayment => "failed_payment_notification",
            NotificationKind::SuccessfulRefund => "successful_refund_notification",
            NotificationKind::VoidPayment => "void_payment_notification",
            NotificationKind::FraudInfoUpdated => "fraud_info_updated_notification",
            NotificationKind::NewInvoice => "new_invoice_notification",
            NotificationKind::ClosedInvoice => "closed_invoice_notification",
            NotificationKind::PastDueInvoice => "past_due_invoice_notification",
        }
    }

    pub fn from_element(name: &str) -> Option<Self> {
        Self::ALL
            .into_iter()
            .find(|kind| kind.element_name() == name)
    }
}

impl fmt::Display for NotificationKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.element_name())
    }
}

/// A decoded notification. Each variant owns the entities its kind carries.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Notification {
    NewAccount { account: Account },
    CanceledAccount { account: Account },
    BillingInfoUpdated { account: Account },
    ReactivatedAccount { account: Account, subscription: Subscription },
    NewSubscription { account: Account, subscription: Subscription },
    UpdatedSubscription { account: Account, subscription: Subscription },
    CanceledSubscription { account: Account, subscription: Subscription },
    ExpiredSubscription { account: Account, subscription: Subscription },
    RenewedSubscription { account: Account, subscription: Subscription },
    SuccessfulPayment { account: Account, transaction: Transaction },
    FailedPayment { account: Account, transaction: Transaction },
    SuccessfulRefund { account: Account, transaction: Transaction },
    VoidPayment { account: Account, transaction: Transaction },
    FraudInfoUpdated { account: Account, transaction: Transaction },
    NewInvoice { account: Account, invoice: Invoice },
    ClosedInvoice { account: Account, invoice: Invoice },
    PastDueInvoice { account: Account, invoice: Invoice },
}

impl Notification {
    pub fn kind(&self) -> NotificationKind {
        match self {
            Notification::NewAccount { .. } => NotificationKind::NewAccount,
            Notification::CanceledAccount { .. } => NotificationKind::CanceledAccount,
            Notification::BillingInfoUpdated { .. } => NotificationKind::BillingInfoUpdated,
            Notification::ReactivatedAccount { .. } => NotificationKind::ReactivatedAccount,
            Notification::NewSubscription { .. } => NotificationKind::NewSubscription,
            Notification::UpdatedSubscription { .. } => NotificationKind::UpdatedSubscription,
            Notification::CanceledSubscription { .. } => NotificationKind::CanceledSubscription,
            Notification::ExpiredSubscription { .. } => NotificationKind::ExpiredSubscription,
            Notification::RenewedSubscription { .. } => NotificationKind::RenewedSubscription,
            Notification::SuccessfulPayment { .. } => NotificationKind::SuccessfulPayment,
            Notification::FailedPayment { .. } => NotificationKind::FailedPayment,
            Notification::SuccessfulRefund { .. } => NotificationKind::SuccessfulRefund,
            Notification::VoidPayment { .. } => NotificationKind::VoidPayment,
            Notification::FraudInfoUpdated { .. } => NotificationKind::FraudInfoUpdated,
            Notification::NewInvoice { .. } => NotificationKind::NewInvoice,
            Notification::ClosedInvoice { .. } => NotificationKind::ClosedInvoice,
            Notification::PastDueInvoice { .. } => NotificationKind::PastDueInvoice,
        }
    }

    pub fn account(&self) -> &Account {
        match self {
            Notification::NewAccount { account }
            | Notification::CanceledAccount { account }
            | Notification::BillingInfoUpdated { account }
            | Notification::ReactivatedAccount { account, .. }
            | Notification::NewSubscription { account, .. }
            | Notification::UpdatedSubscription { account, .. }
            | Notification::CanceledSubscription { account, .. }
            | Notification::ExpiredSubscription { account, .. }
            | Notification::RenewedSubscription { account, .. }
            | Notification::SuccessfulPayment { account, .. }
            | Notification::FailedPayment { account, .. }
            | Notification::SuccessfulRefund { account, .. }
            | Notification::VoidPayment { account, .. }
            | Notification::FraudInfoUpdated { account, .. }
            | Notification::NewInvoice { account, .. }
            | Notification::ClosedInvoice { account, .. }
            | Notification::PastDueInvoice { account, .. } => account,
        }
    }

    pub fn subscription(&self) -> Option<&Subscription> {
        match self {
            Notification::ReactivatedAccount { subscription, .. }
            | Notification::NewSubscription { subscription, .. }
            | Notification::UpdatedSubscription { subscription, .. }
            | Notification::CanceledSubscription { subscription, .. }
            | Notification::ExpiredSubscription { subscription, .. }
            | Notification::RenewedSubscription { subscription, .. } => Some(subscription),
            _ => None,
        }
    }

    pub fn transaction(&self) -> Option<&Transaction> {
        match self {
            Notification::SuccessfulPayment { transaction, .. }
            | Notification::FailedPayment { transaction, .. }
            | Notification::SuccessfulRefund { transaction, .. }
            | Notification::VoidPayment { transaction, .. }
            | Notification::FraudInfoUpdated { transaction, .. } => Some(transaction),
            _ => None,
        }
    }

    pub fn invoice(&self) -> Option<&Invoice> {
        match self {
            Notification::NewInvoice { invoice, .. }
            | Notification::ClosedInvoice { invoice, .. }
            | Notification::PastDueInvoice { invoice, .. } => Some(invoice),
            _ => None,
        }
    }

    /// Decodes the entities of `kind` from a cursor positioned just inside the
    /// notification's root element.
    fn decode_body(kind: NotificationKind, cursor: &mut XmlCursor<'_>) -> Result<Self, DecodeError> {
        let account = Account::decode(cursor)?;
        let notification = match kind {
            NotificationKind::NewAccount => Notification::NewAccount { account },
            NotificationKind::CanceledAccount => Notification::CanceledAccount { account },
            NotificationKind::BillingInfoUpdated => Notification::BillingInfoUpdated { account },
            NotificationKind::ReactivatedAccount => Notification::ReactivatedAccount {
                account,
                subscription: Subscription::decode(cursor)?,
            },
            NotificationKind::NewSubscription => Notification::NewSubscription {
                account,
                subscription: Subscription::decode(cursor)?,
            },
            NotificationKind::UpdatedSubscription => Notification::UpdatedSubscription {
                account,
                subscription: Subscription::decode(cursor)?,
            },
            NotificationKind::CanceledSubscription => Notification::CanceledSubscription {
                account,
                subscription: Subscription::decode(cursor)?,
            },
            NotificationKind::ExpiredSubscription => Notification::ExpiredSubscription {
                account,
                subscription: Subscription::decode(cursor)?,
            },
            NotificationKind::RenewedSubscription => Notification::RenewedSubscription {
                account,
                subscription: Subscription::decode(cursor)?,
            },
            NotificationKind::SuccessfulPayment => Notification::SuccessfulPayment {
                account,
                transaction: Transaction::decode(cursor)?,
            },
            NotificationKind::FailedPayment => Notification::FailedPayment {
                account,
                transaction: Transaction::decode(cursor)?,
            },
            NotificationKind::SuccessfulRefund => Notification::SuccessfulRefund {
                account,
                transaction: Transaction::decode(cursor)?,
            },
            NotificationKind::VoidPayment => Notification::VoidPayment {
                account,
                transaction: Transaction::decode(cursor)?,
            },
            NotificationKind::FraudInfoUpdated => Notification::FraudInfoUpdated {
                account,
                transaction: Transaction::decode(cursor)?,
            },
            NotificationKind::NewInvoice => Notification::NewInvoice {
                account,
                invoice: Invoice::decode(cursor)?,
            },
            NotificationKind::ClosedInvoice => Notification::ClosedInvoice {
                account,
                invoice: Invoice::decode(cursor)?,
            },
            NotificationKind::PastDueInvoice => Notification::PastDueInvoice {
                account,
                invoice: Invoice::decode(cursor)?,
            },
        };
        Ok(notification)
    }
}

/// Decodes the notification carried by `payload`.
///
/// Only the outermost element is inspected: `Ok(None)` means the payload was
/// empty or its root element is not a known notification kind.
pub fn decode_notification(payload: &[u8]) -> Result<Option<Notification>, DecodeError> {
    let mut cursor = XmlCursor::new(payload);
    loop {
        let root = match cursor.next_event()? {
            Event::Start(start) => start,
            // A self-closing root cannot hold an account.
            Event::Empty(start) => {
                let name = local_name(&start);
                return match NotificationKind::from_element(&name) {
                    Some(_) => Err(cursor.unexpected_eof("account")),
                    None => Ok(unknown_root(&name)),
                };
            }
            Event::Eof => {
                tracing::warn!("notification payload contained no elements");
                return Ok(None);
            }
            _ => continue,
        };
        return match kind_of(&root) {
            Some(kind) => Notification::decode_body(kind, &mut cursor).map(Some),
            None => Ok(unknown_root(&local_name(&root))),
        };
    }
}

fn kind_of(root: &BytesStart<'_>) -> Option<NotificationKind> {
    NotificationKind::from_element(&local_name(root))
}

fn unknown_root(name: &str) -> Option<Notification> {
    tracing::warn!(element = %name, "unknown notification received");
    None
}

type Handler = Box<dyn Fn(&Notification) + Send + Sync>;

/// Routes decoded notifications to per-kind handlers.
///
/// Kinds without a registered handler fall back to a diagnostic trace.
/// A dispatcher holds no per-payload state and can be shared across threads.
#[derive(Default)]
pub struct NotificationDispatcher {
    handlers: HashMap<NotificationKind, Handler>,
}

impl NotificationDispatcher {
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers `handler` for `kind`, replacing any earlier registration.
    pub fn on<F>(mut self, kind: NotificationKind, handler: F) -> Self
    where
        F: Fn(&Notification) + Send + Sync + 'static,
    {
        self.handlers.insert(kind, Box::new(handler));
        self
    }

    /// Registers the same handler for every kind.
    pub fn on_all<F>(mut self, handler: F) -> Self
    where
        F: Fn(&Notification) + Clone + Send + Sync + 'static,
    {
        for kind in NotificationKind::ALL {
            self.handlers.insert(kind, Box::new(handler.clone()));
        }
        self
    }

    /// Decodes `payload` and invokes the handler for its kind exactly once.
    ///
    /// Returns the kind that was handled, or `None` for an unrecognized root.
    pub fn process(&self, payload: &[u8]) -> Result<Option<NotificationKind>, DecodeError> {
        tracing::debug!(
            bytes = payload.len(),
            sha256 = %compute_sha256_hex(payload),
            "notification received"
        );
        tracing::trace!(body = %String::from_utf8_lossy(payload), "notification body");

        let Some(notification) = decode_notification(payload)? else {
            return Ok(None);
        };
        let kind = notification.kind();
        match self.handlers.get(&kind) {
            Some(handler) => handler(&notification),
            None => trace_notification(&notification),
        }
        Ok(Some(kind))
    }
}

/// Default handler: records the notification and its identifiers.
pub fn trace_notification(notification: &Notification) {
    let account = &notification.account().account_code;
    let kind = notification.kind();
    if let Some(subscription) = notification.subscription() {
        tracing::info!(
            %kind,
            account_code = %account,
            subscription = subscription.uuid.as_deref().unwrap_or_default(),
            state = ?subscription.state,
            "notification"
        );
    } else if let Some(transaction) = notification.transaction() {
        tracing::info!(
            %kind,
            account_code = %account,
            transaction = transaction.id.as_deref().unwrap_or_default(),
            status = ?transaction.status,
            amount_in_cents = transaction.amount_in_cents,
            "notification"
        );
    } else if let Some(invoice) = notification.invoice() {
        tracing::info!(
            %kind,
            account_code = %account,
            invoice = invoice.uuid.as_deref().unwrap_or_default(),
            state = ?invoice.state,
            total_in_cents = invoice.total_in_cents,
            "notification"
        );
    } else {
        tracing::info!(%kind, account_code = %account, "notification");
    }
}
