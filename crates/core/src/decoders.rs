//! Entity decoders over a shared [`XmlCursor`].
//!
//! [`Decode::decode`] scans forward to the decoder's own start tag, passing
//! through any enclosing or preceding elements. From there
//! [`Decode::decode_contents`] hands each child element start to
//! [`Decode::field`] until the matching end tag. Children a decoder does not
//! know are skipped together with their subtree.

use crate::error::DecodeError;
use crate::models::{
    Account, FailureType, Invoice, InvoiceState, Plan, Subscription, SubscriptionState,
    Transaction, TransactionAction, TransactionStatus, GENERIC_DECLINED_GATEWAY_CODE,
};
use crate::parsing::{Field, XmlCursor};
use chrono::{DateTime, Utc};
use quick_xml::events::Event;

pub enum Flow<'a> {
    Consumed,
    Ignored(Field<'a>),
}

pub trait Decode: Default {
    /// Local name of the element that encloses the entity.
    const ELEMENT: &'static str;

    fn field<'a>(
        &mut self,
        cursor: &mut XmlCursor<'a>,
        field: Field<'a>,
    ) -> Result<Flow<'a>, DecodeError>;

    /// Decodes one entity from a cursor positioned at or before its start tag
    /// and leaves the cursor just past the matching end tag. Elements that
    /// enclose the entity are descended into, not consumed.
    fn decode(cursor: &mut XmlCursor<'_>) -> Result<Self, DecodeError> {
        let own = Self::ELEMENT.as_bytes();
        loop {
            match cursor.next_event()? {
                Event::Start(start) if start.local_name().as_ref() == own => {
                    return Self::decode_contents(cursor)
                }
                Event::Empty(start) if start.local_name().as_ref() == own => {
                    return Ok(Self::default())
                }
                Event::Eof => return Err(cursor.unexpected_eof(Self::ELEMENT)),
                _ => continue,
            }
        }
    }

    /// Decodes the children of an entity whose start tag was just read.
    fn decode_contents(cursor: &mut XmlCursor<'_>) -> Result<Self, DecodeError> {
        let own = Self::ELEMENT.as_bytes();
        let mut entity = Self::default();
        loop {
            let field = match cursor.next_event()? {
                Event::End(end) if end.local_name().as_ref() == own => return Ok(entity),
                Event::Start(start) => Field::new(start, false),
                Event::Empty(start) => Field::new(start, true),
                Event::Eof => return Err(cursor.unexpected_eof(Self::ELEMENT)),
                _ => continue,
            };
            if let Flow::Ignored(field) = entity.field(cursor, field)? {
                field.skip(cursor)?;
            }
        }
    }
}

impl Decode for Account {
    const ELEMENT: &'static str = "account";

    fn field<'a>(
        &mut self,
        cursor: &mut XmlCursor<'a>,
        field: Field<'a>,
    ) -> Result<Flow<'a>, DecodeError> {
        match field.name() {
            "account_code" => self.account_code = field.text(cursor)?.unwrap_or_default(),
            "username" => self.username = field.text(cursor)?,
            "email" => self.email = field.text(cursor)?,
            "first_name" => self.first_name = field.text(cursor)?,
            "last_name" => self.last_name = field.text(cursor)?,
            "company_name" => self.company_name = field.text(cursor)?,
            _ => return Ok(Flow::Ignored(field)),
        }
        Ok(Flow::Consumed)
    }
}

impl Decode for Plan {
    const ELEMENT: &'static str = "plan";

    fn field<'a>(
        &mut self,
        cursor: &mut XmlCursor<'a>,
        field: Field<'a>,
    ) -> Result<Flow<'a>, DecodeError> {
        match field.name() {
            "plan_code" => self.plan_code = field.text(cursor)?,
            "name" => self.name = field.text(cursor)?,
            "version" => {
                if let Some(version) = field.int(cursor)? {
                    self.version = Some(version);
                }
            }
            _ => return Ok(Flow::Ignored(field)),
        }
        Ok(Flow::Consumed)
    }
}

impl Decode for Subscription {
    const ELEMENT: &'static str = "subscription";

    fn field<'a>(
        &mut self,
        cursor: &mut XmlCursor<'a>,
        field: Field<'a>,
    ) -> Result<Flow<'a>, DecodeError> {
        match field.name() {
            "plan" if !field.is_self_closing() && field.attribute("nil").is_none() => {
                self.plan = Some(Plan::decode_contents(cursor)?);
            }
            "uuid" => self.uuid = field.text(cursor)?,
            "state" => {
                if let Some(raw) = field.text(cursor)? {
                    self.state = SubscriptionState::from_token(&raw);
                }
            }
            "quantity" => {
                if let Some(quantity) = field.int(cursor)? {
                    self.quantity = quantity;
                }
            }
            "total_amount_in_cents" => {
                if let Some(total) = field.int(cursor)? {
                    self.total_amount_in_cents = total;
                }
            }
            "activated_at" => set_timestamp(&mut self.activated_at, field, cursor)?,
            "canceled_at" => set_timestamp(&mut self.canceled_at, field, cursor)?,
            "expires_at" => set_timestamp(&mut self.expires_at, field, cursor)?,
            "current_period_started_at" => {
                set_timestamp(&mut self.current_period_started_at, field, cursor)?
            }
            "current_period_ends_at" => {
                set_timestamp(&mut self.current_period_ends_at, field, cursor)?
            }
            "trial_started_at" => set_timestamp(&mut self.trial_started_at, field, cursor)?,
            "trial_ends_at" => set_timestamp(&mut self.trial_ends_at, field, cursor)?,
            "collection_method" => self.collection_method = field.text(cursor)?,
            _ => return Ok(Flow::Ignored(field)),
        }
        Ok(Flow::Consumed)
    }
}

impl Decode for Invoice {
    const ELEMENT: &'static str = "invoice";

    fn field<'a>(
        &mut self,
        cursor: &mut XmlCursor<'a>,
        field: Field<'a>,
    ) -> Result<Flow<'a>, DecodeError> {
        match field.name() {
            "uuid" => self.uuid = field.text(cursor)?,
            "subscription_id" => self.subscription_id = field.text(cursor)?,
            "state" => {
                if let Some(raw) = field.text(cursor)? {
                    self.state = InvoiceState::from_token(&raw);
                }
            }
            "invoice_number" => {
                if let Some(number) = field.int(cursor)? {
                    self.invoice_number = number;
                }
            }
            "po_number" => self.po_number = field.text(cursor)?,
            "vat_number" => self.vat_number = field.text(cursor)?,
            "total_in_cents" => {
                if let Some(total) = field.int(cursor)? {
                    self.total_in_cents = total;
                }
            }
            "currency" => self.currency = field.text(cursor)?,
            "date" => set_timestamp(&mut self.date, field, cursor)?,
            "closed_at" => set_timestamp(&mut self.closed_at, field, cursor)?,
            "net_terms" => {
                if let Some(terms) = field.int(cursor)? {
                    self.net_terms = Some(terms);
                }
            }
            "collection_method" => self.collection_method = field.text(cursor)?,
            _ => return Ok(Flow::Ignored(field)),
        }
        Ok(Flow::Consumed)
    }
}

impl Decode for Transaction {
    const ELEMENT: &'static str = "transaction";

    fn field<'a>(
        &mut self,
        cursor: &mut XmlCursor<'a>,
        field: Field<'a>,
    ) -> Result<Flow<'a>, DecodeError> {
        match field.name() {
            "id" | "uuid" => self.id = field.text(cursor)?,
            // API resources link the account and invoice by href instead of inlining them.
            "account" => {
                if let Some(code) = field.attribute("href").as_deref().and_then(href_tail) {
                    self.account_code = Some(code);
                }
                field.skip(cursor)?;
            }
            "invoice" => {
                let number = field
                    .attribute("href")
                    .as_deref()
                    .and_then(href_tail)
                    .and_then(|tail| tail.parse().ok());
                if let Some(number) = number {
                    self.invoice_number = number;
                }
                field.skip(cursor)?;
            }
            "invoice_id" => self.invoice_id = field.text(cursor)?,
            "invoice_number" => {
                if let Some(number) = field.int(cursor)? {
                    self.invoice_number = number;
                }
            }
            "subscription_id" => self.subscription_id = field.text(cursor)?,
            "action" => {
                if let Some(raw) = field.text(cursor)? {
                    self.action = TransactionAction::from_token(&raw);
                }
            }
            "date" | "created_at" => set_timestamp(&mut self.date, field, cursor)?,
            "amount_in_cents" => {
                if let Some(amount) = field.int(cursor)? {
                    self.amount_in_cents = amount;
                }
            }
            "tax_in_cents" => {
                if let Some(tax) = field.int(cursor)? {
                    self.tax_in_cents = tax;
                }
            }
            "currency" => self.currency = field.text(cursor)?,
            "status" => {
                if let Some(raw) = field.text(cursor)? {
                    self.status = if raw == "void" {
                        TransactionStatus::Voided
                    } else {
                        TransactionStatus::from_token(&raw)
                    };
                }
            }
            "message" => self.message = field.text(cursor)?,
            "reference" => self.reference = field.text(cursor)?,
            "source" => self.source = field.text(cursor)?,
            "cvv_result" | "ccv_result" => self.cvv_result = field.text(cursor)?,
            "avs_result" => self.avs_result = field.text(cursor)?,
            "avs_result_street" => self.avs_result_street = field.text(cursor)?,
            "avs_result_postal" => self.avs_result_postal = field.text(cursor)?,
            "test" => set_flag(&mut self.test, field, cursor)?,
            "voidable" => set_flag(&mut self.voidable, field, cursor)?,
            "refundable" => set_flag(&mut self.refundable, field, cursor)?,
            "manually_entered" => set_flag(&mut self.manually_entered, field, cursor)?,
            "payment_method" => self.payment_method = field.text(cursor)?,
            "gateway_error_codes" | "gateway_error_code" => {
                if let Some(code) = field.int(cursor)? {
                    self.gateway_error_code = Some(code);
                }
            }
            "failure_type" => {
                if let Some(code) = non_blank(field.text(cursor)?) {
                    match self.failure_type.as_mut() {
                        Some(failure) => failure.failure = code,
                        None => self.failure_type = Some(FailureType::new(code)),
                    }
                }
            }
            "customer_message" => {
                if let Some(message) = non_blank(field.text(cursor)?) {
                    self.failure_type
                        .get_or_insert_with(FailureType::default)
                        .set_customer_message(message);
                }
            }
            "merchant_message" => {
                if let Some(message) = non_blank(field.text(cursor)?) {
                    self.failure_type
                        .get_or_insert_with(FailureType::default)
                        .set_merchant_message(message);
                }
            }
            "error_code" => {
                if let Some(code) = non_blank(field.text(cursor)?) {
                    match self.failure_type.as_mut() {
                        Some(failure) => failure.failure = code,
                        None => self.failure_type = Some(FailureType::new(code)),
                    }
                    // Test gateways report a failure code without a gateway code.
                    if self.gateway_error_code.is_none() {
                        self.gateway_error_code = Some(GENERIC_DECLINED_GATEWAY_CODE);
                    }
                }
            }
            _ => return Ok(Flow::Ignored(field)),
        }
        Ok(Flow::Consumed)
    }
}

fn set_timestamp<'a>(
    slot: &mut Option<DateTime<Utc>>,
    field: Field<'a>,
    cursor: &mut XmlCursor<'a>,
) -> Result<(), DecodeError> {
    if let Some(ts) = field.timestamp(cursor)? {
        *slot = Some(ts);
    }
    Ok(())
}

fn set_flag<'a>(
    slot: &mut bool,
    field: Field<'a>,
    cursor: &mut XmlCursor<'a>,
) -> Result<(), DecodeError> {
    if let Some(value) = field.boolean(cursor)? {
        *slot = value;
    }
    Ok(())
}

fn non_blank(value: Option<String>) -> Option<String> {
    value.filter(|v| !v.trim().is_empty())
}

/// Last path segment of an href, percent-decoded. A trailing slash means
/// the href names a collection, not a resource.
fn href_tail(href: &str) -> Option<String> {
    let tail = href.rsplit('/').next()?;
    if tail.is_empty() {
        return None;
    }
    let decoded = urlencoding::decode_binary(tail.as_bytes());
    Some(String::from_utf8_lossy(&decoded).into_owned())
}

/// Decodes a standalone `<transaction>` document, such as the body of a
/// transaction lookup.
pub fn decode_transaction(payload: &[u8]) -> Result<Transaction, DecodeError> {
    let mut cursor = XmlCursor::new(payload);
    Transaction::decode(&mut cursor)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn decode<T: Decode>(xml: &str) -> T {
        let mut cursor = XmlCursor::new(xml.as_bytes());
        T::decode(&mut cursor).unwrap()
    }

    #[test]
    fn account_fields() {
        let account: Account = decode(
            "<account><account_code>1</account_code><username nil=\"true\"></username>\
             <email>verena@example.com</email><first_name>Verena</first_name>\
             <last_name>Example</last_name><company_name/></account>",
        );
        assert_eq!(account.account_code, "1");
        assert_eq!(account.username, None);
        assert_eq!(account.email.as_deref(), Some("verena@example.com"));
        assert_eq!(account.first_name.as_deref(), Some("Verena"));
        assert_eq!(account.last_name.as_deref(), Some("Example"));
        assert_eq!(account.company_name, None);
    }

    #[test]
    fn subscription_with_nested_plan() {
        let sub: Subscription = decode(
            r#"<subscription>
                 <plan><plan_code>gold</plan_code><name>Gold plan</name><version>2</version></plan>
                 <uuid>8047cb4fd5f874b14d713d785436ebd3</uuid>
                 <state>in_trial</state>
                 <quantity>3</quantity>
                 <total_amount_in_cents>17000</total_amount_in_cents>
                 <activated_at type="datetime">2010-07-22T20:42:05Z</activated_at>
                 <canceled_at type="datetime"></canceled_at>
                 <expires_at nil="nil"></expires_at>
                 <current_period_started_at type="datetime">2010-09-22T20:42:05Z</current_period_started_at>
                 <current_period_ends_at type="datetime">2010-10-22T20:42:05Z</current_period_ends_at>
                 <trial_started_at type="datetime">2010-09-22T20:42:05Z</trial_started_at>
                 <trial_ends_at type="datetime">not a date</trial_ends_at>
                 <collection_method>automatic</collection_method>
               </subscription>"#,
        );
        let plan = sub.plan.as_ref().unwrap();
        assert_eq!(plan.plan_code.as_deref(), Some("gold"));
        assert_eq!(plan.name.as_deref(), Some("Gold plan"));
        assert_eq!(plan.version, Some(2));
        assert_eq!(sub.uuid.as_deref(), Some("8047cb4fd5f874b14d713d785436ebd3"));
        assert_eq!(sub.state, SubscriptionState::InTrial);
        assert_eq!(sub.quantity, 3);
        assert_eq!(sub.total_amount_in_cents, 17000);
        assert!(sub.activated_at.is_some());
        assert!(sub.canceled_at.is_none());
        assert!(sub.expires_at.is_none());
        assert!(sub.current_period_ends_at.is_some());
        assert!(sub.trial_started_at.is_some());
        assert!(sub.trial_ends_at.is_none());
        assert_eq!(sub.collection_method.as_deref(), Some("automatic"));
    }

    #[test]
    fn plan_name_does_not_leak_from_unknown_children() {
        let sub: Subscription = decode(
            "<subscription><plan><plan_code>p</plan_code><name>Plan</name></plan>\
             <subscription_add_ons><subscription_add_on><name>Extra</name>\
             <quantity>9</quantity></subscription_add_on></subscription_add_ons>\
             <quantity>1</quantity></subscription>",
        );
        assert_eq!(sub.quantity, 1);
        assert_eq!(sub.plan.unwrap().name.as_deref(), Some("Plan"));
    }

    #[test]
    fn malformed_numbers_keep_defaults() {
        let invoice: Invoice = decode(
            "<invoice><invoice_number>N/A</invoice_number><total_in_cents>abc</total_in_cents>\
             <net_terms>x</net_terms><state>collected</state></invoice>",
        );
        assert_eq!(invoice.invoice_number, 0);
        assert_eq!(invoice.total_in_cents, 0);
        assert_eq!(invoice.net_terms, None);
        assert_eq!(invoice.state, InvoiceState::Collected);
    }

    #[test]
    fn invoice_fields() {
        let invoice: Invoice = decode(
            "<invoice><uuid>ffc64d71d4b5404e93f13aac9c63b007</uuid>\
             <subscription_id>sub-1</subscription_id><state>past_due</state>\
             <invoice_number type=\"integer\">1000</invoice_number><po_number>PO-7</po_number>\
             <vat_number></vat_number><total_in_cents type=\"integer\">1100</total_in_cents>\
             <currency>USD</currency><date type=\"datetime\">2014-01-01T20:21:44Z</date>\
             <closed_at type=\"datetime\" nil=\"true\"></closed_at><net_terms>30</net_terms>\
             <collection_method>manual</collection_method></invoice>",
        );
        assert_eq!(invoice.uuid.as_deref(), Some("ffc64d71d4b5404e93f13aac9c63b007"));
        assert_eq!(invoice.subscription_id.as_deref(), Some("sub-1"));
        assert_eq!(invoice.state, InvoiceState::PastDue);
        assert_eq!(invoice.invoice_number, 1000);
        assert_eq!(invoice.po_number.as_deref(), Some("PO-7"));
        assert_eq!(invoice.vat_number, None);
        assert_eq!(invoice.total_in_cents, 1100);
        assert_eq!(invoice.currency.as_deref(), Some("USD"));
        assert!(invoice.date.is_some());
        assert!(invoice.closed_at.is_none());
        assert_eq!(invoice.net_terms, Some(30));
        assert_eq!(invoice.collection_method.as_deref(), Some("manual"));
    }

    #[test]
    fn void_status_is_voided() {
        let txn: Transaction = decode("<transaction><status>void</status></transaction>");
        assert_eq!(txn.status, TransactionStatus::Voided);
    }

    #[test]
    fn unknown_status_and_action_are_tolerated() {
        let txn: Transaction = decode(
            "<transaction><status>pending_review</status><action>capture</action></transaction>",
        );
        assert_eq!(txn.status, TransactionStatus::Unknown);
        assert_eq!(txn.action, TransactionAction::Unknown);
    }

    #[test]
    fn webhook_transaction_fields() {
        let txn: Transaction = decode(
            r#"<transaction>
                 <id>a5143c1d3a6f4a8287d0e2cc1d4c0427</id>
                 <invoice_id>8fjk3sd7j90s0789k</invoice_id>
                 <invoice_number type="integer">2059</invoice_number>
                 <subscription_id>1974a098jhlkjasdfljkha898326881c</subscription_id>
                 <action>purchase</action>
                 <date type="datetime">2009-11-22T13:10:38Z</date>
                 <amount_in_cents type="integer">1000</amount_in_cents>
                 <status>Declined</status>
                 <message>This transaction has been declined</message>
                 <reference></reference>
                 <source>subscription</source>
                 <cvv_result code=""></cvv_result>
                 <avs_result code="">Street address and postal code match.</avs_result>
                 <avs_result_street></avs_result_street>
                 <avs_result_postal></avs_result_postal>
                 <test type="boolean">true</test>
                 <voidable type="boolean">false</voidable>
                 <refundable type="boolean">maybe</refundable>
                 <manually_entered type="boolean">1</manually_entered>
                 <payment_method>credit_card</payment_method>
                 <gateway_error_codes>27</gateway_error_codes>
                 <failure_type>insufficient_funds</failure_type>
               </transaction>"#,
        );
        assert_eq!(txn.id.as_deref(), Some("a5143c1d3a6f4a8287d0e2cc1d4c0427"));
        assert_eq!(txn.invoice_id.as_deref(), Some("8fjk3sd7j90s0789k"));
        assert_eq!(txn.invoice_number, 2059);
        assert_eq!(txn.action, TransactionAction::Purchase);
        assert!(txn.date.is_some());
        assert_eq!(txn.amount_in_cents, 1000);
        assert_eq!(txn.status, TransactionStatus::Declined);
        assert_eq!(txn.reference, None);
        assert_eq!(txn.source.as_deref(), Some("subscription"));
        assert_eq!(txn.avs_result.as_deref(), Some("Street address and postal code match."));
        assert!(txn.test);
        assert!(!txn.voidable);
        assert!(!txn.refundable);
        assert!(txn.manually_entered);
        assert_eq!(txn.payment_method.as_deref(), Some("credit_card"));
        assert_eq!(txn.gateway_error_code, Some(27));
        let failure = txn.failure_type.unwrap();
        assert_eq!(failure.failure, "insufficient_funds");
        assert!(failure.customer_message().is_some());
    }

    #[test]
    fn error_code_without_gateway_code_defaults_to_declined() {
        let txn: Transaction = decode(
            "<transaction><status>declined</status><error_code>declined</error_code></transaction>",
        );
        assert_eq!(txn.failure_type.as_ref().unwrap().failure, "declined");
        assert_eq!(txn.gateway_error_code, Some(GENERIC_DECLINED_GATEWAY_CODE));
    }

    #[test]
    fn explicit_gateway_code_wins_in_either_order() {
        let before: Transaction = decode(
            "<transaction><gateway_error_code>51</gateway_error_code>\
             <error_code>insufficient_funds</error_code></transaction>",
        );
        let after: Transaction = decode(
            "<transaction><error_code>insufficient_funds</error_code>\
             <gateway_error_code>51</gateway_error_code></transaction>",
        );
        assert_eq!(before.gateway_error_code, Some(51));
        assert_eq!(after.gateway_error_code, Some(51));
    }

    #[test]
    fn message_overrides_create_failure_type() {
        let txn: Transaction = decode(
            "<transaction><customer_message>Try another card</customer_message>\
             <merchant_message>  </merchant_message>\
             <error_code>fraud_gateway</error_code></transaction>",
        );
        let failure = txn.failure_type.unwrap();
        assert_eq!(failure.failure, "fraud_gateway");
        assert_eq!(failure.customer_message(), Some("Try another card"));
        assert!(failure
            .merchant_message()
            .unwrap()
            .contains("IP address known for fraudulent transactions"));
    }

    #[test]
    fn api_transaction_document() {
        let txn = decode_transaction(
            br#"<?xml version="1.0" encoding="UTF-8"?>
<transaction href="https://api.example.com/v2/transactions/abc123" type="credit_card">
  <account href="https://api.example.com/v2/accounts/acct%2042"/>
  <invoice href="https://api.example.com/v2/invoices/1108"/>
  <uuid>abc123</uuid>
  <action>refund</action>
  <amount_in_cents type="integer">1000</amount_in_cents>
  <tax_in_cents type="integer">80</tax_in_cents>
  <currency>EUR</currency>
  <status>success</status>
  <ccv_result code="M">Match</ccv_result>
  <created_at type="datetime">2011-04-30T12:00:00Z</created_at>
  <details>
    <account>
      <account_code>shadowed</account_code>
      <billing_info type="credit_card"><first_name>X</first_name></billing_info>
    </account>
  </details>
</transaction>"#,
        )
        .unwrap();
        assert_eq!(txn.id.as_deref(), Some("abc123"));
        assert_eq!(txn.account_code.as_deref(), Some("acct 42"));
        assert_eq!(txn.invoice_number, 1108);
        assert_eq!(txn.action, TransactionAction::Refund);
        assert_eq!(txn.amount_in_cents, 1000);
        assert_eq!(txn.tax_in_cents, 80);
        assert_eq!(txn.currency.as_deref(), Some("EUR"));
        assert_eq!(txn.status, TransactionStatus::Success);
        assert_eq!(txn.cvv_result.as_deref(), Some("Match"));
        assert!(txn.date.is_some());
    }

    #[test]
    fn decoder_stops_at_its_own_end_tag() {
        let xml = b"<root><account><account_code>a</account_code></account>\
                    <invoice><uuid>i</uuid></invoice></root>";
        let mut cursor = XmlCursor::new(xml);
        let account = Account::decode(&mut cursor).unwrap();
        assert_eq!(account.account_code, "a");
        let invoice = Invoice::decode(&mut cursor).unwrap();
        assert_eq!(invoice.uuid.as_deref(), Some("i"));
    }

    #[test]
    fn missing_end_tag_is_structural_error() {
        let mut cursor = XmlCursor::new(b"<invoice><uuid>i</uuid>");
        match Invoice::decode(&mut cursor) {
            Err(DecodeError::UnexpectedEof { element, .. }) => assert_eq!(element, "invoice"),
            other => panic!("unexpected result {other:?}"),
        }
    }

    #[test]
    fn href_tails() {
        assert_eq!(href_tail("https://x/v2/accounts/acct%2042"), Some("acct 42".to_string()));
        assert_eq!(href_tail("https://x/v2/accounts/caf%C3%A9"), Some("café".to_string()));
        assert_eq!(href_tail("https://x/v2/invoices/1108"), Some("1108".to_string()));
        assert_eq!(href_tail("https://x/v2/accounts/"), None);
        assert_eq!(href_tail(""), None);
    }

    #[test]
    fn collection_href_leaves_account_unset() {
        let txn = decode_transaction(
            br#"<transaction><account href="https://api.example.com/v2/accounts/"/><uuid>t</uuid></transaction>"#,
        )
        .unwrap();
        assert_eq!(txn.account_code, None);
        assert_eq!(txn.id.as_deref(), Some("t"));
    }

    #[test]
    fn decoder_descends_through_enclosing_elements() {
        let xml = b"<envelope><meta><sent_at>2020-01-01</sent_at></meta>\
                    <payload><subscription><uuid>s1</uuid>\
                    <plan><plan_code>gold</plan_code></plan></subscription></payload>\
                    <invoice><uuid>i</uuid></invoice></envelope>";
        let mut cursor = XmlCursor::new(xml);
        let subscription = Subscription::decode(&mut cursor).unwrap();
        assert_eq!(subscription.uuid.as_deref(), Some("s1"));
        assert_eq!(subscription.plan.unwrap().plan_code.as_deref(), Some("gold"));
        let invoice = Invoice::decode(&mut cursor).unwrap();
        assert_eq!(invoice.uuid.as_deref(), Some("i"));
    }

    #[test]
    fn self_closing_entity_is_empty() {
        let account: Account = decode("<wrapper><account/></wrapper>");
        assert_eq!(account, Account::default());
    }
}
