//! Outbound email for the quotation workflow.
//!
//! The desk layer talks to a [`QuotationMailer`] trait object so pricing can
//! complete even when the relay is down. [`SmtpMailer`] is the production
//! implementation (lettre over STARTTLS or implicit TLS); [`RecordingMailer`]
//! is the in-process double used by tests.
//!
//! Delivery failures come back as [`DeliveryError`] values. Callers decide
//! what to do with them; nothing in this crate panics or retries.

pub mod recording;
pub mod smtp;
pub mod templates;

use async_trait::async_trait;
use charterdesk_core::BusType;
use chrono::NaiveDate;
use rust_decimal::Decimal;
use serde::Serialize;
use thiserror::Error;

pub use recording::RecordingMailer;
pub use smtp::SmtpMailer;

/// Everything the quotation email needs, captured at send time so the
/// message stays faithful to the quote even if the record changes later.
#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct QuotationEmail {
    pub to: String,
    pub customer_name: String,
    pub quote_code: String,
    pub pickup_location: String,
    pub dropoff_location: String,
    pub departure_date: NaiveDate,
    pub number_of_days: u32,
    pub bus_type: BusType,
    pub number_of_passengers: u32,
    pub estimated_price: Decimal,
    pub estimated_total: Decimal,
    pub admin_notes: Option<String>,
}

/// Proof of a handed-off message. The id is generated locally so it can be
/// audited even when the relay does not echo one back.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct SendReceipt {
    pub message_id: String,
}

#[derive(Debug, Error)]
pub enum DeliveryError {
    #[error("address `{address}` is not deliverable: {detail}")]
    Address { address: String, detail: String },
    #[error("quotation template failed to render: {0}")]
    Template(String),
    #[error("smtp transport failed: {0}")]
    Transport(String),
}

#[async_trait]
pub trait QuotationMailer: Send + Sync {
    async fn send_quotation(&self, email: QuotationEmail) -> Result<SendReceipt, DeliveryError>;
}
