use std::collections::BTreeMap;

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::domain::actor::ActorId;
use crate::domain::quote::{QuoteRequest, QuoteRequestId, QuoteStatus};

/// What a history entry records about a quote request. Everything the admin
/// can change through the pricing flow is captured, nothing more.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct QuoteSnapshot {
    pub status: QuoteStatus,
    pub estimated_price: Option<Decimal>,
    pub admin_notes: Option<String>,
}

impl QuoteSnapshot {
    pub fn of(quote: &QuoteRequest) -> Self {
        Self {
            status: quote.status,
            estimated_price: quote.estimated_price,
            admin_notes: quote.admin_notes.clone(),
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AuditAction {
    PriceUpdated,
    EmailSent,
    StatusChanged,
}

impl AuditAction {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::PriceUpdated => "price_updated",
            Self::EmailSent => "email_sent",
            Self::StatusChanged => "status_changed",
        }
    }

    pub fn parse(raw: &str) -> Option<Self> {
        match raw.trim() {
            "price_updated" => Some(Self::PriceUpdated),
            "email_sent" => Some(Self::EmailSent),
            "status_changed" => Some(Self::StatusChanged),
            _ => None,
        }
    }
}

/// One append-only record of a transition attempt on a quote request. The
/// pricing flow writes one entry per attempt, including failed email sends,
/// and nothing ever updates or deletes an entry afterwards.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct QuotationHistoryEntry {
    pub id: Uuid,
    pub quote_id: QuoteRequestId,
    pub actor: ActorId,
    pub action: AuditAction,
    pub previous_state: QuoteSnapshot,
    pub new_state: QuoteSnapshot,
    pub metadata: BTreeMap<String, String>,
    pub recorded_at: DateTime<Utc>,
}

impl QuotationHistoryEntry {
    pub fn new(
        quote_id: QuoteRequestId,
        actor: ActorId,
        action: AuditAction,
        previous_state: QuoteSnapshot,
        new_state: QuoteSnapshot,
    ) -> Self {
        Self {
            id: Uuid::new_v4(),
            quote_id,
            actor,
            action,
            previous_state,
            new_state,
            metadata: BTreeMap::new(),
            recorded_at: Utc::now(),
        }
    }

    pub fn with_metadata(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.metadata.insert(key.into(), value.into());
        self
    }
}
