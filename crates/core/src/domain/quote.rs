use chrono::{DateTime, NaiveDate, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::errors::DomainError;

pub const MAX_SPECIAL_REQUESTS_LEN: usize = 500;

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct QuoteRequestId(pub Uuid);

impl QuoteRequestId {
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }

    /// Short human-facing reference printed on quotations: `QR-` plus the
    /// last eight hex digits of the id, uppercased.
    pub fn display_code(&self) -> String {
        let hex = self.0.simple().to_string();
        format!("QR-{}", hex[hex.len() - 8..].to_ascii_uppercase())
    }
}

impl Default for QuoteRequestId {
    fn default() -> Self {
        Self::new()
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct CustomerId(pub Uuid);

/// Fixed seating classes offered by the charter fleet. Capacity bounds the
/// passenger count on every quote and booking.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum BusType {
    #[serde(rename = "49-seater")]
    FortyNineSeater,
    #[serde(rename = "60-seater")]
    SixtySeater,
}

impl BusType {
    pub fn capacity(&self) -> u32 {
        match self {
            Self::FortyNineSeater => 49,
            Self::SixtySeater => 60,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::FortyNineSeater => "49-seater",
            Self::SixtySeater => "60-seater",
        }
    }

    pub fn parse(raw: &str) -> Option<Self> {
        match raw.trim() {
            "49-seater" => Some(Self::FortyNineSeater),
            "60-seater" => Some(Self::SixtySeater),
            _ => None,
        }
    }
}

impl std::fmt::Display for BusType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum QuoteStatus {
    Pending,
    Quoted,
    Approved,
    Rejected,
}

impl QuoteStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Pending => "pending",
            Self::Quoted => "quoted",
            Self::Approved => "approved",
            Self::Rejected => "rejected",
        }
    }

    pub fn parse(raw: &str) -> Option<Self> {
        match raw.trim().to_ascii_lowercase().as_str() {
            "pending" => Some(Self::Pending),
            "quoted" => Some(Self::Quoted),
            "approved" => Some(Self::Approved),
            "rejected" => Some(Self::Rejected),
            _ => None,
        }
    }
}

/// Admin-side partial update. Only supplied fields change.
#[derive(Clone, Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct QuotePatch {
    pub status: Option<QuoteStatus>,
    pub estimated_price: Option<Decimal>,
    pub admin_notes: Option<String>,
}

/// Input captured from the requester before any id or status exists.
#[derive(Clone, Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NewQuoteRequest {
    pub customer_name: String,
    pub customer_email: String,
    pub pickup_location: String,
    pub dropoff_location: String,
    pub number_of_days: u32,
    pub bus_type: BusType,
    pub number_of_passengers: u32,
    pub departure_date: NaiveDate,
    pub special_requests: Option<String>,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct QuoteRequest {
    pub id: QuoteRequestId,
    pub customer_id: CustomerId,
    pub customer_name: String,
    pub customer_email: String,
    pub pickup_location: String,
    pub dropoff_location: String,
    pub number_of_days: u32,
    pub bus_type: BusType,
    pub number_of_passengers: u32,
    pub departure_date: NaiveDate,
    pub special_requests: Option<String>,
    pub status: QuoteStatus,
    pub estimated_price: Option<Decimal>,
    pub admin_notes: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl QuoteRequest {
    /// Validating constructor. All business rules on a new request live here,
    /// not in the storage layer: required fields, passenger/capacity bound,
    /// departure not in the past (date-only), special-request length.
    pub fn create(
        customer_id: CustomerId,
        input: NewQuoteRequest,
        today: NaiveDate,
        now: DateTime<Utc>,
    ) -> Result<Self, DomainError> {
        let customer_name = required_text("customerName", &input.customer_name)?;
        let customer_email = required_text("customerEmail", &input.customer_email)?;
        if !customer_email.contains('@') {
            return Err(DomainError::validation("customerEmail must be a valid email address"));
        }
        let pickup_location = required_text("pickupLocation", &input.pickup_location)?;
        let dropoff_location = required_text("dropoffLocation", &input.dropoff_location)?;

        if input.number_of_days < 1 {
            return Err(DomainError::validation("numberOfDays must be at least 1"));
        }
        if input.number_of_passengers < 1 {
            return Err(DomainError::validation("numberOfPassengers must be at least 1"));
        }
        let capacity = input.bus_type.capacity();
        if input.number_of_passengers > capacity {
            return Err(DomainError::validation(format!(
                "numberOfPassengers exceeds the {} capacity of {capacity}",
                input.bus_type
            )));
        }
        if input.departure_date < today {
            return Err(DomainError::validation("departureDate cannot be in the past"));
        }
        let special_requests = match input.special_requests {
            Some(text) => {
                let trimmed = text.trim().to_owned();
                if trimmed.len() > MAX_SPECIAL_REQUESTS_LEN {
                    return Err(DomainError::validation(format!(
                        "specialRequests must be at most {MAX_SPECIAL_REQUESTS_LEN} characters"
                    )));
                }
                (!trimmed.is_empty()).then_some(trimmed)
            }
            None => None,
        };

        Ok(Self {
            id: QuoteRequestId::new(),
            customer_id,
            customer_name,
            customer_email,
            pickup_location,
            dropoff_location,
            number_of_days: input.number_of_days,
            bus_type: input.bus_type,
            number_of_passengers: input.number_of_passengers,
            departure_date: input.departure_date,
            special_requests,
            status: QuoteStatus::Pending,
            estimated_price: None,
            admin_notes: None,
            created_at: now,
            updated_at: now,
        })
    }

    pub fn display_code(&self) -> String {
        self.id.display_code()
    }

    pub fn is_owned_by(&self, actor_id: Uuid) -> bool {
        self.customer_id.0 == actor_id
    }

    /// Legal status moves. Re-quoting an already quoted request is allowed
    /// (the admin revises the price before a decision); approval and
    /// rejection are terminal.
    pub fn can_transition_to(&self, next: QuoteStatus) -> bool {
        matches!(
            (self.status, next),
            (QuoteStatus::Pending, QuoteStatus::Quoted)
                | (QuoteStatus::Pending, QuoteStatus::Rejected)
                | (QuoteStatus::Quoted, QuoteStatus::Quoted)
                | (QuoteStatus::Quoted, QuoteStatus::Approved)
                | (QuoteStatus::Quoted, QuoteStatus::Rejected)
        )
    }

    pub fn transition_to(&mut self, next: QuoteStatus) -> Result<(), DomainError> {
        if !self.can_transition_to(next) {
            return Err(DomainError::InvalidQuoteTransition { from: self.status, to: next });
        }
        if next == QuoteStatus::Approved && self.estimated_price.is_none() {
            return Err(DomainError::validation(
                "cannot approve a quote request without an estimated price",
            ));
        }
        self.status = next;
        Ok(())
    }

    /// Applies a partial update atomically. The price is staged before the
    /// status transition so a patch can price and approve in one call, and
    /// nothing is written back unless every supplied field passes.
    pub fn apply_patch(&mut self, patch: QuotePatch, now: DateTime<Utc>) -> Result<(), DomainError> {
        let mut next = self.clone();
        if let Some(price) = patch.estimated_price {
            if price <= Decimal::ZERO {
                return Err(DomainError::validation("estimatedPrice must be greater than zero"));
            }
            next.estimated_price = Some(price);
        }
        if let Some(status) = patch.status {
            next.transition_to(status)?;
        }
        if let Some(notes) = patch.admin_notes {
            next.admin_notes = Some(notes);
        }
        if next.status == QuoteStatus::Pending && next.estimated_price.is_some() {
            return Err(DomainError::validation(
                "a pending request cannot carry an estimated price",
            ));
        }
        next.updated_at = now;
        *self = next;
        Ok(())
    }

    /// Admin pricing submission: moves to `Quoted`, records the price, and
    /// keeps the existing notes when none are supplied.
    pub fn apply_pricing(
        &mut self,
        estimated_price: Decimal,
        admin_notes: Option<String>,
        now: DateTime<Utc>,
    ) -> Result<(), DomainError> {
        self.apply_patch(
            QuotePatch {
                status: Some(QuoteStatus::Quoted),
                estimated_price: Some(estimated_price),
                admin_notes,
            },
            now,
        )
    }
}

fn required_text(field: &str, value: &str) -> Result<String, DomainError> {
    let trimmed = value.trim();
    if trimmed.is_empty() {
        return Err(DomainError::validation(format!("{field} is required")));
    }
    Ok(trimmed.to_owned())
}
