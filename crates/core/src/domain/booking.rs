use chrono::{DateTime, Days, NaiveDate, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::domain::actor::ActorId;
use crate::domain::quote::{BusType, CustomerId, QuoteRequest, QuoteRequestId, QuoteStatus};
use crate::errors::DomainError;

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct BookingId(pub Uuid);

impl BookingId {
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }

    pub fn display_code(&self) -> String {
        let hex = self.0.simple().to_string();
        format!("BK-{}", hex[hex.len() - 8..].to_ascii_uppercase())
    }
}

impl Default for BookingId {
    fn default() -> Self {
        Self::new()
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum BookingStatus {
    Confirmed,
    InProgress,
    Completed,
    Cancelled,
}

impl BookingStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Confirmed => "confirmed",
            Self::InProgress => "in-progress",
            Self::Completed => "completed",
            Self::Cancelled => "cancelled",
        }
    }

    pub fn parse(raw: &str) -> Option<Self> {
        match raw.trim().to_ascii_lowercase().as_str() {
            "confirmed" => Some(Self::Confirmed),
            "in-progress" => Some(Self::InProgress),
            "completed" => Some(Self::Completed),
            "cancelled" => Some(Self::Cancelled),
            _ => None,
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PaymentStatus {
    Pending,
    Partial,
    Paid,
    Refunded,
}

impl PaymentStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Pending => "pending",
            Self::Partial => "partial",
            Self::Paid => "paid",
            Self::Refunded => "refunded",
        }
    }

    pub fn parse(raw: &str) -> Option<Self> {
        match raw.trim().to_ascii_lowercase().as_str() {
            "pending" => Some(Self::Pending),
            "partial" => Some(Self::Partial),
            "paid" => Some(Self::Paid),
            "refunded" => Some(Self::Refunded),
            _ => None,
        }
    }
}

/// How far along the commercial paper trail the booking is. Distinct from
/// `BookingStatus`, which tracks the trip itself.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum BookingType {
    Quotation,
    Confirmed,
    Paid,
}

impl BookingType {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Quotation => "quotation",
            Self::Confirmed => "confirmed",
            Self::Paid => "paid",
        }
    }

    pub fn parse(raw: &str) -> Option<Self> {
        match raw.trim().to_ascii_lowercase().as_str() {
            "quotation" => Some(Self::Quotation),
            "confirmed" => Some(Self::Confirmed),
            "paid" => Some(Self::Paid),
            _ => None,
        }
    }
}

/// Payment capture supplied when a booking is settled.
#[derive(Clone, Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PaymentDetails {
    pub payment_method: String,
    pub invoice_number: Option<String>,
    pub payment_date: Option<DateTime<Utc>>,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Booking {
    pub id: BookingId,
    pub quote_id: QuoteRequestId,
    pub customer_id: CustomerId,
    pub customer_name: String,
    pub customer_email: String,
    pub pickup_location: String,
    pub dropoff_location: String,
    pub departure_date: NaiveDate,
    pub return_date: Option<NaiveDate>,
    pub number_of_days: u32,
    pub bus_type: BusType,
    pub number_of_passengers: u32,
    pub price_per_day: Decimal,
    pub total_price: Decimal,
    pub status: BookingStatus,
    pub payment_status: PaymentStatus,
    pub booking_type: BookingType,
    pub payment_method: Option<String>,
    pub payment_date: Option<DateTime<Utc>>,
    pub invoice_number: Option<String>,
    pub cancellation_reason: Option<String>,
    pub cancelled_at: Option<DateTime<Utc>>,
    pub cancelled_by: Option<ActorId>,
    pub admin_notes: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Booking {
    /// Freezes an approved quote request into a booking. Trip fields are
    /// copied, never referenced, so later edits to the request do not bleed
    /// into the booking. The return date defaults to the departure date plus
    /// the trip length when the caller does not supply one.
    pub fn from_quotation(
        quote: &QuoteRequest,
        return_date: Option<NaiveDate>,
        now: DateTime<Utc>,
    ) -> Result<Self, DomainError> {
        if quote.status != QuoteStatus::Approved {
            return Err(DomainError::validation(format!(
                "only approved quote requests can become bookings, {} is {}",
                quote.display_code(),
                quote.status.as_str()
            )));
        }
        let price_per_day = quote.estimated_price.ok_or_else(|| {
            DomainError::validation(format!(
                "quote request {} has no estimated price",
                quote.display_code()
            ))
        })?;
        let return_date = match return_date {
            Some(date) => date,
            None => quote
                .departure_date
                .checked_add_days(Days::new(u64::from(quote.number_of_days)))
                .ok_or_else(|| DomainError::validation("returnDate is out of range"))?,
        };

        Ok(Self {
            id: BookingId::new(),
            quote_id: quote.id,
            customer_id: quote.customer_id,
            customer_name: quote.customer_name.clone(),
            customer_email: quote.customer_email.clone(),
            pickup_location: quote.pickup_location.clone(),
            dropoff_location: quote.dropoff_location.clone(),
            departure_date: quote.departure_date,
            return_date: Some(return_date),
            number_of_days: quote.number_of_days,
            bus_type: quote.bus_type,
            number_of_passengers: quote.number_of_passengers,
            price_per_day,
            total_price: price_per_day * Decimal::from(quote.number_of_days),
            status: BookingStatus::Confirmed,
            payment_status: PaymentStatus::Pending,
            booking_type: BookingType::Confirmed,
            payment_method: None,
            payment_date: None,
            invoice_number: None,
            cancellation_reason: None,
            cancelled_at: None,
            cancelled_by: None,
            admin_notes: None,
            created_at: now,
            updated_at: now,
        })
    }

    pub fn display_code(&self) -> String {
        self.id.display_code()
    }

    /// Active bookings occupy a bus on the calendar.
    pub fn is_active(&self) -> bool {
        matches!(self.status, BookingStatus::Confirmed | BookingStatus::InProgress)
    }

    /// Whole-day distance to departure; negative once the trip has left.
    pub fn days_until_departure(&self, today: NaiveDate) -> i64 {
        (self.departure_date - today).num_days()
    }

    pub fn calendar_title(&self) -> String {
        format!("{} - {}", self.customer_name, self.bus_type)
    }

    /// Calendar span end. Bookings recorded without a return date occupy a
    /// single day.
    pub fn calendar_end(&self) -> NaiveDate {
        self.return_date.unwrap_or(self.departure_date)
    }

    pub fn apply_update(
        &mut self,
        status: Option<BookingStatus>,
        admin_notes: Option<String>,
        now: DateTime<Utc>,
    ) {
        if let Some(status) = status {
            self.status = status;
        }
        if let Some(notes) = admin_notes {
            self.admin_notes = Some(notes);
        }
        self.updated_at = now;
    }

    pub fn mark_paid(
        &mut self,
        details: PaymentDetails,
        now: DateTime<Utc>,
    ) -> Result<(), DomainError> {
        let method = details.payment_method.trim();
        if method.is_empty() {
            return Err(DomainError::validation("paymentMethod is required"));
        }
        self.payment_status = PaymentStatus::Paid;
        self.booking_type = BookingType::Paid;
        self.payment_method = Some(method.to_owned());
        self.invoice_number = details.invoice_number;
        self.payment_date = Some(details.payment_date.unwrap_or(now));
        self.updated_at = now;
        Ok(())
    }

    /// Cancels the booking once. A second attempt is rejected rather than
    /// silently absorbed so the original cancellation record stays intact.
    pub fn cancel(
        &mut self,
        cancelled_by: ActorId,
        reason: String,
        now: DateTime<Utc>,
    ) -> Result<(), DomainError> {
        if self.status == BookingStatus::Cancelled {
            return Err(DomainError::AlreadyCancelled { code: self.display_code() });
        }
        let reason = reason.trim().to_owned();
        if reason.is_empty() {
            return Err(DomainError::validation("cancellationReason is required"));
        }
        self.status = BookingStatus::Cancelled;
        self.cancellation_reason = Some(reason);
        self.cancelled_at = Some(now);
        self.cancelled_by = Some(cancelled_by);
        self.updated_at = now;
        Ok(())
    }
}
