//! Booking lifecycle: freezing approved quotations into bookings and walking
//! them through status changes, payment, cancellation, and the dispatch
//! calendar.

use std::sync::Arc;

use chrono::{NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use tracing::info;

use charterdesk_core::{
    Actor, Booking, BookingId, BookingStatus, PaymentDetails, QuoteRequestId,
};
use charterdesk_db::repositories::{BookingFilter, BookingRepository, QuoteRequestRepository};

use crate::error::DeskError;

/// Back-office partial update. Only supplied fields change.
#[derive(Clone, Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BookingPatch {
    pub status: Option<BookingStatus>,
    pub admin_notes: Option<String>,
}

/// One dispatch-calendar entry. `resource` names the bus class so the
/// calendar can lane trips by vehicle.
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CalendarEvent {
    pub id: BookingId,
    pub title: String,
    pub start: NaiveDate,
    pub end: NaiveDate,
    pub resource: String,
}

pub struct BookingDesk {
    quotes: Arc<dyn QuoteRequestRepository>,
    bookings: Arc<dyn BookingRepository>,
}

impl BookingDesk {
    pub fn new(
        quotes: Arc<dyn QuoteRequestRepository>,
        bookings: Arc<dyn BookingRepository>,
    ) -> Self {
        Self { quotes, bookings }
    }

    /// Freezes an approved quotation into a booking. Exactly one booking may
    /// reference a quote: the existence check catches the common case and the
    /// storage layer's unique constraint backstops the race, both surfacing
    /// as `Conflict`.
    pub async fn create_from_quotation(
        &self,
        actor: Actor,
        quote_id: QuoteRequestId,
        return_date: Option<NaiveDate>,
    ) -> Result<Booking, DeskError> {
        require_admin(&actor)?;
        let quote = self
            .quotes
            .find_by_id(&quote_id)
            .await?
            .ok_or_else(|| DeskError::not_found("Quote request"))?;

        if self.bookings.find_by_quote(&quote_id).await?.is_some() {
            return Err(DeskError::conflict(format!(
                "quote request {} already has a booking",
                quote.display_code()
            )));
        }

        let booking = Booking::from_quotation(&quote, return_date, Utc::now())?;
        self.bookings.save(booking.clone()).await?;

        info!(
            booking = %booking.display_code(),
            quote = %quote.display_code(),
            total = %booking.total_price,
            "booking created from quotation"
        );
        Ok(booking)
    }

    /// All bookings matching the filter, soonest departure first. Admin only.
    pub async fn list_all(
        &self,
        actor: Actor,
        filter: BookingFilter,
    ) -> Result<Vec<Booking>, DeskError> {
        require_admin(&actor)?;
        Ok(self.bookings.list(&filter).await?)
    }

    /// Bookings overlapping the window, shaped for the dispatch calendar.
    pub async fn calendar_events(
        &self,
        actor: Actor,
        start: Option<NaiveDate>,
        end: Option<NaiveDate>,
    ) -> Result<Vec<CalendarEvent>, DeskError> {
        require_admin(&actor)?;
        let (start, end) = match (start, end) {
            (Some(start), Some(end)) => (start, end),
            _ => return Err(DeskError::validation("startDate and endDate are both required")),
        };
        if start > end {
            return Err(DeskError::validation("startDate must not be after endDate"));
        }

        // Filtering on departure alone would drop trips that leave before the
        // window but are still on the road inside it, so the lower bound is
        // checked against the calendar end in memory.
        let filter = BookingFilter { departing_to: Some(end), ..BookingFilter::default() };
        let events = self
            .bookings
            .list(&filter)
            .await?
            .into_iter()
            .filter(|booking| booking.calendar_end() >= start)
            .map(|booking| CalendarEvent {
                id: booking.id,
                title: booking.calendar_title(),
                start: booking.departure_date,
                end: booking.calendar_end(),
                resource: booking.bus_type.to_string(),
            })
            .collect();
        Ok(events)
    }

    pub async fn get(&self, id: BookingId) -> Result<Booking, DeskError> {
        self.bookings.find_by_id(&id).await?.ok_or_else(|| DeskError::not_found("Booking"))
    }

    /// Admin partial update of trip status and notes.
    pub async fn update_status(
        &self,
        id: BookingId,
        actor: Actor,
        patch: BookingPatch,
    ) -> Result<Booking, DeskError> {
        require_admin(&actor)?;
        let mut booking = self.get(id).await?;
        booking.apply_update(patch.status, patch.admin_notes, Utc::now());
        self.bookings.save(booking.clone()).await?;

        info!(booking = %booking.display_code(), status = booking.status.as_str(), "booking updated");
        Ok(booking)
    }

    /// Settles the booking: payment goes to `Paid`, the commercial stage to
    /// `BookingType::Paid`, and the payment date defaults to now.
    pub async fn mark_paid(
        &self,
        id: BookingId,
        actor: Actor,
        details: PaymentDetails,
    ) -> Result<Booking, DeskError> {
        require_admin(&actor)?;
        let mut booking = self.get(id).await?;
        booking.mark_paid(details, Utc::now())?;
        self.bookings.save(booking.clone()).await?;

        info!(booking = %booking.display_code(), invoice = ?booking.invoice_number, "booking marked paid");
        Ok(booking)
    }

    /// Cancels once and records who did it; a second attempt is a `Conflict`
    /// so the original cancellation record survives.
    pub async fn cancel(
        &self,
        id: BookingId,
        actor: Actor,
        reason: String,
    ) -> Result<Booking, DeskError> {
        require_admin(&actor)?;
        let mut booking = self.get(id).await?;
        booking.cancel(actor.id, reason, Utc::now())?;
        self.bookings.save(booking.clone()).await?;

        info!(booking = %booking.display_code(), "booking cancelled");
        Ok(booking)
    }

    /// Admin hard delete.
    pub async fn delete(&self, id: BookingId, actor: Actor) -> Result<(), DeskError> {
        require_admin(&actor)?;
        if !self.bookings.delete(&id).await? {
            return Err(DeskError::not_found("Booking"));
        }
        info!(booking = %id.display_code(), "booking deleted");
        Ok(())
    }
}

fn require_admin(actor: &Actor) -> Result<(), DeskError> {
    if actor.is_admin() {
        Ok(())
    } else {
        Err(DeskError::forbidden("administrator role required"))
    }
}
