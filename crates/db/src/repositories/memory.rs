use std::collections::HashMap;

use tokio::sync::RwLock;
use uuid::Uuid;

use charterdesk_core::audit::QuotationHistoryEntry;
use charterdesk_core::domain::booking::{Booking, BookingId};
use charterdesk_core::domain::quote::{CustomerId, QuoteRequest, QuoteRequestId, QuoteStatus};

use super::{
    BookingFilter, BookingRepository, QuotationHistoryRepository, QuoteRequestRepository,
    RepositoryError,
};

#[derive(Default)]
pub struct InMemoryQuoteRequestRepository {
    quotes: RwLock<HashMap<Uuid, QuoteRequest>>,
}

#[async_trait::async_trait]
impl QuoteRequestRepository for InMemoryQuoteRequestRepository {
    async fn find_by_id(
        &self,
        id: &QuoteRequestId,
    ) -> Result<Option<QuoteRequest>, RepositoryError> {
        let quotes = self.quotes.read().await;
        Ok(quotes.get(&id.0).cloned())
    }

    async fn list_for_customer(
        &self,
        customer_id: &CustomerId,
    ) -> Result<Vec<QuoteRequest>, RepositoryError> {
        let quotes = self.quotes.read().await;
        let mut matched: Vec<QuoteRequest> =
            quotes.values().filter(|quote| quote.customer_id == *customer_id).cloned().collect();
        matched.sort_by(|a, b| b.created_at.cmp(&a.created_at).then(b.id.0.cmp(&a.id.0)));
        Ok(matched)
    }

    async fn list(
        &self,
        status: Option<QuoteStatus>,
    ) -> Result<Vec<QuoteRequest>, RepositoryError> {
        let quotes = self.quotes.read().await;
        let mut matched: Vec<QuoteRequest> = quotes
            .values()
            .filter(|quote| status.map_or(true, |wanted| quote.status == wanted))
            .cloned()
            .collect();
        matched.sort_by(|a, b| b.created_at.cmp(&a.created_at).then(b.id.0.cmp(&a.id.0)));
        Ok(matched)
    }

    async fn save(&self, quote: QuoteRequest) -> Result<(), RepositoryError> {
        let mut quotes = self.quotes.write().await;
        quotes.insert(quote.id.0, quote);
        Ok(())
    }

    async fn delete(&self, id: &QuoteRequestId) -> Result<bool, RepositoryError> {
        let mut quotes = self.quotes.write().await;
        Ok(quotes.remove(&id.0).is_some())
    }
}

#[derive(Default)]
pub struct InMemoryBookingRepository {
    bookings: RwLock<HashMap<Uuid, Booking>>,
}

#[async_trait::async_trait]
impl BookingRepository for InMemoryBookingRepository {
    async fn find_by_id(&self, id: &BookingId) -> Result<Option<Booking>, RepositoryError> {
        let bookings = self.bookings.read().await;
        Ok(bookings.get(&id.0).cloned())
    }

    async fn find_by_quote(
        &self,
        quote_id: &QuoteRequestId,
    ) -> Result<Option<Booking>, RepositoryError> {
        let bookings = self.bookings.read().await;
        Ok(bookings.values().find(|booking| booking.quote_id == *quote_id).cloned())
    }

    async fn list(&self, filter: &BookingFilter) -> Result<Vec<Booking>, RepositoryError> {
        let bookings = self.bookings.read().await;
        let mut matched: Vec<Booking> = bookings
            .values()
            .filter(|booking| {
                filter.status.map_or(true, |wanted| booking.status == wanted)
                    && filter.payment_status.map_or(true, |wanted| booking.payment_status == wanted)
                    && filter.booking_type.map_or(true, |wanted| booking.booking_type == wanted)
                    && filter.departing_from.map_or(true, |from| booking.departure_date >= from)
                    && filter.departing_to.map_or(true, |to| booking.departure_date <= to)
            })
            .cloned()
            .collect();
        matched.sort_by(|a, b| {
            a.departure_date.cmp(&b.departure_date).then(a.created_at.cmp(&b.created_at))
        });
        Ok(matched)
    }

    async fn save(&self, booking: Booking) -> Result<(), RepositoryError> {
        let mut bookings = self.bookings.write().await;
        let conflicting = bookings
            .values()
            .any(|existing| existing.quote_id == booking.quote_id && existing.id != booking.id);
        if conflicting {
            return Err(RepositoryError::Duplicate(format!(
                "a booking already exists for quote {}",
                booking.quote_id.0
            )));
        }
        bookings.insert(booking.id.0, booking);
        Ok(())
    }

    async fn delete(&self, id: &BookingId) -> Result<bool, RepositoryError> {
        let mut bookings = self.bookings.write().await;
        Ok(bookings.remove(&id.0).is_some())
    }
}

#[derive(Default)]
pub struct InMemoryQuotationHistoryRepository {
    entries: RwLock<Vec<QuotationHistoryEntry>>,
}

#[async_trait::async_trait]
impl QuotationHistoryRepository for InMemoryQuotationHistoryRepository {
    async fn append(&self, entry: QuotationHistoryEntry) -> Result<(), RepositoryError> {
        let mut entries = self.entries.write().await;
        entries.push(entry);
        Ok(())
    }

    async fn list_for_quote(
        &self,
        quote_id: &QuoteRequestId,
    ) -> Result<Vec<QuotationHistoryEntry>, RepositoryError> {
        let entries = self.entries.read().await;
        Ok(entries.iter().filter(|entry| entry.quote_id == *quote_id).cloned().collect())
    }
}
