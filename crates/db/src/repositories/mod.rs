use async_trait::async_trait;
use chrono::NaiveDate;
use thiserror::Error;

use charterdesk_core::audit::QuotationHistoryEntry;
use charterdesk_core::domain::booking::{Booking, BookingId, BookingStatus, BookingType, PaymentStatus};
use charterdesk_core::domain::quote::{CustomerId, QuoteRequest, QuoteRequestId, QuoteStatus};

pub mod audit;
pub mod booking;
pub mod memory;
pub mod quote;

pub use audit::SqlQuotationHistoryRepository;
pub use booking::SqlBookingRepository;
pub use memory::{
    InMemoryBookingRepository, InMemoryQuotationHistoryRepository, InMemoryQuoteRequestRepository,
};
pub use quote::SqlQuoteRequestRepository;

#[derive(Debug, Error)]
pub enum RepositoryError {
    #[error("database error: {0}")]
    Database(#[from] sqlx::Error),
    #[error("decode error: {0}")]
    Decode(String),
    #[error("duplicate record: {0}")]
    Duplicate(String),
}

/// Optional criteria for booking lists. Empty filter returns everything.
#[derive(Clone, Debug, Default)]
pub struct BookingFilter {
    pub status: Option<BookingStatus>,
    pub payment_status: Option<PaymentStatus>,
    pub booking_type: Option<BookingType>,
    pub departing_from: Option<NaiveDate>,
    pub departing_to: Option<NaiveDate>,
}

#[async_trait]
pub trait QuoteRequestRepository: Send + Sync {
    async fn find_by_id(&self, id: &QuoteRequestId)
        -> Result<Option<QuoteRequest>, RepositoryError>;

    /// Newest requests first.
    async fn list_for_customer(
        &self,
        customer_id: &CustomerId,
    ) -> Result<Vec<QuoteRequest>, RepositoryError>;

    /// Newest requests first, optionally narrowed to one status.
    async fn list(&self, status: Option<QuoteStatus>) -> Result<Vec<QuoteRequest>, RepositoryError>;

    async fn save(&self, quote: QuoteRequest) -> Result<(), RepositoryError>;

    /// Returns `false` when no row matched the id.
    async fn delete(&self, id: &QuoteRequestId) -> Result<bool, RepositoryError>;
}

#[async_trait]
pub trait BookingRepository: Send + Sync {
    async fn find_by_id(&self, id: &BookingId) -> Result<Option<Booking>, RepositoryError>;

    async fn find_by_quote(
        &self,
        quote_id: &QuoteRequestId,
    ) -> Result<Option<Booking>, RepositoryError>;

    /// Soonest departures first.
    async fn list(&self, filter: &BookingFilter) -> Result<Vec<Booking>, RepositoryError>;

    /// Inserting a second booking for the same quote fails with
    /// [`RepositoryError::Duplicate`].
    async fn save(&self, booking: Booking) -> Result<(), RepositoryError>;

    /// Returns `false` when no row matched the id.
    async fn delete(&self, id: &BookingId) -> Result<bool, RepositoryError>;
}

#[async_trait]
pub trait QuotationHistoryRepository: Send + Sync {
    async fn append(&self, entry: QuotationHistoryEntry) -> Result<(), RepositoryError>;

    /// Oldest entries first, so a trail reads top to bottom.
    async fn list_for_quote(
        &self,
        quote_id: &QuoteRequestId,
    ) -> Result<Vec<QuotationHistoryEntry>, RepositoryError>;
}
