pub mod audit;
pub mod config;
pub mod domain;
pub mod errors;
pub mod money;

pub use audit::{AuditAction, QuotationHistoryEntry, QuoteSnapshot};
pub use domain::actor::{Actor, ActorId, Role};
pub use domain::booking::{
    Booking, BookingId, BookingStatus, BookingType, PaymentDetails, PaymentStatus,
};
pub use domain::quote::{
    BusType, CustomerId, NewQuoteRequest, QuotePatch, QuoteRequest, QuoteRequestId, QuoteStatus,
};
pub use errors::DomainError;
