//! Business operations for the charter desk.
//!
//! Two components own the lifecycle rules: [`QuoteDesk`] moves quote requests
//! through pricing and decision, writing the quotation history and dispatching
//! the quotation email; [`BookingDesk`] freezes approved requests into
//! bookings and tracks payment and cancellation.
//!
//! Both are wired with repository and mailer trait objects, so the same code
//! runs over SQLite in production and over the in-memory doubles in tests.

pub mod bookings;
pub mod error;
pub mod quotes;

pub use bookings::{BookingDesk, BookingPatch, CalendarEvent};
pub use error::DeskError;
pub use quotes::{
    EmailOutcome, QuotationSubmission, QuoteDecision, QuoteDesk, SubmitQuotation,
};
