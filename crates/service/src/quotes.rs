//! Quote request lifecycle: intake, pricing, decision, and the orchestrated
//! quotation submission.
//!
//! `submit_quotation` is the sequence the rest of the workspace is built
//! around. The price update is the business fact: it is persisted first and
//! never rolled back. The quotation email and the history entries are
//! best-effort side effects recorded after the fact, and a failed send
//! degrades the result instead of failing the operation.

use std::sync::Arc;

use chrono::Utc;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use tracing::{info, warn};

use charterdesk_core::audit::{AuditAction, QuotationHistoryEntry, QuoteSnapshot};
use charterdesk_core::{
    Actor, CustomerId, NewQuoteRequest, QuotePatch, QuoteRequest, QuoteRequestId, QuoteStatus,
};
use charterdesk_db::repositories::{
    BookingRepository, QuotationHistoryRepository, QuoteRequestRepository,
};
use charterdesk_mailer::{QuotationEmail, QuotationMailer};

use crate::error::DeskError;

/// Admin pricing input for `submit_quotation`.
#[derive(Clone, Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SubmitQuotation {
    pub estimated_price: Decimal,
    pub admin_notes: Option<String>,
}

/// Outcome of the email leg of a submission. Failure is data, not an error:
/// the caller always receives the updated quote either way.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum EmailOutcome {
    Delivered { message_id: String },
    Failed { error: String },
}

impl EmailOutcome {
    pub fn delivered(&self) -> bool {
        matches!(self, Self::Delivered { .. })
    }
}

/// What `submit_quotation` hands back: the persisted quote plus how the
/// notification leg went.
#[derive(Clone, Debug)]
pub struct QuotationSubmission {
    pub quote: QuoteRequest,
    pub email: EmailOutcome,
}

/// Customer- or admin-side verdict on a quoted request.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum QuoteDecision {
    Approve,
    Reject,
}

impl QuoteDecision {
    fn target_status(self) -> QuoteStatus {
        match self {
            Self::Approve => QuoteStatus::Approved,
            Self::Reject => QuoteStatus::Rejected,
        }
    }
}

pub struct QuoteDesk {
    quotes: Arc<dyn QuoteRequestRepository>,
    bookings: Arc<dyn BookingRepository>,
    history: Arc<dyn QuotationHistoryRepository>,
    mailer: Arc<dyn QuotationMailer>,
}

impl QuoteDesk {
    pub fn new(
        quotes: Arc<dyn QuoteRequestRepository>,
        bookings: Arc<dyn BookingRepository>,
        history: Arc<dyn QuotationHistoryRepository>,
        mailer: Arc<dyn QuotationMailer>,
    ) -> Self {
        Self { quotes, bookings, history, mailer }
    }

    /// Validates and persists a new request owned by the acting customer.
    pub async fn create(
        &self,
        actor: Actor,
        input: NewQuoteRequest,
    ) -> Result<QuoteRequest, DeskError> {
        let now = Utc::now();
        let quote = QuoteRequest::create(CustomerId(actor.id.0), input, now.date_naive(), now)?;
        self.quotes.save(quote.clone()).await?;

        info!(quote = %quote.display_code(), customer = %quote.customer_id.0, "quote request created");
        Ok(quote)
    }

    /// The requester's own quotes, newest first.
    pub async fn list_mine(&self, actor: Actor) -> Result<Vec<QuoteRequest>, DeskError> {
        Ok(self.quotes.list_for_customer(&CustomerId(actor.id.0)).await?)
    }

    pub async fn get(&self, id: QuoteRequestId, actor: Actor) -> Result<QuoteRequest, DeskError> {
        let quote = self
            .quotes
            .find_by_id(&id)
            .await?
            .ok_or_else(|| DeskError::not_found("Quote request"))?;

        if !actor.is_admin() && !quote.is_owned_by(actor.id.0) {
            return Err(DeskError::forbidden("you do not have access to this quote request"));
        }
        Ok(quote)
    }

    /// Every request in the system, newest first, optionally narrowed to one
    /// status. Admin only.
    pub async fn list_all(
        &self,
        actor: Actor,
        status: Option<QuoteStatus>,
    ) -> Result<Vec<QuoteRequest>, DeskError> {
        require_admin(&actor)?;
        Ok(self.quotes.list(status).await?)
    }

    /// Admin partial update. Only supplied fields change, and nothing is
    /// persisted unless every supplied field passes.
    pub async fn update_pricing(
        &self,
        id: QuoteRequestId,
        actor: Actor,
        patch: QuotePatch,
    ) -> Result<QuoteRequest, DeskError> {
        require_admin(&actor)?;
        let mut quote = self
            .quotes
            .find_by_id(&id)
            .await?
            .ok_or_else(|| DeskError::not_found("Quote request"))?;

        quote.apply_patch(patch, Utc::now())?;
        self.quotes.save(quote.clone()).await?;

        info!(quote = %quote.display_code(), status = quote.status.as_str(), "quote request updated");
        Ok(quote)
    }

    /// Approves or rejects a quoted request. The owning customer and admins
    /// may decide; the transition itself is validated by the state machine.
    pub async fn decide(
        &self,
        id: QuoteRequestId,
        actor: Actor,
        decision: QuoteDecision,
    ) -> Result<QuoteRequest, DeskError> {
        let mut quote = self
            .quotes
            .find_by_id(&id)
            .await?
            .ok_or_else(|| DeskError::not_found("Quote request"))?;

        if !actor.is_admin() && !quote.is_owned_by(actor.id.0) {
            return Err(DeskError::forbidden("you do not have access to this quote request"));
        }

        let previous = QuoteSnapshot::of(&quote);
        quote.apply_patch(
            QuotePatch { status: Some(decision.target_status()), ..QuotePatch::default() },
            Utc::now(),
        )?;
        self.quotes.save(quote.clone()).await?;

        let entry = QuotationHistoryEntry::new(
            quote.id,
            actor.id,
            AuditAction::StatusChanged,
            previous,
            QuoteSnapshot::of(&quote),
        )
        .with_metadata("decision", quote.status.as_str());
        if let Err(error) = self.history.append(entry).await {
            warn!(quote = %quote.display_code(), error = %error, "decision history entry was not recorded");
        }

        info!(quote = %quote.display_code(), status = quote.status.as_str(), "quote request decided");
        Ok(quote)
    }

    /// The orchestrated pricing operation.
    ///
    /// Order matters: validate, load, snapshot, mutate, persist, then record
    /// history and send the email. Everything after the persist is contained;
    /// the updated quote is returned in both email outcomes.
    pub async fn submit_quotation(
        &self,
        id: QuoteRequestId,
        actor: Actor,
        submission: SubmitQuotation,
        origin: &str,
    ) -> Result<QuotationSubmission, DeskError> {
        require_admin(&actor)?;
        if submission.estimated_price <= Decimal::ZERO {
            return Err(DeskError::validation("Please provide a valid estimated price"));
        }

        let mut quote = self
            .quotes
            .find_by_id(&id)
            .await?
            .ok_or_else(|| DeskError::not_found("Quote request"))?;

        let previous = QuoteSnapshot::of(&quote);
        quote.apply_pricing(submission.estimated_price, submission.admin_notes, Utc::now())?;
        self.quotes.save(quote.clone()).await?;
        info!(
            quote = %quote.display_code(),
            price = %submission.estimated_price,
            "quotation price persisted"
        );

        let priced = QuoteSnapshot::of(&quote);
        self.append_history(
            QuotationHistoryEntry::new(
                quote.id,
                actor.id,
                AuditAction::PriceUpdated,
                previous,
                priced.clone(),
            )
            .with_metadata("channel", origin),
            &quote,
        )
        .await;

        let outcome = match self
            .mailer
            .send_quotation(quotation_email(&quote, submission.estimated_price))
            .await
        {
            Ok(receipt) => EmailOutcome::Delivered { message_id: receipt.message_id },
            Err(error) => {
                warn!(quote = %quote.display_code(), error = %error, "quotation email was not delivered");
                EmailOutcome::Failed { error: error.to_string() }
            }
        };

        let mut email_entry = QuotationHistoryEntry::new(
            quote.id,
            actor.id,
            AuditAction::EmailSent,
            priced.clone(),
            priced,
        )
        .with_metadata("channel", origin);
        email_entry = match &outcome {
            EmailOutcome::Delivered { message_id } => email_entry
                .with_metadata("delivered", "true")
                .with_metadata("message_id", message_id),
            EmailOutcome::Failed { error } => {
                email_entry.with_metadata("delivered", "false").with_metadata("error", error)
            }
        };
        self.append_history(email_entry, &quote).await;

        Ok(QuotationSubmission { quote, email: outcome })
    }

    /// Admin hard delete. Refused while a booking still references the quote;
    /// the history trail goes with the quote.
    pub async fn delete(&self, id: QuoteRequestId, actor: Actor) -> Result<(), DeskError> {
        require_admin(&actor)?;
        let quote = self
            .quotes
            .find_by_id(&id)
            .await?
            .ok_or_else(|| DeskError::not_found("Quote request"))?;

        if self.bookings.find_by_quote(&id).await?.is_some() {
            return Err(DeskError::conflict(format!(
                "quote request {} has a booking; delete the booking first",
                quote.display_code()
            )));
        }

        if !self.quotes.delete(&id).await? {
            return Err(DeskError::not_found("Quote request"));
        }
        info!(quote = %quote.display_code(), "quote request deleted");
        Ok(())
    }

    /// History appends never fail the surrounding operation; the persisted
    /// quote is the fact that must survive, the gap is visible in the logs.
    async fn append_history(&self, entry: QuotationHistoryEntry, quote: &QuoteRequest) {
        if let Err(error) = self.history.append(entry).await {
            warn!(quote = %quote.display_code(), error = %error, "history entry was not recorded");
        }
    }
}

fn require_admin(actor: &Actor) -> Result<(), DeskError> {
    if actor.is_admin() {
        Ok(())
    } else {
        Err(DeskError::forbidden("administrator role required"))
    }
}

fn quotation_email(quote: &QuoteRequest, price: Decimal) -> QuotationEmail {
    QuotationEmail {
        to: quote.customer_email.clone(),
        customer_name: quote.customer_name.clone(),
        quote_code: quote.display_code(),
        pickup_location: quote.pickup_location.clone(),
        dropoff_location: quote.dropoff_location.clone(),
        departure_date: quote.departure_date,
        number_of_days: quote.number_of_days,
        bus_type: quote.bus_type,
        number_of_passengers: quote.number_of_passengers,
        estimated_price: price,
        estimated_total: price * Decimal::from(quote.number_of_days),
        admin_notes: quote.admin_notes.clone(),
    }
}
