//! JSON API over the quote and booking desks.
//!
//! Every response uses the same envelope: `success`, a human-readable
//! `message`, an optional `data` payload and an optional `warning`. Desk
//! errors map onto the envelope with the matching HTTP status; storage
//! errors are logged and surfaced generically.

use std::sync::Arc;

use axum::extract::{FromRequestParts, Path, Query, State};
use axum::http::request::Parts;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::routing::{get, post};
use axum::{Json, Router};
use charterdesk_core::{
    Actor, ActorId, Booking, BookingId, BookingStatus, BookingType, NewQuoteRequest,
    PaymentDetails, PaymentStatus, QuotePatch, QuoteRequest, QuoteRequestId, QuoteStatus, Role,
};
use charterdesk_db::repositories::BookingFilter;
use charterdesk_service::{
    BookingDesk, BookingPatch, CalendarEvent, DeskError, EmailOutcome, QuoteDecision, QuoteDesk,
    SubmitQuotation,
};
use chrono::{NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use tracing::error;
use uuid::Uuid;

const ACTOR_ID_HEADER: &str = "x-actor-id";
const ACTOR_ROLE_HEADER: &str = "x-actor-role";

#[derive(Clone)]
pub struct ApiState {
    quotes: Arc<QuoteDesk>,
    bookings: Arc<BookingDesk>,
}

impl ApiState {
    pub fn new(quotes: Arc<QuoteDesk>, bookings: Arc<BookingDesk>) -> Self {
        Self { quotes, bookings }
    }
}

// ---------------------------------------------------------------------------
// Envelope and error mapping
// ---------------------------------------------------------------------------

#[derive(Debug, Serialize)]
pub struct ApiEnvelope<T> {
    pub success: bool,
    pub message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub data: Option<T>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub warning: Option<String>,
}

impl<T> ApiEnvelope<T> {
    fn ok(message: impl Into<String>, data: T) -> Self {
        Self { success: true, message: message.into(), data: Some(data), warning: None }
    }
}

impl ApiEnvelope<()> {
    fn message_only(message: impl Into<String>) -> Self {
        Self { success: true, message: message.into(), data: None, warning: None }
    }
}

#[derive(Debug)]
pub struct ApiError {
    status: StatusCode,
    message: String,
}

impl ApiError {
    fn bad_request(message: impl Into<String>) -> Self {
        Self { status: StatusCode::BAD_REQUEST, message: message.into() }
    }
}

impl From<DeskError> for ApiError {
    fn from(error: DeskError) -> Self {
        let status = match &error {
            DeskError::Validation(_) => StatusCode::BAD_REQUEST,
            DeskError::NotFound { .. } => StatusCode::NOT_FOUND,
            DeskError::Forbidden(_) => StatusCode::FORBIDDEN,
            DeskError::Conflict(_) => StatusCode::CONFLICT,
            DeskError::Repository(_) => {
                error!(error = %error, "request failed on a storage error");
                return Self {
                    status: StatusCode::INTERNAL_SERVER_ERROR,
                    message: "an internal error occurred; try again later".to_string(),
                };
            }
        };
        Self { status, message: error.to_string() }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let envelope = ApiEnvelope::<()> {
            success: false,
            message: self.message,
            data: None,
            warning: None,
        };
        (self.status, Json(envelope)).into_response()
    }
}

// ---------------------------------------------------------------------------
// Caller identity
// ---------------------------------------------------------------------------

/// The acting caller, resolved upstream and forwarded as trusted headers.
pub struct CallerIdentity(pub Actor);

impl<S> FromRequestParts<S> for CallerIdentity
where
    S: Send + Sync,
{
    type Rejection = ApiError;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        let raw_id = header_value(parts, ACTOR_ID_HEADER)
            .ok_or_else(|| ApiError::bad_request("the x-actor-id header is required"))?;
        let id = Uuid::parse_str(raw_id.trim())
            .map_err(|_| ApiError::bad_request("the x-actor-id header must be a UUID"))?;

        let raw_role = header_value(parts, ACTOR_ROLE_HEADER)
            .ok_or_else(|| ApiError::bad_request("the x-actor-role header is required"))?;
        let role = Role::parse(raw_role).ok_or_else(|| {
            ApiError::bad_request("the x-actor-role header must be `customer` or `admin`")
        })?;

        Ok(CallerIdentity(Actor { id: ActorId(id), role }))
    }
}

fn header_value<'a>(parts: &'a Parts, name: &str) -> Option<&'a str> {
    parts.headers.get(name).and_then(|value| value.to_str().ok())
}

// ---------------------------------------------------------------------------
// Request / response types
// ---------------------------------------------------------------------------

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct QuoteView {
    #[serde(flatten)]
    quote: QuoteRequest,
    reference: String,
}

impl From<QuoteRequest> for QuoteView {
    fn from(quote: QuoteRequest) -> Self {
        let reference = quote.display_code();
        Self { quote, reference }
    }
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct BookingView {
    #[serde(flatten)]
    booking: Booking,
    reference: String,
    is_active: bool,
    days_until_departure: i64,
}

impl From<Booking> for BookingView {
    fn from(booking: Booking) -> Self {
        let today = Utc::now().date_naive();
        let reference = booking.display_code();
        let is_active = booking.is_active();
        let days_until_departure = booking.days_until_departure(today);
        Self { booking, reference, is_active, days_until_departure }
    }
}

/// Payload for a quotation submission, mirroring the desk outcome: the email
/// result travels inside `data` next to the updated quote rather than as an
/// error.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SubmissionData {
    pub quote: QuoteView,
    pub email_sent: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub email_message_id: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub email_error: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateBookingRequest {
    pub quote_id: Uuid,
    pub return_date: Option<NaiveDate>,
}

#[derive(Debug, Deserialize)]
pub struct CancelBookingRequest {
    pub reason: String,
}

#[derive(Debug, Default, Deserialize)]
pub struct QuoteListQuery {
    pub status: Option<QuoteStatus>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BookingListQuery {
    pub status: Option<BookingStatus>,
    pub payment_status: Option<PaymentStatus>,
    pub booking_type: Option<BookingType>,
    pub from: Option<NaiveDate>,
    pub to: Option<NaiveDate>,
}

#[derive(Debug, Default, Deserialize)]
pub struct CalendarQuery {
    pub start: Option<NaiveDate>,
    pub end: Option<NaiveDate>,
}

// ---------------------------------------------------------------------------
// Router
// ---------------------------------------------------------------------------

pub fn router(state: ApiState) -> Router {
    Router::new()
        .route("/quotes", post(create_quote).get(list_my_quotes))
        .route("/quotes/all", get(list_all_quotes))
        .route("/quotes/{id}", get(get_quote).patch(update_quote_pricing).delete(delete_quote))
        .route("/quotes/{id}/submit", post(submit_quotation))
        .route("/quotes/{id}/approve", post(approve_quote))
        .route("/quotes/{id}/reject", post(reject_quote))
        .route("/bookings", get(list_bookings))
        .route("/bookings/from-quotation", post(create_booking))
        .route("/bookings/calendar", get(booking_calendar))
        .route("/bookings/{id}", get(get_booking).patch(update_booking).delete(delete_booking))
        .route("/bookings/{id}/mark-paid", post(mark_booking_paid))
        .route("/bookings/{id}/cancel", post(cancel_booking))
        .with_state(state)
}

// ---------------------------------------------------------------------------
// Quote handlers
// ---------------------------------------------------------------------------

async fn create_quote(
    CallerIdentity(actor): CallerIdentity,
    State(state): State<ApiState>,
    Json(body): Json<NewQuoteRequest>,
) -> Result<(StatusCode, Json<ApiEnvelope<QuoteView>>), ApiError> {
    let quote = state.quotes.create(actor, body).await?;
    Ok((
        StatusCode::CREATED,
        Json(ApiEnvelope::ok("Quote request submitted", QuoteView::from(quote))),
    ))
}

async fn list_my_quotes(
    CallerIdentity(actor): CallerIdentity,
    State(state): State<ApiState>,
) -> Result<Json<ApiEnvelope<Vec<QuoteView>>>, ApiError> {
    let quotes = state.quotes.list_mine(actor).await?;
    let views = quotes.into_iter().map(QuoteView::from).collect();
    Ok(Json(ApiEnvelope::ok("Quote requests retrieved", views)))
}

async fn list_all_quotes(
    CallerIdentity(actor): CallerIdentity,
    State(state): State<ApiState>,
    Query(query): Query<QuoteListQuery>,
) -> Result<Json<ApiEnvelope<Vec<QuoteView>>>, ApiError> {
    let quotes = state.quotes.list_all(actor, query.status).await?;
    let views = quotes.into_iter().map(QuoteView::from).collect();
    Ok(Json(ApiEnvelope::ok("Quote requests retrieved", views)))
}

async fn get_quote(
    Path(id): Path<String>,
    CallerIdentity(actor): CallerIdentity,
    State(state): State<ApiState>,
) -> Result<Json<ApiEnvelope<QuoteView>>, ApiError> {
    let id = parse_quote_id(&id)?;
    let quote = state.quotes.get(id, actor).await?;
    Ok(Json(ApiEnvelope::ok("Quote request retrieved", QuoteView::from(quote))))
}

async fn update_quote_pricing(
    Path(id): Path<String>,
    CallerIdentity(actor): CallerIdentity,
    State(state): State<ApiState>,
    Json(body): Json<QuotePatch>,
) -> Result<Json<ApiEnvelope<QuoteView>>, ApiError> {
    let id = parse_quote_id(&id)?;
    let quote = state.quotes.update_pricing(id, actor, body).await?;
    Ok(Json(ApiEnvelope::ok("Quote request updated", QuoteView::from(quote))))
}

async fn submit_quotation(
    Path(id): Path<String>,
    CallerIdentity(actor): CallerIdentity,
    State(state): State<ApiState>,
    Json(body): Json<SubmitQuotation>,
) -> Result<Json<ApiEnvelope<SubmissionData>>, ApiError> {
    let id = parse_quote_id(&id)?;
    let submission = state.quotes.submit_quotation(id, actor, body, "api").await?;

    let quote = QuoteView::from(submission.quote);
    let envelope = match submission.email {
        EmailOutcome::Delivered { message_id } => ApiEnvelope::ok(
            "Quotation submitted and emailed to the customer",
            SubmissionData {
                quote,
                email_sent: true,
                email_message_id: Some(message_id),
                email_error: None,
            },
        ),
        EmailOutcome::Failed { error } => {
            let mut envelope = ApiEnvelope::ok(
                "Quotation saved but the email delivery failed",
                SubmissionData {
                    quote,
                    email_sent: false,
                    email_message_id: None,
                    email_error: Some(error.clone()),
                },
            );
            envelope.warning =
                Some(format!("The quotation email could not be delivered: {error}"));
            envelope
        }
    };

    Ok(Json(envelope))
}

async fn approve_quote(
    Path(id): Path<String>,
    CallerIdentity(actor): CallerIdentity,
    State(state): State<ApiState>,
) -> Result<Json<ApiEnvelope<QuoteView>>, ApiError> {
    decide_quote(&state, actor, &id, QuoteDecision::Approve, "Quotation approved").await
}

async fn reject_quote(
    Path(id): Path<String>,
    CallerIdentity(actor): CallerIdentity,
    State(state): State<ApiState>,
) -> Result<Json<ApiEnvelope<QuoteView>>, ApiError> {
    decide_quote(&state, actor, &id, QuoteDecision::Reject, "Quotation declined").await
}

async fn decide_quote(
    state: &ApiState,
    actor: Actor,
    raw_id: &str,
    decision: QuoteDecision,
    message: &str,
) -> Result<Json<ApiEnvelope<QuoteView>>, ApiError> {
    let id = parse_quote_id(raw_id)?;
    let quote = state.quotes.decide(id, actor, decision).await?;
    Ok(Json(ApiEnvelope::ok(message, QuoteView::from(quote))))
}

async fn delete_quote(
    Path(id): Path<String>,
    CallerIdentity(actor): CallerIdentity,
    State(state): State<ApiState>,
) -> Result<Json<ApiEnvelope<()>>, ApiError> {
    let id = parse_quote_id(&id)?;
    state.quotes.delete(id, actor).await?;
    Ok(Json(ApiEnvelope::message_only("Quote request deleted")))
}

// ---------------------------------------------------------------------------
// Booking handlers
// ---------------------------------------------------------------------------

async fn create_booking(
    CallerIdentity(actor): CallerIdentity,
    State(state): State<ApiState>,
    Json(body): Json<CreateBookingRequest>,
) -> Result<(StatusCode, Json<ApiEnvelope<BookingView>>), ApiError> {
    let booking = state
        .bookings
        .create_from_quotation(actor, QuoteRequestId(body.quote_id), body.return_date)
        .await?;
    Ok((StatusCode::CREATED, Json(ApiEnvelope::ok("Booking created", BookingView::from(booking)))))
}

async fn list_bookings(
    CallerIdentity(actor): CallerIdentity,
    State(state): State<ApiState>,
    Query(query): Query<BookingListQuery>,
) -> Result<Json<ApiEnvelope<Vec<BookingView>>>, ApiError> {
    let filter = BookingFilter {
        status: query.status,
        payment_status: query.payment_status,
        booking_type: query.booking_type,
        departing_from: query.from,
        departing_to: query.to,
    };
    let bookings = state.bookings.list_all(actor, filter).await?;
    let views = bookings.into_iter().map(BookingView::from).collect();
    Ok(Json(ApiEnvelope::ok("Bookings retrieved", views)))
}

async fn booking_calendar(
    CallerIdentity(actor): CallerIdentity,
    State(state): State<ApiState>,
    Query(query): Query<CalendarQuery>,
) -> Result<Json<ApiEnvelope<Vec<CalendarEvent>>>, ApiError> {
    let events = state.bookings.calendar_events(actor, query.start, query.end).await?;
    Ok(Json(ApiEnvelope::ok("Calendar events retrieved", events)))
}

async fn get_booking(
    Path(id): Path<String>,
    CallerIdentity(_actor): CallerIdentity,
    State(state): State<ApiState>,
) -> Result<Json<ApiEnvelope<BookingView>>, ApiError> {
    let id = parse_booking_id(&id)?;
    let booking = state.bookings.get(id).await?;
    Ok(Json(ApiEnvelope::ok("Booking retrieved", BookingView::from(booking))))
}

async fn update_booking(
    Path(id): Path<String>,
    CallerIdentity(actor): CallerIdentity,
    State(state): State<ApiState>,
    Json(body): Json<BookingPatch>,
) -> Result<Json<ApiEnvelope<BookingView>>, ApiError> {
    let id = parse_booking_id(&id)?;
    let booking = state.bookings.update_status(id, actor, body).await?;
    Ok(Json(ApiEnvelope::ok("Booking updated", BookingView::from(booking))))
}

async fn mark_booking_paid(
    Path(id): Path<String>,
    CallerIdentity(actor): CallerIdentity,
    State(state): State<ApiState>,
    Json(body): Json<PaymentDetails>,
) -> Result<Json<ApiEnvelope<BookingView>>, ApiError> {
    let id = parse_booking_id(&id)?;
    let booking = state.bookings.mark_paid(id, actor, body).await?;
    Ok(Json(ApiEnvelope::ok("Booking marked as paid", BookingView::from(booking))))
}

async fn cancel_booking(
    Path(id): Path<String>,
    CallerIdentity(actor): CallerIdentity,
    State(state): State<ApiState>,
    Json(body): Json<CancelBookingRequest>,
) -> Result<Json<ApiEnvelope<BookingView>>, ApiError> {
    let id = parse_booking_id(&id)?;
    let booking = state.bookings.cancel(id, actor, body.reason).await?;
    Ok(Json(ApiEnvelope::ok("Booking cancelled", BookingView::from(booking))))
}

async fn delete_booking(
    Path(id): Path<String>,
    CallerIdentity(actor): CallerIdentity,
    State(state): State<ApiState>,
) -> Result<Json<ApiEnvelope<()>>, ApiError> {
    let id = parse_booking_id(&id)?;
    state.bookings.delete(id, actor).await?;
    Ok(Json(ApiEnvelope::message_only("Booking deleted")))
}

fn parse_quote_id(raw: &str) -> Result<QuoteRequestId, ApiError> {
    Uuid::parse_str(raw.trim())
        .map(QuoteRequestId)
        .map_err(|_| ApiError::bad_request("quote request id must be a UUID"))
}

fn parse_booking_id(raw: &str) -> Result<BookingId, ApiError> {
    Uuid::parse_str(raw.trim())
        .map(BookingId)
        .map_err(|_| ApiError::bad_request("booking id must be a UUID"))
}
