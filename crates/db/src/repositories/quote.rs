use chrono::{DateTime, NaiveDate, Utc};
use rust_decimal::Decimal;
use sqlx::{sqlite::SqliteRow, Row};
use uuid::Uuid;

use charterdesk_core::domain::quote::{
    BusType, CustomerId, QuoteRequest, QuoteRequestId, QuoteStatus,
};

use super::{QuoteRequestRepository, RepositoryError};
use crate::DbPool;

pub struct SqlQuoteRequestRepository {
    pool: DbPool,
}

impl SqlQuoteRequestRepository {
    pub fn new(pool: DbPool) -> Self {
        Self { pool }
    }
}

#[async_trait::async_trait]
impl QuoteRequestRepository for SqlQuoteRequestRepository {
    async fn find_by_id(
        &self,
        id: &QuoteRequestId,
    ) -> Result<Option<QuoteRequest>, RepositoryError> {
        let row = sqlx::query(
            "SELECT
                id,
                customer_id,
                customer_name,
                customer_email,
                pickup_location,
                dropoff_location,
                number_of_days,
                bus_type,
                number_of_passengers,
                departure_date,
                special_requests,
                status,
                estimated_price,
                admin_notes,
                created_at,
                updated_at
             FROM quote_request
             WHERE id = ?",
        )
        .bind(id.0.to_string())
        .fetch_optional(&self.pool)
        .await?;

        row.map(quote_from_row).transpose()
    }

    async fn list_for_customer(
        &self,
        customer_id: &CustomerId,
    ) -> Result<Vec<QuoteRequest>, RepositoryError> {
        let rows = sqlx::query(
            "SELECT
                id,
                customer_id,
                customer_name,
                customer_email,
                pickup_location,
                dropoff_location,
                number_of_days,
                bus_type,
                number_of_passengers,
                departure_date,
                special_requests,
                status,
                estimated_price,
                admin_notes,
                created_at,
                updated_at
             FROM quote_request
             WHERE customer_id = ?
             ORDER BY created_at DESC, id DESC",
        )
        .bind(customer_id.0.to_string())
        .fetch_all(&self.pool)
        .await?;

        rows.into_iter().map(quote_from_row).collect()
    }

    async fn list(
        &self,
        status: Option<QuoteStatus>,
    ) -> Result<Vec<QuoteRequest>, RepositoryError> {
        let rows = if let Some(status) = status {
            sqlx::query(
                "SELECT
                    id,
                    customer_id,
                    customer_name,
                    customer_email,
                    pickup_location,
                    dropoff_location,
                    number_of_days,
                    bus_type,
                    number_of_passengers,
                    departure_date,
                    special_requests,
                    status,
                    estimated_price,
                    admin_notes,
                    created_at,
                    updated_at
                 FROM quote_request
                 WHERE status = ?
                 ORDER BY created_at DESC, id DESC",
            )
            .bind(status.as_str())
            .fetch_all(&self.pool)
            .await?
        } else {
            sqlx::query(
                "SELECT
                    id,
                    customer_id,
                    customer_name,
                    customer_email,
                    pickup_location,
                    dropoff_location,
                    number_of_days,
                    bus_type,
                    number_of_passengers,
                    departure_date,
                    special_requests,
                    status,
                    estimated_price,
                    admin_notes,
                    created_at,
                    updated_at
                 FROM quote_request
                 ORDER BY created_at DESC, id DESC",
            )
            .fetch_all(&self.pool)
            .await?
        };

        rows.into_iter().map(quote_from_row).collect()
    }

    async fn save(&self, quote: QuoteRequest) -> Result<(), RepositoryError> {
        sqlx::query(
            "INSERT INTO quote_request (
                id,
                customer_id,
                customer_name,
                customer_email,
                pickup_location,
                dropoff_location,
                number_of_days,
                bus_type,
                number_of_passengers,
                departure_date,
                special_requests,
                status,
                estimated_price,
                admin_notes,
                created_at,
                updated_at
             ) VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?)
             ON CONFLICT(id) DO UPDATE SET
                customer_id = excluded.customer_id,
                customer_name = excluded.customer_name,
                customer_email = excluded.customer_email,
                pickup_location = excluded.pickup_location,
                dropoff_location = excluded.dropoff_location,
                number_of_days = excluded.number_of_days,
                bus_type = excluded.bus_type,
                number_of_passengers = excluded.number_of_passengers,
                departure_date = excluded.departure_date,
                special_requests = excluded.special_requests,
                status = excluded.status,
                estimated_price = excluded.estimated_price,
                admin_notes = excluded.admin_notes,
                updated_at = excluded.updated_at",
        )
        .bind(quote.id.0.to_string())
        .bind(quote.customer_id.0.to_string())
        .bind(&quote.customer_name)
        .bind(&quote.customer_email)
        .bind(&quote.pickup_location)
        .bind(&quote.dropoff_location)
        .bind(i64::from(quote.number_of_days))
        .bind(quote.bus_type.as_str())
        .bind(i64::from(quote.number_of_passengers))
        .bind(quote.departure_date.to_string())
        .bind(quote.special_requests.as_deref())
        .bind(quote.status.as_str())
        .bind(quote.estimated_price.map(|price| price.to_string()))
        .bind(quote.admin_notes.as_deref())
        .bind(quote.created_at.to_rfc3339())
        .bind(quote.updated_at.to_rfc3339())
        .execute(&self.pool)
        .await?;

        Ok(())
    }

    async fn delete(&self, id: &QuoteRequestId) -> Result<bool, RepositoryError> {
        let result = sqlx::query("DELETE FROM quote_request WHERE id = ?")
            .bind(id.0.to_string())
            .execute(&self.pool)
            .await?;

        Ok(result.rows_affected() > 0)
    }
}

fn quote_from_row(row: SqliteRow) -> Result<QuoteRequest, RepositoryError> {
    let status_raw = row.try_get::<String, _>("status")?;
    let status = QuoteStatus::parse(&status_raw)
        .ok_or_else(|| RepositoryError::Decode(format!("unknown quote status `{status_raw}`")))?;

    let bus_type_raw = row.try_get::<String, _>("bus_type")?;
    let bus_type = BusType::parse(&bus_type_raw)
        .ok_or_else(|| RepositoryError::Decode(format!("unknown bus type `{bus_type_raw}`")))?;

    Ok(QuoteRequest {
        id: QuoteRequestId(parse_uuid("id", row.try_get("id")?)?),
        customer_id: CustomerId(parse_uuid("customer_id", row.try_get("customer_id")?)?),
        customer_name: row.try_get("customer_name")?,
        customer_email: row.try_get("customer_email")?,
        pickup_location: row.try_get("pickup_location")?,
        dropoff_location: row.try_get("dropoff_location")?,
        number_of_days: parse_u32("number_of_days", row.try_get("number_of_days")?)?,
        bus_type,
        number_of_passengers: parse_u32(
            "number_of_passengers",
            row.try_get("number_of_passengers")?,
        )?,
        departure_date: parse_date("departure_date", row.try_get("departure_date")?)?,
        special_requests: row.try_get("special_requests")?,
        status,
        estimated_price: parse_optional_decimal(
            "estimated_price",
            row.try_get("estimated_price")?,
        )?,
        admin_notes: row.try_get("admin_notes")?,
        created_at: parse_timestamp("created_at", row.try_get("created_at")?)?,
        updated_at: parse_timestamp("updated_at", row.try_get("updated_at")?)?,
    })
}

fn parse_uuid(column: &str, value: String) -> Result<Uuid, RepositoryError> {
    Uuid::parse_str(&value).map_err(|error| {
        RepositoryError::Decode(format!("invalid uuid in `{column}`: `{value}` ({error})"))
    })
}

fn parse_u32(column: &str, value: i64) -> Result<u32, RepositoryError> {
    u32::try_from(value).map_err(|_| {
        RepositoryError::Decode(format!(
            "invalid value for `{column}` (expected non-negative u32): {value}"
        ))
    })
}

fn parse_date(column: &str, value: String) -> Result<NaiveDate, RepositoryError> {
    value.parse::<NaiveDate>().map_err(|error| {
        RepositoryError::Decode(format!("invalid date in `{column}`: `{value}` ({error})"))
    })
}

fn parse_timestamp(column: &str, value: String) -> Result<DateTime<Utc>, RepositoryError> {
    DateTime::parse_from_rfc3339(&value).map(|timestamp| timestamp.with_timezone(&Utc)).map_err(
        |error| {
            RepositoryError::Decode(format!("invalid timestamp in `{column}`: `{value}` ({error})"))
        },
    )
}

fn parse_optional_decimal(
    column: &str,
    value: Option<String>,
) -> Result<Option<Decimal>, RepositoryError> {
    value
        .map(|amount| {
            amount.parse::<Decimal>().map_err(|error| {
                RepositoryError::Decode(format!(
                    "invalid amount in `{column}`: `{amount}` ({error})"
                ))
            })
        })
        .transpose()
}
