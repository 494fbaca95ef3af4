use chrono::{DateTime, NaiveDate, Utc};
use rust_decimal::Decimal;
use sqlx::{sqlite::SqliteRow, QueryBuilder, Row};
use uuid::Uuid;

use charterdesk_core::domain::actor::ActorId;
use charterdesk_core::domain::booking::{
    Booking, BookingId, BookingStatus, BookingType, PaymentStatus,
};
use charterdesk_core::domain::quote::{BusType, CustomerId, QuoteRequestId};

use super::{BookingFilter, BookingRepository, RepositoryError};
use crate::DbPool;

pub struct SqlBookingRepository {
    pool: DbPool,
}

impl SqlBookingRepository {
    pub fn new(pool: DbPool) -> Self {
        Self { pool }
    }
}

#[async_trait::async_trait]
impl BookingRepository for SqlBookingRepository {
    async fn find_by_id(&self, id: &BookingId) -> Result<Option<Booking>, RepositoryError> {
        let row = sqlx::query(
            "SELECT
                id,
                quote_id,
                customer_id,
                customer_name,
                customer_email,
                pickup_location,
                dropoff_location,
                departure_date,
                return_date,
                number_of_days,
                bus_type,
                number_of_passengers,
                price_per_day,
                total_price,
                status,
                payment_status,
                booking_type,
                payment_method,
                payment_date,
                invoice_number,
                cancellation_reason,
                cancelled_at,
                cancelled_by,
                admin_notes,
                created_at,
                updated_at
             FROM booking
             WHERE id = ?",
        )
        .bind(id.0.to_string())
        .fetch_optional(&self.pool)
        .await?;

        row.map(booking_from_row).transpose()
    }

    async fn find_by_quote(
        &self,
        quote_id: &QuoteRequestId,
    ) -> Result<Option<Booking>, RepositoryError> {
        let row = sqlx::query(
            "SELECT
                id,
                quote_id,
                customer_id,
                customer_name,
                customer_email,
                pickup_location,
                dropoff_location,
                departure_date,
                return_date,
                number_of_days,
                bus_type,
                number_of_passengers,
                price_per_day,
                total_price,
                status,
                payment_status,
                booking_type,
                payment_method,
                payment_date,
                invoice_number,
                cancellation_reason,
                cancelled_at,
                cancelled_by,
                admin_notes,
                created_at,
                updated_at
             FROM booking
             WHERE quote_id = ?",
        )
        .bind(quote_id.0.to_string())
        .fetch_optional(&self.pool)
        .await?;

        row.map(booking_from_row).transpose()
    }

    async fn list(&self, filter: &BookingFilter) -> Result<Vec<Booking>, RepositoryError> {
        let mut query_builder = QueryBuilder::new(
            "SELECT
                id,
                quote_id,
                customer_id,
                customer_name,
                customer_email,
                pickup_location,
                dropoff_location,
                departure_date,
                return_date,
                number_of_days,
                bus_type,
                number_of_passengers,
                price_per_day,
                total_price,
                status,
                payment_status,
                booking_type,
                payment_method,
                payment_date,
                invoice_number,
                cancellation_reason,
                cancelled_at,
                cancelled_by,
                admin_notes,
                created_at,
                updated_at
             FROM booking",
        );
        query_builder.push(" WHERE 1=1");

        if let Some(status) = filter.status {
            query_builder.push(" AND status = ");
            query_builder.push_bind(status.as_str());
        }
        if let Some(payment_status) = filter.payment_status {
            query_builder.push(" AND payment_status = ");
            query_builder.push_bind(payment_status.as_str());
        }
        if let Some(booking_type) = filter.booking_type {
            query_builder.push(" AND booking_type = ");
            query_builder.push_bind(booking_type.as_str());
        }
        if let Some(departing_from) = filter.departing_from {
            query_builder.push(" AND departure_date >= ");
            query_builder.push_bind(departing_from.to_string());
        }
        if let Some(departing_to) = filter.departing_to {
            query_builder.push(" AND departure_date <= ");
            query_builder.push_bind(departing_to.to_string());
        }

        query_builder.push(" ORDER BY departure_date ASC, created_at ASC");

        let rows = query_builder.build().fetch_all(&self.pool).await?;

        rows.into_iter().map(booking_from_row).collect()
    }

    async fn save(&self, booking: Booking) -> Result<(), RepositoryError> {
        let result = sqlx::query(
            "INSERT INTO booking (
                id,
                quote_id,
                customer_id,
                customer_name,
                customer_email,
                pickup_location,
                dropoff_location,
                departure_date,
                return_date,
                number_of_days,
                bus_type,
                number_of_passengers,
                price_per_day,
                total_price,
                status,
                payment_status,
                booking_type,
                payment_method,
                payment_date,
                invoice_number,
                cancellation_reason,
                cancelled_at,
                cancelled_by,
                admin_notes,
                created_at,
                updated_at
             ) VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?)
             ON CONFLICT(id) DO UPDATE SET
                quote_id = excluded.quote_id,
                customer_id = excluded.customer_id,
                customer_name = excluded.customer_name,
                customer_email = excluded.customer_email,
                pickup_location = excluded.pickup_location,
                dropoff_location = excluded.dropoff_location,
                departure_date = excluded.departure_date,
                return_date = excluded.return_date,
                number_of_days = excluded.number_of_days,
                bus_type = excluded.bus_type,
                number_of_passengers = excluded.number_of_passengers,
                price_per_day = excluded.price_per_day,
                total_price = excluded.total_price,
                status = excluded.status,
                payment_status = excluded.payment_status,
                booking_type = excluded.booking_type,
                payment_method = excluded.payment_method,
                payment_date = excluded.payment_date,
                invoice_number = excluded.invoice_number,
                cancellation_reason = excluded.cancellation_reason,
                cancelled_at = excluded.cancelled_at,
                cancelled_by = excluded.cancelled_by,
                admin_notes = excluded.admin_notes,
                updated_at = excluded.updated_at",
        )
        .bind(booking.id.0.to_string())
        .bind(booking.quote_id.0.to_string())
        .bind(booking.customer_id.0.to_string())
        .bind(&booking.customer_name)
        .bind(&booking.customer_email)
        .bind(&booking.pickup_location)
        .bind(&booking.dropoff_location)
        .bind(booking.departure_date.to_string())
        .bind(booking.return_date.map(|date| date.to_string()))
        .bind(i64::from(booking.number_of_days))
        .bind(booking.bus_type.as_str())
        .bind(i64::from(booking.number_of_passengers))
        .bind(booking.price_per_day.to_string())
        .bind(booking.total_price.to_string())
        .bind(booking.status.as_str())
        .bind(booking.payment_status.as_str())
        .bind(booking.booking_type.as_str())
        .bind(booking.payment_method.as_deref())
        .bind(booking.payment_date.map(|value| value.to_rfc3339()))
        .bind(booking.invoice_number.as_deref())
        .bind(booking.cancellation_reason.as_deref())
        .bind(booking.cancelled_at.map(|value| value.to_rfc3339()))
        .bind(booking.cancelled_by.map(|actor| actor.0.to_string()))
        .bind(booking.admin_notes.as_deref())
        .bind(booking.created_at.to_rfc3339())
        .bind(booking.updated_at.to_rfc3339())
        .execute(&self.pool)
        .await;

        match result {
            Ok(_) => Ok(()),
            Err(sqlx::Error::Database(error)) if error.is_unique_violation() => {
                Err(RepositoryError::Duplicate(format!(
                    "a booking already exists for quote {}",
                    booking.quote_id.0
                )))
            }
            Err(error) => Err(error.into()),
        }
    }

    async fn delete(&self, id: &BookingId) -> Result<bool, RepositoryError> {
        let result = sqlx::query("DELETE FROM booking WHERE id = ?")
            .bind(id.0.to_string())
            .execute(&self.pool)
            .await?;

        Ok(result.rows_affected() > 0)
    }
}

fn booking_from_row(row: SqliteRow) -> Result<Booking, RepositoryError> {
    let status_raw = row.try_get::<String, _>("status")?;
    let status = BookingStatus::parse(&status_raw)
        .ok_or_else(|| RepositoryError::Decode(format!("unknown booking status `{status_raw}`")))?;

    let payment_status_raw = row.try_get::<String, _>("payment_status")?;
    let payment_status = PaymentStatus::parse(&payment_status_raw).ok_or_else(|| {
        RepositoryError::Decode(format!("unknown payment status `{payment_status_raw}`"))
    })?;

    let booking_type_raw = row.try_get::<String, _>("booking_type")?;
    let booking_type = BookingType::parse(&booking_type_raw).ok_or_else(|| {
        RepositoryError::Decode(format!("unknown booking type `{booking_type_raw}`"))
    })?;

    let bus_type_raw = row.try_get::<String, _>("bus_type")?;
    let bus_type = BusType::parse(&bus_type_raw)
        .ok_or_else(|| RepositoryError::Decode(format!("unknown bus type `{bus_type_raw}`")))?;

    Ok(Booking {
        id: BookingId(parse_uuid("id", row.try_get("id")?)?),
        quote_id: QuoteRequestId(parse_uuid("quote_id", row.try_get("quote_id")?)?),
        customer_id: CustomerId(parse_uuid("customer_id", row.try_get("customer_id")?)?),
        customer_name: row.try_get("customer_name")?,
        customer_email: row.try_get("customer_email")?,
        pickup_location: row.try_get("pickup_location")?,
        dropoff_location: row.try_get("dropoff_location")?,
        departure_date: parse_date("departure_date", row.try_get("departure_date")?)?,
        return_date: parse_optional_date("return_date", row.try_get("return_date")?)?,
        number_of_days: parse_u32("number_of_days", row.try_get("number_of_days")?)?,
        bus_type,
        number_of_passengers: parse_u32(
            "number_of_passengers",
            row.try_get("number_of_passengers")?,
        )?,
        price_per_day: parse_decimal("price_per_day", row.try_get("price_per_day")?)?,
        total_price: parse_decimal("total_price", row.try_get("total_price")?)?,
        status,
        payment_status,
        booking_type,
        payment_method: row.try_get("payment_method")?,
        payment_date: parse_optional_timestamp("payment_date", row.try_get("payment_date")?)?,
        invoice_number: row.try_get("invoice_number")?,
        cancellation_reason: row.try_get("cancellation_reason")?,
        cancelled_at: parse_optional_timestamp("cancelled_at", row.try_get("cancelled_at")?)?,
        cancelled_by: row
            .try_get::<Option<String>, _>("cancelled_by")?
            .map(|value| parse_uuid("cancelled_by", value).map(ActorId))
            .transpose()?,
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

fn parse_optional_date(
    column: &str,
    value: Option<String>,
) -> Result<Option<NaiveDate>, RepositoryError> {
    value.map(|date| parse_date(column, date)).transpose()
}

fn parse_decimal(column: &str, value: String) -> Result<Decimal, RepositoryError> {
    value.parse::<Decimal>().map_err(|error| {
        RepositoryError::Decode(format!("invalid amount in `{column}`: `{value}` ({error})"))
    })
}

fn parse_timestamp(column: &str, value: String) -> Result<DateTime<Utc>, RepositoryError> {
    DateTime::parse_from_rfc3339(&value).map(|timestamp| timestamp.with_timezone(&Utc)).map_err(
        |error| {
            RepositoryError::Decode(format!("invalid timestamp in `{column}`: `{value}` ({error})"))
        },
    )
}

fn parse_optional_timestamp(
    column: &str,
    value: Option<String>,
) -> Result<Option<DateTime<Utc>>, RepositoryError> {
    value.map(|timestamp| parse_timestamp(column, timestamp)).transpose()
}

#[cfg(test)]
mod tests {
    use chrono::{DateTime, NaiveDate, Utc};
    use rust_decimal::Decimal;
    use uuid::Uuid;

    use charterdesk_core::domain::actor::ActorId;
    use charterdesk_core::domain::booking::{
        Booking, BookingId, BookingStatus, BookingType, PaymentStatus,
    };
    use charterdesk_core::domain::quote::{BusType, CustomerId, QuoteRequestId};

    use super::SqlBookingRepository;
    use crate::migrations;
    use crate::repositories::{BookingFilter, BookingRepository, RepositoryError};
    use crate::{connect_with_settings, DbPool};

    #[tokio::test]
    async fn sql_booking_repo_round_trips_a_full_record() {
        let pool = setup_pool().await;
        let repo = SqlBookingRepository::new(pool.clone());

        let mut booking = sample_booking("2026-03-16", "2026-01-15T09:00:00Z");
        insert_quote(&pool, &booking.quote_id).await;
        booking.payment_status = PaymentStatus::Paid;
        booking.booking_type = BookingType::Paid;
        booking.payment_method = Some("bank-transfer".to_string());
        booking.payment_date = Some(parse_ts("2026-02-01T10:00:00Z"));
        booking.invoice_number = Some("INV-2026-0042".to_string());
        booking.cancelled_by = Some(ActorId(Uuid::new_v4()));
        booking.cancellation_reason = Some("customer request".to_string());
        booking.cancelled_at = Some(parse_ts("2026-02-10T10:00:00Z"));

        repo.save(booking.clone()).await.expect("save booking");

        let found = repo.find_by_id(&booking.id).await.expect("find booking");
        assert_eq!(found, Some(booking.clone()));

        let by_quote = repo.find_by_quote(&booking.quote_id).await.expect("find by quote");
        assert_eq!(by_quote, Some(booking));

        pool.close().await;
    }

    #[tokio::test]
    async fn sql_booking_repo_rejects_second_booking_for_same_quote() {
        let pool = setup_pool().await;
        let repo = SqlBookingRepository::new(pool.clone());

        let first = sample_booking("2026-03-16", "2026-01-15T09:00:00Z");
        insert_quote(&pool, &first.quote_id).await;
        repo.save(first.clone()).await.expect("save first booking");

        let mut second = sample_booking("2026-04-20", "2026-01-16T09:00:00Z");
        second.quote_id = first.quote_id;

        let error = repo.save(second).await.expect_err("duplicate quote reference");
        assert!(matches!(error, RepositoryError::Duplicate(_)), "got {error:?}");

        pool.close().await;
    }

    #[tokio::test]
    async fn sql_booking_repo_updates_existing_booking_in_place() {
        let pool = setup_pool().await;
        let repo = SqlBookingRepository::new(pool.clone());

        let mut booking = sample_booking("2026-03-16", "2026-01-15T09:00:00Z");
        insert_quote(&pool, &booking.quote_id).await;
        repo.save(booking.clone()).await.expect("save booking");

        booking.status = BookingStatus::Cancelled;
        booking.cancellation_reason = Some("trip postponed".to_string());
        repo.save(booking.clone()).await.expect("update booking");

        let found = repo.find_by_id(&booking.id).await.expect("find booking");
        assert_eq!(found, Some(booking));

        pool.close().await;
    }

    #[tokio::test]
    async fn sql_booking_repo_filters_and_orders_by_departure() {
        let pool = setup_pool().await;
        let repo = SqlBookingRepository::new(pool.clone());

        let mut may = sample_booking("2026-05-10", "2026-01-20T09:00:00Z");
        may.status = BookingStatus::Cancelled;
        let march = sample_booking("2026-03-16", "2026-01-15T09:00:00Z");
        let april = sample_booking("2026-04-02", "2026-01-18T09:00:00Z");

        for booking in [&may, &march, &april] {
            insert_quote(&pool, &booking.quote_id).await;
        }

        repo.save(may.clone()).await.expect("save may");
        repo.save(march.clone()).await.expect("save march");
        repo.save(april.clone()).await.expect("save april");

        let all = repo.list(&BookingFilter::default()).await.expect("list all");
        assert_eq!(
            all.iter().map(|booking| booking.id).collect::<Vec<_>>(),
            vec![march.id, april.id, may.id],
        );

        let confirmed = repo
            .list(&BookingFilter { status: Some(BookingStatus::Confirmed), ..Default::default() })
            .await
            .expect("list confirmed");
        assert_eq!(
            confirmed.iter().map(|booking| booking.id).collect::<Vec<_>>(),
            vec![march.id, april.id],
        );

        let windowed = repo
            .list(&BookingFilter {
                departing_from: Some(date("2026-04-01")),
                departing_to: Some(date("2026-04-30")),
                ..Default::default()
            })
            .await
            .expect("list window");
        assert_eq!(windowed.iter().map(|booking| booking.id).collect::<Vec<_>>(), vec![april.id]);

        pool.close().await;
    }

    #[tokio::test]
    async fn sql_booking_repo_delete_reports_whether_a_row_matched() {
        let pool = setup_pool().await;
        let repo = SqlBookingRepository::new(pool.clone());

        let booking = sample_booking("2026-03-16", "2026-01-15T09:00:00Z");
        insert_quote(&pool, &booking.quote_id).await;
        repo.save(booking.clone()).await.expect("save booking");

        assert!(repo.delete(&booking.id).await.expect("delete existing"));
        assert!(!repo.delete(&booking.id).await.expect("delete missing"));

        pool.close().await;
    }

    async fn setup_pool() -> DbPool {
        let pool =
            connect_with_settings("sqlite::memory:", 1, 30).await.expect("connect test pool");
        migrations::run_pending(&pool).await.expect("run migrations");
        pool
    }

    async fn insert_quote(pool: &DbPool, quote_id: &QuoteRequestId) {
        let timestamp = "2026-01-10T08:00:00Z";

        sqlx::query(
            "INSERT INTO quote_request (
                id, customer_id, customer_name, customer_email, pickup_location,
                dropoff_location, number_of_days, bus_type, number_of_passengers,
                departure_date, status, estimated_price, created_at, updated_at
             ) VALUES (?, ?, 'Maria Santos', 'maria@example.com', 'Manila', 'Baguio',
                       3, '49-seater', 45, '2026-03-16', 'approved', '15000', ?, ?)",
        )
        .bind(quote_id.0.to_string())
        .bind(Uuid::new_v4().to_string())
        .bind(timestamp)
        .bind(timestamp)
        .execute(pool)
        .await
        .expect("insert quote");
    }

    fn sample_booking(departure: &str, created: &str) -> Booking {
        let departure_date = date(departure);
        Booking {
            id: BookingId::new(),
            quote_id: QuoteRequestId::new(),
            customer_id: CustomerId(Uuid::new_v4()),
            customer_name: "Maria Santos".to_string(),
            customer_email: "maria@example.com".to_string(),
            pickup_location: "Manila".to_string(),
            dropoff_location: "Baguio".to_string(),
            departure_date,
            return_date: departure_date.checked_add_days(chrono::Days::new(3)),
            number_of_days: 3,
            bus_type: BusType::FortyNineSeater,
            number_of_passengers: 45,
            price_per_day: Decimal::new(15_000, 0),
            total_price: Decimal::new(45_000, 0),
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
            created_at: parse_ts(created),
            updated_at: parse_ts(created),
        }
    }

    fn date(value: &str) -> NaiveDate {
        value.parse::<NaiveDate>().expect("valid date")
    }

    fn parse_ts(value: &str) -> DateTime<Utc> {
        DateTime::parse_from_rfc3339(value).expect("valid rfc3339").with_timezone(&Utc)
    }
}
