use std::collections::BTreeMap;

use chrono::{DateTime, Utc};
use sqlx::{sqlite::SqliteRow, Row};
use uuid::Uuid;

use charterdesk_core::audit::{AuditAction, QuotationHistoryEntry, QuoteSnapshot};
use charterdesk_core::domain::actor::ActorId;
use charterdesk_core::domain::quote::QuoteRequestId;

use super::{QuotationHistoryRepository, RepositoryError};
use crate::DbPool;

pub struct SqlQuotationHistoryRepository {
    pool: DbPool,
}

impl SqlQuotationHistoryRepository {
    pub fn new(pool: DbPool) -> Self {
        Self { pool }
    }
}

#[async_trait::async_trait]
impl QuotationHistoryRepository for SqlQuotationHistoryRepository {
    async fn append(&self, entry: QuotationHistoryEntry) -> Result<(), RepositoryError> {
        sqlx::query(
            "INSERT INTO quotation_history (
                id,
                quote_id,
                actor,
                action,
                previous_state_json,
                new_state_json,
                metadata_json,
                recorded_at
             ) VALUES (?, ?, ?, ?, ?, ?, ?, ?)",
        )
        .bind(entry.id.to_string())
        .bind(entry.quote_id.0.to_string())
        .bind(entry.actor.0.to_string())
        .bind(entry.action.as_str())
        .bind(encode_json("previous_state", &entry.previous_state)?)
        .bind(encode_json("new_state", &entry.new_state)?)
        .bind(encode_json("metadata", &entry.metadata)?)
        .bind(entry.recorded_at.to_rfc3339())
        .execute(&self.pool)
        .await?;

        Ok(())
    }

    async fn list_for_quote(
        &self,
        quote_id: &QuoteRequestId,
    ) -> Result<Vec<QuotationHistoryEntry>, RepositoryError> {
        // rowid breaks ties so entries written in the same instant keep
        // their insertion order.
        let rows = sqlx::query(
            "SELECT
                id,
                quote_id,
                actor,
                action,
                previous_state_json,
                new_state_json,
                metadata_json,
                recorded_at
             FROM quotation_history
             WHERE quote_id = ?
             ORDER BY recorded_at ASC, rowid ASC",
        )
        .bind(quote_id.0.to_string())
        .fetch_all(&self.pool)
        .await?;

        rows.into_iter().map(entry_from_row).collect()
    }
}

fn entry_from_row(row: SqliteRow) -> Result<QuotationHistoryEntry, RepositoryError> {
    let action_raw = row.try_get::<String, _>("action")?;
    let action = AuditAction::parse(&action_raw)
        .ok_or_else(|| RepositoryError::Decode(format!("unknown audit action `{action_raw}`")))?;

    Ok(QuotationHistoryEntry {
        id: parse_uuid("id", row.try_get("id")?)?,
        quote_id: QuoteRequestId(parse_uuid("quote_id", row.try_get("quote_id")?)?),
        actor: ActorId(parse_uuid("actor", row.try_get("actor")?)?),
        action,
        previous_state: decode_json::<QuoteSnapshot>(
            "previous_state_json",
            row.try_get("previous_state_json")?,
        )?,
        new_state: decode_json::<QuoteSnapshot>("new_state_json", row.try_get("new_state_json")?)?,
        metadata: decode_json::<BTreeMap<String, String>>(
            "metadata_json",
            row.try_get("metadata_json")?,
        )?,
        recorded_at: parse_timestamp("recorded_at", row.try_get("recorded_at")?)?,
    })
}

fn encode_json<T: serde::Serialize>(column: &str, value: &T) -> Result<String, RepositoryError> {
    serde_json::to_string(value).map_err(|error| {
        RepositoryError::Decode(format!("failed to serialize `{column}`: {error}"))
    })
}

fn decode_json<T: serde::de::DeserializeOwned>(
    column: &str,
    value: String,
) -> Result<T, RepositoryError> {
    serde_json::from_str(&value).map_err(|error| {
        RepositoryError::Decode(format!("invalid json in `{column}`: `{value}` ({error})"))
    })
}

fn parse_uuid(column: &str, value: String) -> Result<Uuid, RepositoryError> {
    Uuid::parse_str(&value).map_err(|error| {
        RepositoryError::Decode(format!("invalid uuid in `{column}`: `{value}` ({error})"))
    })
}

fn parse_timestamp(column: &str, value: String) -> Result<DateTime<Utc>, RepositoryError> {
    DateTime::parse_from_rfc3339(&value).map(|timestamp| timestamp.with_timezone(&Utc)).map_err(
        |error| {
            RepositoryError::Decode(format!("invalid timestamp in `{column}`: `{value}` ({error})"))
        },
    )
}

#[cfg(test)]
mod tests {
    use chrono::{DateTime, Utc};
    use rust_decimal::Decimal;
    use uuid::Uuid;

    use charterdesk_core::audit::{AuditAction, QuotationHistoryEntry, QuoteSnapshot};
    use charterdesk_core::domain::actor::ActorId;
    use charterdesk_core::domain::quote::{QuoteRequestId, QuoteStatus};

    use super::SqlQuotationHistoryRepository;
    use crate::migrations;
    use crate::repositories::QuotationHistoryRepository;
    use crate::{connect_with_settings, DbPool};

    #[tokio::test]
    async fn sql_history_repo_round_trips_entries_with_metadata() {
        let pool = setup_pool().await;
        let repo = SqlQuotationHistoryRepository::new(pool.clone());
        let quote_id = QuoteRequestId::new();
        insert_quote(&pool, &quote_id).await;

        let entry = QuotationHistoryEntry::new(
            quote_id,
            ActorId(Uuid::new_v4()),
            AuditAction::PriceUpdated,
            snapshot(QuoteStatus::Pending, None),
            snapshot(QuoteStatus::Quoted, Some(Decimal::new(15_000, 0))),
        )
        .with_metadata("channel", "api");

        repo.append(entry.clone()).await.expect("append entry");

        let trail = repo.list_for_quote(&quote_id).await.expect("list entries");
        assert_eq!(trail, vec![entry]);

        pool.close().await;
    }

    #[tokio::test]
    async fn sql_history_repo_keeps_insertion_order_for_shared_timestamps() {
        let pool = setup_pool().await;
        let repo = SqlQuotationHistoryRepository::new(pool.clone());
        let quote_id = QuoteRequestId::new();
        insert_quote(&pool, &quote_id).await;
        let actor = ActorId(Uuid::new_v4());
        let at = parse_ts("2026-01-20T10:00:00Z");

        let mut price_entry = QuotationHistoryEntry::new(
            quote_id,
            actor,
            AuditAction::PriceUpdated,
            snapshot(QuoteStatus::Pending, None),
            snapshot(QuoteStatus::Quoted, Some(Decimal::new(15_000, 0))),
        );
        price_entry.recorded_at = at;

        let mut email_entry = QuotationHistoryEntry::new(
            quote_id,
            actor,
            AuditAction::EmailSent,
            snapshot(QuoteStatus::Quoted, Some(Decimal::new(15_000, 0))),
            snapshot(QuoteStatus::Quoted, Some(Decimal::new(15_000, 0))),
        )
        .with_metadata("delivered", "true");
        email_entry.recorded_at = at;

        repo.append(price_entry.clone()).await.expect("append price entry");
        repo.append(email_entry.clone()).await.expect("append email entry");

        let trail = repo.list_for_quote(&quote_id).await.expect("list entries");
        assert_eq!(
            trail.iter().map(|entry| entry.action).collect::<Vec<_>>(),
            vec![AuditAction::PriceUpdated, AuditAction::EmailSent],
        );

        pool.close().await;
    }

    #[tokio::test]
    async fn sql_history_repo_scopes_trails_to_one_quote() {
        let pool = setup_pool().await;
        let repo = SqlQuotationHistoryRepository::new(pool.clone());
        let mine = QuoteRequestId::new();
        let other = QuoteRequestId::new();
        insert_quote(&pool, &mine).await;

        let entry = QuotationHistoryEntry::new(
            mine,
            ActorId(Uuid::new_v4()),
            AuditAction::StatusChanged,
            snapshot(QuoteStatus::Quoted, Some(Decimal::new(12_000, 0))),
            snapshot(QuoteStatus::Approved, Some(Decimal::new(12_000, 0))),
        );
        repo.append(entry.clone()).await.expect("append entry");

        assert_eq!(repo.list_for_quote(&mine).await.expect("list mine"), vec![entry]);
        assert_eq!(repo.list_for_quote(&other).await.expect("list other"), vec![]);

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
                departure_date, status, created_at, updated_at
             ) VALUES (?, ?, 'Maria Santos', 'maria@example.com', 'Manila', 'Baguio',
                       3, '49-seater', 45, '2026-03-16', 'pending', ?, ?)",
        )
        .bind(quote_id.0.to_string())
        .bind(Uuid::new_v4().to_string())
        .bind(timestamp)
        .bind(timestamp)
        .execute(pool)
        .await
        .expect("insert quote");
    }

    fn snapshot(status: QuoteStatus, estimated_price: Option<Decimal>) -> QuoteSnapshot {
        QuoteSnapshot { status, estimated_price, admin_notes: None }
    }

    fn parse_ts(value: &str) -> DateTime<Utc> {
        DateTime::parse_from_rfc3339(value).expect("valid rfc3339").with_timezone(&Utc)
    }
}
