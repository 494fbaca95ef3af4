use sqlx::Executor;

use crate::connection::DbPool;
use crate::repositories::RepositoryError;

/// Canonical demo seeds and verification contract, one quote per lifecycle
/// status plus the records that hang off them.
const SEED_QUOTES: &[SeedQuoteContract] = &[
    SeedQuoteContract {
        quote_id: "a3c9d2e1-5b74-4f80-9c36-0d8f12ab34cd",
        display_code: "QR-12AB34CD",
        customer_name: "Ana Dela Cruz",
        status: "pending",
        estimated_price: None,
        history_actions: &[],
        has_booking: false,
        description: "Day trip to Tagaytay awaiting a price",
    },
    SeedQuoteContract {
        quote_id: "b4d8e3f2-6c85-4a91-8d47-1e9a23bc45de",
        display_code: "QR-23BC45DE",
        customer_name: "Ana Dela Cruz",
        status: "quoted",
        estimated_price: Some("15000"),
        history_actions: &["price_updated", "email_sent"],
        has_booking: false,
        description: "Three-day Baguio charter, priced and emailed",
    },
    SeedQuoteContract {
        quote_id: "c5e9f4a3-7d96-4ba2-9e58-2f0b34cd56ef",
        display_code: "QR-34CD56EF",
        customer_name: "Ben Morales",
        status: "approved",
        estimated_price: Some("22000"),
        history_actions: &[],
        has_booking: true,
        description: "Approved Vigan charter with a confirmed booking",
    },
    SeedQuoteContract {
        quote_id: "d6f0a5b4-8ea7-4cb3-af69-3a1c45de67f0",
        display_code: "QR-45DE67F0",
        customer_name: "Ben Morales",
        status: "rejected",
        estimated_price: None,
        history_actions: &[],
        has_booking: false,
        description: "Rejected Moalboal request",
    },
];

const SEED_HISTORY_IDS: &[&str] =
    &["1a2b3c4d-5e6f-4708-9102-93a4b5c6d7e8", "2b3c4d5e-6f70-4819-a213-a4b5c6d7e8f9"];

const SEED_BOOKING_ID: &str = "e7a1b6c5-9fb8-4dc4-ba7a-4b2d56ef78a1";

const SEED_BOOKING_TOTAL: &str = "44000";

/// Demo Seed Dataset covering the quote lifecycle end to end.
///
/// Provides deterministic fixtures for:
/// 1. A pending request waiting on the admin
/// 2. A quoted request with its pricing trail
/// 3. An approved request converted into a booking
/// 4. A rejected request
pub struct DemoSeedDataset;

impl DemoSeedDataset {
    /// SQL fixture content for the demo seed data.
    pub const SQL: &str = include_str!("../../../config/fixtures/demo_seed.sql");

    /// Load the demo dataset into the database.
    pub async fn load(pool: &DbPool) -> Result<SeedResult, RepositoryError> {
        let mut tx = pool.begin().await?;

        tx.execute(sqlx::query(Self::SQL)).await?;
        tx.commit().await?;

        let quotes_seeded = SEED_QUOTES
            .iter()
            .map(|quote| SeededQuoteInfo {
                display_code: quote.display_code,
                status: quote.status,
                description: quote.description,
            })
            .collect::<Vec<_>>();

        Ok(SeedResult { quotes_seeded })
    }

    /// Verify that seed data exists and matches the contract.
    pub async fn verify(pool: &DbPool) -> Result<VerificationResult, RepositoryError> {
        let mut checks = Vec::new();

        for quote in SEED_QUOTES {
            let quote_ok: i64 = sqlx::query_scalar(
                "SELECT EXISTS(
                    SELECT 1 FROM quote_request
                    WHERE id = ?1 AND status = ?2 AND customer_name = ?3
                )",
            )
            .bind(quote.quote_id)
            .bind(quote.status)
            .bind(quote.customer_name)
            .fetch_one(pool)
            .await?;
            checks.push((quote.display_code, quote_ok == 1));

            let price: Option<String> =
                sqlx::query_scalar("SELECT estimated_price FROM quote_request WHERE id = ?1")
                    .bind(quote.quote_id)
                    .fetch_one(pool)
                    .await?;
            checks.push((
                quote.price_label(),
                price.as_deref() == quote.estimated_price,
            ));

            let actions: Vec<String> = sqlx::query_scalar(
                "SELECT action FROM quotation_history
                 WHERE quote_id = ?1
                 ORDER BY recorded_at ASC, rowid ASC",
            )
            .bind(quote.quote_id)
            .fetch_all(pool)
            .await?;
            checks.push((
                quote.history_label(),
                string_list_matches(&actions, quote.history_actions),
            ));
        }

        let booking_ok: i64 = sqlx::query_scalar(
            "SELECT EXISTS(
                SELECT 1 FROM booking
                WHERE id = ?1 AND total_price = ?2
                  AND status = 'confirmed' AND payment_status = 'pending'
            )",
        )
        .bind(SEED_BOOKING_ID)
        .bind(SEED_BOOKING_TOTAL)
        .fetch_one(pool)
        .await?;
        checks.push(("booking-confirmed", booking_ok == 1));

        let expected_bookings = SEED_QUOTES.iter().filter(|quote| quote.has_booking).count() as i64;
        let booking_count: i64 = sqlx::query_scalar("SELECT COUNT(1) FROM booking")
            .fetch_one(pool)
            .await?;
        checks.push(("booking-count", booking_count == expected_bookings));

        let all_present = checks.iter().all(|(_, exists)| *exists);
        Ok(VerificationResult { all_present, checks })
    }

    /// Clean up seeded fixtures from a test database.
    pub async fn clean(pool: &DbPool) -> Result<(), RepositoryError> {
        let mut tx = pool.begin().await?;

        let quoted_history = sql_array_from_ids(SEED_HISTORY_IDS);
        let quote_ids =
            SEED_QUOTES.iter().map(|quote| quote.quote_id).collect::<Vec<_>>();
        let quoted_quotes = sql_array_from_ids(&quote_ids);

        sqlx::query("DELETE FROM booking WHERE id = ?")
            .bind(SEED_BOOKING_ID)
            .execute(&mut *tx)
            .await?;
        sqlx::query(&format!("DELETE FROM quotation_history WHERE id IN {quoted_history}"))
            .execute(&mut *tx)
            .await?;
        sqlx::query(&format!("DELETE FROM quote_request WHERE id IN {quoted_quotes}"))
            .execute(&mut *tx)
            .await?;

        tx.commit().await?;
        Ok(())
    }
}

#[derive(Debug, Clone, Copy)]
struct SeedQuoteContract {
    quote_id: &'static str,
    display_code: &'static str,
    customer_name: &'static str,
    status: &'static str,
    estimated_price: Option<&'static str>,
    history_actions: &'static [&'static str],
    has_booking: bool,
    description: &'static str,
}

impl SeedQuoteContract {
    fn price_label(&self) -> &'static str {
        match self.status {
            "pending" => "price-pending",
            "quoted" => "price-quoted",
            "approved" => "price-approved",
            _ => "price-rejected",
        }
    }

    fn history_label(&self) -> &'static str {
        match self.status {
            "pending" => "history-pending",
            "quoted" => "history-quoted",
            "approved" => "history-approved",
            _ => "history-rejected",
        }
    }
}

fn string_list_matches(actual: &[String], expected: &[&str]) -> bool {
    actual.len() == expected.len() && actual.iter().zip(expected).all(|(a, b)| a == b)
}

fn sql_array_from_ids(ids: &[&str]) -> String {
    let quoted = ids.iter().map(|id| format!("'{}'", id)).collect::<Vec<_>>().join(",");
    format!("({quoted})")
}

#[derive(Debug)]
pub struct SeedResult {
    pub quotes_seeded: Vec<SeededQuoteInfo>,
}

#[derive(Debug)]
pub struct SeededQuoteInfo {
    pub display_code: &'static str,
    pub status: &'static str,
    pub description: &'static str,
}

#[derive(Debug)]
pub struct VerificationResult {
    pub all_present: bool,
    pub checks: Vec<(&'static str, bool)>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::repositories::{QuotationHistoryRepository, SqlQuotationHistoryRepository};
    use crate::{connect_with_settings, migrations};

    use charterdesk_core::domain::quote::QuoteRequestId;
    use uuid::Uuid;

    #[test]
    fn sql_fixture_is_valid() {
        assert!(!DemoSeedDataset::SQL.is_empty());
    }

    #[tokio::test]
    async fn verify_seed_contract_and_idempotency() {
        let pool = connect_with_settings("sqlite::memory:", 1, 30)
            .await
            .expect("connect to test database");

        migrations::run_pending(&pool).await.expect("run migrations");

        let first = DemoSeedDataset::load(&pool).await.expect("load seed fixtures");
        let first_verification = DemoSeedDataset::verify(&pool).await.expect("verify seed fixtures");
        assert!(first_verification.all_present, "checks: {:?}", first_verification.checks);
        assert_eq!(first.quotes_seeded.len(), 4);

        let second = DemoSeedDataset::load(&pool).await.expect("reload seed fixtures");
        let second_verification =
            DemoSeedDataset::verify(&pool).await.expect("re-verify seed fixtures");
        assert!(second_verification.all_present);
        assert_eq!(second.quotes_seeded.len(), 4);
        assert_eq!(first_verification.checks, second_verification.checks);
    }

    #[tokio::test]
    async fn seeded_history_decodes_through_the_repository() {
        let pool = connect_with_settings("sqlite::memory:", 1, 30)
            .await
            .expect("connect to test database");

        migrations::run_pending(&pool).await.expect("run migrations");
        DemoSeedDataset::load(&pool).await.expect("load seed fixtures");

        let repo = SqlQuotationHistoryRepository::new(pool.clone());
        let quoted_id = QuoteRequestId(
            Uuid::parse_str("b4d8e3f2-6c85-4a91-8d47-1e9a23bc45de").expect("valid uuid"),
        );

        let trail = repo.list_for_quote(&quoted_id).await.expect("list history");
        assert_eq!(trail.len(), 2);
        assert_eq!(trail[0].action.as_str(), "price_updated");
        assert_eq!(trail[1].action.as_str(), "email_sent");
        assert_eq!(
            trail[1].metadata.get("message_id").map(String::as_str),
            Some("<demo-0001@charterdesk.local>"),
        );

        pool.close().await;
    }

    #[tokio::test]
    async fn clean_removes_all_seeded_rows() {
        let pool = connect_with_settings("sqlite::memory:", 1, 30)
            .await
            .expect("connect to test database");

        migrations::run_pending(&pool).await.expect("run migrations");
        DemoSeedDataset::load(&pool).await.expect("load seed fixtures");
        DemoSeedDataset::clean(&pool).await.expect("clean seed fixtures");

        for table in ["quote_request", "quotation_history", "booking"] {
            let remaining: i64 = sqlx::query_scalar(&format!("SELECT COUNT(1) FROM {table}"))
                .fetch_one(&pool)
                .await
                .expect("count rows");
            assert_eq!(remaining, 0, "table `{table}` should be empty after clean");
        }

        pool.close().await;
    }
}
