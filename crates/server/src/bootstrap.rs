use std::sync::Arc;

use charterdesk_core::config::{AppConfig, ConfigError, LoadOptions};
use charterdesk_db::repositories::{
    SqlBookingRepository, SqlQuotationHistoryRepository, SqlQuoteRequestRepository,
};
use charterdesk_db::{connect_with_settings, migrations, DbPool};
use charterdesk_mailer::{DeliveryError, SmtpMailer};
use charterdesk_service::{BookingDesk, QuoteDesk};
use thiserror::Error;
use tracing::info;

pub struct Application {
    pub config: AppConfig,
    pub db_pool: DbPool,
    pub quotes: Arc<QuoteDesk>,
    pub bookings: Arc<BookingDesk>,
}

#[derive(Debug, Error)]
pub enum BootstrapError {
    #[error(transparent)]
    Config(#[from] ConfigError),
    #[error("database connection failed: {0}")]
    DatabaseConnect(#[source] sqlx::Error),
    #[error("database migration failed: {0}")]
    Migration(#[source] sqlx::migrate::MigrateError),
    #[error("mail transport setup failed: {0}")]
    Mailer(#[source] DeliveryError),
}

pub async fn bootstrap(options: LoadOptions) -> Result<Application, BootstrapError> {
    let config = AppConfig::load(options)?;
    bootstrap_with_config(config).await
}

pub async fn bootstrap_with_config(config: AppConfig) -> Result<Application, BootstrapError> {
    info!(event_name = "system.bootstrap.start", "starting application bootstrap");

    let db_pool = connect_with_settings(
        &config.database.url,
        config.database.max_connections,
        config.database.timeout_secs,
    )
    .await
    .map_err(BootstrapError::DatabaseConnect)?;
    info!(event_name = "system.bootstrap.database_connected", "database connection established");

    migrations::run_pending(&db_pool).await.map_err(BootstrapError::Migration)?;
    info!(event_name = "system.bootstrap.migrations_applied", "database migrations applied");

    let mailer =
        Arc::new(SmtpMailer::new(&config.smtp, &config.business).map_err(BootstrapError::Mailer)?);
    info!(
        event_name = "system.bootstrap.mailer_ready",
        smtp_host = %config.smtp.host,
        "quotation mailer constructed"
    );

    let quote_store = Arc::new(SqlQuoteRequestRepository::new(db_pool.clone()));
    let booking_store = Arc::new(SqlBookingRepository::new(db_pool.clone()));
    let history = Arc::new(SqlQuotationHistoryRepository::new(db_pool.clone()));

    let quotes = Arc::new(QuoteDesk::new(
        quote_store.clone(),
        booking_store.clone(),
        history,
        mailer,
    ));
    let bookings = Arc::new(BookingDesk::new(quote_store, booking_store));

    Ok(Application { config, db_pool, quotes, bookings })
}
