//! Billing service entry point.
//!
//! Loads configuration, wires adapters to the application layer, starts the
//! HTTP server and the background expiration sweeper.

use std::sync::Arc;

use sqlx::postgres::PgPoolOptions;
use tower_http::timeout::TimeoutLayer;
use tower_http::trace::TraceLayer;
use tracing::{error, info};
use tracing_subscriber::EnvFilter;

use coach_billing::adapters::http::{billing_router, BillingAppState};
use coach_billing::adapters::memory::InMemoryCatalog;
use coach_billing::adapters::postgres::PostgresLedger;
use coach_billing::adapters::stripe::{StripeConfig, StripeGateway};
use coach_billing::application::handlers::subscription::{
    SweepExpiredCommand, SweepExpiredHandler,
};
use coach_billing::config::AppConfig;
use coach_billing::domain::foundation::Timestamp;
use coach_billing::ports::{PlanCatalog, SubscriptionLedger};

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let config = AppConfig::load()?;
    config.validate()?;

    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| EnvFilter::new(config.server.log_level.clone())),
        )
        .init();

    info!(
        environment = ?config.server.environment,
        "Starting billing service"
    );

    // Database
    let pool = PgPoolOptions::new()
        .min_connections(config.database.min_connections)
        .max_connections(config.database.max_connections)
        .acquire_timeout(config.database.acquire_timeout())
        .idle_timeout(config.database.idle_timeout())
        .connect(&config.database.url)
        .await?;

    if config.database.run_migrations {
        info!("Running database migrations");
        sqlx::migrate!("./migrations").run(&pool).await?;
    }

    // Adapters
    let catalog = Arc::new(InMemoryCatalog::seeded());
    let ledger: Arc<dyn SubscriptionLedger> =
        Arc::new(PostgresLedger::new(pool, catalog.default_plan_key()));
    let gateway = Arc::new(StripeGateway::new(
        StripeConfig::new(
            config.gateway.stripe_api_key.clone(),
            config.gateway.stripe_webhook_secret.clone(),
            config.gateway.success_url.clone(),
            config.gateway.cancel_url.clone(),
        )
        .with_require_livemode(config.gateway.require_livemode),
    ));

    let state = BillingAppState {
        catalog,
        ledger: ledger.clone(),
        gateway,
    };

    // Background expiration sweeper
    if config.sweeper.enabled {
        let sweeper = SweepExpiredHandler::new(ledger);
        let interval = config.sweeper.interval();
        tokio::spawn(async move {
            let mut ticker = tokio::time::interval(interval);
            // The first tick fires immediately; catch anything that expired
            // while the service was down.
            loop {
                ticker.tick().await;
                let cmd = SweepExpiredCommand {
                    now: Timestamp::now(),
                };
                if let Err(e) = sweeper.handle(cmd).await {
                    error!(error = %e, "Expiration sweep failed");
                }
            }
        });
    }

    // HTTP server
    let app = axum::Router::new()
        .nest("/api", billing_router())
        .layer(TraceLayer::new_for_http())
        .layer(TimeoutLayer::new(std::time::Duration::from_secs(
            config.server.request_timeout_secs,
        )))
        .with_state(state);

    let addr = config.server.socket_addr()?;
    info!(%addr, "Listening");
    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app).await?;

    Ok(())
}
