use std::sync::Arc;

use anyhow::Context;
use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use pagegate_billing::adapters::http::{build_router, BillingAppState};
use pagegate_billing::adapters::{
    PostgresSubscriptionRepository, StripeBillingGateway, StripeGatewayConfig,
};
use pagegate_billing::config::{AppConfig, LogFormat};
use pagegate_billing::domain::subscription::StripeWebhookVerifier;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let config = AppConfig::load().context("failed to load configuration")?;
    config.validate().context("invalid configuration")?;

    init_tracing(&config.server.log_level, config.server.log_format);

    let pool = config
        .database
        .pool_options()
        .connect(&config.database.url)
        .await
        .context("failed to connect to database")?;

    if config.database.run_migrations {
        sqlx::migrate!("./migrations")
            .run(&pool)
            .await
            .context("failed to run migrations")?;
    }

    let gateway = StripeBillingGateway::new(
        StripeGatewayConfig::new(config.payment.stripe_api_key.clone())
            .with_base_url(config.payment.api_base_url.clone())
            .with_timeout(config.payment.request_timeout()),
    )
    .context("failed to build billing gateway")?;

    let verifier = StripeWebhookVerifier::new(config.payment.stripe_webhook_secret.clone())
        .with_tolerance(config.payment.webhook_tolerance_secs);

    let state = BillingAppState::new(
        Arc::new(PostgresSubscriptionRepository::new(pool)),
        Arc::new(gateway),
        verifier,
        config.billing.clone(),
    );

    let app = build_router(state, config.server.request_timeout());
    let addr = config.server.socket_addr()?;
    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .with_context(|| format!("failed to bind {}", addr))?;

    tracing::info!(
        %addr,
        environment = ?config.server.environment,
        test_mode = config.payment.is_test_mode(),
        "pagegate-billing listening"
    );

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .context("server error")?;

    Ok(())
}

fn init_tracing(default_filter: &str, format: LogFormat) {
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_filter));
    let registry = tracing_subscriber::registry().with(filter);

    match format {
        LogFormat::Json => registry
            .with(fmt::layer().json().with_current_span(true))
            .init(),
        LogFormat::Pretty => registry.with(fmt::layer().with_target(false)).init(),
    }
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::error!(error = %e, "failed to listen for shutdown signal");
        std::future::pending::<()>().await;
    }
    tracing::info!("shutdown signal received");
}
