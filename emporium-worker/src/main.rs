use std::sync::Arc;

use anyhow::Context;
use emporium_catalog::PricingEngine;
use emporium_core::{CatalogService, SystemClock};
use emporium_store::{app_config::Config, DbClient, PgCatalogRepository};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

mod reconcile;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "emporium_worker=debug,emporium_core=debug,emporium_store=info".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    let config = Config::load().context("Failed to load config")?;
    tracing::info!(
        "Starting rating reconciliation worker (pricing policy {:?})",
        config.pricing.window_policy
    );

    let db = DbClient::new(&config.database)
        .await
        .context("Failed to connect to database")?;

    let service = CatalogService::new(
        Arc::new(PgCatalogRepository::new(db.pool.clone())),
        Arc::new(SystemClock),
        PricingEngine::new(config.pricing.clone()),
    );

    if config.reconcile.run_once {
        let report = service.reconcile_ratings().await?;
        println!("{}", serde_json::to_string(&report)?);
        return Ok(());
    }

    let totals = reconcile::run_periodic(service, config.reconcile.interval_seconds, shutdown_signal()).await;

    tracing::info!(
        "Worker stopped after {} passes ({} failed, {} averages corrected)",
        totals.passes,
        totals.failed_passes,
        totals.corrected
    );
    Ok(())
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::error!("Failed to listen for shutdown signal: {}", e);
    }
}
