//! Vouchledger API Server
//!
//! Main entry point for the voucher and ledger service.

use std::sync::Arc;
use std::time::Duration;

use anyhow::Context;
use sea_orm_migration::MigratorTrait;
use tokio::net::TcpListener;
use tracing::{error, info, warn};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use vouchledger_api::{AppState, create_router};
use vouchledger_core::storage::{BlobStore, MemoryBlobStore, OpenDalStore, StorageConfig};
use vouchledger_db::migration::Migrator;
use vouchledger_db::{LedgerLocks, ReconciliationRepository, connect};
use vouchledger_shared::config::{ReconciliationConfig, StorageSettings};
use vouchledger_shared::{AppConfig, JwtConfig, JwtService};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Load environment variables from .env file
    dotenvy::dotenv().ok();

    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "vouchledger=debug,tower_http=debug".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    let config = AppConfig::load().context("Failed to load configuration")?;

    let db = connect(&config.database).await?;
    info!("Connected to database");
    Migrator::up(&db, None).await?;

    let storage = blob_store(config.storage.as_ref())?;

    let jwt_config = JwtConfig {
        secret: config.jwt.secret.clone(),
        access_token_expires_minutes: i64::try_from(config.jwt.access_token_expiry_secs / 60)
            .unwrap_or(i64::MAX),
    };
    let jwt_service = JwtService::new(jwt_config);

    let locks = LedgerLocks::new();
    spawn_sweep(
        ReconciliationRepository::new(db.clone(), locks.clone()),
        &config.reconciliation,
    );

    let state = AppState {
        db: Arc::new(db),
        jwt_service: Arc::new(jwt_service),
        locks,
        storage,
        request_timeout: Duration::from_secs(config.server.request_timeout_secs),
    };

    let app = create_router(state);

    let addr = format!("{}:{}", config.server.host, config.server.port);
    let listener = TcpListener::bind(&addr).await?;
    info!("Server listening on {}", addr);

    axum::serve(listener, app).await?;

    Ok(())
}

/// Builds the attachment store. Without a `storage` section uploads are kept
/// in memory.
fn blob_store(settings: Option<&StorageSettings>) -> anyhow::Result<Arc<dyn BlobStore>> {
    let Some(settings) = settings else {
        warn!("No storage configured, attachments are kept in memory");
        return Ok(Arc::new(MemoryBlobStore::new()));
    };
    let store = OpenDalStore::from_config(StorageConfig::from_settings(settings)?)?;
    info!(kind = %settings.kind, "Attachment storage configured");
    Ok(Arc::new(store))
}

/// Runs the reconciliation sweep after the initial delay, then on every
/// interval tick. An interval of zero runs it once.
fn spawn_sweep(repo: ReconciliationRepository, config: &ReconciliationConfig) {
    let initial_delay = Duration::from_secs(config.initial_delay_secs);
    let interval = config.interval_secs;

    tokio::spawn(async move {
        tokio::time::sleep(initial_delay).await;
        if interval == 0 {
            run_sweep(&repo).await;
            return;
        }
        let mut ticker = tokio::time::interval(Duration::from_secs(interval));
        loop {
            ticker.tick().await;
            run_sweep(&repo).await;
        }
    });
}

async fn run_sweep(repo: &ReconciliationRepository) {
    if let Err(e) = repo.sweep().await {
        error!(error = %e, "Reconciliation sweep failed");
    }
}
