use anyhow::Result;
use aws_config::BehaviorVersion;
use aws_sdk_s3::config::Region;
use std::{io::ErrorKind, sync::Arc};
use tokio::{net::TcpListener, sync::watch};
use tracing_subscriber::EnvFilter;
use upload_orchestrator::{
    app,
    config::AppConfig,
    db,
    gateway::{ObjectStoreGateway, S3Gateway},
    repository::{MetadataRepository, SqliteMetadataRepository},
    services::{FileService, planner::UploadLimits, sweeper::Sweeper},
    state::AppState,
};

#[tokio::main]
async fn main() -> Result<()> {
    // --- Logging setup ---
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .init();

    // --- Parse config + migrate flag ---
    let (cfg, migrate) = AppConfig::from_env_and_args()?;

    tracing::info!(
        addr = %cfg.addr(),
        database_url = %cfg.database_url,
        bucket = %cfg.bucket,
        download_policy = ?cfg.download_policy,
        events_intake = cfg.events_token.is_some(),
        "Starting upload-orchestrator"
    );

    // --- Initialize SQLite connection ---
    let db = Arc::new(db::connect(&cfg.database_url).await?);

    // --- Handle migration mode ---
    if migrate {
        db::run_migrations(&db).await?;
        tracing::info!("Database migration complete.");
        return Ok(()); // exit after migration
    }

    // --- Object store client, built once and shared ---
    let mut loader = aws_config::defaults(BehaviorVersion::latest());
    if let Some(region) = &cfg.region {
        loader = loader.region(Region::new(region.clone()));
    }
    let shared_config = loader.load().await;
    let mut s3_config = aws_sdk_s3::config::Builder::from(&shared_config);
    if let Some(endpoint) = &cfg.s3_endpoint {
        tracing::info!("Using S3 endpoint {} (path-style)", endpoint);
        s3_config = s3_config.endpoint_url(endpoint).force_path_style(true);
    }
    let s3_client = aws_sdk_s3::Client::from_conf(s3_config.build());
    tracing::info!("Object store bucket: {}", cfg.bucket);

    // --- Initialize collaborators + core service ---
    let repo: Arc<dyn MetadataRepository> = Arc::new(SqliteMetadataRepository::new(db.clone()));
    let gateway: Arc<dyn ObjectStoreGateway> =
        Arc::new(S3Gateway::new(s3_client, cfg.bucket.clone()));
    let files = FileService::new(
        repo.clone(),
        gateway.clone(),
        UploadLimits::default(),
        cfg.download_policy,
    );

    // --- Sweeper for abandoned sessions ---
    let (shutdown_tx, shutdown_rx) = watch::channel(false);
    let stale_after = chrono::Duration::from_std(cfg.stale_after)?;
    let sweeper = Sweeper::new(repo, gateway, stale_after);
    let sweeper_handle = tokio::spawn(sweeper.run(cfg.sweep_interval, shutdown_rx));

    // --- Build router ---
    if cfg.events_token.is_none() {
        tracing::warn!("No events token configured; object-created notifications will be refused");
    }
    let state = AppState::new(files, &cfg.identity_header)
        .with_events_token(cfg.events_token.as_deref());
    let app = app(state);

    // --- Start server ---
    let addr = cfg.addr();
    let listener = match TcpListener::bind(&addr).await {
        Ok(listener) => listener,
        Err(err)
            if err.kind() == ErrorKind::PermissionDenied
                && matches!(cfg.host.as_str(), "0.0.0.0" | "::") =>
        {
            let fallback_addr = format!("127.0.0.1:{}", cfg.port);
            tracing::warn!(
                "Permission denied binding to {} ({}). Falling back to {}",
                addr,
                err,
                fallback_addr
            );
            TcpListener::bind(&fallback_addr).await?
        }
        Err(err) => return Err(err.into()),
    };

    tracing::info!("Server listening on http://{}", listener.local_addr()?);
    axum::serve(listener, app)
        .with_graceful_shutdown(async {
            if let Err(err) = tokio::signal::ctrl_c().await {
                tracing::warn!("Failed to listen for shutdown signal: {}", err);
            }
            tracing::info!("Shutdown signal received");
        })
        .await?;

    let _ = shutdown_tx.send(true);
    let _ = sweeper_handle.await;

    Ok(())
}
