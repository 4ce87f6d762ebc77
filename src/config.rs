use anyhow::{Context, Result};
use clap::{Parser, ValueEnum};
use std::{env, str::FromStr, time::Duration};

/// Who may read a file's metadata or obtain its download URL.
#[derive(ValueEnum, Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum DownloadPolicy {
    /// Any caller that knows the fileID.
    Public,
    /// Only the record's owner.
    #[default]
    Owner,
}

/// Centralized application configuration.
/// Combines environment variables and CLI arguments.
#[derive(Debug, Clone)]
pub struct AppConfig {
    pub host: String,
    pub port: u16,
    pub database_url: String,
    pub bucket: String,
    /// Custom S3 endpoint (MinIO, LocalStack). Uses path-style addressing when set.
    pub s3_endpoint: Option<String>,
    pub region: Option<String>,
    /// Header carrying the subject set by the fronting auth gateway.
    pub identity_header: String,
    pub download_policy: DownloadPolicy,
    pub sweep_interval: Duration,
    pub stale_after: Duration,
    /// Shared secret for `POST /events/object-created`. Event intake is off when unset.
    pub events_token: Option<String>,
}

/// Command-line + environment configuration.
#[derive(Parser, Debug)]
#[command(author, version, about = "Upload orchestrator for presigned object-store transfers")]
pub struct Args {
    /// Host to bind to (overrides UPLOAD_ORCHESTRATOR_HOST)
    #[arg(long)]
    pub host: Option<String>,

    /// Port to bind to (overrides UPLOAD_ORCHESTRATOR_PORT)
    #[arg(long)]
    pub port: Option<u16>,

    /// Database URL (overrides UPLOAD_ORCHESTRATOR_DATABASE_URL)
    #[arg(long)]
    pub database_url: Option<String>,

    /// Object store bucket (overrides UPLOAD_ORCHESTRATOR_BUCKET)
    #[arg(long)]
    pub bucket: Option<String>,

    /// S3 endpoint URL (overrides UPLOAD_ORCHESTRATOR_S3_ENDPOINT)
    #[arg(long)]
    pub s3_endpoint: Option<String>,

    /// S3 region (overrides UPLOAD_ORCHESTRATOR_REGION)
    #[arg(long)]
    pub region: Option<String>,

    /// Trusted identity header (overrides UPLOAD_ORCHESTRATOR_IDENTITY_HEADER)
    #[arg(long)]
    pub identity_header: Option<String>,

    /// Download access policy (overrides UPLOAD_ORCHESTRATOR_DOWNLOAD_POLICY)
    #[arg(long, value_enum)]
    pub download_policy: Option<DownloadPolicy>,

    /// Seconds between sweeper passes (overrides UPLOAD_ORCHESTRATOR_SWEEP_INTERVAL_SECS)
    #[arg(long)]
    pub sweep_interval_secs: Option<u64>,

    /// Hours before an unfinished upload is abandoned (overrides UPLOAD_ORCHESTRATOR_STALE_AFTER_HOURS)
    #[arg(long)]
    pub stale_after_hours: Option<u64>,

    /// Shared secret for object-store notifications (overrides UPLOAD_ORCHESTRATOR_EVENTS_TOKEN)
    #[arg(long)]
    pub events_token: Option<String>,

    /// Run migrations and exit
    #[arg(long)]
    pub migrate: bool,
}

/// Read `name` and parse it, falling back to `default` when unset.
fn env_parse<T>(name: &str, default: T) -> Result<T>
where
    T: FromStr,
    T::Err: std::fmt::Display,
{
    match env::var(name) {
        Ok(value) => value
            .parse::<T>()
            .map_err(|err| anyhow::anyhow!("{err}"))
            .with_context(|| format!("parsing {} value `{}`", name, value)),
        Err(env::VarError::NotPresent) => Ok(default),
        Err(err) => Err(err).with_context(|| format!("reading {}", name)),
    }
}

impl AppConfig {
    /// Parse environment variables + CLI args into AppConfig and migrate flag.
    pub fn from_env_and_args() -> Result<(Self, bool)> {
        let args = Args::parse();
        Self::from_args(args)
    }

    pub fn from_args(args: Args) -> Result<(Self, bool)> {
        // --- Environment fallback ---
        let env_host = env::var("UPLOAD_ORCHESTRATOR_HOST").unwrap_or_else(|_| "0.0.0.0".into());
        let env_port = env_parse("UPLOAD_ORCHESTRATOR_PORT", 3000u16)?;
        let env_db = env::var("UPLOAD_ORCHESTRATOR_DATABASE_URL")
            .unwrap_or_else(|_| "sqlite://./data/meta/upload_orchestrator.db".into());
        let env_bucket = env::var("UPLOAD_ORCHESTRATOR_BUCKET")
            .unwrap_or_else(|_| "upload-orchestrator-files".into());
        let env_identity = env::var("UPLOAD_ORCHESTRATOR_IDENTITY_HEADER")
            .unwrap_or_else(|_| "x-owner-id".into());
        let env_policy = match env::var("UPLOAD_ORCHESTRATOR_DOWNLOAD_POLICY") {
            Ok(value) => <DownloadPolicy as ValueEnum>::from_str(&value, true).map_err(|err| {
                anyhow::anyhow!("parsing UPLOAD_ORCHESTRATOR_DOWNLOAD_POLICY: {err}")
            })?,
            Err(_) => DownloadPolicy::default(),
        };
        let env_sweep = env_parse("UPLOAD_ORCHESTRATOR_SWEEP_INTERVAL_SECS", 300u64)?;
        let env_stale = env_parse("UPLOAD_ORCHESTRATOR_STALE_AFTER_HOURS", 48u64)?;

        // --- Merge ---
        let cfg = Self {
            host: args.host.unwrap_or(env_host),
            port: args.port.unwrap_or(env_port),
            database_url: args.database_url.unwrap_or(env_db),
            bucket: args.bucket.unwrap_or(env_bucket),
            s3_endpoint: args
                .s3_endpoint
                .or_else(|| env::var("UPLOAD_ORCHESTRATOR_S3_ENDPOINT").ok()),
            region: args
                .region
                .or_else(|| env::var("UPLOAD_ORCHESTRATOR_REGION").ok()),
            identity_header: args
                .identity_header
                .unwrap_or(env_identity)
                .to_ascii_lowercase(),
            download_policy: args.download_policy.unwrap_or(env_policy),
            sweep_interval: Duration::from_secs(args.sweep_interval_secs.unwrap_or(env_sweep).max(1)),
            stale_after: Duration::from_secs(args.stale_after_hours.unwrap_or(env_stale) * 3600),
            events_token: args
                .events_token
                .or_else(|| env::var("UPLOAD_ORCHESTRATOR_EVENTS_TOKEN").ok())
                .filter(|token| !token.trim().is_empty()),
        };

        Ok((cfg, args.migrate))
    }

    pub fn addr(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }
}
