//! Back-office service
//!
//! Serves the admin REST API and records every request through the
//! asynchronous access-log pipeline.

mod config;

use anyhow::{Context, Result};
use backoffice_access_log::{
    log_channel, BatchConsumer, LogSink, LogStore, LogStoreKind, MemoryLogStore,
};
use backoffice_api::{ApiServer, ApiServerConfig};
use backoffice_auth::hash_password;
use backoffice_db::{entities::user, SeaOrmLogStore};
use chrono::{FixedOffset, Utc};
use clap::Parser;
use sea_orm::{ActiveModelTrait, DatabaseConnection, EntityTrait, PaginatorTrait, Set};
use std::net::SocketAddr;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;
use tokio::signal;
use tracing::{error, info, warn};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use crate::config::AppConfig;

const DEFAULT_ADMIN_PASSWORD: &str = "admin123";
const DRAIN_TIMEOUT: Duration = Duration::from_secs(10);

/// Back-office API server
#[derive(Parser, Debug)]
#[command(name = "backoffice")]
#[command(about = "Run the back-office API server", long_about = None)]
#[command(version = env!("GIT_TAG"))]
#[command(long_version = concat!(env!("GIT_TAG"), "\nCommit: ", env!("GIT_HASH"), "\nBuilt: ", env!("BUILD_TIME")))]
struct Cli {
    /// YAML configuration file (missing file means defaults)
    #[arg(long, env = "BACKOFFICE_CONFIG", default_value = "config.yaml")]
    config: PathBuf,

    /// Address to bind the API server (overrides app.bind_addr)
    #[arg(long, env = "BACKOFFICE_BIND")]
    bind: Option<String>,

    /// Database URL (overrides database.url)
    #[arg(long, env = "DATABASE_URL")]
    database_url: Option<String>,

    /// Token signing secret (overrides jwt.secret)
    #[arg(long, env = "BACKOFFICE_JWT_SECRET")]
    jwt_secret: Option<String>,

    /// Log level (trace, debug, info, warn, error)
    #[arg(long, env = "RUST_LOG", default_value = "info")]
    log_level: String,
}

impl Cli {
    fn apply(&self, config: &mut AppConfig) {
        if let Some(bind) = &self.bind {
            config.app.bind_addr = bind.clone();
        }
        if let Some(url) = &self.database_url {
            config.database.url = url.clone();
        }
        if let Some(secret) = &self.jwt_secret {
            config.jwt.secret = secret.clone();
        }
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    let mut config = AppConfig::load(&cli.config)?;
    cli.apply(&mut config);
    config.validate()?;

    init_logging(&cli.log_level, config.app.is_production())?;

    info!(
        "Starting {} {} ({})",
        config.app.name,
        env!("GIT_TAG"),
        env!("GIT_HASH")
    );

    let bind_addr: SocketAddr = config
        .app
        .bind_addr
        .parse()
        .with_context(|| format!("Invalid bind address: {}", config.app.bind_addr))?;
    let pipeline = config.log_pipeline.clone();
    let timezone = FixedOffset::east_opt(pipeline.timezone_offset_hours * 3600)
        .context("Invalid timezone offset")?;

    let db = backoffice_db::connect(&config.database.url)
        .await
        .context("Failed to connect to database")?;
    backoffice_db::migrate(&db)
        .await
        .context("Failed to run database migrations")?;

    let (store, sink): (Arc<dyn LogStore>, Arc<dyn LogSink>) = match pipeline.store {
        LogStoreKind::Database => {
            let store = Arc::new(SeaOrmLogStore::new(db.clone()));
            (store.clone(), store)
        }
        LogStoreKind::Memory => {
            warn!("Access logs are kept in memory and lost on restart");
            let store = Arc::new(MemoryLogStore::new());
            (store.clone(), store)
        }
    };

    let (sender, receiver) = log_channel(pipeline.channel_capacity);
    let consumer = BatchConsumer::new(receiver, sink, pipeline.consumer_config()).spawn();

    seed_admin(&db).await?;

    let api_config = ApiServerConfig {
        bind_addr,
        enable_cors: config.cors.enabled,
        cors_origins: (!config.cors.origins.is_empty()).then(|| config.cors.origins.clone()),
        jwt_secret: config.jwt.secret.clone(),
        jwt_issuer: config.jwt.issuer.clone(),
        token_ttl: chrono::Duration::hours(i64::from(config.jwt.expires_hours)),
        skip_auth_paths: config.jwt.skip_auth_urls.clone(),
        timezone,
        max_body_bytes: pipeline.max_body_bytes,
        capture_skip_paths: pipeline.skip_paths.clone(),
    };

    let server = ApiServer::new(api_config, db, store, sender.clone());
    info!("Press Ctrl+C to stop");
    let served = server.serve(shutdown_signal()).await;

    // Stop intake, then let the consumer flush what it holds
    sender.close();
    match tokio::time::timeout(DRAIN_TIMEOUT, consumer.join()).await {
        Ok(Ok(())) => info!("Access log pipeline drained"),
        Ok(Err(e)) => error!("Access log consumer failed: {}", e),
        Err(_) => warn!(
            "Access log pipeline did not drain within {}s",
            DRAIN_TIMEOUT.as_secs()
        ),
    }

    let stats = sender.stats();
    info!(
        accepted = stats.accepted,
        dropped = stats.dropped,
        "Access log totals"
    );

    served?;
    info!("Back-office service stopped");
    Ok(())
}

/// Create the `admin` account when there are no users yet.
async fn seed_admin(db: &DatabaseConnection) -> Result<()> {
    let users = user::Entity::find()
        .count(db)
        .await
        .context("Failed to count users")?;
    if users > 0 {
        return Ok(());
    }

    let password = match std::env::var("BACKOFFICE_ADMIN_PASSWORD") {
        Ok(password) if !password.is_empty() => password,
        _ => {
            warn!(
                "No BACKOFFICE_ADMIN_PASSWORD set, seeding admin with the default password; change it after first login"
            );
            DEFAULT_ADMIN_PASSWORD.to_string()
        }
    };

    let now = Utc::now();
    user::ActiveModel {
        username: Set("admin".to_string()),
        nickname: Set("Administrator".to_string()),
        email: Set(String::new()),
        phone: Set(String::new()),
        gender: Set(String::new()),
        status: Set(1),
        password_hash: Set(hash_password(&password).context("Failed to hash admin password")?),
        created_at: Set(now),
        updated_at: Set(now),
        ..Default::default()
    }
    .insert(db)
    .await
    .context("Failed to create admin user")?;

    info!("Created default admin user");
    Ok(())
}

async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(err) = signal::ctrl_c().await {
            error!("Error listening for shutdown signal: {}", err);
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match signal::unix::signal(signal::unix::SignalKind::terminate()) {
            Ok(mut stream) => {
                stream.recv().await;
            }
            Err(err) => {
                error!("Error listening for SIGTERM: {}", err);
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {}
        _ = terminate => {}
    }

    info!("Shutdown signal received, stopping server...");
}

fn init_logging(log_level: &str, json: bool) -> Result<()> {
    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .or_else(|_| tracing_subscriber::EnvFilter::try_new(log_level))?;

    let registry = tracing_subscriber::registry().with(filter);
    if json {
        registry
            .with(tracing_subscriber::fmt::layer().json())
            .init();
    } else {
        registry.with(tracing_subscriber::fmt::layer()).init();
    }

    Ok(())
}
