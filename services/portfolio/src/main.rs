use anyhow::{Context, Result};
use aws_config::BehaviorVersion;
use tracing::{Level, info, warn};
use tracing_subscriber::EnvFilter;

mod error;
mod media_host;
mod middleware;
mod models;
mod pipeline;
mod repositories;
mod routes;
mod session;
mod state;
mod throttle;
mod validation;

use common::cache::{RedisConfig, RedisPool};
use common::database::{DatabaseConfig, health_check, init_pool};

use crate::media_host::{MediaHostConfig, S3MediaHost};
use crate::pipeline::UploadPipeline;
use crate::repositories::{AdminRepository, ImageRepository};
use crate::session::{SessionConfig, SessionStore};
use crate::state::AppState;
use crate::throttle::LoginThrottle;

#[tokio::main]
async fn main() -> Result<()> {
    // Initialize logging
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .with_max_level(Level::INFO)
        .init();

    info!("Starting portfolio service");

    // Initialize database connection pool
    let db_config = DatabaseConfig::from_env()?;
    let pool = init_pool(&db_config).await?;

    if health_check(&pool).await? {
        info!("Database connection successful");
    } else {
        anyhow::bail!("Failed to connect to database");
    }

    sqlx::migrate!("./migrations")
        .run(&pool)
        .await
        .context("running database migrations")?;

    // Initialize the session backend
    let redis_config = RedisConfig::from_env()?;
    let redis_pool = RedisPool::new(&redis_config).await?;
    let sessions = SessionStore::new(redis_pool, SessionConfig::from_env()?);

    // Initialize the media host client
    let aws_config = aws_config::load_defaults(BehaviorVersion::latest()).await;
    let s3_client = aws_sdk_s3::Client::new(&aws_config);
    let media_host = S3MediaHost::new(s3_client, MediaHostConfig::from_env()?);

    let admin_repository = AdminRepository::new(pool.clone());
    let image_repository = ImageRepository::new(pool.clone());

    bootstrap_admin(&admin_repository).await;

    let public_dir = std::env::var("PUBLIC_DIR")
        .unwrap_or_else(|_| "public".to_string())
        .into();

    let app_state = AppState {
        db_pool: pool,
        admin_repository,
        image_repository: image_repository.clone(),
        sessions,
        login_throttle: LoginThrottle::default(),
        pipeline: UploadPipeline::new(media_host, image_repository),
        public_dir,
    };

    // Start the web server
    let app = routes::create_router(app_state);

    let port: u16 = std::env::var("PORT")
        .ok()
        .and_then(|s| s.parse().ok())
        .unwrap_or(3000);

    let listener = tokio::net::TcpListener::bind(("0.0.0.0", port)).await?;
    info!("Portfolio service listening on 0.0.0.0:{}", port);

    axum::serve(listener, app).await?;

    Ok(())
}

/// Provision the initial admin from the environment when configured
///
/// Runs once at startup; an already-provisioned username is not an error.
async fn bootstrap_admin(admins: &AdminRepository) {
    let (Ok(username), Ok(password)) = (
        std::env::var("ADMIN_USERNAME"),
        std::env::var("ADMIN_PASSWORD"),
    ) else {
        return;
    };

    match admins.provision(&username, &password).await {
        Ok(admin) => info!("bootstrapped admin '{}'", admin.username),
        Err(crate::error::ApiError::Conflict(_)) => {
            info!("admin '{}' already provisioned", username)
        }
        Err(e) => warn!("could not bootstrap admin '{}': {}", username, e),
    }
}
