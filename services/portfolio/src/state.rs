//! Application state shared across handlers

use sqlx::PgPool;
use std::path::PathBuf;

use crate::media_host::S3MediaHost;
use crate::pipeline::UploadPipeline;
use crate::repositories::{AdminRepository, ImageRepository};
use crate::session::SessionStore;
use crate::throttle::LoginThrottle;

/// Application state shared across handlers
#[derive(Clone)]
pub struct AppState {
    pub db_pool: PgPool,
    pub admin_repository: AdminRepository,
    pub image_repository: ImageRepository,
    pub sessions: SessionStore,
    pub login_throttle: LoginThrottle,
    pub pipeline: UploadPipeline<S3MediaHost, ImageRepository>,
    /// Directory holding the static pages served by the page routes
    pub public_dir: PathBuf,
}
