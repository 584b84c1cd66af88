use std::sync::Arc;

use sqlx::PgPool;

use crate::analysis::DocumentAnalyst;
use crate::auth::jwt::JwtService;
use crate::config::Config;

/// Shared application state injected into all route handlers via Axum extractors.
#[derive(Clone)]
pub struct AppState {
    pub db: PgPool,
    /// Pluggable LLM flows. Default: `LlmAnalyst`.
    pub analyst: Arc<dyn DocumentAnalyst>,
    pub jwt: JwtService,
    pub config: Config,
}
