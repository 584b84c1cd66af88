pub mod health;

use axum::{
    extract::DefaultBodyLimit,
    http::HeaderValue,
    routing::{get, patch, post},
    Router,
};
use tower_http::cors::{AllowHeaders, AllowMethods, AllowOrigin, CorsLayer};
use tower_http::trace::TraceLayer;
use tracing::warn;

use crate::auth::handlers as auth;
use crate::config::Config;
use crate::documents::handlers as documents;
use crate::history::handlers as history;
use crate::state::AppState;

pub fn build_router(state: AppState) -> Router {
    let upload_limit = state.config.max_upload_bytes;
    // A compare request carries two base64-encoded documents.
    let json_limit = upload_limit.saturating_mul(3);
    let cors = cors_layer(&state.config);

    let auth_routes = Router::new()
        .route("/register", post(auth::handle_register))
        .route("/login", post(auth::handle_login))
        .route("/me", get(auth::handle_me));

    let document_routes = Router::new()
        .route("/", get(documents::handle_library))
        .route(
            "/upload",
            post(documents::handle_upload).layer(DefaultBodyLimit::max(upload_limit)),
        )
        .route("/paste", post(documents::handle_paste))
        .route("/preview", post(documents::handle_preview));

    let history_routes = Router::new()
        .route(
            "/",
            get(history::handle_list_history).delete(history::handle_clear_history),
        )
        .route(
            "/:id",
            get(history::handle_get_history_item).delete(history::handle_delete_history_item),
        );

    let session_routes = Router::new()
        .route("/chat", post(history::handle_create_chat))
        .route("/compare", post(history::handle_compare))
        .route("/:id/demystify", post(history::handle_demystify))
        .route("/:id/risks/:index", patch(history::handle_update_risk_level))
        .route(
            "/:id/messages",
            get(history::handle_get_messages).post(history::handle_ask),
        )
        .route(
            "/:id/documents/:slot/download",
            get(history::handle_download_document),
        )
        .route(
            "/:id/obligations.ics",
            get(history::handle_export_obligations),
        );

    Router::new()
        .route("/health", get(health::health_handler))
        .nest("/api/v1/auth", auth_routes)
        .nest("/api/v1/documents", document_routes)
        .nest("/api/v1/history", history_routes)
        .nest("/api/v1/sessions", session_routes)
        .layer(DefaultBodyLimit::max(json_limit))
        .layer(TraceLayer::new_for_http())
        .layer(cors)
        .with_state(state)
}

fn cors_layer(config: &Config) -> CorsLayer {
    let allow_origin = match config.cors_allowed_origin.as_deref() {
        Some(origins) => {
            let headers: Vec<HeaderValue> = origins
                .split(',')
                .map(str::trim)
                .filter(|origin| !origin.is_empty())
                .filter_map(|origin| match origin.parse::<HeaderValue>() {
                    Ok(value) => Some(value),
                    Err(_) => {
                        warn!("Ignoring invalid CORS origin '{origin}'");
                        None
                    }
                })
                .collect();
            AllowOrigin::list(headers)
        }
        None => AllowOrigin::mirror_request(),
    };

    CorsLayer::new()
        .allow_origin(allow_origin)
        .allow_methods(AllowMethods::mirror_request())
        .allow_headers(AllowHeaders::mirror_request())
        .allow_credentials(true)
}
