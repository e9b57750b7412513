use crate::config::AppConfig;
use crate::pipeline::CensusGeo;
use anyhow::{Context, Result};
use axum::{
    extract::State,
    http::{header, StatusCode},
    response::{IntoResponse, Json, Response},
    routing::get,
    Router,
};
use serde::Serialize;
use serde_json::json;
use std::sync::Arc;
use tokio::sync::OnceCell;
use tower_http::cors::CorsLayer;
use tower_http::services::ServeDir;
use tracing::{error, info};

pub struct AppState {
    pub config: AppConfig,
    census: OnceCell<Arc<CensusGeo>>,
}

impl AppState {
    pub fn new(config: AppConfig) -> Self {
        AppState {
            config,
            census: OnceCell::new(),
        }
    }

    /// The cached base state, loading it on first use.
    ///
    /// Concurrent callers on a cold cache wait for a single load. A failed
    /// load leaves the cache empty so a later request can retry.
    pub async fn census(&self) -> Result<Arc<CensusGeo>> {
        let census = self
            .census
            .get_or_try_init(|| async {
                let input = self.config.input.clone();
                let census = tokio::task::spawn_blocking(move || CensusGeo::load(&input))
                    .await
                    .context("Dataset loading task failed")??;
                census.log_stats();
                Ok::<_, anyhow::Error>(Arc::new(census))
            })
            .await?;
        Ok(Arc::clone(census))
    }

    pub fn is_cached(&self) -> bool {
        self.census.initialized()
    }
}

#[derive(Serialize)]
struct HealthResponse {
    status: &'static str,
    cached: bool,
}

struct AppError(anyhow::Error);

impl<E: Into<anyhow::Error>> From<E> for AppError {
    fn from(err: E) -> Self {
        AppError(err.into())
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        error!("Request failed: {:#}", self.0);
        let body = json!({ "error": format!("{:#}", self.0) });
        (StatusCode::INTERNAL_SERVER_ERROR, Json(body)).into_response()
    }
}

pub fn router(state: Arc<AppState>) -> Router {
    let mut app = Router::new()
        .route("/census-geo", get(census_geo_handler))
        .route("/health", get(health_handler));

    if let Some(dir) = &state.config.server.static_dir {
        app = app.fallback_service(ServeDir::new(dir));
    }

    app.layer(CorsLayer::permissive()).with_state(state)
}

pub async fn start_server(config: AppConfig) -> Result<()> {
    let state = Arc::new(AppState::new(config.clone()));

    if config.server.preload {
        info!("Preloading datasets...");
        state.census().await?;
    }

    let app = router(state);

    let listener = tokio::net::TcpListener::bind((config.server.host.as_str(), config.server.port))
        .await
        .with_context(|| {
            format!(
                "Failed to bind {}:{}",
                config.server.host, config.server.port
            )
        })?;
    info!("Starting server on http://{}", listener.local_addr()?);

    axum::serve(listener, app).await?;
    Ok(())
}

async fn census_geo_handler(State(state): State<Arc<AppState>>) -> Result<Response, AppError> {
    let census = state.census().await?;
    let body = census.enrich_json()?;
    Ok(([(header::CONTENT_TYPE, "application/json")], body).into_response())
}

async fn health_handler(State(state): State<Arc<AppState>>) -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "ok",
        cached: state.is_cached(),
    })
}
