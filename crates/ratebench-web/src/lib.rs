//! HTTP layer for ratebench.
//!
//! Two routes: `GET /` serves the lookup UI document, `GET /lookup` resolves
//! a batch of codes. A lookup request always answers 200 with a JSON array —
//! per-code no-match entries are embedded placeholders, never a 404. Only
//! infrastructure problems (store or UI document missing) surface as server
//! errors.

pub mod audit;

use std::net::SocketAddr;
use std::path::PathBuf;
use std::sync::Arc;

use axum::extract::{Query, State};
use axum::http::StatusCode;
use axum::response::{Html, IntoResponse, Json, Response};
use axum::routing::get;
use axum::Router;
use serde_json::json;
use thiserror::Error;
use tower::ServiceBuilder;
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;

use ratebench_core::{resolve_lookup, LookupKey, ResolvedMatch, StoreError, ValidationError};
use ratebench_store::Store;

pub use audit::AuditWriter;

#[derive(Clone)]
pub struct AppState {
    store: Arc<Store>,
    audit: AuditWriter,
    ui_path: Arc<PathBuf>,
}

impl AppState {
    /// Wire up shared state: the injected store handle plus the audit writer
    /// thread feeding it.
    pub fn new(store: Arc<Store>, ui_path: PathBuf) -> Self {
        let audit = AuditWriter::spawn(Arc::clone(&store));
        Self {
            store,
            audit,
            ui_path: Arc::new(ui_path),
        }
    }
}

#[derive(Debug, Error)]
pub enum ServeError {
    #[error(transparent)]
    Io(#[from] std::io::Error),
}

pub fn router(state: AppState) -> Router {
    Router::new()
        .route("/", get(serve_ui))
        .route("/lookup", get(lookup))
        .layer(
            ServiceBuilder::new()
                .layer(TraceLayer::new_for_http())
                .layer(
                    CorsLayer::new()
                        .allow_origin(Any)
                        .allow_methods(Any)
                        .allow_headers(Any),
                ),
        )
        .with_state(state)
}

pub async fn serve(addr: SocketAddr, state: AppState) -> Result<(), ServeError> {
    if !state.ui_path.exists() {
        tracing::warn!(ui = %state.ui_path.display(), "UI document missing; / will answer 500");
    }

    let listener = tokio::net::TcpListener::bind(addr).await?;
    tracing::info!(%addr, db = %state.store.db_path().display(), "ratebench listening");
    axum::serve(listener, router(state)).await?;
    Ok(())
}

enum ApiError {
    BadRequest(String),
    Configuration(String),
    Internal(String),
}

impl From<StoreError> for ApiError {
    fn from(error: StoreError) -> Self {
        match error {
            StoreError::Unavailable(message) => Self::Configuration(message),
            StoreError::Query(message) => Self::Internal(message),
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (status, detail) = match self {
            Self::BadRequest(detail) => (StatusCode::BAD_REQUEST, detail),
            Self::Configuration(detail) | Self::Internal(detail) => {
                (StatusCode::INTERNAL_SERVER_ERROR, detail)
            }
        };
        (status, Json(json!({ "detail": detail }))).into_response()
    }
}

async fn serve_ui(State(state): State<AppState>) -> Result<Html<String>, ApiError> {
    match tokio::fs::read_to_string(state.ui_path.as_path()).await {
        Ok(document) => Ok(Html(document)),
        Err(error) => {
            tracing::error!(ui = %state.ui_path.display(), %error, "failed to read UI document");
            Err(ApiError::Configuration(String::from("UI file not found")))
        }
    }
}

/// Batch lookup: `geozip` (required), `code` (repeated), optional `modifier`
/// and `product`. The response is always an array, one or more entries per
/// requested code.
async fn lookup(
    State(state): State<AppState>,
    Query(params): Query<Vec<(String, String)>>,
) -> Result<Json<Vec<ResolvedMatch>>, ApiError> {
    let key = parse_lookup_key(&params)?;

    let store = Arc::clone(&state.store);
    let resolve_key = key.clone();
    let outcome = tokio::task::spawn_blocking(move || resolve_lookup(store.as_ref(), &resolve_key))
        .await
        .map_err(|error| ApiError::Internal(error.to_string()))??;

    state.audit.submit(outcome.log);
    Ok(Json(outcome.matches))
}

fn parse_lookup_key(params: &[(String, String)]) -> Result<LookupKey, ApiError> {
    let mut geozip = None;
    let mut codes = Vec::new();
    let mut modifier = None;
    let mut product = None;

    for (name, value) in params {
        match name.as_str() {
            "geozip" => geozip = Some(value.clone()),
            "code" => codes.push(value.clone()),
            "modifier" => modifier = Some(value.clone()),
            "product" => product = Some(value.clone()),
            _ => {}
        }
    }

    let geozip = geozip.ok_or_else(|| {
        ApiError::BadRequest(String::from("query parameter 'geozip' is required"))
    })?;
    let geozip: i64 = geozip.trim().parse().map_err(|_| {
        ApiError::BadRequest(ValidationError::InvalidGeozip { value: geozip.clone() }.to_string())
    })?;

    if codes.is_empty() {
        return Err(ApiError::BadRequest(String::from(
            "at least one 'code' query parameter is required",
        )));
    }

    LookupKey::new(geozip, codes, modifier, product)
        .map_err(|error| ApiError::BadRequest(error.to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::body::Body;
    use axum::http::Request;
    use ratebench_core::{Percentiles, RateRow};
    use ratebench_store::StoreConfig;
    use std::time::Duration;
    use tempfile::TempDir;
    use tower::ServiceExt;

    fn seeded_state(temp: &TempDir) -> (AppState, Arc<Store>) {
        let store = Arc::new(
            Store::create(StoreConfig::at(temp.path().join("rates.duckdb"))).expect("store"),
        );
        store
            .replace_rates(&[
                RateRow {
                    geozip: 75001,
                    code: String::from("99213"),
                    modifier: None,
                    product: String::from("PPO"),
                    description: String::from("Office visit"),
                    percentiles: Percentiles {
                        p80: Some(120.0),
                        ..Percentiles::default()
                    },
                    source_file: String::from("seed.csv"),
                },
                RateRow {
                    geozip: 75001,
                    code: String::from("99213"),
                    modifier: None,
                    product: String::from("HMO"),
                    description: String::from("Office visit"),
                    percentiles: Percentiles {
                        p80: Some(110.0),
                        ..Percentiles::default()
                    },
                    source_file: String::from("seed.csv"),
                },
            ])
            .expect("seed rows");

        let ui_path = temp.path().join("index.html");
        std::fs::write(&ui_path, "<html>lookup</html>").expect("write ui");
        (AppState::new(Arc::clone(&store), ui_path), store)
    }

    async fn get_json(state: AppState, uri: &str) -> (StatusCode, serde_json::Value) {
        let response = router(state)
            .oneshot(Request::builder().uri(uri).body(Body::empty()).expect("request"))
            .await
            .expect("response");
        let status = response.status();
        let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .expect("body");
        let value = serde_json::from_slice(&bytes).expect("json body");
        (status, value)
    }

    #[tokio::test]
    async fn lookup_requires_geozip_and_codes() {
        let temp = tempfile::tempdir().expect("tempdir");
        let (state, _) = seeded_state(&temp);

        let (status, body) = get_json(state.clone(), "/lookup?code=99213").await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert!(body["detail"].as_str().expect("detail").contains("geozip"));

        let (status, _) = get_json(state, "/lookup?geozip=75001").await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
    }

    #[tokio::test]
    async fn batch_lookup_answers_200_with_placeholders_embedded() {
        let temp = tempfile::tempdir().expect("tempdir");
        let (state, _) = seeded_state(&temp);

        let (status, body) =
            get_json(state, "/lookup?geozip=75001&code=99213&code=99499&product=PPO").await;

        assert_eq!(status, StatusCode::OK);
        let entries = body.as_array().expect("array response");
        assert_eq!(entries.len(), 2);
        assert_eq!(entries[0]["match_type"], "Base rate (no modifier)");
        assert_eq!(entries[1]["match_type"], "No match found");
        assert_eq!(entries[1]["80th"], "");
    }

    #[tokio::test]
    async fn unfiltered_lookup_returns_products_in_sorted_order() {
        let temp = tempfile::tempdir().expect("tempdir");
        let (state, _) = seeded_state(&temp);

        let (status, body) = get_json(state, "/lookup?geozip=75001&code=99213").await;

        assert_eq!(status, StatusCode::OK);
        let entries = body.as_array().expect("array response");
        assert_eq!(entries.len(), 2);
        assert_eq!(entries[0]["product"], "HMO");
        assert_eq!(entries[1]["product"], "PPO");
    }

    #[tokio::test]
    async fn lookup_writes_audit_entries_through_the_writer() {
        let temp = tempfile::tempdir().expect("tempdir");
        let (state, store) = seeded_state(&temp);

        let (status, _) = get_json(state, "/lookup?geozip=75001&code=99213&code=99499").await;
        assert_eq!(status, StatusCode::OK);

        // The writer thread appends asynchronously; poll briefly.
        let mut entries = Vec::new();
        for _ in 0..50 {
            entries = store.log_entries().expect("log entries");
            if entries.len() == 3 {
                break;
            }
            tokio::time::sleep(Duration::from_millis(50)).await;
        }
        assert_eq!(entries.len(), 3, "expected 3 audit entries");
        assert!(entries[0].success);
        assert!(!entries[2].success);
    }

    #[tokio::test]
    async fn missing_ui_document_is_a_server_error() {
        let temp = tempfile::tempdir().expect("tempdir");
        let (state, _) = seeded_state(&temp);
        std::fs::remove_file(temp.path().join("index.html")).expect("remove ui");

        let (status, body) = get_json(state, "/").await;
        assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
        assert_eq!(body["detail"], "UI file not found");
    }

    #[tokio::test]
    async fn ui_document_is_served_at_root() {
        let temp = tempfile::tempdir().expect("tempdir");
        let (state, _) = seeded_state(&temp);

        let response = router(state)
            .oneshot(Request::builder().uri("/").body(Body::empty()).expect("request"))
            .await
            .expect("response");
        assert_eq!(response.status(), StatusCode::OK);
        let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .expect("body");
        assert_eq!(bytes.as_ref(), b"<html>lookup</html>");
    }
}
