//! Aqua-Sentinel Backend Server
//!
//! Chain-of-custody ledger and threshold-calibration service behind the
//! water-quality monitoring dashboard.
//!
//! # Architecture
//!
//! ```text
//! ┌────────────────────────────────────────────────────────────┐
//! │                  AQUA-SENTINEL BACKEND                     │
//! ├────────────────────────────────────────────────────────────┤
//! │  ┌───────────┐  ┌──────────────┐  ┌─────────────────────┐  │
//! │  │  API      │  │ Calibration  │  │  Legal Ledger       │  │
//! │  │  Gateway  │  │ Engine       │  │  (hash chain,       │  │
//! │  │  (Axum)   │  │ (F1 search)  │  │   append-only)      │  │
//! │  └─────┬─────┘  └──────┬───────┘  └──────────┬──────────┘  │
//! │        └───────────────┼─────────────────────┘             │
//! │                        ▼                                   │
//! │                 ┌─────────────┐                            │
//! │                 │ JSONL vault │                            │
//! │                 └─────────────┘                            │
//! └────────────────────────────────────────────────────────────┘
//! ```

mod config;
mod error;
mod handlers;
mod logic;
mod models;

use std::net::SocketAddr;
use std::sync::Arc;

use anyhow::Context;
use axum::routing::{get, post};
use axum::Router;
use tower_http::compression::CompressionLayer;
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;

use logic::calibration::CalibrationConfig;
use logic::ledger::LedgerStore;
use logic::search::GridSpec;
use models::ThresholdPair;

pub use error::{AppError, AppResult};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Initialize logging
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "aquasentinel_backend=debug,tower_http=debug".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    // Load configuration
    dotenvy::dotenv().ok();
    let config = config::Config::from_env();

    tracing::info!("Aqua-Sentinel backend starting...");

    // Open the legal ledger
    let store = match &config.ledger_path {
        Some(path) => {
            tracing::info!("Ledger file: {}", path.display());
            LedgerStore::open(path).context("failed to open ledger store")?
        }
        None => {
            tracing::warn!("LEDGER_PATH not set - legal ledger is volatile");
            LedgerStore::in_memory()
        }
    };

    // Startup audit finding; a broken chain is reported, never repaired
    let report = store.verify_chain();
    if report.valid {
        tracing::info!(entries = store.len(), "ledger chain verified");
    } else {
        tracing::error!(
            first_broken_sequence = ?report.first_broken_sequence,
            "ledger chain FAILED verification"
        );
    }

    // Build application state
    let active = ThresholdPair::new(config.tier1_threshold, config.tier2_threshold)
        .context("invalid active thresholds")?;
    let state = AppState {
        store: Arc::new(store),
        calibration: CalibrationConfig {
            active,
            bloom_density_cutoff: config.bloom_density_cutoff,
            grid: GridSpec {
                start: config.grid_start,
                stop: config.grid_stop,
                step: config.grid_step,
            },
        },
    };

    // Build router
    let app = create_router(state);

    // Start server
    let addr = SocketAddr::from(([0, 0, 0, 0], config.port));
    tracing::info!("Server listening on http://{}", addr);

    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .context("failed to bind listener")?;
    axum::serve(listener, app).await.context("server error")?;
    Ok(())
}

/// Shared application state
#[derive(Clone)]
pub struct AppState {
    pub store: Arc<LedgerStore>,
    pub calibration: CalibrationConfig,
}

/// Create the main router with all routes
fn create_router(state: AppState) -> Router {
    Router::new()
        .route("/health", get(handlers::health::check))
        .route("/sandbox/train", post(handlers::sandbox::train))
        .route("/legal-logs", get(handlers::legal_logs::list))
        .route("/legal-logs/verify", get(handlers::legal_logs::verify))
        .route("/detections", post(handlers::detections::report))
        .layer(CompressionLayer::new())
        .layer(TraceLayer::new_for_http())
        .layer(
            CorsLayer::new()
                .allow_origin(Any)
                .allow_methods(Any)
                .allow_headers(Any),
        )
        .with_state(state)
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::body::Body;
    use axum::http::{header, Request, StatusCode};
    use tower::util::ServiceExt;

    fn test_state() -> AppState {
        AppState {
            store: Arc::new(LedgerStore::in_memory()),
            calibration: CalibrationConfig {
                active: ThresholdPair::new(0.85, 0.93).unwrap(),
                bloom_density_cutoff: 10.0,
                grid: GridSpec::default(),
            },
        }
    }

    fn multipart_csv(csv: &str) -> (String, Vec<u8>) {
        let boundary = "aqua-test-boundary";
        let body = format!(
            "--{boundary}\r\n\
             Content-Disposition: form-data; name=\"file\"; filename=\"truth.csv\"\r\n\
             Content-Type: text/csv\r\n\r\n\
             {csv}\r\n\
             --{boundary}--\r\n"
        );
        (
            format!("multipart/form-data; boundary={boundary}"),
            body.into_bytes(),
        )
    }

    async fn body_json(response: axum::response::Response) -> serde_json::Value {
        let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .unwrap();
        serde_json::from_slice(&bytes).unwrap()
    }

    #[tokio::test]
    async fn test_health_check() {
        let response = create_router(test_state())
            .oneshot(Request::builder().uri("/health").body(Body::empty()).unwrap())
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        let json = body_json(response).await;
        assert_eq!(json["status"], "healthy");
    }

    #[tokio::test]
    async fn test_train_seals_calibration_and_lists_it() {
        let state = test_state();
        let csv = "latitude,longitude,observed_cyanobacteria_density,model_score\n\
                   44.10,-72.50,25.0,0.90\n\
                   44.11,-72.51,18.0,0.80\n\
                   44.12,-72.52,4.0,0.30\n\
                   44.13,-72.53,3.0,0.20\n\
                   44.14,-72.54,1.5,0.10\n";
        let (content_type, body) = multipart_csv(csv);

        let response = create_router(state.clone())
            .oneshot(
                Request::builder()
                    .method("POST")
                    .uri("/sandbox/train")
                    .header(header::CONTENT_TYPE, content_type)
                    .body(Body::from(body))
                    .unwrap(),
            )
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);

        let json = body_json(response).await;
        assert_eq!(json["results"]["new_f1"].as_f64().unwrap(), 1.0);
        assert_eq!(json["results"]["sample_count"].as_u64().unwrap(), 5);
        assert_eq!(json["legal_log"]["sequence"].as_u64().unwrap(), 0);
        assert_eq!(json["hash"], json["legal_log"]["hash"]);

        // genesis-anchored chain of length 1
        assert_eq!(state.store.len(), 1);
        assert!(state.store.verify_chain().valid);

        let response = create_router(state)
            .oneshot(
                Request::builder()
                    .uri("/legal-logs")
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();
        let json = body_json(response).await;
        let rows = json.as_array().unwrap();
        assert_eq!(rows.len(), 1);
        assert_eq!(rows[0]["event_type"], "CALIBRATION");
        assert!(rows[0]["hash"].is_string());
        assert!(rows[0]["timestamp"].is_string());
    }

    #[tokio::test]
    async fn test_train_rejects_missing_column_without_append() {
        let state = test_state();
        let csv = "latitude,observed_cyanobacteria_density,model_score\n44.1,25.0,0.9\n";
        let (content_type, body) = multipart_csv(csv);

        let response = create_router(state.clone())
            .oneshot(
                Request::builder()
                    .method("POST")
                    .uri("/sandbox/train")
                    .header(header::CONTENT_TYPE, content_type)
                    .body(Body::from(body))
                    .unwrap(),
            )
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
        assert!(state.store.is_empty());
    }

    #[tokio::test]
    async fn test_detection_is_classified_and_sealed() {
        let state = test_state();
        let response = create_router(state.clone())
            .oneshot(
                Request::builder()
                    .method("POST")
                    .uri("/detections")
                    .header(header::CONTENT_TYPE, "application/json")
                    .body(Body::from(
                        r#"{"latitude": 44.1, "longitude": -72.5, "score": 0.95}"#,
                    ))
                    .unwrap(),
            )
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);

        let json = body_json(response).await;
        assert_eq!(json["severity"], "Tier 2 (Confirmed)");
        assert_eq!(json["legal_log"]["event_type"], "DETECTION");
        assert_eq!(state.store.len(), 1);
    }

    #[tokio::test]
    async fn test_verify_endpoint_reports_clean_chain() {
        let state = test_state();
        let response = create_router(state)
            .oneshot(
                Request::builder()
                    .uri("/legal-logs/verify")
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        let json = body_json(response).await;
        assert_eq!(json["valid"], true);
        assert!(json["first_broken_sequence"].is_null());
    }
}
