//! Detection event handlers

use axum::extract::State;
use axum::Json;
use serde::{Deserialize, Serialize};
use serde_json::json;

use crate::models::{EventType, LedgerEntry, Severity};
use crate::{AppError, AppResult, AppState};

/// A detection produced by the upstream model, ready to be sealed.
#[derive(Debug, Deserialize)]
pub struct ReportDetection {
    pub latitude: f64,
    pub longitude: f64,
    /// Model bloom score in [0, 1].
    pub score: f64,
}

#[derive(Debug, Serialize)]
pub struct DetectionResponse {
    pub severity: Severity,
    pub hash: String,
    pub legal_log: LedgerEntry,
}

/// Classify an already-scored observation against the active thresholds
/// and seal it as a DETECTION ledger entry.
pub async fn report(
    State(state): State<AppState>,
    Json(req): Json<ReportDetection>,
) -> AppResult<Json<DetectionResponse>> {
    if !(0.0..=1.0).contains(&req.score) {
        return Err(AppError::MalformedInput(
            "score must be within [0, 1]".to_string(),
        ));
    }

    let severity = state.calibration.active.classify(req.score);
    let payload = json!({
        "latitude": req.latitude,
        "longitude": req.longitude,
        "score": req.score,
        "severity": severity.as_str(),
    });
    let entry = state
        .store
        .append(EventType::Detection, payload)
        .map_err(AppError::from)?;

    tracing::info!(
        sequence = entry.sequence,
        severity = severity.as_str(),
        "detection sealed"
    );
    let hash = entry.hash.to_hex();
    Ok(Json(DetectionResponse {
        severity,
        hash,
        legal_log: entry,
    }))
}
