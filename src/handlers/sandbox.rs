//! Calibration sandbox handlers

use axum::extract::{Multipart, State};
use axum::Json;
use serde::Serialize;

use crate::logic::calibration::{self, CalibrationSummary};
use crate::models::LedgerEntry;
use crate::{AppError, AppResult, AppState};

/// Response contract for `POST /sandbox/train`.
#[derive(Debug, Serialize)]
pub struct TrainResponse {
    pub results: CalibrationSummary,
    pub hash: String,
    pub legal_log: LedgerEntry,
}

/// Accept a ground-truth CSV, search for improved thresholds, and seal
/// the calibration run in the legal ledger.
pub async fn train(
    State(state): State<AppState>,
    mut multipart: Multipart,
) -> AppResult<Json<TrainResponse>> {
    let mut csv_bytes = None;
    while let Some(field) = multipart
        .next_field()
        .await
        .map_err(|err| AppError::MalformedInput(err.to_string()))?
    {
        if field.name() == Some("file") {
            let bytes = field
                .bytes()
                .await
                .map_err(|err| AppError::MalformedInput(err.to_string()))?;
            csv_bytes = Some(bytes);
            break;
        }
    }
    let csv_bytes = csv_bytes
        .ok_or_else(|| AppError::MalformedInput("multipart field 'file' is required".to_string()))?;

    let outcome = calibration::run_calibration(&state.store, &state.calibration, &csv_bytes)?;

    let hash = outcome.entry.hash.to_hex();
    Ok(Json(TrainResponse {
        results: outcome.summary,
        hash,
        legal_log: outcome.entry,
    }))
}
