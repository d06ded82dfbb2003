//! Legal ledger handlers

use axum::extract::State;
use axum::Json;

use crate::models::{ChainReport, LegalLogSummary};
use crate::{AppResult, AppState};

/// List every sealed entry in ascending append order; the dashboard
/// reverses for newest-first display.
pub async fn list(State(state): State<AppState>) -> AppResult<Json<Vec<LegalLogSummary>>> {
    let summaries = state.store.list().iter().map(LegalLogSummary::from).collect();
    Ok(Json(summaries))
}

/// Walk the whole chain and report the first broken link, if any. A
/// finding is surfaced for auditors, never repaired.
pub async fn verify(State(state): State<AppState>) -> AppResult<Json<ChainReport>> {
    let report = state.store.verify_chain();
    if !report.valid {
        tracing::warn!(
            first_broken_sequence = ?report.first_broken_sequence,
            "ledger chain failed verification"
        );
    }
    Ok(Json(report))
}
