//! Ground-truth calibration: CSV ingestion, scoring, search, sealing.
//!
//! Everything before the ledger append is pure; the append is the only
//! side effect, so an abandoned or failed run leaves no record and a
//! sealed record always has a verifiable hash.

use serde::Serialize;
use serde_json::json;
use sha2::{Digest, Sha256};
use thiserror::Error;

use crate::logic::ledger::{LedgerError, LedgerStore};
use crate::logic::scoring;
use crate::logic::search::{self, GridSpec};
use crate::models::{EventType, LedgerEntry, Sample, ThresholdPair};

/// Columns every ground-truth upload must carry. `model_score` is the
/// model output recorded when the sample was taken; scores are never
/// synthesized from the observed density.
pub const REQUIRED_COLUMNS: [&str; 4] = [
    "latitude",
    "longitude",
    "observed_cyanobacteria_density",
    "model_score",
];

#[derive(Debug, Error)]
pub enum CalibrationError {
    #[error("csv is not valid utf-8")]
    NotUtf8,
    #[error("csv is missing required columns: {0}")]
    MissingColumns(String),
    #[error("csv line {line}: {reason}")]
    InvalidRow { line: usize, reason: String },
    #[error("csv contains no data rows")]
    EmptyBatch,
    #[error("search grid yields no candidate threshold pairs")]
    DegenerateGrid,
    #[error(transparent)]
    Ledger(#[from] LedgerError),
}

/// Explicit calibration configuration; passed in per request so runs
/// against different configurations stay reproducible in isolation.
#[derive(Debug, Clone, Copy)]
pub struct CalibrationConfig {
    /// Currently active thresholds, scored for the baseline F1.
    pub active: ThresholdPair,
    /// Observed density at or above which a sample counts as a bloom.
    /// A fixed domain constant, not tuned by the search.
    pub bloom_density_cutoff: f64,
    pub grid: GridSpec,
}

/// Result payload sealed into the CALIBRATION ledger entry and echoed
/// to the caller.
#[derive(Debug, Clone, Serialize)]
pub struct CalibrationSummary {
    pub current_f1: f64,
    pub new_f1: f64,
    pub recommended_tier1_threshold: f64,
    pub recommended_tier2_threshold: f64,
    pub sample_count: usize,
    /// SHA-256 of the raw uploaded bytes, for provenance.
    pub source_digest: String,
}

/// A completed, sealed calibration run.
#[derive(Debug, Clone)]
pub struct CalibrationOutcome {
    pub summary: CalibrationSummary,
    pub entry: LedgerEntry,
}

/// Parse an uploaded ground-truth CSV.
///
/// The whole batch is rejected on the first schema or parse failure; a
/// partially ingested batch would make the sealed record
/// uninterpretable as evidence.
pub fn parse_ground_truth(bytes: &[u8]) -> Result<Vec<Sample>, CalibrationError> {
    let text = std::str::from_utf8(bytes).map_err(|_| CalibrationError::NotUtf8)?;
    let mut lines = text.lines().enumerate();

    let header = loop {
        match lines.next() {
            Some((_, line)) if line.trim().is_empty() => continue,
            Some((_, line)) => break line,
            None => return Err(CalibrationError::MissingColumns(REQUIRED_COLUMNS.join(", "))),
        }
    };
    let columns: Vec<&str> = header.split(',').map(str::trim).collect();
    let mut indices = [0usize; 4];
    let mut missing = Vec::new();
    for (slot, name) in indices.iter_mut().zip(REQUIRED_COLUMNS) {
        match columns.iter().position(|column| *column == name) {
            Some(index) => *slot = index,
            None => missing.push(name),
        }
    }
    if !missing.is_empty() {
        return Err(CalibrationError::MissingColumns(missing.join(", ")));
    }
    let [lat_index, lon_index, density_index, score_index] = indices;

    let mut samples = Vec::new();
    for (index, line) in lines {
        if line.trim().is_empty() {
            continue;
        }
        let fields: Vec<&str> = line.split(',').map(str::trim).collect();
        let line_no = index + 1;
        let field = |column: usize, name: &str| -> Result<f64, CalibrationError> {
            fields
                .get(column)
                .ok_or_else(|| CalibrationError::InvalidRow {
                    line: line_no,
                    reason: format!("missing {name}"),
                })?
                .parse::<f64>()
                .map_err(|_| CalibrationError::InvalidRow {
                    line: line_no,
                    reason: format!("{name} is not numeric"),
                })
        };
        samples.push(Sample {
            latitude: field(lat_index, "latitude")?,
            longitude: field(lon_index, "longitude")?,
            observed_density: field(density_index, "observed_cyanobacteria_density")?,
            model_score: field(score_index, "model_score")?,
        });
    }
    if samples.is_empty() {
        return Err(CalibrationError::EmptyBatch);
    }
    Ok(samples)
}

/// Full calibration run: parse, baseline score, search, seal.
///
/// Exactly one ledger entry per successful run. If the append fails the
/// whole operation fails; an unlogged calibration result has no legal
/// standing and is never returned.
pub fn run_calibration(
    store: &LedgerStore,
    config: &CalibrationConfig,
    csv_bytes: &[u8],
) -> Result<CalibrationOutcome, CalibrationError> {
    let samples = parse_ground_truth(csv_bytes)?;
    let score = |sample: &Sample| sample.model_score;

    let baseline = scoring::evaluate(&samples, &config.active, config.bloom_density_cutoff, score);
    let found = search::search(&samples, &config.grid, config.bloom_density_cutoff, score)
        .ok_or(CalibrationError::DegenerateGrid)?;

    let summary = CalibrationSummary {
        current_f1: baseline.f1,
        new_f1: found.metrics.f1,
        recommended_tier1_threshold: found.thresholds.tier1,
        recommended_tier2_threshold: found.thresholds.tier2,
        sample_count: samples.len(),
        source_digest: hex::encode(Sha256::digest(csv_bytes)),
    };
    let payload = json!({
        "current_f1": summary.current_f1,
        "new_f1": summary.new_f1,
        "recommended_tier1_threshold": summary.recommended_tier1_threshold,
        "recommended_tier2_threshold": summary.recommended_tier2_threshold,
        "sample_count": summary.sample_count,
        "source_digest": summary.source_digest,
    });
    let entry = store.append(EventType::Calibration, payload)?;

    tracing::info!(
        sequence = entry.sequence,
        samples = summary.sample_count,
        current_f1 = summary.current_f1,
        new_f1 = summary.new_f1,
        "calibration sealed"
    );
    Ok(CalibrationOutcome { summary, entry })
}
