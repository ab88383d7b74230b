//! Wire shapes for callers speaking JSON.
//!
//! Field names are camelCase. A generation response flattens the
//! timetable into the top level:
//!
//! ```json
//! { "success": true, "classes": [...], "days": [...], "periodsPerDay": 6,
//!   "timeSlots": [...], "quality": {...}, "warnings": [...], "unsatisfied": [] }
//! ```

use serde::{Deserialize, Serialize};

use crate::error::EngineError;
use crate::generator::{GenerationOutcome, SearchStats, UnsatisfiedDemand};
use crate::models::{SlotRef, Timetable};
use crate::quality::QualityReport;
use crate::validation::{ValidationIssue, ValidationReport};

/// Response of a validation call: `{ valid, errors, warnings }`.
pub type ValidationResponse = ValidationReport;

/// Response of a generation call.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct GenerationResponse {
    /// Whether a timetable was produced.
    pub success: bool,
    /// The timetable (`classes`, `days`, `periodsPerDay`, `timeSlots`).
    #[serde(flatten)]
    pub timetable: Option<Timetable>,
    /// Quality analysis.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub quality: Option<QualityReport>,
    /// Fatal issues.
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub errors: Vec<ValidationIssue>,
    /// Non-fatal issues.
    pub warnings: Vec<ValidationIssue>,
    /// Demand left unplaced.
    pub unsatisfied: Vec<UnsatisfiedDemand>,
    /// Shuffle seed, for replaying the run.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub seed: Option<u64>,
    /// Search statistics.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub stats: Option<SearchStats>,
}

impl From<GenerationOutcome> for GenerationResponse {
    fn from(outcome: GenerationOutcome) -> Self {
        match outcome {
            GenerationOutcome::Generated(g) => Self {
                success: true,
                timetable: Some(g.timetable),
                quality: Some(g.quality),
                errors: Vec::new(),
                warnings: g.warnings,
                unsatisfied: g.unsatisfied,
                seed: g.seed,
                stats: Some(g.stats),
            },
            GenerationOutcome::Failed(f) => Self {
                success: false,
                timetable: None,
                quality: None,
                errors: f.errors,
                warnings: f.warnings,
                unsatisfied: f.unsatisfied,
                seed: None,
                stats: None,
            },
        }
    }
}

/// Request body of a swap: `{ slotA, slotB }`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SwapRequest {
    /// First slot.
    pub slot_a: SlotRef,
    /// Second slot.
    pub slot_b: SlotRef,
}

/// Request body of a progress poll: `{ jobId }`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProgressRequest {
    /// Job to poll.
    pub job_id: String,
}

/// Response of a job start: `{ jobId }`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct JobStarted {
    /// ID of the started job.
    pub job_id: String,
}

/// A hard error as `{ code, message }`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ErrorResponse {
    /// Machine-readable code.
    pub code: String,
    /// Human-readable message.
    pub message: String,
}

impl From<&EngineError> for ErrorResponse {
    fn from(err: &EngineError) -> Self {
        Self {
            code: err.code().to_string(),
            message: err.to_string(),
        }
    }
}
