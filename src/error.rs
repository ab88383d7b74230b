//! Hard errors raised by the engine.
//!
//! Expected unsatisfiability is never an error: validation problems and
//! unplaceable demand come back as structured [`GenerationOutcome`]s.
//! `EngineError` covers contract violations (malformed input), rejected
//! manual edits, cancellation, job lookups and worker panics.
//!
//! [`GenerationOutcome`]: crate::generator::GenerationOutcome

use thiserror::Error;

/// Engine error.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum EngineError {
    /// The request shape violates the input contract.
    #[error("malformed input: {0}")]
    MalformedInput(String),

    /// A referenced class is not part of the timetable.
    #[error("unknown class '{0}'")]
    UnknownClass(String),

    /// A referenced day is not part of the timetable.
    #[error("unknown day '{0}'")]
    UnknownDay(String),

    /// A 1-based period outside `1..=periods_per_day`.
    #[error("period {period} is out of range 1..={periods_per_day}")]
    PeriodOutOfRange {
        /// Requested period (1-based).
        period: u32,
        /// Periods per day of the timetable.
        periods_per_day: u32,
    },

    /// A referenced teacher is not on the roster.
    #[error("unknown teacher '{0}'")]
    UnknownTeacher(String),

    /// The teacher is not qualified for the subject.
    #[error("teacher '{teacher}' is not qualified to teach '{subject}'")]
    UnqualifiedTeacher {
        /// Teacher name.
        teacher: String,
        /// Subject name.
        subject: String,
    },

    /// A subject without a teacher, or a teacher without a subject.
    #[error("slot {class}/{day}/{period} must set subject and teacher together")]
    OrphanAssignment {
        /// Class name.
        class: String,
        /// Day name.
        day: String,
        /// Period (1-based).
        period: u32,
    },

    /// The edit would double-book a teacher.
    #[error("teacher '{teacher}' already teaches '{other_class}' on {day} period {period}")]
    SlotConflict {
        /// Double-booked teacher.
        teacher: String,
        /// Day name.
        day: String,
        /// Period (1-based).
        period: u32,
        /// Class already holding the teacher at that time.
        other_class: String,
    },

    /// Generation was cancelled by the caller.
    #[error("generation cancelled")]
    Cancelled,

    /// No job with the given ID.
    #[error("unknown job '{0}'")]
    UnknownJob(String),

    /// The job has no timetable to edit (still running, failed, or cancelled).
    #[error("job '{0}' has no timetable")]
    JobNotReady(String),

    /// The generation worker panicked.
    #[error("generation worker failed: {0}")]
    WorkerFailed(String),
}

impl EngineError {
    /// Machine-readable code for UI branching.
    pub fn code(&self) -> &'static str {
        match self {
            Self::MalformedInput(_) => "MALFORMED_INPUT",
            Self::UnknownClass(_) => "UNKNOWN_CLASS",
            Self::UnknownDay(_) => "UNKNOWN_DAY",
            Self::PeriodOutOfRange { .. } => "PERIOD_OUT_OF_RANGE",
            Self::UnknownTeacher(_) => "UNKNOWN_TEACHER",
            Self::UnqualifiedTeacher { .. } => "UNQUALIFIED_TEACHER",
            Self::OrphanAssignment { .. } => "ORPHAN_ASSIGNMENT",
            Self::SlotConflict { .. } => "SLOT_CONFLICT",
            Self::Cancelled => "CANCELLED",
            Self::UnknownJob(_) => "UNKNOWN_JOB",
            Self::JobNotReady(_) => "JOB_NOT_READY",
            Self::WorkerFailed(_) => "WORKER_FAILED",
        }
    }
}
