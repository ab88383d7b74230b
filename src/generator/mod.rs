//! Timetable generation.
//!
//! [`Generator`] validates a request, expands it into demand units, runs a
//! budgeted backtracking search, and scores the result.
//!
//! # Phases
//!
//! | Progress | Step |
//! |----------|------|
//! | 0% | Validating input |
//! | 10% | Validation done |
//! | 20..90% | Placing lessons (every 10% of the deepest placement) |
//! | 100% | Quality scored |
//!
//! Expected unsatisfiability is reported as [`GenerationOutcome::Failed`],
//! never as an error.
//!
//! # References
//!
//! - Schaerf (1999), "A Survey of Automated Timetabling", Artificial
//!   Intelligence Review 13(2)
//! - Russell & Norvig (2020), "Artificial Intelligence: A Modern Approach", Ch. 6

mod demand;
mod progress;
mod search;

pub use progress::{CancelFlag, NoProgress, Progress, ProgressSink};

use log::{debug, info, warn};
use rand::{Rng, SeedableRng};
use rand_chacha::ChaCha8Rng;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

use crate::config::EngineConfig;
use crate::error::EngineError;
use crate::models::{GenerationRequest, Timetable};
use crate::quality::{QualityReport, QualityScorer};
use crate::validation::{validate_with, IssueCode, ValidationIssue};
use demand::Problem;
use search::Search;

/// Result of a generation run.
#[derive(Debug, Clone, PartialEq)]
pub enum GenerationOutcome {
    /// A timetable was produced (possibly partial with `allowConflicts`).
    Generated(GeneratedTimetable),
    /// No timetable could be produced.
    Failed(GenerationFailure),
}

/// A produced timetable and its analysis.
#[derive(Debug, Clone, PartialEq)]
pub struct GeneratedTimetable {
    /// The grid.
    pub timetable: Timetable,
    /// Quality analysis of the grid.
    pub quality: QualityReport,
    /// Validation warnings.
    pub warnings: Vec<ValidationIssue>,
    /// Demand left unplaced (empty unless `allowConflicts` was set).
    pub unsatisfied: Vec<UnsatisfiedDemand>,
    /// Seed used for shuffling, if shuffling was on.
    pub seed: Option<u64>,
    /// Search statistics.
    pub stats: SearchStats,
}

/// Why no timetable was produced.
#[derive(Debug, Clone, PartialEq)]
pub struct GenerationFailure {
    /// Fatal issues (validation errors or unsatisfiable demand).
    pub errors: Vec<ValidationIssue>,
    /// Non-fatal issues.
    pub warnings: Vec<ValidationIssue>,
    /// Demand that could not be placed (empty for validation failures).
    pub unsatisfied: Vec<UnsatisfiedDemand>,
}

/// Periods of a class/subject pair that could not be placed.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UnsatisfiedDemand {
    /// Class name.
    pub class: String,
    /// Subject name.
    pub subject: String,
    /// Periods still missing.
    pub remaining: u32,
}

/// Search statistics.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SearchStats {
    /// Demand units requested.
    pub units: usize,
    /// Undo steps taken.
    pub backtracks: usize,
    /// Whether the undo budget or search tree ran out.
    pub exhausted: bool,
}

impl GenerationOutcome {
    /// Whether a timetable was produced.
    pub fn is_generated(&self) -> bool {
        matches!(self, Self::Generated(_))
    }

    /// The generated timetable, if any.
    pub fn generated(&self) -> Option<&GeneratedTimetable> {
        match self {
            Self::Generated(g) => Some(g),
            Self::Failed(_) => None,
        }
    }

    /// The failure, if any.
    pub fn failure(&self) -> Option<&GenerationFailure> {
        match self {
            Self::Generated(_) => None,
            Self::Failed(f) => Some(f),
        }
    }
}

/// Timetable generator.
///
/// Stateless apart from its configuration; every call works on its own
/// copy of the data.
///
/// # Example
///
/// ```
/// use u_timetable::generator::Generator;
/// use u_timetable::models::{GenerationRequest, SchoolClass, Teacher};
///
/// let request = GenerationRequest::new(
///     vec![SchoolClass::new("10A").with_subject("Maths", 5).with_subject("Science", 5)],
///     vec![Teacher::new("Mr. X").with_subjects(["Maths", "Science"])],
///     ["Mon", "Tue", "Wed", "Thu", "Fri"],
///     2,
/// );
///
/// let outcome = Generator::new().generate(&request).unwrap();
/// let generated = outcome.generated().unwrap();
/// assert_eq!(generated.timetable.classes[0].subject_count("Maths"), 5);
/// assert_eq!(generated.quality.constraint_satisfaction, 100.0);
/// ```
#[derive(Debug, Clone, Default)]
pub struct Generator {
    config: EngineConfig,
}

impl Generator {
    /// Creates a generator with default configuration.
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets the configuration.
    pub fn with_config(mut self, config: EngineConfig) -> Self {
        self.config = config;
        self
    }

    /// The active configuration.
    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    /// Generates a timetable without progress reporting or cancellation.
    pub fn generate(&self, request: &GenerationRequest) -> Result<GenerationOutcome, EngineError> {
        self.generate_with(request, &NoProgress, &CancelFlag::new())
    }

    /// Generates a timetable.
    ///
    /// # Errors
    /// - `EngineError::MalformedInput` for requests breaking the input contract
    /// - `EngineError::Cancelled` when `cancel` is raised mid-search
    pub fn generate_with(
        &self,
        request: &GenerationRequest,
        sink: &dyn ProgressSink,
        cancel: &CancelFlag,
    ) -> Result<GenerationOutcome, EngineError> {
        sink.report(Progress::new(0, "Validating input"));
        let report = validate_with(request, &self.config.validation)?;
        if !report.valid {
            info!(
                "Generation rejected: {} validation errors",
                report.errors.len()
            );
            return Ok(GenerationOutcome::Failed(GenerationFailure {
                errors: report.errors,
                warnings: report.warnings,
                unsatisfied: Vec::new(),
            }));
        }
        sink.report(Progress::new(10, "Validation done"));

        let problem = Problem::build(request);
        let budget = self.config.backtrack_budget(problem.units.len());
        let options = &request.options;
        let seed = options
            .shuffle_assignments
            .then(|| options.seed.unwrap_or_else(|| rand::rng().random()));
        let rng = seed.map(ChaCha8Rng::seed_from_u64);

        info!(
            "Generating timetable: {} classes, {} teachers, {} lessons, {}x{} grid, budget {}",
            request.classes.len(),
            request.teachers.len(),
            problem.units.len(),
            problem.days,
            problem.periods,
            budget
        );

        let result = Search::new(&problem, options, budget, rng, cancel, sink).run()?;
        let stats = SearchStats {
            units: problem.units.len(),
            backtracks: result.backtracks,
            exhausted: result.exhausted,
        };
        debug!("Search finished: {stats:?}");

        let timetable = build_timetable(&problem, &result.placements);
        let unsatisfied = unsatisfied_demand(&problem, &result.placements);

        if !unsatisfied.is_empty() && !options.allow_conflicts {
            warn!(
                "Generation failed: {} class/subject pairs unsatisfied",
                unsatisfied.len()
            );
            return Ok(GenerationOutcome::Failed(GenerationFailure {
                errors: unsatisfied.iter().map(unsatisfied_issue).collect(),
                warnings: report.warnings,
                unsatisfied,
            }));
        }

        let quality = QualityScorer::new(self.config.quality.clone()).score(
            &timetable,
            &request.classes,
            &request.teachers,
        );
        sink.report(Progress::new(100, "Quality scored"));
        info!(
            "Timetable generated: score {:.1} ({}), {} backtracks",
            quality.overall_score, quality.grade, stats.backtracks
        );

        Ok(GenerationOutcome::Generated(GeneratedTimetable {
            timetable,
            quality,
            warnings: report.warnings,
            unsatisfied,
            seed,
            stats,
        }))
    }
}

fn build_timetable(problem: &Problem<'_>, placements: &[Option<search::Placement>]) -> Timetable {
    let request = problem.request;
    let class_names: Vec<String> = request.classes.iter().map(|c| c.name.clone()).collect();
    let mut timetable = Timetable::empty(
        &class_names,
        &request.days,
        request.periods_per_day,
        request.time_slots(),
    );

    for (unit, placement) in problem.units.iter().zip(placements) {
        if let Some((slot, teacher)) = *placement {
            let cell = timetable.slot_at_mut(unit.class, slot / problem.periods, slot % problem.periods);
            cell.subject = Some(problem.subjects[unit.subject].to_string());
            cell.teacher = Some(request.teachers[teacher].name.clone());
        }
    }
    timetable
}

fn unsatisfied_demand(
    problem: &Problem<'_>,
    placements: &[Option<search::Placement>],
) -> Vec<UnsatisfiedDemand> {
    let mut missing: BTreeMap<(usize, usize), u32> = BTreeMap::new();
    for (unit, placement) in problem.units.iter().zip(placements) {
        if placement.is_none() {
            *missing.entry((unit.class, unit.subject)).or_insert(0) += 1;
        }
    }

    // Report in request order
    problem
        .requirements
        .iter()
        .filter_map(|r| {
            missing.get(&(r.class, r.subject)).map(|&remaining| UnsatisfiedDemand {
                class: problem.request.classes[r.class].name.clone(),
                subject: problem.subjects[r.subject].to_string(),
                remaining,
            })
        })
        .collect()
}

fn unsatisfied_issue(demand: &UnsatisfiedDemand) -> ValidationIssue {
    ValidationIssue::new(
        IssueCode::UnsatisfiableDemand,
        format!(
            "Could not place {} period(s) of '{}' for class '{}' without double-booking a teacher",
            demand.remaining, demand.subject, demand.class
        ),
        format!(
            "Reduce periods per week of '{}' for '{}' or add a qualified teacher",
            demand.subject, demand.class
        ),
    )
}
