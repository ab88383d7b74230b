//! Timetable quality metrics.
//!
//! Scores a timetable against the class requirements and teacher roster
//! it was built from. Read-only; every metric is on a 0..100 scale.
//!
//! # Metrics
//!
//! | Metric | Definition |
//! |--------|-----------|
//! | Teacher workload balance | 100 × (1 − min(1, cv)) over teachers with lessons |
//! | Subject distribution | 100 × (1 − same-day repeats / lessons) |
//! | Constraint satisfaction | placed / requested periods × 100 |
//! | Free periods | empty cells / total cells × 100 |
//! | Overall | weighted mean of the above, free periods entering as utilisation |
//!
//! `cv` is the coefficient of variation (population standard deviation over
//! mean). Placed periods are capped per class/subject at the requirement.
//!
//! # Reference
//! Burke & Petrovic (2002), "Recent research directions in automated
//! timetabling", European Journal of Operational Research 140(2)

use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashMap};

use crate::config::QualityConfig;
use crate::models::{SchoolClass, Teacher, Timetable};

/// Quality analysis of one timetable.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct QualityReport {
    /// Weighted overall score.
    pub overall_score: f64,
    /// Letter grade of the overall score.
    pub grade: String,
    /// How evenly lessons are spread over teachers.
    pub teacher_workload_balance: f64,
    /// How well subjects avoid repeating on the same day.
    pub subject_distribution: f64,
    /// Share of requested periods that were placed.
    pub constraint_satisfaction: f64,
    /// Share of cells left empty.
    pub free_periods: f64,
    /// Raw figures behind the scores.
    pub details: QualityDetails,
}

/// Raw figures behind a [`QualityReport`].
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct QualityDetails {
    /// Assigned periods per teacher; every rostered teacher is listed.
    pub teacher_loads: BTreeMap<String, u32>,
    /// Teachers with no assigned period.
    pub idle_teachers: Vec<String>,
    /// Subjects taught more than once on the same day.
    pub same_day_repeats: Vec<SameDayRepeat>,
    /// Periods placed (capped at each requirement).
    pub placed_units: u32,
    /// Periods requested.
    pub requested_units: u32,
    /// Cells across all class grids.
    pub total_cells: usize,
    /// Empty cells across all class grids.
    pub empty_cells: usize,
}

/// A subject occurring `count` (> 1) times in one class on one day.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SameDayRepeat {
    /// Class name.
    pub class: String,
    /// Day name.
    pub day: String,
    /// Subject name.
    pub subject: String,
    /// Lessons of the subject that day.
    pub count: u32,
}

/// Computes [`QualityReport`]s.
///
/// # Example
///
/// ```
/// use u_timetable::config::QualityConfig;
/// use u_timetable::models::{SchoolClass, Teacher, Timetable};
/// use u_timetable::quality::QualityScorer;
///
/// let classes = vec![SchoolClass::new("10A").with_subject("Maths", 2)];
/// let teachers = vec![Teacher::new("Mr. X").with_subject("Maths")];
/// let grid = Timetable::empty(
///     &["10A".to_string()],
///     &["Mon".to_string()],
///     2,
///     Timetable::default_time_slots(2),
/// );
///
/// let report = QualityScorer::new(QualityConfig::default()).score(&grid, &classes, &teachers);
/// assert_eq!(report.constraint_satisfaction, 0.0);
/// assert_eq!(report.free_periods, 100.0);
/// assert_eq!(report.details.idle_teachers, vec!["Mr. X"]);
/// ```
#[derive(Debug, Clone, Default)]
pub struct QualityScorer {
    config: QualityConfig,
}

impl QualityScorer {
    /// Creates a scorer.
    pub fn new(config: QualityConfig) -> Self {
        Self { config }
    }

    /// Scores a timetable.
    ///
    /// # Arguments
    /// * `timetable` - The grid to score.
    /// * `classes` - Class requirements (for satisfaction).
    /// * `teachers` - The roster (for idle teachers).
    pub fn score(
        &self,
        timetable: &Timetable,
        classes: &[SchoolClass],
        teachers: &[Teacher],
    ) -> QualityReport {
        let mut teacher_loads: BTreeMap<String, u32> =
            teachers.iter().map(|t| (t.name.clone(), 0)).collect();
        for (teacher, load) in timetable.teacher_loads() {
            teacher_loads.insert(teacher, load);
        }
        let idle_teachers: Vec<String> = teachers
            .iter()
            .filter(|t| teacher_loads.get(&t.name).is_some_and(|&l| l == 0))
            .map(|t| t.name.clone())
            .collect();
        let teacher_workload_balance = workload_balance(&teacher_loads);

        let (same_day_repeats, repeats, lessons) = same_day_repeats(timetable);
        let subject_distribution = if lessons == 0 {
            100.0
        } else {
            100.0 * (1.0 - repeats as f64 / lessons as f64)
        };

        let (placed_units, requested_units) = satisfaction_counts(timetable, classes);
        let constraint_satisfaction = if requested_units == 0 {
            100.0
        } else {
            placed_units as f64 / requested_units as f64 * 100.0
        };

        let total_cells = timetable.cell_count();
        let empty_cells: usize = timetable.classes.iter().map(|c| c.empty_count()).sum();
        let free_periods = if total_cells == 0 {
            0.0
        } else {
            empty_cells as f64 / total_cells as f64 * 100.0
        };

        let w = &self.config.weights;
        let total_weight = w.total();
        let overall_score = if total_weight > 0.0 {
            (w.teacher_workload_balance * teacher_workload_balance
                + w.subject_distribution * subject_distribution
                + w.constraint_satisfaction * constraint_satisfaction
                + w.utilisation * (100.0 - free_periods))
                / total_weight
        } else {
            0.0
        };

        QualityReport {
            overall_score,
            grade: self.config.bands.grade(overall_score).to_string(),
            teacher_workload_balance,
            subject_distribution,
            constraint_satisfaction,
            free_periods,
            details: QualityDetails {
                teacher_loads,
                idle_teachers,
                same_day_repeats,
                placed_units,
                requested_units,
                total_cells,
                empty_cells,
            },
        }
    }
}

fn workload_balance(loads: &BTreeMap<String, u32>) -> f64 {
    let active: Vec<f64> = loads
        .values()
        .filter(|&&l| l > 0)
        .map(|&l| l as f64)
        .collect();
    if active.len() <= 1 {
        return 100.0;
    }

    let n = active.len() as f64;
    let mean = active.iter().sum::<f64>() / n;
    let variance = active.iter().map(|l| (l - mean).powi(2)).sum::<f64>() / n;
    let cv = variance.sqrt() / mean;
    100.0 * (1.0 - cv.min(1.0))
}

/// Returns the repeats found, their total excess, and the lesson count.
fn same_day_repeats(timetable: &Timetable) -> (Vec<SameDayRepeat>, u32, u32) {
    let mut found = Vec::new();
    let mut excess = 0;
    let mut lessons = 0;

    for class in &timetable.classes {
        for day in &class.days {
            // Keep first-seen order within the day
            let mut counts: Vec<(&str, u32)> = Vec::new();
            for subject in day.slots.iter().filter_map(|s| s.subject.as_deref()) {
                lessons += 1;
                match counts.iter_mut().find(|(s, _)| *s == subject) {
                    Some((_, c)) => *c += 1,
                    None => counts.push((subject, 1)),
                }
            }
            for (subject, count) in counts.into_iter().filter(|(_, c)| *c > 1) {
                excess += count - 1;
                found.push(SameDayRepeat {
                    class: class.name.clone(),
                    day: day.day.clone(),
                    subject: subject.to_string(),
                    count,
                });
            }
        }
    }
    (found, excess, lessons)
}

fn satisfaction_counts(timetable: &Timetable, classes: &[SchoolClass]) -> (u32, u32) {
    let grids: HashMap<&str, _> = timetable
        .classes
        .iter()
        .map(|c| (c.name.as_str(), c))
        .collect();

    let mut placed = 0;
    let mut requested = 0;
    for class in classes {
        for req in &class.subjects {
            requested += req.periods_per_week;
            if let Some(grid) = grids.get(class.name.as_str()) {
                placed += grid.subject_count(&req.name).min(req.periods_per_week);
            }
        }
    }
    (placed, requested)
}
