//! Input validation for timetable generation.
//!
//! Runs before the assignment algorithm and detects inputs that make a
//! complete timetable impossible (errors) or likely to be poor (warnings).
//!
//! Errors:
//! - Classes without subjects
//! - Subjects nobody is qualified to teach
//! - Classes needing more periods than the week has
//! - Teacher pools that cannot supply the demand placed on them
//!
//! Warnings:
//! - Teachers qualified for nothing that is taught
//! - Predicted uneven teacher load
//! - Subjects that cannot be spread one-per-day
//! - Teacher pools booked close to capacity
//!
//! The pool check is a Hall-style necessary condition: for a subject with
//! teacher pool `P`, every subject whose pool lies inside `P` must be
//! covered by `|P| × slots_per_week` periods.
//!
//! # Reference
//! Hall (1935), "On Representatives of Subsets", J. London Math. Soc. 10

use log::debug;
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet};

use crate::config::ValidationThresholds;
use crate::error::EngineError;
use crate::models::GenerationRequest;

/// Outcome of validation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ValidationReport {
    /// `true` when there are no errors.
    pub valid: bool,
    /// Problems that halt generation.
    pub errors: Vec<ValidationIssue>,
    /// Problems that only lower quality.
    pub warnings: Vec<ValidationIssue>,
}

/// A single validation finding.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ValidationIssue {
    /// Machine-readable category.
    pub code: IssueCode,
    /// Human-readable description.
    pub message: String,
    /// Suggested fix.
    pub suggestion: String,
}

/// Categories of validation findings.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum IssueCode {
    /// A class has no subjects.
    NoSubjects,
    /// A required subject has no qualified teacher.
    NoTeacherForSubject,
    /// A class needs more periods than `days × periods_per_day`.
    OvercommittedSchedule,
    /// A teacher pool cannot cover the periods demanded from it.
    TeacherCapacityExceeded,
    /// Demand left unplaced after the search budget ran out.
    UnsatisfiableDemand,
    /// A teacher is qualified for no required subject.
    UnusedTeacher,
    /// Predicted teacher loads differ widely.
    UnevenTeacherLoad,
    /// A subject must repeat on some day.
    UnevenSubjectSpread,
    /// A teacher pool is booked close to capacity.
    HighTeacherDemand,
}

impl ValidationIssue {
    pub(crate) fn new(
        code: IssueCode,
        message: impl Into<String>,
        suggestion: impl Into<String>,
    ) -> Self {
        Self {
            code,
            message: message.into(),
            suggestion: suggestion.into(),
        }
    }
}

impl ValidationReport {
    fn from_parts(errors: Vec<ValidationIssue>, warnings: Vec<ValidationIssue>) -> Self {
        Self {
            valid: errors.is_empty(),
            errors,
            warnings,
        }
    }

    /// Whether any error or warning has the given code.
    pub fn has(&self, code: IssueCode) -> bool {
        self.errors
            .iter()
            .chain(&self.warnings)
            .any(|i| i.code == code)
    }
}

/// Validates a request with default thresholds.
///
/// # Errors
/// `EngineError::MalformedInput` if the request breaks the input contract
/// (see [`GenerationRequest::check_shape`]).
pub fn validate(request: &GenerationRequest) -> Result<ValidationReport, EngineError> {
    validate_with(request, &ValidationThresholds::default())
}

/// Validates a request.
///
/// Checks:
/// 1. Every class has at least one subject
/// 2. Every required subject has a qualified teacher
/// 3. No class needs more periods than the week holds
/// 4. No teacher pool is asked for more than it can give
///    (a warning instead of an error when `allowConflicts` is set)
/// 5. Warnings: spread, unused teachers, high demand, uneven load
pub fn validate_with(
    request: &GenerationRequest,
    thresholds: &ValidationThresholds,
) -> Result<ValidationReport, EngineError> {
    request.check_shape()?;

    let mut errors = Vec::new();
    let mut warnings = Vec::new();
    let capacity = request.slots_per_week();
    let day_count = request.days.len() as u32;

    // Teacher pool per subject (teacher indices)
    let mut pools: BTreeMap<&str, BTreeSet<usize>> = BTreeMap::new();
    // Weekly demand per subject across all classes
    let mut demand: BTreeMap<&str, u64> = BTreeMap::new();

    for class in &request.classes {
        if class.subjects.is_empty() {
            errors.push(ValidationIssue::new(
                IssueCode::NoSubjects,
                format!("Class '{}' has no subjects", class.name),
                format!("Add at least one subject to '{}' or remove the class", class.name),
            ));
        }

        for subject in &class.subjects {
            let pool = pools.entry(subject.name.as_str()).or_insert_with(|| {
                request
                    .teachers
                    .iter()
                    .enumerate()
                    .filter(|(_, t)| t.can_teach(&subject.name))
                    .map(|(i, _)| i)
                    .collect()
            });
            if pool.is_empty() {
                errors.push(ValidationIssue::new(
                    IssueCode::NoTeacherForSubject,
                    format!(
                        "No teacher is qualified to teach '{}' for class '{}'",
                        subject.name, class.name
                    ),
                    format!("Add a teacher qualified for '{}'", subject.name),
                ));
            }
            *demand.entry(subject.name.as_str()).or_insert(0) +=
                u64::from(subject.periods_per_week);

            if subject.periods_per_week > day_count && subject.periods_per_week % day_count != 0 {
                warnings.push(ValidationIssue::new(
                    IssueCode::UnevenSubjectSpread,
                    format!(
                        "'{}' in class '{}' needs {} periods over {} days; some days will repeat it",
                        subject.name, class.name, subject.periods_per_week, day_count
                    ),
                    format!(
                        "Use a multiple of {day_count} periods per week for '{}'",
                        subject.name
                    ),
                ));
            }
        }

        let weekly = class.weekly_periods();
        if weekly > capacity {
            errors.push(ValidationIssue::new(
                IssueCode::OvercommittedSchedule,
                format!(
                    "Class '{}' needs {} periods per week but only {} slots exist",
                    class.name, weekly, capacity
                ),
                format!(
                    "Reduce periods per week for '{}' by {} or add days/periods",
                    class.name,
                    weekly - capacity
                ),
            ));
        }
    }

    check_pool_capacity(
        request,
        &pools,
        &demand,
        thresholds.high_demand_share,
        &mut errors,
        &mut warnings,
    );

    for teacher in &request.teachers {
        if !teacher.subjects.iter().any(|s| demand.contains_key(s.as_str())) {
            warnings.push(ValidationIssue::new(
                IssueCode::UnusedTeacher,
                format!("Teacher '{}' is not qualified for any required subject", teacher.name),
                format!("Check the subjects listed for '{}'", teacher.name),
            ));
        }
    }

    if let Some(issue) = predict_uneven_load(request, &pools, &demand, thresholds.uneven_load_ratio)
    {
        warnings.push(issue);
    }

    let report = ValidationReport::from_parts(errors, warnings);
    debug!(
        "Validated {} classes, {} teachers: {} errors, {} warnings",
        request.classes.len(),
        request.teachers.len(),
        report.errors.len(),
        report.warnings.len()
    );
    Ok(report)
}

/// Compares each distinct teacher pool's capacity against the demand of
/// every subject that can only be taught from within that pool.
fn check_pool_capacity(
    request: &GenerationRequest,
    pools: &BTreeMap<&str, BTreeSet<usize>>,
    demand: &BTreeMap<&str, u64>,
    high_demand_share: f64,
    errors: &mut Vec<ValidationIssue>,
    warnings: &mut Vec<ValidationIssue>,
) {
    let mut checked: BTreeSet<&BTreeSet<usize>> = BTreeSet::new();

    for pool in pools.values() {
        if pool.is_empty() || !checked.insert(pool) {
            continue;
        }

        let covered: Vec<&str> = pools
            .iter()
            .filter(|(_, p)| !p.is_empty() && p.is_subset(pool))
            .map(|(s, _)| *s)
            .collect();
        let needed: u64 = covered.iter().map(|s| demand[s]).sum();
        let available = (pool.len() as u64).saturating_mul(request.slots_per_week());
        let names = pool
            .iter()
            .map(|&i| request.teachers[i].name.as_str())
            .collect::<Vec<_>>()
            .join(", ");
        let subjects = covered.join(", ");

        if needed > available {
            let issue = ValidationIssue::new(
                IssueCode::TeacherCapacityExceeded,
                format!(
                    "Teachers [{names}] can give {available} periods per week but [{subjects}] need {needed}"
                ),
                format!(
                    "Reduce periods per week of [{subjects}] by {} or add a qualified teacher",
                    needed - available
                ),
            );
            if request.options.allow_conflicts {
                warnings.push(issue);
            } else {
                errors.push(issue);
            }
        } else if available > 0 && needed as f64 >= high_demand_share * available as f64 {
            warnings.push(ValidationIssue::new(
                IssueCode::HighTeacherDemand,
                format!(
                    "Teachers [{names}] are booked for {needed} of {available} periods per week by [{subjects}]"
                ),
                format!("Consider adding a teacher qualified for [{subjects}]"),
            ));
        }
    }
}

/// Splits each subject's demand evenly over its pool and compares the
/// heaviest and lightest predicted loads.
fn predict_uneven_load(
    request: &GenerationRequest,
    pools: &BTreeMap<&str, BTreeSet<usize>>,
    demand: &BTreeMap<&str, u64>,
    max_ratio: f64,
) -> Option<ValidationIssue> {
    let mut predicted = vec![0.0_f64; request.teachers.len()];
    for (subject, pool) in pools {
        if pool.is_empty() {
            continue;
        }
        let share = demand[subject] as f64 / pool.len() as f64;
        for &t in pool {
            predicted[t] += share;
        }
    }

    let loaded: Vec<(usize, f64)> = predicted
        .into_iter()
        .enumerate()
        .filter(|(_, load)| *load > 0.0)
        .collect();
    if loaded.len() < 2 {
        return None;
    }

    let (max_t, max_load) = loaded
        .iter()
        .copied()
        .fold((0, f64::MIN), |acc, x| if x.1 > acc.1 { x } else { acc });
    let (min_t, min_load) = loaded
        .iter()
        .copied()
        .fold((0, f64::MAX), |acc, x| if x.1 < acc.1 { x } else { acc });

    if max_load / min_load <= max_ratio {
        return None;
    }

    Some(ValidationIssue::new(
        IssueCode::UnevenTeacherLoad,
        format!(
            "Predicted load ranges from {:.1} periods ('{}') to {:.1} periods ('{}')",
            min_load, request.teachers[min_t].name, max_load, request.teachers[max_t].name
        ),
        format!(
            "Qualify more teachers for the subjects '{}' teaches",
            request.teachers[max_t].name
        ),
    ))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{GenerationOptions, SchoolClass, Teacher};

    const WEEK: [&str; 5] = ["Mon", "Tue", "Wed", "Thu", "Fri"];

    fn request(classes: Vec<SchoolClass>, teachers: Vec<Teacher>, ppd: u32) -> GenerationRequest {
        GenerationRequest::new(classes, teachers, WEEK, ppd)
    }

    #[test]
    fn test_valid_input() {
        let r = request(
            vec![SchoolClass::new("10A")
                .with_subject("Maths", 5)
                .with_subject("Science", 5)],
            vec![Teacher::new("Mr. X").with_subjects(["Maths", "Science"])],
            2,
        );
        let report = validate(&r).unwrap();
        assert!(report.valid);
        assert!(report.errors.is_empty());
    }

    #[test]
    fn test_no_subjects() {
        let r = request(
            vec![SchoolClass::new("10A")],
            vec![Teacher::new("Mr. X").with_subject("Maths")],
            2,
        );
        let report = validate(&r).unwrap();
        assert!(!report.valid);
        assert_eq!(report.errors[0].code, IssueCode::NoSubjects);
        // Nothing is required, so the teacher is idle
        assert!(report.has(IssueCode::UnusedTeacher));
    }

    #[test]
    fn test_no_teacher_for_subject() {
        let r = request(
            vec![SchoolClass::new("10A").with_subject("Art", 2)],
            vec![Teacher::new("Mr. X").with_subject("Maths")],
            2,
        );
        let report = validate(&r).unwrap();
        let issue = report
            .errors
            .iter()
            .find(|e| e.code == IssueCode::NoTeacherForSubject)
            .unwrap();
        assert!(issue.message.contains("'Art'"));
        assert!(issue.suggestion.contains("Art"));
    }

    #[test]
    fn test_overcommitted_schedule() {
        let r = request(
            vec![SchoolClass::new("10A")
                .with_subject("Maths", 6)
                .with_subject("Science", 5)],
            vec![
                Teacher::new("Mr. X").with_subject("Maths"),
                Teacher::new("Ms. Y").with_subject("Science"),
            ],
            2,
        );
        let report = validate(&r).unwrap();
        let issue = report
            .errors
            .iter()
            .find(|e| e.code == IssueCode::OvercommittedSchedule)
            .unwrap();
        assert!(issue.message.contains("11"));
        assert!(issue.suggestion.contains("by 1"));
    }

    #[test]
    fn test_huge_period_counts_do_not_overflow() {
        let r = GenerationRequest::new(
            vec![SchoolClass::new("10A")
                .with_subject("Maths", 3_000_000_000)
                .with_subject("Art", 3_000_000_000)],
            vec![
                Teacher::new("Mr. X").with_subject("Maths"),
                Teacher::new("Ms. Y").with_subject("Art"),
            ],
            ["Mon", "Tue"],
            5,
        );
        let report = validate(&r).unwrap();
        assert!(!report.valid);

        let overcommitted = report
            .errors
            .iter()
            .find(|e| e.code == IssueCode::OvercommittedSchedule)
            .unwrap();
        assert!(overcommitted.message.contains("6000000000"));
        assert!(report
            .errors
            .iter()
            .any(|e| e.code == IssueCode::TeacherCapacityExceeded
                && e.message.contains("3000000000")));
    }

    #[test]
    fn test_shared_teacher_exactly_full_warns() {
        // Two classes, five Maths each, one Maths teacher, ten slots: it fits,
        // but only just.
        let r = request(
            vec![
                SchoolClass::new("10A").with_subject("Maths", 5),
                SchoolClass::new("10B").with_subject("Maths", 5),
            ],
            vec![Teacher::new("Mr. X").with_subject("Maths")],
            2,
        );
        let report = validate(&r).unwrap();
        assert!(report.valid);
        assert!(report.has(IssueCode::HighTeacherDemand));
    }

    #[test]
    fn test_teacher_capacity_exceeded() {
        let r = request(
            vec![
                SchoolClass::new("10A").with_subject("Maths", 6),
                SchoolClass::new("10B").with_subject("Maths", 6),
            ],
            vec![Teacher::new("Mr. X").with_subject("Maths")],
            2,
        );
        let report = validate(&r).unwrap();
        assert!(!report.valid);
        let issue = &report.errors[0];
        assert_eq!(issue.code, IssueCode::TeacherCapacityExceeded);
        assert!(issue.message.contains("need 12"));
        assert!(issue.suggestion.contains("by 2"));
    }

    #[test]
    fn test_capacity_counts_shared_subjects() {
        // Each subject alone fits, together they do not.
        let r = request(
            vec![
                SchoolClass::new("10A").with_subject("Maths", 6),
                SchoolClass::new("10B").with_subject("Science", 6),
            ],
            vec![Teacher::new("Mr. X").with_subjects(["Maths", "Science"])],
            2,
        );
        let report = validate(&r).unwrap();
        assert!(report
            .errors
            .iter()
            .any(|e| e.code == IssueCode::TeacherCapacityExceeded));
    }

    #[test]
    fn test_capacity_downgraded_when_conflicts_allowed() {
        let r = request(
            vec![
                SchoolClass::new("10A").with_subject("Maths", 6),
                SchoolClass::new("10B").with_subject("Maths", 6),
            ],
            vec![Teacher::new("Mr. X").with_subject("Maths")],
            2,
        )
        .with_options(GenerationOptions {
            allow_conflicts: true,
            ..Default::default()
        });
        let report = validate(&r).unwrap();
        assert!(report.valid);
        assert!(report
            .warnings
            .iter()
            .any(|w| w.code == IssueCode::TeacherCapacityExceeded));
    }

    #[test]
    fn test_unused_teacher_is_warning() {
        let r = request(
            vec![SchoolClass::new("10A").with_subject("Maths", 2)],
            vec![
                Teacher::new("Mr. X").with_subject("Maths"),
                Teacher::new("Ms. Art").with_subject("Art"),
                Teacher::new("Nobody"),
            ],
            2,
        );
        let report = validate(&r).unwrap();
        assert!(report.valid);
        let unused: Vec<_> = report
            .warnings
            .iter()
            .filter(|w| w.code == IssueCode::UnusedTeacher)
            .collect();
        assert_eq!(unused.len(), 2);
    }

    #[test]
    fn test_uneven_subject_spread() {
        let r = request(
            vec![SchoolClass::new("10A")
                .with_subject("Maths", 7)
                .with_subject("Science", 10)
                .with_subject("Art", 3)],
            vec![Teacher::new("Mr. X").with_subjects(["Maths", "Science", "Art"])],
            4,
        );
        let report = validate(&r).unwrap();
        let spread: Vec<_> = report
            .warnings
            .iter()
            .filter(|w| w.code == IssueCode::UnevenSubjectSpread)
            .collect();
        // 7 over 5 days repeats unevenly; 10 divides evenly; 3 fits one per day
        assert_eq!(spread.len(), 1);
        assert!(spread[0].message.contains("'Maths'"));
    }

    #[test]
    fn test_uneven_teacher_load() {
        let r = request(
            vec![SchoolClass::new("10A")
                .with_subject("Maths", 8)
                .with_subject("Art", 1)],
            vec![
                Teacher::new("Mr. X").with_subject("Maths"),
                Teacher::new("Ms. Y").with_subject("Art"),
            ],
            2,
        );
        let report = validate(&r).unwrap();
        let issue = report
            .warnings
            .iter()
            .find(|w| w.code == IssueCode::UnevenTeacherLoad)
            .unwrap();
        assert!(issue.message.contains("'Mr. X'"));
    }

    #[test]
    fn test_malformed_input_is_error() {
        let r = request(vec![], vec![], 0);
        assert!(matches!(validate(&r), Err(EngineError::MalformedInput(_))));
    }

    #[test]
    fn test_issue_code_wire_format() {
        let json = serde_json::to_string(&IssueCode::NoTeacherForSubject).unwrap();
        assert_eq!(json, r#""NO_TEACHER_FOR_SUBJECT""#);
    }

    #[test]
    fn test_multiple_errors() {
        let r = request(
            vec![
                SchoolClass::new("empty"),
                SchoolClass::new("10A").with_subject("Art", 20),
            ],
            vec![],
            2,
        );
        let report = validate(&r).unwrap();
        assert!(report.errors.len() >= 3);
    }
}
