//! Generation request and options.

use serde::{Deserialize, Serialize};
use std::collections::HashSet;

use super::{SchoolClass, Teacher, Timetable};
use crate::error::EngineError;

/// Toggles for a generation run.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct GenerationOptions {
    /// Return the best partial timetable instead of failing when demand
    /// cannot be fully placed. Teachers are still never double-booked.
    pub allow_conflicts: bool,
    /// Prefer slots not adjacent to the same subject on the same day.
    pub avoid_consecutive_same_subject: bool,
    /// Randomise the order of equally ranked candidates.
    pub shuffle_assignments: bool,
    /// Prefer the teacher already teaching the class/subject pair.
    pub prefer_same_teacher: bool,
    /// Seed for `shuffle_assignments`. Drawn at random when absent.
    pub seed: Option<u64>,
}

/// Everything the engine needs for one generation (or validation) call.
///
/// # Example
/// ```
/// use u_timetable::models::{GenerationRequest, SchoolClass, Teacher};
///
/// let request = GenerationRequest::new(
///     vec![SchoolClass::new("10A").with_subject("Maths", 5)],
///     vec![Teacher::new("Mr. X").with_subject("Maths")],
///     ["Mon", "Tue", "Wed", "Thu", "Fri"],
///     2,
/// );
/// assert_eq!(request.slots_per_week(), 10);
/// assert!(request.check_shape().is_ok());
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GenerationRequest {
    /// Classes to timetable.
    pub classes: Vec<SchoolClass>,
    /// Teacher roster.
    pub teachers: Vec<Teacher>,
    /// Ordered, distinct day names.
    pub days: Vec<String>,
    /// Periods per day (> 0).
    pub periods_per_day: u32,
    /// Optional period labels (one per period).
    #[serde(default)]
    pub period_labels: Option<Vec<String>>,
    /// Run options.
    #[serde(default)]
    pub options: GenerationOptions,
}

impl GenerationRequest {
    /// Creates a request with default options.
    pub fn new<I, S>(
        classes: Vec<SchoolClass>,
        teachers: Vec<Teacher>,
        days: I,
        periods_per_day: u32,
    ) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            classes,
            teachers,
            days: days.into_iter().map(Into::into).collect(),
            periods_per_day,
            period_labels: None,
            options: GenerationOptions::default(),
        }
    }

    /// Sets run options.
    pub fn with_options(mut self, options: GenerationOptions) -> Self {
        self.options = options;
        self
    }

    /// Sets period labels.
    pub fn with_period_labels<I, S>(mut self, labels: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.period_labels = Some(labels.into_iter().map(Into::into).collect());
        self
    }

    /// Cells in one class grid (`days × periods_per_day`).
    #[inline]
    pub fn slots_per_week(&self) -> u64 {
        self.days.len() as u64 * u64::from(self.periods_per_day)
    }

    /// Period labels, falling back to "Period N".
    pub fn time_slots(&self) -> Vec<String> {
        self.period_labels
            .clone()
            .unwrap_or_else(|| Timetable::default_time_slots(self.periods_per_day))
    }

    /// Checks the input contract.
    ///
    /// These are caller bugs rather than scheduling problems, so they are
    /// reported as a hard error instead of validation issues.
    pub fn check_shape(&self) -> Result<(), EngineError> {
        if self.days.is_empty() {
            return Err(EngineError::MalformedInput("no days given".into()));
        }
        if self.periods_per_day == 0 {
            return Err(EngineError::MalformedInput(
                "periodsPerDay must be positive".into(),
            ));
        }
        if let Some(dup) = first_duplicate(self.days.iter().map(String::as_str)) {
            return Err(EngineError::MalformedInput(format!("duplicate day '{dup}'")));
        }
        if let Some(labels) = &self.period_labels {
            if labels.len() != self.periods_per_day as usize {
                return Err(EngineError::MalformedInput(format!(
                    "{} period labels given for {} periods per day",
                    labels.len(),
                    self.periods_per_day
                )));
            }
        }
        if let Some(dup) = first_duplicate(self.classes.iter().map(|c| c.name.as_str())) {
            return Err(EngineError::MalformedInput(format!("duplicate class '{dup}'")));
        }
        if let Some(dup) = first_duplicate(self.teachers.iter().map(|t| t.name.as_str())) {
            return Err(EngineError::MalformedInput(format!(
                "duplicate teacher '{dup}'"
            )));
        }
        for class in &self.classes {
            if let Some(dup) = first_duplicate(class.subjects.iter().map(|s| s.name.as_str())) {
                return Err(EngineError::MalformedInput(format!(
                    "class '{}' lists subject '{dup}' twice",
                    class.name
                )));
            }
            if let Some(zero) = class.subjects.iter().find(|s| s.periods_per_week == 0) {
                return Err(EngineError::MalformedInput(format!(
                    "class '{}' requests zero periods of '{}'",
                    class.name, zero.name
                )));
            }
        }
        Ok(())
    }
}

fn first_duplicate<'a>(names: impl Iterator<Item = &'a str>) -> Option<&'a str> {
    let mut seen = HashSet::new();
    names.into_iter().find(|name| !seen.insert(*name))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn base() -> GenerationRequest {
        GenerationRequest::new(
            vec![SchoolClass::new("10A").with_subject("Maths", 2)],
            vec![Teacher::new("Mr. X").with_subject("Maths")],
            ["Mon", "Tue"],
            2,
        )
    }

    #[test]
    fn test_valid_shape() {
        assert!(base().check_shape().is_ok());
        assert_eq!(base().time_slots(), vec!["Period 1", "Period 2"]);
    }

    #[test]
    fn test_duplicate_day() {
        let mut r = base();
        r.days.push("Mon".into());
        assert_eq!(
            r.check_shape(),
            Err(EngineError::MalformedInput("duplicate day 'Mon'".into()))
        );
    }

    #[test]
    fn test_no_days_or_periods() {
        let mut r = base();
        r.days.clear();
        assert!(r.check_shape().is_err());

        let mut r = base();
        r.periods_per_day = 0;
        assert!(r.check_shape().is_err());
    }

    #[test]
    fn test_duplicate_names() {
        let mut r = base();
        r.classes.push(SchoolClass::new("10A"));
        assert!(r.check_shape().is_err());

        let mut r = base();
        r.teachers.push(Teacher::new("Mr. X"));
        assert!(r.check_shape().is_err());

        let mut r = base();
        r.classes[0] = SchoolClass::new("10A")
            .with_subject("Maths", 1)
            .with_subject("Maths", 1);
        assert!(r.check_shape().is_err());
    }

    #[test]
    fn test_zero_periods_per_week() {
        let mut r = base();
        r.classes[0] = SchoolClass::new("10A").with_subject("Maths", 0);
        assert!(r.check_shape().is_err());
    }

    #[test]
    fn test_period_labels() {
        let r = base().with_period_labels(["08:00", "09:00"]);
        assert!(r.check_shape().is_ok());
        assert_eq!(r.time_slots(), vec!["08:00", "09:00"]);

        let r = base().with_period_labels(["08:00"]);
        assert!(r.check_shape().is_err());
    }

    #[test]
    fn test_options_default_when_missing() {
        let json = r#"{
            "classes": [],
            "teachers": [],
            "days": ["Mon"],
            "periodsPerDay": 1
        }"#;
        let r: GenerationRequest = serde_json::from_str(json).unwrap();
        assert_eq!(r.options, GenerationOptions::default());

        let json = r#"{"shuffleAssignments": true, "seed": 7}"#;
        let o: GenerationOptions = serde_json::from_str(json).unwrap();
        assert!(o.shuffle_assignments);
        assert!(!o.allow_conflicts);
        assert_eq!(o.seed, Some(7));
    }
}
