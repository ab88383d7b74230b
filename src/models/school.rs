//! School roster model: classes, their subject requirements, and teachers.
//!
//! These are the inputs of every generation request. They carry no
//! engine-owned state and are supplied fresh per request.

use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;

/// A subject a class must be taught, with its weekly period count.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SubjectRequirement {
    /// Subject name (e.g., "Maths").
    pub name: String,
    /// Periods per week (must be > 0).
    pub periods_per_week: u32,
}

/// A class (student group) with an ordered list of subject requirements.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SchoolClass {
    /// Unique class name (e.g., "10A").
    pub name: String,
    /// Required subjects, in caller order.
    #[serde(default)]
    pub subjects: Vec<SubjectRequirement>,
}

/// A teacher and the subjects they are qualified to teach.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Teacher {
    /// Unique teacher name.
    pub name: String,
    /// Qualified subjects.
    #[serde(default)]
    pub subjects: BTreeSet<String>,
}

impl SubjectRequirement {
    /// Creates a subject requirement.
    pub fn new(name: impl Into<String>, periods_per_week: u32) -> Self {
        Self {
            name: name.into(),
            periods_per_week,
        }
    }
}

impl SchoolClass {
    /// Creates a class with no subjects.
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            subjects: Vec::new(),
        }
    }

    /// Adds a subject requirement.
    pub fn with_subject(mut self, name: impl Into<String>, periods_per_week: u32) -> Self {
        self.subjects
            .push(SubjectRequirement::new(name, periods_per_week));
        self
    }

    /// Total periods per week across all subjects.
    ///
    /// Summed as `u64`, so any number of `u32` requirements fits.
    pub fn weekly_periods(&self) -> u64 {
        self.subjects
            .iter()
            .map(|s| u64::from(s.periods_per_week))
            .sum()
    }

    /// Requirement for a subject, if the class takes it.
    pub fn requirement(&self, subject: &str) -> Option<&SubjectRequirement> {
        self.subjects.iter().find(|s| s.name == subject)
    }
}

impl Teacher {
    /// Creates a teacher with no qualifications.
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            subjects: BTreeSet::new(),
        }
    }

    /// Adds a qualified subject.
    pub fn with_subject(mut self, subject: impl Into<String>) -> Self {
        self.subjects.insert(subject.into());
        self
    }

    /// Adds several qualified subjects.
    pub fn with_subjects<I, S>(mut self, subjects: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.subjects.extend(subjects.into_iter().map(Into::into));
        self
    }

    /// Whether the teacher can teach the subject.
    #[inline]
    pub fn can_teach(&self, subject: &str) -> bool {
        self.subjects.contains(subject)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_class_builder() {
        let c = SchoolClass::new("10A")
            .with_subject("Maths", 5)
            .with_subject("Science", 4);
        assert_eq!(c.subjects.len(), 2);
        assert_eq!(c.weekly_periods(), 9);
        assert_eq!(c.requirement("Science").map(|r| r.periods_per_week), Some(4));
        assert!(c.requirement("Art").is_none());
    }

    #[test]
    fn test_weekly_periods_past_u32() {
        let c = SchoolClass::new("10A")
            .with_subject("Maths", u32::MAX)
            .with_subject("Art", 1);
        assert_eq!(c.weekly_periods(), u64::from(u32::MAX) + 1);
    }

    #[test]
    fn test_teacher_qualifications() {
        let t = Teacher::new("Mr. X").with_subjects(["Maths", "Science", "Maths"]);
        assert_eq!(t.subjects.len(), 2);
        assert!(t.can_teach("Maths"));
        assert!(!t.can_teach("Art"));
    }

    #[test]
    fn test_wire_shape() {
        let json = r#"{"name":"10A","subjects":[{"name":"Maths","periodsPerWeek":5}]}"#;
        let c: SchoolClass = serde_json::from_str(json).unwrap();
        assert_eq!(c.subjects[0].periods_per_week, 5);

        let t: Teacher = serde_json::from_str(r#"{"name":"Ms. Y"}"#).unwrap();
        assert!(t.subjects.is_empty());
    }
}
