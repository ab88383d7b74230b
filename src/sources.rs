//! Roster import.
//!
//! Turns external roster files into the engine's input shape.
//!
//! | Source | Format |
//! |--------|--------|
//! | Classes CSV | `class,subject,periods_per_week`, one row per requirement |
//! | Teachers CSV | `teacher,subjects`, subjects separated by `;` |
//! | JSON | `{ "classes": [...], "teachers": [...] }` as in a generation request |
//!
//! Rows for the same class (or teacher) are merged in first-seen order.

use log::debug;
use serde::{Deserialize, Serialize};
use std::fs::File;
use std::io::Read;
use std::path::{Path, PathBuf};
use thiserror::Error;

use crate::models::{GenerationRequest, SchoolClass, SubjectRequirement, Teacher};

/// Errors raised while reading a roster.
#[derive(Debug, Error)]
pub enum SourceError {
    /// The file could not be opened or read.
    #[error("failed to read {}: {source}", path.display())]
    Io {
        /// Offending path.
        path: PathBuf,
        /// Underlying error.
        source: std::io::Error,
    },

    /// Malformed CSV.
    #[error(transparent)]
    Csv(#[from] csv::Error),

    /// Malformed JSON.
    #[error(transparent)]
    Json(#[from] serde_json::Error),

    /// A row parsed but its content is unusable.
    #[error("row {row}: {reason}")]
    InvalidRow {
        /// 1-based data row number.
        row: usize,
        /// What is wrong with it.
        reason: String,
    },
}

/// Classes and teachers of one school.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Roster {
    /// Classes with their subject requirements.
    #[serde(default)]
    pub classes: Vec<SchoolClass>,
    /// Teachers with their qualifications.
    #[serde(default)]
    pub teachers: Vec<Teacher>,
}

impl Roster {
    /// Builds a generation request over the given week.
    pub fn into_request<I, S>(self, days: I, periods_per_day: u32) -> GenerationRequest
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        GenerationRequest::new(self.classes, self.teachers, days, periods_per_day)
    }
}

/// Something a roster can be loaded from.
pub trait RosterSource {
    /// Loads the roster.
    fn load(&self) -> Result<Roster, SourceError>;
}

/// A roster split over a classes CSV and a teachers CSV.
#[derive(Debug, Clone)]
pub struct CsvRoster {
    classes: PathBuf,
    teachers: PathBuf,
}

impl CsvRoster {
    /// Creates a source from the two file paths.
    pub fn new(classes: impl Into<PathBuf>, teachers: impl Into<PathBuf>) -> Self {
        Self {
            classes: classes.into(),
            teachers: teachers.into(),
        }
    }
}

impl RosterSource for CsvRoster {
    fn load(&self) -> Result<Roster, SourceError> {
        let classes = read_classes(open(&self.classes)?)?;
        let teachers = read_teachers(open(&self.teachers)?)?;
        debug!(
            "Loaded {} classes from {} and {} teachers from {}",
            classes.len(),
            self.classes.display(),
            teachers.len(),
            self.teachers.display()
        );
        Ok(Roster { classes, teachers })
    }
}

/// A roster in one JSON document.
#[derive(Debug, Clone)]
pub struct JsonRoster {
    path: PathBuf,
}

impl JsonRoster {
    /// Creates a source from a file path.
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }
}

impl RosterSource for JsonRoster {
    fn load(&self) -> Result<Roster, SourceError> {
        let roster: Roster = serde_json::from_reader(open(&self.path)?)?;
        debug!(
            "Loaded {} classes and {} teachers from {}",
            roster.classes.len(),
            roster.teachers.len(),
            self.path.display()
        );
        Ok(roster)
    }
}

fn open(path: &Path) -> Result<File, SourceError> {
    File::open(path).map_err(|source| SourceError::Io {
        path: path.to_path_buf(),
        source,
    })
}

/// Reads classes from `class,subject,periods_per_week` CSV.
///
/// # Errors
/// `InvalidRow` for a zero period count or a subject listed twice for the
/// same class.
///
/// # Example
/// ```
/// use u_timetable::sources::read_classes;
///
/// let csv = "class,subject,periods_per_week\n10A,Maths,5\n10A,Science,4\n10B,Maths,5\n";
/// let classes = read_classes(csv.as_bytes()).unwrap();
/// assert_eq!(classes.len(), 2);
/// assert_eq!(classes[0].weekly_periods(), 9);
/// ```
pub fn read_classes<R: Read>(reader: R) -> Result<Vec<SchoolClass>, SourceError> {
    #[derive(Deserialize)]
    struct ClassRow {
        class: String,
        subject: String,
        periods_per_week: u32,
    }

    let mut reader = csv::ReaderBuilder::new().trim(csv::Trim::All).from_reader(reader);
    let mut classes: Vec<SchoolClass> = Vec::new();

    for (i, result) in reader.deserialize::<ClassRow>().enumerate() {
        let row = result?;
        let invalid = |reason: String| SourceError::InvalidRow { row: i + 1, reason };

        if row.periods_per_week == 0 {
            return Err(invalid(format!(
                "'{}' for class '{}' has zero periods per week",
                row.subject, row.class
            )));
        }

        let index = match classes.iter().position(|c| c.name == row.class) {
            Some(index) => index,
            None => {
                classes.push(SchoolClass::new(row.class.clone()));
                classes.len() - 1
            }
        };
        let class = &mut classes[index];
        if class.requirement(&row.subject).is_some() {
            return Err(invalid(format!(
                "'{}' is listed twice for class '{}'",
                row.subject, row.class
            )));
        }
        class
            .subjects
            .push(SubjectRequirement::new(row.subject, row.periods_per_week));
    }
    Ok(classes)
}

/// Reads teachers from `teacher,subjects` CSV (subjects separated by `;`).
///
/// # Example
/// ```
/// use u_timetable::sources::read_teachers;
///
/// let csv = "teacher,subjects\nMr. X,Maths; Science\nMs. Y,\n";
/// let teachers = read_teachers(csv.as_bytes()).unwrap();
/// assert!(teachers[0].can_teach("Science"));
/// assert!(teachers[1].subjects.is_empty());
/// ```
pub fn read_teachers<R: Read>(reader: R) -> Result<Vec<Teacher>, SourceError> {
    #[derive(Deserialize)]
    struct TeacherRow {
        teacher: String,
        #[serde(default)]
        subjects: String,
    }

    let mut reader = csv::ReaderBuilder::new().trim(csv::Trim::All).from_reader(reader);
    let mut teachers: Vec<Teacher> = Vec::new();

    for (i, result) in reader.deserialize::<TeacherRow>().enumerate() {
        let row = result?;
        if row.teacher.is_empty() {
            return Err(SourceError::InvalidRow {
                row: i + 1,
                reason: "missing teacher name".to_string(),
            });
        }

        let subjects = row
            .subjects
            .split(';')
            .map(str::trim)
            .filter(|s| !s.is_empty())
            .map(str::to_string);
        match teachers.iter_mut().find(|t| t.name == row.teacher) {
            Some(existing) => existing.subjects.extend(subjects),
            None => teachers.push(Teacher::new(row.teacher).with_subjects(subjects)),
        }
    }
    Ok(teachers)
}
