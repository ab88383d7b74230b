//! Timetable (solution) model.
//!
//! A timetable holds one dense `days × periods_per_day` grid of slots per
//! class. Slots are addressed externally by `(class, day name, period)`
//! with 1-based periods; internally by `(class, day, period)` indices.
//!
//! On the wire each class serialises as
//! `{ "name": ..., "timetable": { "<day>": [Slot, ...], ... } }` with days
//! kept in input order.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

use crate::error::EngineError;

/// A single (day, period) cell of a class grid.
///
/// Either both `subject` and `teacher` are set, or neither is.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Slot {
    /// Day name.
    pub day: String,
    /// Period number (1-based).
    pub period: u32,
    /// Assigned subject.
    pub subject: Option<String>,
    /// Assigned teacher.
    pub teacher: Option<String>,
}

/// One day row of a class grid.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DaySchedule {
    /// Day name.
    pub day: String,
    /// Slots ordered by period.
    pub slots: Vec<Slot>,
}

/// The grid of one class.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ClassTimetable {
    /// Class name.
    pub name: String,
    /// Day rows in day order.
    #[serde(rename = "timetable", with = "day_map")]
    pub days: Vec<DaySchedule>,
}

/// A complete timetable across all classes.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Timetable {
    /// Per-class grids, in request order.
    pub classes: Vec<ClassTimetable>,
    /// Day names (row axis).
    pub days: Vec<String>,
    /// Periods per day (column axis).
    pub periods_per_day: u32,
    /// Human-readable period labels, one per period.
    pub time_slots: Vec<String>,
}

/// External address of a slot.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SlotRef {
    /// Class name.
    pub class: String,
    /// Day name.
    pub day: String,
    /// Period (1-based).
    pub period: u32,
}

/// A teacher booked more than once at the same (day, period).
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DoubleBooking {
    /// Teacher name.
    pub teacher: String,
    /// Day name.
    pub day: String,
    /// Period (1-based).
    pub period: u32,
    /// Classes holding the teacher at that time.
    pub classes: Vec<String>,
}

impl Slot {
    /// Creates an empty slot.
    pub fn empty(day: impl Into<String>, period: u32) -> Self {
        Self {
            day: day.into(),
            period,
            subject: None,
            teacher: None,
        }
    }

    /// Whether nothing is assigned.
    #[inline]
    pub fn is_empty(&self) -> bool {
        self.subject.is_none() && self.teacher.is_none()
    }

    /// Whether exactly one of subject/teacher is set.
    #[inline]
    pub fn is_orphaned(&self) -> bool {
        self.subject.is_some() != self.teacher.is_some()
    }
}

impl SlotRef {
    /// Creates a slot reference.
    pub fn new(class: impl Into<String>, day: impl Into<String>, period: u32) -> Self {
        Self {
            class: class.into(),
            day: day.into(),
            period,
        }
    }
}

impl ClassTimetable {
    /// Iterates all slots, day-major.
    pub fn slots(&self) -> impl Iterator<Item = &Slot> {
        self.days.iter().flat_map(|d| d.slots.iter())
    }

    /// Number of slots holding the subject.
    pub fn subject_count(&self, subject: &str) -> u32 {
        self.slots()
            .filter(|s| s.subject.as_deref() == Some(subject))
            .count() as u32
    }

    /// Number of empty slots.
    pub fn empty_count(&self) -> usize {
        self.slots().filter(|s| s.is_empty()).count()
    }
}

impl Timetable {
    /// Creates a timetable with every slot empty.
    pub fn empty(
        class_names: &[String],
        days: &[String],
        periods_per_day: u32,
        time_slots: Vec<String>,
    ) -> Self {
        let classes = class_names
            .iter()
            .map(|name| ClassTimetable {
                name: name.clone(),
                days: days
                    .iter()
                    .map(|day| DaySchedule {
                        day: day.clone(),
                        slots: (1..=periods_per_day).map(|p| Slot::empty(day, p)).collect(),
                    })
                    .collect(),
            })
            .collect();

        Self {
            classes,
            days: days.to_vec(),
            periods_per_day,
            time_slots,
        }
    }

    /// Default period labels: "Period 1", "Period 2", ...
    pub fn default_time_slots(periods_per_day: u32) -> Vec<String> {
        (1..=periods_per_day).map(|p| format!("Period {p}")).collect()
    }

    /// Finds a class grid by name.
    pub fn class(&self, name: &str) -> Option<&ClassTimetable> {
        self.classes.iter().find(|c| c.name == name)
    }

    /// Total number of cells across all classes.
    pub fn cell_count(&self) -> usize {
        self.classes.len() * self.days.len() * self.periods_per_day as usize
    }

    /// Checks that every class grid has `days × periods_per_day` cells in
    /// the timetable's day order.
    ///
    /// Grids built by the engine always pass; deserialized ones may not.
    ///
    /// # Errors
    /// `MalformedInput` naming the first ragged class.
    pub fn check_grid(&self) -> Result<(), EngineError> {
        let periods = self.periods_per_day as usize;
        for class in &self.classes {
            let ragged = class.days.len() != self.days.len()
                || class
                    .days
                    .iter()
                    .zip(&self.days)
                    .any(|(row, day)| row.day != *day || row.slots.len() != periods);
            if ragged {
                return Err(EngineError::MalformedInput(format!(
                    "class '{}' does not have {} periods on each of [{}]",
                    class.name,
                    periods,
                    self.days.join(", ")
                )));
            }
        }
        Ok(())
    }

    /// Resolves an external slot address to `(class, day, period)` indices.
    ///
    /// # Errors
    /// `MalformedInput` for a ragged grid (see [`Timetable::check_grid`]),
    /// otherwise `UnknownClass`, `UnknownDay` or `PeriodOutOfRange`.
    pub fn locate(&self, slot: &SlotRef) -> Result<(usize, usize, usize), EngineError> {
        self.check_grid()?;
        let ci = self
            .classes
            .iter()
            .position(|c| c.name == slot.class)
            .ok_or_else(|| EngineError::UnknownClass(slot.class.clone()))?;
        let di = self
            .days
            .iter()
            .position(|d| *d == slot.day)
            .ok_or_else(|| EngineError::UnknownDay(slot.day.clone()))?;
        if slot.period == 0 || slot.period > self.periods_per_day {
            return Err(EngineError::PeriodOutOfRange {
                period: slot.period,
                periods_per_day: self.periods_per_day,
            });
        }
        Ok((ci, di, slot.period as usize - 1))
    }

    /// Looks up a slot by external address.
    pub fn slot(&self, slot: &SlotRef) -> Result<&Slot, EngineError> {
        let (ci, di, pi) = self.locate(slot)?;
        Ok(self.slot_at(ci, di, pi))
    }

    /// Slot by indices. Panics on out-of-range indices.
    #[inline]
    pub fn slot_at(&self, class: usize, day: usize, period: usize) -> &Slot {
        &self.classes[class].days[day].slots[period]
    }

    #[inline]
    pub(crate) fn slot_at_mut(&mut self, class: usize, day: usize, period: usize) -> &mut Slot {
        &mut self.classes[class].days[day].slots[period]
    }

    /// Class (other than `except`) in which `teacher` is booked at (day, period).
    ///
    /// Cells missing from a ragged grid count as free.
    pub fn teacher_booking(
        &self,
        teacher: &str,
        day: usize,
        period: usize,
        except: Option<usize>,
    ) -> Option<&str> {
        self.classes
            .iter()
            .enumerate()
            .filter(|(ci, _)| Some(*ci) != except)
            .find(|(_, c)| {
                c.days
                    .get(day)
                    .and_then(|d| d.slots.get(period))
                    .is_some_and(|s| s.teacher.as_deref() == Some(teacher))
            })
            .map(|(_, c)| c.name.as_str())
    }

    /// Assigned periods per teacher (teachers with no slots are absent).
    pub fn teacher_loads(&self) -> BTreeMap<String, u32> {
        let mut loads = BTreeMap::new();
        for slot in self.classes.iter().flat_map(ClassTimetable::slots) {
            if let Some(teacher) = &slot.teacher {
                *loads.entry(teacher.clone()).or_insert(0) += 1;
            }
        }
        loads
    }

    /// Every teacher booked in more than one class at the same time.
    pub fn double_bookings(&self) -> Vec<DoubleBooking> {
        let mut found = Vec::new();
        for (di, day) in self.days.iter().enumerate() {
            for pi in 0..self.periods_per_day as usize {
                let mut at_time: BTreeMap<&str, Vec<String>> = BTreeMap::new();
                for class in &self.classes {
                    let cell = class.days.get(di).and_then(|d| d.slots.get(pi));
                    if let Some(teacher) = cell.and_then(|s| s.teacher.as_ref()) {
                        at_time
                            .entry(teacher.as_str())
                            .or_default()
                            .push(class.name.clone());
                    }
                }
                for (teacher, classes) in at_time {
                    if classes.len() > 1 {
                        found.push(DoubleBooking {
                            teacher: teacher.to_string(),
                            day: day.clone(),
                            period: pi as u32 + 1,
                            classes,
                        });
                    }
                }
            }
        }
        found
    }
}

/// Serialises day rows as an ordered `{ day: [Slot] }` map.
mod day_map {
    use super::{DaySchedule, Slot};
    use serde::de::{MapAccess, Visitor};
    use serde::ser::SerializeMap;
    use serde::{Deserializer, Serializer};
    use std::fmt;

    #[allow(clippy::ptr_arg)]
    pub fn serialize<S: Serializer>(
        days: &Vec<DaySchedule>,
        serializer: S,
    ) -> Result<S::Ok, S::Error> {
        let mut map = serializer.serialize_map(Some(days.len()))?;
        for row in days {
            map.serialize_entry(&row.day, &row.slots)?;
        }
        map.end()
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(
        deserializer: D,
    ) -> Result<Vec<DaySchedule>, D::Error> {
        struct DaysVisitor;

        impl<'de> Visitor<'de> for DaysVisitor {
            type Value = Vec<DaySchedule>;

            fn expecting(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                f.write_str("a map of day name to slots")
            }

            fn visit_map<A: MapAccess<'de>>(self, mut access: A) -> Result<Self::Value, A::Error> {
                let mut days = Vec::with_capacity(access.size_hint().unwrap_or(0));
                while let Some((day, slots)) = access.next_entry::<String, Vec<Slot>>()? {
                    days.push(DaySchedule { day, slots });
                }
                Ok(days)
            }
        }

        deserializer.deserialize_map(DaysVisitor)
    }
}
