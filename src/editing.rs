//! Manual slot edits.
//!
//! [`SlotEditor`] applies a single-slot update or a two-slot swap to a
//! timetable. Edits never mutate their input: the change is made on a copy,
//! checked, and returned only if the copy still satisfies the rules.
//!
//! Rules:
//! - A slot sets subject and teacher together or neither
//! - The teacher is on the roster and qualified for the subject
//! - No teacher is in two classes at the same (day, period)

use log::debug;
use serde::{Deserialize, Serialize};

use crate::error::EngineError;
use crate::models::{SlotRef, Teacher, Timetable};

/// New contents for one slot. Both `None` clears the slot.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SlotUpdate {
    /// Class name.
    pub class: String,
    /// Day name.
    pub day: String,
    /// Period (1-based).
    pub period: u32,
    /// Subject to assign.
    #[serde(default)]
    pub subject: Option<String>,
    /// Teacher to assign.
    #[serde(default)]
    pub teacher: Option<String>,
}

impl SlotUpdate {
    /// An update assigning `subject` taught by `teacher`.
    pub fn assign(
        slot: SlotRef,
        subject: impl Into<String>,
        teacher: impl Into<String>,
    ) -> Self {
        Self {
            class: slot.class,
            day: slot.day,
            period: slot.period,
            subject: Some(subject.into()),
            teacher: Some(teacher.into()),
        }
    }

    /// An update clearing the slot.
    pub fn clear(slot: SlotRef) -> Self {
        Self {
            class: slot.class,
            day: slot.day,
            period: slot.period,
            subject: None,
            teacher: None,
        }
    }

    /// The addressed slot.
    pub fn target(&self) -> SlotRef {
        SlotRef::new(self.class.clone(), self.day.clone(), self.period)
    }
}

/// Applies checked edits against a teacher roster.
///
/// # Example
///
/// ```
/// use u_timetable::editing::{SlotEditor, SlotUpdate};
/// use u_timetable::models::{SlotRef, Teacher, Timetable};
///
/// let teachers = vec![Teacher::new("Mr. X").with_subject("Maths")];
/// let grid = Timetable::empty(
///     &["10A".to_string(), "10B".to_string()],
///     &["Mon".to_string()],
///     1,
///     Timetable::default_time_slots(1),
/// );
/// let editor = SlotEditor::new(&teachers);
///
/// let grid = editor
///     .update_slot(&grid, &SlotUpdate::assign(SlotRef::new("10A", "Mon", 1), "Maths", "Mr. X"))
///     .unwrap();
/// let clash = editor.update_slot(
///     &grid,
///     &SlotUpdate::assign(SlotRef::new("10B", "Mon", 1), "Maths", "Mr. X"),
/// );
/// assert_eq!(clash.unwrap_err().code(), "SLOT_CONFLICT");
/// ```
#[derive(Debug, Clone, Copy)]
pub struct SlotEditor<'a> {
    teachers: &'a [Teacher],
}

impl<'a> SlotEditor<'a> {
    /// Creates an editor for the given roster.
    pub fn new(teachers: &'a [Teacher]) -> Self {
        Self { teachers }
    }

    /// Returns a copy of `timetable` with one slot replaced.
    ///
    /// # Errors
    /// - `UnknownClass`, `UnknownDay`, `PeriodOutOfRange` for a bad address
    /// - `OrphanAssignment` when only one of subject/teacher is set
    /// - `UnknownTeacher`, `UnqualifiedTeacher` for roster mismatches
    /// - `SlotConflict` when the teacher is busy in another class
    pub fn update_slot(
        &self,
        timetable: &Timetable,
        update: &SlotUpdate,
    ) -> Result<Timetable, EngineError> {
        let (ci, di, pi) = timetable.locate(&update.target())?;

        match (&update.subject, &update.teacher) {
            (Some(subject), Some(teacher)) => {
                self.check_qualified(teacher, subject)?;
                if let Some(other) = timetable.teacher_booking(teacher, di, pi, Some(ci)) {
                    return Err(EngineError::SlotConflict {
                        teacher: teacher.clone(),
                        day: update.day.clone(),
                        period: update.period,
                        other_class: other.to_string(),
                    });
                }
            }
            (None, None) => {}
            _ => {
                return Err(EngineError::OrphanAssignment {
                    class: update.class.clone(),
                    day: update.day.clone(),
                    period: update.period,
                })
            }
        }

        let mut next = timetable.clone();
        let slot = next.slot_at_mut(ci, di, pi);
        slot.subject = update.subject.clone();
        slot.teacher = update.teacher.clone();
        debug!(
            "Updated {}/{}/{}: {:?} with {:?}",
            update.class, update.day, update.period, update.subject, update.teacher
        );
        Ok(next)
    }

    /// Returns a copy of `timetable` with the contents of two slots exchanged.
    ///
    /// Slots may belong to different classes. Swapping a slot with itself is
    /// a no-op.
    ///
    /// # Errors
    /// - Address errors as in [`update_slot`](Self::update_slot)
    /// - `SlotConflict` if either moved teacher would be double-booked
    pub fn swap_slots(
        &self,
        timetable: &Timetable,
        a: &SlotRef,
        b: &SlotRef,
    ) -> Result<Timetable, EngineError> {
        let (ca, da, pa) = timetable.locate(a)?;
        let (cb, db, pb) = timetable.locate(b)?;
        let mut next = timetable.clone();
        if (ca, da, pa) == (cb, db, pb) {
            return Ok(next);
        }

        let first = timetable.slot_at(ca, da, pa);
        let second = timetable.slot_at(cb, db, pb);
        {
            let slot = next.slot_at_mut(ca, da, pa);
            slot.subject = second.subject.clone();
            slot.teacher = second.teacher.clone();
        }
        {
            let slot = next.slot_at_mut(cb, db, pb);
            slot.subject = first.subject.clone();
            slot.teacher = first.teacher.clone();
        }

        for (slot_ref, (c, d, p)) in [(a, (ca, da, pa)), (b, (cb, db, pb))] {
            if let Some(teacher) = &next.slot_at(c, d, p).teacher {
                if let Some(other) = next.teacher_booking(teacher, d, p, Some(c)) {
                    return Err(EngineError::SlotConflict {
                        teacher: teacher.clone(),
                        day: slot_ref.day.clone(),
                        period: slot_ref.period,
                        other_class: other.to_string(),
                    });
                }
            }
        }

        debug!(
            "Swapped {}/{}/{} with {}/{}/{}",
            a.class, a.day, a.period, b.class, b.day, b.period
        );
        Ok(next)
    }

    fn check_qualified(&self, teacher: &str, subject: &str) -> Result<(), EngineError> {
        let found = self
            .teachers
            .iter()
            .find(|t| t.name == teacher)
            .ok_or_else(|| EngineError::UnknownTeacher(teacher.to_string()))?;
        if found.can_teach(subject) {
            Ok(())
        } else {
            Err(EngineError::UnqualifiedTeacher {
                teacher: teacher.to_string(),
                subject: subject.to_string(),
            })
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn roster() -> Vec<Teacher> {
        vec![
            Teacher::new("X").with_subjects(["Maths", "Science"]),
            Teacher::new("Y").with_subject("Art"),
        ]
    }

    /// 10A: Mon1 Maths/X, Tue1 Art/Y. 10B: Tue1 Science/X.
    fn sample() -> Timetable {
        let mut tt = Timetable::empty(
            &["10A".into(), "10B".into()],
            &["Mon".into(), "Tue".into()],
            2,
            Timetable::default_time_slots(2),
        );
        for (c, d, p, subject, teacher) in [
            (0, 0, 0, "Maths", "X"),
            (0, 1, 0, "Art", "Y"),
            (1, 1, 0, "Science", "X"),
        ] {
            let slot = tt.slot_at_mut(c, d, p);
            slot.subject = Some(subject.into());
            slot.teacher = Some(teacher.into());
        }
        tt
    }

    #[test]
    fn test_ragged_timetable_is_malformed() {
        let teachers = roster();
        let mut value = serde_json::to_value(sample()).unwrap();
        value["classes"][1]["timetable"]["Tue"] = serde_json::json!([]);
        let ragged: Timetable = serde_json::from_value(value).unwrap();

        let editor = SlotEditor::new(&teachers);
        let update = SlotUpdate::assign(SlotRef::new("10A", "Tue", 1), "Maths", "X");
        assert!(matches!(
            editor.update_slot(&ragged, &update),
            Err(EngineError::MalformedInput(_))
        ));
        assert!(matches!(
            editor.swap_slots(
                &ragged,
                &SlotRef::new("10A", "Mon", 1),
                &SlotRef::new("10A", "Tue", 1)
            ),
            Err(EngineError::MalformedInput(_))
        ));
    }

    #[test]
    fn test_update_assigns_slot() {
        let teachers = roster();
        let tt = sample();
        let next = SlotEditor::new(&teachers)
            .update_slot(&tt, &SlotUpdate::assign(SlotRef::new("10B", "Mon", 2), "Art", "Y"))
            .unwrap();
        let slot = next.slot(&SlotRef::new("10B", "Mon", 2)).unwrap();
        assert_eq!(slot.subject.as_deref(), Some("Art"));
        assert_eq!(slot.teacher.as_deref(), Some("Y"));
        // Input untouched
        assert!(tt.slot(&SlotRef::new("10B", "Mon", 2)).unwrap().is_empty());
    }

    #[test]
    fn test_update_conflict() {
        let teachers = roster();
        let tt = sample();
        let err = SlotEditor::new(&teachers)
            .update_slot(&tt, &SlotUpdate::assign(SlotRef::new("10B", "Mon", 1), "Maths", "X"))
            .unwrap_err();
        assert_eq!(
            err,
            EngineError::SlotConflict {
                teacher: "X".into(),
                day: "Mon".into(),
                period: 1,
                other_class: "10A".into(),
            }
        );
    }

    #[test]
    fn test_update_same_slot_same_teacher() {
        // Re-assigning X where X already is must not count as a conflict.
        let teachers = roster();
        let tt = sample();
        let next = SlotEditor::new(&teachers)
            .update_slot(&tt, &SlotUpdate::assign(SlotRef::new("10A", "Mon", 1), "Science", "X"))
            .unwrap();
        assert_eq!(next.classes[0].subject_count("Science"), 1);
    }

    #[test]
    fn test_update_roster_checks() {
        let teachers = roster();
        let tt = sample();
        let editor = SlotEditor::new(&teachers);
        let at = SlotRef::new("10A", "Mon", 2);

        assert_eq!(
            editor
                .update_slot(&tt, &SlotUpdate::assign(at.clone(), "Maths", "Z"))
                .unwrap_err(),
            EngineError::UnknownTeacher("Z".into())
        );
        assert_eq!(
            editor
                .update_slot(&tt, &SlotUpdate::assign(at.clone(), "Maths", "Y"))
                .unwrap_err()
                .code(),
            "UNQUALIFIED_TEACHER"
        );

        let mut orphan = SlotUpdate::clear(at);
        orphan.subject = Some("Maths".into());
        assert_eq!(
            editor.update_slot(&tt, &orphan).unwrap_err().code(),
            "ORPHAN_ASSIGNMENT"
        );
    }

    #[test]
    fn test_update_clears_slot() {
        let teachers = roster();
        let tt = sample();
        let next = SlotEditor::new(&teachers)
            .update_slot(&tt, &SlotUpdate::clear(SlotRef::new("10A", "Mon", 1)))
            .unwrap();
        assert_eq!(next.classes[0].subject_count("Maths"), 0);
    }

    #[test]
    fn test_update_bad_address() {
        let teachers = roster();
        let tt = sample();
        let err = SlotEditor::new(&teachers)
            .update_slot(&tt, &SlotUpdate::clear(SlotRef::new("10A", "Mon", 9)))
            .unwrap_err();
        assert_eq!(err.code(), "PERIOD_OUT_OF_RANGE");
    }

    #[test]
    fn test_swap_within_class() {
        let teachers = roster();
        let tt = sample();
        let next = SlotEditor::new(&teachers)
            .swap_slots(&tt, &SlotRef::new("10A", "Mon", 1), &SlotRef::new("10A", "Mon", 2))
            .unwrap();
        assert!(next.slot_at(0, 0, 0).is_empty());
        assert_eq!(next.slot_at(0, 0, 1).subject.as_deref(), Some("Maths"));
        assert_eq!(next.slot_at(0, 0, 1).period, 2);
        assert_eq!(next.slot_at(0, 0, 1).day, "Mon");
    }

    #[test]
    fn test_swap_conflict_is_atomic() {
        // Moving X to Tue 1 in 10A clashes with X in 10B.
        let teachers = roster();
        let tt = sample();
        let before = tt.clone();
        let err = SlotEditor::new(&teachers)
            .swap_slots(&tt, &SlotRef::new("10A", "Mon", 1), &SlotRef::new("10A", "Tue", 1))
            .unwrap_err();
        assert_eq!(err.code(), "SLOT_CONFLICT");
        assert_eq!(tt, before);
    }

    #[test]
    fn test_swap_across_classes_same_time() {
        let teachers = roster();
        let tt = sample();
        let next = SlotEditor::new(&teachers)
            .swap_slots(&tt, &SlotRef::new("10A", "Tue", 1), &SlotRef::new("10B", "Tue", 1))
            .unwrap();
        assert_eq!(next.slot_at(0, 1, 0).teacher.as_deref(), Some("X"));
        assert_eq!(next.slot_at(1, 1, 0).teacher.as_deref(), Some("Y"));
        assert!(next.double_bookings().is_empty());
    }

    #[test]
    fn test_swap_with_itself() {
        let teachers = roster();
        let tt = sample();
        let a = SlotRef::new("10A", "Mon", 1);
        let next = SlotEditor::new(&teachers).swap_slots(&tt, &a, &a).unwrap();
        assert_eq!(next, tt);
    }

    #[test]
    fn test_update_wire_format() {
        let json = r#"{"class":"10A","day":"Mon","period":1,"subject":"Maths","teacher":"X"}"#;
        let update: SlotUpdate = serde_json::from_str(json).unwrap();
        assert_eq!(
            update,
            SlotUpdate::assign(SlotRef::new("10A", "Mon", 1), "Maths", "X")
        );
        let cleared: SlotUpdate =
            serde_json::from_str(r#"{"class":"10A","day":"Mon","period":1}"#).unwrap();
        assert_eq!(cleared, SlotUpdate::clear(SlotRef::new("10A", "Mon", 1)));
    }
}
