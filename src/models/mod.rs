//! Timetabling domain models.
//!
//! Input types describe what must be taught and who can teach it; the
//! output type is a per-class day/period grid.
//!
//! # Domain Mapping
//!
//! | u-timetable | General scheduling |
//! |-------------|--------------------|
//! | SchoolClass | Task group |
//! | SubjectRequirement | Repeated activity |
//! | Teacher | Skilled resource |
//! | Slot | Time bucket on a class calendar |
//! | Timetable | Schedule |

mod request;
mod school;
mod timetable;

pub use request::{GenerationOptions, GenerationRequest};
pub use school::{SchoolClass, SubjectRequirement, Teacher};
pub use timetable::{ClassTimetable, DaySchedule, DoubleBooking, Slot, SlotRef, Timetable};
