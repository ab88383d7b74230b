//! School timetable generation.
//!
//! Assigns subjects and teachers to class/day/period slots so that every
//! class receives its weekly periods and no teacher is in two places at
//! once. Produces quality metrics for the result and supports checked
//! manual edits afterwards.
//!
//! # Modules
//!
//! - **`models`**: Domain types: `SchoolClass`, `Teacher`, `Slot`,
//!   `Timetable`, `GenerationRequest`
//! - **`validation`**: Pre-generation checks with errors, warnings and suggestions
//! - **`generator`**: Most-constrained-first backtracking assignment with
//!   progress reporting and cancellation
//! - **`quality`**: Workload balance, subject distribution, satisfaction,
//!   free periods, overall grade
//! - **`editing`**: Conflict-checked slot update and swap
//! - **`jobs`**: Background generation jobs with progress polling
//! - **`dto`**: JSON request/response shapes
//! - **`sources`**: Roster import from CSV and JSON
//! - **`config`**: Search budget, quality weights, grade bands, thresholds
//! - **`error`**: Hard errors
//!
//! # Example
//!
//! ```
//! use u_timetable::generator::Generator;
//! use u_timetable::models::{GenerationRequest, SchoolClass, Teacher};
//! use u_timetable::validation::validate;
//!
//! let request = GenerationRequest::new(
//!     vec![
//!         SchoolClass::new("10A").with_subject("Maths", 5),
//!         SchoolClass::new("10B").with_subject("Maths", 5),
//!     ],
//!     vec![Teacher::new("Mr. X").with_subject("Maths")],
//!     ["Mon", "Tue", "Wed", "Thu", "Fri"],
//!     2,
//! );
//!
//! assert!(validate(&request).unwrap().valid);
//! let outcome = Generator::new().generate(&request).unwrap();
//! let timetable = &outcome.generated().unwrap().timetable;
//! assert!(timetable.double_bookings().is_empty());
//! ```
//!
//! # References
//!
//! - Schaerf (1999), "A Survey of Automated Timetabling"
//! - Russell & Norvig (2020), "Artificial Intelligence: A Modern Approach", Ch. 6
//! - Burke & Petrovic (2002), "Recent research directions in automated timetabling"

pub mod config;
pub mod dto;
pub mod editing;
pub mod error;
pub mod generator;
pub mod jobs;
pub mod models;
pub mod quality;
pub mod sources;
pub mod validation;
