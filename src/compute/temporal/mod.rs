//! Temporal computation over survey dates.
//!
//! - `consecutive`: longest run of consecutive survey dates a track was seen on

pub mod consecutive;
pub use consecutive::{SurveyCalendar, count_max_consec_detects};
