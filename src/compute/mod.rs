//! Compute layer for linking detections into nests.
//!
//! - Spatial indexing of detection boxes
//! - Greedy cross-date matching into candidate tracks
//! - Consecutive survey-date statistics
//! - Reduction of tracks into one summary row per nest
//!
//! The compute layer is independent of file formats and works on in-memory
//! detections and tracks.

pub mod matcher;
pub mod spatial;
pub mod summary;
pub mod temporal;

pub use matcher::{CandidateTrack, ClaimSet, MatchOrder, compare_site, link_tracks};
pub use summary::{NestThresholds, process_nests};
pub use temporal::{SurveyCalendar, count_max_consec_detects};
