//! Links repeated drone detections of the same nest across survey dates.
//!
//! ## Pipeline
//! - **Combine**: merge per-flight predictions into one detection table per site/year
//! - **Detect**: greedily match overlapping detections from different dates into
//!   candidate nest tracks, using an R*-tree over detection boxes
//! - **Process**: keep tracks seen often enough, or on enough consecutive survey
//!   dates, and reduce each to one summary row
//!
//! Tables are GeoJSON FeatureCollections; the CRS of the input is carried to
//! every output.
//!
//! ```rust
//! use nestlink::prelude::*;
//! use nestlink_types::bbox::BoundingBox2D;
//! use nestlink_types::date::ObservationDate;
//! use nestlink_types::detection::Detection;
//!
//! let day = |d| ObservationDate::from_ymd(2022, 3, d).unwrap();
//! let birds: Vec<Detection> = (1..=3)
//!     .map(|d| {
//!         Detection::new("Joule", day(d), BoundingBox2D::new(0.0, 0.0, 1.0, 1.0))
//!             .with_label("Great Egret")
//!             .with_score(0.8)
//!             .with_bird_id(d as u64)
//!     })
//!     .collect();
//!
//! let tracks = compare_site(&birds, &MatchOrder::Input)?;
//! let members = link_tracks(&birds, &tracks);
//! let nests = process_nests(&members, &NestThresholds::default())?;
//!
//! assert_eq!(nests.len(), 1);
//! assert_eq!(nests[0].num_obs, 3);
//! # Ok::<(), nestlink::NestError>(())
//! ```

pub mod combine;
pub mod compute;
pub mod config;
pub mod error;
pub mod io;
pub mod pipeline;

pub use config::LinkerConfig;
pub use error::{NestError, Result};

pub use compute::{
    CandidateTrack, ClaimSet, MatchOrder, NestThresholds, SurveyCalendar, compare_site,
    count_max_consec_detects, link_tracks, process_nests,
};
pub use io::{GeoTable, SiteYear};

pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Common imports
pub mod prelude {

    pub use crate::{LinkerConfig, NestError, Result};

    pub use crate::{
        CandidateTrack, ClaimSet, MatchOrder, NestThresholds, compare_site, link_tracks,
        process_nests,
    };

    pub use crate::{GeoTable, SiteYear};
}
