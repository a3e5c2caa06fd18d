//! # nestlink-types
//!
//! Core data types for the nestlink nest linker.
//!
//! - **Geometry**: `BoundingBox2D` with intersection-over-union
//! - **Time**: `ObservationDate`, the calendar date of a survey flight
//! - **Records**: `Detection`, `TrackMember`, `NestSummary`
//!
//! All types are serializable with Serde and built on top of the `geo` crate's
//! geometric primitives.
//!
//! ## Examples
//!
//! ```rust
//! use nestlink_types::bbox::BoundingBox2D;
//! use nestlink_types::date::ObservationDate;
//! use nestlink_types::detection::Detection;
//!
//! let date: ObservationDate = "03_24_2022".parse().unwrap();
//! let bird = Detection::new("Joule", date, BoundingBox2D::new(0.0, 0.0, 1.0, 1.0));
//! assert_eq!(bird.year, 2022);
//! ```

pub mod bbox;
pub mod date;
pub mod detection;
pub mod nest;
