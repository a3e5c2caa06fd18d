//! File formats and naming conventions.

pub mod naming;
pub mod table;

pub use naming::{FlightName, SiteYear};
pub use table::{
    DETECTION_SCHEMA, GeoTable, NEST_SCHEMA, Prediction, TRACK_SCHEMA, TableSchema,
    read_detections, read_nests, read_predictions, read_tracks, write_detections, write_nests,
    write_tracks,
};
