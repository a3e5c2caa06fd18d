use crate::bbox::BoundingBox2D;
use crate::date::ObservationDate;
use serde::{Deserialize, Serialize};

/// Event name used when a flight file carries no event token.
pub const PRIMARY_EVENT: &str = "primary";

/// A single bird detected on one survey flight.
///
/// Detections are immutable once loaded; the linker only reads them.
///
/// # Examples
///
/// ```
/// use nestlink_types::bbox::BoundingBox2D;
/// use nestlink_types::date::ObservationDate;
/// use nestlink_types::detection::Detection;
///
/// let date = ObservationDate::from_ymd(2022, 3, 24).unwrap();
/// let bird = Detection::new("Joule", date, BoundingBox2D::new(0.0, 0.0, 1.0, 1.0))
///     .with_label("Great Egret")
///     .with_score(0.82)
///     .with_bird_id(7);
/// assert_eq!(bird.year, 2022);
/// assert_eq!(bird.event, "primary");
/// ```
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Detection {
    /// Box of the detection in the projected coordinate system
    pub bbox: BoundingBox2D,
    /// Species label predicted by the detector
    pub label: String,
    /// Detector confidence in `[0, 1]`
    pub score: f64,
    pub site: String,
    pub date: ObservationDate,
    pub year: i32,
    /// Flight event within the day, `primary` unless a repeat flight
    pub event: String,
    /// Sequential identifier assigned when flights are combined
    pub bird_id: u64,
    pub image_path: Option<String>,
}

impl Detection {
    /// Create a detection with an empty label, zero score and id `0`.
    ///
    /// The year is taken from `date`.
    pub fn new(site: impl Into<String>, date: ObservationDate, bbox: BoundingBox2D) -> Self {
        Self {
            bbox,
            label: String::new(),
            score: 0.0,
            site: site.into(),
            date,
            year: date.year(),
            event: PRIMARY_EVENT.to_string(),
            bird_id: 0,
            image_path: None,
        }
    }

    pub fn with_label(mut self, label: impl Into<String>) -> Self {
        self.label = label.into();
        self
    }

    pub fn with_score(mut self, score: f64) -> Self {
        self.score = score;
        self
    }

    pub fn with_bird_id(mut self, bird_id: u64) -> Self {
        self.bird_id = bird_id;
        self
    }

    pub fn with_event(mut self, event: impl Into<String>) -> Self {
        self.event = event.into();
        self
    }

    pub fn with_image_path(mut self, image_path: impl Into<String>) -> Self {
        self.image_path = Some(image_path.into());
        self
    }
}

/// A detection assigned to a candidate nest track.
///
/// `target_ind` is the index of the seed detection that started the track.
/// The member's own box is exposed as the `match_*` columns so it stays
/// distinct from the seed box.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TrackMember {
    pub detection: Detection,
    pub target_ind: usize,
}

impl TrackMember {
    pub fn new(detection: Detection, target_ind: usize) -> Self {
        Self {
            detection,
            target_ind,
        }
    }

    pub fn match_xmin(&self) -> f64 {
        self.detection.bbox.min_x()
    }

    pub fn match_ymin(&self) -> f64 {
        self.detection.bbox.min_y()
    }

    pub fn match_xmax(&self) -> f64 {
        self.detection.bbox.max_x()
    }

    pub fn match_ymax(&self) -> f64 {
        self.detection.bbox.max_y()
    }
}
