use crate::date::ObservationDate;
use geo::Point;
use serde::{Deserialize, Serialize};

/// One row per nest: the reduction of a qualifying candidate track.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NestSummary {
    /// Index of the seed detection of the track
    pub nest_id: usize,
    pub site: String,
    pub year: i32,
    /// Mean of the member box midpoints
    pub xmean: f64,
    pub ymean: f64,
    pub first_obs: ObservationDate,
    pub last_obs: ObservationDate,
    pub num_obs: usize,
    /// Label with the highest summed score across members
    pub species: String,
    pub sum_top1_score: f64,
    pub num_obs_top1: usize,
    /// Member `bird_id`s joined with `,`
    pub bird_match: String,
}

impl NestSummary {
    /// Location of the nest as a point.
    pub fn location(&self) -> Point {
        Point::new(self.xmean, self.ymean)
    }

    /// The `bird_id`s listed in `bird_match`, skipping anything non-numeric.
    pub fn bird_ids(&self) -> Vec<u64> {
        self.bird_match
            .split(',')
            .filter_map(|id| id.trim().parse().ok())
            .collect()
    }
}
