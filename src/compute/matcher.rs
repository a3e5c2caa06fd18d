//! Greedy cross-date matching of detections into candidate nest tracks.
//!
//! Each unclaimed detection, visited in a caller-chosen order, seeds a track
//! made of the overlapping detections from *other* dates: one per date, the
//! one with the highest intersection-over-union against the seed. Every
//! detection joins at most one track, first come first served.
//!
//! The result depends on the visiting order. A different order can split one
//! nest into two tracks or merge two nests into one; [`MatchOrder`] makes the
//! order explicit so runs are reproducible.

use crate::compute::spatial::DetectionIndex;
use crate::error::{NestError, Result};
use nestlink_types::date::ObservationDate;
use nestlink_types::detection::{Detection, TrackMember};
use rustc_hash::{FxHashMap, FxHashSet};

/// Order in which detections are visited as potential seeds.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub enum MatchOrder {
    /// Visit detections in the order they were given.
    #[default]
    Input,
    /// Visit detections in this order. Must be a permutation of the input
    /// indices.
    Explicit(Vec<usize>),
}

impl MatchOrder {
    fn resolve(&self, len: usize) -> Result<Vec<usize>> {
        match self {
            MatchOrder::Input => Ok((0..len).collect()),
            MatchOrder::Explicit(order) => {
                if order.len() != len {
                    return Err(NestError::InvalidInput(format!(
                        "match order lists {} detections, batch has {}",
                        order.len(),
                        len
                    )));
                }
                let mut seen = vec![false; len];
                for &index in order {
                    match seen.get_mut(index) {
                        Some(slot) if !*slot => *slot = true,
                        Some(_) => {
                            return Err(NestError::InvalidInput(format!(
                                "match order repeats detection {}",
                                index
                            )));
                        }
                        None => {
                            return Err(NestError::InvalidInput(format!(
                                "match order refers to detection {} of {}",
                                index, len
                            )));
                        }
                    }
                }
                Ok(order.clone())
            }
        }
    }
}

/// Detection indices already assigned to a track.
#[derive(Debug, Clone, Default)]
pub struct ClaimSet {
    claimed: FxHashSet<usize>,
}

impl ClaimSet {
    pub fn new() -> Self {
        Self::default()
    }

    /// Claim `index`; returns `false` if it was already claimed.
    pub fn claim(&mut self, index: usize) -> bool {
        self.claimed.insert(index)
    }

    pub fn is_claimed(&self, index: usize) -> bool {
        self.claimed.contains(&index)
    }

    pub fn len(&self) -> usize {
        self.claimed.len()
    }

    pub fn is_empty(&self) -> bool {
        self.claimed.is_empty()
    }
}

/// Detections presumed to be repeated sightings of one nest.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CandidateTrack {
    /// Index of the seed detection
    pub target_ind: usize,
    /// Indices of the matched detections in ascending order, then the seed
    pub members: Vec<usize>,
}

impl CandidateTrack {
    /// Resolve member indices into track rows tagged with `target_ind`.
    pub fn to_members(&self, detections: &[Detection]) -> Vec<TrackMember> {
        self.members
            .iter()
            .filter_map(|&index| detections.get(index))
            .map(|detection| TrackMember::new(detection.clone(), self.target_ind))
            .collect()
    }
}

/// Link the detections of one site into candidate nest tracks.
///
/// # Examples
///
/// ```
/// use nestlink::compute::matcher::{MatchOrder, compare_site};
/// use nestlink_types::bbox::BoundingBox2D;
/// use nestlink_types::date::ObservationDate;
/// use nestlink_types::detection::Detection;
///
/// let d1 = ObservationDate::from_ymd(2022, 3, 1).unwrap();
/// let d2 = ObservationDate::from_ymd(2022, 3, 8).unwrap();
/// let birds = vec![
///     Detection::new("Joule", d1, BoundingBox2D::new(0.0, 0.0, 1.0, 1.0)),
///     Detection::new("Joule", d2, BoundingBox2D::new(0.1, 0.0, 1.1, 1.0)),
/// ];
///
/// let tracks = compare_site(&birds, &MatchOrder::Input)?;
/// assert_eq!(tracks.len(), 1);
/// assert_eq!(tracks[0].members, vec![1, 0]);
/// # Ok::<(), nestlink::NestError>(())
/// ```
pub fn compare_site(detections: &[Detection], order: &MatchOrder) -> Result<Vec<CandidateTrack>> {
    let mut claims = ClaimSet::new();
    compare_site_with_claims(detections, order, &mut claims)
}

/// [`compare_site`] with a caller-owned claim set.
///
/// Indices already in `claims` are neither used as seeds nor matched.
pub fn compare_site_with_claims(
    detections: &[Detection],
    order: &MatchOrder,
    claims: &mut ClaimSet,
) -> Result<Vec<CandidateTrack>> {
    let order = order.resolve(detections.len())?;
    ensure_single_site(detections)?;

    let boxes: Vec<_> = detections.iter().map(|detection| detection.bbox).collect();
    let index = DetectionIndex::from_boxes(&boxes);
    let mut tracks = Vec::new();

    for seed in order {
        if !claims.claim(seed) {
            continue;
        }

        let seed_detection = &detections[seed];
        let mut matches = best_match_per_date(detections, &index, seed_detection);
        matches.retain(|&candidate| !claims.is_claimed(candidate));

        if matches.is_empty() {
            continue;
        }

        for &candidate in &matches {
            claims.claim(candidate);
        }
        matches.sort_unstable();
        matches.push(seed);

        log::debug!(
            "Detection {} seeds a track of {} sightings",
            seed,
            matches.len()
        );
        tracks.push(CandidateTrack {
            target_ind: seed,
            members: matches,
        });
    }

    log::info!(
        "Linked {} detections into {} candidate tracks",
        detections.len(),
        tracks.len()
    );
    Ok(tracks)
}

/// Overlapping detections from other dates, keeping the best IoU per date.
///
/// Runs before claimed detections are removed: when the best match of a date
/// is already claimed, that date contributes nothing.
fn best_match_per_date(
    detections: &[Detection],
    index: &DetectionIndex,
    seed: &Detection,
) -> Vec<usize> {
    let mut best: FxHashMap<ObservationDate, (usize, f64)> = FxHashMap::default();

    for candidate in index.query_overlapping(&seed.bbox) {
        let detection = &detections[candidate];
        if detection.date == seed.date {
            continue;
        }

        let iou = detection.bbox.iou(&seed.bbox);
        best.entry(detection.date)
            .and_modify(|current| {
                // Strictly greater keeps the lowest index on ties
                if iou > current.1 {
                    *current = (candidate, iou);
                }
            })
            .or_insert((candidate, iou));
    }

    best.into_values().map(|(candidate, _)| candidate).collect()
}

fn ensure_single_site(detections: &[Detection]) -> Result<()> {
    if let Some(first) = detections.first()
        && let Some(other) = detections.iter().find(|d| d.site != first.site)
    {
        return Err(NestError::InvariantViolation(format!(
            "detections from sites {:?} and {:?} passed to one matching run",
            first.site, other.site
        )));
    }
    Ok(())
}

/// Flatten tracks into rows, in track order.
pub fn link_tracks(detections: &[Detection], tracks: &[CandidateTrack]) -> Vec<TrackMember> {
    tracks
        .iter()
        .flat_map(|track| track.to_members(detections))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use nestlink_types::bbox::BoundingBox2D;

    fn date(day: u32) -> ObservationDate {
        ObservationDate::from_ymd(2022, 4, day).unwrap()
    }

    fn bird(day: u32, min_x: f64, min_y: f64, max_x: f64, max_y: f64) -> Detection {
        Detection::new("Joule", date(day), BoundingBox2D::new(min_x, min_y, max_x, max_y))
    }

    #[test]
    fn test_empty_input() {
        let tracks = compare_site(&[], &MatchOrder::Input).unwrap();
        assert!(tracks.is_empty());
    }

    #[test]
    fn test_isolated_detection_starts_no_track() {
        let birds = vec![bird(1, 0.0, 0.0, 1.0, 1.0), bird(2, 10.0, 10.0, 11.0, 11.0)];
        let mut claims = ClaimSet::new();
        let tracks = compare_site_with_claims(&birds, &MatchOrder::Input, &mut claims).unwrap();

        assert!(tracks.is_empty());
        assert_eq!(claims.len(), 2);
    }

    #[test]
    fn test_same_date_overlaps_are_not_matched() {
        let birds = vec![bird(1, 0.0, 0.0, 1.0, 1.0), bird(1, 0.5, 0.0, 1.5, 1.0)];
        let tracks = compare_site(&birds, &MatchOrder::Input).unwrap();
        assert!(tracks.is_empty());
    }

    #[test]
    fn test_best_iou_wins_per_date() {
        // Seed [0,10]x[0,10]; index 1 IoU 0.6, index 2 IoU 0.3, both day 2
        let birds = vec![
            bird(1, 0.0, 0.0, 10.0, 10.0),
            bird(2, 0.0, 0.0, 10.0, 6.0),
            bird(2, 0.0, 0.0, 10.0, 3.0),
        ];
        let tracks = compare_site(&birds, &MatchOrder::Input).unwrap();

        assert_eq!(
            tracks,
            vec![CandidateTrack {
                target_ind: 0,
                members: vec![1, 0],
            }]
        );
    }

    #[test]
    fn test_iou_tie_keeps_lowest_index() {
        let birds = vec![
            bird(1, 0.0, 0.0, 4.0, 4.0),
            bird(2, 2.0, 0.0, 6.0, 4.0),
            bird(2, -2.0, 0.0, 2.0, 4.0),
        ];
        let tracks = compare_site(&birds, &MatchOrder::Input).unwrap();
        assert_eq!(tracks[0].members, vec![1, 0]);
    }

    #[test]
    fn test_claimed_best_match_removes_its_date() {
        // Best day-2 match (index 1) is already claimed; the weaker index 2
        // must not stand in for it
        let birds = vec![
            bird(3, 0.0, 0.0, 4.0, 4.0),
            bird(2, 0.0, 0.0, 4.0, 4.0),
            bird(2, 2.0, 0.0, 6.0, 4.0),
        ];
        let mut claims = ClaimSet::new();
        claims.claim(1);

        let tracks = compare_site_with_claims(&birds, &MatchOrder::Input, &mut claims).unwrap();

        assert!(tracks.is_empty());
        assert_eq!(claims.len(), 3);
    }

    #[test]
    fn test_seed_joins_multiple_dates() {
        let birds = vec![
            bird(1, 100.0, 100.0, 101.0, 101.0),
            bird(1, 0.0, 0.0, 4.0, 4.0),
            bird(2, 0.0, 0.0, 4.0, 4.0),
            bird(3, 0.0, 0.0, 4.0, 4.0),
            bird(3, 3.0, 3.0, 8.0, 8.0),
        ];
        let order = MatchOrder::Explicit(vec![0, 3, 2, 1, 4]);
        let tracks = compare_site(&birds, &order).unwrap();

        assert_eq!(tracks.len(), 1);
        assert_eq!(tracks[0].target_ind, 3);
        assert_eq!(tracks[0].members, vec![1, 2, 3]);
    }

    #[test]
    fn test_order_changes_result() {
        // 0 and 2 both overlap 1 but not each other
        let birds = vec![
            bird(1, 0.0, 0.0, 2.0, 2.0),
            bird(2, 1.5, 0.0, 3.5, 2.0),
            bird(3, 3.0, 0.0, 5.0, 2.0),
        ];

        let forward = compare_site(&birds, &MatchOrder::Input).unwrap();
        assert_eq!(forward[0].members, vec![1, 0]);
        assert_eq!(forward.len(), 1);

        let middle_first = compare_site(&birds, &MatchOrder::Explicit(vec![1, 0, 2])).unwrap();
        assert_eq!(middle_first.len(), 1);
        assert_eq!(middle_first[0].members, vec![0, 2, 1]);
    }

    #[test]
    fn test_claim_invariant_over_dense_batch() {
        let mut birds = Vec::new();
        for day in 1..=6 {
            for offset in 0..4 {
                let x = offset as f64 * 0.7 + day as f64 * 0.05;
                birds.push(bird(day, x, 0.0, x + 1.0, 1.0));
            }
        }
        let tracks = compare_site(&birds, &MatchOrder::Input).unwrap();

        let mut seen = FxHashSet::default();
        for track in &tracks {
            for &member in &track.members {
                assert!(seen.insert(member), "detection {} in two tracks", member);
            }
            let seed_date = birds[track.target_ind].date;
            let mut dates = FxHashSet::default();
            for &member in &track.members {
                assert!(dates.insert(birds[member].date));
                if member != track.target_ind {
                    assert_ne!(birds[member].date, seed_date);
                }
            }
        }
    }

    #[test]
    fn test_explicit_order_validation() {
        let birds = vec![bird(1, 0.0, 0.0, 1.0, 1.0), bird(2, 0.0, 0.0, 1.0, 1.0)];

        assert!(compare_site(&birds, &MatchOrder::Explicit(vec![0])).is_err());
        assert!(compare_site(&birds, &MatchOrder::Explicit(vec![0, 0])).is_err());
        assert!(compare_site(&birds, &MatchOrder::Explicit(vec![0, 5])).is_err());
        assert!(compare_site(&birds, &MatchOrder::Explicit(vec![1, 0])).is_ok());
    }

    #[test]
    fn test_mixed_sites_rejected() {
        let mut other = bird(2, 0.0, 0.0, 1.0, 1.0);
        other.site = "Vacation".to_string();
        let birds = vec![bird(1, 0.0, 0.0, 1.0, 1.0), other];

        let err = compare_site(&birds, &MatchOrder::Input).unwrap_err();
        assert!(matches!(err, NestError::InvariantViolation(_)));
    }

    #[test]
    fn test_link_tracks_tags_target() {
        let birds = vec![bird(1, 0.0, 0.0, 1.0, 1.0), bird(2, 0.0, 0.0, 1.0, 1.0)];
        let tracks = compare_site(&birds, &MatchOrder::Input).unwrap();
        let rows = link_tracks(&birds, &tracks);

        assert_eq!(rows.len(), 2);
        assert!(rows.iter().all(|row| row.target_ind == 0));
        assert_eq!(rows[0].detection.date, date(2));
        assert_eq!(rows[1].match_xmax(), 1.0);
    }
}
