//! Reduction of candidate tracks into one summary row per nest.

use crate::compute::temporal::{SurveyCalendar, count_max_consec_detects};
use crate::config::LinkerConfig;
use crate::error::{NestError, Result};
use nestlink_types::detection::TrackMember;
use nestlink_types::nest::NestSummary;
use rustc_hash::FxHashMap;
use std::collections::BTreeMap;

/// Which candidate tracks count as nests.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct NestThresholds {
    /// Members scoring below this are ignored
    pub min_score: f64,
    pub min_detections: usize,
    pub min_consec_detects: usize,
}

impl Default for NestThresholds {
    fn default() -> Self {
        Self::from(&LinkerConfig::default())
    }
}

impl From<&LinkerConfig> for NestThresholds {
    fn from(config: &LinkerConfig) -> Self {
        Self {
            min_score: config.min_score,
            min_detections: config.min_detections,
            min_consec_detects: config.min_consec_detects,
        }
    }
}

impl NestThresholds {
    /// A track qualifies on either enough sightings or a long enough run.
    pub fn qualifies(&self, detections: usize, max_consecutive: usize) -> bool {
        detections >= self.min_detections || max_consecutive >= self.min_consec_detects
    }
}

/// Summarise the tracks of one site/year into nests.
///
/// Tracks are visited in order of first appearance of their `target_ind`.
/// The consecutive-run statistic is measured against every survey date in
/// `members`, including dates only seen on low-scoring sightings.
///
/// Returns [`NestError::InvariantViolation`] if `members` spans more than
/// one site/year.
pub fn process_nests(
    members: &[TrackMember],
    thresholds: &NestThresholds,
) -> Result<Vec<NestSummary>> {
    ensure_single_site_year(members)?;

    let calendar = SurveyCalendar::new(members.iter().map(|member| member.detection.date));
    if let (Some(first), Some(last)) = (calendar.dates().first(), calendar.dates().last()) {
        log::debug!("{} survey dates from {} to {}", calendar.len(), first, last);
    }
    let mut nests = Vec::new();

    for (target_ind, track) in group_by_target(members) {
        let scored: Vec<&TrackMember> = track
            .into_iter()
            .filter(|member| member.detection.score >= thresholds.min_score)
            .collect();

        let dates: Vec<_> = scored.iter().map(|member| member.detection.date).collect();
        let max_consecutive = count_max_consec_detects(&calendar, &dates)?;

        if !thresholds.qualifies(scored.len(), max_consecutive) {
            log::debug!(
                "Track {} rejected: {} sightings, longest run {}",
                target_ind,
                scored.len(),
                max_consecutive
            );
            continue;
        }

        match summarise_track(target_ind, &scored) {
            Some(nest) => nests.push(nest),
            None => log::debug!("Track {} has no sightings above min_score", target_ind),
        }
    }

    log::info!("Summarised {} nests", nests.len());
    Ok(nests)
}

fn ensure_single_site_year(members: &[TrackMember]) -> Result<()> {
    if let Some(first) = members.first() {
        let key = (&first.detection.site, first.detection.year);
        if let Some(other) = members
            .iter()
            .find(|member| (&member.detection.site, member.detection.year) != key)
        {
            return Err(NestError::InvariantViolation(format!(
                "track table mixes {} {} with {} {}",
                first.detection.site,
                first.detection.year,
                other.detection.site,
                other.detection.year
            )));
        }
    }
    Ok(())
}

fn group_by_target(members: &[TrackMember]) -> Vec<(usize, Vec<&TrackMember>)> {
    let mut positions: FxHashMap<usize, usize> = FxHashMap::default();
    let mut groups: Vec<(usize, Vec<&TrackMember>)> = Vec::new();

    for member in members {
        let position = *positions.entry(member.target_ind).or_insert_with(|| {
            groups.push((member.target_ind, Vec::new()));
            groups.len() - 1
        });
        groups[position].1.push(member);
    }

    groups
}

fn summarise_track(target_ind: usize, scored: &[&TrackMember]) -> Option<NestSummary> {
    let first = scored.first()?;
    let count = scored.len() as f64;

    let (species, sum_top1_score, num_obs_top1) = species_vote(scored)?;

    let mean = |value: fn(&TrackMember) -> f64| -> f64 {
        scored.iter().map(|member| value(member)).sum::<f64>() / count
    };
    let xmean = (mean(TrackMember::match_xmin) + mean(TrackMember::match_xmax)) / 2.0;
    let ymean = (mean(TrackMember::match_ymin) + mean(TrackMember::match_ymax)) / 2.0;

    let first_obs = scored.iter().map(|member| member.detection.date).min()?;
    let last_obs = scored.iter().map(|member| member.detection.date).max()?;

    let bird_match = scored
        .iter()
        .map(|member| member.detection.bird_id.to_string())
        .collect::<Vec<_>>()
        .join(",");

    Some(NestSummary {
        nest_id: target_ind,
        site: first.detection.site.clone(),
        year: first.detection.year,
        xmean,
        ymean,
        first_obs,
        last_obs,
        num_obs: scored.len(),
        species,
        sum_top1_score,
        num_obs_top1,
        bird_match,
    })
}

/// Label with the highest summed score, its sum and its vote count.
///
/// Ties go to the lexically smallest label.
fn species_vote(scored: &[&TrackMember]) -> Option<(String, f64, usize)> {
    let mut votes: BTreeMap<&str, (f64, usize)> = BTreeMap::new();
    for member in scored {
        let entry = votes.entry(member.detection.label.as_str()).or_insert((0.0, 0));
        entry.0 += member.detection.score;
        entry.1 += 1;
    }

    let mut winner: Option<(&str, f64, usize)> = None;
    for (label, (sum, count)) in votes {
        match winner {
            Some((_, best, _)) if sum <= best => {}
            _ => winner = Some((label, sum, count)),
        }
    }

    winner.map(|(label, sum, count)| (label.to_string(), sum, count))
}
