//! Longest run of consecutive survey dates on which a track was detected.
//!
//! "Consecutive" means consecutive among the dates a site was actually
//! surveyed, not consecutive calendar days: with surveys on March 1, 8 and 20,
//! sightings on March 8 and 20 form a run of two.

use crate::error::{NestError, Result};
use nestlink_types::date::ObservationDate;
use std::collections::BTreeSet;

/// The distinct survey dates of one site/year, in chronological order.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SurveyCalendar {
    dates: Vec<ObservationDate>,
}

impl SurveyCalendar {
    /// Build a calendar; duplicates are collapsed and dates sorted.
    pub fn new(dates: impl IntoIterator<Item = ObservationDate>) -> Self {
        let unique: BTreeSet<ObservationDate> = dates.into_iter().collect();
        Self {
            dates: unique.into_iter().collect(),
        }
    }

    /// 0-based position of `date` among the survey dates.
    pub fn rank(&self, date: &ObservationDate) -> Option<usize> {
        self.dates.binary_search(date).ok()
    }

    pub fn dates(&self) -> &[ObservationDate] {
        &self.dates
    }

    pub fn len(&self) -> usize {
        self.dates.len()
    }

    pub fn is_empty(&self) -> bool {
        self.dates.is_empty()
    }
}

/// Length of the longest run of consecutive survey dates in `track_dates`.
///
/// A track seen on one date has a run of 1; no dates gives 0. Repeated dates
/// count once. Every track date must be one of the calendar's survey dates.
///
/// # Examples
///
/// ```
/// use nestlink::compute::temporal::{SurveyCalendar, count_max_consec_detects};
/// use nestlink_types::date::ObservationDate;
///
/// let day = |d| ObservationDate::from_ymd(2022, 5, d).unwrap();
/// let calendar = SurveyCalendar::new([1, 2, 3, 4, 5].map(day));
///
/// assert_eq!(count_max_consec_detects(&calendar, &[day(1), day(2), day(4)])?, 2);
/// assert_eq!(count_max_consec_detects(&calendar, &[day(1)])?, 1);
/// assert_eq!(count_max_consec_detects(&calendar, &[])?, 0);
/// # Ok::<(), nestlink::NestError>(())
/// ```
pub fn count_max_consec_detects(
    calendar: &SurveyCalendar,
    track_dates: &[ObservationDate],
) -> Result<usize> {
    let mut ranks = Vec::with_capacity(track_dates.len());
    for date in track_dates {
        let rank = calendar.rank(date).ok_or_else(|| {
            NestError::InvariantViolation(format!(
                "track observed on {} which is not a survey date",
                date
            ))
        })?;
        ranks.push(rank);
    }
    ranks.sort_unstable();
    ranks.dedup();

    let Some(&first) = ranks.first() else {
        return Ok(0);
    };

    let mut longest = 1;
    let mut current = 1;
    let mut previous = first;
    for &rank in &ranks[1..] {
        if rank == previous + 1 {
            current += 1;
            longest = longest.max(current);
        } else {
            current = 1;
        }
        previous = rank;
    }

    Ok(longest)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn day(d: u32) -> ObservationDate {
        ObservationDate::from_ymd(2021, 3, d).unwrap()
    }

    fn calendar() -> SurveyCalendar {
        SurveyCalendar::new([day(5), day(1), day(3), day(9), day(7), day(3)])
    }

    #[test]
    fn test_calendar_sorted_and_deduplicated() {
        let calendar = calendar();
        assert_eq!(calendar.len(), 5);
        assert_eq!(calendar.rank(&day(1)), Some(0));
        assert_eq!(calendar.rank(&day(9)), Some(4));
        assert_eq!(calendar.rank(&day(2)), None);
    }

    #[test]
    fn test_gaps_between_survey_dates_still_consecutive() {
        let calendar = calendar();
        let run = count_max_consec_detects(&calendar, &[day(3), day(5), day(7)]).unwrap();
        assert_eq!(run, 3);
    }

    #[test]
    fn test_longest_of_several_runs() {
        let calendar = calendar();
        let run = count_max_consec_detects(&calendar, &[day(9), day(1), day(5), day(7)]).unwrap();
        assert_eq!(run, 3);
    }

    #[test]
    fn test_no_adjacent_dates() {
        let calendar = calendar();
        let run = count_max_consec_detects(&calendar, &[day(1), day(5), day(9)]).unwrap();
        assert_eq!(run, 1);
    }

    #[test]
    fn test_duplicate_dates_count_once() {
        let calendar = calendar();
        let run = count_max_consec_detects(&calendar, &[day(3), day(3), day(5)]).unwrap();
        assert_eq!(run, 2);
    }

    #[test]
    fn test_unknown_date_is_invariant_violation() {
        let calendar = calendar();
        let err = count_max_consec_detects(&calendar, &[day(2)]).unwrap_err();
        assert!(matches!(err, NestError::InvariantViolation(_)));
    }
}
