//! Site/year batch steps: each reads one table and writes the next.
//!
//! | step | reads | writes |
//! |---|---|---|
//! | [`combine_files`] | flight predictions | `<site>_<year>_combined.geojson` |
//! | [`detect_nests`] | combined detections | `<site>_<year>_detected_nests.geojson` |
//! | [`summarize_nests`] | detected nests | `<site>_<year>_processed_nests.geojson` |
//!
//! Outputs keep the CRS of their input, or the configured default when the
//! input has none, and are written even when they have no rows.

use crate::combine::combine_flights;
use crate::compute::matcher::{MatchOrder, compare_site, link_tracks};
use crate::compute::summary::{NestThresholds, process_nests};
use crate::config::LinkerConfig;
use crate::error::Result;
use crate::io::naming::{
    COMBINED_PRODUCT, DETECTED_NESTS_PRODUCT, PROCESSED_NESTS_PRODUCT, SiteYear,
};
use crate::io::table::{GeoTable, read_detections, read_tracks, write_detections, write_nests, write_tracks};
use std::path::{Path, PathBuf};

/// Combine flight prediction files into `<savedir>/<site>_<year>_combined.geojson`.
pub fn combine_files<P: AsRef<Path>>(
    flight_files: &[P],
    site_year: &SiteYear,
    savedir: impl AsRef<Path>,
    config: &LinkerConfig,
) -> Result<PathBuf> {
    let table = combine_flights(
        flight_files,
        config.score_thresh,
        config.default_crs.as_deref(),
    );
    let output = savedir.as_ref().join(site_year.file_name(COMBINED_PRODUCT));
    write_detections(&output, &table)?;
    Ok(output)
}

/// Link a combined detection table into candidate nest tracks.
///
/// Every output row is stamped with the partition's site and year.
///
/// `target_ind` counts rows that parsed. When the reader skips malformed
/// rows it no longer matches the row position in `detection_file`; use
/// `bird_id` to refer back to the input.
pub fn detect_nests(
    detection_file: impl AsRef<Path>,
    site_year: &SiteYear,
    savedir: impl AsRef<Path>,
    config: &LinkerConfig,
) -> Result<PathBuf> {
    let detections = read_detections(detection_file.as_ref())?;
    let crs = detections.crs_or(config.default_crs.as_deref());
    let year = site_year.year_number()?;

    if detections.skipped > 0 {
        log::warn!(
            "{}: {} malformed rows skipped, target_ind counts the {} rows kept",
            detection_file.as_ref().display(),
            detections.skipped,
            detections.len()
        );
    }

    let tracks = compare_site(&detections.rows, &MatchOrder::Input)?;
    let mut members = link_tracks(&detections.rows, &tracks);
    for member in &mut members {
        member.detection.site = site_year.site.clone();
        member.detection.year = year;
    }

    let output = savedir
        .as_ref()
        .join(site_year.file_name(DETECTED_NESTS_PRODUCT));
    write_tracks(&output, &GeoTable::new(members, crs))?;
    Ok(output)
}

/// Reduce a candidate track table to one row per nest.
pub fn summarize_nests(
    nest_file: impl AsRef<Path>,
    site_year: &SiteYear,
    savedir: impl AsRef<Path>,
    config: &LinkerConfig,
) -> Result<PathBuf> {
    let tracks = read_tracks(nest_file.as_ref())?;
    let crs = tracks.crs_or(config.default_crs.as_deref());

    let nests = process_nests(&tracks.rows, &NestThresholds::from(config))?;

    let output = savedir
        .as_ref()
        .join(site_year.file_name(PROCESSED_NESTS_PRODUCT));
    write_nests(&output, &GeoTable::new(nests, crs))?;
    Ok(output)
}
