//! Merging of per-flight and per-site tables.

use crate::error::{NestError, Result};
use crate::io::naming::{FlightName, processed_nests_site};
use crate::io::table::{GeoTable, read_nests, read_predictions};
use nestlink_types::detection::Detection;
use nestlink_types::nest::NestSummary;
use std::path::{Path, PathBuf};

/// Combine the prediction tables of a site's flights into one detection table.
///
/// Rows are tagged with the site, date, year and event parsed from each file
/// name and kept only when `score > score_thresh`. Surviving rows get
/// `bird_id`s counting up from 1 in load order. Files with unparseable names
/// or unreadable contents are skipped with a warning.
///
/// The CRS is taken from the first file that declares one, falling back to
/// `default_crs`.
pub fn combine_flights<P: AsRef<Path>>(
    paths: &[P],
    score_thresh: f64,
    default_crs: Option<&str>,
) -> GeoTable<Detection> {
    let mut rows = Vec::new();
    let mut crs: Option<String> = None;
    let mut skipped_files = 0;

    for path in paths {
        let path = path.as_ref();
        let flight = match FlightName::parse(path) {
            Ok(flight) => flight,
            Err(e) => {
                log::warn!("Skipping flight file: {}", e);
                skipped_files += 1;
                continue;
            }
        };
        let table = match read_predictions(path) {
            Ok(table) => table,
            Err(e) => {
                log::warn!("Skipping unreadable flight file {}: {}", path.display(), e);
                skipped_files += 1;
                continue;
            }
        };

        merge_crs(&mut crs, table.crs.as_deref(), path);

        let before = rows.len();
        for prediction in table.rows {
            if prediction.score <= score_thresh {
                continue;
            }
            let bird_id = rows.len() as u64 + 1;
            let mut detection = Detection::new(flight.site.clone(), flight.date, prediction.bbox)
                .with_label(prediction.label)
                .with_score(prediction.score)
                .with_event(flight.event.clone())
                .with_bird_id(bird_id);
            detection.image_path = prediction.image_path;
            rows.push(detection);
        }
        log::debug!(
            "{}: kept {} birds above {}",
            path.display(),
            rows.len() - before,
            score_thresh
        );
    }

    log::info!(
        "Combined {} birds from {} flight files ({} skipped)",
        rows.len(),
        paths.len() - skipped_files,
        skipped_files
    );

    let crs = crs.or_else(|| default_crs.map(str::to_string));
    GeoTable::new(rows, crs)
}

/// Concatenate processed-nest tables from many site/year runs.
///
/// Each row's `site` is replaced with the site named by its file. Files that
/// do not follow `<site>_<year>_processed_nests` or cannot be read are skipped
/// with a warning.
pub fn combine_nest_tables<P: AsRef<Path>>(
    paths: &[P],
    default_crs: Option<&str>,
) -> GeoTable<NestSummary> {
    let mut rows = Vec::new();
    let mut crs: Option<String> = None;

    for path in paths {
        let path = path.as_ref();
        let loaded = processed_nests_site(path).and_then(|site| Ok((site, read_nests(path)?)));
        let (site, table) = match loaded {
            Ok(loaded) => loaded,
            Err(e) => {
                log::warn!(
                    "Mistructured nest file {}, not combined: {}",
                    path.display(),
                    e
                );
                continue;
            }
        };

        merge_crs(&mut crs, table.crs.as_deref(), path);
        rows.extend(table.rows.into_iter().map(|mut nest| {
            nest.site = site.clone();
            nest
        }));
    }

    let crs = crs.or_else(|| default_crs.map(str::to_string));
    GeoTable::new(rows, crs)
}

fn merge_crs(current: &mut Option<String>, incoming: Option<&str>, path: &Path) {
    match (current.as_deref(), incoming) {
        (None, Some(crs)) => *current = Some(crs.to_string()),
        (Some(existing), Some(crs)) if existing != crs => log::warn!(
            "{} declares CRS {} but the combined table uses {}",
            path.display(),
            crs,
            existing
        ),
        _ => {}
    }
}

/// Merge the flight predictions of every site and year under `root`.
///
/// Files are found with [`find_prediction_files`] and combined as in
/// [`combine_flights`], so `bird_id`s run over the whole archive.
pub fn combine_predictions(
    root: impl AsRef<Path>,
    score_thresh: f64,
    default_crs: Option<&str>,
) -> Result<GeoTable<Detection>> {
    let files = find_prediction_files(root)?;
    log::info!("Found {} flight prediction files", files.len());
    Ok(combine_flights(&files, score_thresh, default_crs))
}

/// Flight prediction files laid out as `<root>/<year>/<site>/*_projected.geojson`.
pub fn find_prediction_files(root: impl AsRef<Path>) -> Result<Vec<PathBuf>> {
    glob_sorted(root.as_ref(), "*_projected.geojson")
}

/// Processed-nest files laid out as `<root>/<year>/<site>/*_processed_nests.geojson`.
pub fn find_processed_nest_files(root: impl AsRef<Path>) -> Result<Vec<PathBuf>> {
    glob_sorted(root.as_ref(), "*_processed_nests.geojson")
}

fn glob_sorted(root: &Path, file_pattern: &str) -> Result<Vec<PathBuf>> {
    let pattern = root.join("*").join("*").join(file_pattern);
    let pattern = pattern.to_string_lossy();

    let mut files = Vec::new();
    let entries = glob::glob(&pattern)
        .map_err(|e| NestError::InvalidInput(format!("bad search pattern {}: {}", pattern, e)))?;
    for entry in entries {
        match entry {
            Ok(path) => files.push(path),
            Err(e) => log::warn!("Cannot read {}: {}", e.path().display(), e.error()),
        }
    }
    files.sort();
    Ok(files)
}
