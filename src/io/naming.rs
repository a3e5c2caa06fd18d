//! File and directory naming conventions of the survey archive.
//!
//! Flight products are named `<site>_<MM>_<DD>_<YYYY>[_<event>]_projected.<ext>`
//! and live under `.../<year>/<site>/`. Pipeline outputs are named
//! `<site>_<year>_<product>.geojson`.

use crate::error::{NestError, Result};
use nestlink_types::date::ObservationDate;
use nestlink_types::detection::PRIMARY_EVENT;
use once_cell::sync::Lazy;
use regex::Regex;
use std::path::{Path, PathBuf};

static FLIGHT_NAME: Lazy<Regex> = Lazy::new(|| {
    Regex::new(
        r"^(?P<site>\w+)_(?P<month>\d{1,2})_(?P<day>\d{1,2})_(?P<year>\d{4})(?:_(?P<event>\w+?))?_projected",
    )
    .expect("flight name pattern is valid")
});

static PROCESSED_NESTS_NAME: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"^(?P<site>\w+)_(?P<year>\d{4})_processed_nests")
        .expect("nest file pattern is valid")
});

pub const GEOJSON_EXTENSION: &str = "geojson";

/// Site, date and event parsed from a flight file name.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FlightName {
    pub site: String,
    pub date: ObservationDate,
    pub event: String,
}

impl FlightName {
    /// Parse the base name of `path`.
    ///
    /// A missing event, `A`, or any case of `primary` all mean the primary
    /// flight of the day.
    ///
    /// # Examples
    ///
    /// ```
    /// use nestlink::io::naming::FlightName;
    ///
    /// let flight = FlightName::parse("/data/2022/Joule/Joule_03_24_2022_B_projected.geojson")?;
    /// assert_eq!(flight.site, "Joule");
    /// assert_eq!(flight.date.to_string(), "2022-03-24");
    /// assert_eq!(flight.event, "B");
    /// assert_eq!(flight.year(), 2022);
    /// # Ok::<(), nestlink::NestError>(())
    /// ```
    pub fn parse(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let name = base_name(path)?;

        let captures = FLIGHT_NAME.captures(name).ok_or_else(|| {
            NestError::file_name(path, "expected <site>_<MM>_<DD>_<YYYY>[_<event>]_projected")
        })?;

        let number = |group: &str| -> Result<u32> {
            captures[group]
                .parse()
                .map_err(|_| NestError::file_name(path, format!("{} is not a number", group)))
        };
        let (month, day, year) = (number("month")?, number("day")?, number("year")?);
        let date = ObservationDate::from_ymd(year as i32, month, day).ok_or_else(|| {
            NestError::file_name(path, format!("{:02}_{:02}_{} is not a date", month, day, year))
        })?;

        let event = match captures.name("event").map(|m| m.as_str()) {
            Some(token) if !is_primary_event(token) => token.to_string(),
            _ => PRIMARY_EVENT.to_string(),
        };

        Ok(Self {
            site: captures["site"].to_string(),
            date,
            event,
        })
    }

    pub fn year(&self) -> i32 {
        self.date.year()
    }
}

fn is_primary_event(token: &str) -> bool {
    token.eq_ignore_ascii_case("a") || token.eq_ignore_ascii_case(PRIMARY_EVENT)
}

fn base_name(path: &Path) -> Result<&str> {
    path.file_name()
        .and_then(|name| name.to_str())
        .ok_or_else(|| NestError::file_name(path, "no UTF-8 file name"))
}

/// Site/year partition of a file stored as `.../<year>/<site>/<file>`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SiteYear {
    pub site: String,
    pub year: String,
}

impl SiteYear {
    pub fn new(site: impl Into<String>, year: impl Into<String>) -> Self {
        Self {
            site: site.into(),
            year: year.into(),
        }
    }

    /// Read the partition from the two directories above `path`.
    ///
    /// # Examples
    ///
    /// ```
    /// use nestlink::io::naming::SiteYear;
    ///
    /// let key = SiteYear::from_path("/archive/predictions/2022/Joule/Joule_2022_combined.geojson")?;
    /// assert_eq!(key, SiteYear::new("Joule", "2022"));
    /// # Ok::<(), nestlink::NestError>(())
    /// ```
    pub fn from_path(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let mut parents = path.parent().into_iter().flat_map(|dir| dir.iter().rev());

        let site = parents
            .next()
            .and_then(|s| s.to_str())
            .ok_or_else(|| NestError::file_name(path, "missing <site> directory"))?;
        let year = parents
            .next()
            .and_then(|s| s.to_str())
            .ok_or_else(|| NestError::file_name(path, "missing <year> directory"))?;

        if year.parse::<i32>().is_err() {
            return Err(NestError::file_name(
                path,
                format!("expected .../<year>/<site>/<file>, found {:?} as year", year),
            ));
        }

        Ok(Self::new(site, year))
    }

    /// Numeric year of the partition.
    pub fn year_number(&self) -> Result<i32> {
        self.year
            .parse()
            .map_err(|_| NestError::InvalidInput(format!("year {:?} is not a number", self.year)))
    }

    /// `<root>/<year>/<site>`
    pub fn dir_under(&self, root: impl AsRef<Path>) -> PathBuf {
        root.as_ref().join(&self.year).join(&self.site)
    }

    /// `<site>_<year>_<product>.geojson`
    pub fn file_name(&self, product: &str) -> String {
        format!(
            "{}_{}_{}.{}",
            self.site, self.year, product, GEOJSON_EXTENSION
        )
    }
}

pub const COMBINED_PRODUCT: &str = "combined";
pub const DETECTED_NESTS_PRODUCT: &str = "detected_nests";
pub const PROCESSED_NESTS_PRODUCT: &str = "processed_nests";

/// Site named by a `<site>_<year>_processed_nests.<ext>` file.
pub fn processed_nests_site(path: impl AsRef<Path>) -> Result<String> {
    let path = path.as_ref();
    let name = base_name(path)?;
    PROCESSED_NESTS_NAME
        .captures(name)
        .map(|captures| captures["site"].to_string())
        .ok_or_else(|| NestError::file_name(path, "expected <site>_<year>_processed_nests"))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_primary_flight_without_event() {
        let flight = FlightName::parse("Joule_03_24_2022_projected.geojson").unwrap();
        assert_eq!(flight.site, "Joule");
        assert_eq!(flight.event, "primary");
        assert_eq!(flight.date.to_flight_string(), "03_24_2022");
    }

    #[test]
    fn test_primary_aliases() {
        for token in ["A", "a", "PRIMARY", "Primary"] {
            let name = format!("Jetport_04_01_2021_{}_projected.geojson", token);
            assert_eq!(FlightName::parse(&name).unwrap().event, "primary", "{}", token);
        }
    }

    #[test]
    fn test_secondary_event_kept() {
        let flight = FlightName::parse("Jetport_04_01_2021_b_projected.tif").unwrap();
        assert_eq!(flight.event, "b");
    }

    #[test]
    fn test_site_with_underscore() {
        let flight = FlightName::parse("Cypress_City_05_02_2020_projected.geojson").unwrap();
        assert_eq!(flight.site, "Cypress_City");
        assert_eq!(flight.year(), 2020);
    }

    #[test]
    fn test_bad_flight_names() {
        assert!(FlightName::parse("Joule_2022_projected.geojson").is_err());
        assert!(FlightName::parse("Joule_03_24_2022.geojson").is_err());
        assert!(FlightName::parse("Joule_13_40_2022_projected.geojson").is_err());
    }

    #[test]
    fn test_site_year_from_path() {
        let key = SiteYear::from_path("/archive/2021/Jetport/input.geojson").unwrap();
        assert_eq!(key.site, "Jetport");
        assert_eq!(key.year_number().unwrap(), 2021);
        assert_eq!(
            key.dir_under("/out"),
            PathBuf::from("/out").join("2021").join("Jetport")
        );
        assert_eq!(
            key.file_name(DETECTED_NESTS_PRODUCT),
            "Jetport_2021_detected_nests.geojson"
        );
    }

    #[test]
    fn test_site_year_requires_year_directory() {
        assert!(SiteYear::from_path("/archive/Jetport/input.geojson").is_err());
        assert!(SiteYear::from_path("input.geojson").is_err());
    }

    #[test]
    fn test_processed_nests_site() {
        assert_eq!(
            processed_nests_site("/x/2022/Joule/Joule_2022_processed_nests.geojson").unwrap(),
            "Joule"
        );
        assert!(processed_nests_site("nests.geojson").is_err());
    }

    #[test]
    fn test_processed_nests_site_with_digit_token() {
        let key = SiteYear::new("Colony_2B", "2022");
        let path = key.dir_under("/x").join(key.file_name(PROCESSED_NESTS_PRODUCT));
        assert_eq!(processed_nests_site(&path).unwrap(), "Colony_2B");

        let key = SiteYear::new("Lox_73", "2021");
        assert_eq!(
            processed_nests_site(key.file_name(PROCESSED_NESTS_PRODUCT)).unwrap(),
            "Lox_73"
        );
    }
}
