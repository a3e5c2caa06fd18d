use chrono::{Datelike, NaiveDate};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Format used in flight file names, e.g. `Joule_03_24_2022_projected.tif`.
pub const FLIGHT_DATE_FORMAT: &str = "%m_%d_%Y";

/// Format used when dates are written to tables.
pub const TABLE_DATE_FORMAT: &str = "%Y-%m-%d";

/// Calendar date of a survey flight.
///
/// Serialized as an ISO `YYYY-MM-DD` string. Parsing also accepts the
/// `MM_DD_YYYY` form used in flight file names.
///
/// # Examples
///
/// ```
/// use nestlink_types::date::ObservationDate;
///
/// let iso: ObservationDate = "2022-03-24".parse().unwrap();
/// let flight: ObservationDate = "03_24_2022".parse().unwrap();
/// assert_eq!(iso, flight);
/// assert_eq!(iso.year(), 2022);
/// assert_eq!(flight.to_string(), "2022-03-24");
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct ObservationDate(NaiveDate);

impl ObservationDate {
    /// Build a date from year, month and day; `None` if it does not exist.
    pub fn from_ymd(year: i32, month: u32, day: u32) -> Option<Self> {
        NaiveDate::from_ymd_opt(year, month, day).map(Self)
    }

    pub fn year(&self) -> i32 {
        self.0.year()
    }

    /// Render in the flight file-name form `MM_DD_YYYY`.
    pub fn to_flight_string(&self) -> String {
        self.0.format(FLIGHT_DATE_FORMAT).to_string()
    }
}

/// Error returned when a string is neither an ISO nor a flight-name date.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ParseDateError(pub String);

impl fmt::Display for ParseDateError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "unrecognised observation date: {:?}", self.0)
    }
}

impl std::error::Error for ParseDateError {}

impl FromStr for ObservationDate {
    type Err = ParseDateError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let trimmed = s.trim();
        NaiveDate::parse_from_str(trimmed, TABLE_DATE_FORMAT)
            .or_else(|_| NaiveDate::parse_from_str(trimmed, FLIGHT_DATE_FORMAT))
            .map(Self)
            .map_err(|_| ParseDateError(s.to_string()))
    }
}

impl TryFrom<String> for ObservationDate {
    type Error = ParseDateError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        value.parse()
    }
}

impl From<ObservationDate> for String {
    fn from(value: ObservationDate) -> Self {
        value.to_string()
    }
}

impl fmt::Display for ObservationDate {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0.format(TABLE_DATE_FORMAT))
    }
}
