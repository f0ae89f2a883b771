/// Domain models for the application
use crate::errors::{ApiError, ApiResult};
use crate::utils::sanitize_text;
use chrono::{Datelike, NaiveDate, NaiveDateTime};
use chrono_tz::Tz;
use serde::{Deserialize, Serialize};
use std::time::Duration;

const MAX_NAME_CHARS: usize = 32;
const DEFAULT_DAYS: u32 = 3;
pub const MAX_DAYS: u32 = 10;

/// Observer position; validated by `SkyQuery::validate` before any calculation.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct Location {
    pub latitude: f64,
    pub longitude: f64,
    pub timezone: Tz,
}

/// Query string of the sky routes, exactly as received
#[derive(Debug, Default, Deserialize)]
pub struct RawSkyParams {
    pub name: Option<String>,
    pub lat: Option<String>,
    pub long: Option<String>,
    pub timezone: Option<String>,
    pub days: Option<String>,
    pub refresh: Option<String>,
}

/// Validated request for one observer
#[derive(Debug, Clone)]
pub struct SkyQuery {
    pub name: String,
    pub location: Location,
    pub days: u32,
    /// Bypass the cached tables
    pub refresh: bool,
}

fn parse_number(raw: Option<&str>) -> Option<f64> {
    raw?.trim().parse::<f64>().ok().filter(|v| v.is_finite())
}

impl SkyQuery {
    /// Check every parameter and report all problems at once.
    pub fn validate(raw: &RawSkyParams) -> ApiResult<Self> {
        let mut problems = Vec::new();
        let name = sanitize_text(raw.name.as_deref().unwrap_or(""), MAX_NAME_CHARS);

        let latitude = match parse_number(raw.lat.as_deref()) {
            None => {
                problems.push("Latitude must be numeric.".to_string());
                None
            }
            Some(v) if !(-90.0..=90.0).contains(&v) => {
                problems.push("Latitude must be in the range -90 to 90.".to_string());
                None
            }
            Some(v) => Some(v),
        };

        let longitude = match parse_number(raw.long.as_deref()) {
            None => {
                problems.push("Longitude must be numeric.".to_string());
                None
            }
            Some(v) if !(-180.0..=180.0).contains(&v) => {
                problems.push("Longitude must be in the range -180 to 180.".to_string());
                None
            }
            Some(v) => Some(v),
        };

        let timezone = raw.timezone.as_deref().and_then(|tz| tz.trim().parse::<Tz>().ok());
        if timezone.is_none() {
            problems.push("Timezone contains an unrecognized value.".to_string());
        }

        let days = match raw.days.as_deref().map(str::trim) {
            None | Some("") => Some(DEFAULT_DAYS),
            Some(s) => match s.parse::<i64>() {
                Err(_) => {
                    problems.push("Days must be numeric.".to_string());
                    None
                }
                Ok(d) if !(1..=i64::from(MAX_DAYS)).contains(&d) => {
                    problems.push(format!("Days must be in the range 1 to {MAX_DAYS}."));
                    None
                }
                Ok(d) => u32::try_from(d).ok(),
            },
        };

        let refresh = raw
            .refresh
            .as_deref()
            .is_some_and(|r| matches!(r.trim().to_ascii_lowercase().as_str(), "true" | "1" | "yes"));

        match (latitude, longitude, timezone, days) {
            (Some(latitude), Some(longitude), Some(timezone), Some(days)) if problems.is_empty() => Ok(Self {
                name,
                location: Location {
                    latitude,
                    longitude,
                    timezone,
                },
                days,
                refresh,
            }),
            _ => Err(ApiError::Validation(problems)),
        }
    }
}

/// Sun events for one observation date, as local wall-clock date-times.
///
/// Twilight is sunrise minus 90 minutes and sunset plus 90 minutes, so
/// `morning_twilight` may fall on the previous calendar day.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct SunTimes {
    pub sunrise: NaiveDateTime,
    pub sunset: NaiveDateTime,
    pub morning_twilight: NaiveDateTime,
    pub evening_twilight: NaiveDateTime,
}

/// Local `hh:mm` of moonrise/moonset; `None` when the event does not happen that day.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct MoonTimes {
    pub moonrise: Option<String>,
    pub moonset: Option<String>,
}

/// Month and day as printed by the remote pages; the year is inferred when filtering.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct RowDate {
    pub month: u32,
    pub day: u32,
}

const MONTHS: [&str; 12] = [
    "jan", "feb", "mar", "apr", "may", "jun", "jul", "aug", "sep", "oct", "nov", "dec",
];

impl RowDate {
    pub fn new(month: u32, day: u32) -> Option<Self> {
        // 2000 is a leap year, so Feb 29 is accepted here and rejected later if needed
        NaiveDate::from_ymd_opt(2000, month, day).map(|_| Self { month, day })
    }

    pub fn from_date(date: NaiveDate) -> Self {
        Self {
            month: date.month(),
            day: date.day(),
        }
    }

    /// Parse `"18 Oct"`, `"Oct 18"`, `"10/18"` or `"10/18/2026"`.
    pub fn parse(s: &str) -> Option<Self> {
        let s = s.trim();
        if s.contains('/') {
            let mut parts = s.split('/').map(|p| p.trim().parse::<u32>().ok());
            let month = parts.next()??;
            let day = parts.next()??;
            return Self::new(month, day);
        }

        let mut month = None;
        let mut day = None;
        for token in s.split(|c: char| c.is_whitespace() || c == ',' || c == '.') {
            if token.is_empty() {
                continue;
            }
            if let Ok(n) = token.parse::<u32>() {
                day.get_or_insert(n);
            } else if let Some(prefix) = token.get(..3) {
                let prefix = prefix.to_ascii_lowercase();
                if let Some(i) = MONTHS.iter().position(|m| *m == prefix) {
                    month.get_or_insert(i as u32 + 1);
                }
            }
        }
        Self::new(month?, day?)
    }
}

/// Position of a satellite at one point of a pass
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PassPoint {
    pub time: String,
    pub altitude: String,
    pub azimuth: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct IssPassRow {
    pub date: RowDate,
    pub magnitude: String,
    pub start: PassPoint,
    pub highest: PassPoint,
    pub end: PassPoint,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct IridiumFlareRow {
    pub date: RowDate,
    pub time: String,
    pub magnitude: String,
    pub altitude: String,
    pub azimuth: String,
    pub satellite: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PlanetPositionRow {
    pub date: RowDate,
    pub name: String,
    pub rise: String,
    pub set: String,
    pub meridian: String,
    pub constellation: String,
}

/// One parsed row of remote event data
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum EventRow {
    IssPass(IssPassRow),
    IridiumFlare(IridiumFlareRow),
    PlanetPosition(PlanetPositionRow),
}

impl EventRow {
    pub fn date(&self) -> RowDate {
        match self {
            EventRow::IssPass(r) => r.date,
            EventRow::IridiumFlare(r) => r.date,
            EventRow::PlanetPosition(r) => r.date,
        }
    }
}

/// Which remote table a cache entry holds
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DataKind {
    Iss,
    Iridium,
    Planets,
}

impl DataKind {
    /// Days past today that one fetch covers.
    pub fn horizon_days(self) -> u64 {
        match self {
            DataKind::Iss => 10,
            DataKind::Iridium => 7,
            DataKind::Planets => 0,
        }
    }

    pub fn is_satellite(self) -> bool {
        matches!(self, DataKind::Iss | DataKind::Iridium)
    }
}

/// Result of one fetch-and-parse cycle, before it is stored.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FetchedTable {
    pub rows: Vec<EventRow>,
    /// Last date through which `rows` are known to be complete.
    pub horizon: NaiveDate,
}

/// Stored form of a fetched table
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CacheEntry {
    pub source_key: String,
    pub kind: DataKind,
    pub horizon: NaiveDate,
    pub rows: Vec<EventRow>,
}

/// Time-to-live per data family, enforced by the store
#[derive(Debug, Clone, Copy)]
pub struct CacheTtls {
    pub satellite: Duration,
    pub planet: Duration,
}

impl Default for CacheTtls {
    fn default() -> Self {
        Self {
            satellite: Duration::from_secs(10 * 86_400),
            planet: Duration::from_secs(86_400),
        }
    }
}

impl CacheTtls {
    pub fn for_kind(&self, kind: DataKind) -> Duration {
        if kind.is_satellite() {
            self.satellite
        } else {
            self.planet
        }
    }
}

/// Sun and moon times for one day of a report
#[derive(Debug, Clone, Serialize)]
pub struct DayTimes {
    pub date: NaiveDate,
    pub morning_twilight: Option<String>,
    pub sunrise: Option<String>,
    pub sunset: Option<String>,
    pub evening_twilight: Option<String>,
    pub moonrise: Option<String>,
    pub moonset: Option<String>,
    pub moon_age_days: f64,
    pub moon_image: u8,
}

#[derive(Debug, Serialize)]
pub struct SunMoonReport {
    pub name: String,
    pub location: Location,
    pub start: NaiveDate,
    pub days: Vec<DayTimes>,
}

#[derive(Debug, Serialize)]
pub struct EventReport {
    pub source: DataKind,
    pub start: NaiveDate,
    pub end: NaiveDate,
    pub rows: Vec<EventRow>,
}

#[derive(Debug, Serialize)]
pub struct NightSkyReport {
    pub sun_moon: SunMoonReport,
    pub planets: EventReport,
    pub iss: EventReport,
}

/// Health check response
#[derive(Serialize)]
pub struct Health {
    pub status: &'static str,
    pub now: chrono::DateTime<chrono::Utc>,
}
