/// Sun and moon event calculator for a single observer and date
pub mod moon;
pub mod phase;
pub mod sun;

use crate::domain::{MoonTimes, SunTimes};
use chrono::{DateTime, Duration, LocalResult, NaiveDate, NaiveTime, Offset, TimeZone, Utc};
use chrono_tz::Tz;
use moon::{MiniMoon, MoonEphemeris};

/// Twilight is defined operationally as 90 minutes either side of the sun event.
const TWILIGHT_SECONDS: i64 = 90 * 60;

/// UTC offset of `tz` in seconds at local midnight of `date`.
pub fn offset_seconds_on(tz: &Tz, date: NaiveDate) -> i32 {
    let midnight = date.and_time(NaiveTime::MIN);
    let offset = match tz.offset_from_local_datetime(&midnight) {
        LocalResult::Single(o) | LocalResult::Ambiguous(o, _) => o,
        // zones that skip local midnight on their DST change day
        LocalResult::None => tz.offset_from_utc_datetime(&midnight),
    };
    offset.fix().local_minus_utc()
}

/// Offset in hours, the unit the sun calculation takes.
pub fn offset_hours_on(tz: &Tz, date: NaiveDate) -> f64 {
    f64::from(offset_seconds_on(tz, date)) / 3600.0
}

/// Offset in minutes, the unit the moon calculation takes.
pub fn offset_minutes_on(tz: &Tz, date: NaiveDate) -> i32 {
    offset_seconds_on(tz, date) / 60
}

/// Sunrise, sunset and both twilights for `date`.
///
/// `None` when the sun does not cross the rise/set altitude that day.
pub fn compute_sun_times(latitude: f64, longitude: f64, date: NaiveDate, tz_offset_hours: f64) -> Option<SunTimes> {
    let (rise, set) = sun::rise_set_ut_hours(date, latitude, longitude, 90.0 - sun::SUN_ZENITH)?;
    let sunrise = sun::local_event(date, rise, tz_offset_hours);
    let sunset = sun::local_event(date, set, tz_offset_hours);
    let twilight = Duration::seconds(TWILIGHT_SECONDS);

    Some(SunTimes {
        sunrise,
        sunset,
        morning_twilight: sunrise - twilight,
        evening_twilight: sunset + twilight,
    })
}

pub fn compute_moon_times(latitude: f64, longitude: f64, date: NaiveDate, tz_offset_minutes: i32, tz: &Tz) -> MoonTimes {
    compute_moon_times_with(&MiniMoon, latitude, longitude, date, tz_offset_minutes, tz)
}

/// Moonrise/moonset from any ephemeris. An epoch that lands on local `00:00`
/// means the event does not occur that day.
pub fn compute_moon_times_with<E: MoonEphemeris>(
    ephemeris: &E,
    latitude: f64,
    longitude: f64,
    date: NaiveDate,
    tz_offset_minutes: i32,
    tz: &Tz,
) -> MoonTimes {
    let epochs = ephemeris.moon_times(date, latitude, longitude, tz_offset_minutes);
    MoonTimes {
        moonrise: local_event_time(epochs.rise, tz),
        moonset: local_event_time(epochs.set, tz),
    }
}

fn local_event_time(epoch: i64, tz: &Tz) -> Option<String> {
    let local = DateTime::from_timestamp(epoch, 0)?.with_timezone(tz);
    let hhmm = local.format("%H:%M").to_string();
    (hhmm != "00:00").then_some(hhmm)
}

pub fn moon_phase_age(instant: DateTime<Utc>) -> f64 {
    phase::age_in_days(instant.timestamp())
}
