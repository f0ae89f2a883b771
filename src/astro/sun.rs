//! Sunrise/sunset from the classic "sunriset" low-precision solar model.
//!
//! Same series as the C `sunriset` routines that most scripting runtimes embed;
//! accurate to a minute or two for the range of dates this service handles.

use chrono::{NaiveDate, NaiveDateTime, NaiveTime};

/// Zenith used for rise/set: 90°50′. The common runtime default of 90°35′ puts
/// events a few minutes off.
pub const SUN_ZENITH: f64 = 90.0 + 50.0 / 60.0;

/// 2000-01-01 12:00 UTC
const J2000_EPOCH: i64 = 946_728_000;

const RADEG: f64 = 180.0 / std::f64::consts::PI;

fn sind(x: f64) -> f64 {
    x.to_radians().sin()
}

fn cosd(x: f64) -> f64 {
    x.to_radians().cos()
}

fn atan2d(y: f64, x: f64) -> f64 {
    y.atan2(x).to_degrees()
}

fn revolution(x: f64) -> f64 {
    x - 360.0 * (x / 360.0).floor()
}

fn rev180(x: f64) -> f64 {
    x - 360.0 * (x / 360.0 + 0.5).floor()
}

fn gmst0(d: f64) -> f64 {
    revolution((180.0 + 356.0470 + 282.9404) + (0.9856002585 + 4.70935e-5) * d)
}

/// Ecliptic longitude and distance (AU) of the sun
fn sun_position(d: f64) -> (f64, f64) {
    let m = revolution(356.0470 + 0.9856002585 * d);
    let w = 282.9404 + 4.70935e-5 * d;
    let e = 0.016709 - 1.151e-9 * d;

    let ea = m + e * RADEG * sind(m) * (1.0 + e * cosd(m));
    let x = cosd(ea) - e;
    let y = (1.0 - e * e).sqrt() * sind(ea);
    let r = (x * x + y * y).sqrt();
    let v = atan2d(y, x);
    let mut lon = v + w;
    if lon >= 360.0 {
        lon -= 360.0;
    }
    (lon, r)
}

/// Right ascension, declination and distance of the sun
fn sun_ra_dec(d: f64) -> (f64, f64, f64) {
    let (lon, r) = sun_position(d);
    let x = r * cosd(lon);
    let y = r * sind(lon);
    let obl_ecl = 23.4393 - 3.563e-7 * d;
    let z = y * sind(obl_ecl);
    let y = y * cosd(obl_ecl);
    (atan2d(y, x), atan2d(z, (x * x + y * y).sqrt()), r)
}

/// Rise and set in fractional UT hours after midnight UTC of `date`.
///
/// `None` when the sun stays entirely above or below `altitude` that day.
pub fn rise_set_ut_hours(date: NaiveDate, latitude: f64, longitude: f64, altitude: f64) -> Option<(f64, f64)> {
    let midnight_utc = date.and_time(NaiveTime::MIN).and_utc().timestamp();
    let d = (midnight_utc - J2000_EPOCH) as f64 / 86_400.0 + 2.0 - longitude / 360.0;

    let sidtime = revolution(gmst0(d) + 180.0 + longitude);
    let (ra, dec, r) = sun_ra_dec(d);
    let tsouth = 12.0 - rev180(sidtime - ra) / 15.0;

    // upper limb
    let altitude = altitude - 0.2666 / r;

    let cost = (sind(altitude) - sind(latitude) * sind(dec)) / (cosd(latitude) * cosd(dec));
    if cost >= 1.0 || cost <= -1.0 {
        return None;
    }
    let t = cost.acos().to_degrees() / 15.0;
    Some((tsouth - t, tsouth + t))
}

/// Local wall-clock instant for a UT hour, truncated to the minute.
///
/// The hour is shifted by the offset and wrapped into the observation date.
pub fn local_event(date: NaiveDate, ut_hours: f64, offset_hours: f64) -> NaiveDateTime {
    let n = (ut_hours + offset_hours).rem_euclid(24.0);
    let hours = n.trunc() as u32;
    let minutes = (60.0 * (n - n.trunc())) as u32;
    let time = NaiveTime::from_hms_opt(hours.min(23), minutes.min(59), 0).unwrap_or(NaiveTime::MIN);
    date.and_time(time)
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Timelike;

    #[test]
    fn test_zenith_constant() {
        assert!((SUN_ZENITH - 90.833_333_333).abs() < 1e-9);
    }

    #[test]
    fn test_equinox_day_near_twelve_hours() {
        let date = NaiveDate::from_ymd_opt(2024, 3, 20).unwrap();
        let (rise, set) = rise_set_ut_hours(date, 0.0, 0.0, 90.0 - SUN_ZENITH).unwrap();
        let length = set - rise;
        assert!((length - 12.1).abs() < 0.1, "day length {length}");
    }

    #[test]
    fn test_polar_night_has_no_events() {
        let date = NaiveDate::from_ymd_opt(2024, 12, 21).unwrap();
        assert!(rise_set_ut_hours(date, 80.0, 15.0, 90.0 - SUN_ZENITH).is_none());
    }

    #[test]
    fn test_midnight_sun_has_no_events() {
        let date = NaiveDate::from_ymd_opt(2024, 6, 21).unwrap();
        assert!(rise_set_ut_hours(date, 80.0, 15.0, 90.0 - SUN_ZENITH).is_none());
    }

    #[test]
    fn test_local_event_wraps_and_truncates() {
        let date = NaiveDate::from_ymd_opt(2024, 1, 1).unwrap();
        let t = local_event(date, 2.999, -5.0);
        assert_eq!((t.hour(), t.minute()), (21, 59));
        assert_eq!(t.date(), date);
    }
}
