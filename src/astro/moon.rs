//! Moonrise/moonset from the low-precision "minimoon" lunar series.
//!
//! The moon's altitude is sampled every two hours across the local day and each
//! three-sample window is fitted with a parabola to locate horizon crossings.

use chrono::{NaiveDate, NaiveTime};

/// Epoch seconds of moonrise and moonset for one local day.
///
/// An event that does not happen that day is reported as local midnight of the
/// day, which the calculator turns into "no event".
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RiseSetEpochs {
    pub rise: i64,
    pub set: i64,
}

/// Source of moonrise/moonset instants.
pub trait MoonEphemeris {
    fn moon_times(&self, date: NaiveDate, latitude: f64, longitude: f64, offset_minutes: i32) -> RiseSetEpochs;
}

/// sin(+8′): the moon's centre altitude at apparent rise
const SIN_H0: f64 = 0.0023271056;

const TWO_PI: f64 = 6.283185307;
const ARCSEC_PER_RADIAN: f64 = 206264.8062;
const COS_EPS: f64 = 0.91748;
const SIN_EPS: f64 = 0.39778;

/// MJD of 1970-01-01
const MJD_UNIX_EPOCH: i64 = 40_587;

#[derive(Debug, Clone, Copy, Default)]
pub struct MiniMoon;

impl MoonEphemeris for MiniMoon {
    fn moon_times(&self, date: NaiveDate, latitude: f64, longitude: f64, offset_minutes: i32) -> RiseSetEpochs {
        let utc_midnight = date.and_time(NaiveTime::MIN).and_utc().timestamp();
        let local_midnight = utc_midnight - i64::from(offset_minutes) * 60;
        let mjd = (utc_midnight.div_euclid(86_400) + MJD_UNIX_EPOCH) as f64 - f64::from(offset_minutes) / 1440.0;

        let (rise, set) = scan_day(mjd, latitude, longitude);
        let to_epoch = |hours: Option<f64>| match hours {
            Some(h) if (0.0..24.0).contains(&h) => local_midnight + (h * 60.0).round() as i64 * 60,
            _ => local_midnight,
        };

        RiseSetEpochs {
            rise: to_epoch(rise),
            set: to_epoch(set),
        }
    }
}

/// Rise and set as hours after the local midnight at `mjd`.
fn scan_day(mjd: f64, latitude: f64, longitude: f64) -> (Option<f64>, Option<f64>) {
    let (sglat, cglat) = latitude.to_radians().sin_cos();
    let altitude = |hour: f64| sin_altitude(mjd, hour, longitude, cglat, sglat) - SIN_H0;

    let mut rise = None;
    let mut set = None;
    let mut hour = 1.0;
    let mut ym = altitude(hour - 1.0);

    while hour <= 25.0 && (rise.is_none() || set.is_none()) {
        let yz = altitude(hour);
        let yp = altitude(hour + 1.0);
        let q = Quadratic::fit(ym, yz, yp);

        match q.roots {
            1 if ym < 0.0 => rise = Some(hour + q.z1),
            1 => set = Some(hour + q.z1),
            2 if q.ye < 0.0 => {
                rise = Some(hour + q.z2);
                set = Some(hour + q.z1);
            }
            2 => {
                rise = Some(hour + q.z1);
                set = Some(hour + q.z2);
            }
            _ => {}
        }

        ym = yp;
        hour += 2.0;
    }
    (rise, set)
}

/// Parabola through three samples at x = -1, 0, +1
struct Quadratic {
    roots: u8,
    z1: f64,
    z2: f64,
    ye: f64,
}

impl Quadratic {
    fn fit(ym: f64, yz: f64, yp: f64) -> Self {
        let a = 0.5 * (ym + yp) - yz;
        let b = 0.5 * (yp - ym);
        let c = yz;
        let xe = -b / (2.0 * a);
        let ye = (a * xe + b) * xe + c;
        let dis = b * b - 4.0 * a * c;

        let mut roots = 0;
        let mut z1 = 0.0;
        let mut z2 = 0.0;
        if dis > 0.0 {
            let dx = 0.5 * dis.sqrt() / a.abs();
            z1 = xe - dx;
            z2 = xe + dx;
            if z1.abs() < 1.0 {
                roots += 1;
            }
            if z2.abs() < 1.0 {
                roots += 1;
            }
            if z1 < -1.0 {
                z1 = z2;
            }
        }
        Self { roots, z1, z2, ye }
    }
}

fn sin_altitude(mjd: f64, hour: f64, longitude: f64, cglat: f64, sglat: f64) -> f64 {
    let mjd = mjd + hour / 24.0;
    let t = (mjd - 51544.5) / 36525.0;
    let (dec, ra) = mini_moon(t);
    let tau = 15.0 * (local_mean_sidereal_hours(mjd, longitude) - ra);
    let dec = dec.to_radians();
    sglat * dec.sin() + cglat * dec.cos() * tau.to_radians().cos()
}

fn frac(x: f64) -> f64 {
    let f = x - x.trunc();
    if f < 0.0 {
        f + 1.0
    } else {
        f
    }
}

fn local_mean_sidereal_hours(mjd: f64, longitude: f64) -> f64 {
    let d = mjd - 51544.5;
    let t = d / 36525.0;
    let lst = 360.0 * frac((280.46061839 + 360.98564736629 * d + 0.000387933 * t * t - t * t * t / 38_710_000.0) / 360.0);
    lst / 15.0 + longitude / 15.0
}

/// Declination (degrees) and right ascension (hours) of the moon, `t` in Julian centuries from J2000.
fn mini_moon(t: f64) -> (f64, f64) {
    let lo = frac(0.606433 + 1336.855225 * t);
    let l = TWO_PI * frac(0.374897 + 1325.552410 * t);
    let l2 = l * 2.0;
    let ls = TWO_PI * frac(0.993133 + 99.997361 * t);
    let d = TWO_PI * frac(0.827361 + 1236.853086 * t);
    let d2 = d * 2.0;
    let f = TWO_PI * frac(0.259086 + 1342.227825 * t);
    let f2 = f * 2.0;

    let sinls = ls.sin();
    let sinf2 = f2.sin();

    let dl = 22640.0 * l.sin() - 4586.0 * (l - d2).sin() + 2370.0 * d2.sin() + 769.0 * l2.sin()
        - 668.0 * sinls
        - 412.0 * sinf2
        - 212.0 * (l2 - d2).sin()
        - 206.0 * (l + ls - d2).sin()
        + 192.0 * (l + d2).sin()
        - 165.0 * (ls - d2).sin()
        - 125.0 * d.sin()
        - 110.0 * (l + ls).sin()
        + 148.0 * (l - ls).sin()
        - 55.0 * (f2 - d2).sin();

    let s = f + (dl + 412.0 * sinf2 + 541.0 * sinls) / ARCSEC_PER_RADIAN;
    let h = f - d2;
    let n = -526.0 * h.sin() + 44.0 * (l + h).sin() - 31.0 * (-l + h).sin() - 23.0 * (ls + h).sin()
        + 11.0 * (-ls + h).sin()
        - 25.0 * (-l2 + f).sin()
        + 21.0 * (-l + f).sin();

    let lambda = TWO_PI * frac(lo + dl / 1_296_000.0);
    let beta = (18520.0 * s.sin() + n) / ARCSEC_PER_RADIAN;

    let cb = beta.cos();
    let x = cb * lambda.cos();
    let v = cb * lambda.sin();
    let w = beta.sin();
    let y = COS_EPS * v - SIN_EPS * w;
    let z = SIN_EPS * v + COS_EPS * w;
    let rho = (1.0 - z * z).sqrt();

    let dec = (360.0 / TWO_PI) * (z / rho).atan();
    let mut ra = (48.0 / TWO_PI) * (y / (x + rho)).atan();
    if ra < 0.0 {
        ra += 24.0;
    }
    (dec, ra)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn lampasas(date: NaiveDate, offset_minutes: i32) -> RiseSetEpochs {
        MiniMoon.moon_times(date, 30.8910, -98.4265, offset_minutes)
    }

    fn local_midnight(date: NaiveDate, offset_minutes: i32) -> i64 {
        date.and_time(NaiveTime::MIN).and_utc().timestamp() - i64::from(offset_minutes) * 60
    }

    #[test]
    fn test_full_moon_rises_near_sunset() {
        let date = NaiveDate::from_ymd_opt(2024, 6, 21).unwrap();
        let epochs = lampasas(date, -300);
        let midnight = local_midnight(date, -300);
        let rise_hours = (epochs.rise - midnight) as f64 / 3600.0;
        let set_hours = (epochs.set - midnight) as f64 / 3600.0;
        assert!((20.5..21.3).contains(&rise_hours), "rise {rise_hours}");
        assert!((5.4..6.2).contains(&set_hours), "set {set_hours}");
    }

    #[test]
    fn test_missing_rise_is_local_midnight() {
        // the moon rises just after midnight, so 25 June has no moonrise
        let date = NaiveDate::from_ymd_opt(2024, 6, 25).unwrap();
        let epochs = lampasas(date, -300);
        assert_eq!(epochs.rise, local_midnight(date, -300));
        assert_ne!(epochs.set, local_midnight(date, -300));
    }

    #[test]
    fn test_frac_of_negative() {
        assert!((frac(-0.25) - 0.75).abs() < 1e-12);
        assert!((frac(3.5) - 0.5).abs() < 1e-12);
    }

    #[test]
    fn test_declination_bounded() {
        for i in 0..60 {
            let (dec, ra) = mini_moon(0.24 + i as f64 * 0.0005);
            assert!(dec.abs() < 29.0);
            assert!((0.0..24.0).contains(&ra));
        }
    }
}
