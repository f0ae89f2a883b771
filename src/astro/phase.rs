//! Moon phase age using the moontool (Walker) model: mean elements with the
//! evection, annual equation and variation corrections.

/// 1980 January 0.0
const EPOCH_JD: f64 = 2_444_238.5;
const UNIX_EPOCH_JD: f64 = 2_440_587.5;

const ECLIPTIC_LONGITUDE_AT_EPOCH: f64 = 278.833540;
const ECLIPTIC_LONGITUDE_PERIGEE: f64 = 282.519350;
const ECCENTRICITY: f64 = 0.016718;
const MOON_MEAN_LONGITUDE_AT_EPOCH: f64 = 64.975464;
const MOON_MEAN_PERIGEE_AT_EPOCH: f64 = 349.383063;

pub const SYNODIC_MONTH: f64 = 29.53058868;

/// Rounded age in days → illustration number. Images are not one day apart
/// around the quarters, hence the repeats.
const PHASE_IMAGES: [u8; 31] = [
    1, 1, 2, 3, 4, 5, 6, 8, 8, 9, 10, 11, 11, 12, 13, 13, 14, 15, 16, 17, 18, 19, 20, 21, 22, 23,
    24, 25, 26, 27, 28,
];

fn fix_angle(a: f64) -> f64 {
    a - 360.0 * (a / 360.0).floor()
}

fn kepler(mean_anomaly: f64, ecc: f64) -> f64 {
    let m = mean_anomaly.to_radians();
    let mut e = m;
    for _ in 0..50 {
        let delta = e - ecc * e.sin() - m;
        e -= delta / (1.0 - ecc * e.cos());
        if delta.abs() <= 1e-6 {
            break;
        }
    }
    e
}

/// Days since the last new moon at `epoch` seconds, in `[0, 29.53)`.
pub fn age_in_days(epoch: i64) -> f64 {
    let day = epoch as f64 / 86_400.0 + UNIX_EPOCH_JD - EPOCH_JD;

    let n = fix_angle((360.0 / 365.2422) * day);
    let m = fix_angle(n + ECLIPTIC_LONGITUDE_AT_EPOCH - ECLIPTIC_LONGITUDE_PERIGEE);
    let ec = kepler(m, ECCENTRICITY);
    let ec = ((1.0 + ECCENTRICITY) / (1.0 - ECCENTRICITY)).sqrt() * (ec / 2.0).tan();
    let ec = 2.0 * ec.atan().to_degrees();
    let sun_longitude = fix_angle(ec + ECLIPTIC_LONGITUDE_PERIGEE);

    let ml = fix_angle(13.1763966 * day + MOON_MEAN_LONGITUDE_AT_EPOCH);
    let mm = fix_angle(ml - 0.1114041 * day - MOON_MEAN_PERIGEE_AT_EPOCH);
    let evection = 1.2739 * (2.0 * (ml - sun_longitude) - mm).to_radians().sin();
    let annual = 0.1858 * m.to_radians().sin();
    let a3 = 0.37 * m.to_radians().sin();
    let mmp = mm + evection - annual - a3;
    let centre = 6.2886 * mmp.to_radians().sin();
    let a4 = 0.214 * (2.0 * mmp).to_radians().sin();
    let lp = ml + evection + centre - annual + a4;
    let variation = 0.6583 * (2.0 * (lp - sun_longitude)).to_radians().sin();
    let true_longitude = lp + variation;

    SYNODIC_MONTH * fix_angle(true_longitude - sun_longitude) / 360.0
}

/// Illustration number 1..=28 for a phase age.
pub fn phase_image(age_days: f64) -> u8 {
    let index = age_days.round().clamp(0.0, 30.0) as usize;
    PHASE_IMAGES[index]
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{TimeZone, Utc};

    fn epoch(y: i32, m: u32, d: u32, h: u32, min: u32) -> i64 {
        Utc.with_ymd_and_hms(y, m, d, h, min, 0).unwrap().timestamp()
    }

    #[test]
    fn test_new_moon_age_wraps() {
        // new moon 2024-01-11 11:57 UT
        let age = age_in_days(epoch(2024, 1, 11, 11, 57));
        assert!(age < 0.5 || age > SYNODIC_MONTH - 0.5, "age {age}");
    }

    #[test]
    fn test_full_moon_age() {
        // full moon 2024-01-25 17:54 UT
        let age = age_in_days(epoch(2024, 1, 25, 17, 54));
        assert!((age - 14.77).abs() < 0.5, "age {age}");
    }

    #[test]
    fn test_age_range() {
        let start = epoch(2024, 1, 1, 0, 0);
        for i in 0..400 {
            let age = age_in_days(start + i * 21_600);
            assert!((0.0..SYNODIC_MONTH).contains(&age));
        }
    }

    #[test]
    fn test_phase_image_table() {
        assert_eq!(phase_image(0.2), 1);
        assert_eq!(phase_image(7.0), 8);
        assert_eq!(phase_image(6.6), 8);
        assert_eq!(phase_image(14.8), 13);
        assert_eq!(phase_image(29.5), 28);
    }
}
