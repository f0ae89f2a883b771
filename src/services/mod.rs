/// Business logic services layer
use crate::astro;
use crate::astro::phase;
use crate::clients::HeavensAboveClient;
use crate::domain::{
    CacheEntry, CacheTtls, DataKind, DayTimes, EventReport, EventRow, FetchedTable, NightSkyReport, RowDate,
    SkyQuery, SunMoonReport,
};
use crate::errors::{ApiResult, FetchError};
use crate::repo::CacheStore;
use crate::utils::hhmm;
use chrono::{Datelike, Days, NaiveDate, NaiveTime, TimeZone, Utc};
use chrono_tz::Tz;
use std::future::Future;
use tracing::{debug, error, info, warn};

/// Longest range the Iridium page predicts
const IRIDIUM_MAX_DAYS: u32 = 7;

/// Year to attach to a month/day row, on the calendar of `start`.
/// From Dec 23 on, rows belong to the next year.
pub fn inference_year(start: NaiveDate) -> i32 {
    if start.month() == 12 && start.day() >= 23 {
        start.year() + 1
    } else {
        start.year()
    }
}

/// Calendar date of a row; `None` for dates missing from that year (Feb 29).
pub fn infer_row_date(date: RowDate, year: i32) -> Option<NaiveDate> {
    NaiveDate::from_ymd_opt(year, date.month, date.day)
}

/// Rows whose inferred date lies in `[start, end]`, in page order.
pub fn filter_rows_by_date(rows: &[EventRow], start: NaiveDate, end: NaiveDate) -> Vec<EventRow> {
    let year = inference_year(start);
    rows.iter()
        .filter(|row| infer_row_date(row.date(), year).is_some_and(|d| start <= d && d <= end))
        .cloned()
        .collect()
}

/// Date-range cache over remotely fetched event tables.
///
/// An entry is fresh for a request when the requested end date is on or before
/// the horizon recorded at fetch time; anything else goes back to the source.
pub struct RemoteDataCache<S> {
    store: S,
    ttls: CacheTtls,
}

impl<S: CacheStore> RemoteDataCache<S> {
    pub fn new(store: S, ttls: CacheTtls) -> Self {
        Self { store, ttls }
    }

    /// Drop `source_key` after a bad read; a store failure only costs the refetch.
    async fn discard(&self, source_key: &str) {
        if let Err(e) = self.store.delete(source_key).await {
            error!("failed to evict cache entry for {}: {}", source_key, e);
        }
    }

    /// Rows of `kind` dated `[start, end]`, from the store when it covers `end`,
    /// otherwise from `fetch`.
    ///
    /// A failed fetch is returned as is and leaves any stored entry untouched.
    /// Store failures are logged and treated as a miss.
    pub async fn get_event_rows<F, Fut>(
        &self,
        source_key: &str,
        fetch: F,
        start: NaiveDate,
        end: NaiveDate,
        kind: DataKind,
    ) -> ApiResult<Vec<EventRow>>
    where
        F: FnOnce() -> Fut,
        Fut: Future<Output = Result<FetchedTable, FetchError>>,
    {
        let cached = match self.store.get(source_key).await {
            Ok(blob) => blob,
            Err(e) => {
                error!("cache read for {} failed: {}; fetching", source_key, e);
                None
            }
        };

        if let Some(blob) = cached {
            match serde_json::from_value::<CacheEntry>(blob) {
                Ok(entry) if entry.kind == kind && end <= entry.horizon => {
                    let rows = filter_rows_by_date(&entry.rows, start, end);
                    debug!(
                        "cache hit for {}: {} of {} rows in {}..={}",
                        source_key,
                        rows.len(),
                        entry.rows.len(),
                        start,
                        end
                    );
                    return Ok(rows);
                }
                Ok(entry) if entry.kind == kind => {
                    info!(
                        "cache for {} is stale: horizon {}, requested through {}",
                        source_key, entry.horizon, end
                    );
                }
                Ok(entry) => {
                    warn!(
                        "cache entry for {} holds {:?} rows, expected {:?}; evicting",
                        source_key, entry.kind, kind
                    );
                    self.discard(source_key).await;
                }
                Err(e) => {
                    warn!("corrupt cache entry for {}: {}; evicting", source_key, e);
                    self.discard(source_key).await;
                }
            }
        } else {
            debug!("no usable cache entry for {}", source_key);
        }

        let table = fetch().await.map_err(|e| {
            error!("fetch for {} failed: {}", source_key, e);
            e
        })?;

        let entry = CacheEntry {
            source_key: source_key.to_string(),
            kind,
            horizon: table.horizon,
            rows: table.rows,
        };
        let payload = serde_json::to_value(&entry)?;
        match self.store.set(source_key, payload, self.ttls.for_kind(kind)).await {
            Ok(()) => info!(
                "cached {} rows for {} through {}",
                entry.rows.len(),
                source_key,
                entry.horizon
            ),
            Err(e) => error!("failed to store cache entry for {}: {}", source_key, e),
        }

        Ok(filter_rows_by_date(&entry.rows, start, end))
    }

    /// Drop the entry for `source_key`, if any
    pub async fn evict(&self, source_key: &str) -> ApiResult<()> {
        info!("evicting cache entry for {}", source_key);
        self.store.delete(source_key).await
    }
}

/// Today's date on the observer's wall clock
pub fn today_in(tz: &Tz) -> NaiveDate {
    Utc::now().with_timezone(tz).date_naive()
}

fn add_days(date: NaiveDate, days: u32) -> NaiveDate {
    date.checked_add_days(Days::new(u64::from(days))).unwrap_or(NaiveDate::MAX)
}

/// Last day of a `days`-long window from `start`, with the page's own range limit
fn window_end(kind: DataKind, start: NaiveDate, days: u32) -> NaiveDate {
    let days = match kind {
        DataKind::Iss => days,
        DataKind::Iridium => days.min(IRIDIUM_MAX_DAYS),
        DataKind::Planets => 1,
    };
    add_days(start, days.saturating_sub(1))
}

/// Sun and moon times for one day at one location
pub fn day_times(latitude: f64, longitude: f64, tz: &Tz, date: NaiveDate) -> DayTimes {
    let sun = astro::compute_sun_times(latitude, longitude, date, astro::offset_hours_on(tz, date));
    let moon = astro::compute_moon_times(latitude, longitude, date, astro::offset_minutes_on(tz, date), tz);

    let noon = date.and_time(NaiveTime::from_hms_opt(12, 0, 0).unwrap_or(NaiveTime::MIN));
    let instant = tz
        .from_local_datetime(&noon)
        .earliest()
        .map(|t| t.with_timezone(&Utc))
        .unwrap_or_else(|| noon.and_utc());
    let moon_age_days = astro::moon_phase_age(instant);

    DayTimes {
        date,
        morning_twilight: sun.map(|s| hhmm(&s.morning_twilight)),
        sunrise: sun.map(|s| hhmm(&s.sunrise)),
        sunset: sun.map(|s| hhmm(&s.sunset)),
        evening_twilight: sun.map(|s| hhmm(&s.evening_twilight)),
        moonrise: moon.moonrise,
        moonset: moon.moonset,
        moon_age_days,
        moon_image: phase::phase_image(moon_age_days),
    }
}

/// UT `hh:mm` from the planet page as local `hh:mm`; anything else passes through.
pub fn planet_time_local(value: &str, date: NaiveDate, tz: &Tz) -> String {
    match NaiveTime::parse_from_str(value.trim(), "%H:%M") {
        Ok(t) => Utc
            .from_utc_datetime(&date.and_time(t))
            .with_timezone(tz)
            .format("%H:%M")
            .to_string(),
        Err(_) => value.to_string(),
    }
}

/// Sky report service: calculator plus cached remote tables
pub struct SkyService<S> {
    cache: RemoteDataCache<S>,
    client: HeavensAboveClient,
}

impl<S: CacheStore> SkyService<S> {
    pub fn new(cache: RemoteDataCache<S>, client: HeavensAboveClient) -> Self {
        Self { cache, client }
    }

    /// Sun/moon table for `query.days` days from `start`
    pub fn sun_moon_report(&self, query: &SkyQuery, start: NaiveDate) -> SunMoonReport {
        let location = query.location;
        let days = (0..query.days)
            .map(|i| day_times(location.latitude, location.longitude, &location.timezone, add_days(start, i)))
            .collect();
        SunMoonReport {
            name: query.name.clone(),
            location,
            start,
            days,
        }
    }

    async fn event_report(&self, query: &SkyQuery, kind: DataKind, today: NaiveDate) -> ApiResult<EventReport> {
        let location = query.location;
        let key = self.client.url_for(kind, &location, today).to_string();
        if query.refresh {
            if let Err(e) = self.cache.evict(&key).await {
                error!("refresh of {} could not evict: {}", key, e);
            }
        }

        let start = today;
        let end = window_end(kind, start, query.days);
        let rows = self
            .cache
            .get_event_rows(
                &key,
                || self.client.fetch_table(kind, &location, today),
                start,
                end,
                kind,
            )
            .await?;

        Ok(EventReport {
            source: kind,
            start,
            end,
            rows,
        })
    }

    pub async fn iss_passes(&self, query: &SkyQuery, today: NaiveDate) -> ApiResult<EventReport> {
        self.event_report(query, DataKind::Iss, today).await
    }

    pub async fn iridium_flares(&self, query: &SkyQuery, today: NaiveDate) -> ApiResult<EventReport> {
        self.event_report(query, DataKind::Iridium, today).await
    }

    /// Today's planet table with times on the observer's clock
    pub async fn planets(&self, query: &SkyQuery, today: NaiveDate) -> ApiResult<EventReport> {
        let mut report = self.event_report(query, DataKind::Planets, today).await?;
        let tz = query.location.timezone;
        for row in &mut report.rows {
            if let EventRow::PlanetPosition(planet) = row {
                planet.rise = planet_time_local(&planet.rise, today, &tz);
                planet.set = planet_time_local(&planet.set, today, &tz);
                planet.meridian = planet_time_local(&planet.meridian, today, &tz);
            }
        }
        Ok(report)
    }

    pub async fn night_sky(&self, query: &SkyQuery, today: NaiveDate) -> ApiResult<NightSkyReport> {
        let sun_moon = self.sun_moon_report(query, today);
        let (planets, iss) = tokio::try_join!(self.planets(query, today), self.iss_passes(query, today))?;
        Ok(NightSkyReport { sun_moon, planets, iss })
    }
}
