/// External data source clients
pub mod heavens_above;

use crate::domain::{DataKind, FetchedTable, Location};
use crate::errors::{ApiError, ApiResult, FetchError};
use chrono::{Days, NaiveDate, NaiveTime, TimeZone};
use reqwest::{Client, Url};
use std::time::Duration;
use tracing::{debug, info};

/// Satellite catalogue number of the ISS
const ISS_SATELLITE_ID: &str = "25544";

/// HTTP client wrapper with common configuration
pub struct HttpClient {
    client: Client,
}

impl HttpClient {
    pub fn new(timeout: Duration) -> ApiResult<Self> {
        let client = Client::builder()
            .timeout(timeout)
            .user_agent("stars-at-night/1.0")
            .build()?;
        Ok(Self { client })
    }

    /// GET a page body; any non-success status is a failure
    pub async fn get_text(&self, url: &Url) -> Result<String, FetchError> {
        let resp = self.client.get(url.clone()).send().await?;
        let status = resp.status();
        if !status.is_success() {
            return Err(FetchError::Status(status.as_u16()));
        }
        Ok(resp.text().await?)
    }
}

/// heavens-above.com pass and planet pages
pub struct HeavensAboveClient {
    http_client: HttpClient,
    base_url: Url,
    altitude_meters: u32,
}

impl HeavensAboveClient {
    pub fn new(base_url: &str, timeout: Duration, altitude_meters: u32) -> ApiResult<Self> {
        let base_url =
            Url::parse(base_url).map_err(|e| ApiError::Internal(format!("bad base url {base_url}: {e}")))?;
        Ok(Self {
            http_client: HttpClient::new(timeout)?,
            base_url,
            altitude_meters,
        })
    }

    /// Page URL for a data family; the URL doubles as the cache key.
    pub fn url_for(&self, kind: DataKind, location: &Location, today: NaiveDate) -> Url {
        let page = match kind {
            DataKind::Iss => "PassSummary.aspx",
            DataKind::Iridium => "IridiumFlares.aspx",
            DataKind::Planets => "PlanetSummary.aspx",
        };
        let mut url = self.base_url.clone();
        url.set_path(page);

        {
            let mut query = url.query_pairs_mut();
            query.clear();
            if kind == DataKind::Iss {
                query.append_pair("satid", ISS_SATELLITE_ID);
            }
            query
                .append_pair("lat", &location.latitude.to_string())
                .append_pair("lng", &location.longitude.to_string())
                .append_pair("loc", "Unspecified")
                .append_pair("alt", &self.altitude_meters.to_string());
            if kind.is_satellite() {
                query.append_pair("tz", &zone_abbreviation(location, today));
            }
        }
        url
    }

    /// Fetch and parse one table. The horizon is `today` plus the days the page covers.
    pub async fn fetch_table(&self, kind: DataKind, location: &Location, today: NaiveDate) -> Result<FetchedTable, FetchError> {
        let url = self.url_for(kind, location, today);
        info!("GET {} data from {}", kind_label(kind), url);
        let body = self.http_client.get_text(&url).await?;
        debug!("received {} bytes", body.len());

        let rows = match kind {
            DataKind::Iss => heavens_above::parse_iss_passes(&body),
            DataKind::Iridium => heavens_above::parse_iridium_flares(&body),
            DataKind::Planets => heavens_above::parse_planet_table(&body, today)?,
        };
        let horizon = today
            .checked_add_days(Days::new(kind.horizon_days()))
            .ok_or_else(|| FetchError::Parse("horizon out of range".into()))?;
        Ok(FetchedTable { rows, horizon })
    }
}

fn kind_label(kind: DataKind) -> &'static str {
    match kind {
        DataKind::Iss => "ISS",
        DataKind::Iridium => "Iridium",
        DataKind::Planets => "planet",
    }
}

/// Abbreviation of the observer's zone at local noon, e.g. `CDT`
fn zone_abbreviation(location: &Location, date: NaiveDate) -> String {
    let noon = date.and_time(NaiveTime::from_hms_opt(12, 0, 0).unwrap_or(NaiveTime::MIN));
    location
        .timezone
        .from_local_datetime(&noon)
        .earliest()
        .map(|t| t.format("%Z").to_string())
        .unwrap_or_else(|| "UTC".to_string())
}
