/// HTTP request handlers
use crate::domain::{EventReport, Health, NightSkyReport, RawSkyParams, SkyQuery, SunMoonReport};
use crate::errors::ApiError;
use crate::repo::AnyCacheStore;
use crate::services::{today_in, SkyService};
use axum::{
    extract::{Query, State},
    Json,
};
use chrono::Utc;
use serde::Serialize;
use std::sync::Arc;
use tracing::info;

/// Application state shared across handlers
#[derive(Clone)]
pub struct AppState {
    pub sky_service: Arc<SkyService<AnyCacheStore>>,
}

/// Successful response wrapper
#[derive(Serialize)]
pub struct SuccessResponse<T: Serialize> {
    pub ok: bool,
    #[serde(flatten)]
    pub data: T,
}

impl<T: Serialize> SuccessResponse<T> {
    pub fn new(data: T) -> Self {
        Self { ok: true, data }
    }
}

type Reply<T> = Result<Json<SuccessResponse<T>>, ApiError>;

fn validated(params: &RawSkyParams) -> Result<SkyQuery, ApiError> {
    let query = SkyQuery::validate(params)?;
    info!(
        "sky request {:?} at {},{} ({}) for {} days",
        query.name, query.location.latitude, query.location.longitude, query.location.timezone, query.days
    );
    Ok(query)
}

/// Health check handler
pub async fn health() -> Json<Health> {
    Json(Health {
        status: "ok",
        now: Utc::now(),
    })
}

/// Sun and moon times for each requested day
pub async fn get_sun_moon(State(state): State<AppState>, Query(params): Query<RawSkyParams>) -> Reply<SunMoonReport> {
    let query = validated(&params)?;
    let today = today_in(&query.location.timezone);
    Ok(Json(SuccessResponse::new(state.sky_service.sun_moon_report(&query, today))))
}

/// Visible ISS passes
pub async fn get_iss(State(state): State<AppState>, Query(params): Query<RawSkyParams>) -> Reply<EventReport> {
    let query = validated(&params)?;
    let today = today_in(&query.location.timezone);
    let report = state.sky_service.iss_passes(&query, today).await?;
    Ok(Json(SuccessResponse::new(report)))
}

/// Iridium flares, at most a week ahead
pub async fn get_iridium(State(state): State<AppState>, Query(params): Query<RawSkyParams>) -> Reply<EventReport> {
    let query = validated(&params)?;
    let today = today_in(&query.location.timezone);
    let report = state.sky_service.iridium_flares(&query, today).await?;
    Ok(Json(SuccessResponse::new(report)))
}

/// Today's planet rise/set/transit table
pub async fn get_planets(State(state): State<AppState>, Query(params): Query<RawSkyParams>) -> Reply<EventReport> {
    let query = validated(&params)?;
    let today = today_in(&query.location.timezone);
    let report = state.sky_service.planets(&query, today).await?;
    Ok(Json(SuccessResponse::new(report)))
}

/// Combined sun/moon, planet and ISS report
pub async fn get_night_sky(State(state): State<AppState>, Query(params): Query<RawSkyParams>) -> Reply<NightSkyReport> {
    let query = validated(&params)?;
    let today = today_in(&query.location.timezone);
    let report = state.sky_service.night_sky(&query, today).await?;
    Ok(Json(SuccessResponse::new(report)))
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::{http::StatusCode, response::IntoResponse};

    #[test]
    fn test_missing_parameters_are_bad_request() {
        let err = validated(&RawSkyParams::default()).unwrap_err();
        assert_eq!(err.into_response().status(), StatusCode::BAD_REQUEST);
    }

    #[test]
    fn test_success_wrapper_flattens() {
        let value = serde_json::to_value(SuccessResponse::new(serde_json::json!({"rows": []}))).unwrap();
        assert_eq!(value, serde_json::json!({"ok": true, "rows": []}));
    }
}
