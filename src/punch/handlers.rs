use axum::{
    extract::{DefaultBodyLimit, Multipart, Query, State},
    http::StatusCode,
    routing::{get, post},
    Json, Router,
};
use tracing::{instrument, warn};

use super::{
    dto::{LocationQuery, TodayResponse},
    services::{record_punch, today_status, PunchInput},
};
use crate::{
    auth::Session,
    error::{ApiError, ApiResult},
    photos::{self, PhotoUpload},
    state::AppState,
    store::{PunchRecord, PunchType},
};

pub fn read_routes() -> Router<AppState> {
    Router::new().route("/attendance/today", get(get_today))
}

pub fn write_routes() -> Router<AppState> {
    Router::new()
        .route("/attendance/punch", post(punch_multipart))
        .layer(DefaultBodyLimit::max(10 * 1024 * 1024)) // 10MB
}

#[instrument(skip(state, session), fields(username = %session.username))]
pub async fn get_today(
    State(state): State<AppState>,
    session: Session,
    Query(q): Query<LocationQuery>,
) -> ApiResult<Json<TodayResponse>> {
    let status = today_status(&state, &session, q.fix()).await?;
    Ok(Json(status.into()))
}

fn parse_coord(name: &str, raw: &str) -> ApiResult<f64> {
    raw.trim()
        .parse::<f64>()
        .map_err(|_| ApiError::BadRequest(format!("{name} must be a number")))
}

/// POST /attendance/punch (multipart)
/// Fields: punch_type (IN|OUT), lat, lon, photo (file), site_name (optional).
#[instrument(skip(state, session, mp), fields(username = %session.username))]
pub async fn punch_multipart(
    State(state): State<AppState>,
    session: Session,
    mut mp: Multipart,
) -> ApiResult<(StatusCode, Json<PunchRecord>)> {
    let mut punch_type = None;
    let mut lat = None;
    let mut lon = None;
    let mut photo = None;
    let mut new_site_name = None;

    while let Some(field) = mp
        .next_field()
        .await
        .map_err(|e| ApiError::BadRequest(e.to_string()))?
    {
        let name = field.name().unwrap_or_default().to_string();
        match name.as_str() {
            "photo" => {
                let content_type =
                    photos::photo_content_type(field.content_type(), field.file_name());
                let body = field
                    .bytes()
                    .await
                    .map_err(|e| ApiError::BadRequest(e.to_string()))?;
                photo = Some(PhotoUpload { body, content_type });
            }
            "punch_type" | "lat" | "lon" | "site_name" => {
                let text = field
                    .text()
                    .await
                    .map_err(|e| ApiError::BadRequest(e.to_string()))?;
                match name.as_str() {
                    "punch_type" => punch_type = Some(text),
                    "lat" => lat = Some(parse_coord("lat", &text)?),
                    "lon" => lon = Some(parse_coord("lon", &text)?),
                    _ => new_site_name = Some(text),
                }
            }
            other => warn!(field = other, "ignoring unknown multipart field"),
        }
    }

    let punch_type = punch_type
        .as_deref()
        .and_then(PunchType::parse)
        .ok_or_else(|| ApiError::BadRequest("punch_type must be IN or OUT".into()))?;
    let fix = LocationQuery { lat, lon }.fix();

    let record = record_punch(
        &state,
        &session,
        PunchInput {
            punch_type,
            fix,
            photo,
            new_site_name,
        },
    )
    .await?;
    Ok((StatusCode::CREATED, Json(record)))
}
