use axum::{
    extract::{Query, State},
    routing::get,
    Json, Router,
};
use serde::Serialize;
use tracing::{info, instrument};

use super::{
    filter::{DateFilterQuery, DateRange},
    services::{attendance_table, photo_gallery, remarks_table, GalleryItem},
};
use crate::{
    auth::Session,
    error::ApiResult,
    state::AppState,
    store::{types::iso_date, PunchRecord, Remark},
};

pub fn admin_routes() -> Router<AppState> {
    Router::new()
        .route("/admin/attendance", get(list_attendance))
        .route("/admin/photos", get(list_photos))
        .route("/admin/remarks", get(list_remarks))
}

#[derive(Debug, Serialize)]
pub struct Page<T> {
    #[serde(with = "iso_date")]
    pub start: time::Date,
    #[serde(with = "iso_date")]
    pub end: time::Date,
    pub items: Vec<T>,
}

fn authorize(state: &AppState, session: &Session, q: &DateFilterQuery) -> ApiResult<DateRange> {
    session.require_admin()?;
    let today = state.clock.now_local(state.config.policy.utc_offset).date();
    q.resolve(today)
}

fn page<T>(range: DateRange, items: Vec<T>) -> Json<Page<T>> {
    Json(Page {
        start: range.start,
        end: range.end,
        items,
    })
}

#[instrument(skip(state, session))]
pub async fn list_attendance(
    State(state): State<AppState>,
    session: Session,
    Query(q): Query<DateFilterQuery>,
) -> ApiResult<Json<Page<PunchRecord>>> {
    let range = authorize(&state, &session, &q)?;
    let rows = attendance_table(&state, range).await?;
    info!(rows = rows.len(), "attendance table served");
    Ok(page(range, rows))
}

#[instrument(skip(state, session))]
pub async fn list_photos(
    State(state): State<AppState>,
    session: Session,
    Query(q): Query<DateFilterQuery>,
) -> ApiResult<Json<Page<GalleryItem>>> {
    let range = authorize(&state, &session, &q)?;
    Ok(page(range, photo_gallery(&state, range).await?))
}

#[instrument(skip(state, session))]
pub async fn list_remarks(
    State(state): State<AppState>,
    session: Session,
    Query(q): Query<DateFilterQuery>,
) -> ApiResult<Json<Page<Remark>>> {
    let range = authorize(&state, &session, &q)?;
    Ok(page(range, remarks_table(&state, range).await?))
}
