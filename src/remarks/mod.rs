//! Free-text movement/expense remarks, independent of punch state.

use axum::{
    extract::State,
    http::StatusCode,
    routing::post,
    Json, Router,
};
use serde::Deserialize;
use tracing::{info, instrument};

use crate::{
    auth::Session,
    error::{ApiError, ApiResult},
    punch::clock::wall_time,
    state::AppState,
    store::{NewRemark, Remark},
};

pub fn router() -> Router<AppState> {
    Router::new().route("/remarks", post(create_remark))
}

#[derive(Debug, Deserialize)]
pub struct RemarkRequest {
    pub text: String,
}

/// Stores `text` trimmed and upper-cased, stamped with the local date and time.
pub async fn save_remark(st: &AppState, session: &Session, text: &str) -> ApiResult<Remark> {
    session.require_worker()?;
    let text = text.trim();
    if text.is_empty() {
        return Err(ApiError::EmptyRemark);
    }

    let now = st.clock.now_local(st.config.policy.utc_offset);
    let remark = st
        .store
        .append_remark(NewRemark {
            worker_name: session.username.clone(),
            date: now.date(),
            time: wall_time(now),
            text: text.to_uppercase(),
        })
        .await?;
    info!(worker = %remark.worker_name, remark_id = %remark.id, "remark saved");
    Ok(remark)
}

#[instrument(skip(state, session, body), fields(username = %session.username))]
pub async fn create_remark(
    State(state): State<AppState>,
    session: Session,
    Json(body): Json<RemarkRequest>,
) -> ApiResult<(StatusCode, Json<Remark>)> {
    let remark = save_remark(&state, &session, &body.text).await?;
    Ok((StatusCode::CREATED, Json(remark)))
}
