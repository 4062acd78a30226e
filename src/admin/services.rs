use serde::Serialize;

use super::filter::DateRange;
use crate::{
    error::ApiResult,
    photos,
    state::AppState,
    store::{PunchRecord, PunchType, Remark},
};

#[derive(Debug, Clone, Serialize)]
pub struct GalleryItem {
    pub punch_id: uuid::Uuid,
    pub worker_name: String,
    pub punch_type: PunchType,
    pub caption: String,
    pub url: String,
}

pub async fn attendance_table(st: &AppState, range: DateRange) -> ApiResult<Vec<PunchRecord>> {
    Ok(st.store.list_punches_between(range.start, range.end).await?)
}

/// One entry per punch carrying a photo, captioned `<worker> | <IN|OUT>`.
pub async fn photo_gallery(st: &AppState, range: DateRange) -> ApiResult<Vec<GalleryItem>> {
    let records = attendance_table(st, range).await?;
    let ttl = st.config.policy.photo_url_ttl_secs;

    let mut out = Vec::new();
    for r in records {
        let Some(key) = r.photo.as_deref().filter(|k| !k.is_empty()) else {
            continue;
        };
        let url = photos::public_url_for(st.storage.as_ref(), key, ttl).await?;
        out.push(GalleryItem {
            punch_id: r.id,
            caption: format!("{} | {}", r.worker_name, r.punch_type),
            worker_name: r.worker_name,
            punch_type: r.punch_type,
            url,
        });
    }
    Ok(out)
}

pub async fn remarks_table(st: &AppState, range: DateRange) -> ApiResult<Vec<Remark>> {
    Ok(st.store.list_remarks_between(range.start, range.end).await?)
}
