use axum::{
    extract::{Query, State},
    routing::get,
    Json, Router,
};
use serde::Serialize;
use tracing::instrument;

use super::Resolution;
use crate::{
    auth::Session,
    error::{ApiError, ApiResult},
    punch::dto::LocationQuery,
    state::AppState,
};

pub fn site_routes() -> Router<AppState> {
    Router::new().route("/sites/nearest", get(nearest_site))
}

#[derive(Debug, Serialize)]
pub struct NearestSiteResponse {
    pub accepted: bool,
    #[serde(flatten)]
    pub resolution: Resolution,
}

/// GET /sites/nearest?lat=..&lon=..
#[instrument(skip(state, session), fields(username = %session.username))]
pub async fn nearest_site(
    State(state): State<AppState>,
    session: Session,
    Query(q): Query<LocationQuery>,
) -> ApiResult<Json<NearestSiteResponse>> {
    session.require_worker()?;
    let fix = q.fix().ok_or(ApiError::LocationUnavailable)?;
    if !fix.is_valid() {
        return Err(ApiError::BadRequest("coordinates out of range".into()));
    }
    let resolution = state
        .config
        .policy
        .site_check
        .resolve(state.store.as_ref(), &session.username, fix)
        .await?;
    Ok(Json(NearestSiteResponse {
        accepted: resolution.accepted().is_some(),
        resolution,
    }))
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use axum::{
        body::{to_bytes, Body},
        extract::FromRef,
        http::{header, Request},
    };
    use tower::ServiceExt;
    use uuid::Uuid;

    use crate::{
        app::build_app,
        auth::{jwt::JwtKeys, Role, WorkerKind},
        punch::clock::SystemClock,
        state::AppState,
        storage::fake::FakeStorage,
        store::{memory::MemoryStore, Site, SiteType},
    };

    async fn get(st: &AppState, uri: &str, role: Role) -> (u16, serde_json::Value) {
        let token = JwtKeys::from_ref(st).sign_access("ajad", role).unwrap();
        let res = build_app(st.clone())
            .oneshot(
                Request::builder()
                    .uri(uri)
                    .header(header::AUTHORIZATION, format!("Bearer {token}"))
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();
        let status = res.status().as_u16();
        let bytes = to_bytes(res.into_body(), usize::MAX).await.unwrap();
        (status, serde_json::from_slice(&bytes).unwrap())
    }

    fn state() -> AppState {
        let store = Arc::new(MemoryStore::new());
        let id = Uuid::new_v4();
        store.insert_site(Site {
            id,
            name: "Okhla Dock".into(),
            lat: Some(28.5355),
            lon: Some(77.3910),
            site_type: SiteType::Warehouse,
            created_by: None,
        });
        store.permit("ajad", id);
        AppState::fake_with(store, Arc::new(FakeStorage::default()), Arc::new(SystemClock))
    }

    #[tokio::test]
    async fn reports_nearest_with_distance_and_acceptance() {
        let st = state();
        let worker = Role::Worker(WorkerKind::Warehouse);

        let (status, body) = get(&st, "/api/v1/sites/nearest?lat=28.5365&lon=77.3910", worker).await;
        assert_eq!(status, 200);
        assert_eq!(body["accepted"], true);
        assert_eq!(body["site"]["name"], "Okhla Dock");
        let d = body["site"]["distance_m"].as_f64().unwrap();
        assert!((100.0..125.0).contains(&d), "got {d}");

        let (status, body) = get(&st, "/api/v1/sites/nearest?lat=28.60&lon=77.3910", worker).await;
        assert_eq!(status, 200);
        assert_eq!(body["accepted"], false);
        assert_eq!(body["status"], "too_far");
    }

    #[tokio::test]
    async fn missing_fix_is_location_unavailable() {
        let st = state();
        let (status, body) = get(
            &st,
            "/api/v1/sites/nearest?lat=28.5",
            Role::Worker(WorkerKind::Warehouse),
        )
        .await;
        assert_eq!(status, 422);
        assert_eq!(body["code"], "LOCATION_UNAVAILABLE");
    }
}
