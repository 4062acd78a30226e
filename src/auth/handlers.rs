use axum::{
    extract::{FromRef, State},
    http::StatusCode,
    routing::{get, post},
    Json, Router,
};
use tracing::{info, instrument, warn};

use crate::{
    auth::{
        credentials::{is_valid_username, normalize_username, Role},
        dto::{AuthResponse, LoginRequest, PublicUser, RefreshRequest},
        jwt::{JwtKeys, Session},
    },
    error::{ApiError, ApiResult},
    state::AppState,
};

pub fn auth_routes() -> Router<AppState> {
    Router::new()
        .route("/auth/login", post(login))
        .route("/auth/refresh", post(refresh))
        .route("/auth/logout", post(logout))
}

pub fn me_routes() -> Router<AppState> {
    Router::new().route("/me", get(get_me))
}

fn issue_pair(state: &AppState, username: String, role: Role) -> ApiResult<AuthResponse> {
    let keys = JwtKeys::from_ref(state);
    let access_token = keys.sign_access(&username, role)?;
    let refresh_token = keys.sign_refresh(&username, role)?;
    Ok(AuthResponse {
        access_token,
        refresh_token,
        user: PublicUser { username, role },
    })
}

#[instrument(skip(state, payload))]
pub async fn login(
    State(state): State<AppState>,
    Json(payload): Json<LoginRequest>,
) -> ApiResult<Json<AuthResponse>> {
    let username = normalize_username(&payload.username);

    if !is_valid_username(&username) {
        warn!("login with malformed username");
        return Err(ApiError::AuthenticationFailure);
    }

    let role = match state.auth.authenticate(&username, &payload.password).await {
        Ok(role) => role,
        Err(_) => {
            warn!(%username, "login rejected");
            return Err(ApiError::AuthenticationFailure);
        }
    };

    info!(%username, ?role, "user logged in");
    Ok(Json(issue_pair(&state, username, role)?))
}

#[instrument(skip(state, payload))]
pub async fn refresh(
    State(state): State<AppState>,
    Json(payload): Json<RefreshRequest>,
) -> ApiResult<Json<AuthResponse>> {
    let keys = JwtKeys::from_ref(&state);
    let claims = keys
        .verify_refresh(&payload.refresh_token)
        .map_err(|e| ApiError::Unauthorized(e.to_string()))?;

    Ok(Json(issue_pair(&state, claims.sub, claims.role)?))
}

/// Tokens are stateless; the client drops them along with any cached fix.
#[instrument(skip(session), fields(username = %session.username))]
pub async fn logout(session: Session) -> StatusCode {
    info!("user logged out");
    StatusCode::NO_CONTENT
}

#[instrument(skip(session))]
pub async fn get_me(session: Session) -> Json<PublicUser> {
    Json(PublicUser {
        username: session.username,
        role: session.role,
    })
}
