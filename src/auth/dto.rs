use serde::{Deserialize, Serialize};

use super::credentials::Role;

/// Request body for login.
#[derive(Debug, Deserialize)]
pub struct LoginRequest {
    pub username: String,
    pub password: String,
}

/// Request body for token refresh.
#[derive(Debug, Deserialize)]
pub struct RefreshRequest {
    pub refresh_token: String,
}

/// Response returned after login or refresh.
#[derive(Debug, Serialize)]
pub struct AuthResponse {
    pub access_token: String,
    pub refresh_token: String,
    pub user: PublicUser,
}

/// Public part of the session returned to the client.
#[derive(Debug, Serialize)]
pub struct PublicUser {
    pub username: String,
    #[serde(flatten)]
    pub role: Role,
}
