use crate::state::AppState;
use axum::Router;

mod claims;
pub mod credentials;
mod dto;
pub mod handlers;
pub mod jwt;
pub mod password;

pub use credentials::{Authenticator, Role, StaticCredentials, WorkerKind};
pub use jwt::Session;

pub fn router() -> Router<AppState> {
    Router::new()
        .merge(handlers::auth_routes())
        .merge(handlers::me_routes())
}
