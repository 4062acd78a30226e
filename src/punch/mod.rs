pub mod clock;
pub mod dto;
pub mod handlers;
pub mod services;
pub mod state;

use crate::state::AppState;
use axum::Router;

pub fn router() -> Router<AppState> {
    Router::new()
        .merge(handlers::read_routes())
        .merge(handlers::write_routes())
}
