mod distance;
pub mod handlers;
mod resolver;

pub use distance::{haversine_m, GeoPoint, EARTH_RADIUS_M};
pub use resolver::{resolve_nearest_site, NearestSite, Resolution, SiteCheck, SiteMatch};

use crate::state::AppState;
use axum::Router;

pub fn router() -> Router<AppState> {
    handlers::site_routes()
}
