use serde::{Deserialize, Serialize};
use time::{Date, Time};

use super::{
    services::TodayStatus,
    state::{AllowedActions, PunchState, ShiftProgress},
};
use crate::{
    geo::{GeoPoint, Resolution},
    store::types::{clock_time, iso_date},
};

/// Optional GPS fix passed as `?lat=..&lon=..`.
#[derive(Debug, Default, Deserialize)]
pub struct LocationQuery {
    pub lat: Option<f64>,
    pub lon: Option<f64>,
}

impl LocationQuery {
    /// A fix only counts when both coordinates are present.
    pub fn fix(&self) -> Option<GeoPoint> {
        match (self.lat, self.lon) {
            (Some(lat), Some(lon)) => Some(GeoPoint::new(lat, lon)),
            _ => None,
        }
    }
}

#[derive(Debug, Serialize)]
pub struct TodayResponse {
    #[serde(with = "iso_date")]
    pub date: Date,
    #[serde(with = "clock_time")]
    pub now: Time,
    pub state: &'static str,
    pub allowed: AllowedActions,
    #[serde(with = "clock_time::option")]
    pub punch_in_time: Option<Time>,
    pub progress: Option<ShiftProgress>,
    pub site: Option<Resolution>,
}

impl From<TodayStatus> for TodayResponse {
    fn from(s: TodayStatus) -> Self {
        let punch_in_time = match &s.state {
            PunchState::PunchedIn { punch_in } => Some(punch_in.time),
            _ => None,
        };
        Self {
            date: s.now_local.date(),
            now: s.now_local.time(),
            state: s.state.name(),
            allowed: s.state.allowed(),
            punch_in_time,
            progress: s.progress,
            site: s.site,
        }
    }
}
