use serde::Serialize;
use tracing::debug;

use super::distance::{haversine_m, GeoPoint};
use crate::{
    error::ApiError,
    store::{AttendanceStore, SiteId, StoreResult},
};

/// The closest permitted site to a fix.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct NearestSite {
    pub id: SiteId,
    pub name: String,
    pub distance_m: f64,
}

/// Site bound to a punch. `distance_m` is absent when the GPS check is disabled.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SiteMatch {
    pub id: SiteId,
    pub name: String,
    pub distance_m: Option<f64>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum Resolution {
    Accepted { site: SiteMatch },
    TooFar {
        nearest: NearestSite,
        max_distance_m: f64,
    },
    NoPermittedSites,
    NoSiteData,
}

impl Resolution {
    pub fn accepted(&self) -> Option<&SiteMatch> {
        match self {
            Resolution::Accepted { site } => Some(site),
            _ => None,
        }
    }

    pub fn into_site(self) -> Result<SiteMatch, ApiError> {
        match self {
            Resolution::Accepted { site } => Ok(site),
            Resolution::TooFar {
                nearest,
                max_distance_m,
            } => Err(ApiError::SiteAccessDenied(format!(
                "not near an allowed site: {} is {:.0} m away (limit {:.0} m)",
                nearest.name, nearest.distance_m, max_distance_m
            ))),
            Resolution::NoPermittedSites => Err(ApiError::SiteAccessDenied(
                "no sites are assigned to this worker".into(),
            )),
            Resolution::NoSiteData => Err(ApiError::SiteAccessDenied(
                "none of the assigned sites has location data".into(),
            )),
        }
    }
}

/// Scans the candidates in order and keeps the strictly closer one, so the
/// first of equally distant sites wins. Missing sites and sites without
/// coordinates are skipped.
pub async fn resolve_nearest_site(
    store: &dyn AttendanceStore,
    fix: GeoPoint,
    candidates: &[SiteId],
) -> StoreResult<Option<NearestSite>> {
    let mut nearest: Option<NearestSite> = None;
    for &id in candidates {
        let Some(site) = store.get_site(id).await? else {
            debug!(site_id = %id, "permitted site not found; skipping");
            continue;
        };
        let (Some(lat), Some(lon)) = (site.lat, site.lon) else {
            debug!(site_id = %id, "site has no coordinates; skipping");
            continue;
        };
        let distance_m = haversine_m(fix, GeoPoint::new(lat, lon));
        if nearest.as_ref().map_or(true, |n| distance_m < n.distance_m) {
            nearest = Some(NearestSite {
                id: site.id,
                name: site.name,
                distance_m,
            });
        }
    }
    Ok(nearest)
}

/// How a worker's fix is matched to a site.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum SiteCheck {
    /// Nearest permitted site, accepted within `max_distance_m`.
    Nearest { max_distance_m: f64 },
    /// First permitted site, no distance check.
    Disabled,
}

impl SiteCheck {
    pub async fn resolve(
        &self,
        store: &dyn AttendanceStore,
        worker: &str,
        fix: GeoPoint,
    ) -> StoreResult<Resolution> {
        let candidates = store.list_permitted_site_ids(worker).await?;
        if candidates.is_empty() {
            return Ok(Resolution::NoPermittedSites);
        }

        match *self {
            SiteCheck::Nearest { max_distance_m } => {
                let Some(nearest) = resolve_nearest_site(store, fix, &candidates).await? else {
                    return Ok(Resolution::NoSiteData);
                };
                if nearest.distance_m <= max_distance_m {
                    Ok(Resolution::Accepted {
                        site: SiteMatch {
                            id: nearest.id,
                            name: nearest.name,
                            distance_m: Some(nearest.distance_m),
                        },
                    })
                } else {
                    Ok(Resolution::TooFar {
                        nearest,
                        max_distance_m,
                    })
                }
            }
            SiteCheck::Disabled => {
                for id in candidates {
                    if let Some(site) = store.get_site(id).await? {
                        return Ok(Resolution::Accepted {
                            site: SiteMatch {
                                id: site.id,
                                name: site.name,
                                distance_m: None,
                            },
                        });
                    }
                }
                Ok(Resolution::NoSiteData)
            }
        }
    }
}
