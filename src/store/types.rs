use serde::{Deserialize, Serialize};
use time::{Date, OffsetDateTime, Time};
use uuid::Uuid;

pub type SiteId = Uuid;

time::serde::format_description!(pub iso_date, Date, "[year]-[month]-[day]");
time::serde::format_description!(pub clock_time, Time, "[hour]:[minute]:[second]");

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SiteType {
    Warehouse,
    Field,
}

impl SiteType {
    pub fn as_str(&self) -> &'static str {
        match self {
            SiteType::Warehouse => "warehouse",
            SiteType::Field => "field",
        }
    }

    pub fn from_db_str(s: &str) -> Option<Self> {
        match s {
            "warehouse" => Some(SiteType::Warehouse),
            "field" => Some(SiteType::Field),
            _ => None,
        }
    }
}

/// A work-site a worker can punch at.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Site {
    pub id: SiteId,
    pub name: String,
    pub lat: Option<f64>,
    pub lon: Option<f64>,
    pub site_type: SiteType,
    pub created_by: Option<String>,
}

#[derive(Debug, Clone)]
pub struct NewSite {
    pub name: String,
    pub lat: f64,
    pub lon: f64,
    pub site_type: SiteType,
    pub created_by: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum PunchType {
    #[serde(rename = "IN", alias = "in")]
    In,
    #[serde(rename = "OUT", alias = "out")]
    Out,
}

impl PunchType {
    pub fn as_str(&self) -> &'static str {
        match self {
            PunchType::In => "IN",
            PunchType::Out => "OUT",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s.trim().to_ascii_uppercase().as_str() {
            "IN" => Some(PunchType::In),
            "OUT" => Some(PunchType::Out),
            _ => None,
        }
    }
}

impl std::fmt::Display for PunchType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One row of the punch ledger.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PunchRecord {
    pub id: Uuid,
    #[serde(with = "iso_date")]
    pub date: Date,
    pub worker_name: String,
    pub punch_type: PunchType,
    #[serde(with = "clock_time")]
    pub time: Time,
    pub lat: f64,
    pub lon: f64,
    pub site_id: Option<SiteId>,
    pub site_name: String,
    pub photo: Option<String>,
    #[serde(with = "time::serde::rfc3339")]
    pub created_at: OffsetDateTime,
}

#[derive(Debug, Clone)]
pub struct NewPunch {
    pub date: Date,
    pub worker_name: String,
    pub punch_type: PunchType,
    pub time: Time,
    pub lat: f64,
    pub lon: f64,
    pub site_id: Option<SiteId>,
    pub site_name: String,
    pub photo: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Remark {
    pub id: Uuid,
    pub worker_name: String,
    #[serde(with = "iso_date")]
    pub date: Date,
    #[serde(with = "clock_time")]
    pub time: Time,
    pub text: String,
    #[serde(with = "time::serde::rfc3339")]
    pub created_at: OffsetDateTime,
}

#[derive(Debug, Clone)]
pub struct NewRemark {
    pub worker_name: String,
    pub date: Date,
    pub time: Time,
    pub text: String,
}
