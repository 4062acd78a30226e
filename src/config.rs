use anyhow::Context;
use serde::Deserialize;
use time::UtcOffset;

use crate::geo::SiteCheck;

#[derive(Debug, Clone, Deserialize)]
pub struct JwtConfig {
    pub secret: String,
    pub issuer: String,
    pub audience: String,
    pub ttl_minutes: i64,
    pub refresh_ttl_minutes: i64,
}

#[derive(Debug, Clone, Deserialize)]
pub struct MinioConfig {
    pub endpoint: String,
    pub bucket: String,
    pub access_key: String,
    pub secret_key: String,
}

/// Rules applied to every punch.
#[derive(Debug, Clone)]
pub struct AttendancePolicy {
    pub site_check: SiteCheck,
    pub shift_hours: f64,
    pub utc_offset: UtcOffset,
    pub photo_url_ttl_secs: u64,
}

impl Default for AttendancePolicy {
    fn default() -> Self {
        Self {
            site_check: SiteCheck::Nearest {
                max_distance_m: 500.0,
            },
            shift_hours: 8.5,
            utc_offset: ist(),
            photo_url_ttl_secs: 30 * 60,
        }
    }
}

#[derive(Debug, Clone)]
pub struct AppConfig {
    pub database_url: String,
    pub jwt: JwtConfig,
    pub minio: MinioConfig,
    pub credentials_path: String,
    pub policy: AttendancePolicy,
}

impl AppConfig {
    pub fn from_env() -> anyhow::Result<Self> {
        let database_url = std::env::var("DATABASE_URL").context("DATABASE_URL")?;
        let jwt = JwtConfig {
            secret: std::env::var("JWT_SECRET").context("JWT_SECRET")?,
            issuer: std::env::var("JWT_ISSUER").unwrap_or_else(|_| "attendance".into()),
            audience: std::env::var("JWT_AUDIENCE").unwrap_or_else(|_| "attendance-users".into()),
            ttl_minutes: env_parse("JWT_TTL_MINUTES").unwrap_or(60),
            refresh_ttl_minutes: env_parse("JWT_REFRESH_TTL_MINUTES").unwrap_or(60 * 12),
        };
        let minio = MinioConfig {
            endpoint: std::env::var("MINIO_ENDPOINT").context("MINIO_ENDPOINT")?,
            bucket: std::env::var("MINIO_BUCKET").unwrap_or_else(|_| "attendance-photos".into()),
            access_key: std::env::var("MINIO_ACCESS_KEY").context("MINIO_ACCESS_KEY")?,
            secret_key: std::env::var("MINIO_SECRET_KEY").context("MINIO_SECRET_KEY")?,
        };
        let credentials_path =
            std::env::var("CREDENTIALS_PATH").unwrap_or_else(|_| "credentials.json".into());

        let defaults = AttendancePolicy::default();
        let max_distance_m = env_parse("ALLOWED_DISTANCE_M").unwrap_or(500.0);
        let site_check = match std::env::var("SITE_CHECK").as_deref() {
            Ok("disabled") => SiteCheck::Disabled,
            Ok("nearest") | Err(_) => SiteCheck::Nearest { max_distance_m },
            Ok(other) => anyhow::bail!("SITE_CHECK must be `nearest` or `disabled`, got `{other}`"),
        };
        let utc_offset = match env_parse::<i32>("TZ_OFFSET_MINUTES") {
            Some(minutes) => offset_from_minutes(minutes)?,
            None => defaults.utc_offset,
        };
        let policy = AttendancePolicy {
            site_check,
            shift_hours: env_parse("SHIFT_HOURS").unwrap_or(defaults.shift_hours),
            utc_offset,
            photo_url_ttl_secs: env_parse("PHOTO_URL_TTL_SECS")
                .unwrap_or(defaults.photo_url_ttl_secs),
        };

        Ok(Self {
            database_url,
            jwt,
            minio,
            credentials_path,
            policy,
        })
    }
}

fn env_parse<T: std::str::FromStr>(key: &str) -> Option<T> {
    std::env::var(key).ok().and_then(|v| v.parse::<T>().ok())
}

/// Indian Standard Time, UTC+05:30.
pub fn ist() -> UtcOffset {
    time::macros::offset!(+5:30)
}

pub fn offset_from_minutes(minutes: i32) -> anyhow::Result<UtcOffset> {
    let out_of_range = || format!("TZ_OFFSET_MINUTES out of range: {minutes}");
    let hours = i8::try_from(minutes / 60).with_context(out_of_range)?;
    let mins = i8::try_from(minutes % 60).with_context(out_of_range)?;
    UtcOffset::from_hms(hours, mins, 0).with_context(out_of_range)
}
