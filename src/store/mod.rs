//! Persistent store for sites, permitted-site assignments, the punch ledger and remarks.

#[cfg(test)]
pub mod memory;
pub mod pg;
pub mod types;

use async_trait::async_trait;
use thiserror::Error;
use time::Date;

pub use types::{
    NewPunch, NewRemark, NewSite, PunchRecord, PunchType, Remark, Site, SiteId, SiteType,
};

#[derive(Error, Debug)]
pub enum StoreError {
    /// The write collides with the one-punch-per-type-per-day constraint.
    #[error("record already exists")]
    Duplicate,

    #[error(transparent)]
    Backend(#[from] anyhow::Error),
}

pub type StoreResult<T> = Result<T, StoreError>;

#[async_trait]
pub trait AttendanceStore: Send + Sync {
    /// Permitted sites in the order they were assigned to the worker.
    async fn list_permitted_site_ids(&self, worker: &str) -> StoreResult<Vec<SiteId>>;
    async fn get_site(&self, id: SiteId) -> StoreResult<Option<Site>>;

    async fn append_punch(&self, punch: NewPunch) -> StoreResult<PunchRecord>;
    /// Registers `site` and records `punch` bound to it as one unit. When the
    /// punch collides neither row is kept.
    async fn append_punch_at_new_site(
        &self,
        site: NewSite,
        punch: NewPunch,
    ) -> StoreResult<PunchRecord>;
    /// Punches of one worker on one local date, oldest first.
    async fn list_punches_for(&self, worker: &str, date: Date) -> StoreResult<Vec<PunchRecord>>;
    /// Punches with `start <= date <= end`, ordered by date then time.
    async fn list_punches_between(&self, start: Date, end: Date)
        -> StoreResult<Vec<PunchRecord>>;

    async fn append_remark(&self, remark: NewRemark) -> StoreResult<Remark>;
    /// Remarks with `start <= date <= end`, newest first.
    async fn list_remarks_between(&self, start: Date, end: Date) -> StoreResult<Vec<Remark>>;
}
