use std::sync::Mutex;

use async_trait::async_trait;
use time::{Date, OffsetDateTime};
use uuid::Uuid;

use super::{
    AttendanceStore, NewPunch, NewRemark, NewSite, PunchRecord, Remark, Site, SiteId, StoreError,
    StoreResult,
};

#[derive(Default)]
struct Inner {
    sites: Vec<Site>,
    assignments: Vec<(String, SiteId)>,
    punches: Vec<PunchRecord>,
    remarks: Vec<Remark>,
}

/// In-process store used by unit tests. Mirrors the unique index on
/// `(worker_name, date, punch_type)`.
#[derive(Default)]
pub struct MemoryStore {
    inner: Mutex<Inner>,
}

impl Inner {
    fn push_punch(&mut self, punch: NewPunch) -> StoreResult<PunchRecord> {
        let clash = self.punches.iter().any(|p| {
            p.worker_name == punch.worker_name
                && p.date == punch.date
                && p.punch_type == punch.punch_type
        });
        if clash {
            return Err(StoreError::Duplicate);
        }
        let record = PunchRecord {
            id: Uuid::new_v4(),
            date: punch.date,
            worker_name: punch.worker_name,
            punch_type: punch.punch_type,
            time: punch.time,
            lat: punch.lat,
            lon: punch.lon,
            site_id: punch.site_id,
            site_name: punch.site_name,
            photo: punch.photo,
            created_at: OffsetDateTime::now_utc(),
        };
        self.punches.push(record.clone());
        Ok(record)
    }
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert_site(&self, site: Site) {
        self.inner.lock().unwrap().sites.push(site);
    }

    pub fn permit(&self, worker: &str, site_id: SiteId) {
        self.inner
            .lock()
            .unwrap()
            .assignments
            .push((worker.to_string(), site_id));
    }

    pub fn punches(&self) -> Vec<PunchRecord> {
        self.inner.lock().unwrap().punches.clone()
    }

    pub fn sites(&self) -> Vec<Site> {
        self.inner.lock().unwrap().sites.clone()
    }
}

#[async_trait]
impl AttendanceStore for MemoryStore {
    async fn list_permitted_site_ids(&self, worker: &str) -> StoreResult<Vec<SiteId>> {
        let inner = self.inner.lock().unwrap();
        Ok(inner
            .assignments
            .iter()
            .filter(|(w, _)| w == worker)
            .map(|(_, id)| *id)
            .collect())
    }

    async fn get_site(&self, id: SiteId) -> StoreResult<Option<Site>> {
        let inner = self.inner.lock().unwrap();
        Ok(inner.sites.iter().find(|s| s.id == id).cloned())
    }

    async fn append_punch(&self, punch: NewPunch) -> StoreResult<PunchRecord> {
        let mut inner = self.inner.lock().unwrap();
        inner.push_punch(punch)
    }

    async fn append_punch_at_new_site(
        &self,
        site: NewSite,
        mut punch: NewPunch,
    ) -> StoreResult<PunchRecord> {
        let mut inner = self.inner.lock().unwrap();
        let id = Uuid::new_v4();
        punch.site_id = Some(id);
        let record = inner.push_punch(punch)?;
        inner.sites.push(Site {
            id,
            name: site.name,
            lat: Some(site.lat),
            lon: Some(site.lon),
            site_type: site.site_type,
            created_by: Some(site.created_by),
        });
        Ok(record)
    }

    async fn list_punches_for(&self, worker: &str, date: Date) -> StoreResult<Vec<PunchRecord>> {
        let inner = self.inner.lock().unwrap();
        let mut rows: Vec<_> = inner
            .punches
            .iter()
            .filter(|p| p.worker_name == worker && p.date == date)
            .cloned()
            .collect();
        rows.sort_by_key(|p| p.time);
        Ok(rows)
    }

    async fn list_punches_between(
        &self,
        start: Date,
        end: Date,
    ) -> StoreResult<Vec<PunchRecord>> {
        let inner = self.inner.lock().unwrap();
        let mut rows: Vec<_> = inner
            .punches
            .iter()
            .filter(|p| p.date >= start && p.date <= end)
            .cloned()
            .collect();
        rows.sort_by_key(|p| (p.date, p.time));
        Ok(rows)
    }

    async fn append_remark(&self, remark: NewRemark) -> StoreResult<Remark> {
        let mut inner = self.inner.lock().unwrap();
        let row = Remark {
            id: Uuid::new_v4(),
            worker_name: remark.worker_name,
            date: remark.date,
            time: remark.time,
            text: remark.text,
            created_at: OffsetDateTime::now_utc(),
        };
        inner.remarks.push(row.clone());
        Ok(row)
    }

    async fn list_remarks_between(&self, start: Date, end: Date) -> StoreResult<Vec<Remark>> {
        let inner = self.inner.lock().unwrap();
        // insertion order is creation order
        Ok(inner
            .remarks
            .iter()
            .rev()
            .filter(|r| r.date >= start && r.date <= end)
            .cloned()
            .collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn permitted_sites_keep_assignment_order() {
        let store = MemoryStore::new();
        let mut ids: Vec<SiteId> = (0..4).map(|_| Uuid::new_v4()).collect();
        ids.sort();
        ids.reverse();
        for id in &ids {
            store.permit("ajad", *id);
        }
        store.permit("rahul", Uuid::new_v4());
        assert_eq!(store.list_permitted_site_ids("ajad").await.unwrap(), ids);
    }
}
