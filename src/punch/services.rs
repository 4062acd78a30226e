use time::OffsetDateTime;
use tracing::{info, warn};

use super::{
    clock::wall_time,
    state::{PunchState, ShiftProgress},
};
use crate::{
    auth::{Session, WorkerKind},
    error::{ApiError, ApiResult},
    geo::{GeoPoint, Resolution, SiteMatch},
    photos::{self, PhotoUpload},
    state::AppState,
    store::{NewPunch, NewSite, PunchRecord, PunchType, SiteType, StoreError},
};

/// Everything a punch request carries besides the session.
#[derive(Debug, Clone)]
pub struct PunchInput {
    pub punch_type: PunchType,
    pub fix: Option<GeoPoint>,
    pub photo: Option<PhotoUpload>,
    /// Field workers only: register a new site here instead of matching one.
    pub new_site_name: Option<String>,
}

#[derive(Debug, Clone)]
pub struct TodayStatus {
    pub now_local: OffsetDateTime,
    pub state: PunchState,
    pub progress: Option<ShiftProgress>,
    pub site: Option<Resolution>,
}

async fn todays_state(st: &AppState, worker: &str, now: OffsetDateTime) -> ApiResult<PunchState> {
    let records = st.store.list_punches_for(worker, now.date()).await?;
    Ok(PunchState::from_records(&records))
}

pub async fn today_status(
    st: &AppState,
    session: &Session,
    fix: Option<GeoPoint>,
) -> ApiResult<TodayStatus> {
    session.require_worker()?;
    let now_local = st.clock.now_local(st.config.policy.utc_offset);
    let state = todays_state(st, &session.username, now_local).await?;

    let progress = match &state {
        PunchState::PunchedIn { punch_in } => Some(ShiftProgress::compute(
            punch_in,
            now_local,
            st.config.policy.shift_hours,
        )),
        _ => None,
    };

    let site = match fix {
        Some(fix) => Some(
            st.config
                .policy
                .site_check
                .resolve(st.store.as_ref(), &session.username, fix)
                .await?,
        ),
        None => None,
    };

    Ok(TodayStatus {
        now_local,
        state,
        progress,
        site,
    })
}

/// Where a punch lands: a matched site, or a field site that is written
/// together with the punch.
enum SiteBinding {
    Existing(SiteMatch),
    New(NewSite),
}

impl SiteBinding {
    fn name(&self) -> &str {
        match self {
            SiteBinding::Existing(m) => &m.name,
            SiteBinding::New(s) => &s.name,
        }
    }
}

async fn bind_site(
    st: &AppState,
    session: &Session,
    kind: WorkerKind,
    state: &PunchState,
    input: &PunchInput,
    fix: GeoPoint,
) -> ApiResult<SiteBinding> {
    let new_site_name = input
        .new_site_name
        .as_deref()
        .map(str::trim)
        .filter(|n| !n.is_empty());

    if let Some(name) = new_site_name {
        if kind != WorkerKind::Field || input.punch_type != PunchType::In {
            return Err(ApiError::BadRequest(
                "only field workers can register a site, and only at punch IN".into(),
            ));
        }
        return Ok(SiteBinding::New(NewSite {
            name: name.to_string(),
            lat: fix.lat,
            lon: fix.lon,
            site_type: SiteType::Field,
            created_by: session.username.clone(),
        }));
    }

    if let (WorkerKind::Field, PunchType::Out, PunchState::PunchedIn { punch_in }) =
        (kind, input.punch_type, state)
    {
        if let Some(id) = punch_in.site_id {
            return Ok(SiteBinding::Existing(SiteMatch {
                id,
                name: punch_in.site_name.clone(),
                distance_m: None,
            }));
        }
    }

    let resolution = st
        .config
        .policy
        .site_check
        .resolve(st.store.as_ref(), &session.username, fix)
        .await?;
    if resolution.accepted().is_none() {
        warn!(worker = %session.username, ?resolution, "site access denied");
    }
    resolution.into_site().map(SiteBinding::Existing)
}

/// Validates and records one punch. The photo is uploaded only after every
/// check passed; a failed upload aborts the punch, and a new field site is
/// only written together with its punch.
pub async fn record_punch(
    st: &AppState,
    session: &Session,
    input: PunchInput,
) -> ApiResult<PunchRecord> {
    let kind = session.require_worker()?;
    let fix = input.fix.ok_or(ApiError::LocationUnavailable)?;
    if !fix.is_valid() {
        return Err(ApiError::BadRequest("coordinates out of range".into()));
    }

    let now_local = st.clock.now_local(st.config.policy.utc_offset);
    let state = todays_state(st, &session.username, now_local).await?;
    state.check(input.punch_type)?;

    let photo = match &input.photo {
        Some(p) if !p.is_empty() => p.clone(),
        _ => return Err(ApiError::PhotoMissing(input.punch_type.as_str())),
    };
    if !photo.is_image() {
        return Err(ApiError::BadRequest("photo must be an image".into()));
    }

    let binding = bind_site(st, session, kind, &state, &input, fix).await?;

    let key = photos::store_photo(st.storage.as_ref(), &session.username, photo, now_local)
        .await
        .map_err(|e| {
            warn!(worker = %session.username, error = %e, "photo upload failed; punch aborted");
            ApiError::Internal(e)
        })?;

    let mut punch = NewPunch {
        date: now_local.date(),
        worker_name: session.username.clone(),
        punch_type: input.punch_type,
        time: wall_time(now_local),
        lat: fix.lat,
        lon: fix.lon,
        site_id: None,
        site_name: binding.name().to_string(),
        photo: Some(key.clone()),
    };

    let (written, distance_m) = match binding {
        SiteBinding::Existing(site) => {
            punch.site_id = Some(site.id);
            (st.store.append_punch(punch).await, site.distance_m)
        }
        SiteBinding::New(site) => (
            st.store.append_punch_at_new_site(site, punch).await,
            Some(0.0),
        ),
    };

    match written {
        Ok(record) => {
            info!(
                worker = %record.worker_name,
                punch = %record.punch_type,
                site_id = ?record.site_id,
                site = %record.site_name,
                ?distance_m,
                "punch recorded"
            );
            Ok(record)
        }
        Err(e) => {
            photos::discard_photo(st.storage.as_ref(), &key).await;
            match e {
                StoreError::Duplicate => Err(ApiError::DuplicateAction(format!(
                    "punch {} already recorded today",
                    input.punch_type
                ))),
                other => Err(other.into()),
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use bytes::Bytes;
    use time::macros::{date, datetime, time};
    use uuid::Uuid;

    use super::*;
    use crate::{
        auth::Role,
        punch::clock::FixedClock,
        state::AppState,
        storage::fake::FakeStorage,
        store::{memory::MemoryStore, AttendanceStore, NewRemark, Remark, Site, SiteId, StoreResult},
    };

    const DOCK: GeoPoint = GeoPoint {
        lat: 28.5355,
        lon: 77.3910,
    };

    struct Fixture {
        st: AppState,
        store: Arc<MemoryStore>,
        storage: Arc<FakeStorage>,
        clock: Arc<FixedClock>,
        dock: Uuid,
    }

    fn fixture_with(storage: FakeStorage) -> Fixture {
        let store = Arc::new(MemoryStore::new());
        let dock = Uuid::new_v4();
        store.insert_site(Site {
            id: dock,
            name: "Okhla Dock".into(),
            lat: Some(DOCK.lat),
            lon: Some(DOCK.lon),
            site_type: SiteType::Warehouse,
            created_by: None,
        });
        store.permit("ajad", dock);
        let storage = Arc::new(storage);
        // 09:00 IST
        let clock = Arc::new(FixedClock::at(datetime!(2025-06-02 03:30 UTC)));
        let st = AppState::fake_with(store.clone(), storage.clone(), clock.clone());
        Fixture {
            st,
            store,
            storage,
            clock,
            dock,
        }
    }

    fn fixture() -> Fixture {
        fixture_with(FakeStorage::default())
    }

    fn worker(name: &str, kind: WorkerKind) -> Session {
        Session {
            username: name.into(),
            role: Role::Worker(kind),
        }
    }

    fn photo() -> Option<PhotoUpload> {
        Some(PhotoUpload {
            body: Bytes::from_static(b"jpeg"),
            content_type: "image/jpeg".into(),
        })
    }

    fn input(punch_type: PunchType) -> PunchInput {
        PunchInput {
            punch_type,
            fix: Some(DOCK),
            photo: photo(),
            new_site_name: None,
        }
    }

    #[tokio::test]
    async fn punch_in_records_local_time_site_and_photo() {
        let f = fixture();
        let rec = record_punch(&f.st, &worker("ajad", WorkerKind::Warehouse), input(PunchType::In))
            .await
            .unwrap();

        assert_eq!(rec.date, date!(2025 - 06 - 02));
        assert_eq!(rec.time, time!(09:00));
        assert_eq!(rec.site_id, Some(f.dock));
        assert_eq!(rec.site_name, "Okhla Dock");
        let key = rec.photo.unwrap();
        assert!(key.starts_with("ajad/"));
        assert_eq!(f.storage.keys(), vec![key]);
    }

    #[tokio::test]
    async fn full_day_walks_none_in_out() {
        let f = fixture();
        let s = worker("ajad", WorkerKind::Warehouse);

        let err = record_punch(&f.st, &s, input(PunchType::Out)).await.unwrap_err();
        assert!(matches!(err, ApiError::DuplicateAction(_)));

        record_punch(&f.st, &s, input(PunchType::In)).await.unwrap();
        let err = record_punch(&f.st, &s, input(PunchType::In)).await.unwrap_err();
        assert!(matches!(err, ApiError::DuplicateAction(_)));

        f.clock.advance(time::Duration::minutes(210));
        let status = today_status(&f.st, &s, None).await.unwrap();
        let progress = status.progress.unwrap();
        assert_eq!((progress.hours, progress.minutes), (3, 30));

        record_punch(&f.st, &s, input(PunchType::Out)).await.unwrap();
        let status = today_status(&f.st, &s, None).await.unwrap();
        assert_eq!(status.state, PunchState::PunchedOut);
        assert!(status.progress.is_none());
        assert_eq!(f.store.punches().len(), 2);
    }

    #[tokio::test]
    async fn next_local_day_starts_fresh() {
        let f = fixture();
        let s = worker("ajad", WorkerKind::Warehouse);
        record_punch(&f.st, &s, input(PunchType::In)).await.unwrap();
        record_punch(&f.st, &s, input(PunchType::Out)).await.unwrap();

        // 00:05 IST next day
        f.clock.set(datetime!(2025-06-02 18:35 UTC));
        let rec = record_punch(&f.st, &s, input(PunchType::In)).await.unwrap();
        assert_eq!(rec.date, date!(2025 - 06 - 03));
    }

    #[tokio::test]
    async fn missing_location_blocks_everything() {
        let f = fixture();
        let mut i = input(PunchType::In);
        i.fix = None;
        let err = record_punch(&f.st, &worker("ajad", WorkerKind::Warehouse), i)
            .await
            .unwrap_err();
        assert!(matches!(err, ApiError::LocationUnavailable));
    }

    #[tokio::test]
    async fn missing_or_empty_photo_blocks_punch_without_upload() {
        let f = fixture();
        let s = worker("ajad", WorkerKind::Warehouse);

        let mut i = input(PunchType::In);
        i.photo = None;
        let err = record_punch(&f.st, &s, i).await.unwrap_err();
        assert!(matches!(err, ApiError::PhotoMissing("IN")));

        let mut i = input(PunchType::In);
        i.photo = Some(PhotoUpload {
            body: Bytes::new(),
            content_type: "image/jpeg".into(),
        });
        assert!(matches!(
            record_punch(&f.st, &s, i).await.unwrap_err(),
            ApiError::PhotoMissing(_)
        ));
        assert!(f.store.punches().is_empty());
        assert!(f.storage.keys().is_empty());
    }

    #[tokio::test]
    async fn too_far_is_denied() {
        let f = fixture();
        let mut i = input(PunchType::In);
        i.fix = Some(GeoPoint::new(DOCK.lat + 0.01, DOCK.lon)); // ~1.1 km
        let err = record_punch(&f.st, &worker("ajad", WorkerKind::Warehouse), i)
            .await
            .unwrap_err();
        assert!(matches!(err, ApiError::SiteAccessDenied(_)));
        assert!(f.storage.keys().is_empty());
    }

    #[tokio::test]
    async fn worker_without_sites_cannot_punch() {
        let f = fixture();
        let s = worker("rahul", WorkerKind::Warehouse);
        let err = record_punch(&f.st, &s, input(PunchType::In)).await.unwrap_err();
        assert!(matches!(err, ApiError::SiteAccessDenied(_)));

        let status = today_status(&f.st, &s, Some(DOCK)).await.unwrap();
        assert_eq!(status.site, Some(Resolution::NoPermittedSites));
    }

    #[tokio::test]
    async fn failed_upload_aborts_write() {
        let f = fixture_with(FakeStorage::failing());
        let err = record_punch(&f.st, &worker("ajad", WorkerKind::Warehouse), input(PunchType::In))
            .await
            .unwrap_err();
        assert!(matches!(err, ApiError::Internal(_)));
        assert!(f.store.punches().is_empty());
    }

    #[tokio::test]
    async fn field_worker_registers_site_and_punches_out_there() {
        let f = fixture();
        let s = worker("rahul", WorkerKind::Field);
        let here = GeoPoint::new(19.07, 72.87);

        let mut i = input(PunchType::In);
        i.fix = Some(here);
        i.new_site_name = Some("  Andheri client ".into());
        let rec = record_punch(&f.st, &s, i).await.unwrap();

        let site = f
            .store
            .sites()
            .into_iter()
            .find(|x| Some(x.id) == rec.site_id)
            .unwrap();
        assert_eq!(site.name, "Andheri client");
        assert_eq!(site.site_type, SiteType::Field);
        assert_eq!(site.created_by.as_deref(), Some("rahul"));
        assert_eq!((site.lat, site.lon), (Some(here.lat), Some(here.lon)));

        let mut o = input(PunchType::Out);
        o.fix = Some(GeoPoint::new(19.2, 72.9));
        let out = record_punch(&f.st, &s, o).await.unwrap();
        assert_eq!(out.site_id, rec.site_id);
    }

    #[tokio::test]
    async fn warehouse_worker_cannot_register_sites() {
        let f = fixture();
        let mut i = input(PunchType::In);
        i.new_site_name = Some("My spot".into());
        let err = record_punch(&f.st, &worker("ajad", WorkerKind::Warehouse), i)
            .await
            .unwrap_err();
        assert!(matches!(err, ApiError::BadRequest(_)));
    }

    #[tokio::test]
    async fn admin_cannot_punch() {
        let f = fixture();
        let admin = Session {
            username: "admin".into(),
            role: Role::Admin,
        };
        let err = record_punch(&f.st, &admin, input(PunchType::In)).await.unwrap_err();
        assert!(matches!(err, ApiError::Forbidden(_)));
    }

    #[tokio::test]
    async fn status_reports_resolution_when_fix_given() {
        let f = fixture();
        let s = worker("ajad", WorkerKind::Warehouse);
        let status = today_status(&f.st, &s, Some(DOCK)).await.unwrap();
        assert_eq!(status.state, PunchState::None);
        let site = status.site.unwrap();
        assert_eq!(site.accepted().map(|m| m.id), Some(f.dock));
    }

    /// Sees an empty day for every worker, then loses each punch write to
    /// the unique index, as a concurrent request would.
    struct RacingStore(Arc<MemoryStore>);

    #[async_trait::async_trait]
    impl AttendanceStore for RacingStore {
        async fn list_permitted_site_ids(&self, worker: &str) -> StoreResult<Vec<SiteId>> {
            self.0.list_permitted_site_ids(worker).await
        }

        async fn get_site(&self, id: SiteId) -> StoreResult<Option<Site>> {
            self.0.get_site(id).await
        }

        async fn append_punch(&self, _punch: NewPunch) -> StoreResult<PunchRecord> {
            Err(StoreError::Duplicate)
        }

        async fn append_punch_at_new_site(
            &self,
            _site: NewSite,
            _punch: NewPunch,
        ) -> StoreResult<PunchRecord> {
            Err(StoreError::Duplicate)
        }

        async fn list_punches_for(&self, _w: &str, _d: time::Date) -> StoreResult<Vec<PunchRecord>> {
            Ok(Vec::new())
        }

        async fn list_punches_between(
            &self,
            start: time::Date,
            end: time::Date,
        ) -> StoreResult<Vec<PunchRecord>> {
            self.0.list_punches_between(start, end).await
        }

        async fn append_remark(&self, remark: NewRemark) -> StoreResult<Remark> {
            self.0.append_remark(remark).await
        }

        async fn list_remarks_between(
            &self,
            start: time::Date,
            end: time::Date,
        ) -> StoreResult<Vec<Remark>> {
            self.0.list_remarks_between(start, end).await
        }
    }

    fn racing(f: &Fixture) -> AppState {
        AppState {
            store: Arc::new(RacingStore(f.store.clone())),
            ..f.st.clone()
        }
    }

    #[tokio::test]
    async fn losing_the_write_race_is_a_conflict_and_drops_the_photo() {
        let f = fixture();
        let st = racing(&f);
        let err = record_punch(&st, &worker("ajad", WorkerKind::Warehouse), input(PunchType::In))
            .await
            .unwrap_err();
        assert!(matches!(err, ApiError::DuplicateAction(_)));
        assert_eq!(err.status_and_code().0, axum::http::StatusCode::CONFLICT);
        assert!(f.storage.keys().is_empty());
        assert!(f.store.punches().is_empty());
    }

    #[tokio::test]
    async fn failed_upload_leaves_no_field_site_behind() {
        let f = fixture_with(FakeStorage::failing());
        let sites_before = f.store.sites().len();
        let mut i = input(PunchType::In);
        i.new_site_name = Some("Andheri".into());
        let err = record_punch(&f.st, &worker("rahul", WorkerKind::Field), i)
            .await
            .unwrap_err();
        assert!(matches!(err, ApiError::Internal(_)));
        assert!(f.store.punches().is_empty());
        assert_eq!(f.store.sites().len(), sites_before);
    }

    #[tokio::test]
    async fn conflicting_field_punch_registers_no_site() {
        let f = fixture();
        let st = racing(&f);
        let sites_before = f.store.sites().len();
        let mut i = input(PunchType::In);
        i.new_site_name = Some("Andheri".into());
        let err = record_punch(&st, &worker("rahul", WorkerKind::Field), i)
            .await
            .unwrap_err();
        assert!(matches!(err, ApiError::DuplicateAction(_)));
        assert_eq!(f.store.sites().len(), sites_before);
        assert!(f.storage.keys().is_empty());
    }

    #[tokio::test]
    async fn memory_store_keeps_no_site_when_the_punch_collides() {
        let store = MemoryStore::new();
        let site = || NewSite {
            name: "Andheri".into(),
            lat: 19.07,
            lon: 72.87,
            site_type: SiteType::Field,
            created_by: "rahul".into(),
        };
        let punch = || NewPunch {
            date: date!(2025 - 06 - 02),
            worker_name: "rahul".into(),
            punch_type: PunchType::In,
            time: time!(09:00),
            lat: 19.07,
            lon: 72.87,
            site_id: None,
            site_name: "Andheri".into(),
            photo: None,
        };
        let rec = store.append_punch_at_new_site(site(), punch()).await.unwrap();
        assert_eq!(store.sites().len(), 1);
        assert_eq!(rec.site_id, Some(store.sites()[0].id));

        let err = store.append_punch_at_new_site(site(), punch()).await.unwrap_err();
        assert!(matches!(err, StoreError::Duplicate));
        assert_eq!(store.sites().len(), 1);
    }
}
