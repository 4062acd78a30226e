use anyhow::Context;
use async_trait::async_trait;
use sqlx::{FromRow, PgExecutor, PgPool};
use time::{Date, OffsetDateTime, Time};
use uuid::Uuid;

use super::{
    AttendanceStore, NewPunch, NewRemark, NewSite, PunchRecord, PunchType, Remark, Site, SiteId,
    SiteType, StoreError, StoreResult,
};

#[derive(Debug, FromRow)]
struct SiteRow {
    id: Uuid,
    name: String,
    lat: Option<f64>,
    lon: Option<f64>,
    site_type: String,
    created_by: Option<String>,
}

impl TryFrom<SiteRow> for Site {
    type Error = anyhow::Error;

    fn try_from(r: SiteRow) -> anyhow::Result<Self> {
        let site_type = SiteType::from_db_str(&r.site_type)
            .with_context(|| format!("unknown site_type {:?} for site {}", r.site_type, r.id))?;
        Ok(Self {
            id: r.id,
            name: r.name,
            lat: r.lat,
            lon: r.lon,
            site_type,
            created_by: r.created_by,
        })
    }
}

#[derive(Debug, FromRow)]
struct PunchRow {
    id: Uuid,
    date: Date,
    worker_name: String,
    punch_type: String,
    time: Time,
    lat: f64,
    lon: f64,
    site_id: Option<Uuid>,
    site_name: String,
    photo: Option<String>,
    created_at: OffsetDateTime,
}

impl TryFrom<PunchRow> for PunchRecord {
    type Error = anyhow::Error;

    fn try_from(r: PunchRow) -> anyhow::Result<Self> {
        let punch_type = PunchType::parse(&r.punch_type)
            .with_context(|| format!("unknown punch_type {:?} for punch {}", r.punch_type, r.id))?;
        Ok(Self {
            id: r.id,
            date: r.date,
            worker_name: r.worker_name,
            punch_type,
            time: r.time,
            lat: r.lat,
            lon: r.lon,
            site_id: r.site_id,
            site_name: r.site_name,
            photo: r.photo,
            created_at: r.created_at,
        })
    }
}

#[derive(Debug, FromRow)]
struct RemarkRow {
    id: Uuid,
    worker_name: String,
    date: Date,
    time: Time,
    remark: String,
    created_at: OffsetDateTime,
}

impl From<RemarkRow> for Remark {
    fn from(r: RemarkRow) -> Self {
        Self {
            id: r.id,
            worker_name: r.worker_name,
            date: r.date,
            time: r.time,
            text: r.remark,
            created_at: r.created_at,
        }
    }
}

const PUNCH_COLUMNS: &str =
    "id, date, worker_name, punch_type, time, lat, lon, site_id, site_name, photo, created_at";

/// PostgreSQL-backed store.
#[derive(Clone)]
pub struct PgStore {
    db: PgPool,
}

impl PgStore {
    pub fn new(db: PgPool) -> Self {
        Self { db }
    }
}

async fn insert_punch<'e, E>(exec: E, punch: &NewPunch) -> StoreResult<PunchRecord>
where
    E: PgExecutor<'e>,
{
    let sql = format!(
        r#"
        INSERT INTO punches (date, worker_name, punch_type, time, lat, lon, site_id, site_name, photo)
        VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9)
        RETURNING {PUNCH_COLUMNS}
        "#
    );
    let row = sqlx::query_as::<_, PunchRow>(&sql)
        .bind(punch.date)
        .bind(&punch.worker_name)
        .bind(punch.punch_type.as_str())
        .bind(punch.time)
        .bind(punch.lat)
        .bind(punch.lon)
        .bind(punch.site_id)
        .bind(&punch.site_name)
        .bind(&punch.photo)
        .fetch_one(exec)
        .await
        .map_err(|e| {
            if let sqlx::Error::Database(db) = &e {
                if db.is_unique_violation() {
                    return StoreError::Duplicate;
                }
            }
            StoreError::Backend(anyhow::Error::new(e).context("insert punch"))
        })?;
    Ok(PunchRecord::try_from(row)?)
}

fn punches(rows: Vec<PunchRow>) -> StoreResult<Vec<PunchRecord>> {
    rows.into_iter()
        .map(|r| PunchRecord::try_from(r).map_err(StoreError::from))
        .collect()
}

#[async_trait]
impl AttendanceStore for PgStore {
    async fn list_permitted_site_ids(&self, worker: &str) -> StoreResult<Vec<SiteId>> {
        let ids = sqlx::query_scalar::<_, Uuid>(
            r#"
            SELECT site_id
              FROM worker_sites
             WHERE worker_name = $1
             ORDER BY seq
            "#,
        )
        .bind(worker)
        .fetch_all(&self.db)
        .await
        .context("list permitted sites")?;
        Ok(ids)
    }

    async fn get_site(&self, id: SiteId) -> StoreResult<Option<Site>> {
        let row = sqlx::query_as::<_, SiteRow>(
            r#"
            SELECT id, name, lat, lon, site_type, created_by
              FROM sites
             WHERE id = $1
            "#,
        )
        .bind(id)
        .fetch_optional(&self.db)
        .await
        .context("get site")?;
        Ok(row.map(Site::try_from).transpose()?)
    }

    async fn append_punch(&self, punch: NewPunch) -> StoreResult<PunchRecord> {
        insert_punch(&self.db, &punch).await
    }

    async fn append_punch_at_new_site(
        &self,
        site: NewSite,
        mut punch: NewPunch,
    ) -> StoreResult<PunchRecord> {
        let mut tx = self.db.begin().await.context("begin punch transaction")?;

        let site_id = sqlx::query_scalar::<_, Uuid>(
            r#"
            INSERT INTO sites (name, lat, lon, site_type, created_by)
            VALUES ($1, $2, $3, $4, $5)
            RETURNING id
            "#,
        )
        .bind(&site.name)
        .bind(site.lat)
        .bind(site.lon)
        .bind(site.site_type.as_str())
        .bind(&site.created_by)
        .fetch_one(&mut *tx)
        .await
        .context("insert site")?;

        punch.site_id = Some(site_id);
        // dropping `tx` on error rolls the site back
        let record = insert_punch(&mut *tx, &punch).await?;
        tx.commit().await.context("commit punch transaction")?;
        Ok(record)
    }

    async fn list_punches_for(&self, worker: &str, date: Date) -> StoreResult<Vec<PunchRecord>> {
        let sql = format!(
            r#"
            SELECT {PUNCH_COLUMNS}
              FROM punches
             WHERE worker_name = $1 AND date = $2
             ORDER BY time ASC, created_at ASC
            "#
        );
        let rows = sqlx::query_as::<_, PunchRow>(&sql)
            .bind(worker)
            .bind(date)
            .fetch_all(&self.db)
            .await
            .context("list punches for worker")?;
        punches(rows)
    }

    async fn list_punches_between(
        &self,
        start: Date,
        end: Date,
    ) -> StoreResult<Vec<PunchRecord>> {
        let sql = format!(
            r#"
            SELECT {PUNCH_COLUMNS}
              FROM punches
             WHERE date BETWEEN $1 AND $2
             ORDER BY date ASC, time ASC, created_at ASC
            "#
        );
        let rows = sqlx::query_as::<_, PunchRow>(&sql)
            .bind(start)
            .bind(end)
            .fetch_all(&self.db)
            .await
            .context("list punches in range")?;
        punches(rows)
    }

    async fn append_remark(&self, remark: NewRemark) -> StoreResult<Remark> {
        let row = sqlx::query_as::<_, RemarkRow>(
            r#"
            INSERT INTO remarks (worker_name, date, time, remark)
            VALUES ($1, $2, $3, $4)
            RETURNING id, worker_name, date, time, remark, created_at
            "#,
        )
        .bind(&remark.worker_name)
        .bind(remark.date)
        .bind(remark.time)
        .bind(&remark.text)
        .fetch_one(&self.db)
        .await
        .context("insert remark")?;
        Ok(row.into())
    }

    async fn list_remarks_between(&self, start: Date, end: Date) -> StoreResult<Vec<Remark>> {
        let rows = sqlx::query_as::<_, RemarkRow>(
            r#"
            SELECT id, worker_name, date, time, remark, created_at
              FROM remarks
             WHERE date BETWEEN $1 AND $2
             ORDER BY created_at DESC
            "#,
        )
        .bind(start)
        .bind(end)
        .fetch_all(&self.db)
        .await
        .context("list remarks in range")?;
        Ok(rows.into_iter().map(Remark::from).collect())
    }
}
