//! Customer monitoring export.
//!
//! Pushes every business and consumer changed since the previous run to an
//! external monitoring service. Rows are paged in `(modified, id)` order;
//! each page is pushed concurrently, one task per row, and fully joined
//! before the next page is read. A failed push is logged and counted but
//! never stops the run.

use std::sync::Arc;

use async_trait::async_trait;
use chrono::{DateTime, TimeDelta, Utc};
use serde::Serialize;
use sqlx::{FromRow, postgres::PgRow};
use tokio::task::JoinSet;
use uuid::Uuid;

use crate::{
    db::DbPool,
    models::{
        business::{Business, BusinessResponse},
        consumer::{Consumer, ConsumerResponse},
    },
};

/// Key of this job's row in `monitor_checkpoints`.
pub const JOB_NAME: &str = "customer_monitor";

#[derive(Debug, thiserror::Error)]
pub enum MonitorError {
    #[error("database error: {0}")]
    Database(#[from] sqlx::Error),

    #[error("monitor request failed: {0}")]
    Transport(#[from] reqwest::Error),

    #[error("monitor rejected record with {status}: {body}")]
    Rejected { status: u16, body: String },
}

/// The customer half of a monitor record, tagged by kind.
#[derive(Debug, Serialize)]
#[serde(tag = "type", content = "record", rename_all = "camelCase")]
pub enum MonitorCustomer {
    Business(BusinessResponse),
    Consumer(ConsumerResponse),
}

/// One changed customer, masked the same way the API masks it.
///
/// `deleted` is always present: `null` for live customers, the deletion
/// time for soft-deleted ones.
#[derive(Debug, Serialize)]
pub struct MonitorRecord {
    #[serde(flatten)]
    pub customer: MonitorCustomer,
    pub deleted: Option<DateTime<Utc>>,
}

impl MonitorRecord {
    fn id(&self) -> String {
        match &self.customer {
            MonitorCustomer::Business(business) => business.id.to_string(),
            MonitorCustomer::Consumer(consumer) => consumer.id.to_string(),
        }
    }
}

impl From<Business> for MonitorRecord {
    fn from(business: Business) -> Self {
        Self {
            deleted: business.deleted,
            customer: MonitorCustomer::Business(business.into()),
        }
    }
}

impl From<Consumer> for MonitorRecord {
    fn from(consumer: Consumer) -> Self {
        Self {
            deleted: consumer.deleted,
            customer: MonitorCustomer::Consumer(consumer.into()),
        }
    }
}

/// A customer table scanned in `(modified, id)` keyset order.
trait MonitoredRow: for<'r> FromRow<'r, PgRow> + Into<MonitorRecord> + Send + Unpin + 'static {
    const TABLE: &'static str;

    fn cursor(&self) -> (DateTime<Utc>, Uuid);
}

impl MonitoredRow for Business {
    const TABLE: &'static str = "businesses";

    fn cursor(&self) -> (DateTime<Utc>, Uuid) {
        (self.modified, *self.id.as_uuid())
    }
}

impl MonitoredRow for Consumer {
    const TABLE: &'static str = "consumers";

    fn cursor(&self) -> (DateTime<Utc>, Uuid) {
        (self.modified, *self.id.as_uuid())
    }
}

/// How far each run reaches back before the previous checkpoint.
///
/// `modified` is stamped with the writing transaction's start time, so a
/// row can commit after a scan with a timestamp the scan already passed.
/// Rows in the overlap are pushed again; the monitor sees them twice.
pub const SCAN_OVERLAP: TimeDelta = TimeDelta::minutes(5);

/// Lower bound of a run's window for the given checkpoint.
pub fn window_start(checkpoint: Option<DateTime<Utc>>) -> DateTime<Utc> {
    checkpoint
        .and_then(|at| at.checked_sub_signed(SCAN_OVERLAP))
        .map_or(DateTime::UNIX_EPOCH, |at| at.max(DateTime::UNIX_EPOCH))
}

#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait MonitorSink: Send + Sync {
    async fn push(&self, record: &MonitorRecord) -> Result<(), MonitorError>;
}

/// Posts each record as JSON to the monitoring service.
pub struct HttpMonitorSink {
    http: reqwest::Client,
    url: String,
}

impl HttpMonitorSink {
    pub fn new(http: reqwest::Client, url: impl Into<String>) -> Self {
        Self {
            http,
            url: url.into(),
        }
    }
}

#[async_trait]
impl MonitorSink for HttpMonitorSink {
    async fn push(&self, record: &MonitorRecord) -> Result<(), MonitorError> {
        let response = self.http.post(&self.url).json(record).send().await?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(MonitorError::Rejected {
                status: status.as_u16(),
                body,
            });
        }
        Ok(())
    }
}

#[derive(Debug, Default, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct MonitorReport {
    pub pushed: usize,
    pub failed: usize,
}

impl MonitorReport {
    fn add(&mut self, other: MonitorReport) {
        self.pushed += other.pushed;
        self.failed += other.failed;
    }
}

/// Push one page of records concurrently and wait for all of them.
pub async fn push_records(sink: Arc<dyn MonitorSink>, records: Vec<MonitorRecord>) -> MonitorReport {
    let mut tasks = JoinSet::new();

    for record in records {
        let sink = Arc::clone(&sink);
        tasks.spawn(async move {
            let result = sink.push(&record).await;
            if let Err(err) = &result {
                tracing::warn!(error = %err, record_id = %record.id(), "Monitor push failed");
            }
            result.is_ok()
        });
    }

    let mut report = MonitorReport::default();
    while let Some(joined) = tasks.join_next().await {
        match joined {
            Ok(true) => report.pushed += 1,
            Ok(false) => report.failed += 1,
            Err(err) => {
                tracing::error!(error = %err, "Monitor push task aborted");
                report.failed += 1;
            }
        }
    }
    report
}

pub struct MonitorJob {
    pool: DbPool,
    sink: Arc<dyn MonitorSink>,
    batch_size: i64,
}

impl MonitorJob {
    pub fn new(pool: DbPool, sink: Arc<dyn MonitorSink>, batch_size: usize) -> Self {
        Self {
            pool,
            sink,
            batch_size: i64::try_from(batch_size.max(1)).unwrap_or(i64::MAX),
        }
    }

    /// Export everything changed since the last checkpoint, then advance the
    /// checkpoint to this run's start time.
    ///
    /// Both ends of the window come from the database clock, the same clock
    /// that stamps `modified`.
    pub async fn run(&self) -> Result<MonitorReport, MonitorError> {
        let started = sqlx::query_scalar::<_, DateTime<Utc>>("SELECT NOW()")
            .fetch_one(&self.pool)
            .await?;
        let since = window_start(self.checkpoint().await?);
        tracing::info!(%since, %started, batch_size = self.batch_size, "Monitor run started");

        let mut report = MonitorReport::default();
        report.add(self.export::<Business>(since, started).await?);
        report.add(self.export::<Consumer>(since, started).await?);

        self.save_checkpoint(started).await?;

        tracing::info!(pushed = report.pushed, failed = report.failed, "Monitor run finished");
        Ok(report)
    }

    /// Push every row of `T`'s table modified in `(since, until]`, a page at a time.
    async fn export<T: MonitoredRow>(
        &self,
        since: DateTime<Utc>,
        until: DateTime<Utc>,
    ) -> Result<MonitorReport, MonitorError> {
        let sql = format!(
            "SELECT * FROM {} \
             WHERE modified > $1 AND modified <= $2 AND (modified, id) > ($3, $4) \
             ORDER BY modified, id \
             LIMIT $5",
            T::TABLE
        );

        let mut report = MonitorReport::default();
        let mut cursor = (since, Uuid::nil());

        loop {
            let page = sqlx::query_as::<_, T>(&sql)
                .bind(since)
                .bind(until)
                .bind(cursor.0)
                .bind(cursor.1)
                .bind(self.batch_size)
                .fetch_all(&self.pool)
                .await?;

            let Some(last) = page.last() else { break };
            cursor = last.cursor();
            let full_page = i64::try_from(page.len()).is_ok_and(|len| len == self.batch_size);

            let records = page.into_iter().map(Into::into).collect();
            report.add(push_records(Arc::clone(&self.sink), records).await);

            if !full_page {
                break;
            }
        }

        tracing::debug!(table = T::TABLE, pushed = report.pushed, failed = report.failed, "Table exported");
        Ok(report)
    }

    async fn checkpoint(&self) -> Result<Option<DateTime<Utc>>, MonitorError> {
        let last_run = sqlx::query_scalar::<_, DateTime<Utc>>(
            "SELECT last_run FROM monitor_checkpoints WHERE job_name = $1",
        )
        .bind(JOB_NAME)
        .fetch_optional(&self.pool)
        .await?;

        Ok(last_run)
    }

    async fn save_checkpoint(&self, at: DateTime<Utc>) -> Result<(), MonitorError> {
        sqlx::query(
            r#"
            INSERT INTO monitor_checkpoints (job_name, last_run)
            VALUES ($1, $2)
            ON CONFLICT (job_name) DO UPDATE SET last_run = EXCLUDED.last_run
            "#,
        )
        .bind(JOB_NAME)
        .bind(at)
        .execute(&self.pool)
        .await?;

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;
    use crate::{
        models::status::{EntityType, KycStatus},
        shared::BusinessId,
    };

    fn business(name: &str) -> Business {
        Business {
            id: BusinessId::new(),
            legal_name: name.to_string(),
            dba: None,
            entity_type: EntityType::Corporation,
            tax_id: "123456789".to_string(),
            email: None,
            phone: None,
            kyc_status: KycStatus::Approved,
            created: Utc::now(),
            modified: Utc::now(),
            deleted: None,
        }
    }

    fn business_record(name: &str) -> MonitorRecord {
        business(name).into()
    }

    fn legal_name(record: &MonitorRecord) -> &str {
        match &record.customer {
            MonitorCustomer::Business(business) => &business.legal_name,
            MonitorCustomer::Consumer(consumer) => &consumer.first_name,
        }
    }

    #[tokio::test]
    async fn failing_rows_are_counted_not_fatal() {
        let mut sink = MockMonitorSink::new();
        sink.expect_push().times(3).returning(|record| {
            if legal_name(record) == "Broken Inc" {
                Err(MonitorError::Rejected {
                    status: 503,
                    body: "unavailable".to_string(),
                })
            } else {
                Ok(())
            }
        });

        let report = push_records(
            Arc::new(sink),
            vec![
                business_record("Acme LLC"),
                business_record("Broken Inc"),
                business_record("Globex Corp"),
            ],
        )
        .await;

        assert_eq!(report, MonitorReport { pushed: 2, failed: 1 });
    }

    #[tokio::test]
    async fn empty_page_pushes_nothing() {
        let mut sink = MockMonitorSink::new();
        sink.expect_push().never();

        let report = push_records(Arc::new(sink), Vec::new()).await;
        assert_eq!(report, MonitorReport::default());
    }

    #[test]
    fn records_are_tagged_by_kind() {
        let json = serde_json::to_value(business_record("Acme LLC")).unwrap();

        assert_eq!(json["type"], "business");
        assert_eq!(json["record"]["legalName"], "Acme LLC");
        assert_eq!(json["record"]["taxIdLastFour"], "6789");
        assert!(json["record"].get("taxId").is_none());
        assert!(json["deleted"].is_null());
    }

    #[test]
    fn deleted_customers_carry_their_deletion_time() {
        let deleted_at = Utc.with_ymd_and_hms(2026, 3, 2, 9, 30, 0).unwrap();
        let record: MonitorRecord = Business {
            deleted: Some(deleted_at),
            ..business("Closed Shop LLC")
        }
        .into();

        let json = serde_json::to_value(&record).unwrap();

        assert_eq!(json["type"], "business");
        assert_eq!(json["deleted"], "2026-03-02T09:30:00Z");
        assert_eq!(json["record"]["legalName"], "Closed Shop LLC");
    }

    #[test]
    fn window_reaches_back_past_the_checkpoint() {
        let checkpoint = Utc.with_ymd_and_hms(2026, 3, 2, 0, 0, 0).unwrap();

        assert_eq!(window_start(Some(checkpoint)), checkpoint - SCAN_OVERLAP);
        assert_eq!(window_start(None), DateTime::UNIX_EPOCH);
    }

    #[test]
    fn window_never_starts_before_the_epoch() {
        let checkpoint = DateTime::UNIX_EPOCH + TimeDelta::minutes(1);
        assert_eq!(window_start(Some(checkpoint)), DateTime::UNIX_EPOCH);
    }
}
