//! Workforce-wide daily attendance numbers for the admin dashboard.

use std::collections::HashSet;
use std::sync::Arc;
use std::time::Duration;

use chrono::{NaiveDate, NaiveTime};
use moka::future::Cache;
use serde::Serialize;
use utoipa::ToSchema;

use crate::{
    auth::auth::AuthContext,
    clock::Clock,
    error::AppError,
    model::{attendance::AttendanceRecord, stats::AttendanceStats, user::User},
    store::RecordStore,
};

/// Aggregates one day's numbers.
///
/// `roster` may hold every user; only active employees are counted, and
/// only their records make up `present_today` and `late_arrivals`. Present
/// means a record of any status. A record is late when its check-in is
/// strictly after `cutoff`. Records of users missing from `roster` are
/// skipped with a data-integrity warning.
pub fn aggregate(roster: &[User], today: &[AttendanceRecord], cutoff: NaiveTime) -> AttendanceStats {
    let employees: HashSet<&str> = roster
        .iter()
        .filter(|u| u.is_rostered())
        .map(|u| u.id.as_str())
        .collect();
    let known: HashSet<&str> = roster.iter().map(|u| u.id.as_str()).collect();
    let total_employees = employees.len() as u64;

    let unknown = today.iter().filter(|r| !known.contains(r.user_id.as_str())).count();
    if unknown > 0 {
        tracing::warn!(unknown, "Data integrity: attendance records for unknown users left out of stats");
    }

    let counted: Vec<&AttendanceRecord> = today
        .iter()
        .filter(|r| employees.contains(r.user_id.as_str()))
        .collect();

    let present_today = counted
        .iter()
        .map(|r| r.user_id.as_str())
        .collect::<HashSet<_>>()
        .len() as u64;

    let late_arrivals = counted
        .iter()
        .filter(|r| r.check_in_time.is_some_and(|t| t.time() > cutoff))
        .count() as u64;

    if present_today > total_employees {
        tracing::warn!(
            total_employees,
            present_today,
            "Data integrity: more employees present than rostered; clamping absent to 0"
        );
    }

    AttendanceStats {
        total_employees,
        present_today,
        late_arrivals,
        absent: total_employees.saturating_sub(present_today),
    }
}

#[derive(Debug, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct StatsSnapshot {
    #[serde(flatten)]
    pub stats: AttendanceStats,
    /// True when the store was unreachable and cached (or zeroed) numbers are shown
    pub stale: bool,
}

pub struct StatsService {
    store: Arc<dyn RecordStore>,
    clock: Arc<dyn Clock>,
    late_cutoff: NaiveTime,
    last_known: Cache<NaiveDate, AttendanceStats>,
}

impl StatsService {
    pub fn new(store: Arc<dyn RecordStore>, clock: Arc<dyn Clock>, late_cutoff: NaiveTime, cache_ttl: Duration) -> Self {
        Self {
            store,
            clock,
            late_cutoff,
            last_known: Cache::builder().max_capacity(31).time_to_live(cache_ttl).build(),
        }
    }

    /// Today's numbers straight from the store.
    pub async fn stats(&self, ctx: &AuthContext) -> Result<AttendanceStats, AppError> {
        ctx.require_admin()?;

        let today = self.clock.today();
        let roster = self.store.list_users().await?;
        let records = self.store.list_attendance_between(today, today).await?;

        let stats = aggregate(&roster, &records, self.late_cutoff);
        self.last_known.insert(today, stats).await;

        tracing::debug!(?stats, %today, "Attendance stats computed");
        Ok(stats)
    }

    /// Like [`stats`](Self::stats) but degrades to the last computed numbers
    /// for today (or zeros) while the store is unavailable.
    pub async fn dashboard(&self, ctx: &AuthContext) -> Result<StatsSnapshot, AppError> {
        match self.stats(ctx).await {
            Ok(stats) => Ok(StatsSnapshot { stats, stale: false }),
            Err(AppError::StoreUnavailable(detail)) => {
                tracing::warn!(error = %detail, "Store unavailable, serving cached attendance stats");
                let stats = self
                    .last_known
                    .get(&self.clock.today())
                    .await
                    .unwrap_or_default();
                Ok(StatsSnapshot { stats, stale: true })
            }
            Err(e) => Err(e),
        }
    }
}
