//! Check-in / check-out state machine for one user's day.
//!
//! ```text
//! NoRecordToday --check_in--> CheckedIn --check_out--> CheckedOut
//! ```
//!
//! `CheckedOut` is terminal until the date rolls over; the next day's
//! lookup simply misses the old record.

use std::sync::Arc;

use chrono::{Duration, NaiveDate};
use serde::Serialize;
use utoipa::ToSchema;
use uuid::Uuid;

use super::{geofence, hours::hours_worked};
use crate::{
    auth::auth::AuthContext,
    clock::Clock,
    error::AppError,
    model::{
        attendance::{AttendanceRecord, Capture, CheckOutUpdate},
        user::UserSummary,
    },
    store::{RecordStore, StoreError},
};

pub const DEFAULT_HISTORY_LIMIT: u32 = 10;
pub const MAX_HISTORY_LIMIT: u32 = 100;
const DEFAULT_ADMIN_RANGE_DAYS: i64 = 30;

#[derive(Debug, Clone, Copy, Default)]
pub struct AttendancePolicy {
    /// Reject captures outside every active work location
    pub enforce_geofence: bool,
}

/// Attendance row with its owner, for admin listings
#[derive(Debug, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct AttendanceWithUser {
    #[serde(flatten)]
    pub record: AttendanceRecord,
    pub user: Option<UserSummary>,
}

pub struct AttendanceService {
    store: Arc<dyn RecordStore>,
    clock: Arc<dyn Clock>,
    policy: AttendancePolicy,
}

impl AttendanceService {
    pub fn new(store: Arc<dyn RecordStore>, clock: Arc<dyn Clock>, policy: AttendancePolicy) -> Self {
        Self { store, clock, policy }
    }

    pub async fn check_in(&self, ctx: &AuthContext, capture: Capture) -> Result<AttendanceRecord, AppError> {
        validate_capture(&capture)?;
        self.enforce_geofence(&capture).await?;

        let now = self.clock.now();

        if let Some(existing) = self.store.find_attendance_on(&ctx.user_id, now.date()).await? {
            return Err(transition_conflict(&existing));
        }

        let record = AttendanceRecord::open(Uuid::new_v4().to_string(), &ctx.user_id, now, capture);

        match self.store.insert_attendance(&record).await {
            Ok(()) => {}
            // lost a race with a concurrent check-in for the same day
            Err(StoreError::Conflict(_)) => {
                let existing = self.store.find_attendance_on(&ctx.user_id, record.date).await?;
                return Err(existing.as_ref().map_or(AppError::AlreadyCheckedIn, transition_conflict));
            }
            Err(e) => return Err(e.into()),
        }

        tracing::info!(user_id = %ctx.user_id, record_id = %record.id, date = %record.date, "Checked in");
        Ok(record)
    }

    pub async fn check_out(&self, ctx: &AuthContext, capture: Capture) -> Result<AttendanceRecord, AppError> {
        validate_capture(&capture)?;
        self.enforce_geofence(&capture).await?;

        let now = self.clock.now();

        let open = match self.store.find_attendance_on(&ctx.user_id, now.date()).await? {
            Some(record) if record.is_open() => record,
            _ => return Err(AppError::NotCheckedIn),
        };

        let check_in = open
            .check_in_time
            .ok_or_else(|| AppError::Internal(format!("open record {} has no check-in time", open.id)))?;

        let hours = hours_worked(check_in, now).inspect_err(|_| {
            tracing::warn!(user_id = %ctx.user_id, record_id = %open.id, %check_in, check_out = %now, "Check-out precedes check-in");
        })?;

        let update = CheckOutUpdate {
            check_out_time: now,
            location: capture.location,
            photo: capture.photo,
            hours_worked: hours,
        };

        let closed = self
            .store
            .close_attendance(&open.id, update)
            .await?
            .ok_or(AppError::NotCheckedIn)?;

        tracing::info!(user_id = %ctx.user_id, record_id = %closed.id, hours_worked = %hours, "Checked out");
        Ok(closed)
    }

    /// Pure read of the caller's record for the current day.
    pub async fn today_record(&self, ctx: &AuthContext) -> Result<Option<AttendanceRecord>, AppError> {
        Ok(self.store.find_attendance_on(&ctx.user_id, self.clock.today()).await?)
    }

    pub async fn history(&self, ctx: &AuthContext, limit: Option<u32>) -> Result<Vec<AttendanceRecord>, AppError> {
        let limit = limit.unwrap_or(DEFAULT_HISTORY_LIMIT).clamp(1, MAX_HISTORY_LIMIT);
        Ok(self.store.list_user_attendance(&ctx.user_id, limit).await?)
    }

    /// All users' records in `[from, to]`, defaulting to the last 30 days.
    pub async fn records_between(
        &self,
        ctx: &AuthContext,
        from: Option<NaiveDate>,
        to: Option<NaiveDate>,
    ) -> Result<Vec<AttendanceWithUser>, AppError> {
        ctx.require_admin()?;

        let to = to.unwrap_or_else(|| self.clock.today());
        let from = from.unwrap_or(to - Duration::days(DEFAULT_ADMIN_RANGE_DAYS));
        if from > to {
            return Err(AppError::validation("from cannot be after to"));
        }

        let records = self.store.list_attendance_between(from, to).await?;
        let users = self.store.list_users().await?;

        Ok(records
            .into_iter()
            .map(|record| {
                let user = users
                    .iter()
                    .find(|u| u.id == record.user_id)
                    .map(UserSummary::from);
                AttendanceWithUser { record, user }
            })
            .collect())
    }

    pub async fn record(&self, ctx: &AuthContext, id: &str) -> Result<AttendanceRecord, AppError> {
        let record = self
            .store
            .find_attendance(id)
            .await?
            .ok_or(AppError::NotFound("Attendance record"))?;

        if record.user_id != ctx.user_id {
            ctx.require_admin()?;
        }
        Ok(record)
    }

    async fn enforce_geofence(&self, capture: &Capture) -> Result<(), AppError> {
        if !self.policy.enforce_geofence {
            return Ok(());
        }

        let locations = self.store.list_active_locations().await?;
        if locations.is_empty() {
            tracing::warn!("Geofence enforcement is on but no active work location exists");
            return Ok(());
        }

        let check = geofence::check_point(&capture.location, &locations);
        if check.within_geofence {
            Ok(())
        } else {
            tracing::info!(distance_meters = ?check.distance_meters, "Capture rejected outside geofence");
            Err(AppError::OutsideGeofence)
        }
    }
}

fn transition_conflict(existing: &AttendanceRecord) -> AppError {
    if existing.is_open() {
        AppError::AlreadyCheckedIn
    } else {
        AppError::AlreadyCheckedOut
    }
}

fn validate_capture(capture: &Capture) -> Result<(), AppError> {
    if !capture.location.is_valid() {
        return Err(AppError::validation("location latitude/longitude out of range"));
    }
    if capture.photo.trim().is_empty() {
        return Err(AppError::validation("photo is required"));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{
        clock::FixedClock,
        model::{
            attendance::{AttendanceStatus, GeoPoint},
            role::Role,
            work_location::WorkLocation,
        },
        store::{AttendanceStore, WorkLocationStore, memory::MemoryStore},
    };
    use rust_decimal_macros::dec;

    struct Fixture {
        store: Arc<MemoryStore>,
        clock: Arc<FixedClock>,
        service: AttendanceService,
    }

    fn fixture_with(policy: AttendancePolicy) -> Fixture {
        let store = Arc::new(MemoryStore::new());
        let clock = Arc::new(FixedClock::at(2025, 6, 2, 8, 45, 0));
        let service = AttendanceService::new(store.clone(), clock.clone(), policy);
        Fixture { store, clock, service }
    }

    fn fixture() -> Fixture {
        fixture_with(AttendancePolicy::default())
    }

    fn employee(id: &str) -> AuthContext {
        AuthContext { user_id: id.into(), email: format!("{}@company.com", id), role: Role::Employee }
    }

    fn capture(photo: &str) -> Capture {
        Capture {
            location: GeoPoint { lat: 23.8103, lng: 90.4125, address: Some("Gulshan Ave".into()) },
            photo: photo.into(),
        }
    }

    #[actix_web::test]
    async fn check_in_opens_todays_record() {
        let f = fixture();
        let record = f.service.check_in(&employee("u1"), capture("data:image/jpeg;base64,IN")).await.unwrap();

        assert_eq!(record.status, AttendanceStatus::CheckedIn);
        assert_eq!(record.check_in_time, Some(f.clock.now()));
        assert_eq!(record.date, f.clock.today());
        assert!(record.check_out_time.is_none());
        assert!(record.hours_worked.is_none());
    }

    #[actix_web::test]
    async fn double_check_in_is_rejected_and_keeps_one_record() {
        let f = fixture();
        let user = employee("u1");
        f.service.check_in(&user, capture("a")).await.unwrap();

        let err = f.service.check_in(&user, capture("b")).await.unwrap_err();
        assert!(matches!(err, AppError::AlreadyCheckedIn));

        let all = f.store.list_user_attendance("u1", 100).await.unwrap();
        assert_eq!(all.len(), 1);
        assert_eq!(all[0].check_in_photo.as_deref(), Some("a"));
    }

    #[actix_web::test]
    async fn check_out_without_check_in_is_rejected() {
        let f = fixture();
        let err = f.service.check_out(&employee("u1"), capture("out")).await.unwrap_err();
        assert!(matches!(err, AppError::NotCheckedIn));
    }

    #[actix_web::test]
    async fn check_out_closes_record_with_hours() {
        let f = fixture();
        let user = employee("u1");
        f.service.check_in(&user, capture("in")).await.unwrap();

        f.clock.advance(Duration::hours(8) + Duration::minutes(20));
        let closed = f.service.check_out(&user, capture("out")).await.unwrap();

        assert_eq!(closed.status, AttendanceStatus::CheckedOut);
        assert_eq!(closed.check_out_time, Some(f.clock.now()));
        assert_eq!(closed.hours_worked, Some(dec!(8.33)));
        assert_eq!(closed.check_out_photo.as_deref(), Some("out"));
        assert!(closed.check_out_time >= closed.check_in_time);
    }

    #[actix_web::test]
    async fn checked_out_day_is_terminal() {
        let f = fixture();
        let user = employee("u1");
        f.service.check_in(&user, capture("in")).await.unwrap();
        f.clock.advance(Duration::hours(1));
        f.service.check_out(&user, capture("out")).await.unwrap();

        let again_out = f.service.check_out(&user, capture("out2")).await.unwrap_err();
        assert!(matches!(again_out, AppError::NotCheckedIn));

        let again_in = f.service.check_in(&user, capture("in2")).await.unwrap_err();
        assert!(matches!(again_in, AppError::AlreadyCheckedOut));
    }

    #[actix_web::test]
    async fn next_day_starts_a_new_record() {
        let f = fixture();
        let user = employee("u1");
        let first = f.service.check_in(&user, capture("in")).await.unwrap();

        f.clock.advance(Duration::days(1));
        assert!(f.service.today_record(&user).await.unwrap().is_none());

        // yesterday's open record is not closable today
        let err = f.service.check_out(&user, capture("out")).await.unwrap_err();
        assert!(matches!(err, AppError::NotCheckedIn));

        let second = f.service.check_in(&user, capture("in")).await.unwrap();
        assert_ne!(first.id, second.id);
        assert_eq!(second.date, first.date + Duration::days(1));
    }

    #[actix_web::test]
    async fn clock_skew_surfaces_invalid_interval() {
        let f = fixture();
        let user = employee("u1");
        f.service.check_in(&user, capture("in")).await.unwrap();

        f.clock.advance(-Duration::minutes(5));
        let err = f.service.check_out(&user, capture("out")).await.unwrap_err();
        assert!(matches!(err, AppError::InvalidInterval { .. }));

        // record stays open
        let today = f.service.today_record(&user).await.unwrap().unwrap();
        assert!(today.is_open());
    }

    #[actix_web::test]
    async fn today_record_is_a_pure_read_and_round_trips_payloads() {
        let f = fixture();
        let user = employee("u1");
        let photo = "data:image/jpeg;base64,/9j/4AAQSkZJRgABAQ==";
        let created = f.service.check_in(&user, capture(photo)).await.unwrap();

        let first = f.service.today_record(&user).await.unwrap();
        let second = f.service.today_record(&user).await.unwrap();
        assert_eq!(first, second);

        let read = first.unwrap();
        assert_eq!(read, created);
        assert_eq!(read.check_in_photo.as_deref(), Some(photo));
        assert_eq!(read.check_in_location, Some(capture(photo).location));
    }

    #[actix_web::test]
    async fn users_do_not_interfere() {
        let f = fixture();
        f.service.check_in(&employee("u1"), capture("a")).await.unwrap();
        f.service.check_in(&employee("u2"), capture("b")).await.unwrap();

        let err = f.service.check_out(&employee("u3"), capture("c")).await.unwrap_err();
        assert!(matches!(err, AppError::NotCheckedIn));
    }

    #[actix_web::test]
    async fn concurrent_check_ins_leave_one_open_record() {
        let f = fixture();
        let user = employee("u1");
        let (a, b) = futures::join!(
            f.service.check_in(&user, capture("a")),
            f.service.check_in(&user, capture("b")),
        );

        assert!(a.is_ok() ^ b.is_ok());
        let all = f.store.list_user_attendance("u1", 100).await.unwrap();
        assert_eq!(all.iter().filter(|r| r.is_open()).count(), 1);
    }

    #[actix_web::test]
    async fn capture_must_carry_photo_and_valid_location() {
        let f = fixture();
        let err = f.service.check_in(&employee("u1"), capture("  ")).await.unwrap_err();
        assert!(matches!(err, AppError::Validation(_)));

        let mut bad = capture("p");
        bad.location.lat = 120.0;
        let err = f.service.check_in(&employee("u1"), bad).await.unwrap_err();
        assert!(matches!(err, AppError::Validation(_)));
    }

    #[actix_web::test]
    async fn geofence_is_advisory_by_default() {
        let f = fixture();
        f.store.insert_location(&far_office()).await.unwrap();
        assert!(f.service.check_in(&employee("u1"), capture("p")).await.is_ok());
    }

    #[actix_web::test]
    async fn enforced_geofence_rejects_far_captures() {
        let f = fixture_with(AttendancePolicy { enforce_geofence: true });
        f.store.insert_location(&far_office()).await.unwrap();

        let err = f.service.check_in(&employee("u1"), capture("p")).await.unwrap_err();
        assert!(matches!(err, AppError::OutsideGeofence));
        assert!(f.service.today_record(&employee("u1")).await.unwrap().is_none());
    }

    #[actix_web::test]
    async fn admin_listing_joins_users_and_requires_admin() {
        let f = fixture();
        f.service.check_in(&employee("u1"), capture("p")).await.unwrap();

        let err = f.service.records_between(&employee("u1"), None, None).await.unwrap_err();
        assert!(matches!(err, AppError::AccessDenied));

        let admin = AuthContext { role: Role::Admin, ..employee("boss") };
        let rows = f.service.records_between(&admin, None, None).await.unwrap();
        assert_eq!(rows.len(), 1);
        // u1 has no user row in this fixture
        assert!(rows[0].user.is_none());
    }

    fn far_office() -> WorkLocation {
        WorkLocation {
            id: "hq".into(),
            name: "HQ".into(),
            address: "Elsewhere".into(),
            latitude: 0.0,
            longitude: 0.0,
            radius: 100.0,
            is_active: true,
            created_at: NaiveDate::from_ymd_opt(2025, 1, 1).unwrap().and_hms_opt(0, 0, 0).unwrap(),
        }
    }
}
