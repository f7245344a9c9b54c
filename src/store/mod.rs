//! Record Store: persistence behind one abstract capability.
//!
//! The core relies on two guarantees only: a single-record write is atomic,
//! and `(user_id, date)` identifies at most one attendance record. Both
//! backends enforce the latter on insert and report a violation as
//! [`StoreError::Conflict`].

use async_trait::async_trait;
use chrono::NaiveDate;
use thiserror::Error;

use crate::model::{
    attendance::{AttendanceRecord, CheckOutUpdate},
    invitation::EmployeeInvitation,
    password_reset::PasswordResetToken,
    user::User,
    work_location::WorkLocation,
};

pub mod memory;
pub mod mysql;

#[derive(Debug, Error)]
pub enum StoreError {
    /// A unique key was violated; carries the name of the key.
    #[error("duplicate {0}")]
    Conflict(&'static str),

    #[error("store unavailable: {0}")]
    Unavailable(String),

    #[error("corrupt row: {0}")]
    Corrupt(String),
}

pub type StoreResult<T> = Result<T, StoreError>;

#[async_trait]
pub trait AttendanceStore: Send + Sync {
    /// Inserts a new record; `Conflict("attendance record")` if the user
    /// already has one for `record.date`.
    async fn insert_attendance(&self, record: &AttendanceRecord) -> StoreResult<()>;

    /// Closes the record if it is still open. `None` when the record is
    /// missing or was closed concurrently.
    async fn close_attendance(&self, id: &str, update: CheckOutUpdate) -> StoreResult<Option<AttendanceRecord>>;

    async fn find_attendance(&self, id: &str) -> StoreResult<Option<AttendanceRecord>>;

    async fn find_attendance_on(&self, user_id: &str, date: NaiveDate) -> StoreResult<Option<AttendanceRecord>>;

    /// Latest records of one user, newest day first.
    async fn list_user_attendance(&self, user_id: &str, limit: u32) -> StoreResult<Vec<AttendanceRecord>>;

    /// Records with `from <= date <= to`, newest day first.
    async fn list_attendance_between(&self, from: NaiveDate, to: NaiveDate) -> StoreResult<Vec<AttendanceRecord>>;
}

#[async_trait]
pub trait UserStore: Send + Sync {
    async fn find_user(&self, id: &str) -> StoreResult<Option<User>>;

    /// Case-insensitive email lookup.
    async fn find_user_by_email(&self, email: &str) -> StoreResult<Option<User>>;

    /// `Conflict("user email")` when the email is taken.
    async fn insert_user(&self, user: &User) -> StoreResult<()>;

    /// Overwrites profile, role and active flag of the user with the same
    /// id, leaving the password hash alone; `false` if none.
    async fn update_user(&self, user: &User) -> StoreResult<bool>;

    /// `false` if the user is unknown.
    async fn set_password_hash(&self, user_id: &str, hash: &str) -> StoreResult<bool>;

    async fn list_users(&self) -> StoreResult<Vec<User>>;
}

#[async_trait]
pub trait InvitationStore: Send + Sync {
    /// `Conflict("invitation email")` when one exists for the email.
    async fn insert_invitation(&self, invitation: &EmployeeInvitation) -> StoreResult<()>;

    async fn find_invitation_by_email(&self, email: &str) -> StoreResult<Option<EmployeeInvitation>>;

    async fn list_invitations(&self) -> StoreResult<Vec<EmployeeInvitation>>;

    /// `true` only for the caller that actually removed it.
    async fn delete_invitation(&self, id: &str) -> StoreResult<bool>;
}

#[async_trait]
pub trait WorkLocationStore: Send + Sync {
    async fn list_active_locations(&self) -> StoreResult<Vec<WorkLocation>>;

    async fn insert_location(&self, location: &WorkLocation) -> StoreResult<()>;
}

#[async_trait]
pub trait ResetTokenStore: Send + Sync {
    async fn insert_reset_token(&self, token: &PasswordResetToken) -> StoreResult<()>;

    async fn find_reset_token(&self, token: &str) -> StoreResult<Option<PasswordResetToken>>;

    /// Flips `used` once; `false` if it was already used or is unknown.
    async fn mark_reset_token_used(&self, id: &str) -> StoreResult<bool>;
}

/// Everything the services need from persistence.
pub trait RecordStore: AttendanceStore + UserStore + InvitationStore + WorkLocationStore + ResetTokenStore {}

impl<T> RecordStore for T where T: AttendanceStore + UserStore + InvitationStore + WorkLocationStore + ResetTokenStore {}
