//! In-process backend. Every operation runs under one lock, which makes the
//! check-then-insert on `(user_id, date)` atomic.

use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Mutex, MutexGuard};

use async_trait::async_trait;
use chrono::NaiveDate;

use super::{
    AttendanceStore, InvitationStore, ResetTokenStore, StoreError, StoreResult, UserStore, WorkLocationStore,
};
use crate::model::{
    attendance::{AttendanceRecord, CheckOutUpdate},
    invitation::EmployeeInvitation,
    password_reset::PasswordResetToken,
    user::User,
    work_location::WorkLocation,
};

#[derive(Default)]
struct Tables {
    users: HashMap<String, User>,
    attendance: HashMap<String, AttendanceRecord>,
    invitations: HashMap<String, EmployeeInvitation>,
    locations: Vec<WorkLocation>,
    reset_tokens: HashMap<String, PasswordResetToken>,
}

#[derive(Default)]
pub struct MemoryStore {
    tables: Mutex<Tables>,
    offline: AtomicBool,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Makes every call fail with `Unavailable`, to exercise degraded paths.
    #[cfg(test)]
    pub fn set_offline(&self, offline: bool) {
        self.offline.store(offline, Ordering::SeqCst);
    }

    fn tables(&self) -> StoreResult<MutexGuard<'_, Tables>> {
        if self.offline.load(Ordering::SeqCst) {
            return Err(StoreError::Unavailable("memory store offline".into()));
        }
        self.tables
            .lock()
            .map_err(|_| StoreError::Unavailable("memory store lock poisoned".into()))
    }
}

fn newest_first(records: &mut [AttendanceRecord]) {
    records.sort_by(|a, b| b.date.cmp(&a.date).then(b.created_at.cmp(&a.created_at)));
}

#[async_trait]
impl AttendanceStore for MemoryStore {
    async fn insert_attendance(&self, record: &AttendanceRecord) -> StoreResult<()> {
        let mut tables = self.tables()?;
        let taken = tables
            .attendance
            .values()
            .any(|r| r.user_id == record.user_id && r.date == record.date);
        if taken || tables.attendance.contains_key(&record.id) {
            return Err(StoreError::Conflict("attendance record"));
        }
        tables.attendance.insert(record.id.clone(), record.clone());
        Ok(())
    }

    async fn close_attendance(&self, id: &str, update: CheckOutUpdate) -> StoreResult<Option<AttendanceRecord>> {
        let mut tables = self.tables()?;
        match tables.attendance.get_mut(id) {
            Some(record) if record.is_open() => {
                update.apply(record);
                Ok(Some(record.clone()))
            }
            _ => Ok(None),
        }
    }

    async fn find_attendance(&self, id: &str) -> StoreResult<Option<AttendanceRecord>> {
        Ok(self.tables()?.attendance.get(id).cloned())
    }

    async fn find_attendance_on(&self, user_id: &str, date: NaiveDate) -> StoreResult<Option<AttendanceRecord>> {
        Ok(self
            .tables()?
            .attendance
            .values()
            .find(|r| r.user_id == user_id && r.date == date)
            .cloned())
    }

    async fn list_user_attendance(&self, user_id: &str, limit: u32) -> StoreResult<Vec<AttendanceRecord>> {
        let mut records: Vec<_> = self
            .tables()?
            .attendance
            .values()
            .filter(|r| r.user_id == user_id)
            .cloned()
            .collect();
        newest_first(&mut records);
        records.truncate(limit as usize);
        Ok(records)
    }

    async fn list_attendance_between(&self, from: NaiveDate, to: NaiveDate) -> StoreResult<Vec<AttendanceRecord>> {
        let mut records: Vec<_> = self
            .tables()?
            .attendance
            .values()
            .filter(|r| r.date >= from && r.date <= to)
            .cloned()
            .collect();
        newest_first(&mut records);
        Ok(records)
    }
}

#[async_trait]
impl UserStore for MemoryStore {
    async fn find_user(&self, id: &str) -> StoreResult<Option<User>> {
        Ok(self.tables()?.users.get(id).cloned())
    }

    async fn find_user_by_email(&self, email: &str) -> StoreResult<Option<User>> {
        Ok(self
            .tables()?
            .users
            .values()
            .find(|u| u.email.eq_ignore_ascii_case(email))
            .cloned())
    }

    async fn insert_user(&self, user: &User) -> StoreResult<()> {
        let mut tables = self.tables()?;
        if tables.users.values().any(|u| u.email.eq_ignore_ascii_case(&user.email)) {
            return Err(StoreError::Conflict("user email"));
        }
        tables.users.insert(user.id.clone(), user.clone());
        Ok(())
    }

    async fn update_user(&self, user: &User) -> StoreResult<bool> {
        let mut tables = self.tables()?;
        let Some(stored) = tables.users.get_mut(&user.id) else {
            return Ok(false);
        };
        let password_hash = stored.password_hash.take();
        *stored = User {
            password_hash,
            ..user.clone()
        };
        Ok(true)
    }

    async fn set_password_hash(&self, user_id: &str, hash: &str) -> StoreResult<bool> {
        let mut tables = self.tables()?;
        Ok(match tables.users.get_mut(user_id) {
            Some(user) => {
                user.password_hash = Some(hash.to_string());
                true
            }
            None => false,
        })
    }

    async fn list_users(&self) -> StoreResult<Vec<User>> {
        let mut users: Vec<_> = self.tables()?.users.values().cloned().collect();
        users.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        Ok(users)
    }
}

#[async_trait]
impl InvitationStore for MemoryStore {
    async fn insert_invitation(&self, invitation: &EmployeeInvitation) -> StoreResult<()> {
        let mut tables = self.tables()?;
        if tables
            .invitations
            .values()
            .any(|i| i.email.eq_ignore_ascii_case(&invitation.email))
        {
            return Err(StoreError::Conflict("invitation email"));
        }
        tables.invitations.insert(invitation.id.clone(), invitation.clone());
        Ok(())
    }

    async fn find_invitation_by_email(&self, email: &str) -> StoreResult<Option<EmployeeInvitation>> {
        Ok(self
            .tables()?
            .invitations
            .values()
            .find(|i| i.email.eq_ignore_ascii_case(email))
            .cloned())
    }

    async fn list_invitations(&self) -> StoreResult<Vec<EmployeeInvitation>> {
        let mut invitations: Vec<_> = self.tables()?.invitations.values().cloned().collect();
        invitations.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        Ok(invitations)
    }

    async fn delete_invitation(&self, id: &str) -> StoreResult<bool> {
        Ok(self.tables()?.invitations.remove(id).is_some())
    }
}

#[async_trait]
impl WorkLocationStore for MemoryStore {
    async fn list_active_locations(&self) -> StoreResult<Vec<WorkLocation>> {
        Ok(self
            .tables()?
            .locations
            .iter()
            .filter(|l| l.is_active)
            .cloned()
            .collect())
    }

    async fn insert_location(&self, location: &WorkLocation) -> StoreResult<()> {
        self.tables()?.locations.push(location.clone());
        Ok(())
    }
}

#[async_trait]
impl ResetTokenStore for MemoryStore {
    async fn insert_reset_token(&self, token: &PasswordResetToken) -> StoreResult<()> {
        let mut tables = self.tables()?;
        if tables.reset_tokens.values().any(|t| t.token == token.token) {
            return Err(StoreError::Conflict("reset token"));
        }
        tables.reset_tokens.insert(token.id.clone(), token.clone());
        Ok(())
    }

    async fn find_reset_token(&self, token: &str) -> StoreResult<Option<PasswordResetToken>> {
        Ok(self
            .tables()?
            .reset_tokens
            .values()
            .find(|t| t.token == token)
            .cloned())
    }

    async fn mark_reset_token_used(&self, id: &str) -> StoreResult<bool> {
        let mut tables = self.tables()?;
        Ok(match tables.reset_tokens.get_mut(id) {
            Some(token) if !token.used => {
                token.used = true;
                true
            }
            _ => false,
        })
    }
}
