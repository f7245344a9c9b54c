use std::str::FromStr;

use async_trait::async_trait;
use chrono::{NaiveDate, NaiveDateTime};
use rust_decimal::Decimal;
use sqlx::{FromRow, MySqlPool, types::Json};

use super::{
    AttendanceStore, InvitationStore, ResetTokenStore, StoreError, StoreResult, UserStore, WorkLocationStore,
};
use crate::model::{
    attendance::{AttendanceRecord, AttendanceStatus, CheckOutUpdate, GeoPoint},
    invitation::EmployeeInvitation,
    password_reset::PasswordResetToken,
    role::Role,
    user::User,
    work_location::WorkLocation,
};

/// MySQL duplicate-key SQLSTATE
const DUPLICATE_KEY: &str = "23000";

pub struct MySqlStore {
    pool: MySqlPool,
}

impl MySqlStore {
    pub fn new(pool: MySqlPool) -> Self {
        Self { pool }
    }
}

fn map_err(e: sqlx::Error, key: &'static str) -> StoreError {
    if let sqlx::Error::Database(db_err) = &e {
        if db_err.code().as_deref() == Some(DUPLICATE_KEY) {
            return StoreError::Conflict(key);
        }
    }
    match &e {
        sqlx::Error::ColumnDecode { .. } | sqlx::Error::Decode(_) | sqlx::Error::ColumnNotFound(_) => {
            StoreError::Corrupt(e.to_string())
        }
        _ => StoreError::Unavailable(e.to_string()),
    }
}

impl From<sqlx::Error> for StoreError {
    fn from(e: sqlx::Error) -> Self {
        map_err(e, "row")
    }
}

fn parse<T: FromStr>(value: &str, column: &str) -> StoreResult<T> {
    value
        .parse()
        .map_err(|_| StoreError::Corrupt(format!("unexpected {} value '{}'", column, value)))
}

// ---------- attendance ----------

const ATTENDANCE_COLUMNS: &str = r#"
    id, user_id, check_in_time, check_out_time, check_in_location, check_out_location,
    check_in_photo, check_out_photo, status, hours_worked, date, created_at, updated_at
"#;

#[derive(FromRow)]
struct AttendanceRow {
    id: String,
    user_id: String,
    check_in_time: Option<NaiveDateTime>,
    check_out_time: Option<NaiveDateTime>,
    check_in_location: Option<Json<GeoPoint>>,
    check_out_location: Option<Json<GeoPoint>>,
    check_in_photo: Option<String>,
    check_out_photo: Option<String>,
    status: String,
    hours_worked: Option<Decimal>,
    date: NaiveDate,
    created_at: NaiveDateTime,
    updated_at: NaiveDateTime,
}

impl TryFrom<AttendanceRow> for AttendanceRecord {
    type Error = StoreError;

    fn try_from(row: AttendanceRow) -> StoreResult<Self> {
        Ok(AttendanceRecord {
            status: parse::<AttendanceStatus>(&row.status, "status")?,
            id: row.id,
            user_id: row.user_id,
            check_in_time: row.check_in_time,
            check_out_time: row.check_out_time,
            check_in_location: row.check_in_location.map(|j| j.0),
            check_out_location: row.check_out_location.map(|j| j.0),
            check_in_photo: row.check_in_photo,
            check_out_photo: row.check_out_photo,
            hours_worked: row.hours_worked,
            date: row.date,
            created_at: row.created_at,
            updated_at: row.updated_at,
        })
    }
}

fn into_records(rows: Vec<AttendanceRow>) -> StoreResult<Vec<AttendanceRecord>> {
    rows.into_iter().map(AttendanceRecord::try_from).collect()
}

#[async_trait]
impl AttendanceStore for MySqlStore {
    async fn insert_attendance(&self, record: &AttendanceRecord) -> StoreResult<()> {
        sqlx::query(
            r#"
            INSERT INTO attendance_records
                (id, user_id, check_in_time, check_out_time, check_in_location, check_out_location,
                 check_in_photo, check_out_photo, status, hours_worked, date, created_at, updated_at)
            VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?)
            "#,
        )
        .bind(&record.id)
        .bind(&record.user_id)
        .bind(record.check_in_time)
        .bind(record.check_out_time)
        .bind(record.check_in_location.clone().map(Json))
        .bind(record.check_out_location.clone().map(Json))
        .bind(&record.check_in_photo)
        .bind(&record.check_out_photo)
        .bind(record.status.as_ref())
        .bind(record.hours_worked)
        .bind(record.date)
        .bind(record.created_at)
        .bind(record.updated_at)
        .execute(&self.pool)
        .await
        .map_err(|e| map_err(e, "attendance record"))?;

        Ok(())
    }

    async fn close_attendance(&self, id: &str, update: CheckOutUpdate) -> StoreResult<Option<AttendanceRecord>> {
        let mut tx = self.pool.begin().await?;

        // conditional update: only an open record may be closed
        let result = sqlx::query(
            r#"
            UPDATE attendance_records
            SET check_out_time = ?, check_out_location = ?, check_out_photo = ?,
                hours_worked = ?, status = ?, updated_at = ?
            WHERE id = ?
            AND status = ?
            "#,
        )
        .bind(update.check_out_time)
        .bind(Json(update.location.clone()))
        .bind(&update.photo)
        .bind(update.hours_worked)
        .bind(AttendanceStatus::CheckedOut.as_ref())
        .bind(update.check_out_time)
        .bind(id)
        .bind(AttendanceStatus::CheckedIn.as_ref())
        .execute(&mut *tx)
        .await?;

        if result.rows_affected() == 0 {
            tx.rollback().await?;
            return Ok(None);
        }

        let row = sqlx::query_as::<_, AttendanceRow>(&format!(
            "SELECT {} FROM attendance_records WHERE id = ?",
            ATTENDANCE_COLUMNS
        ))
        .bind(id)
        .fetch_one(&mut *tx)
        .await?;

        tx.commit().await?;
        AttendanceRecord::try_from(row).map(Some)
    }

    async fn find_attendance(&self, id: &str) -> StoreResult<Option<AttendanceRecord>> {
        sqlx::query_as::<_, AttendanceRow>(&format!(
            "SELECT {} FROM attendance_records WHERE id = ?",
            ATTENDANCE_COLUMNS
        ))
        .bind(id)
        .fetch_optional(&self.pool)
        .await?
        .map(AttendanceRecord::try_from)
        .transpose()
    }

    async fn find_attendance_on(&self, user_id: &str, date: NaiveDate) -> StoreResult<Option<AttendanceRecord>> {
        sqlx::query_as::<_, AttendanceRow>(&format!(
            "SELECT {} FROM attendance_records WHERE user_id = ? AND date = ?",
            ATTENDANCE_COLUMNS
        ))
        .bind(user_id)
        .bind(date)
        .fetch_optional(&self.pool)
        .await?
        .map(AttendanceRecord::try_from)
        .transpose()
    }

    async fn list_user_attendance(&self, user_id: &str, limit: u32) -> StoreResult<Vec<AttendanceRecord>> {
        let rows = sqlx::query_as::<_, AttendanceRow>(&format!(
            "SELECT {} FROM attendance_records WHERE user_id = ? ORDER BY date DESC, created_at DESC LIMIT ?",
            ATTENDANCE_COLUMNS
        ))
        .bind(user_id)
        .bind(limit)
        .fetch_all(&self.pool)
        .await?;

        into_records(rows)
    }

    async fn list_attendance_between(&self, from: NaiveDate, to: NaiveDate) -> StoreResult<Vec<AttendanceRecord>> {
        let rows = sqlx::query_as::<_, AttendanceRow>(&format!(
            "SELECT {} FROM attendance_records WHERE date BETWEEN ? AND ? ORDER BY date DESC, created_at DESC",
            ATTENDANCE_COLUMNS
        ))
        .bind(from)
        .bind(to)
        .fetch_all(&self.pool)
        .await?;

        into_records(rows)
    }
}

// ---------- users ----------

const USER_COLUMNS: &str = r#"
    id, email, first_name, last_name, role, department, position, phone,
    hire_date, is_active, password_hash, created_at, updated_at
"#;

#[derive(FromRow)]
struct UserRow {
    id: String,
    email: String,
    first_name: Option<String>,
    last_name: Option<String>,
    role: String,
    department: Option<String>,
    position: Option<String>,
    phone: Option<String>,
    hire_date: Option<NaiveDate>,
    is_active: bool,
    password_hash: Option<String>,
    created_at: NaiveDateTime,
    updated_at: NaiveDateTime,
}

impl TryFrom<UserRow> for User {
    type Error = StoreError;

    fn try_from(row: UserRow) -> StoreResult<Self> {
        Ok(User {
            role: parse::<Role>(&row.role, "role")?,
            id: row.id,
            email: row.email,
            first_name: row.first_name,
            last_name: row.last_name,
            department: row.department,
            position: row.position,
            phone: row.phone,
            hire_date: row.hire_date,
            is_active: row.is_active,
            password_hash: row.password_hash,
            created_at: row.created_at,
            updated_at: row.updated_at,
        })
    }
}

#[async_trait]
impl UserStore for MySqlStore {
    async fn find_user(&self, id: &str) -> StoreResult<Option<User>> {
        sqlx::query_as::<_, UserRow>(&format!("SELECT {} FROM users WHERE id = ?", USER_COLUMNS))
            .bind(id)
            .fetch_optional(&self.pool)
            .await?
            .map(User::try_from)
            .transpose()
    }

    async fn find_user_by_email(&self, email: &str) -> StoreResult<Option<User>> {
        sqlx::query_as::<_, UserRow>(&format!(
            "SELECT {} FROM users WHERE LOWER(email) = LOWER(?)",
            USER_COLUMNS
        ))
        .bind(email)
        .fetch_optional(&self.pool)
        .await?
        .map(User::try_from)
        .transpose()
    }

    async fn insert_user(&self, user: &User) -> StoreResult<()> {
        sqlx::query(
            r#"
            INSERT INTO users
                (id, email, first_name, last_name, role, department, position, phone,
                 hire_date, is_active, password_hash, created_at, updated_at)
            VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?)
            "#,
        )
        .bind(&user.id)
        .bind(&user.email)
        .bind(&user.first_name)
        .bind(&user.last_name)
        .bind(user.role.as_ref())
        .bind(&user.department)
        .bind(&user.position)
        .bind(&user.phone)
        .bind(user.hire_date)
        .bind(user.is_active)
        .bind(&user.password_hash)
        .bind(user.created_at)
        .bind(user.updated_at)
        .execute(&self.pool)
        .await
        .map_err(|e| map_err(e, "user email"))?;

        Ok(())
    }

    async fn update_user(&self, user: &User) -> StoreResult<bool> {
        let result = sqlx::query(
            r#"
            UPDATE users
            SET email = ?, first_name = ?, last_name = ?, role = ?, department = ?,
                position = ?, phone = ?, hire_date = ?, is_active = ?, updated_at = ?
            WHERE id = ?
            "#,
        )
        .bind(&user.email)
        .bind(&user.first_name)
        .bind(&user.last_name)
        .bind(user.role.as_ref())
        .bind(&user.department)
        .bind(&user.position)
        .bind(&user.phone)
        .bind(user.hire_date)
        .bind(user.is_active)
        .bind(user.updated_at)
        .bind(&user.id)
        .execute(&self.pool)
        .await
        .map_err(|e| map_err(e, "user email"))?;

        Ok(result.rows_affected() > 0)
    }

    async fn set_password_hash(&self, user_id: &str, hash: &str) -> StoreResult<bool> {
        let result = sqlx::query("UPDATE users SET password_hash = ? WHERE id = ?")
            .bind(hash)
            .bind(user_id)
            .execute(&self.pool)
            .await?;

        Ok(result.rows_affected() > 0)
    }

    async fn list_users(&self) -> StoreResult<Vec<User>> {
        let rows = sqlx::query_as::<_, UserRow>(&format!(
            "SELECT {} FROM users ORDER BY created_at DESC",
            USER_COLUMNS
        ))
        .fetch_all(&self.pool)
        .await?;

        rows.into_iter().map(User::try_from).collect()
    }
}

// ---------- invitations ----------

#[derive(FromRow)]
struct InvitationRow {
    id: String,
    email: String,
    first_name: String,
    last_name: String,
    role: String,
    department: Option<String>,
    position: Option<String>,
    phone: Option<String>,
    hire_date: Option<NaiveDate>,
    invited_by: Option<String>,
    created_at: NaiveDateTime,
    expires_at: NaiveDateTime,
}

impl TryFrom<InvitationRow> for EmployeeInvitation {
    type Error = StoreError;

    fn try_from(row: InvitationRow) -> StoreResult<Self> {
        Ok(EmployeeInvitation {
            role: parse::<Role>(&row.role, "role")?,
            id: row.id,
            email: row.email,
            first_name: row.first_name,
            last_name: row.last_name,
            department: row.department,
            position: row.position,
            phone: row.phone,
            hire_date: row.hire_date,
            invited_by: row.invited_by,
            created_at: row.created_at,
            expires_at: row.expires_at,
        })
    }
}

const INVITATION_COLUMNS: &str = r#"
    id, email, first_name, last_name, role, department, position, phone,
    hire_date, invited_by, created_at, expires_at
"#;

#[async_trait]
impl InvitationStore for MySqlStore {
    async fn insert_invitation(&self, invitation: &EmployeeInvitation) -> StoreResult<()> {
        sqlx::query(
            r#"
            INSERT INTO employee_invitations
                (id, email, first_name, last_name, role, department, position, phone,
                 hire_date, invited_by, created_at, expires_at)
            VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?)
            "#,
        )
        .bind(&invitation.id)
        .bind(&invitation.email)
        .bind(&invitation.first_name)
        .bind(&invitation.last_name)
        .bind(invitation.role.as_ref())
        .bind(&invitation.department)
        .bind(&invitation.position)
        .bind(&invitation.phone)
        .bind(invitation.hire_date)
        .bind(&invitation.invited_by)
        .bind(invitation.created_at)
        .bind(invitation.expires_at)
        .execute(&self.pool)
        .await
        .map_err(|e| map_err(e, "invitation email"))?;

        Ok(())
    }

    async fn find_invitation_by_email(&self, email: &str) -> StoreResult<Option<EmployeeInvitation>> {
        sqlx::query_as::<_, InvitationRow>(&format!(
            "SELECT {} FROM employee_invitations WHERE LOWER(email) = LOWER(?)",
            INVITATION_COLUMNS
        ))
        .bind(email)
        .fetch_optional(&self.pool)
        .await?
        .map(EmployeeInvitation::try_from)
        .transpose()
    }

    async fn list_invitations(&self) -> StoreResult<Vec<EmployeeInvitation>> {
        let rows = sqlx::query_as::<_, InvitationRow>(&format!(
            "SELECT {} FROM employee_invitations ORDER BY created_at DESC",
            INVITATION_COLUMNS
        ))
        .fetch_all(&self.pool)
        .await?;

        rows.into_iter().map(EmployeeInvitation::try_from).collect()
    }

    async fn delete_invitation(&self, id: &str) -> StoreResult<bool> {
        let result = sqlx::query("DELETE FROM employee_invitations WHERE id = ?")
            .bind(id)
            .execute(&self.pool)
            .await?;

        Ok(result.rows_affected() == 1)
    }
}

// ---------- work locations ----------

#[derive(FromRow)]
struct WorkLocationRow {
    id: String,
    name: String,
    address: String,
    latitude: f64,
    longitude: f64,
    radius: f64,
    is_active: bool,
    created_at: NaiveDateTime,
}

impl From<WorkLocationRow> for WorkLocation {
    fn from(row: WorkLocationRow) -> Self {
        WorkLocation {
            id: row.id,
            name: row.name,
            address: row.address,
            latitude: row.latitude,
            longitude: row.longitude,
            radius: row.radius,
            is_active: row.is_active,
            created_at: row.created_at,
        }
    }
}

#[async_trait]
impl WorkLocationStore for MySqlStore {
    async fn list_active_locations(&self) -> StoreResult<Vec<WorkLocation>> {
        let rows = sqlx::query_as::<_, WorkLocationRow>(
            r#"
            SELECT id, name, address, latitude, longitude, radius, is_active, created_at
            FROM work_locations
            WHERE is_active = TRUE
            ORDER BY name
            "#,
        )
        .fetch_all(&self.pool)
        .await?;

        Ok(rows.into_iter().map(WorkLocation::from).collect())
    }

    async fn insert_location(&self, location: &WorkLocation) -> StoreResult<()> {
        sqlx::query(
            r#"
            INSERT INTO work_locations
                (id, name, address, latitude, longitude, radius, is_active, created_at)
            VALUES (?, ?, ?, ?, ?, ?, ?, ?)
            "#,
        )
        .bind(&location.id)
        .bind(&location.name)
        .bind(&location.address)
        .bind(location.latitude)
        .bind(location.longitude)
        .bind(location.radius)
        .bind(location.is_active)
        .bind(location.created_at)
        .execute(&self.pool)
        .await
        .map_err(|e| map_err(e, "work location"))?;

        Ok(())
    }
}

// ---------- password reset tokens ----------

#[derive(FromRow)]
struct ResetTokenRow {
    id: String,
    user_id: String,
    token: String,
    expires_at: NaiveDateTime,
    used: bool,
    created_at: NaiveDateTime,
}

impl From<ResetTokenRow> for PasswordResetToken {
    fn from(row: ResetTokenRow) -> Self {
        PasswordResetToken {
            id: row.id,
            user_id: row.user_id,
            token: row.token,
            expires_at: row.expires_at,
            used: row.used,
            created_at: row.created_at,
        }
    }
}

#[async_trait]
impl ResetTokenStore for MySqlStore {
    async fn insert_reset_token(&self, token: &PasswordResetToken) -> StoreResult<()> {
        sqlx::query(
            r#"
            INSERT INTO password_reset_tokens (id, user_id, token, expires_at, used, created_at)
            VALUES (?, ?, ?, ?, ?, ?)
            "#,
        )
        .bind(&token.id)
        .bind(&token.user_id)
        .bind(&token.token)
        .bind(token.expires_at)
        .bind(token.used)
        .bind(token.created_at)
        .execute(&self.pool)
        .await
        .map_err(|e| map_err(e, "reset token"))?;

        Ok(())
    }

    async fn find_reset_token(&self, token: &str) -> StoreResult<Option<PasswordResetToken>> {
        let row = sqlx::query_as::<_, ResetTokenRow>(
            r#"
            SELECT id, user_id, token, expires_at, used, created_at
            FROM password_reset_tokens
            WHERE token = ?
            "#,
        )
        .bind(token)
        .fetch_optional(&self.pool)
        .await?;

        Ok(row.map(PasswordResetToken::from))
    }

    async fn mark_reset_token_used(&self, id: &str) -> StoreResult<bool> {
        let result = sqlx::query("UPDATE password_reset_tokens SET used = TRUE WHERE id = ? AND used = FALSE")
            .bind(id)
            .execute(&self.pool)
            .await?;

        Ok(result.rows_affected() == 1)
    }
}
