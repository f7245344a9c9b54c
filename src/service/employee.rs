use std::sync::Arc;

use chrono::NaiveDate;
use serde::Deserialize;
use utoipa::ToSchema;

use crate::{
    auth::auth::AuthContext,
    clock::Clock,
    error::AppError,
    model::{role::Role, user::User},
    store::{RecordStore, StoreError},
};

/// Admin edit of an employee; absent fields are left unchanged.
#[derive(Debug, Default, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct EmployeeUpdate {
    pub first_name: Option<String>,
    pub last_name: Option<String>,
    pub role: Option<Role>,
    pub department: Option<String>,
    pub position: Option<String>,
    pub phone: Option<String>,
    #[schema(format = "date", value_type = Option<String>)]
    pub hire_date: Option<NaiveDate>,
    pub is_active: Option<bool>,
}

/// Fields a user may change on their own profile.
#[derive(Debug, Default, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct ProfileUpdate {
    pub first_name: Option<String>,
    pub last_name: Option<String>,
    pub phone: Option<String>,
}

pub struct EmployeeService {
    store: Arc<dyn RecordStore>,
    clock: Arc<dyn Clock>,
}

impl EmployeeService {
    pub fn new(store: Arc<dyn RecordStore>, clock: Arc<dyn Clock>) -> Self {
        Self { store, clock }
    }

    async fn load(&self, id: &str) -> Result<User, AppError> {
        self.store.find_user(id).await?.ok_or(AppError::NotFound("User"))
    }

    async fn save(&self, mut user: User) -> Result<User, AppError> {
        user.updated_at = self.clock.now();
        if !self.store.update_user(&user).await? {
            return Err(AppError::NotFound("User"));
        }
        Ok(user)
    }

    /// Re-reads the holder of a verified token so deactivation and role
    /// changes apply to tokens already issued. While the store is
    /// unreachable the token's own identity is used.
    pub async fn current_identity(&self, claimed: AuthContext) -> Result<AuthContext, AppError> {
        match self.store.find_user(&claimed.user_id).await {
            Ok(Some(user)) if user.is_active => Ok(AuthContext { user_id: user.id, email: user.email, role: user.role }),
            Ok(Some(_)) => Err(AppError::Unauthorized("Account is deactivated".into())),
            Ok(None) => Err(AppError::Unauthorized("Account no longer exists".into())),
            Err(StoreError::Unavailable(detail)) => {
                tracing::warn!(user_id = %claimed.user_id, error = %detail, "Store unavailable, trusting token claims");
                Ok(claimed)
            }
            Err(e) => Err(e.into()),
        }
    }

    pub async fn list(&self, ctx: &AuthContext) -> Result<Vec<User>, AppError> {
        ctx.require_admin()?;
        Ok(self.store.list_users().await?)
    }

    pub async fn update(&self, ctx: &AuthContext, id: &str, patch: EmployeeUpdate) -> Result<User, AppError> {
        ctx.require_admin()?;

        if ctx.user_id == id && (patch.is_active == Some(false) || patch.role == Some(Role::Employee)) {
            return Err(AppError::validation("admins cannot deactivate or demote themselves"));
        }

        let mut user = self.load(id).await?;
        if let Some(v) = patch.first_name {
            user.first_name = Some(v);
        }
        if let Some(v) = patch.last_name {
            user.last_name = Some(v);
        }
        if let Some(v) = patch.role {
            user.role = v;
        }
        if let Some(v) = patch.department {
            user.department = Some(v);
        }
        if let Some(v) = patch.position {
            user.position = Some(v);
        }
        if let Some(v) = patch.phone {
            user.phone = Some(v);
        }
        if let Some(v) = patch.hire_date {
            user.hire_date = Some(v);
        }
        if let Some(v) = patch.is_active {
            user.is_active = v;
        }

        let user = self.save(user).await?;
        tracing::info!(user_id = %user.id, updated_by = %ctx.user_id, role = %user.role, active = user.is_active, "Employee updated");
        Ok(user)
    }

    pub async fn profile(&self, ctx: &AuthContext) -> Result<User, AppError> {
        self.load(&ctx.user_id).await
    }

    pub async fn update_profile(&self, ctx: &AuthContext, patch: ProfileUpdate) -> Result<User, AppError> {
        let mut user = self.load(&ctx.user_id).await?;
        if let Some(v) = patch.first_name {
            user.first_name = Some(v);
        }
        if let Some(v) = patch.last_name {
            user.last_name = Some(v);
        }
        if let Some(v) = patch.phone {
            user.phone = Some(v);
        }
        self.save(user).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{clock::FixedClock, store::{UserStore, memory::MemoryStore}};

    fn user(id: &str, role: Role) -> User {
        let t = NaiveDate::from_ymd_opt(2025, 1, 1).unwrap().and_hms_opt(0, 0, 0).unwrap();
        User {
            id: id.into(),
            email: format!("{}@company.com", id),
            first_name: None,
            last_name: None,
            role,
            department: None,
            position: None,
            phone: None,
            hire_date: None,
            is_active: true,
            password_hash: Some("hash".into()),
            created_at: t,
            updated_at: t,
        }
    }

    fn ctx(id: &str, role: Role) -> AuthContext {
        AuthContext { user_id: id.into(), email: format!("{}@company.com", id), role }
    }

    async fn service() -> (Arc<MemoryStore>, EmployeeService) {
        let store = Arc::new(MemoryStore::new());
        store.insert_user(&user("admin", Role::Admin)).await.unwrap();
        store.insert_user(&user("emp", Role::Employee)).await.unwrap();
        let clock = Arc::new(FixedClock::at(2025, 6, 2, 10, 0, 0));
        (store.clone(), EmployeeService::new(store, clock))
    }

    #[actix_web::test]
    async fn admin_can_move_and_deactivate_employee() {
        let (store, service) = service().await;
        let patch = EmployeeUpdate {
            department: Some("Operations".into()),
            is_active: Some(false),
            ..Default::default()
        };

        let updated = service.update(&ctx("admin", Role::Admin), "emp", patch).await.unwrap();
        assert_eq!(updated.department.as_deref(), Some("Operations"));
        assert!(!updated.is_active);

        let stored = store.find_user("emp").await.unwrap().unwrap();
        assert!(!stored.is_active);
        assert_eq!(stored.password_hash.as_deref(), Some("hash"));
    }

    #[actix_web::test]
    async fn employee_cannot_edit_roster() {
        let (_, service) = service().await;
        let err = service
            .update(&ctx("emp", Role::Employee), "emp", EmployeeUpdate::default())
            .await
            .unwrap_err();
        assert!(matches!(err, AppError::AccessDenied));
        assert!(matches!(service.list(&ctx("emp", Role::Employee)).await, Err(AppError::AccessDenied)));
    }

    #[actix_web::test]
    async fn admin_cannot_lock_themselves_out() {
        let (_, service) = service().await;
        let patch = EmployeeUpdate { is_active: Some(false), ..Default::default() };
        assert!(matches!(
            service.update(&ctx("admin", Role::Admin), "admin", patch).await,
            Err(AppError::Validation(_))
        ));
    }

    #[actix_web::test]
    async fn unknown_employee_is_not_found() {
        let (_, service) = service().await;
        assert!(matches!(
            service.update(&ctx("admin", Role::Admin), "ghost", EmployeeUpdate::default()).await,
            Err(AppError::NotFound(_))
        ));
    }

    #[actix_web::test]
    async fn identity_follows_the_stored_account() {
        let (store, service) = service().await;
        let admin = ctx("admin", Role::Admin);

        // promoted after the token was issued
        let patch = EmployeeUpdate { role: Some(Role::Admin), ..Default::default() };
        service.update(&admin, "emp", patch).await.unwrap();
        let current = service.current_identity(ctx("emp", Role::Employee)).await.unwrap();
        assert_eq!(current.role, Role::Admin);

        let patch = EmployeeUpdate { is_active: Some(false), ..Default::default() };
        service.update(&admin, "emp", patch).await.unwrap();
        assert!(matches!(
            service.current_identity(ctx("emp", Role::Admin)).await,
            Err(AppError::Unauthorized(_))
        ));
        assert!(matches!(
            service.current_identity(ctx("ghost", Role::Employee)).await,
            Err(AppError::Unauthorized(_))
        ));

        store.set_offline(true);
        let claimed = ctx("emp", Role::Employee);
        assert_eq!(service.current_identity(claimed.clone()).await.unwrap(), claimed);
    }

    #[actix_web::test]
    async fn profile_update_touches_only_personal_fields() {
        let (_, service) = service().await;
        let patch = ProfileUpdate { phone: Some("+880 1700 000000".into()), ..Default::default() };

        let me = service.update_profile(&ctx("emp", Role::Employee), patch).await.unwrap();
        assert_eq!(me.phone.as_deref(), Some("+880 1700 000000"));
        assert_eq!(me.role, Role::Employee);
        assert_eq!(me.updated_at, NaiveDate::from_ymd_opt(2025, 6, 2).unwrap().and_hms_opt(10, 0, 0).unwrap());
    }
}
