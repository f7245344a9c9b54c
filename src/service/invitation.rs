use std::sync::Arc;

use chrono::{Duration, NaiveDate};
use serde::Deserialize;
use utoipa::ToSchema;
use uuid::Uuid;
use validator::Validate;

use crate::{
    auth::auth::AuthContext,
    clock::Clock,
    error::AppError,
    model::{invitation::EmployeeInvitation, role::Role},
    store::{RecordStore, StoreError},
};

#[derive(Debug, Deserialize, ToSchema, Validate)]
#[serde(rename_all = "camelCase")]
pub struct NewInvitation {
    #[schema(example = "new.hire@company.com")]
    #[validate(email(message = "a valid email is required"))]
    pub email: String,
    #[validate(length(min = 1, message = "first and last name are required"))]
    pub first_name: String,
    #[validate(length(min = 1, message = "first and last name are required"))]
    pub last_name: String,
    #[serde(default)]
    pub role: Role,
    pub department: Option<String>,
    pub position: Option<String>,
    pub phone: Option<String>,
    #[schema(example = "2026-01-01", format = "date", value_type = Option<String>)]
    pub hire_date: Option<NaiveDate>,
}

pub(crate) fn normalize_email(email: &str) -> String {
    email.trim().to_lowercase()
}

impl NewInvitation {
    fn normalized(self) -> Self {
        Self {
            email: normalize_email(&self.email),
            first_name: self.first_name.trim().to_string(),
            last_name: self.last_name.trim().to_string(),
            ..self
        }
    }
}

pub struct InvitationService {
    store: Arc<dyn RecordStore>,
    clock: Arc<dyn Clock>,
    ttl: Duration,
}

impl InvitationService {
    pub fn new(store: Arc<dyn RecordStore>, clock: Arc<dyn Clock>, ttl_days: i64) -> Self {
        Self { store, clock, ttl: Duration::days(ttl_days) }
    }

    pub async fn invite(&self, ctx: &AuthContext, input: NewInvitation) -> Result<EmployeeInvitation, AppError> {
        ctx.require_admin()?;

        let input = input.normalized();
        input.validate()?;
        let email = input.email;

        if self.store.find_user_by_email(&email).await?.is_some() {
            return Err(AppError::Conflict("User already exists".into()));
        }

        let now = self.clock.now();
        if let Some(existing) = self.store.find_invitation_by_email(&email).await? {
            if existing.is_live(now) {
                return Err(AppError::Conflict("A pending invitation already exists for this email".into()));
            }
            // expired: replace it
            self.store.delete_invitation(&existing.id).await?;
        }

        let invitation = EmployeeInvitation {
            id: Uuid::new_v4().to_string(),
            email,
            first_name: input.first_name,
            last_name: input.last_name,
            role: input.role,
            department: input.department,
            position: input.position,
            phone: input.phone,
            hire_date: input.hire_date,
            invited_by: Some(ctx.user_id.clone()),
            created_at: now,
            expires_at: now + self.ttl,
        };

        self.store.insert_invitation(&invitation).await.map_err(|e| match e {
            StoreError::Conflict(_) => AppError::Conflict("A pending invitation already exists for this email".into()),
            other => other.into(),
        })?;

        tracing::info!(invitation_id = %invitation.id, email = %invitation.email, invited_by = %ctx.user_id, "Employee invited");
        Ok(invitation)
    }

    pub async fn list(&self, ctx: &AuthContext) -> Result<Vec<EmployeeInvitation>, AppError> {
        ctx.require_admin()?;
        Ok(self.store.list_invitations().await?)
    }

    pub async fn revoke(&self, ctx: &AuthContext, id: &str) -> Result<(), AppError> {
        ctx.require_admin()?;
        if !self.store.delete_invitation(id).await? {
            return Err(AppError::NotFound("Invitation"));
        }
        tracing::info!(invitation_id = %id, "Invitation deleted");
        Ok(())
    }

    /// The live invitation for `email`, if any. Expired ones are refused.
    pub async fn live_for(&self, email: &str) -> Result<EmployeeInvitation, AppError> {
        let invitation = self
            .store
            .find_invitation_by_email(&normalize_email(email))
            .await?
            .ok_or_else(|| AppError::Unauthorized("No invitation found for this email".into()))?;

        if !invitation.is_live(self.clock.now()) {
            return Err(AppError::Unauthorized("Invitation has expired".into()));
        }
        Ok(invitation)
    }

    /// Removes a consumed invitation; a second consume is a no-op.
    pub async fn consume(&self, invitation: &EmployeeInvitation) -> Result<bool, AppError> {
        Ok(self.store.delete_invitation(&invitation.id).await?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{clock::FixedClock, store::memory::MemoryStore};

    fn admin() -> AuthContext {
        AuthContext { user_id: "admin-1".into(), email: "admin@company.com".into(), role: Role::Admin }
    }

    fn new_invitation(email: &str) -> NewInvitation {
        NewInvitation {
            email: email.into(),
            first_name: "Nadia".into(),
            last_name: "Rahman".into(),
            role: Role::Employee,
            department: Some("Engineering".into()),
            position: None,
            phone: None,
            hire_date: None,
        }
    }

    fn service() -> (Arc<FixedClock>, InvitationService) {
        let clock = Arc::new(FixedClock::at(2025, 6, 2, 10, 0, 0));
        let service = InvitationService::new(Arc::new(MemoryStore::new()), clock.clone(), 7);
        (clock, service)
    }

    #[actix_web::test]
    async fn invitation_expires_after_seven_days() {
        let (clock, service) = service();
        let inv = service.invite(&admin(), new_invitation(" Nadia@Company.com ")).await.unwrap();

        assert_eq!(inv.email, "nadia@company.com");
        assert_eq!(inv.expires_at, clock.now() + Duration::days(7));
        assert_eq!(inv.invited_by.as_deref(), Some("admin-1"));
    }

    #[actix_web::test]
    async fn one_live_invitation_per_email() {
        let (_, service) = service();
        service.invite(&admin(), new_invitation("nadia@company.com")).await.unwrap();

        let err = service.invite(&admin(), new_invitation("NADIA@company.com")).await.unwrap_err();
        assert!(matches!(err, AppError::Conflict(_)));
        assert_eq!(service.list(&admin()).await.unwrap().len(), 1);
    }

    #[actix_web::test]
    async fn expired_invitation_is_replaced_and_not_accepted() {
        let (clock, service) = service();
        let first = service.invite(&admin(), new_invitation("nadia@company.com")).await.unwrap();

        clock.advance(Duration::days(8));
        assert!(matches!(service.live_for("nadia@company.com").await, Err(AppError::Unauthorized(_))));

        let second = service.invite(&admin(), new_invitation("nadia@company.com")).await.unwrap();
        assert_ne!(first.id, second.id);
        assert_eq!(service.live_for("nadia@company.com").await.unwrap().id, second.id);
    }

    #[actix_web::test]
    async fn invitation_is_consumed_once() {
        let (_, service) = service();
        let inv = service.invite(&admin(), new_invitation("nadia@company.com")).await.unwrap();

        assert!(service.consume(&inv).await.unwrap());
        assert!(!service.consume(&inv).await.unwrap());
    }

    #[actix_web::test]
    async fn only_admins_manage_invitations() {
        let (_, service) = service();
        let employee = AuthContext { role: Role::Employee, ..admin() };

        assert!(matches!(
            service.invite(&employee, new_invitation("x@company.com")).await,
            Err(AppError::AccessDenied)
        ));
        assert!(matches!(service.revoke(&admin(), "missing").await, Err(AppError::NotFound(_))));
    }

    #[actix_web::test]
    async fn malformed_invitations_are_rejected() {
        let (_, service) = service();

        for email in ["@company.com", "nadia.company.com", "nadia@"] {
            let err = service.invite(&admin(), new_invitation(email)).await.unwrap_err();
            assert!(matches!(err, AppError::Validation(ref msg) if msg == "a valid email is required"), "{}", email);
        }

        let blank = NewInvitation { last_name: "   ".into(), ..new_invitation("nadia@company.com") };
        assert!(matches!(
            service.invite(&admin(), blank).await,
            Err(AppError::Validation(ref msg)) if msg == "first and last name are required"
        ));
        assert!(service.list(&admin()).await.unwrap().is_empty());
    }
}
