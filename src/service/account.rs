//! Sign-in, invitation-based registration and password reset.

use std::sync::Arc;

use argon2::password_hash::rand_core::{OsRng, RngCore};
use chrono::Duration;
use uuid::Uuid;
use validator::Validate;

use crate::{
    auth::{
        jwt::generate_access_token,
        password::{hash_password, verify_password},
    },
    clock::Clock,
    config::Config,
    error::AppError,
    model::{password_reset::PasswordResetToken, role::Role, user::User},
    models::{LoginResponse, RegisterReqDto, ResetPasswordReqDto},
    service::{
        invitation::{InvitationService, normalize_email},
        mailer::{Mailer, password_reset_email},
    },
    store::{RecordStore, StoreError},
};

const RESET_TOKEN_BYTES: usize = 32;

#[derive(Clone)]
pub struct AccountSettings {
    pub jwt_secret: String,
    pub access_token_ttl: i64,
    pub reset_token_ttl: Duration,
    pub app_base_url: String,
    pub mail_from: String,
}

impl From<&Config> for AccountSettings {
    fn from(config: &Config) -> Self {
        Self {
            jwt_secret: config.jwt_secret.clone(),
            access_token_ttl: config.access_token_ttl,
            reset_token_ttl: Duration::seconds(config.reset_token_ttl_secs),
            app_base_url: config.app_base_url.clone(),
            mail_from: config.mail_from.clone(),
        }
    }
}

fn random_token() -> String {
    let mut bytes = [0u8; RESET_TOKEN_BYTES];
    OsRng.fill_bytes(&mut bytes);
    hex::encode(bytes)
}

fn non_blank(value: Option<String>) -> Option<String> {
    value.map(|v| v.trim().to_string()).filter(|v| !v.is_empty())
}

pub struct AccountService {
    store: Arc<dyn RecordStore>,
    clock: Arc<dyn Clock>,
    mailer: Arc<dyn Mailer>,
    invitations: Arc<InvitationService>,
    settings: AccountSettings,
}

impl AccountService {
    pub fn new(
        store: Arc<dyn RecordStore>,
        clock: Arc<dyn Clock>,
        mailer: Arc<dyn Mailer>,
        invitations: Arc<InvitationService>,
        settings: AccountSettings,
    ) -> Self {
        Self { store, clock, mailer, invitations, settings }
    }

    fn issue_token(&self, user: User) -> Result<LoginResponse, AppError> {
        let access_token = generate_access_token(&user, &self.settings.jwt_secret, self.settings.access_token_ttl)
            .map_err(|e| AppError::Internal(format!("token signing failed: {}", e)))?;
        Ok(LoginResponse { access_token, user })
    }

    pub async fn login(&self, email: &str, password: &str) -> Result<LoginResponse, AppError> {
        let invalid = || AppError::Unauthorized("Invalid email or password".into());

        let user = self
            .store
            .find_user_by_email(&normalize_email(email))
            .await?
            .ok_or_else(invalid)?;

        let Some(hash) = user.password_hash.as_deref() else {
            return Err(AppError::Unauthorized("No password set; use password reset".into()));
        };
        if !verify_password(password, hash) {
            return Err(invalid());
        }
        if !user.is_active {
            tracing::warn!(user_id = %user.id, "Login refused for deactivated account");
            return Err(AppError::Unauthorized("Account is deactivated".into()));
        }

        tracing::info!(user_id = %user.id, role = %user.role, "User logged in");
        self.issue_token(user)
    }

    /// Creates the account described by a live invitation and consumes it.
    pub async fn register(&self, input: RegisterReqDto) -> Result<LoginResponse, AppError> {
        let email = normalize_email(&input.email);
        let input = RegisterReqDto { email: email.clone(), ..input };
        input.validate()?;

        if self.store.find_user_by_email(&email).await?.is_some() {
            return Err(AppError::Conflict("User already exists".into()));
        }
        let invitation = self.invitations.live_for(&email).await?;

        let now = self.clock.now();
        let user = User {
            id: Uuid::new_v4().to_string(),
            email: invitation.email.clone(),
            first_name: non_blank(input.first_name).or_else(|| Some(invitation.first_name.clone())),
            last_name: non_blank(input.last_name).or_else(|| Some(invitation.last_name.clone())),
            role: invitation.role,
            department: invitation.department.clone(),
            position: invitation.position.clone(),
            phone: invitation.phone.clone(),
            hire_date: invitation.hire_date,
            is_active: true,
            password_hash: Some(hash_password(&input.password)?),
            created_at: now,
            updated_at: now,
        };

        self.store.insert_user(&user).await.map_err(|e| match e {
            StoreError::Conflict(_) => AppError::Conflict("User already exists".into()),
            other => other.into(),
        })?;
        self.invitations.consume(&invitation).await?;

        tracing::info!(user_id = %user.id, email = %user.email, "Employee registered from invitation");
        self.issue_token(user)
    }

    /// Creates an active admin with `email` unless a user already holds it.
    /// Returns whether an account was created.
    pub async fn ensure_admin(&self, email: &str, password: &str) -> Result<bool, AppError> {
        let email = normalize_email(email);
        if self.store.find_user_by_email(&email).await?.is_some() {
            tracing::debug!(%email, "Bootstrap admin already present");
            return Ok(false);
        }
        RegisterReqDto { email: email.clone(), password: password.to_string(), first_name: None, last_name: None }
            .validate()?;

        let now = self.clock.now();
        let admin = User {
            id: Uuid::new_v4().to_string(),
            email,
            first_name: Some("Admin".to_string()),
            last_name: None,
            role: Role::Admin,
            department: None,
            position: None,
            phone: None,
            hire_date: None,
            is_active: true,
            password_hash: Some(hash_password(password)?),
            created_at: now,
            updated_at: now,
        };
        self.store.insert_user(&admin).await?;

        tracing::info!(user_id = %admin.id, email = %admin.email, "Bootstrap admin created");
        Ok(true)
    }

    /// Issues a reset token and mails the link. Unknown emails and mail
    /// failures are indistinguishable from success for the caller.
    pub async fn forgot_password(&self, email: &str) -> Result<(), AppError> {
        let Some(user) = self.store.find_user_by_email(&normalize_email(email)).await? else {
            tracing::debug!("Password reset requested for unknown email");
            return Ok(());
        };

        let now = self.clock.now();
        let token = PasswordResetToken {
            id: Uuid::new_v4().to_string(),
            user_id: user.id.clone(),
            token: random_token(),
            expires_at: now + self.settings.reset_token_ttl,
            used: false,
            created_at: now,
        };
        self.store.insert_reset_token(&token).await?;

        let email = password_reset_email(
            &self.settings.mail_from,
            &user.email,
            &self.settings.app_base_url,
            &token.token,
        );
        if let Err(e) = self.mailer.send(email).await {
            tracing::error!(user_id = %user.id, error = %e, "Failed to send password reset email");
        } else {
            tracing::info!(user_id = %user.id, "Password reset email sent");
        }
        Ok(())
    }

    pub async fn reset_password(&self, input: ResetPasswordReqDto) -> Result<(), AppError> {
        let input = ResetPasswordReqDto { token: input.token.trim().to_string(), ..input };
        input.validate()?;

        let reset = self
            .store
            .find_reset_token(&input.token)
            .await?
            .filter(|t| t.is_valid(self.clock.now()))
            .ok_or(AppError::InvalidResetToken)?;

        let hash = hash_password(&input.new_password)?;

        // claim the token before touching the password
        if !self.store.mark_reset_token_used(&reset.id).await? {
            return Err(AppError::InvalidResetToken);
        }
        if !self.store.set_password_hash(&reset.user_id, &hash).await? {
            return Err(AppError::NotFound("User"));
        }

        tracing::info!(user_id = %reset.user_id, "Password reset completed");
        Ok(())
    }
}
