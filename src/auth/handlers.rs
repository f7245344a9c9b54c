use crate::{
    error::AppError,
    models::{ForgotPasswordReqDto, LoginReqDto, LoginResponse, RegisterReqDto, ResetPasswordReqDto},
    state::AppState,
};
use actix_web::{HttpResponse, web};
use serde_json::json;
use tracing::{info, instrument};

/// Email + password sign-in
#[utoipa::path(
    post,
    path = "/auth/login",
    request_body = LoginReqDto,
    responses(
        (status = 200, description = "Signed in", body = LoginResponse),
        (status = 400, description = "Email and password are required"),
        (status = 401, description = "Invalid credentials or deactivated account", body = Object, example = json!({
            "message": "Invalid email or password"
        }))
    ),
    tag = "Auth"
)]
#[instrument(name = "auth_login", skip(state, body), fields(email = %body.email))]
pub async fn login(body: web::Json<LoginReqDto>, state: web::Data<AppState>) -> Result<HttpResponse, AppError> {
    info!("Login request received");

    if body.email.trim().is_empty() || body.password.is_empty() {
        return Err(AppError::validation("email and password are required"));
    }

    let response = state.accounts.login(&body.email, &body.password).await?;
    Ok(HttpResponse::Ok().json(response))
}

/// Registration from a pending invitation; signs the new user in
#[utoipa::path(
    post,
    path = "/auth/register",
    request_body = RegisterReqDto,
    responses(
        (status = 201, description = "Registered and signed in", body = LoginResponse),
        (status = 400, description = "Password too short"),
        (status = 401, description = "No live invitation for this email"),
        (status = 409, description = "User already exists")
    ),
    tag = "Auth"
)]
#[instrument(name = "auth_register", skip(state, body), fields(email = %body.email))]
pub async fn register(body: web::Json<RegisterReqDto>, state: web::Data<AppState>) -> Result<HttpResponse, AppError> {
    let response = state.accounts.register(body.into_inner()).await?;
    Ok(HttpResponse::Created().json(response))
}

#[utoipa::path(
    post,
    path = "/auth/forgot-password",
    request_body = ForgotPasswordReqDto,
    responses(
        (status = 200, description = "Same answer whether or not the email exists", body = Object, example = json!({
            "message": "If this email exists, you will receive a password reset link."
        }))
    ),
    tag = "Auth"
)]
pub async fn forgot_password(
    body: web::Json<ForgotPasswordReqDto>,
    state: web::Data<AppState>,
) -> Result<HttpResponse, AppError> {
    if body.email.trim().is_empty() {
        return Err(AppError::validation("email is required"));
    }

    state.accounts.forgot_password(&body.email).await?;
    Ok(HttpResponse::Ok().json(json!({
        "message": "If this email exists, you will receive a password reset link."
    })))
}

#[utoipa::path(
    post,
    path = "/auth/reset-password",
    request_body = ResetPasswordReqDto,
    responses(
        (status = 200, description = "Password changed", body = Object, example = json!({
            "message": "Password reset successful"
        })),
        (status = 400, description = "Invalid or expired reset token")
    ),
    tag = "Auth"
)]
pub async fn reset_password(
    body: web::Json<ResetPasswordReqDto>,
    state: web::Data<AppState>,
) -> Result<HttpResponse, AppError> {
    state.accounts.reset_password(body.into_inner()).await?;
    Ok(HttpResponse::Ok().json(json!({ "message": "Password reset successful" })))
}
