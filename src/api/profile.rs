use crate::{
    auth::auth::AuthContext, error::AppError, model::user::User, service::employee::ProfileUpdate, state::AppState,
};
use actix_web::{HttpResponse, web};

/// Current user
#[utoipa::path(
    get,
    path = "/api/user",
    responses(
        (status = 200, description = "Authenticated user", body = User),
        (status = 401, description = "Unauthorized"),
        (status = 404, description = "User no longer exists")
    ),
    security(
        ("bearer_auth" = [])
    ),
    tag = "Profile"
)]
pub async fn current_user(auth: AuthContext, state: web::Data<AppState>) -> Result<HttpResponse, AppError> {
    let user = state.employees.profile(&auth).await?;
    Ok(HttpResponse::Ok().json(user))
}

#[utoipa::path(
    get,
    path = "/api/profile",
    responses(
        (status = 200, description = "Own profile", body = User),
        (status = 401, description = "Unauthorized")
    ),
    security(
        ("bearer_auth" = [])
    ),
    tag = "Profile"
)]
pub async fn get_profile(auth: AuthContext, state: web::Data<AppState>) -> Result<HttpResponse, AppError> {
    let user = state.employees.profile(&auth).await?;
    Ok(HttpResponse::Ok().json(user))
}

#[utoipa::path(
    put,
    path = "/api/profile",
    request_body = ProfileUpdate,
    responses(
        (status = 200, description = "Updated profile", body = User),
        (status = 401, description = "Unauthorized")
    ),
    security(
        ("bearer_auth" = [])
    ),
    tag = "Profile"
)]
pub async fn update_profile(
    auth: AuthContext,
    state: web::Data<AppState>,
    body: web::Json<ProfileUpdate>,
) -> Result<HttpResponse, AppError> {
    let user = state.employees.update_profile(&auth, body.into_inner()).await?;
    Ok(HttpResponse::Ok().json(user))
}
