use crate::{
    auth::auth::AuthContext,
    error::AppError,
    model::{invitation::EmployeeInvitation, user::User},
    service::{
        attendance::AttendanceWithUser, employee::EmployeeUpdate, invitation::NewInvitation, stats::StatsSnapshot,
    },
    state::AppState,
};
use actix_web::{HttpResponse, web};
use chrono::NaiveDate;
use serde::Deserialize;
use serde_json::json;
use utoipa::IntoParams;

#[derive(Debug, Deserialize, IntoParams)]
#[into_params(parameter_in = Query)]
pub struct RangeQuery {
    /// First day, inclusive. Defaults to 30 days before `to`.
    #[param(example = "2025-06-01", value_type = Option<String>)]
    pub from: Option<NaiveDate>,
    /// Last day, inclusive. Defaults to today.
    #[param(example = "2025-06-30", value_type = Option<String>)]
    pub to: Option<NaiveDate>,
}

/// Dashboard numbers for today
#[utoipa::path(
    get,
    path = "/api/admin/stats",
    responses(
        (status = 200, description = "Attendance stats; `stale` is set when served from cache", body = StatsSnapshot,
            example = json!({
                "totalEmployees": 10, "presentToday": 6, "lateArrivals": 2, "absent": 4, "stale": false
            })),
        (status = 403, description = "Access denied")
    ),
    security(
        ("bearer_auth" = [])
    ),
    tag = "Admin"
)]
pub async fn stats(auth: AuthContext, state: web::Data<AppState>) -> Result<HttpResponse, AppError> {
    let snapshot = state.stats.dashboard(&auth).await?;
    Ok(HttpResponse::Ok().json(snapshot))
}

#[utoipa::path(
    get,
    path = "/api/admin/attendance",
    params(RangeQuery),
    responses(
        (status = 200, description = "Records of all users in range, newest day first", body = [AttendanceWithUser]),
        (status = 400, description = "from is after to"),
        (status = 403, description = "Access denied")
    ),
    security(
        ("bearer_auth" = [])
    ),
    tag = "Admin"
)]
pub async fn attendance(
    auth: AuthContext,
    state: web::Data<AppState>,
    query: web::Query<RangeQuery>,
) -> Result<HttpResponse, AppError> {
    let records = state.attendance.records_between(&auth, query.from, query.to).await?;
    Ok(HttpResponse::Ok().json(records))
}

#[utoipa::path(
    get,
    path = "/api/admin/employees",
    responses(
        (status = 200, description = "All users", body = [User]),
        (status = 403, description = "Access denied")
    ),
    security(
        ("bearer_auth" = [])
    ),
    tag = "Admin"
)]
pub async fn list_employees(auth: AuthContext, state: web::Data<AppState>) -> Result<HttpResponse, AppError> {
    let users = state.employees.list(&auth).await?;
    Ok(HttpResponse::Ok().json(users))
}

#[utoipa::path(
    put,
    path = "/api/admin/employees/{id}",
    params(("id" = String, Path, description = "User id")),
    request_body = EmployeeUpdate,
    responses(
        (status = 200, description = "Updated user", body = User),
        (status = 403, description = "Access denied"),
        (status = 404, description = "User not found")
    ),
    security(
        ("bearer_auth" = [])
    ),
    tag = "Admin"
)]
pub async fn update_employee(
    auth: AuthContext,
    state: web::Data<AppState>,
    id: web::Path<String>,
    body: web::Json<EmployeeUpdate>,
) -> Result<HttpResponse, AppError> {
    let user = state.employees.update(&auth, &id, body.into_inner()).await?;
    Ok(HttpResponse::Ok().json(user))
}

#[utoipa::path(
    post,
    path = "/api/admin/employees/invite",
    request_body = NewInvitation,
    responses(
        (status = 201, description = "Invitation created", body = EmployeeInvitation),
        (status = 409, description = "User or pending invitation already exists"),
        (status = 403, description = "Access denied")
    ),
    security(
        ("bearer_auth" = [])
    ),
    tag = "Admin"
)]
pub async fn invite(
    auth: AuthContext,
    state: web::Data<AppState>,
    body: web::Json<NewInvitation>,
) -> Result<HttpResponse, AppError> {
    let invitation = state.invitations.invite(&auth, body.into_inner()).await?;
    Ok(HttpResponse::Created().json(invitation))
}

#[utoipa::path(
    get,
    path = "/api/admin/employees/invitations",
    responses(
        (status = 200, description = "Pending and expired invitations", body = [EmployeeInvitation]),
        (status = 403, description = "Access denied")
    ),
    security(
        ("bearer_auth" = [])
    ),
    tag = "Admin"
)]
pub async fn list_invitations(auth: AuthContext, state: web::Data<AppState>) -> Result<HttpResponse, AppError> {
    let invitations = state.invitations.list(&auth).await?;
    Ok(HttpResponse::Ok().json(invitations))
}

#[utoipa::path(
    delete,
    path = "/api/admin/employees/invitations/{id}",
    params(("id" = String, Path, description = "Invitation id")),
    responses(
        (status = 200, description = "Invitation deleted", body = Object, example = json!({
            "message": "Invitation deleted successfully"
        })),
        (status = 404, description = "Invitation not found"),
        (status = 403, description = "Access denied")
    ),
    security(
        ("bearer_auth" = [])
    ),
    tag = "Admin"
)]
pub async fn delete_invitation(
    auth: AuthContext,
    state: web::Data<AppState>,
    id: web::Path<String>,
) -> Result<HttpResponse, AppError> {
    state.invitations.revoke(&auth, &id).await?;
    Ok(HttpResponse::Ok().json(json!({ "message": "Invitation deleted successfully" })))
}
