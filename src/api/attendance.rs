use crate::{
    auth::auth::AuthContext,
    error::AppError,
    model::attendance::{AttendanceRecord, Capture, GeoPoint},
    state::AppState,
};
use actix_web::{HttpResponse, web};
use serde::Deserialize;
use utoipa::{IntoParams, ToSchema};

/// Body of check-in and check-out. Both fields are required; they are
/// optional here so a missing one maps to a 400 with a readable message.
#[derive(Debug, Deserialize, ToSchema)]
pub struct CaptureReq {
    pub location: Option<GeoPoint>,
    /// base64 data URI of the selfie
    #[schema(example = "data:image/jpeg;base64,/9j/4AAQSkZJRg...")]
    pub photo: Option<String>,
}

impl TryFrom<CaptureReq> for Capture {
    type Error = AppError;

    fn try_from(req: CaptureReq) -> Result<Self, Self::Error> {
        let location = req.location.ok_or_else(|| AppError::validation("location is required"))?;
        let photo = req.photo.ok_or_else(|| AppError::validation("photo is required"))?;
        Ok(Capture { location, photo })
    }
}

#[derive(Debug, Deserialize, IntoParams)]
#[into_params(parameter_in = Query)]
pub struct HistoryQuery {
    /// Max records, default 10, capped at 100
    pub limit: Option<u32>,
}

/// Check-in endpoint
#[utoipa::path(
    post,
    path = "/api/attendance/checkin",
    request_body = CaptureReq,
    responses(
        (status = 200, description = "Checked in successfully", body = AttendanceRecord),
        (status = 400, description = "Already checked in today", body = Object, example = json!({
            "message": "Already checked in today"
        })),
        (status = 403, description = "Outside every work location"),
        (status = 401, description = "Unauthorized"),
        (status = 503, description = "Store unavailable")
    ),
    security(
        ("bearer_auth" = [])
    ),
    tag = "Attendance"
)]
pub async fn check_in(
    auth: AuthContext,
    state: web::Data<AppState>,
    body: web::Json<CaptureReq>,
) -> Result<HttpResponse, AppError> {
    let capture = Capture::try_from(body.into_inner())?;
    let record = state.attendance.check_in(&auth, capture).await?;
    Ok(HttpResponse::Ok().json(record))
}

/// Check-out endpoint
#[utoipa::path(
    post,
    path = "/api/attendance/checkout",
    request_body = CaptureReq,
    responses(
        (status = 200, description = "Checked out successfully", body = AttendanceRecord),
        (status = 400, description = "Not checked in today", body = Object, example = json!({
            "message": "Not checked in today"
        })),
        (status = 422, description = "Check-out precedes check-in"),
        (status = 401, description = "Unauthorized"),
        (status = 503, description = "Store unavailable")
    ),
    security(
        ("bearer_auth" = [])
    ),
    tag = "Attendance"
)]
pub async fn check_out(
    auth: AuthContext,
    state: web::Data<AppState>,
    body: web::Json<CaptureReq>,
) -> Result<HttpResponse, AppError> {
    let capture = Capture::try_from(body.into_inner())?;
    let record = state.attendance.check_out(&auth, capture).await?;
    Ok(HttpResponse::Ok().json(record))
}

/// Today's record of the caller, `null` when there is none
#[utoipa::path(
    get,
    path = "/api/attendance/today",
    responses(
        (status = 200, description = "Today's record or null", body = AttendanceRecord),
        (status = 401, description = "Unauthorized")
    ),
    security(
        ("bearer_auth" = [])
    ),
    tag = "Attendance"
)]
pub async fn today(auth: AuthContext, state: web::Data<AppState>) -> Result<HttpResponse, AppError> {
    let record = state.attendance.today_record(&auth).await?;
    Ok(HttpResponse::Ok().json(record))
}

#[utoipa::path(
    get,
    path = "/api/attendance/history",
    params(HistoryQuery),
    responses(
        (status = 200, description = "Latest records, newest first", body = [AttendanceRecord]),
        (status = 401, description = "Unauthorized")
    ),
    security(
        ("bearer_auth" = [])
    ),
    tag = "Attendance"
)]
pub async fn history(
    auth: AuthContext,
    state: web::Data<AppState>,
    query: web::Query<HistoryQuery>,
) -> Result<HttpResponse, AppError> {
    let records = state.attendance.history(&auth, query.limit).await?;
    Ok(HttpResponse::Ok().json(records))
}

#[utoipa::path(
    get,
    path = "/api/attendance/{id}",
    params(("id" = String, Path, description = "Attendance record id")),
    responses(
        (status = 200, description = "Attendance record", body = AttendanceRecord),
        (status = 403, description = "Record of another user"),
        (status = 404, description = "Not found")
    ),
    security(
        ("bearer_auth" = [])
    ),
    tag = "Attendance"
)]
pub async fn get_record(
    auth: AuthContext,
    state: web::Data<AppState>,
    id: web::Path<String>,
) -> Result<HttpResponse, AppError> {
    let record = state.attendance.record(&auth, &id).await?;
    Ok(HttpResponse::Ok().json(record))
}
