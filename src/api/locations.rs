use crate::{
    auth::auth::AuthContext,
    error::AppError,
    model::{attendance::GeoPoint, work_location::WorkLocation},
    service::geofence::{GeofenceCheck, NewWorkLocation},
    state::AppState,
};
use actix_web::{HttpResponse, web};

#[utoipa::path(
    get,
    path = "/api/locations",
    responses(
        (status = 200, description = "Active work locations", body = [WorkLocation]),
        (status = 401, description = "Unauthorized")
    ),
    security(
        ("bearer_auth" = [])
    ),
    tag = "Locations"
)]
pub async fn list_locations(_auth: AuthContext, state: web::Data<AppState>) -> Result<HttpResponse, AppError> {
    let locations = state.locations.active_locations().await?;
    Ok(HttpResponse::Ok().json(locations))
}

#[utoipa::path(
    post,
    path = "/api/locations",
    request_body = NewWorkLocation,
    responses(
        (status = 201, description = "Work location created", body = WorkLocation),
        (status = 400, description = "Invalid radius or coordinates"),
        (status = 403, description = "Access denied")
    ),
    security(
        ("bearer_auth" = [])
    ),
    tag = "Locations"
)]
pub async fn create_location(
    auth: AuthContext,
    state: web::Data<AppState>,
    body: web::Json<NewWorkLocation>,
) -> Result<HttpResponse, AppError> {
    let location = state.locations.create(&auth, body.into_inner()).await?;
    Ok(HttpResponse::Created().json(location))
}

/// Checks a coordinate against the active work locations
#[utoipa::path(
    post,
    path = "/api/locations/verify",
    request_body = GeoPoint,
    responses(
        (status = 200, description = "Geofence result", body = GeofenceCheck, example = json!({
            "withinGeofence": true, "locationId": "6a3c1d52-7f0e-4f55-9d59-5b0fb3a1f0c2", "distanceMeters": 42.7
        })),
        (status = 400, description = "Coordinates out of range")
    ),
    security(
        ("bearer_auth" = [])
    ),
    tag = "Locations"
)]
pub async fn verify_location(
    _auth: AuthContext,
    state: web::Data<AppState>,
    body: web::Json<GeoPoint>,
) -> Result<HttpResponse, AppError> {
    let check = state.locations.verify(&body).await?;
    Ok(HttpResponse::Ok().json(check))
}
