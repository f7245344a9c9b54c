use crate::api::attendance::CaptureReq;
use crate::model::{
    attendance::{AttendanceRecord, AttendanceStatus, GeoPoint},
    invitation::EmployeeInvitation,
    role::Role,
    stats::AttendanceStats,
    user::{User, UserSummary},
    work_location::WorkLocation,
};
use crate::models::{ForgotPasswordReqDto, LoginReqDto, LoginResponse, RegisterReqDto, ResetPasswordReqDto};
use crate::service::{
    attendance::AttendanceWithUser,
    employee::{EmployeeUpdate, ProfileUpdate},
    geofence::{GeofenceCheck, NewWorkLocation},
    invitation::NewInvitation,
    stats::StatsSnapshot,
};
use utoipa::Modify;
use utoipa::OpenApi;
use utoipa::openapi::security::{HttpAuthScheme, HttpBuilder, SecurityScheme};

struct SecurityAddon;

impl Modify for SecurityAddon {
    fn modify(&self, openapi: &mut utoipa::openapi::OpenApi) {
        let components = openapi.components.get_or_insert_with(Default::default);
        components.add_security_scheme(
            "bearer_auth",
            SecurityScheme::Http(
                HttpBuilder::new()
                    .scheme(HttpAuthScheme::Bearer)
                    .bearer_format("JWT")
                    .build(),
            ),
        );
    }
}

#[derive(OpenApi)]
#[openapi(
    info(
        title = "Attendance Tracker API",
        version = "1.0.0",
        description = r#"
## Employee Attendance Tracker

Daily check-in / check-out with a location and a selfie, worked-hours
calculation and an admin dashboard.

### Key Features
- **Attendance**
  - One record per employee per day: check in, then check out
  - Hours worked rounded to two decimals
  - Optional geofencing against configured work locations
- **Admin**
  - Today's totals: employees, present, late arrivals, absent
  - Attendance listing over a date range
  - Employee roster and invitations
- **Accounts**
  - Invitation-based registration and password reset by email

### Security
Endpoints under the API prefix require a **JWT Bearer** token from `/auth/login`.
Admin endpoints additionally require the `admin` role.

### Response Format
JSON bodies; errors are `{ "message": "..." }`.
"#,
    ),
    paths(
        crate::auth::handlers::login,
        crate::auth::handlers::register,
        crate::auth::handlers::forgot_password,
        crate::auth::handlers::reset_password,

        crate::api::profile::current_user,
        crate::api::profile::get_profile,
        crate::api::profile::update_profile,

        crate::api::attendance::check_in,
        crate::api::attendance::check_out,
        crate::api::attendance::today,
        crate::api::attendance::history,
        crate::api::attendance::get_record,

        crate::api::admin::stats,
        crate::api::admin::attendance,
        crate::api::admin::list_employees,
        crate::api::admin::update_employee,
        crate::api::admin::invite,
        crate::api::admin::list_invitations,
        crate::api::admin::delete_invitation,

        crate::api::locations::list_locations,
        crate::api::locations::create_location,
        crate::api::locations::verify_location
    ),
    components(
        schemas(
            LoginReqDto,
            RegisterReqDto,
            ForgotPasswordReqDto,
            ResetPasswordReqDto,
            LoginResponse,
            Role,
            User,
            UserSummary,
            ProfileUpdate,
            EmployeeUpdate,
            AttendanceStatus,
            GeoPoint,
            CaptureReq,
            AttendanceRecord,
            AttendanceWithUser,
            AttendanceStats,
            StatsSnapshot,
            EmployeeInvitation,
            NewInvitation,
            WorkLocation,
            NewWorkLocation,
            GeofenceCheck
        )
    ),
    modifiers(&SecurityAddon),
    tags(
        (name = "Auth", description = "Sign-in, registration and password reset"),
        (name = "Profile", description = "Current user and own profile"),
        (name = "Attendance", description = "Daily check-in and check-out"),
        (name = "Admin", description = "Dashboard stats, attendance listing, roster and invitations"),
        (name = "Locations", description = "Work locations and geofence checks"),
    )
)]
pub struct ApiDoc;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn document_lists_attendance_paths_and_bearer_scheme() {
        let doc = ApiDoc::openapi();
        assert!(doc.paths.paths.contains_key("/api/attendance/checkin"));
        assert!(doc.paths.paths.contains_key("/api/admin/stats"));
        assert!(
            doc.components
                .as_ref()
                .is_some_and(|c| c.security_schemes.contains_key("bearer_auth"))
        );
    }
}
