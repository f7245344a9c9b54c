//! End-to-end checks through the real route table on the in-memory store.

use std::net::SocketAddr;
use std::sync::Arc;

use actix_web::{App, http::StatusCode, test, web::Data};
use chrono::Duration;
use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use serde_json::{Value, json};

use crate::{
    auth::{auth::AuthContext, jwt::verify_token},
    clock::FixedClock,
    config::Config,
    model::role::Role,
    models::RegisterReqDto,
    routes::{self, RateLimits},
    service::{invitation::NewInvitation, mailer::LogMailer},
    state::AppState,
    store::memory::MemoryStore,
};

struct Harness {
    clock: Arc<FixedClock>,
    state: Data<AppState>,
    config: Data<Config>,
    limits: RateLimits,
}

fn harness() -> Harness {
    let config = Config::for_tests();
    let clock = Arc::new(FixedClock::at(2025, 6, 2, 8, 30, 0));
    let state = AppState::new(Arc::new(MemoryStore::new()), clock.clone(), Arc::new(LogMailer), &config);
    Harness {
        clock,
        state: Data::new(state),
        limits: RateLimits::from_config(&config).unwrap(),
        config: Data::new(config),
    }
}

macro_rules! app {
    ($h:expr) => {
        test::init_service(
            App::new()
                .app_data($h.config.clone())
                .app_data($h.state.clone())
                .configure(|cfg| routes::configure(cfg, &$h.config, &$h.limits)),
        )
        .await
    };
}

fn peer() -> SocketAddr {
    "127.0.0.1:40000".parse().unwrap()
}

fn post(uri: &str, token: Option<&str>, body: Value) -> test::TestRequest {
    let req = test::TestRequest::post().uri(uri).peer_addr(peer()).set_json(body);
    match token {
        Some(t) => req.insert_header(("Authorization", format!("Bearer {}", t))),
        None => req,
    }
}

fn get(uri: &str, token: &str) -> test::TestRequest {
    test::TestRequest::get()
        .uri(uri)
        .peer_addr(peer())
        .insert_header(("Authorization", format!("Bearer {}", token)))
}

fn capture() -> Value {
    json!({
        "location": { "lat": 23.8103, "lng": 90.4125, "address": "Lat: 23.810300, Lng: 90.412500" },
        "photo": "data:image/jpeg;base64,AAAA"
    })
}

/// Bootstraps an admin, invites and registers one employee; returns both tokens.
async fn admin_and_employee(h: &Harness) -> (String, String) {
    let accounts = &h.state.accounts;
    accounts.ensure_admin("admin@company.com", "admin-password").await.unwrap();
    let admin = accounts.login("admin@company.com", "admin-password").await.unwrap();

    let ctx = AuthContext { user_id: admin.user.id.clone(), email: admin.user.email.clone(), role: Role::Admin };
    let invitation = NewInvitation {
        email: "nadia@company.com".into(),
        first_name: "Nadia".into(),
        last_name: "Rahman".into(),
        role: Role::Employee,
        department: None,
        position: None,
        phone: None,
        hire_date: None,
    };
    h.state.invitations.invite(&ctx, invitation).await.unwrap();

    let employee = accounts
        .register(RegisterReqDto {
            email: "nadia@company.com".into(),
            password: "password1".into(),
            first_name: None,
            last_name: None,
        })
        .await
        .unwrap();

    (admin.access_token, employee.access_token)
}

#[actix_web::test]
async fn protected_routes_require_a_bearer_token() {
    let h = harness();
    let app = app!(h);

    let req = test::TestRequest::get().uri("/api/attendance/today").peer_addr(peer()).to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status(), StatusCode::UNAUTHORIZED);

    let resp = test::call_service(&app, get("/api/attendance/today", "garbage").to_request()).await;
    assert_eq!(resp.status(), StatusCode::UNAUTHORIZED);
}

#[actix_web::test]
async fn employee_day_from_check_in_to_check_out() {
    let h = harness();
    let app = app!(h);
    let (_, employee) = admin_and_employee(&h).await;

    let today: Value = test::call_and_read_body_json(&app, get("/api/attendance/today", &employee).to_request()).await;
    assert!(today.is_null());

    let resp = test::call_service(&app, post("/api/attendance/checkin", Some(&employee), capture()).to_request()).await;
    assert_eq!(resp.status(), StatusCode::OK);
    let record: Value = test::read_body_json(resp).await;
    assert_eq!(record["status"], "checked_in");
    assert_eq!(record["date"], "2025-06-02");

    let resp = test::call_service(&app, post("/api/attendance/checkin", Some(&employee), capture()).to_request()).await;
    assert_eq!(resp.status(), StatusCode::BAD_REQUEST);
    let body: Value = test::read_body_json(resp).await;
    assert_eq!(body["message"], "Already checked in today");

    h.clock.advance(Duration::minutes(90));
    let resp = test::call_service(&app, post("/api/attendance/checkout", Some(&employee), capture()).to_request()).await;
    assert_eq!(resp.status(), StatusCode::OK);
    let record: Value = test::read_body_json(resp).await;
    assert_eq!(record["status"], "checked_out");
    let hours: Decimal = record["hoursWorked"].as_str().unwrap().parse().unwrap();
    assert_eq!(hours, dec!(1.5));

    let resp = test::call_service(&app, post("/api/attendance/checkout", Some(&employee), capture()).to_request()).await;
    assert_eq!(resp.status(), StatusCode::BAD_REQUEST);

    let history: Value =
        test::call_and_read_body_json(&app, get("/api/attendance/history?limit=5", &employee).to_request()).await;
    assert_eq!(history.as_array().map(Vec::len), Some(1));
}

#[actix_web::test]
async fn capture_without_photo_is_rejected() {
    let h = harness();
    let app = app!(h);
    let (_, employee) = admin_and_employee(&h).await;

    let body = json!({ "location": { "lat": 23.81, "lng": 90.41 } });
    let resp = test::call_service(&app, post("/api/attendance/checkin", Some(&employee), body).to_request()).await;
    assert_eq!(resp.status(), StatusCode::BAD_REQUEST);
    let body: Value = test::read_body_json(resp).await;
    assert_eq!(body["message"], "photo is required");
}

#[actix_web::test]
async fn stats_are_admin_only() {
    let h = harness();
    let app = app!(h);
    let (admin, employee) = admin_and_employee(&h).await;

    h.clock.advance(Duration::hours(1)); // 09:30, late
    let resp = test::call_service(&app, post("/api/attendance/checkin", Some(&employee), capture()).to_request()).await;
    assert_eq!(resp.status(), StatusCode::OK);

    let resp = test::call_service(&app, get("/api/admin/stats", &employee).to_request()).await;
    assert_eq!(resp.status(), StatusCode::FORBIDDEN);

    let stats: Value = test::call_and_read_body_json(&app, get("/api/admin/stats", &admin).to_request()).await;
    assert_eq!(
        stats,
        json!({ "totalEmployees": 1, "presentToday": 1, "lateArrivals": 1, "absent": 0, "stale": false })
    );

    let rows: Value = test::call_and_read_body_json(&app, get("/api/admin/attendance", &admin).to_request()).await;
    assert_eq!(rows[0]["user"]["email"], "nadia@company.com");
}

#[actix_web::test]
async fn admin_check_in_does_not_hide_an_absent_employee() {
    let h = harness();
    let app = app!(h);
    let (admin, _) = admin_and_employee(&h).await;

    h.clock.advance(Duration::hours(2)); // 10:30, would be late
    let resp = test::call_service(&app, post("/api/attendance/checkin", Some(&admin), capture()).to_request()).await;
    assert_eq!(resp.status(), StatusCode::OK);

    let stats: Value = test::call_and_read_body_json(&app, get("/api/admin/stats", &admin).to_request()).await;
    assert_eq!(
        stats,
        json!({ "totalEmployees": 1, "presentToday": 0, "lateArrivals": 0, "absent": 1, "stale": false })
    );
}

#[actix_web::test]
async fn account_changes_apply_to_issued_tokens() {
    let h = harness();
    let app = app!(h);
    let (admin, employee) = admin_and_employee(&h).await;
    let employee_id = verify_token(&employee, &h.config.jwt_secret).unwrap().sub;
    let uri = format!("/api/admin/employees/{}", employee_id);

    let promote = test::TestRequest::put()
        .uri(&uri)
        .peer_addr(peer())
        .insert_header(("Authorization", format!("Bearer {}", admin)))
        .set_json(json!({ "role": "admin" }));
    assert_eq!(test::call_service(&app, promote.to_request()).await.status(), StatusCode::OK);
    let resp = test::call_service(&app, get("/api/admin/stats", &employee).to_request()).await;
    assert_eq!(resp.status(), StatusCode::OK);

    let deactivate = test::TestRequest::put()
        .uri(&uri)
        .peer_addr(peer())
        .insert_header(("Authorization", format!("Bearer {}", admin)))
        .set_json(json!({ "role": "employee", "isActive": false }));
    assert_eq!(test::call_service(&app, deactivate.to_request()).await.status(), StatusCode::OK);

    let resp = test::call_service(&app, post("/api/attendance/checkin", Some(&employee), capture()).to_request()).await;
    assert_eq!(resp.status(), StatusCode::UNAUTHORIZED);
    let body: Value = test::read_body_json(resp).await;
    assert_eq!(body["message"], "Account is deactivated");
}

#[actix_web::test]
async fn admin_creates_location_and_anyone_verifies() {
    let h = harness();
    let app = app!(h);
    let (admin, employee) = admin_and_employee(&h).await;

    let office = json!({ "name": "Head office", "address": "Dhaka", "latitude": 23.8103, "longitude": 90.4125 });
    let resp = test::call_service(&app, post("/api/locations", Some(&employee), office.clone()).to_request()).await;
    assert_eq!(resp.status(), StatusCode::FORBIDDEN);
    let resp = test::call_service(&app, post("/api/locations", Some(&admin), office).to_request()).await;
    assert_eq!(resp.status(), StatusCode::CREATED);

    let near = json!({ "lat": 23.8105, "lng": 90.4125 });
    let check: Value =
        test::call_and_read_body_json(&app, post("/api/locations/verify", Some(&employee), near).to_request()).await;
    assert_eq!(check["withinGeofence"], true);

    let locations: Value = test::call_and_read_body_json(&app, get("/api/locations", &employee).to_request()).await;
    assert_eq!(locations[0]["radius"], 100.0);
}

#[actix_web::test]
async fn invited_employee_registers_and_logs_in_over_http() {
    let h = harness();
    let app = app!(h);

    h.state.accounts.ensure_admin("admin@company.com", "admin-password").await.unwrap();
    let login = json!({ "email": "admin@company.com", "password": "admin-password" });
    let body: Value = test::call_and_read_body_json(&app, post("/auth/login", None, login).to_request()).await;
    let admin = body["accessToken"].as_str().unwrap().to_string();
    assert_eq!(body["user"]["role"], "admin");
    assert!(body["user"].get("passwordHash").is_none());

    let invite = json!({ "email": "nadia@company.com", "firstName": "Nadia", "lastName": "Rahman" });
    let resp = test::call_service(&app, post("/api/admin/employees/invite", Some(&admin), invite.clone()).to_request()).await;
    assert_eq!(resp.status(), StatusCode::CREATED);
    let resp = test::call_service(&app, post("/api/admin/employees/invite", Some(&admin), invite).to_request()).await;
    assert_eq!(resp.status(), StatusCode::CONFLICT);

    let register = json!({ "email": "nadia@company.com", "password": "password1" });
    let resp = test::call_service(&app, post("/auth/register", None, register.clone()).to_request()).await;
    assert_eq!(resp.status(), StatusCode::CREATED);
    let resp = test::call_service(&app, post("/auth/register", None, register).to_request()).await;
    assert_eq!(resp.status(), StatusCode::CONFLICT);

    let login = json!({ "email": "nadia@company.com", "password": "wrong-password" });
    let resp = test::call_service(&app, post("/auth/login", None, login).to_request()).await;
    assert_eq!(resp.status(), StatusCode::UNAUTHORIZED);

    let forgot = json!({ "email": "nobody@company.com" });
    let resp = test::call_service(&app, post("/auth/forgot-password", None, forgot).to_request()).await;
    assert_eq!(resp.status(), StatusCode::OK);
}
