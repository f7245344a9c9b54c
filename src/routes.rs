use crate::{
    api::{admin, attendance, locations, profile},
    auth::{handlers, middleware::auth_middleware},
    config::Config,
};
use actix_governor::{
    Governor, GovernorConfig, GovernorConfigBuilder, PeerIpKeyExtractor, governor::middleware::NoOpMiddleware,
};
use actix_web::{middleware::from_fn, web};
use anyhow::anyhow;
use std::sync::Arc;

type LimiterConfig = GovernorConfig<PeerIpKeyExtractor, NoOpMiddleware>;

/// Per-route rate limits, validated once at startup.
#[derive(Clone)]
pub struct RateLimits {
    login: LimiterConfig,
    register: LimiterConfig,
    protected: LimiterConfig,
}

impl RateLimits {
    pub fn from_config(config: &Config) -> anyhow::Result<Self> {
        Ok(Self {
            login: limiter_config("RATE_LOGIN_PER_MIN", config.rate_login_per_min)?,
            register: limiter_config("RATE_REGISTER_PER_MIN", config.rate_register_per_min)?,
            protected: limiter_config("RATE_PROTECTED_PER_MIN", config.rate_protected_per_min)?,
        })
    }
}

fn limiter_config(name: &str, requests_per_min: u32) -> anyhow::Result<LimiterConfig> {
    let per_ms = if requests_per_min == 0 {
        1
    } else {
        (60_000 / requests_per_min as u64).max(1)
    };
    GovernorConfigBuilder::default()
        .per_millisecond(per_ms)
        .burst_size(requests_per_min.max(1))
        .key_extractor(PeerIpKeyExtractor)
        .finish()
        .ok_or_else(|| anyhow!("{} does not describe a valid rate limit", name))
}

pub fn configure(cfg: &mut web::ServiceConfig, config: &Config, limits: &RateLimits) {
    let login_limiter = Arc::new(Governor::new(&limits.login));
    let register_limiter = Arc::new(Governor::new(&limits.register));
    let protected_limiter = Arc::new(Governor::new(&limits.protected));

    // Public routes
    cfg.service(
        web::scope("/auth")
            .service(
                web::resource("/login")
                    .wrap(login_limiter.clone())
                    .route(web::post().to(handlers::login)),
            )
            .service(
                web::resource("/register")
                    .wrap(register_limiter.clone())
                    .route(web::post().to(handlers::register)),
            )
            .service(
                web::resource("/forgot-password")
                    .wrap(register_limiter.clone())
                    .route(web::post().to(handlers::forgot_password)),
            )
            .service(
                web::resource("/reset-password")
                    .wrap(register_limiter)
                    .route(web::post().to(handlers::reset_password)),
            ),
    );

    // Protected routes
    cfg.service(
        web::scope(&config.api_prefix)
            .wrap(from_fn(auth_middleware))
            .wrap(protected_limiter)
            .service(web::resource("/user").route(web::get().to(profile::current_user)))
            .service(
                web::resource("/profile")
                    .route(web::get().to(profile::get_profile))
                    .route(web::put().to(profile::update_profile)),
            )
            .service(
                web::scope("/attendance")
                    .service(web::resource("/checkin").route(web::post().to(attendance::check_in)))
                    .service(web::resource("/checkout").route(web::post().to(attendance::check_out)))
                    .service(web::resource("/today").route(web::get().to(attendance::today)))
                    .service(web::resource("/history").route(web::get().to(attendance::history)))
                    // /attendance/{id}
                    .service(web::resource("/{id}").route(web::get().to(attendance::get_record))),
            )
            .service(
                web::scope("/admin")
                    .service(web::resource("/stats").route(web::get().to(admin::stats)))
                    .service(web::resource("/attendance").route(web::get().to(admin::attendance)))
                    .service(web::resource("/employees").route(web::get().to(admin::list_employees)))
                    .service(web::resource("/employees/invite").route(web::post().to(admin::invite)))
                    .service(
                        web::resource("/employees/invitations").route(web::get().to(admin::list_invitations)),
                    )
                    .service(
                        web::resource("/employees/invitations/{id}")
                            .route(web::delete().to(admin::delete_invitation)),
                    )
                    // /admin/employees/{id}
                    .service(web::resource("/employees/{id}").route(web::put().to(admin::update_employee))),
            )
            .service(
                web::scope("/locations")
                    .service(
                        web::resource("")
                            .route(web::get().to(locations::list_locations))
                            .route(web::post().to(locations::create_location)),
                    )
                    .service(web::resource("/verify").route(web::post().to(locations::verify_location))),
            ),
    );
}
