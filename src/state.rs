use std::sync::Arc;
use std::time::Duration;

use crate::{
    clock::Clock,
    config::Config,
    service::{
        account::{AccountService, AccountSettings},
        attendance::{AttendancePolicy, AttendanceService},
        employee::EmployeeService,
        geofence::LocationService,
        invitation::InvitationService,
        mailer::Mailer,
        stats::StatsService,
    },
    store::RecordStore,
};

/// Services shared by every worker, wired to one store and one clock.
pub struct AppState {
    pub attendance: AttendanceService,
    pub stats: StatsService,
    pub locations: LocationService,
    pub invitations: Arc<InvitationService>,
    pub accounts: AccountService,
    pub employees: EmployeeService,
}

impl AppState {
    pub fn new(store: Arc<dyn RecordStore>, clock: Arc<dyn Clock>, mailer: Arc<dyn Mailer>, config: &Config) -> Self {
        let invitations = Arc::new(InvitationService::new(
            store.clone(),
            clock.clone(),
            config.invitation_ttl_days,
        ));

        Self {
            attendance: AttendanceService::new(
                store.clone(),
                clock.clone(),
                AttendancePolicy { enforce_geofence: config.enforce_geofence },
            ),
            stats: StatsService::new(
                store.clone(),
                clock.clone(),
                config.late_cutoff,
                Duration::from_secs(config.stats_cache_ttl_secs),
            ),
            locations: LocationService::new(store.clone(), clock.clone()),
            accounts: AccountService::new(
                store.clone(),
                clock.clone(),
                mailer,
                invitations.clone(),
                AccountSettings::from(config),
            ),
            employees: EmployeeService::new(store, clock),
            invitations,
        }
    }
}
