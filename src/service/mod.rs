pub mod account;
pub mod attendance;
pub mod employee;
pub mod geofence;
pub mod hours;
pub mod invitation;
pub mod mailer;
pub mod stats;
