pub mod admin;
pub mod attendance;
pub mod locations;
pub mod profile;
