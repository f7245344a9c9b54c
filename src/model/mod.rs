pub mod attendance;
pub mod invitation;
pub mod password_reset;
pub mod role;
pub mod stats;
pub mod user;
pub mod work_location;
