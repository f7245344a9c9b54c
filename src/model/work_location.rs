use chrono::NaiveDateTime;
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

pub const DEFAULT_RADIUS_METERS: f64 = 100.0;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct WorkLocation {
    pub id: String,
    #[schema(example = "Head office")]
    pub name: String,
    pub address: String,
    pub latitude: f64,
    pub longitude: f64,
    /// meters
    #[schema(example = 100.0)]
    pub radius: f64,
    pub is_active: bool,
    pub created_at: NaiveDateTime,
}
