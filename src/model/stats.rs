use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
#[schema(example = json!({ "totalEmployees": 10, "presentToday": 6, "lateArrivals": 2, "absent": 4 }))]
pub struct AttendanceStats {
    pub total_employees: u64,
    pub present_today: u64,
    pub late_arrivals: u64,
    pub absent: u64,
}
