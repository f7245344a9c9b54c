use chrono::{NaiveDate, NaiveDateTime};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use strum_macros::{AsRefStr, Display, EnumString};
use utoipa::ToSchema;
use validator::Validate;

#[derive(Debug, Copy, Clone, Eq, PartialEq, Serialize, Deserialize, ToSchema, Display, EnumString, AsRefStr)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum AttendanceStatus {
    CheckedIn,
    CheckedOut,
}

/// A coordinate reported by the client, stored as `{lat, lng, address}`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, ToSchema, Validate)]
#[schema(example = json!({ "lat": 23.8103, "lng": 90.4125, "address": "Lat: 23.810300, Lng: 90.412500" }))]
pub struct GeoPoint {
    #[validate(range(min = -90.0, max = 90.0))]
    pub lat: f64,
    #[validate(range(min = -180.0, max = 180.0))]
    pub lng: f64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub address: Option<String>,
}

impl GeoPoint {
    /// Range check; NaN slips through `range`, so finiteness is checked here.
    pub fn is_valid(&self) -> bool {
        self.lat.is_finite() && self.lng.is_finite() && self.validate().is_ok()
    }
}

/// Location and selfie submitted with a check-in or check-out.
#[derive(Debug, Clone, PartialEq)]
pub struct Capture {
    pub location: GeoPoint,
    /// Opaque payload, usually a base64 data URI. Content is not inspected.
    pub photo: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct AttendanceRecord {
    pub id: String,
    pub user_id: String,
    pub check_in_time: Option<NaiveDateTime>,
    pub check_out_time: Option<NaiveDateTime>,
    pub check_in_location: Option<GeoPoint>,
    pub check_out_location: Option<GeoPoint>,
    pub check_in_photo: Option<String>,
    pub check_out_photo: Option<String>,
    pub status: AttendanceStatus,
    #[schema(value_type = Option<String>, example = "8.50")]
    pub hours_worked: Option<Decimal>,
    /// Logical day the record belongs to (server-local)
    pub date: NaiveDate,
    pub created_at: NaiveDateTime,
    pub updated_at: NaiveDateTime,
}

impl AttendanceRecord {
    /// A fresh open record for `user_id` checked in at `now`.
    pub fn open(id: String, user_id: &str, now: NaiveDateTime, capture: Capture) -> Self {
        Self {
            id,
            user_id: user_id.to_string(),
            check_in_time: Some(now),
            check_out_time: None,
            check_in_location: Some(capture.location),
            check_out_location: None,
            check_in_photo: Some(capture.photo),
            check_out_photo: None,
            status: AttendanceStatus::CheckedIn,
            hours_worked: None,
            date: now.date(),
            created_at: now,
            updated_at: now,
        }
    }

    pub fn is_open(&self) -> bool {
        self.status == AttendanceStatus::CheckedIn
    }
}

/// Fields written by a successful check-out.
#[derive(Debug, Clone)]
pub struct CheckOutUpdate {
    pub check_out_time: NaiveDateTime,
    pub location: GeoPoint,
    pub photo: String,
    pub hours_worked: Decimal,
}

impl CheckOutUpdate {
    pub fn apply(self, record: &mut AttendanceRecord) {
        record.check_out_time = Some(self.check_out_time);
        record.check_out_location = Some(self.location);
        record.check_out_photo = Some(self.photo);
        record.hours_worked = Some(self.hours_worked);
        record.status = AttendanceStatus::CheckedOut;
        record.updated_at = self.check_out_time;
    }
}
