//! Great-circle geofencing against the active work locations.

use std::sync::Arc;

use serde::{Deserialize, Serialize};
use utoipa::ToSchema;
use uuid::Uuid;

use crate::{
    auth::auth::AuthContext,
    clock::Clock,
    error::AppError,
    model::{
        attendance::GeoPoint,
        work_location::{DEFAULT_RADIUS_METERS, WorkLocation},
    },
    store::RecordStore,
};

/// Mean earth radius in meters.
const EARTH_RADIUS_M: f64 = 6_371_000.0;

/// Haversine distance between two coordinates, in meters.
pub fn distance_meters(lat1: f64, lng1: f64, lat2: f64, lng2: f64) -> f64 {
    let (phi1, phi2) = (lat1.to_radians(), lat2.to_radians());
    let d_phi = (lat2 - lat1).to_radians();
    let d_lambda = (lng2 - lng1).to_radians();

    let a = (d_phi / 2.0).sin().powi(2) + phi1.cos() * phi2.cos() * (d_lambda / 2.0).sin().powi(2);
    let c = 2.0 * a.sqrt().atan2((1.0 - a).sqrt());

    EARTH_RADIUS_M * c
}

#[derive(Debug, Clone, PartialEq, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct GeofenceCheck {
    pub within_geofence: bool,
    /// Nearest location whose radius contains the point
    pub location_id: Option<String>,
    /// Distance in meters to the matched location, or to the nearest one
    pub distance_meters: Option<f64>,
}

/// Matches `point` against `locations`; inactive locations are ignored.
pub fn check_point(point: &GeoPoint, locations: &[WorkLocation]) -> GeofenceCheck {
    let distances = locations
        .iter()
        .filter(|l| l.is_active)
        .map(|l| (l, distance_meters(point.lat, point.lng, l.latitude, l.longitude)));

    let mut nearest: Option<f64> = None;
    let mut matched: Option<(&WorkLocation, f64)> = None;

    for (location, distance) in distances {
        nearest = Some(nearest.map_or(distance, |n| n.min(distance)));
        if distance <= location.radius && matched.is_none_or(|(_, best)| distance < best) {
            matched = Some((location, distance));
        }
    }

    match matched {
        Some((location, distance)) => GeofenceCheck {
            within_geofence: true,
            location_id: Some(location.id.clone()),
            distance_meters: Some(distance),
        },
        None => GeofenceCheck {
            within_geofence: false,
            location_id: None,
            distance_meters: nearest,
        },
    }
}

#[derive(Debug, Deserialize, ToSchema)]
pub struct NewWorkLocation {
    #[schema(example = "Head office")]
    pub name: String,
    pub address: String,
    pub latitude: f64,
    pub longitude: f64,
    /// meters, defaults to 100
    pub radius: Option<f64>,
}

pub struct LocationService {
    store: Arc<dyn RecordStore>,
    clock: Arc<dyn Clock>,
}

impl LocationService {
    pub fn new(store: Arc<dyn RecordStore>, clock: Arc<dyn Clock>) -> Self {
        Self { store, clock }
    }

    pub async fn active_locations(&self) -> Result<Vec<WorkLocation>, AppError> {
        Ok(self.store.list_active_locations().await?)
    }

    pub async fn create(&self, ctx: &AuthContext, input: NewWorkLocation) -> Result<WorkLocation, AppError> {
        ctx.require_admin()?;

        let radius = input.radius.unwrap_or(DEFAULT_RADIUS_METERS);
        if !(radius.is_finite() && radius > 0.0) {
            return Err(AppError::validation("radius must be greater than zero"));
        }
        if input.name.trim().is_empty() {
            return Err(AppError::validation("name is required"));
        }
        let center = GeoPoint { lat: input.latitude, lng: input.longitude, address: None };
        if !center.is_valid() {
            return Err(AppError::validation("latitude/longitude out of range"));
        }

        let location = WorkLocation {
            id: Uuid::new_v4().to_string(),
            name: input.name.trim().to_string(),
            address: input.address,
            latitude: input.latitude,
            longitude: input.longitude,
            radius,
            is_active: true,
            created_at: self.clock.now(),
        };
        self.store.insert_location(&location).await?;

        tracing::info!(location_id = %location.id, name = %location.name, radius, "Work location created");
        Ok(location)
    }

    /// Standalone check; does not touch any attendance record.
    pub async fn verify(&self, point: &GeoPoint) -> Result<GeofenceCheck, AppError> {
        if !point.is_valid() {
            return Err(AppError::validation("latitude/longitude out of range"));
        }
        let locations = self.store.list_active_locations().await?;
        Ok(check_point(point, &locations))
    }
}
