pub mod backend;
pub mod google_maps;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use uuid::Uuid;

use crate::entities::{
    Coordinates, Driver, DriverStatus, Location, NewUser, PricedClass, RouteInfo, User, Vehicle,
};
use crate::error::{invalid_input_error, upstream_error, Error};

pub use backend::Backend;
pub use google_maps::GoogleMaps;

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct PlaceSuggestion {
    pub place_id: String,
    pub description: String,
}

pub type PlaceSuggestions = Vec<PlaceSuggestion>;

/// Places, geocoding and directions.
#[async_trait]
pub trait MapsService: Send + Sync {
    async fn find_place_suggestions(
        &self,
        input: String,
        location: Coordinates,
        radius: f64,
        session_token: String,
    ) -> Result<PlaceSuggestions, Error>;

    async fn resolve_place(&self, place_id: String, session_token: String)
        -> Result<Location, Error>;

    async fn fetch_route(
        &self,
        origin: Coordinates,
        destination: Coordinates,
    ) -> Result<RouteInfo, Error>;
}

/// The rider/driver backend REST API.
#[async_trait]
pub trait BackendService: Send + Sync {
    async fn fetch_prices(
        &self,
        pickup: Coordinates,
        drop: Coordinates,
    ) -> Result<Vec<PricedClass>, Error>;

    async fn check_user(&self, phone_number: String) -> Result<Option<User>, Error>;

    async fn create_user(&self, user: NewUser) -> Result<User, Error>;

    async fn update_driver_status(
        &self,
        driver_id: Uuid,
        status: DriverStatus,
    ) -> Result<Driver, Error>;

    async fn add_vehicle(&self, driver_id: Uuid, vehicle: Vehicle) -> Result<Vehicle, Error>;

    async fn find_vehicle(&self, driver_id: Uuid) -> Result<Vehicle, Error>;
}

pub type DynMaps = Arc<dyn MapsService>;
pub type DynBackend = Arc<dyn BackendService>;

fn check_status(status_code: u16) -> Result<(), Error> {
    if (400..500).contains(&status_code) {
        return Err(invalid_input_error());
    } else if !(200..300).contains(&status_code) {
        return Err(upstream_error());
    }

    Ok(())
}

#[test]
fn status_codes() {
    assert!(check_status(200).is_ok());
    assert!(check_status(201).is_ok());
    assert_eq!(check_status(404).unwrap_err().code, 101);
    assert_eq!(check_status(503).unwrap_err().code, 4);
}
