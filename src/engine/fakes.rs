use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use uuid::Uuid;

use super::Engine;
use crate::{
    entities::{
        Coordinates, Driver, DriverStatus, Location, NewUser, PricedClass, RouteInfo, User,
        Vehicle,
    },
    error::{invalid_input_error, network_error, not_found_error, Error},
    external::{BackendService, MapsService, PlaceSuggestion, PlaceSuggestions},
    polyline,
    session::MemorySessionStore,
};

pub const PICKUP_ID: &str = "ChIJgT_rKAB_PzsRBttnRY6jpz8";
pub const DROP_ID: &str = "ChIJkRUcFP9-PzsRPJOvVDoV9Q4";
pub const OTHER_PICKUP_ID: &str = "ChIJAwkZQ1R-PzsRhv0Dv_s7BBA";
pub const OTHER_DROP_ID: &str = "ChIJm4S3B1d-PzsRP51UdJChpok";

pub struct FakeMaps {
    pub places: HashMap<String, Location>,
    pub route: Result<RouteInfo, Error>,
    pub latency: Duration,
    pub place_calls: AtomicUsize,
    pub route_calls: AtomicUsize,
}

impl FakeMaps {
    pub fn new() -> Self {
        let places = [
            (PICKUP_ID, 12.9756, 77.6066, "MG Road"),
            (DROP_ID, 12.9784, 77.6408, "Indiranagar"),
            (OTHER_PICKUP_ID, 12.9352, 77.6245, "Koramangala"),
            (OTHER_DROP_ID, 13.1986, 77.7066, "Airport"),
        ]
        .into_iter()
        .map(|(id, lat, lng, description)| {
            (
                id.to_string(),
                Location::new(Coordinates { lat, lng }, description.into()),
            )
        })
        .collect();

        Self {
            places,
            route: Ok(RouteInfo::new(
                polyline::decode("_p~iF~ps|U_ulLnnqC_mqNvxq`@"),
                Some(1260),
                Some(8412),
            )),
            latency: Duration::from_millis(0),
            place_calls: AtomicUsize::new(0),
            route_calls: AtomicUsize::new(0),
        }
    }

    pub fn with_route(mut self, route: Result<RouteInfo, Error>) -> Self {
        self.route = route;
        self
    }

    pub fn with_latency(mut self, latency: Duration) -> Self {
        self.latency = latency;
        self
    }

    pub fn calls(&self) -> usize {
        self.place_calls.load(Ordering::SeqCst) + self.route_calls.load(Ordering::SeqCst)
    }

    async fn wait(&self) {
        if !self.latency.is_zero() {
            tokio::time::sleep(self.latency).await;
        }
    }
}

#[async_trait]
impl MapsService for FakeMaps {
    async fn find_place_suggestions(
        &self,
        input: String,
        _location: Coordinates,
        _radius: f64,
        _session_token: String,
    ) -> Result<PlaceSuggestions, Error> {
        let input = input.to_lowercase();

        let mut found: PlaceSuggestions = self
            .places
            .iter()
            .filter(|(_, location)| location.description.to_lowercase().contains(&input))
            .map(|(id, location)| PlaceSuggestion {
                place_id: id.clone(),
                description: location.description.clone(),
            })
            .collect();
        found.sort_by(|a, b| a.description.cmp(&b.description));

        Ok(found)
    }

    async fn resolve_place(
        &self,
        place_id: String,
        _session_token: String,
    ) -> Result<Location, Error> {
        self.place_calls.fetch_add(1, Ordering::SeqCst);
        self.wait().await;

        self.places
            .get(&place_id)
            .cloned()
            .ok_or_else(|| not_found_error())
    }

    async fn fetch_route(
        &self,
        _origin: Coordinates,
        _destination: Coordinates,
    ) -> Result<RouteInfo, Error> {
        self.route_calls.fetch_add(1, Ordering::SeqCst);
        self.wait().await;

        self.route.clone()
    }
}

pub struct FakeBackend {
    pub prices: Result<Vec<PricedClass>, Error>,
    pub price_calls: AtomicUsize,
    pub users: Mutex<HashMap<String, User>>,
    pub vehicles: Mutex<HashMap<Uuid, Vehicle>>,
}

impl FakeBackend {
    pub fn new() -> Self {
        let prices = [("Bike", 42.2), ("Auto", 60.0), ("Car", 87.6)]
            .into_iter()
            .map(|(vehicle_class, price)| PricedClass {
                vehicle_class: vehicle_class.into(),
                price,
            })
            .collect();

        Self {
            prices: Ok(prices),
            price_calls: AtomicUsize::new(0),
            users: Mutex::new(HashMap::new()),
            vehicles: Mutex::new(HashMap::new()),
        }
    }

    pub fn with_prices(mut self, prices: Result<Vec<PricedClass>, Error>) -> Self {
        self.prices = prices;
        self
    }

    pub fn with_user(self, user: User) -> Self {
        if let Ok(mut users) = self.users.lock() {
            users.insert(user.phone_number.clone(), user);
        }
        self
    }

    pub fn price_calls(&self) -> usize {
        self.price_calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl BackendService for FakeBackend {
    async fn fetch_prices(
        &self,
        _pickup: Coordinates,
        _drop: Coordinates,
    ) -> Result<Vec<PricedClass>, Error> {
        self.price_calls.fetch_add(1, Ordering::SeqCst);
        self.prices.clone()
    }

    async fn check_user(&self, phone_number: String) -> Result<Option<User>, Error> {
        Ok(self.users.lock().unwrap().get(&phone_number).cloned())
    }

    async fn create_user(&self, user: NewUser) -> Result<User, Error> {
        let mut users = self.users.lock().unwrap();

        if users.contains_key(&user.phone_number) {
            return Err(invalid_input_error());
        }

        let created = User {
            id: Uuid::new_v4(),
            phone_number: user.phone_number.clone(),
            name: user.name,
            role: user.role,
        };
        users.insert(user.phone_number, created.clone());

        Ok(created)
    }

    async fn update_driver_status(
        &self,
        driver_id: Uuid,
        status: DriverStatus,
    ) -> Result<Driver, Error> {
        let mut driver = Driver::new(driver_id);
        driver.status = status;
        Ok(driver)
    }

    async fn add_vehicle(&self, driver_id: Uuid, vehicle: Vehicle) -> Result<Vehicle, Error> {
        self.vehicles
            .lock()
            .unwrap()
            .insert(driver_id, vehicle.clone());
        Ok(vehicle)
    }

    async fn find_vehicle(&self, driver_id: Uuid) -> Result<Vehicle, Error> {
        self.vehicles
            .lock()
            .unwrap()
            .get(&driver_id)
            .cloned()
            .ok_or_else(|| invalid_input_error())
    }
}

pub fn pricing_outage() -> Result<Vec<PricedClass>, Error> {
    Err(network_error())
}

pub fn engine(maps: Arc<FakeMaps>, backend: Arc<FakeBackend>) -> Engine {
    Engine::new(maps, backend, Arc::new(MemorySessionStore::new()))
}
