use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::{check_status, BackendService};
use crate::{
    config::Config,
    entities::{Coordinates, Driver, DriverStatus, NewUser, PricedClass, User, Vehicle},
    error::{no_price_data_error, upstream_error, Error},
};

/// REST client for the rider/driver backend.
#[derive(Clone, Debug)]
pub struct Backend {
    client: reqwest::Client,
    api_base: String,
}

#[derive(Serialize)]
struct CheckUserParams<'a> {
    phone_number: &'a str,
}

#[derive(Deserialize)]
struct CheckUserResponse {
    exists: bool,
    user: Option<User>,
}

#[derive(Serialize)]
struct UpdateStatusParams {
    status: DriverStatus,
}

#[derive(Serialize)]
struct PricingParams {
    pickup_lat: f64,
    pickup_lng: f64,
    drop_lat: f64,
    drop_lng: f64,
}

#[derive(Deserialize)]
struct PricingResponse {
    #[serde(default)]
    prices: Vec<PricedClass>,
}

impl Backend {
    pub fn new(api_base: &str) -> Self {
        Self {
            client: reqwest::Client::new(),
            api_base: api_base.trim_end_matches('/').into(),
        }
    }

    pub fn from_config(config: &Config) -> Self {
        Self::new(&config.backend_api_base)
    }

    fn url(&self, path: &str) -> String {
        format!("{}{}", self.api_base, path)
    }
}

#[async_trait]
impl BackendService for Backend {
    #[tracing::instrument(skip(self))]
    async fn fetch_prices(
        &self,
        pickup: Coordinates,
        drop: Coordinates,
    ) -> Result<Vec<PricedClass>, Error> {
        let params = PricingParams {
            pickup_lat: pickup.lat,
            pickup_lng: pickup.lng,
            drop_lat: drop.lat,
            drop_lng: drop.lng,
        };

        let res = self
            .client
            .post(self.url("/pricing"))
            .json(&params)
            .send()
            .await?;

        check_status(res.status().as_u16())?;

        let data: PricingResponse = res.json().await?;

        prices(data)
    }

    #[tracing::instrument(skip(self))]
    async fn check_user(&self, phone_number: String) -> Result<Option<User>, Error> {
        let res = self
            .client
            .post(self.url("/users/check"))
            .json(&CheckUserParams {
                phone_number: &phone_number,
            })
            .send()
            .await?;

        check_status(res.status().as_u16())?;

        let data: CheckUserResponse = res.json().await?;

        registered_user(data)
    }

    #[tracing::instrument(skip(self))]
    async fn create_user(&self, user: NewUser) -> Result<User, Error> {
        let res = self
            .client
            .post(self.url("/users"))
            .json(&user)
            .send()
            .await?;

        check_status(res.status().as_u16())?;

        Ok(res.json().await?)
    }

    #[tracing::instrument(skip(self))]
    async fn update_driver_status(
        &self,
        driver_id: Uuid,
        status: DriverStatus,
    ) -> Result<Driver, Error> {
        let res = self
            .client
            .patch(self.url(&format!("/drivers/{}/status", driver_id)))
            .json(&UpdateStatusParams { status })
            .send()
            .await?;

        check_status(res.status().as_u16())?;

        Ok(res.json().await?)
    }

    #[tracing::instrument(skip(self))]
    async fn add_vehicle(&self, driver_id: Uuid, vehicle: Vehicle) -> Result<Vehicle, Error> {
        let res = self
            .client
            .post(self.url(&format!("/drivers/{}/vehicle", driver_id)))
            .json(&vehicle)
            .send()
            .await?;

        check_status(res.status().as_u16())?;

        Ok(res.json().await?)
    }

    #[tracing::instrument(skip(self))]
    async fn find_vehicle(&self, driver_id: Uuid) -> Result<Vehicle, Error> {
        let res = self
            .client
            .get(self.url(&format!("/drivers/{}/vehicle", driver_id)))
            .send()
            .await?;

        check_status(res.status().as_u16())?;

        Ok(res.json().await?)
    }
}

fn prices(data: PricingResponse) -> Result<Vec<PricedClass>, Error> {
    if data.prices.is_empty() {
        return Err(no_price_data_error());
    }

    Ok(data.prices)
}

fn registered_user(data: CheckUserResponse) -> Result<Option<User>, Error> {
    match (data.exists, data.user) {
        (true, Some(user)) => Ok(Some(user)),
        (false, _) => Ok(None),
        // an existing user has to come with its record
        (true, None) => Err(upstream_error()),
    }
}

#[test]
fn pricing_response() {
    let data = serde_json::from_value(serde_json::json!({
        "prices": [
            { "vehicle_class": "Bike", "price": 42.2 },
            { "vehicle_class": "Car", "price": 87.6 }
        ]
    }))
    .unwrap();

    let found = prices(data).unwrap();
    assert_eq!(found.len(), 2);
    assert_eq!(found[1].vehicle_class, "Car");

    let empty = serde_json::from_value(serde_json::json!({ "prices": [] })).unwrap();
    assert_eq!(prices(empty).unwrap_err(), no_price_data_error());

    let missing = serde_json::from_value(serde_json::json!({})).unwrap();
    assert_eq!(prices(missing).unwrap_err(), no_price_data_error());
}

#[test]
fn check_user_response() {
    let id = Uuid::new_v4();

    let registered = serde_json::from_value(serde_json::json!({
        "exists": true,
        "user": { "id": id, "phone_number": "+919800000000", "name": "Ravi", "role": "driver" }
    }))
    .unwrap();
    let user = registered_user(registered).unwrap().unwrap();
    assert_eq!(user.id, id);
    assert!(user.is_driver());

    let unknown = serde_json::from_value(serde_json::json!({ "exists": false })).unwrap();
    assert_eq!(registered_user(unknown).unwrap(), None);

    let broken = serde_json::from_value(serde_json::json!({ "exists": true })).unwrap();
    assert_eq!(registered_user(broken).unwrap_err(), upstream_error());
}

#[test]
fn request_payloads() {
    let params = serde_json::to_value(UpdateStatusParams {
        status: DriverStatus::Online,
    })
    .unwrap();
    assert_eq!(params, serde_json::json!({ "status": "online" }));

    let backend = Backend::new("http://localhost:8080/");
    assert_eq!(backend.url("/pricing"), "http://localhost:8080/pricing");
}
