use axum::extract::{Extension, Json};
use serde::{Deserialize, Serialize};

use crate::entities::{Driver, DriverStatus, Vehicle};
use crate::error::Error;
use crate::server::DynAPI;

#[derive(Serialize, Deserialize)]
pub struct UpdateStatusParams {
    status: DriverStatus,
}

pub async fn update_status(
    Extension(api): Extension<DynAPI>,
    Json(params): Json<UpdateStatusParams>,
) -> Result<Json<Driver>, Error> {
    let driver = api.update_driver_status(params.status).await?;

    Ok(driver.into())
}

pub async fn add_vehicle(
    Extension(api): Extension<DynAPI>,
    Json(vehicle): Json<Vehicle>,
) -> Result<Json<Vehicle>, Error> {
    let vehicle = api.add_vehicle(vehicle).await?;

    Ok(vehicle.into())
}

pub async fn find_vehicle(Extension(api): Extension<DynAPI>) -> Result<Json<Vehicle>, Error> {
    let vehicle = api.find_vehicle().await?;

    Ok(vehicle.into())
}
