use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::error::{validation_error, Error};

/// Drivers share their id with the user account they were registered with.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Driver {
    pub id: Uuid,
    pub status: Status,
}

#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Status {
    Offline,
    Online,
}

impl Status {
    pub fn name(&self) -> String {
        match self {
            Self::Offline => "offline".into(),
            Self::Online => "online".into(),
        }
    }
}

impl Driver {
    pub fn new(user_id: Uuid) -> Self {
        Self {
            id: user_id,
            status: Status::Offline,
        }
    }

    pub fn is_online(&self) -> bool {
        self.status == Status::Online
    }
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Vehicle {
    pub vehicle_class: String,
    pub model: String,
    pub registration_number: String,
    #[serde(default)]
    pub color: Option<String>,
}

impl Vehicle {
    pub fn validate(&self) -> Result<(), Error> {
        if self.registration_number.trim().is_empty() {
            return Err(validation_error("registration number is required"));
        }

        if self.vehicle_class.trim().is_empty() {
            return Err(validation_error("vehicle class is required"));
        }

        Ok(())
    }
}

#[test]
fn new_driver_is_offline() {
    let driver = Driver::new(Uuid::new_v4());

    assert!(!driver.is_online());
    assert_eq!(driver.status.name(), "offline");
}

#[test]
fn vehicle_validation() {
    let mut vehicle = Vehicle {
        vehicle_class: "Auto".into(),
        model: "Bajaj RE".into(),
        registration_number: "KA 01 AB 1234".into(),
        color: None,
    };
    assert!(vehicle.validate().is_ok());

    vehicle.registration_number = " ".into();
    assert_eq!(
        vehicle.validate().unwrap_err().message,
        "registration number is required"
    );
}
