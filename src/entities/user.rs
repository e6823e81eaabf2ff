use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::error::{validation_error, Error};

#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Role {
    Rider,
    Driver,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct User {
    pub id: Uuid,
    pub phone_number: String,
    pub name: String,
    pub role: Role,
}

impl User {
    pub fn is_driver(&self) -> bool {
        self.role == Role::Driver
    }
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct NewUser {
    pub phone_number: String,
    pub name: String,
    pub role: Role,
}

impl NewUser {
    pub fn validate(&self) -> Result<(), Error> {
        if self.phone_number.trim().is_empty() {
            return Err(validation_error("phone number is required"));
        }

        if self.name.trim().is_empty() {
            return Err(validation_error("name is required"));
        }

        Ok(())
    }
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(tag = "name", rename_all = "snake_case")]
pub enum SignIn {
    Registered { user: User },
    Unregistered { phone_number: String },
}

/// Cached flags of the signed in client.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct SessionStatus {
    pub is_logged_in: bool,
    pub onboarding_seen: bool,
    pub user_id: Option<Uuid>,
    pub driver_id: Option<Uuid>,
}

#[test]
fn new_user_validation() {
    let mut user = NewUser {
        phone_number: "+919800000000".into(),
        name: "Asha".into(),
        role: Role::Rider,
    };
    assert!(user.validate().is_ok());

    user.name = "".into();
    assert_eq!(user.validate().unwrap_err().message, "name is required");

    user.phone_number = "".into();
    assert_eq!(
        user.validate().unwrap_err().message,
        "phone number is required"
    );
}
