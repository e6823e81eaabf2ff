use super::Engine;

use async_trait::async_trait;
use uuid::Uuid;

use crate::{
    api::AccountAPI,
    entities::{Driver, DriverStatus, NewUser, SessionStatus, SignIn, User, Vehicle},
    error::{invalid_input_error, validation_error, Error},
    session::SessionKey,
};

const TRUE: &str = "true";

impl Engine {
    async fn cache_user(&self, user: &User) -> Result<(), Error> {
        self.store
            .set(SessionKey::UserId, user.id.to_string())
            .await?;
        self.store.set(SessionKey::IsLoggedIn, TRUE.into()).await?;

        if user.is_driver() {
            self.store
                .set(SessionKey::DriverId, user.id.to_string())
                .await?;
        }

        Ok(())
    }

    async fn flag(&self, key: SessionKey) -> Result<bool, Error> {
        Ok(self.store.get(key).await?.as_deref() == Some(TRUE))
    }

    async fn cached_id(&self, key: SessionKey) -> Result<Option<Uuid>, Error> {
        match self.store.get(key).await? {
            Some(value) => Ok(Some(
                Uuid::parse_str(&value).map_err(|_| invalid_input_error())?,
            )),
            None => Ok(None),
        }
    }

    async fn signed_in_driver(&self) -> Result<Uuid, Error> {
        self.cached_id(SessionKey::DriverId)
            .await?
            .ok_or_else(|| validation_error("driver is not signed in"))
    }
}

#[async_trait]
impl AccountAPI for Engine {
    #[tracing::instrument(skip(self))]
    async fn sign_in(&self, phone_number: String) -> Result<SignIn, Error> {
        if phone_number.trim().is_empty() {
            return Err(validation_error("phone number is required"));
        }

        match self.backend.check_user(phone_number.clone()).await? {
            Some(user) => {
                self.cache_user(&user).await?;
                tracing::info!("signed in user {}", user.id);
                Ok(SignIn::Registered { user })
            }
            None => Ok(SignIn::Unregistered { phone_number }),
        }
    }

    #[tracing::instrument(skip(self))]
    async fn register(&self, user: NewUser) -> Result<User, Error> {
        user.validate()?;

        let user = self.backend.create_user(user).await?;
        self.cache_user(&user).await?;

        tracing::info!("registered user {} as {:?}", user.id, user.role);

        Ok(user)
    }

    // onboarding only runs once per device, it survives sign out
    #[tracing::instrument(skip(self))]
    async fn sign_out(&self) -> Result<(), Error> {
        let onboarding_seen = self.flag(SessionKey::OnboardingSeen).await?;

        self.store.clear().await?;

        if onboarding_seen {
            self.store
                .set(SessionKey::OnboardingSeen, TRUE.into())
                .await?;
        }

        Ok(())
    }

    #[tracing::instrument(skip(self))]
    async fn session_status(&self) -> Result<SessionStatus, Error> {
        Ok(SessionStatus {
            is_logged_in: self.flag(SessionKey::IsLoggedIn).await?,
            onboarding_seen: self.flag(SessionKey::OnboardingSeen).await?,
            user_id: self.cached_id(SessionKey::UserId).await?,
            driver_id: self.cached_id(SessionKey::DriverId).await?,
        })
    }

    #[tracing::instrument(skip(self))]
    async fn mark_onboarding_seen(&self) -> Result<SessionStatus, Error> {
        self.store
            .set(SessionKey::OnboardingSeen, TRUE.into())
            .await?;

        self.session_status().await
    }

    #[tracing::instrument(skip(self))]
    async fn update_driver_status(&self, status: DriverStatus) -> Result<Driver, Error> {
        let driver_id = self.signed_in_driver().await?;

        let driver = self.backend.update_driver_status(driver_id, status).await?;

        tracing::info!(
            status = %driver.status.name(),
            "driver {} status updated",
            driver.id
        );

        Ok(driver)
    }

    #[tracing::instrument(skip(self))]
    async fn add_vehicle(&self, vehicle: Vehicle) -> Result<Vehicle, Error> {
        vehicle.validate()?;

        let driver_id = self.signed_in_driver().await?;

        self.backend.add_vehicle(driver_id, vehicle).await
    }

    #[tracing::instrument(skip(self))]
    async fn find_vehicle(&self) -> Result<Vehicle, Error> {
        let driver_id = self.signed_in_driver().await?;

        self.backend.find_vehicle(driver_id).await
    }
}

#[cfg(test)]
fn rider(phone_number: &str) -> User {
    use crate::entities::Role;

    User {
        id: Uuid::new_v4(),
        phone_number: phone_number.into(),
        name: "Asha".into(),
        role: Role::Rider,
    }
}

#[cfg(test)]
fn scooter() -> Vehicle {
    Vehicle {
        vehicle_class: "Bike".into(),
        model: "Activa".into(),
        registration_number: "KA 05 XY 9876".into(),
        color: Some("grey".into()),
    }
}

#[test]
fn sign_in_registered_rider() {
    use super::fakes::{engine, FakeBackend, FakeMaps};
    use std::sync::Arc;
    use tokio_test::block_on;

    let user = rider("+919800000001");
    let backend = FakeBackend::new().with_user(user.clone());
    let engine = engine(Arc::new(FakeMaps::new()), Arc::new(backend));

    let result = block_on(engine.sign_in("+919800000001".into())).unwrap();
    assert_eq!(result, SignIn::Registered { user: user.clone() });

    let status = block_on(engine.session_status()).unwrap();
    assert!(status.is_logged_in);
    assert_eq!(status.user_id, Some(user.id));
    assert_eq!(status.driver_id, None);

    let err = block_on(engine.update_driver_status(DriverStatus::Online)).unwrap_err();
    assert_eq!(err.message, "driver is not signed in");
}

#[test]
fn sign_in_unregistered_number() {
    use super::fakes::{engine, FakeBackend, FakeMaps};
    use std::sync::Arc;
    use tokio_test::block_on;

    let engine = engine(Arc::new(FakeMaps::new()), Arc::new(FakeBackend::new()));

    let result = block_on(engine.sign_in("+919800000002".into())).unwrap();
    assert_eq!(
        result,
        SignIn::Unregistered {
            phone_number: "+919800000002".into()
        }
    );

    let status = block_on(engine.session_status()).unwrap();
    assert_eq!(status, SessionStatus::default());

    assert!(block_on(engine.sign_in("  ".into())).is_err());
}

#[test]
fn registered_driver_manages_vehicle_and_status() {
    use super::fakes::{engine, FakeBackend, FakeMaps};
    use crate::entities::Role;
    use std::sync::Arc;
    use tokio_test::block_on;

    let engine = engine(Arc::new(FakeMaps::new()), Arc::new(FakeBackend::new()));

    let err = block_on(engine.add_vehicle(scooter())).unwrap_err();
    assert_eq!(err.message, "driver is not signed in");

    let user = block_on(engine.register(NewUser {
        phone_number: "+919800000003".into(),
        name: "Ravi".into(),
        role: Role::Driver,
    }))
    .unwrap();

    let status = block_on(engine.session_status()).unwrap();
    assert_eq!(status.driver_id, Some(user.id));

    let driver = block_on(engine.update_driver_status(DriverStatus::Online)).unwrap();
    assert_eq!(driver.id, user.id);
    assert!(driver.is_online());

    block_on(engine.add_vehicle(scooter())).unwrap();
    assert_eq!(block_on(engine.find_vehicle()).unwrap(), scooter());

    let mut unregistered = scooter();
    unregistered.registration_number = "".into();
    assert!(block_on(engine.add_vehicle(unregistered)).is_err());
}

#[test]
fn register_validates_before_calling_backend() {
    use super::fakes::{engine, FakeBackend, FakeMaps};
    use crate::entities::Role;
    use std::sync::Arc;
    use tokio_test::block_on;

    let backend = Arc::new(FakeBackend::new());
    let engine = engine(Arc::new(FakeMaps::new()), backend.clone());

    let err = block_on(engine.register(NewUser {
        phone_number: "+919800000004".into(),
        name: " ".into(),
        role: Role::Rider,
    }))
    .unwrap_err();

    assert_eq!(err.message, "name is required");
    assert!(backend.users.lock().unwrap().is_empty());
}

#[test]
fn sign_out_keeps_onboarding() {
    use super::fakes::{engine, FakeBackend, FakeMaps};
    use std::sync::Arc;
    use tokio_test::block_on;

    let user = rider("+919800000005");
    let backend = FakeBackend::new().with_user(user);
    let engine = engine(Arc::new(FakeMaps::new()), Arc::new(backend));

    block_on(engine.mark_onboarding_seen()).unwrap();
    block_on(engine.sign_in("+919800000005".into())).unwrap();

    block_on(engine.sign_out()).unwrap();

    let status = block_on(engine.session_status()).unwrap();
    assert!(!status.is_logged_in);
    assert!(status.onboarding_seen);
    assert_eq!(status.user_id, None);
}
