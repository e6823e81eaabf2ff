use async_trait::async_trait;
use tokio::sync::watch;
use uuid::Uuid;

use crate::entities::{
    Coordinates, Driver, DriverStatus, NewUser, QuoteEvent, QuoteRequest, QuoteSnapshot,
    QuoteState, SessionStatus, SignIn, User, Vehicle,
};
use crate::error::Error;
use crate::external::PlaceSuggestions;

#[async_trait]
pub trait QuoteAPI {
    async fn start_quote(&self, request: QuoteRequest) -> Result<QuoteSnapshot, Error>;
    async fn find_quote(&self, token: Uuid) -> Result<QuoteState, Error>;
    async fn watch_quote(&self, token: Uuid) -> Result<watch::Receiver<QuoteState>, Error>;
    async fn requote(&self, token: Uuid, request: QuoteRequest) -> Result<QuoteState, Error>;
    async fn dismiss_quote_error(&self, token: Uuid) -> Result<QuoteState, Error>;
    async fn take_quote_events(&self, token: Uuid) -> Result<Vec<QuoteEvent>, Error>;
    async fn close_quote(&self, token: Uuid) -> Result<(), Error>;
}

#[async_trait]
pub trait PlaceAPI {
    async fn find_place_suggestions(
        &self,
        input: String,
        location: Coordinates,
        radius: f64,
        session_token: String,
    ) -> Result<PlaceSuggestions, Error>;
}

#[async_trait]
pub trait AccountAPI {
    async fn sign_in(&self, phone_number: String) -> Result<SignIn, Error>;
    async fn register(&self, user: NewUser) -> Result<User, Error>;
    async fn sign_out(&self) -> Result<(), Error>;
    async fn session_status(&self) -> Result<SessionStatus, Error>;
    async fn mark_onboarding_seen(&self) -> Result<SessionStatus, Error>;
    async fn update_driver_status(&self, status: DriverStatus) -> Result<Driver, Error>;
    async fn add_vehicle(&self, vehicle: Vehicle) -> Result<Vehicle, Error>;
    async fn find_vehicle(&self) -> Result<Vehicle, Error>;
}

pub trait API: QuoteAPI + PlaceAPI + AccountAPI {}
