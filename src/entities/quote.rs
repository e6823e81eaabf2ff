use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::entities::{Location, LocationSource, RideOption, RouteInfo};
use crate::error::{invalid_invocation_error, validation_error, Error};

pub const MISSING_DROP_MESSAGE: &str =
    "Drop location is missing. Please choose where you want to go.";
pub const MISSING_PICKUP_MESSAGE: &str =
    "Pickup location is missing. Please choose where you want to be picked up.";

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct QuoteRequest {
    pub pickup: Option<LocationSource>,
    pub drop: Option<LocationSource>,
}

impl QuoteRequest {
    pub fn new(pickup: LocationSource, drop: LocationSource) -> Self {
        Self {
            pickup: Some(pickup),
            drop: Some(drop),
        }
    }

    /// Returns the pickup and drop sources, or the message to show when one
    /// of them can't be used. Drop has to be a place, device coordinates
    /// only make sense for the pickup.
    pub fn validate(&self) -> Result<(LocationSource, LocationSource), Error> {
        let drop = match &self.drop {
            Some(drop @ LocationSource::GooglePlaces { .. }) if !drop.is_blank() => drop.clone(),
            _ => return Err(validation_error(MISSING_DROP_MESSAGE)),
        };

        let pickup = match &self.pickup {
            Some(pickup) if !pickup.is_blank() => pickup.clone(),
            _ => return Err(validation_error(MISSING_PICKUP_MESSAGE)),
        };

        Ok((pickup, drop))
    }
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(tag = "name", rename_all = "snake_case")]
pub enum Phase {
    Idle,
    FetchingLocations,
    FetchingRoute,
    FetchingPrices,
    Ready,
    Error { message: String },
}

impl Phase {
    pub fn name(&self) -> String {
        match self {
            Self::Idle => "idle".into(),
            Self::FetchingLocations => "fetching_locations".into(),
            Self::FetchingRoute => "fetching_route".into(),
            Self::FetchingPrices => "fetching_prices".into(),
            Self::Ready => "ready".into(),
            Self::Error { message: _ } => "error".into(),
        }
    }

    pub fn is_loading(&self) -> bool {
        matches!(
            self,
            Self::FetchingLocations | Self::FetchingRoute | Self::FetchingPrices
        )
    }

    pub fn is_settled(&self) -> bool {
        matches!(self, Self::Ready | Self::Error { message: _ })
    }

    fn is_stable(&self) -> bool {
        matches!(self, Self::Idle | Self::Ready)
    }
}

/// Everything the ride selection screen renders for one quote session.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct QuoteState {
    pub phase: Phase,
    pub pickup: Option<Location>,
    pub drop: Option<Location>,
    pub route: Option<RouteInfo>,
    pub ride_options: Vec<RideOption>,
    pub updated_at: DateTime<Utc>,
    // display to return to when an error is dismissed
    #[serde(skip)]
    fallback: Option<Box<QuoteState>>,
}

impl Default for QuoteState {
    fn default() -> Self {
        Self::new()
    }
}

impl QuoteState {
    pub fn new() -> Self {
        Self {
            phase: Phase::Idle,
            pickup: None,
            drop: None,
            route: None,
            ride_options: RideOption::catalog(),
            updated_at: Utc::now(),
            fallback: None,
        }
    }

    pub fn is_loading(&self) -> bool {
        self.phase.is_loading()
    }

    pub fn error(&self) -> Option<&str> {
        match &self.phase {
            Phase::Error { message } => Some(message.as_str()),
            _ => None,
        }
    }

    fn remember_stable_display(&mut self) {
        if self.phase.is_stable() {
            let mut snapshot = self.clone();
            snapshot.fallback = None;
            self.fallback = Some(Box::new(snapshot));
        }
    }

    fn touch(&mut self) {
        self.updated_at = Utc::now();
    }

    /// Starts a new request from any phase. A run that was still in flight
    /// keeps the display it started from as its fallback. Locations, route
    /// and prices of the previous request are cleared.
    pub fn begin(&mut self) {
        self.remember_stable_display();
        self.pickup = None;
        self.drop = None;
        self.route = None;
        self.ride_options = RideOption::catalog();
        self.phase = Phase::FetchingLocations;
        self.touch();
    }

    #[tracing::instrument(skip(self))]
    pub fn locations_resolved(&mut self, pickup: Location, drop: Location) -> Result<(), Error> {
        match self.phase {
            Phase::FetchingLocations => {
                self.pickup = Some(pickup);
                self.drop = Some(drop);
                self.phase = Phase::FetchingRoute;
                self.touch();
                Ok(())
            }
            _ => Err(invalid_invocation_error()),
        }
    }

    #[tracing::instrument(skip(self, route))]
    pub fn route_fetched(&mut self, route: RouteInfo) -> Result<(), Error> {
        match self.phase {
            Phase::FetchingRoute => {
                self.route = Some(route);
                self.ride_options = self.ride_options.iter().map(|o| o.loading()).collect();
                self.phase = Phase::FetchingPrices;
                self.touch();
                Ok(())
            }
            _ => Err(invalid_invocation_error()),
        }
    }

    /// Replaces the ride options with their priced variants. The list must
    /// keep the same ids in the same order.
    #[tracing::instrument(skip(self, ride_options))]
    pub fn prices_settled(&mut self, ride_options: Vec<RideOption>) -> Result<(), Error> {
        let same_catalog = ride_options.len() == self.ride_options.len()
            && ride_options
                .iter()
                .zip(self.ride_options.iter())
                .all(|(new, old)| new.id == old.id);

        if !same_catalog {
            return Err(invalid_invocation_error());
        }

        match self.phase {
            Phase::FetchingPrices => {
                self.ride_options = ride_options;
                self.phase = Phase::Ready;
                self.fallback = None;
                self.touch();
                Ok(())
            }
            _ => Err(invalid_invocation_error()),
        }
    }

    /// Enters the error phase from anywhere, a stable display is kept as
    /// the fallback for dismissal.
    #[tracing::instrument(skip(self))]
    pub fn fail(&mut self, message: String) {
        self.remember_stable_display();
        self.phase = Phase::Error { message };
        self.touch();
    }

    /// Drops the error and goes back to the last stable display, no retry.
    #[tracing::instrument(skip(self))]
    pub fn dismiss_error(&mut self) -> Result<(), Error> {
        match self.phase {
            Phase::Error { message: _ } => {
                match self.fallback.take() {
                    Some(previous) => *self = *previous,
                    None => self.phase = Phase::Idle,
                };
                self.touch();
                Ok(())
            }
            _ => Err(invalid_invocation_error()),
        }
    }
}

/// One-shot notifications for the presentation layer, each consumed once.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(tag = "name", rename_all = "snake_case")]
pub enum QuoteEvent {
    Failed { message: String },
}

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct QuoteSnapshot {
    pub token: Uuid,
    pub state: QuoteState,
}

#[cfg(test)]
fn test_location(lat: f64, lng: f64) -> Location {
    use crate::entities::Coordinates;

    Location::new(Coordinates { lat, lng }, format!("{lat},{lng}"))
}

#[test]
fn validate_requires_drop_place() {
    let pickup = LocationSource::google_place("pickup", "");

    let missing = QuoteRequest {
        pickup: Some(pickup.clone()),
        drop: None,
    };
    assert_eq!(
        missing.validate().unwrap_err().message,
        MISSING_DROP_MESSAGE
    );

    let blank = QuoteRequest::new(pickup.clone(), LocationSource::google_place("", ""));
    assert!(blank
        .validate()
        .unwrap_err()
        .message
        .starts_with("Drop location is missing"));

    let device_drop = QuoteRequest::new(
        pickup.clone(),
        LocationSource::Coordinates {
            coordinates: crate::entities::Coordinates { lat: 1.0, lng: 1.0 },
            description: "".into(),
        },
    );
    assert!(device_drop.validate().is_err());

    let no_pickup = QuoteRequest {
        pickup: None,
        drop: Some(LocationSource::google_place("drop", "")),
    };
    assert_eq!(
        no_pickup.validate().unwrap_err().message,
        MISSING_PICKUP_MESSAGE
    );
}

#[test]
fn happy_path_transitions() {
    let mut state = QuoteState::new();
    assert_eq!(state.phase, Phase::Idle);

    state.begin();
    assert!(state.is_loading());

    state
        .locations_resolved(test_location(1.0, 2.0), test_location(3.0, 4.0))
        .unwrap();
    assert_eq!(state.phase, Phase::FetchingRoute);

    state
        .route_fetched(RouteInfo::new(vec![], Some(600), Some(4500)))
        .unwrap();
    assert_eq!(state.phase, Phase::FetchingPrices);

    let priced = state
        .ride_options
        .iter()
        .map(|o| o.priced("₹10".into()))
        .collect();
    state.prices_settled(priced).unwrap();

    assert_eq!(state.phase, Phase::Ready);
    assert!(state.phase.is_settled());
    assert!(state.ride_options.iter().all(|o| !o.is_loading_price));
}

#[test]
fn out_of_order_transitions_are_rejected() {
    let mut state = QuoteState::new();

    assert!(state
        .route_fetched(RouteInfo::new(vec![], None, None))
        .is_err());
    assert!(state.prices_settled(RideOption::catalog()).is_err());
    assert!(state.dismiss_error().is_err());
}

#[test]
fn prices_must_keep_catalog_identity() {
    let mut state = QuoteState::new();
    state.begin();
    state
        .locations_resolved(test_location(1.0, 2.0), test_location(3.0, 4.0))
        .unwrap();
    state
        .route_fetched(RouteInfo::new(vec![], None, None))
        .unwrap();

    let mut shorter = RideOption::catalog();
    shorter.pop();
    assert!(state.prices_settled(shorter).is_err());

    let mut renamed = RideOption::catalog();
    renamed[0].id = "scooter".into();
    assert!(state.prices_settled(renamed).is_err());

    assert_eq!(state.phase, Phase::FetchingPrices);
}

#[test]
fn dismiss_returns_to_idle_after_first_failure() {
    let mut state = QuoteState::new();
    state.begin();
    state.fail("location not found".into());

    assert_eq!(state.error(), Some("location not found"));

    state.dismiss_error().unwrap();
    assert_eq!(state.phase, Phase::Idle);
    assert!(state.error().is_none());
}

#[test]
fn dismiss_returns_to_previous_quote() {
    let mut state = QuoteState::new();
    state.begin();
    state
        .locations_resolved(test_location(1.0, 2.0), test_location(3.0, 4.0))
        .unwrap();
    state
        .route_fetched(RouteInfo::new(vec![], Some(60), Some(1000)))
        .unwrap();
    state.prices_settled(RideOption::catalog()).unwrap();
    let ready = state.clone();

    // second request fails half way
    state.begin();
    state
        .locations_resolved(test_location(5.0, 6.0), test_location(7.0, 8.0))
        .unwrap();
    state.fail("no route found".into());

    state.dismiss_error().unwrap();
    assert_eq!(state.phase, Phase::Ready);
    assert_eq!(state.pickup, ready.pickup);
    assert_eq!(state.route, ready.route);
}

#[test]
fn begin_clears_previous_quote() {
    let mut state = QuoteState::new();
    state.begin();
    state
        .locations_resolved(test_location(1.0, 2.0), test_location(3.0, 4.0))
        .unwrap();
    state
        .route_fetched(RouteInfo::new(vec![], Some(60), Some(1000)))
        .unwrap();
    let priced = state
        .ride_options
        .iter()
        .map(|o| o.priced("₹42".into()))
        .collect();
    state.prices_settled(priced).unwrap();

    state.begin();

    assert_eq!(state.phase, Phase::FetchingLocations);
    assert!(state.pickup.is_none() && state.drop.is_none());
    assert!(state.route.is_none());
    assert_eq!(state.ride_options, RideOption::catalog());

    state.fail("no route found".into());
    assert!(state.route.is_none());

    state.dismiss_error().unwrap();
    assert_eq!(state.phase, Phase::Ready);
    assert!(state.route.is_some());
    assert!(state
        .ride_options
        .iter()
        .all(|o| o.price.as_deref() == Some("₹42")));
}

#[test]
fn invalid_requote_from_ready() {
    let mut state = QuoteState::new();
    state.begin();
    state
        .locations_resolved(test_location(1.0, 2.0), test_location(3.0, 4.0))
        .unwrap();
    state
        .route_fetched(RouteInfo::new(vec![], None, None))
        .unwrap();
    state.prices_settled(RideOption::catalog()).unwrap();

    state.fail(MISSING_DROP_MESSAGE.into());
    assert_eq!(state.error(), Some(MISSING_DROP_MESSAGE));

    state.dismiss_error().unwrap();
    assert_eq!(state.phase, Phase::Ready);
    assert!(state.route.is_some());
}

#[test]
fn phase_wire_format() {
    let phase = serde_json::to_value(Phase::Error {
        message: "no route".into(),
    })
    .unwrap();

    assert_eq!(
        phase,
        serde_json::json!({ "name": "error", "message": "no route" })
    );
    assert_eq!(Phase::FetchingPrices.name(), "fetching_prices");
}
