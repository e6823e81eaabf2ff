use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use super::{check_status, MapsService, PlaceSuggestions};
use crate::{
    config::Config,
    entities::{Coordinates, Location, RouteInfo},
    error::{no_route_found_error, not_found_error, upstream_error, Error},
    polyline,
};

#[derive(Clone, Debug)]
pub struct GoogleMaps {
    client: reqwest::Client,
    api_base: String,
    key: String,
}

#[derive(Clone, Debug, Serialize, Deserialize)]
struct Place {
    #[serde(default)]
    formatted_address: String,
    geometry: Geometry,
}

#[derive(Clone, Debug, Serialize, Deserialize)]
struct Geometry {
    location: Coordinates,
}

#[derive(Clone, Debug, Serialize, Deserialize)]
struct Response<T> {
    status: String,
    result: Option<T>,
    predictions: Option<T>,
}

#[derive(Clone, Debug, Deserialize)]
struct DirectionsResponse {
    status: String,
    #[serde(default)]
    routes: Vec<DirectionsRoute>,
}

#[derive(Clone, Debug, Deserialize)]
struct DirectionsRoute {
    overview_polyline: EncodedPolyline,
    #[serde(default)]
    legs: Vec<DirectionsLeg>,
}

#[derive(Clone, Debug, Deserialize)]
struct EncodedPolyline {
    points: String,
}

#[derive(Clone, Debug, Deserialize)]
struct DirectionsLeg {
    duration: Option<TextValue>,
    distance: Option<TextValue>,
}

#[derive(Clone, Debug, Deserialize)]
struct TextValue {
    value: u64,
}

impl GoogleMaps {
    pub fn new(api_base: &str, key: &str) -> Self {
        Self {
            client: reqwest::Client::new(),
            api_base: api_base.trim_end_matches('/').into(),
            key: key.into(),
        }
    }

    pub fn from_config(config: &Config) -> Self {
        Self::new(&config.google_maps_api_base, &config.google_maps_api_key)
    }

    fn url(&self, path: &str) -> String {
        format!("{}/maps/api/{}", self.api_base, path)
    }
}

#[async_trait]
impl MapsService for GoogleMaps {
    #[tracing::instrument(skip(self))]
    async fn find_place_suggestions(
        &self,
        input: String,
        location: Coordinates,
        radius: f64,
        session_token: String,
    ) -> Result<PlaceSuggestions, Error> {
        let location: String = location.into();

        let res = self
            .client
            .get(self.url("place/autocomplete/json"))
            .query(&[("key", &self.key)])
            .query(&[("input", input)])
            .query(&[("location", location)])
            .query(&[("radius", radius)])
            .query(&[("sessiontoken", session_token)])
            .send()
            .await?;

        check_status(res.status().as_u16())?;

        let data: Response<PlaceSuggestions> = res.json().await?;

        suggestions(data)
    }

    #[tracing::instrument(skip(self))]
    async fn resolve_place(
        &self,
        place_id: String,
        session_token: String,
    ) -> Result<Location, Error> {
        let res = self
            .client
            .get(self.url("place/details/json"))
            .query(&[("key", &self.key)])
            .query(&[("sessiontoken", session_token)])
            .query(&[("place_id", place_id)])
            .query(&[("fields", "formatted_address,geometry")])
            .send()
            .await?;

        place_status(res.status().as_u16())?;

        let body = res.text().await?;

        place_details(&body)
    }

    #[tracing::instrument(skip(self))]
    async fn fetch_route(
        &self,
        origin: Coordinates,
        destination: Coordinates,
    ) -> Result<RouteInfo, Error> {
        let origin: String = origin.into();
        let destination: String = destination.into();

        let res = self
            .client
            .get(self.url("directions/json"))
            .query(&[("key", &self.key)])
            .query(&[("origin", origin)])
            .query(&[("destination", destination)])
            .send()
            .await?;

        check_status(res.status().as_u16())?;

        let data: DirectionsResponse = res.json().await?;

        route_info(data)
    }
}

fn suggestions(data: Response<PlaceSuggestions>) -> Result<PlaceSuggestions, Error> {
    match data.status.as_str() {
        "OK" => data.predictions.ok_or_else(|| upstream_error()),
        "ZERO_RESULTS" => Ok(data.predictions.unwrap_or_default()),
        _ => Err(upstream_error()),
    }
}

// a rejected place id is a lookup miss, not a caller error
fn place_status(status_code: u16) -> Result<(), Error> {
    match status_code {
        400..=499 => Err(not_found_error()),
        _ => check_status(status_code),
    }
}

fn place_details(body: &str) -> Result<Location, Error> {
    let data: Response<Place> = serde_json::from_str(body).map_err(|err| {
        tracing::warn!("unreadable place details: {}", err);
        not_found_error()
    })?;

    place_location(data)
}

fn place_location(data: Response<Place>) -> Result<Location, Error> {
    if data.status != "OK" {
        tracing::warn!("place details returned status {}", data.status);
        return Err(not_found_error());
    }

    let place = data.result.ok_or_else(|| not_found_error())?;

    Ok(Location::new(place.geometry.location, place.formatted_address))
}

fn route_info(data: DirectionsResponse) -> Result<RouteInfo, Error> {
    match data.status.as_str() {
        "OK" => (),
        "ZERO_RESULTS" | "NOT_FOUND" => return Err(no_route_found_error()),
        _ => return Err(upstream_error()),
    };

    let route = data
        .routes
        .into_iter()
        .next()
        .ok_or_else(|| no_route_found_error())?;

    let path = polyline::decode(&route.overview_polyline.points);

    let (duration, distance) = match route.legs.first() {
        Some(leg) => (
            leg.duration.as_ref().map(|d| d.value),
            leg.distance.as_ref().map(|d| d.value),
        ),
        None => (None, None),
    };

    Ok(RouteInfo::new(path, duration, distance))
}

#[test]
fn place_details_to_location() {
    let data = serde_json::from_value(serde_json::json!({
        "status": "OK",
        "result": {
            "place_id": "ChIJgT_rKAB_PzsRBttnRY6jpz8",
            "formatted_address": "MG Road, Bengaluru",
            "geometry": { "location": { "lat": 12.9756, "lng": 77.6066 } }
        }
    }))
    .unwrap();

    let location = place_location(data).unwrap();

    assert_eq!(location.description, "MG Road, Bengaluru");
    assert_eq!(
        location.coordinates,
        Coordinates {
            lat: 12.9756,
            lng: 77.6066
        }
    );
}

#[test]
fn place_details_not_found() {
    let not_found = serde_json::from_value(serde_json::json!({ "status": "NOT_FOUND" })).unwrap();
    assert_eq!(place_location(not_found).unwrap_err(), not_found_error());

    let empty = serde_json::from_value(serde_json::json!({ "status": "OK" })).unwrap();
    assert_eq!(place_location(empty).unwrap_err(), not_found_error());
}

#[test]
fn directions_first_route_and_leg() {
    let data = serde_json::from_value(serde_json::json!({
        "status": "OK",
        "routes": [
            {
                "overview_polyline": { "points": "_p~iF~ps|U_ulLnnqC" },
                "legs": [
                    { "duration": { "text": "21 mins", "value": 1260 }, "distance": { "text": "8.4 km", "value": 8412 } },
                    { "duration": { "text": "1 min", "value": 60 }, "distance": { "text": "0.1 km", "value": 100 } }
                ]
            },
            {
                "overview_polyline": { "points": "" },
                "legs": []
            }
        ]
    }))
    .unwrap();

    let route = route_info(data).unwrap();

    assert_eq!(route.polyline.len(), 2);
    assert_eq!(route.duration_seconds, Some(1260));
    assert_eq!(route.distance_meters, Some(8412));
}

#[test]
fn directions_without_legs_keeps_polyline() {
    let data = serde_json::from_value(serde_json::json!({
        "status": "OK",
        "routes": [{ "overview_polyline": { "points": "_p~iF~ps|U_ulLnnqC_mqNvxq`@" }, "legs": [] }]
    }))
    .unwrap();

    let route = route_info(data).unwrap();

    assert_eq!(route.polyline.len(), 3);
    assert_eq!(route.duration_seconds, None);
    assert_eq!(route.distance_meters, None);
}

#[test]
fn directions_with_corrupt_polyline() {
    let data = serde_json::from_value(serde_json::json!({
        "status": "OK",
        "routes": [{
            "overview_polyline": { "points": "_p~iF" },
            "legs": [{ "duration": { "value": 300 }, "distance": { "value": 1500 } }]
        }]
    }))
    .unwrap();

    let route = route_info(data).unwrap();

    assert!(route.polyline.is_empty());
    assert_eq!(route.duration_seconds, Some(300));
}

#[test]
fn directions_without_routes() {
    let empty = serde_json::from_value(serde_json::json!({ "status": "OK", "routes": [] })).unwrap();
    assert_eq!(route_info(empty).unwrap_err(), no_route_found_error());

    let zero = serde_json::from_value(serde_json::json!({ "status": "ZERO_RESULTS" })).unwrap();
    assert_eq!(route_info(zero).unwrap_err(), no_route_found_error());

    let denied =
        serde_json::from_value(serde_json::json!({ "status": "REQUEST_DENIED" })).unwrap();
    assert_eq!(route_info(denied).unwrap_err(), upstream_error());
}

#[test]
fn autocomplete_suggestions() {
    let data = serde_json::from_value(serde_json::json!({
        "status": "OK",
        "predictions": [
            { "place_id": "ChIJkRUcFP9-PzsRPJOvVDoV9Q4", "description": "Indiranagar, Bengaluru" }
        ]
    }))
    .unwrap();
    let found = suggestions(data).unwrap();
    assert_eq!(found.len(), 1);
    assert_eq!(found[0].description, "Indiranagar, Bengaluru");

    let none = serde_json::from_value(serde_json::json!({ "status": "ZERO_RESULTS" })).unwrap();
    assert!(suggestions(none).unwrap().is_empty());
}

#[test]
fn api_base_is_normalized() {
    let maps = GoogleMaps::new("https://maps.googleapis.com/", "key");

    assert_eq!(
        maps.url("directions/json"),
        "https://maps.googleapis.com/maps/api/directions/json"
    );
}

#[test]
fn malformed_place_details_not_found() {
    use crate::error::NOT_FOUND_ERROR;

    assert_eq!(place_details("<html>").unwrap_err().code, NOT_FOUND_ERROR);
    assert_eq!(
        place_details(r#"{"status":"OK","result":{"geometry":{}}}"#)
            .unwrap_err()
            .code,
        NOT_FOUND_ERROR
    );

    assert_eq!(place_status(400).unwrap_err().code, NOT_FOUND_ERROR);
    assert!(place_status(200).is_ok());
    assert_ne!(place_status(503).unwrap_err().code, NOT_FOUND_ERROR);

    let location = place_details(
        r#"{"status":"OK","result":{"formatted_address":"MG Road","geometry":{"location":{"lat":12.97,"lng":77.6}}}}"#,
    )
    .unwrap();
    assert_eq!(location.description, "MG Road");
}

