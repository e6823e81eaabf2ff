use serde::{Deserialize, Serialize};

#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct Coordinates {
    pub lat: f64,
    pub lng: f64,
}

impl From<Coordinates> for String {
    fn from(coordinates: Coordinates) -> Self {
        format!("{},{}", coordinates.lat, coordinates.lng)
    }
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Location {
    pub coordinates: Coordinates,
    pub description: String,
}

impl Location {
    pub fn new(coordinates: Coordinates, description: String) -> Self {
        Self {
            coordinates,
            description,
        }
    }
}

/// Where a quote endpoint comes from. Device location is already resolved,
/// a Google place still needs a place details lookup.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum LocationSource {
    Coordinates {
        coordinates: Coordinates,
        #[serde(default)]
        description: String,
    },
    GooglePlaces {
        place_id: String,
        #[serde(default)]
        session_token: String,
    },
}

impl LocationSource {
    pub fn google_place(place_id: &str, session_token: &str) -> Self {
        Self::GooglePlaces {
            place_id: place_id.into(),
            session_token: session_token.into(),
        }
    }

    /// A place source with a blank id can't be resolved.
    pub fn is_blank(&self) -> bool {
        match self {
            Self::Coordinates { .. } => false,
            Self::GooglePlaces { place_id, .. } => place_id.trim().is_empty(),
        }
    }
}

#[test]
fn coordinates_to_query_string() {
    let coordinates = Coordinates {
        lat: 12.9716,
        lng: 77.5946,
    };

    let query: String = coordinates.into();
    assert_eq!(query, "12.9716,77.5946");
}

#[test]
fn blank_place_source() {
    assert!(LocationSource::google_place("  ", "").is_blank());
    assert!(!LocationSource::google_place("ChIJgT_rKAB_PzsRBttnRY6jpz8", "").is_blank());

    let device = LocationSource::Coordinates {
        coordinates: Coordinates { lat: 0.0, lng: 0.0 },
        description: "".into(),
    };
    assert!(!device.is_blank());
}

#[test]
fn location_source_wire_format() {
    let source: LocationSource = serde_json::from_value(serde_json::json!({
        "type": "google_places",
        "place_id": "ChIJkRUcFP9-PzsRPJOvVDoV9Q4"
    }))
    .unwrap();

    assert_eq!(
        source,
        LocationSource::google_place("ChIJkRUcFP9-PzsRPJOvVDoV9Q4", "")
    );
}
