use axum::extract::{Extension, Json, Query};
use serde::{Deserialize, Serialize};

use crate::entities::Coordinates;
use crate::error::Error;
use crate::external::PlaceSuggestions;
use crate::server::DynAPI;

#[derive(Serialize, Deserialize)]
pub struct SuggestionParams {
    input: String,
    lat: f64,
    lng: f64,
    radius: f64,
    session_token: String,
}

pub async fn find_suggestions(
    Extension(api): Extension<DynAPI>,
    Query(params): Query<SuggestionParams>,
) -> Result<Json<PlaceSuggestions>, Error> {
    let location = Coordinates {
        lat: params.lat,
        lng: params.lng,
    };

    let suggestions = api
        .find_place_suggestions(params.input, location, params.radius, params.session_token)
        .await?;

    Ok(suggestions.into())
}
