use super::Engine;

use async_trait::async_trait;

use crate::{
    api::PlaceAPI,
    entities::Coordinates,
    error::{validation_error, Error},
    external::PlaceSuggestions,
};

#[async_trait]
impl PlaceAPI for Engine {
    #[tracing::instrument(skip(self))]
    async fn find_place_suggestions(
        &self,
        input: String,
        location: Coordinates,
        radius: f64,
        session_token: String,
    ) -> Result<PlaceSuggestions, Error> {
        if input.trim().is_empty() {
            return Err(validation_error("search text is required"));
        }

        self.maps
            .find_place_suggestions(input, location, radius, session_token)
            .await
    }
}

#[test]
fn suggestions_pass_through() {
    use super::fakes::{engine, FakeBackend, FakeMaps, DROP_ID};
    use std::sync::Arc;
    use tokio_test::block_on;

    let engine = engine(Arc::new(FakeMaps::new()), Arc::new(FakeBackend::new()));
    let here = Coordinates {
        lat: 12.9716,
        lng: 77.5946,
    };

    let found = block_on(engine.find_place_suggestions(
        "indira".into(),
        here,
        5000.0,
        "session".into(),
    ))
    .unwrap();
    assert_eq!(found.len(), 1);
    assert_eq!(found[0].place_id, DROP_ID);

    let err = block_on(engine.find_place_suggestions(" ".into(), here, 5000.0, "".into()))
        .unwrap_err();
    assert_eq!(err.message, "search text is required");
}
