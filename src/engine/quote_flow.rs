use std::sync::Arc;

use futures::future::try_join;

use super::QuoteSession;
use crate::{
    entities::{
        mark_unavailable, merge_prices, Coordinates, Location, LocationSource, QuoteEvent,
        RideOption,
    },
    error::{no_price_data_error, Error},
    external::{BackendService, DynBackend, DynMaps, MapsService},
};

/// Runs one quote request: resolve both ends, fetch the route, then price the
/// ride options. Location and route failures end the run in the error
/// phase. Pricing failures only degrade the prices to "N/A".
#[tracing::instrument(skip(maps, backend, session, pickup, drop), fields(token = %session.token))]
pub(super) async fn run(
    maps: DynMaps,
    backend: DynBackend,
    session: Arc<QuoteSession>,
    generation: u64,
    pickup: LocationSource,
    drop: LocationSource,
) {
    let (pickup, drop) = match try_join(
        resolve(maps.as_ref(), pickup),
        resolve(maps.as_ref(), drop),
    )
    .await
    {
        Ok(locations) => locations,
        Err(err) => return fail(&session, generation, err.message),
    };

    let origin = pickup.coordinates;
    let destination = drop.coordinates;

    tracing::info!("resolved {:?} -> {:?}", pickup.description, drop.description);

    if !session.commit(generation, |state| state.locations_resolved(pickup, drop)) {
        return;
    }

    let route = match maps.fetch_route(origin, destination).await {
        Ok(route) => route,
        Err(err) => return fail(&session, generation, err.message),
    };

    tracing::info!(
        points = route.polyline.len(),
        minutes = ?route.duration_minutes(),
        km = ?route.distance_km(),
        "fetched route"
    );

    if !session.commit(generation, |state| state.route_fetched(route)) {
        return;
    }

    let catalog = session.state().ride_options;

    let ride_options =
        match price_ride_options(backend.as_ref(), origin, destination, &catalog).await {
            Ok(ride_options) => ride_options,
            Err(err) => {
                tracing::warn!("pricing unavailable, showing N/A: {}", err);
                mark_unavailable(&catalog)
            }
        };

    if session.commit(generation, |state| state.prices_settled(ride_options)) {
        tracing::info!("quote ready");
    }
}

async fn resolve(maps: &dyn MapsService, source: LocationSource) -> Result<Location, Error> {
    match source {
        LocationSource::Coordinates {
            coordinates,
            description,
        } => Ok(Location::new(coordinates, description)),
        LocationSource::GooglePlaces {
            place_id,
            session_token,
        } => maps.resolve_place(place_id, session_token).await,
    }
}

/// Fetches prices for the trip and merges them into `catalog`.
pub async fn price_ride_options(
    backend: &dyn BackendService,
    pickup: Coordinates,
    drop: Coordinates,
    catalog: &[RideOption],
) -> Result<Vec<RideOption>, Error> {
    let prices = backend.fetch_prices(pickup, drop).await?;

    if prices.is_empty() {
        return Err(no_price_data_error());
    }

    Ok(merge_prices(catalog, &prices))
}

/// Commits the error and queues the matching event. Both happen under the
/// state lock, a run that has been replaced leaves no event behind.
pub(super) fn fail(session: &QuoteSession, generation: u64, message: String) {
    tracing::warn!("quote failed: {}", message);

    session.commit(generation, |state| {
        state.fail(message.clone());
        session.emit(QuoteEvent::Failed { message });
        Ok(())
    });
}

#[test]
fn replaced_run_leaves_no_failure_behind() {
    let session = QuoteSession::new();

    let stale = session.next_generation();
    let current = session.next_generation();

    fail(&session, stale, "location not found".into());
    assert!(session.state().error().is_none());
    assert!(session.take_events().is_empty());

    fail(&session, current, "no route found".into());
    assert_eq!(session.state().error(), Some("no route found"));
    assert_eq!(
        session.take_events(),
        vec![QuoteEvent::Failed {
            message: "no route found".into()
        }]
    );
}
