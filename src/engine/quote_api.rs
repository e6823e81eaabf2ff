use super::{quote_flow, Engine, QuoteSession};

use async_trait::async_trait;
use chrono::{DateTime, Duration, Utc};
use std::sync::Arc;
use tokio::sync::watch;
use uuid::Uuid;

use crate::{
    api::QuoteAPI,
    entities::{QuoteEvent, QuoteRequest, QuoteSnapshot, QuoteState},
    error::{invalid_input_error, Error},
};

const QUOTE_TTL_MINUTES: i64 = 30;

impl Engine {
    /// Starts a new run of the quote flow on `session`, replacing whatever
    /// run was in flight. Invalid requests fail right away without touching
    /// the network.
    fn run_quote(&self, session: &Arc<QuoteSession>, request: QuoteRequest) {
        session.restart(|generation| {
            let (pickup, drop) = match request.validate() {
                Ok(sources) => sources,
                Err(err) => {
                    quote_flow::fail(session, generation, err.message);
                    return None;
                }
            };

            session.commit(generation, |state| {
                state.begin();
                Ok(())
            });

            Some(tokio::spawn(quote_flow::run(
                self.maps.clone(),
                self.backend.clone(),
                session.clone(),
                generation,
                pickup,
                drop,
            )))
        });
    }

    /// Drops sessions nobody has touched for `QUOTE_TTL`. Sessions with a
    /// run in flight are kept.
    async fn evict_expired_quotes(&self, now: DateTime<Utc>) {
        let ttl = Duration::minutes(QUOTE_TTL_MINUTES);

        self.quotes.write().await.retain(|token, session| {
            if !session.is_expired(now, ttl) {
                return true;
            }

            tracing::debug!("evicting expired quote {}", token);
            session.close();
            false
        });
    }
}

#[async_trait]
impl QuoteAPI for Engine {
    #[tracing::instrument(skip(self))]
    async fn start_quote(&self, request: QuoteRequest) -> Result<QuoteSnapshot, Error> {
        self.evict_expired_quotes(Utc::now()).await;

        let session = Arc::new(QuoteSession::new());

        self.quotes
            .write()
            .await
            .insert(session.token, session.clone());

        self.run_quote(&session, request);

        Ok(QuoteSnapshot {
            token: session.token,
            state: session.state(),
        })
    }

    #[tracing::instrument(skip(self))]
    async fn find_quote(&self, token: Uuid) -> Result<QuoteState, Error> {
        Ok(self.find_session(token).await?.state())
    }

    #[tracing::instrument(skip(self))]
    async fn watch_quote(&self, token: Uuid) -> Result<watch::Receiver<QuoteState>, Error> {
        Ok(self.find_session(token).await?.subscribe())
    }

    #[tracing::instrument(skip(self))]
    async fn requote(&self, token: Uuid, request: QuoteRequest) -> Result<QuoteState, Error> {
        let session = self.find_session(token).await?;

        self.run_quote(&session, request);

        Ok(session.state())
    }

    #[tracing::instrument(skip(self))]
    async fn dismiss_quote_error(&self, token: Uuid) -> Result<QuoteState, Error> {
        self.find_session(token)
            .await?
            .apply(|state| state.dismiss_error())
    }

    #[tracing::instrument(skip(self))]
    async fn take_quote_events(&self, token: Uuid) -> Result<Vec<QuoteEvent>, Error> {
        Ok(self.find_session(token).await?.take_events())
    }

    #[tracing::instrument(skip(self))]
    async fn close_quote(&self, token: Uuid) -> Result<(), Error> {
        let session = self.quotes.write().await.remove(&token);

        match session {
            Some(session) => {
                session.close();
                Ok(())
            }
            None => Err(invalid_input_error()),
        }
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;
    use std::time::Duration;

    use uuid::Uuid;

    use super::super::fakes::{
        engine, pricing_outage, FakeBackend, FakeMaps, DROP_ID, OTHER_DROP_ID, OTHER_PICKUP_ID,
        PICKUP_ID,
    };
    use super::super::Engine;
    use crate::api::QuoteAPI;
    use crate::entities::{
        Coordinates, LocationSource, Phase, QuoteEvent, QuoteRequest, QuoteState, RouteInfo,
        MISSING_DROP_MESSAGE,
    };
    use crate::error::{network_error, no_route_found_error};

    fn request(pickup: &str, drop: &str) -> QuoteRequest {
        QuoteRequest::new(
            LocationSource::google_place(pickup, "session"),
            LocationSource::google_place(drop, "session"),
        )
    }

    async fn settled(engine: &Engine, token: Uuid) -> QuoteState {
        let mut rx = engine.watch_quote(token).await.unwrap();

        tokio::time::timeout(Duration::from_secs(5), async move {
            loop {
                let state = rx.borrow().clone();
                if state.phase.is_settled() {
                    return state;
                }
                rx.changed().await.unwrap();
            }
        })
        .await
        .expect("quote never settled")
    }

    fn prices(state: &QuoteState) -> Vec<(String, Option<String>, bool)> {
        state
            .ride_options
            .iter()
            .map(|o| (o.id.clone(), o.price.clone(), o.is_loading_price))
            .collect()
    }

    #[tokio::test]
    async fn quote_reaches_ready() {
        let maps = Arc::new(FakeMaps::new());
        let backend = Arc::new(FakeBackend::new());
        let engine = engine(maps.clone(), backend.clone());

        let snapshot = engine.start_quote(request(PICKUP_ID, DROP_ID)).await.unwrap();
        assert_eq!(snapshot.state.phase, Phase::FetchingLocations);

        let state = settled(&engine, snapshot.token).await;

        assert_eq!(state.phase, Phase::Ready);
        assert_eq!(state.pickup.as_ref().unwrap().description, "MG Road");
        assert_eq!(state.drop.as_ref().unwrap().description, "Indiranagar");

        let route = state.route.clone().unwrap();
        assert_eq!(route.polyline.len(), 3);
        assert_eq!(route.duration_seconds, Some(1260));
        assert_eq!(route.distance_meters, Some(8412));

        assert_eq!(
            prices(&state),
            vec![
                ("bike".into(), Some("₹42".into()), false),
                ("auto".into(), Some("₹60".into()), false),
                ("cab_economy".into(), Some("₹88".into()), false),
                ("cab_premium".into(), Some("₹88".into()), false),
            ]
        );

        assert_eq!(maps.calls(), 3);
        assert_eq!(backend.price_calls(), 1);
        assert!(engine
            .take_quote_events(snapshot.token)
            .await
            .unwrap()
            .is_empty());
    }

    #[tokio::test]
    async fn device_pickup_skips_place_lookup() {
        let maps = Arc::new(FakeMaps::new());
        let engine = engine(maps.clone(), Arc::new(FakeBackend::new()));

        let device = LocationSource::Coordinates {
            coordinates: Coordinates {
                lat: 12.9716,
                lng: 77.5946,
            },
            description: "Current location".into(),
        };
        let snapshot = engine
            .start_quote(QuoteRequest::new(
                device,
                LocationSource::google_place(DROP_ID, ""),
            ))
            .await
            .unwrap();

        let state = settled(&engine, snapshot.token).await;

        assert_eq!(state.phase, Phase::Ready);
        assert_eq!(state.pickup.unwrap().description, "Current location");
        assert_eq!(maps.place_calls.load(std::sync::atomic::Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn missing_drop_fails_without_network() {
        let maps = Arc::new(FakeMaps::new());
        let backend = Arc::new(FakeBackend::new());
        let engine = engine(maps.clone(), backend.clone());

        let snapshot = engine
            .start_quote(QuoteRequest {
                pickup: Some(LocationSource::google_place(PICKUP_ID, "")),
                drop: None,
            })
            .await
            .unwrap();

        assert!(snapshot
            .state
            .error()
            .unwrap()
            .starts_with("Drop location is missing"));

        let events = engine.take_quote_events(snapshot.token).await.unwrap();
        assert_eq!(
            events,
            vec![QuoteEvent::Failed {
                message: MISSING_DROP_MESSAGE.into()
            }]
        );
        assert!(engine
            .take_quote_events(snapshot.token)
            .await
            .unwrap()
            .is_empty());

        assert_eq!(maps.calls(), 0);
        assert_eq!(backend.price_calls(), 0);
    }

    #[tokio::test]
    async fn unknown_place_is_fatal() {
        let maps = Arc::new(FakeMaps::new());
        let backend = Arc::new(FakeBackend::new());
        let engine = engine(maps.clone(), backend.clone());

        let snapshot = engine
            .start_quote(request(PICKUP_ID, "ChIJ-nowhere"))
            .await
            .unwrap();
        let state = settled(&engine, snapshot.token).await;

        assert_eq!(state.error(), Some("location not found"));
        assert!(state.route.is_none());
        assert_eq!(maps.route_calls.load(std::sync::atomic::Ordering::SeqCst), 0);
        assert_eq!(backend.price_calls(), 0);

        let events = engine.take_quote_events(snapshot.token).await.unwrap();
        assert_eq!(events.len(), 1);
    }

    #[tokio::test]
    async fn route_failure_stops_before_pricing() {
        let maps = Arc::new(FakeMaps::new().with_route(Err(no_route_found_error())));
        let backend = Arc::new(FakeBackend::new());
        let engine = engine(maps, backend.clone());

        let snapshot = engine.start_quote(request(PICKUP_ID, DROP_ID)).await.unwrap();
        let state = settled(&engine, snapshot.token).await;

        assert_eq!(state.error(), Some(no_route_found_error().message.as_str()));
        assert_eq!(backend.price_calls(), 0);
        assert!(state.ride_options.iter().all(|o| o.price.is_none()));
    }

    #[tokio::test]
    async fn route_without_legs_still_shows_polyline() {
        let maps = Arc::new(FakeMaps::new().with_route(Ok(RouteInfo::new(
            crate::polyline::decode("_p~iF~ps|U_ulLnnqC"),
            None,
            None,
        ))));
        let engine = engine(maps, Arc::new(FakeBackend::new()));

        let snapshot = engine.start_quote(request(PICKUP_ID, DROP_ID)).await.unwrap();
        let state = settled(&engine, snapshot.token).await;

        assert_eq!(state.phase, Phase::Ready);
        let route = state.route.unwrap();
        assert_eq!(route.polyline.len(), 2);
        assert_eq!(route.duration_seconds, None);
        assert_eq!(route.distance_meters, None);
    }

    #[tokio::test]
    async fn pricing_outage_degrades_to_unavailable() {
        let maps = Arc::new(FakeMaps::new());
        let backend = Arc::new(FakeBackend::new().with_prices(pricing_outage()));
        let engine = engine(maps, backend);

        let snapshot = engine.start_quote(request(PICKUP_ID, DROP_ID)).await.unwrap();
        let state = settled(&engine, snapshot.token).await;

        assert_eq!(state.phase, Phase::Ready);
        assert_eq!(state.ride_options.len(), 4);
        assert!(state
            .ride_options
            .iter()
            .all(|o| o.price.as_deref() == Some("N/A") && !o.is_loading_price));
        assert_eq!(state.route.unwrap().polyline.len(), 3);

        // pricing problems never reach the event queue
        assert!(engine
            .take_quote_events(snapshot.token)
            .await
            .unwrap()
            .is_empty());
    }

    #[tokio::test]
    async fn empty_price_list_degrades_to_unavailable() {
        let backend = Arc::new(FakeBackend::new().with_prices(Ok(vec![])));
        let engine = engine(Arc::new(FakeMaps::new()), backend);

        let snapshot = engine.start_quote(request(PICKUP_ID, DROP_ID)).await.unwrap();
        let state = settled(&engine, snapshot.token).await;

        assert!(state
            .ride_options
            .iter()
            .all(|o| o.price.as_deref() == Some("N/A")));
    }

    #[tokio::test]
    async fn every_pair_settles() {
        let engine = engine(Arc::new(FakeMaps::new()), Arc::new(FakeBackend::new()));
        let ids = [PICKUP_ID, DROP_ID, OTHER_PICKUP_ID, "ChIJ-nowhere", ""];

        for pickup in ids {
            for drop in ids {
                let snapshot = engine.start_quote(request(pickup, drop)).await.unwrap();
                let state = settled(&engine, snapshot.token).await;

                assert!(state.phase.is_settled(), "{} -> {}", pickup, drop);
            }
        }
    }

    #[tokio::test]
    async fn closing_discards_in_flight_results() {
        let maps = Arc::new(FakeMaps::new().with_latency(Duration::from_millis(100)));
        let backend = Arc::new(FakeBackend::new());
        let engine = engine(maps, backend.clone());

        let snapshot = engine.start_quote(request(PICKUP_ID, DROP_ID)).await.unwrap();
        let rx = engine.watch_quote(snapshot.token).await.unwrap();

        engine.close_quote(snapshot.token).await.unwrap();
        tokio::time::sleep(Duration::from_millis(300)).await;

        assert_eq!(rx.borrow().phase, Phase::FetchingLocations);
        assert!(rx.borrow().pickup.is_none());
        assert_eq!(backend.price_calls(), 0);
        assert!(engine.find_quote(snapshot.token).await.is_err());
    }

    #[tokio::test]
    async fn requote_replaces_in_flight_run() {
        let maps = Arc::new(FakeMaps::new().with_latency(Duration::from_millis(50)));
        let engine = engine(maps, Arc::new(FakeBackend::new()));

        let snapshot = engine.start_quote(request(PICKUP_ID, DROP_ID)).await.unwrap();
        engine
            .requote(snapshot.token, request(OTHER_PICKUP_ID, OTHER_DROP_ID))
            .await
            .unwrap();

        let state = settled(&engine, snapshot.token).await;

        assert_eq!(state.phase, Phase::Ready);
        assert_eq!(state.pickup.unwrap().description, "Koramangala");
        assert_eq!(state.drop.unwrap().description, "Airport");
    }

    #[tokio::test]
    async fn dismiss_returns_to_previous_display() {
        let engine = engine(Arc::new(FakeMaps::new()), Arc::new(FakeBackend::new()));

        let snapshot = engine.start_quote(request(PICKUP_ID, DROP_ID)).await.unwrap();
        let ready = settled(&engine, snapshot.token).await;

        let failed = engine
            .requote(snapshot.token, request(PICKUP_ID, "ChIJ-nowhere"))
            .await
            .unwrap();
        assert!(failed.phase.is_loading());

        let failed = settled(&engine, snapshot.token).await;
        assert_eq!(failed.error(), Some("location not found"));

        let restored = engine.dismiss_quote_error(snapshot.token).await.unwrap();
        assert_eq!(restored.phase, Phase::Ready);
        assert_eq!(restored.route, ready.route);
        assert_eq!(restored.ride_options, ready.ride_options);

        // nothing left to dismiss
        assert!(engine.dismiss_quote_error(snapshot.token).await.is_err());
    }

    #[tokio::test]
    async fn dismiss_first_failure_goes_idle() {
        let maps = Arc::new(FakeMaps::new().with_route(Err(network_error())));
        let engine = engine(maps, Arc::new(FakeBackend::new()));

        let snapshot = engine.start_quote(request(PICKUP_ID, DROP_ID)).await.unwrap();
        let state = settled(&engine, snapshot.token).await;
        assert_eq!(state.error(), Some("network error"));

        let restored = engine.dismiss_quote_error(snapshot.token).await.unwrap();
        assert_eq!(restored.phase, Phase::Idle);
    }

    #[tokio::test]
    async fn unknown_token_is_rejected() {
        let engine = engine(Arc::new(FakeMaps::new()), Arc::new(FakeBackend::new()));
        let token = Uuid::new_v4();

        assert_eq!(engine.find_quote(token).await.unwrap_err().code, 101);
        assert!(engine.close_quote(token).await.is_err());
        assert!(engine.take_quote_events(token).await.is_err());
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn concurrent_requotes_always_settle() {
        let maps = Arc::new(FakeMaps::new().with_latency(Duration::from_millis(5)));
        let engine = Arc::new(engine(maps, Arc::new(FakeBackend::new())));

        for _ in 0..100 {
            let snapshot = engine.start_quote(request(PICKUP_ID, DROP_ID)).await.unwrap();
            let token = snapshot.token;

            let first = tokio::spawn({
                let engine = engine.clone();
                async move { engine.requote(token, request(OTHER_PICKUP_ID, DROP_ID)).await }
            });
            let second = tokio::spawn({
                let engine = engine.clone();
                async move { engine.requote(token, request(PICKUP_ID, OTHER_DROP_ID)).await }
            });
            first.await.unwrap().unwrap();
            second.await.unwrap().unwrap();

            let state = settled(&engine, token).await;
            assert_eq!(state.phase, Phase::Ready);

            engine.close_quote(token).await.unwrap();
        }
    }

    #[tokio::test]
    async fn requote_starts_from_a_clean_display() {
        let engine = engine(Arc::new(FakeMaps::new()), Arc::new(FakeBackend::new()));

        let snapshot = engine.start_quote(request(PICKUP_ID, DROP_ID)).await.unwrap();
        settled(&engine, snapshot.token).await;

        let state = engine
            .requote(snapshot.token, request(OTHER_PICKUP_ID, OTHER_DROP_ID))
            .await
            .unwrap();

        assert_eq!(state.phase, Phase::FetchingLocations);
        assert!(state.pickup.is_none());
        assert!(state.route.is_none());
        assert!(state
            .ride_options
            .iter()
            .all(|o| o.price.is_none() && o.is_loading_price));
    }

    #[tokio::test]
    async fn expired_sessions_are_evicted() {
        let maps = Arc::new(FakeMaps::new().with_latency(Duration::from_millis(100)));
        let engine = engine(maps, Arc::new(FakeBackend::new()));

        let done = engine.start_quote(request(PICKUP_ID, DROP_ID)).await.unwrap();
        settled(&engine, done.token).await;
        let running = engine.start_quote(request(PICKUP_ID, DROP_ID)).await.unwrap();

        // a fresh start keeps recent sessions
        assert!(engine.find_quote(done.token).await.is_ok());

        engine
            .evict_expired_quotes(chrono::Utc::now() + chrono::Duration::hours(1))
            .await;

        assert!(engine.find_quote(done.token).await.is_err());
        assert!(engine.find_quote(running.token).await.is_ok());
    }
}
