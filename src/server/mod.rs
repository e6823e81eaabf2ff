mod handlers;

use std::net::SocketAddr;
use std::sync::Arc;

use axum::{
    extract::Extension,
    routing::{get, patch, post},
    Router,
};

use crate::api::API;
use crate::error::{unexpected_error, Error};
use crate::server::handlers::{accounts, drivers, places, quotes};

type DynAPI = Arc<dyn API + Send + Sync>;

pub fn router(api: DynAPI) -> Router {
    Router::new()
        .route("/places/suggestions", get(places::find_suggestions))
        .route("/quotes", post(quotes::create))
        .route(
            "/quotes/:token",
            get(quotes::find).put(quotes::requote).delete(quotes::close),
        )
        .route("/quotes/:token/dismiss", patch(quotes::dismiss_error))
        .route("/quotes/:token/events", get(quotes::take_events))
        .route(
            "/session",
            get(accounts::status).delete(accounts::sign_out),
        )
        .route("/session/sign_in", post(accounts::sign_in))
        .route("/session/register", post(accounts::register))
        .route("/session/onboarding", patch(accounts::mark_onboarding_seen))
        .route("/driver/status", patch(drivers::update_status))
        .route(
            "/driver/vehicle",
            get(drivers::find_vehicle).post(drivers::add_vehicle),
        )
        .layer(Extension(api))
}

pub async fn serve<T: API + Sync + Send + 'static>(api: T, addr: SocketAddr) -> Result<(), Error> {
    let app = router(Arc::new(api) as DynAPI);

    tracing::info!("listening on {}", addr);

    axum::Server::try_bind(&addr)
        .map_err(|err| {
            tracing::error!("failed to bind {}: {}", addr, err);
            unexpected_error()
        })?
        .serve(app.into_make_service())
        .await
        .map_err(|err| {
            tracing::error!("server stopped: {}", err);
            unexpected_error()
        })
}
