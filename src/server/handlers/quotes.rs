use std::time::Duration;

use axum::extract::{Extension, Json, Path, Query};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::entities::{QuoteEvent, QuoteRequest, QuoteSnapshot, QuoteState};
use crate::error::Error;
use crate::server::DynAPI;

const MAX_WAIT: Duration = Duration::from_secs(30);

#[derive(Serialize, Deserialize)]
pub struct FindParams {
    #[serde(default)]
    wait: bool,
}

pub async fn create(
    Extension(api): Extension<DynAPI>,
    Json(request): Json<QuoteRequest>,
) -> Result<Json<QuoteSnapshot>, Error> {
    let snapshot = api.start_quote(request).await?;

    Ok(snapshot.into())
}

/// With `?wait=true` the response is held until the quote settles (or
/// `MAX_WAIT` passes) instead of returning the in-flight state.
pub async fn find(
    Extension(api): Extension<DynAPI>,
    Path(token): Path<Uuid>,
    Query(params): Query<FindParams>,
) -> Result<Json<QuoteState>, Error> {
    if !params.wait {
        return Ok(api.find_quote(token).await?.into());
    }

    let mut rx = api.watch_quote(token).await?;

    let settled = tokio::time::timeout(MAX_WAIT, async {
        loop {
            let settled = rx.borrow().phase.is_settled();

            if settled || rx.changed().await.is_err() {
                break;
            }
        }
    })
    .await;

    if settled.is_err() {
        tracing::debug!("quote {} still loading after {:?}", token, MAX_WAIT);
    }

    let state = rx.borrow().clone();

    Ok(state.into())
}

pub async fn requote(
    Extension(api): Extension<DynAPI>,
    Path(token): Path<Uuid>,
    Json(request): Json<QuoteRequest>,
) -> Result<Json<QuoteState>, Error> {
    let state = api.requote(token, request).await?;

    Ok(state.into())
}

pub async fn dismiss_error(
    Extension(api): Extension<DynAPI>,
    Path(token): Path<Uuid>,
) -> Result<Json<QuoteState>, Error> {
    let state = api.dismiss_quote_error(token).await?;

    Ok(state.into())
}

pub async fn take_events(
    Extension(api): Extension<DynAPI>,
    Path(token): Path<Uuid>,
) -> Result<Json<Vec<QuoteEvent>>, Error> {
    let events = api.take_quote_events(token).await?;

    Ok(events.into())
}

pub async fn close(
    Extension(api): Extension<DynAPI>,
    Path(token): Path<Uuid>,
) -> Result<Json<()>, Error> {
    api.close_quote(token).await?;

    Ok(().into())
}
