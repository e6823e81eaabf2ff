mod account_api;
#[cfg(test)]
mod fakes;
mod place_api;
mod quote_api;
mod quote_flow;
mod quote_session;

use std::collections::HashMap;
use std::sync::Arc;

use tokio::sync::RwLock;
use uuid::Uuid;

use crate::{
    api::API,
    error::{invalid_input_error, Error},
    external::{DynBackend, DynMaps},
    session::DynSessionStore,
};

pub use quote_flow::price_ride_options;
pub use quote_session::QuoteSession;

pub struct Engine {
    maps: DynMaps,
    backend: DynBackend,
    store: DynSessionStore,
    quotes: RwLock<HashMap<Uuid, Arc<QuoteSession>>>,
}

impl Engine {
    #[tracing::instrument(name = "Engine::new", skip_all)]
    pub fn new(maps: DynMaps, backend: DynBackend, store: DynSessionStore) -> Self {
        Self {
            maps,
            backend,
            store,
            quotes: RwLock::new(HashMap::new()),
        }
    }

    async fn find_session(&self, token: Uuid) -> Result<Arc<QuoteSession>, Error> {
        self.quotes
            .read()
            .await
            .get(&token)
            .cloned()
            .ok_or_else(|| invalid_input_error())
    }
}

impl API for Engine {}
