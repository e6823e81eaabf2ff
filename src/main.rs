use std::sync::Arc;

use hailer::config::Config;
use hailer::db::PgPool;
use hailer::engine::Engine;
use hailer::error::Error;
use hailer::external::{Backend, GoogleMaps};
use hailer::server::serve;
use hailer::session::{DynSessionStore, MemorySessionStore, PgSessionStore};

#[tokio::main]
async fn main() -> Result<(), Error> {
    dotenv::dotenv().ok();
    tracing_subscriber::fmt::init();

    let config = Config::from_env()?;

    let store: DynSessionStore = match &config.database_url {
        Some(url) => {
            let PgPool(pool) = PgPool::new(url, config.database_max_connections).await?;
            Arc::new(PgSessionStore::new(pool).await?)
        }
        None => {
            tracing::warn!("DATABASE_URL not set, sessions are kept in memory");
            Arc::new(MemorySessionStore::new())
        }
    };

    let engine = Engine::new(
        Arc::new(GoogleMaps::from_config(&config)),
        Arc::new(Backend::from_config(&config)),
        store,
    );

    serve(engine, config.listen_addr).await
}
