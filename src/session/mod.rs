mod memory;
mod postgres;

use async_trait::async_trait;
use std::sync::Arc;

use crate::error::Error;

pub use memory::MemorySessionStore;
pub use postgres::PgSessionStore;

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum SessionKey {
    IsLoggedIn,
    OnboardingSeen,
    UserId,
    DriverId,
}

impl SessionKey {
    pub fn name(&self) -> &'static str {
        match self {
            Self::IsLoggedIn => "is_logged_in",
            Self::OnboardingSeen => "onboarding_seen",
            Self::UserId => "user_id",
            Self::DriverId => "driver_id",
        }
    }
}

/// Persisted flags of the client session (login, onboarding, cached ids).
#[async_trait]
pub trait SessionStore: Send + Sync {
    async fn get(&self, key: SessionKey) -> Result<Option<String>, Error>;
    async fn set(&self, key: SessionKey, value: String) -> Result<(), Error>;
    async fn clear(&self) -> Result<(), Error>;
}

pub type DynSessionStore = Arc<dyn SessionStore>;
