use async_trait::async_trait;
use std::collections::HashMap;
use tokio::sync::Mutex;

use super::{SessionKey, SessionStore};
use crate::error::Error;

#[derive(Debug, Default)]
pub struct MemorySessionStore {
    values: Mutex<HashMap<SessionKey, String>>,
}

impl MemorySessionStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl SessionStore for MemorySessionStore {
    async fn get(&self, key: SessionKey) -> Result<Option<String>, Error> {
        Ok(self.values.lock().await.get(&key).cloned())
    }

    async fn set(&self, key: SessionKey, value: String) -> Result<(), Error> {
        self.values.lock().await.insert(key, value);
        Ok(())
    }

    async fn clear(&self) -> Result<(), Error> {
        self.values.lock().await.clear();
        Ok(())
    }
}

#[test]
fn memory_store_get_set_clear() {
    use tokio_test::block_on;

    let store = MemorySessionStore::new();

    assert_eq!(block_on(store.get(SessionKey::UserId)).unwrap(), None);

    block_on(store.set(SessionKey::UserId, "42".into())).unwrap();
    block_on(store.set(SessionKey::UserId, "43".into())).unwrap();
    block_on(store.set(SessionKey::IsLoggedIn, "true".into())).unwrap();

    assert_eq!(
        block_on(store.get(SessionKey::UserId)).unwrap(),
        Some("43".into())
    );

    block_on(store.clear()).unwrap();

    assert_eq!(block_on(store.get(SessionKey::UserId)).unwrap(), None);
    assert_eq!(block_on(store.get(SessionKey::IsLoggedIn)).unwrap(), None);
}
