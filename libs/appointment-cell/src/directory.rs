// libs/appointment-cell/src/directory.rs
use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;
use tokio::sync::RwLock;
use uuid::Uuid;

/// Lookup seam into the (external) profile layer: display names and preferred
/// locales for notification rendering. The booking core never manages
/// profiles itself.
#[async_trait]
pub trait PartyDirectory: Send + Sync {
    /// Display name for a user; implementations fall back to the id when the
    /// profile layer has nothing better.
    async fn display_name(&self, user_id: Uuid) -> String;

    async fn locale(&self, user_id: Uuid) -> Option<String>;
}

#[derive(Default)]
pub struct InMemoryPartyDirectory {
    entries: RwLock<HashMap<Uuid, (String, Option<String>)>>,
}

impl InMemoryPartyDirectory {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn shared() -> Arc<Self> {
        Arc::new(Self::new())
    }

    pub async fn put(&self, user_id: Uuid, name: impl Into<String>, locale: Option<String>) {
        let mut entries = self.entries.write().await;
        entries.insert(user_id, (name.into(), locale));
    }
}

#[async_trait]
impl PartyDirectory for InMemoryPartyDirectory {
    async fn display_name(&self, user_id: Uuid) -> String {
        let entries = self.entries.read().await;
        entries
            .get(&user_id)
            .map(|(name, _)| name.clone())
            .unwrap_or_else(|| user_id.to_string())
    }

    async fn locale(&self, user_id: Uuid) -> Option<String> {
        let entries = self.entries.read().await;
        entries.get(&user_id).and_then(|(_, locale)| locale.clone())
    }
}
