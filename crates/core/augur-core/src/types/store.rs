//! Persistence contract for per-agent state

use super::AgentState;
use crate::Result;
use async_trait::async_trait;

/// Durable storage for [`AgentState`], keyed by agent identity
///
/// Implementations only move whole documents; serialization of updates per
/// agent is the caller's responsibility.
#[async_trait]
pub trait StateStore: Send + Sync {
    /// Load the stored state, `None` if the agent has never been saved
    async fn load(&self, agent_id: &str) -> Result<Option<AgentState>>;

    /// Replace the stored state
    async fn save(&self, agent_id: &str, state: &AgentState) -> Result<()>;

    /// Push any buffered writes to the backing medium
    async fn flush(&self) -> Result<()> {
        Ok(())
    }

    /// Short name used in logs
    fn name(&self) -> &str {
        "state_store"
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;
    use std::collections::HashMap;
    use std::sync::Mutex;

    #[derive(Default)]
    struct VecStore {
        saved: Mutex<HashMap<String, AgentState>>,
    }

    #[async_trait]
    impl StateStore for VecStore {
        async fn load(&self, agent_id: &str) -> Result<Option<AgentState>> {
            Ok(self.saved.lock().unwrap().get(agent_id).cloned())
        }

        async fn save(&self, agent_id: &str, state: &AgentState) -> Result<()> {
            self.saved
                .lock()
                .unwrap()
                .insert(agent_id.to_string(), state.clone());
            Ok(())
        }
    }

    #[tokio::test]
    async fn test_default_methods() {
        let store: Box<dyn StateStore> = Box::new(VecStore::default());
        assert_eq!(store.name(), "state_store");
        assert!(store.flush().await.is_ok());

        assert!(store.load("agent").await.unwrap().is_none());
        let state = AgentState::new(Utc::now());
        store.save("agent", &state).await.unwrap();
        assert_eq!(store.load("agent").await.unwrap(), Some(state));
    }
}
