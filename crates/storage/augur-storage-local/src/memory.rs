use async_trait::async_trait;
use augur_core::types::{AgentState, StateStore};
use augur_core::Result;
use parking_lot::RwLock;
use std::collections::HashMap;

/// Process-local store; state is lost on exit
#[derive(Debug, Default)]
pub struct MemoryStateStore {
    states: RwLock<HashMap<String, AgentState>>,
}

impl MemoryStateStore {
    /// Create an empty store
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of agents with stored state
    pub fn len(&self) -> usize {
        self.states.read().len()
    }

    /// Whether no agent has been saved yet
    pub fn is_empty(&self) -> bool {
        self.states.read().is_empty()
    }
}

#[async_trait]
impl StateStore for MemoryStateStore {
    async fn load(&self, agent_id: &str) -> Result<Option<AgentState>> {
        Ok(self.states.read().get(agent_id).cloned())
    }

    async fn save(&self, agent_id: &str, state: &AgentState) -> Result<()> {
        self.states
            .write()
            .insert(agent_id.to_string(), state.clone());
        Ok(())
    }

    fn name(&self) -> &str {
        "memory"
    }
}
