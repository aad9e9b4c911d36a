//! Belief Service
//!
//! Async façade over a [`StateStore`]. Every operation is a serialized
//! load → transform → save cycle for one agent id; different agents never
//! wait on each other.

use crate::engine::{AutonomousContext, HypothesisSummary, ObservationOutcome};
use crate::orchestrator::{
    BeliefSnapshot, Experiment, Mission, Orchestrator, ProgressUpdate, Resolution,
};
use augur_core::config::DEFAULT_HISTORY_WINDOW;
use augur_core::types::{AgentState, HypothesisStatus, Observation, StateStore};
use augur_core::{AugurError, Result};
use chrono::{DateTime, Utc};
use parking_lot::{Mutex, RwLock};
use std::collections::HashMap;
use std::sync::Arc;

/// Per-agent belief operations backed by a state store
pub struct BeliefService {
    /// Persistence adapter
    store: Arc<dyn StateStore>,

    /// Lifecycle rules
    orchestrator: Orchestrator,

    /// History entries exposed in snapshots
    history_window: usize,

    /// One async lock per agent id with an operation in flight
    locks: Mutex<HashMap<String, Arc<tokio::sync::Mutex<()>>>>,

    /// Externally supplied signals; one entry per agent passed to
    /// `set_context` until `clear_context`
    contexts: RwLock<HashMap<String, AutonomousContext>>,
}

impl BeliefService {
    /// Create a service with default trait tables
    pub fn new(store: Arc<dyn StateStore>) -> Self {
        Self::with_orchestrator(store, Orchestrator::default())
    }

    /// Create a service with a custom orchestrator
    pub fn with_orchestrator(store: Arc<dyn StateStore>, orchestrator: Orchestrator) -> Self {
        Self {
            store,
            orchestrator,
            history_window: DEFAULT_HISTORY_WINDOW,
            locks: Mutex::new(HashMap::new()),
            contexts: RwLock::new(HashMap::new()),
        }
    }

    /// Number of history entries included in snapshots
    pub fn with_history_window(mut self, window: usize) -> Self {
        self.history_window = window;
        self
    }

    /// Orchestrator in use
    pub fn orchestrator(&self) -> &Orchestrator {
        &self.orchestrator
    }

    fn agent_lock(&self, agent_id: &str) -> Arc<tokio::sync::Mutex<()>> {
        let mut locks = self.locks.lock();
        locks
            .entry(agent_id.to_string())
            .or_insert_with(|| Arc::new(tokio::sync::Mutex::new(())))
            .clone()
    }

    /// Forget an agent's lock once no other operation holds or awaits it
    fn release_lock(&self, agent_id: &str) {
        let mut locks = self.locks.lock();
        if locks
            .get(agent_id)
            .is_some_and(|lock| Arc::strong_count(lock) == 1)
        {
            locks.remove(agent_id);
        }
    }

    fn validate_agent_id(agent_id: &str) -> Result<()> {
        if agent_id.trim().is_empty() {
            return Err(AugurError::validation("agent id must not be empty"));
        }
        Ok(())
    }

    /// Replace the external signals used when ranking proposals
    pub fn set_context(&self, agent_id: &str, context: AutonomousContext) {
        self.contexts.write().insert(agent_id.to_string(), context);
    }

    /// Drop the external signals of an agent
    pub fn clear_context(&self, agent_id: &str) {
        self.contexts.write().remove(agent_id);
    }

    /// External signals currently set for an agent
    pub fn context(&self, agent_id: &str) -> AutonomousContext {
        self.contexts
            .read()
            .get(agent_id)
            .cloned()
            .unwrap_or_default()
    }

    /// Load, transform and save one agent's state under its lock
    ///
    /// The transform receives the current time; a state is created empty on
    /// first access. Nothing is saved if loading fails.
    ///
    /// A store that reports [`AugurError::Unpersisted`] has kept the new
    /// state and will retry the write, so the transform counts as applied:
    /// its output is returned and the failure is only logged. Callers must
    /// not repeat the operation.
    pub async fn with_state<F, T>(&self, agent_id: &str, transform: F) -> Result<T>
    where
        F: FnOnce(&mut AgentState, DateTime<Utc>) -> T,
    {
        Self::validate_agent_id(agent_id)?;
        let lock = self.agent_lock(agent_id);
        let result = {
            let _guard = lock.lock().await;
            self.load_transform_save(agent_id, transform).await
        };
        drop(lock);
        self.release_lock(agent_id);
        result
    }

    async fn load_transform_save<F, T>(&self, agent_id: &str, transform: F) -> Result<T>
    where
        F: FnOnce(&mut AgentState, DateTime<Utc>) -> T,
    {
        let now = Utc::now();
        let mut state = match self.store.load(agent_id).await? {
            Some(state) => state,
            None => {
                tracing::debug!("No stored state for agent '{}'; starting empty", agent_id);
                AgentState::new(now)
            }
        };

        let output = transform(&mut state, now);
        match self.store.save(agent_id, &state).await {
            Ok(()) => Ok(output),
            Err(AugurError::Unpersisted { pending, message, .. }) => {
                tracing::warn!(
                    "State for agent '{}' applied but not yet durable ({} pending): {}",
                    agent_id,
                    pending,
                    message
                );
                Ok(output)
            }
            Err(e) => Err(e),
        }
    }

    /// Read-only snapshot; does not create or save state
    pub async fn snapshot(&self, agent_id: &str) -> Result<BeliefSnapshot> {
        Self::validate_agent_id(agent_id)?;
        let lock = self.agent_lock(agent_id);
        let loaded = {
            let _guard = lock.lock().await;
            self.store.load(agent_id).await
        };
        drop(lock);
        self.release_lock(agent_id);

        let state = loaded?.unwrap_or_else(|| AgentState::new(Utc::now()));
        Ok(self.orchestrator.snapshot(&state, self.history_window))
    }

    /// Seed an experiment hypothesis
    pub async fn initialize_experiment(
        &self,
        agent_id: &str,
        experiment: &Experiment,
    ) -> Result<HypothesisSummary> {
        let overrides = self.context(agent_id);
        self.with_state(agent_id, |state, now| {
            self.orchestrator
                .initialize_experiment(state, experiment, &overrides, now)
        })
        .await
    }

    /// Record experiment progress
    pub async fn record_experiment_progress(
        &self,
        agent_id: &str,
        experiment: &Experiment,
        update: &ProgressUpdate,
    ) -> Result<HypothesisSummary> {
        let overrides = self.context(agent_id);
        self.with_state(agent_id, |state, now| {
            self.orchestrator
                .record_experiment_progress(state, experiment, update, &overrides, now)
        })
        .await
    }

    /// Resolve an experiment
    pub async fn resolve_experiment(
        &self,
        agent_id: &str,
        experiment: &Experiment,
        resolution: &Resolution,
    ) -> Result<HypothesisSummary> {
        let overrides = self.context(agent_id);
        self.with_state(agent_id, |state, now| {
            self.orchestrator
                .resolve_experiment(state, experiment, resolution, &overrides, now)
        })
        .await
    }

    /// Seed the hypothesis for a mission's type
    pub async fn initialize_mission(
        &self,
        agent_id: &str,
        mission: &Mission,
    ) -> Result<HypothesisSummary> {
        let overrides = self.context(agent_id);
        self.with_state(agent_id, |state, now| {
            self.orchestrator
                .initialize_mission(state, mission, &overrides, now)
        })
        .await
    }

    /// Record mission progress
    pub async fn record_mission_progress(
        &self,
        agent_id: &str,
        mission: &Mission,
        update: &ProgressUpdate,
    ) -> Result<HypothesisSummary> {
        let overrides = self.context(agent_id);
        self.with_state(agent_id, |state, now| {
            self.orchestrator
                .record_mission_progress(state, mission, update, &overrides, now)
        })
        .await
    }

    /// Resolve a mission
    pub async fn resolve_mission(
        &self,
        agent_id: &str,
        mission: &Mission,
        resolution: &Resolution,
    ) -> Result<HypothesisSummary> {
        let overrides = self.context(agent_id);
        self.with_state(agent_id, |state, now| {
            self.orchestrator
                .resolve_mission(state, mission, resolution, &overrides, now)
        })
        .await
    }

    /// Apply an observation to an existing hypothesis
    pub async fn observe(
        &self,
        agent_id: &str,
        hypothesis_id: &str,
        variable_id: &str,
        observation: &Observation,
    ) -> Result<ObservationOutcome> {
        let overrides = self.context(agent_id);
        self.with_state(agent_id, |state, now| {
            self.orchestrator
                .observe(state, hypothesis_id, variable_id, observation, &overrides, now)
        })
        .await?
        .ok_or_else(|| {
            AugurError::not_found(format!(
                "variable '{}' on hypothesis '{}'",
                variable_id, hypothesis_id
            ))
        })
    }

    /// Close an arbitrary hypothesis
    pub async fn close_hypothesis(
        &self,
        agent_id: &str,
        hypothesis_id: &str,
        resolution: Option<&str>,
        status: Option<HypothesisStatus>,
    ) -> Result<HypothesisSummary> {
        let overrides = self.context(agent_id);
        self.with_state(agent_id, |state, now| {
            self.orchestrator
                .close(state, hypothesis_id, resolution, status, &overrides, now)
        })
        .await?
        .ok_or_else(|| AugurError::not_found(format!("hypothesis '{}'", hypothesis_id)))
    }

    /// Adopt a queued proposal as a live hypothesis
    pub async fn adopt_proposal(
        &self,
        agent_id: &str,
        proposal_id: &str,
    ) -> Result<HypothesisSummary> {
        let overrides = self.context(agent_id);
        self.with_state(agent_id, |state, now| {
            self.orchestrator
                .adopt_proposal(state, proposal_id, &overrides, now)
        })
        .await?
        .ok_or_else(|| AugurError::not_found(format!("queued proposal '{}'", proposal_id)))
    }

    /// Recompute the proposal queue with the current external signals
    pub async fn refresh_proposals(&self, agent_id: &str) -> Result<usize> {
        let overrides = self.context(agent_id);
        self.with_state(agent_id, |state, now| {
            self.orchestrator.refresh_autonomous(state, &overrides, now)
        })
        .await
    }

    /// Flush buffered writes in the underlying store
    pub async fn flush(&self) -> Result<()> {
        self.store.flush().await
    }
}
