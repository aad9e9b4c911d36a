//! Orchestrator
//!
//! Translates experiment and mission lifecycle events into hypothesis
//! definitions and observation batches, mirrors every trait signal onto the
//! global profile and keeps the autonomous queue fresh after each mutation.

pub mod domain;
pub mod snapshot;
pub mod traits;

pub use domain::*;
pub use snapshot::*;
pub use traits::*;

use crate::engine::{
    self, propose_autonomous_hypotheses, summarize_hypothesis, update_autonomous_queue,
    AutonomousContext, HypothesisSummary, ObservationOutcome, GLOBAL_PROFILE_ID,
};
use augur_core::types::{
    AgentState, HypothesisDefinition, HypothesisSource, HypothesisStatus, Observation,
    VariableDefinition, VariableKind,
};
use chrono::{DateTime, Utc};

/// Weight of trait signals derived from progress reports
pub const PROGRESS_TRAIT_WEIGHT: f64 = 0.5;

/// Weight of trait signals derived from final resolutions
pub const RESOLUTION_TRAIT_WEIGHT: f64 = 1.0;

/// Hypothesis id for an experiment
pub fn experiment_hypothesis_id(experiment_id: &str) -> String {
    format!("experiment:{}", experiment_id)
}

/// Hypothesis id shared by all missions of a type
pub fn mission_hypothesis_id(mission_type: &str) -> String {
    let normalized = normalize_label(mission_type);
    let normalized = if normalized.is_empty() {
        "general".to_string()
    } else {
        normalized
    };
    format!("mission:type:{}", normalized)
}

/// Variables every episode hypothesis is seeded with
pub fn seed_variables(trait_name: &str) -> Vec<VariableDefinition> {
    vec![
        VariableDefinition::binary("success"),
        VariableDefinition::continuous("score"),
        VariableDefinition::continuous("quality"),
        VariableDefinition::categorical("outcome", Outcome::CATEGORIES),
        VariableDefinition::time_to_event("elapsed_seconds"),
        VariableDefinition::latent_trait_for("target_trait", trait_name).with_label(trait_name),
    ]
}

/// An experiment or mission resolved to its hypothesis and measured trait
struct Episode {
    definition: HypothesisDefinition,
    trait_name: String,
}

/// Lifecycle entry points over a borrowed [`AgentState`]
#[derive(Debug, Clone, Default)]
pub struct Orchestrator {
    inference: TraitInference,
}

impl Orchestrator {
    /// Create an orchestrator with custom trait tables
    pub fn new(inference: TraitInference) -> Self {
        Self { inference }
    }

    /// Trait tables in use
    pub fn inference(&self) -> &TraitInference {
        &self.inference
    }

    fn experiment_episode(&self, experiment: &Experiment) -> Episode {
        let text = [Some(experiment.title.as_str()), experiment.description.as_deref()]
            .into_iter()
            .flatten()
            .collect::<Vec<_>>()
            .join(" ");
        let trait_name = self.inference.infer(
            experiment.target_trait.as_deref(),
            experiment.experiment_type.as_deref(),
            &text,
        );

        let mut definition = HypothesisDefinition::new(
            experiment_hypothesis_id(&experiment.id),
            experiment.title.clone(),
            HypothesisSource::Experiment,
            "experiment_outcome",
        )
        .with_variables(seed_variables(&trait_name));
        if let Some(description) = &experiment.description {
            definition = definition.with_description(description.clone());
        }

        Episode {
            definition,
            trait_name,
        }
    }

    fn mission_episode(&self, mission: &Mission) -> Episode {
        let mut parts = vec![mission.title.as_str()];
        parts.extend(mission.description.as_deref());
        parts.extend(mission.objectives.iter().map(String::as_str));
        let trait_name = self
            .inference
            .infer(None, Some(mission.mission_type.as_str()), &parts.join(" "));

        let definition = HypothesisDefinition::new(
            mission_hypothesis_id(&mission.mission_type),
            format!("Mission type: {}", mission.mission_type.trim()),
            HypothesisSource::Mission,
            "mission_outcome",
        )
        .with_description(format!(
            "Pooled outcomes of '{}' missions",
            mission.mission_type.trim()
        ))
        .with_variables(seed_variables(&trait_name));

        Episode {
            definition,
            trait_name,
        }
    }

    /// Make sure the global trait profile exists
    pub fn ensure_global_profile(&self, state: &mut AgentState, at: DateTime<Utc>) {
        engine::ensure_hypothesis(state, &self.inference.profile_definition(), at);
    }

    fn push_trait_signal(
        &self,
        state: &mut AgentState,
        episode: &Episode,
        value: f64,
        weight: f64,
        at: DateTime<Utc>,
    ) {
        let observation = Observation::value(value).with_weight(weight);
        engine::apply_observation(state, &episode.definition, "target_trait", &observation, at);
        self.mirror_trait(state, &episode.trait_name, &observation, at);
    }

    fn mirror_trait(
        &self,
        state: &mut AgentState,
        trait_name: &str,
        observation: &Observation,
        at: DateTime<Utc>,
    ) {
        let profile = self.inference.profile_definition();
        if engine::apply_observation(state, &profile, trait_name, observation, at).is_none() {
            tracing::debug!("Trait '{}' is not on the global profile", trait_name);
        }
    }

    fn initialize_episode(
        &self,
        state: &mut AgentState,
        episode: &Episode,
        overrides: &AutonomousContext,
        at: DateTime<Utc>,
    ) -> HypothesisSummary {
        self.ensure_global_profile(state, at);
        engine::ensure_hypothesis(state, &episode.definition, at);
        engine::apply_observation(
            state,
            &episode.definition,
            "outcome",
            &Observation::category(Outcome::Unknown.as_str()),
            at,
        );
        self.push_trait_signal(state, episode, 0.5, 0.5, at);
        self.finish(state, episode, overrides, at)
    }

    fn progress_episode(
        &self,
        state: &mut AgentState,
        episode: &Episode,
        update: &ProgressUpdate,
        overrides: &AutonomousContext,
        at: DateTime<Utc>,
    ) -> HypothesisSummary {
        self.ensure_global_profile(state, at);

        let text = update.result.as_deref();
        let outcome = text.map(Outcome::classify).unwrap_or(Outcome::Unknown);
        let score = clamp_score(update.score);

        let mut batch = Vec::new();
        if let Some(score) = score {
            batch.push(("score", Observation::value(score)));
        }
        if let Some(quality) = evidence_quality(score, text) {
            batch.push(("quality", Observation::value(quality)));
        }
        if let Some(flag) = outcome.as_flag() {
            batch.push(("success", Observation::value(flag)));
        }
        if outcome != Outcome::Unknown {
            batch.push(("outcome", Observation::category(outcome.as_str())));
        }
        if let Some(elapsed) = valid_elapsed(update.elapsed_seconds) {
            batch.push(("elapsed_seconds", Observation::elapsed(elapsed).censored()));
        }
        engine::apply_observations(state, &episode.definition, &batch, at);

        self.push_trait_signal(
            state,
            episode,
            trait_signal(outcome, score),
            PROGRESS_TRAIT_WEIGHT,
            at,
        );
        self.finish(state, episode, overrides, at)
    }

    fn resolve_episode(
        &self,
        state: &mut AgentState,
        episode: &Episode,
        resolution: &Resolution,
        overrides: &AutonomousContext,
        at: DateTime<Utc>,
    ) -> HypothesisSummary {
        self.ensure_global_profile(state, at);

        let text = resolution.result.as_deref();
        let outcome = match (
            text.map(Outcome::classify).unwrap_or(Outcome::Unknown),
            resolution.success,
        ) {
            (Outcome::Abandoned, _) => Outcome::Abandoned,
            (_, Some(true)) => Outcome::Success,
            (_, Some(false)) => Outcome::Failure,
            (classified, None) => classified,
        };
        let success = resolution.success.or(match outcome {
            Outcome::Success => Some(true),
            Outcome::Failure | Outcome::Abandoned => Some(false),
            Outcome::Unknown => None,
        });
        let score = clamp_score(resolution.score);

        let mut batch = Vec::new();
        if let Some(flag) = success {
            batch.push(("success", Observation::value(flag)));
        }
        if let Some(score) = score {
            batch.push(("score", Observation::value(score)));
        }
        if let Some(quality) = evidence_quality(score, text) {
            batch.push(("quality", Observation::value(quality)));
        }
        batch.push(("outcome", Observation::category(outcome.as_str())));
        if let Some(elapsed) = valid_elapsed(resolution.elapsed_seconds) {
            batch.push(("elapsed_seconds", Observation::elapsed(elapsed)));
        }
        engine::apply_observations(state, &episode.definition, &batch, at);

        self.push_trait_signal(
            state,
            episode,
            trait_signal(outcome, score),
            RESOLUTION_TRAIT_WEIGHT,
            at,
        );

        let status = if outcome == Outcome::Abandoned {
            HypothesisStatus::Retired
        } else {
            HypothesisStatus::Resolved
        };
        let note = text
            .map(str::trim)
            .filter(|t| !t.is_empty())
            .unwrap_or(outcome.as_str());
        engine::resolve_hypothesis(state, &episode.definition.id, Some(note), Some(status), at);

        self.finish(state, episode, overrides, at)
    }

    fn finish(
        &self,
        state: &mut AgentState,
        episode: &Episode,
        overrides: &AutonomousContext,
        at: DateTime<Utc>,
    ) -> HypothesisSummary {
        let summary = summarize_hypothesis(engine::ensure_hypothesis(state, &episode.definition, at));
        self.refresh_autonomous(state, overrides, at);
        summary
    }

    /// Seed an experiment hypothesis
    pub fn initialize_experiment(
        &self,
        state: &mut AgentState,
        experiment: &Experiment,
        overrides: &AutonomousContext,
        at: DateTime<Utc>,
    ) -> HypothesisSummary {
        let episode = self.experiment_episode(experiment);
        tracing::info!(
            "Initializing experiment '{}' targeting {}",
            experiment.id,
            episode.trait_name
        );
        self.initialize_episode(state, &episode, overrides, at)
    }

    /// Fold an experiment progress report into beliefs
    pub fn record_experiment_progress(
        &self,
        state: &mut AgentState,
        experiment: &Experiment,
        update: &ProgressUpdate,
        overrides: &AutonomousContext,
        at: DateTime<Utc>,
    ) -> HypothesisSummary {
        let episode = self.experiment_episode(experiment);
        self.progress_episode(state, &episode, update, overrides, at)
    }

    /// Apply the final battery for an experiment and close its hypothesis
    pub fn resolve_experiment(
        &self,
        state: &mut AgentState,
        experiment: &Experiment,
        resolution: &Resolution,
        overrides: &AutonomousContext,
        at: DateTime<Utc>,
    ) -> HypothesisSummary {
        let episode = self.experiment_episode(experiment);
        self.resolve_episode(state, &episode, resolution, overrides, at)
    }

    /// Seed the hypothesis for a mission's type
    pub fn initialize_mission(
        &self,
        state: &mut AgentState,
        mission: &Mission,
        overrides: &AutonomousContext,
        at: DateTime<Utc>,
    ) -> HypothesisSummary {
        let episode = self.mission_episode(mission);
        tracing::info!(
            "Initializing mission '{}' ({}) targeting {}",
            mission.id,
            episode.definition.id,
            episode.trait_name
        );
        self.initialize_episode(state, &episode, overrides, at)
    }

    /// Fold a mission progress report into beliefs
    pub fn record_mission_progress(
        &self,
        state: &mut AgentState,
        mission: &Mission,
        update: &ProgressUpdate,
        overrides: &AutonomousContext,
        at: DateTime<Utc>,
    ) -> HypothesisSummary {
        let episode = self.mission_episode(mission);
        self.progress_episode(state, &episode, update, overrides, at)
    }

    /// Apply the final battery for a mission and close its type hypothesis
    pub fn resolve_mission(
        &self,
        state: &mut AgentState,
        mission: &Mission,
        resolution: &Resolution,
        overrides: &AutonomousContext,
        at: DateTime<Utc>,
    ) -> HypothesisSummary {
        let episode = self.mission_episode(mission);
        self.resolve_episode(state, &episode, resolution, overrides, at)
    }

    /// Apply one observation to an existing hypothesis
    ///
    /// Latent-trait observations on anything but the profile are mirrored
    /// onto the matching global trait.
    pub fn observe(
        &self,
        state: &mut AgentState,
        hypothesis_id: &str,
        variable_id: &str,
        observation: &Observation,
        overrides: &AutonomousContext,
        at: DateTime<Utc>,
    ) -> Option<ObservationOutcome> {
        let definition = state.hypothesis(hypothesis_id)?.definition.clone();
        let variable = definition.variable(variable_id)?.clone();

        self.ensure_global_profile(state, at);
        let outcome = engine::apply_observation(state, &definition, variable_id, observation, at)?;

        if variable.kind() == VariableKind::LatentTrait && hypothesis_id != GLOBAL_PROFILE_ID {
            let trait_name = variable.trait_name().unwrap_or(&variable.id);
            if self.inference.is_known(trait_name) {
                self.mirror_trait(state, trait_name, observation, at);
            }
        }

        self.refresh_autonomous(state, overrides, at);
        Some(outcome)
    }

    /// Close an arbitrary hypothesis
    pub fn close(
        &self,
        state: &mut AgentState,
        hypothesis_id: &str,
        resolution: Option<&str>,
        status: Option<HypothesisStatus>,
        overrides: &AutonomousContext,
        at: DateTime<Utc>,
    ) -> Option<HypothesisSummary> {
        let closed = engine::resolve_hypothesis(state, hypothesis_id, resolution, status, at)?;
        self.refresh_autonomous(state, overrides, at);
        Some(summarize_hypothesis(&closed))
    }

    /// Turn a queued proposal into a live system hypothesis
    pub fn adopt_proposal(
        &self,
        state: &mut AgentState,
        proposal_id: &str,
        overrides: &AutonomousContext,
        at: DateTime<Utc>,
    ) -> Option<HypothesisSummary> {
        let position = state
            .autonomous_queue
            .iter()
            .position(|p| p.id == proposal_id)?;
        let proposal = state.autonomous_queue.remove(position);
        tracing::info!("Adopting proposal '{}' ({:.2})", proposal.id, proposal.score);

        self.ensure_global_profile(state, at);
        let summary =
            summarize_hypothesis(engine::ensure_hypothesis(state, &proposal.to_definition(), at));
        self.refresh_autonomous(state, overrides, at);
        Some(summary)
    }

    /// Signals derivable from the state itself
    pub fn compute_context(state: &AgentState) -> AutonomousContext {
        let probabilities: Vec<f64> = state
            .hypotheses
            .values()
            .filter(|h| h.definition.source == HypothesisSource::Mission)
            .filter_map(|h| summarize_hypothesis(h).success_probability)
            .collect();

        let mission_failure_rate = (!probabilities.is_empty()).then(|| {
            let mean = probabilities.iter().sum::<f64>() / probabilities.len() as f64;
            (1.0 - mean).clamp(0.0, 1.0)
        });

        AutonomousContext {
            mission_failure_rate,
            ..Default::default()
        }
    }

    /// Recompute proposals and replace the queue
    ///
    /// Proposals whose hypothesis is already live are skipped. Returns the
    /// number of newly queued ids.
    pub fn refresh_autonomous(
        &self,
        state: &mut AgentState,
        overrides: &AutonomousContext,
        at: DateTime<Utc>,
    ) -> usize {
        let context = Self::compute_context(state).merge(overrides);
        let proposals: Vec<_> = propose_autonomous_hypotheses(state, &context, at)
            .into_iter()
            .filter(|p| !state.hypothesis(&p.id).is_some_and(|h| h.is_active()))
            .collect();
        update_autonomous_queue(state, proposals, at)
    }

    /// Snapshot for downstream readers
    pub fn snapshot(&self, state: &AgentState, history_window: usize) -> BeliefSnapshot {
        BeliefSnapshot::from_state(state, history_window)
    }
}

fn valid_elapsed(seconds: Option<f64>) -> Option<f64> {
    seconds.filter(|s| s.is_finite() && *s >= 0.0)
}
