//! Hypothesis Engine
//!
//! Synchronous operations over a borrowed [`AgentState`]: hypothesis upserts,
//! evidence application, lifecycle transitions, summaries and the
//! autonomous proposal queue. Nothing here performs I/O.

pub mod autonomous;
pub mod summary;

pub use autonomous::*;
pub use summary::*;

use augur_core::types::{
    AgentState, HistoryEntry, HistoryEvent, HypothesisDefinition, HypothesisState,
    HypothesisStatus, Observation,
};
use augur_core::variables::{self, VariableSummary};
use chrono::{DateTime, Utc};
use std::collections::BTreeMap;

/// Result of applying one observation
#[derive(Debug, Clone, PartialEq)]
pub struct ObservationOutcome {
    /// Summary of the variable after the update
    pub summary: VariableSummary,

    /// Whether the observation could be interpreted for the variable's kind
    pub parsed: bool,
}

fn new_hypothesis(definition: &HypothesisDefinition, at: DateTime<Utc>) -> HypothesisState {
    let posteriors = definition
        .variables
        .iter()
        .map(|v| (v.id.clone(), variables::initialize(v)))
        .collect();

    HypothesisState {
        definition: definition.clone(),
        status: HypothesisStatus::Active,
        created_at: at,
        updated_at: at,
        resolved_at: None,
        resolution: None,
        evidence_count: 0,
        posteriors,
    }
}

/// Idempotent upsert of a hypothesis
///
/// Existing posteriors survive for variables whose id and kind are unchanged;
/// new or re-kinded variables start from their prior and removed variables
/// are dropped. Status is never touched.
pub fn ensure_hypothesis<'a>(
    state: &'a mut AgentState,
    definition: &HypothesisDefinition,
    at: DateTime<Utc>,
) -> &'a mut HypothesisState {
    state.updated_at = at;

    let created = !state.hypotheses.contains_key(&definition.id);
    if created {
        tracing::info!(
            "Creating {} hypothesis '{}' ({} variables)",
            definition.source.as_str(),
            definition.id,
            definition.variables.len()
        );
        state.push_history(
            HistoryEntry::new(
                at,
                HistoryEvent::HypothesisCreated,
                format!("Created hypothesis '{}'", definition.title),
            )
            .with_hypothesis(definition.id.clone()),
        );
    }

    let hypothesis = state
        .hypotheses
        .entry(definition.id.clone())
        .or_insert_with(|| new_hypothesis(definition, at));

    if !created {
        let mut previous = std::mem::take(&mut hypothesis.posteriors);
        let posteriors: BTreeMap<_, _> = definition
            .variables
            .iter()
            .map(|variable| {
                let kept = previous
                    .remove(&variable.id)
                    .filter(|p| p.kind() == variable.kind());
                let posterior = kept.unwrap_or_else(|| variables::initialize(variable));
                (variable.id.clone(), posterior)
            })
            .collect();

        if !previous.is_empty() {
            tracing::debug!(
                "Dropping {} stale posteriors from '{}'",
                previous.len(),
                definition.id
            );
        }

        hypothesis.posteriors = posteriors;
        hypothesis.definition = definition.clone();
        hypothesis.updated_at = at;
    }

    hypothesis
}

/// Apply one observation to a variable of a hypothesis
///
/// Returns `None` when the definition has no such variable. Otherwise the
/// evidence count advances by one even if the observation was unusable.
pub fn apply_observation(
    state: &mut AgentState,
    definition: &HypothesisDefinition,
    variable_id: &str,
    observation: &Observation,
    at: DateTime<Utc>,
) -> Option<ObservationOutcome> {
    let hypothesis = ensure_hypothesis(state, definition, at);
    let Some(variable) = hypothesis.definition.variable(variable_id).cloned() else {
        tracing::debug!(
            "Hypothesis '{}' has no variable '{}'; ignoring observation",
            definition.id,
            variable_id
        );
        return None;
    };

    let current = hypothesis
        .posteriors
        .get(variable_id)
        .cloned()
        .unwrap_or_else(|| variables::initialize(&variable));
    let (next, parsed) = variables::update_checked(&variable, &current, observation);
    let summary = variables::summarize(&next);

    hypothesis.posteriors.insert(variable.id.clone(), next);
    hypothesis.evidence_count += 1;
    hypothesis.updated_at = at;

    let mut message = if parsed {
        let estimate = summary
            .estimate
            .map(|e| format!("{:.3}", e))
            .unwrap_or_else(|| "n/a".to_string());
        format!(
            "{} <- {} (estimate {}, uncertainty {:.3})",
            variable.id,
            observation.describe(),
            estimate,
            summary.uncertainty
        )
    } else {
        tracing::debug!(
            "Unparseable observation for '{}.{}': {}",
            definition.id,
            variable.id,
            observation.describe()
        );
        format!("{} ignored unparseable {}", variable.id, observation.describe())
    };
    if let Some(note) = &observation.note {
        message.push_str(&format!(" [{}]", note));
    }

    state.push_history(
        HistoryEntry::new(at, HistoryEvent::Observation, message)
            .with_hypothesis(definition.id.clone())
            .with_variable(variable.id),
    );

    Some(ObservationOutcome { summary, parsed })
}

/// Apply a batch sequentially under one timestamp
///
/// Returns how many items named a known variable.
pub fn apply_observations<K: AsRef<str>>(
    state: &mut AgentState,
    definition: &HypothesisDefinition,
    batch: &[(K, Observation)],
    at: DateTime<Utc>,
) -> usize {
    batch
        .iter()
        .filter(|(variable_id, observation)| {
            apply_observation(state, definition, variable_id.as_ref(), observation, at).is_some()
        })
        .count()
}

/// Move an active hypothesis to a terminal status
///
/// `status` defaults to resolved; asking for `Active` is treated the same.
/// Unknown ids return `None` without touching the state, and hypotheses that
/// are already terminal come back unchanged.
pub fn resolve_hypothesis(
    state: &mut AgentState,
    hypothesis_id: &str,
    resolution: Option<&str>,
    status: Option<HypothesisStatus>,
    at: DateTime<Utc>,
) -> Option<HypothesisState> {
    let hypothesis = state.hypotheses.get_mut(hypothesis_id)?;
    if hypothesis.status.is_terminal() {
        tracing::debug!(
            "Hypothesis '{}' already {}; not resolving again",
            hypothesis_id,
            hypothesis.status.as_str()
        );
        return Some(hypothesis.clone());
    }

    let status = match status {
        Some(HypothesisStatus::Retired) => HypothesisStatus::Retired,
        _ => HypothesisStatus::Resolved,
    };
    hypothesis.status = status;
    hypothesis.resolved_at = Some(at);
    hypothesis.resolution = resolution.map(str::to_string);
    hypothesis.updated_at = at;
    let resolved = hypothesis.clone();

    tracing::info!("Hypothesis '{}' {}", hypothesis_id, status.as_str());
    let message = match resolution {
        Some(note) => format!("Hypothesis {}: {}", status.as_str(), note),
        None => format!("Hypothesis {}", status.as_str()),
    };
    state.updated_at = at;
    state.push_history(
        HistoryEntry::new(at, HistoryEvent::Resolution, message).with_hypothesis(hypothesis_id),
    );

    Some(resolved)
}
