//! Active-learning proposals
//!
//! A small rule set looks at the agent state plus external signals and
//! suggests what to test next. Proposal ids are deterministic so repeated
//! triggers collapse into one queue entry.

use super::summary::HypothesisSummary;
use augur_core::types::{
    sort_proposals, AgentState, AutonomousProposal, HistoryEntry, HistoryEvent, HypothesisSource,
    VariableDefinition, VariableKind, QUEUE_LIMIT,
};
use augur_core::variables;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashSet};

/// Id of the long-lived trait profile hypothesis
pub const GLOBAL_PROFILE_ID: &str = "global:agent_profile";

/// Score of the baseline recalibration proposal
pub const BASELINE_SCORE: f64 = 0.62;

const TRAIT_FOCUS_MIN_UNCERTAINTY: f64 = 0.2;
const MISSION_FAILURE_TRIGGER: f64 = 0.35;
const LATENCY_TRIGGER_SECONDS: f64 = 90.0;

/// External signals that feed the proposal rules
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AutonomousContext {
    /// Share of missions believed to fail, in [0, 1]
    #[serde(default)]
    pub mission_failure_rate: Option<f64>,

    /// Mean response latency in seconds
    #[serde(default)]
    pub average_latency_seconds: Option<f64>,

    /// Engagement has dropped noticeably
    #[serde(default)]
    pub engagement_drop: Option<bool>,
}

impl AutonomousContext {
    /// Field-by-field merge where values set in `overrides` win
    pub fn merge(self, overrides: &AutonomousContext) -> Self {
        Self {
            mission_failure_rate: overrides.mission_failure_rate.or(self.mission_failure_rate),
            average_latency_seconds: overrides
                .average_latency_seconds
                .or(self.average_latency_seconds),
            engagement_drop: overrides.engagement_drop.or(self.engagement_drop),
        }
    }
}

fn clamp01(value: f64) -> f64 {
    if value.is_nan() {
        0.0
    } else {
        value.clamp(0.0, 1.0)
    }
}

/// Priority of probing a hypothesis further
///
/// Rewards uncertainty, success probabilities near 0.5 and thin evidence.
pub fn score_for_autonomous_exploration(summary: &HypothesisSummary) -> f64 {
    let ambiguity = summary
        .success_probability
        .map(|p| 1.0 - 2.0 * (p - 0.5).abs())
        .unwrap_or(0.5);
    let cold_start = match summary.evidence_count {
        n if n < 3 => 0.2,
        n if n < 8 => 0.1,
        _ => 0.0,
    };
    clamp01(0.55 * summary.uncertainty + 0.35 * ambiguity + cold_start)
}

fn proposal(
    id: String,
    title: String,
    kind: &str,
    rationale: String,
    score: f64,
    at: DateTime<Utc>,
    variables: Vec<VariableDefinition>,
) -> AutonomousProposal {
    AutonomousProposal {
        id,
        title,
        kind: kind.to_string(),
        rationale,
        score: clamp01(score),
        created_at: at,
        variables,
    }
}

/// Latent trait of the global profile with the highest uncertainty
fn most_uncertain_trait(state: &AgentState) -> Option<(String, f64)> {
    let profile = state.hypothesis(GLOBAL_PROFILE_ID)?;
    let mut best: Option<(String, f64)> = None;
    for variable in &profile.definition.variables {
        if variable.kind() != VariableKind::LatentTrait {
            continue;
        }
        let uncertainty = match profile.posteriors.get(&variable.id) {
            Some(posterior) => variables::summarize(posterior).uncertainty,
            None => 1.0,
        };
        if best.as_ref().map_or(true, |(_, u)| uncertainty > *u) {
            let name = variable.trait_name().unwrap_or(&variable.id).to_string();
            best = Some((name, uncertainty));
        }
    }
    best
}

/// Generate candidate proposals, de-duplicated, sorted and capped
pub fn propose_autonomous_hypotheses(
    state: &AgentState,
    context: &AutonomousContext,
    at: DateTime<Utc>,
) -> Vec<AutonomousProposal> {
    let mut candidates = Vec::new();

    let has_active_experiment = state
        .hypotheses
        .values()
        .any(|h| h.is_active() && h.definition.source == HypothesisSource::Experiment);
    if !has_active_experiment {
        candidates.push(proposal(
            "autonomous:baseline_recalibration".to_string(),
            "Baseline recalibration".to_string(),
            "baseline_recalibration",
            "No active experiment hypothesis; re-measure the baseline success rate".to_string(),
            BASELINE_SCORE,
            at,
            vec![
                VariableDefinition::binary("success"),
                VariableDefinition::continuous("score"),
                VariableDefinition::time_to_event("elapsed_seconds"),
            ],
        ));
    }

    if let Some((trait_name, uncertainty)) = most_uncertain_trait(state) {
        if uncertainty >= TRAIT_FOCUS_MIN_UNCERTAINTY {
            candidates.push(proposal(
                format!("autonomous:trait_focus:{}", trait_name),
                format!("Focus on {}", trait_name.replace('_', " ")),
                "trait_focus",
                format!(
                    "Trait '{}' uncertainty {:.2} >= {:.2}",
                    trait_name, uncertainty, TRAIT_FOCUS_MIN_UNCERTAINTY
                ),
                0.35 + 0.5 * uncertainty,
                at,
                vec![
                    VariableDefinition::latent_trait_for("target_trait", trait_name.clone()),
                    VariableDefinition::binary("success"),
                    VariableDefinition::continuous("score"),
                ],
            ));
        }
    }

    if let Some(rate) = context.mission_failure_rate.filter(|r| r.is_finite()) {
        if rate >= MISSION_FAILURE_TRIGGER {
            candidates.push(proposal(
                "autonomous:mission_clarity".to_string(),
                "Mission clarity".to_string(),
                "mission_clarity",
                format!(
                    "Mission failure rate {:.2} >= {:.2}",
                    rate, MISSION_FAILURE_TRIGGER
                ),
                0.4 + 0.5 * rate,
                at,
                vec![
                    VariableDefinition::binary("success"),
                    VariableDefinition::ordinal("clarity", 5),
                    VariableDefinition::categorical(
                        "confusion_source",
                        ["objective", "instructions", "difficulty"],
                    ),
                ],
            ));
        }
    }

    let latency = context
        .average_latency_seconds
        .filter(|l| l.is_finite())
        .map(|l| l.max(0.0));
    let drop = context.engagement_drop.unwrap_or(false);
    let slow = latency.is_some_and(|l| l >= LATENCY_TRIGGER_SECONDS);
    if slow || drop {
        let latency_value = latency.unwrap_or(0.0);
        candidates.push(proposal(
            "autonomous:cadence_pacing".to_string(),
            "Cadence and pacing".to_string(),
            "cadence_pacing",
            format!(
                "Average latency {:.0}s (trigger {:.0}s), engagement drop {}",
                latency_value, LATENCY_TRIGGER_SECONDS, drop
            ),
            0.45 + (latency_value / 900.0).min(0.25) + if drop { 0.15 } else { 0.0 },
            at,
            vec![
                VariableDefinition::time_to_event("response_latency"),
                VariableDefinition::continuous("engagement"),
                VariableDefinition::binary("success"),
            ],
        ));
    }

    let mut unique: BTreeMap<String, AutonomousProposal> = BTreeMap::new();
    for candidate in candidates {
        match unique.get(&candidate.id) {
            Some(existing) if existing.score >= candidate.score => {}
            _ => {
                unique.insert(candidate.id.clone(), candidate);
            }
        }
    }

    let mut proposals: Vec<_> = unique.into_values().collect();
    sort_proposals(&mut proposals);
    proposals.truncate(QUEUE_LIMIT);
    proposals
}

/// Replace the queue wholesale
///
/// Returns how many proposals were not queued before; each gets a history entry.
pub fn update_autonomous_queue(
    state: &mut AgentState,
    mut proposals: Vec<AutonomousProposal>,
    at: DateTime<Utc>,
) -> usize {
    sort_proposals(&mut proposals);
    proposals.truncate(QUEUE_LIMIT);

    let previous: HashSet<String> = state.autonomous_queue.iter().map(|p| p.id.clone()).collect();
    let fresh: Vec<(String, f64)> = proposals
        .iter()
        .filter(|p| !previous.contains(&p.id))
        .map(|p| (p.id.clone(), p.score))
        .collect();

    for (id, score) in &fresh {
        tracing::debug!("Queued autonomous proposal '{}' ({:.2})", id, score);
        state.push_history(
            HistoryEntry::new(
                at,
                HistoryEvent::Proposal,
                format!("Queued proposal '{}' (score {:.2})", id, score),
            )
            .with_hypothesis(id.clone()),
        );
    }

    state.autonomous_queue = proposals;
    state.updated_at = at;
    fresh.len()
}
