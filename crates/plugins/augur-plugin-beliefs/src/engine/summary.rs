//! Read-only projections of hypotheses and whole agent states

use super::score_for_autonomous_exploration;
use augur_core::types::{AgentState, HypothesisSource, HypothesisState, HypothesisStatus};
use augur_core::variables::{self, VariableSummary};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Variable ids consulted, in order, for a hypothesis' success probability
pub const SUCCESS_VARIABLE_IDS: [&str; 6] = [
    "success",
    "mission_success",
    "experiment_success",
    "score",
    "quality",
    "target_trait",
];

/// Derived view of one hypothesis
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct HypothesisSummary {
    /// Hypothesis id
    pub id: String,
    /// Title
    pub title: String,
    /// Origin
    pub source: HypothesisSource,
    /// Kind label
    pub kind: String,
    /// Lifecycle status
    pub status: HypothesisStatus,
    /// Observations applied so far
    pub evidence_count: u64,
    /// Best available probability of success, if any variable supports one
    pub success_probability: Option<f64>,
    /// Mean of per-variable uncertainties
    pub uncertainty: f64,
    /// Active-learning priority of probing this hypothesis further
    pub exploration_score: f64,
    /// Last touch
    pub updated_at: DateTime<Utc>,
    /// Per-variable summaries keyed by variable id
    pub variables: BTreeMap<String, VariableSummary>,
}

/// Derived view of a whole agent state
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StateSummary {
    /// Number of hypotheses
    pub total: usize,
    /// Hypotheses still collecting evidence
    pub active: usize,
    /// Hypotheses closed normally
    pub resolved: usize,
    /// Hypotheses abandoned
    pub retired: usize,
    /// Most recently updated first
    pub hypotheses: Vec<HypothesisSummary>,
}

/// Summarize a single hypothesis
pub fn summarize_hypothesis(hypothesis: &HypothesisState) -> HypothesisSummary {
    let summaries: Vec<(String, VariableSummary)> = hypothesis
        .definition
        .variables
        .iter()
        .map(|variable| {
            let summary = match hypothesis.posteriors.get(&variable.id) {
                Some(posterior) => variables::summarize(posterior),
                None => variables::summarize(&variables::initialize(variable)),
            };
            (variable.id.clone(), summary)
        })
        .collect();

    let uncertainty = if summaries.is_empty() {
        1.0
    } else {
        summaries.iter().map(|(_, s)| s.uncertainty).sum::<f64>() / summaries.len() as f64
    };

    let scorable = |s: &VariableSummary| s.kind.is_scorable();
    let canonical = SUCCESS_VARIABLE_IDS.iter().find_map(|wanted| {
        summaries
            .iter()
            .find(|(id, s)| id == wanted && scorable(s))
            .and_then(|(_, s)| s.estimate)
    });
    let success_probability = canonical.or_else(|| {
        let estimates: Vec<f64> = summaries
            .iter()
            .filter(|(_, s)| scorable(s))
            .filter_map(|(_, s)| s.estimate)
            .collect();
        (!estimates.is_empty()).then(|| estimates.iter().sum::<f64>() / estimates.len() as f64)
    });

    let mut summary = HypothesisSummary {
        id: hypothesis.definition.id.clone(),
        title: hypothesis.definition.title.clone(),
        source: hypothesis.definition.source,
        kind: hypothesis.definition.kind.clone(),
        status: hypothesis.status,
        evidence_count: hypothesis.evidence_count,
        success_probability,
        uncertainty,
        exploration_score: 0.0,
        updated_at: hypothesis.updated_at,
        variables: summaries.into_iter().collect(),
    };
    summary.exploration_score = score_for_autonomous_exploration(&summary);
    summary
}

/// Summarize every hypothesis of an agent
pub fn summarize_state(state: &AgentState) -> StateSummary {
    let mut hypotheses: Vec<HypothesisSummary> =
        state.hypotheses.values().map(summarize_hypothesis).collect();
    hypotheses.sort_by(|a, b| b.updated_at.cmp(&a.updated_at).then_with(|| a.id.cmp(&b.id)));

    let count = |status: HypothesisStatus| hypotheses.iter().filter(|h| h.status == status).count();
    StateSummary {
        total: hypotheses.len(),
        active: count(HypothesisStatus::Active),
        resolved: count(HypothesisStatus::Resolved),
        retired: count(HypothesisStatus::Retired),
        hypotheses,
    }
}
