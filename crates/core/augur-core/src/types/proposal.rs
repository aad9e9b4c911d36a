//! Autonomous proposals: system-generated "what to learn next" candidates

use super::{HypothesisDefinition, HypothesisSource, VariableDefinition};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::cmp::Ordering;

/// A candidate hypothesis the engine would like to test next
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AutonomousProposal {
    /// Deterministic id; identical triggers produce identical ids
    pub id: String,

    /// Human-readable title
    pub title: String,

    /// Kind label for the seeded hypothesis
    pub kind: String,

    /// Why this was proposed, citing the numeric trigger
    pub rationale: String,

    /// Priority in [0, 1]
    pub score: f64,

    /// When the proposal was generated
    pub created_at: DateTime<Utc>,

    /// Variables to seed the hypothesis with
    #[serde(default)]
    pub variables: Vec<VariableDefinition>,
}

impl AutonomousProposal {
    /// Hypothesis definition that adopting this proposal would create
    pub fn to_definition(&self) -> HypothesisDefinition {
        HypothesisDefinition::new(
            self.id.clone(),
            self.title.clone(),
            HypothesisSource::System,
            self.kind.clone(),
        )
        .with_description(self.rationale.clone())
        .with_variables(self.variables.iter().cloned())
    }
}

/// Sort by score descending, ties broken by id
pub fn sort_proposals(proposals: &mut [AutonomousProposal]) {
    proposals.sort_by(|a, b| {
        b.score
            .partial_cmp(&a.score)
            .unwrap_or(Ordering::Equal)
            .then_with(|| a.id.cmp(&b.id))
    });
}
