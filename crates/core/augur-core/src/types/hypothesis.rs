//! Hypothesis definitions and per-hypothesis state

use super::{VariableDefinition, VariablePosterior};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Where a hypothesis came from
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum HypothesisSource {
    /// Seeded by an experiment lifecycle
    Experiment,
    /// Seeded by a mission lifecycle
    Mission,
    /// Created by the engine itself (global profile, adopted proposals)
    System,
}

impl HypothesisSource {
    /// Wire name of this source
    pub fn as_str(&self) -> &'static str {
        match self {
            HypothesisSource::Experiment => "experiment",
            HypothesisSource::Mission => "mission",
            HypothesisSource::System => "system",
        }
    }
}

/// Lifecycle status; `Resolved` and `Retired` are terminal
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum HypothesisStatus {
    /// Still collecting evidence
    #[default]
    Active,
    /// Closed normally
    Resolved,
    /// Abandoned
    Retired,
}

impl HypothesisStatus {
    /// Whether no further transitions are allowed
    pub fn is_terminal(&self) -> bool {
        !matches!(self, HypothesisStatus::Active)
    }

    /// Wire name of this status
    pub fn as_str(&self) -> &'static str {
        match self {
            HypothesisStatus::Active => "active",
            HypothesisStatus::Resolved => "resolved",
            HypothesisStatus::Retired => "retired",
        }
    }
}

/// What a hypothesis claims and which variables measure it
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HypothesisDefinition {
    /// Stable namespaced id (`experiment:<id>`, `mission:type:<type>`, ...)
    pub id: String,

    /// Human-readable title
    pub title: String,

    /// Origin of the hypothesis
    pub source: HypothesisSource,

    /// Free-form kind label (e.g. "experiment_outcome", "trait_profile")
    pub kind: String,

    /// Optional longer description
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,

    /// Measured variables
    pub variables: Vec<VariableDefinition>,
}

impl HypothesisDefinition {
    /// Create a definition without variables
    pub fn new(
        id: impl Into<String>,
        title: impl Into<String>,
        source: HypothesisSource,
        kind: impl Into<String>,
    ) -> Self {
        Self {
            id: id.into(),
            title: title.into(),
            source,
            kind: kind.into(),
            description: None,
            variables: Vec::new(),
        }
    }

    /// Add a variable, replacing any existing one with the same id
    pub fn with_variable(mut self, variable: VariableDefinition) -> Self {
        if let Some(existing) = self.variables.iter_mut().find(|v| v.id == variable.id) {
            *existing = variable;
        } else {
            self.variables.push(variable);
        }
        self
    }

    /// Add several variables
    pub fn with_variables(self, variables: impl IntoIterator<Item = VariableDefinition>) -> Self {
        variables.into_iter().fold(self, |def, v| def.with_variable(v))
    }

    /// Attach a description
    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = Some(description.into());
        self
    }

    /// Look up a variable by id
    pub fn variable(&self, id: &str) -> Option<&VariableDefinition> {
        self.variables.iter().find(|v| v.id == id)
    }
}

/// Tracked state of one hypothesis
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct HypothesisState {
    /// Current definition (may evolve over time)
    pub definition: HypothesisDefinition,

    /// Lifecycle status
    #[serde(default)]
    pub status: HypothesisStatus,

    /// First time this hypothesis was touched
    pub created_at: DateTime<Utc>,

    /// Last time this hypothesis was touched
    pub updated_at: DateTime<Utc>,

    /// When the hypothesis reached a terminal status
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub resolved_at: Option<DateTime<Utc>>,

    /// Resolution note supplied on close
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub resolution: Option<String>,

    /// Number of observations applied, parsed or not
    #[serde(default)]
    pub evidence_count: u64,

    /// Posterior per variable id
    #[serde(default)]
    pub posteriors: BTreeMap<String, VariablePosterior>,
}

impl HypothesisState {
    /// Id of the underlying definition
    pub fn id(&self) -> &str {
        &self.definition.id
    }

    /// Whether the hypothesis still accepts lifecycle transitions
    pub fn is_active(&self) -> bool {
        self.status == HypothesisStatus::Active
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_with_variable_replaces_same_id() {
        let def = HypothesisDefinition::new("experiment:1", "Warmup", HypothesisSource::Experiment, "experiment_outcome")
            .with_variable(VariableDefinition::binary("success"))
            .with_variable(VariableDefinition::continuous("success"));

        assert_eq!(def.variables.len(), 1);
        assert_eq!(
            def.variable("success").map(|v| v.kind()),
            Some(crate::types::VariableKind::Continuous01)
        );
        assert!(def.variable("score").is_none());
    }

    #[test]
    fn test_status_terminality() {
        assert!(!HypothesisStatus::Active.is_terminal());
        assert!(HypothesisStatus::Resolved.is_terminal());
        assert!(HypothesisStatus::Retired.is_terminal());
        assert_eq!(
            serde_json::to_value(HypothesisStatus::Retired).unwrap(),
            serde_json::json!("retired")
        );
    }
}
