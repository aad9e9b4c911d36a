//! Aggregate per-agent state and its tolerant loader

use super::{
    sort_proposals, AutonomousProposal, HypothesisDefinition, HypothesisSource, HypothesisState,
    HypothesisStatus, VariableDefinition, VariablePosterior,
};
use crate::variables;
use chrono::{DateTime, Utc};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::{BTreeMap, HashSet, VecDeque};

/// Current persisted schema version
pub const STATE_VERSION: u32 = 1;

/// Maximum retained history entries
pub const HISTORY_LIMIT: usize = 300;

/// Maximum queued autonomous proposals
pub const QUEUE_LIMIT: usize = 8;

/// Kind of history entry
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum HistoryEvent {
    /// A hypothesis was touched for the first time
    HypothesisCreated,
    /// An observation was applied
    Observation,
    /// A hypothesis reached a terminal status
    Resolution,
    /// A new autonomous proposal entered the queue
    Proposal,
}

/// One line of the bounded history log
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct HistoryEntry {
    /// When it happened
    pub at: DateTime<Utc>,

    /// What happened
    pub event: HistoryEvent,

    /// Hypothesis concerned, if any
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub hypothesis_id: Option<String>,

    /// Variable concerned, if any
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub variable_id: Option<String>,

    /// Human-readable detail
    pub message: String,
}

impl HistoryEntry {
    /// Create an entry
    pub fn new(at: DateTime<Utc>, event: HistoryEvent, message: impl Into<String>) -> Self {
        Self {
            at,
            event,
            hypothesis_id: None,
            variable_id: None,
            message: message.into(),
        }
    }

    /// Attach the hypothesis id
    pub fn with_hypothesis(mut self, id: impl Into<String>) -> Self {
        self.hypothesis_id = Some(id.into());
        self
    }

    /// Attach the variable id
    pub fn with_variable(mut self, id: impl Into<String>) -> Self {
        self.variable_id = Some(id.into());
        self
    }
}

/// Everything Augur believes about one agent
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AgentState {
    /// Schema version
    pub version: u32,

    /// Last mutation time
    pub updated_at: DateTime<Utc>,

    /// Hypotheses keyed by id
    #[serde(default)]
    pub hypotheses: BTreeMap<String, HypothesisState>,

    /// Bounded event log, oldest first
    #[serde(default)]
    pub history: VecDeque<HistoryEntry>,

    /// Score-sorted proposal queue
    #[serde(default)]
    pub autonomous_queue: Vec<AutonomousProposal>,
}

impl AgentState {
    /// Empty state
    pub fn new(at: DateTime<Utc>) -> Self {
        Self {
            version: STATE_VERSION,
            updated_at: at,
            hypotheses: BTreeMap::new(),
            history: VecDeque::new(),
            autonomous_queue: Vec::new(),
        }
    }

    /// Look up a hypothesis
    pub fn hypothesis(&self, id: &str) -> Option<&HypothesisState> {
        self.hypotheses.get(id)
    }

    /// Append to the history log, dropping the oldest entries past the limit
    pub fn push_history(&mut self, entry: HistoryEntry) {
        self.history.push_back(entry);
        while self.history.len() > HISTORY_LIMIT {
            self.history.pop_front();
        }
    }

    /// The `limit` most recent history entries, oldest first
    pub fn recent_history(&self, limit: usize) -> Vec<HistoryEntry> {
        let skip = self.history.len().saturating_sub(limit);
        self.history.iter().skip(skip).cloned().collect()
    }

    /// Parse persisted JSON text, normalizing whatever is salvageable
    pub fn from_json_str(text: &str, now: DateTime<Utc>) -> crate::Result<Self> {
        let value: Value = serde_json::from_str(text)?;
        Ok(Self::from_json_value(&value, now))
    }

    /// Rebuild state from arbitrary JSON
    ///
    /// Missing or malformed fields fall back to empty collections and fresh
    /// timestamps. Hypotheses without a variable list are dropped; posteriors
    /// that are missing or of the wrong kind are re-initialized.
    pub fn from_json_value(value: &Value, now: DateTime<Utc>) -> Self {
        let mut state = Self::new(parse_field(value.get("updatedAt")).unwrap_or(now));

        if let Some(stored) = value.get("version").and_then(Value::as_u64) {
            if stored != u64::from(STATE_VERSION) {
                tracing::debug!(
                    "Normalizing state from version {} to {}",
                    stored,
                    STATE_VERSION
                );
            }
        }

        if let Some(entries) = value.get("hypotheses").and_then(Value::as_object) {
            for (key, entry) in entries {
                match normalize_hypothesis(key, entry, now) {
                    Some(hypothesis) => {
                        state
                            .hypotheses
                            .insert(hypothesis.definition.id.clone(), hypothesis);
                    }
                    None => tracing::warn!("Dropping stored hypothesis '{}' without variables", key),
                }
            }
        }

        if let Some(entries) = value.get("history").and_then(Value::as_array) {
            for entry in entries {
                if let Some(parsed) = parse_field::<HistoryEntry>(Some(entry)) {
                    state.push_history(parsed);
                }
            }
        }

        if let Some(entries) = value.get("autonomousQueue").and_then(Value::as_array) {
            let mut queue: Vec<AutonomousProposal> = entries
                .iter()
                .filter_map(|entry| parse_field::<AutonomousProposal>(Some(entry)))
                .filter(|p| p.score.is_finite())
                .collect();
            sort_proposals(&mut queue);
            queue.truncate(QUEUE_LIMIT);
            state.autonomous_queue = queue;
        }

        state
    }
}

fn parse_field<T: DeserializeOwned>(value: Option<&Value>) -> Option<T> {
    value.and_then(|v| serde_json::from_value(v.clone()).ok())
}

fn infer_source(id: &str) -> HypothesisSource {
    if id.starts_with("experiment:") {
        HypothesisSource::Experiment
    } else if id.starts_with("mission:") {
        HypothesisSource::Mission
    } else {
        HypothesisSource::System
    }
}

fn normalize_hypothesis(key: &str, entry: &Value, now: DateTime<Utc>) -> Option<HypothesisState> {
    let definition = entry.get("definition")?;
    let raw_variables = definition.get("variables")?.as_array()?;

    let mut seen = HashSet::new();
    let variables: Vec<VariableDefinition> = raw_variables
        .iter()
        .filter_map(|v| parse_field::<VariableDefinition>(Some(v)))
        .filter(|v| seen.insert(v.id.clone()))
        .collect();

    let id = definition
        .get("id")
        .and_then(Value::as_str)
        .filter(|s| !s.is_empty())
        .unwrap_or(key)
        .to_string();
    let title = definition
        .get("title")
        .and_then(Value::as_str)
        .map(str::to_string)
        .unwrap_or_else(|| id.clone());
    let source = parse_field(definition.get("source")).unwrap_or_else(|| infer_source(&id));
    let kind = definition
        .get("kind")
        .and_then(Value::as_str)
        .unwrap_or("unknown")
        .to_string();
    let description = definition
        .get("description")
        .and_then(Value::as_str)
        .map(str::to_string);

    let stored_posteriors = entry.get("posteriors").and_then(Value::as_object);
    let posteriors = variables
        .iter()
        .map(|variable| {
            let stored = stored_posteriors
                .and_then(|m| parse_field::<VariablePosterior>(m.get(&variable.id)))
                .filter(|p| p.kind() == variable.kind());
            let posterior = stored.unwrap_or_else(|| variables::initialize(variable));
            (variable.id.clone(), posterior)
        })
        .collect();

    let created_at = parse_field(entry.get("createdAt")).unwrap_or(now);
    Some(HypothesisState {
        definition: HypothesisDefinition {
            id,
            title,
            source,
            kind,
            description,
            variables,
        },
        status: parse_field::<HypothesisStatus>(entry.get("status")).unwrap_or_default(),
        created_at,
        updated_at: parse_field(entry.get("updatedAt")).unwrap_or(created_at),
        resolved_at: parse_field(entry.get("resolvedAt")),
        resolution: entry
            .get("resolution")
            .and_then(Value::as_str)
            .map(str::to_string),
        evidence_count: entry
            .get("evidenceCount")
            .and_then(Value::as_u64)
            .unwrap_or(0),
        posteriors,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::VariableKind;
    use serde_json::json;

    #[test]
    fn test_history_is_bounded() {
        let now = Utc::now();
        let mut state = AgentState::new(now);
        for i in 0..(HISTORY_LIMIT + 25) {
            state.push_history(HistoryEntry::new(now, HistoryEvent::Observation, format!("#{}", i)));
        }
        assert_eq!(state.history.len(), HISTORY_LIMIT);
        assert_eq!(state.history.front().unwrap().message, "#25");

        let recent = state.recent_history(3);
        let messages: Vec<_> = recent.iter().map(|e| e.message.as_str()).collect();
        assert_eq!(messages, vec!["#322", "#323", "#324"]);
    }

    #[test]
    fn test_garbage_loads_as_empty_state() {
        let now = Utc::now();
        let state = AgentState::from_json_value(&json!("not an object"), now);
        assert_eq!(state.version, STATE_VERSION);
        assert_eq!(state.updated_at, now);
        assert!(state.hypotheses.is_empty());
        assert!(state.history.is_empty());
        assert!(state.autonomous_queue.is_empty());
    }

    #[test]
    fn test_hypothesis_without_variables_is_dropped() {
        let now = Utc::now();
        let state = AgentState::from_json_value(
            &json!({
                "version": 1,
                "hypotheses": {
                    "experiment:broken": { "definition": { "id": "experiment:broken", "title": "x" } },
                    "experiment:ok": {
                        "definition": {
                            "id": "experiment:ok",
                            "title": "Ok",
                            "source": "experiment",
                            "kind": "experiment_outcome",
                            "variables": [
                                { "id": "success", "kind": "binary" },
                                { "id": "bogus", "kind": "nonsense" }
                            ]
                        },
                        "status": "active",
                        "evidenceCount": 4,
                        "posteriors": {
                            "success": { "kind": "latent_trait", "mean": 0.9, "variance": 0.1 }
                        }
                    }
                }
            }),
            now,
        );

        assert!(state.hypothesis("experiment:broken").is_none());
        let ok = state.hypothesis("experiment:ok").unwrap();
        assert_eq!(ok.evidence_count, 4);
        assert_eq!(ok.definition.variables.len(), 1);
        // Wrong-kind posterior is re-initialized from the definition
        assert_eq!(ok.posteriors["success"].kind(), VariableKind::Binary);
        assert_eq!(ok.created_at, now);
    }

    #[test]
    fn test_missing_source_is_inferred_from_id() {
        let state = AgentState::from_json_value(
            &json!({
                "hypotheses": {
                    "mission:type:rescue": {
                        "definition": { "variables": [ { "id": "score", "kind": "continuous_01" } ] }
                    }
                }
            }),
            Utc::now(),
        );
        let hypothesis = state.hypothesis("mission:type:rescue").unwrap();
        assert_eq!(hypothesis.definition.source, HypothesisSource::Mission);
        assert_eq!(hypothesis.definition.title, "mission:type:rescue");
    }

    #[test]
    fn test_serialized_state_round_trips_through_loader() {
        let now = Utc::now();
        let mut state = AgentState::new(now);
        state.push_history(HistoryEntry::new(now, HistoryEvent::Proposal, "queued").with_hypothesis("h"));
        let json = serde_json::to_value(&state).unwrap();
        assert!(json.get("autonomousQueue").is_some());

        let loaded = AgentState::from_json_value(&json, Utc::now());
        assert_eq!(loaded, state);
    }

    #[test]
    fn test_invalid_text_is_an_error() {
        assert!(AgentState::from_json_str("{not json", Utc::now()).is_err());
    }
}
