//! Read-only snapshot handed to downstream readers

use crate::engine::{summarize_state, StateSummary, GLOBAL_PROFILE_ID};
use augur_core::types::{AgentState, AutonomousProposal, HistoryEntry, VariableKind};
use augur_core::variables;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Current belief about one global trait
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TraitEstimate {
    /// Posterior mean in [0, 1]
    pub estimate: Option<f64>,
    /// Normalized uncertainty
    pub uncertainty: f64,
    /// Total observation weight absorbed
    pub sample_size: f64,
}

/// Everything other subsystems may read about an agent
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BeliefSnapshot {
    /// State schema version
    pub version: u32,
    /// Last mutation time
    pub updated_at: DateTime<Utc>,
    /// Per-hypothesis summaries and status counts
    pub summary: StateSummary,
    /// Queued proposals, highest score first
    pub autonomous_queue: Vec<AutonomousProposal>,
    /// Global profile traits keyed by trait name
    pub global_traits: BTreeMap<String, TraitEstimate>,
    /// Most recent history entries, oldest first
    pub recent_history: Vec<HistoryEntry>,
}

impl BeliefSnapshot {
    /// Project a state, keeping the last `history_window` history entries
    pub fn from_state(state: &AgentState, history_window: usize) -> Self {
        let global_traits = state
            .hypothesis(GLOBAL_PROFILE_ID)
            .map(|profile| {
                profile
                    .definition
                    .variables
                    .iter()
                    .filter(|v| v.kind() == VariableKind::LatentTrait)
                    .map(|v| {
                        let summary = match profile.posteriors.get(&v.id) {
                            Some(posterior) => variables::summarize(posterior),
                            None => variables::summarize(&variables::initialize(v)),
                        };
                        let name = v.trait_name().unwrap_or(&v.id).to_string();
                        (
                            name,
                            TraitEstimate {
                                estimate: summary.estimate,
                                uncertainty: summary.uncertainty,
                                sample_size: summary.sample_size,
                            },
                        )
                    })
                    .collect()
            })
            .unwrap_or_default();

        Self {
            version: state.version,
            updated_at: state.updated_at,
            summary: summarize_state(state),
            autonomous_queue: state.autonomous_queue.clone(),
            global_traits,
            recent_history: state.recent_history(history_window),
        }
    }
}
