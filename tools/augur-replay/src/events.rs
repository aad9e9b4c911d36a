//! JSON-lines event format
//!
//! One object per line, tagged by `event`:
//!
//! ```text
//! {"event":"experimentStarted","experiment":{"id":"r1","title":"Riddle","experimentType":"puzzle"}}
//! {"event":"experimentResolved","experiment":{...},"resolution":{"result":"solved","score":0.9}}
//! {"event":"observe","hypothesisId":"experiment:r1","variableId":"success","observation":{"value":true}}
//! ```
//!
//! Blank lines and lines starting with `#` are skipped.

use anyhow::{Context, Result};
use augur_core::types::{HypothesisStatus, Observation};
use augur_plugin_beliefs::{
    AutonomousContext, BeliefService, Experiment, Mission, ProgressUpdate, Resolution,
};
use serde::Deserialize;

/// One replayable event
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(tag = "event", rename_all = "camelCase")]
pub enum Event {
    ExperimentStarted {
        experiment: Experiment,
    },
    ExperimentProgress {
        experiment: Experiment,
        #[serde(default)]
        update: ProgressUpdate,
    },
    ExperimentResolved {
        experiment: Experiment,
        #[serde(default)]
        resolution: Resolution,
    },
    MissionStarted {
        mission: Mission,
    },
    MissionProgress {
        mission: Mission,
        #[serde(default)]
        update: ProgressUpdate,
    },
    MissionResolved {
        mission: Mission,
        #[serde(default)]
        resolution: Resolution,
    },
    #[serde(rename_all = "camelCase")]
    Observe {
        hypothesis_id: String,
        variable_id: String,
        observation: Observation,
    },
    #[serde(rename_all = "camelCase")]
    Close {
        hypothesis_id: String,
        #[serde(default)]
        resolution: Option<String>,
        #[serde(default)]
        status: Option<HypothesisStatus>,
    },
    #[serde(rename_all = "camelCase")]
    Adopt {
        proposal_id: String,
    },
    /// Replace the external signals used for proposal ranking
    Context {
        #[serde(flatten)]
        context: AutonomousContext,
    },
    Refresh,
}

/// Parse a JSON-lines document; errors name the offending line
pub fn parse_events(text: &str) -> Result<Vec<(usize, Event)>> {
    let mut events = Vec::new();
    for (index, line) in text.lines().enumerate() {
        let line = line.trim();
        if line.is_empty() || line.starts_with('#') {
            continue;
        }
        let event: Event = serde_json::from_str(line)
            .with_context(|| format!("line {}: invalid event", index + 1))?;
        events.push((index + 1, event));
    }
    Ok(events)
}

/// Apply one event through the service
pub async fn apply(service: &BeliefService, agent_id: &str, event: &Event) -> Result<()> {
    match event {
        Event::ExperimentStarted { experiment } => {
            service.initialize_experiment(agent_id, experiment).await?;
        }
        Event::ExperimentProgress { experiment, update } => {
            service
                .record_experiment_progress(agent_id, experiment, update)
                .await?;
        }
        Event::ExperimentResolved {
            experiment,
            resolution,
        } => {
            service
                .resolve_experiment(agent_id, experiment, resolution)
                .await?;
        }
        Event::MissionStarted { mission } => {
            service.initialize_mission(agent_id, mission).await?;
        }
        Event::MissionProgress { mission, update } => {
            service
                .record_mission_progress(agent_id, mission, update)
                .await?;
        }
        Event::MissionResolved {
            mission,
            resolution,
        } => {
            service.resolve_mission(agent_id, mission, resolution).await?;
        }
        Event::Observe {
            hypothesis_id,
            variable_id,
            observation,
        } => {
            let outcome = service
                .observe(agent_id, hypothesis_id, variable_id, observation)
                .await?;
            if !outcome.parsed {
                tracing::warn!(
                    "Observation for {}/{} could not be interpreted",
                    hypothesis_id,
                    variable_id
                );
            }
        }
        Event::Close {
            hypothesis_id,
            resolution,
            status,
        } => {
            service
                .close_hypothesis(agent_id, hypothesis_id, resolution.as_deref(), *status)
                .await?;
        }
        Event::Adopt { proposal_id } => {
            service.adopt_proposal(agent_id, proposal_id).await?;
        }
        Event::Context { context } => {
            service.set_context(agent_id, context.clone());
            service.refresh_proposals(agent_id).await?;
        }
        Event::Refresh => {
            service.refresh_proposals(agent_id).await?;
        }
    }
    Ok(())
}
