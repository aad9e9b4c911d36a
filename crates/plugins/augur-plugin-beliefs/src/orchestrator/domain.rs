//! Domain objects supplied by upstream producers

use serde::{Deserialize, Serialize};

/// A discrete experiment run against the agent
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Experiment {
    /// Experiment id, unique per agent
    pub id: String,
    /// Title
    pub title: String,
    /// Longer description
    #[serde(default)]
    pub description: Option<String>,
    /// Free-form experiment type ("puzzle", "social", ...)
    #[serde(default)]
    pub experiment_type: Option<String>,
    /// Trait the experiment is designed to measure
    #[serde(default)]
    pub target_trait: Option<String>,
}

impl Experiment {
    /// Create an experiment
    pub fn new(id: impl Into<String>, title: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            title: title.into(),
            description: None,
            experiment_type: None,
            target_trait: None,
        }
    }

    /// Set the experiment type
    pub fn with_type(mut self, experiment_type: impl Into<String>) -> Self {
        self.experiment_type = Some(experiment_type.into());
        self
    }

    /// Set the target trait
    pub fn with_target_trait(mut self, target_trait: impl Into<String>) -> Self {
        self.target_trait = Some(target_trait.into());
        self
    }

    /// Set the description
    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = Some(description.into());
        self
    }
}

/// A mission; beliefs are pooled per mission type
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Mission {
    /// Mission id
    pub id: String,
    /// Mission type; missions of one type share a hypothesis
    pub mission_type: String,
    /// Title
    pub title: String,
    /// Longer description
    #[serde(default)]
    pub description: Option<String>,
    /// Objectives, used for trait inference
    #[serde(default)]
    pub objectives: Vec<String>,
}

impl Mission {
    /// Create a mission
    pub fn new(
        id: impl Into<String>,
        mission_type: impl Into<String>,
        title: impl Into<String>,
    ) -> Self {
        Self {
            id: id.into(),
            mission_type: mission_type.into(),
            title: title.into(),
            description: None,
            objectives: Vec::new(),
        }
    }

    /// Add an objective
    pub fn with_objective(mut self, objective: impl Into<String>) -> Self {
        self.objectives.push(objective.into());
        self
    }

    /// Set the description
    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = Some(description.into());
        self
    }
}

/// Intermediate progress report
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProgressUpdate {
    /// Free-text result
    #[serde(default)]
    pub result: Option<String>,
    /// Explicit score in [0, 1]
    #[serde(default)]
    pub score: Option<f64>,
    /// Seconds elapsed so far
    #[serde(default)]
    pub elapsed_seconds: Option<f64>,
}

/// Final report that closes an episode
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Resolution {
    /// Free-text result
    #[serde(default)]
    pub result: Option<String>,
    /// Explicit success flag
    #[serde(default)]
    pub success: Option<bool>,
    /// Explicit score in [0, 1]
    #[serde(default)]
    pub score: Option<f64>,
    /// Total seconds elapsed
    #[serde(default)]
    pub elapsed_seconds: Option<f64>,
}

/// Coarse outcome class of a free-text result
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Outcome {
    /// Goal achieved
    Success,
    /// Goal missed
    Failure,
    /// Attempt given up
    Abandoned,
    /// Could not tell
    Unknown,
}

const ABANDONED_WORDS: &[&str] = &[
    "abandon",
    "abandoned",
    "abandoning",
    "gave up",
    "give up",
    "giving up",
    "quit",
    "quitting",
    "skipped",
    "walked away",
];
const FAILURE_WORDS: &[&str] = &[
    "fail",
    "fails",
    "failed",
    "failing",
    "failure",
    "incorrect",
    "wrong",
    "error",
    "errors",
    "unsuccessful",
    "stuck",
    "lost",
    "timed out",
];
const SUCCESS_WORDS: &[&str] = &[
    "success",
    "successful",
    "successfully",
    "succeeded",
    "solved",
    "complete",
    "completed",
    "passed",
    "correct",
    "correctly",
    "won",
    "achieved",
    "done",
];

/// Split into words; apostrophes stay inside a word so "won't" is not "won"
fn words(text: &str) -> Vec<&str> {
    text.split(|c: char| !(c.is_alphanumeric() || c == '\'' || c == '\u{2019}'))
        .filter(|w| !w.is_empty())
        .collect()
}

/// Whether any phrase occurs as a run of whole words
fn contains_any(words: &[&str], phrases: &[&str]) -> bool {
    phrases.iter().any(|phrase| {
        let parts: Vec<&str> = phrase.split_whitespace().collect();
        !parts.is_empty() && words.windows(parts.len()).any(|run| run == parts.as_slice())
    })
}

impl Outcome {
    /// All categories, in the order they seed categorical variables
    pub const CATEGORIES: [&'static str; 4] = ["success", "failure", "abandoned", "unknown"];

    /// Classify free text; abandonment beats failure beats success
    pub fn classify(text: &str) -> Self {
        let text = text.to_lowercase();
        let words = words(&text);
        if contains_any(&words, ABANDONED_WORDS) {
            Outcome::Abandoned
        } else if contains_any(&words, FAILURE_WORDS) {
            Outcome::Failure
        } else if contains_any(&words, SUCCESS_WORDS) {
            Outcome::Success
        } else {
            Outcome::Unknown
        }
    }

    /// Category label
    pub fn as_str(&self) -> &'static str {
        match self {
            Outcome::Success => "success",
            Outcome::Failure => "failure",
            Outcome::Abandoned => "abandoned",
            Outcome::Unknown => "unknown",
        }
    }

    /// Binary success flag, when the outcome implies one
    pub fn as_flag(&self) -> Option<bool> {
        match self {
            Outcome::Success => Some(true),
            Outcome::Failure => Some(false),
            _ => None,
        }
    }

    /// Base trait signal before blending with a score
    pub fn trait_base(&self) -> f64 {
        match self {
            Outcome::Success => 0.75,
            Outcome::Failure => 0.3,
            Outcome::Abandoned => 0.2,
            Outcome::Unknown => 0.5,
        }
    }
}

/// Clamp a caller-supplied score into [0, 1]; non-finite scores are dropped
pub fn clamp_score(score: Option<f64>) -> Option<f64> {
    score.filter(|s| s.is_finite()).map(|s| s.clamp(0.0, 1.0))
}

/// How much to trust a report: explicit score, else text length
pub fn evidence_quality(score: Option<f64>, text: Option<&str>) -> Option<f64> {
    if let Some(score) = clamp_score(score) {
        return Some(score);
    }
    let text = text.map(str::trim).filter(|t| !t.is_empty())?;
    Some((text.chars().count() as f64 / 240.0).clamp(0.1, 1.0))
}

/// Trait observation value for an outcome, averaged with the score if known
pub fn trait_signal(outcome: Outcome, score: Option<f64>) -> f64 {
    match clamp_score(score) {
        Some(score) => (outcome.trait_base() + score) / 2.0,
        None => outcome.trait_base(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_classify_precedence() {
        assert_eq!(Outcome::classify("Solved it!"), Outcome::Success);
        assert_eq!(Outcome::classify("Failed the final room"), Outcome::Failure);
        // failure words beat success words
        assert_eq!(Outcome::classify("correct answer, but it failed review"), Outcome::Failure);
        assert_eq!(Outcome::classify("unsuccessful"), Outcome::Failure);
        // abandonment beats everything
        assert_eq!(Outcome::classify("gave up after it failed"), Outcome::Abandoned);
        assert_eq!(Outcome::classify("abandoned"), Outcome::Abandoned);
        assert_eq!(Outcome::classify("still thinking"), Outcome::Unknown);
    }

    #[test]
    fn test_classify_matches_whole_words() {
        assert_eq!(Outcome::classify("won't finish"), Outcome::Unknown);
        assert_eq!(Outcome::classify("It won\u{2019}t finish"), Outcome::Unknown);
        assert_eq!(Outcome::classify("Won the final round"), Outcome::Success);
        assert_eq!(Outcome::classify("quite a challenge"), Outcome::Unknown);
        assert_eq!(Outcome::classify("the task is undone"), Outcome::Unknown);
        assert_eq!(Outcome::classify("Timed out, again"), Outcome::Failure);
        assert_eq!(Outcome::classify("they gave  up"), Outcome::Abandoned);
    }

    #[test]
    fn test_evidence_quality() {
        assert_eq!(evidence_quality(Some(1.7), Some("x")), Some(1.0));
        assert_eq!(evidence_quality(None, Some("ok")), Some(0.1));
        assert_eq!(evidence_quality(None, Some(&"a".repeat(120))), Some(0.5));
        assert_eq!(evidence_quality(None, Some(&"a".repeat(1000))), Some(1.0));
        assert_eq!(evidence_quality(None, Some("   ")), None);
        assert_eq!(evidence_quality(Some(f64::NAN), None), None);
    }

    #[test]
    fn test_trait_signal() {
        let close = |a: f64, b: f64| (a - b).abs() < 1e-12;
        assert!(close(trait_signal(Outcome::Success, None), 0.75));
        assert!(close(trait_signal(Outcome::Failure, Some(0.5)), 0.4));
        assert!(close(trait_signal(Outcome::Abandoned, Some(-1.0)), 0.1));
        assert!(close(trait_signal(Outcome::Unknown, None), 0.5));
    }

    #[test]
    fn test_domain_objects_deserialize_camel_case() {
        let experiment: Experiment = serde_json::from_value(serde_json::json!({
            "id": "e1",
            "title": "Riddle",
            "experimentType": "puzzle",
            "targetTrait": "analytical"
        }))
        .unwrap();
        assert_eq!(experiment.experiment_type.as_deref(), Some("puzzle"));

        let mission: Mission = serde_json::from_value(serde_json::json!({
            "id": "m1",
            "missionType": "Rescue Run",
            "title": "Save the cat"
        }))
        .unwrap();
        assert!(mission.objectives.is_empty());
    }
}
