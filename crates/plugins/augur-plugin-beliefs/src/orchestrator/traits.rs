//! Trait inference tables and the global trait profile

use crate::engine::GLOBAL_PROFILE_ID;
use augur_core::types::{HypothesisDefinition, HypothesisSource, VariableDefinition};
use augur_core::{AugurError, Result};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::Path;

/// Traits tracked on the global profile, in tie-break order
pub const GLOBAL_TRAITS: [&str; 8] = [
    "compliance",
    "curiosity",
    "persistence",
    "creativity",
    "empathy",
    "analytical",
    "stress_tolerance",
    "reliability",
];

/// Trait used when nothing else matches
pub const DEFAULT_TRAIT: &str = "reliability";

/// Lowercase, trim and snake-case a free-form type label
pub fn normalize_label(label: &str) -> String {
    label
        .trim()
        .to_lowercase()
        .split(|c: char| c.is_whitespace() || c == '-' || c == '/')
        .filter(|part| !part.is_empty())
        .collect::<Vec<_>>()
        .join("_")
}

/// Tables mapping experiment/mission metadata to the trait it measures
///
/// Loadable from JSON so deployments can tune the vocabulary without a
/// rebuild. Missing fields fall back to the built-in tables.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct TraitInference {
    /// Known traits in declared order
    pub traits: Vec<String>,

    /// Normalized type label to trait
    pub type_traits: BTreeMap<String, String>,

    /// Keywords counted per trait in combined text
    pub keywords: BTreeMap<String, Vec<String>>,

    /// Fallback trait
    pub default_trait: String,
}

impl Default for TraitInference {
    fn default() -> Self {
        let type_traits = [
            ("instruction", "compliance"),
            ("rules", "compliance"),
            ("protocol", "compliance"),
            ("exploration", "curiosity"),
            ("discovery", "curiosity"),
            ("endurance", "persistence"),
            ("grind", "persistence"),
            ("creative", "creativity"),
            ("design", "creativity"),
            ("storytelling", "creativity"),
            ("social", "empathy"),
            ("conversation", "empathy"),
            ("support", "empathy"),
            ("logic", "analytical"),
            ("puzzle", "analytical"),
            ("analysis", "analytical"),
            ("stress", "stress_tolerance"),
            ("time_pressure", "stress_tolerance"),
            ("crisis", "stress_tolerance"),
            ("routine", "reliability"),
            ("maintenance", "reliability"),
        ]
        .into_iter()
        .map(|(k, v)| (k.to_string(), v.to_string()))
        .collect();

        let keywords = [
            ("compliance", &["follow", "instruction", "rule", "comply", "protocol"][..]),
            ("curiosity", &["explore", "discover", "investigate", "curious", "unknown"][..]),
            ("persistence", &["persist", "retry", "again", "endure", "keep going"][..]),
            ("creativity", &["create", "invent", "design", "imagine", "novel"][..]),
            ("empathy", &["help", "comfort", "feel", "listen", "support"][..]),
            ("analytical", &["analy", "logic", "puzzle", "deduce", "calculate"][..]),
            ("stress_tolerance", &["pressure", "deadline", "stress", "urgent", "timer"][..]),
            ("reliability", &["deliver", "consistent", "on time", "routine", "depend"][..]),
        ]
        .into_iter()
        .map(|(k, words)| (k.to_string(), words.iter().map(|w| w.to_string()).collect()))
        .collect();

        Self {
            traits: GLOBAL_TRAITS.iter().map(|t| t.to_string()).collect(),
            type_traits,
            keywords,
            default_trait: DEFAULT_TRAIT.to_string(),
        }
    }
}

impl TraitInference {
    /// Parse tables from JSON text
    pub fn from_json_str(text: &str) -> Result<Self> {
        let tables: Self = serde_json::from_str(text)?;
        tables.validated()
    }

    /// Load tables from a JSON file
    pub fn from_path(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let text = std::fs::read_to_string(path)?;
        tracing::info!("Loaded trait tables from {}", path.display());
        Self::from_json_str(&text)
    }

    /// Normalize labels and make sure every referenced trait is declared
    pub fn validated(mut self) -> Result<Self> {
        self.traits = self
            .traits
            .iter()
            .map(|t| normalize_label(t))
            .filter(|t| !t.is_empty())
            .fold(Vec::new(), |mut acc, t| {
                if !acc.contains(&t) {
                    acc.push(t);
                }
                acc
            });
        if self.traits.is_empty() {
            return Err(AugurError::validation("trait tables declare no traits"));
        }

        self.default_trait = normalize_label(&self.default_trait);
        if !self.is_known(&self.default_trait) {
            return Err(AugurError::validation(format!(
                "default trait '{}' is not declared",
                self.default_trait
            )));
        }

        self.type_traits = self
            .type_traits
            .iter()
            .map(|(k, v)| (normalize_label(k), normalize_label(v)))
            .collect();
        if let Some((label, unknown)) = self.type_traits.iter().find(|(_, v)| !self.is_known(v)) {
            return Err(AugurError::validation(format!(
                "type '{}' maps to undeclared trait '{}'",
                label, unknown
            )));
        }

        self.keywords = self
            .keywords
            .iter()
            .map(|(k, words)| {
                let words = words.iter().map(|w| w.trim().to_lowercase()).filter(|w| !w.is_empty());
                (normalize_label(k), words.collect())
            })
            .collect();
        Ok(self)
    }

    /// Whether `name` is one of the declared traits
    pub fn is_known(&self, name: &str) -> bool {
        self.traits.iter().any(|t| t == name)
    }

    /// Pick the trait an episode measures
    ///
    /// An explicit known trait wins, then the type table, then the trait whose
    /// keywords occur most often in `text` (declared order breaks ties).
    pub fn infer(&self, explicit: Option<&str>, type_label: Option<&str>, text: &str) -> String {
        if let Some(name) = explicit.map(normalize_label).filter(|n| self.is_known(n)) {
            return name;
        }

        if let Some(name) = type_label
            .map(normalize_label)
            .and_then(|label| self.type_traits.get(&label))
        {
            return name.clone();
        }

        let text = text.to_lowercase();
        let mut best: Option<(&str, usize)> = None;
        for name in &self.traits {
            let hits: usize = self
                .keywords
                .get(name)
                .map(|words| words.iter().map(|w| text.matches(w.as_str()).count()).sum())
                .unwrap_or(0);
            if hits > 0 && best.map_or(true, |(_, top)| hits > top) {
                best = Some((name.as_str(), hits));
            }
        }

        best.map(|(name, _)| name.to_string())
            .unwrap_or_else(|| self.default_trait.clone())
    }

    /// Definition of the global trait profile hypothesis
    pub fn profile_definition(&self) -> HypothesisDefinition {
        HypothesisDefinition::new(
            GLOBAL_PROFILE_ID,
            "Agent trait profile",
            HypothesisSource::System,
            "trait_profile",
        )
        .with_description("Long-lived latent trait estimates refined by every episode")
        .with_variables(self.traits.iter().map(VariableDefinition::latent_trait))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_normalize_label() {
        assert_eq!(normalize_label("  Time Pressure "), "time_pressure");
        assert_eq!(normalize_label("logic-puzzle"), "logic_puzzle");
        assert_eq!(normalize_label(""), "");
    }

    #[test]
    fn test_explicit_trait_wins() {
        let tables = TraitInference::default();
        assert_eq!(tables.infer(Some("Empathy"), Some("puzzle"), "logic"), "empathy");
        // Unknown explicit trait falls through to the type table
        assert_eq!(tables.infer(Some("charisma"), Some("puzzle"), ""), "analytical");
    }

    #[test]
    fn test_keyword_counting_and_ties() {
        let tables = TraitInference::default();
        assert_eq!(
            tables.infer(None, Some("unmapped"), "Explore the cave and discover the rule"),
            "curiosity"
        );
        // One hit each for compliance and curiosity: declared order wins
        assert_eq!(tables.infer(None, None, "follow and explore"), "compliance");
        assert_eq!(tables.infer(None, None, "nothing relevant here"), DEFAULT_TRAIT);
    }

    #[test]
    fn test_profile_has_all_traits() {
        let profile = TraitInference::default().profile_definition();
        assert_eq!(profile.id, GLOBAL_PROFILE_ID);
        assert_eq!(profile.variables.len(), GLOBAL_TRAITS.len());
        assert!(profile.variable("stress_tolerance").is_some());
    }

    #[test]
    fn test_partial_json_falls_back_to_defaults() {
        let tables = TraitInference::from_json_str(r#"{ "typeTraits": { "Heist Planning": "analytical" } }"#)
            .unwrap();
        assert_eq!(tables.traits.len(), GLOBAL_TRAITS.len());
        assert_eq!(tables.infer(None, Some("heist planning"), ""), "analytical");
        assert!(!tables.keywords.is_empty());
        // The supplied type table replaces the built-in one wholesale
        assert_eq!(tables.infer(None, Some("puzzle"), ""), DEFAULT_TRAIT);
    }

    #[test]
    fn test_invalid_tables_are_rejected() {
        assert!(TraitInference::from_json_str(r#"{ "defaultTrait": "luck" }"#).is_err());
        assert!(TraitInference::from_json_str(r#"{ "typeTraits": { "x": "luck" } }"#).is_err());
        assert!(TraitInference::from_json_str(r#"{ "traits": [] }"#).is_err());
        assert!(TraitInference::from_json_str("not json").is_err());
    }
}
