//! Variable definitions and posteriors
//!
//! A variable is one measured quantity inside a hypothesis. Its definition
//! carries the prior hyperparameters for one of seven distribution families;
//! its posterior carries only the sufficient statistics of that family.

use serde::{Deserialize, Serialize};

/// Numeric floor used for every prior and posterior parameter
pub const EPSILON: f64 = 1e-9;

/// The seven supported distribution families
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum VariableKind {
    /// Bernoulli outcome with a Beta prior
    Binary,
    /// Proportion in [0, 1] with a Beta prior
    #[serde(rename = "continuous_01")]
    Continuous01,
    /// One of k ordered levels with a Dirichlet prior
    OrdinalK,
    /// Poisson count with a Gamma prior on the rate
    Count,
    /// Exponential waiting time with a Gamma prior on the hazard
    TimeToEvent,
    /// Open-ended category set with a Dirichlet prior
    Categorical,
    /// Unobservable scalar in [0, 1] with a Gaussian belief
    LatentTrait,
}

impl VariableKind {
    /// Wire name of this kind
    pub fn as_str(&self) -> &'static str {
        match self {
            VariableKind::Binary => "binary",
            VariableKind::Continuous01 => "continuous_01",
            VariableKind::OrdinalK => "ordinal_k",
            VariableKind::Count => "count",
            VariableKind::TimeToEvent => "time_to_event",
            VariableKind::Categorical => "categorical",
            VariableKind::LatentTrait => "latent_trait",
        }
    }

    /// All kinds in declaration order
    pub fn all() -> [VariableKind; 7] {
        [
            VariableKind::Binary,
            VariableKind::Continuous01,
            VariableKind::OrdinalK,
            VariableKind::Count,
            VariableKind::TimeToEvent,
            VariableKind::Categorical,
            VariableKind::LatentTrait,
        ]
    }

    /// Whether estimates of this kind live on a [0, 1] success-like scale
    pub fn is_scorable(&self) -> bool {
        matches!(
            self,
            VariableKind::Binary
                | VariableKind::Continuous01
                | VariableKind::OrdinalK
                | VariableKind::LatentTrait
        )
    }
}

impl std::fmt::Display for VariableKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Beta prior pseudo-counts
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct BetaPrior {
    /// Prior successes (default 1)
    pub alpha: Option<f64>,
    /// Prior failures (default 1)
    pub beta: Option<f64>,
}

/// Dirichlet prior over k ordered levels
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OrdinalPrior {
    /// Number of levels (default 5, minimum 2)
    pub levels: Option<usize>,
    /// Prior pseudo-count per level (default 1)
    pub prior_count: Option<f64>,
}

/// Gamma prior for rates and hazards
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct GammaPrior {
    /// Shape (default 1)
    pub shape: Option<f64>,
    /// Rate (default 1)
    pub rate: Option<f64>,
}

/// Dirichlet prior over a category set that may grow at runtime
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CategoricalPrior {
    /// Categories known up front
    #[serde(default)]
    pub categories: Vec<String>,
    /// Prior pseudo-count per declared category (default 1)
    pub prior_count: Option<f64>,
}

/// Gaussian prior over a latent trait in [0, 1]
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LatentTraitPrior {
    /// Trait this variable measures, when it differs from the variable id
    pub trait_name: Option<String>,
    /// Prior mean (default 0.5)
    pub prior_mean: Option<f64>,
    /// Prior variance (default 0.25)
    pub prior_variance: Option<f64>,
    /// Default measurement noise variance (default 0.08)
    pub measurement_variance: Option<f64>,
}

/// Prior hyperparameters, tagged by kind
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum VariablePrior {
    /// Beta-Bernoulli
    Binary(BetaPrior),
    /// Beta over a proportion
    #[serde(rename = "continuous_01")]
    Continuous01(BetaPrior),
    /// Dirichlet over ordered levels
    OrdinalK(OrdinalPrior),
    /// Gamma-Poisson
    Count(GammaPrior),
    /// Gamma-exponential with censoring
    TimeToEvent(GammaPrior),
    /// Dirichlet-multinomial over a growing set
    Categorical(CategoricalPrior),
    /// Gaussian-Gaussian
    LatentTrait(LatentTraitPrior),
}

impl VariablePrior {
    /// Kind tag of this prior
    pub fn kind(&self) -> VariableKind {
        match self {
            VariablePrior::Binary(_) => VariableKind::Binary,
            VariablePrior::Continuous01(_) => VariableKind::Continuous01,
            VariablePrior::OrdinalK(_) => VariableKind::OrdinalK,
            VariablePrior::Count(_) => VariableKind::Count,
            VariablePrior::TimeToEvent(_) => VariableKind::TimeToEvent,
            VariablePrior::Categorical(_) => VariableKind::Categorical,
            VariablePrior::LatentTrait(_) => VariableKind::LatentTrait,
        }
    }
}

/// One measured variable of a hypothesis
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct VariableDefinition {
    /// Stable id, unique within the hypothesis
    pub id: String,

    /// Human-readable label
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub label: Option<String>,

    /// Prior for the variable's family
    #[serde(flatten)]
    pub prior: VariablePrior,
}

impl VariableDefinition {
    /// Create a definition from an explicit prior
    pub fn new(id: impl Into<String>, prior: VariablePrior) -> Self {
        Self {
            id: id.into(),
            label: None,
            prior,
        }
    }

    /// Binary outcome with a uniform Beta(1, 1) prior
    pub fn binary(id: impl Into<String>) -> Self {
        Self::new(id, VariablePrior::Binary(BetaPrior::default()))
    }

    /// Proportion in [0, 1] with a uniform Beta(1, 1) prior
    pub fn continuous(id: impl Into<String>) -> Self {
        Self::new(id, VariablePrior::Continuous01(BetaPrior::default()))
    }

    /// Ordinal scale with `levels` bins
    pub fn ordinal(id: impl Into<String>, levels: usize) -> Self {
        Self::new(
            id,
            VariablePrior::OrdinalK(OrdinalPrior {
                levels: Some(levels),
                prior_count: None,
            }),
        )
    }

    /// Event count
    pub fn count(id: impl Into<String>) -> Self {
        Self::new(id, VariablePrior::Count(GammaPrior::default()))
    }

    /// Waiting time with right-censoring
    pub fn time_to_event(id: impl Into<String>) -> Self {
        Self::new(id, VariablePrior::TimeToEvent(GammaPrior::default()))
    }

    /// Category with an initial set of known values
    pub fn categorical<I, S>(id: impl Into<String>, categories: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self::new(
            id,
            VariablePrior::Categorical(CategoricalPrior {
                categories: categories.into_iter().map(Into::into).collect(),
                prior_count: None,
            }),
        )
    }

    /// Latent trait with default Gaussian prior
    pub fn latent_trait(id: impl Into<String>) -> Self {
        Self::new(id, VariablePrior::LatentTrait(LatentTraitPrior::default()))
    }

    /// Latent trait measuring a named trait
    pub fn latent_trait_for(id: impl Into<String>, trait_name: impl Into<String>) -> Self {
        Self::new(
            id,
            VariablePrior::LatentTrait(LatentTraitPrior {
                trait_name: Some(trait_name.into()),
                ..Default::default()
            }),
        )
    }

    /// Attach a label
    pub fn with_label(mut self, label: impl Into<String>) -> Self {
        self.label = Some(label.into());
        self
    }

    /// Kind tag of this definition
    pub fn kind(&self) -> VariableKind {
        self.prior.kind()
    }

    /// Trait measured by a latent-trait variable (falls back to the id)
    pub fn trait_name(&self) -> Option<&str> {
        match &self.prior {
            VariablePrior::LatentTrait(p) => Some(p.trait_name.as_deref().unwrap_or(&self.id)),
            _ => None,
        }
    }
}

/// Beta sufficient statistics
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BetaPosterior {
    /// Successes plus prior
    pub alpha: f64,
    /// Failures plus prior
    pub beta: f64,
    /// Total applied observation weight
    #[serde(default)]
    pub sample_size: f64,
}

/// Dirichlet sufficient statistics over ordered bins
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OrdinalPosterior {
    /// Pseudo-count per bin, lowest level first
    pub counts: Vec<f64>,
    /// Total applied observation weight
    #[serde(default)]
    pub sample_size: f64,
}

/// Gamma sufficient statistics
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GammaPosterior {
    /// Shape (events plus prior)
    pub shape: f64,
    /// Rate (exposure plus prior)
    pub rate: f64,
    /// Total applied observation weight
    #[serde(default)]
    pub sample_size: f64,
}

/// Dirichlet sufficient statistics over a growing category set
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CategoricalPosterior {
    /// Category names in insertion order
    pub categories: Vec<String>,
    /// Pseudo-count per category, parallel to `categories`
    pub counts: Vec<f64>,
    /// Total applied observation weight
    #[serde(default)]
    pub sample_size: f64,
}

/// Gaussian belief
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GaussianPosterior {
    /// Posterior mean in [0, 1]
    pub mean: f64,
    /// Posterior variance
    pub variance: f64,
    /// Total applied observation weight
    #[serde(default)]
    pub sample_size: f64,
}

/// Posterior sufficient statistics, tagged by kind
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum VariablePosterior {
    /// Beta over a binary outcome
    Binary(BetaPosterior),
    /// Beta over a proportion
    #[serde(rename = "continuous_01")]
    Continuous01(BetaPosterior),
    /// Dirichlet over ordered levels
    OrdinalK(OrdinalPosterior),
    /// Gamma over a Poisson rate
    Count(GammaPosterior),
    /// Gamma over an exponential hazard
    TimeToEvent(GammaPosterior),
    /// Dirichlet over categories
    Categorical(CategoricalPosterior),
    /// Gaussian over a latent trait
    LatentTrait(GaussianPosterior),
}

impl VariablePosterior {
    /// Kind tag of this posterior
    pub fn kind(&self) -> VariableKind {
        match self {
            VariablePosterior::Binary(_) => VariableKind::Binary,
            VariablePosterior::Continuous01(_) => VariableKind::Continuous01,
            VariablePosterior::OrdinalK(_) => VariableKind::OrdinalK,
            VariablePosterior::Count(_) => VariableKind::Count,
            VariablePosterior::TimeToEvent(_) => VariableKind::TimeToEvent,
            VariablePosterior::Categorical(_) => VariableKind::Categorical,
            VariablePosterior::LatentTrait(_) => VariableKind::LatentTrait,
        }
    }

    /// Total observation weight absorbed so far
    pub fn sample_size(&self) -> f64 {
        match self {
            VariablePosterior::Binary(p) | VariablePosterior::Continuous01(p) => p.sample_size,
            VariablePosterior::OrdinalK(p) => p.sample_size,
            VariablePosterior::Count(p) | VariablePosterior::TimeToEvent(p) => p.sample_size,
            VariablePosterior::Categorical(p) => p.sample_size,
            VariablePosterior::LatentTrait(p) => p.sample_size,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_definition_wire_format() {
        let def = VariableDefinition::latent_trait_for("target_trait", "curiosity");
        let json = serde_json::to_value(&def).unwrap();
        assert_eq!(json["kind"], "latent_trait");
        assert_eq!(json["id"], "target_trait");
        assert_eq!(json["traitName"], "curiosity");

        let parsed: VariableDefinition = serde_json::from_value(serde_json::json!({
            "id": "score",
            "kind": "continuous_01",
            "alpha": 2.0
        }))
        .unwrap();
        assert_eq!(parsed.kind(), VariableKind::Continuous01);
        assert_eq!(
            parsed.prior,
            VariablePrior::Continuous01(BetaPrior {
                alpha: Some(2.0),
                beta: None
            })
        );
    }

    #[test]
    fn test_posterior_tag_matches_kind() {
        let posterior = VariablePosterior::TimeToEvent(GammaPosterior {
            shape: 1.0,
            rate: 2.0,
            sample_size: 0.0,
        });
        let json = serde_json::to_value(&posterior).unwrap();
        assert_eq!(json["kind"], "time_to_event");
        let back: VariablePosterior = serde_json::from_value(json).unwrap();
        assert_eq!(back.kind(), VariableKind::TimeToEvent);
    }

    #[test]
    fn test_trait_name_falls_back_to_id() {
        assert_eq!(VariableDefinition::latent_trait("empathy").trait_name(), Some("empathy"));
        assert_eq!(VariableDefinition::binary("success").trait_name(), None);
    }

    #[test]
    fn test_scorable_kinds() {
        let scorable: Vec<_> = VariableKind::all().into_iter().filter(|k| k.is_scorable()).collect();
        assert_eq!(
            scorable,
            vec![
                VariableKind::Binary,
                VariableKind::Continuous01,
                VariableKind::OrdinalK,
                VariableKind::LatentTrait
            ]
        );
    }
}
