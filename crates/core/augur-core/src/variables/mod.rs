//! Variable Model
//!
//! Pure, stateless conjugate updates for the seven variable kinds. Every
//! family exposes the same three operations, dispatched here by kind:
//!
//! - [`initialize`]: build the prior posterior from a definition
//! - [`update`]: fold one observation into a posterior
//! - [`summarize`]: derive estimate, uncertainty and sample size
//!
//! Unparseable evidence never errors: the input posterior comes back
//! unchanged. Upstream signal is routinely noisy or partial.

mod beta;
mod categorical;
mod gamma;
mod gaussian;
mod ordinal;

use crate::types::{
    Observation, VariableDefinition, VariableKind, VariablePosterior, VariablePrior, EPSILON,
};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Derived view of a posterior
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct VariableSummary {
    /// Kind of the summarized posterior
    pub kind: VariableKind,

    /// Point estimate; `None` when the family has no meaningful estimate yet
    pub estimate: Option<f64>,

    /// Normalized uncertainty in [0, 1]
    pub uncertainty: f64,

    /// Total observation weight absorbed
    pub sample_size: f64,

    /// Probability per level or category (Dirichlet families only)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub distribution: Option<BTreeMap<String, f64>>,
}

/// Build the prior posterior for a definition
pub fn initialize(definition: &VariableDefinition) -> VariablePosterior {
    match &definition.prior {
        VariablePrior::Binary(prior) => VariablePosterior::Binary(beta::initialize(prior)),
        VariablePrior::Continuous01(prior) => {
            VariablePosterior::Continuous01(beta::initialize(prior))
        }
        VariablePrior::OrdinalK(prior) => VariablePosterior::OrdinalK(ordinal::initialize(prior)),
        VariablePrior::Count(prior) => VariablePosterior::Count(gamma::initialize(prior)),
        VariablePrior::TimeToEvent(prior) => {
            VariablePosterior::TimeToEvent(gamma::initialize(prior))
        }
        VariablePrior::Categorical(prior) => {
            VariablePosterior::Categorical(categorical::initialize(prior))
        }
        VariablePrior::LatentTrait(prior) => {
            VariablePosterior::LatentTrait(gaussian::initialize(prior))
        }
    }
}

/// Fold one observation into a posterior
///
/// Returns the input unchanged when the observation cannot be parsed for the
/// variable's kind.
pub fn update(
    definition: &VariableDefinition,
    posterior: &VariablePosterior,
    observation: &Observation,
) -> VariablePosterior {
    update_checked(definition, posterior, observation).0
}

/// Same as [`update`], also reporting whether the observation was applied
pub fn update_checked(
    definition: &VariableDefinition,
    posterior: &VariablePosterior,
    observation: &Observation,
) -> (VariablePosterior, bool) {
    let Some(weight) = observation.effective_weight() else {
        return (posterior.clone(), false);
    };

    let updated = match (&definition.prior, posterior) {
        (VariablePrior::Binary(_), VariablePosterior::Binary(p)) => beta::parse_binary(observation)
            .map(|x| VariablePosterior::Binary(beta::update(p, x, weight))),
        (VariablePrior::Continuous01(_), VariablePosterior::Continuous01(p)) => {
            beta::parse_proportion(observation)
                .map(|x| VariablePosterior::Continuous01(beta::update(p, x, weight)))
        }
        (VariablePrior::OrdinalK(_), VariablePosterior::OrdinalK(p)) => {
            ordinal::update(p, observation, weight).map(VariablePosterior::OrdinalK)
        }
        (VariablePrior::Count(_), VariablePosterior::Count(p)) => {
            gamma::update_count(p, observation, weight).map(VariablePosterior::Count)
        }
        (VariablePrior::TimeToEvent(_), VariablePosterior::TimeToEvent(p)) => {
            gamma::update_time_to_event(p, observation, weight).map(VariablePosterior::TimeToEvent)
        }
        (VariablePrior::Categorical(_), VariablePosterior::Categorical(p)) => {
            categorical::update(p, observation, weight).map(VariablePosterior::Categorical)
        }
        (VariablePrior::LatentTrait(prior), VariablePosterior::LatentTrait(p)) => {
            gaussian::update(prior, p, observation, weight).map(VariablePosterior::LatentTrait)
        }
        _ => {
            tracing::debug!(
                "Posterior kind {} does not match definition '{}' of kind {}",
                posterior.kind(),
                definition.id,
                definition.kind()
            );
            None
        }
    };

    match updated {
        Some(next) => (next, true),
        None => (posterior.clone(), false),
    }
}

/// Derive estimate, uncertainty and sample size from a posterior
pub fn summarize(posterior: &VariablePosterior) -> VariableSummary {
    let kind = posterior.kind();
    let sample_size = posterior.sample_size();
    let (estimate, uncertainty, distribution) = match posterior {
        VariablePosterior::Binary(p) | VariablePosterior::Continuous01(p) => {
            let (estimate, uncertainty) = beta::summarize(p);
            (Some(estimate), uncertainty, None)
        }
        VariablePosterior::OrdinalK(p) => ordinal::summarize(p),
        VariablePosterior::Count(p) => {
            let (estimate, uncertainty) = gamma::summarize_count(p);
            (Some(estimate), uncertainty, None)
        }
        VariablePosterior::TimeToEvent(p) => {
            let (estimate, uncertainty) = gamma::summarize_time_to_event(p);
            (estimate, uncertainty, None)
        }
        VariablePosterior::Categorical(p) => categorical::summarize(p),
        VariablePosterior::LatentTrait(p) => {
            let (estimate, uncertainty) = gaussian::summarize(p);
            (Some(estimate), uncertainty, None)
        }
    };

    VariableSummary {
        kind,
        estimate,
        uncertainty: unit(uncertainty),
        sample_size,
        distribution,
    }
}

/// Use a supplied hyperparameter if finite, else the default; floor above zero
pub(crate) fn positive_or(value: Option<f64>, default: f64) -> f64 {
    value
        .filter(|v| v.is_finite())
        .unwrap_or(default)
        .max(EPSILON)
}

/// Clamp into [0, 1], mapping NaN to 1 (maximal uncertainty)
pub(crate) fn unit(value: f64) -> f64 {
    if value.is_nan() {
        1.0
    } else {
        value.clamp(0.0, 1.0)
    }
}

/// Shannon entropy of a probability vector, normalized by ln(n)
pub(crate) fn normalized_entropy(probabilities: &[f64]) -> f64 {
    let n = probabilities.len();
    if n == 0 {
        return 1.0;
    }
    if n == 1 {
        return 0.0;
    }
    let entropy: f64 = probabilities
        .iter()
        .filter(|p| **p > 0.0)
        .map(|p| -p * p.ln())
        .sum();
    unit(entropy / (n as f64).ln())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::{GammaPrior, VariableKind};

    fn all_definitions() -> Vec<VariableDefinition> {
        vec![
            VariableDefinition::binary("success"),
            VariableDefinition::continuous("score"),
            VariableDefinition::ordinal("difficulty", 5),
            VariableDefinition::count("hints"),
            VariableDefinition::time_to_event("elapsed_seconds"),
            VariableDefinition::categorical("outcome", ["success", "failure", "abandoned", "unknown"]),
            VariableDefinition::latent_trait("curiosity"),
        ]
    }

    #[test]
    fn test_initialize_matches_kind_and_has_no_samples() {
        for def in all_definitions() {
            let posterior = initialize(&def);
            assert_eq!(posterior.kind(), def.kind());

            let summary = summarize(&posterior);
            assert_eq!(summary.sample_size, 0.0, "{} should start empty", def.id);
            assert!((0.0..=1.0).contains(&summary.uncertainty));
        }
    }

    #[test]
    fn test_prior_uncertainty_is_maximal_for_default_priors() {
        let max_expected = |kind: VariableKind| match kind {
            // Beta(1, 1): std sqrt(1/12) normalized by 0.5
            VariableKind::Binary | VariableKind::Continuous01 => (1.0f64 / 12.0).sqrt() / 0.5,
            _ => 1.0,
        };

        for def in all_definitions() {
            let prior = summarize(&initialize(&def));
            assert!(
                (prior.uncertainty - max_expected(def.kind())).abs() < 1e-9,
                "{}: prior uncertainty {}",
                def.id,
                prior.uncertainty
            );
        }
    }

    #[test]
    fn test_mismatched_posterior_is_left_unchanged() {
        let def = VariableDefinition::binary("success");
        let foreign = initialize(&VariableDefinition::latent_trait("curiosity"));
        let (next, applied) = update_checked(&def, &foreign, &Observation::value(true));
        assert!(!applied);
        assert_eq!(next, foreign);
    }

    #[test]
    fn test_invalid_weight_is_a_no_op() {
        let def = VariableDefinition::binary("success");
        let prior = initialize(&def);
        let (next, applied) =
            update_checked(&def, &prior, &Observation::value(true).with_weight(-1.0));
        assert!(!applied);
        assert_eq!(next, prior);
    }

    #[test]
    fn test_zero_shape_prior_is_floored() {
        let def = VariableDefinition::new(
            "wait",
            VariablePrior::TimeToEvent(GammaPrior {
                shape: Some(0.0),
                rate: Some(-3.0),
            }),
        );
        match initialize(&def) {
            VariablePosterior::TimeToEvent(p) => {
                assert_eq!(p.shape, EPSILON);
                assert_eq!(p.rate, EPSILON);
            }
            other => panic!("unexpected posterior {:?}", other),
        }
    }

    #[test]
    fn test_normalized_entropy_bounds() {
        assert_eq!(normalized_entropy(&[]), 1.0);
        assert_eq!(normalized_entropy(&[1.0]), 0.0);
        assert!((normalized_entropy(&[0.25; 4]) - 1.0).abs() < 1e-12);
        assert!(normalized_entropy(&[0.97, 0.01, 0.01, 0.01]) < 0.2);
    }
}
