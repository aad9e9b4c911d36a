//! Beta family: binary outcomes and proportions

use super::positive_or;
use crate::types::{BetaPosterior, BetaPrior, Observation};

pub(crate) fn initialize(prior: &BetaPrior) -> BetaPosterior {
    BetaPosterior {
        alpha: positive_or(prior.alpha, 1.0),
        beta: positive_or(prior.beta, 1.0),
        sample_size: 0.0,
    }
}

/// x is a success indicator (binary) or a proportion (continuous_01)
pub(crate) fn update(posterior: &BetaPosterior, x: f64, weight: f64) -> BetaPosterior {
    BetaPosterior {
        alpha: posterior.alpha + weight * x,
        beta: posterior.beta + weight * (1.0 - x),
        sample_size: posterior.sample_size + weight,
    }
}

pub(crate) fn parse_binary(observation: &Observation) -> Option<f64> {
    observation
        .value
        .as_ref()?
        .as_flag()
        .map(|b| if b { 1.0 } else { 0.0 })
}

pub(crate) fn parse_proportion(observation: &Observation) -> Option<f64> {
    observation
        .value
        .as_ref()?
        .as_number()
        .map(|x| x.clamp(0.0, 1.0))
}

/// (mean, std / 0.5)
pub(crate) fn summarize(posterior: &BetaPosterior) -> (f64, f64) {
    let a = posterior.alpha;
    let b = posterior.beta;
    let total = a + b;
    let mean = a / total;
    let variance = (a * b) / (total * total * (total + 1.0));
    (mean, variance.sqrt() / 0.5)
}
