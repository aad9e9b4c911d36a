//! Dirichlet over k ordered levels

use super::{normalized_entropy, positive_or};
use crate::types::{Observation, OrdinalPosterior, OrdinalPrior};
use std::collections::BTreeMap;

const DEFAULT_LEVELS: usize = 5;
/// Upper bound on ordinal levels
const MAX_LEVELS: usize = 64;

pub(crate) fn initialize(prior: &OrdinalPrior) -> OrdinalPosterior {
    let requested = prior.levels.unwrap_or(DEFAULT_LEVELS);
    let levels = requested.clamp(2, MAX_LEVELS);
    if levels != requested {
        tracing::debug!("Ordinal levels {} clamped to {}", requested, levels);
    }
    let count = positive_or(prior.prior_count, 1.0);
    OrdinalPosterior {
        counts: vec![count; levels],
        sample_size: 0.0,
    }
}

/// Value is a 0-based level index, rounded and clamped into range
pub(crate) fn update(
    posterior: &OrdinalPosterior,
    observation: &Observation,
    weight: f64,
) -> Option<OrdinalPosterior> {
    if posterior.counts.is_empty() {
        return None;
    }
    let raw = observation.value.as_ref()?.as_number()?;
    let max_index = (posterior.counts.len() - 1) as f64;
    let index = raw.round().clamp(0.0, max_index) as usize;

    let mut next = posterior.clone();
    next.counts[index] += weight;
    next.sample_size += weight;
    Some(next)
}

pub(crate) fn summarize(
    posterior: &OrdinalPosterior,
) -> (Option<f64>, f64, Option<BTreeMap<String, f64>>) {
    let total: f64 = posterior.counts.iter().sum();
    if posterior.counts.is_empty() || total <= 0.0 {
        return (None, 1.0, None);
    }

    let probabilities: Vec<f64> = posterior.counts.iter().map(|c| c / total).collect();
    let span = (probabilities.len() - 1).max(1) as f64;
    let position = probabilities
        .iter()
        .enumerate()
        .map(|(i, p)| p * i as f64 / span)
        .sum::<f64>();

    let distribution = probabilities
        .iter()
        .enumerate()
        .map(|(i, p)| (i.to_string(), *p))
        .collect();

    (
        Some(position.clamp(0.0, 1.0)),
        normalized_entropy(&probabilities),
        Some(distribution),
    )
}
