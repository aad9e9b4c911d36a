//! Dirichlet over an open-ended category set

use super::{normalized_entropy, positive_or};
use crate::types::{CategoricalPosterior, CategoricalPrior, Observation, EPSILON};
use std::collections::BTreeMap;

pub(crate) fn initialize(prior: &CategoricalPrior) -> CategoricalPosterior {
    let count = positive_or(prior.prior_count, 1.0);
    let mut categories: Vec<String> = Vec::with_capacity(prior.categories.len());
    for raw in &prior.categories {
        let name = raw.trim();
        if name.is_empty() || position(&categories, name).is_some() {
            continue;
        }
        categories.push(name.to_string());
    }
    let counts = vec![count; categories.len()];
    CategoricalPosterior {
        categories,
        counts,
        sample_size: 0.0,
    }
}

/// Matches case-insensitively; unseen categories join with an EPSILON prior
pub(crate) fn update(
    posterior: &CategoricalPosterior,
    observation: &Observation,
    weight: f64,
) -> Option<CategoricalPosterior> {
    let label = observation
        .category
        .as_deref()
        .map(str::trim)
        .filter(|c| !c.is_empty())
        .map(str::to_string)
        .or_else(|| observation.value.as_ref().and_then(|v| v.as_label()))?;

    let mut next = posterior.clone();
    // Repair parallel vectors that drifted apart in storage
    next.counts.resize(next.categories.len(), EPSILON);

    let index = match position(&next.categories, &label) {
        Some(i) => i,
        None => {
            next.categories.push(label);
            next.counts.push(EPSILON);
            next.categories.len() - 1
        }
    };
    next.counts[index] += weight;
    next.sample_size += weight;
    Some(next)
}

pub(crate) fn summarize(
    posterior: &CategoricalPosterior,
) -> (Option<f64>, f64, Option<BTreeMap<String, f64>>) {
    let n = posterior.categories.len().min(posterior.counts.len());
    let counts = &posterior.counts[..n];
    let total: f64 = counts.iter().sum();
    if n == 0 || total <= 0.0 {
        return (None, 1.0, Some(BTreeMap::new()));
    }

    let probabilities: Vec<f64> = counts.iter().map(|c| c / total).collect();
    let max = probabilities.iter().cloned().fold(0.0, f64::max);
    let distribution = posterior
        .categories
        .iter()
        .zip(probabilities.iter())
        .map(|(name, p)| (name.clone(), *p))
        .collect();

    (Some(max), normalized_entropy(&probabilities), Some(distribution))
}

fn position(categories: &[String], label: &str) -> Option<usize> {
    let needle = label.trim().to_lowercase();
    categories.iter().position(|c| c.to_lowercase() == needle)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn outcomes() -> CategoricalPosterior {
        initialize(&CategoricalPrior {
            categories: vec!["success".into(), "failure".into(), " Success ".into(), "".into()],
            prior_count: None,
        })
    }

    #[test]
    fn test_initialize_dedupes_categories() {
        let posterior = outcomes();
        assert_eq!(posterior.categories, vec!["success", "failure"]);
        assert_eq!(posterior.counts, vec![1.0, 1.0]);
    }

    #[test]
    fn test_known_category_matches_case_insensitively() {
        let next = update(&outcomes(), &Observation::category("FAILURE"), 1.0).unwrap();
        assert_eq!(next.categories.len(), 2);
        assert_eq!(next.counts, vec![1.0, 2.0]);
    }

    #[test]
    fn test_new_category_gets_mass() {
        let next = update(&outcomes(), &Observation::category("abandoned"), 1.0).unwrap();
        assert_eq!(next.categories.last().map(String::as_str), Some("abandoned"));

        let (_, _, distribution) = summarize(&next);
        let mass = distribution.unwrap()["abandoned"];
        assert!(mass > 0.0);
    }

    #[test]
    fn test_value_text_is_used_as_category() {
        let next = update(&outcomes(), &Observation::value("success"), 2.0).unwrap();
        assert_eq!(next.counts, vec![3.0, 1.0]);
        assert!(update(&outcomes(), &Observation::value(3.0), 1.0).is_none());
    }

    #[test]
    fn test_empty_category_set() {
        let empty = initialize(&CategoricalPrior::default());
        let (estimate, uncertainty, distribution) = summarize(&empty);
        assert_eq!(estimate, None);
        assert_eq!(uncertainty, 1.0);
        assert!(distribution.unwrap().is_empty());

        let single = update(&empty, &Observation::category("only"), 1.0).unwrap();
        let (estimate, uncertainty, _) = summarize(&single);
        assert!((estimate.unwrap() - 1.0).abs() < 1e-12);
        assert_eq!(uncertainty, 0.0);
    }
}
