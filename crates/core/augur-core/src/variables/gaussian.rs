//! Gaussian belief over a latent trait in [0, 1]

use super::positive_or;
use crate::types::{GaussianPosterior, LatentTraitPrior, Observation, EPSILON};

pub(crate) const DEFAULT_PRIOR_MEAN: f64 = 0.5;
pub(crate) const DEFAULT_PRIOR_VARIANCE: f64 = 0.25;
pub(crate) const DEFAULT_MEASUREMENT_VARIANCE: f64 = 0.08;

pub(crate) fn initialize(prior: &LatentTraitPrior) -> GaussianPosterior {
    GaussianPosterior {
        mean: prior
            .prior_mean
            .filter(|m| m.is_finite())
            .unwrap_or(DEFAULT_PRIOR_MEAN)
            .clamp(0.0, 1.0),
        variance: positive_or(prior.prior_variance, DEFAULT_PRIOR_VARIANCE),
        sample_size: 0.0,
    }
}

/// One-shot precision-weighted fusion of a noisy measurement
pub(crate) fn update(
    prior: &LatentTraitPrior,
    posterior: &GaussianPosterior,
    observation: &Observation,
    weight: f64,
) -> Option<GaussianPosterior> {
    let measurement = observation.value.as_ref()?.as_number()?.clamp(0.0, 1.0);
    let base_variance = observation
        .measurement_variance
        .filter(|v| v.is_finite() && *v > 0.0)
        .unwrap_or_else(|| positive_or(prior.measurement_variance, DEFAULT_MEASUREMENT_VARIANCE));
    let noise = (base_variance / weight).max(EPSILON);
    let prior_variance = posterior.variance.max(EPSILON);

    let variance = 1.0 / (1.0 / prior_variance + 1.0 / noise);
    let mean = variance * (posterior.mean / prior_variance + measurement / noise);

    Some(GaussianPosterior {
        mean: mean.clamp(0.0, 1.0),
        variance: variance.max(EPSILON),
        sample_size: posterior.sample_size + weight,
    })
}

/// (mean, √variance / 0.5)
pub(crate) fn summarize(posterior: &GaussianPosterior) -> (f64, f64) {
    (posterior.mean, posterior.variance.sqrt() / 0.5)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn default_prior() -> LatentTraitPrior {
        LatentTraitPrior {
            trait_name: None,
            prior_mean: Some(0.5),
            prior_variance: Some(0.25),
            measurement_variance: Some(0.08),
        }
    }

    #[test]
    fn test_single_high_measurement() {
        let prior = default_prior();
        let start = initialize(&prior);
        let next = update(&prior, &start, &Observation::value(1.0), 1.0).unwrap();

        assert!(next.mean > 0.5);
        assert!(next.variance < 0.25);
        // 1 / (4 + 12.5)
        assert!((next.variance - 1.0 / 16.5).abs() < 1e-12);
    }

    #[test]
    fn test_variance_never_increases() {
        let prior = default_prior();
        let mut posterior = initialize(&prior);
        for (i, m) in [0.9, 0.1, 0.5, 1.0, 0.0, 0.7].iter().enumerate() {
            let weight = 1.0 + i as f64;
            let next = update(&prior, &posterior, &Observation::value(*m), weight).unwrap();
            assert!(next.variance <= posterior.variance);
            posterior = next;
        }
    }

    #[test]
    fn test_lower_weight_moves_less() {
        let prior = default_prior();
        let start = initialize(&prior);
        let full = update(&prior, &start, &Observation::value(1.0), 1.0).unwrap();
        let half = update(&prior, &start, &Observation::value(1.0), 0.5).unwrap();
        assert!(half.mean < full.mean);
        assert!(half.variance > full.variance);
    }

    #[test]
    fn test_measurement_is_clamped_and_override_respected() {
        let prior = default_prior();
        let start = initialize(&prior);
        let wild = update(&prior, &start, &Observation::value(7.0), 1.0).unwrap();
        let one = update(&prior, &start, &Observation::value(1.0), 1.0).unwrap();
        assert!((wild.mean - one.mean).abs() < 1e-12);

        let precise = update(
            &prior,
            &start,
            &Observation::value(1.0).with_measurement_variance(0.001),
            1.0,
        )
        .unwrap();
        assert!(precise.mean > one.mean);
    }
}
