//! Gamma family: Poisson counts and exponential waiting times

use super::positive_or;
use crate::types::{GammaPosterior, GammaPrior, Observation, EPSILON};

pub(crate) fn initialize(prior: &GammaPrior) -> GammaPosterior {
    GammaPosterior {
        shape: positive_or(prior.shape, 1.0),
        rate: positive_or(prior.rate, 1.0),
        sample_size: 0.0,
    }
}

/// `shape += count·w`, `rate += exposure·w`
pub(crate) fn update_count(
    posterior: &GammaPosterior,
    observation: &Observation,
    weight: f64,
) -> Option<GammaPosterior> {
    let count = observation.value.as_ref()?.as_number()?;
    if count < 0.0 {
        return None;
    }
    let exposure = observation
        .exposure
        .filter(|e| e.is_finite() && *e > 0.0)
        .unwrap_or(1.0);

    Some(GammaPosterior {
        shape: posterior.shape + count * weight,
        rate: posterior.rate + exposure * weight,
        sample_size: posterior.sample_size + weight,
    })
}

/// Censored observations add exposure time only; events also add to shape
pub(crate) fn update_time_to_event(
    posterior: &GammaPosterior,
    observation: &Observation,
    weight: f64,
) -> Option<GammaPosterior> {
    let elapsed = match observation.elapsed {
        Some(e) => Some(e),
        None => observation.value.as_ref().and_then(|v| v.as_number()),
    }
    .filter(|e| e.is_finite() && *e >= 0.0)?;

    let shape = if observation.censored {
        posterior.shape
    } else {
        posterior.shape + weight
    };

    Some(GammaPosterior {
        shape,
        rate: posterior.rate + elapsed * weight,
        sample_size: posterior.sample_size + weight,
    })
}

/// (rate estimate, 1/√shape)
pub(crate) fn summarize_count(posterior: &GammaPosterior) -> (f64, f64) {
    (
        posterior.shape / posterior.rate,
        1.0 / posterior.shape.sqrt(),
    )
}

/// (expected time to event, 1/√shape)
pub(crate) fn summarize_time_to_event(posterior: &GammaPosterior) -> (Option<f64>, f64) {
    let hazard = posterior.shape / posterior.rate;
    let expected = (posterior.shape > EPSILON && hazard > EPSILON).then(|| 1.0 / hazard);
    (expected, 1.0 / posterior.shape.sqrt())
}
