//! Observations: transient evidence applied to a single variable

use serde::{Deserialize, Serialize};

/// Raw observed value as supplied by upstream producers
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum ObservedValue {
    /// Boolean flag
    Flag(bool),
    /// Numeric measurement
    Number(f64),
    /// Free text (may hold a number, a flag word or a category)
    Text(String),
}

impl ObservedValue {
    /// Interpret as a finite number
    pub fn as_number(&self) -> Option<f64> {
        let n = match self {
            ObservedValue::Flag(b) => Some(if *b { 1.0 } else { 0.0 }),
            ObservedValue::Number(n) => Some(*n),
            ObservedValue::Text(s) => s.trim().parse::<f64>().ok(),
        }?;
        n.is_finite().then_some(n)
    }

    /// Interpret as a binary outcome
    pub fn as_flag(&self) -> Option<bool> {
        match self {
            ObservedValue::Flag(b) => Some(*b),
            ObservedValue::Number(n) if n.is_finite() => Some(*n >= 0.5),
            ObservedValue::Number(_) => None,
            ObservedValue::Text(s) => match s.trim().to_lowercase().as_str() {
                "true" | "yes" | "y" | "success" | "pass" | "passed" => Some(true),
                "false" | "no" | "n" | "failure" | "fail" | "failed" => Some(false),
                other => other
                    .parse::<f64>()
                    .ok()
                    .filter(|n| n.is_finite())
                    .map(|n| n >= 0.5),
            },
        }
    }

    /// Interpret as a category label
    pub fn as_label(&self) -> Option<String> {
        match self {
            ObservedValue::Flag(b) => Some(b.to_string()),
            ObservedValue::Number(_) => None,
            ObservedValue::Text(s) => {
                let trimmed = s.trim();
                (!trimmed.is_empty()).then(|| trimmed.to_string())
            }
        }
    }
}

impl From<bool> for ObservedValue {
    fn from(value: bool) -> Self {
        ObservedValue::Flag(value)
    }
}

impl From<f64> for ObservedValue {
    fn from(value: f64) -> Self {
        ObservedValue::Number(value)
    }
}

impl From<&str> for ObservedValue {
    fn from(value: &str) -> Self {
        ObservedValue::Text(value.to_string())
    }
}

impl From<String> for ObservedValue {
    fn from(value: String) -> Self {
        ObservedValue::Text(value)
    }
}

/// Evidence for one variable
///
/// Every field is optional; which ones matter depends on the variable kind.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Observation {
    /// Observed value
    pub value: Option<ObservedValue>,

    /// Observed category (categorical variables)
    pub category: Option<String>,

    /// Elapsed time in seconds (time-to-event variables)
    pub elapsed: Option<f64>,

    /// Exposure window for count variables (default 1)
    pub exposure: Option<f64>,

    /// Observation weight (default 1)
    pub weight: Option<f64>,

    /// Measurement noise override (latent-trait variables)
    pub measurement_variance: Option<f64>,

    /// The timed event had not yet happened when this was recorded
    #[serde(default)]
    pub censored: bool,

    /// Free-form note carried into the history log
    pub note: Option<String>,
}

impl Observation {
    /// Observation carrying a value
    pub fn value(value: impl Into<ObservedValue>) -> Self {
        Self {
            value: Some(value.into()),
            ..Default::default()
        }
    }

    /// Observation carrying a category
    pub fn category(category: impl Into<String>) -> Self {
        Self {
            category: Some(category.into()),
            ..Default::default()
        }
    }

    /// Observation carrying an elapsed time
    pub fn elapsed(seconds: f64) -> Self {
        Self {
            elapsed: Some(seconds),
            ..Default::default()
        }
    }

    /// Set the weight
    pub fn with_weight(mut self, weight: f64) -> Self {
        self.weight = Some(weight);
        self
    }

    /// Set the exposure
    pub fn with_exposure(mut self, exposure: f64) -> Self {
        self.exposure = Some(exposure);
        self
    }

    /// Set the measurement variance
    pub fn with_measurement_variance(mut self, variance: f64) -> Self {
        self.measurement_variance = Some(variance);
        self
    }

    /// Mark as right-censored
    pub fn censored(mut self) -> Self {
        self.censored = true;
        self
    }

    /// Attach a note
    pub fn with_note(mut self, note: impl Into<String>) -> Self {
        self.note = Some(note.into());
        self
    }

    /// Effective weight, or `None` when the weight is unusable
    pub fn effective_weight(&self) -> Option<f64> {
        match self.weight {
            None => Some(1.0),
            Some(w) if w.is_finite() && w > 0.0 => Some(w),
            Some(_) => None,
        }
    }

    /// Short human-readable description for history entries
    pub fn describe(&self) -> String {
        let mut parts = Vec::new();
        match &self.value {
            Some(ObservedValue::Flag(b)) => parts.push(format!("value={}", b)),
            Some(ObservedValue::Number(n)) => parts.push(format!("value={:.3}", n)),
            Some(ObservedValue::Text(s)) => parts.push(format!("value={:?}", s)),
            None => {}
        }
        if let Some(c) = &self.category {
            parts.push(format!("category={}", c));
        }
        if let Some(e) = self.elapsed {
            parts.push(format!("elapsed={:.1}s", e));
        }
        if self.censored {
            parts.push("censored".to_string());
        }
        if let Some(w) = self.weight {
            parts.push(format!("weight={:.2}", w));
        }
        if parts.is_empty() {
            parts.push("empty".to_string());
        }
        parts.join(" ")
    }
}
