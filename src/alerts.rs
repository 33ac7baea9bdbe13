//! Threshold rules turning samples into alert events
//!
//! Evaluation is stateless: every sample is judged on its own, so a host
//! that stays above a threshold raises an alert on every sample it reports.
//! Rules are evaluated in table order and fire independently.

use uuid::Uuid;

use crate::{AlertCategory, AlertEvent, ResourceSample};

/// A single threshold rule
#[derive(Debug, Clone, Copy)]
pub struct AlertRule {
    pub category: AlertCategory,

    /// The rule fires when the reading is strictly above this value
    pub threshold: f64,

    pub message: &'static str,

    reading: fn(&ResourceSample) -> f64,
}

impl AlertRule {
    pub const fn new(
        category: AlertCategory,
        threshold: f64,
        message: &'static str,
        reading: fn(&ResourceSample) -> f64,
    ) -> Self {
        Self {
            category,
            threshold,
            message,
            reading,
        }
    }

    pub fn reading(&self, sample: &ResourceSample) -> f64 {
        (self.reading)(sample)
    }

    pub fn fires(&self, sample: &ResourceSample) -> bool {
        self.reading(sample) > self.threshold
    }
}

/// Active rule set, in evaluation order
pub const RULES: &[AlertRule] = &[
    AlertRule {
        category: AlertCategory::HighCpu,
        threshold: 90.0,
        message: "CPU usage exceeds 90%",
        reading: |sample| sample.cpu,
    },
    AlertRule {
        category: AlertCategory::HighMemory,
        threshold: 90.0,
        message: "Memory usage exceeds 90%",
        reading: |sample| sample.memory,
    },
];

/// Evaluate all rules against a sample
pub fn evaluate(sample: &ResourceSample) -> Vec<AlertEvent> {
    evaluate_with(RULES, sample)
}

/// Evaluate a custom rule set against a sample
pub fn evaluate_with(rules: &[AlertRule], sample: &ResourceSample) -> Vec<AlertEvent> {
    rules
        .iter()
        .filter(|rule| rule.fires(sample))
        .map(|rule| AlertEvent {
            id: Uuid::new_v4(),
            computer_id: sample.computer_id,
            category: rule.category,
            message: rule.message.to_string(),
            timestamp: sample.timestamp,
            resolved: false,
        })
        .collect()
}
