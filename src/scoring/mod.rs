//! Scoring engine.
//!
//! Maps a raw [`MetricVector`] to a [`ScoreVector`]: each sub-metric is scored
//! by its calibrated curve, sub-scores are combined into category scores by
//! their weights, and categories are combined into the maintainability index.
//!
//! Scoring is a pure function of the metric vector and the calibration.
//!
//! # Example
//!
//! ```rust
//! use tfmi::scoring::{Calibration, ScoringEngine};
//! use tfmi::types::MetricVector;
//!
//! let engine = ScoringEngine::new(Calibration::default()).unwrap();
//! let metrics = MetricVector { block_loc: 25.0, cyclomatic_complexity: 1.0, ..MetricVector::default() };
//! let (scores, _domain_errors) = engine.score(&metrics);
//! assert!(scores.maintainability_index <= 100.0);
//! ```

mod aggregate;
mod calibration;
mod curve;

pub use aggregate::summarize_file;
pub use calibration::{Calibration, CategoryWeights, MetricCalibration, WEIGHT_TOLERANCE};
pub use curve::{Falloff, PenaltyCurve, PlateauCurve, ScoreCurve};

use crate::error::{Result, TfmiError};
use crate::types::{Category, MetricVector, ScoreVector, SubMetric};
use std::collections::BTreeMap;

/// Lower and upper bound of the final index.
pub const MI_RANGE: (f64, f64) = (0.0, 100.0);

/// Applies a validated [`Calibration`] to metric vectors.
#[derive(Debug, Clone)]
pub struct ScoringEngine {
    calibration: Calibration,
}

impl ScoringEngine {
    /// Create an engine after validating the calibration.
    ///
    /// # Errors
    ///
    /// Returns `ConfigValue` if the calibration is invalid.
    pub fn new(calibration: Calibration) -> Result<Self> {
        calibration.validate()?;
        Ok(Self { calibration })
    }

    /// The calibration in use.
    #[must_use]
    pub fn calibration(&self) -> &Calibration {
        &self.calibration
    }

    /// Score one metric vector.
    ///
    /// Raw values outside a metric's domain are clamped to the nearest
    /// boundary before scoring; each clamp is returned as a `MetricDomain`
    /// error for the caller to record.
    #[must_use]
    pub fn score(&self, metrics: &MetricVector) -> (ScoreVector, Vec<TfmiError>) {
        let mut domain_errors = Vec::new();
        let mut sub_scores = BTreeMap::new();

        for metric in SubMetric::ALL {
            let raw = metrics
                .get(metric)
                .map(|value| clamp_to_domain(metric, value, &mut domain_errors));
            let score = self.calibration.metric(metric).curve.score(raw);
            sub_scores.insert(metric, score);
        }

        let categories: BTreeMap<Category, f64> = Category::ALL
            .iter()
            .map(|category| {
                let score = category
                    .metrics()
                    .iter()
                    .map(|m| self.calibration.metric(*m).weight * sub_scores[m])
                    .sum();
                (*category, score)
            })
            .collect();

        let index: f64 = Category::ALL
            .iter()
            .map(|c| self.calibration.weights.get(*c) * categories[c])
            .sum();

        (
            ScoreVector {
                sub_scores,
                categories,
                maintainability_index: clamp_index(index),
            },
            domain_errors,
        )
    }
}

/// NaN collapses to the lower bound so the index always stays in range.
fn clamp_index(index: f64) -> f64 {
    if index.is_nan() {
        MI_RANGE.0
    } else {
        index.clamp(MI_RANGE.0, MI_RANGE.1)
    }
}

fn clamp_to_domain(metric: SubMetric, value: f64, errors: &mut Vec<TfmiError>) -> f64 {
    let (low, high) = metric.domain();
    let clamped = if value.is_nan() {
        low
    } else {
        value.clamp(low, high)
    };
    if clamped != value || value.is_nan() {
        tracing::warn!(metric = %metric, value, clamped, "Metric out of domain, clamping");
        errors.push(crate::err!(MetricDomain {
            metric: metric.to_string(),
            value: value,
            clamped: clamped,
        }));
    }
    clamped
}
