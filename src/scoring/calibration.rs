//! Calibration: category weights, sub-metric weights and scoring curves.
//!
//! [`Calibration::default`] is the reference calibration. Any field can be
//! overridden from the `scoring` section of the configuration file; the
//! result is checked by [`Calibration::validate`] before scoring starts.

use super::curve::{Falloff, PenaltyCurve, PlateauCurve, ScoreCurve};
use crate::error::Result;
use crate::types::{Category, SubMetric};
use serde::{Deserialize, Serialize};

/// Tolerance for weight sums.
pub const WEIGHT_TOLERANCE: f64 = 1e-9;

/// Weight of each category in the final index.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CategoryWeights {
    pub module_quality: f64,
    pub configuration_fidelity: f64,
    pub graph_complexity: f64,
    pub quality_compliance: f64,
    pub integration_readiness: f64,
}

impl Default for CategoryWeights {
    fn default() -> Self {
        Self {
            module_quality: 0.25,
            configuration_fidelity: 0.25,
            graph_complexity: 0.20,
            quality_compliance: 0.20,
            integration_readiness: 0.10,
        }
    }
}

impl CategoryWeights {
    #[must_use]
    pub fn get(&self, category: Category) -> f64 {
        match category {
            Category::ModuleQuality => self.module_quality,
            Category::ConfigurationFidelity => self.configuration_fidelity,
            Category::GraphComplexity => self.graph_complexity,
            Category::QualityCompliance => self.quality_compliance,
            Category::IntegrationReadiness => self.integration_readiness,
        }
    }
}

/// Weight and curve of one sub-metric.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct MetricCalibration {
    /// Weight within the category
    pub weight: f64,
    pub curve: ScoreCurve,
}

const fn plateau(
    weight: f64,
    max: f64,
    optimum: (f64, f64),
    below: Option<Falloff>,
    above: Option<Falloff>,
    neutral: Option<f64>,
) -> MetricCalibration {
    MetricCalibration {
        weight,
        curve: ScoreCurve::Plateau(PlateauCurve {
            max,
            low: optimum.0,
            high: optimum.1,
            below,
            above,
            neutral,
        }),
    }
}

const fn penalty(weight: f64, max: f64, per_occurrence: f64) -> MetricCalibration {
    MetricCalibration {
        weight,
        curve: ScoreCurve::Penalty(PenaltyCurve {
            max,
            per_occurrence,
        }),
    }
}

/// Full calibration table.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Calibration {
    pub weights: CategoryWeights,
    pub module_ratio: MetricCalibration,
    pub block_loc: MetricCalibration,
    pub variable_ratio: MetricCalibration,
    pub hard_coded_ratio: MetricCalibration,
    pub attribute_count: MetricCalibration,
    pub nesting_depth: MetricCalibration,
    pub cyclomatic_complexity: MetricCalibration,
    pub coupling: MetricCalibration,
    pub graph_depth: MetricCalibration,
    pub deprecated_functions: MetricCalibration,
    pub wildcard_usage: MetricCalibration,
    pub dynamic_constructs: MetricCalibration,
    pub output_ratio: MetricCalibration,
    pub data_source_ratio: MetricCalibration,
}

impl Default for Calibration {
    fn default() -> Self {
        Self {
            weights: CategoryWeights::default(),
            module_ratio: plateau(
                0.40,
                90.0,
                (0.2, 0.6),
                Some(Falloff::new(0.2, 0.0, 0.0)),
                Some(Falloff::new(0.4, 30.0, 1.0)),
                Some(60.0),
            ),
            block_loc: plateau(
                0.35,
                95.0,
                (25.0, 25.0),
                Some(Falloff::new(15.0, 70.0, 0.035)),
                Some(Falloff::new(35.0, 80.0, 0.015)),
                None,
            ),
            variable_ratio: plateau(
                0.25,
                90.0,
                (0.4, 1.5),
                Some(Falloff::new(0.4, 0.0, 0.0)),
                Some(Falloff::new(2.5, 40.0, 0.5)),
                Some(70.0),
            ),
            hard_coded_ratio: plateau(
                0.40,
                90.0,
                (0.0, 0.25),
                None,
                Some(Falloff::new(0.25, 60.0, 3.5)),
                Some(90.0),
            ),
            attribute_count: plateau(
                0.35,
                90.0,
                (0.0, 12.0),
                None,
                Some(Falloff::new(13.0, 51.0, 0.06)),
                None,
            ),
            nesting_depth: plateau(
                0.25,
                90.0,
                (0.0, 1.0),
                None,
                Some(Falloff::new(2.0, 45.0, 0.4)),
                None,
            ),
            cyclomatic_complexity: plateau(
                0.35,
                90.0,
                (0.0, 4.0),
                None,
                Some(Falloff::new(4.0, 58.0, 0.08)),
                None,
            ),
            coupling: plateau(
                0.35,
                90.0,
                (0.0, 3.0),
                None,
                Some(Falloff::new(3.0, 60.0, 0.15)),
                None,
            ),
            graph_depth: plateau(
                0.30,
                90.0,
                (0.0, 1.0),
                None,
                Some(Falloff::new(2.0, 60.0, 0.25)),
                None,
            ),
            deprecated_functions: penalty(0.40, 90.0, 35.0),
            wildcard_usage: penalty(0.30, 90.0, 30.0),
            dynamic_constructs: plateau(
                0.30,
                90.0,
                (0.0, 0.0),
                None,
                Some(Falloff::new(4.0, 50.0, 0.25)),
                None,
            ),
            output_ratio: plateau(
                0.50,
                90.0,
                (0.25, 0.75),
                Some(Falloff::new(0.25, 0.0, 0.0)),
                Some(Falloff::new(0.25, 75.0, 0.8)),
                Some(70.0),
            ),
            data_source_ratio: plateau(
                0.50,
                90.0,
                (0.0, 0.25),
                None,
                Some(Falloff::new(0.15, 75.0, 3.0)),
                Some(90.0),
            ),
        }
    }
}

impl Calibration {
    /// Calibration entry of one sub-metric.
    #[must_use]
    pub fn metric(&self, metric: SubMetric) -> &MetricCalibration {
        match metric {
            SubMetric::ModuleRatio => &self.module_ratio,
            SubMetric::BlockLoc => &self.block_loc,
            SubMetric::VariableRatio => &self.variable_ratio,
            SubMetric::HardCodedRatio => &self.hard_coded_ratio,
            SubMetric::AttributeCount => &self.attribute_count,
            SubMetric::NestingDepth => &self.nesting_depth,
            SubMetric::CyclomaticComplexity => &self.cyclomatic_complexity,
            SubMetric::Coupling => &self.coupling,
            SubMetric::GraphDepth => &self.graph_depth,
            SubMetric::DeprecatedFunctions => &self.deprecated_functions,
            SubMetric::WildcardUsage => &self.wildcard_usage,
            SubMetric::DynamicConstructs => &self.dynamic_constructs,
            SubMetric::OutputRatio => &self.output_ratio,
            SubMetric::DataSourceRatio => &self.data_source_ratio,
        }
    }

    /// Highest attainable score of a category.
    #[must_use]
    pub fn category_max(&self, category: Category) -> f64 {
        category
            .metrics()
            .iter()
            .map(|m| {
                let entry = self.metric(*m);
                entry.weight * entry.curve.max()
            })
            .sum()
    }

    /// Check weights and curves.
    ///
    /// # Errors
    ///
    /// Returns `ConfigValue` when a weight set does not sum to 1, a weight is
    /// negative or not finite, or a curve parameter is out of range.
    pub fn validate(&self) -> Result<()> {
        for category in Category::ALL {
            let weight = self.weights.get(category);
            if !weight.is_finite() || weight < 0.0 {
                return Err(crate::err!(ConfigValue {
                    key: format!("scoring.weights.{category}"),
                    message: "weight must be a finite non-negative number".to_string(),
                }));
            }
        }

        let top: f64 = Category::ALL.iter().map(|c| self.weights.get(*c)).sum();
        if (top - 1.0).abs() > WEIGHT_TOLERANCE {
            return Err(crate::err!(ConfigValue {
                key: "scoring.weights".to_string(),
                message: format!("category weights sum to {top}, expected 1"),
            }));
        }

        for category in Category::ALL {
            let mut sum = 0.0;
            for metric in category.metrics() {
                let entry = self.metric(*metric);
                if !entry.weight.is_finite() || entry.weight < 0.0 {
                    return Err(crate::err!(ConfigValue {
                        key: format!("scoring.{metric}.weight"),
                        message: "weight must be a finite non-negative number".to_string(),
                    }));
                }
                entry.curve.check().map_err(|message| {
                    crate::err!(ConfigValue {
                        key: format!("scoring.{metric}.curve"),
                        message: message,
                    })
                })?;
                sum += entry.weight;
            }
            if (sum - 1.0).abs() > WEIGHT_TOLERANCE {
                return Err(crate::err!(ConfigValue {
                    key: format!("scoring.{category}"),
                    message: format!("sub-metric weights sum to {sum}, expected 1"),
                }));
            }
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::TfmiError;
    use test_case::test_case;

    #[test]
    fn test_default_calibration_is_valid() {
        Calibration::default().validate().unwrap();
    }

    #[test]
    fn test_category_max() {
        let calibration = Calibration::default();
        assert!((calibration.category_max(Category::ModuleQuality) - 91.75).abs() < 1e-9);
        assert!((calibration.category_max(Category::GraphComplexity) - 90.0).abs() < 1e-9);
    }

    #[test]
    fn test_top_level_weights_must_sum_to_one() {
        let mut calibration = Calibration::default();
        calibration.weights.integration_readiness = 0.2;
        let err = calibration.validate().unwrap_err();
        assert!(matches!(err, TfmiError::ConfigValue { ref key, .. } if key == "scoring.weights"));
    }

    #[test]
    fn test_sub_metric_weights_must_sum_to_one() {
        let mut calibration = Calibration::default();
        calibration.coupling.weight = 0.5;
        let err = calibration.validate().unwrap_err();
        assert!(err.to_string().contains("graph_complexity"));
    }

    #[test]
    fn test_invalid_curve_is_rejected() {
        let mut calibration = Calibration::default();
        calibration.wildcard_usage.curve = ScoreCurve::Penalty(PenaltyCurve {
            max: f64::NAN,
            per_occurrence: 30.0,
        });
        assert!(calibration.validate().is_err());
    }

    #[test_case(SubMetric::BlockLoc, 10.0, 70.0 ; "loc lower")]
    #[test_case(SubMetric::BlockLoc, 60.0, 80.0 ; "loc upper")]
    #[test_case(SubMetric::AttributeCount, 12.0, 90.0 ; "attributes at optimum edge")]
    #[test_case(SubMetric::AttributeCount, 25.0, 51.0 ; "attributes")]
    #[test_case(SubMetric::NestingDepth, 3.0, 45.0 ; "nesting")]
    #[test_case(SubMetric::CyclomaticComplexity, 8.0, 58.0 ; "complexity")]
    #[test_case(SubMetric::Coupling, 6.0, 60.0 ; "coupling")]
    #[test_case(SubMetric::GraphDepth, 3.0, 60.0 ; "depth")]
    #[test_case(SubMetric::DynamicConstructs, 4.0, 50.0 ; "dynamic")]
    #[test_case(SubMetric::HardCodedRatio, 0.5, 60.0 ; "hard coded")]
    #[test_case(SubMetric::DataSourceRatio, 0.4, 75.0 ; "data sources")]
    #[test_case(SubMetric::OutputRatio, 1.0, 75.0 ; "outputs")]
    #[test_case(SubMetric::ModuleRatio, 1.0, 30.0 ; "modules")]
    fn test_reference_breakpoints(metric: SubMetric, raw: f64, expected: f64) {
        let calibration = Calibration::default();
        let score = calibration.metric(metric).curve.score(Some(raw));
        assert!((score - expected).abs() < 1e-9, "{metric}: {score} != {expected}");
    }

    #[test_case(SubMetric::AttributeCount, 12.0, 13.0 ; "attributes past optimum")]
    #[test_case(SubMetric::AttributeCount, 25.0, 26.0 ; "attributes past edge")]
    #[test_case(SubMetric::HardCodedRatio, 0.25, 0.26 ; "hard coded past plateau")]
    fn test_score_drops_past_breakpoint(metric: SubMetric, at: f64, past: f64) {
        let calibration = Calibration::default();
        let curve = &calibration.metric(metric).curve;
        let (at, past) = (curve.score(Some(at)), curve.score(Some(past)));
        assert!(past < at, "{metric}: {past} !< {at}");
    }

    #[test]
    fn test_hard_coded_plateau_is_maximum() {
        let curve = &Calibration::default().hard_coded_ratio.curve;
        assert_eq!(curve.score(Some(0.25)), 90.0);
        assert!(curve.score(Some(0.26)) < 90.0);
    }

    #[test]
    fn test_nan_category_weight_is_rejected() {
        let yaml = "weights:\n  module_quality: .nan\n";
        let calibration: Calibration = serde_yaml::from_str(yaml).unwrap();
        let err = calibration.validate().unwrap_err();
        assert!(
            matches!(err, TfmiError::ConfigValue { ref key, .. } if key == "scoring.weights.module_quality")
        );
    }

    #[test]
    fn test_infinite_category_weight_is_rejected() {
        let mut calibration = Calibration::default();
        calibration.weights.graph_complexity = f64::INFINITY;
        assert!(calibration.validate().is_err());
    }

    #[test]
    fn test_partial_yaml_override() {
        let yaml = r#"
weights:
  module_quality: 0.30
  integration_readiness: 0.05
coupling:
  weight: 0.35
  curve:
    shape: plateau
    max: 90
    low: 0
    high: 5
    above: { width: 5, edge: 40, decay: 0.2 }
"#;
        let calibration: Calibration = serde_yaml::from_str(yaml).unwrap();
        calibration.validate().unwrap();
        assert!((calibration.weights.module_quality - 0.30).abs() < 1e-12);
        assert!((calibration.weights.configuration_fidelity - 0.25).abs() < 1e-12);
        assert_eq!(calibration.coupling.curve.score(Some(5.0)), 90.0);
        assert_eq!(calibration.block_loc, Calibration::default().block_loc);
    }
}
