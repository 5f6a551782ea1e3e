//! Scoring curves.
//!
//! A [`PlateauCurve`] awards its maximum inside an optimum band and falls off
//! on either side: linearly down to an edge value over a fixed width, then
//! exponentially toward zero. A [`PenaltyCurve`] subtracts a fixed amount per
//! occurrence. Both are continuous and bounded by `[0, max]`.

use serde::{Deserialize, Serialize};

/// Fall-off on one side of the optimum band.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Falloff {
    /// Distance from the band over which the score falls linearly
    pub width: f64,
    /// Score reached at `width` distance
    pub edge: f64,
    /// Exponential decay rate beyond `width`
    pub decay: f64,
}

impl Falloff {
    #[must_use]
    pub const fn new(width: f64, edge: f64, decay: f64) -> Self {
        Self { width, edge, decay }
    }

    fn score(&self, max: f64, distance: f64) -> f64 {
        if distance <= self.width {
            max - (max - self.edge) * distance / self.width
        } else {
            self.edge * (-self.decay * (distance - self.width)).exp()
        }
    }
}

/// Maximum score inside `[low, high]`, falling off outside.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct PlateauCurve {
    pub max: f64,
    pub low: f64,
    pub high: f64,
    /// Fall-off below `low`; `None` keeps the maximum
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub below: Option<Falloff>,
    /// Fall-off above `high`; `None` keeps the maximum
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub above: Option<Falloff>,
    /// Score for an undefined value; `None` means `max`
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub neutral: Option<f64>,
}

impl PlateauCurve {
    /// Score a raw value.
    #[must_use]
    pub fn score(&self, value: Option<f64>) -> f64 {
        let Some(x) = value else {
            return self.neutral.unwrap_or(self.max);
        };
        let raw = if x < self.low {
            self.below
                .map_or(self.max, |f| f.score(self.max, self.low - x))
        } else if x > self.high {
            self.above
                .map_or(self.max, |f| f.score(self.max, x - self.high))
        } else {
            self.max
        };
        raw.clamp(0.0, self.max)
    }
}

/// `max - per_occurrence * n`, floored at zero.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct PenaltyCurve {
    pub max: f64,
    pub per_occurrence: f64,
}

impl PenaltyCurve {
    #[must_use]
    pub fn score(&self, value: Option<f64>) -> f64 {
        let occurrences = value.unwrap_or(0.0);
        (self.max - self.per_occurrence * occurrences).clamp(0.0, self.max)
    }
}

/// A scoring curve, tagged by `shape` in configuration files.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(tag = "shape", rename_all = "snake_case")]
pub enum ScoreCurve {
    Plateau(PlateauCurve),
    Penalty(PenaltyCurve),
}

impl ScoreCurve {
    /// Score a raw value; the result lies in `[0, max]`.
    #[must_use]
    pub fn score(&self, value: Option<f64>) -> f64 {
        match self {
            Self::Plateau(curve) => curve.score(value),
            Self::Penalty(curve) => curve.score(value),
        }
    }

    /// Highest attainable score.
    #[must_use]
    pub fn max(&self) -> f64 {
        match self {
            Self::Plateau(curve) => curve.max,
            Self::Penalty(curve) => curve.max,
        }
    }

    /// Check the curve parameters; returns a description of the first problem.
    pub fn check(&self) -> std::result::Result<(), String> {
        let finite_non_negative = |name: &str, v: f64| {
            if v.is_finite() && v >= 0.0 {
                Ok(())
            } else {
                Err(format!("{name} must be a finite non-negative number (got {v})"))
            }
        };
        match self {
            Self::Penalty(curve) => {
                finite_non_negative("max", curve.max)?;
                finite_non_negative("per_occurrence", curve.per_occurrence)
            }
            Self::Plateau(curve) => {
                finite_non_negative("max", curve.max)?;
                if !(curve.low.is_finite() && curve.high.is_finite()) || curve.low > curve.high {
                    return Err(format!(
                        "optimum band [{}, {}] is not a valid range",
                        curve.low, curve.high
                    ));
                }
                for falloff in [curve.below, curve.above].into_iter().flatten() {
                    finite_non_negative("width", falloff.width)?;
                    finite_non_negative("decay", falloff.decay)?;
                    finite_non_negative("edge", falloff.edge)?;
                    if falloff.edge > curve.max {
                        return Err(format!(
                            "edge {} exceeds curve max {}",
                            falloff.edge, curve.max
                        ));
                    }
                }
                if let Some(neutral) = curve.neutral {
                    finite_non_negative("neutral", neutral)?;
                    if neutral > curve.max {
                        return Err(format!("neutral {neutral} exceeds curve max {}", curve.max));
                    }
                }
                Ok(())
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use test_case::test_case;

    fn loc_curve() -> PlateauCurve {
        PlateauCurve {
            max: 95.0,
            low: 25.0,
            high: 25.0,
            below: Some(Falloff::new(15.0, 70.0, 0.035)),
            above: Some(Falloff::new(35.0, 80.0, 0.015)),
            neutral: None,
        }
    }

    #[test_case(25.0, 95.0 ; "peak")]
    #[test_case(10.0, 70.0 ; "lower edge")]
    #[test_case(60.0, 80.0 ; "upper edge")]
    #[test_case(40.0, 88.571_428_571_428_57 ; "linear segment")]
    fn test_plateau_breakpoints(x: f64, expected: f64) {
        assert!((loc_curve().score(Some(x)) - expected).abs() < 1e-9);
    }

    #[test]
    fn test_plateau_decays_toward_zero() {
        let curve = loc_curve();
        let far = curve.score(Some(2_000.0));
        assert!(far >= 0.0);
        assert!(far < 1.0);
        assert!(curve.score(Some(1.0)) < 70.0);
    }

    #[test]
    fn test_plateau_is_continuous_at_edges() {
        let curve = loc_curve();
        let eps = 1e-7;
        for edge in [10.0, 60.0] {
            let left = curve.score(Some(edge - eps));
            let right = curve.score(Some(edge + eps));
            assert!((left - right).abs() < 1e-4, "discontinuity at {edge}");
        }
    }

    #[test]
    fn test_plateau_non_increasing_above_optimum() {
        let curve = loc_curve();
        let mut previous = curve.score(Some(25.0));
        for step in 1..500 {
            let score = curve.score(Some(25.0 + f64::from(step)));
            assert!(score <= previous + 1e-12);
            previous = score;
        }
    }

    #[test]
    fn test_neutral_score_for_undefined() {
        let curve = PlateauCurve {
            max: 90.0,
            low: 0.2,
            high: 0.6,
            below: Some(Falloff::new(0.2, 0.0, 0.0)),
            above: None,
            neutral: Some(60.0),
        };
        assert_eq!(curve.score(None), 60.0);
        assert_eq!(curve.score(Some(0.0)), 0.0);
        assert!((curve.score(Some(0.1)) - 45.0).abs() < 1e-9);
        assert_eq!(curve.score(Some(1.0)), 90.0);
    }

    #[test_case(0.0, 90.0)]
    #[test_case(1.0, 55.0)]
    #[test_case(2.0, 20.0)]
    #[test_case(3.0, 0.0)]
    #[test_case(10.0, 0.0)]
    fn test_penalty(n: f64, expected: f64) {
        let curve = PenaltyCurve {
            max: 90.0,
            per_occurrence: 35.0,
        };
        assert!((curve.score(Some(n)) - expected).abs() < 1e-9);
    }

    #[test]
    fn test_check_rejects_bad_parameters() {
        let mut curve = loc_curve();
        curve.low = 30.0;
        curve.high = 20.0;
        assert!(ScoreCurve::Plateau(curve).check().is_err());

        let mut curve = loc_curve();
        curve.above = Some(Falloff::new(10.0, 120.0, 0.1));
        assert!(ScoreCurve::Plateau(curve).check().is_err());

        let penalty = PenaltyCurve {
            max: 90.0,
            per_occurrence: -1.0,
        };
        assert!(ScoreCurve::Penalty(penalty).check().is_err());
        assert!(ScoreCurve::Plateau(loc_curve()).check().is_ok());
    }

    #[test]
    fn test_curve_yaml_shape_tag() {
        let yaml = "shape: penalty\nmax: 90\nper_occurrence: 30\n";
        let curve: ScoreCurve = serde_yaml::from_str(yaml).unwrap();
        assert_eq!(curve.score(Some(1.0)), 60.0);
    }
}
