//! Metric calculation module.
//!
//! This module turns extracted blocks into raw [`MetricVector`]s, one per
//! block. The calculators are grouped by scoring category:
//!
//! 1. **Module Quality**: module usage ratio of the scope, block length,
//!    variable references per attribute.
//!
//! 2. **Configuration Fidelity**: hard-coded attribute ratio, attribute
//!    count, nesting depth.
//!
//! 3. **Graph Complexity**: cyclomatic-complexity proxy, coupling and
//!    reference chain depth.
//!
//! 4. **Quality & Compliance**: deprecated function calls, wildcard values,
//!    dynamic constructs.
//!
//! 5. **Integration Readiness**: output and data source ratios of the scope.
//!
//! # Example
//!
//! ```rust
//! use tfmi::analyzer::{MetricCalculator, ScopeProfile};
//! use tfmi::parser::extract_blocks;
//!
//! let blocks = extract_blocks("resource \"aws_vpc\" \"main\" {\n  cidr_block = var.cidr\n}\n").blocks;
//! let refs: Vec<_> = blocks.iter().collect();
//! let scope = ScopeProfile::from_blocks(&refs);
//!
//! let metrics = MetricCalculator::default().compute(&blocks[0], &scope, 0, 0);
//! assert_eq!(metrics.variable_ratio, Some(1.0));
//! ```
//!
//! [`MetricVector`]: crate::types::MetricVector

mod metrics;
mod patterns;

pub use metrics::{Constructs, MetricCalculator, ScopeProfile};
pub use patterns::{AntiPattern, PatternChecker, PatternCounts};
