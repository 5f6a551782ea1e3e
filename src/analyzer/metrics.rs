//! Raw metric computation.
//!
//! Each of the five categories has its own calculator function. All of them
//! read the block tree, the scope profile and the graph measurements, and
//! none of them keeps state between blocks.

use super::patterns::PatternChecker;
use crate::config::Config;
use crate::types::{Block, BlockKind, MetricVector};

/// Block-kind counts of one analysis scope (a file or a repository).
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ScopeProfile {
    pub resources: usize,
    pub modules: usize,
    pub outputs: usize,
    pub data_sources: usize,
}

impl ScopeProfile {
    /// Count the block kinds of a scope.
    #[must_use]
    pub fn from_blocks(blocks: &[&Block]) -> Self {
        let mut profile = Self::default();
        for block in blocks {
            match block.kind {
                BlockKind::Resource => profile.resources += 1,
                BlockKind::Module => profile.modules += 1,
                BlockKind::Output => profile.outputs += 1,
                BlockKind::Data => profile.data_sources += 1,
                BlockKind::Variable | BlockKind::Local | BlockKind::Other => {}
            }
        }
        profile
    }

    /// `modules / (resources + modules)`
    #[must_use]
    pub fn module_ratio(&self) -> Option<f64> {
        ratio(self.modules, self.resources + self.modules)
    }

    /// `outputs / resources`
    #[must_use]
    pub fn output_ratio(&self) -> Option<f64> {
        ratio(self.outputs, self.resources)
    }

    /// `data / (resources + data)`
    #[must_use]
    pub fn data_source_ratio(&self) -> Option<f64> {
        ratio(self.data_sources, self.resources + self.data_sources)
    }
}

fn ratio(numerator: usize, denominator: usize) -> Option<f64> {
    (denominator > 0).then(|| numerator as f64 / denominator as f64)
}

/// Looping and branching constructs of a block tree.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Constructs {
    /// `count`/`for_each` attributes, `dynamic` blocks, `for` expressions and directives
    pub loops: usize,
    /// Ternaries and `%{if}` directives
    pub conditionals: usize,
}

impl Constructs {
    /// Count the constructs of `block` and everything nested in it.
    #[must_use]
    pub fn of(block: &Block) -> Self {
        let mut counts = Self::default();
        counts.visit(block);
        counts
    }

    fn visit(&mut self, block: &Block) {
        let in_dynamic = is_dynamic(block);
        for attribute in &block.attributes {
            let meta = match attribute.name.as_str() {
                "count" => true,
                // belongs to the enclosing dynamic block
                "for_each" => !in_dynamic,
                _ => false,
            };
            if meta {
                self.loops += 1;
            }
            self.loops += attribute.expression.for_expressions;
            self.conditionals += attribute.expression.conditionals;
        }
        for nested in &block.nested_blocks {
            if is_dynamic(nested) {
                self.loops += 1;
            }
            self.visit(nested);
        }
    }
}

fn is_dynamic(block: &Block) -> bool {
    block.kind == BlockKind::Other && block.type_label == "dynamic"
}

/// Computes the raw [`MetricVector`] of a block.
pub struct MetricCalculator {
    patterns: PatternChecker,
}

impl MetricCalculator {
    #[must_use]
    pub fn new(config: &Config) -> Self {
        Self {
            patterns: PatternChecker::new(config),
        }
    }

    /// Compute every raw sub-metric of `block`.
    ///
    /// `coupling` and `depth` come from the reference graph of the scope the
    /// block belongs to.
    #[must_use]
    pub fn compute(
        &self,
        block: &Block,
        scope: &ScopeProfile,
        coupling: usize,
        depth: usize,
    ) -> MetricVector {
        let constructs = Constructs::of(block);
        let (module_ratio, block_loc, variable_ratio) = module_quality(block, scope);
        let (hard_coded_ratio, attribute_count, nesting_depth) = configuration_fidelity(block);
        let (cyclomatic_complexity, coupling, graph_depth) =
            graph_complexity(&constructs, coupling, depth);
        let (deprecated_functions, wildcard_usage, dynamic_constructs) =
            self.quality_compliance(block, &constructs);
        let (output_ratio, data_source_ratio) = integration_readiness(scope);

        MetricVector {
            module_ratio,
            block_loc,
            variable_ratio,
            hard_coded_ratio,
            attribute_count,
            nesting_depth,
            cyclomatic_complexity,
            coupling,
            graph_depth,
            deprecated_functions,
            wildcard_usage,
            dynamic_constructs,
            output_ratio,
            data_source_ratio,
        }
    }

    fn quality_compliance(&self, block: &Block, constructs: &Constructs) -> (f64, f64, f64) {
        let counts = self.patterns.count(block);
        (
            counts.deprecated_functions as f64,
            counts.wildcards as f64,
            (constructs.loops + constructs.conditionals) as f64,
        )
    }
}

impl Default for MetricCalculator {
    fn default() -> Self {
        Self::new(&Config::default())
    }
}

fn module_quality(block: &Block, scope: &ScopeProfile) -> (Option<f64>, f64, Option<f64>) {
    let variable_ratio = if block.kind == BlockKind::Variable {
        None
    } else {
        let mut refs = 0;
        block.for_each_attribute(&mut |_, a| refs += a.expression.variable_refs);
        ratio(refs, block.attribute_count())
    };
    (scope.module_ratio(), block.line_count as f64, variable_ratio)
}

fn configuration_fidelity(block: &Block) -> (Option<f64>, f64, f64) {
    let mut hard_coded = 0;
    block.for_each_attribute(&mut |_, a| {
        if a.is_hard_coded {
            hard_coded += 1;
        }
    });
    let attributes = block.attribute_count();
    (
        ratio(hard_coded, attributes),
        attributes as f64,
        block.max_nesting_depth as f64,
    )
}

fn graph_complexity(constructs: &Constructs, coupling: usize, depth: usize) -> (f64, f64, f64) {
    let cyclomatic = 1 + constructs.loops + constructs.conditionals;
    (cyclomatic as f64, coupling as f64, depth as f64)
}

fn integration_readiness(scope: &ScopeProfile) -> (Option<f64>, Option<f64>) {
    (scope.output_ratio(), scope.data_source_ratio())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::parser::extract_blocks;
    use pretty_assertions::assert_eq;

    fn blocks(source: &str) -> Vec<Block> {
        let extraction = extract_blocks(source);
        assert!(extraction.issues.is_empty(), "{:?}", extraction.issues);
        extraction.blocks
    }

    #[test]
    fn test_scope_profile_ratios() {
        let blocks = blocks(
            r#"
resource "aws_vpc" "a" {}
resource "aws_vpc" "b" {}
resource "aws_vpc" "c" {}
module "m" {
  source = "./m"
}
data "aws_ami" "u" {}
output "id" {
  value = aws_vpc.a.id
}
variable "v" {}
"#,
        );
        let refs: Vec<_> = blocks.iter().collect();
        let profile = ScopeProfile::from_blocks(&refs);
        assert_eq!(profile.resources, 3);
        assert_eq!(profile.module_ratio(), Some(0.25));
        assert_eq!(profile.output_ratio(), Some(1.0 / 3.0));
        assert_eq!(profile.data_source_ratio(), Some(0.25));
    }

    #[test]
    fn test_empty_scope_ratios_are_undefined() {
        let profile = ScopeProfile::default();
        assert_eq!(profile.module_ratio(), None);
        assert_eq!(profile.output_ratio(), None);
        assert_eq!(profile.data_source_ratio(), None);
    }

    #[test]
    fn test_parameterized_resource() {
        let blocks = blocks(
            r#"
resource "aws_instance" "web" {
  ami           = var.ami
  instance_type = var.instance_type
  subnet_id     = var.subnet_id
  key_name      = "deployer"
}
"#,
        );
        let scope = ScopeProfile {
            resources: 1,
            ..ScopeProfile::default()
        };
        let metrics = MetricCalculator::default().compute(&blocks[0], &scope, 0, 0);
        assert_eq!(metrics.block_loc, 6.0);
        assert_eq!(metrics.attribute_count, 4.0);
        assert_eq!(metrics.variable_ratio, Some(0.75));
        assert_eq!(metrics.hard_coded_ratio, Some(0.25));
        assert_eq!(metrics.module_ratio, Some(0.0));
        assert_eq!(metrics.output_ratio, Some(0.0));
        assert_eq!(metrics.data_source_ratio, Some(0.0));
        assert_eq!(metrics.cyclomatic_complexity, 1.0);
        assert_eq!(metrics.dynamic_constructs, 0.0);
        assert_eq!(metrics.nesting_depth, 0.0);
    }

    #[test]
    fn test_constructs_count_loops_and_conditionals() {
        let blocks = blocks(
            r#"
resource "aws_security_group" "sg" {
  count = var.enabled ? 1 : 0
  name  = var.a != "" && var.b != "" ? var.a : var.b
  dynamic "ingress" {
    for_each = var.ports
    content {
      from_port = ingress.value
      cidrs     = [for c in var.cidrs : c if c != ""]
    }
  }
}
"#,
        );
        let constructs = Constructs::of(&blocks[0]);
        assert_eq!(
            constructs,
            Constructs {
                loops: 3,
                conditionals: 2,
            }
        );
        let metrics =
            MetricCalculator::default().compute(&blocks[0], &ScopeProfile::default(), 0, 0);
        // boolean operators do not branch
        assert_eq!(metrics.cyclomatic_complexity, 6.0);
        assert_eq!(metrics.dynamic_constructs, 5.0);
        assert_eq!(metrics.nesting_depth, 2.0);
    }

    #[test]
    fn test_variable_block_has_no_variable_ratio() {
        let blocks = blocks(
            r#"
variable "name" {
  type    = string
  default = "x"
}
"#,
        );
        let metrics =
            MetricCalculator::default().compute(&blocks[0], &ScopeProfile::default(), 0, 0);
        assert_eq!(metrics.variable_ratio, None);
        assert_eq!(metrics.hard_coded_ratio, Some(0.5));
    }

    #[test]
    fn test_attributeless_block_has_undefined_ratios() {
        let blocks = blocks("resource \"null_resource\" \"n\" {}\n");
        let metrics =
            MetricCalculator::default().compute(&blocks[0], &ScopeProfile::default(), 2, 1);
        assert_eq!(metrics.variable_ratio, None);
        assert_eq!(metrics.hard_coded_ratio, None);
        assert_eq!(metrics.attribute_count, 0.0);
        assert_eq!(metrics.coupling, 2.0);
        assert_eq!(metrics.graph_depth, 1.0);
        assert_eq!(metrics.block_loc, 1.0);
    }

    #[test]
    fn test_compliance_counts() {
        let blocks = blocks(
            r#"
resource "aws_iam_policy" "p" {
  actions = ["s3:*"]
  names   = list("a")
}
"#,
        );
        let metrics =
            MetricCalculator::default().compute(&blocks[0], &ScopeProfile::default(), 0, 0);
        assert_eq!(metrics.deprecated_functions, 1.0);
        assert_eq!(metrics.wildcard_usage, 1.0);
    }
}
