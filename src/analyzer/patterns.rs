//! Anti-pattern detection for attribute values.
//!
//! Two heuristics feed the Quality & Compliance category: calls to functions
//! listed as deprecated, and wildcard string values such as `"*"` or
//! `"s3:*"`.

use crate::config::Config;
use crate::types::{Block, BlockKind};
use regex::Regex;
use std::collections::BTreeSet;
use std::sync::LazyLock;

/// Patterns that lower the compliance score.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AntiPattern {
    /// Call to a deprecated function (e.g. `list(...)`)
    DeprecatedFunction,
    /// A value that is only a wildcard (e.g. `"*"`)
    Wildcard,
    /// A value with a wildcard suffix (e.g. `"s3:*"`)
    WildcardSuffix,
}

impl AntiPattern {
    #[must_use]
    pub fn is_wildcard(self) -> bool {
        matches!(self, Self::Wildcard | Self::WildcardSuffix)
    }
}

static WILDCARD_PATTERN: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^\s*\*+\s*$").expect("Invalid regex"));

static WILDCARD_SUFFIX_PATTERN: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^.*[^*\s]\*+\s*$").expect("Invalid regex"));

/// Occurrence counts for one block tree.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct PatternCounts {
    pub deprecated_functions: usize,
    pub wildcards: usize,
}

/// Checker for deprecated calls and wildcard values.
pub struct PatternChecker {
    deprecated_functions: BTreeSet<String>,
}

impl PatternChecker {
    /// Create a new pattern checker with the given configuration.
    #[must_use]
    pub fn new(config: &Config) -> Self {
        Self {
            deprecated_functions: config.analysis.deprecated_functions.iter().cloned().collect(),
        }
    }

    /// Classify a string literal.
    #[must_use]
    pub fn check_literal(&self, literal: &str) -> Option<AntiPattern> {
        if WILDCARD_PATTERN.is_match(literal) {
            Some(AntiPattern::Wildcard)
        } else if WILDCARD_SUFFIX_PATTERN.is_match(literal) {
            Some(AntiPattern::WildcardSuffix)
        } else {
            None
        }
    }

    /// Whether a called function is deprecated.
    #[must_use]
    pub fn is_deprecated(&self, function: &str) -> bool {
        self.deprecated_functions.contains(function)
    }

    /// Count anti-patterns across a block and its nested blocks.
    ///
    /// The `type` attribute of a `variable` block is a type constraint, where
    /// `list(string)` and `map(string)` are type constructors rather than
    /// calls, so it is not checked for deprecated functions.
    #[must_use]
    pub fn count(&self, block: &Block) -> PatternCounts {
        let mut counts = PatternCounts::default();
        block.for_each_attribute(&mut |owner, attribute| {
            let type_constraint = owner.kind == BlockKind::Variable && attribute.name == "type";
            if !type_constraint {
                counts.deprecated_functions += attribute
                    .expression
                    .function_calls
                    .iter()
                    .filter(|f| self.is_deprecated(f))
                    .count();
            }
            counts.wildcards += attribute
                .expression
                .string_literals
                .iter()
                .filter_map(|s| self.check_literal(s))
                .filter(|p| p.is_wildcard())
                .count();
        });
        counts
    }
}

impl Default for PatternChecker {
    fn default() -> Self {
        Self::new(&Config::default())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::parser::extract_blocks;
    use test_case::test_case;

    fn default_checker() -> PatternChecker {
        PatternChecker::default()
    }

    #[test_case("*", Some(AntiPattern::Wildcard) ; "bare star")]
    #[test_case(" ** ", Some(AntiPattern::Wildcard) ; "padded stars")]
    #[test_case("s3:*", Some(AntiPattern::WildcardSuffix) ; "action suffix")]
    #[test_case("arn:aws:s3:::bucket/*", Some(AntiPattern::WildcardSuffix) ; "arn suffix")]
    #[test_case("*.example.com", None ; "leading star")]
    #[test_case("t3.micro", None ; "plain value")]
    #[test_case("", None ; "empty")]
    fn test_check_literal(literal: &str, expected: Option<AntiPattern>) {
        assert_eq!(default_checker().check_literal(literal), expected);
    }

    #[test]
    fn test_deprecated_functions_from_config() {
        let mut config = Config::default();
        config.analysis.deprecated_functions = vec!["lookup".to_string()];
        let checker = PatternChecker::new(&config);
        assert!(checker.is_deprecated("lookup"));
        assert!(!checker.is_deprecated("list"));
    }

    #[test]
    fn test_count_in_block_tree() {
        let source = r#"
resource "aws_iam_policy" "p" {
  names = list("a", "b")
  tags  = map("k", "v")
  statement {
    actions   = ["s3:*", "ec2:Describe*"]
    resources = ["*"]
    zones     = list(var.zone)
  }
}
"#;
        let blocks = extract_blocks(source).blocks;
        let counts = default_checker().count(&blocks[0]);
        assert_eq!(
            counts,
            PatternCounts {
                deprecated_functions: 3,
                wildcards: 3,
            }
        );
    }

    #[test]
    fn test_variable_type_constraint_is_not_a_call() {
        let source = r#"
variable "subnets" {
  type    = list(string)
  default = list("a")
}
"#;
        let blocks = extract_blocks(source).blocks;
        assert_eq!(default_checker().count(&blocks[0]).deprecated_functions, 1);
    }
}
