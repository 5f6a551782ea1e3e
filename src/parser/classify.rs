//! Attribute value classification.
//!
//! A value is hard-coded when it contains only literals (strings without
//! interpolation, numbers, booleans, `null`, and lists/objects of those).
//! Anything else, including bare identifiers whose meaning is unknown, is an
//! expression. References are collected for the reference graph.

use super::lexer::{Segment, Token, TokenKind};
use crate::types::ExpressionFacts;
use std::collections::BTreeSet;

/// Root names that never denote a block reference.
pub const RESERVED_ROOTS: &[&str] = &[
    "var",
    "local",
    "module",
    "data",
    "each",
    "count",
    "self",
    "path",
    "terraform",
];

/// Result of classifying one attribute value.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Classification {
    pub is_hard_coded: bool,
    pub is_reference: bool,
    pub referenced_identifiers: BTreeSet<String>,
    pub facts: ExpressionFacts,
}

/// Classify the tokens of an attribute value.
#[must_use]
pub fn classify_expression(tokens: &[Token]) -> Classification {
    let mut walker = Walker::default();
    walker.walk(tokens);

    let is_reference = !walker.references.is_empty();
    Classification {
        is_hard_coded: !walker.dynamic && !is_reference,
        is_reference,
        referenced_identifiers: walker.references,
        facts: walker.facts,
    }
}

/// Resolve a traversal root and its dotted segments to a tracked address.
///
/// Returns `None` for reserved roots without a target (`each`, `count`, ...)
/// and for roots that cannot name a resource type.
#[must_use]
pub fn reference_address(root: &str, segments: &[&str]) -> Option<String> {
    match (root, segments) {
        ("var" | "local", [name, ..]) => Some(format!("{root}.{name}")),
        ("module", [name, output, ..]) => Some(format!("module.{name}.{output}")),
        ("module", [name]) => Some(format!("module.{name}")),
        ("data", [data_type, name, ..]) => Some(format!("data.{data_type}.{name}")),
        (root, _) if RESERVED_ROOTS.contains(&root) => None,
        (resource_type, [name, ..]) if resource_type.contains('_') => {
            Some(format!("{resource_type}.{name}"))
        }
        _ => None,
    }
}

#[derive(Default)]
struct Walker {
    references: BTreeSet<String>,
    facts: ExpressionFacts,
    dynamic: bool,
}

impl Walker {
    fn walk(&mut self, tokens: &[Token]) {
        let mut i = 0;
        while i < tokens.len() {
            let prev = i.checked_sub(1).map(|p| &tokens[p].kind);
            let next = tokens.get(i + 1).map(|t| &t.kind);

            match &tokens[i].kind {
                TokenKind::Ident(name) => {
                    if prev.is_some_and(|k| k.is_punct('.')) {
                        i += 1;
                        continue;
                    }
                    if next.is_some_and(|k| k.is_punct('(')) {
                        self.facts.function_calls.push(name.clone());
                        self.dynamic = true;
                        i += 1;
                        continue;
                    }
                    match name.as_str() {
                        "true" | "false" | "null" => {}
                        "for" if prev.is_some_and(|k| k.is_punct('[') || k.is_punct('{')) => {
                            self.facts.for_expressions += 1;
                            self.dynamic = true;
                        }
                        _ if next.is_some_and(|k| k.is_punct('.')) => {
                            i = self.traversal(tokens, i, name);
                            continue;
                        }
                        // Object keys
                        _ if next.is_some_and(|k| k.is_punct('=') || k.is_punct(':')) => {}
                        _ => self.dynamic = true,
                    }
                }
                TokenKind::Str(template) => {
                    self.facts.string_literals.push(template.literal_text());
                    for segment in &template.segments {
                        match segment {
                            Segment::Literal(_) => {}
                            Segment::Interpolation(inner) => {
                                self.dynamic = true;
                                self.walk(inner);
                            }
                            Segment::Directive(inner) => {
                                self.dynamic = true;
                                self.directive(inner);
                            }
                        }
                    }
                }
                TokenKind::Punct('?') => {
                    self.facts.conditionals += 1;
                    self.dynamic = true;
                }
                TokenKind::Op("-")
                    if matches!(next, Some(TokenKind::Number(_)))
                        && prev.map_or(true, |k| {
                            ['=', '[', '(', '{', ',', ':'].iter().any(|c| k.is_punct(*c))
                        }) => {}
                TokenKind::Op(_) => self.dynamic = true,
                TokenKind::Number(_)
                | TokenKind::Punct(_)
                | TokenKind::Newline
                | TokenKind::Invalid(_) => {}
            }
            i += 1;
        }
    }

    /// Consume `root.seg.seg...` starting at `start`; returns the index after it.
    fn traversal(&mut self, tokens: &[Token], start: usize, root: &str) -> usize {
        let mut segments = Vec::new();
        let mut j = start + 1;
        while j + 1 < tokens.len() && tokens[j].kind.is_punct('.') {
            match &tokens[j + 1].kind {
                TokenKind::Ident(segment) => segments.push(segment.as_str()),
                _ => break,
            }
            j += 2;
        }

        self.dynamic = true;
        if root == "var" && !segments.is_empty() {
            self.facts.variable_refs += 1;
        }
        if let Some(address) = reference_address(root, &segments) {
            self.references.insert(address);
        }
        j
    }

    fn directive(&mut self, tokens: &[Token]) {
        match tokens.first().map(|t| &t.kind) {
            Some(TokenKind::Ident(keyword)) if keyword == "if" => {
                self.facts.conditionals += 1;
                self.walk(&tokens[1..]);
            }
            Some(TokenKind::Ident(keyword)) if keyword == "for" => {
                self.facts.for_expressions += 1;
                self.walk(&tokens[1..]);
            }
            Some(TokenKind::Ident(keyword)) if keyword == "else" || keyword.starts_with("end") => {}
            _ => self.walk(tokens),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::parser::lexer::tokenize;

    fn classify(value: &str) -> Classification {
        let tokens: Vec<Token> = tokenize(value)
            .into_iter()
            .filter(|t| t.kind != TokenKind::Newline)
            .collect();
        classify_expression(&tokens)
    }

    #[test]
    fn test_literals_are_hard_coded() {
        for value in [
            r#""t3.micro""#,
            "42",
            "-1",
            "true",
            "null",
            r#"["a", "b"]"#,
            r#"{ Name = "web", Env = "prod" }"#,
            "<<EOF\nplain text\nEOF",
        ] {
            let c = classify(value);
            assert!(c.is_hard_coded, "{value} should be hard-coded");
            assert!(!c.is_reference);
        }
    }

    #[test]
    fn test_variable_reference() {
        let c = classify("var.instance_type");
        assert!(!c.is_hard_coded);
        assert!(c.is_reference);
        assert!(c.referenced_identifiers.contains("var.instance_type"));
        assert_eq!(c.facts.variable_refs, 1);
    }

    #[test]
    fn test_interpolated_references() {
        let c = classify(r#""${var.prefix}-${aws_vpc.main.id}-${module.net.subnet_id}""#);
        assert!(c.is_reference);
        let refs: Vec<_> = c.referenced_identifiers.iter().cloned().collect();
        assert_eq!(
            refs,
            vec!["aws_vpc.main", "module.net.subnet_id", "var.prefix"]
        );
    }

    #[test]
    fn test_data_and_local_references() {
        let c = classify("data.aws_ami.ubuntu.id");
        assert!(c.referenced_identifiers.contains("data.aws_ami.ubuntu"));
        let c = classify("local.common_tags");
        assert!(c.referenced_identifiers.contains("local.common_tags"));
    }

    #[test]
    fn test_reserved_roots_are_expressions_not_references() {
        for value in ["each.value", "count.index", "path.module", "self.id"] {
            let c = classify(value);
            assert!(!c.is_hard_coded, "{value}");
            assert!(!c.is_reference, "{value}");
        }
    }

    #[test]
    fn test_bare_identifier_is_not_hard_coded() {
        let c = classify("string");
        assert!(!c.is_hard_coded);
        assert!(!c.is_reference);
    }

    #[test]
    fn test_function_calls() {
        let c = classify(r#"list("a", lookup(var.m, "k"))"#);
        assert!(!c.is_hard_coded);
        assert_eq!(c.facts.function_calls, vec!["list", "lookup"]);
        assert_eq!(c.facts.variable_refs, 1);
    }

    #[test]
    fn test_conditionals_and_loops() {
        let c = classify(r#"var.enabled && var.public ? [for s in var.subnets : s.id] : []"#);
        assert_eq!(c.facts.conditionals, 1);
        assert_eq!(c.facts.for_expressions, 1);
        assert_eq!(c.facts.variable_refs, 3);
    }

    #[test]
    fn test_template_directives() {
        let c = classify(r#""%{ if var.on }yes%{ else }no%{ endif } %{ for x in var.xs }${x}%{ endfor }""#);
        assert_eq!(c.facts.conditionals, 1);
        assert_eq!(c.facts.for_expressions, 1);
        assert!(!c.is_hard_coded);
    }

    #[test]
    fn test_string_literals_collected() {
        let c = classify(r#"["s3:*", "arn:aws:s3:::bucket/${var.key}"]"#);
        assert_eq!(
            c.facts.string_literals,
            vec!["s3:*".to_string(), "arn:aws:s3:::bucket/".to_string()]
        );
    }

    #[test]
    fn test_reference_address() {
        assert_eq!(reference_address("aws_instance", &["web"]).as_deref(), Some("aws_instance.web"));
        assert_eq!(reference_address("module", &["vpc"]).as_deref(), Some("module.vpc"));
        assert_eq!(reference_address("each", &["value"]), None);
        assert_eq!(reference_address("foo", &["bar"]), None);
        assert_eq!(reference_address("data", &["aws_ami"]), None);
    }
}
