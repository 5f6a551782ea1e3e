//! Block extraction.
//!
//! Builds [`Block`] trees from the token stream produced by the lexer. The
//! extractor is tolerant: a top-level declaration with unbalanced braces or
//! unrecognized syntax is dropped and reported as a [`SyntaxIssue`], and
//! extraction resumes at the next declaration.

use super::classify::classify_expression;
use super::lexer::{tokenize, Token, TokenKind};
use crate::types::{Attribute, Block, BlockKind};

/// Keywords that open a top-level declaration.
pub const TOP_LEVEL_KEYWORDS: &[&str] = &[
    "resource",
    "data",
    "module",
    "variable",
    "output",
    "locals",
    "provider",
    "terraform",
    "moved",
    "import",
    "removed",
    "check",
];

/// Nested blocks deeper than this are treated as malformed.
const MAX_BLOCK_NESTING: usize = 64;

/// A dropped declaration or stray token.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SyntaxIssue {
    /// 1-based line where the problem was detected
    pub line: usize,
    pub message: String,
}

/// Blocks and issues from one source file.
#[derive(Debug, Clone, Default)]
pub struct Extraction {
    pub blocks: Vec<Block>,
    pub issues: Vec<SyntaxIssue>,
}

/// Extract every top-level block from `source`.
#[must_use]
pub fn extract_blocks(source: &str) -> Extraction {
    let tokens = tokenize(source);
    let mut extractor = Extractor {
        src: source,
        tokens: &tokens,
        pos: 0,
    };
    extractor.run()
}

struct Body {
    attributes: Vec<Attribute>,
    nested_blocks: Vec<Block>,
    close: usize,
    problem: Option<SyntaxIssue>,
}

/// The body ran into EOF or into the next top-level declaration.
struct Unclosed {
    resume_at: usize,
}

struct Expr {
    start: usize,
    end: usize,
    problem: Option<String>,
}

struct Extractor<'a> {
    src: &'a str,
    tokens: &'a [Token],
    pos: usize,
}

impl<'a> Extractor<'a> {
    fn kind(&self, idx: usize) -> Option<&'a TokenKind> {
        self.tokens.get(idx).map(|t| &t.kind)
    }

    fn run(&mut self) -> Extraction {
        let mut extraction = Extraction::default();
        let tokens = self.tokens;

        while let Some(token) = tokens.get(self.pos) {
            match &token.kind {
                TokenKind::Newline | TokenKind::Punct(';') => self.pos += 1,
                TokenKind::Ident(keyword) => {
                    if self.kind(self.pos + 1).is_some_and(|k| k.is_punct('=')) {
                        // Top-level attribute (tfvars style); not a block.
                        tracing::debug!(line = token.line, name = %keyword, "Skipping top-level attribute");
                        self.pos += 2;
                        if let Err(unclosed) = self.expression() {
                            self.pos = unclosed.resume_at;
                        }
                        continue;
                    }
                    match self.top_level_block(keyword, token) {
                        Ok(block) => extraction.blocks.push(block),
                        Err(issue) => extraction.issues.push(issue),
                    }
                }
                TokenKind::Punct('}') => {
                    extraction.issues.push(SyntaxIssue {
                        line: token.line,
                        message: "unexpected '}' at top level".to_string(),
                    });
                    self.pos += 1;
                }
                TokenKind::Invalid(message) => {
                    extraction.issues.push(SyntaxIssue {
                        line: token.line,
                        message: message.clone(),
                    });
                    self.pos += 1;
                }
                _ => {
                    extraction.issues.push(SyntaxIssue {
                        line: token.line,
                        message: "expected a block declaration".to_string(),
                    });
                    self.skip_line();
                }
            }
        }

        extraction
    }

    fn top_level_block(&mut self, keyword: &str, header: &Token) -> Result<Block, SyntaxIssue> {
        let header_idx = self.pos;
        self.pos += 1;
        let labels = match self.labels() {
            Ok(labels) => labels,
            Err(message) => {
                self.skip_line();
                return Err(SyntaxIssue {
                    line: header.line,
                    message: format!("{keyword} block: {message}"),
                });
            }
        };

        let body = match self.body(1) {
            Ok(body) => body,
            Err(unclosed) => {
                self.pos = unclosed.resume_at;
                return Err(SyntaxIssue {
                    line: header.line,
                    message: format!("{keyword} block is never closed (unbalanced braces)"),
                });
            }
        };
        if let Some(problem) = body.problem {
            return Err(SyntaxIssue {
                line: problem.line,
                message: format!("{keyword} block dropped: {}", problem.message),
            });
        }

        let kind = BlockKind::from_keyword(keyword);
        let expected = match kind {
            BlockKind::Resource | BlockKind::Data => Some(2),
            BlockKind::Module | BlockKind::Variable | BlockKind::Output => Some(1),
            BlockKind::Local => Some(0),
            BlockKind::Other => None,
        };
        if let Some(expected) = expected {
            if labels.len() != expected {
                return Err(SyntaxIssue {
                    line: header.line,
                    message: format!(
                        "{keyword} block expects {expected} label(s), found {}",
                        labels.len()
                    ),
                });
            }
        }

        let (type_label, name) = match kind {
            BlockKind::Resource | BlockKind::Data => (labels[0].clone(), labels[1].clone()),
            BlockKind::Module | BlockKind::Variable | BlockKind::Output => {
                (String::new(), labels[0].clone())
            }
            BlockKind::Local => (String::new(), keyword.to_string()),
            BlockKind::Other => (keyword.to_string(), other_name(keyword, &labels)),
        };

        Ok(self.make_block(kind, type_label, name, header_idx, body))
    }

    fn make_block(
        &self,
        kind: BlockKind,
        type_label: String,
        name: String,
        header_idx: usize,
        body: Body,
    ) -> Block {
        let header = &self.tokens[header_idx];
        let close = &self.tokens[body.close];
        let max_nesting_depth = body
            .nested_blocks
            .iter()
            .map(|b| b.max_nesting_depth + 1)
            .max()
            .unwrap_or(0);

        Block {
            kind,
            type_label,
            name,
            attributes: body.attributes,
            nested_blocks: body.nested_blocks,
            start_line: header.line,
            end_line: close.line,
            line_count: close.line - header.line + 1,
            max_nesting_depth,
            source: self.src[header.start..close.end].to_string(),
        }
    }

    /// Parse header labels up to and including the opening `{`.
    fn labels(&mut self) -> Result<Vec<String>, String> {
        let mut labels = Vec::new();
        loop {
            match self.kind(self.pos) {
                Some(TokenKind::Punct('{')) => {
                    self.pos += 1;
                    return Ok(labels);
                }
                Some(TokenKind::Str(template)) if template.is_plain() && !template.heredoc => {
                    labels.push(template.literal_text());
                }
                Some(TokenKind::Ident(label)) => labels.push(label.clone()),
                Some(TokenKind::Str(_)) => return Err("labels cannot be templates".to_string()),
                _ => return Err("expected '{' after block header".to_string()),
            }
            self.pos += 1;
        }
    }

    /// True when `idx` starts `keyword labels* {` at column 1.
    fn is_top_level_header(&self, idx: usize) -> bool {
        let Some(token) = self.tokens.get(idx) else {
            return false;
        };
        let TokenKind::Ident(keyword) = &token.kind else {
            return false;
        };
        if token.column != 1 || !TOP_LEVEL_KEYWORDS.contains(&keyword.as_str()) {
            return false;
        }
        let mut j = idx + 1;
        loop {
            match self.kind(j) {
                Some(TokenKind::Punct('{')) => return true,
                Some(TokenKind::Str(_) | TokenKind::Ident(_)) => j += 1,
                _ => return false,
            }
        }
    }

    /// Parse a block body; the opening `{` has been consumed.
    fn body(&mut self, depth: usize) -> Result<Body, Unclosed> {
        let mut attributes = Vec::new();
        let mut nested_blocks = Vec::new();
        let mut problem: Option<SyntaxIssue> = None;
        let tokens = self.tokens;

        loop {
            let Some(token) = tokens.get(self.pos) else {
                return Err(Unclosed {
                    resume_at: self.tokens.len(),
                });
            };

            match &token.kind {
                TokenKind::Newline | TokenKind::Punct(';') => self.pos += 1,
                TokenKind::Punct('}') => {
                    let close = self.pos;
                    self.pos += 1;
                    return Ok(Body {
                        attributes,
                        nested_blocks,
                        close,
                        problem,
                    });
                }
                TokenKind::Ident(_) if self.is_top_level_header(self.pos) => {
                    return Err(Unclosed {
                        resume_at: self.pos,
                    });
                }
                TokenKind::Ident(name) if self.kind(self.pos + 1).is_some_and(|k| k.is_punct('=')) => {
                    self.pos += 2;
                    let expr = self.expression()?;
                    let value = &tokens[expr.start..expr.end];
                    let value_problem = expr.problem.or_else(|| {
                        if value.is_empty() {
                            Some(format!("attribute '{name}' has no value"))
                        } else {
                            value.iter().find_map(|t| match &t.kind {
                                TokenKind::Invalid(message) => Some(message.clone()),
                                _ => None,
                            })
                        }
                    });
                    if let Some(message) = value_problem {
                        problem.get_or_insert(SyntaxIssue {
                            line: token.line,
                            message,
                        });
                    } else {
                        attributes.push(self.attribute(name, token.line, value));
                    }
                }
                TokenKind::Ident(keyword) => {
                    let header_idx = self.pos;
                    self.pos += 1;
                    match self.labels() {
                        Ok(labels) if depth < MAX_BLOCK_NESTING => {
                            let inner = self.body(depth + 1)?;
                            if let Some(inner_problem) = &inner.problem {
                                problem.get_or_insert(inner_problem.clone());
                            }
                            let name = other_name(keyword, &labels);
                            nested_blocks.push(self.make_block(
                                BlockKind::Other,
                                keyword.clone(),
                                name,
                                header_idx,
                                inner,
                            ));
                        }
                        Ok(_) => {
                            problem.get_or_insert(SyntaxIssue {
                                line: token.line,
                                message: "blocks nested too deeply".to_string(),
                            });
                            self.skip_balanced()?;
                        }
                        Err(message) => {
                            problem.get_or_insert(SyntaxIssue {
                                line: token.line,
                                message: format!("'{keyword}': {message}"),
                            });
                            self.skip_line();
                        }
                    }
                }
                TokenKind::Invalid(message) => {
                    problem.get_or_insert(SyntaxIssue {
                        line: token.line,
                        message: message.clone(),
                    });
                    self.pos += 1;
                }
                _ => {
                    problem.get_or_insert(SyntaxIssue {
                        line: token.line,
                        message: "unexpected token in block body".to_string(),
                    });
                    self.skip_line();
                }
            }
        }
    }

    /// Collect an attribute value: tokens up to a newline or `}` at bracket
    /// depth zero.
    fn expression(&mut self) -> Result<Expr, Unclosed> {
        let start = self.pos;
        let mut depth = 0usize;
        let mut problem = None;

        loop {
            let Some(token) = self.tokens.get(self.pos) else {
                if depth > 0 {
                    return Err(Unclosed {
                        resume_at: self.tokens.len(),
                    });
                }
                break;
            };
            match &token.kind {
                TokenKind::Newline | TokenKind::Punct('}') if depth == 0 => break,
                TokenKind::Punct('(' | '[' | '{') => depth += 1,
                TokenKind::Punct(')' | ']' | '}') => {
                    if depth == 0 {
                        problem.get_or_insert_with(|| "unbalanced brackets".to_string());
                    } else {
                        depth -= 1;
                    }
                }
                TokenKind::Ident(_) if depth > 0 && self.is_top_level_header(self.pos) => {
                    return Err(Unclosed {
                        resume_at: self.pos,
                    });
                }
                _ => {}
            }
            self.pos += 1;
        }

        Ok(Expr {
            start,
            end: self.pos,
            problem,
        })
    }

    fn attribute(&self, name: &str, line: usize, value: &[Token]) -> Attribute {
        let raw_value_text = match (value.first(), value.last()) {
            (Some(first), Some(last)) => self.src[first.start..last.end].trim().to_string(),
            _ => String::new(),
        };
        let classification = classify_expression(value);
        Attribute {
            name: name.to_string(),
            raw_value_text,
            is_hard_coded: classification.is_hard_coded,
            is_reference: classification.is_reference,
            referenced_identifiers: classification.referenced_identifiers,
            line,
            expression: classification.facts,
        }
    }

    /// Skip to the end of the line, stepping over balanced brackets. Stops
    /// before a `}` that closes the enclosing body.
    fn skip_line(&mut self) {
        let mut depth = 0usize;
        while let Some(kind) = self.kind(self.pos) {
            match kind {
                TokenKind::Newline if depth == 0 => return,
                TokenKind::Punct('}') if depth == 0 => return,
                TokenKind::Punct('(' | '[' | '{') => depth += 1,
                TokenKind::Punct(')' | ']' | '}') => depth = depth.saturating_sub(1),
                _ => {}
            }
            self.pos += 1;
        }
    }

    /// Skip a block body whose `{` has been consumed.
    fn skip_balanced(&mut self) -> Result<(), Unclosed> {
        let mut depth = 1usize;
        while let Some(kind) = self.kind(self.pos) {
            self.pos += 1;
            match kind {
                TokenKind::Punct('{') => depth += 1,
                TokenKind::Punct('}') => {
                    depth -= 1;
                    if depth == 0 {
                        return Ok(());
                    }
                }
                _ => {}
            }
        }
        Err(Unclosed {
            resume_at: self.tokens.len(),
        })
    }
}

fn other_name(keyword: &str, labels: &[String]) -> String {
    if labels.is_empty() {
        keyword.to_string()
    } else {
        labels.join(".")
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_extract_resource() {
        let source = r#"
resource "aws_instance" "web" {
  ami           = "ami-123"
  instance_type = var.instance_type

  tags = {
    Name = "web"
  }
}
"#;
        let extraction = extract_blocks(source);
        assert!(extraction.issues.is_empty());
        assert_eq!(extraction.blocks.len(), 1);

        let block = &extraction.blocks[0];
        assert_eq!(block.kind, BlockKind::Resource);
        assert_eq!(block.type_label, "aws_instance");
        assert_eq!(block.name, "web");
        assert_eq!(block.start_line, 2);
        assert_eq!(block.end_line, 9);
        assert_eq!(block.line_count, 8);
        assert_eq!(block.max_nesting_depth, 0);
        assert_eq!(block.id(), "resource:aws_instance:web");

        let names: Vec<_> = block.attributes.iter().map(|a| a.name.as_str()).collect();
        assert_eq!(names, vec!["ami", "instance_type", "tags"]);
        assert!(block.attributes[0].is_hard_coded);
        assert!(block.attributes[1].is_reference);
        assert!(block.attributes[2].is_hard_coded);
        assert!(block.source.starts_with("resource \"aws_instance\" \"web\" {"));
        assert!(block.source.ends_with('}'));
    }

    #[test]
    fn test_extract_all_kinds() {
        let source = r#"
terraform {
  required_version = ">= 1.5"
}
provider "aws" {
  region = "us-east-1"
}
variable "env" {
  type = string
}
locals {
  name = "x"
}
module "vpc" {
  source = "./vpc"
}
data "aws_ami" "ubuntu" {
  most_recent = true
}
output "id" {
  value = module.vpc.id
}
"#;
        let extraction = extract_blocks(source);
        assert!(extraction.issues.is_empty());
        let ids: Vec<_> = extraction.blocks.iter().map(Block::id).collect();
        assert_eq!(
            ids,
            vec![
                "other:terraform:terraform",
                "other:provider:aws",
                "variable::env",
                "local::locals",
                "module::vpc",
                "data:aws_ami:ubuntu",
                "output::id",
            ]
        );
    }

    #[test]
    fn test_nested_blocks_and_depth() {
        let source = r#"
resource "aws_security_group" "sg" {
  name = "sg"
  dynamic "ingress" {
    for_each = var.rules
    content {
      from_port = ingress.value.port
    }
  }
  lifecycle { create_before_destroy = true }
}
"#;
        let extraction = extract_blocks(source);
        assert!(extraction.issues.is_empty());
        let block = &extraction.blocks[0];
        assert_eq!(block.max_nesting_depth, 2);
        assert_eq!(block.nested_blocks.len(), 2);
        assert_eq!(block.nested_blocks[0].type_label, "dynamic");
        assert_eq!(block.nested_blocks[0].name, "ingress");
        assert_eq!(block.nested_blocks[1].type_label, "lifecycle");
        assert_eq!(block.attribute_count(), 4);
    }

    #[test]
    fn test_multiline_values() {
        let source = r#"
resource "aws_iam_policy" "p" {
  policy = jsonencode({
    Statement = [{
      Action = "s3:*"
    }]
  })
  description = <<EOT
multi
line
EOT
}
"#;
        let extraction = extract_blocks(source);
        assert!(extraction.issues.is_empty());
        let block = &extraction.blocks[0];
        assert_eq!(block.attributes.len(), 2);
        assert!(block.attributes[0].raw_value_text.starts_with("jsonencode({"));
        assert!(block.attributes[0].raw_value_text.ends_with("})"));
        assert!(block.attributes[1].is_hard_coded);
    }

    #[test]
    fn test_unclosed_block_is_dropped_and_next_recovered() {
        let source = r#"
resource "aws_instance" "broken" {
  ami = "ami-123"

resource "aws_instance" "ok" {
  ami = "ami-456"
}
"#;
        let extraction = extract_blocks(source);
        assert_eq!(extraction.blocks.len(), 1);
        assert_eq!(extraction.blocks[0].name, "ok");
        assert_eq!(extraction.issues.len(), 1);
        assert_eq!(extraction.issues[0].line, 2);
    }

    #[test]
    fn test_unclosed_block_at_eof() {
        let extraction = extract_blocks("resource \"a_b\" \"c\" {\n  x = 1\n");
        assert!(extraction.blocks.is_empty());
        assert_eq!(extraction.issues.len(), 1);
    }

    #[test]
    fn test_stray_closing_brace() {
        let source = "variable \"a\" {\n}\n}\noutput \"b\" {\n  value = 1\n}\n";
        let extraction = extract_blocks(source);
        assert_eq!(extraction.blocks.len(), 2);
        assert_eq!(extraction.issues.len(), 1);
        assert_eq!(extraction.issues[0].line, 3);
    }

    #[test]
    fn test_malformed_body_drops_block() {
        let source = r#"
resource "aws_instance" "bad" {
  ami = "unterminated
}
resource "aws_instance" "good" {
  ami = "ami-1"
}
"#;
        let extraction = extract_blocks(source);
        assert_eq!(extraction.blocks.len(), 1);
        assert_eq!(extraction.blocks[0].name, "good");
        assert_eq!(extraction.issues.len(), 1);
    }

    #[test]
    fn test_deeply_nested_templates_drop_only_their_block() {
        let value = format!("{}1{}", "\"${".repeat(10_000), "}\"".repeat(10_000));
        let source = format!(
            "resource \"a_b\" \"c\" {{\n  x = {value}\n}}\nresource \"a_b\" \"d\" {{\n  y = 1\n}}\n"
        );
        let extraction = extract_blocks(&source);
        assert_eq!(extraction.blocks.len(), 1);
        assert_eq!(extraction.blocks[0].name, "d");
        assert_eq!(extraction.issues.len(), 1);
        assert_eq!(extraction.issues[0].line, 2);
        assert!(extraction.issues[0].message.contains("nested deeper"));
    }

    #[test]
    fn test_wrong_label_count() {
        let extraction = extract_blocks("resource \"only_type\" {\n}\n");
        assert!(extraction.blocks.is_empty());
        assert!(extraction.issues[0].message.contains("expects 2 label"));
    }

    #[test]
    fn test_empty_source() {
        let extraction = extract_blocks("# only a comment\n\n");
        assert!(extraction.blocks.is_empty());
        assert!(extraction.issues.is_empty());
    }
}
