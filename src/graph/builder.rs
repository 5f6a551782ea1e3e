//! Graph builder implementation.
//!
//! This module provides the `ReferenceGraphBuilder` which constructs a
//! `ReferenceGraph` from the blocks of one scope.

use crate::graph::types::ReferenceGraph;
use crate::types::{Block, BlockKind};
use std::collections::HashMap;

/// Builder for reference graphs.
///
/// # Algorithm
///
/// 1. **Node Creation Phase**: one node per block, in input order.
/// 2. **Address Phase**: map each referenceable address to its block:
///    - `type.name` for resources, `data.type.name` for data sources
///    - `module.name`, `var.name`
///    - `local.key` for every key of a `locals` block
/// 3. **Edge Phase**: resolve every referenced identifier in each block tree
///    against the address table. Unresolved references (blocks outside the
///    scope) add no edge; self-references are dropped.
///
/// # Example
///
/// ```rust
/// use tfmi::graph::ReferenceGraphBuilder;
/// use tfmi::parser::extract_blocks;
///
/// let source = r#"
/// resource "aws_vpc" "main" {}
/// resource "aws_subnet" "a" {
///   vpc_id = aws_vpc.main.id
/// }
/// "#;
/// let blocks = extract_blocks(source).blocks;
/// let refs: Vec<_> = blocks.iter().collect();
/// let graph = ReferenceGraphBuilder::default().build(&refs);
/// assert_eq!(graph.edge_count(), 1);
/// ```
#[derive(Debug, Clone)]
pub struct ReferenceGraphBuilder {
    max_traversal_depth: usize,
}

impl Default for ReferenceGraphBuilder {
    fn default() -> Self {
        Self::new(super::types::DEFAULT_MAX_TRAVERSAL_DEPTH)
    }
}

impl ReferenceGraphBuilder {
    /// Create a builder whose graphs cap chain traversal at `max_traversal_depth`.
    #[must_use]
    pub fn new(max_traversal_depth: usize) -> Self {
        Self {
            max_traversal_depth,
        }
    }

    /// Build the reference graph of a scope. Node `i` is `blocks[i]`.
    #[must_use]
    pub fn build(&self, blocks: &[&Block]) -> ReferenceGraph {
        tracing::debug!(blocks = blocks.len(), "Starting reference graph construction");
        let mut graph = ReferenceGraph::new(self.max_traversal_depth);

        // Phase 1: nodes
        let nodes: Vec<_> = blocks.iter().map(|b| graph.add_node(b.id())).collect();

        // Phase 2: address table
        let mut addresses: HashMap<String, usize> = HashMap::new();
        for (i, block) in blocks.iter().enumerate() {
            for address in block_addresses(block) {
                if let Some(existing) = addresses.get(&address) {
                    tracing::debug!(
                        address = %address,
                        first = %blocks[*existing].id(),
                        duplicate = %block.id(),
                        "Duplicate address in scope, keeping first"
                    );
                    continue;
                }
                addresses.insert(address, i);
            }
        }
        tracing::debug!(addresses = addresses.len(), "Address table built");

        // Phase 3: edges
        for (i, block) in blocks.iter().enumerate() {
            let mut targets = Vec::new();
            block.for_each_attribute(&mut |_, attribute| {
                for reference in &attribute.referenced_identifiers {
                    if let Some(&j) = addresses.get(target_address(reference)) {
                        targets.push(j);
                    }
                }
            });
            for j in targets {
                graph.add_edge(nodes[i], nodes[j]);
            }
        }

        tracing::debug!(
            nodes = graph.node_count(),
            edges = graph.edge_count(),
            "Reference graph construction complete"
        );
        graph
    }
}

/// Addresses under which other blocks can reference `block`.
fn block_addresses(block: &Block) -> Vec<String> {
    match block.kind {
        BlockKind::Resource => vec![format!("{}.{}", block.type_label, block.name)],
        BlockKind::Data => vec![format!("data.{}.{}", block.type_label, block.name)],
        BlockKind::Module => vec![format!("module.{}", block.name)],
        BlockKind::Variable => vec![format!("var.{}", block.name)],
        BlockKind::Local => block
            .attributes
            .iter()
            .map(|a| format!("local.{}", a.name))
            .collect(),
        BlockKind::Output | BlockKind::Other => Vec::new(),
    }
}

/// Strip a module output segment: `module.m.out` resolves to `module.m`.
fn target_address(reference: &str) -> &str {
    if let Some(rest) = reference.strip_prefix("module.") {
        if let Some(dot) = rest.find('.') {
            return &reference[.."module.".len() + dot];
        }
    }
    reference
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::parser::extract_blocks;

    fn build(source: &str) -> (Vec<Block>, ReferenceGraph) {
        let blocks = extract_blocks(source).blocks;
        let graph = {
            let refs: Vec<_> = blocks.iter().collect();
            ReferenceGraphBuilder::default().build(&refs)
        };
        (blocks, graph)
    }

    #[test]
    fn test_build_empty_graph() {
        let graph = ReferenceGraphBuilder::default().build(&[]);
        assert_eq!(graph.node_count(), 0);
        assert_eq!(graph.edge_count(), 0);
    }

    #[test]
    fn test_resolves_all_reference_forms() {
        let source = r#"
variable "cidr" {}
locals {
  name = "app"
}
data "aws_ami" "ubuntu" {}
module "net" {
  source = "./net"
}
resource "aws_instance" "web" {
  ami       = data.aws_ami.ubuntu.id
  subnet_id = module.net.subnet_id
  cidr      = var.cidr
  tags      = { Name = local.name }
}
"#;
        let (blocks, graph) = build(source);
        let web = graph.index_of("resource:aws_instance:web").unwrap();
        assert_eq!(blocks.len(), 5);
        assert_eq!(graph.coupling(web), 4);
        let mut deps: Vec<_> = graph.get_dependencies(web).into_iter().cloned().collect();
        deps.sort();
        assert_eq!(
            deps,
            vec!["data:aws_ami:ubuntu", "local::locals", "module::net", "variable::cidr"]
        );
    }

    #[test]
    fn test_unknown_references_add_no_edges() {
        let (_, graph) = build(
            r#"
resource "aws_instance" "web" {
  subnet_id = aws_subnet.elsewhere.id
  ami       = var.not_declared_here
}
"#,
        );
        assert_eq!(graph.edge_count(), 0);
    }

    #[test]
    fn test_self_reference_is_not_an_edge() {
        let (_, graph) = build(
            r#"
resource "aws_instance" "web" {
  tags = { Self = aws_instance.web.id }
}
"#,
        );
        assert_eq!(graph.edge_count(), 0);
    }

    #[test]
    fn test_repeated_references_count_once() {
        let (_, graph) = build(
            r#"
resource "aws_vpc" "main" {}
resource "aws_subnet" "a" {
  vpc_id     = aws_vpc.main.id
  cidr_block = cidrsubnet(aws_vpc.main.cidr_block, 8, 1)
  dynamic "tag" {
    for_each = aws_vpc.main.tags
    content {}
  }
}
"#,
        );
        let subnet = graph.index_of("resource:aws_subnet:a").unwrap();
        assert_eq!(graph.coupling(subnet), 1);
    }

    #[test]
    fn test_mutual_references_form_cycle() {
        let (_, graph) = build(
            r#"
resource "aws_security_group" "a" {
  peer = aws_security_group.b.id
}
resource "aws_security_group" "b" {
  peer = aws_security_group.a.id
}
"#,
        );
        assert_eq!(graph.edge_count(), 2);
        assert_eq!(graph.all_depths(), vec![1, 1]);
    }

    #[test]
    fn test_target_address() {
        assert_eq!(target_address("module.vpc.id"), "module.vpc");
        assert_eq!(target_address("module.vpc"), "module.vpc");
        assert_eq!(target_address("data.a_b.c"), "data.a_b.c");
    }
}
