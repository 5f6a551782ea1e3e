//! Reference Graph Module
//!
//! This module builds a directed graph of references between the blocks of
//! one scope and answers the two graph questions the metrics need: how many
//! distinct blocks a block references (coupling), and how long the longest
//! acyclic reference chain starting at a block is (depth).
//!
//! # Architecture Overview
//!
//! ```text
//! ┌──────────────────┐   subnet_id   ┌──────────────────┐    vpc_id    ┌──────────────┐
//! │ aws_instance.web │──────────────▶│ aws_subnet.a     │─────────────▶│ aws_vpc.main │
//! └──────────────────┘               └──────────────────┘              └──────────────┘
//!          │                                  │
//!          │ ami                              │ cidr_block
//!          ▼                                  ▼
//! ┌──────────────────┐               ┌──────────────────┐
//! │ data.aws_ami.u   │               │ var.cidr         │
//! └──────────────────┘               └──────────────────┘
//! ```
//!
//! Here `aws_instance.web` has coupling 2 and depth 2.
//!
//! # Node Identity
//!
//! Nodes live in a petgraph arena; node `i` is the `i`-th block of the scope.
//! Each node carries the block identifier `kind:type_label:name`.
//!
//! # Cycles
//!
//! Terraform rejects reference cycles at plan time, but malformed or partial
//! configurations can contain them. The depth search never follows an edge
//! back into the chain it is extending and stops at a configurable traversal
//! cap, so every block gets a finite depth.

mod builder;
mod types;

pub use builder::ReferenceGraphBuilder;
pub use types::{NodeId, ReferenceGraph, DEFAULT_MAX_TRAVERSAL_DEPTH};
