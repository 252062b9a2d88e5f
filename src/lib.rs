//! eavquery - query-tree lowering for entity-attribute-value repositories
//!
//! This crate turns backend-agnostic query trees into something a relational
//! executor over a generic EAV schema can run:
//! - Schema resolution against a class/attribute dictionary
//! - Lowering to join descriptors and a parenthesized predicate stream
//! - A lazily materializing, batch-prefetching result cursor

pub mod config;
pub mod dictionary;
pub mod lowering;
pub mod node;
pub mod query_model;
pub mod result_set;

pub use lowering::{lower_query, LoweredQuery, LoweringError};
pub use query_model::Query;
pub use result_set::{ResultCursor, ResultOptions};
