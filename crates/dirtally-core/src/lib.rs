//! Core types for dirtally.
//!
//! This crate provides the data model shared by the listing and aggregation
//! engines: visited entries, directory aggregates, traversal options and the
//! compiled path filter.

mod config;
mod entry;
mod error;
mod filter;
pub mod path;

pub use config::{
    DEFAULT_BUFFER_SIZE, TimeFilter, TimeOperator, TraversalOptions, TraversalOptionsBuilder,
};
pub use entry::{DirectoryAggregate, Entry, EntryMetadata};
pub use error::WalkError;
pub use filter::{CompiledOptions, PathFilter, filter_key};
