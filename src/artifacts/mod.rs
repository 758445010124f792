//! Repository data structures and algorithms
//!
//! - `branch`: branch and tag references, merge subject parsing
//! - `core`: shared utilities (pager wrapper)
//! - `graph`: repository model, branch assignment, selection and layout
//! - `objects`: commit identifiers and commit log records
//! - `status`: working tree status summary

pub mod branch;
pub mod core;
pub mod graph;
pub mod objects;
pub mod status;
