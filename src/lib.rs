//! Terminal repository graph engine
//!
//! Reads a git repository through the `git` executable, assigns every commit to a
//! branch and lays out the selected branches as columns of a commit graph.

pub mod areas;
pub mod artifacts;
pub mod commands;
pub mod errors;

/// How commands print their results
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, clap::ValueEnum)]
pub enum OutputFormat {
    #[default]
    Text,
    Json,
}
