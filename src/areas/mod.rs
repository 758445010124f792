//! Engine boundary and runtime
//!
//! Everything that talks to the outside world or runs over time:
//!
//! - `vcs`: adapter to the version control tool
//! - `config`: persisted settings and shown branches
//! - `monitor`: polling change detection for a working tree
//! - `coordinator`: per repository actor serialising refreshes
//! - `service`: engine API addressing repositories by id
//! - `repository`: command line front end

pub mod config;
pub mod coordinator;
pub mod monitor;
pub mod repository;
pub mod service;
pub mod vcs;
