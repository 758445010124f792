//! Command implementations
//!
//! Commands are `impl Repository` blocks writing through the repository's writer:
//!
//! - `plumbing`: machine readable output (`snapshot`)
//! - `porcelain`: human readable output (`graph`, `branches`, `status`, `show`,
//!   `search`, `watch`)

pub mod plumbing;
pub mod porcelain;
