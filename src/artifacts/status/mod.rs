//! Working tree status
//!
//! The graph engine only needs a summary of the working tree: how many files changed in
//! which way, and whether a merge is in progress.
//!
//! ## Components
//!
//! - `status_info`: Status summary and porcelain parsing

pub mod status_info;

/// Porcelain `XY` codes of unmerged paths
pub const CONFLICT_CODES: phf::Set<&'static str> = phf::phf_set! {
    "DD", "AU", "UA", "UU", "AA", "UD", "DU",
};

pub const UNTRACKED_CODE: &str = "??";
pub const BRANCH_HEADER_PREFIX: &str = "##";
