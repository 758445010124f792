//! Engine error taxonomy
//!
//! Everything that crosses the engine boundary (adapter, graph construction, service
//! lookups) is reported through [`EngineError`]. Internals that talk to the outside world
//! (the git subprocess, the config file) use `anyhow` and are folded into a variant here.

use std::path::PathBuf;
use thiserror::Error;

pub type Result<T> = std::result::Result<T, EngineError>;

#[derive(Debug, Error)]
pub enum EngineError {
    #[error("version control tool unavailable: {context}")]
    VcsUnavailable { context: String },

    #[error("not a repository: {}", .0.display())]
    NotARepo(PathBuf),

    #[error("inconsistent repository graph: {0}")]
    GraphInconsistent(String),

    #[error("unknown branch: {0}")]
    UnknownBranch(String),

    #[error("index {index} out of range (len {len})")]
    OutOfRange { index: usize, len: usize },

    #[error("unknown repository id: {0}")]
    UnknownRepo(u64),

    #[error("unknown commit: {0}")]
    UnknownCommit(String),

    #[error("configuration error: {context}")]
    Config { context: String },
}

impl EngineError {
    /// Wrap an adapter failure, keeping the whole context chain
    pub fn vcs_unavailable(error: anyhow::Error) -> Self {
        EngineError::VcsUnavailable {
            context: format!("{error:#}"),
        }
    }

    pub fn config(error: anyhow::Error) -> Self {
        EngineError::Config {
            context: format!("{error:#}"),
        }
    }

    /// Process exit code for the command line front end
    pub fn exit_code(&self) -> u8 {
        match self {
            EngineError::Config { .. } => 2,
            _ => 1,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use anyhow::Context;
    use rstest::rstest;

    #[test]
    fn vcs_unavailable_keeps_the_context_chain() {
        let error = Err::<(), _>(std::io::Error::other("spawn failed"))
            .context("running git log")
            .unwrap_err();

        let error = EngineError::vcs_unavailable(error);

        assert_eq!(
            error.to_string(),
            "version control tool unavailable: running git log: spawn failed"
        );
    }

    #[rstest]
    #[case(EngineError::config(anyhow::anyhow!("bad json")), 2)]
    #[case(EngineError::vcs_unavailable(anyhow::anyhow!("no git")), 1)]
    #[case(EngineError::NotARepo(PathBuf::from("/tmp")), 1)]
    fn exit_codes_separate_config_from_adapter_failures(
        #[case] error: EngineError,
        #[case] expected: u8,
    ) {
        assert_eq!(error.exit_code(), expected);
    }
}
