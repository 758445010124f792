//! Version control adapter
//!
//! The engine never reads repository files itself. Everything it knows comes through a
//! [`VcsAdapter`]: the commit log, the references, the working tree status and the
//! tags. [`GitCli`] shells out to `git`; [`StaticVcs`] serves a fixed snapshot.
//!
//! Calls are blocking and meant to run on a worker thread.

use crate::artifacts::branch::git_branch::{self, GitBranch, GitTag};
use crate::artifacts::objects::commit::{self, GitCommit};
use crate::artifacts::status::status_info::Status;
use crate::errors::{EngineError, Result};
use anyhow::Context;
use std::path::{Path, PathBuf};
use std::process::{Command, Output};

const GIT_PROGRAM: &str = "git";
const LOG_ARGS: [&str; 5] = [
    "log",
    "--all",
    "--date-order",
    "-z",
    "--pretty=%H|%ai|%ci|%an|%P|%B",
];
const BRANCH_ARGS: [&str; 5] = ["branch", "-vv", "--no-color", "--no-abbrev", "--all"];
const STATUS_ARGS: [&str; 4] = ["status", "-s", "--porcelain", "--untracked-files=all"];
const TAG_ARGS: [&str; 3] = ["show-ref", "-d", "--tags"];
const MERGE_HEAD_FILE: &str = "MERGE_HEAD";
const MERGE_MSG_FILE: &str = "MERGE_MSG";

pub trait VcsAdapter: Send + Sync {
    /// Working tree root
    fn repo_path(&self) -> &Path;

    /// All commits reachable from any reference, newest first
    fn get_log(&self) -> Result<Vec<GitCommit>>;

    fn get_branches(&self) -> Result<Vec<GitBranch>>;

    fn get_status(&self) -> Result<Status>;

    fn get_tags(&self) -> Result<Vec<GitTag>> {
        Ok(Vec::new())
    }
}

/// Adapter running the `git` executable in the working tree
#[derive(Debug, Clone)]
pub struct GitCli {
    path: PathBuf,
}

impl GitCli {
    /// Locate the working tree root containing `path`
    ///
    /// # Returns
    ///
    /// `NotARepo` when git does not recognise the folder, `VcsUnavailable` when git
    /// cannot be started
    pub fn open(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let output = git_output(path, &["rev-parse", "--show-toplevel"])
            .map_err(EngineError::vcs_unavailable)?;
        if !output.status.success() {
            tracing::debug!(
                path = ?path,
                stderr = %String::from_utf8_lossy(&output.stderr).trim(),
                "not a git working tree"
            );
            return Err(EngineError::NotARepo(path.to_path_buf()));
        }

        let root = String::from_utf8_lossy(&output.stdout).trim().to_string();
        Ok(GitCli {
            path: PathBuf::from(root),
        })
    }

    fn run(&self, args: &[&str]) -> anyhow::Result<String> {
        let output = git_output(&self.path, args)?;
        if !output.status.success() {
            anyhow::bail!(
                "git {} failed: {}",
                args.join(" "),
                String::from_utf8_lossy(&output.stderr).trim()
            );
        }
        Ok(decode_output(args, output.stdout))
    }

    fn git_dir(&self) -> anyhow::Result<PathBuf> {
        let git_dir = self.run(&["rev-parse", "--git-dir"])?;
        Ok(self.path.join(git_dir.trim()))
    }

    fn read_status(&self) -> anyhow::Result<Status> {
        let status = Status::parse_porcelain(&self.run(&STATUS_ARGS)?);

        let git_dir = self.git_dir()?;
        if !git_dir.join(MERGE_HEAD_FILE).exists() {
            return Ok(status);
        }
        let message = std::fs::read_to_string(git_dir.join(MERGE_MSG_FILE)).ok();
        Ok(status.with_merge(message.as_deref()))
    }

    fn read_tags(&self) -> anyhow::Result<Vec<GitTag>> {
        let output = git_output(&self.path, &TAG_ARGS)?;
        // show-ref exits with 1 when there is nothing to show
        if !output.status.success() && output.stdout.is_empty() {
            return Ok(Vec::new());
        }
        git_branch::parse_tags(&decode_output(&TAG_ARGS, output.stdout))
    }
}

/// Commit messages and author names are not always UTF-8; invalid bytes become U+FFFD
fn decode_output(args: &[&str], stdout: Vec<u8>) -> String {
    match String::from_utf8(stdout) {
        Ok(text) => text,
        Err(error) => {
            tracing::debug!(args = ?args, "git printed invalid UTF-8");
            String::from_utf8_lossy(error.as_bytes()).into_owned()
        }
    }
}

fn git_output(path: &Path, args: &[&str]) -> anyhow::Result<Output> {
    tracing::trace!(path = ?path, args = ?args, "running git");
    Command::new(GIT_PROGRAM)
        .args(args)
        .current_dir(path)
        .output()
        .with_context(|| format!("failed to run git {} in {:?}", args.join(" "), path))
}

impl VcsAdapter for GitCli {
    fn repo_path(&self) -> &Path {
        &self.path
    }

    fn get_log(&self) -> Result<Vec<GitCommit>> {
        self.run(&LOG_ARGS)
            .and_then(|output| commit::parse_log(&output))
            .context("reading the commit log")
            .map_err(EngineError::vcs_unavailable)
    }

    fn get_branches(&self) -> Result<Vec<GitBranch>> {
        self.run(&BRANCH_ARGS)
            .and_then(|output| git_branch::parse_branches(&output))
            .context("reading the branch list")
            .map_err(EngineError::vcs_unavailable)
    }

    fn get_status(&self) -> Result<Status> {
        self.read_status()
            .context("reading the working tree status")
            .map_err(EngineError::vcs_unavailable)
    }

    fn get_tags(&self) -> Result<Vec<GitTag>> {
        self.read_tags()
            .context("reading the tag list")
            .map_err(EngineError::vcs_unavailable)
    }
}

/// Adapter serving a fixed snapshot
#[derive(Debug, Clone, Default)]
pub struct StaticVcs {
    pub path: PathBuf,
    pub log: Vec<GitCommit>,
    pub branches: Vec<GitBranch>,
    pub status: Status,
    pub tags: Vec<GitTag>,
}

impl StaticVcs {
    pub fn new(path: impl Into<PathBuf>, log: Vec<GitCommit>, branches: Vec<GitBranch>) -> Self {
        StaticVcs {
            path: path.into(),
            log,
            branches,
            ..StaticVcs::default()
        }
    }

    pub fn with_status(mut self, status: Status) -> Self {
        self.status = status;
        self
    }

    pub fn with_tags(mut self, tags: Vec<GitTag>) -> Self {
        self.tags = tags;
        self
    }
}

impl VcsAdapter for StaticVcs {
    fn repo_path(&self) -> &Path {
        &self.path
    }

    fn get_log(&self) -> Result<Vec<GitCommit>> {
        Ok(self.log.clone())
    }

    fn get_branches(&self) -> Result<Vec<GitBranch>> {
        Ok(self.branches.clone())
    }

    fn get_status(&self) -> Result<Status> {
        Ok(self.status.clone())
    }

    fn get_tags(&self) -> Result<Vec<GitTag>> {
        Ok(self.tags.clone())
    }
}
