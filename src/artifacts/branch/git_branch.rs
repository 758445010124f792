//! References as listed by the version control tool
//!
//! ## Branch listing
//!
//! `git branch -vv --no-color --no-abbrev --all` prints one line per reference:
//!
//! ```text
//! * main                  1f3c...  [origin/main: ahead 1] Fix parser
//!   (HEAD detached at 9a0b12) 9a0b...  Experiment
//!   remotes/origin/HEAD   -> origin/main
//!   remotes/origin/main   0c4d...  Previous commit
//! ```
//!
//! Symbolic references (`->`) are skipped, `remotes/` marks remote branches and a
//! bracketed upstream marks a local branch that tracks a remote one.
//!
//! ## Tag listing
//!
//! `git show-ref -d --tags` prints `<id> refs/tags/<name>` and, for annotated tags, an
//! extra `<id> refs/tags/<name>^{}` line pointing at the tagged commit.

use crate::artifacts::branch::{
    BRANCH_LINE_REGEX, DEREFERENCED_TAG_SUFFIX, REMOTES_PREFIX, SYMBOLIC_REF_MARKER,
    TAG_REFS_PREFIX,
};
use crate::artifacts::objects::commit_id::CommitId;
use anyhow::Context;
use serde::{Deserialize, Serialize};
use std::sync::LazyLock;

static BRANCH_LINE: LazyLock<Result<regex::Regex, regex::Error>> =
    LazyLock::new(|| regex::Regex::new(BRANCH_LINE_REGEX));

/// A real reference (local or remote branch)
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GitBranch {
    pub name: String,
    pub display_name: String,
    pub tip_id: CommitId,
    pub is_current: bool,
    pub is_remote: bool,
    pub is_detached: bool,
    pub remote_name: Option<String>,
}

impl GitBranch {
    /// A local branch without upstream
    pub fn local(name: impl Into<String>, tip_id: CommitId) -> Self {
        let name = name.into();
        GitBranch {
            display_name: name.clone(),
            name,
            tip_id,
            is_current: false,
            is_remote: false,
            is_detached: false,
            remote_name: None,
        }
    }

    /// A remote branch, `name` being qualified by the remote (`origin/main`)
    pub fn remote(name: impl Into<String>, tip_id: CommitId) -> Self {
        let name = name.into();
        GitBranch {
            display_name: remote_display_name(&name),
            name,
            tip_id,
            is_current: false,
            is_remote: true,
            is_detached: false,
            remote_name: None,
        }
    }

    pub fn with_current(mut self, is_current: bool) -> Self {
        self.is_current = is_current;
        self
    }

    pub fn with_remote_name(mut self, remote_name: impl Into<String>) -> Self {
        self.remote_name = Some(remote_name.into());
        self
    }
}

/// A tag label attached to a commit
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GitTag {
    pub name: String,
    pub commit_id: CommitId,
}

/// Display name of a remote branch: the name without its remote segment
pub fn remote_display_name(name: &str) -> String {
    match name.split_once('/') {
        Some((_, rest)) if !rest.is_empty() => rest.to_string(),
        _ => name.to_string(),
    }
}

/// Parse the verbose branch listing
///
/// # Returns
///
/// One entry per concrete reference, in listing order; at most one is current
pub fn parse_branches(output: &str) -> anyhow::Result<Vec<GitBranch>> {
    let branch_line = BRANCH_LINE
        .as_ref()
        .map_err(|e| anyhow::anyhow!("invalid branch regex {BRANCH_LINE_REGEX}: {e}"))?;
    let mut branches = Vec::new();
    let mut seen_current = false;

    for line in output.lines() {
        if line.trim().is_empty() || line.contains(SYMBOLIC_REF_MARKER) {
            continue;
        }
        let captures = branch_line
            .captures(line)
            .with_context(|| format!("unrecognised branch line: {line:?}"))?;

        let is_detached = captures.get(3).is_some();
        let raw_name = match (captures.get(3), captures.get(4)) {
            (Some(detached_at), _) => format!("({})", detached_at.as_str()),
            (None, Some(name)) => name.as_str().to_string(),
            (None, None) => anyhow::bail!("branch line without name: {line:?}"),
        };
        let tip = captures
            .get(5)
            .with_context(|| format!("branch line without tip: {line:?}"))?;
        let tip_id = CommitId::try_parse(tip.as_str())?;

        let mut branch = match raw_name.strip_prefix(REMOTES_PREFIX) {
            Some(remote) => GitBranch::remote(remote, tip_id),
            None => GitBranch::local(raw_name, tip_id),
        };
        branch.is_detached = is_detached;
        if !branch.is_remote
            && let Some(upstream) = captures.get(8)
        {
            branch.remote_name = Some(upstream.as_str().to_string());
        }
        if captures.get(1).is_some() && !seen_current {
            branch.is_current = true;
            seen_current = true;
        }
        branches.push(branch);
    }

    Ok(branches)
}

/// Parse the dereferenced tag listing
///
/// Annotated tags resolve to the commit named by their `^{}` line.
pub fn parse_tags(output: &str) -> anyhow::Result<Vec<GitTag>> {
    let mut tags: Vec<GitTag> = Vec::new();

    for line in output.lines().filter(|line| !line.trim().is_empty()) {
        let (id, reference) = line
            .split_once(' ')
            .with_context(|| format!("unrecognised tag line: {line:?}"))?;
        let Some(name) = reference.trim().strip_prefix(TAG_REFS_PREFIX) else {
            continue;
        };
        let commit_id = CommitId::try_parse(id)?;

        match name.strip_suffix(DEREFERENCED_TAG_SUFFIX) {
            Some(name) => match tags.iter_mut().find(|tag| tag.name == name) {
                Some(tag) => tag.commit_id = commit_id,
                None => tags.push(GitTag {
                    name: name.to_string(),
                    commit_id,
                }),
            },
            None => tags.push(GitTag {
                name: name.to_string(),
                commit_id,
            }),
        }
    }

    Ok(tags)
}
