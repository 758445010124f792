//! Published snapshot
//!
//! A [`ViewRepo`] is the read-only result of one refresh: the selected branches in
//! column order and the rows to draw, each with its graph cells. It keeps a handle to
//! the full repository model so that details and searches can reach commits that are
//! not displayed.

use crate::artifacts::graph::glyph::{GraphColumn, More};
use crate::artifacts::graph::repo::{BranchIdx, BranchKind, CommitIdx, Repo};
use crate::artifacts::objects::commit_id::CommitId;
use crate::artifacts::status::status_info::Status;
use crate::errors::{EngineError, Result};
use chrono::{DateTime, FixedOffset};
use serde::Serialize;
use std::path::PathBuf;
use std::sync::Arc;

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ViewBranch {
    pub name: String,
    pub display_name: String,
    pub column: usize,
    pub kind: BranchKind,
    pub tip_id: CommitId,
    pub bottom_id: CommitId,
    pub parent_branch_name: Option<String>,
    pub is_remote: bool,
    pub is_current: bool,
    pub is_git_branch: bool,
    pub is_multi_branch: bool,
    pub is_named_branch: bool,
    pub remote_name: Option<String>,
    pub local_name: Option<String>,
    pub has_local_only: bool,
    pub has_remote_only: bool,
    #[serde(skip)]
    pub source: BranchIdx,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ViewCommit {
    pub id: CommitId,
    pub sid: String,
    pub subject: String,
    pub message: String,
    pub author: String,
    pub author_time: DateTime<FixedOffset>,
    pub parent_ids: Vec<CommitId>,
    pub child_ids: Vec<CommitId>,
    pub is_current: bool,
    pub is_uncommitted: bool,
    pub branch_name: String,
    pub branch_column: usize,
    pub graph: Vec<GraphColumn>,
    pub more: More,
    pub is_more: bool,
    pub branch_tips: Vec<String>,
    pub tags: Vec<String>,
    pub is_local_only: bool,
    pub is_remote_only: bool,
    #[serde(skip)]
    pub source: Option<CommitIdx>,
}

#[derive(Debug, Clone, Serialize)]
pub struct ViewRepo {
    pub working_folder: PathBuf,
    pub commits: Vec<ViewCommit>,
    pub branches: Vec<ViewBranch>,
    pub current_branch_name: Option<String>,
    pub graph_width: usize,
    pub uncommitted_changes: usize,
    pub conflicts: usize,
    pub is_merging: bool,
    pub merge_message: Option<String>,
    #[serde(skip)]
    pub(crate) repo: Arc<Repo>,
    #[serde(skip)]
    pub(crate) status: Status,
}

/// A window of rows for a scrolling front end
#[derive(Debug, Clone, Serialize)]
pub struct ViewPort {
    pub first_index: usize,
    pub total: usize,
    pub commits: Vec<ViewCommit>,
    pub branches: Vec<ViewBranch>,
    pub current_branch_name: Option<String>,
    pub graph_width: usize,
    pub working_folder: PathBuf,
    pub uncommitted_changes: usize,
    pub conflicts: usize,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CommitDetails {
    pub id: CommitId,
    pub sid: String,
    pub subject: String,
    pub message: String,
    pub author: String,
    pub author_time: DateTime<FixedOffset>,
    pub parent_ids: Vec<CommitId>,
    pub child_ids: Vec<CommitId>,
    pub branch_name: String,
    pub branch_display_name: String,
    pub branch_tips: Vec<String>,
    pub tags: Vec<String>,
    pub is_uncommitted: bool,
}

impl ViewRepo {
    pub fn repo(&self) -> &Arc<Repo> {
        &self.repo
    }

    pub fn status(&self) -> &Status {
        &self.status
    }

    /// Names of the shown branches in column order
    pub fn branch_names(&self) -> Vec<String> {
        self.branches
            .iter()
            .map(|branch| branch.name.clone())
            .collect()
    }

    pub fn is_shown(&self, branch: BranchIdx) -> bool {
        self.branches.iter().any(|shown| shown.source == branch)
    }

    pub fn row_of(&self, id: &CommitId) -> Option<usize> {
        self.commits.iter().position(|commit| commit.id == *id)
    }

    /// Rows `[first, first + count)`, shifted back so that the window stays full
    pub fn view_port(&self, first_index: usize, count: usize) -> ViewPort {
        let total = self.commits.len();
        let count = count.min(total);
        let first_index = first_index.min(total - count);

        ViewPort {
            first_index,
            total,
            commits: self.commits[first_index..first_index + count].to_vec(),
            branches: self.branches.clone(),
            current_branch_name: self.current_branch_name.clone(),
            graph_width: self.graph_width,
            working_folder: self.working_folder.clone(),
            uncommitted_changes: self.uncommitted_changes,
            conflicts: self.conflicts,
        }
    }

    /// Full id of the commit whose id is `text` or starts with it
    pub fn resolve_commit_id(&self, text: &str) -> Result<CommitId> {
        if let Some(row) = self.commits.iter().find(|row| row.id.as_ref() == text) {
            return Ok(row.id.clone());
        }

        let mut matches = self
            .repo
            .commits()
            .iter()
            .filter(|commit| commit.id.as_ref().starts_with(text));
        match (matches.next(), matches.next()) {
            (Some(commit), None) if !text.is_empty() => Ok(commit.id.clone()),
            _ => Err(EngineError::UnknownCommit(text.to_string())),
        }
    }

    /// Details of any commit of the snapshot, shown or not
    pub fn commit_details(&self, id: &CommitId) -> Result<CommitDetails> {
        if id.is_uncommitted()
            && let Some(row) = self.commits.first().filter(|row| row.is_uncommitted)
        {
            return Ok(CommitDetails {
                id: row.id.clone(),
                sid: row.sid.clone(),
                subject: row.subject.clone(),
                message: row.message.clone(),
                author: row.author.clone(),
                author_time: row.author_time,
                parent_ids: row.parent_ids.clone(),
                child_ids: Vec::new(),
                branch_name: row.branch_name.clone(),
                branch_display_name: self.branches[row.branch_column].display_name.clone(),
                branch_tips: Vec::new(),
                tags: Vec::new(),
                is_uncommitted: true,
            });
        }

        let commit = self
            .repo
            .commit_by_id(id)
            .ok_or_else(|| EngineError::UnknownCommit(id.to_string()))?;
        Ok(self.details_of(commit))
    }

    /// Commits matching `text`, shown or not
    pub fn search(&self, text: &str) -> Vec<CommitDetails> {
        self.repo
            .search_commits(text)
            .into_iter()
            .map(|commit| self.details_of(commit))
            .collect()
    }

    fn details_of(&self, commit: CommitIdx) -> CommitDetails {
        let c = self.repo.commit(commit);
        let (branch_name, branch_display_name) = match c.branch {
            Some(branch) => {
                let branch = self.repo.branch(branch);
                (branch.name.clone(), branch.display_name.clone())
            }
            None => (String::new(), String::new()),
        };

        CommitDetails {
            id: c.id.clone(),
            sid: c.sid.clone(),
            subject: c.subject.clone(),
            message: c.message.clone(),
            author: c.author.clone(),
            author_time: c.author_time,
            parent_ids: c.parent_ids.clone(),
            child_ids: c.child_ids.clone(),
            branch_name,
            branch_display_name,
            branch_tips: c.branch_tips.clone(),
            tags: c.tags.clone(),
            is_uncommitted: false,
        }
    }
}
