//! Repository model
//!
//! Commits and branches live in two arenas and refer to each other through small integer
//! handles ([`CommitIdx`], [`BranchIdx`]). The model is filled once from the adapter
//! output by [`Repo::new`], which also runs the link pass:
//!
//! 1. every reference tags its tip commit as a candidate and as a tip label
//! 2. local branches are paired with the remote branches they track
//! 3. commits are linked to their parents and children, and candidate sets flow from
//!    children down to first parents; a pull merge (`Merge branch 'x' of <url>`) has
//!    its parents swapped first, so the remote side is its first parent
//!
//! Branch assignment then mutates the model until every commit has an owner, after
//! which it is shared read-only.

use crate::artifacts::branch::git_branch::{GitBranch, GitTag};
use crate::artifacts::branch::merge_subject::parse_merge_subject;
use crate::artifacts::objects::commit::GitCommit;
use crate::artifacts::objects::commit_id::CommitId;
use crate::errors::{EngineError, Result};
use chrono::{DateTime, FixedOffset};
use serde::Serialize;
use std::collections::{HashMap, HashSet};
use std::path::{Path, PathBuf};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct CommitIdx(usize);

impl CommitIdx {
    pub fn index(self) -> usize {
        self.0
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct BranchIdx(usize);

impl BranchIdx {
    pub fn index(self) -> usize {
        self.0
    }
}

/// How a branch came to exist
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum BranchKind {
    /// A real reference
    Git,
    /// A deleted branch whose name was recovered from a merge subject
    Named,
    /// A deleted branch whose name is unknown
    IdNamed,
    /// Commits that several branches could equally own
    Multi,
}

#[derive(Debug, Clone)]
pub struct Branch {
    pub name: String,
    pub display_name: String,
    pub kind: BranchKind,
    pub tip: CommitIdx,
    pub bottom: Option<CommitIdx>,
    pub parent: Option<BranchIdx>,
    pub is_remote: bool,
    pub is_current: bool,
    pub remote_name: Option<String>,
    pub local_name: Option<String>,
}

impl Branch {
    fn synthetic(name: String, display_name: String, kind: BranchKind, tip: CommitIdx) -> Self {
        Branch {
            name,
            display_name,
            kind,
            tip,
            bottom: None,
            parent: None,
            is_remote: false,
            is_current: false,
            remote_name: None,
            local_name: None,
        }
    }

    pub fn is_git_branch(&self) -> bool {
        self.kind == BranchKind::Git
    }

    pub fn is_multi_branch(&self) -> bool {
        self.kind == BranchKind::Multi
    }

    pub fn is_named_branch(&self) -> bool {
        matches!(self.kind, BranchKind::Named | BranchKind::IdNamed)
    }
}

#[derive(Debug, Clone)]
pub struct Commit {
    pub id: CommitId,
    pub sid: String,
    pub parent_ids: Vec<CommitId>,
    pub author: String,
    pub author_time: DateTime<FixedOffset>,
    pub commit_time: DateTime<FixedOffset>,
    pub subject: String,
    pub message: String,
    pub is_current: bool,
    pub is_likely: bool,
    pub first_parent: Option<CommitIdx>,
    pub merge_parent: Option<CommitIdx>,
    pub children: Vec<CommitIdx>,
    pub merge_children: Vec<CommitIdx>,
    pub child_ids: Vec<CommitId>,
    pub candidates: Vec<BranchIdx>,
    pub branch: Option<BranchIdx>,
    pub branch_tips: Vec<String>,
    pub tags: Vec<String>,
}

impl From<GitCommit> for Commit {
    fn from(commit: GitCommit) -> Self {
        Commit {
            sid: commit.id.to_short_id(),
            id: commit.id,
            parent_ids: commit.parent_ids,
            author: commit.author,
            author_time: commit.author_time,
            commit_time: commit.commit_time,
            subject: commit.subject,
            message: commit.message,
            is_current: false,
            is_likely: false,
            first_parent: None,
            merge_parent: None,
            children: Vec::new(),
            merge_children: Vec::new(),
            child_ids: Vec::new(),
            candidates: Vec::new(),
            branch: None,
            branch_tips: Vec::new(),
            tags: Vec::new(),
        }
    }
}

impl Commit {
    pub(crate) fn add_candidate(&mut self, branch: BranchIdx) {
        if !self.candidates.contains(&branch) {
            self.candidates.push(branch);
        }
    }
}

#[derive(Debug, Clone)]
pub struct Repo {
    path: PathBuf,
    commits: Vec<Commit>,
    commit_index: HashMap<CommitId, CommitIdx>,
    branches: Vec<Branch>,
}

impl Repo {
    /// Build the model from adapter output and run the link pass
    ///
    /// # Arguments
    ///
    /// * `path` - Working tree root
    /// * `log` - Commits, newest first, every commit listed before its parents
    /// * `references` - Local and remote branches
    /// * `tags` - Tag labels
    ///
    /// # Returns
    ///
    /// The linked model, or `GraphInconsistent` on duplicate ids or misordered commits
    pub fn new(
        path: impl AsRef<Path>,
        log: Vec<GitCommit>,
        references: Vec<GitBranch>,
        tags: Vec<GitTag>,
    ) -> Result<Self> {
        let mut commit_index = HashMap::with_capacity(log.len());
        let mut commits = Vec::with_capacity(log.len());
        for (position, commit) in log.into_iter().enumerate() {
            if commit_index
                .insert(commit.id.clone(), CommitIdx(position))
                .is_some()
            {
                return Err(EngineError::GraphInconsistent(format!(
                    "commit {} listed twice",
                    commit.id
                )));
            }
            commits.push(Commit::from(commit));
        }

        let mut repo = Repo {
            path: path.as_ref().to_path_buf(),
            commits,
            commit_index,
            branches: Vec::new(),
        };

        repo.add_tags(tags);
        repo.add_git_branches(references);
        repo.pair_local_and_remote_branches();
        repo.set_git_branch_tips();
        repo.link_commits()?;

        Ok(repo)
    }

    fn add_tags(&mut self, tags: Vec<GitTag>) {
        for tag in tags {
            match self.commit_by_id(&tag.commit_id) {
                Some(commit) => self.commits[commit.0].tags.push(tag.name),
                None => tracing::debug!(tag = %tag.name, "tag points outside the log"),
            }
        }
    }

    fn add_git_branches(&mut self, references: Vec<GitBranch>) {
        for reference in references {
            if self.branch_by_name(&reference.name).is_some() {
                tracing::warn!(branch = %reference.name, "duplicate reference ignored");
                continue;
            }
            let Some(tip) = self.commit_by_id(&reference.tip_id) else {
                tracing::warn!(
                    branch = %reference.name,
                    tip = %reference.tip_id,
                    "reference tip is not in the log"
                );
                continue;
            };

            self.branches.push(Branch {
                name: reference.name,
                display_name: reference.display_name,
                kind: BranchKind::Git,
                tip,
                bottom: None,
                parent: None,
                is_remote: reference.is_remote,
                is_current: reference.is_current,
                remote_name: reference.remote_name,
                local_name: None,
            });
        }
    }

    fn pair_local_and_remote_branches(&mut self) {
        for local in 0..self.branches.len() {
            let Some(remote_name) = self.branches[local].remote_name.clone() else {
                continue;
            };
            let remote = self
                .branch_by_name(&remote_name)
                .filter(|remote| self.branches[remote.0].is_remote)
                .filter(|remote| self.branches[remote.0].local_name.is_none());

            match remote {
                Some(remote) => {
                    let local_name = self.branches[local].name.clone();
                    self.branches[remote.0].local_name = Some(local_name);
                }
                None => self.branches[local].remote_name = None,
            }
        }
    }

    fn set_git_branch_tips(&mut self) {
        for (position, branch) in self.branches.iter().enumerate() {
            let tip = &mut self.commits[branch.tip.0];
            tip.add_candidate(BranchIdx(position));
            tip.branch_tips.push(branch.name.clone());
            if branch.is_current {
                tip.is_current = true;
            }
        }
    }

    fn link_commits(&mut self) -> Result<()> {
        for position in 0..self.commits.len() {
            let child = CommitIdx(position);
            let child_id = self.commits[position].id.clone();

            let commit = &mut self.commits[position];
            if commit.parent_ids.len() == 2
                && parse_merge_subject(&commit.subject).is_pull_merge()
            {
                // remote side first, local side as the merge parent
                commit.parent_ids.swap(0, 1);
            }

            let first_parent = self.linked_parent(child, 0)?;
            if let Some(parent) = first_parent {
                let candidates = self.commits[position].candidates.clone();
                let parent = &mut self.commits[parent.0];
                parent.children.push(child);
                parent.child_ids.push(child_id.clone());
                for candidate in candidates {
                    parent.add_candidate(candidate);
                }
            }
            self.commits[position].first_parent = first_parent;

            let merge_parent = self.linked_parent(child, 1)?;
            if let Some(parent) = merge_parent {
                let parent = &mut self.commits[parent.0];
                parent.merge_children.push(child);
                parent.child_ids.push(child_id);
            }
            self.commits[position].merge_parent = merge_parent;
        }

        Ok(())
    }

    fn linked_parent(&self, child: CommitIdx, k: usize) -> Result<Option<CommitIdx>> {
        let commit = &self.commits[child.0];
        let Some(parent_id) = commit.parent_ids.get(k) else {
            return Ok(None);
        };
        let Some(parent) = self.commit_by_id(parent_id) else {
            tracing::debug!(commit = %commit.id, parent = %parent_id, "parent outside the log");
            return Ok(None);
        };
        if parent <= child {
            return Err(EngineError::GraphInconsistent(format!(
                "commit {} is listed before its child {}",
                parent_id, commit.id
            )));
        }

        Ok(Some(parent))
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn commits(&self) -> &[Commit] {
        &self.commits
    }

    pub fn branches(&self) -> &[Branch] {
        &self.branches
    }

    pub fn commit(&self, commit: CommitIdx) -> &Commit {
        &self.commits[commit.0]
    }

    pub(crate) fn commit_mut(&mut self, commit: CommitIdx) -> &mut Commit {
        &mut self.commits[commit.0]
    }

    pub fn branch(&self, branch: BranchIdx) -> &Branch {
        &self.branches[branch.0]
    }

    pub(crate) fn branch_mut(&mut self, branch: BranchIdx) -> &mut Branch {
        &mut self.branches[branch.0]
    }

    pub fn commit_indices(&self) -> impl DoubleEndedIterator<Item = CommitIdx> + use<> {
        (0..self.commits.len()).map(CommitIdx)
    }

    pub fn branch_indices(&self) -> impl DoubleEndedIterator<Item = BranchIdx> + use<> {
        (0..self.branches.len()).map(BranchIdx)
    }

    pub fn commit_by_id(&self, id: &CommitId) -> Option<CommitIdx> {
        self.commit_index.get(id).copied()
    }

    pub fn branch_by_name(&self, name: &str) -> Option<BranchIdx> {
        self.branches
            .iter()
            .position(|branch| branch.name == name)
            .map(BranchIdx)
    }

    /// Resolve a name, falling back to the first branch with that display name
    pub fn resolve_branch(&self, name: &str) -> Option<BranchIdx> {
        self.branch_by_name(name).or_else(|| {
            self.branches
                .iter()
                .position(|branch| branch.display_name == name)
                .map(BranchIdx)
        })
    }

    pub fn current_branch(&self) -> Option<BranchIdx> {
        self.branches
            .iter()
            .position(|branch| branch.is_current)
            .map(BranchIdx)
    }

    /// The `k`-th parent of a commit when it is part of the snapshot
    pub fn parent(&self, commit: CommitIdx, k: usize) -> Option<CommitIdx> {
        match k {
            0 => self.commits[commit.0].first_parent,
            1 => self.commits[commit.0].merge_parent,
            _ => self.commits[commit.0]
                .parent_ids
                .get(k)
                .and_then(|id| self.commit_by_id(id)),
        }
    }

    /// Owning branch of a commit, set once assignment ran
    pub fn owner(&self, commit: CommitIdx) -> Option<BranchIdx> {
        self.commits[commit.0].branch
    }

    /// Parent branch chain, closest first
    pub fn ancestors(&self, branch: BranchIdx) -> Vec<BranchIdx> {
        let mut ancestors = Vec::new();
        let mut visited = HashSet::from([branch]);
        let mut current = self.branches[branch.0].parent;

        while let Some(parent) = current {
            if !visited.insert(parent) {
                break;
            }
            ancestors.push(parent);
            current = self.branches[parent.0].parent;
        }

        ancestors
    }

    pub fn is_ancestor(&self, ancestor: BranchIdx, of: BranchIdx) -> bool {
        self.ancestors(of).contains(&ancestor)
    }

    /// Local counterpart of a remote branch or remote counterpart of a local one
    pub fn counterpart(&self, branch: BranchIdx) -> Option<BranchIdx> {
        let branch = &self.branches[branch.0];
        branch
            .local_name
            .as_deref()
            .or(branch.remote_name.as_deref())
            .and_then(|name| self.branch_by_name(name))
    }

    pub fn add_multi_branch(&mut self, commit: CommitIdx) -> BranchIdx {
        let name = self.synthetic_name(commit, |sid| format!("multi:{sid}"));
        let display_name = format!("multiple@{}", self.commits[commit.0].sid);
        self.push_branch(Branch::synthetic(
            name,
            display_name,
            BranchKind::Multi,
            commit,
        ))
    }

    pub fn add_named_branch(&mut self, commit: CommitIdx, branch_name: &str) -> BranchIdx {
        let name = self.synthetic_name(commit, |sid| format!("{branch_name}:{sid}"));
        self.push_branch(Branch::synthetic(
            name,
            branch_name.to_string(),
            BranchKind::Named,
            commit,
        ))
    }

    pub fn add_id_named_branch(&mut self, commit: CommitIdx) -> BranchIdx {
        let name = self.synthetic_name(commit, |sid| format!("branch:{sid}"));
        let display_name = format!("branch@{}", self.commits[commit.0].sid);
        self.push_branch(Branch::synthetic(
            name,
            display_name,
            BranchKind::IdNamed,
            commit,
        ))
    }

    fn synthetic_name(&self, commit: CommitIdx, format: impl Fn(&str) -> String) -> String {
        let commit = &self.commits[commit.0];
        let name = format(&commit.sid);
        if self.branch_by_name(&name).is_none() {
            return name;
        }
        format(commit.id.as_ref())
    }

    fn push_branch(&mut self, branch: Branch) -> BranchIdx {
        self.branches.push(branch);
        BranchIdx(self.branches.len() - 1)
    }

    /// Keep only the flagged branches, remapping every handle that refers to them
    pub(crate) fn retain_branches(&mut self, keep: &[bool]) {
        let mut remap = Vec::with_capacity(self.branches.len());
        let mut next = 0;
        for kept in keep.iter().copied() {
            remap.push(kept.then(|| {
                next += 1;
                BranchIdx(next - 1)
            }));
        }
        let translate = |branch: BranchIdx| remap.get(branch.0).copied().flatten();

        let branches = std::mem::take(&mut self.branches);
        self.branches = branches
            .into_iter()
            .zip(keep.iter().copied())
            .filter_map(|(branch, kept)| kept.then_some(branch))
            .collect();
        for branch in &mut self.branches {
            branch.parent = branch.parent.and_then(translate);
        }
        for commit in &mut self.commits {
            commit.branch = commit.branch.and_then(translate);
            commit.candidates = commit
                .candidates
                .iter()
                .copied()
                .filter_map(translate)
                .collect();
        }
    }

    /// Commits matching `text` in their id, message, author, tags or tip labels
    ///
    /// # Returns
    ///
    /// Tag matches first, then the other matches, each group in log order
    pub fn search_commits(&self, text: &str) -> Vec<CommitIdx> {
        let needle = text.trim().to_lowercase();
        if needle.is_empty() {
            return Vec::new();
        }
        let contains = |value: &str| value.to_lowercase().contains(&needle);

        let (tagged, others): (Vec<_>, Vec<_>) = self
            .commit_indices()
            .filter(|c| {
                let commit = &self.commits[c.0];
                contains(commit.id.as_ref())
                    || contains(&commit.message)
                    || contains(&commit.author)
                    || commit.tags.iter().any(|tag| contains(tag))
                    || commit.branch_tips.iter().any(|tip| contains(tip))
            })
            .partition(|c| self.commits[c.0].tags.iter().any(|tag| contains(tag)));

        tagged.into_iter().chain(others).collect()
    }
}
