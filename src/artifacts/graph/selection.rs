//! View selection
//!
//! Decides which branches get a column and in which order. A selection is a list of
//! branch names; [`BranchSelector::select`] closes it under ancestry and local/remote
//! pairing, drops locals that sit on their remote's tip and sorts the result:
//!
//! * a remote branch before its local branch, which follows right after it
//! * branches from the priority list first, in priority order
//! * all others in the order they were requested, ancestors pulled in ahead of the
//!   branch that needed them
//!
//! The sort is stable and the closed list keeps the published order, so selecting the
//! names of a selection yields the same selection again.
//!
//! The `*_branch` functions derive a new name list from the names last requested and
//! the published view the user acted on. The names may be newer than the view while a
//! refresh is running; the caller feeds the result back into the selector.

use crate::artifacts::branch::{FALLBACK_BRANCH_NAMES, ROOT_BRANCH_NAMES};
use crate::artifacts::graph::repo::{BranchIdx, Repo};
use crate::artifacts::graph::view_repo::ViewRepo;
use crate::errors::{EngineError, Result};
use std::collections::{HashMap, HashSet};

#[derive(Debug)]
pub struct BranchSelector<'a> {
    repo: &'a Repo,
    priority: &'a [String],
    hide_same_local_as_remote: bool,
    is_dirty: bool,
}

impl<'a> BranchSelector<'a> {
    pub fn new(repo: &'a Repo, priority: &'a [String]) -> Self {
        BranchSelector {
            repo,
            priority,
            hide_same_local_as_remote: true,
            is_dirty: false,
        }
    }

    pub fn with_hide_same_local_as_remote(mut self, hide: bool) -> Self {
        self.hide_same_local_as_remote = hide;
        self
    }

    /// Keep the current branch even when it sits on its remote's tip
    pub fn with_dirty_tree(mut self, is_dirty: bool) -> Self {
        self.is_dirty = is_dirty;
        self
    }

    /// Resolve `names` into the ordered list of branches to show
    pub fn select(&self, names: &[String]) -> Vec<BranchIdx> {
        let mut requested = names
            .iter()
            .filter_map(|name| {
                let branch = self.repo.resolve_branch(name);
                if branch.is_none() {
                    tracing::debug!(%name, "{}", EngineError::UnknownBranch(name.clone()));
                }
                branch
            })
            .collect::<Vec<_>>();
        if requested.is_empty() {
            requested.extend(self.default_branch());
        }

        let closed = self.close_over(requested);
        let kept = self.without_same_local_as_remote(closed);
        self.sorted(kept)
    }

    fn default_branch(&self) -> Option<BranchIdx> {
        self.repo.current_branch().or_else(|| {
            FALLBACK_BRANCH_NAMES
                .iter()
                .find_map(|name| self.repo.branch_by_name(name))
        })
    }

    /// Add ancestors root first and counterparts right after their branch until stable
    fn close_over(&self, requested: Vec<BranchIdx>) -> Vec<BranchIdx> {
        let mut current = requested;
        loop {
            let mut next = Vec::with_capacity(current.len());
            let mut seen = HashSet::new();
            let mut push = |branch: BranchIdx, next: &mut Vec<BranchIdx>| {
                if seen.insert(branch) {
                    next.push(branch);
                }
            };

            for branch in &current {
                for ancestor in self.repo.ancestors(*branch).into_iter().rev() {
                    push(ancestor, &mut next);
                }
                push(*branch, &mut next);
                if let Some(counterpart) = self.repo.counterpart(*branch) {
                    push(counterpart, &mut next);
                }
            }

            if next.len() == current.len() {
                return next;
            }
            current = next;
        }
    }

    fn without_same_local_as_remote(&self, branches: Vec<BranchIdx>) -> Vec<BranchIdx> {
        if !self.hide_same_local_as_remote {
            return branches;
        }

        let selected = branches.iter().copied().collect::<HashSet<_>>();
        branches
            .into_iter()
            .filter(|branch| {
                let b = self.repo.branch(*branch);
                if b.is_remote || (self.is_dirty && b.is_current) {
                    return true;
                }
                !b.remote_name
                    .as_deref()
                    .and_then(|name| self.repo.branch_by_name(name))
                    .is_some_and(|remote| {
                        selected.contains(&remote) && self.repo.branch(remote).tip == b.tip
                    })
            })
            .collect()
    }

    /// Stable sort of the closed list, which already has every branch after its ancestors
    fn sorted(&self, branches: Vec<BranchIdx>) -> Vec<BranchIdx> {
        let position = branches
            .iter()
            .enumerate()
            .map(|(index, branch)| (*branch, index))
            .collect::<HashMap<_, _>>();
        let mut keyed = branches
            .iter()
            .map(|branch| (self.sort_key(*branch, &position), *branch))
            .collect::<Vec<_>>();
        keyed.sort_by_key(|(key, _)| *key);
        keyed.into_iter().map(|(_, branch)| branch).collect()
    }

    /// `(priority rank, insertion position, is local)` of the branch's group anchor
    ///
    /// A local branch is anchored on its shown remote, so the remote sorts first and
    /// the local lands right behind it.
    fn sort_key(
        &self,
        branch: BranchIdx,
        position: &HashMap<BranchIdx, usize>,
    ) -> (usize, usize, bool) {
        let remote = (!self.repo.branch(branch).is_remote)
            .then(|| self.repo.counterpart(branch))
            .flatten()
            .filter(|remote| position.contains_key(remote));
        let anchor = remote.unwrap_or(branch);

        (
            self.rank(&self.repo.branch(anchor).name),
            position[&anchor],
            remote.is_some(),
        )
    }

    fn rank(&self, name: &str) -> usize {
        self.priority
            .iter()
            .position(|priority| priority == name)
            .unwrap_or(self.priority.len())
    }
}

/// Names after expanding a commit's hidden connections
///
/// Adds the merge parent's branch, the branches of children shown nowhere and branches
/// sitting on the commit that fork from its branch. Commits without hidden connections
/// leave the list as is.
pub fn open_branch(view: &ViewRepo, names: &[String], index: usize) -> Result<Vec<String>> {
    let row = view.commits.get(index).ok_or(EngineError::OutOfRange {
        index,
        len: view.commits.len(),
    })?;
    let mut names = names.to_vec();
    let Some(commit) = row.source.filter(|_| row.is_more) else {
        return Ok(names);
    };

    let repo = view.repo();
    let c = repo.commit(commit);
    let mut opened = Vec::new();
    opened.extend(c.merge_parent.and_then(|parent| repo.owner(parent)));
    opened.extend(
        c.children
            .iter()
            .chain(&c.merge_children)
            .filter_map(|child| repo.owner(*child)),
    );
    opened.extend(repo.branch_indices().filter(|branch| {
        let b = repo.branch(*branch);
        b.tip == commit
            && b.parent.is_some()
            && b.parent == c.branch
            && !sits_on_shown_counterpart(view, *branch)
    }));

    for branch in opened {
        if view.is_shown(branch) {
            continue;
        }
        let name = &repo.branch(branch).name;
        if !names.contains(name) {
            names.push(name.clone());
        }
    }
    Ok(names)
}

fn sits_on_shown_counterpart(view: &ViewRepo, branch: BranchIdx) -> bool {
    let repo = view.repo();
    repo.counterpart(branch).is_some_and(|other| {
        view.is_shown(other) && repo.branch(other).tip == repo.branch(branch).tip
    })
}

/// Names after hiding the branch of the commit at `index`
pub fn close_branch(view: &ViewRepo, names: &[String], index: usize) -> Result<Vec<String>> {
    let row = view.commits.get(index).ok_or(EngineError::OutOfRange {
        index,
        len: view.commits.len(),
    })?;
    let Some(branch) = view
        .branches
        .get(row.branch_column)
        .map(|branch| branch.source)
    else {
        return Ok(names.to_vec());
    };
    Ok(hide(view, names, branch))
}

/// Names after adding `name`; unknown names leave the list as is
pub fn show_branch(view: &ViewRepo, names: &[String], name: &str) -> Vec<String> {
    let mut names = names.to_vec();
    match view.repo().resolve_branch(name) {
        Some(branch) => {
            let name = &view.repo().branch(branch).name;
            if !names.contains(name) {
                names.push(name.clone());
            }
        }
        None => tracing::debug!("{}", EngineError::UnknownBranch(name.to_string())),
    }
    names
}

/// Names after hiding `name`, its counterpart and its descendants
pub fn hide_branch(view: &ViewRepo, names: &[String], name: &str) -> Vec<String> {
    match view.repo().resolve_branch(name) {
        Some(branch) => hide(view, names, branch),
        None => {
            tracing::debug!("{}", EngineError::UnknownBranch(name.to_string()));
            names.to_vec()
        }
    }
}

fn hide(view: &ViewRepo, names: &[String], branch: BranchIdx) -> Vec<String> {
    let repo = view.repo();
    let listed = names
        .iter()
        .filter_map(|name| repo.resolve_branch(name))
        .chain(view.branches.iter().map(|shown| shown.source))
        .collect::<HashSet<_>>();
    let target = match repo.counterpart(branch) {
        Some(remote) if !repo.branch(branch).is_remote && listed.contains(&remote) => remote,
        _ => branch,
    };
    if ROOT_BRANCH_NAMES.contains(repo.branch(branch).name.as_str())
        || ROOT_BRANCH_NAMES.contains(repo.branch(target).name.as_str())
    {
        tracing::debug!(branch = %repo.branch(target).name, "root branch stays shown");
        return names.to_vec();
    }

    let mut removed = HashSet::from([target]);
    removed.extend(repo.counterpart(target));
    let descendants = listed
        .iter()
        .copied()
        .filter(|listed| removed.iter().any(|r| repo.is_ancestor(*r, *listed)))
        .collect::<Vec<_>>();
    removed.extend(descendants);
    let paired = listed
        .iter()
        .copied()
        .filter(|listed| {
            repo.counterpart(*listed)
                .is_some_and(|other| removed.contains(&other))
        })
        .collect::<Vec<_>>();
    removed.extend(paired);

    names
        .iter()
        .filter(|name| {
            !repo
                .resolve_branch(name)
                .is_some_and(|branch| removed.contains(&branch))
        })
        .cloned()
        .collect()
}
