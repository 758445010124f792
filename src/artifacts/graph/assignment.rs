//! Branch assignment
//!
//! Every commit ends up owned by exactly one branch. Commits are visited newest first,
//! so by the time a commit is reached all of its children already have an owner. The
//! first rule that fires decides:
//!
//! 1. **Sole candidate**: only one branch can reach the commit
//! 2. **Local/remote pair**: two candidates tracking each other, the remote wins
//! 3. **Deleted tip**: no candidate, no child; a synthetic branch is created, named after
//!    a merge subject when one mentions the commit
//! 4. **Middle of a deleted branch**: no candidate, one child; inherit its branch
//! 5. **Likely inheritance**: one child whose branch was recovered from a subject
//! 6. **Priority reference**: a candidate from the priority list (`main`, `develop`, ...)
//! 7. **Name from a merge subject**: reuse a matching candidate or create a named branch,
//!    taking over the multi-branch commits directly above
//! 8. **Child multi-branch**: reuse the multi-branch of a child
//! 9. **New multi-branch**
//!
//! A settle pass then recomputes tips and bottoms from the final ownership and drops
//! synthetic branches left without commits, and the hierarchy pass links every branch
//! to the branch it forks from.

use crate::artifacts::branch::merge_subject::MergeSubjectParser;
use crate::artifacts::graph::repo::{BranchIdx, CommitIdx, Repo};
use crate::errors::{EngineError, Result};
use std::collections::HashSet;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Rule {
    SoleCandidate,
    LocalRemotePair,
    DeletedTip,
    DeletedMiddle,
    LikelyChild,
    Priority,
    SubjectName,
    ChildMulti,
    NewMulti,
}

/// Assigns owners to commits; keeps the merge subject cache between refreshes
#[derive(Debug)]
pub struct BranchAssigner {
    parser: MergeSubjectParser,
    priority: Vec<String>,
}

impl BranchAssigner {
    pub fn new(priority: Vec<String>) -> Self {
        BranchAssigner {
            parser: MergeSubjectParser::new(),
            priority,
        }
    }

    pub fn priority(&self) -> &[String] {
        &self.priority
    }

    /// Assign every commit of the model to a branch and derive the branch hierarchy
    ///
    /// # Returns
    ///
    /// `GraphInconsistent` when the result breaks the ownership or hierarchy invariants
    pub fn assign(&mut self, repo: &mut Repo) -> Result<()> {
        self.parser.begin_snapshot();

        for commit in repo.commit_indices() {
            let c = repo.commit(commit);
            self.parser.parse_commit(&c.id, &c.parent_ids, &c.subject);

            let (branch, rule) = self.determine_branch(repo, commit)?;
            tracing::trace!(
                commit = %repo.commit(commit).sid,
                branch = %repo.branch(branch).name,
                ?rule,
                "commit assigned"
            );
            repo.commit_mut(commit).branch = Some(branch);
            repo.branch_mut(branch).bottom = Some(commit);
        }

        settle(repo)?;
        set_parent_branches(repo);
        verify(repo)?;

        tracing::debug!(
            commits = repo.commits().len(),
            branches = repo.branches().len(),
            cached_subjects = self.parser.cached_subjects(),
            "branches assigned"
        );
        Ok(())
    }

    fn determine_branch(&self, repo: &mut Repo, commit: CommitIdx) -> Result<(BranchIdx, Rule)> {
        let c = repo.commit(commit);
        let candidates = c.candidates.clone();
        let children = c.children.clone();
        let recovered_name = self.parser.branch_name(&c.id).map(str::to_string);

        if let [branch] = candidates[..] {
            return Ok((branch, Rule::SoleCandidate));
        }

        if let [first, second] = candidates[..]
            && let Some(remote) = remote_of_pair(repo, first, second)
        {
            return Ok((remote, Rule::LocalRemotePair));
        }

        if candidates.is_empty() && children.is_empty() {
            let branch = match &recovered_name {
                Some(name) => repo.add_named_branch(commit, name),
                None => repo.add_id_named_branch(commit),
            };
            repo.commit_mut(commit).add_candidate(branch);
            return Ok((branch, Rule::DeletedTip));
        }

        if candidates.is_empty()
            && let [child] = children[..]
        {
            let branch = owner_of(repo, child)?;
            repo.commit_mut(commit).add_candidate(branch);
            return Ok((branch, Rule::DeletedMiddle));
        }

        if let [child] = children[..]
            && repo.commit(child).is_likely
        {
            let branch = owner_of(repo, child)?;
            repo.commit_mut(commit).is_likely = true;
            return Ok((branch, Rule::LikelyChild));
        }

        if let Some(branch) = self.priority_candidate(repo, &candidates) {
            return Ok((branch, Rule::Priority));
        }

        if let Some(name) = recovered_name {
            let branch = take_over_with_name(repo, commit, &candidates, &name);
            return Ok((branch, Rule::SubjectName));
        }

        if let Some(branch) = children
            .iter()
            .filter_map(|child| repo.owner(*child))
            .find(|branch| repo.branch(*branch).is_multi_branch())
        {
            return Ok((branch, Rule::ChildMulti));
        }

        let branch = repo.add_multi_branch(commit);
        repo.commit_mut(commit).add_candidate(branch);
        Ok((branch, Rule::NewMulti))
    }

    fn priority_candidate(&self, repo: &Repo, candidates: &[BranchIdx]) -> Option<BranchIdx> {
        self.priority.iter().find_map(|name| {
            candidates
                .iter()
                .copied()
                .find(|candidate| repo.branch(*candidate).name == *name)
        })
    }
}

fn owner_of(repo: &Repo, commit: CommitIdx) -> Result<BranchIdx> {
    repo.owner(commit).ok_or_else(|| {
        EngineError::GraphInconsistent(format!(
            "child commit {} has no branch yet",
            repo.commit(commit).id
        ))
    })
}

fn remote_of_pair(repo: &Repo, first: BranchIdx, second: BranchIdx) -> Option<BranchIdx> {
    let (a, b) = (repo.branch(first), repo.branch(second));
    if a.is_remote && b.remote_name.as_deref() == Some(a.name.as_str()) {
        return Some(first);
    }
    if b.is_remote && a.remote_name.as_deref() == Some(b.name.as_str()) {
        return Some(second);
    }
    None
}

/// Rule 7: the commit belongs to the branch a merge subject named
///
/// Single-child multi-branch commits directly above are taken over as well, the topmost
/// of them becoming the tip of the branch.
fn take_over_with_name(
    repo: &mut Repo,
    commit: CommitIdx,
    candidates: &[BranchIdx],
    name: &str,
) -> BranchIdx {
    let mut top = commit;
    while let [child] = repo.commit(top).children[..]
        && repo
            .owner(child)
            .is_some_and(|owner| repo.branch(owner).is_multi_branch())
    {
        top = child;
    }

    let matching = candidates
        .iter()
        .copied()
        .filter(|candidate| {
            let branch = repo.branch(*candidate);
            branch.name == name || branch.display_name == name
        })
        .collect::<Vec<_>>();
    let existing = matching
        .iter()
        .copied()
        .find(|candidate| repo.branch(*candidate).is_remote)
        .or_else(|| matching.first().copied());
    let branch = match existing {
        Some(branch) => branch,
        None => repo.add_named_branch(top, name),
    };

    let stop = repo.commit(commit).first_parent;
    let mut walk = Some(top);
    while let Some(current) = walk {
        if Some(current) == stop {
            break;
        }
        let c = repo.commit_mut(current);
        c.branch = Some(branch);
        c.is_likely = true;
        c.add_candidate(branch);
        if current == commit {
            break;
        }
        walk = c.first_parent;
    }

    branch
}

/// Recompute tips and bottoms from the final ownership, dropping empty synthetic branches
fn settle(repo: &mut Repo) -> Result<()> {
    let count = repo.branches().len();
    let mut newest: Vec<Option<CommitIdx>> = vec![None; count];
    let mut oldest: Vec<Option<CommitIdx>> = vec![None; count];

    for commit in repo.commit_indices() {
        let branch = owner_of(repo, commit)?;
        newest[branch.index()].get_or_insert(commit);
        oldest[branch.index()] = Some(commit);
    }

    let mut keep = Vec::with_capacity(count);
    for branch in repo.branch_indices() {
        let git = repo.branch(branch).is_git_branch();
        let b = repo.branch_mut(branch);
        if !git && let Some(tip) = newest[branch.index()] {
            b.tip = tip;
        }
        b.bottom = oldest[branch.index()];
        keep.push(git || newest[branch.index()].is_some());
    }

    if keep.iter().any(|kept| !kept) {
        tracing::debug!(
            dropped = keep.iter().filter(|kept| !**kept).count(),
            "empty synthetic branches dropped"
        );
        repo.retain_branches(&keep);
    }
    Ok(())
}

/// Link each branch to the branch owning the commit it forks from
fn set_parent_branches(repo: &mut Repo) {
    for branch in repo.branch_indices() {
        let tip = repo.branch(branch).tip;
        let bottom = repo.branch(branch).bottom.unwrap_or(tip);

        let parent = match repo.owner(bottom) {
            Some(owner) if owner != branch => Some(owner),
            _ => repo
                .commit(bottom)
                .first_parent
                .and_then(|parent| repo.owner(parent))
                .filter(|owner| *owner != branch),
        };

        let b = repo.branch_mut(branch);
        b.bottom = Some(bottom);
        b.parent = parent;
    }
}

/// Check ownership, hierarchy acyclicity and local/remote symmetry
pub fn verify(repo: &Repo) -> Result<()> {
    for commit in repo.commits() {
        match commit.branch {
            Some(branch) if branch.index() < repo.branches().len() => {}
            _ => {
                return Err(EngineError::GraphInconsistent(format!(
                    "commit {} has no owning branch",
                    commit.id
                )));
            }
        }
    }

    for branch in repo.branch_indices() {
        let mut visited = HashSet::from([branch]);
        let mut current = repo.branch(branch).parent;
        while let Some(parent) = current {
            if !visited.insert(parent) {
                return Err(EngineError::GraphInconsistent(format!(
                    "parent branch cycle through {}",
                    repo.branch(branch).name
                )));
            }
            current = repo.branch(parent).parent;
        }

        let b = repo.branch(branch);
        if let Some(remote) = &b.remote_name {
            let paired = repo
                .branch_by_name(remote)
                .is_some_and(|r| repo.branch(r).local_name.as_deref() == Some(b.name.as_str()));
            if !paired {
                return Err(EngineError::GraphInconsistent(format!(
                    "branch {} and its remote {} are not paired",
                    b.name, remote
                )));
            }
        }
    }

    Ok(())
}
