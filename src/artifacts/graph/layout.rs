//! Graph layout
//!
//! Turns an assigned [`Repo`] and a list of selected branches into a [`ViewRepo`]. Every
//! selected branch gets a column; every displayed row gets one [`GraphColumn`] per
//! column. Drawing happens in two passes:
//!
//! 1. each branch walks from its tip along first parents it owns and marks `tip`,
//!    `commit` and `bottom` cells
//! 2. each row draws connectors to parents on other branches (merges and branch-outs)
//!    and, in the columns of other branches, the lines that run past it
//!
//! ```text
//! ┣   ╮    c4  Merge branch 'feat' into main
//! ┣   │    c3
//! ┣   │    c2
//! ┃   ┏    x2
//! ┃   ┣    x1
//! ┗   ╯    c1
//! ```

use crate::artifacts::graph::glyph::{Glyph, GraphColumn, More};
use crate::artifacts::graph::repo::{BranchIdx, CommitIdx, Repo};
use crate::artifacts::graph::view_repo::{ViewBranch, ViewCommit, ViewRepo};
use crate::artifacts::objects::SHORT_ID_LENGTH;
use crate::artifacts::objects::commit_id::CommitId;
use crate::artifacts::status::status_info::Status;
use std::collections::HashSet;
use std::sync::Arc;

/// Commits walked from a tip when looking for unpushed or unpulled work
const MAX_AHEAD_BEHIND_COMMITS: usize = 50;

#[derive(Debug, Clone, Copy)]
struct Row {
    /// `None` for the uncommitted-changes row
    source: Option<CommitIdx>,
    column: usize,
}

#[derive(Debug, Clone, Copy, Default)]
struct Span {
    tip_row: Option<usize>,
    bottom_row: Option<usize>,
}

pub struct GraphLayout<'a> {
    repo: &'a Repo,
    status: &'a Status,
    selected: &'a [BranchIdx],
    columns: Vec<Option<usize>>,
    rows: Vec<Row>,
    row_of: Vec<Option<usize>>,
    spans: Vec<Span>,
    cells: Vec<Vec<GraphColumn>>,
    status_column: Option<usize>,
}

impl<'a> GraphLayout<'a> {
    pub fn new(repo: &'a Repo, status: &'a Status, selected: &'a [BranchIdx]) -> Self {
        let mut columns = vec![None; repo.branches().len()];
        for (column, branch) in selected.iter().enumerate() {
            columns[branch.index()] = Some(column);
        }

        let status_column = repo
            .current_branch()
            .and_then(|current| columns[current.index()])
            .filter(|_| !status.is_clean());

        let mut rows = Vec::new();
        if let Some(column) = status_column {
            rows.push(Row {
                source: None,
                column,
            });
        }
        let mut row_of = vec![None; repo.commits().len()];
        for commit in repo.commit_indices() {
            let Some(column) = repo.owner(commit).and_then(|owner| columns[owner.index()])
            else {
                continue;
            };
            row_of[commit.index()] = Some(rows.len());
            rows.push(Row {
                source: Some(commit),
                column,
            });
        }

        GraphLayout {
            repo,
            status,
            selected,
            columns,
            cells: vec![vec![GraphColumn::default(); selected.len()]; rows.len()],
            rows,
            row_of,
            spans: vec![Span::default(); selected.len()],
            status_column,
        }
    }

    /// Lay out the selected branches and build the published snapshot
    pub fn build(mut self, repo: Arc<Repo>) -> ViewRepo {
        self.set_spans();
        self.draw_branches();
        self.draw_connectors();

        let mut branches = self.view_branches();
        let mut commits = self.view_commits();
        self.set_ahead_behind(&mut branches, &mut commits);

        tracing::debug!(
            rows = commits.len(),
            columns = branches.len(),
            "graph laid out"
        );

        ViewRepo {
            working_folder: self.repo.path().to_path_buf(),
            graph_width: 2 * branches.len(),
            current_branch_name: self
                .repo
                .current_branch()
                .map(|current| self.repo.branch(current).name.clone()),
            uncommitted_changes: self.status.all_changes(),
            conflicts: self.status.conflicted,
            is_merging: self.status.is_merging,
            merge_message: self.status.merge_message.clone(),
            status: self.status.clone(),
            commits,
            branches,
            repo,
        }
    }

    fn set_spans(&mut self) {
        for (column, branch) in self.selected.iter().enumerate() {
            let b = self.repo.branch(*branch);
            self.spans[column] = Span {
                tip_row: self.row_of[b.tip.index()],
                bottom_row: b.bottom.and_then(|bottom| self.row_of[bottom.index()]),
            };
        }

        if let Some(column) = self.status_column {
            let current = self.selected[column];
            let tip = self.repo.branch(current).tip;
            let span = &mut self.spans[column];
            span.tip_row = Some(0);
            if self.repo.owner(tip) != Some(current) {
                span.bottom_row = Some(0);
            }
        }
    }

    /// Row of the first parent; the status row's parent is the current tip
    fn parent_row(&self, row: usize) -> Option<usize> {
        match self.rows[row].source {
            Some(commit) => self
                .repo
                .parent(commit, 0)
                .and_then(|parent| self.row_of[parent.index()]),
            None => {
                let current = self.selected[self.rows[row].column];
                self.row_of[self.repo.branch(current).tip.index()]
            }
        }
    }

    fn merge_parent_row(&self, row: usize) -> Option<usize> {
        self.rows[row]
            .source
            .and_then(|commit| self.repo.parent(commit, 1))
            .and_then(|parent| self.row_of[parent.index()])
    }

    fn draw_branches(&mut self) {
        for column in 0..self.selected.len() {
            let Span {
                tip_row: Some(tip_row),
                bottom_row,
            } = self.spans[column]
            else {
                continue;
            };
            let is_git_branch = self.repo.branch(self.selected[column]).is_git_branch();

            let mut row = tip_row;
            loop {
                if self.rows[row].column != column {
                    break;
                }
                let glyph = if row == tip_row && is_git_branch {
                    Glyph::TIP | Glyph::ACTIVE_TIP
                } else if row == tip_row {
                    Glyph::TIP
                } else if Some(row) == bottom_row {
                    Glyph::BOTTOM
                } else {
                    Glyph::COMMIT
                };
                self.cells[row][column].branch |= glyph;

                match self.parent_row(row) {
                    Some(parent) if self.rows[parent].column == column => row = parent,
                    _ => break,
                }
            }
        }
    }

    fn draw_connectors(&mut self) {
        for row in 0..self.rows.len() {
            if self.rows[row].source.is_none() {
                continue;
            }
            let own = self.rows[row].column;

            for column in 0..self.selected.len() {
                if column == own {
                    if let Some(merge_parent) = self.merge_parent_row(row) {
                        let target = self.rows[merge_parent].column;
                        self.draw_link(row, own, merge_parent, target);
                    }
                    if let Some(parent) = self.parent_row(row) {
                        let target = self.rows[parent].column;
                        self.draw_link(row, own, parent, target);
                    }
                    continue;
                }

                let span = self.spans[column];
                if span.tip_row == Some(row) {
                    self.cells[row][column].branch |= Glyph::BOTTOM | Glyph::PASS;
                    for between in own + 1..=column {
                        self.mark_pass(row, between);
                    }
                } else if let (Some(tip_row), Some(bottom_row)) = (span.tip_row, span.bottom_row)
                    && tip_row <= row
                    && row <= bottom_row
                {
                    self.cells[row][column].branch |= Glyph::LINE;
                }
            }
        }
    }

    /// Connect `row` in column `from` with `target_row` in column `to`
    fn draw_link(&mut self, row: usize, from: usize, target_row: usize, to: usize) {
        if to < from {
            let cell = &mut self.cells[row][from];
            cell.branch |= Glyph::MERGE_LEFT;
            cell.connect |= Glyph::MERGE_LEFT;
            for between in to + 1..from {
                self.mark_pass(target_row, between);
            }
            for between in row + 1..target_row {
                self.cells[between][from].connect |= Glyph::MLINE;
            }
            self.cells[target_row][from].connect |= Glyph::BRANCH_RIGHT;
        } else if to > from {
            self.cells[row][to].connect |= Glyph::MERGE_RIGHT;
            for between in from + 1..to {
                self.mark_pass(row, between);
            }
            for between in row + 1..target_row {
                self.cells[between][to].connect |= Glyph::MLINE;
            }
            let cell = &mut self.cells[target_row][to];
            cell.branch |= Glyph::BRANCH_LEFT;
            cell.connect |= Glyph::BRANCH_LEFT;
        }
    }

    fn mark_pass(&mut self, row: usize, column: usize) {
        let cell = &mut self.cells[row][column];
        cell.branch |= Glyph::PASS;
        cell.connect |= Glyph::PASS;
    }

    fn view_branches(&self) -> Vec<ViewBranch> {
        self.selected
            .iter()
            .enumerate()
            .map(|(column, branch)| {
                let b = self.repo.branch(*branch);
                let has_status = self.status_column == Some(column);
                let tip_id = if has_status {
                    CommitId::uncommitted()
                } else {
                    self.repo.commit(b.tip).id.clone()
                };
                let bottom_id = match self.spans[column].bottom_row {
                    Some(0) if has_status => CommitId::uncommitted(),
                    _ => self.repo.commit(b.bottom.unwrap_or(b.tip)).id.clone(),
                };

                ViewBranch {
                    name: b.name.clone(),
                    display_name: b.display_name.clone(),
                    column,
                    kind: b.kind,
                    tip_id,
                    bottom_id,
                    parent_branch_name: b
                        .parent
                        .map(|parent| self.repo.branch(parent).name.clone()),
                    is_remote: b.is_remote,
                    is_current: b.is_current,
                    is_git_branch: b.is_git_branch(),
                    is_multi_branch: b.is_multi_branch(),
                    is_named_branch: b.is_named_branch(),
                    remote_name: b.remote_name.clone(),
                    local_name: b.local_name.clone(),
                    has_local_only: false,
                    has_remote_only: false,
                    source: *branch,
                }
            })
            .collect()
    }

    fn view_commits(&self) -> Vec<ViewCommit> {
        let shown_names = self
            .selected
            .iter()
            .map(|branch| self.repo.branch(*branch).name.as_str())
            .collect::<HashSet<_>>();

        self.rows
            .iter()
            .enumerate()
            .map(|(row, r)| {
                let branch = self.repo.branch(self.selected[r.column]);
                let graph = self.cells[row].clone();
                match r.source {
                    Some(commit) => {
                        let c = self.repo.commit(commit);
                        let more = self.more_marks(commit, &shown_names);
                        let mut child_ids = c.child_ids.clone();
                        if self.status_column.is_some() && self.parent_row(0) == Some(row) {
                            child_ids.insert(0, CommitId::uncommitted());
                        }

                        ViewCommit {
                            id: c.id.clone(),
                            sid: c.sid.clone(),
                            subject: c.subject.clone(),
                            message: c.message.clone(),
                            author: c.author.clone(),
                            author_time: c.author_time,
                            parent_ids: c.parent_ids.clone(),
                            child_ids,
                            is_current: c.is_current,
                            is_uncommitted: false,
                            branch_name: branch.name.clone(),
                            branch_column: r.column,
                            graph,
                            is_more: !more.is_empty(),
                            more,
                            branch_tips: c.branch_tips.clone(),
                            tags: c.tags.clone(),
                            is_local_only: false,
                            is_remote_only: false,
                            source: Some(commit),
                        }
                    }
                    None => self.status_commit(branch.name.clone(), r.column, graph),
                }
            })
            .collect()
    }

    fn status_commit(
        &self,
        branch_name: String,
        column: usize,
        graph: Vec<GraphColumn>,
    ) -> ViewCommit {
        let tip = self.repo.commit(self.repo.branch(self.selected[column]).tip);
        let subject = self.status.uncommitted_subject();
        let id = CommitId::uncommitted();

        ViewCommit {
            sid: id.as_ref()[..SHORT_ID_LENGTH].to_string(),
            id,
            message: subject.clone(),
            subject,
            author: String::new(),
            author_time: tip.author_time,
            parent_ids: vec![tip.id.clone()],
            child_ids: Vec::new(),
            is_current: false,
            is_uncommitted: true,
            branch_name,
            branch_column: column,
            graph,
            more: More::empty(),
            is_more: false,
            branch_tips: Vec::new(),
            tags: Vec::new(),
            is_local_only: false,
            is_remote_only: false,
            source: None,
        }
    }

    fn more_marks(&self, commit: CommitIdx, shown_names: &HashSet<&str>) -> More {
        let c = self.repo.commit(commit);
        let is_hidden = |other: CommitIdx| self.row_of[other.index()].is_none();
        let mut more = More::empty();

        if c.merge_parent.is_some_and(is_hidden) {
            more |= More::MERGE_IN;
        }
        if c.children.iter().chain(&c.merge_children).copied().any(is_hidden) {
            more |= More::BRANCH_OUT;
        } else if c.branch_tips.iter().any(|name| {
            !shown_names.contains(name.as_str()) && !self.is_same_as_shown_remote(name)
        }) {
            more |= More::BRANCH_OUT;
        }

        more
    }

    /// A hidden local branch sitting on the tip of its shown remote
    fn is_same_as_shown_remote(&self, name: &str) -> bool {
        let Some(branch) = self.repo.branch_by_name(name) else {
            return false;
        };
        self.repo.counterpart(branch).is_some_and(|remote| {
            self.columns[remote.index()].is_some()
                && self.repo.branch(remote).tip == self.repo.branch(branch).tip
        })
    }

    fn set_ahead_behind(&self, branches: &mut [ViewBranch], commits: &mut [ViewCommit]) {
        for (column, branch) in self.selected.iter().enumerate() {
            let b = self.repo.branch(*branch);
            let Some(counterpart) = self
                .repo
                .counterpart(*branch)
                .filter(|other| self.columns[other.index()].is_some())
            else {
                continue;
            };

            if !b.is_remote {
                let walked = self.own_chain(*branch, |_| false);
                for row in walked.iter().filter_map(|c| self.row_of[c.index()]) {
                    commits[row].is_local_only = true;
                    branches[column].has_local_only = true;
                }
                continue;
            }

            let local = self.repo.branch(counterpart);
            let local_tip = local.tip;
            let local_base = local
                .bottom
                .and_then(|bottom| self.repo.parent(bottom, 0));
            let walked = self.own_chain(*branch, |c| {
                c == local_tip
                    || Some(c) == local_base
                    || self
                        .repo
                        .commit(c)
                        .merge_parent
                        .is_some_and(|parent| self.repo.owner(parent) == Some(counterpart))
            });
            for row in walked.iter().filter_map(|c| self.row_of[c.index()]) {
                commits[row].is_remote_only = true;
                branches[column].has_remote_only = true;
            }
        }
    }

    /// Commits owned by `branch` from its tip down, stopping before `stop` matches
    fn own_chain(&self, branch: BranchIdx, stop: impl Fn(CommitIdx) -> bool) -> Vec<CommitIdx> {
        let mut chain = Vec::new();
        let mut current = Some(self.repo.branch(branch).tip);

        while let Some(commit) = current {
            if chain.len() >= MAX_AHEAD_BEHIND_COMMITS
                || self.repo.owner(commit) != Some(branch)
                || stop(commit)
            {
                break;
            }
            chain.push(commit);
            current = self.repo.parent(commit, 0);
        }

        chain
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::artifacts::branch::git_branch::GitBranch;
    use crate::artifacts::graph::assignment::BranchAssigner;
    use crate::artifacts::graph::repo::tests::{commit, id};
    use crate::artifacts::objects::commit::GitCommit;
    use pretty_assertions::assert_eq;

    fn assigned(log: Vec<GitCommit>, refs: Vec<GitBranch>) -> Repo {
        let mut repo = Repo::new("/repo", log, refs, vec![]).unwrap();
        BranchAssigner::new(vec!["main".to_string()])
            .assign(&mut repo)
            .unwrap();
        repo
    }

    fn layout(repo: Repo, status: &Status, names: &[&str]) -> ViewRepo {
        let selected = names
            .iter()
            .map(|name| repo.branch_by_name(name).unwrap())
            .collect::<Vec<_>>();
        let repo = Arc::new(repo);
        GraphLayout::new(&repo, status, &selected).build(Arc::clone(&repo))
    }

    fn merged() -> Repo {
        assigned(
            vec![
                commit("c4", &["c3", "x2"], "Merge branch 'feat' into main"),
                commit("c3", &["c2"], "three"),
                commit("c2", &["c1"], "two"),
                commit("x2", &["x1"], "feat two"),
                commit("x1", &["c1"], "feat one"),
                commit("c1", &[], "one"),
            ],
            vec![GitBranch::local("main", id("c4")).with_current(true)],
        )
    }

    fn cell(view: &ViewRepo, row: usize, column: usize) -> GraphColumn {
        view.commits[row].graph[column]
    }

    #[test]
    fn linear_branch_has_no_connectors() {
        let repo = assigned(
            vec![
                commit("c3", &["c2"], "three"),
                commit("c2", &["c1"], "two"),
                commit("c1", &[], "one"),
            ],
            vec![GitBranch::local("main", id("c3")).with_current(true)],
        );
        let view = layout(repo, &Status::default(), &["main"]);

        assert_eq!(view.graph_width, 2);
        assert_eq!(cell(&view, 0, 0).branch, Glyph::TIP | Glyph::ACTIVE_TIP);
        assert_eq!(cell(&view, 1, 0).branch, Glyph::COMMIT);
        assert_eq!(cell(&view, 2, 0).branch, Glyph::BOTTOM);
        assert!(view.commits.iter().all(|c| c.graph[0].connect.is_empty()));
    }

    #[test]
    fn merge_from_the_right_draws_merge_and_branch_out() {
        let view = layout(merged(), &Status::default(), &["main", "feat:x2"]);

        let ids = view
            .commits
            .iter()
            .map(|c| c.id.to_string())
            .collect::<Vec<_>>();
        assert_eq!(ids, vec!["c4", "c3", "c2", "x2", "x1", "c1"]);
        assert_eq!(cell(&view, 0, 1).connect, Glyph::MERGE_RIGHT);
        assert_eq!(cell(&view, 1, 1).connect, Glyph::MLINE);
        assert_eq!(cell(&view, 2, 1).connect, Glyph::MLINE);
        assert!(cell(&view, 3, 1).branch.contains(Glyph::BRANCH_LEFT));
        assert!(cell(&view, 3, 1).branch.contains(Glyph::TIP));
        assert!(!cell(&view, 3, 1).branch.contains(Glyph::ACTIVE_TIP));
        assert_eq!(cell(&view, 4, 1).branch, Glyph::BOTTOM | Glyph::MERGE_LEFT);
        assert_eq!(cell(&view, 5, 1).connect, Glyph::BRANCH_RIGHT);
        assert_eq!(cell(&view, 3, 0).branch, Glyph::LINE);
    }

    #[test]
    fn hidden_merge_parent_is_marked() {
        let view = layout(merged(), &Status::default(), &["main"]);

        assert_eq!(view.commits.len(), 4);
        assert_eq!(view.commits[0].more, More::MERGE_IN);
        assert!(view.commits[0].is_more);
        assert_eq!(view.commits[3].more, More::BRANCH_OUT);
        assert!(!view.commits[1].is_more);
    }

    #[test]
    fn dirty_tree_adds_a_status_row() {
        let status = Status {
            modified: 2,
            ..Status::default()
        };
        let view = layout(merged(), &status, &["main"]);

        let first = &view.commits[0];
        assert!(first.id.is_uncommitted());
        assert_eq!(first.subject, "2 uncommitted changes");
        assert_eq!(first.parent_ids, vec![id("c4")]);
        assert!(first.graph[0].connect.is_empty());
        assert_eq!(first.graph[0].branch, Glyph::TIP | Glyph::ACTIVE_TIP);
        assert_eq!(view.commits[1].graph[0].branch, Glyph::COMMIT);
        assert_eq!(view.commits[1].child_ids[0], CommitId::uncommitted());
        assert_eq!(view.branches[0].tip_id, CommitId::uncommitted());
        assert_eq!(view.uncommitted_changes, 2);
    }

    #[test]
    fn branch_sitting_on_another_branch_passes_across() {
        let repo = assigned(
            vec![commit("c2", &["c1"], "two"), commit("c1", &[], "one")],
            vec![
                GitBranch::local("main", id("c2")).with_current(true),
                GitBranch::local("topic", id("c1")),
            ],
        );
        let view = layout(repo, &Status::default(), &["main", "topic"]);

        assert_eq!(view.commits.len(), 2);
        assert_eq!(cell(&view, 1, 1).branch, Glyph::BOTTOM | Glyph::PASS);
        assert_eq!(cell(&view, 1, 1).connect, Glyph::PASS);
    }

    #[test]
    fn local_commits_are_marked_ahead_of_the_remote() {
        let repo = assigned(
            vec![
                commit("c3", &["c2"], "local work"),
                commit("c2", &["c1"], "pushed"),
                commit("c1", &[], "one"),
            ],
            vec![
                GitBranch::local("main", id("c3"))
                    .with_current(true)
                    .with_remote_name("origin/main"),
                GitBranch::remote("origin/main", id("c2")),
            ],
        );
        let view = layout(repo, &Status::default(), &["origin/main", "main"]);

        assert!(view.commits[0].is_local_only);
        assert!(!view.commits[1].is_local_only);
        assert!(!view.commits.iter().any(|c| c.is_remote_only));
        assert!(view.branches[1].has_local_only);
        assert!(!view.branches[0].has_remote_only);
    }
}
