//! Repository graph engine
//!
//! - `repo`: commit and branch arenas filled from the adapter output
//! - `assignment`: one owning branch per commit, synthetic branches, hierarchy
//! - `selection`: which branches get a column and in which order
//! - `layout`: per row graph cells for the selected branches
//! - `glyph`: cell bitmasks
//! - `view_repo`: the published snapshot
//!
//! [`GraphEngine`] strings these together. A refresh is split in two steps so that a
//! status change or a new selection can reuse the assigned model:
//!
//! ```text
//! adapter ──build_repo──▶ Arc<Repo> ──build_view(status, names)──▶ ViewRepo
//! ```

pub mod assignment;
pub mod glyph;
pub mod layout;
pub mod repo;
pub mod selection;
pub mod view_repo;

use crate::areas::config::EngineOptions;
use crate::areas::vcs::VcsAdapter;
use crate::artifacts::branch::git_branch::{GitBranch, GitTag};
use crate::artifacts::graph::assignment::BranchAssigner;
use crate::artifacts::graph::layout::GraphLayout;
use crate::artifacts::graph::repo::Repo;
use crate::artifacts::graph::selection::BranchSelector;
use crate::artifacts::graph::view_repo::ViewRepo;
use crate::artifacts::objects::commit::GitCommit;
use crate::artifacts::status::status_info::Status;
use crate::errors::Result;
use std::path::Path;
use std::sync::Arc;
use std::time::Instant;

/// Owns the state kept between refreshes (merge subject cache, options)
#[derive(Debug)]
pub struct GraphEngine {
    assigner: BranchAssigner,
    options: EngineOptions,
}

impl GraphEngine {
    pub fn new(options: EngineOptions) -> Self {
        GraphEngine {
            assigner: BranchAssigner::new(options.branch_priority.clone()),
            options,
        }
    }

    pub fn options(&self) -> &EngineOptions {
        &self.options
    }

    /// Link and assign a model from raw adapter output
    pub fn build_repo(
        &mut self,
        path: impl AsRef<Path>,
        log: Vec<GitCommit>,
        references: Vec<GitBranch>,
        tags: Vec<GitTag>,
    ) -> Result<Repo> {
        let started = Instant::now();
        let mut repo = Repo::new(path, log, references, tags)?;
        self.assigner.assign(&mut repo)?;

        tracing::debug!(
            commits = repo.commits().len(),
            branches = repo.branches().len(),
            elapsed = ?started.elapsed(),
            "repository model built"
        );
        Ok(repo)
    }

    /// Read log, references and tags from the adapter and build the model
    pub fn load_repo(&mut self, vcs: &dyn VcsAdapter) -> Result<Arc<Repo>> {
        let log = vcs.get_log()?;
        let references = vcs.get_branches()?;
        let tags = vcs.get_tags()?;
        self.build_repo(vcs.repo_path(), log, references, tags)
            .map(Arc::new)
    }

    /// Select and lay out the branches named in `names`
    pub fn build_view(&self, repo: Arc<Repo>, status: &Status, names: &[String]) -> ViewRepo {
        let selected = BranchSelector::new(&repo, &self.options.branch_priority)
            .with_hide_same_local_as_remote(self.options.hide_same_local_as_remote)
            .with_dirty_tree(!status.is_clean())
            .select(names);
        let view = GraphLayout::new(&repo, status, &selected).build(Arc::clone(&repo));

        tracing::debug!(branches = ?view.branch_names(), "view built");
        view
    }
}
