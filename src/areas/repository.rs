use crate::areas::config::{Config, ConfigStore, EngineOptions};
use crate::areas::vcs::{GitCli, VcsAdapter};
use crate::artifacts::graph::GraphEngine;
use crate::artifacts::graph::view_repo::ViewRepo;
use std::cell::{Ref, RefCell, RefMut};
use std::path::Path;

/// Command line front end over one working tree
///
/// Commands are implemented as `impl Repository` blocks under `commands/` and write
/// through [`Repository::writer`], which is stdout, the pager or a test buffer.
pub struct Repository {
    vcs: GitCli,
    engine: RefCell<GraphEngine>,
    store: ConfigStore,
    config: RefCell<Config>,
    writer: RefCell<Box<dyn std::io::Write>>,
}

impl Repository {
    pub fn new(
        path: &Path,
        store: ConfigStore,
        writer: Box<dyn std::io::Write>,
    ) -> anyhow::Result<Self> {
        let config = store.load()?;
        let vcs = GitCli::open(path)?;

        Ok(Repository {
            engine: RefCell::new(GraphEngine::new(config.settings.clone())),
            vcs,
            store,
            config: RefCell::new(config),
            writer: RefCell::new(writer),
        })
    }

    pub fn path(&self) -> &Path {
        self.vcs.repo_path()
    }

    pub fn vcs(&self) -> &GitCli {
        &self.vcs
    }

    pub fn store(&self) -> &ConfigStore {
        &self.store
    }

    pub fn config(&self) -> Ref<'_, Config> {
        self.config.borrow()
    }

    pub fn options(&self) -> EngineOptions {
        self.config.borrow().settings.clone()
    }

    pub fn writer(&'_ self) -> RefMut<'_, Box<dyn std::io::Write>> {
        self.writer.borrow_mut()
    }

    /// Branches shown the last time this working tree was viewed
    pub fn shown_branches(&self) -> Vec<String> {
        self.config.borrow().shown_branches(self.path())
    }

    pub fn remember_shown_branches(&self, names: Vec<String>) -> anyhow::Result<()> {
        let path = self.path().to_path_buf();
        let config = self.store.update(|config| {
            config.add_recent_folder(&path);
            config.set_shown_branches(&path, names);
        })?;
        *self.config.borrow_mut() = config;
        Ok(())
    }

    /// Load the repository and lay out `names`, or the remembered branches when empty
    pub fn view(&self, names: &[String]) -> anyhow::Result<ViewRepo> {
        let names = match names {
            [] => self.shown_branches(),
            names => names.to_vec(),
        };

        let mut engine = self.engine.borrow_mut();
        let repo = engine.load_repo(&self.vcs)?;
        let status = self.vcs.get_status()?;
        Ok(engine.build_view(repo, &status, &names))
    }

    /// Rebuild `view` with another selection, reusing its repository model
    pub fn reselect(&self, view: &ViewRepo, names: &[String]) -> ViewRepo {
        self.engine
            .borrow()
            .build_view(view.repo().clone(), view.status(), names)
    }
}
