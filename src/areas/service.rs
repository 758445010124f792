//! Engine API
//!
//! [`RepoService`] keeps one coordinator (and one folder monitor) per open repository,
//! addressed by a [`RepoId`]. Reads go straight to the latest published snapshot;
//! selection changes and refreshes are forwarded to the coordinator.

use crate::areas::config::{ConfigStore, EngineOptions};
use crate::areas::coordinator::{Coordinator, CoordinatorHandle, RepoChange};
use crate::areas::monitor::FolderMonitor;
use crate::areas::vcs::{GitCli, VcsAdapter};
use crate::artifacts::graph::view_repo::{CommitDetails, ViewPort, ViewRepo};
use crate::artifacts::objects::commit_id::CommitId;
use crate::errors::{EngineError, Result};
use serde::Serialize;
use std::collections::HashMap;
use std::fmt;
use std::path::Path;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::{mpsc, watch};
use tokio::task::JoinHandle;

pub const CHANGE_POLL_TIMEOUT: Duration = Duration::from_secs(60);
const EVENT_BUFFER: usize = 16;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
pub struct RepoId(u64);

impl RepoId {
    pub fn value(self) -> u64 {
        self.0
    }
}

impl fmt::Display for RepoId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Outcome of one long poll
#[derive(Debug, Clone)]
pub enum Notification {
    Changed(RepoChange),
    TimedOut,
    /// The repository was closed
    Closed,
}

/// Long-polling view of a repository's change stream
#[derive(Debug)]
pub struct ChangeSubscription {
    changes: watch::Receiver<RepoChange>,
    timeout: Duration,
}

impl ChangeSubscription {
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    /// Wait for a notification newer than the last one returned
    pub async fn next(&mut self) -> Notification {
        match tokio::time::timeout(self.timeout, self.changes.changed()).await {
            Ok(Ok(())) => Notification::Changed(self.changes.borrow_and_update().clone()),
            Ok(Err(_)) => Notification::Closed,
            Err(_) => Notification::TimedOut,
        }
    }
}

struct OpenRepo {
    coordinator: CoordinatorHandle,
    monitor: Option<JoinHandle<()>>,
}

pub struct RepoService {
    options: EngineOptions,
    store: Option<ConfigStore>,
    repos: HashMap<RepoId, OpenRepo>,
    next_id: u64,
}

impl RepoService {
    pub fn new(options: EngineOptions) -> Self {
        RepoService {
            options,
            store: None,
            repos: HashMap::new(),
            next_id: 1,
        }
    }

    /// Remember recent folders and shown branches in `store`
    pub fn with_config_store(mut self, store: ConfigStore) -> Self {
        self.store = Some(store);
        self
    }

    /// Open the git working tree containing `path` and watch it for changes
    pub async fn open_repo(&mut self, path: impl AsRef<Path>) -> Result<RepoId> {
        let path = path.as_ref().to_path_buf();
        let vcs = tokio::task::spawn_blocking(move || GitCli::open(path))
            .await
            .map_err(|error| EngineError::vcs_unavailable(error.into()))??;
        let root = vcs.repo_path().to_path_buf();

        if let Some(store) = &self.store {
            let recent = root.clone();
            if let Err(error) = store.update(|config| config.add_recent_folder(recent)) {
                tracing::warn!(%error, "recent folders not saved");
            }
        }

        let (events, receiver) = mpsc::channel(EVENT_BUFFER);
        let interval = self.options.monitor_interval();
        let monitor = tokio::task::spawn_blocking(move || FolderMonitor::new(root))
            .await
            .map_err(|error| EngineError::vcs_unavailable(error.into()))?
            .spawn(interval, events);

        let coordinator = self
            .coordinator(Arc::new(vcs))
            .with_events(receiver)
            .spawn();
        Ok(self.insert(coordinator, Some(monitor)))
    }

    /// Open a repository served by `vcs`, without a folder monitor
    pub fn open_with(&mut self, vcs: Arc<dyn VcsAdapter>) -> RepoId {
        let coordinator = self.coordinator(vcs).spawn();
        self.insert(coordinator, None)
    }

    pub async fn close_repo(&mut self, id: RepoId) -> Result<()> {
        let repo = self.repos.remove(&id).ok_or(EngineError::UnknownRepo(id.0))?;
        if let Some(monitor) = repo.monitor {
            monitor.abort();
        }
        repo.coordinator.shutdown().await;
        tracing::info!(%id, "repository closed");
        Ok(())
    }

    pub fn subscribe_changes(&self, id: RepoId) -> Result<ChangeSubscription> {
        Ok(ChangeSubscription {
            changes: self.handle(id)?.subscribe(),
            timeout: CHANGE_POLL_TIMEOUT,
        })
    }

    pub async fn trigger_refresh(&self, id: RepoId) -> Result<()> {
        self.handle(id)?.trigger_refresh().await;
        Ok(())
    }

    pub async fn show_branch(&self, id: RepoId, name: &str) -> Result<()> {
        self.handle(id)?.show_branch(name).await;
        Ok(())
    }

    pub async fn hide_branch(&self, id: RepoId, name: &str) -> Result<()> {
        self.handle(id)?.hide_branch(name).await;
        Ok(())
    }

    pub async fn open_branch(&self, id: RepoId, index: usize) -> Result<()> {
        self.handle(id)?.open_branch(index).await;
        Ok(())
    }

    pub async fn close_branch(&self, id: RepoId, index: usize) -> Result<()> {
        self.handle(id)?.close_branch(index).await;
        Ok(())
    }

    pub async fn current_branch_names(&self, id: RepoId) -> Result<Vec<String>> {
        Ok(self.handle(id)?.current_branch_names().await)
    }

    /// Latest snapshot, even when the last refresh failed
    pub fn current_view(&self, id: RepoId) -> Result<Arc<ViewRepo>> {
        let change = self.handle(id)?.latest();
        if let Some(view) = &change.view {
            return Ok(Arc::clone(view));
        }
        change.into_view()
    }

    pub fn get_repo_view_port(
        &self,
        id: RepoId,
        first_index: usize,
        count: usize,
    ) -> Result<ViewPort> {
        Ok(self.current_view(id)?.view_port(first_index, count))
    }

    pub fn get_commit_details(&self, id: RepoId, commit_id: &str) -> Result<CommitDetails> {
        let commit_id = CommitId::try_parse(commit_id)
            .map_err(|_| EngineError::UnknownCommit(commit_id.to_string()))?;
        self.current_view(id)?.commit_details(&commit_id)
    }

    pub fn search_commits(&self, id: RepoId, text: &str) -> Result<Vec<CommitDetails>> {
        Ok(self.current_view(id)?.search(text))
    }

    /// Stop every coordinator
    pub async fn shutdown(&mut self) {
        let ids = self.repos.keys().copied().collect::<Vec<_>>();
        for id in ids {
            let _ = self.close_repo(id).await;
        }
    }

    fn coordinator(&self, vcs: Arc<dyn VcsAdapter>) -> Coordinator {
        let coordinator = Coordinator::new(vcs, self.options.clone());
        match &self.store {
            Some(store) => coordinator.with_config_store(store.clone()),
            None => coordinator,
        }
    }

    fn insert(
        &mut self,
        coordinator: CoordinatorHandle,
        monitor: Option<JoinHandle<()>>,
    ) -> RepoId {
        let id = RepoId(self.next_id);
        self.next_id += 1;
        self.repos.insert(id, OpenRepo { coordinator, monitor });
        tracing::info!(%id, "repository opened");
        id
    }

    fn handle(&self, id: RepoId) -> Result<&CoordinatorHandle> {
        self.repos
            .get(&id)
            .map(|repo| &repo.coordinator)
            .ok_or(EngineError::UnknownRepo(id.0))
    }
}
