//! Change coordinator
//!
//! One actor task per open repository owns the published state and serialises every
//! recomputation:
//!
//! - change events (from the folder monitor) are debounced per kind; the first event of
//!   a burst publishes an `is_starting` notification, expiry starts a refresh
//! - a single worker runs on the blocking pool; requests arriving while it is busy are
//!   coalesced into one follow-up job, a repo refresh subsuming a status refresh and a
//!   status refresh subsuming a view rebuild
//! - snapshots are published on a `watch` channel, so observers only ever see the
//!   latest one and the actor never waits for them
//!
//! ```text
//! monitor ──ChangeEvent──▶ ┌───────┐ ──spawn_blocking──▶ worker (GraphEngine)
//! handle ───Request──────▶ │ actor │ ◀──────────────────  Outcome
//!                          └───────┘ ──watch──▶ observers
//! ```

use crate::areas::config::{ConfigStore, EngineOptions};
use crate::areas::monitor::ChangeEvent;
use crate::areas::vcs::VcsAdapter;
use crate::artifacts::graph::GraphEngine;
use crate::artifacts::graph::repo::Repo;
use crate::artifacts::graph::selection;
use crate::artifacts::graph::view_repo::ViewRepo;
use crate::artifacts::status::status_info::Status;
use crate::errors::{EngineError, Result};
use std::sync::Arc;
use tokio::sync::{mpsc, oneshot, watch};
use tokio::task::{JoinError, JoinHandle};
use tokio::time::Instant;

const REQUEST_BUFFER: usize = 64;

/// What observers receive
#[derive(Debug, Clone, Default)]
pub struct RepoChange {
    /// Increases with every notification
    pub seq: u64,
    /// A refresh is about to start; `view` still holds the previous snapshot
    pub is_starting: bool,
    pub view: Option<Arc<ViewRepo>>,
    pub error: Option<String>,
}

impl RepoChange {
    /// The published snapshot, or the error of the last refresh
    pub fn into_view(self) -> Result<Arc<ViewRepo>> {
        match (self.view, self.error) {
            (_, Some(context)) => Err(EngineError::VcsUnavailable { context }),
            (Some(view), None) => Ok(view),
            (None, None) => Err(EngineError::VcsUnavailable {
                context: "repository not loaded yet".to_string(),
            }),
        }
    }
}

#[derive(Debug)]
enum Request {
    TriggerRefresh,
    ShowBranch(String),
    HideBranch(String),
    OpenBranch(usize),
    CloseBranch(usize),
    CurrentBranchNames(oneshot::Sender<Vec<String>>),
    CurrentView(oneshot::Sender<Option<Arc<ViewRepo>>>),
    Shutdown(oneshot::Sender<()>),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Job {
    Repo,
    Status,
    View,
}

struct JobInput {
    job: Job,
    repo: Option<Arc<Repo>>,
    status: Status,
    names: Vec<String>,
}

struct Outcome {
    repo: Arc<Repo>,
    status: Status,
    view: ViewRepo,
}

type WorkerOutput = (GraphEngine, Job, Result<Outcome>);

/// Cheap handle to a running coordinator
///
/// Requests sent after the coordinator stopped are dropped; queries then answer with
/// empty values.
#[derive(Debug, Clone)]
pub struct CoordinatorHandle {
    requests: mpsc::Sender<Request>,
    changes: watch::Receiver<RepoChange>,
}

impl CoordinatorHandle {
    pub fn subscribe(&self) -> watch::Receiver<RepoChange> {
        self.changes.clone()
    }

    /// Latest notification without waiting
    pub fn latest(&self) -> RepoChange {
        self.changes.borrow().clone()
    }

    pub async fn trigger_refresh(&self) {
        self.send(Request::TriggerRefresh).await;
    }

    pub async fn show_branch(&self, name: &str) {
        self.send(Request::ShowBranch(name.to_string())).await;
    }

    pub async fn hide_branch(&self, name: &str) {
        self.send(Request::HideBranch(name.to_string())).await;
    }

    pub async fn open_branch(&self, index: usize) {
        self.send(Request::OpenBranch(index)).await;
    }

    pub async fn close_branch(&self, index: usize) {
        self.send(Request::CloseBranch(index)).await;
    }

    pub async fn current_branch_names(&self) -> Vec<String> {
        let (reply, answer) = oneshot::channel();
        self.send(Request::CurrentBranchNames(reply)).await;
        answer.await.unwrap_or_default()
    }

    pub async fn current_view(&self) -> Option<Arc<ViewRepo>> {
        let (reply, answer) = oneshot::channel();
        self.send(Request::CurrentView(reply)).await;
        answer.await.ok().flatten()
    }

    /// Stop the actor once the running worker is done
    ///
    /// Queries queued before the shutdown are answered; queued selection changes and
    /// refreshes are dropped.
    pub async fn shutdown(&self) {
        let (reply, answer) = oneshot::channel();
        self.send(Request::Shutdown(reply)).await;
        let _ = answer.await;
    }

    async fn send(&self, request: Request) {
        if let Err(error) = self.requests.send(request).await {
            tracing::debug!(request = ?error.0, "coordinator already stopped");
        }
    }
}

/// Builder for the actor of one repository
pub struct Coordinator {
    vcs: Arc<dyn VcsAdapter>,
    options: EngineOptions,
    store: Option<ConfigStore>,
    events: Option<mpsc::Receiver<ChangeEvent>>,
}

impl Coordinator {
    pub fn new(vcs: Arc<dyn VcsAdapter>, options: EngineOptions) -> Self {
        Coordinator {
            vcs,
            options,
            store: None,
            events: None,
        }
    }

    /// Restore the shown branches from `store` and save them back after changes
    pub fn with_config_store(mut self, store: ConfigStore) -> Self {
        self.store = Some(store);
        self
    }

    pub fn with_events(mut self, events: mpsc::Receiver<ChangeEvent>) -> Self {
        self.events = Some(events);
        self
    }

    /// Start the actor and the initial load
    pub fn spawn(self) -> CoordinatorHandle {
        let (requests, inbox) = mpsc::channel(REQUEST_BUFFER);
        let (changes, observed) = watch::channel(RepoChange::default());

        let names = match &self.store {
            Some(store) => store
                .load()
                .map(|config| config.shown_branches(self.vcs.repo_path()))
                .unwrap_or_else(|error| {
                    tracing::warn!(%error, "shown branches not restored");
                    Vec::new()
                }),
            None => Vec::new(),
        };

        let actor = Actor {
            engine: Some(GraphEngine::new(self.options.clone())),
            vcs: self.vcs,
            options: self.options,
            store: self.store,
            inbox,
            events: self.events,
            changes,
            worker: None,
            repo: None,
            status: Status::default(),
            names,
            view: None,
            pending: None,
            repo_deadline: None,
            status_deadline: None,
            save_names: false,
        };
        tokio::spawn(actor.run());

        CoordinatorHandle {
            requests,
            changes: observed,
        }
    }
}

struct Actor {
    engine: Option<GraphEngine>,
    vcs: Arc<dyn VcsAdapter>,
    options: EngineOptions,
    store: Option<ConfigStore>,
    inbox: mpsc::Receiver<Request>,
    events: Option<mpsc::Receiver<ChangeEvent>>,
    changes: watch::Sender<RepoChange>,
    worker: Option<JoinHandle<WorkerOutput>>,
    repo: Option<Arc<Repo>>,
    status: Status,
    names: Vec<String>,
    view: Option<Arc<ViewRepo>>,
    pending: Option<Job>,
    repo_deadline: Option<Instant>,
    status_deadline: Option<Instant>,
    save_names: bool,
}

impl Actor {
    async fn run(mut self) {
        tracing::info!(path = ?self.vcs.repo_path(), "coordinator started");
        self.publish_starting();
        self.request(Job::Repo);

        loop {
            tokio::select! {
                request = self.inbox.recv() => match request {
                    Some(Request::Shutdown(reply)) => {
                        self.shut_down().await;
                        let _ = reply.send(());
                        return;
                    }
                    Some(request) => self.handle(request),
                    None => break,
                },
                Some(event) = next_event(&mut self.events) => self.on_event(event),
                _ = sleep_until(self.repo_deadline) => {
                    self.repo_deadline = None;
                    self.status_deadline = None;
                    self.request(Job::Repo);
                }
                _ = sleep_until(self.status_deadline) => {
                    self.status_deadline = None;
                    self.request(Job::Status);
                }
                output = join_worker(&mut self.worker) => {
                    self.worker = None;
                    self.on_worker_done(output);
                }
            }
        }

        self.shut_down().await;
    }

    fn handle(&mut self, request: Request) {
        match request {
            Request::TriggerRefresh => {
                self.publish_starting();
                self.request(Job::Repo);
            }
            Request::ShowBranch(name) => match self.view.clone() {
                Some(view) => self.select(selection::show_branch(&view, &self.names, &name)),
                None => {
                    self.names.push(name);
                    self.save_names = true;
                }
            },
            Request::HideBranch(name) => {
                if let Some(view) = self.view.clone() {
                    self.select(selection::hide_branch(&view, &self.names, &name));
                }
            }
            Request::OpenBranch(index) => {
                let names = self
                    .view
                    .as_ref()
                    .map(|view| selection::open_branch(view, &self.names, index));
                self.select_checked(names);
            }
            Request::CloseBranch(index) => {
                let names = self
                    .view
                    .as_ref()
                    .map(|view| selection::close_branch(view, &self.names, index));
                self.select_checked(names);
            }
            query => self.answer(query),
        }
    }

    /// Answer a query while shutting down; selection changes and refreshes are dropped
    fn answer(&self, request: Request) {
        match request {
            Request::CurrentBranchNames(reply) => {
                let _ = reply.send(self.names.clone());
            }
            Request::CurrentView(reply) => {
                let _ = reply.send(self.view.clone());
            }
            Request::Shutdown(reply) => {
                let _ = reply.send(());
            }
            other => tracing::debug!(request = ?other, "request dropped"),
        }
    }

    fn select_checked(&mut self, names: Option<Result<Vec<String>>>) {
        match names {
            Some(Ok(names)) => self.select(names),
            Some(Err(error)) => tracing::debug!(%error, "selection unchanged"),
            None => tracing::debug!("no view to change yet"),
        }
    }

    fn select(&mut self, names: Vec<String>) {
        if names == self.names {
            return;
        }
        self.names = names;
        self.save_names = true;
        self.request(Job::View);
    }

    fn on_event(&mut self, event: ChangeEvent) {
        let now = Instant::now();
        match event {
            ChangeEvent::RepoChanged => {
                if self.repo_deadline.is_none() {
                    self.publish_starting();
                }
                self.repo_deadline = Some(now + self.options.debounce());
            }
            ChangeEvent::StatusChanged => {
                if self.repo.is_none() || self.repo_deadline.is_some() {
                    tracing::trace!("status change ignored");
                    return;
                }
                if self.status_deadline.is_none() {
                    self.publish_starting();
                }
                self.status_deadline = Some(now + self.options.debounce());
            }
        }
    }

    /// Start `job` now or fold it into the follow-up of the running one
    fn request(&mut self, job: Job) {
        if self.worker.is_some() {
            self.pending = Some(match self.pending {
                Some(pending) => stronger(pending, job),
                None => job,
            });
            return;
        }
        self.start(job);
    }

    fn start(&mut self, job: Job) {
        let job = if self.repo.is_none() { Job::Repo } else { job };
        let engine = match self.engine.take() {
            Some(engine) => engine,
            None => GraphEngine::new(self.options.clone()),
        };
        let vcs = Arc::clone(&self.vcs);
        let input = JobInput {
            job,
            repo: self.repo.clone(),
            status: self.status.clone(),
            names: self.names.clone(),
        };

        tracing::debug!(?job, "refresh started");
        self.worker = Some(tokio::task::spawn_blocking(move || {
            let mut engine = engine;
            let started = std::time::Instant::now();
            let outcome = run_job(&mut engine, vcs.as_ref(), input);
            tracing::info!(
                ?job,
                elapsed = ?started.elapsed(),
                ok = outcome.is_ok(),
                "refresh finished"
            );
            (engine, job, outcome)
        }));
    }

    fn on_worker_done(&mut self, output: std::result::Result<WorkerOutput, JoinError>) {
        match output {
            Ok((engine, _, Ok(outcome))) => {
                self.engine = Some(engine);
                self.accept(outcome);
            }
            Ok((engine, job, Err(error))) => {
                self.engine = Some(engine);
                tracing::warn!(?job, %error, "refresh failed");
                self.publish_error(error.to_string());
            }
            Err(error) => {
                tracing::warn!(%error, "refresh worker stopped");
                self.publish_error(format!("refresh worker stopped: {error}"));
            }
        }

        if let Some(job) = self.pending.take() {
            self.start(job);
        }
    }

    /// Publish a finished snapshot
    ///
    /// `names` is the selection requested last. It only takes the view's closed list
    /// once no follow-up is queued, since a queued job may carry newer user changes.
    fn accept(&mut self, outcome: Outcome) {
        let view = Arc::new(outcome.view);
        self.repo = Some(outcome.repo);
        self.status = outcome.status;
        self.view = Some(Arc::clone(&view));

        if self.pending.is_none() {
            self.names = view.branch_names();
            if self.save_names {
                self.save_names = false;
                self.persist_names();
            }
        }

        self.changes.send_modify(|change| {
            change.seq += 1;
            change.is_starting = false;
            change.view = Some(view);
            change.error = None;
        });
    }

    fn persist_names(&self) {
        let Some(store) = self.store.clone() else {
            return;
        };
        let path = self.vcs.repo_path().to_path_buf();
        let names = self.names.clone();
        tokio::task::spawn_blocking(move || {
            if let Err(error) = store.update(|config| config.set_shown_branches(&path, names)) {
                tracing::warn!(%error, "shown branches not saved");
            }
        });
    }

    fn publish_starting(&self) {
        self.changes.send_modify(|change| {
            change.seq += 1;
            change.is_starting = true;
            change.error = None;
        });
    }

    fn publish_error(&self, error: String) {
        self.changes.send_modify(|change| {
            change.seq += 1;
            change.is_starting = false;
            change.error = Some(error);
        });
    }

    /// Answer queued queries, drop queued changes, then wait for the worker
    async fn shut_down(&mut self) {
        self.inbox.close();
        while let Ok(request) = self.inbox.try_recv() {
            self.answer(request);
        }
        if let Some(worker) = self.worker.take() {
            let _ = worker.await;
        }
        tracing::info!(path = ?self.vcs.repo_path(), "coordinator stopped");
    }
}

fn stronger(a: Job, b: Job) -> Job {
    match (a, b) {
        (Job::Repo, _) | (_, Job::Repo) => Job::Repo,
        (Job::Status, _) | (_, Job::Status) => Job::Status,
        _ => Job::View,
    }
}

fn run_job(engine: &mut GraphEngine, vcs: &dyn VcsAdapter, input: JobInput) -> Result<Outcome> {
    let (repo, status) = match (input.job, input.repo) {
        (Job::View, Some(repo)) => (repo, input.status),
        (Job::Status, Some(repo)) => (repo, vcs.get_status()?),
        (Job::Repo, _) | (_, None) => {
            let repo = engine.load_repo(vcs)?;
            (repo, vcs.get_status()?)
        }
    };
    let view = engine.build_view(Arc::clone(&repo), &status, &input.names);
    Ok(Outcome { repo, status, view })
}

async fn next_event(events: &mut Option<mpsc::Receiver<ChangeEvent>>) -> Option<ChangeEvent> {
    match events {
        Some(events) => events.recv().await,
        None => std::future::pending().await,
    }
}

async fn sleep_until(deadline: Option<Instant>) {
    match deadline {
        Some(deadline) => tokio::time::sleep_until(deadline).await,
        None => std::future::pending().await,
    }
}

async fn join_worker(
    worker: &mut Option<JoinHandle<WorkerOutput>>,
) -> std::result::Result<WorkerOutput, JoinError> {
    match worker {
        Some(handle) => handle.await,
        None => std::future::pending().await,
    }
}
