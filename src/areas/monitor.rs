//! Polling change monitor
//!
//! Watches a working tree by fingerprinting file metadata on a fixed interval:
//!
//! - `.git/HEAD`, `.git/packed-refs` and `.git/refs/**` change when commits or
//!   references move, reported as [`ChangeEvent::RepoChanged`]
//! - every file of the working tree not excluded by `.gitignore` or `.git/info/exclude`,
//!   plus `.git/index` and `.git/MERGE_HEAD`, reported as [`ChangeEvent::StatusChanged`]
//!
//! A fingerprint hashes relative path, size and modification time, so contents are
//! never read.

use ignore::WalkBuilder;
use std::hash::{DefaultHasher, Hash, Hasher};
use std::path::{Path, PathBuf};
use std::time::{Duration, SystemTime};
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use walkdir::WalkDir;

const GIT_DIR_NAME: &str = ".git";
const REPO_FILES: [&str; 2] = ["HEAD", "packed-refs"];
const REFS_DIR_NAME: &str = "refs";
const STATUS_GIT_FILES: [&str; 2] = ["index", "MERGE_HEAD"];

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ChangeEvent {
    RepoChanged,
    StatusChanged,
}

#[derive(Debug)]
pub struct FolderMonitor {
    root: PathBuf,
    repo_fingerprint: u64,
    status_fingerprint: u64,
}

impl FolderMonitor {
    /// Start from the current state of `root`; nothing is reported until it changes
    pub fn new(root: impl Into<PathBuf>) -> Self {
        let root = root.into();
        FolderMonitor {
            repo_fingerprint: repo_fingerprint(&root),
            status_fingerprint: status_fingerprint(&root),
            root,
        }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Compare with the last poll and report what changed
    pub fn poll(&mut self) -> Vec<ChangeEvent> {
        let mut events = Vec::new();

        let repo = repo_fingerprint(&self.root);
        if repo != self.repo_fingerprint {
            self.repo_fingerprint = repo;
            events.push(ChangeEvent::RepoChanged);
        }

        let status = status_fingerprint(&self.root);
        if status != self.status_fingerprint {
            self.status_fingerprint = status;
            events.push(ChangeEvent::StatusChanged);
        }

        events
    }

    /// Poll every `interval` on the blocking pool until `events` is closed
    pub fn spawn(self, interval: Duration, events: mpsc::Sender<ChangeEvent>) -> JoinHandle<()> {
        tokio::spawn(async move {
            let mut monitor = self;
            let mut ticker = tokio::time::interval(interval);
            ticker.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Delay);
            loop {
                ticker.tick().await;
                if events.is_closed() {
                    break;
                }

                let polled = tokio::task::spawn_blocking(move || {
                    let changes = monitor.poll();
                    (monitor, changes)
                })
                .await;
                let changes = match polled {
                    Ok((polled, changes)) => {
                        monitor = polled;
                        changes
                    }
                    Err(error) => {
                        tracing::warn!(%error, "monitor poll failed");
                        break;
                    }
                };

                for event in changes {
                    tracing::debug!(?event, root = ?monitor.root, "change detected");
                    if events.send(event).await.is_err() {
                        return;
                    }
                }
            }
        })
    }
}

fn repo_fingerprint(root: &Path) -> u64 {
    let git_dir = root.join(GIT_DIR_NAME);
    let mut hasher = DefaultHasher::new();

    for name in REPO_FILES {
        hash_file(&mut hasher, root, &git_dir.join(name));
    }
    for entry in WalkDir::new(git_dir.join(REFS_DIR_NAME))
        .sort_by_file_name()
        .into_iter()
        .filter_map(|entry| entry.ok())
        .filter(|entry| entry.file_type().is_file())
    {
        hash_file(&mut hasher, root, entry.path());
    }

    hasher.finish()
}

/// Working tree files git would report, so ignored build output never counts
fn status_fingerprint(root: &Path) -> u64 {
    let git_dir = root.join(GIT_DIR_NAME);
    let mut hasher = DefaultHasher::new();

    for name in STATUS_GIT_FILES {
        hash_file(&mut hasher, root, &git_dir.join(name));
    }
    let walk = WalkBuilder::new(root)
        .hidden(false)
        .ignore(false)
        .git_ignore(true)
        .git_exclude(true)
        .require_git(false)
        .filter_entry(|entry| entry.file_name() != GIT_DIR_NAME)
        .sort_by_file_name(|a, b| a.cmp(b))
        .build();
    for entry in walk
        .filter_map(|entry| entry.ok())
        .filter(|entry| entry.file_type().is_some_and(|kind| kind.is_file()))
    {
        hash_file(&mut hasher, root, entry.path());
    }

    hasher.finish()
}

fn hash_file(hasher: &mut DefaultHasher, root: &Path, path: &Path) {
    let Ok(metadata) = std::fs::metadata(path) else {
        return;
    };
    path.strip_prefix(root).unwrap_or(path).hash(hasher);
    metadata.len().hash(hasher);
    metadata
        .modified()
        .ok()
        .and_then(|modified| modified.duration_since(SystemTime::UNIX_EPOCH).ok())
        .hash(hasher);
}
