use crate::areas::repository::Repository;
use crate::areas::service::{Notification, RepoService};
use colored::Colorize;
use std::time::Duration;

#[derive(Debug, Clone, Default)]
pub struct WatchOptions {
    /// Stop after this many snapshots
    pub limit: Option<usize>,
    /// Stop when nothing changes for this long
    pub idle_timeout: Option<Duration>,
}

impl Repository {
    /// Print one line per published snapshot until interrupted
    pub fn watch(&self, opts: &WatchOptions) -> anyhow::Result<()> {
        let runtime = tokio::runtime::Runtime::new()?;
        runtime.block_on(self.watch_changes(opts))
    }

    async fn watch_changes(&self, opts: &WatchOptions) -> anyhow::Result<()> {
        let mut service =
            RepoService::new(self.options()).with_config_store(self.store().clone());
        let id = service.open_repo(self.path()).await?;
        let mut changes = service.subscribe_changes(id)?;
        if let Some(timeout) = opts.idle_timeout {
            changes = changes.with_timeout(timeout);
        }

        let mut snapshots = 0;
        loop {
            let notification = tokio::select! {
                notification = changes.next() => notification,
                _ = tokio::signal::ctrl_c() => break,
            };

            match notification {
                Notification::Changed(change) if change.is_starting => {
                    writeln!(self.writer(), "{:>4} {}", change.seq, "refreshing".dimmed())?;
                }
                Notification::Changed(change) => {
                    if let Some(error) = &change.error {
                        writeln!(self.writer(), "{:>4} {} {error}", change.seq, "error:".red())?;
                        continue;
                    }
                    let Some(view) = &change.view else {
                        continue;
                    };
                    writeln!(
                        self.writer(),
                        "{:>4} {} rows, branches: {}",
                        change.seq,
                        view.commits.len(),
                        view.branch_names().join(", ")
                    )?;
                    self.writer().flush()?;

                    snapshots += 1;
                    if opts.limit.is_some_and(|limit| snapshots >= limit) {
                        break;
                    }
                }
                Notification::TimedOut if opts.idle_timeout.is_some() => break,
                Notification::TimedOut => continue,
                Notification::Closed => break,
            }
        }

        service.shutdown().await;
        Ok(())
    }
}
