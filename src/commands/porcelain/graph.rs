use crate::areas::repository::Repository;
use crate::artifacts::graph::selection;
use crate::artifacts::graph::view_repo::{ViewCommit, ViewRepo};
use colored::Colorize;

const MORE_MARKER: &str = "…";

#[derive(Debug, Clone, Default)]
pub struct GraphOptions {
    /// Branches to show; empty means the remembered selection
    pub branches: Vec<String>,
    /// Rows whose hidden branches are opened before printing
    pub open: Vec<usize>,
    /// Rows whose branches are closed before printing
    pub close: Vec<usize>,
    pub first: usize,
    pub count: Option<usize>,
}

impl Repository {
    pub fn graph(&self, opts: &GraphOptions) -> anyhow::Result<()> {
        let mut view = self.view(&opts.branches)?;

        let changes_selection = !opts.open.is_empty() || !opts.close.is_empty();
        for index in opts.open.iter().copied() {
            let names = selection::open_branch(&view, &view.branch_names(), index)?;
            view = self.reselect(&view, &names);
        }
        for index in opts.close.iter().copied() {
            let names = selection::close_branch(&view, &view.branch_names(), index)?;
            view = self.reselect(&view, &names);
        }
        if changes_selection {
            self.remember_shown_branches(view.branch_names())?;
        }

        let count = opts.count.unwrap_or(view.commits.len());
        let port = view.view_port(opts.first, count);
        for (offset, commit) in port.commits.iter().enumerate() {
            writeln!(
                self.writer(),
                "{:>4} {}",
                port.first_index + offset,
                render_row(&view, commit)
            )?;
        }

        Ok(())
    }
}

/// Graph cells, short id, references and subject of one row
pub fn render_row(view: &ViewRepo, commit: &ViewCommit) -> String {
    let graph = commit
        .graph
        .iter()
        .map(|column| format!("{}{}", column.branch, column.connect))
        .collect::<String>();

    let mut labels = commit
        .branch_tips
        .iter()
        .map(|tip| {
            if view.current_branch_name.as_deref() == Some(tip.as_str()) {
                tip.green().bold().to_string()
            } else {
                tip.cyan().to_string()
            }
        })
        .chain(commit.tags.iter().map(|tag| format!("tag: {tag}").yellow().to_string()))
        .collect::<Vec<_>>()
        .join(", ");
    if !labels.is_empty() {
        labels = format!(" ({labels})");
    }

    let more = if commit.is_more { MORE_MARKER } else { "" };
    let subject = if commit.is_uncommitted {
        commit.subject.red().to_string()
    } else {
        commit.subject.clone()
    };

    format!(
        "{graph} {}{labels} {subject}{more}",
        commit.sid.yellow()
    )
}
