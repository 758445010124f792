use crate::OutputFormat;
use crate::areas::repository::Repository;
use crate::artifacts::graph::repo::BranchKind;
use colored::Colorize;
use serde::Serialize;

#[derive(Debug, Clone, Serialize)]
struct BranchLine {
    name: String,
    kind: BranchKind,
    tip: String,
    bottom: String,
    parent: Option<String>,
    is_current: bool,
    is_shown: bool,
}

impl Repository {
    /// List every branch of the model, git branches and synthetic ones
    pub fn branches(&self, format: OutputFormat) -> anyhow::Result<()> {
        let view = self.view(&[])?;
        let repo = view.repo();

        let lines = repo
            .branch_indices()
            .map(|index| {
                let branch = repo.branch(index);
                BranchLine {
                    name: branch.name.clone(),
                    kind: branch.kind,
                    tip: repo.commit(branch.tip).sid.clone(),
                    bottom: repo.commit(branch.bottom.unwrap_or(branch.tip)).sid.clone(),
                    parent: branch.parent.map(|parent| repo.branch(parent).name.clone()),
                    is_current: branch.is_current,
                    is_shown: view.is_shown(index),
                }
            })
            .collect::<Vec<_>>();

        if format == OutputFormat::Json {
            writeln!(self.writer(), "{}", serde_json::to_string_pretty(&lines)?)?;
            return Ok(());
        }

        for line in lines {
            let marker = match (line.is_current, line.is_shown) {
                (true, _) => "*",
                (false, true) => "+",
                (false, false) => " ",
            };
            let name = if line.is_current {
                line.name.green().bold().to_string()
            } else {
                line.name.clone()
            };
            writeln!(
                self.writer(),
                "{marker} {name} {:?} {}..{}{}",
                line.kind,
                line.bottom.yellow(),
                line.tip.yellow(),
                line.parent
                    .map(|parent| format!(" <- {parent}"))
                    .unwrap_or_default()
            )?;
        }

        Ok(())
    }
}
