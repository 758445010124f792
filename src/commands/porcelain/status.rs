use crate::areas::repository::Repository;
use crate::areas::vcs::VcsAdapter;
use colored::Colorize;

impl Repository {
    pub fn status(&self) -> anyhow::Result<()> {
        let view = self.view(&[])?;
        let status = view.status();

        match &view.current_branch_name {
            Some(name) => writeln!(self.writer(), "On branch {}", name.green())?,
            None => writeln!(self.writer(), "{}", "Not on a branch".red())?,
        }
        writeln!(
            self.writer(),
            "Shown: {}",
            view.branch_names().join(", ")
        )?;

        if status.is_merging {
            writeln!(
                self.writer(),
                "Merging: {}",
                status.merge_message.as_deref().unwrap_or_default().trim()
            )?;
        }
        if status.is_clean() {
            writeln!(self.writer(), "nothing to commit, working tree clean")?;
            return Ok(());
        }

        let counts = [
            ("modified", status.modified),
            ("added", status.added),
            ("deleted", status.deleted),
            ("conflicted", status.conflicted),
        ];
        for (label, count) in counts.into_iter().filter(|(_, count)| *count > 0) {
            writeln!(self.writer(), "{:>12}: {}", label, count.to_string().red())?;
        }

        tracing::debug!(path = ?self.vcs().repo_path(), "status printed");
        Ok(())
    }
}
