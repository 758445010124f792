use crate::OutputFormat;
use crate::areas::repository::Repository;
use crate::artifacts::graph::view_repo::CommitDetails;
use colored::Colorize;

impl Repository {
    /// Print one commit, given by full id or unique prefix
    pub fn show(&self, commit: &str, format: OutputFormat) -> anyhow::Result<()> {
        let view = self.view(&[])?;
        let id = view.resolve_commit_id(commit)?;
        let details = view.commit_details(&id)?;

        match format {
            OutputFormat::Json => {
                writeln!(self.writer(), "{}", serde_json::to_string_pretty(&details)?)?
            }
            OutputFormat::Text => self.show_details(&details)?,
        }

        Ok(())
    }

    pub(crate) fn show_details(&self, details: &CommitDetails) -> anyhow::Result<()> {
        writeln!(self.writer(), "commit {}", details.id.to_string().yellow())?;
        writeln!(
            self.writer(),
            "Branch: {}",
            details.branch_display_name.cyan()
        )?;
        if !details.branch_tips.is_empty() {
            writeln!(self.writer(), "Tips:   {}", details.branch_tips.join(", "))?;
        }
        if !details.tags.is_empty() {
            writeln!(self.writer(), "Tags:   {}", details.tags.join(", "))?;
        }
        if !details.author.is_empty() {
            writeln!(self.writer(), "Author: {}", details.author)?;
        }
        writeln!(
            self.writer(),
            "Date:   {}",
            details.author_time.format("%a %b %e %H:%M:%S %Y %z")
        )?;
        writeln!(self.writer())?;
        for line in details.message.lines() {
            writeln!(self.writer(), "    {line}")?;
        }

        Ok(())
    }
}
