use crate::OutputFormat;
use crate::areas::repository::Repository;
use colored::Colorize;

impl Repository {
    /// Commits whose id, message, author, tags or branch tips contain `text`
    pub fn search(&self, text: &str, format: OutputFormat) -> anyhow::Result<()> {
        let view = self.view(&[])?;
        let found = view.search(text);

        if format == OutputFormat::Json {
            writeln!(self.writer(), "{}", serde_json::to_string_pretty(&found)?)?;
            return Ok(());
        }

        if found.is_empty() {
            writeln!(self.writer(), "no commits match {text:?}")?;
        }
        for details in found {
            writeln!(
                self.writer(),
                "{} {} {}",
                details.sid.yellow(),
                format!("[{}]", details.branch_display_name).cyan(),
                details.subject
            )?;
        }

        Ok(())
    }
}
