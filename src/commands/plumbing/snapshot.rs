use crate::areas::repository::Repository;

#[derive(Debug, Clone, Default)]
pub struct SnapshotOptions {
    pub branches: Vec<String>,
    /// Print only a window of rows as a view port
    pub first: Option<usize>,
    pub count: Option<usize>,
}

impl Repository {
    /// Print the published snapshot as JSON
    pub fn snapshot(&self, opts: &SnapshotOptions) -> anyhow::Result<()> {
        let view = self.view(&opts.branches)?;

        let json = match (opts.first, opts.count) {
            (None, None) => serde_json::to_string_pretty(&view)?,
            (first, count) => serde_json::to_string_pretty(&view.view_port(
                first.unwrap_or_default(),
                count.unwrap_or(view.commits.len()),
            ))?,
        };
        writeln!(self.writer(), "{json}")?;

        Ok(())
    }
}
