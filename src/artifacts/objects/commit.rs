//! Raw commit records as delivered by the version control tool
//!
//! ## Log format
//!
//! The adapter asks git for `--pretty=%H|%ai|%ci|%an|%P|%B` with `-z`, so records are
//! separated by NUL and fields by `|`. The message is the last field and may itself
//! contain `|`, so everything after the fifth separator is rejoined.

use crate::artifacts::objects::commit_id::CommitId;
use crate::artifacts::objects::{LOG_FIELD_SEPARATOR, LOG_TIME_FORMAT};
use anyhow::Context;
use chrono::{DateTime, FixedOffset};
use serde::{Deserialize, Serialize};

/// A commit exactly as read from the log, before any graph derivation
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GitCommit {
    pub id: CommitId,
    pub parent_ids: Vec<CommitId>,
    pub author: String,
    pub author_time: DateTime<FixedOffset>,
    pub commit_time: DateTime<FixedOffset>,
    pub subject: String,
    pub message: String,
}

impl GitCommit {
    /// Build a commit record from its parts, deriving the subject from the message
    ///
    /// # Arguments
    ///
    /// * `id` - Commit identifier
    /// * `parent_ids` - Parents in order (first parent, then merge parent)
    /// * `author` - Author display name
    /// * `time` - Used both as author and commit time
    /// * `message` - Full commit message
    pub fn from_parts(
        id: CommitId,
        parent_ids: Vec<CommitId>,
        author: impl Into<String>,
        time: DateTime<FixedOffset>,
        message: impl Into<String>,
    ) -> Self {
        let message = message.into();
        GitCommit {
            id,
            parent_ids,
            author: author.into(),
            author_time: time,
            commit_time: time,
            subject: subject_of(&message),
            message,
        }
    }

    pub fn first_parent_id(&self) -> Option<&CommitId> {
        self.parent_ids.first()
    }

    pub fn is_merge(&self) -> bool {
        self.parent_ids.len() > 1
    }

    /// Parse one `|` separated log record
    pub fn try_parse_record(record: &str) -> anyhow::Result<Self> {
        let parts = record.split(LOG_FIELD_SEPARATOR).collect::<Vec<_>>();
        if parts.len() < 6 {
            anyhow::bail!("log record has {} fields, expected at least 6", parts.len());
        }

        let id = CommitId::try_parse(parts[0].trim())?;
        let author_time = parse_time(parts[1])
            .with_context(|| format!("invalid author time in commit {id}"))?;
        let commit_time = parse_time(parts[2])
            .with_context(|| format!("invalid commit time in commit {id}"))?;
        let parent_ids = parts[4]
            .split_whitespace()
            .map(CommitId::try_parse)
            .collect::<anyhow::Result<Vec<_>>>()?;
        let message = parts[5..].join(LOG_FIELD_SEPARATOR);
        let message = message.trim_end().to_string();

        Ok(GitCommit {
            id,
            parent_ids,
            author: parts[3].to_string(),
            author_time,
            commit_time,
            subject: subject_of(&message),
            message,
        })
    }
}

/// Parse the whole NUL separated output of the log command
///
/// # Returns
///
/// The commits in the order git printed them (newest first)
pub fn parse_log(output: &str) -> anyhow::Result<Vec<GitCommit>> {
    output
        .split('\0')
        .map(|record| record.trim_start_matches(['\n', '\r']))
        .filter(|record| !record.trim().is_empty())
        .map(GitCommit::try_parse_record)
        .collect()
}

fn parse_time(value: &str) -> anyhow::Result<DateTime<FixedOffset>> {
    DateTime::parse_from_str(value.trim(), LOG_TIME_FORMAT)
        .with_context(|| format!("cannot parse time {value:?}"))
}

fn subject_of(message: &str) -> String {
    message.lines().next().unwrap_or_default().trim().to_string()
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    const TWO_RECORDS: &str = "bbb|2024-03-02 10:00:00 +0100|2024-03-02 10:05:00 +0100|Ada|aaa ccc|Merge branch 'feat' into main\n\nbody | with bar\n\0\naaa|2024-03-01 09:00:00 +0000|2024-03-01 09:00:00 +0000|Bob||Initial commit\n\0";

    #[test]
    fn parses_records_in_log_order() {
        let commits = parse_log(TWO_RECORDS).unwrap();

        assert_eq!(commits.len(), 2);
        assert_eq!(commits[0].id.as_ref(), "bbb");
        assert_eq!(
            commits[0]
                .parent_ids
                .iter()
                .map(|id| id.as_ref())
                .collect::<Vec<_>>(),
            vec!["aaa", "ccc"]
        );
        assert_eq!(commits[0].subject, "Merge branch 'feat' into main");
        assert_eq!(
            commits[0].message,
            "Merge branch 'feat' into main\n\nbody | with bar"
        );
        assert_eq!(commits[0].author, "Ada");
        assert_eq!(commits[0].author_time.offset().local_minus_utc(), 3600);
        assert!(commits[0].is_merge());
    }

    #[test]
    fn root_commit_has_no_parents() {
        let commits = parse_log(TWO_RECORDS).unwrap();

        assert!(commits[1].parent_ids.is_empty());
        assert_eq!(commits[1].first_parent_id(), None);
        assert_eq!(commits[1].subject, "Initial commit");
    }

    #[test]
    fn blank_output_yields_no_commits() {
        assert!(parse_log("\n\0\n").unwrap().is_empty());
    }

    #[test]
    fn short_records_are_rejected() {
        assert!(parse_log("abc|2024-03-01 09:00:00 +0000|x").is_err());
    }

    #[test]
    fn malformed_time_is_rejected() {
        assert!(parse_log("abc|yesterday|2024-03-01 09:00:00 +0000|Bob||msg").is_err());
    }
}
