use crate::artifacts::status::{BRANCH_HEADER_PREFIX, CONFLICT_CODES, UNTRACKED_CODE};
use serde::{Deserialize, Serialize};

/// Summary of the working tree
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Status {
    pub modified: usize,
    pub added: usize,
    pub deleted: usize,
    pub conflicted: usize,
    pub is_merging: bool,
    pub merge_message: Option<String>,
}

impl Status {
    /// Summarise `git status -s --porcelain` output
    ///
    /// Every line is `XY path`. Unmerged codes count as conflicts, untracked or added
    /// paths as additions, deletions in either column as deletions and everything else
    /// as modifications.
    pub fn parse_porcelain(output: &str) -> Self {
        let mut status = Status::default();

        for line in output.lines() {
            if line.len() < 2 || line.starts_with(BRANCH_HEADER_PREFIX) {
                continue;
            }
            let Some(code) = line.get(..2) else {
                continue;
            };

            if CONFLICT_CODES.contains(code) {
                status.conflicted += 1;
            } else if code == UNTRACKED_CODE || code.contains('A') {
                status.added += 1;
            } else if code.contains('D') {
                status.deleted += 1;
            } else {
                status.modified += 1;
            }
        }

        status
    }

    /// Mark a merge in progress, keeping only the first line of its message
    pub fn with_merge(mut self, message: Option<&str>) -> Self {
        self.is_merging = true;
        self.merge_message = message
            .and_then(|message| message.lines().map(str::trim).find(|line| !line.is_empty()))
            .map(str::to_string);
        self
    }

    /// Number of changed paths, conflicts included
    pub fn all_changes(&self) -> usize {
        self.modified + self.added + self.deleted + self.conflicted
    }

    pub fn is_clean(&self) -> bool {
        self.all_changes() == 0
    }

    /// Subject of the virtual commit that stands for the working tree
    pub fn uncommitted_subject(&self) -> String {
        let subject = format!("{} uncommitted changes", self.all_changes());
        match (&self.merge_message, self.is_merging) {
            (Some(message), true) => format!("{subject}, {message}"),
            _ => subject,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn counts_each_kind_of_change() {
        let output = "\
 M src/lib.rs
M  src/main.rs
?? notes.txt
A  new.rs
 D gone.rs
D  removed.rs
UU both.rs
AA added_twice.rs
";
        let status = Status::parse_porcelain(output);

        assert_eq!(
            status,
            Status {
                modified: 2,
                added: 2,
                deleted: 2,
                conflicted: 2,
                is_merging: false,
                merge_message: None,
            }
        );
        assert_eq!(status.all_changes(), 8);
    }

    #[test]
    fn empty_output_is_clean() {
        let status = Status::parse_porcelain("");

        assert!(status.is_clean());
    }

    #[test]
    fn branch_header_is_not_a_change() {
        let status = Status::parse_porcelain("## main...origin/main [ahead 1]\n");

        assert!(status.is_clean());
    }

    #[test]
    fn uncommitted_subject_mentions_the_merge() {
        let status = Status {
            modified: 2,
            ..Default::default()
        };
        assert_eq!(status.uncommitted_subject(), "2 uncommitted changes");

        let merging = status.with_merge(Some("\nMerge branch 'feat'\n\n# Conflicts:\n"));
        assert_eq!(
            merging.uncommitted_subject(),
            "2 uncommitted changes, Merge branch 'feat'"
        );
    }
}
