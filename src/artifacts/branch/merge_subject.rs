//! Branch names recovered from merge commit subjects
//!
//! Git writes merge subjects in a handful of shapes:
//!
//! ```text
//! Merge branch 'feat' into main
//! Merged commit 'feat' into main
//! Merge branch 'feat' of https://host/repo into main
//! Merge branch 'feat' of https://host/repo          (pull merge: into == from)
//! Merge remote-tracking branch 'origin/feat' into feat
//! Merge branch feat
//! ```
//!
//! The parser extracts `(from, into)` from such subjects and remembers, per snapshot,
//! which branch name each merge commit and each merge parent most likely belonged to.
//! The merge commit itself is named after `into`, its merge parent after `from`.
//!
//! A pull merge has the local side as git's first parent. The link pass swaps its
//! parents, so by the time subjects are parsed the merge parent is the local side.

use crate::artifacts::branch::{MERGE_SUBJECT_REGEX, REMOTE_REFS_PREFIX};
use crate::artifacts::objects::commit_id::CommitId;
use std::collections::HashMap;
use std::sync::LazyLock;

static MERGE_SUBJECT: LazyLock<Result<regex::Regex, regex::Error>> =
    LazyLock::new(|| regex::Regex::new(MERGE_SUBJECT_REGEX));

/// Source and target branch names of a merge, empty when unknown
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash)]
pub struct FromInto {
    pub from: String,
    pub into: String,
}

impl FromInto {
    pub fn is_empty(&self) -> bool {
        self.from.is_empty() && self.into.is_empty()
    }

    /// A branch merged into itself, as `git pull` does with the remote side
    pub fn is_pull_merge(&self) -> bool {
        !self.from.is_empty() && self.from == self.into
    }
}

/// Parse a merge subject
///
/// # Returns
///
/// The `(from, into)` pair, both empty when the subject is not a recognised merge
pub fn parse_merge_subject(subject: &str) -> FromInto {
    let Ok(regex) = MERGE_SUBJECT.as_ref() else {
        tracing::warn!("merge subject regex failed to compile");
        return FromInto::default();
    };
    let Some(captures) = regex.captures(subject) else {
        return FromInto::default();
    };

    let mut from = captures
        .name("from")
        .map(|m| m.as_str().to_string())
        .unwrap_or_default();
    let mut into = captures
        .name("into")
        .map(|m| m.as_str().to_string())
        .unwrap_or_default();

    if captures.name("tracking").is_some() {
        from = strip_remote(&from);
    }
    if !from.is_empty() && captures.name("direction").is_some() && into.is_empty() {
        into = from.clone();
    }

    FromInto { from, into }
}

fn strip_remote(name: &str) -> String {
    let name = name.strip_prefix(REMOTE_REFS_PREFIX).unwrap_or(name);
    match name.split_once('/') {
        Some((_, rest)) if !rest.is_empty() => rest.to_string(),
        _ => name.to_string(),
    }
}

/// Merge subject parser with a per-commit cache and a per-snapshot name side-map
#[derive(Debug, Default)]
pub struct MergeSubjectParser {
    parsed: HashMap<CommitId, FromInto>,
    branch_names: HashMap<CommitId, String>,
}

impl MergeSubjectParser {
    pub fn new() -> Self {
        Self::default()
    }

    /// Forget the names recorded for the previous snapshot, keeping parsed subjects
    pub fn begin_snapshot(&mut self) {
        self.branch_names.clear();
    }

    /// Parse a commit subject and record the names it reveals
    ///
    /// # Arguments
    ///
    /// * `id` - The commit being parsed
    /// * `parent_ids` - Its parents in graph order, pull merges already swapped; only
    ///   two-parent commits are considered merges
    /// * `subject` - First line of the commit message
    ///
    /// # Returns
    ///
    /// The parsed pair, empty for non-merge commits
    pub fn parse_commit(
        &mut self,
        id: &CommitId,
        parent_ids: &[CommitId],
        subject: &str,
    ) -> FromInto {
        if parent_ids.len() != 2 {
            return FromInto::default();
        }

        let from_into = self
            .parsed
            .entry(id.clone())
            .or_insert_with(|| parse_merge_subject(subject))
            .clone();

        if !from_into.into.is_empty() {
            self.branch_names.insert(id.clone(), from_into.into.clone());
        }
        if !from_into.from.is_empty() {
            self.branch_names
                .insert(parent_ids[1].clone(), from_into.from.clone());
        }

        from_into
    }

    /// Name recorded for a commit during the current snapshot
    pub fn branch_name(&self, id: &CommitId) -> Option<&str> {
        self.branch_names
            .get(id)
            .map(String::as_str)
            .filter(|name| !name.is_empty())
    }

    pub fn cached_subjects(&self) -> usize {
        self.parsed.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use proptest::prelude::*;
    use rstest::rstest;

    fn id(value: &str) -> CommitId {
        CommitId::try_parse(value).unwrap()
    }

    #[rstest]
    #[case("Merge branch 'develop' into master", "develop", "master")]
    #[case("Merge from branch 'develop' into master", "develop", "master")]
    #[case("Merged branch 'develop' into master", "develop", "master")]
    #[case("Merged commit 'develop' into master", "develop", "master")]
    #[case("Merged 'develop' into master", "develop", "master")]
    #[case("merge branch 'develop' to master", "develop", "master")]
    #[case("Merge branch 'develop'", "develop", "")]
    #[case("Merge branch develop", "develop", "")]
    #[case(
        "Merge branch 'develop' of https://github.com/x/y into branches/fetch",
        "develop",
        "branches/fetch"
    )]
    #[case(
        "Merge branch 'branches/fetch' of https://github.com/x/y",
        "branches/fetch",
        "branches/fetch"
    )]
    #[case(
        "Merge remote-tracking branch 'refs/remotes/origin/branches/fetch' into branches/fetch",
        "branches/fetch",
        "branches/fetch"
    )]
    #[case(
        "Merge remote-tracking branch 'origin/feature' into feature",
        "feature",
        "feature"
    )]
    #[case("Fix the parser", "", "")]
    fn parses_known_subject_shapes(
        #[case] subject: &str,
        #[case] from: &str,
        #[case] into: &str,
    ) {
        assert_eq!(
            parse_merge_subject(subject),
            FromInto {
                from: from.to_string(),
                into: into.to_string()
            }
        );
    }

    #[test]
    fn records_names_for_merge_commit_and_merge_parent() {
        let mut parser = MergeSubjectParser::new();

        parser.parse_commit(
            &id("m"),
            &[id("c3"), id("x2")],
            "Merge branch 'feat' into main",
        );

        assert_eq!(parser.branch_name(&id("m")), Some("main"));
        assert_eq!(parser.branch_name(&id("x2")), Some("feat"));
        assert_eq!(parser.branch_name(&id("c3")), None);
    }

    #[rstest]
    #[case("Merge branch 'main' of https://github.com/x/y", true)]
    #[case("Merge remote-tracking branch 'origin/feature' into feature", true)]
    #[case("Merge branch 'main' into main", true)]
    #[case("Merge branch 'develop' of https://github.com/x/y into main", false)]
    #[case("Merge branch 'feat' into main", false)]
    #[case("Merge branch develop", false)]
    #[case("Fix the parser", false)]
    fn recognises_pull_merges(#[case] subject: &str, #[case] expected: bool) {
        assert_eq!(parse_merge_subject(subject).is_pull_merge(), expected);
    }

    #[test]
    fn pull_merge_names_its_local_side() {
        let mut parser = MergeSubjectParser::new();

        // graph order: the remote side r1 was swapped in front of the local side l1
        parser.parse_commit(
            &id("m"),
            &[id("r1"), id("l1")],
            "Merge branch 'main' of https://host/repo",
        );

        assert_eq!(parser.branch_name(&id("m")), Some("main"));
        assert_eq!(parser.branch_name(&id("l1")), Some("main"));
        assert_eq!(parser.branch_name(&id("r1")), None);
    }

    #[test]
    fn ignores_commits_that_are_not_two_parent_merges() {
        let mut parser = MergeSubjectParser::new();

        let single = parser.parse_commit(&id("a"), &[id("b")], "Merge branch 'feat' into main");
        let octopus = parser.parse_commit(
            &id("o"),
            &[id("b"), id("c"), id("d")],
            "Merge branches 'x' and 'y'",
        );

        assert!(single.is_empty());
        assert!(octopus.is_empty());
        assert_eq!(parser.branch_name(&id("a")), None);
        assert_eq!(parser.cached_subjects(), 0);
    }

    #[test]
    fn new_snapshot_forgets_names_but_keeps_the_cache() {
        let mut parser = MergeSubjectParser::new();
        parser.parse_commit(&id("m"), &[id("a"), id("b")], "Merge branch 'feat' into main");

        parser.begin_snapshot();

        assert_eq!(parser.branch_name(&id("b")), None);
        assert_eq!(parser.cached_subjects(), 1);
    }

    #[test]
    fn parsing_is_idempotent() {
        let mut parser = MergeSubjectParser::new();
        let parents = [id("a"), id("b")];

        let first = parser.parse_commit(&id("m"), &parents, "Merge branch 'feat' into main");
        let second = parser.parse_commit(&id("m"), &parents, "Merge branch 'feat' into main");

        assert_eq!(first, second);
    }

    fn branch_name() -> impl Strategy<Value = String> {
        "[a-z][a-z0-9_-]{0,8}(/[a-z][a-z0-9_-]{0,8})?"
    }

    proptest! {
        #[test]
        fn rendered_subjects_parse_back(
            from in branch_name(),
            into in branch_name(),
            template in 0usize..7,
        ) {
            let subject = match template {
                0 => format!("Merge branch '{from}' into {into}"),
                1 => format!("Merged branch '{from}' into {into}"),
                2 => format!("Merge from branch '{from}' into {into}"),
                3 => format!("Merge commit '{from}' into {into}"),
                4 => format!("Merged '{from}' into {into}"),
                5 => format!("Merge branch '{from}' of https://example.com/repo into {into}"),
                _ => format!("Merge branch '{from}' to {into}"),
            };

            let parsed = parse_merge_subject(&subject);

            prop_assert_eq!(parsed.from, from);
            prop_assert_eq!(parsed.into, into);
        }

        #[test]
        fn pull_merges_target_their_source(from in branch_name()) {
            let subject = format!("Merge branch '{from}' of https://example.com/repo");

            let parsed = parse_merge_subject(&subject);

            prop_assert_eq!(parsed.into, parsed.from.clone());
            prop_assert_eq!(parsed.from, from);
        }
    }
}
