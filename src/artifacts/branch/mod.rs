pub mod git_branch;
pub mod merge_subject;

pub const REMOTES_PREFIX: &str = "remotes/";
pub const REMOTE_REFS_PREFIX: &str = "refs/remotes/";
pub const TAG_REFS_PREFIX: &str = "refs/tags/";
pub const DEREFERENCED_TAG_SUFFIX: &str = "^{}";
pub const SYMBOLIC_REF_MARKER: &str = " -> ";

/// One line of `git branch -vv --no-color --no-abbrev --all`
pub const BRANCH_LINE_REGEX: &str = r"^(\*)?\s+(\(HEAD detached (?:at|from) (\S+)\)|(\S+))\s+(\S+)(\s+)?(\[(\S+)(:\s)?(ahead\s(\d+))?(,\s)?(behind\s(\d+))?(gone)?\])?(\s+)?(.+)?";

/// Merge commit subjects, e.g. `Merge branch 'feat' of https://host/repo into main`
pub const MERGE_SUBJECT_REGEX: &str = r"(?i:merged?)(?P<tracking>\s+remote-tracking)?(\s+(from branch|branch|commit|from))?\s+'?(?P<from>[0-9A-Za-z_/-]+)'?(?P<direction>\s+of\s+[^\s]+)?(\s+(into|to)\s+(?P<into>[0-9A-Za-z_/-]+))?";

pub const DEFAULT_BRANCH_PRIORITY: [&str; 6] = [
    "origin/main",
    "main",
    "origin/master",
    "master",
    "origin/develop",
    "develop",
];

/// Branches that anchor the graph and can never be closed
pub const ROOT_BRANCH_NAMES: phf::Set<&'static str> = phf::phf_set! {
    "main",
    "master",
    "origin/main",
    "origin/master",
};

/// Branches used as the initial selection when nothing is current
pub const FALLBACK_BRANCH_NAMES: [&str; 4] = ["origin/main", "main", "origin/master", "master"];
