use assert_cmd::Command;
use assert_fs::TempDir;
use assert_fs::prelude::*;
use rstest::fixture;
use std::path::Path;

pub const CONFIG_FILE: &str = "config.json";

#[fixture]
pub fn repository_dir() -> TempDir {
    TempDir::new().expect("Failed to create temp dir")
}

/// A repository with `main` at two commits, a merged `feat` branch and a `wip` branch
#[fixture]
pub fn history_dir(repository_dir: TempDir) -> TempDir {
    let dir = repository_dir.path();
    run_git_command(dir, &["init", "-q", "-b", "main"])
        .assert()
        .success();

    commit_file(dir, "1.txt", "one", "Initial commit");
    commit_file(dir, "2.txt", "two", "Second commit");

    run_git_command(dir, &["checkout", "-q", "-b", "feat"])
        .assert()
        .success();
    commit_file(dir, "feat.txt", "feat", "Add feature");
    run_git_command(dir, &["checkout", "-q", "main"])
        .assert()
        .success();
    commit_file(dir, "3.txt", "three", "Third commit");
    run_git_command(
        dir,
        &["merge", "-q", "--no-ff", "-m", "Merge branch 'feat' into main", "feat"],
    )
    .assert()
    .success();
    run_git_command(dir, &["branch", "-q", "-D", "feat"])
        .assert()
        .success();

    run_git_command(dir, &["checkout", "-q", "-b", "wip"])
        .assert()
        .success();
    commit_file(dir, "wip.txt", "wip", "Work in progress");
    run_git_command(dir, &["checkout", "-q", "main"])
        .assert()
        .success();
    run_git_command(dir, &["tag", "v1.0"]).assert().success();

    repository_dir
}

pub fn run_git_command(dir: &Path, args: &[&str]) -> Command {
    let mut cmd = Command::new("git");
    cmd.current_dir(dir);
    cmd.args(["-c", "user.name=fake_user", "-c", "user.email=fake_email@email.com"]);
    cmd.args(["-c", "commit.gpgsign=false", "-c", "tag.gpgsign=false"]);
    cmd.envs(vec![
        ("GIT_AUTHOR_DATE", "2023-01-01 12:00:00 +0000"),
        ("GIT_COMMITTER_DATE", "2023-01-01 12:00:00 +0000"),
    ]);
    for arg in args {
        cmd.arg(arg);
    }
    cmd
}

pub fn commit_file(dir: &Path, name: &str, content: &str, message: &str) {
    std::fs::write(dir.join(name), content).expect("Failed to write file");
    run_git_command(dir, &["add", name]).assert().success();
    run_git_command(dir, &["commit", "-q", "-m", message])
        .assert()
        .success();
}

/// Run the binary in `dir` with its config file kept inside `config_dir`
pub fn run_branchgraph_command(dir: &Path, config_dir: &TempDir, args: &[&str]) -> Command {
    let mut cmd = Command::cargo_bin("branchgraph").expect("Failed to find branchgraph binary");
    cmd.envs(vec![("NO_PAGER", "1"), ("NO_COLOR", "1")]);
    cmd.env_remove("RUST_LOG");
    cmd.current_dir(dir);
    cmd.arg("--config").arg(config_dir.child(CONFIG_FILE).path());
    for arg in args {
        cmd.arg(arg);
    }
    cmd
}
