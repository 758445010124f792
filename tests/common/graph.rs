use branchgraph::areas::config::EngineOptions;
use branchgraph::artifacts::branch::git_branch::GitBranch;
use branchgraph::artifacts::graph::GraphEngine;
use branchgraph::artifacts::graph::glyph::GraphColumn;
use branchgraph::artifacts::graph::repo::Repo;
use branchgraph::artifacts::graph::view_repo::ViewRepo;
use branchgraph::artifacts::objects::commit::GitCommit;
use branchgraph::artifacts::objects::commit_id::CommitId;
use branchgraph::artifacts::status::status_info::Status;
use chrono::{FixedOffset, TimeZone};
use std::sync::Arc;

pub const BASE_TIME: i64 = 1_700_000_000;

pub fn id(value: &str) -> CommitId {
    CommitId::try_parse(value).expect("valid commit id")
}

pub fn commit(value: &str, parents: &[&str], message: &str) -> GitCommit {
    let time = FixedOffset::east_opt(3600)
        .expect("valid offset")
        .timestamp_opt(BASE_TIME, 0)
        .unwrap();
    GitCommit::from_parts(
        id(value),
        parents.iter().map(|parent| id(parent)).collect(),
        "Ada",
        time,
        message,
    )
}

pub fn engine(priority: &[&str]) -> GraphEngine {
    GraphEngine::new(EngineOptions {
        branch_priority: priority.iter().map(|name| name.to_string()).collect(),
        ..EngineOptions::default()
    })
}

pub fn build(engine: &mut GraphEngine, log: Vec<GitCommit>, refs: Vec<GitBranch>) -> Arc<Repo> {
    Arc::new(
        engine
            .build_repo("/repo", log, refs, vec![])
            .expect("consistent graph"),
    )
}

pub fn names(values: &[&str]) -> Vec<String> {
    values.iter().map(|value| value.to_string()).collect()
}

pub fn view(engine: &GraphEngine, repo: &Arc<Repo>, status: &Status, shown: &[&str]) -> ViewRepo {
    engine.build_view(Arc::clone(repo), status, &names(shown))
}

pub fn cell(view: &ViewRepo, row: usize, column: usize) -> GraphColumn {
    view.commits[row].graph[column]
}

pub fn row_of(view: &ViewRepo, value: &str) -> usize {
    view.row_of(&id(value)).expect("commit is shown")
}

pub fn owner_name(repo: &Repo, value: &str) -> String {
    let commit = repo.commit_by_id(&id(value)).expect("commit in log");
    let owner = repo.owner(commit).expect("commit has an owner");
    repo.branch(owner).name.clone()
}

/// `c4=[c3,x2] "Merge branch 'feat' into main"`, `c3→c2→c1`, `x2→x1→c1`
pub fn merge_log() -> Vec<GitCommit> {
    vec![
        commit("c4", &["c3", "x2"], "Merge branch 'feat' into main"),
        commit("c3", &["c2"], "three"),
        commit("c2", &["c1"], "two"),
        commit("x2", &["x1"], "feat two"),
        commit("x1", &["c1"], "feat one"),
        commit("c1", &[], "one"),
    ]
}
