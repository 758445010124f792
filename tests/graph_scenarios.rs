mod common;

use branchgraph::artifacts::branch::git_branch::GitBranch;
use branchgraph::artifacts::graph::assignment;
use branchgraph::artifacts::graph::glyph::Glyph;
use branchgraph::artifacts::graph::repo::Repo;
use branchgraph::artifacts::graph::selection;
use branchgraph::artifacts::graph::view_repo::ViewRepo;
use branchgraph::artifacts::objects::commit::GitCommit;
use branchgraph::artifacts::objects::commit_id::CommitId;
use branchgraph::artifacts::status::status_info::Status;
use common::graph::{build, cell, commit, engine, id, merge_log, owner_name, row_of, view};
use pretty_assertions::assert_eq;
use rstest::rstest;
use std::collections::BTreeMap;

fn linear_log() -> Vec<GitCommit> {
    vec![
        commit("c3", &["c2"], "three"),
        commit("c2", &["c1"], "two"),
        commit("c1", &[], "one"),
    ]
}

fn main_at(tip: &str) -> GitBranch {
    GitBranch::local("main", id(tip)).with_current(true)
}

#[test]
fn s1_linear_history_is_a_single_column() {
    let mut engine = engine(&["main"]);
    let repo = build(&mut engine, linear_log(), vec![main_at("c3")]);

    let view = view(&engine, &repo, &Status::default(), &[]);

    assert_eq!(view.branch_names(), vec!["main"]);
    assert_eq!(view.graph_width, 2);
    assert!(view.commits.iter().all(|c| c.branch_name == "main"));
    assert!(view.commits.iter().all(|c| c.branch_column == 0));
    assert!(cell(&view, 0, 0).branch.contains(Glyph::ACTIVE_TIP));
    assert_eq!(cell(&view, 1, 0).branch, Glyph::COMMIT);
    assert_eq!(cell(&view, 2, 0).branch, Glyph::BOTTOM);
    for commit in &view.commits {
        assert!(commit.graph[0].connect.is_empty());
        assert!(!commit.graph[0].branch.is_connector());
    }
}

#[test]
fn s2_merged_branch_gets_its_own_column() {
    let mut engine = engine(&["main"]);
    let repo = build(
        &mut engine,
        merge_log(),
        vec![main_at("c4"), GitBranch::local("feat", id("x2"))],
    );

    let view = view(&engine, &repo, &Status::default(), &["feat"]);

    assert_eq!(view.branch_names(), vec!["main", "feat"]);
    assert_eq!(owner_name(&repo, "x2"), "feat");
    assert_eq!(owner_name(&repo, "x1"), "feat");
    assert_eq!(owner_name(&repo, "c1"), "main");
    assert_eq!(view.branches[1].column, 1);
    assert_eq!(view.branches[1].parent_branch_name.as_deref(), Some("main"));

    let c4 = row_of(&view, "c4");
    let x2 = row_of(&view, "x2");
    assert!(cell(&view, c4, 1).connect.contains(Glyph::MERGE_RIGHT));
    assert!(cell(&view, x2, 1).branch.contains(Glyph::BRANCH_LEFT));
    assert!(cell(&view, x2, 1).branch.contains(Glyph::ACTIVE_TIP));
}

#[test]
fn s3_deleted_branch_is_recovered_from_the_merge_subject() {
    let mut engine = engine(&["main"]);
    let repo = build(&mut engine, merge_log(), vec![main_at("c4")]);

    let view = view(&engine, &repo, &Status::default(), &["feat"]);

    assert_eq!(view.branch_names(), vec!["main", "feat:x2"]);
    let feat = &view.branches[1];
    assert!(feat.is_named_branch);
    assert!(!feat.is_git_branch);
    assert_eq!(feat.display_name, "feat");
    assert_eq!(feat.tip_id, id("x2"));
    assert_eq!(feat.bottom_id, id("x1"));

    let x2 = row_of(&view, "x2");
    assert!(cell(&view, x2, 1).branch.contains(Glyph::TIP));
    assert!(!cell(&view, x2, 1).branch.contains(Glyph::ACTIVE_TIP));
    assert!(cell(&view, 0, 1).connect.contains(Glyph::MERGE_RIGHT));
}

#[test]
fn s4_ambiguous_commits_become_a_multi_branch_until_a_merge_names_them() {
    let refs = || {
        vec![
            main_at("c1"),
            GitBranch::local("alpha", id("a1")),
            GitBranch::local("beta", id("t1")),
        ]
    };
    let shared = || {
        vec![
            commit("a1", &["b2"], "alpha work"),
            commit("t1", &["b2"], "beta work"),
            commit("b2", &["b1"], "shared two"),
            commit("b1", &["c1"], "shared one"),
            commit("c1", &[], "one"),
        ]
    };
    let mut engine = engine(&["main"]);

    let before = build(&mut engine, shared(), refs());

    assert_eq!(owner_name(&before, "b2"), "multi:b2");
    assert_eq!(owner_name(&before, "b1"), "multi:b2");
    let multi = before.branch_by_name("multi:b2").unwrap();
    assert!(before.branch(multi).is_multi_branch());

    let mut log = vec![commit("m1", &["c1", "b2"], "Merge branch 'shared' into main")];
    log.extend(shared());
    let mut refs = refs();
    refs[0] = main_at("m1");
    let after = build(&mut engine, log, refs);

    assert_eq!(owner_name(&after, "b2"), "shared:b2");
    assert_eq!(owner_name(&after, "b1"), "shared:b2");
    assert!(after.branch_by_name("multi:b2").is_none());
    let named = after.branch_by_name("shared:b2").unwrap();
    assert!(after.branch(named).is_named_branch());
    assert_eq!(after.branch(named).display_name, "shared");
}

#[test]
fn s5_opening_a_merge_row_shows_the_merged_branch() {
    let mut engine = engine(&["main"]);
    let repo = build(&mut engine, merge_log(), vec![main_at("c4")]);
    let collapsed = view(&engine, &repo, &Status::default(), &["main"]);

    let c4 = row_of(&collapsed, "c4");
    assert!(collapsed.commits[c4].is_more);

    let names = selection::open_branch(&collapsed, &collapsed.branch_names(), c4).unwrap();
    let opened = engine.build_view(repo.clone(), &Status::default(), &names);
    let expected = view(&engine, &repo, &Status::default(), &["main", "feat:x2"]);

    assert_eq!(opened.branch_names(), vec!["main", "feat:x2"]);
    assert_eq!(
        serde_json::to_string(&opened).unwrap(),
        serde_json::to_string(&expected).unwrap()
    );

    let shown = opened.branch_names();
    let reopened = selection::open_branch(&opened, &shown, row_of(&opened, "c4")).unwrap();
    assert_eq!(reopened, names);
    let closed = selection::close_branch(&opened, &shown, row_of(&opened, "x2")).unwrap();
    assert_eq!(closed, vec!["main"]);
}

#[test]
fn s6_uncommitted_changes_get_a_status_row() {
    let mut engine = engine(&["main"]);
    let repo = build(&mut engine, linear_log(), vec![main_at("c3")]);
    let status = Status {
        modified: 2,
        ..Status::default()
    };

    let view = view(&engine, &repo, &status, &["main"]);

    let first = &view.commits[0];
    assert_eq!(first.id, CommitId::uncommitted());
    assert_eq!(first.id.as_ref(), "0".repeat(40));
    assert_eq!(first.subject, "2 uncommitted changes");
    assert_eq!(first.parent_ids, vec![id("c3")]);
    assert!(first.is_uncommitted);
    assert!(first.graph.iter().all(|column| column.connect.is_empty()));
    assert!(first.graph.iter().all(|column| !column.branch.is_connector()));
    assert_eq!(view.commits.len(), 4);
}

#[test]
fn identical_input_gives_identical_snapshots() {
    let snapshot = || {
        let mut engine = engine(&["main"]);
        let repo = build(&mut engine, merge_log(), vec![main_at("c4")]);
        let view = view(&engine, &repo, &Status::default(), &["feat"]);
        serde_json::to_string(&view).unwrap()
    };

    assert_eq!(snapshot(), snapshot());
}

fn multi_remote_repo() -> (Vec<GitCommit>, Vec<GitBranch>) {
    (
        vec![
            commit("w1", &["t2"], "wip"),
            commit("c4", &["c3", "x2"], "Merge branch 'feat' into main"),
            commit("t2", &["t1"], "topic two"),
            commit("c3", &["c2"], "three"),
            commit("t1", &["c2"], "topic one"),
            commit("c2", &["c1"], "two"),
            commit("x2", &["x1"], "feat two"),
            commit("x1", &["c1"], "feat one"),
            commit("c1", &[], "one"),
        ],
        vec![
            main_at("c4").with_remote_name("origin/main"),
            GitBranch::local("topic", id("t2")),
            GitBranch::local("wip", id("w1")),
            GitBranch::remote("origin/main", id("c4")),
        ],
    )
}

fn check_invariants(repo: &Repo) {
    assignment::verify(repo).unwrap();

    for commit in repo.commit_indices() {
        let owner = repo.owner(commit).expect("every commit has an owner");
        assert!(owner.index() < repo.branches().len());
    }

    for branch in repo.branch_indices() {
        let b = repo.branch(branch);
        let bottom = b.bottom.expect("bottom is set");
        let mut walk = Some(b.tip);
        let mut reached = false;
        while let Some(current) = walk {
            if current == bottom {
                reached = true;
                break;
            }
            walk = repo.parent(current, 0);
        }
        assert!(reached, "bottom of {} is below its tip", b.name);
        assert!(repo.ancestors(branch).len() < repo.branches().len());
        if let Some(other) = repo.counterpart(branch) {
            assert_eq!(repo.counterpart(other), Some(branch));
        }
    }
}

#[rstest]
#[case::linear(linear_log(), vec![main_at("c3")])]
#[case::merged(merge_log(), vec![main_at("c4")])]
#[case::remotes(multi_remote_repo().0, multi_remote_repo().1)]
fn assignment_keeps_the_model_consistent(
    #[case] log: Vec<GitCommit>,
    #[case] refs: Vec<GitBranch>,
) {
    let mut engine = engine(&["origin/main", "main"]);
    let repo = build(&mut engine, log, refs);

    check_invariants(&repo);

    let names = repo
        .branches()
        .iter()
        .map(|branch| branch.name.clone())
        .collect::<Vec<_>>();
    let view = engine.build_view(repo.clone(), &Status::default(), &names);
    assert_eq!(view.graph_width, 2 * view.branches.len());
    for commit in &view.commits {
        assert_eq!(commit.graph.len(), view.branches.len());
    }
}

#[rstest]
#[case(&[])]
#[case(&["wip"])]
#[case(&["topic", "feat"])]
#[case(&["origin/main", "main", "wip", "nope"])]
fn selecting_a_selection_changes_nothing(#[case] shown: &[&str]) {
    let (log, refs) = multi_remote_repo();
    let mut engine = engine(&["origin/main", "main"]);
    let repo = build(&mut engine, log, refs);

    let first = view(&engine, &repo, &Status::default(), shown);
    let again = engine.build_view(repo.clone(), &Status::default(), &first.branch_names());

    assert_eq!(again.branch_names(), first.branch_names());
}

#[rstest]
#[case(&["topic", "feat:x2"], &["origin/main", "multi:t2", "topic", "feat:x2"])]
#[case(&["feat:x2", "topic"], &["origin/main", "feat:x2", "multi:t2", "topic"])]
#[case(&["wip", "main"], &["origin/main", "multi:t2", "wip"])]
fn columns_follow_the_requested_order(#[case] shown: &[&str], #[case] expected: &[&str]) {
    let (log, refs) = multi_remote_repo();
    let mut engine = engine(&["origin/main", "main"]);
    let repo = build(&mut engine, log, refs);

    let view = view(&engine, &repo, &Status::default(), shown);

    assert_eq!(view.branch_names(), expected);
}

/// Per commit id: owner, column, own cell and whether it hides connections
fn layout_by_id(view: &ViewRepo) -> BTreeMap<String, (String, usize, Glyph, bool)> {
    view.commits
        .iter()
        .map(|commit| {
            (
                commit.id.as_ref().to_string(),
                (
                    commit.branch_name.clone(),
                    commit.branch_column,
                    commit.graph[commit.branch_column].branch,
                    commit.is_more,
                ),
            )
        })
        .collect()
}

#[test]
fn unrelated_commits_may_come_in_any_order() {
    let permuted = vec![
        commit("c4", &["c3", "x2"], "Merge branch 'feat' into main"),
        commit("x2", &["x1"], "feat two"),
        commit("x1", &["c1"], "feat one"),
        commit("c3", &["c2"], "three"),
        commit("c2", &["c1"], "two"),
        commit("c1", &[], "one"),
    ];
    let mut engine = engine(&["main"]);
    let repo = build(&mut engine, merge_log(), vec![main_at("c4")]);
    let other = build(&mut engine, permuted, vec![main_at("c4")]);

    for value in ["c4", "c3", "c2", "x2", "x1", "c1"] {
        assert_eq!(owner_name(&repo, value), owner_name(&other, value), "{value}");
    }

    let view = view(&engine, &repo, &Status::default(), &["feat"]);
    let other_view = common::graph::view(&engine, &other, &Status::default(), &["feat"]);
    assert_eq!(view.branch_names(), other_view.branch_names());
    assert_eq!(view.graph_width, other_view.graph_width);
    assert_eq!(layout_by_id(&view), layout_by_id(&other_view));
}

#[test]
fn pull_merge_keeps_the_branch_on_its_remote_line() {
    let log = vec![
        commit("m1", &["l1", "r1"], "Merge branch 'main' of https://host/repo"),
        commit("l1", &["c1"], "local work"),
        commit("r1", &["c1"], "pushed work"),
        commit("c1", &[], "one"),
    ];
    let refs = vec![
        main_at("m1").with_remote_name("origin/main"),
        GitBranch::remote("origin/main", id("r1")),
    ];
    let mut engine = engine(&["origin/main", "main"]);
    let repo = build(&mut engine, log, refs);

    let m1 = repo.commit_by_id(&id("m1")).unwrap();
    assert_eq!(repo.parent(m1, 0), repo.commit_by_id(&id("r1")));
    assert_eq!(repo.parent(m1, 1), repo.commit_by_id(&id("l1")));
    assert_eq!(owner_name(&repo, "m1"), "main");
    assert_eq!(owner_name(&repo, "r1"), "origin/main");
    assert_eq!(owner_name(&repo, "l1"), "main:l1");
    check_invariants(&repo);
}
