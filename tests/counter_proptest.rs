//! Property tests: milestone counters always equal a recount of their issues.

mod common;

use issue_tracker::storage::{IssueFilter, NewIssue, SqliteStorage};
use proptest::prelude::*;

const MILESTONES: [&str; 2] = ["alpha", "beta"];

#[derive(Debug, Clone)]
enum Op {
    Create(Option<usize>),
    Close(usize),
    Open(usize),
    Reassign(usize, Option<usize>),
    BulkClose(Vec<usize>),
}

fn milestone_choice() -> impl Strategy<Value = Option<usize>> {
    prop::option::of(0..MILESTONES.len())
}

fn op_strategy() -> impl Strategy<Value = Op> {
    prop_oneof![
        3 => milestone_choice().prop_map(Op::Create),
        2 => any::<usize>().prop_map(Op::Close),
        1 => any::<usize>().prop_map(Op::Open),
        2 => (any::<usize>(), milestone_choice()).prop_map(|(i, m)| Op::Reassign(i, m)),
        1 => prop::collection::vec(any::<usize>(), 1..4).prop_map(Op::BulkClose),
    ]
}

fn recount(storage: &SqliteStorage, title: &str) -> (i64, i64) {
    let all = IssueFilter {
        milestone: Some(title.to_string()),
        ..IssueFilter::default()
    };
    let closed = IssueFilter {
        is_closed: Some(true),
        ..all.clone()
    };
    let total = storage.list_filtered(&all).unwrap().len();
    let closed = storage.list_filtered(&closed).unwrap().len();
    (
        i64::try_from(total).unwrap(),
        i64::try_from(closed).unwrap(),
    )
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(64))]

    #[test]
    fn counters_match_recount(ops in prop::collection::vec(op_strategy(), 1..40)) {
        common::init_test_logging();
        let mut storage = SqliteStorage::open_memory().unwrap();
        storage.register_user("alice", "secret1").unwrap();
        let milestone_ids: Vec<i64> = MILESTONES
            .iter()
            .map(|title| {
                storage
                    .create_milestone(
                        &issue_tracker::storage::MilestoneDraft {
                            title: (*title).to_string(),
                            ..Default::default()
                        },
                        "alice",
                    )
                    .unwrap()
                    .id
            })
            .collect();
        let mut issues: Vec<i64> = Vec::new();

        for op in ops {
            match op {
                Op::Create(m) => {
                    let mut new_issue = NewIssue::titled("generated");
                    new_issue.milestone_id = m.map(|i| milestone_ids[i]);
                    issues.push(storage.create_issue(&new_issue, "alice").unwrap());
                }
                Op::Close(i) if !issues.is_empty() => {
                    storage.close_issue(issues[i % issues.len()], "alice").unwrap();
                }
                Op::Open(i) if !issues.is_empty() => {
                    storage.open_issue(issues[i % issues.len()], "alice").unwrap();
                }
                Op::Reassign(i, m) if !issues.is_empty() => {
                    storage
                        .reassign_milestone(
                            issues[i % issues.len()],
                            m.map(|k| milestone_ids[k]),
                            "alice",
                        )
                        .unwrap();
                }
                Op::BulkClose(picks) if !issues.is_empty() => {
                    let ids: Vec<i64> = picks.iter().map(|i| issues[i % issues.len()]).collect();
                    storage.close_issues(&ids, "alice").unwrap();
                }
                _ => {}
            }
        }

        for (title, id) in MILESTONES.iter().zip(&milestone_ids) {
            let milestone = storage.get_milestone(*id).unwrap();
            prop_assert!(milestone.closed_issues >= 0);
            prop_assert!(milestone.closed_issues <= milestone.total_issues);
            prop_assert_eq!(
                (milestone.total_issues, milestone.closed_issues),
                recount(&storage, title)
            );
        }
    }
}
