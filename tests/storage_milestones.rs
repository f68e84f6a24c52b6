//! Milestone tracker tests: metadata, listing and denormalized counters.

mod common;

use chrono::NaiveDate;
use common::{fixtures, test_db};
use issue_tracker::TrackerError;
use issue_tracker::storage::{CounterOp, MilestoneDraft, MilestoneState};

#[test]
fn create_and_update_metadata() {
    let _log = common::test_log("create_and_update_metadata");
    let mut storage = test_db();

    let created = storage
        .create_milestone(
            &MilestoneDraft {
                title: " v1.0 ".to_string(),
                description: Some("First release".to_string()),
                deadline: NaiveDate::from_ymd_opt(2026, 3, 1),
            },
            "tester",
        )
        .unwrap();
    assert_eq!(created.title, "v1.0");
    assert_eq!((created.total_issues, created.closed_issues), (0, 0));
    assert!(!created.is_closed);

    let updated = storage
        .update_milestone(created.id, &fixtures::milestone_draft("v1.0.0"), "tester")
        .unwrap();
    assert_eq!(updated.title, "v1.0.0");
    assert_eq!(updated.deadline, None);
    assert_eq!(updated.description, None);

    assert!(matches!(
        storage.create_milestone(&fixtures::milestone_draft("v1.0.0"), "tester"),
        Err(TrackerError::DuplicateMilestone { .. })
    ));
    assert!(matches!(
        storage.create_milestone(&fixtures::milestone_draft("   "), "tester"),
        Err(TrackerError::Validation { .. })
    ));
}

#[test]
fn counters_follow_issue_lifecycle() {
    let mut storage = test_db();
    fixtures::users(&mut storage, &["alice"]);
    let v1 = fixtures::milestone(&mut storage, "v1.0").id;

    let a = fixtures::issue_in(&mut storage, "a", "alice", v1);
    let b = fixtures::issue_in(&mut storage, "b", "alice", v1);
    fixtures::issue_in(&mut storage, "c", "alice", v1);
    fixtures::issue(&mut storage, "unplanned", "alice");

    storage.close_issue(a, "alice").unwrap();
    storage.close_issue(b, "alice").unwrap();
    // Closing twice is a no-op for the counters.
    assert!(!storage.close_issue(b, "alice").unwrap());

    let milestone = storage.get_milestone(v1).unwrap();
    assert_eq!(milestone.total_issues, 3);
    assert_eq!(milestone.closed_issues, 2);
    assert_eq!(milestone.open_issues(), 1);
    assert_eq!(milestone.progress_percent(), 66);

    storage.open_issue(a, "alice").unwrap();
    let milestone = storage.get_milestone(v1).unwrap();
    assert_eq!((milestone.total_issues, milestone.closed_issues), (3, 1));
}

#[test]
fn reassigning_moves_counter_units() {
    let mut storage = test_db();
    fixtures::users(&mut storage, &["alice"]);
    let v1 = fixtures::milestone(&mut storage, "v1.0").id;
    let v2 = fixtures::milestone(&mut storage, "v2.0").id;

    let open = fixtures::issue_in(&mut storage, "open", "alice", v1);
    let closed = fixtures::issue_in(&mut storage, "closed", "alice", v1);
    storage.close_issue(closed, "alice").unwrap();

    assert!(storage.reassign_milestone(closed, Some(v2), "alice").unwrap());
    assert!(storage.reassign_milestone(open, Some(v2), "alice").unwrap());
    assert!(!storage.reassign_milestone(open, Some(v2), "alice").unwrap());

    let m1 = storage.get_milestone(v1).unwrap();
    let m2 = storage.get_milestone(v2).unwrap();
    assert_eq!((m1.total_issues, m1.closed_issues), (0, 0));
    assert_eq!((m2.total_issues, m2.closed_issues), (2, 1));

    assert!(storage.reassign_milestone(closed, None, "alice").unwrap());
    let m2 = storage.get_milestone(v2).unwrap();
    assert_eq!((m2.total_issues, m2.closed_issues), (1, 0));
    assert_eq!(storage.get_issue(closed).unwrap().milestone_id, None);

    assert!(matches!(
        storage.reassign_milestone(open, Some(999), "alice"),
        Err(TrackerError::MilestoneNotFound { id: 999 })
    ));
    // The failed move left everything in place.
    assert_eq!(storage.get_issue(open).unwrap().milestone_id, Some(v2));
    assert_eq!(storage.get_milestone(v2).unwrap().total_issues, 1);
}

#[test]
fn counter_guards_refuse_invalid_adjustments() {
    let mut storage = test_db();
    let v1 = fixtures::milestone(&mut storage, "v1.0").id;

    assert!(matches!(
        storage.decrement_total(v1),
        Err(TrackerError::CounterInvariant { .. })
    ));
    assert!(matches!(
        storage.increment_closed(v1),
        Err(TrackerError::CounterInvariant { .. })
    ));

    storage.increment_total(v1).unwrap();
    storage.increment_closed(v1).unwrap();
    // total == closed: removing an open unit would break closed <= total.
    assert!(matches!(
        storage.decrement_total(v1),
        Err(TrackerError::CounterInvariant { .. })
    ));
    storage.decrement_closed(v1).unwrap();
    storage.adjust_milestone_counter(v1, CounterOp::DecrementTotal).unwrap();

    let milestone = storage.get_milestone(v1).unwrap();
    assert_eq!((milestone.total_issues, milestone.closed_issues), (0, 0));

    assert!(matches!(
        storage.increment_total(404),
        Err(TrackerError::MilestoneNotFound { id: 404 })
    ));
}

#[test]
fn list_by_state_and_deadline() {
    let mut storage = test_db();
    storage
        .create_milestone(
            &MilestoneDraft {
                title: "late".to_string(),
                deadline: NaiveDate::from_ymd_opt(2027, 1, 1),
                ..MilestoneDraft::default()
            },
            "tester",
        )
        .unwrap();
    storage
        .create_milestone(
            &MilestoneDraft {
                title: "early".to_string(),
                deadline: NaiveDate::from_ymd_opt(2026, 1, 1),
                ..MilestoneDraft::default()
            },
            "tester",
        )
        .unwrap();
    fixtures::milestone(&mut storage, "backlog");
    let done = fixtures::milestone(&mut storage, "done");
    assert!(storage.close_milestone(done.id, "tester").unwrap().is_closed);

    let titles = |state| -> Vec<String> {
        storage
            .list_milestones(state)
            .unwrap()
            .into_iter()
            .map(|m| m.title)
            .collect()
    };
    assert_eq!(titles(MilestoneState::Open), vec!["early", "late", "backlog"]);
    assert_eq!(titles(MilestoneState::Closed), vec!["done"]);
    assert_eq!(titles(MilestoneState::All).len(), 4);
    assert_eq!(storage.list_open_milestones().unwrap().len(), 3);

    storage.reopen_milestone(done.id, "tester").unwrap();
    assert_eq!(storage.list_open_milestones().unwrap().len(), 4);
}

#[test]
fn deleting_milestone_keeps_issues() {
    let mut storage = test_db();
    fixtures::users(&mut storage, &["alice"]);
    let v1 = fixtures::milestone(&mut storage, "v1.0").id;
    let id = fixtures::issue_in(&mut storage, "planned", "alice", v1);

    storage.delete_milestone(v1, "alice").unwrap();

    let issue = storage.get_issue(id).unwrap();
    assert_eq!(issue.milestone_id, None);
    assert!(storage.get_issue_detail(id).unwrap().milestone.is_none());
    assert!(matches!(
        storage.delete_milestone(v1, "alice"),
        Err(TrackerError::MilestoneNotFound { .. })
    ));
}
