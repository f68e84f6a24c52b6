#![allow(dead_code)]

use issue_tracker::model::{Label, Milestone};
use issue_tracker::storage::{LabelDraft, MilestoneDraft, NewIssue, SqliteStorage};

pub const PASSWORD: &str = "secret1";

/// Register each user with [`PASSWORD`].
pub fn users(storage: &mut SqliteStorage, ids: &[&str]) {
    for id in ids {
        storage.register_user(id, PASSWORD).expect("register user");
    }
}

pub fn label_draft(name: &str) -> LabelDraft {
    LabelDraft {
        name: name.to_string(),
        description: None,
        text_color: "#FFFFFF".to_string(),
        bg_color: "#D73A4A".to_string(),
    }
}

pub fn label(storage: &mut SqliteStorage, name: &str) -> Label {
    storage
        .create_label(&label_draft(name), "tester")
        .expect("create label")
}

pub fn milestone_draft(title: &str) -> MilestoneDraft {
    MilestoneDraft {
        title: title.to_string(),
        ..MilestoneDraft::default()
    }
}

pub fn milestone(storage: &mut SqliteStorage, title: &str) -> Milestone {
    storage
        .create_milestone(&milestone_draft(title), "tester")
        .expect("create milestone")
}

/// Create a plain issue authored by `author`.
pub fn issue(storage: &mut SqliteStorage, title: &str, author: &str) -> i64 {
    storage
        .create_issue(&NewIssue::titled(title), author)
        .expect("create issue")
}

/// Create an issue inside a milestone.
pub fn issue_in(storage: &mut SqliteStorage, title: &str, author: &str, milestone_id: i64) -> i64 {
    storage
        .create_issue(&NewIssue::titled(title).with_milestone(milestone_id), author)
        .expect("create issue")
}

/// Seed: users alice/bob1, labels bug/ui, milestone v1.0, three issues.
///
/// Returns (bug, ui, v1.0) ids. Issue 1 (alice, bug, v1.0, assigned bob1),
/// issue 2 (bob1, bug+ui), issue 3 (alice, closed, v1.0).
pub fn seeded(storage: &mut SqliteStorage) -> (i64, i64, i64) {
    users(storage, &["alice", "bob1"]);
    let bug = label(storage, "bug").id;
    let ui = label(storage, "ui").id;
    let v1 = milestone(storage, "v1.0").id;

    storage
        .create_issue(
            &NewIssue::titled("Crash on start")
                .with_labels(&[bug])
                .with_milestone(v1)
                .with_assignees(&["bob1"]),
            "alice",
        )
        .expect("issue 1");
    storage
        .create_issue(&NewIssue::titled("Button misaligned").with_labels(&[bug, ui]), "bob1")
        .expect("issue 2");
    let third = storage
        .create_issue(&NewIssue::titled("Write docs").with_milestone(v1), "alice")
        .expect("issue 3");
    storage.close_issue(third, "alice").expect("close issue 3");

    (bug, ui, v1)
}
