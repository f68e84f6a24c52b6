use crate::model::{Event, Milestone, StateChange};
use serde::{Deserialize, Serialize};

/// Milestone with its derived progress figures.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MilestoneProgress {
    #[serde(flatten)]
    pub milestone: Milestone,
    pub open_issues: i64,
    pub progress_percent: i64,
}

impl From<Milestone> for MilestoneProgress {
    fn from(milestone: Milestone) -> Self {
        Self {
            open_issues: milestone.open_issues(),
            progress_percent: milestone.progress_percent(),
            milestone,
        }
    }
}

/// Result of a bulk open/close.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StateChangeReport {
    pub changes: Vec<StateChange>,
    /// How many issues actually moved.
    pub changed: usize,
}

impl From<Vec<StateChange>> for StateChangeReport {
    fn from(changes: Vec<StateChange>) -> Self {
        let changed = changes.iter().filter(|c| c.changed).count();
        Self { changes, changed }
    }
}

/// Audit history for one issue, newest first.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct IssueHistory {
    pub issue_id: i64,
    pub events: Vec<Event>,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn milestone(total: i64, closed: i64) -> Milestone {
        Milestone {
            id: 3,
            title: "v2".to_string(),
            description: None,
            deadline: None,
            is_closed: false,
            total_issues: total,
            closed_issues: closed,
        }
    }

    #[test]
    fn milestone_progress_flattens() {
        let json = serde_json::to_value(MilestoneProgress::from(milestone(4, 3))).unwrap();
        assert_eq!(json["title"], "v2");
        assert_eq!(json["open_issues"], 1);
        assert_eq!(json["progress_percent"], 75);
    }

    #[test]
    fn report_counts_changed() {
        let report = StateChangeReport::from(vec![
            StateChange {
                issue_id: 1,
                changed: true,
            },
            StateChange {
                issue_id: 2,
                changed: false,
            },
        ]);
        assert_eq!(report.changed, 1);
        assert_eq!(report.changes.len(), 2);
    }
}
