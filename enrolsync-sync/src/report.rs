//! What a sync run did.

use std::fmt;

use serde::Serialize;

use crate::error::SyncError;
use crate::outcome::SyncOutcome;

/// A single mutation applied to the directory.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "action", rename_all = "snake_case")]
pub enum Change {
    ChannelCreated { course: String },
    Enrolled { course: String, role: String },
    Unenrolled { course: String, role: String },
    GroupCreated { course: String, group: String },
    GroupJoined { course: String, group: String },
    GroupLeft { course: String, group: String },
}

impl fmt::Display for Change {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Change::ChannelCreated { course } => write!(f, "created enrolment channel in {course}"),
            Change::Enrolled { course, role } => write!(f, "enrolled in {course} as {role}"),
            Change::Unenrolled { course, role } => write!(f, "unenrolled from {course} ({role})"),
            Change::GroupCreated { course, group } => write!(f, "created group {group} in {course}"),
            Change::GroupJoined { course, group } => write!(f, "joined group {group} in {course}"),
            Change::GroupLeft { course, group } => write!(f, "left group {group} in {course}"),
        }
    }
}

/// Result of one sync run.
///
/// A run never fails as a whole: `outcome` and `changes` hold whatever was
/// done before an abort, and `aborted` carries the error that stopped it.
#[derive(Debug, Default)]
pub struct SyncReport {
    pub outcome: SyncOutcome,
    pub changes: Vec<Change>,
    pub aborted: Option<SyncError>,
}

impl SyncReport {
    /// True when the run finished without recording any error.
    pub fn is_clean(&self) -> bool {
        self.aborted.is_none() && self.outcome.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::outcome::ENROLLMENT;

    #[test]
    fn change_display() {
        let change = Change::Enrolled {
            course: "CS101".into(),
            role: "student".into(),
        };
        assert_eq!(change.to_string(), "enrolled in CS101 as student");
    }

    #[test]
    fn change_serializes_with_action_tag() {
        let change = Change::GroupJoined {
            course: "CS101".into(),
            group: "TeamA".into(),
        };
        let json = serde_json::to_value(&change).unwrap();
        assert_eq!(json["action"], "group_joined");
        assert_eq!(json["group"], "TeamA");
    }

    #[test]
    fn clean_report() {
        let mut report = SyncReport::default();
        assert!(report.is_clean());
        report.outcome.push(ENROLLMENT, "role not found: ghost");
        assert!(!report.is_clean());
    }
}
