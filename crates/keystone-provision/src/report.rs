//! Per-phase tallies and the run report.

use std::fmt;

use chrono::{DateTime, Utc};
use serde::Serialize;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Action {
    Create,
    Delete,
    Update,
    Reposition,
    Refresh,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ResourceKind {
    Role,
    Category,
    Channel,
}

impl fmt::Display for Action {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::Create => "create",
            Self::Delete => "delete",
            Self::Update => "update",
            Self::Reposition => "reposition",
            Self::Refresh => "refresh",
        })
    }
}

impl fmt::Display for ResourceKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::Role => "role",
            Self::Category => "category",
            Self::Channel => "channel",
        })
    }
}

/// One failed mutation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Failure {
    pub action: Action,
    pub kind: ResourceKind,
    pub target: String,
    pub reason: String,
}

/// Success counts and failures for one phase.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct Tally {
    pub created: usize,
    pub updated: usize,
    pub deleted: usize,
    pub failures: Vec<Failure>,
}

impl Tally {
    /// Log the failure and keep going.
    pub fn record_failure(
        &mut self,
        action: Action,
        kind: ResourceKind,
        target: impl Into<String>,
        reason: impl fmt::Display,
    ) {
        let failure = Failure {
            action,
            kind,
            target: target.into(),
            reason: reason.to_string(),
        };
        tracing::warn!(
            action = %failure.action,
            kind = %failure.kind,
            target = %failure.target,
            error = %failure.reason,
            "Mutation failed"
        );
        self.failures.push(failure);
    }

    pub fn errors(&self) -> usize {
        self.failures.len()
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct RunReport {
    pub server_id: String,
    pub started_at: DateTime<Utc>,
    pub finished_at: DateTime<Utc>,
    pub roles: Tally,
    pub categories: Tally,
    pub channels: Tally,
}

impl RunReport {
    pub fn total_errors(&self) -> usize {
        self.roles.errors() + self.categories.errors() + self.channels.errors()
    }

    pub fn is_clean(&self) -> bool {
        self.total_errors() == 0
    }

    pub fn failures(&self) -> impl Iterator<Item = &Failure> {
        self.roles
            .failures
            .iter()
            .chain(&self.categories.failures)
            .chain(&self.channels.failures)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn errors_sum_across_phases() {
        let mut roles = Tally::default();
        roles.record_failure(Action::Create, ResourceKind::Role, "[ Admin ]", "Missing Permissions");
        let mut channels = Tally { created: 3, ..Default::default() };
        channels.record_failure(Action::Delete, ResourceKind::Channel, "old", "Unknown Channel");
        channels.record_failure(Action::Reposition, ResourceKind::Channel, "x", "timeout");

        let now = Utc::now();
        let report = RunReport {
            server_id: "1".into(),
            started_at: now,
            finished_at: now,
            roles,
            categories: Tally::default(),
            channels,
        };
        assert_eq!(report.total_errors(), 3);
        assert!(!report.is_clean());
        assert_eq!(report.failures().next().map(|f| f.target.as_str()), Some("[ Admin ]"));
    }

    #[test]
    fn failure_serializes_in_snake_case() {
        let failure = Failure {
            action: Action::Reposition,
            kind: ResourceKind::Category,
            target: "Staff".into(),
            reason: "nope".into(),
        };
        let json = serde_json::to_value(&failure).unwrap();
        assert_eq!(json["action"], "reposition");
        assert_eq!(json["kind"], "category");
    }
}
