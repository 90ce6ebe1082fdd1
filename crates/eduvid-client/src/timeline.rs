//! Ordered per-job timeline shown to the user.

use std::fmt;

use chrono::{DateTime, Utc};
use eduvid_models::StageName;
use serde::{Deserialize, Serialize};

/// Key of the leading step that tracks submission.
pub const QUEUED_KEY: &str = "queued";

/// Status of one timeline step.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum StepStatus {
    Pending,
    Queued,
    Processing,
    Completed,
    Failed,
}

impl StepStatus {
    /// Position in the forward order. `Failed` sits outside it.
    fn rank(self) -> Option<u8> {
        match self {
            StepStatus::Pending => Some(0),
            StepStatus::Queued => Some(1),
            StepStatus::Processing => Some(2),
            StepStatus::Completed => Some(3),
            StepStatus::Failed => None,
        }
    }

    pub fn is_terminal(self) -> bool {
        matches!(self, StepStatus::Completed | StepStatus::Failed)
    }

    /// Whether moving from `self` to `next` is progress.
    ///
    /// Terminal steps never change. `Failed` is reachable from any other status.
    pub fn can_advance_to(self, next: StepStatus) -> bool {
        if self.is_terminal() {
            return false;
        }
        match (self.rank(), next.rank()) {
            (_, None) => true,
            (Some(cur), Some(new)) => new > cur,
            (None, Some(_)) => false,
        }
    }

    fn marker(self) -> &'static str {
        match self {
            StepStatus::Pending => "[ ]",
            StepStatus::Queued => "[~]",
            StepStatus::Processing => "[>]",
            StepStatus::Completed => "[x]",
            StepStatus::Failed => "[!]",
        }
    }
}

impl fmt::Display for StepStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            StepStatus::Pending => "pending",
            StepStatus::Queued => "queued",
            StepStatus::Processing => "processing",
            StepStatus::Completed => "completed",
            StepStatus::Failed => "failed",
        };
        f.write_str(s)
    }
}

/// One row of the timeline.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TimelineStep {
    pub key: String,
    pub title: String,
    pub status: StepStatus,
    /// Time of the last status change
    pub timestamp: DateTime<Utc>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub detail: Option<String>,
}

/// Steps in pipeline order, led by the `queued` step.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Timeline {
    steps: Vec<TimelineStep>,
}

impl Timeline {
    /// A fresh timeline: `queued` in `Queued`, one `Pending` step per stage.
    pub fn new(now: DateTime<Utc>) -> Self {
        let mut steps = Vec::with_capacity(StageName::ALL.len() + 1);
        steps.push(TimelineStep {
            key: QUEUED_KEY.to_string(),
            title: "Queued".to_string(),
            status: StepStatus::Queued,
            timestamp: now,
            detail: None,
        });
        steps.extend(StageName::ALL.iter().map(|stage| TimelineStep {
            key: stage.as_str().to_string(),
            title: stage.title().to_string(),
            status: StepStatus::Pending,
            timestamp: now,
            detail: None,
        }));
        Self { steps }
    }

    pub fn steps(&self) -> &[TimelineStep] {
        &self.steps
    }

    pub fn len(&self) -> usize {
        self.steps.len()
    }

    pub fn is_empty(&self) -> bool {
        self.steps.is_empty()
    }

    pub fn get(&self, key: &str) -> Option<&TimelineStep> {
        self.steps.iter().find(|s| s.key == key)
    }

    pub fn index_of(&self, key: &str) -> Option<usize> {
        self.steps.iter().position(|s| s.key == key)
    }

    pub fn first_pending(&self) -> Option<usize> {
        self.steps.iter().position(|s| s.status == StepStatus::Pending)
    }

    pub fn processing(&self) -> Option<usize> {
        self.steps
            .iter()
            .position(|s| s.status == StepStatus::Processing)
    }

    /// Move step `index` to `status` if that is forward progress.
    ///
    /// Returns whether the step changed. The timestamp is touched only on change.
    pub fn advance(&mut self, index: usize, status: StepStatus, now: DateTime<Utc>) -> bool {
        let Some(step) = self.steps.get_mut(index) else {
            return false;
        };
        if !step.status.can_advance_to(status) {
            return false;
        }
        step.status = status;
        step.timestamp = now;
        true
    }

    /// Like [`advance`](Self::advance), attaching `detail` when the step changes.
    pub fn advance_with_detail(
        &mut self,
        index: usize,
        status: StepStatus,
        detail: impl Into<String>,
        now: DateTime<Utc>,
    ) -> bool {
        let changed = self.advance(index, status, now);
        if changed {
            self.steps[index].detail = Some(detail.into());
        }
        changed
    }

    /// Complete every step before `index` and mark `index` as processing.
    pub fn activate(&mut self, index: usize, now: DateTime<Utc>) {
        for i in 0..index.min(self.steps.len()) {
            self.advance(i, StepStatus::Completed, now);
        }
        self.advance(index, StepStatus::Processing, now);
    }

    pub fn complete_all(&mut self, now: DateTime<Utc>) {
        for i in 0..self.steps.len() {
            self.advance(i, StepStatus::Completed, now);
        }
    }

    pub fn fail_all(&mut self, detail: &str, now: DateTime<Utc>) {
        for i in 0..self.steps.len() {
            self.advance_with_detail(i, StepStatus::Failed, detail, now);
        }
    }

    pub fn count(&self, status: StepStatus) -> usize {
        self.steps.iter().filter(|s| s.status == status).count()
    }
}

impl fmt::Display for Timeline {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for step in &self.steps {
            write!(f, "{} {}", step.status.marker(), step.title)?;
            if let Some(detail) = &step.detail {
                write!(f, " ({})", detail)?;
            }
            writeln!(f)?;
        }
        Ok(())
    }
}
