//! Chat session state owned by the client.

use std::time::Duration;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::timeline::Timeline;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    User,
    Assistant,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChatMessage {
    pub role: Role,
    pub content: String,
    pub timestamp: DateTime<Utc>,
}

/// Everything the client tracks for one generation request.
#[derive(Debug, Clone, PartialEq)]
pub struct Session {
    pub job_id: Option<String>,
    pub timeline: Timeline,
    pub messages: Vec<ChatMessage>,
    /// True from submission until the job reaches a terminal state
    pub loading: bool,
    pub(crate) initial_delay: Duration,
    pub(crate) interval: Duration,
}

impl Session {
    pub fn new(now: DateTime<Utc>) -> Self {
        Self {
            job_id: None,
            timeline: Timeline::new(now),
            messages: Vec::new(),
            loading: false,
            initial_delay: Duration::from_millis(1500),
            interval: Duration::from_secs(2),
        }
    }

    /// Override the poll delays used in scheduled effects.
    pub fn with_poll_delays(mut self, initial_delay: Duration, interval: Duration) -> Self {
        self.initial_delay = initial_delay;
        self.interval = interval;
        self
    }

    /// Record the user's request and reset the timeline for a new job.
    pub fn begin(&mut self, description: &str, now: DateTime<Utc>) {
        self.push(Role::User, description, now);
        self.job_id = None;
        self.timeline = Timeline::new(now);
        self.loading = true;
    }

    pub fn push(&mut self, role: Role, content: impl Into<String>, now: DateTime<Utc>) {
        self.messages.push(ChatMessage {
            role,
            content: content.into(),
            timestamp: now,
        });
    }

    pub fn assistant_messages(&self) -> impl Iterator<Item = &ChatMessage> {
        self.messages.iter().filter(|m| m.role == Role::Assistant)
    }
}
