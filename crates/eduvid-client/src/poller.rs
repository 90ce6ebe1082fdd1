//! Submission and polling driver.

use async_trait::async_trait;
use chrono::Utc;
use eduvid_models::{GenerateRequest, GenerateResponse, StatusResponse};
use tracing::{debug, info, warn};

use crate::error::{ClientError, ClientResult};
use crate::reconcile::{reconcile, Effect, Event};
use crate::session::Session;

/// The two API calls the poller needs.
#[async_trait]
pub trait JobApi: Send + Sync {
    async fn submit(&self, request: &GenerateRequest) -> ClientResult<GenerateResponse>;
    async fn status(&self, job_id: &str) -> ClientResult<StatusResponse>;
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PollState {
    Idle,
    Polling { job_id: String },
    Terminal,
}

/// Drives one job from submission to a terminal state.
///
/// At most one status request is outstanding and at most one timer is armed.
/// The timer is dropped as soon as the reducer asks to stop.
pub struct Poller<A> {
    api: A,
    state: PollState,
}

impl<A: JobApi> Poller<A> {
    pub fn new(api: A) -> Self {
        Self {
            api,
            state: PollState::Idle,
        }
    }

    pub fn state(&self) -> &PollState {
        &self.state
    }

    /// Submit `request` and poll until the job is done.
    ///
    /// `on_change` sees the session after every applied event.
    pub async fn run<F>(&mut self, session: &mut Session, request: &GenerateRequest, mut on_change: F)
    where
        F: FnMut(&Session),
    {
        session.begin(&request.description, Utc::now());
        on_change(session);

        let event = match self.api.submit(request).await {
            Ok(response) => {
                info!(job_id = %response.job_id, "Job submitted");
                self.state = PollState::Polling {
                    job_id: response.job_id.clone(),
                };
                Event::Submitted {
                    job_id: response.job_id,
                }
            }
            Err(e) => {
                warn!("Submission failed: {}", e);
                Event::SubmissionFailed(e.to_string())
            }
        };
        let mut effects = self.apply(session, event);
        on_change(session);

        while let Some(delay) = next_delay(&effects) {
            let PollState::Polling { job_id } = &self.state else {
                break;
            };
            let job_id = job_id.clone();

            tokio::time::sleep(delay).await;

            let event = match self.api.status(&job_id).await {
                Ok(status) => {
                    debug!(job_id = %job_id, status = %status.status, "Polled status");
                    Event::Status(status)
                }
                Err(ClientError::NotFound(_)) => {
                    warn!(job_id = %job_id, "Job not found on server");
                    Event::NotFound
                }
                Err(e) => {
                    warn!(job_id = %job_id, "Status poll failed, retrying: {}", e);
                    Event::TransportError(e.to_string())
                }
            };
            effects = self.apply(session, event);
            on_change(session);
        }
    }

    fn apply(&mut self, session: &mut Session, event: Event) -> Vec<Effect> {
        let effects = reconcile(session, event, Utc::now());
        if effects.contains(&Effect::StopPolling) {
            self.state = PollState::Terminal;
        }
        effects
    }
}

/// The delay to wait for, unless polling must stop.
fn next_delay(effects: &[Effect]) -> Option<std::time::Duration> {
    if effects.contains(&Effect::StopPolling) {
        return None;
    }
    effects.iter().find_map(|e| match e {
        Effect::SchedulePoll(delay) => Some(*delay),
        Effect::StopPolling => None,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    #[test]
    fn test_next_delay() {
        let d = Duration::from_millis(5);
        assert_eq!(next_delay(&[Effect::SchedulePoll(d)]), Some(d));
        assert_eq!(next_delay(&[Effect::StopPolling]), None);
        assert_eq!(next_delay(&[]), None);
        assert_eq!(
            next_delay(&[Effect::SchedulePoll(d), Effect::StopPolling]),
            None
        );
    }
}
