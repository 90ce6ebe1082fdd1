//! Timeline reconciliation.
//!
//! [`reconcile`] is a pure reducer: it applies one [`Event`] to a [`Session`]
//! and returns the [`Effect`]s the driver must carry out. Step statuses only
//! ever move forward, so replaying a status never undoes progress.

use std::time::Duration;

use chrono::{DateTime, Utc};
use eduvid_models::{download_path, JobStatus, StatusResponse};

use crate::session::{Role, Session};
use crate::timeline::{StepStatus, QUEUED_KEY};

/// Detail attached to the `queued` step when the server has no such job.
pub const NOT_FOUND_DETAIL: &str = "Job not found on server";

/// Inputs to the reducer.
#[derive(Debug, Clone, PartialEq)]
pub enum Event {
    /// The server accepted the job.
    Submitted { job_id: String },
    /// The generate request failed; no job exists.
    SubmissionFailed(String),
    /// A status poll returned.
    Status(StatusResponse),
    /// The status endpoint answered 404.
    NotFound,
    /// A status poll failed in transport; the next poll retries.
    TransportError(String),
}

/// Work for the driver.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Effect {
    SchedulePoll(Duration),
    StopPolling,
}

/// Apply `event` to `session`.
pub fn reconcile(session: &mut Session, event: Event, now: DateTime<Utc>) -> Vec<Effect> {
    match event {
        Event::Submitted { job_id } => {
            session.push(
                Role::Assistant,
                format!("Started generating your video (job {job_id})."),
                now,
            );
            session.job_id = Some(job_id);
            session.loading = true;
            vec![Effect::SchedulePoll(session.initial_delay)]
        }
        Event::SubmissionFailed(reason) => {
            session.timeline.fail_all(&reason, now);
            session.push(
                Role::Assistant,
                format!("Could not start video generation: {reason}"),
                now,
            );
            session.loading = false;
            vec![Effect::StopPolling]
        }
        // Late responses after a terminal state are dropped
        _ if !session.loading => Vec::new(),
        Event::Status(status) => apply_status(session, status, now),
        Event::NotFound => {
            let queued = session.timeline.index_of(QUEUED_KEY);
            let failed_queued = queued.is_some_and(|i| {
                session
                    .timeline
                    .advance_with_detail(i, StepStatus::Failed, NOT_FOUND_DETAIL, now)
            });
            // Already past the queued step: fail whatever was running instead
            if !failed_queued {
                if let Some(i) = session.timeline.processing() {
                    session
                        .timeline
                        .advance_with_detail(i, StepStatus::Failed, NOT_FOUND_DETAIL, now);
                }
            }
            session.push(Role::Assistant, format!("Error: {NOT_FOUND_DETAIL}."), now);
            session.loading = false;
            vec![Effect::StopPolling]
        }
        Event::TransportError(_) => vec![Effect::SchedulePoll(session.interval)],
    }
}

fn apply_status(session: &mut Session, status: StatusResponse, now: DateTime<Utc>) -> Vec<Effect> {
    let timeline = &mut session.timeline;

    match status.status {
        JobStatus::Queued => {
            if let Some(i) = timeline.index_of(QUEUED_KEY) {
                timeline.advance(i, StepStatus::Completed, now);
            }
            vec![Effect::SchedulePoll(session.interval)]
        }
        JobStatus::Processing => {
            let direct = status
                .current_stage
                .and_then(|stage| timeline.index_of(stage.as_str()));
            let index = direct
                .or_else(|| timeline.first_pending())
                .unwrap_or_else(|| timeline.len().saturating_sub(1));
            timeline.activate(index, now);
            vec![Effect::SchedulePoll(session.interval)]
        }
        JobStatus::Completed => {
            timeline.complete_all(now);
            let message = match status.final_video() {
                Some(_) => format!(
                    "Your video is ready! Download it at {}",
                    download_path(&status.job_id)
                ),
                None => "Video generation finished, but the server did not report a final \
                         video file."
                    .to_string(),
            };
            session.push(Role::Assistant, message, now);
            session.loading = false;
            vec![Effect::StopPolling]
        }
        JobStatus::Failed => {
            let error = status
                .error
                .clone()
                .unwrap_or_else(|| "Unknown error".to_string());
            if let Some(i) = timeline.processing() {
                timeline.advance_with_detail(i, StepStatus::Failed, error.clone(), now);
            }
            session.push(
                Role::Assistant,
                format!("Video generation failed: {error}"),
                now,
            );
            session.loading = false;
            vec![Effect::StopPolling]
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use eduvid_models::StageName;

    fn status(job_id: &str, s: JobStatus) -> StatusResponse {
        StatusResponse {
            job_id: job_id.to_string(),
            status: s,
            project_name: "demo".to_string(),
            current_stage: None,
            results: None,
            error: None,
            download_url: None,
        }
    }

    fn submitted(now: DateTime<Utc>) -> Session {
        let mut session = Session::new(now);
        session.begin("Explain gravity", now);
        reconcile(
            &mut session,
            Event::Submitted {
                job_id: "job-1".to_string(),
            },
            now,
        );
        session
    }

    #[test]
    fn test_submitted_schedules_initial_poll() {
        let now = Utc::now();
        let mut session = Session::new(now);
        session.begin("x", now);
        let effects = reconcile(
            &mut session,
            Event::Submitted {
                job_id: "job-1".to_string(),
            },
            now,
        );
        assert_eq!(effects, vec![Effect::SchedulePoll(Duration::from_millis(1500))]);
        assert_eq!(session.job_id.as_deref(), Some("job-1"));
    }

    #[test]
    fn test_queued_completes_queued_step_once() {
        let now = Utc::now();
        let mut session = submitted(now);

        let effects = reconcile(&mut session, Event::Status(status("job-1", JobStatus::Queued)), now);
        assert_eq!(effects, vec![Effect::SchedulePoll(Duration::from_secs(2))]);
        assert_eq!(session.timeline.steps()[0].status, StepStatus::Completed);

        let later = now + chrono::Duration::seconds(2);
        reconcile(&mut session, Event::Status(status("job-1", JobStatus::Queued)), later);
        assert_eq!(session.timeline.steps()[0].timestamp, now);
    }

    #[test]
    fn test_processing_heuristic_advances_per_poll() {
        let now = Utc::now();
        let mut session = submitted(now);

        reconcile(&mut session, Event::Status(status("job-1", JobStatus::Processing)), now);
        assert_eq!(session.timeline.steps()[0].status, StepStatus::Completed);
        assert_eq!(session.timeline.steps()[1].status, StepStatus::Processing);

        // Each poll that still reads processing moves on to the next pending step
        reconcile(&mut session, Event::Status(status("job-1", JobStatus::Processing)), now);
        assert_eq!(session.timeline.steps()[1].status, StepStatus::Completed);
        assert_eq!(session.timeline.processing(), Some(2));
        assert_eq!(session.timeline.count(StepStatus::Processing), 1);
        assert_eq!(session.timeline.steps()[3].status, StepStatus::Pending);
    }

    #[test]
    fn test_processing_uses_current_stage() {
        let now = Utc::now();
        let mut session = submitted(now);

        let mut s = status("job-1", JobStatus::Processing);
        s.current_stage = Some(StageName::Rendering);
        reconcile(&mut session, Event::Status(s), now);

        let idx = session.timeline.index_of("rendering").unwrap();
        assert_eq!(session.timeline.steps()[idx].status, StepStatus::Processing);
        assert!(session.timeline.steps()[..idx]
            .iter()
            .all(|s| s.status == StepStatus::Completed));
        // The old step is completed, not left processing
        assert_eq!(session.timeline.count(StepStatus::Processing), 1);
    }

    #[test]
    fn test_processing_with_no_pending_step_selects_last() {
        let now = Utc::now();
        let mut session = submitted(now);
        let last = session.timeline.len() - 1;
        session.timeline.activate(last, now);

        reconcile(&mut session, Event::Status(status("job-1", JobStatus::Processing)), now);
        assert_eq!(session.timeline.processing(), Some(last));
    }

    #[test]
    fn test_completed_without_final_video_warns() {
        let now = Utc::now();
        let mut session = submitted(now);

        let effects = reconcile(&mut session, Event::Status(status("job-1", JobStatus::Completed)), now);
        assert_eq!(effects, vec![Effect::StopPolling]);
        assert!(!session.loading);
        let last = session.messages.last().unwrap();
        assert!(last.content.contains("did not report a final video"));
        assert!(!last.content.contains("/api/download/"));
    }

    #[test]
    fn test_failed_without_processing_step_only_messages() {
        let now = Utc::now();
        let mut session = submitted(now);

        let mut s = status("job-1", JobStatus::Failed);
        s.error = None;
        reconcile(&mut session, Event::Status(s), now);

        assert_eq!(session.timeline.count(StepStatus::Failed), 0);
        assert!(session
            .messages
            .last()
            .unwrap()
            .content
            .contains("Unknown error"));
    }

    #[test]
    fn test_not_found_after_queued_fails_running_step() {
        let now = Utc::now();
        let mut session = submitted(now);
        reconcile(&mut session, Event::Status(status("job-1", JobStatus::Processing)), now);

        reconcile(&mut session, Event::NotFound, now);
        assert_eq!(session.timeline.steps()[0].status, StepStatus::Completed);
        assert_eq!(session.timeline.steps()[1].status, StepStatus::Failed);
        assert_eq!(
            session.timeline.steps()[1].detail.as_deref(),
            Some(NOT_FOUND_DETAIL)
        );
    }

    #[test]
    fn test_transport_error_keeps_polling() {
        let now = Utc::now();
        let mut session = submitted(now);
        let before = session.clone();

        let effects = reconcile(&mut session, Event::TransportError("connection refused".into()), now);
        assert_eq!(effects, vec![Effect::SchedulePoll(Duration::from_secs(2))]);
        assert_eq!(session, before);
    }

    #[test]
    fn test_events_after_terminal_are_ignored() {
        let now = Utc::now();
        let mut session = submitted(now);
        reconcile(&mut session, Event::Status(status("job-1", JobStatus::Completed)), now);
        let snapshot = session.clone();

        let effects = reconcile(&mut session, Event::Status(status("job-1", JobStatus::Processing)), now);
        assert!(effects.is_empty());
        assert_eq!(session, snapshot);
    }
}
