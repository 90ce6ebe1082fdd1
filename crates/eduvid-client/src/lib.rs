//! Client side of the generation service.
//!
//! This crate provides:
//! - The per-job timeline of steps shown to the user
//! - A pure reducer that reconciles the timeline with polled server status
//! - A poller state machine that drives submission and polling
//! - An HTTP client for the API server

pub mod config;
pub mod error;
pub mod http;
pub mod poller;
pub mod reconcile;
pub mod session;
pub mod timeline;

pub use config::PollConfig;
pub use error::{ClientError, ClientResult};
pub use http::ApiClient;
pub use poller::{JobApi, PollState, Poller};
pub use reconcile::{reconcile, Effect, Event, NOT_FOUND_DETAIL};
pub use session::{ChatMessage, Role, Session};
pub use timeline::{StepStatus, Timeline, TimelineStep, QUEUED_KEY};
