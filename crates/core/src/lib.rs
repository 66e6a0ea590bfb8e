//! Browser-driven publishing engine for serialized-fiction platforms.
//!
//! The engine drives a controllable Chromium session through each target
//! platform's own web UI: interactive login with credential capture, series
//! scraping with fuzzy folder matching, and a generic multi-step publish
//! workflow parameterized by per-platform strategies. Each request owns an
//! independent browser OS process tracked by a session registry that
//! supports idempotent, forcible termination.

/// Resilient action layer: retry, adaptive timeouts, cancellation.
pub mod action;
/// Browser driver seam and its CDP/fake implementations.
pub mod driver;
/// Error taxonomy and result alias.
pub mod error;
/// Interactive login detection.
pub mod login;
/// Folder-name resolution against scraped series.
pub mod matcher;
/// Per-platform strategy objects.
pub mod platform;
/// Live-session registry with forcible termination.
pub mod registry;
/// Scheduled-publication records and executor.
pub mod schedule;
/// Listing-page series scrape.
pub mod scrape;
/// Control facade for login/publish/terminate.
pub mod service;
/// Browser process launch and the session factory seam.
pub mod session;
/// Durable per-platform credential and metadata storage.
pub mod store;
/// Shared data model.
pub mod types;
/// Generic publish workflow.
pub mod workflow;

pub use action::{ActionConfig, Actions};
pub use error::{DriverError, EngineError, Result};
pub use login::LoginConfig;
pub use matcher::{FolderMatch, MatchKind};
pub use platform::PlatformSpec;
pub use registry::SessionRegistry;
pub use schedule::{PublicationStatus, ScheduledPublication};
pub use service::{clamp_login_deadline, ControlResponse, PublishService, ResponseKind, ServiceConfig};
pub use session::{CdpSessionFactory, SessionFactory, SessionHandle};
pub use store::{FileStore, StateStore};
pub use types::{Platform, PlatformItem, PublishJob, PublishOutcome, SessionKind, StoredCookie};
pub use workflow::PublishStep;
