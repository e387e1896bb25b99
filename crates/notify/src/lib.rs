//! Delivery of finished analyses to external channels.
//!
//! This crate provides:
//! - `Reporter` trait for pluggable notification channels
//! - Slack and generic webhook reporters
//! - Minijinja template rendering for message bodies
//! - `ReporterRegistry` that routes a report to configured reporters by type

pub mod config;
pub mod registry;
pub mod slack;
pub mod templating;
pub mod traits;
pub mod webhook;

#[cfg(test)]
mod test_support;

pub use config::{NotificationConfig, ReporterConfig};
pub use registry::ReporterRegistry;
pub use slack::SlackReporter;
pub use traits::{AnalysisReport, DispatchResult, NotifyError, Reporter};
pub use webhook::WebhookReporter;
