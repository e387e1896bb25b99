//! Routes a report to configured reporters by type tag.
//!
//! One handler per type; registering a second handler for the same type
//! replaces the first. Individual reporter failures never stop delivery to
//! the remaining entries.

use std::collections::HashMap;
use std::time::Instant;

use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use crate::config::{NotificationConfig, ReporterConfig};
use crate::slack::SlackReporter;
use crate::traits::{AnalysisReport, DispatchResult, NotifyError, Reporter};
use crate::webhook::WebhookReporter;

#[derive(Default)]
pub struct ReporterRegistry {
    reporters: HashMap<String, Box<dyn Reporter>>,
}

impl ReporterRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Registry with the built-in `slack` and `webhook` reporters.
    pub fn with_defaults() -> Self {
        let mut registry = Self::new();
        registry.register(Box::new(SlackReporter::new()));
        registry.register(Box::new(WebhookReporter::new()));
        registry
    }

    /// Register a reporter under its type tag, replacing any previous one.
    pub fn register(&mut self, reporter: Box<dyn Reporter>) {
        let key = reporter.reporter_type().to_string();
        if self.reporters.insert(key.clone(), reporter).is_some() {
            debug!(reporter = %key, "replaced existing reporter");
        }
    }

    pub fn types(&self) -> Vec<&str> {
        let mut types: Vec<&str> = self.reporters.keys().map(String::as_str).collect();
        types.sort_unstable();
        types
    }

    /// Send `report` through the reporter named by `config`. Disabled
    /// entries are a no-op.
    pub async fn send_notification(
        &self,
        report: &AnalysisReport,
        config: &ReporterConfig,
    ) -> Result<(), NotifyError> {
        if !config.enabled {
            debug!(reporter = %config.reporter_type, "reporter disabled, skipping");
            return Ok(());
        }
        let reporter = self
            .reporters
            .get(&config.reporter_type)
            .ok_or_else(|| NotifyError::UnknownReporter(config.reporter_type.clone()))?;
        reporter.send(report, config).await
    }

    /// Deliver to every entry of `config` in order.
    ///
    /// Failures are logged and recorded. Once `cancel` fires no further
    /// entries are started; one already in flight runs to completion.
    pub async fn dispatch_all(
        &self,
        report: &AnalysisReport,
        config: &NotificationConfig,
        cancel: &CancellationToken,
    ) -> Vec<DispatchResult> {
        if !config.enabled {
            debug!("notifications disabled");
            return Vec::new();
        }

        let mut results = Vec::with_capacity(config.reporters.len());
        for (sent, entry) in config.reporters.iter().enumerate() {
            if cancel.is_cancelled() {
                warn!(remaining = config.reporters.len() - sent, "cancelled, not sending remaining notifications");
                break;
            }
            let kind = entry.reporter_type.as_str();
            if !entry.enabled {
                debug!(reporter = kind, "reporter disabled, skipping");
                results.push(DispatchResult::skipped(kind));
                continue;
            }

            let started = Instant::now();
            let outcome = self.send_notification(report, entry).await;
            let duration_ms = started.elapsed().as_millis() as u64;
            match &outcome {
                Ok(()) => info!(reporter = kind, duration_ms, "notification delivered"),
                Err(e) => warn!(reporter = kind, error = %e, duration_ms, "notification failed"),
            }
            results.push(DispatchResult::attempted(kind, &outcome, duration_ms));
        }

        results
    }
}
