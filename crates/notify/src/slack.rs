//! Slack incoming-webhook reporter.
//!
//! Settings:
//! - `webhook_url` (required)
//! - `channel`, `username` (optional; only honoured by legacy webhooks)
//! - `message_template` (optional minijinja template for the fallback text)

use serde_json::{json, Value};

use crate::config::ReporterConfig;
use crate::templating::TemplateRenderer;
use crate::traits::{AnalysisReport, NotifyError, Reporter};

/// Slack rejects section text longer than this.
const MAX_SECTION_CHARS: usize = 3000;
const TRUNCATION_NOTE: &str = "\n_… truncated, see the full summary_";

const DEFAULT_TEXT_TEMPLATE: &str = "Chaos run analysis {{ report.status }}: \
{{ report.metadata.total_scenarios }} scenarios, {{ report.metadata.failed_scenarios }} failed, \
max fitness {{ report.metadata.max_fitness_score | round(2) }}";

#[derive(Debug, Default)]
pub struct SlackReporter {
    renderer: TemplateRenderer,
    client: reqwest::Client,
}

impl SlackReporter {
    pub fn new() -> Self {
        Self::default()
    }

    fn build_payload(&self, report: &AnalysisReport, config: &ReporterConfig) -> Result<Value, NotifyError> {
        let template = config.setting("message_template")?;
        let text = self
            .renderer
            .render(template.as_deref().unwrap_or(DEFAULT_TEXT_TEMPLATE), report)?;

        let stat = |label: &str, value: String| json!({ "type": "mrkdwn", "text": format!("*{label}:*\n{value}") });
        let max_fitness = report
            .metadata
            .get("max_fitness_score")
            .and_then(Value::as_f64)
            .unwrap_or(0.0);

        let mut blocks = vec![
            json!({
                "type": "header",
                "text": { "type": "plain_text", "text": format!("Chaos run analysis ({})", report.analysis_type) }
            }),
            json!({
                "type": "section",
                "fields": [
                    stat("Scenarios", report.count("total_scenarios").to_string()),
                    stat("Failed", report.count("failed_scenarios").to_string()),
                    stat("Generations", report.count("generations").to_string()),
                    stat("Max fitness", format!("{max_fitness:.2}")),
                    stat("Logs examined", report.count("artifacts_examined").to_string()),
                    stat("Status", report.status.clone()),
                ]
            }),
            json!({
                "type": "section",
                "text": { "type": "mrkdwn", "text": truncate_chars(&to_mrkdwn(&report.content), MAX_SECTION_CHARS) }
            }),
        ];
        if let Some(path) = &report.summary_path {
            blocks.push(json!({
                "type": "context",
                "elements": [{ "type": "mrkdwn", "text": format!("Summary: `{path}`") }]
            }));
        }

        let mut payload = json!({ "text": text, "blocks": blocks });
        if let Some(channel) = config.setting("channel")? {
            payload["channel"] = json!(channel);
        }
        if let Some(username) = config.setting("username")? {
            payload["username"] = json!(username);
        }
        Ok(payload)
    }
}

#[async_trait::async_trait]
impl Reporter for SlackReporter {
    fn reporter_type(&self) -> &str {
        "slack"
    }

    async fn send(&self, report: &AnalysisReport, config: &ReporterConfig) -> Result<(), NotifyError> {
        let url = config.require("webhook_url")?;
        let payload = self.build_payload(report, config)?;

        let response = self.client.post(&url).json(&payload).send().await?;
        let status = response.status();

        if status == reqwest::StatusCode::TOO_MANY_REQUESTS {
            let retry_after = response
                .headers()
                .get(reqwest::header::RETRY_AFTER)
                .and_then(|v| v.to_str().ok())
                .and_then(|v| v.parse().ok())
                .unwrap_or(30);
            return Err(NotifyError::RateLimited {
                retry_after_secs: retry_after,
            });
        }

        if !status.is_success() {
            let body = response
                .text()
                .await
                .unwrap_or_else(|_| "<unreadable body>".to_string());
            return Err(NotifyError::Rejected {
                reporter: "slack".into(),
                status: status.as_u16(),
                body,
            });
        }

        tracing::debug!(status = %status, "Slack notification delivered");
        Ok(())
    }
}

/// Cut `text` to at most `max` characters, marking the cut.
fn truncate_chars(text: &str, max: usize) -> String {
    if text.chars().count() <= max {
        return text.to_string();
    }
    let keep = max.saturating_sub(TRUNCATION_NOTE.chars().count());
    let mut out: String = text.chars().take(keep).collect();
    out.push_str(TRUNCATION_NOTE);
    out
}

/// Rewrite the Markdown the model produces into Slack mrkdwn:
/// `**bold**` becomes `*bold*` and headings become bold lines.
fn to_mrkdwn(markdown: &str) -> String {
    markdown
        .lines()
        .map(|line| {
            let trimmed = line.trim_start();
            let heading = trimmed.trim_start_matches('#');
            if trimmed.starts_with('#') && heading.starts_with(' ') {
                format!("*{}*", heading.trim().replace("**", ""))
            } else {
                line.replace("**", "*")
            }
        })
        .collect::<Vec<_>>()
        .join("\n")
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_support::serve_once;
    use std::collections::BTreeMap;

    fn report(content: &str) -> AnalysisReport {
        AnalysisReport {
            analysis_type: "krknai".into(),
            status: "completed".into(),
            content: content.into(),
            timestamp: "2026-10-19T12:00:00Z".into(),
            summary_path: Some("/results/llm-analysis/summary.yaml".into()),
            metadata: BTreeMap::from([
                ("total_scenarios".to_string(), json!(50)),
                ("failed_scenarios".to_string(), json!(5)),
                ("generations".to_string(), json!(5)),
                ("max_fitness_score".to_string(), json!(9.5)),
                ("artifacts_examined".to_string(), json!(2)),
            ]),
        }
    }

    #[test]
    fn payload_has_stats_and_content() {
        let reporter = SlackReporter::new();
        let config = ReporterConfig::new("slack")
            .with_setting("webhook_url", "http://unused")
            .with_setting("channel", "#chaos");

        let payload = reporter.build_payload(&report("## Overview\nAll **good**"), &config).unwrap();

        assert_eq!(
            payload["text"],
            "Chaos run analysis completed: 50 scenarios, 5 failed, max fitness 9.50"
        );
        assert_eq!(payload["channel"], "#chaos");
        assert_eq!(payload["blocks"][1]["fields"][1]["text"], "*Failed:*\n5");
        assert_eq!(payload["blocks"][2]["text"]["text"], "*Overview*\nAll *good*");
        assert!(payload["blocks"][3]["elements"][0]["text"]
            .as_str()
            .unwrap()
            .contains("summary.yaml"));
    }

    #[test]
    fn custom_message_template() {
        let reporter = SlackReporter::new();
        let config = ReporterConfig::new("slack")
            .with_setting("message_template", "{{ report.analysis_type | upper }} done");
        let payload = reporter.build_payload(&report("x"), &config).unwrap();
        assert_eq!(payload["text"], "KRKNAI done");
        assert!(payload.get("channel").is_none());
    }

    #[test]
    fn long_content_is_truncated() {
        let long = "é".repeat(5000);
        let out = truncate_chars(&long, MAX_SECTION_CHARS);
        assert_eq!(out.chars().count(), MAX_SECTION_CHARS);
        assert!(out.ends_with(TRUNCATION_NOTE));
        assert_eq!(truncate_chars("short", MAX_SECTION_CHARS), "short");
    }

    #[tokio::test]
    async fn missing_webhook_url() {
        let err = SlackReporter::new()
            .send(&report("x"), &ReporterConfig::new("slack"))
            .await
            .unwrap_err();
        assert!(matches!(err, NotifyError::Config(msg) if msg.contains("webhook_url")));
    }

    #[tokio::test]
    async fn posts_to_webhook() {
        let (url, server) = serve_once(200, "ok").await;
        let config = ReporterConfig::new("slack").with_setting("webhook_url", format!("{url}/services/T/B/X"));

        SlackReporter::new().send(&report("fine"), &config).await.unwrap();

        let request = server.await.unwrap();
        assert_eq!(request.method, "POST");
        assert_eq!(request.path, "/services/T/B/X");
        assert_eq!(request.json()["blocks"][2]["text"]["text"], "fine");
    }

    #[tokio::test]
    async fn non_success_status_is_rejected() {
        let (url, server) = serve_once(404, "no_service").await;
        let config = ReporterConfig::new("slack").with_setting("webhook_url", url);

        let err = SlackReporter::new().send(&report("x"), &config).await.unwrap_err();
        server.await.unwrap();
        match err {
            NotifyError::Rejected { status, body, .. } => {
                assert_eq!(status, 404);
                assert_eq!(body, "no_service");
            }
            other => panic!("expected Rejected, got {other:?}"),
        }
    }
}
