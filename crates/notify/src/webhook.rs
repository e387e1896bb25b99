//! Generic HTTP webhook reporter.
//!
//! Settings:
//! - `url` (required)
//! - `method` (optional, default `POST`)
//! - `header.<Name>` (optional, one per header)
//! - `body_template` (optional; without it the report is sent as JSON)

use crate::config::ReporterConfig;
use crate::templating::TemplateRenderer;
use crate::traits::{AnalysisReport, NotifyError, Reporter};

#[derive(Debug, Default)]
pub struct WebhookReporter {
    renderer: TemplateRenderer,
    client: reqwest::Client,
}

impl WebhookReporter {
    pub fn new() -> Self {
        Self::default()
    }

    fn build_request(
        &self,
        report: &AnalysisReport,
        config: &ReporterConfig,
    ) -> Result<reqwest::RequestBuilder, NotifyError> {
        let url = config.require("url")?;
        let method = match config.setting("method")? {
            Some(m) => parse_method(&m)?,
            None => reqwest::Method::POST,
        };

        let mut request = self.client.request(method, &url);
        for (name, value) in config.prefixed("header.")? {
            request = request.header(name, value);
        }

        request = match config.setting("body_template")? {
            Some(template) => {
                let body = self.renderer.render(&template, report)?;
                request.body(body)
            }
            None => request.json(report),
        };
        Ok(request)
    }
}

#[async_trait::async_trait]
impl Reporter for WebhookReporter {
    fn reporter_type(&self) -> &str {
        "webhook"
    }

    async fn send(&self, report: &AnalysisReport, config: &ReporterConfig) -> Result<(), NotifyError> {
        let response = self.build_request(report, config)?.send().await?;
        let status = response.status();

        if !status.is_success() {
            let body = response
                .text()
                .await
                .unwrap_or_else(|_| "<unreadable body>".to_string());
            return Err(NotifyError::Rejected {
                reporter: "webhook".into(),
                status: status.as_u16(),
                body,
            });
        }

        tracing::debug!(status = %status, "Webhook delivered");
        Ok(())
    }
}

fn parse_method(raw: &str) -> Result<reqwest::Method, NotifyError> {
    raw.trim()
        .to_uppercase()
        .parse::<reqwest::Method>()
        .map_err(|e| NotifyError::Config(format!("invalid HTTP method '{raw}': {e}")))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_support::serve_once;
    use std::collections::BTreeMap;

    fn report() -> AnalysisReport {
        AnalysisReport {
            analysis_type: "krknai".into(),
            status: "completed".into(),
            content: "Pod scenarios dominate the top ten.".into(),
            timestamp: "2026-10-19T12:00:00Z".into(),
            summary_path: None,
            metadata: BTreeMap::from([("tool_calls".to_string(), serde_json::json!(3))]),
        }
    }

    #[test]
    fn method_parsing() {
        assert_eq!(parse_method("put").unwrap(), reqwest::Method::PUT);
        assert_eq!(parse_method(" Post ").unwrap(), reqwest::Method::POST);
        assert!(matches!(parse_method("NOT A METHOD"), Err(NotifyError::Config(_))));
    }

    #[tokio::test]
    async fn missing_url() {
        let err = WebhookReporter::new()
            .send(&report(), &ReporterConfig::new("webhook"))
            .await
            .unwrap_err();
        assert!(matches!(err, NotifyError::Config(msg) if msg.contains("'url'")));
    }

    #[tokio::test]
    async fn sends_report_as_json_by_default() {
        let (url, server) = serve_once(200, "").await;
        let config = ReporterConfig::new("webhook").with_setting("url", format!("{url}/hook"));

        WebhookReporter::new().send(&report(), &config).await.unwrap();

        let request = server.await.unwrap();
        assert_eq!(request.method, "POST");
        assert_eq!(request.path, "/hook");
        let body = request.json();
        assert_eq!(body["analysis_type"], "krknai");
        assert_eq!(body["metadata"]["tool_calls"], 3);
    }

    #[tokio::test]
    async fn method_headers_and_template() {
        std::env::set_var("KRKNAI_WEBHOOK_TEST_TOKEN", "s3cret");
        let (url, server) = serve_once(202, "").await;
        let config = ReporterConfig::new("webhook")
            .with_setting("url", url)
            .with_setting("method", "put")
            .with_setting("header.Authorization", "Bearer ${KRKNAI_WEBHOOK_TEST_TOKEN}")
            .with_setting("body_template", "{{ report.status }}/{{ report.metadata.tool_calls }}");

        WebhookReporter::new().send(&report(), &config).await.unwrap();
        std::env::remove_var("KRKNAI_WEBHOOK_TEST_TOKEN");

        let request = server.await.unwrap();
        assert_eq!(request.method, "PUT");
        assert_eq!(request.header("authorization"), Some("Bearer s3cret"));
        assert_eq!(request.body, "completed/3");
    }

    #[tokio::test]
    async fn server_error_is_rejected() {
        let (url, server) = serve_once(500, "boom").await;
        let config = ReporterConfig::new("webhook").with_setting("url", url);

        let err = WebhookReporter::new().send(&report(), &config).await.unwrap_err();
        server.await.unwrap();
        assert!(matches!(err, NotifyError::Rejected { status: 500, .. }));
    }
}
