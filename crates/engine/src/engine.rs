//! Runs one analysis: collect results, render the prompt, ask the model,
//! persist the summary and notify.

use std::future::Future;
use std::sync::Arc;
use std::time::Instant;

use tokio_util::sync::CancellationToken;
use tracing::{info, warn};

use krknai_aggregator::ResultsAggregator;
use krknai_core::config::LlmSettings;
use krknai_llm::create_client;
use krknai_notify::ReporterRegistry;
use krknai_prompts::{PromptStore, TemplateVars, KRKNAI_TEMPLATE};
use krknai_tool_runtime::ToolRegistry;

use crate::config::{EngineConfig, EngineDeps};
use crate::error::{EngineError, Result};
use crate::result::{render_summary, summary_path, write_atomically, AnalysisResult};
use crate::stage::Stage;

pub struct Engine {
    config: EngineConfig,
    deps: EngineDeps,
}

impl std::fmt::Debug for Engine {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Engine")
            .field("results_dir", &self.config.results_dir)
            .field("reporters", &self.deps.reporters.types())
            .finish_non_exhaustive()
    }
}

impl Engine {
    /// Validate `config` and take ownership of the collaborators. Performs
    /// no I/O.
    pub fn new(config: EngineConfig, deps: EngineDeps) -> Result<Self> {
        config.validate()?;
        info!(stage = %Stage::Created, results_dir = %config.results_dir.display(), "analysis engine ready");
        Ok(Self { config, deps })
    }

    /// Engine wired to the on-disk aggregator, the prompt store and the
    /// Gemini client described by `llm`. `config.api_key` takes precedence
    /// over the key in `llm`.
    pub fn from_config(config: EngineConfig, llm: &LlmSettings) -> Result<Self> {
        config.validate()?;

        let renderer = match &config.prompt_dir {
            Some(dir) => PromptStore::with_overrides(dir)?,
            None => PromptStore::builtin()?,
        };

        let llm = LlmSettings {
            api_key: Some(config.api_key.clone()),
            ..llm.clone()
        };
        let client = create_client(&llm)?.with_working_directory(config.results_dir.clone());

        let deps = EngineDeps {
            collector: Arc::new(ResultsAggregator::new(config.top_scenarios_count)),
            renderer: Arc::new(renderer),
            client: Arc::new(client),
            reporters: ReporterRegistry::with_defaults(),
        };
        Self::new(config, deps)
    }

    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    /// Execute the pipeline once.
    ///
    /// Cancellation is honoured up to and including the model call. Once a
    /// response is in hand the summary is always written; during
    /// notification cancellation only stops further reporters.
    pub async fn run(&self, cancel: &CancellationToken) -> Result<AnalysisResult> {
        let started = Instant::now();
        let results_dir = &self.config.results_dir;

        enter(Stage::Collecting);
        let data = until_cancelled(
            Stage::Collecting,
            cancel,
            self.deps.collector.collect(results_dir),
        )
        .await??;

        let registry = Arc::new(ToolRegistry::for_artifacts(&data.log_artifacts));
        let vars = TemplateVars::from_collected(&data);

        enter(Stage::Rendering);
        check_cancelled(Stage::Rendering, cancel)?;
        let (prompt, defaults) = self.deps.renderer.render_prompt(KRKNAI_TEMPLATE, &vars)?;
        let params = self.config.overrides.apply(defaults);

        enter(Stage::InvokingModel);
        info!(
            tools = registry.len(),
            temperature = params.temperature,
            max_tokens = params.max_tokens,
            prompt_chars = prompt.len(),
            "invoking model"
        );
        let response = until_cancelled(
            Stage::InvokingModel,
            cancel,
            self.deps.client.analyze(&prompt, &params, registry),
        )
        .await??;

        let result = AnalysisResult::completed(&data, prompt, response, summary_path(results_dir));

        enter(Stage::Persisting);
        let summary = render_summary(&result, &data)?;
        write_atomically(&result.summary_path, &summary).await?;
        info!(path = %result.summary_path.display(), "summary written");

        if let Some(notification) = self.config.notification.as_ref().filter(|n| n.enabled) {
            enter(Stage::Notifying);
            let outcomes = self
                .deps
                .reporters
                .dispatch_all(&result.to_report(), notification, cancel)
                .await;
            let failed = outcomes.iter().filter(|o| !o.success && !o.skipped).count();
            if failed > 0 {
                warn!(failed, attempted = outcomes.len(), "some notifications were not delivered");
            }
        }

        enter(Stage::Done);
        info!(
            duration_ms = started.elapsed().as_millis() as u64,
            tool_calls = result.tool_calls.len(),
            "analysis complete"
        );
        Ok(result)
    }
}

fn enter(stage: Stage) {
    info!(stage = %stage, "analysis stage");
}

fn check_cancelled(stage: Stage, cancel: &CancellationToken) -> Result<()> {
    if cancel.is_cancelled() {
        warn!(stage = %stage, "analysis cancelled");
        return Err(EngineError::Cancelled { stage });
    }
    Ok(())
}

/// Race `fut` against `cancel`. A token that is already cancelled wins
/// without polling `fut`.
async fn until_cancelled<F: Future>(
    stage: Stage,
    cancel: &CancellationToken,
    fut: F,
) -> Result<F::Output> {
    check_cancelled(stage, cancel)?;
    tokio::select! {
        biased;
        _ = cancel.cancelled() => {
            warn!(stage = %stage, "analysis cancelled");
            Err(EngineError::Cancelled { stage })
        }
        out = fut => Ok(out),
    }
}
