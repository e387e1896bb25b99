use std::path::Path;

use anyhow::{Context, Result};
use tokio_util::sync::CancellationToken;
use tracing::{info, warn};

use krknai_core::{merge_into_file, RunConfig, Settings};
use krknai_engine::{Engine, EngineConfig};
use krknai_notify::NotificationConfig;

use crate::cli::{AnalyzeArgs, MergeArgs, OverrideSource, ValidateArgs};

pub async fn analyze(args: AnalyzeArgs) -> Result<()> {
    let mut settings = Settings::from_env();
    apply_flags(&mut settings, &args);
    settings.log_summary();

    let mut config = EngineConfig::from_settings(&settings);
    if let Some(path) = &args.notify_config {
        let notification = NotificationConfig::load(path)
            .with_context(|| format!("failed to load notification config {}", path.display()))?;
        config.notification = Some(notification);
    }
    if args.no_notify {
        config.notification = None;
    }
    if let Some(dir) = args.prompt_dir {
        config = config.with_prompt_dir(dir);
    }

    let engine = Engine::from_config(config, &settings.llm).context("failed to set up analysis")?;

    let cancel = CancellationToken::new();
    let on_signal = cancel.clone();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            warn!("interrupt received, cancelling analysis");
            on_signal.cancel();
        }
    });

    let result = engine.run(&cancel).await.context("analysis failed")?;

    println!("{}", result.content);
    info!(summary = %result.summary_path.display(), "done");
    Ok(())
}

fn apply_flags(settings: &mut Settings, args: &AnalyzeArgs) {
    if let Some(dir) = &args.results_dir {
        settings.analysis.results_dir = Some(dir.clone());
    }
    if let Some(n) = args.top_scenarios {
        settings.analysis.top_scenarios = n;
    }
    let llm = &mut settings.llm;
    if let Some(key) = &args.api_key {
        llm.api_key = Some(key.clone());
    }
    if let Some(model) = &args.model {
        llm.model = model.clone();
    }
    if let Some(n) = args.max_tool_iterations {
        llm.max_tool_iterations = n;
    }
    llm.temperature = args.temperature.or(llm.temperature);
    llm.max_tokens = args.max_tokens.or(llm.max_tokens);
    llm.top_p = args.top_p.or(llm.top_p);
}

pub fn merge_config(args: MergeArgs) -> Result<()> {
    let overrides = load_overrides(&args.overrides)?;
    // field values are not validated here: the merge applies what parses and skips the rest
    let mode = overrides.mode().context("invalid run parameters")?;

    let report = merge_into_file(&overrides, &args.config)
        .with_context(|| format!("failed to update {}", args.config.display()))?;

    info!(
        %mode,
        applied = report.applied.len(),
        skipped = report.skipped.len(),
        "config updated"
    );
    for skipped in &report.skipped {
        println!("skipped {} = {:?}: {}", skipped.field, skipped.value, skipped.reason);
    }
    println!("updated {} ({} overrides applied)", args.config.display(), report.applied.len());
    Ok(())
}

pub fn validate(args: ValidateArgs) -> Result<()> {
    let overrides = load_overrides(&args.overrides)?;
    overrides.validate().context("invalid run parameters")?;
    println!("run parameters are valid (mode: {})", overrides.mode);
    Ok(())
}

fn load_overrides(source: &OverrideSource) -> Result<RunConfig> {
    let mut overrides = match &source.overrides {
        Some(path) => read_overrides(path)?,
        None => RunConfig::from_env(),
    };
    if let Some(mode) = &source.mode {
        overrides.mode = mode.clone();
    }
    Ok(overrides)
}

fn read_overrides(path: &Path) -> Result<RunConfig> {
    let text = std::fs::read_to_string(path)
        .with_context(|| format!("failed to read {}", path.display()))?;
    serde_yaml::from_str(&text).with_context(|| format!("failed to parse {}", path.display()))
}
