use std::path::PathBuf;

use clap::{Args, Parser, Subcommand};

/// Post-run analysis for krkn-ai chaos runs.
///
/// Settings come from the environment (and `.env`); flags given here take
/// precedence.
#[derive(Parser, Debug)]
#[command(name = "krknai", version, about = "Post-run analysis for krkn-ai chaos runs")]
pub struct CliArgs {
    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Analyze a results directory with the model and notify
    Analyze(AnalyzeArgs),
    /// Overlay run parameters onto a discovered krkn-ai config file
    MergeConfig(MergeArgs),
    /// Check run parameters without touching any file
    Validate(ValidateArgs),
}

#[derive(Args, Debug)]
pub struct AnalyzeArgs {
    /// krkn-ai results directory (default: KRKNAI_RESULTS_DIR)
    #[arg(long)]
    pub results_dir: Option<PathBuf>,

    /// Gemini API key (default: GEMINI_API_KEY)
    #[arg(long)]
    pub api_key: Option<String>,

    /// Model name (default: GEMINI_MODEL)
    #[arg(long)]
    pub model: Option<String>,

    #[arg(long)]
    pub temperature: Option<f32>,

    #[arg(long)]
    pub max_tokens: Option<u32>,

    #[arg(long)]
    pub top_p: Option<f32>,

    /// Number of highest-fitness scenarios shown to the model
    #[arg(long)]
    pub top_scenarios: Option<usize>,

    /// Maximum tool-calling rounds per analysis
    #[arg(long)]
    pub max_tool_iterations: Option<usize>,

    /// Notification YAML; replaces the SLACK_WEBHOOK_URL shorthand
    #[arg(long, env = "KRKNAI_NOTIFY_CONFIG")]
    pub notify_config: Option<PathBuf>,

    /// Directory of prompt template overrides
    #[arg(long, env = "KRKNAI_PROMPT_DIR")]
    pub prompt_dir: Option<PathBuf>,

    /// Skip notifications even when configured
    #[arg(long)]
    pub no_notify: bool,
}

#[derive(Args, Debug)]
pub struct MergeArgs {
    /// Discovered krkn-ai config to update in place
    #[arg(long, env = "KRKN_AI_CONFIG")]
    pub config: PathBuf,

    #[command(flatten)]
    pub overrides: OverrideSource,
}

#[derive(Args, Debug)]
pub struct ValidateArgs {
    #[command(flatten)]
    pub overrides: OverrideSource,
}

/// Where run parameters come from: a YAML file, or `KRKN_AI_*` variables.
#[derive(Args, Debug)]
pub struct OverrideSource {
    /// YAML file of run parameters (default: KRKN_AI_* environment variables)
    #[arg(long)]
    pub overrides: Option<PathBuf>,

    /// Run mode, replacing the one from the parameters
    #[arg(long)]
    pub mode: Option<String>,
}
