//! Named prompt templates with default model parameters.
//!
//! Built-in templates are compiled into the binary. A directory of `.yaml`
//! files can be layered on top; a file whose `name` matches a built-in
//! replaces it.

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use minijinja::{Environment, UndefinedBehavior};
use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};
use walkdir::WalkDir;

use krknai_core::format::fixed_decimals;
use krknai_llm::ModelParams;

use crate::vars::TemplateVars;

const BUILTIN_TEMPLATES: &[(&str, &str)] = &[("krknai.yaml", include_str!("../templates/krknai.yaml"))];

#[derive(Debug, thiserror::Error)]
pub enum PromptError {
    #[error("unknown prompt template '{0}'")]
    UnknownTemplate(String),

    #[error("failed to render template '{name}': {message}")]
    Render { name: String, message: String },

    #[error("failed to load template {origin}: {message}")]
    Load { origin: String, message: String },
}

/// One prompt template as stored on disk.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PromptTemplate {
    pub name: String,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub model_params: ModelParams,
    pub template: String,
}

/// Renders a named template into the prompt text and its model parameters.
pub trait PromptRenderer: Send + Sync {
    fn render_prompt(
        &self,
        name: &str,
        vars: &TemplateVars,
    ) -> Result<(String, ModelParams), PromptError>;
}

#[derive(Debug, Clone)]
pub struct PromptStore {
    templates: BTreeMap<String, PromptTemplate>,
}

impl PromptStore {
    /// Store holding only the built-in templates.
    pub fn builtin() -> Result<Self, PromptError> {
        let mut templates = BTreeMap::new();
        for (origin, yaml) in BUILTIN_TEMPLATES {
            let template = parse_template(yaml, origin)?;
            templates.insert(template.name.clone(), template);
        }
        Ok(Self { templates })
    }

    /// Built-ins plus every `.yaml`/`.yml` file under `dir`, recursively.
    /// Files that fail to parse are skipped with a warning.
    pub fn with_overrides(dir: &Path) -> Result<Self, PromptError> {
        let mut store = Self::builtin()?;
        if !dir.is_dir() {
            return Err(PromptError::Load {
                origin: dir.display().to_string(),
                message: "not a directory".into(),
            });
        }

        for entry in WalkDir::new(dir).follow_links(true).sort_by_file_name() {
            let entry = match entry {
                Ok(e) => e,
                Err(e) => {
                    warn!(error = %e, "walkdir error, skipping entry");
                    continue;
                }
            };
            if !entry.file_type().is_file() {
                continue;
            }
            let path: PathBuf = entry.into_path();
            if !matches!(path.extension().and_then(|e| e.to_str()), Some("yaml" | "yml")) {
                continue;
            }

            let loaded = std::fs::read_to_string(&path)
                .map_err(|e| e.to_string())
                .and_then(|yaml| {
                    parse_template(&yaml, &path.display().to_string()).map_err(|e| e.to_string())
                });
            match loaded {
                Ok(template) => {
                    info!(name = %template.name, path = %path.display(), "prompt template loaded");
                    store.templates.insert(template.name.clone(), template);
                }
                Err(e) => warn!(path = %path.display(), error = %e, "skipping prompt template"),
            }
        }

        Ok(store)
    }

    pub fn get(&self, name: &str) -> Option<&PromptTemplate> {
        self.templates.get(name)
    }

    pub fn names(&self) -> Vec<&str> {
        self.templates.keys().map(String::as_str).collect()
    }
}

impl PromptRenderer for PromptStore {
    fn render_prompt(
        &self,
        name: &str,
        vars: &TemplateVars,
    ) -> Result<(String, ModelParams), PromptError> {
        let template = self
            .get(name)
            .ok_or_else(|| PromptError::UnknownTemplate(name.to_string()))?;

        let rendered = build_env()
            .render_str(&template.template, vars.as_map())
            .map_err(|e| PromptError::Render {
                name: name.to_string(),
                message: format!("{e:#}"),
            })?;

        debug!(template = name, chars = rendered.len(), "prompt rendered");
        Ok((rendered, template.model_params))
    }
}

fn parse_template(yaml: &str, origin: &str) -> Result<PromptTemplate, PromptError> {
    let template: PromptTemplate = serde_yaml::from_str(yaml).map_err(|e| PromptError::Load {
        origin: origin.to_string(),
        message: e.to_string(),
    })?;

    // catch syntax errors at load time rather than mid-run
    build_env()
        .template_from_str(&template.template)
        .map_err(|e| PromptError::Load {
            origin: origin.to_string(),
            message: e.to_string(),
        })?;

    Ok(template)
}

fn build_env() -> Environment<'static> {
    let mut env = Environment::new();
    env.set_undefined_behavior(UndefinedBehavior::Strict);
    env.add_filter("round", fixed_decimals);
    env
}
