//! Prompt templates for the analysis step.

pub mod store;
pub mod vars;

pub use store::{PromptError, PromptRenderer, PromptStore, PromptTemplate};
pub use vars::TemplateVars;

/// Template used for krkn-ai run analysis.
pub const KRKNAI_TEMPLATE: &str = "krknai";
