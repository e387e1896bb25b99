//! `read_file`: the model's only window onto the run's log artifacts.
//!
//! Reads are limited to the artifacts the aggregator reported for the current
//! run. Any other path is refused, however it is spelled.

use std::path::Path;

use async_trait::async_trait;
use serde::Deserialize;
use tokio::io::AsyncReadExt;
use serde_json::{json, Value};
use tracing::{debug, warn};

use krknai_core::LogArtifact;

use crate::tool::{Tool, ToolContext, ToolDefinition, ToolError, ToolResult};

pub const READ_FILE_TOOL: &str = "read_file";

/// Returned content is cut at this many bytes.
const MAX_CONTENT_BYTES: usize = 256 * 1024;

/// At most this much of an artifact is loaded from disk.
const MAX_READ_BYTES: u64 = 16 * 1024 * 1024;

/// Leading bytes inspected for a NUL when sniffing binary files.
const SNIFF_BYTES: usize = 8 * 1024;

#[derive(Debug, Deserialize)]
struct ReadArgs {
    path: String,
    /// 1-based first line
    #[serde(default)]
    offset: Option<f64>,
    #[serde(default)]
    limit: Option<f64>,
}

pub struct ReadFileTool {
    artifacts: Vec<LogArtifact>,
}

impl ReadFileTool {
    pub fn new(artifacts: Vec<LogArtifact>) -> Self {
        Self { artifacts }
    }

    /// An artifact matches on its file name, its full path, or a path
    /// relative to `base` that lands on it.
    fn lookup(&self, base: &Path, requested: &str) -> Option<&LogArtifact> {
        let as_path = Path::new(requested);
        let under_base = base.join(as_path);
        self.artifacts
            .iter()
            .find(|a| a.name == requested || a.path == as_path || a.path == under_base)
    }
}

/// The first `cap` bytes of `path`, cut back to the last whole line when the
/// file is longer, along with the file's size on disk.
async fn read_bounded(path: &Path, cap: u64) -> std::io::Result<(Vec<u8>, u64)> {
    let file = tokio::fs::File::open(path).await?;
    let total = file.metadata().await?.len();
    let mut bytes = Vec::with_capacity(total.min(cap) as usize);
    file.take(cap).read_to_end(&mut bytes).await?;
    if total > cap {
        if let Some(end) = bytes.iter().rposition(|&b| b == b'\n') {
            bytes.truncate(end + 1);
        }
    }
    Ok((bytes, total))
}

fn looks_binary(bytes: &[u8]) -> bool {
    bytes.iter().take(SNIFF_BYTES).any(|&b| b == 0)
}

/// Number lines `first..` of `text` the way `cat -n` does, stopping at the
/// byte cap with a note on how to continue.
fn render_lines(text: &str, first: usize, limit: Option<usize>) -> String {
    let all: Vec<&str> = text.lines().collect();
    let skip = first.saturating_sub(1).min(all.len());
    let take = limit.unwrap_or(usize::MAX);

    let mut out = String::new();
    for (idx, line) in all.iter().enumerate().skip(skip).take(take) {
        let numbered = format!("{:>6}\t{line}\n", idx + 1);
        if out.len() + numbered.len() > MAX_CONTENT_BYTES {
            out.push_str(&format!(
                "[truncated at line {}; {} lines total, use offset to continue]\n",
                idx + 1,
                all.len()
            ));
            break;
        }
        out.push_str(&numbered);
    }
    out.truncate(out.trim_end_matches('\n').len());
    out
}

#[async_trait]
impl Tool for ReadFileTool {
    fn definition(&self) -> ToolDefinition {
        let listing = if self.artifacts.is_empty() {
            "(none)".to_string()
        } else {
            self.artifacts.iter().map(|a| a.name.as_str()).collect::<Vec<_>>().join(", ")
        };
        ToolDefinition::new(
            READ_FILE_TOOL,
            format!(
                "Read a log file from the chaos test run, optionally restricted to a line range. \
                 Available files: {listing}"
            ),
            json!({
                "type": "object",
                "properties": {
                    "path": { "type": "string", "description": "Name or path of the log file to read" },
                    "offset": { "type": "number", "description": "First line to return, 1-based (default 1)" },
                    "limit": { "type": "number", "description": "How many lines to return at most" }
                },
                "required": ["path"]
            }),
        )
    }

    async fn execute(&self, input: Value, context: &ToolContext) -> Result<ToolResult, ToolError> {
        let args: ReadArgs = serde_json::from_value(input)
            .map_err(|e| ToolError::InvalidInput(format!("bad read_file arguments: {e}")))?;

        let Some(artifact) = self.lookup(&context.working_directory, &args.path) else {
            warn!(path = %args.path, "model requested a file outside the allow-list");
            return Err(ToolError::PermissionDenied(format!(
                "'{}' is not one of the available log artifacts",
                args.path
            )));
        };

        debug!(path = %artifact.path.display(), offset = ?args.offset, limit = ?args.limit, "reading log artifact");

        let (bytes, total) = read_bounded(&artifact.path, MAX_READ_BYTES).await.map_err(|e| {
            ToolError::ExecutionFailed(format!("failed to read '{}': {e}", artifact.name))
        })?;
        if looks_binary(&bytes) {
            return Ok(ToolResult::text(format!("Binary file, {total} bytes")));
        }

        // declared as JSON numbers, so integral floats are accepted too
        let first = args.offset.map_or(1, |o| o.max(1.0) as usize);
        let limit = args.limit.map(|l| l.max(0.0) as usize);
        let mut content = render_lines(&String::from_utf8_lossy(&bytes), first, limit);
        if total > bytes.len() as u64 {
            warn!(path = %artifact.path.display(), total, read = bytes.len(), "artifact larger than the read cap");
            content.push_str(&format!("\n[file is {total} bytes; only the first {} were read]", bytes.len()));
        }
        Ok(ToolResult::text(content))
    }
}
