//! Built-in tool implementations exposed to the analysis model.

pub mod read_file;

pub use read_file::{ReadFileTool, READ_FILE_TOOL};
