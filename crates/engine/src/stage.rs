use std::fmt;

/// Lifecycle of one [`Engine::run`](crate::Engine::run).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Stage {
    Created,
    Collecting,
    Rendering,
    InvokingModel,
    Persisting,
    Notifying,
    Done,
}

impl Stage {
    pub fn as_str(self) -> &'static str {
        match self {
            Stage::Created => "created",
            Stage::Collecting => "collecting",
            Stage::Rendering => "rendering",
            Stage::InvokingModel => "invoking-model",
            Stage::Persisting => "persisting",
            Stage::Notifying => "notifying",
            Stage::Done => "done",
        }
    }
}

impl fmt::Display for Stage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}
