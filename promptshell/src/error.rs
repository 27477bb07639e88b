use ptooling::ToolError;
use thiserror::Error;

#[derive(Debug, Clone, PartialEq, Error)]
pub enum EngineError {
    #[error("tool dispatcher could not be built: {0}")]
    Dispatcher(#[source] ToolError),
}
