use crate::ToolError;

#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum EvalError {
    #[error("{0}")]
    Runtime(String),

    #[error(transparent)]
    Tool(#[from] ToolError),
}

impl EvalError {
    pub(crate) fn runtime(message: impl Into<String>) -> Self {
        EvalError::Runtime(message.into())
    }
}
