use thiserror::Error;

#[derive(Error, Debug)]
pub enum CoreError {
    #[error("tool message {index} answers unknown tool call '{tool_call_id}'")]
    ToolPairing { index: usize, tool_call_id: String },

    #[error("store error: {0}")]
    Store(String),

    #[error(transparent)]
    Sqlite(#[from] rusqlite::Error),

    #[error(transparent)]
    Io(#[from] std::io::Error),

    #[error(transparent)]
    Json(#[from] serde_json::Error),

    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

pub type Result<T> = std::result::Result<T, CoreError>;
