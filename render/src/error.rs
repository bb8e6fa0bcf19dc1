use thiserror::Error;

#[derive(Debug, Error)]
pub enum RenderError {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
    #[error("serialization failed: {0}")]
    Json(#[from] serde_json::Error),
    #[error("heading level {0} is out of range (expected 1-6)")]
    HeadingLevel(u8),
    #[error("id '{0}' cannot be written in Markdown output; rename it or render with --no-ids")]
    MarkdownId(String),
}
