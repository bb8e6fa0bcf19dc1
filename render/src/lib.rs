pub mod error;
pub mod html;
pub mod json;
pub mod markdown;

use std::fmt;
use std::io::Write;
use std::str::FromStr;

use serde::Deserialize;
use thiserror::Error;

use sections::Outline;

pub use error::RenderError;

/// Output formats.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Target {
    #[default]
    Markdown,
    Html,
    Json,
}

impl Target {
    pub fn as_str(&self) -> &'static str {
        match self {
            Target::Markdown => "markdown",
            Target::Html => "html",
            Target::Json => "json",
        }
    }
}

impl fmt::Display for Target {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("unknown output '{0}' (expected markdown, html or json)")]
pub struct UnknownTarget(pub String);

impl FromStr for Target {
    type Err = UnknownTarget;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "md" | "markdown" => Ok(Target::Markdown),
            "html" => Ok(Target::Html),
            "json" => Ok(Target::Json),
            _ => Err(UnknownTarget(s.to_string())),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RenderOptions {
    /// Emit component ids (`<!-- id: -->` in Markdown, `data-component-id` in HTML)
    /// and heading ids.
    pub explicit_ids: bool,
    /// Heading level for section titles, 1-6.
    pub heading_level: u8,
}

impl Default for RenderOptions {
    fn default() -> Self {
        RenderOptions {
            explicit_ids: true,
            heading_level: 1,
        }
    }
}

impl RenderOptions {
    /// Reject options no writer can honour.
    pub fn check(&self) -> Result<(), RenderError> {
        if (1..=6).contains(&self.heading_level) {
            Ok(())
        } else {
            Err(RenderError::HeadingLevel(self.heading_level))
        }
    }
}

/// Render an outline to `out` in the given format.
pub fn render_outline(
    outline: &Outline,
    target: Target,
    out: &mut dyn Write,
    options: &RenderOptions,
) -> Result<(), RenderError> {
    tracing::debug!(%target, sections = outline.len(), "rendering outline");
    match target {
        Target::Markdown => markdown::write_outline(outline, out, options),
        Target::Html => html::write_outline(outline, out, options),
        Target::Json => json::write_outline(outline, out),
    }
}

pub fn render_to_string(
    outline: &Outline,
    target: Target,
    options: &RenderOptions,
) -> Result<String, RenderError> {
    let mut buf = Vec::new();
    render_outline(outline, target, &mut buf, options)?;
    Ok(String::from_utf8_lossy(&buf).into_owned())
}
