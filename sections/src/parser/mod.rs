pub mod error;
mod markdown;
mod serialized;

pub use error::ParseError;
pub use markdown::{fits_heading_id, fits_id_annotation};

use crate::format::Format;
use crate::outline::Outline;

/// A successful load: the outline plus any warnings raised along the way.
pub type Parsed = (Outline, Vec<ParseError>);

/// Parser entry point.
pub struct Parser {
    source: String,
    file_id: usize,
    format: Format,
}

impl Parser {
    pub fn new(source: String, file_id: usize, format: Format) -> Self {
        Parser {
            source,
            file_id,
            format,
        }
    }

    /// Parse the source into an outline. Errors are collected, not short-circuited.
    pub fn parse(&self) -> Result<Parsed, Vec<ParseError>> {
        tracing::debug!(format = %self.format, bytes = self.source.len(), "parsing source");
        match self.format {
            Format::Markdown => markdown::parse_outline(&self.source, self.file_id),
            Format::Json => serialized::parse_json(&self.source, self.file_id)
                .map(|outline| (outline, Vec::new()))
                .map_err(|e| vec![e]),
            Format::Toml => serialized::parse_toml(&self.source, self.file_id)
                .map(|outline| (outline, Vec::new()))
                .map_err(|e| vec![e]),
        }
    }
}
