use std::path::Path;

use codespan_reporting::diagnostic::Diagnostic;
use codespan_reporting::files::SimpleFiles;
use codespan_reporting::term;
use codespan_reporting::term::termcolor::{ColorChoice, StandardStream};
use sections::parser::Parser;
use sections::{Format, Outline};

/// Writes codespan diagnostics to stderr against a file database.
pub struct Reporter {
    writer: StandardStream,
    config: term::Config,
    pub files: SimpleFiles<String, String>,
}

impl Reporter {
    pub fn new(no_color: bool) -> Self {
        let color_choice = if no_color {
            ColorChoice::Never
        } else {
            ColorChoice::Auto
        };
        Reporter {
            writer: StandardStream::stderr(color_choice),
            config: term::Config::default(),
            files: SimpleFiles::new(),
        }
    }

    pub fn emit(&self, diagnostic: &Diagnostic<usize>) {
        let _ = term::emit_to_write_style(&mut self.writer.lock(), &self.config, &self.files, diagnostic);
    }
}

/// An outline read from disk, with the number of load warnings already reported.
pub struct Loaded {
    pub outline: Outline,
    pub warnings: usize,
}

/// Read, detect the format of, and parse a content file. Load diagnostics are
/// emitted; `None` means the file could not be loaded.
pub fn load(path: &str, format: Option<Format>, reporter: &mut Reporter) -> Option<Loaded> {
    let Some(format) = format.or_else(|| Format::from_path(Path::new(path))) else {
        eprintln!("error: cannot tell the format of '{}'; pass --format json|toml|markdown", path);
        return None;
    };

    let source = match std::fs::read_to_string(path) {
        Ok(s) => s,
        Err(e) => {
            eprintln!("error: cannot read '{}': {}", path, e);
            return None;
        }
    };

    let file_id = reporter.files.add(path.to_string(), source.clone());
    tracing::info!(path, %format, "loading");

    match Parser::new(source, file_id, format).parse() {
        Ok((outline, warnings)) => {
            for warning in &warnings {
                reporter.emit(&warning.to_diagnostic());
            }
            Some(Loaded {
                outline,
                warnings: warnings.len(),
            })
        }
        Err(errors) => {
            for error in &errors {
                reporter.emit(&error.to_diagnostic());
            }
            None
        }
    }
}
