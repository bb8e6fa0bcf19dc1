use std::ops::Range;

use serde::Deserialize;

use crate::outline::Outline;
use crate::parser::error::ParseError;
use crate::section::Section;

/// TOML has no top-level arrays, so sections live under a `sections` key.
#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
struct TomlDocument {
    sections: Vec<Section>,
}

/// A JSON document is either one section object or an array of sections.
pub(crate) fn parse_json(source: &str, file_id: usize) -> Result<Outline, ParseError> {
    let result = if source.trim_start().starts_with('[') {
        serde_json::from_str::<Vec<Section>>(source)
    } else {
        serde_json::from_str::<Section>(source).map(|section| vec![section])
    };

    match result {
        Ok(sections) => {
            tracing::debug!(sections = sections.len(), "loaded JSON outline");
            Ok(Outline::new(sections, file_id))
        }
        Err(e) => {
            let span = if e.line() == 0 {
                0..0
            } else {
                point_span(source, line_column_to_offset(source, e.line(), e.column()))
            };
            Err(ParseError::error(strip_position(&e.to_string()), span, file_id)
                .with_note(format!("while reading JSON ({:?})", e.classify())))
        }
    }
}

pub(crate) fn parse_toml(source: &str, file_id: usize) -> Result<Outline, ParseError> {
    match toml::from_str::<TomlDocument>(source) {
        Ok(doc) => {
            tracing::debug!(sections = doc.sections.len(), "loaded TOML outline");
            Ok(Outline::new(doc.sections, file_id))
        }
        Err(e) => {
            let span = e.span().unwrap_or(0..0);
            Err(ParseError::error(e.message().trim().to_string(), span, file_id)
                .with_note("sections are written as [[sections]] tables with [[sections.components]] entries"))
        }
    }
}

/// serde_json appends " at line L column C"; the label already shows it.
fn strip_position(message: &str) -> String {
    match message.rfind(" at line ") {
        Some(pos) => message[..pos].to_string(),
        None => message.to_string(),
    }
}

/// Convert a 1-based line and column to a byte offset in `source`.
fn line_column_to_offset(source: &str, line: usize, column: usize) -> usize {
    let line_start: usize = source
        .split_inclusive('\n')
        .take(line.saturating_sub(1))
        .map(str::len)
        .sum();
    (line_start + column.saturating_sub(1)).min(source.len())
}

/// A one-character span at `offset`, clamped to a character boundary.
fn point_span(source: &str, offset: usize) -> Range<usize> {
    let mut start = offset.min(source.len());
    while !source.is_char_boundary(start) {
        start -= 1;
    }
    let end = source[start..]
        .chars()
        .next()
        .map(|c| start + c.len_utf8())
        .unwrap_or(start);
    start..end
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::component::ContentComponent;

    const SECTION: &str = r#"{
  "id": "intro",
  "title": "Introduction",
  "components": [
    { "id": "p", "type": "text", "content": "Hello" },
    { "id": "l", "type": "list", "content": ["a", "b"] }
  ]
}"#;

    #[test]
    fn single_object_is_one_section() {
        let outline = parse_json(SECTION, 3).unwrap();
        assert_eq!(outline.source_id, 3);
        assert_eq!(outline.len(), 1);
        assert_eq!(outline.sections[0].components[1], ContentComponent::list("l", ["a", "b"]));
    }

    #[test]
    fn array_is_many_sections() {
        let source = format!("[{}, {{\"id\": \"b\", \"title\": \"B\", \"components\": []}}]", SECTION);
        let outline = parse_json(&source, 0).unwrap();
        let ids: Vec<&str> = outline.iter().map(|s| s.id.as_str()).collect();
        assert_eq!(ids, ["intro", "b"]);
    }

    #[test]
    fn json_error_points_at_offending_line() {
        let source = "{\n  \"id\": \"s\",\n  \"title\": \"T\",\n  \"components\": [\n    { \"id\": \"x\", \"type\": \"video\", \"content\": \"\" }\n  ]\n}";
        let err = parse_json(source, 0).unwrap_err();
        assert!(err.message.contains("unknown variant"), "{}", err.message);
        assert!(!err.message.contains(" at line "));
        let line = source[..err.span.start].matches('\n').count() + 1;
        assert_eq!(line, 5);
    }

    #[test]
    fn shape_errors_surface_through_json() {
        let source = r#"{"id": "s", "title": "T", "components": [{"id": "i", "type": "image", "content": "x"}]}"#;
        let err = parse_json(source, 0).unwrap_err();
        assert!(err.message.contains("requires an imageUrl"), "{}", err.message);
    }

    #[test]
    fn toml_sections() {
        let source = r#"
[[sections]]
id = "gallery"
title = "Gallery"

[[sections.components]]
id = "hero"
type = "image"
content = "Harbour at dusk"
imageUrl = "https://example.com/harbour.jpg"

[[sections.components]]
id = "notes"
type = "list"
content = ["one", "two"]
"#;
        let outline = parse_toml(source, 0).unwrap();
        let gallery = outline.section("gallery").unwrap();
        assert_eq!(
            gallery.components,
            vec![
                ContentComponent::image("hero", "https://example.com/harbour.jpg", "Harbour at dusk"),
                ContentComponent::list("notes", ["one", "two"]),
            ]
        );
    }

    #[test]
    fn toml_round_trip() {
        let doc = TomlDocument {
            sections: vec![
                Section::new("a", "A")
                    .with_component(ContentComponent::text("a-1", "Text"))
                    .with_component(ContentComponent::image("a-2", "x.png", "")),
                Section::new("b", "B"),
            ],
        };
        #[derive(serde::Serialize)]
        struct Out<'a> {
            sections: &'a [Section],
        }
        let encoded = toml::to_string(&Out { sections: &doc.sections }).unwrap();
        let outline = parse_toml(&encoded, 0).unwrap();
        assert_eq!(outline.sections, doc.sections);
    }

    #[test]
    fn toml_error_has_span() {
        let source = "[[sections]]\nid = \"a\"\ntitle = 5\ncomponents = []\n";
        let err = parse_toml(source, 0).unwrap_err();
        assert!(err.span.start > 0);
        assert!(!err.notes.is_empty());
    }

    #[test]
    fn offsets_from_line_and_column() {
        let source = "ab\ncde\nf";
        assert_eq!(line_column_to_offset(source, 1, 1), 0);
        assert_eq!(line_column_to_offset(source, 2, 2), 4);
        assert_eq!(line_column_to_offset(source, 3, 1), 7);
        assert_eq!(point_span(source, 4), 4..5);
        assert_eq!(point_span(source, 99), 8..8);
    }
}
