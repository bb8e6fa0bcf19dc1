use std::io::Write;

use sections::inline::escape_text;
use sections::parser::{fits_heading_id, fits_id_annotation};
use sections::{ComponentBody, Outline, Section};

use crate::RenderOptions;
use crate::error::RenderError;

/// Write an outline as Markdown. With `explicit_ids` the output imports back
/// to the same sections and components; ids that a heading attribute or an
/// id annotation cannot hold are refused with [`RenderError::MarkdownId`].
pub fn write_outline(
    outline: &Outline,
    out: &mut dyn Write,
    options: &RenderOptions,
) -> Result<(), RenderError> {
    options.check()?;
    for (i, section) in outline.iter().enumerate() {
        if i > 0 {
            writeln!(out)?;
        }
        write_section(section, out, options)?;
    }
    Ok(())
}

pub fn write_section(
    section: &Section,
    out: &mut dyn Write,
    options: &RenderOptions,
) -> Result<(), RenderError> {
    let hashes = "#".repeat(options.heading_level as usize);
    let title = escape_title(&section.title);
    if options.explicit_ids {
        if !fits_heading_id(&section.id) {
            return Err(RenderError::MarkdownId(section.id.clone()));
        }
        writeln!(out, "{} {} {{#{}}}", hashes, title, section.id)?;
    } else {
        writeln!(out, "{} {}", hashes, title)?;
    }

    for component in &section.components {
        writeln!(out)?;
        if options.explicit_ids {
            if !fits_id_annotation(&component.id) {
                return Err(RenderError::MarkdownId(component.id.clone()));
            }
            writeln!(out, "<!-- id: {} -->", component.id)?;
        }
        write_body(&component.body, out)?;
    }
    Ok(())
}

fn write_body(body: &ComponentBody, out: &mut dyn Write) -> Result<(), RenderError> {
    match body {
        ComponentBody::Text(text) => writeln!(out, "{}", escape_line_starts(text.trim_end()))?,
        ComponentBody::List(items) => {
            for item in items {
                // Continuation lines stay inside the item
                writeln!(out, "- {}", escape_line_starts(item).replace('\n', "\n  "))?;
            }
        }
        ComponentBody::Image { url, alt } => {
            if url.chars().any(|c| c.is_whitespace() || c == '(' || c == ')') {
                writeln!(out, "![{}](<{}>)", alt, url)?;
            } else {
                writeln!(out, "![{}]({})", alt, url)?;
            }
        }
    }
    Ok(())
}

/// Titles are plain text; `#`, `{` and `}` would end the heading early.
fn escape_title(title: &str) -> String {
    let mut escaped = String::with_capacity(title.len());
    for c in escape_text(title).chars() {
        if matches!(c, '#' | '{' | '}') {
            escaped.push('\\');
        }
        escaped.push(c);
    }
    escaped
}

/// Backslash-escape a block marker at the start of any line, so text and
/// list items stay one paragraph when read back.
pub(crate) fn escape_line_starts(text: &str) -> String {
    text.split('\n').map(escape_line_start).collect::<Vec<_>>().join("\n")
}

fn escape_line_start(line: &str) -> String {
    let body = line.trim_start_matches([' ', '\t']);
    let indent = &line[..line.len() - body.len()];
    let Some(first) = body.chars().next() else {
        return line.to_string();
    };
    let rest = &body[first.len_utf8()..];
    let is_rule = || body.chars().all(|c| c == first || c == ' ' || c == '\t');

    let marker = match first {
        '#' | '>' | '=' => true,
        '-' | '+' | '*' => rest.is_empty() || rest.starts_with([' ', '\t']) || is_rule(),
        '_' => is_rule(),
        '`' => body.starts_with("```"),
        '~' => body.starts_with("~~~"),
        _ => false,
    };
    if marker {
        return format!("{}\\{}", indent, body);
    }

    // Ordered item: up to nine digits, then `.` or `)`
    let digits = body.len() - body.trim_start_matches(|c: char| c.is_ascii_digit()).len();
    if (1..=9).contains(&digits) {
        let after = &body[digits..];
        if let Some(tail) = after.strip_prefix(['.', ')']) {
            if tail.is_empty() || tail.starts_with([' ', '\t']) {
                return format!("{}{}\\{}", indent, &body[..digits], after);
            }
        }
    }
    line.to_string()
}

#[cfg(test)]
mod tests {
    use sections::ContentComponent;

    use super::*;

    fn render(outline: &Outline, options: RenderOptions) -> String {
        let mut buf = Vec::new();
        write_outline(outline, &mut buf, &options).unwrap();
        String::from_utf8(buf).unwrap()
    }

    fn sample() -> Outline {
        Outline::new(
            vec![
                Section::new("intro", "Introduction")
                    .with_component(ContentComponent::text("lead", "Hello **there**."))
                    .with_component(ContentComponent::list("points", ["one", "two\nlines"]))
                    .with_component(ContentComponent::image("logo", "img/logo.png", "Logo")),
                Section::new("empty", "Nothing here"),
            ],
            0,
        )
    }

    #[test]
    fn writes_ids_by_default() {
        let expected = "\
# Introduction {#intro}

<!-- id: lead -->
Hello **there**.

<!-- id: points -->
- one
- two
  lines

<!-- id: logo -->
![Logo](img/logo.png)

# Nothing here {#empty}
";
        assert_eq!(render(&sample(), RenderOptions::default()), expected);
    }

    #[test]
    fn plain_output_without_ids() {
        let options = RenderOptions {
            explicit_ids: false,
            heading_level: 2,
        };
        let output = render(&sample(), options);
        assert!(output.starts_with("## Introduction\n\nHello **there**.\n"));
        assert!(!output.contains("<!--"));
        assert!(!output.contains("{#"));
    }

    #[test]
    fn image_urls_with_spaces_are_bracketed() {
        let outline = Outline::new(
            vec![Section::new("s", "S").with_component(ContentComponent::image("i", "my pic.png", "x"))],
            0,
        );
        assert!(render(&outline, RenderOptions::default()).contains("![x](<my pic.png>)"));
    }

    fn single(body: ContentComponent) -> Outline {
        Outline::new(vec![Section::new("s", "S").with_component(body)], 0)
    }

    #[test]
    fn block_markers_at_line_start_are_escaped() {
        assert_eq!(escape_line_starts("- not a list"), "\\- not a list");
        assert_eq!(escape_line_starts("1. Step"), "1\\. Step");
        assert_eq!(escape_line_starts("2) Step"), "2\\) Step");
        assert_eq!(escape_line_starts("> note"), "\\> note");
        assert_eq!(escape_line_starts("# tag\n==="), "\\# tag\n\\===");
        assert_eq!(escape_line_starts("a\n***\n```"), "a\n\\***\n\\```");
        assert_eq!(escape_line_starts("*emphasis* first"), "*emphasis* first");
        assert_eq!(escape_line_starts("-5 degrees, 2024.10"), "-5 degrees, 2024.10");
    }

    #[test]
    fn text_with_block_markers_stays_text() {
        let outline = single(ContentComponent::text("t", "- not a list"));
        let output = render(&outline, RenderOptions::default());
        assert!(output.contains("<!-- id: t -->\n\\- not a list\n"));
    }

    #[test]
    fn titles_are_escaped() {
        assert_eq!(escape_title("C# {draft}"), "C\\# \\{draft\\}");
        let outline = Outline::new(vec![Section::new("s", "Use *stars*")], 0);
        assert_eq!(render(&outline, RenderOptions::default()), "# Use \\*stars\\* {#s}\n");
    }

    #[test]
    fn ids_markdown_cannot_hold_are_refused() {
        let outline = Outline::new(vec![Section::new("my id", "S")], 0);
        let err = write_outline(&outline, &mut Vec::new(), &RenderOptions::default()).unwrap_err();
        assert!(matches!(err, RenderError::MarkdownId(id) if id == "my id"));

        let outline = single(ContentComponent::text("a-->b", "x"));
        let err = write_outline(&outline, &mut Vec::new(), &RenderOptions::default()).unwrap_err();
        assert!(matches!(err, RenderError::MarkdownId(id) if id == "a-->b"));

        let options = RenderOptions {
            explicit_ids: false,
            heading_level: 1,
        };
        assert!(write_outline(&outline, &mut Vec::new(), &options).is_ok());
    }

    #[test]
    fn rejects_bad_heading_level() {
        let options = RenderOptions {
            explicit_ids: true,
            heading_level: 7,
        };
        let err = write_outline(&sample(), &mut Vec::new(), &options).unwrap_err();
        assert!(matches!(err, RenderError::HeadingLevel(7)));
    }
}
