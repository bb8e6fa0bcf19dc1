use std::io::{self, Write};

use pulldown_cmark::{Event, Options, Parser as CmarkParser, html as cmark_html};
use pulldown_cmark_escape::{IoWriter, escape_href, escape_html};
use sections::{ComponentBody, ContentComponent, Outline, Section};

use crate::RenderOptions;
use crate::error::RenderError;
use crate::markdown::escape_line_starts;

/// Write an outline as an HTML fragment, one `<section>` per section.
/// Text and list items are Markdown and go through pulldown-cmark. Raw HTML
/// inside them is escaped and shows up as text, never as markup.
pub fn write_outline(
    outline: &Outline,
    out: &mut dyn Write,
    options: &RenderOptions,
) -> Result<(), RenderError> {
    options.check()?;
    for section in outline {
        write_section(section, out, options)?;
    }
    Ok(())
}

pub fn write_section(
    section: &Section,
    out: &mut dyn Write,
    options: &RenderOptions,
) -> Result<(), RenderError> {
    let level = options.heading_level;
    write!(out, "<section id=\"")?;
    escaped(out, &section.id)?;
    write!(out, "\">\n<h{level}>")?;
    escaped(out, &section.title)?;
    writeln!(out, "</h{level}>")?;
    for component in &section.components {
        write_component(component, out, options)?;
    }
    writeln!(out, "</section>")?;
    Ok(())
}

fn write_component(
    component: &ContentComponent,
    out: &mut dyn Write,
    options: &RenderOptions,
) -> Result<(), RenderError> {
    match &component.body {
        ComponentBody::Text(text) => {
            open_tag(out, "div class=\"text\"", component, options)?;
            write!(out, ">\n{}</div>\n", markdown_to_html(text))?;
        }
        ComponentBody::List(items) => {
            open_tag(out, "ul", component, options)?;
            writeln!(out, ">")?;
            for item in items {
                writeln!(out, "<li>{}</li>", inline_html(item))?;
            }
            writeln!(out, "</ul>")?;
        }
        ComponentBody::Image { url, alt } => {
            open_tag(out, "figure", component, options)?;
            write!(out, "><img src=\"")?;
            escape_href(IoWriter(&mut *out), url)?;
            write!(out, "\" alt=\"")?;
            escaped(out, alt)?;
            writeln!(out, "\"></figure>")?;
        }
    }
    Ok(())
}

/// `<tag` plus the component id attribute; the caller closes it.
fn open_tag(
    out: &mut dyn Write,
    tag: &str,
    component: &ContentComponent,
    options: &RenderOptions,
) -> io::Result<()> {
    write!(out, "<{}", tag)?;
    if options.explicit_ids {
        write!(out, " data-component-id=\"")?;
        escaped(out, &component.id)?;
        write!(out, "\"")?;
    }
    Ok(())
}

/// Element content and double-quoted attribute values.
fn escaped(out: &mut dyn Write, s: &str) -> io::Result<()> {
    escape_html(IoWriter(out), s)
}

fn markdown_to_html(text: &str) -> String {
    let text = escape_line_starts(text);
    let events = CmarkParser::new_ext(&text, Options::ENABLE_STRIKETHROUGH).map(|event| match event {
        Event::Html(html) | Event::InlineHtml(html) => Event::Text(html),
        other => other,
    });
    let mut html = String::new();
    cmark_html::push_html(&mut html, events);
    html
}

/// A list item is one paragraph; drop the `<p>` wrapper.
fn inline_html(item: &str) -> String {
    let html = markdown_to_html(item);
    let trimmed = html.trim_end();
    match trimmed.strip_prefix("<p>").and_then(|s| s.strip_suffix("</p>")) {
        Some(inner) => inner.to_string(),
        None => trimmed.to_string(),
    }
}
