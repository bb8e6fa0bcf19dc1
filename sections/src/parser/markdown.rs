use std::collections::HashSet;
use std::ops::Range;

use pulldown_cmark::{Event, Options, Parser as CmarkParser, Tag, TagEnd};

use crate::component::{ComponentBody, ContentComponent};
use crate::inline::{self, InlineNode};
use crate::outline::{Location, Outline, SourceMap};
use crate::parser::error::ParseError;
use crate::section::Section;

type Spanned<'a> = (Event<'a>, Range<usize>);

// ---------------------------------------------------------------------------
// Public API
// ---------------------------------------------------------------------------

/// Parse Markdown source text into an outline. Every heading opens a section;
/// paragraphs, lists and lone images become its components.
pub fn parse_outline(
    source: &str,
    file_id: usize,
) -> Result<(Outline, Vec<ParseError>), Vec<ParseError>> {
    let options = Options::ENABLE_STRIKETHROUGH
        | Options::ENABLE_TABLES
        | Options::ENABLE_HEADING_ATTRIBUTES;
    let parser = CmarkParser::new_ext(source, options);
    let events: Vec<Spanned<'_>> = parser.into_offset_iter().collect();

    let mut state = ParseState::new(file_id);
    state.process_events(&events);
    state.finalize()
}

// ---------------------------------------------------------------------------
// Parse state
// ---------------------------------------------------------------------------

struct ParseState {
    file_id: usize,
    sections: Vec<Section>,
    spans: SourceMap,
    /// Section ids handed out so far, for slug de-duplication.
    used_ids: HashSet<String>,
    /// Id from an `<!-- id: ... -->` annotation waiting for its component.
    pending_id: Option<(String, Range<usize>)>,
    diagnostics: Vec<ParseError>,
}

impl ParseState {
    fn new(file_id: usize) -> Self {
        ParseState {
            file_id,
            sections: Vec::new(),
            spans: SourceMap::default(),
            used_ids: HashSet::new(),
            pending_id: None,
            diagnostics: Vec::new(),
        }
    }

    fn warn(&mut self, message: impl Into<String>, span: Range<usize>) {
        self.diagnostics
            .push(ParseError::warning(message, span, self.file_id));
    }

    fn process_events(&mut self, events: &[Spanned<'_>]) {
        let mut i = 0;

        while i < events.len() {
            let (ref ev, ref range) = events[i];

            match ev {
                Event::Start(Tag::Heading { id, .. }) => {
                    let explicit_id = id.as_ref().map(|s| s.to_string());
                    i += 1;
                    let title = normalize_title(&collect_heading_text(events, &mut i));
                    self.open_section(title, explicit_id, range.clone());
                }

                Event::Start(Tag::Paragraph) => {
                    i += 1;
                    let inlines = collect_inlines(events, &mut i, &|e| matches!(e, TagEnd::Paragraph));
                    self.add_component(paragraph_body(inlines), range.clone());
                }

                // Ordered and unordered lists alike
                Event::Start(Tag::List(_)) => {
                    i += 1;
                    let items = self.collect_list(events, &mut i);
                    self.add_component(ComponentBody::List(items), range.clone());
                }

                Event::Start(Tag::HtmlBlock) => {
                    i += 1;
                    let html = collect_html(events, &mut i);
                    self.process_html_block(&html, range.clone());
                }

                Event::Start(tag) => {
                    self.warn(
                        format!("{} is not a supported component; skipped", block_name(tag)),
                        range.clone(),
                    );
                    skip_block(events, &mut i);
                }

                _ => {
                    i += 1;
                }
            }
        }
    }

    fn open_section(&mut self, title: String, explicit_id: Option<String>, span: Range<usize>) {
        if let Some((_, annotation)) = self.pending_id.take() {
            self.warn("id annotation is not followed by a component", annotation);
        }

        let id = match explicit_id {
            Some(id) => id,
            None => unique_slug(&title, &self.used_ids),
        };
        self.used_ids.insert(id.clone());

        tracing::debug!(id = %id, title = %title, "opened section");
        self.spans.insert(Location::section(self.sections.len()), span);
        self.sections.push(Section::new(id, title));
    }

    fn add_component(&mut self, body: ComponentBody, span: Range<usize>) {
        let pending = self.pending_id.take();

        let section_index = self.sections.len().saturating_sub(1);
        let Some(section) = self.sections.last_mut() else {
            self.warn(
                "content before the first heading is not part of any section; skipped",
                span,
            );
            return;
        };

        let position = section.components.len();
        let id = match pending {
            Some((id, _)) => id,
            None => format!("{}-{}", section.id, position + 1),
        };

        tracing::debug!(section = %section.id, id = %id, kind = %body.component_type(), "added component");
        section.push(ContentComponent { id, body });
        self.spans
            .insert(Location::component(section_index, position), span);
    }

    fn process_html_block(&mut self, html: &str, span: Range<usize>) {
        match parse_id_annotation(html) {
            Some(id) if id.is_empty() => {
                self.diagnostics.push(
                    ParseError::error("id annotation has an empty id", span, self.file_id)
                        .with_note("write the annotation as <!-- id: my-component -->"),
                );
            }
            Some(id) => {
                if let Some((_, previous)) = self.pending_id.take() {
                    self.warn("id annotation is not followed by a component", previous);
                }
                self.pending_id = Some((id, span));
            }
            // Other comments are allowed and carry no content.
            None if html.trim_start().starts_with("<!--") => {}
            None => {
                self.warn("raw HTML is not a supported component; skipped", span);
            }
        }
    }

    /// Collect list items until End(List). Nested lists are flattened in place.
    fn collect_list(&mut self, events: &[Spanned<'_>], i: &mut usize) -> Vec<String> {
        let mut items = Vec::new();

        while *i < events.len() {
            match &events[*i].0 {
                Event::End(TagEnd::List(_)) => {
                    *i += 1;
                    break;
                }
                Event::Start(Tag::Item) => {
                    *i += 1;
                    self.collect_item(events, i, &mut items);
                }
                _ => {
                    *i += 1;
                }
            }
        }

        items
    }

    /// Collect one list item until End(Item). The item's own text is reserved
    /// a slot first so that flattened nested items follow it.
    fn collect_item(&mut self, events: &[Spanned<'_>], i: &mut usize, items: &mut Vec<String>) {
        let slot = items.len();
        items.push(String::new());
        let mut parts: Vec<String> = Vec::new();

        while *i < events.len() {
            let (ref ev, ref range) = events[*i];
            match ev {
                Event::End(TagEnd::Item) => {
                    *i += 1;
                    break;
                }
                // Loose lists wrap item text in paragraphs
                Event::Start(Tag::Paragraph) => {
                    *i += 1;
                    let inlines = collect_inlines(events, i, &|e| matches!(e, TagEnd::Paragraph));
                    parts.push(inline::to_markdown(&inlines));
                }
                Event::Start(Tag::List(_)) => {
                    self.warn("nested list flattened into its parent list", range.clone());
                    *i += 1;
                    let nested = self.collect_list(events, i);
                    items.extend(nested);
                }
                Event::Start(tag) if !is_inline_tag(tag) => {
                    self.warn(
                        format!("{} inside a list item is not supported; skipped", block_name(tag)),
                        range.clone(),
                    );
                    skip_block(events, i);
                }
                Event::End(_) => {
                    *i += 1;
                }
                _ => {
                    let inlines = collect_inlines(events, i, &|_| false);
                    if !inlines.is_empty() {
                        parts.push(inline::to_markdown(&inlines));
                    }
                }
            }
        }

        items[slot] = parts.join(" ").trim().to_string();
    }

    fn finalize(mut self) -> Result<(Outline, Vec<ParseError>), Vec<ParseError>> {
        if let Some((_, annotation)) = self.pending_id.take() {
            self.warn("id annotation is not followed by a component", annotation);
        }

        if self.diagnostics.iter().any(ParseError::is_error) {
            return Err(self.diagnostics);
        }

        let outline = Outline {
            sections: self.sections,
            source_id: self.file_id,
            spans: self.spans,
        };
        Ok((outline, self.diagnostics))
    }
}

// ---------------------------------------------------------------------------
// Helpers
// ---------------------------------------------------------------------------

fn is_inline_tag(tag: &Tag<'_>) -> bool {
    matches!(
        tag,
        Tag::Emphasis | Tag::Strong | Tag::Strikethrough | Tag::Link { .. } | Tag::Image { .. }
    )
}

fn block_name(tag: &Tag<'_>) -> &'static str {
    match tag {
        Tag::CodeBlock(_) => "code block",
        Tag::Table(_) => "table",
        Tag::BlockQuote(_) => "block quote",
        Tag::HtmlBlock => "raw HTML",
        Tag::Heading { .. } => "heading",
        Tag::FootnoteDefinition(_) => "footnote",
        _ => "block",
    }
}

/// A paragraph holding nothing but one image is an image component.
fn paragraph_body(inlines: Vec<InlineNode>) -> ComponentBody {
    let mut visible = inlines.iter().filter(|n| !n.is_blank());
    if let (Some(InlineNode::Image { dest, alt, .. }), None) = (visible.next(), visible.next()) {
        return ComponentBody::Image {
            url: dest.clone(),
            alt: inline::to_markdown(alt),
        };
    }
    ComponentBody::Text(inline::to_markdown(&inlines).trim().to_string())
}

/// Collect inline nodes until a matching End tag, which is consumed.
/// Stops without consuming at any other End tag or at the start of a block.
fn collect_inlines(
    events: &[Spanned<'_>],
    i: &mut usize,
    is_end: &dyn Fn(&TagEnd) -> bool,
) -> Vec<InlineNode> {
    let mut inlines = Vec::new();

    while *i < events.len() {
        let (ref ev, _) = events[*i];
        match ev {
            Event::End(tag_end) if is_end(tag_end) => {
                *i += 1;
                break;
            }
            Event::End(_) => break,
            Event::Start(tag) if !is_inline_tag(tag) => break,
            // Escaped characters arrive as separate events; keep runs whole
            Event::Text(s) => {
                match inlines.last_mut() {
                    Some(InlineNode::Text(run)) => run.push_str(s),
                    _ => inlines.push(InlineNode::Text(s.to_string())),
                }
                *i += 1;
            }
            Event::Code(s) => {
                inlines.push(InlineNode::CodeSpan(s.to_string()));
                *i += 1;
            }
            Event::InlineHtml(s) => {
                inlines.push(InlineNode::Html(s.to_string()));
                *i += 1;
            }
            Event::SoftBreak => {
                inlines.push(InlineNode::SoftBreak);
                *i += 1;
            }
            Event::HardBreak => {
                inlines.push(InlineNode::HardBreak);
                *i += 1;
            }
            Event::Start(Tag::Strong) => {
                *i += 1;
                let children = collect_inlines(events, i, &|e| matches!(e, TagEnd::Strong));
                inlines.push(InlineNode::Strong(children));
            }
            Event::Start(Tag::Emphasis) => {
                *i += 1;
                let children = collect_inlines(events, i, &|e| matches!(e, TagEnd::Emphasis));
                inlines.push(InlineNode::Emphasis(children));
            }
            Event::Start(Tag::Strikethrough) => {
                *i += 1;
                let children = collect_inlines(events, i, &|e| matches!(e, TagEnd::Strikethrough));
                inlines.push(InlineNode::Strikethrough(children));
            }
            Event::Start(Tag::Link { dest_url, title, .. }) => {
                let dest = dest_url.to_string();
                let title = title.to_string();
                *i += 1;
                let content = collect_inlines(events, i, &|e| matches!(e, TagEnd::Link));
                inlines.push(InlineNode::Link { dest, title, content });
            }
            Event::Start(Tag::Image { dest_url, title, .. }) => {
                let dest = dest_url.to_string();
                let title = title.to_string();
                *i += 1;
                let alt = collect_inlines(events, i, &|e| matches!(e, TagEnd::Image));
                inlines.push(InlineNode::Image { dest, title, alt });
            }
            _ => {
                *i += 1;
            }
        }
    }

    inlines
}

/// Skip a whole block starting at its Start event.
fn skip_block(events: &[Spanned<'_>], i: &mut usize) {
    let mut depth = 0usize;
    while *i < events.len() {
        match events[*i].0 {
            Event::Start(_) => depth += 1,
            Event::End(_) => depth = depth.saturating_sub(1),
            _ => {}
        }
        *i += 1;
        if depth == 0 {
            break;
        }
    }
}

/// Collect heading text (all Text and Code events until End(Heading)).
fn collect_heading_text(events: &[Spanned<'_>], i: &mut usize) -> String {
    let mut title = String::new();
    while *i < events.len() {
        match &events[*i].0 {
            Event::End(TagEnd::Heading(_)) => {
                *i += 1;
                break;
            }
            Event::Text(s) | Event::Code(s) => {
                title.push_str(s);
                *i += 1;
            }
            Event::SoftBreak | Event::HardBreak => {
                title.push(' ');
                *i += 1;
            }
            _ => {
                *i += 1;
            }
        }
    }
    title
}

fn collect_html(events: &[Spanned<'_>], i: &mut usize) -> String {
    let mut html = String::new();
    while *i < events.len() {
        match &events[*i].0 {
            Event::End(TagEnd::HtmlBlock) => {
                *i += 1;
                break;
            }
            Event::Html(s) => {
                html.push_str(s);
                *i += 1;
            }
            _ => {
                *i += 1;
            }
        }
    }
    html
}

/// Strip leading/trailing whitespace, collapse interior whitespace.
fn normalize_title(title: &str) -> String {
    title.split_whitespace().collect::<Vec<_>>().join(" ")
}

/// Whether `id` survives a trip through a `{#id}` heading attribute.
pub fn fits_heading_id(id: &str) -> bool {
    !id.is_empty()
        && !id
            .chars()
            .any(|c| c.is_ascii_whitespace() || matches!(c, '{' | '}' | '<' | '>' | '\\'))
}

/// Whether `id` survives a trip through an `<!-- id: NAME -->` annotation.
pub fn fits_id_annotation(id: &str) -> bool {
    !id.is_empty() && id.trim() == id && !id.contains("-->") && !id.contains(['\n', '\r'])
}

/// `<!-- id: NAME -->` → `Some("NAME")`; any other HTML → `None`.
fn parse_id_annotation(html: &str) -> Option<String> {
    let inner = html.trim().strip_prefix("<!--")?.strip_suffix("-->")?.trim();
    let id = inner.strip_prefix("id:")?.trim();
    Some(id.to_string())
}

/// Lowercase ASCII alphanumerics; every other run becomes a single `-`.
pub(crate) fn slugify(title: &str) -> String {
    let mut slug = String::with_capacity(title.len());
    for c in title.chars() {
        if c.is_ascii_alphanumeric() {
            slug.push(c.to_ascii_lowercase());
        } else if !slug.ends_with('-') && !slug.is_empty() {
            slug.push('-');
        }
    }
    let slug = slug.trim_end_matches('-');
    if slug.is_empty() {
        "section".to_string()
    } else {
        slug.to_string()
    }
}

fn unique_slug(title: &str, used: &HashSet<String>) -> String {
    let base = slugify(title);
    if !used.contains(&base) {
        return base;
    }
    (2..)
        .map(|n| format!("{}-{}", base, n))
        .find(|candidate| !used.contains(candidate))
        .unwrap_or(base)
}
