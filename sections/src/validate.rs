//! Shape-conformance checks over a loaded outline.
//!
//! The type system already rules out mismatched bodies (an image always has
//! a URL, a text is always one string). What is left are value-level
//! properties: ids present and unique, nothing blank.

use std::collections::HashMap;

use codespan_reporting::diagnostic::{Diagnostic, Label, Severity};
use thiserror::Error;

use crate::component::{ComponentBody, ContentComponent};
use crate::outline::{Location, Outline};
use crate::parser::{fits_heading_id, fits_id_annotation};
use crate::section::Section;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum IssueKind {
    #[error("section id is empty")]
    EmptySectionId,
    #[error("duplicate section id '{0}'")]
    DuplicateSectionId(String),
    #[error("section id '{0}' cannot be written as a Markdown heading id")]
    SectionIdNotMarkdown(String),
    #[error("component id '{0}' cannot be written as a Markdown id annotation")]
    ComponentIdNotMarkdown(String),
    #[error("section '{0}' has an empty title")]
    EmptyTitle(String),
    #[error("section '{0}' has no components")]
    EmptySection(String),
    #[error("component id is empty")]
    EmptyComponentId,
    #[error("duplicate component id '{0}'")]
    DuplicateComponentId(String),
    #[error("image '{0}' has an empty URL")]
    EmptyImageUrl(String),
    #[error("image '{id}' URL contains whitespace: '{url}'")]
    ImageUrlWhitespace { id: String, url: String },
    #[error("text '{0}' is blank")]
    BlankText(String),
    #[error("list '{0}' has no items")]
    EmptyList(String),
    #[error("list '{id}' item {index} is blank")]
    BlankListItem { id: String, index: usize },
}

impl IssueKind {
    pub fn severity(&self) -> Severity {
        match self {
            IssueKind::EmptySectionId
            | IssueKind::DuplicateSectionId(_)
            | IssueKind::EmptyComponentId
            | IssueKind::DuplicateComponentId(_)
            | IssueKind::EmptyImageUrl(_)
            | IssueKind::ImageUrlWhitespace { .. } => Severity::Error,
            IssueKind::SectionIdNotMarkdown(_)
            | IssueKind::ComponentIdNotMarkdown(_)
            | IssueKind::EmptyTitle(_)
            | IssueKind::EmptySection(_)
            | IssueKind::BlankText(_)
            | IssueKind::EmptyList(_)
            | IssueKind::BlankListItem { .. } => Severity::Warning,
        }
    }
}

/// A finding at a location, optionally pointing back at a related one
/// (the first definition of a duplicated id).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Issue {
    pub kind: IssueKind,
    pub location: Location,
    pub related: Option<Location>,
}

impl Issue {
    fn at(kind: IssueKind, location: Location) -> Self {
        Issue {
            kind,
            location,
            related: None,
        }
    }

    pub fn severity(&self) -> Severity {
        self.kind.severity()
    }

    pub fn is_error(&self) -> bool {
        self.severity() >= Severity::Error
    }

    /// Convert to a codespan-reporting Diagnostic. Locations without a
    /// recorded span are named in a note instead of a label.
    pub fn to_diagnostic(&self, outline: &Outline) -> Diagnostic<usize> {
        let mut labels = Vec::new();
        let mut notes = Vec::new();

        match outline.spans.get(self.location) {
            Some(span) => labels.push(Label::primary(outline.source_id, span)),
            None => notes.push(format!("at {}", outline.describe(self.location))),
        }

        if let Some(related) = self.related {
            match outline.spans.get(related) {
                Some(span) => labels.push(
                    Label::secondary(outline.source_id, span).with_message("first defined here"),
                ),
                None => notes.push(format!("first defined at {}", outline.describe(related))),
            }
        }

        Diagnostic::new(self.severity())
            .with_message(self.kind.to_string())
            .with_labels(labels)
            .with_notes(notes)
    }
}

impl std::fmt::Display for Issue {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        self.kind.fmt(f)
    }
}

/// Check every section of an outline, plus section id uniqueness across it.
pub fn validate(outline: &Outline) -> Vec<Issue> {
    let mut issues = Vec::new();
    let mut first_seen: HashMap<&str, usize> = HashMap::new();

    for (index, section) in outline.iter().enumerate() {
        if !section.id.is_empty() {
            if let Some(&first) = first_seen.get(section.id.as_str()) {
                issues.push(Issue {
                    kind: IssueKind::DuplicateSectionId(section.id.clone()),
                    location: Location::section(index),
                    related: Some(Location::section(first)),
                });
            } else {
                first_seen.insert(&section.id, index);
            }
        }
        issues.extend(validate_section(section, index));
    }

    tracing::debug!(
        issues = issues.len(),
        errors = issues.iter().filter(|i| i.is_error()).count(),
        "validated outline"
    );
    issues
}

/// Checks local to one section; `index` is its position in the outline.
pub fn validate_section(section: &Section, index: usize) -> Vec<Issue> {
    let here = Location::section(index);
    let mut issues = Vec::new();

    if section.id.is_empty() {
        issues.push(Issue::at(IssueKind::EmptySectionId, here));
    } else if !fits_heading_id(&section.id) {
        issues.push(Issue::at(IssueKind::SectionIdNotMarkdown(section.id.clone()), here));
    }
    if section.title.trim().is_empty() {
        issues.push(Issue::at(IssueKind::EmptyTitle(section.id.clone()), here));
    }
    if section.is_empty() {
        issues.push(Issue::at(IssueKind::EmptySection(section.id.clone()), here));
    }

    let mut first_seen: HashMap<&str, usize> = HashMap::new();
    for (position, component) in section.components.iter().enumerate() {
        let location = Location::component(index, position);

        if component.id.is_empty() {
            issues.push(Issue::at(IssueKind::EmptyComponentId, location));
        } else if let Some(&first) = first_seen.get(component.id.as_str()) {
            issues.push(Issue {
                kind: IssueKind::DuplicateComponentId(component.id.clone()),
                location,
                related: Some(Location::component(index, first)),
            });
        } else {
            first_seen.insert(&component.id, position);
        }
        if !component.id.is_empty() && !fits_id_annotation(&component.id) {
            issues.push(Issue::at(IssueKind::ComponentIdNotMarkdown(component.id.clone()), location));
        }

        issues.extend(
            body_issues(component)
                .into_iter()
                .map(|kind| Issue::at(kind, location)),
        );
    }

    issues
}

fn body_issues(component: &ContentComponent) -> Vec<IssueKind> {
    let id = || component.id.clone();
    match &component.body {
        ComponentBody::Text(text) if text.trim().is_empty() => vec![IssueKind::BlankText(id())],
        ComponentBody::Text(_) => Vec::new(),
        ComponentBody::List(items) if items.is_empty() => vec![IssueKind::EmptyList(id())],
        ComponentBody::List(items) => items
            .iter()
            .enumerate()
            .filter(|(_, item)| item.trim().is_empty())
            .map(|(n, _)| IssueKind::BlankListItem { id: id(), index: n + 1 })
            .collect(),
        ComponentBody::Image { url, .. } if url.trim().is_empty() => vec![IssueKind::EmptyImageUrl(id())],
        ComponentBody::Image { url, .. } if url.chars().any(char::is_whitespace) => {
            vec![IssueKind::ImageUrlWhitespace {
                id: id(),
                url: url.clone(),
            }]
        }
        ComponentBody::Image { .. } => Vec::new(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn kinds(issues: &[Issue]) -> Vec<IssueKind> {
        issues.iter().map(|i| i.kind.clone()).collect()
    }

    #[test]
    fn clean_outline_has_no_issues() {
        let outline = Outline::new(
            vec![
                Section::new("a", "A")
                    .with_component(ContentComponent::text("a-1", "Hello"))
                    .with_component(ContentComponent::list("a-2", ["x", "y"]))
                    .with_component(ContentComponent::image("a-3", "https://example.com/p.png", "")),
            ],
            0,
        );
        assert!(validate(&outline).is_empty());
    }

    #[test]
    fn duplicate_section_ids_point_at_first() {
        let outline = Outline::new(
            vec![
                Section::new("a", "A").with_component(ContentComponent::text("1", "x")),
                Section::new("b", "B").with_component(ContentComponent::text("1", "x")),
                Section::new("a", "Again").with_component(ContentComponent::text("1", "x")),
            ],
            0,
        );
        let issues = validate(&outline);
        assert_eq!(issues.len(), 1);
        assert_eq!(issues[0].kind, IssueKind::DuplicateSectionId("a".into()));
        assert_eq!(issues[0].location, Location::section(2));
        assert_eq!(issues[0].related, Some(Location::section(0)));
        assert!(issues[0].is_error());
    }

    #[test]
    fn component_ids_are_scoped_to_their_section() {
        let section = Section::new("s", "S")
            .with_component(ContentComponent::text("p", "one"))
            .with_component(ContentComponent::text("q", "two"))
            .with_component(ContentComponent::text("p", "three"));
        let issues = validate_section(&section, 4);
        assert_eq!(kinds(&issues), [IssueKind::DuplicateComponentId("p".into())]);
        assert_eq!(issues[0].location, Location::component(4, 2));
        assert_eq!(issues[0].related, Some(Location::component(4, 0)));
    }

    #[test]
    fn empty_ids_are_errors() {
        let section = Section::new("", "Untitled id").with_component(ContentComponent::text("", "x"));
        let issues = validate_section(&section, 0);
        assert_eq!(kinds(&issues), [IssueKind::EmptySectionId, IssueKind::EmptyComponentId]);
        assert!(issues.iter().all(Issue::is_error));
    }

    #[test]
    fn blank_content_warns() {
        let section = Section::new("s", "  ")
            .with_component(ContentComponent::text("t", " \n"))
            .with_component(ContentComponent::list("l", Vec::<String>::new()))
            .with_component(ContentComponent::list("m", ["ok", "", "fine", " "]));
        let issues = validate_section(&section, 0);
        assert_eq!(
            kinds(&issues),
            [
                IssueKind::EmptyTitle("s".into()),
                IssueKind::BlankText("t".into()),
                IssueKind::EmptyList("l".into()),
                IssueKind::BlankListItem { id: "m".into(), index: 2 },
                IssueKind::BlankListItem { id: "m".into(), index: 4 },
            ]
        );
        assert!(issues.iter().all(|i| !i.is_error()));
    }

    #[test]
    fn ids_markdown_cannot_carry_warn() {
        let section = Section::new("my id", "S")
            .with_component(ContentComponent::text("a-->b", "x"))
            .with_component(ContentComponent::text("fine id", "y"));
        let issues = validate_section(&section, 0);
        assert_eq!(
            kinds(&issues),
            [
                IssueKind::SectionIdNotMarkdown("my id".into()),
                IssueKind::ComponentIdNotMarkdown("a-->b".into()),
            ]
        );
        assert!(issues.iter().all(|i| !i.is_error()));
    }

    #[test]
    fn empty_section_warns() {
        let issues = validate_section(&Section::new("s", "S"), 0);
        assert_eq!(kinds(&issues), [IssueKind::EmptySection("s".into())]);
        assert_eq!(issues[0].severity(), Severity::Warning);
    }

    #[test]
    fn image_urls_are_checked() {
        let section = Section::new("s", "S")
            .with_component(ContentComponent::image("a", "", "alt"))
            .with_component(ContentComponent::image("b", "my photo.png", "alt"));
        let issues = validate_section(&section, 0);
        assert_eq!(
            kinds(&issues),
            [
                IssueKind::EmptyImageUrl("a".into()),
                IssueKind::ImageUrlWhitespace {
                    id: "b".into(),
                    url: "my photo.png".into()
                },
            ]
        );
    }

    #[test]
    fn diagnostic_without_spans_uses_notes() {
        let outline = Outline::new(
            vec![Section::new("s", "S")
                .with_component(ContentComponent::text("x", "a"))
                .with_component(ContentComponent::text("x", "b"))],
            7,
        );
        let issue = &validate(&outline)[0];
        let diagnostic = issue.to_diagnostic(&outline);
        assert_eq!(diagnostic.message, "duplicate component id 'x'");
        assert!(diagnostic.labels.is_empty());
        assert_eq!(
            diagnostic.notes,
            ["at section 's', component 2", "first defined at section 's', component 1"]
        );
    }

    #[test]
    fn diagnostic_with_spans_uses_labels() {
        let (outline, _) = crate::parser::Parser::new(
            "# S\n\n<!-- id: x -->\nOne.\n\n<!-- id: x -->\nTwo.\n".to_string(),
            2,
            crate::Format::Markdown,
        )
        .parse()
        .unwrap();
        let issue = &validate(&outline)[0];
        let diagnostic = issue.to_diagnostic(&outline);
        assert_eq!(diagnostic.labels.len(), 2);
        assert!(diagnostic.labels.iter().all(|l| l.file_id == 2));
        assert!(diagnostic.notes.is_empty());
    }
}
