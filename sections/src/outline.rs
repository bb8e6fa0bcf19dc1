use std::collections::HashMap;
use std::ops::Range;

use crate::section::Section;

/// Position of a section, or of a component within it, in an outline.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct Location {
    pub section: usize,
    pub component: Option<usize>,
}

impl Location {
    pub fn section(section: usize) -> Self {
        Location {
            section,
            component: None,
        }
    }

    pub fn component(section: usize, component: usize) -> Self {
        Location {
            section,
            component: Some(component),
        }
    }
}

/// Byte spans of sections and components in the source they were loaded from.
/// Only Markdown input records spans.
#[derive(Debug, Clone, Default)]
pub struct SourceMap {
    spans: HashMap<Location, Range<usize>>,
}

impl SourceMap {
    pub fn insert(&mut self, location: Location, span: Range<usize>) {
        self.spans.insert(location, span);
    }

    pub fn get(&self, location: Location) -> Option<Range<usize>> {
        self.spans.get(&location).cloned()
    }

    pub fn is_empty(&self) -> bool {
        self.spans.is_empty()
    }
}

/// The sections loaded from one source file.
#[derive(Debug, Clone)]
pub struct Outline {
    pub sections: Vec<Section>,
    /// The source file ID (for error reporting with codespan-reporting).
    pub source_id: usize,
    pub spans: SourceMap,
}

impl Outline {
    pub fn new(sections: Vec<Section>, source_id: usize) -> Self {
        Outline {
            sections,
            source_id,
            spans: SourceMap::default(),
        }
    }

    pub fn section(&self, id: &str) -> Option<&Section> {
        self.sections.iter().find(|s| s.id == id)
    }

    pub fn iter(&self) -> std::slice::Iter<'_, Section> {
        self.sections.iter()
    }

    pub fn len(&self) -> usize {
        self.sections.len()
    }

    pub fn is_empty(&self) -> bool {
        self.sections.is_empty()
    }

    pub fn component_count(&self) -> usize {
        self.sections.iter().map(Section::len).sum()
    }

    /// Human-readable path to a location, e.g. `section 'intro', component 2`.
    pub fn describe(&self, location: Location) -> String {
        let section = match self.sections.get(location.section) {
            Some(s) if !s.id.is_empty() => format!("section '{}'", s.id),
            _ => format!("section {}", location.section + 1),
        };
        match location.component {
            Some(index) => format!("{}, component {}", section, index + 1),
            None => section,
        }
    }
}

impl<'a> IntoIterator for &'a Outline {
    type Item = &'a Section;
    type IntoIter = std::slice::Iter<'a, Section>;

    fn into_iter(self) -> Self::IntoIter {
        self.sections.iter()
    }
}
