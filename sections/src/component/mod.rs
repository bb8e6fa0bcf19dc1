pub mod wire;

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::component::wire::RawComponent;

/// The discriminator tag identifying which kind of content a component holds.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ComponentType {
    Text,
    List,
    Image,
}

impl ComponentType {
    pub const ALL: [ComponentType; 3] = [ComponentType::Text, ComponentType::List, ComponentType::Image];

    pub fn as_str(&self) -> &'static str {
        match self {
            ComponentType::Text => "text",
            ComponentType::List => "list",
            ComponentType::Image => "image",
        }
    }
}

impl fmt::Display for ComponentType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("unknown component type '{0}' (expected text, list or image)")]
pub struct UnknownComponentType(pub String);

impl FromStr for ComponentType {
    type Err = UnknownComponentType;

    /// Case-insensitive; surrounding whitespace is ignored.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let wanted = s.trim();
        ComponentType::ALL
            .into_iter()
            .find(|t| t.as_str().eq_ignore_ascii_case(wanted))
            .ok_or_else(|| UnknownComponentType(s.to_string()))
    }
}

/// One unit of content within a section.
///
/// On the wire a component is the loose `{id, type, content, imageUrl?}`
/// record; in memory the body is a tagged variant, so a text component can
/// never carry an image URL and an image can never lack one.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "RawComponent", into = "RawComponent")]
pub struct ContentComponent {
    pub id: String,
    pub body: ComponentBody,
}

/// The typed content of a component.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ComponentBody {
    /// A block of text. Inline Markdown markup is kept verbatim.
    Text(String),
    /// An ordered list of items.
    List(Vec<String>),
    /// An image; `alt` is the wire `content` string and may be empty.
    Image { url: String, alt: String },
}

impl ComponentBody {
    pub fn component_type(&self) -> ComponentType {
        match self {
            ComponentBody::Text(_) => ComponentType::Text,
            ComponentBody::List(_) => ComponentType::List,
            ComponentBody::Image { .. } => ComponentType::Image,
        }
    }
}

/// Borrowed view of a component's `content` field as it appears on the wire.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ContentRef<'a> {
    Single(&'a str),
    Many(&'a [String]),
}

impl ContentComponent {
    pub fn text(id: impl Into<String>, text: impl Into<String>) -> Self {
        ContentComponent {
            id: id.into(),
            body: ComponentBody::Text(text.into()),
        }
    }

    pub fn list<I, S>(id: impl Into<String>, items: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        ContentComponent {
            id: id.into(),
            body: ComponentBody::List(items.into_iter().map(Into::into).collect()),
        }
    }

    pub fn image(id: impl Into<String>, url: impl Into<String>, alt: impl Into<String>) -> Self {
        ContentComponent {
            id: id.into(),
            body: ComponentBody::Image {
                url: url.into(),
                alt: alt.into(),
            },
        }
    }

    pub fn id(&self) -> &str {
        &self.id
    }

    pub fn component_type(&self) -> ComponentType {
        self.body.component_type()
    }

    pub fn body(&self) -> &ComponentBody {
        &self.body
    }

    pub fn content(&self) -> ContentRef<'_> {
        match &self.body {
            ComponentBody::Text(text) => ContentRef::Single(text),
            ComponentBody::List(items) => ContentRef::Many(items),
            ComponentBody::Image { alt, .. } => ContentRef::Single(alt),
        }
    }

    pub fn image_url(&self) -> Option<&str> {
        match &self.body {
            ComponentBody::Image { url, .. } => Some(url),
            _ => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn component_type_parses_case_insensitively() {
        assert_eq!("text".parse::<ComponentType>(), Ok(ComponentType::Text));
        assert_eq!(" LIST ".parse::<ComponentType>(), Ok(ComponentType::List));
        assert_eq!("Image".parse::<ComponentType>(), Ok(ComponentType::Image));
        assert!("video".parse::<ComponentType>().is_err());
    }

    #[test]
    fn component_type_displays_lowercase() {
        let names: Vec<String> = ComponentType::ALL.iter().map(|t| t.to_string()).collect();
        assert_eq!(names, ["text", "list", "image"]);
    }

    #[test]
    fn type_follows_body() {
        assert_eq!(ContentComponent::text("a", "x").component_type(), ComponentType::Text);
        assert_eq!(ContentComponent::list("b", ["x"]).component_type(), ComponentType::List);
        assert_eq!(
            ContentComponent::image("c", "cat.png", "").component_type(),
            ComponentType::Image
        );
    }

    #[test]
    fn content_view_matches_wire_field() {
        let list = ContentComponent::list("l", ["one", "two"]);
        assert_eq!(list.content(), ContentRef::Many(&["one".to_string(), "two".to_string()]));
        assert_eq!(list.image_url(), None);

        let image = ContentComponent::image("i", "https://example.com/a.png", "A cat");
        assert_eq!(image.content(), ContentRef::Single("A cat"));
        assert_eq!(image.image_url(), Some("https://example.com/a.png"));
    }
}
