//! The loose wire shape of a component and its conversion to the typed form.

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::component::{ComponentBody, ComponentType, ContentComponent};

/// `content` on the wire: one string or an ordered sequence of strings.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Content {
    Single(String),
    Many(Vec<String>),
}

/// A component exactly as it is written in JSON or TOML.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
pub struct RawComponent {
    pub id: String,
    #[serde(rename = "type")]
    pub kind: ComponentType,
    pub content: Content,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub image_url: Option<String>,
}

/// A wire component whose fields do not pair up into a valid body.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ShapeError {
    #[error("component '{id}': text content must be a single string")]
    TextExpectsString { id: String },
    #[error("component '{id}': image content must be a single string (the alt text)")]
    ImageExpectsString { id: String },
    #[error("component '{id}': image component requires an imageUrl")]
    MissingImageUrl { id: String },
    #[error("component '{id}': imageUrl is only allowed on image components, found on {kind}")]
    UnexpectedImageUrl { id: String, kind: ComponentType },
}

impl TryFrom<RawComponent> for ContentComponent {
    type Error = ShapeError;

    fn try_from(raw: RawComponent) -> Result<Self, Self::Error> {
        let RawComponent {
            id,
            kind,
            content,
            image_url,
        } = raw;

        let body = match (kind, content, image_url) {
            (ComponentType::Image, Content::Single(alt), Some(url)) => ComponentBody::Image { url, alt },
            (ComponentType::Image, Content::Many(_), _) => return Err(ShapeError::ImageExpectsString { id }),
            (ComponentType::Image, _, None) => return Err(ShapeError::MissingImageUrl { id }),
            (kind, _, Some(_)) => return Err(ShapeError::UnexpectedImageUrl { id, kind }),
            (ComponentType::Text, Content::Single(text), None) => ComponentBody::Text(text),
            (ComponentType::Text, Content::Many(_), None) => return Err(ShapeError::TextExpectsString { id }),
            (ComponentType::List, Content::Many(items), None) => ComponentBody::List(items),
            // A lone string is a one-item list.
            (ComponentType::List, Content::Single(item), None) => ComponentBody::List(vec![item]),
        };

        Ok(ContentComponent { id, body })
    }
}

impl From<ContentComponent> for RawComponent {
    fn from(component: ContentComponent) -> Self {
        let kind = component.component_type();
        let (content, image_url) = match component.body {
            ComponentBody::Text(text) => (Content::Single(text), None),
            ComponentBody::List(items) => (Content::Many(items), None),
            ComponentBody::Image { url, alt } => (Content::Single(alt), Some(url)),
        };
        RawComponent {
            id: component.id,
            kind,
            content,
            image_url,
        }
    }
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;

    fn decode(value: serde_json::Value) -> Result<ContentComponent, String> {
        serde_json::from_value(value).map_err(|e| e.to_string())
    }

    #[test]
    fn text_with_string_content() {
        let c = decode(json!({"id": "t1", "type": "text", "content": "Hello"})).unwrap();
        assert_eq!(c, ContentComponent::text("t1", "Hello"));
    }

    #[test]
    fn list_with_sequence_content() {
        let c = decode(json!({"id": "l1", "type": "list", "content": ["a", "b"]})).unwrap();
        assert_eq!(c, ContentComponent::list("l1", ["a", "b"]));
    }

    #[test]
    fn list_with_single_string_becomes_one_item() {
        let c = decode(json!({"id": "l1", "type": "list", "content": "only"})).unwrap();
        assert_eq!(c, ContentComponent::list("l1", ["only"]));
    }

    #[test]
    fn image_uses_content_as_alt_text() {
        let c = decode(json!({
            "id": "i1",
            "type": "image",
            "content": "A lighthouse",
            "imageUrl": "https://example.com/lh.jpg"
        }))
        .unwrap();
        assert_eq!(c, ContentComponent::image("i1", "https://example.com/lh.jpg", "A lighthouse"));
    }

    #[test]
    fn invalid_pairings_are_rejected() {
        let err = decode(json!({"id": "t", "type": "text", "content": ["a"]})).unwrap_err();
        assert!(err.contains("text content must be a single string"), "{err}");

        let err = decode(json!({"id": "i", "type": "image", "content": "alt"})).unwrap_err();
        assert!(err.contains("requires an imageUrl"), "{err}");

        let err = decode(json!({"id": "i", "type": "image", "content": ["a"], "imageUrl": "x.png"}))
            .unwrap_err();
        assert!(err.contains("image content must be a single string"), "{err}");

        let err = decode(json!({"id": "t", "type": "text", "content": "a", "imageUrl": "x.png"}))
            .unwrap_err();
        assert!(err.contains("only allowed on image components, found on text"), "{err}");

        let err = decode(json!({"id": "l", "type": "list", "content": [], "imageUrl": "x.png"}))
            .unwrap_err();
        assert!(err.contains("found on list"), "{err}");
    }

    #[test]
    fn unknown_type_and_fields_are_rejected() {
        assert!(decode(json!({"id": "v", "type": "video", "content": "x"})).is_err());
        assert!(decode(json!({"id": "t", "type": "text", "content": "x", "style": "bold"})).is_err());
    }

    #[test]
    fn serializes_to_wire_shape() {
        let image = serde_json::to_value(ContentComponent::image("i", "a.png", "")).unwrap();
        assert_eq!(
            image,
            json!({"id": "i", "type": "image", "content": "", "imageUrl": "a.png"})
        );

        let text = serde_json::to_value(ContentComponent::text("t", "hi")).unwrap();
        assert_eq!(text, json!({"id": "t", "type": "text", "content": "hi"}));
    }
}
