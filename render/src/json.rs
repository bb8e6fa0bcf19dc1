use std::io::Write;

use sections::Outline;

use crate::error::RenderError;

/// Pretty JSON in the wire shape. A single section is written as an object,
/// anything else as an array, so the output loads back as the same outline.
pub fn write_outline(outline: &Outline, out: &mut dyn Write) -> Result<(), RenderError> {
    match outline.sections.as_slice() {
        [single] => serde_json::to_writer_pretty(&mut *out, single)?,
        sections => serde_json::to_writer_pretty(&mut *out, sections)?,
    }
    writeln!(out)?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use sections::{ContentComponent, Section};

    use super::*;

    fn render(outline: &Outline) -> String {
        let mut buf = Vec::new();
        write_outline(outline, &mut buf).unwrap();
        String::from_utf8(buf).unwrap()
    }

    #[test]
    fn single_section_is_an_object() {
        let outline = Outline::new(
            vec![Section::new("a", "A").with_component(ContentComponent::image("p", "p.png", "P"))],
            0,
        );
        let value: serde_json::Value = serde_json::from_str(&render(&outline)).unwrap();
        assert_eq!(value["id"], "a");
        assert_eq!(value["components"][0]["imageUrl"], "p.png");
        assert_eq!(value["components"][0]["type"], "image");
    }

    #[test]
    fn many_or_no_sections_are_an_array() {
        let outline = Outline::new(vec![Section::new("a", "A"), Section::new("b", "B")], 0);
        let value: serde_json::Value = serde_json::from_str(&render(&outline)).unwrap();
        assert_eq!(value.as_array().map(Vec::len), Some(2));

        assert_eq!(render(&Outline::new(Vec::new(), 0)).trim(), "[]");
    }
}
