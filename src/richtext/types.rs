use serde::{Deserialize, Serialize};

use crate::cms::ImageRef;

/// A block-based rich-text document as stored by the CMS.
pub type RichText = Vec<Node>;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "_type")]
pub enum Node {
    #[serde(rename = "block")]
    Block(Block),
    #[serde(rename = "image")]
    Image(ImageRef),
    #[serde(other)]
    Unknown,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Block {
    #[serde(rename = "_key", default, skip_serializing_if = "Option::is_none")]
    pub key: Option<String>,
    #[serde(default = "default_style")]
    pub style: String,
    #[serde(default)]
    pub children: Vec<Span>,
    #[serde(rename = "markDefs", default)]
    pub mark_defs: Vec<MarkDef>,
    #[serde(rename = "listItem", default, skip_serializing_if = "Option::is_none")]
    pub list_item: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub level: Option<u32>,
}

fn default_style() -> String {
    "normal".to_string()
}

impl Default for Block {
    fn default() -> Self {
        Self {
            key: None,
            style: default_style(),
            children: Vec::new(),
            mark_defs: Vec::new(),
            list_item: None,
            level: None,
        }
    }
}

impl Block {
    pub fn plain_text(&self) -> String {
        self.children.iter().map(|span| span.text.as_str()).collect()
    }

    /// Heading level for `h1`..`h6` styles.
    pub fn heading_level(&self) -> Option<u8> {
        let level = self.style.strip_prefix('h')?.parse::<u8>().ok()?;
        (1..=6).contains(&level).then_some(level)
    }

    pub fn mark_def(&self, key: &str) -> Option<&MarkDef> {
        self.mark_defs.iter().find(|def| def.key == key)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Span {
    #[serde(rename = "_type", default = "default_span_type")]
    pub kind: String,
    #[serde(default)]
    pub text: String,
    #[serde(default)]
    pub marks: Vec<String>,
}

fn default_span_type() -> String {
    "span".to_string()
}

impl Span {
    pub fn text(text: impl Into<String>) -> Self {
        Self {
            kind: default_span_type(),
            text: text.into(),
            marks: Vec::new(),
        }
    }

    pub fn marked(text: impl Into<String>, marks: &[&str]) -> Self {
        Self {
            marks: marks.iter().map(|m| m.to_string()).collect(),
            ..Self::text(text)
        }
    }
}

/// Annotation referenced from span marks by key, e.g. a link.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MarkDef {
    #[serde(rename = "_key")]
    pub key: String,
    #[serde(rename = "_type")]
    pub kind: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub href: Option<String>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_deserialize_mixed_document() {
        let json = r#"[
            {"_type": "block", "_key": "k1", "style": "h2", "children": [{"_type": "span", "text": "Intro", "marks": []}], "markDefs": []},
            {"_type": "image", "_key": "k2", "asset": {"_ref": "image-a-1x1-png", "_type": "reference"}, "alt": "diagram"},
            {"_type": "code", "_key": "k3", "code": "fn main() {}"},
            {"_type": "block", "children": [{"text": "no style"}]}
        ]"#;

        let doc: RichText = serde_json::from_str(json).unwrap();
        assert_eq!(doc.len(), 4);

        match &doc[0] {
            Node::Block(block) => {
                assert_eq!(block.heading_level(), Some(2));
                assert_eq!(block.plain_text(), "Intro");
            }
            other => panic!("expected block, got {:?}", other),
        }
        match &doc[1] {
            Node::Image(image) => assert_eq!(image.alt.as_deref(), Some("diagram")),
            other => panic!("expected image, got {:?}", other),
        }
        assert_eq!(doc[2], Node::Unknown);
        match &doc[3] {
            Node::Block(block) => {
                assert_eq!(block.style, "normal");
                assert_eq!(block.children[0].kind, "span");
            }
            other => panic!("expected block, got {:?}", other),
        }
    }

    #[test]
    fn test_heading_level_bounds() {
        let mut block = Block {
            key: None,
            style: "h7".to_string(),
            children: Vec::new(),
            mark_defs: Vec::new(),
            list_item: None,
            level: None,
        };
        assert_eq!(block.heading_level(), None);
        block.style = "blockquote".to_string();
        assert_eq!(block.heading_level(), None);
        block.style = "h6".to_string();
        assert_eq!(block.heading_level(), Some(6));
    }
}
