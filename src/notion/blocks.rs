//! Notion block and rich-text model.
//!
//! Only the block types the publisher emits are modelled. Each type knows its
//! own JSON shape ([`Block::to_json`]); `Serialize` delegates to it so blocks
//! can be embedded directly in request bodies.

use serde::{Serialize, Serializer};
use serde_json::{json, Value};

/// Maximum characters in a single rich-text item.
pub const RICH_TEXT_LIMIT: usize = 2000;

/// Inline styling of a text run.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Annotations {
    pub bold: bool,
    pub italic: bool,
}

impl Annotations {
    pub const PLAIN: Annotations = Annotations {
        bold: false,
        italic: false,
    };
    pub const BOLD: Annotations = Annotations {
        bold: true,
        italic: false,
    };
    pub const ITALIC: Annotations = Annotations {
        bold: false,
        italic: true,
    };
    pub const BOLD_ITALIC: Annotations = Annotations {
        bold: true,
        italic: true,
    };
}

/// One inline run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RichText {
    Text {
        content: String,
        annotations: Annotations,
    },
    /// Inline LaTeX.
    Equation { expression: String },
}

impl RichText {
    pub fn plain(content: impl Into<String>) -> Self {
        RichText::Text {
            content: content.into(),
            annotations: Annotations::PLAIN,
        }
    }

    pub fn styled(content: impl Into<String>, annotations: Annotations) -> Self {
        RichText::Text {
            content: content.into(),
            annotations,
        }
    }

    pub fn equation(expression: impl Into<String>) -> Self {
        RichText::Equation {
            expression: expression.into(),
        }
    }

    fn to_json(&self) -> Value {
        match self {
            RichText::Text {
                content,
                annotations,
            } => {
                let mut item = json!({
                    "type": "text",
                    "text": { "content": content },
                });
                if *annotations != Annotations::PLAIN {
                    item["annotations"] = json!({
                        "bold": annotations.bold,
                        "italic": annotations.italic,
                    });
                }
                item
            }
            RichText::Equation { expression } => json!({
                "type": "equation",
                "equation": { "expression": expression },
            }),
        }
    }
}

/// Serialise runs, splitting text longer than [`RICH_TEXT_LIMIT`] characters
/// into consecutive runs with the same styling.
pub fn rich_text_json(runs: &[RichText]) -> Value {
    let mut items = Vec::with_capacity(runs.len());
    for run in runs {
        match run {
            RichText::Text {
                content,
                annotations,
            } => {
                for piece in split_chars(content, RICH_TEXT_LIMIT) {
                    items.push(RichText::styled(piece, *annotations).to_json());
                }
            }
            RichText::Equation { .. } => items.push(run.to_json()),
        }
    }
    Value::Array(items)
}

/// Split `s` into pieces of at most `limit` characters (not bytes).
pub fn split_chars(s: &str, limit: usize) -> Vec<&str> {
    if s.is_empty() || limit == 0 {
        return vec![s];
    }
    let mut pieces = Vec::new();
    let mut start = 0;
    let mut count = 0;
    for (idx, _) in s.char_indices() {
        if count == limit {
            pieces.push(&s[start..idx]);
            start = idx;
            count = 0;
        }
        count += 1;
    }
    pieces.push(&s[start..]);
    pieces
}

/// A body block.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Block {
    /// Level 1 to 3.
    Heading { level: u8, text: Vec<RichText> },
    Paragraph(Vec<RichText>),
    BulletedItem(Vec<RichText>),
    NumberedItem(Vec<RichText>),
    Callout { text: Vec<RichText>, emoji: String },
    /// Block-level LaTeX.
    Equation(String),
    Divider,
    TableOfContents,
}

impl Block {
    pub fn heading(level: u8, text: impl Into<String>) -> Self {
        Block::Heading {
            level: level.clamp(1, 3),
            text: vec![RichText::plain(text)],
        }
    }

    pub fn paragraph(text: impl Into<String>) -> Self {
        Block::Paragraph(vec![RichText::plain(text)])
    }

    /// Notion's `type` field for this block.
    pub fn kind(&self) -> &'static str {
        match self {
            Block::Heading { level: 1, .. } => "heading_1",
            Block::Heading { level: 2, .. } => "heading_2",
            Block::Heading { .. } => "heading_3",
            Block::Paragraph(_) => "paragraph",
            Block::BulletedItem(_) => "bulleted_list_item",
            Block::NumberedItem(_) => "numbered_list_item",
            Block::Callout { .. } => "callout",
            Block::Equation(_) => "equation",
            Block::Divider => "divider",
            Block::TableOfContents => "table_of_contents",
        }
    }

    pub fn to_json(&self) -> Value {
        let kind = self.kind();
        let body = match self {
            Block::Heading { text, .. }
            | Block::Paragraph(text)
            | Block::BulletedItem(text)
            | Block::NumberedItem(text) => json!({ "rich_text": rich_text_json(text) }),
            Block::Callout { text, emoji } => json!({
                "rich_text": rich_text_json(text),
                "icon": { "type": "emoji", "emoji": emoji },
            }),
            Block::Equation(expression) => json!({ "expression": expression }),
            Block::Divider | Block::TableOfContents => json!({}),
        };
        json!({
            "object": "block",
            "type": kind,
            kind: body,
        })
    }
}

impl Serialize for Block {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        self.to_json().serialize(serializer)
    }
}
