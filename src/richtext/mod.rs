pub mod render;
pub mod types;

pub use render::{RichTextRenderer, TocEntry, anchor_id, escape, plain_text, table_of_contents};
pub use types::{Block, MarkDef, Node, RichText, Span};
