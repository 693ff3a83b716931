use serde::Serialize;
use std::{
    borrow::Cow,
    collections::{HashMap, HashSet},
};
use tracing::debug;

use super::types::{Block, Node, Span};
use crate::cms::ImageUrlBuilder;

const BODY_IMAGE_WIDTH: u32 = 800;

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct TocEntry {
    pub id: String,
    pub text: String,
    pub level: u8,
    /// Left padding in pixels for nested entries.
    pub indent: u32,
}

/// Anchor id for heading text: lowercase ASCII alphanumerics joined by `-`.
pub fn anchor_id(text: &str) -> String {
    let mut id = String::with_capacity(text.len());
    let mut pending_dash = false;

    for c in text.chars().flat_map(char::to_lowercase) {
        if c.is_ascii_lowercase() || c.is_ascii_digit() {
            if pending_dash && !id.is_empty() {
                id.push('-');
            }
            pending_dash = false;
            id.push(c);
        } else {
            pending_dash = true;
        }
    }

    id
}

/// Hands out unique anchor ids in document order.
#[derive(Debug, Default)]
struct HeadingIds {
    used: HashSet<String>,
    /// Last suffix handed out per base id.
    suffixes: HashMap<String, usize>,
}

impl HeadingIds {
    fn next(&mut self, text: &str) -> String {
        let mut base = anchor_id(text);
        if base.is_empty() {
            base = "section".to_string();
        }

        if self.used.insert(base.clone()) {
            return base;
        }

        let suffix = self.suffixes.entry(base.clone()).or_insert(1);
        loop {
            *suffix += 1;
            let candidate = format!("{}-{}", base, suffix);
            if self.used.insert(candidate.clone()) {
                return candidate;
            }
        }
    }
}

fn is_heading(block: &Block) -> bool {
    block.list_item.is_none() && block.heading_level().is_some()
}

pub fn table_of_contents(nodes: &[Node]) -> Vec<TocEntry> {
    let mut ids = HeadingIds::default();

    nodes
        .iter()
        .filter_map(|node| match node {
            Node::Block(block) if is_heading(block) => Some(block),
            _ => None,
        })
        .filter_map(|block| {
            let level = block.heading_level()?;
            let text = block.plain_text();
            Some(TocEntry {
                id: ids.next(&text),
                text,
                level,
                indent: (u32::from(level) - 1) * 12,
            })
        })
        .collect()
}

pub fn plain_text(nodes: &[Node]) -> String {
    nodes
        .iter()
        .filter_map(|node| match node {
            Node::Block(block) => Some(block.plain_text()),
            _ => None,
        })
        .filter(|text| !text.trim().is_empty())
        .collect::<Vec<_>>()
        .join(" ")
}

pub fn escape(s: &str) -> Cow<'_, str> {
    if !s.contains(['<', '>', '&', '"', '\'']) {
        return Cow::Borrowed(s);
    }

    let mut result = String::with_capacity(s.len() + 8);
    for c in s.chars() {
        match c {
            '<' => result.push_str("&lt;"),
            '>' => result.push_str("&gt;"),
            '&' => result.push_str("&amp;"),
            '"' => result.push_str("&quot;"),
            '\'' => result.push_str("&#39;"),
            _ => result.push(c),
        }
    }
    Cow::Owned(result)
}

fn is_safe_href(href: &str) -> bool {
    let href = href.trim();
    if href.starts_with('/') || href.starts_with('#') {
        return true;
    }
    let lower = href.to_ascii_lowercase();
    lower.starts_with("http://") || lower.starts_with("https://") || lower.starts_with("mailto:")
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum ListKind {
    Bullet,
    Number,
}

impl ListKind {
    fn from_item(item: &str) -> Self {
        if item == "number" {
            ListKind::Number
        } else {
            ListKind::Bullet
        }
    }

    fn open_tag(self) -> &'static str {
        match self {
            ListKind::Bullet => "<ul>",
            ListKind::Number => "<ol>",
        }
    }

    fn close_tag(self) -> &'static str {
        match self {
            ListKind::Bullet => "</ul>",
            ListKind::Number => "</ol>",
        }
    }
}

/// Renders rich-text documents to HTML.
pub struct RichTextRenderer<'a> {
    images: &'a ImageUrlBuilder,
}

impl<'a> RichTextRenderer<'a> {
    pub fn new(images: &'a ImageUrlBuilder) -> Self {
        Self { images }
    }

    pub fn render(&self, nodes: &[Node]) -> String {
        let mut out = String::new();
        let mut ids = HeadingIds::default();
        let mut lists: Vec<(ListKind, u32)> = Vec::new();

        for node in nodes {
            match node {
                Node::Block(block) if block.list_item.is_some() => {
                    self.push_list_item(&mut out, &mut lists, block);
                }
                Node::Block(block) => {
                    close_lists(&mut out, &mut lists);
                    self.push_block(&mut out, &mut ids, block);
                }
                Node::Image(image) => {
                    close_lists(&mut out, &mut lists);
                    match self.images.url(image, Some(BODY_IMAGE_WIDTH), None) {
                        Some(src) => {
                            let alt = image.alt.as_deref().unwrap_or("Post image");
                            out.push_str(&format!(
                                r#"<figure class="post-image"><img src="{}" alt="{}" loading="lazy" /></figure>"#,
                                escape(&src),
                                escape(alt)
                            ));
                        }
                        None => debug!("Skipping image without a resolvable asset"),
                    }
                }
                Node::Unknown => {
                    close_lists(&mut out, &mut lists);
                    debug!("Skipping unsupported rich text node");
                }
            }
        }

        close_lists(&mut out, &mut lists);
        out
    }

    fn push_block(&self, out: &mut String, ids: &mut HeadingIds, block: &Block) {
        let inner = render_spans(block);

        if let Some(level) = block.heading_level() {
            let id = ids.next(&block.plain_text());
            out.push_str(&format!(r#"<h{level} id="{}">{inner}</h{level}>"#, escape(&id)));
        } else if block.style == "blockquote" {
            out.push_str(&format!("<blockquote>{}</blockquote>", inner));
        } else {
            out.push_str(&format!("<p>{}</p>", inner));
        }
    }

    fn push_list_item(&self, out: &mut String, lists: &mut Vec<(ListKind, u32)>, block: &Block) {
        let kind = ListKind::from_item(block.list_item.as_deref().unwrap_or("bullet"));
        let level = block.level.unwrap_or(1).max(1);

        while let Some(&(open_kind, open_level)) = lists.last() {
            if open_level > level || (open_level == level && open_kind != kind) {
                out.push_str("</li>");
                out.push_str(open_kind.close_tag());
                lists.pop();
            } else {
                break;
            }
        }

        match lists.last() {
            Some(&(_, open_level)) if open_level == level => out.push_str("</li>"),
            _ => {
                out.push_str(kind.open_tag());
                lists.push((kind, level));
            }
        }

        out.push_str("<li>");
        out.push_str(&render_spans(block));
    }
}

fn close_lists(out: &mut String, lists: &mut Vec<(ListKind, u32)>) {
    while let Some((kind, _)) = lists.pop() {
        out.push_str("</li>");
        out.push_str(kind.close_tag());
    }
}

fn render_spans(block: &Block) -> String {
    block
        .children
        .iter()
        .map(|span| render_span(block, span))
        .collect()
}

fn render_span(block: &Block, span: &Span) -> String {
    let mut open = String::new();
    let mut close: Vec<&str> = Vec::new();

    for mark in &span.marks {
        let (start, end): (Cow<'_, str>, &str) = match mark.as_str() {
            "strong" => ("<strong>".into(), "</strong>"),
            "em" => ("<em>".into(), "</em>"),
            "code" => ("<code>".into(), "</code>"),
            "underline" => ("<u>".into(), "</u>"),
            "strike-through" => ("<s>".into(), "</s>"),
            key => match block.mark_def(key) {
                Some(def) if def.kind == "link" => match def.href.as_deref() {
                    Some(href) if is_safe_href(href) => {
                        (format!(r#"<a href="{}">"#, escape(href.trim())).into(), "</a>")
                    }
                    _ => continue,
                },
                _ => continue,
            },
        };
        open.push_str(&start);
        close.push(end);
    }

    let text = escape(&span.text).replace('\n', "<br />");
    close.reverse();
    format!("{}{}{}", open, text, close.concat())
}
