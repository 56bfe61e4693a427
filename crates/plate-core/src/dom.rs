//! Tag classification and inline style/class access for [`ElementNode`].

use serde::{Deserialize, Serialize};

use crate::core::{Document, ElementNode, Node};

const BLOCK_TAGS: &[&str] = &[
    "address",
    "article",
    "blockquote",
    "caption",
    "dd",
    "div",
    "dl",
    "dt",
    "h1",
    "h2",
    "h3",
    "h4",
    "h5",
    "h6",
    "li",
    "ol",
    "p",
    "pre",
    "section",
    "table",
    "tbody",
    "td",
    "tfoot",
    "th",
    "thead",
    "tr",
    "ul",
];

const PARAGRAPH_TAGS: &[&str] = &[
    "address", "dd", "dt", "h1", "h2", "h3", "h4", "h5", "h6", "li", "p", "pre",
];

const LIST_TAGS: &[&str] = &["dl", "ol", "ul"];
const LIST_ITEM_TAGS: &[&str] = &["dd", "dt", "li"];
const BLOCK_LIMIT_TAGS: &[&str] = &["article", "blockquote", "caption", "section", "td", "th"];
const FLOW_CONTAINER_TAGS: &[&str] = &[
    "article",
    "blockquote",
    "caption",
    "div",
    "section",
    "td",
    "th",
];

pub fn is_block_tag(tag: &str) -> bool {
    BLOCK_TAGS.contains(&tag)
}

pub fn is_list_tag(tag: &str) -> bool {
    LIST_TAGS.contains(&tag)
}

pub fn is_list_item_tag(tag: &str) -> bool {
    LIST_ITEM_TAGS.contains(&tag)
}

pub fn is_block_limit_tag(tag: &str) -> bool {
    BLOCK_LIMIT_TAGS.contains(&tag)
}

/// Containers whose bare inline children may be wrapped into blocks.
pub fn is_flow_container_tag(tag: &str) -> bool {
    FLOW_CONTAINER_TAGS.contains(&tag)
}

pub fn is_inline_node(node: &Node) -> bool {
    match node {
        Node::Text(_) => true,
        Node::Element(el) => !is_block_tag(&el.tag),
    }
}

impl ElementNode {
    /// Blocks that directly hold inline content. A `div` only counts when it
    /// has no block children.
    pub fn is_paragraph(&self) -> bool {
        if PARAGRAPH_TAGS.contains(&self.tag.as_str()) {
            return true;
        }
        self.tag == "div" && self.children.iter().all(is_inline_node)
    }

    pub fn class_name(&self) -> &str {
        self.attr("class").unwrap_or("")
    }

    pub fn style(&self, property: &str) -> Option<String> {
        parse_style(self.attr("style")?)
            .into_iter()
            .rev()
            .find(|(name, _)| name == property)
            .map(|(_, value)| value)
    }

    /// The `style` attribute text after setting (or, with `None`, clearing)
    /// `property`. May be empty.
    pub fn style_with(&self, property: &str, value: Option<&str>) -> String {
        let mut decls: Vec<(String, String)> = parse_style(self.attr("style").unwrap_or(""))
            .into_iter()
            .filter(|(name, _)| name != property)
            .collect();
        if let Some(value) = value.filter(|v| !v.is_empty()) {
            decls.push((property.to_string(), value.to_string()));
        }
        serialize_style(&decls)
    }
}

pub fn parse_style(text: &str) -> Vec<(String, String)> {
    split_declarations(text)
        .into_iter()
        .filter_map(|decl| {
            let (name, value) = decl.split_once(':')?;
            let name = name.trim().to_ascii_lowercase();
            let value = value.trim();
            if name.is_empty() || value.is_empty() {
                return None;
            }
            Some((name, value.to_string()))
        })
        .collect()
}

/// Splits a style attribute on `;` outside parentheses and quotes, so values
/// like `url(data:image/png;base64,...)` stay whole.
fn split_declarations(text: &str) -> Vec<&str> {
    let mut decls = Vec::new();
    let mut depth = 0usize;
    let mut quote: Option<char> = None;
    let mut escaped = false;
    let mut start = 0;
    for (ix, c) in text.char_indices() {
        if escaped {
            escaped = false;
            continue;
        }
        match (quote, c) {
            (_, '\\') => escaped = true,
            (Some(q), c) if c == q => quote = None,
            (Some(_), _) => {}
            (None, '"' | '\'') => quote = Some(c),
            (None, '(') => depth += 1,
            (None, ')') => depth = depth.saturating_sub(1),
            (None, ';') if depth == 0 => {
                decls.push(&text[start..ix]);
                start = ix + 1;
            }
            _ => {}
        }
    }
    decls.push(&text[start..]);
    decls
}

pub fn serialize_style(decls: &[(String, String)]) -> String {
    decls
        .iter()
        .map(|(name, value)| format!("{name}: {value};"))
        .collect::<Vec<_>>()
        .join(" ")
}

/// Leading integer of a CSS length, e.g. `"40px"` -> 40. `None` when there
/// are no leading digits.
pub fn parse_css_int(value: &str) -> Option<i64> {
    let value = value.trim_start();
    let (sign, digits) = match value.as_bytes().first() {
        Some(b'-') => (-1, &value[1..]),
        Some(b'+') => (1, &value[1..]),
        _ => (1, value),
    };
    let end = digits
        .find(|c: char| !c.is_ascii_digit())
        .unwrap_or(digits.len());
    digits[..end].parse::<i64>().ok().map(|n| sign * n)
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TextDirection {
    #[default]
    Ltr,
    Rtl,
}

impl TextDirection {
    pub fn parse(value: &str) -> Option<Self> {
        match value.trim().to_ascii_lowercase().as_str() {
            "ltr" => Some(TextDirection::Ltr),
            "rtl" => Some(TextDirection::Rtl),
            _ => None,
        }
    }

    /// Margin property that indents content in this direction.
    pub fn margin_property(self) -> &'static str {
        match self {
            TextDirection::Ltr => "margin-left",
            TextDirection::Rtl => "margin-right",
        }
    }
}

/// Direction of the element at `path`: the nearest `dir` attribute on it or
/// an ancestor, otherwise `default`.
pub fn resolve_direction(doc: &Document, path: &[usize], default: TextDirection) -> TextDirection {
    (1..=path.len())
        .rev()
        .filter_map(|len| doc.element(&path[..len]))
        .find_map(|el| el.attr("dir").and_then(TextDirection::parse))
        .unwrap_or(default)
}
