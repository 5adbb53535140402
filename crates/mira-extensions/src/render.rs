//! Typed render instructions.
//!
//! Extensions describe their visuals as data. Markup supplied by an extension
//! is passed through verbatim (extensions are trusted), while every panel this
//! crate builds itself is a [`RenderNode`] tree whose text is escaped on output.

use std::collections::BTreeMap;
use std::fmt::Write;

use serde::{Deserialize, Serialize};

/// What a unit renders to.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", content = "value", rename_all = "snake_case")]
pub enum RenderInstruction {
    /// Raw markup supplied by the extension.
    Markup(String),
    /// Structured node tree.
    Tree(RenderNode),
}

impl RenderInstruction {
    /// Render to an HTML string.
    pub fn to_html(&self) -> String {
        match self {
            RenderInstruction::Markup(markup) => markup.clone(),
            RenderInstruction::Tree(node) => node.to_html(),
        }
    }
}

impl From<RenderNode> for RenderInstruction {
    fn from(node: RenderNode) -> Self {
        RenderInstruction::Tree(node)
    }
}

impl From<String> for RenderInstruction {
    fn from(markup: String) -> Self {
        RenderInstruction::Markup(markup)
    }
}

impl From<&str> for RenderInstruction {
    fn from(markup: &str) -> Self {
        RenderInstruction::Markup(markup.to_string())
    }
}

/// A node in a render tree.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RenderNode {
    Element {
        tag: String,
        #[serde(default)]
        attrs: BTreeMap<String, String>,
        #[serde(default)]
        children: Vec<RenderNode>,
    },
    Text(String),
}

impl RenderNode {
    /// Create an empty element.
    pub fn element(tag: impl Into<String>) -> Self {
        RenderNode::Element {
            tag: tag.into(),
            attrs: BTreeMap::new(),
            children: Vec::new(),
        }
    }

    /// Create a text node.
    pub fn text(text: impl Into<String>) -> Self {
        RenderNode::Text(text.into())
    }

    /// Set an attribute. No-op on text nodes.
    pub fn attr(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        if let RenderNode::Element { attrs, .. } = &mut self {
            attrs.insert(name.into(), value.into());
        }
        self
    }

    /// Append a child. No-op on text nodes.
    pub fn child(mut self, node: RenderNode) -> Self {
        if let RenderNode::Element { children, .. } = &mut self {
            children.push(node);
        }
        self
    }

    /// Append an element containing a single text node.
    pub fn text_child(self, tag: &str, text: impl Into<String>) -> Self {
        self.child(RenderNode::element(tag).child(RenderNode::text(text)))
    }

    /// Find the first element carrying attribute `name` = `value`.
    pub fn find_by_attr(&self, name: &str, value: &str) -> Option<&RenderNode> {
        match self {
            RenderNode::Text(_) => None,
            RenderNode::Element {
                attrs, children, ..
            } => {
                if attrs.get(name).map(String::as_str) == Some(value) {
                    return Some(self);
                }
                children.iter().find_map(|c| c.find_by_attr(name, value))
            }
        }
    }

    /// Concatenated text content of this subtree.
    pub fn text_content(&self) -> String {
        match self {
            RenderNode::Text(text) => text.clone(),
            RenderNode::Element { children, .. } => {
                children.iter().map(RenderNode::text_content).collect()
            }
        }
    }

    /// Render to an HTML string with escaped text and attribute values.
    pub fn to_html(&self) -> String {
        let mut out = String::new();
        self.write_html(&mut out);
        out
    }

    fn write_html(&self, out: &mut String) {
        match self {
            RenderNode::Text(text) => out.push_str(&escape_html(text)),
            RenderNode::Element {
                tag,
                attrs,
                children,
            } => {
                out.push('<');
                out.push_str(tag);
                for (name, value) in attrs {
                    let _ = write!(out, " {}=\"{}\"", name, escape_html(value));
                }
                out.push('>');
                for child in children {
                    child.write_html(out);
                }
                let _ = write!(out, "</{}>", tag);
            }
        }
    }
}

/// Escape the five HTML-significant characters.
pub fn escape_html(input: &str) -> String {
    let mut out = String::with_capacity(input.len());
    for c in input.chars() {
        match c {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            '\'' => out.push_str("&#39;"),
            _ => out.push(c),
        }
    }
    out
}
