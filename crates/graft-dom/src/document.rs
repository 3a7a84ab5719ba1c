use crate::element::Element;
use crate::selector::Selector;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use tracing::warn;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct NodeId(usize);

#[derive(Debug, Clone)]
struct Node {
    element: Element,
    parent: Option<NodeId>,
    children: Vec<NodeId>,
}

/// Arena-backed element tree. Node handles stay valid for the lifetime of the
/// document they came from; a navigation replaces the document wholesale, so
/// handles are never carried across page loads.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(from = "NodeRepr", into = "NodeRepr")]
pub struct Document {
    nodes: Vec<Node>,
    root: NodeId,
}

impl Document {
    pub fn new(root_tag: impl Into<String>) -> Self {
        Self {
            nodes: vec![Node {
                element: Element::new(root_tag),
                parent: None,
                children: Vec::new(),
            }],
            root: NodeId(0),
        }
    }

    pub fn root(&self) -> NodeId {
        self.root
    }

    /// Adds a detached element; it joins the tree on first insertion.
    pub fn create_element(&mut self, element: Element) -> NodeId {
        let id = NodeId(self.nodes.len());
        self.nodes.push(Node {
            element,
            parent: None,
            children: Vec::new(),
        });
        id
    }

    pub fn element(&self, id: NodeId) -> &Element {
        &self.nodes[id.0].element
    }

    pub fn element_mut(&mut self, id: NodeId) -> &mut Element {
        &mut self.nodes[id.0].element
    }

    pub fn parent(&self, id: NodeId) -> Option<NodeId> {
        self.nodes[id.0].parent
    }

    pub fn children(&self, id: NodeId) -> &[NodeId] {
        &self.nodes[id.0].children
    }

    pub fn first_child(&self, id: NodeId) -> Option<NodeId> {
        self.nodes[id.0].children.first().copied()
    }

    pub fn append_child(&mut self, parent: NodeId, child: NodeId) {
        self.nodes[child.0].parent = Some(parent);
        self.nodes[parent.0].children.push(child);
    }

    pub fn insert_first(&mut self, parent: NodeId, child: NodeId) {
        self.nodes[child.0].parent = Some(parent);
        self.nodes[parent.0].children.insert(0, child);
    }

    /// Inserts `child` immediately before `reference` among `parent`'s
    /// children; appends when `reference` is not a child of `parent`.
    pub fn insert_before(&mut self, parent: NodeId, child: NodeId, reference: NodeId) {
        self.nodes[child.0].parent = Some(parent);
        let children = &mut self.nodes[parent.0].children;
        match children.iter().position(|&c| c == reference) {
            Some(pos) => children.insert(pos, child),
            None => children.push(child),
        }
    }

    /// Preorder traversal starting at the root.
    pub fn descendants(&self) -> Descendants<'_> {
        Descendants {
            doc: self,
            stack: vec![self.root],
        }
    }

    pub fn get_element_by_id(&self, id: &str) -> Option<NodeId> {
        self.descendants().find(|&n| self.element(n).id() == Some(id))
    }

    pub fn elements_by_tag(&self, tag: &str) -> Vec<NodeId> {
        self.descendants()
            .filter(|&n| self.element(n).tag == tag)
            .collect()
    }

    pub fn query(&self, selector: &Selector) -> Option<NodeId> {
        self.descendants().find(|&n| selector.matches(self, n))
    }

    /// String-selector lookup. A malformed selector is treated as matching
    /// nothing; the page will be retried on the next change notification.
    pub fn select(&self, selector: &str) -> Option<NodeId> {
        match Selector::parse(selector) {
            Ok(sel) => self.query(&sel),
            Err(e) => {
                warn!(selector = %selector, error = %e, "ignoring malformed selector");
                None
            }
        }
    }

    pub fn select_exists(&self, selector: &str) -> bool {
        self.select(selector).is_some()
    }

    pub fn to_html(&self) -> String {
        let mut out = String::new();
        self.write_node(self.root, 0, &mut out);
        out
    }

    fn write_node(&self, id: NodeId, depth: usize, out: &mut String) {
        let el = self.element(id);
        let indent = "  ".repeat(depth);
        out.push_str(&indent);
        out.push('<');
        out.push_str(&el.tag);
        for (name, value) in &el.attrs {
            out.push(' ');
            out.push_str(name);
            out.push_str("=\"");
            out.push_str(&escape_attr(value));
            out.push('"');
        }
        out.push('>');
        let children = self.children(id);
        if children.is_empty() {
            if let Some(text) = &el.text {
                out.push_str(&escape_text(text));
            }
            if !is_void_tag(&el.tag) {
                out.push_str(&format!("</{}>", el.tag));
            }
            out.push('\n');
            return;
        }
        out.push('\n');
        if let Some(text) = &el.text {
            out.push_str(&"  ".repeat(depth + 1));
            out.push_str(&escape_text(text));
            out.push('\n');
        }
        for &child in children {
            self.write_node(child, depth + 1, out);
        }
        out.push_str(&indent);
        out.push_str(&format!("</{}>", el.tag));
        out.push('\n');
    }
}

fn is_void_tag(tag: &str) -> bool {
    matches!(tag, "meta" | "link" | "br" | "hr" | "img" | "input")
}

fn escape_attr(value: &str) -> String {
    value
        .replace('&', "&amp;")
        .replace('<', "&lt;")
        .replace('"', "&quot;")
}

fn escape_text(value: &str) -> String {
    value
        .replace('&', "&amp;")
        .replace('<', "&lt;")
        .replace('>', "&gt;")
}

pub struct Descendants<'a> {
    doc: &'a Document,
    stack: Vec<NodeId>,
}

impl Iterator for Descendants<'_> {
    type Item = NodeId;

    fn next(&mut self) -> Option<NodeId> {
        let id = self.stack.pop()?;
        self.stack
            .extend(self.doc.children(id).iter().rev().copied());
        Some(id)
    }
}

/// Nested snapshot form of a document, the serde face of [`Document`]. Page
/// snapshots on disk and test fixtures are trees of this shape.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NodeRepr {
    pub tag: String,
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub attrs: BTreeMap<String, String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub text: Option<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub children: Vec<NodeRepr>,
}

impl From<NodeRepr> for Document {
    fn from(repr: NodeRepr) -> Self {
        let mut doc = Document::new("");
        doc.nodes[0].element = Element {
            tag: repr.tag,
            attrs: repr.attrs,
            text: repr.text,
        };
        let root = doc.root;
        for child in repr.children {
            build_into(&mut doc, root, child);
        }
        doc
    }
}

fn build_into(doc: &mut Document, parent: NodeId, repr: NodeRepr) {
    let id = doc.create_element(Element {
        tag: repr.tag,
        attrs: repr.attrs,
        text: repr.text,
    });
    doc.append_child(parent, id);
    for child in repr.children {
        build_into(doc, id, child);
    }
}

impl From<Document> for NodeRepr {
    fn from(doc: Document) -> Self {
        node_repr(&doc, doc.root)
    }
}

fn node_repr(doc: &Document, id: NodeId) -> NodeRepr {
    let el = doc.element(id);
    NodeRepr {
        tag: el.tag.clone(),
        attrs: el.attrs.clone(),
        text: el.text.clone(),
        children: doc
            .children(id)
            .iter()
            .map(|&c| node_repr(doc, c))
            .collect(),
    }
}
