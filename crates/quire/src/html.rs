// SPDX-FileCopyrightText: 2025 Caspar Water Company
//
// SPDX-License-Identifier: Apache-2.0

//! Small DOM toolkit over `markup5ever_rcdom` for rewriting converted
//! section fragments: predicate queries, attribute edits, detaching.

use std::cell::RefCell;
use std::rc::Rc;

use html5ever::serialize::{SerializeOpts, TraversalScope, serialize};
use html5ever::tendril::{StrTendril, TendrilSink};
use html5ever::{
    Attribute, LocalName, QualName, local_name, namespace_url, ns, parse_document, parse_fragment,
};
use markup5ever_rcdom::{Handle, Node, NodeData, RcDom, SerializableHandle};

use crate::error::{Error, Result};

/// A parsed HTML fragment. Children of `root` are the fragment's nodes.
pub struct Fragment {
    root: Handle,
    _dom: RcDom,
}

impl Fragment {
    pub fn parse(html: &str) -> Self {
        let dom = parse_fragment(
            RcDom::default(),
            Default::default(),
            QualName::new(None, ns!(html), local_name!("body")),
            Vec::new(),
        )
        .one(html);

        // The fragment parser wraps everything in a synthetic <html> element.
        let root = dom
            .document
            .children
            .borrow()
            .first()
            .cloned()
            .unwrap_or_else(|| dom.document.clone());
        Self { root, _dom: dom }
    }

    /// Parse a complete document. The root is the document node.
    pub fn parse_document(html: &str) -> Self {
        let dom = parse_document(RcDom::default(), Default::default()).one(html);
        let root = dom.document.clone();
        Self { root, _dom: dom }
    }

    pub fn root(&self) -> &Handle {
        &self.root
    }

    /// Every node below the root in document order.
    pub fn descendants(&self) -> Vec<Handle> {
        descendants(&self.root)
    }

    pub fn elements(&self) -> impl Iterator<Item = Handle> {
        self.descendants().into_iter().filter(is_element)
    }

    pub fn find<P>(&self, predicate: P) -> Option<Handle>
    where
        P: Fn(&Handle) -> bool,
    {
        self.elements().find(|node| predicate(node))
    }

    pub fn find_all<P>(&self, predicate: P) -> Vec<Handle>
    where
        P: Fn(&Handle) -> bool,
    {
        self.elements().filter(|node| predicate(node)).collect()
    }

    pub fn to_html(&self) -> Result<String> {
        inner_html(&self.root)
    }
}

pub fn descendants(node: &Handle) -> Vec<Handle> {
    let mut out = Vec::new();
    let mut stack: Vec<Handle> = node.children.borrow().iter().rev().cloned().collect();
    while let Some(next) = stack.pop() {
        stack.extend(next.children.borrow().iter().rev().cloned());
        out.push(next);
    }
    out
}

pub fn is_element(node: &Handle) -> bool {
    matches!(node.data, NodeData::Element { .. })
}

/// Lower-case local tag name of an element.
pub fn tag(node: &Handle) -> Option<&str> {
    match &node.data {
        NodeData::Element { name, .. } => Some(&*name.local),
        _ => None,
    }
}

pub fn has_tag(node: &Handle, wanted: &str) -> bool {
    tag(node) == Some(wanted)
}

/// `h1` … `h9`.
pub fn is_heading(node: &Handle) -> bool {
    tag(node).is_some_and(|t| {
        let bytes = t.as_bytes();
        bytes.len() == 2 && bytes[0] == b'h' && (b'1'..=b'9').contains(&bytes[1])
    })
}

pub fn attr(node: &Handle, key: &str) -> Option<String> {
    match &node.data {
        NodeData::Element { attrs, .. } => attrs
            .borrow()
            .iter()
            .find(|a| &*a.name.local == key)
            .map(|a| a.value.to_string()),
        _ => None,
    }
}

/// Every attribute as `(local name, value)`, in source order.
pub fn attrs(node: &Handle) -> Vec<(String, String)> {
    match &node.data {
        NodeData::Element { attrs, .. } => attrs
            .borrow()
            .iter()
            .map(|a| (a.name.local.to_string(), a.value.to_string()))
            .collect(),
        _ => Vec::new(),
    }
}

pub fn set_attr(node: &Handle, key: &str, value: &str) {
    if let NodeData::Element { attrs, .. } = &node.data {
        let mut attrs = attrs.borrow_mut();
        match attrs.iter_mut().find(|a| &*a.name.local == key) {
            Some(existing) => existing.value = StrTendril::from_slice(value),
            None => attrs.push(Attribute {
                name: QualName::new(None, ns!(), LocalName::from(key)),
                value: StrTendril::from_slice(value),
            }),
        }
    }
}

pub fn remove_attr(node: &Handle, key: &str) {
    if let NodeData::Element { attrs, .. } = &node.data {
        attrs.borrow_mut().retain(|a| &*a.name.local != key);
    }
}

pub fn has_class(node: &Handle, class: &str) -> bool {
    attr(node, "class").is_some_and(|classes| classes.split_whitespace().any(|c| c == class))
}

/// Children that are not whitespace-only text.
pub fn meaningful_children(node: &Handle) -> Vec<Handle> {
    node.children
        .borrow()
        .iter()
        .filter(|child| match &child.data {
            NodeData::Text { contents } => !contents.borrow().trim().is_empty(),
            NodeData::Comment { .. } => false,
            _ => true,
        })
        .cloned()
        .collect()
}

pub fn text_content(node: &Handle) -> String {
    let mut text = String::new();
    for child in descendants(node) {
        if let NodeData::Text { contents } = &child.data {
            text.push_str(&contents.borrow());
        }
    }
    text
}

/// Replace all children with a single text node.
pub fn set_text(node: &Handle, text: &str) {
    let child = Node::new(NodeData::Text {
        contents: RefCell::new(StrTendril::from_slice(text)),
    });
    child.parent.set(Some(Rc::downgrade(node)));
    let mut children = node.children.borrow_mut();
    for old in children.drain(..) {
        old.parent.set(None);
    }
    children.push(child);
}

/// Remove `node` from its parent.
pub fn detach(node: &Handle) {
    if let Some(parent) = node.parent.take().and_then(|weak| weak.upgrade()) {
        parent
            .children
            .borrow_mut()
            .retain(|child| !Rc::ptr_eq(child, node));
    }
}

pub fn inner_html(node: &Handle) -> Result<String> {
    serialize_scope(node, TraversalScope::ChildrenOnly(None))
}

pub fn outer_html(node: &Handle) -> Result<String> {
    serialize_scope(node, TraversalScope::IncludeNode)
}

/// Serialize an element under a different tag name, keeping its
/// attributes and children. The original node is left as it is.
pub fn outer_html_as(node: &Handle, new_tag: &str) -> Result<String> {
    let NodeData::Element { attrs, .. } = &node.data else {
        return outer_html(node);
    };
    let renamed = Node::new(NodeData::Element {
        name: QualName::new(None, ns!(html), LocalName::from(new_tag)),
        attrs: RefCell::new(attrs.borrow().clone()),
        template_contents: RefCell::new(None),
        mathml_annotation_xml_integration_point: false,
    });
    renamed
        .children
        .borrow_mut()
        .extend(node.children.borrow().iter().cloned());
    outer_html(&renamed)
}

fn serialize_scope(node: &Handle, traversal_scope: TraversalScope) -> Result<String> {
    let mut out = Vec::new();
    let handle: SerializableHandle = node.clone().into();
    serialize(
        &mut out,
        &handle,
        SerializeOpts {
            traversal_scope,
            ..Default::default()
        },
    )
    .map_err(Error::Html)?;
    Ok(String::from_utf8_lossy(&out).into_owned())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_and_roundtrip() {
        let frag = Fragment::parse("<h1 id=\"a\">Title</h1>\n<p>Body <em>text</em></p>");
        assert_eq!(
            frag.to_html().expect("serialize"),
            "<h1 id=\"a\">Title</h1>\n<p>Body <em>text</em></p>"
        );
    }

    #[test]
    fn test_query_and_mutate() {
        let frag = Fragment::parse("<div class=\"x footnotes\"><p id=\"p\">hi</p></div>");
        let div = frag.find(|n| has_class(n, "footnotes")).expect("div");
        assert!(has_tag(&div, "div"));
        let p = frag.find(|n| attr(n, "id").is_some()).expect("p");
        set_attr(&p, "id", "s-p");
        set_attr(&p, "title", "t");
        set_text(&p, "bye");
        assert_eq!(
            frag.to_html().expect("serialize"),
            "<div class=\"x footnotes\"><p id=\"s-p\" title=\"t\">bye</p></div>"
        );

        remove_attr(&p, "title");
        detach(&div);
        assert_eq!(frag.to_html().expect("serialize"), "");
        assert_eq!(outer_html(&p).expect("serialize"), "<p id=\"s-p\">bye</p>");
        assert_eq!(
            outer_html_as(&div, "aside").expect("serialize"),
            "<aside class=\"x footnotes\"><p id=\"s-p\">bye</p></aside>"
        );
    }

    #[test]
    fn test_renamed_element_keeps_namespaced_attributes() {
        let frag = Fragment::parse("<ol class=\"notes\" title=\"a &amp; &quot;b&quot;\"><li>x</li></ol>");
        let ol = frag.find(|n| has_tag(n, "ol")).expect("ol");
        if let NodeData::Element { attrs, .. } = &ol.data {
            attrs.borrow_mut().push(Attribute {
                name: QualName::new(None, ns!(xml), local_name!("lang")),
                value: StrTendril::from_slice("fr"),
            });
        }
        assert_eq!(
            outer_html_as(&ol, "div").expect("serialize"),
            "<div class=\"notes\" title=\"a &amp; &quot;b&quot;\" xml:lang=\"fr\"><li>x</li></div>"
        );
        assert_eq!(
            frag.to_html().expect("serialize"),
            "<ol class=\"notes\" title=\"a &amp; &quot;b&quot;\" xml:lang=\"fr\"><li>x</li></ol>"
        );
    }

    #[test]
    fn test_document_attrs() {
        let doc = Fragment::parse_document("<link rel=stylesheet href=a.css><p>x</p>");
        let link = doc.find(|n| has_tag(n, "link")).expect("link");
        assert_eq!(
            attrs(&link),
            vec![
                ("rel".to_string(), "stylesheet".to_string()),
                ("href".to_string(), "a.css".to_string()),
            ]
        );
    }

    #[test]
    fn test_meaningful_children_skip_whitespace() {
        let frag = Fragment::parse("<section id=\"s\">\n  <h2>T</h2>\n</section>");
        let section = frag.find(|n| has_tag(n, "section")).expect("section");
        let children = meaningful_children(&section);
        assert_eq!(children.len(), 1);
        assert!(is_heading(&children[0]));
        assert_eq!(text_content(&section).trim(), "T");
    }
}
