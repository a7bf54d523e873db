//! The segment tree produced by a parse.
//!
//! Every node borrows its `content` from the source, so ranges and text can
//! never disagree. Parent links are kept by the [`Document`] as a side index
//! instead of on the nodes, which keeps `Segment` a plain owned tree for
//! equality and serialization.
use std::fmt;
use std::sync::Arc;

use serde::Serialize;

use crate::error::Diagnostic;
use crate::lexer::{LineIndex, Position};

/// Identifier of a segment, unique within one parse.
///
/// Ids are assigned in pre-order starting from `0` at the root, so every
/// subtree occupies a contiguous id range.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
#[serde(transparent)]
pub struct SegmentId(pub usize);

impl fmt::Display for SegmentId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum SegmentKind {
    /// Prose, or the synthetic root wrapping several top-level segments.
    Text,
    /// A registered structural tag; its body is parsed into children.
    Tag,
    /// A registered meta tag; its body is opaque.
    Meta,
    /// A `{{ expression }}` span.
    Template,
}

/// Half-open byte range into the source.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub struct Span {
    pub start: usize,
    pub end: usize,
}

impl Span {
    pub fn new(start: usize, end: usize) -> Self {
        Self { start, end }
    }

    pub fn len(&self) -> usize {
        self.end - self.start
    }

    pub fn is_empty(&self) -> bool {
        self.start == self.end
    }

    pub fn contains(&self, offset: usize) -> bool {
        self.start <= offset && offset < self.end
    }

    pub fn slice<'s>(&self, source: &'s str) -> &'s str {
        &source[self.start..self.end]
    }
}

/// One piece of an attribute value.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ValueFragment<'src> {
    /// Literal text, verbatim from the source.
    Literal { text: &'src str, span: Span },
    /// An interpolated `{{ expression }}`; `span` covers the delimiters.
    Template { expression: &'src str, span: Span },
}

impl<'src> ValueFragment<'src> {
    pub fn span(&self) -> Span {
        match self {
            ValueFragment::Literal { span, .. } | ValueFragment::Template { span, .. } => *span,
        }
    }
}

/// A `key="value"` pair from an opening tag.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Attribute<'src> {
    pub key: &'src str,
    pub key_span: Span,
    pub value: Vec<ValueFragment<'src>>,
    /// Range between the quotes (or of the unquoted value); `None` when the
    /// attribute has no value at all.
    pub value_span: Option<Span>,
}

impl<'src> Attribute<'src> {
    /// The value as plain text, if it contains no templates.
    pub fn literal_value(&self) -> Option<&'src str> {
        match self.value.as_slice() {
            [] => Some(""),
            [ValueFragment::Literal { text, .. }] => Some(text),
            _ => None,
        }
    }

    pub fn is_interpolated(&self) -> bool {
        self.value
            .iter()
            .any(|fragment| matches!(fragment, ValueFragment::Template { .. }))
    }
}

/// A node of the segment tree.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Segment<'src> {
    pub id: SegmentId,
    pub kind: SegmentKind,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub tag_name: Option<&'src str>,
    /// Exactly `source[start..end]`.
    pub content: &'src str,
    pub start: usize,
    pub end: usize,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub children: Vec<Segment<'src>>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub attributes: Vec<Attribute<'src>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub name_span: Option<Span>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub close_name_span: Option<Span>,
    pub self_closing: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub expression: Option<&'src str>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub path: Option<Arc<str>>,
}

impl<'src> Segment<'src> {
    pub fn span(&self) -> Span {
        Span::new(self.start, self.end)
    }

    pub fn is_text(&self) -> bool {
        self.kind == SegmentKind::Text
    }

    /// True for `Tag` and `Meta` nodes.
    pub fn is_element(&self) -> bool {
        matches!(self.kind, SegmentKind::Tag | SegmentKind::Meta)
    }

    pub fn attribute(&self, key: &str) -> Option<&Attribute<'src>> {
        self.attributes
            .iter()
            .find(|attribute| attribute.key.eq_ignore_ascii_case(key))
    }

    /// Direct children that are elements named `name` (ASCII case-insensitive).
    pub fn children_named<'a>(
        &'a self,
        name: &'a str,
    ) -> impl Iterator<Item = &'a Segment<'src>> + 'a {
        self.children.iter().filter(move |child| {
            child
                .tag_name
                .is_some_and(|tag| tag.eq_ignore_ascii_case(name))
        })
    }

    /// The deepest segment in this subtree whose range contains `offset`,
    /// or `self` if no child does.
    pub fn node_at(&self, offset: usize) -> &Segment<'src> {
        let mut node = self;
        while let Some(child) = node
            .children
            .iter()
            .find(|child| child.span().contains(offset))
        {
            node = child;
        }
        node
    }

    /// Pre-order iterator over this segment and all of its descendants.
    pub fn descendants(&self) -> Descendants<'_, 'src> {
        Descendants { stack: vec![self] }
    }
}

/// Pre-order traversal of a segment subtree.
pub struct Descendants<'a, 'src> {
    stack: Vec<&'a Segment<'src>>,
}

impl<'a, 'src> Iterator for Descendants<'a, 'src> {
    type Item = &'a Segment<'src>;

    fn next(&mut self) -> Option<Self::Item> {
        let segment = self.stack.pop()?;
        self.stack.extend(segment.children.iter().rev());
        Some(segment)
    }
}

/// Visitor for walking a segment tree, e.g. from a rendering layer.
pub trait Visitor<'src> {
    fn visit_segment(&mut self, segment: &Segment<'src>);

    /// Called after all children of `segment` have been visited.
    fn leave_segment(&mut self, _segment: &Segment<'src>) {}
}

/// Types that can drive a [`Visitor`].
pub trait Visitable<'src> {
    fn accept<V: Visitor<'src>>(&self, visitor: &mut V);
}

impl<'src> Visitable<'src> for Segment<'src> {
    fn accept<V: Visitor<'src>>(&self, visitor: &mut V) {
        visitor.visit_segment(self);
        for child in &self.children {
            child.accept(visitor);
        }
        visitor.leave_segment(self);
    }
}

/// Result of a parse: the segment tree plus everything learned about it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Document<'src> {
    pub root: Segment<'src>,
    #[serde(skip)]
    source: &'src str,
    diagnostics: Vec<Diagnostic>,
    dropped_diagnostics: usize,
    #[serde(skip)]
    parents: Vec<Option<SegmentId>>,
}

impl<'src> Document<'src> {
    pub(crate) fn new(
        root: Segment<'src>,
        source: &'src str,
        diagnostics: Vec<Diagnostic>,
        dropped_diagnostics: usize,
        parents: Vec<Option<SegmentId>>,
    ) -> Self {
        Self {
            root,
            source,
            diagnostics,
            dropped_diagnostics,
            parents,
        }
    }

    pub fn source(&self) -> &'src str {
        self.source
    }

    /// Number of segments in the tree.
    pub fn len(&self) -> usize {
        self.parents.len()
    }

    /// Always false: every parse produces at least a root.
    pub fn is_empty(&self) -> bool {
        self.parents.is_empty()
    }

    pub fn diagnostics(&self) -> &[Diagnostic] {
        &self.diagnostics
    }

    /// Diagnostics discarded because `max_diagnostics` was reached.
    pub fn dropped_diagnostics(&self) -> usize {
        self.dropped_diagnostics
    }

    pub fn diagnostics_for(&self, id: SegmentId) -> impl Iterator<Item = &Diagnostic> {
        self.diagnostics
            .iter()
            .filter(move |diagnostic| diagnostic.node == Some(id))
    }

    pub fn has_errors(&self) -> bool {
        self.diagnostics
            .iter()
            .any(|diagnostic| diagnostic.severity == crate::error::Severity::Error)
    }

    /// Looks up a segment by id.
    pub fn get(&self, id: SegmentId) -> Option<&Segment<'src>> {
        let mut node = &self.root;
        loop {
            if node.id == id {
                return Some(node);
            }
            // Pre-order ids: the subtree holding `id` starts at the last
            // child whose id does not exceed it.
            let index = node.children.partition_point(|child| child.id <= id);
            if index == 0 {
                return None;
            }
            node = &node.children[index - 1];
        }
    }

    pub fn parent_id(&self, id: SegmentId) -> Option<SegmentId> {
        self.parents.get(id.0).copied().flatten()
    }

    pub fn parent(&self, id: SegmentId) -> Option<&Segment<'src>> {
        self.parent_id(id).and_then(|parent| self.get(parent))
    }

    /// Ancestors of `id`, nearest first.
    pub fn ancestors(&self, id: SegmentId) -> impl Iterator<Item = &Segment<'src>> {
        std::iter::successors(self.parent(id), move |segment| self.parent(segment.id))
    }

    /// The deepest segment whose range contains `offset`.
    ///
    /// Offsets at or past the end of the source resolve to the root.
    pub fn node_at(&self, offset: usize) -> &Segment<'src> {
        self.root.node_at(offset)
    }

    /// Pre-order iterator over every segment.
    pub fn iter(&self) -> Descendants<'_, 'src> {
        self.root.descendants()
    }

    pub fn line_index(&self) -> LineIndex<'src> {
        LineIndex::new(self.source)
    }

    /// Start and end positions of a segment.
    pub fn positions(&self, id: SegmentId) -> Option<(Position, Position)> {
        let segment = self.get(id)?;
        let index = self.line_index();
        Some((index.position(segment.start), index.position(segment.end)))
    }
}

impl<'src> Visitable<'src> for Document<'src> {
    fn accept<V: Visitor<'src>>(&self, visitor: &mut V) {
        self.root.accept(visitor);
    }
}
