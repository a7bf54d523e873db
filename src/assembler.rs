//! Turns the raw span tree into the final [`Document`].
use std::sync::Arc;

use tracing::debug;

use crate::ast::{Document, Segment, SegmentId, SegmentKind};
use crate::error::Diagnostics;
use crate::registry::TagClass;
use crate::segmenter::{RawKind, RawSegment};
use crate::structure::StructuralParser;

pub(crate) struct Assembler<'src> {
    source: &'src str,
    path: Option<Arc<str>>,
    /// Parent of each segment, indexed by id.
    parents: Vec<Option<SegmentId>>,
}

impl<'src> Assembler<'src> {
    pub(crate) fn new(source: &'src str, path: Option<Arc<str>>) -> Self {
        Self {
            source,
            path,
            parents: Vec::new(),
        }
    }

    pub(crate) fn assemble(mut self, raw: RawSegment, mut diagnostics: Diagnostics) -> Document<'src> {
        let root = self.build(raw, None, &mut diagnostics);

        let dropped = diagnostics.dropped();
        let mut diagnostics = diagnostics.into_vec();
        diagnostics.sort_by_key(|diagnostic| diagnostic.start);
        for diagnostic in &mut diagnostics {
            diagnostic.node = Some(root.node_at(diagnostic.start).id);
        }

        debug!(
            segments = self.parents.len(),
            diagnostics = diagnostics.len(),
            dropped,
            "assembled document"
        );
        Document::new(root, self.source, diagnostics, dropped, self.parents)
    }

    fn build(
        &mut self,
        raw: RawSegment,
        parent: Option<SegmentId>,
        diagnostics: &mut Diagnostics,
    ) -> Segment<'src> {
        let source = self.source;
        let id = SegmentId(self.parents.len());
        self.parents.push(parent);

        let mut segment = Segment {
            id,
            kind: SegmentKind::Text,
            tag_name: None,
            content: &source[raw.start..raw.end],
            start: raw.start,
            end: raw.end,
            children: Vec::new(),
            attributes: Vec::new(),
            name_span: None,
            close_name_span: None,
            self_closing: false,
            expression: None,
            path: self.path.clone(),
        };

        match raw.kind {
            RawKind::Text => {}
            RawKind::Template { inner } => {
                segment.kind = SegmentKind::Template;
                segment.expression = Some(inner.slice(source).trim());
            }
            RawKind::Element {
                class,
                name,
                open_end,
                close,
                self_closing,
            } => {
                let info = StructuralParser::new(source, diagnostics)
                    .parse_element(raw.start, open_end, close, name);
                segment.kind = match class {
                    TagClass::Structural => SegmentKind::Tag,
                    TagClass::Meta => SegmentKind::Meta,
                };
                segment.tag_name = Some(info.name.slice(source));
                segment.name_span = Some(info.name);
                segment.close_name_span = info.close_name;
                segment.attributes = info.attributes;
                segment.self_closing = self_closing;
            }
        }

        segment.children = raw
            .children
            .into_iter()
            .map(|child| self.build(child, Some(id), diagnostics))
            .collect();
        segment
    }
}
