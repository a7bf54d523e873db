//! Coarse segmentation of mixed content into a tree of typed spans.
//!
//! The segmenter only decides *where* segments are. It records byte ranges
//! and, for elements, where the opening tag ends and where the closing tag
//! sits; the structural parser later reads names and attributes from those
//! regions.
use memchr::{memchr, memchr2, memchr3};
use tracing::{debug, trace};

use crate::ast::Span;
use crate::config::ParserConfig;
use crate::error::{Diagnostic, DiagnosticKind, Diagnostics};
use crate::lexer::rules::{COMMENT_CLOSE, COMMENT_OPEN, TEMPLATE_OPEN, identifier};
use crate::registry::{TagClass, TagRegistry};

/// What a raw segment is, with the ranges later stages need.
#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) enum RawKind {
    Text,
    /// `inner` is the range between `{{` and `}}`.
    Template { inner: Span },
    Element {
        class: TagClass,
        /// Name range as found by the opening scan.
        name: Span,
        /// End of the opening tag (after `>` or `/>`).
        open_end: usize,
        /// Whole closing tag, `</name>`; `None` when self-closing.
        close: Option<Span>,
        self_closing: bool,
    },
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) struct RawSegment {
    pub kind: RawKind,
    pub start: usize,
    pub end: usize,
    pub children: Vec<RawSegment>,
}

impl RawSegment {
    fn text(start: usize, end: usize) -> Self {
        Self {
            kind: RawKind::Text,
            start,
            end,
            children: Vec::new(),
        }
    }

    fn template(start: usize, end: usize) -> Self {
        Self {
            kind: RawKind::Template {
                inner: Span::new(start + TEMPLATE_OPEN.len(), end - TEMPLATE_OPEN.len()),
            },
            start,
            end,
            children: Vec::new(),
        }
    }
}

/// Result of scanning an opening tag after its name.
enum OpenTag {
    Complete { end: usize, self_closing: bool },
    Malformed,
}

pub(crate) struct Segmenter<'a, R: TagRegistry + ?Sized> {
    source: &'a str,
    registry: &'a R,
    config: &'a ParserConfig,
    diagnostics: &'a mut Diagnostics,
}

impl<'a, R: TagRegistry + ?Sized> Segmenter<'a, R> {
    pub(crate) fn new(
        source: &'a str,
        registry: &'a R,
        config: &'a ParserConfig,
        diagnostics: &'a mut Diagnostics,
    ) -> Self {
        Self {
            source,
            registry,
            config,
            diagnostics,
        }
    }

    /// Segments the whole source and returns the root.
    ///
    /// A single top-level segment spanning the input is itself the root;
    /// anything else is wrapped in a `Text` root covering the input.
    pub(crate) fn segment_document(&mut self) -> RawSegment {
        let len = self.source.len();
        if let Some(limit) = self.config.max_input_size
            && len > limit
        {
            debug!(len, limit, "input exceeds size limit, keeping it as text");
            self.diagnostics.push(Diagnostic::new(
                DiagnosticKind::InputTooLarge,
                0,
                len,
                format!("input of {} bytes exceeds the limit of {} bytes", len, limit),
            ));
            return RawSegment::text(0, len);
        }

        let mut segments = self.segment_range(0, len, 0);
        if segments.len() == 1 && segments[0].start == 0 && segments[0].end == len {
            return segments.remove(0);
        }
        let mut root = RawSegment::text(0, len);
        root.children = segments;
        root
    }

    /// Segments `source[start..end]`; `depth` is the number of enclosing elements.
    fn segment_range(&mut self, start: usize, end: usize, depth: usize) -> Vec<RawSegment> {
        let mut segments = Vec::new();
        let mut text_start = start;
        let mut i = start;

        while i < end {
            let Some(at) = self.next_boundary(i, end) else {
                break;
            };

            if self.source.as_bytes()[at] == b'{' {
                match self.template_close(at + TEMPLATE_OPEN.len(), end) {
                    Some(close) => {
                        flush_text(&mut segments, text_start, at);
                        trace!(start = at, end = close, "template");
                        segments.push(RawSegment::template(at, close));
                        i = close;
                        text_start = i;
                    }
                    // No close before the next markup: the delimiter is literal.
                    None => i = at + TEMPLATE_OPEN.len(),
                }
                continue;
            }

            let rest = &self.source[at..end];
            if rest.starts_with(COMMENT_OPEN) {
                i = rest
                    .find(COMMENT_CLOSE)
                    .map_or(end, |p| at + p + COMMENT_CLOSE.len());
                continue;
            }

            if rest.starts_with("</") {
                i = self.stray_closing_tag(at, end);
                continue;
            }

            let Some(name) = self.tag_name_at(at + 1, end) else {
                i = at + 1;
                continue;
            };
            let name_text = name.slice(self.source);
            let Some(class) = self.registry.classify(name_text) else {
                i = at + 1;
                continue;
            };

            let (open_end, self_closing) = match self.scan_open_tag(name.end, end) {
                OpenTag::Complete { end, self_closing } => (end, self_closing),
                OpenTag::Malformed => {
                    self.diagnostics.push(Diagnostic::new(
                        DiagnosticKind::MalformedTag,
                        at,
                        name.end,
                        format!("opening tag <{}> is never closed with '>'", name_text),
                    ));
                    i = self.resync_point(at, end);
                    debug!(tag = name_text, at, resume = i, "malformed tag, resynchronizing");
                    continue;
                }
            };

            let close = if self_closing {
                None
            } else {
                match self.find_close(name_text, open_end, end) {
                    Some(close) => Some(close),
                    None => {
                        self.diagnostics.push(Diagnostic::new(
                            DiagnosticKind::UnterminatedTag,
                            at,
                            open_end,
                            format!("<{}> has no matching </{}>", name_text, name_text),
                        ));
                        i = self.resync_point(open_end - 1, end);
                        debug!(tag = name_text, at, resume = i, "unterminated tag, resynchronizing");
                        continue;
                    }
                }
            };
            let element_end = close.map_or(open_end, |close| close.end);

            flush_text(&mut segments, text_start, at);
            i = element_end;
            text_start = i;

            if depth + 1 > self.config.max_nesting_depth {
                debug!(tag = name_text, depth, "nesting too deep, truncating to text");
                self.diagnostics.push(Diagnostic::new(
                    DiagnosticKind::NestingTooDeep,
                    at,
                    element_end,
                    format!(
                        "<{}> exceeds the maximum nesting depth of {}",
                        name_text, self.config.max_nesting_depth
                    ),
                ));
                segments.push(RawSegment::text(at, element_end));
                continue;
            }

            debug!(tag = name_text, ?class, start = at, end = element_end, "element");
            let children = match (class, close) {
                (TagClass::Structural, Some(close)) => {
                    if self.is_ambiguous_self_nesting(name_text, open_end, close.start) {
                        self.diagnostics.push(Diagnostic::new(
                            DiagnosticKind::AmbiguousSelfNesting,
                            at,
                            open_end,
                            format!(
                                "<{}> only wraps another <{}>; kept as a single node",
                                name_text, name_text
                            ),
                        ));
                        Vec::new()
                    } else {
                        self.segment_range(open_end, close.start, depth + 1)
                    }
                }
                _ => Vec::new(),
            };

            segments.push(RawSegment {
                kind: RawKind::Element {
                    class,
                    name,
                    open_end,
                    close,
                    self_closing,
                },
                start: at,
                end: element_end,
                children,
            });
        }

        flush_text(&mut segments, text_start, end);
        segments
    }

    /// Nearest `<` or `{{` at or after `from`.
    fn next_boundary(&self, from: usize, end: usize) -> Option<usize> {
        let bytes = self.source.as_bytes();
        let mut i = from;
        while i < end {
            let at = i + memchr2(b'<', b'{', &bytes[i..end])?;
            if bytes[at] == b'<' || bytes.get(at + 1) == Some(&b'{') && at + 1 < end {
                return Some(at);
            }
            i = at + 1;
        }
        None
    }

    /// End of the `}}` closing a template whose body starts at `from`, if it
    /// comes before any `<` or `{{`.
    fn template_close(&self, from: usize, end: usize) -> Option<usize> {
        let bytes = self.source.as_bytes();
        let mut i = from;
        while i < end {
            let at = i + memchr3(b'}', b'<', b'{', &bytes[i..end])?;
            let pair = at + 1 < end && bytes[at + 1] == bytes[at];
            match bytes[at] {
                b'<' => return None,
                b'{' if pair => return None,
                b'}' if pair => return Some(at + 2),
                _ => i = at + 1,
            }
        }
        None
    }

    /// Tag name starting at `from`, if followed by something that can
    /// continue an opening tag.
    fn tag_name_at(&self, from: usize, end: usize) -> Option<Span> {
        let rest = &self.source[from..end];
        let (after, name) = identifier(rest).ok()?;
        match after.chars().next() {
            None | Some('>' | '/') => {}
            Some(c) if c.is_whitespace() => {}
            Some(_) => return None,
        }
        Some(Span::new(from, from + name.len()))
    }

    /// Finds the `>` ending an opening tag whose name ends at `from`.
    ///
    /// Quoted values may contain `>`. If a quote is left open, the first `>`
    /// after the name ends the tag instead. A `<` outside quotes means the
    /// tag never closed.
    fn scan_open_tag(&self, from: usize, end: usize) -> OpenTag {
        let bytes = self.source.as_bytes();
        let complete = |i: usize| OpenTag::Complete {
            end: i + 1,
            self_closing: i > from && bytes[i - 1] == b'/',
        };

        let mut quote = None;
        for i in from..end {
            let b = bytes[i];
            match quote {
                Some(q) if b == q => quote = None,
                Some(_) => {}
                None => match b {
                    b'"' | b'\'' => quote = Some(b),
                    b'>' => return complete(i),
                    b'<' => return OpenTag::Malformed,
                    _ => {}
                },
            }
        }

        if quote.is_some() {
            for i in from..end {
                match bytes[i] {
                    b'>' => return complete(i),
                    b'<' => break,
                    _ => {}
                }
            }
        }
        OpenTag::Malformed
    }

    /// Closing tag `</name>` at `at`, returning its name range and end.
    fn closing_tag_at(&self, at: usize, end: usize) -> Option<(Span, usize)> {
        let name_start = at + 2;
        let rest = self.source.get(name_start..end)?;
        let (after, name) = identifier(rest).ok()?;
        let gap = after.len() - after.trim_start().len();
        if !after[gap..].starts_with('>') {
            return None;
        }
        let name_end = name_start + name.len();
        Some((Span::new(name_start, name_end), name_end + gap + 1))
    }

    /// Matching closing tag for `name`, searching from the end of its
    /// opening tag. Same-name openings in between nest; self-closing ones
    /// and anything inside comments do not.
    ///
    /// Other opening tags are stepped over whole, so their quoted values
    /// never hide a close. Outside meta bodies, a nested meta element is
    /// skipped up to its own close.
    fn find_close(&self, name: &str, from: usize, end: usize) -> Option<Span> {
        let bytes = self.source.as_bytes();
        let opaque = self.registry.classify(name) == Some(TagClass::Meta);
        let mut depth = 1usize;
        let mut i = from;
        while i < end {
            let at = i + memchr(b'<', &bytes[i..end])?;
            let rest = &self.source[at..end];

            if rest.starts_with(COMMENT_OPEN) {
                i = rest.find(COMMENT_CLOSE).map_or(end, |p| at + p + COMMENT_CLOSE.len());
                continue;
            }

            if rest.starts_with("</") {
                if let Some((close_name, close_end)) = self.closing_tag_at(at, end)
                    && close_name.slice(self.source).eq_ignore_ascii_case(name)
                {
                    depth -= 1;
                    if depth == 0 {
                        return Some(Span::new(at, close_end));
                    }
                    i = close_end;
                    continue;
                }
                i = at + 2;
                continue;
            }

            let Some(inner) = self.tag_name_at(at + 1, end) else {
                i = at + 1;
                continue;
            };
            let inner_name = inner.slice(self.source);
            let same_name = inner_name.eq_ignore_ascii_case(name);
            if opaque && !same_name {
                i = at + 1;
                continue;
            }
            let OpenTag::Complete {
                end: open_end,
                self_closing,
            } = self.scan_open_tag(inner.end, end)
            else {
                i = at + 1;
                continue;
            };

            i = open_end;
            if self_closing {
                continue;
            }
            if same_name {
                depth += 1;
            } else if self.registry.classify(inner_name) == Some(TagClass::Meta)
                && let Some(meta_close) = self.find_close(inner_name, open_end, end)
            {
                i = meta_close.end;
            }
        }
        None
    }

    /// True when the body `[start, end)`, ignoring surrounding whitespace,
    /// is exactly one element named `name`.
    fn is_ambiguous_self_nesting(&self, name: &str, start: usize, end: usize) -> bool {
        let body = &self.source[start..end];
        let inner_start = start + (body.len() - body.trim_start().len());
        let inner_end = end - (body.len() - body.trim_end().len());
        if inner_start >= inner_end || self.source.as_bytes()[inner_start] != b'<' {
            return false;
        }

        let Some(inner) = self.tag_name_at(inner_start + 1, inner_end) else {
            return false;
        };
        if !inner.slice(self.source).eq_ignore_ascii_case(name) {
            return false;
        }
        match self.scan_open_tag(inner.end, inner_end) {
            OpenTag::Complete {
                end: open_end,
                self_closing: true,
            } => open_end == inner_end,
            OpenTag::Complete { end: open_end, .. } => self
                .find_close(name, open_end, inner_end)
                .is_some_and(|close| close.end == inner_end),
            OpenTag::Malformed => false,
        }
    }

    /// Handles `</` at `at` in content. A well-formed closing tag of a
    /// registered name is reported and skipped as text.
    fn stray_closing_tag(&mut self, at: usize, end: usize) -> usize {
        if let Some((name, close_end)) = self.closing_tag_at(at, end) {
            let name_text = name.slice(self.source);
            if self.registry.classify(name_text).is_some() {
                self.diagnostics.push(Diagnostic::new(
                    DiagnosticKind::UnmatchedClosingTag,
                    at,
                    close_end,
                    format!("</{}> has no matching opening tag", name_text),
                ));
                return close_end;
            }
        }
        at + 1
    }

    /// Position after the end of the line containing `from`.
    fn resync_point(&self, from: usize, end: usize) -> usize {
        memchr(b'\n', &self.source.as_bytes()[from..end]).map_or(end, |p| from + p + 1)
    }
}

fn flush_text(segments: &mut Vec<RawSegment>, start: usize, end: usize) {
    if start < end {
        segments.push(RawSegment::text(start, end));
    }
}
