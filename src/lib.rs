//! Parser for prose interleaved with registered structural tags, meta-blocks
//! and `{{ template }}` expressions.
//!
//! Parsing runs in two stages. The segmenter partitions the source into a
//! tree of text, element and template spans. Only names known to the
//! [`TagRegistry`] become elements; everything else stays text. The
//! structural parser then reads each element's name and attributes. The
//! result is a [`Document`] whose segments borrow their content from the
//! source and carry exact byte ranges.
//!
//! ```
//! use tagweave::{SegmentKind, TagSet, parse};
//!
//! let registry = TagSet::from_names(["hint"], ["meta"]).unwrap();
//! let document = parse("<bogus>x</bogus><hint>y</hint>", &registry);
//!
//! assert_eq!(document.root.kind, SegmentKind::Text);
//! assert_eq!(document.root.children[0].content, "<bogus>x</bogus>");
//! assert_eq!(document.root.children[1].tag_name, Some("hint"));
//! ```

pub mod ast;
pub mod config;
pub mod error;
pub mod lexer;
pub mod parser;
pub mod registry;

mod assembler;
mod segmenter;
mod structure;

pub use ast::{
    Attribute, Descendants, Document, Segment, SegmentId, SegmentKind, Span, ValueFragment,
    Visitable, Visitor,
};
pub use config::{ParserConfig, ParserConfigBuilder};
pub use error::{Diagnostic, DiagnosticKind, Diagnostics, ParseError, Result, Severity};
pub use lexer::{Lexer, LineIndex, Position, Token, TokenKind, tokenize};
pub use parser::Parser;
pub use registry::{TagClass, TagRegistry, TagSet};

/// Parses `source` with the default configuration.
pub fn parse<'src, R: TagRegistry + ?Sized>(source: &'src str, registry: &R) -> Document<'src> {
    Parser::new(registry).parse(source)
}

/// Parses `source` with a custom configuration.
pub fn parse_with_config<'src, R: TagRegistry + ?Sized>(
    source: &'src str,
    registry: &R,
    config: ParserConfig,
) -> Result<Document<'src>> {
    Ok(Parser::with_config(registry, config)?.parse(source))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn registry() -> TagSet {
        TagSet::from_names(["task", "hint"], ["meta"]).unwrap()
    }

    #[test]
    fn test_pure_text() {
        let document = parse("hello world", &registry());
        assert_eq!(document.root.kind, SegmentKind::Text);
        assert_eq!(document.root.content, "hello world");
        assert!(document.root.children.is_empty());
        assert_eq!(document.len(), 1);
    }

    #[test]
    fn test_single_element() {
        let document = parse("<task>Analyze</task>", &registry());
        let root = &document.root;
        assert_eq!(root.kind, SegmentKind::Tag);
        assert_eq!(root.tag_name, Some("task"));
        assert_eq!(root.children.len(), 1);
        assert_eq!(root.children[0].kind, SegmentKind::Text);
        assert_eq!(root.children[0].content, "Analyze");
    }

    #[test]
    fn test_template_in_text() {
        let document = parse("Hello {{name}}!", &registry());
        let kinds: Vec<_> = document.root.children.iter().map(|s| s.kind).collect();
        assert_eq!(
            kinds,
            vec![SegmentKind::Text, SegmentKind::Template, SegmentKind::Text]
        );
        assert_eq!(document.root.children[0].content, "Hello ");
        assert_eq!(document.root.children[1].expression, Some("name"));
        assert_eq!(document.root.children[2].content, "!");
    }

    #[test]
    fn test_unknown_tag_stays_text() {
        let document = parse("<bogus>x</bogus><hint>y</hint>", &registry());
        let children = &document.root.children;
        assert_eq!(children.len(), 2);
        assert_eq!(children[0].kind, SegmentKind::Text);
        assert_eq!(children[0].content, "<bogus>x</bogus>");
        assert_eq!(children[1].kind, SegmentKind::Tag);
        assert_eq!(children[1].tag_name, Some("hint"));
    }

    #[test]
    fn test_unterminated_tag_recovers() {
        let document = parse("<task>a\n<hint>b</hint>", &registry());
        let children = &document.root.children;
        assert_eq!(children[0].kind, SegmentKind::Text);
        assert_eq!(children[0].content, "<task>a\n");
        assert_eq!(children[1].tag_name, Some("hint"));
        assert_eq!(children[1].children[0].content, "b");
        assert!(document.has_errors());
    }

    #[test]
    fn test_meta_body_is_opaque() {
        let source = "<meta>{ \"x\": 1 }</meta>";
        let document = parse(source, &registry());
        assert_eq!(document.root.kind, SegmentKind::Meta);
        assert!(document.root.children.is_empty());
        assert_eq!(document.root.content, source);
    }

    #[test]
    fn test_parse_with_config() {
        let config = ParserConfig::builder().max_nesting_depth(0).build();
        assert!(parse_with_config("x", &registry(), config).is_err());
    }
}
