//! Parse entry point.
use std::sync::Arc;

use tracing::debug;

use crate::assembler::Assembler;
use crate::ast::Document;
use crate::config::ParserConfig;
use crate::error::{Diagnostics, Result};
use crate::registry::TagRegistry;
use crate::segmenter::Segmenter;

/// A configured parser bound to a tag registry.
///
/// The parser holds no per-parse state, so one instance can parse any number
/// of documents, and shared references can be used from several threads.
///
/// ```
/// use tagweave::{Parser, SegmentKind, TagSet};
///
/// let registry = TagSet::from_names(["task"], ["meta"]).unwrap();
/// let document = Parser::new(&registry).parse("<task>Analyze</task>");
/// assert_eq!(document.root.kind, SegmentKind::Tag);
/// assert_eq!(document.root.children[0].content, "Analyze");
/// ```
#[derive(Debug)]
pub struct Parser<'r, R: TagRegistry + ?Sized> {
    registry: &'r R,
    config: ParserConfig,
    path: Option<Arc<str>>,
}

impl<'r, R: TagRegistry + ?Sized> Parser<'r, R> {
    /// Creates a parser with the default configuration.
    pub fn new(registry: &'r R) -> Self {
        Self {
            registry,
            config: ParserConfig::default(),
            path: None,
        }
    }

    /// Creates a parser with a custom configuration, rejecting invalid ones.
    pub fn with_config(registry: &'r R, config: ParserConfig) -> Result<Self> {
        config.validate()?;
        Ok(Self {
            registry,
            config,
            path: None,
        })
    }

    /// Sets the source identifier copied onto every segment.
    pub fn with_path(mut self, path: impl Into<Arc<str>>) -> Self {
        self.path = Some(path.into());
        self
    }

    pub fn config(&self) -> &ParserConfig {
        &self.config
    }

    pub fn path(&self) -> Option<&str> {
        self.path.as_deref()
    }

    /// Parses `source` into a document.
    ///
    /// Malformed markup never fails: problems are reported as diagnostics
    /// on the returned document.
    pub fn parse<'src>(&self, source: &'src str) -> Document<'src> {
        debug!(len = source.len(), path = ?self.path, "parsing");
        let mut diagnostics = Diagnostics::with_max(self.config.max_diagnostics);
        let raw = Segmenter::new(source, self.registry, &self.config, &mut diagnostics)
            .segment_document();
        Assembler::new(source, self.path.clone()).assemble(raw, diagnostics)
    }

    /// Parses UTF-8 bytes, failing if they are not valid UTF-8.
    pub fn parse_bytes<'src>(&self, bytes: &'src [u8]) -> Result<Document<'src>> {
        let source = std::str::from_utf8(bytes)?;
        Ok(self.parse(source))
    }
}
