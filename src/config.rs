/// Parser configuration and its fluent builder.
use crate::error::{ParseError, Result};

/// Limits and options that shape a parse.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ParserConfig {
    /// Maximum tag nesting depth; deeper tags become opaque text
    pub max_nesting_depth: usize,
    /// Maximum input size in bytes; larger inputs become a single text node
    pub max_input_size: Option<usize>,
    /// Maximum number of diagnostics retained per parse
    pub max_diagnostics: Option<usize>,
}

impl Default for ParserConfig {
    fn default() -> Self {
        Self {
            max_nesting_depth: 64,
            max_input_size: Some(100 * 1024 * 1024), // 100MB default limit
            max_diagnostics: Some(100),
        }
    }
}

impl ParserConfig {
    /// Creates a builder for configuring the parser.
    pub fn builder() -> ParserConfigBuilder {
        ParserConfigBuilder::new()
    }

    /// Rejects configurations no parse could run under.
    pub fn validate(&self) -> Result<()> {
        if self.max_nesting_depth == 0 {
            return Err(ParseError::invalid_config(
                "max_nesting_depth must be at least 1",
            ));
        }
        Ok(())
    }
}

/// Builder for [`ParserConfig`].
#[derive(Debug, Default)]
pub struct ParserConfigBuilder {
    config: ParserConfig,
}

impl ParserConfigBuilder {
    /// Creates a new builder with default configuration.
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets maximum nesting depth for tags.
    pub fn max_nesting_depth(mut self, depth: usize) -> Self {
        self.config.max_nesting_depth = depth;
        self
    }

    /// Sets the input size limit; `None` disables it.
    pub fn max_input_size(mut self, size: Option<usize>) -> Self {
        self.config.max_input_size = size;
        self
    }

    /// Sets how many diagnostics are kept; `None` keeps all of them.
    pub fn max_diagnostics(mut self, max: Option<usize>) -> Self {
        self.config.max_diagnostics = max;
        self
    }

    /// Builds the final configuration.
    pub fn build(self) -> ParserConfig {
        self.config
    }
}
