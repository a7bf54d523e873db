//! Tokenizer for tag regions and mixed content.
//!
//! Token rules are small `nom` parsers (`rules`), tried by a mode-aware cursor
//! (`cursor`) in the fixed precedence order of [`TokenKind`]. Whitespace
//! between tokens is skipped outside attribute values and templates.

mod cursor;
mod position;
pub(crate) mod rules;
mod token;

pub use cursor::{Lexer, Mode, tokenize};
pub use position::{LineIndex, Position};
pub use token::{Token, TokenKind};
