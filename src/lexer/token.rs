use serde::Serialize;

/// Lexical token kinds, listed in matching precedence order.
///
/// Kinds that share a prefix are ordered longer first: `</` is tried before
/// `<`, and `/>` before `>`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub enum TokenKind {
    /// `<!-- ... -->`, line breaks included.
    Comment,
    /// `{{`
    TemplateOpen,
    /// `}}`
    TemplateClose,
    /// `</`
    ClosingTagStart,
    /// `/>`
    SelfClose,
    /// `<`
    TagStart,
    /// `>`
    TagEnd,
    /// `=`
    Equals,
    /// `"` or `'`
    Quote,
    /// Tag or attribute name.
    Identifier,
    /// Characters inside a quoted attribute value.
    AttributeText,
    /// Anything else: prose, template expressions, stray characters.
    RawText,
}

impl TokenKind {
    /// Returns true for the delimiters that open or close a tag.
    pub fn is_tag_delimiter(self) -> bool {
        matches!(
            self,
            TokenKind::ClosingTagStart | TokenKind::SelfClose | TokenKind::TagStart | TokenKind::TagEnd
        )
    }
}

/// A token with absolute byte offsets into the tokenized source.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct Token<'src> {
    pub kind: TokenKind,
    pub text: &'src str,
    pub start: usize,
    pub end: usize,
}

impl<'src> Token<'src> {
    pub fn new(kind: TokenKind, text: &'src str, start: usize) -> Self {
        Self {
            kind,
            text,
            start,
            end: start + text.len(),
        }
    }

    pub fn is(&self, kind: TokenKind) -> bool {
        self.kind == kind
    }
}
