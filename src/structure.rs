//! Structural parsing of element tags.
//!
//! The segmenter has already delimited each element. This pass tokenizes the
//! opening tag region (and the closing tag, when there is one) to extract the
//! name ranges and the attribute list.
use crate::ast::{Attribute, Span, ValueFragment};
use crate::error::{Diagnostic, DiagnosticKind, Diagnostics};
use crate::lexer::{Lexer, Token, TokenKind};

/// Everything read from an element's tags.
#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) struct TagInfo<'src> {
    pub name: Span,
    pub attributes: Vec<Attribute<'src>>,
    pub close_name: Option<Span>,
}

pub(crate) struct StructuralParser<'src, 'd> {
    source: &'src str,
    diagnostics: &'d mut Diagnostics,
}

impl<'src, 'd> StructuralParser<'src, 'd> {
    pub(crate) fn new(source: &'src str, diagnostics: &'d mut Diagnostics) -> Self {
        Self {
            source,
            diagnostics,
        }
    }

    /// Parses the opening tag `[start, open_end)` and the optional closing tag.
    ///
    /// `fallback_name` is the name range found by the segmenter, used if the
    /// opening tag does not start with `<name`.
    pub(crate) fn parse_element(
        &mut self,
        start: usize,
        open_end: usize,
        close: Option<Span>,
        fallback_name: Span,
    ) -> TagInfo<'src> {
        let mut lexer = Lexer::with_range(self.source, start, open_end);
        let name = match (lexer.next_token(), lexer.next_token()) {
            (Some(open), Some(name))
                if open.is(TokenKind::TagStart) && name.is(TokenKind::Identifier) =>
            {
                Span::new(name.start, name.end)
            }
            _ => fallback_name,
        };

        let attributes = self.parse_attributes(&mut lexer);
        let close_name = close.and_then(|close| self.parse_closing_tag(close, name));

        TagInfo {
            name,
            attributes,
            close_name,
        }
    }

    fn parse_attributes(&mut self, lexer: &mut Lexer<'src>) -> Vec<Attribute<'src>> {
        let mut attributes = Vec::new();

        while let Some(token) = lexer.next_token() {
            match token.kind {
                TokenKind::TagEnd | TokenKind::SelfClose => break,
                TokenKind::Identifier => attributes.push(self.parse_attribute(lexer, token)),
                TokenKind::Quote => {
                    self.report(
                        DiagnosticKind::StrayQuote,
                        token.start,
                        token.end,
                        format!("stray {} outside of an attribute value", token.text),
                    );
                    // The lexer treats it as an opening quote; skip that value.
                    skip_value(lexer);
                }
                TokenKind::TemplateOpen => {
                    let fragment = self.parse_template(lexer, token);
                    let span = fragment.span();
                    self.report(
                        DiagnosticKind::UnexpectedToken,
                        span.start,
                        span.end,
                        "template expression outside of an attribute value",
                    );
                }
                _ => self.report(
                    DiagnosticKind::UnexpectedToken,
                    token.start,
                    token.end,
                    format!("unexpected '{}' in tag", token.text),
                ),
            }
        }

        attributes
    }

    fn parse_attribute(&mut self, lexer: &mut Lexer<'src>, key: Token<'src>) -> Attribute<'src> {
        let mut attribute = Attribute {
            key: key.text,
            key_span: Span::new(key.start, key.end),
            value: Vec::new(),
            value_span: None,
        };

        let Some(equals) = lexer.peek_token().filter(|t| t.is(TokenKind::Equals)) else {
            self.report(
                DiagnosticKind::MissingEquals,
                key.start,
                key.end,
                format!("attribute '{}' is missing '='", key.text),
            );
            return attribute;
        };
        lexer.next_token();

        let Some(value) = lexer.peek_token() else {
            self.missing_value(&key, equals.end);
            return attribute;
        };

        match value.kind {
            TokenKind::Quote => {
                lexer.next_token();
                let (fragments, span) = self.parse_quoted_value(lexer, value);
                attribute.value = fragments;
                attribute.value_span = Some(span);
            }
            TokenKind::Identifier | TokenKind::RawText => {
                lexer.next_token();
                self.unquoted(&key, value.start, value.end);
                attribute.value = vec![ValueFragment::Literal {
                    text: value.text,
                    span: Span::new(value.start, value.end),
                }];
                attribute.value_span = Some(Span::new(value.start, value.end));
            }
            TokenKind::TemplateOpen => {
                lexer.next_token();
                let fragment = self.parse_template(lexer, value);
                let span = fragment.span();
                self.unquoted(&key, span.start, span.end);
                attribute.value = vec![fragment];
                attribute.value_span = Some(span);
            }
            _ => self.missing_value(&key, equals.end),
        }

        attribute
    }

    /// Reads a quoted value after its opening quote. Returns the fragments
    /// and the range between the quotes.
    fn parse_quoted_value(
        &mut self,
        lexer: &mut Lexer<'src>,
        open: Token<'src>,
    ) -> (Vec<ValueFragment<'src>>, Span) {
        let mut fragments = Vec::new();
        let value_start = open.end;

        loop {
            let Some(token) = lexer.next_token() else {
                let end = lexer.offset();
                self.report(
                    DiagnosticKind::UnterminatedAttributeValue,
                    open.start,
                    end,
                    format!("attribute value opened with {} is never closed", open.text),
                );
                return (fragments, Span::new(value_start, end));
            };

            match token.kind {
                TokenKind::Quote => return (fragments, Span::new(value_start, token.start)),
                TokenKind::TemplateOpen => {
                    let fragment = self.parse_template(lexer, token);
                    self.push_fragment(&mut fragments, fragment);
                }
                _ => self.push_fragment(
                    &mut fragments,
                    ValueFragment::Literal {
                        text: token.text,
                        span: Span::new(token.start, token.end),
                    },
                ),
            }
        }
    }

    /// Reads a template after its `{{`. Without a closing `}}` the template is
    /// kept as literal text.
    fn parse_template(&mut self, lexer: &mut Lexer<'src>, open: Token<'src>) -> ValueFragment<'src> {
        let mut body_end = open.end;
        while let Some(token) = lexer.peek_token() {
            match token.kind {
                TokenKind::TemplateClose => {
                    lexer.next_token();
                    return ValueFragment::Template {
                        expression: self.source[open.end..token.start].trim(),
                        span: Span::new(open.start, token.end),
                    };
                }
                TokenKind::RawText => {
                    lexer.next_token();
                    body_end = token.end;
                }
                _ => break,
            }
        }

        self.report(
            DiagnosticKind::UnterminatedTemplate,
            open.start,
            body_end,
            "'{{' without a matching '}}'",
        );
        ValueFragment::Literal {
            text: &self.source[open.start..body_end],
            span: Span::new(open.start, body_end),
        }
    }

    /// Appends a fragment, merging adjacent literals.
    fn push_fragment(&self, fragments: &mut Vec<ValueFragment<'src>>, fragment: ValueFragment<'src>) {
        if let ValueFragment::Literal { span, .. } = &fragment
            && let Some(ValueFragment::Literal {
                text: previous,
                span: previous_span,
            }) = fragments.last_mut()
            && previous_span.end == span.start
        {
            previous_span.end = span.end;
            *previous = &self.source[previous_span.start..previous_span.end];
            return;
        }
        fragments.push(fragment);
    }

    /// Reads the name of the closing tag and compares it with the opening name.
    fn parse_closing_tag(&mut self, close: Span, open_name: Span) -> Option<Span> {
        let mut lexer = Lexer::with_range(self.source, close.start, close.end);
        let start = lexer.next_token().filter(|t| t.is(TokenKind::ClosingTagStart))?;
        let name = lexer.next_token().filter(|t| t.is(TokenKind::Identifier))?;
        let name_span = Span::new(name.start, name.end);

        let open_text = open_name.slice(self.source);
        if name.text != open_text {
            self.report(
                DiagnosticKind::ClosingTagMismatch,
                start.start,
                close.end,
                format!("</{}> closes <{}>", name.text, open_text),
            );
        }
        Some(name_span)
    }

    fn unquoted(&mut self, key: &Token<'src>, start: usize, end: usize) {
        self.report(
            DiagnosticKind::UnquotedAttributeValue,
            start,
            end,
            format!("value of '{}' should be quoted", key.text),
        );
    }

    fn missing_value(&mut self, key: &Token<'src>, at: usize) {
        self.report(
            DiagnosticKind::UnexpectedToken,
            key.start,
            at,
            format!("attribute '{}' has '=' but no value", key.text),
        );
    }

    fn report(&mut self, kind: DiagnosticKind, start: usize, end: usize, message: impl Into<String>) {
        self.diagnostics.push(Diagnostic::new(kind, start, end, message));
    }
}

fn skip_value(lexer: &mut Lexer<'_>) {
    while let Some(token) = lexer.next_token() {
        if token.is(TokenKind::Quote) {
            break;
        }
    }
}
