use super::rules::{
    Rule, attribute_text, closing_tag_start, comment, equals, expression_text, identifier, quote,
    raw_text, self_close, tag_end, tag_start, tag_text, template_close, template_open, whitespace,
};
use super::token::{Token, TokenKind};

/// Lexical context of the cursor.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Mode {
    /// Prose between tags.
    Content,
    /// Between `<`/`</` and `>`/`/>`.
    Tag,
    /// Inside a quoted attribute value; carries the opening quote.
    Value(char),
    /// Between `{{` and `}}`; carries the quote of an enclosing value.
    Template(Option<char>),
}

const CONTENT_RULES: &[(TokenKind, Rule)] = &[
    (TokenKind::Comment, comment),
    (TokenKind::TemplateOpen, template_open),
    (TokenKind::TemplateClose, template_close),
    (TokenKind::ClosingTagStart, closing_tag_start),
    (TokenKind::TagStart, tag_start),
    (TokenKind::RawText, raw_text),
];

const TAG_RULES: &[(TokenKind, Rule)] = &[
    (TokenKind::TemplateOpen, template_open),
    (TokenKind::TemplateClose, template_close),
    (TokenKind::ClosingTagStart, closing_tag_start),
    (TokenKind::SelfClose, self_close),
    (TokenKind::TagStart, tag_start),
    (TokenKind::TagEnd, tag_end),
    (TokenKind::Equals, equals),
    (TokenKind::Quote, quote),
    (TokenKind::Identifier, identifier),
    (TokenKind::RawText, tag_text),
];

/// Tokenizer over a byte range of a source string.
///
/// The cursor keeps a stack of [`Mode`]s so that a quote inside a tag opens a
/// value, `{{` opens a template, and the matching delimiters return to the
/// enclosing context. Within each mode, rules are tried in the fixed order of
/// [`TokenKind`]. When nothing matches, a single character is emitted as
/// [`TokenKind::RawText`], so the cursor always advances.
#[derive(Debug, Clone)]
pub struct Lexer<'src> {
    source: &'src str,
    offset: usize,
    end: usize,
    modes: Vec<Mode>,
}

impl<'src> Lexer<'src> {
    pub fn new(source: &'src str) -> Self {
        Self::with_range(source, 0, source.len())
    }

    /// Tokenizes `source[start..end]`, reporting absolute offsets.
    pub fn with_range(source: &'src str, start: usize, end: usize) -> Self {
        let end = end.min(source.len());
        Self {
            source,
            offset: start.min(end),
            end,
            modes: vec![Mode::Content],
        }
    }

    /// Current byte offset.
    pub fn offset(&self) -> usize {
        self.offset
    }

    pub fn mode(&self) -> Mode {
        self.modes.last().copied().unwrap_or(Mode::Content)
    }

    pub fn is_at_end(&self) -> bool {
        self.offset >= self.end
    }

    pub fn peek_token(&self) -> Option<Token<'src>> {
        let mut lookahead = self.clone();
        lookahead.next_token()
    }

    pub fn next_token(&mut self) -> Option<Token<'src>> {
        loop {
            if self.is_at_end() {
                return None;
            }

            let mode = self.mode();
            if matches!(mode, Mode::Content | Mode::Tag) {
                self.skip_whitespace();
                if self.is_at_end() {
                    return None;
                }
            }

            let source = self.source;
            let current = &source[self.offset..self.end];
            let matched = match mode {
                Mode::Content => first_match(current, CONTENT_RULES),
                Mode::Tag => first_match(current, TAG_RULES),
                Mode::Value(q) => self.match_value(current, q),
                Mode::Template(q) => {
                    if q.is_some_and(|q| current.starts_with(q)) {
                        // Unterminated template inside a value: the quote wins.
                        self.modes.pop();
                        continue;
                    }
                    self.match_template(current, q)
                }
            };

            let (kind, consumed) = matched.unwrap_or_else(|| {
                let width = current.chars().next().map(char::len_utf8).unwrap_or(1);
                (TokenKind::RawText, width)
            });

            let start = self.offset;
            self.offset += consumed;
            let token = Token::new(kind, &source[start..self.offset], start);
            self.transition(&token);
            return Some(token);
        }
    }

    fn skip_whitespace(&mut self) {
        if let Ok((rest, _)) = whitespace(&self.source[self.offset..self.end]) {
            self.offset = self.end - rest.len();
        }
    }

    fn match_value(&self, input: &str, q: char) -> Option<(TokenKind, usize)> {
        if input.starts_with(q) {
            return Some((TokenKind::Quote, q.len_utf8()));
        }
        if let Ok((rest, _)) = template_open(input) {
            return Some((TokenKind::TemplateOpen, input.len() - rest.len()));
        }
        attribute_text(input, q)
            .ok()
            .map(|(rest, _)| (TokenKind::AttributeText, input.len() - rest.len()))
    }

    fn match_template(&self, input: &str, q: Option<char>) -> Option<(TokenKind, usize)> {
        if let Ok((rest, _)) = template_close(input) {
            return Some((TokenKind::TemplateClose, input.len() - rest.len()));
        }
        expression_text(input, q)
            .ok()
            .map(|(rest, _)| (TokenKind::RawText, input.len() - rest.len()))
    }

    fn transition(&mut self, token: &Token<'src>) {
        match (self.mode(), token.kind) {
            (Mode::Content, TokenKind::TagStart | TokenKind::ClosingTagStart) => {
                self.modes.push(Mode::Tag)
            }
            (Mode::Content | Mode::Tag, TokenKind::TemplateOpen) => {
                self.modes.push(Mode::Template(None))
            }
            (Mode::Tag, TokenKind::TagEnd | TokenKind::SelfClose) => self.pop_mode(),
            (Mode::Tag, TokenKind::Quote) => {
                if let Some(q) = token.text.chars().next() {
                    self.modes.push(Mode::Value(q));
                }
            }
            (Mode::Value(q), TokenKind::TemplateOpen) => self.modes.push(Mode::Template(Some(q))),
            (Mode::Value(_), TokenKind::Quote) => self.pop_mode(),
            (Mode::Template(_), TokenKind::TemplateClose) => self.pop_mode(),
            _ => {}
        }
    }

    fn pop_mode(&mut self) {
        if self.modes.len() > 1 {
            self.modes.pop();
        } else {
            self.modes[0] = Mode::Content;
        }
    }
}

impl<'src> Iterator for Lexer<'src> {
    type Item = Token<'src>;

    fn next(&mut self) -> Option<Self::Item> {
        self.next_token()
    }
}

fn first_match(input: &str, rules: &[(TokenKind, Rule)]) -> Option<(TokenKind, usize)> {
    rules.iter().find_map(|(kind, rule)| {
        rule(input)
            .ok()
            .map(|(rest, _)| (*kind, input.len() - rest.len()))
            .filter(|(_, consumed)| *consumed > 0)
    })
}

/// Tokenizes a whole string.
pub fn tokenize(source: &str) -> Vec<Token<'_>> {
    Lexer::new(source).collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use TokenKind::*;

    fn kinds(source: &str) -> Vec<TokenKind> {
        tokenize(source).into_iter().map(|t| t.kind).collect()
    }

    fn texts(source: &str) -> Vec<&str> {
        tokenize(source).into_iter().map(|t| t.text).collect()
    }

    #[test]
    fn test_opening_tag_with_attributes() {
        assert_eq!(
            kinds(r#"<task id="a" level='2'>"#),
            vec![
                TagStart, Identifier, Identifier, Equals, Quote, AttributeText, Quote, Identifier,
                Equals, Quote, AttributeText, Quote, TagEnd
            ]
        );
    }

    #[test]
    fn test_closing_start_takes_precedence_over_open() {
        assert_eq!(kinds("</task>"), vec![ClosingTagStart, Identifier, TagEnd]);
        assert_eq!(texts("</task>"), vec!["</", "task", ">"]);
    }

    #[test]
    fn test_self_close_takes_precedence_over_tag_end() {
        assert_eq!(kinds("<img src=\"x\"/>"), vec![
            TagStart, Identifier, Identifier, Equals, Quote, AttributeText, Quote, SelfClose
        ]);
    }

    #[test]
    fn test_comment_is_one_token() {
        let tokens = tokenize("a<!-- <b>\n c -->d");
        assert_eq!(tokens.len(), 3);
        assert_eq!(tokens[1].kind, Comment);
        assert_eq!(tokens[1].text, "<!-- <b>\n c -->");
        assert_eq!(tokens[2].start, 16);
    }

    #[test]
    fn test_template_in_content() {
        assert_eq!(kinds("Hello {{ name }}!"), vec![
            RawText, TemplateOpen, RawText, TemplateClose, RawText
        ]);
        assert_eq!(texts("Hello {{ name }}!")[2], " name ");
    }

    #[test]
    fn test_template_inside_attribute_value() {
        let tokens = tokenize(r#"<p title="Hi {{user}}, bye">"#);
        let value: Vec<_> = tokens
            .iter()
            .skip_while(|t| t.kind != Quote)
            .map(|t| (t.kind, t.text))
            .collect();
        assert_eq!(value, vec![
            (Quote, "\""),
            (AttributeText, "Hi "),
            (TemplateOpen, "{{"),
            (RawText, "user"),
            (TemplateClose, "}}"),
            (AttributeText, ", bye"),
            (Quote, "\""),
            (TagEnd, ">"),
        ]);
    }

    #[test]
    fn test_unterminated_template_in_value_yields_to_quote() {
        let tokens = tokenize(r#"<p a="{{x">"#);
        let tail: Vec<_> = tokens.iter().rev().take(3).map(|t| t.kind).collect();
        assert_eq!(tail, vec![TagEnd, Quote, RawText]);
    }

    #[test]
    fn test_whitespace_is_skipped_between_tag_tokens() {
        let tokens = tokenize("<task   a = \"1\" >");
        assert!(tokens.iter().all(|t| !t.text.trim().is_empty()));
        assert_eq!(tokens.last().map(|t| t.kind), Some(TagEnd));
    }

    #[test]
    fn test_unknown_character_still_advances() {
        let tokens = tokenize("<a @>");
        assert_eq!(tokens[2].kind, RawText);
        assert_eq!(tokens[2].text, "@");
        let tokens = tokenize("<a / b>");
        assert_eq!(tokens[2].text, "/");
        assert_eq!(tokens[3].kind, Identifier);
    }

    #[test]
    fn test_offsets_are_absolute_in_ranges() {
        let source = "xx<a>yy";
        let tokens: Vec<_> = Lexer::with_range(source, 2, 5).collect();
        assert_eq!(tokens[0].start, 2);
        assert_eq!(tokens[1].start, 3);
        assert_eq!(tokens[2].end, 5);
    }

    #[test]
    fn test_peek_does_not_advance() {
        let lexer = Lexer::new("<a>");
        let peeked = lexer.peek_token();
        assert_eq!(peeked.map(|t| t.kind), Some(TagStart));
        assert_eq!(lexer.offset(), 0);
    }
}
