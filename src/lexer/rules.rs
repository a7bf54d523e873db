use nom::IResult;
use nom::branch::alt;
use nom::bytes::complete::{tag, take_until, take_while, take_while1};
use nom::character::complete::{one_of, satisfy};
use nom::combinator::{recognize, rest};
use nom::error::{Error, ErrorKind};
use nom::sequence::{pair, tuple};

/// A token rule: recognizes a prefix of the input and returns it.
pub(crate) type Rule = fn(&str) -> IResult<&str, &str>;

pub(crate) const TEMPLATE_OPEN: &str = "{{";
pub(crate) const TEMPLATE_CLOSE: &str = "}}";
pub(crate) const COMMENT_OPEN: &str = "<!--";
pub(crate) const COMMENT_CLOSE: &str = "-->";

/// `<!-- ... -->`. An unterminated comment runs to the end of the input.
pub(crate) fn comment(input: &str) -> IResult<&str, &str> {
    alt((
        recognize(tuple((
            tag(COMMENT_OPEN),
            take_until(COMMENT_CLOSE),
            tag(COMMENT_CLOSE),
        ))),
        recognize(pair(tag(COMMENT_OPEN), rest)),
    ))(input)
}

pub(crate) fn template_open(input: &str) -> IResult<&str, &str> {
    tag(TEMPLATE_OPEN)(input)
}

pub(crate) fn template_close(input: &str) -> IResult<&str, &str> {
    tag(TEMPLATE_CLOSE)(input)
}

pub(crate) fn closing_tag_start(input: &str) -> IResult<&str, &str> {
    tag("</")(input)
}

pub(crate) fn self_close(input: &str) -> IResult<&str, &str> {
    tag("/>")(input)
}

pub(crate) fn tag_start(input: &str) -> IResult<&str, &str> {
    tag("<")(input)
}

pub(crate) fn tag_end(input: &str) -> IResult<&str, &str> {
    tag(">")(input)
}

pub(crate) fn equals(input: &str) -> IResult<&str, &str> {
    tag("=")(input)
}

pub(crate) fn quote(input: &str) -> IResult<&str, &str> {
    recognize(one_of("\"'"))(input)
}

pub(crate) fn is_name_start(c: char) -> bool {
    c.is_alphabetic() || c == '_'
}

pub(crate) fn is_name_char(c: char) -> bool {
    c.is_alphanumeric() || matches!(c, '_' | '-' | '.')
}

/// Tag or attribute name: a letter or `_`, then letters, digits, `_`, `-`, `.`.
pub(crate) fn identifier(input: &str) -> IResult<&str, &str> {
    recognize(pair(satisfy(is_name_start), take_while(is_name_char)))(input)
}

pub(crate) fn whitespace(input: &str) -> IResult<&str, &str> {
    take_while1(char::is_whitespace)(input)
}

/// Prose between tags: everything up to the next `<` or `{{`.
pub(crate) fn raw_text(input: &str) -> IResult<&str, &str> {
    take_until_any(input, &["<", TEMPLATE_OPEN])
}

/// Stray characters inside a tag that are neither names nor delimiters.
pub(crate) fn tag_text(input: &str) -> IResult<&str, &str> {
    take_while1(|c: char| !c.is_whitespace() && !"<>/=\"'{".contains(c))(input)
}

/// Quoted attribute value text, up to the closing quote or a template.
pub(crate) fn attribute_text(input: &str, quote: char) -> IResult<&str, &str> {
    let mut buf = [0u8; 4];
    let quote: &str = quote.encode_utf8(&mut buf);
    take_until_any(input, &[quote, TEMPLATE_OPEN])
}

/// Template expression body, up to `}}` (or the enclosing quote, if any).
pub(crate) fn expression_text(input: &str, quote: Option<char>) -> IResult<&str, &str> {
    let mut buf = [0u8; 4];
    match quote {
        Some(q) => {
            let q: &str = q.encode_utf8(&mut buf);
            take_until_any(input, &[TEMPLATE_CLOSE, q])
        }
        None => take_until_any(input, &[TEMPLATE_CLOSE]),
    }
}

/// Consumes a non-empty run that stops before the earliest of `stops`.
fn take_until_any<'a>(input: &'a str, stops: &[&str]) -> IResult<&'a str, &'a str> {
    let end = stops
        .iter()
        .filter_map(|stop| input.find(stop))
        .min()
        .unwrap_or(input.len());
    if end == 0 {
        return Err(nom::Err::Error(Error::new(input, ErrorKind::TakeUntil)));
    }
    Ok((&input[end..], &input[..end]))
}
