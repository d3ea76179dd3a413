//! PDF lexer (tokenizer).
//!
//! Splits a byte slice into PDF tokens: numbers, literal and hex strings,
//! names, the `true`/`false`/`null` keywords, the object and stream markers,
//! and the `[ ] << >>` delimiters. Whitespace and `%` comments between tokens
//! are skipped.

use nom::{
    branch::alt,
    bytes::complete::{tag, take_while},
    character::complete::{char, digit0, digit1, one_of},
    combinator::{map, not, opt, recognize, value},
    sequence::{pair, preceded, terminated, tuple},
    IResult,
};

/// Token types recognized by the PDF lexer.
#[derive(Debug, PartialEq, Clone)]
pub enum Token<'a> {
    /// Integer number
    Integer(i64),
    /// Real number
    Real(f64),
    /// Raw literal string content, escapes not yet decoded
    LiteralString(&'a [u8]),
    /// Raw hex string content, may contain whitespace
    HexString(&'a [u8]),
    /// Name with `#xx` escapes decoded
    Name(String),
    /// `true`
    True,
    /// `false`
    False,
    /// `null`
    Null,
    /// `[`
    ArrayStart,
    /// `]`
    ArrayEnd,
    /// `<<`
    DictStart,
    /// `>>`
    DictEnd,
    /// `obj`
    ObjStart,
    /// `endobj`
    ObjEnd,
    /// `stream`
    StreamStart,
    /// `endstream`
    StreamEnd,
    /// `R` in an indirect reference
    R,
}

/// PDF whitespace characters.
pub fn is_whitespace(c: u8) -> bool {
    matches!(c, b' ' | b'\t' | b'\r' | b'\n' | 0x00 | 0x0C)
}

fn is_delimiter(c: u8) -> bool {
    matches!(c, b'(' | b')' | b'<' | b'>' | b'[' | b']' | b'{' | b'}' | b'/' | b'%')
}

fn is_regular(c: u8) -> bool {
    !is_whitespace(c) && !is_delimiter(c)
}

/// Skip whitespace and comments.
pub fn skip_ws(mut input: &[u8]) -> &[u8] {
    loop {
        match input.first() {
            Some(&c) if is_whitespace(c) => input = &input[1..],
            Some(b'%') => {
                let end = input
                    .iter()
                    .position(|&c| c == b'\r' || c == b'\n')
                    .unwrap_or(input.len());
                input = &input[end..];
            },
            _ => return input,
        }
    }
}

fn fail(input: &[u8], kind: nom::error::ErrorKind) -> nom::Err<nom::error::Error<&[u8]>> {
    nom::Err::Error(nom::error::Error::new(input, kind))
}

fn number(input: &[u8]) -> IResult<&[u8], Token<'_>> {
    let (rest, text) = recognize(pair(
        opt(one_of("+-")),
        alt((
            recognize(pair(digit1, opt(pair(char('.'), digit0)))),
            recognize(pair(char('.'), digit1)),
        )),
    ))(input)?;

    let text = std::str::from_utf8(text).map_err(|_| fail(input, nom::error::ErrorKind::Digit))?;
    let tok = if text.contains('.') {
        Token::Real(
            text.parse()
                .map_err(|_| fail(input, nom::error::ErrorKind::Float))?,
        )
    } else {
        Token::Integer(
            text.parse()
                .map_err(|_| fail(input, nom::error::ErrorKind::Digit))?,
        )
    };
    Ok((rest, tok))
}

/// Content between balanced parentheses. Escaped parentheses do not count
/// toward the nesting depth.
fn literal_string(input: &[u8]) -> IResult<&[u8], Token<'_>> {
    let (body, _) = char('(')(input)?;
    let mut depth = 1usize;
    let mut i = 0;
    while i < body.len() {
        match body[i] {
            b'\\' => i += 2,
            b'(' => {
                depth += 1;
                i += 1;
            },
            b')' => {
                depth -= 1;
                if depth == 0 {
                    return Ok((&body[i + 1..], Token::LiteralString(&body[..i])));
                }
                i += 1;
            },
            _ => i += 1,
        }
    }
    Err(fail(input, nom::error::ErrorKind::Char))
}

fn hex_string(input: &[u8]) -> IResult<&[u8], Token<'_>> {
    map(
        tuple((
            terminated(char('<'), not(char('<'))),
            take_while(|c: u8| c.is_ascii_hexdigit() || is_whitespace(c)),
            char('>'),
        )),
        |(_, hex, _)| Token::HexString(hex),
    )(input)
}

/// Decode `#xx` escape sequences in a raw name. Malformed escapes are kept
/// as written.
pub fn decode_name_escapes(raw: &[u8]) -> String {
    let mut out = Vec::with_capacity(raw.len());
    let mut i = 0;
    while i < raw.len() {
        if raw[i] == b'#' && i + 2 < raw.len() {
            let pair = std::str::from_utf8(&raw[i + 1..i + 3]).ok();
            if let Some(byte) = pair.and_then(|p| u8::from_str_radix(p, 16).ok()) {
                out.push(byte);
                i += 3;
                continue;
            }
        }
        out.push(raw[i]);
        i += 1;
    }
    String::from_utf8_lossy(&out).into_owned()
}

fn name(input: &[u8]) -> IResult<&[u8], Token<'_>> {
    map(preceded(char('/'), take_while(is_regular)), |raw: &[u8]| {
        Token::Name(decode_name_escapes(raw))
    })(input)
}

fn delimiter(input: &[u8]) -> IResult<&[u8], Token<'_>> {
    alt((
        value(Token::DictStart, tag(b"<<")),
        value(Token::DictEnd, tag(b">>")),
        value(Token::ArrayStart, tag(b"[")),
        value(Token::ArrayEnd, tag(b"]")),
    ))(input)
}

fn keyword(input: &[u8]) -> IResult<&[u8], Token<'_>> {
    let (rest, tok) = alt((
        value(Token::True, tag(b"true")),
        value(Token::False, tag(b"false")),
        value(Token::Null, tag(b"null")),
        value(Token::ObjStart, tag(b"obj")),
        value(Token::ObjEnd, tag(b"endobj")),
        value(Token::StreamStart, tag(b"stream")),
        value(Token::StreamEnd, tag(b"endstream")),
        value(Token::R, tag(b"R")),
    ))(input)?;
    // "nullify" or "Rect" are not keywords
    match rest.first() {
        Some(&c) if is_regular(c) => Err(fail(input, nom::error::ErrorKind::Tag)),
        _ => Ok((rest, tok)),
    }
}

/// Parse a single PDF token after skipping leading whitespace and comments.
pub fn token(input: &[u8]) -> IResult<&[u8], Token<'_>> {
    let input = skip_ws(input);
    alt((delimiter, name, hex_string, literal_string, number, keyword))(input)
}
