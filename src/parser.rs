//! PDF object parser.
//!
//! Recursive descent over lexer tokens. Composite objects nest at most
//! [`MAX_DEPTH`] levels so hostile input cannot exhaust the stack.

use crate::error::{Error, Result};
use crate::lexer::{token, Token};
use crate::object::{Dictionary, Object, ObjectRef};
use nom::IResult;

/// Deepest array/dictionary nesting accepted by the parser.
pub const MAX_DEPTH: usize = 128;

fn fail(input: &[u8]) -> nom::Err<nom::error::Error<&[u8]>> {
    nom::Err::Error(nom::error::Error::new(input, nom::error::ErrorKind::Verify))
}

/// Decode escape sequences in the raw content of a literal string.
pub fn decode_literal_string_escapes(raw: &[u8]) -> Vec<u8> {
    let mut out = Vec::with_capacity(raw.len());
    let mut i = 0;
    while i < raw.len() {
        let c = raw[i];
        if c != b'\\' || i + 1 == raw.len() {
            out.push(c);
            i += 1;
            continue;
        }
        let esc = raw[i + 1];
        i += 2;
        match esc {
            b'n' => out.push(b'\n'),
            b'r' => out.push(b'\r'),
            b't' => out.push(b'\t'),
            b'b' => out.push(0x08),
            b'f' => out.push(0x0C),
            b'(' | b')' | b'\\' => out.push(esc),
            // line continuation
            b'\n' => {},
            b'\r' => {
                if raw.get(i) == Some(&b'\n') {
                    i += 1;
                }
            },
            b'0'..=b'7' => {
                let mut code = u32::from(esc - b'0');
                let mut taken = 1;
                while taken < 3 {
                    match raw.get(i) {
                        Some(&d @ b'0'..=b'7') => {
                            code = code * 8 + u32::from(d - b'0');
                            i += 1;
                            taken += 1;
                        },
                        _ => break,
                    }
                }
                out.push((code & 0xFF) as u8);
            },
            other => out.push(other),
        }
    }
    out
}

/// Decode the content of a hex string. Whitespace is ignored and an odd
/// trailing digit is padded with zero.
pub fn decode_hex(hex: &[u8]) -> Result<Vec<u8>> {
    fn nibble(c: u8) -> Option<u8> {
        match c {
            b'0'..=b'9' => Some(c - b'0'),
            b'a'..=b'f' => Some(c - b'a' + 10),
            b'A'..=b'F' => Some(c - b'A' + 10),
            _ => None,
        }
    }

    let mut out = Vec::with_capacity(hex.len() / 2 + 1);
    let mut high: Option<u8> = None;
    for (offset, &c) in hex.iter().enumerate() {
        if c.is_ascii_whitespace() || c == 0 {
            continue;
        }
        let n = nibble(c).ok_or_else(|| Error::ParseError {
            offset,
            reason: format!("invalid hex digit 0x{:02X}", c),
        })?;
        match high.take() {
            Some(h) => out.push(h << 4 | n),
            None => high = Some(n),
        }
    }
    if let Some(h) = high {
        out.push(h << 4);
    }
    Ok(out)
}

/// Parse a PDF object from input bytes.
pub fn parse_object(input: &[u8]) -> IResult<&[u8], Object> {
    parse_nested(input, 0)
}

fn parse_nested(input: &[u8], depth: usize) -> IResult<&[u8], Object> {
    if depth > MAX_DEPTH {
        return Err(nom::Err::Failure(nom::error::Error::new(
            input,
            nom::error::ErrorKind::TooLarge,
        )));
    }

    let (rest, tok) = token(input)?;
    match tok {
        Token::Null => Ok((rest, Object::Null)),
        Token::True => Ok((rest, Object::Boolean(true))),
        Token::False => Ok((rest, Object::Boolean(false))),
        Token::Real(r) => Ok((rest, Object::Real(r))),
        Token::Name(n) => Ok((rest, Object::Name(n))),
        Token::Integer(i) => Ok(reference_or_integer(rest, i)),
        Token::LiteralString(raw) => Ok((rest, Object::String(decode_literal_string_escapes(raw)))),
        Token::HexString(raw) => match decode_hex(raw) {
            Ok(bytes) => Ok((rest, Object::HexString(bytes))),
            Err(_) => Err(fail(input)),
        },
        Token::ArrayStart => {
            let mut items = Vec::new();
            let mut cursor = rest;
            loop {
                if let Ok((after, Token::ArrayEnd)) = token(cursor) {
                    return Ok((after, Object::Array(items)));
                }
                let (after, item) = parse_nested(cursor, depth + 1)?;
                items.push(item);
                cursor = after;
            }
        },
        Token::DictStart => {
            let (after, dict) = dictionary_body(rest, depth)?;
            match token(after) {
                Ok((data, Token::StreamStart)) => {
                    let (after, data) = stream_body(data, &dict)?;
                    Ok((
                        after,
                        Object::Stream {
                            dict,
                            data: bytes::Bytes::copy_from_slice(data),
                        },
                    ))
                },
                _ => Ok((after, Object::Dictionary(dict))),
            }
        },
        _ => Err(fail(input)),
    }
}

/// `N G R` is a reference; anything else leaves the integer alone.
fn reference_or_integer(rest: &[u8], value: i64) -> (&[u8], Object) {
    if let Ok((after_gen, Token::Integer(gen))) = token(rest) {
        if let Ok((after_r, Token::R)) = token(after_gen) {
            if let (Ok(id), Ok(gen)) = (u32::try_from(value), u16::try_from(gen)) {
                return (after_r, Object::Reference(ObjectRef::new(id, gen)));
            }
        }
    }
    (rest, Object::Integer(value))
}

fn dictionary_body(input: &[u8], depth: usize) -> IResult<&[u8], Dictionary> {
    let mut dict = Dictionary::new();
    let mut cursor = input;
    loop {
        let (after, tok) = token(cursor)?;
        match tok {
            Token::DictEnd => return Ok((after, dict)),
            Token::Name(key) => {
                let (after, value) = parse_nested(after, depth + 1)?;
                dict.insert(key, value);
                cursor = after;
            },
            _ => return Err(fail(cursor)),
        }
    }
}

/// Stream data follows `stream` and one EOL. A direct `/Length` is trusted
/// when `endstream` follows it; otherwise the data runs to the next
/// `endstream` keyword.
fn stream_body<'a>(input: &'a [u8], dict: &Dictionary) -> IResult<&'a [u8], &'a [u8]> {
    let data = input
        .strip_prefix(b"\r\n")
        .or_else(|| input.strip_prefix(b"\n"))
        .or_else(|| input.strip_prefix(b"\r"))
        .unwrap_or(input);

    if let Some(len) = dict
        .get("Length")
        .and_then(|l| l.as_integer())
        .and_then(|l| usize::try_from(l).ok())
    {
        if len <= data.len() {
            if let Ok((after, Token::StreamEnd)) = token(&data[len..]) {
                return Ok((after, &data[..len]));
            }
        }
    }

    let end = find_keyword(data, b"endstream").ok_or_else(|| fail(input))?;
    let mut body = &data[..end];
    if let Some(stripped) = body.strip_suffix(b"\n") {
        body = stripped.strip_suffix(b"\r").unwrap_or(stripped);
    } else if let Some(stripped) = body.strip_suffix(b"\r") {
        body = stripped;
    }
    Ok((&data[end + b"endstream".len()..], body))
}

pub(crate) fn find_keyword(haystack: &[u8], needle: &[u8]) -> Option<usize> {
    haystack.windows(needle.len()).position(|w| w == needle)
}

/// Parse `N G obj <object> endobj` and return the reference and the object.
/// A missing `endobj` is tolerated.
pub fn parse_indirect_object(input: &[u8]) -> IResult<&[u8], (ObjectRef, Object)> {
    let (rest, id) = match token(input)? {
        (rest, Token::Integer(id)) => (rest, id),
        _ => return Err(fail(input)),
    };
    let (rest, gen) = match token(rest)? {
        (rest, Token::Integer(gen)) => (rest, gen),
        _ => return Err(fail(input)),
    };
    let rest = match token(rest)? {
        (rest, Token::ObjStart) => rest,
        _ => return Err(fail(input)),
    };
    let (id, gen) = match (u32::try_from(id), u16::try_from(gen)) {
        (Ok(id), Ok(gen)) => (id, gen),
        _ => return Err(fail(input)),
    };
    let (rest, object) = parse_object(rest)?;
    let rest = match token(rest) {
        Ok((after, Token::ObjEnd)) => after,
        _ => rest,
    };
    Ok((rest, (ObjectRef::new(id, gen), object)))
}
