//! Bounded recursive-descent JSON parser. JWTs and JWKs
//! arrive over attacker-influenced channels; every limit here exists so
//! that a pathological payload cannot exhaust memory or stack without
//! a conscious limit change by the caller.

use super::object::Object;
use super::value::{classify_numeral, validate_numeral, Arr, NumClass, Numeral, Value};
use crate::error::{here, Error, Result};

/// Parser configuration. Any breach fails parsing with
/// [`Error::JsonLimitViolation`].
#[derive(Debug, Clone, Copy)]
pub struct Limits {
    pub max_json_bytes: usize,
    pub max_recursion_depth: usize,
    pub max_numeral_length: usize,
    pub max_string_bytes: usize,
    pub max_array_elements: usize,
    pub max_object_members: usize,
}

impl Default for Limits {
    fn default() -> Self {
        Limits {
            max_json_bytes: 1 << 20,
            max_recursion_depth: 64,
            max_numeral_length: 64,
            max_string_bytes: 256 << 10,
            max_array_elements: 16_384,
            max_object_members: 4_096,
        }
    }
}

impl Limits {
    /// Tight limits for parsing a single JWK.
    pub fn for_jwk() -> Self {
        Limits {
            max_recursion_depth: 20,
            ..Limits::default()
        }
    }

    /// Tight limits for parsing a JWK Set.
    pub fn for_jwk_set() -> Self {
        Limits {
            max_recursion_depth: 22,
            ..Limits::default()
        }
    }

    /// Limits for a JWS/JWT header.
    pub fn for_jose_header() -> Self {
        Limits {
            max_recursion_depth: 20,
            ..Limits::default()
        }
    }

    /// Limits for a JWT claim set.
    pub fn for_claims() -> Self {
        Limits {
            max_recursion_depth: 50,
            ..Limits::default()
        }
    }
}

struct Cursor<'a> {
    bytes: &'a [u8],
    pos: usize,
    depth: usize,
    limits: &'a Limits,
}

fn limit_violation(limit: &'static str, detail: impl Into<String>) -> Error {
    Error::JsonLimitViolation {
        limit,
        detail: detail.into(),
        loc: here!(),
    }
}

fn malformed(reason: impl Into<String>) -> Error {
    Error::MalformedJson {
        reason: reason.into(),
        loc: here!(),
    }
}

impl<'a> Cursor<'a> {
    fn peek(&self) -> Option<u8> {
        self.bytes.get(self.pos).copied()
    }

    fn advance(&mut self) -> Option<u8> {
        let b = self.peek()?;
        self.pos += 1;
        Some(b)
    }

    fn skip_ws(&mut self) {
        while matches!(self.peek(), Some(b' ' | b'\t' | b'\n' | b'\r')) {
            self.pos += 1;
        }
    }

    fn expect(&mut self, b: u8) -> Result<()> {
        match self.advance() {
            Some(c) if c == b => Ok(()),
            Some(c) => Err(malformed(format!(
                "expected '{}' at byte {}, found '{}'",
                b as char, self.pos - 1, c as char
            ))),
            None => Err(malformed("unexpected end of input")),
        }
    }

    fn expect_literal(&mut self, lit: &str) -> Result<()> {
        for b in lit.bytes() {
            self.expect(b)?;
        }
        Ok(())
    }

    fn enter(&mut self) -> Result<()> {
        self.depth += 1;
        if self.depth > self.limits.max_recursion_depth {
            return Err(limit_violation(
                "max_recursion_depth",
                format!("depth {} exceeds {}", self.depth, self.limits.max_recursion_depth),
            ));
        }
        Ok(())
    }

    fn leave(&mut self) {
        self.depth -= 1;
    }

    fn parse_value(&mut self) -> Result<Value> {
        self.skip_ws();
        match self.peek() {
            Some(b'{') => self.parse_object(),
            Some(b'[') => self.parse_array(),
            Some(b'"') => self.parse_string().map(Value::String),
            Some(b't') => {
                self.expect_literal("true")?;
                Ok(Value::Bool(true))
            }
            Some(b'f') => {
                self.expect_literal("false")?;
                Ok(Value::Bool(false))
            }
            Some(b'n') => {
                self.expect_literal("null")?;
                Ok(Value::Null)
            }
            Some(b'-') | Some(b'0'..=b'9') => self.parse_number(),
            Some(c) => Err(malformed(format!("unexpected character '{}'", c as char))),
            None => Err(malformed("unexpected end of input")),
        }
    }

    fn parse_object(&mut self) -> Result<Value> {
        self.enter()?;
        let result = self.parse_object_inner();
        self.leave();
        result
    }

    fn parse_object_inner(&mut self) -> Result<Value> {
        self.expect(b'{')?;
        let mut obj = Object::new();
        self.skip_ws();
        if self.peek() == Some(b'}') {
            self.pos += 1;
            return Ok(Value::Object(obj));
        }
        loop {
            self.skip_ws();
            let key = self.parse_string()?;
            self.skip_ws();
            self.expect(b':')?;
            let value = self.parse_value()?;
            obj.add(key, value)?;
            if obj.len() > self.limits.max_object_members {
                return Err(limit_violation(
                    "max_object_members",
                    format!("member count exceeds {}", self.limits.max_object_members),
                ));
            }
            self.skip_ws();
            match self.advance() {
                Some(b',') => continue,
                Some(b'}') => break,
                Some(c) => return Err(malformed(format!("unexpected '{}' in object", c as char))),
                None => return Err(malformed("unterminated object")),
            }
        }
        Ok(Value::Object(obj))
    }

    fn parse_array(&mut self) -> Result<Value> {
        self.enter()?;
        let result = self.parse_array_inner();
        self.leave();
        result
    }

    fn parse_array_inner(&mut self) -> Result<Value> {
        self.expect(b'[')?;
        let mut arr = Arr::new();
        self.skip_ws();
        if self.peek() == Some(b']') {
            self.pos += 1;
            return Ok(Value::Array(arr));
        }
        loop {
            let value = self.parse_value()?;
            arr.append(value).expect("fresh array is never locked");
            if arr.count() > self.limits.max_array_elements {
                return Err(limit_violation(
                    "max_array_elements",
                    format!("element count exceeds {}", self.limits.max_array_elements),
                ));
            }
            self.skip_ws();
            match self.advance() {
                Some(b',') => continue,
                Some(b']') => break,
                Some(c) => return Err(malformed(format!("unexpected '{}' in array", c as char))),
                None => return Err(malformed("unterminated array")),
            }
        }
        Ok(Value::Array(arr))
    }

    fn parse_string(&mut self) -> Result<String> {
        self.expect(b'"')?;
        let mut out = String::new();
        loop {
            match self.advance() {
                None => return Err(malformed("unterminated string")),
                Some(b'"') => break,
                Some(b'\\') => {
                    let escaped = self.advance().ok_or_else(|| malformed("unterminated escape"))?;
                    match escaped {
                        b'"' => out.push('"'),
                        b'\\' => out.push('\\'),
                        b'/' => out.push('/'),
                        b'b' => out.push('\u{0008}'),
                        b'f' => out.push('\u{000C}'),
                        b'n' => out.push('\n'),
                        b'r' => out.push('\r'),
                        b't' => out.push('\t'),
                        b'u' => {
                            let first = self.parse_hex4()?;
                            let c = if (0xD800..=0xDBFF).contains(&first) {
                                self.expect(b'\\').map_err(|_| {
                                    malformed("unpaired high surrogate")
                                })?;
                                self.expect(b'u').map_err(|_| {
                                    malformed("unpaired high surrogate")
                                })?;
                                let second = self.parse_hex4()?;
                                if !(0xDC00..=0xDFFF).contains(&second) {
                                    return Err(malformed("invalid low surrogate"));
                                }
                                let combined = 0x10000
                                    + ((first - 0xD800) << 10)
                                    + (second - 0xDC00);
                                char::from_u32(combined)
                                    .ok_or_else(|| malformed("invalid surrogate pair"))?
                            } else if (0xDC00..=0xDFFF).contains(&first) {
                                return Err(malformed("unpaired low surrogate"));
                            } else {
                                char::from_u32(first)
                                    .ok_or_else(|| malformed("invalid \\u escape"))?
                            };
                            out.push(c);
                        }
                        c => return Err(malformed(format!("invalid escape '\\{}'", c as char))),
                    }
                }
                Some(b) if b < 0x20 => {
                    return Err(malformed("unescaped control character in string"))
                }
                Some(b) if b < 0x80 => out.push(b as char),
                Some(b) => {
                    // Multi-byte UTF-8 sequence: re-decode from the
                    // original byte slice so we don't have to hand-roll
                    // UTF-8 decoding here.
                    let start = self.pos - 1;
                    let len = utf8_len(b)?;
                    let end = start + len;
                    if end > self.bytes.len() {
                        return Err(malformed("truncated UTF-8 sequence"));
                    }
                    let s = std::str::from_utf8(&self.bytes[start..end])
                        .map_err(|_| malformed("invalid UTF-8 sequence"))?;
                    out.push_str(s);
                    self.pos = end;
                }
            }
            if out.len() > self.limits.max_string_bytes {
                return Err(limit_violation(
                    "max_string_bytes",
                    format!("string exceeds {} bytes", self.limits.max_string_bytes),
                ));
            }
        }
        Ok(out)
    }

    fn parse_hex4(&mut self) -> Result<u32> {
        let mut v = 0u32;
        for _ in 0..4 {
            let b = self.advance().ok_or_else(|| malformed("truncated \\u escape"))?;
            let digit = (b as char)
                .to_digit(16)
                .ok_or_else(|| malformed("invalid hex digit in \\u escape"))?;
            v = v * 16 + digit;
        }
        Ok(v)
    }

    fn parse_number(&mut self) -> Result<Value> {
        let start = self.pos;
        if self.peek() == Some(b'-') {
            self.pos += 1;
        }
        while matches!(self.peek(), Some(b'0'..=b'9')) {
            self.pos += 1;
        }
        if self.peek() == Some(b'.') {
            self.pos += 1;
            while matches!(self.peek(), Some(b'0'..=b'9')) {
                self.pos += 1;
            }
        }
        if matches!(self.peek(), Some(b'e' | b'E')) {
            self.pos += 1;
            if matches!(self.peek(), Some(b'+' | b'-')) {
                self.pos += 1;
            }
            while matches!(self.peek(), Some(b'0'..=b'9')) {
                self.pos += 1;
            }
        }
        let lexeme = std::str::from_utf8(&self.bytes[start..self.pos])
            .expect("numeral bytes are ASCII");
        if lexeme.len() > self.limits.max_numeral_length {
            return Err(limit_violation(
                "max_numeral_length",
                format!("numeral exceeds {} bytes", self.limits.max_numeral_length),
            ));
        }
        validate_numeral(lexeme)?;
        match classify_numeral(lexeme) {
            NumClass::Integer(v) => Ok(Value::Integer(v)),
            NumClass::Preserved => Ok(Value::Number(Numeral(lexeme.to_string()))),
        }
    }
}

fn utf8_len(first_byte: u8) -> Result<usize> {
    match first_byte {
        0xC0..=0xDF => Ok(2),
        0xE0..=0xEF => Ok(3),
        0xF0..=0xF7 => Ok(4),
        _ => Err(malformed("invalid UTF-8 leading byte")),
    }
}

/// Parses any JSON value, requiring the entire input to be consumed
/// (aside from surrounding whitespace).
pub fn parse(input: &str, limits: &Limits) -> Result<Value> {
    if input.len() > limits.max_json_bytes {
        return Err(limit_violation(
            "max_json_bytes",
            format!("input is {} bytes, limit is {}", input.len(), limits.max_json_bytes),
        ));
    }
    let mut cursor = Cursor {
        bytes: input.as_bytes(),
        pos: 0,
        depth: 0,
        limits,
    };
    let value = cursor.parse_value()?;
    cursor.skip_ws();
    if cursor.pos != cursor.bytes.len() {
        return Err(malformed("trailing garbage after top-level value"));
    }
    Ok(value)
}

/// Parses a JSON value that must be an object at the top level.
pub fn parse_object(input: &str, limits: &Limits) -> Result<Value> {
    let value = parse(input, limits)?;
    if !value.is_object() {
        return Err(Error::NotJsonObject { loc: here!() });
    }
    Ok(value)
}
