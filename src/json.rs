//! Minimal JSON value model used for mod manifests and the registry
//! configuration file.
//!
//! The grammar is a strict subset of JSON with two deliberate differences:
//! there is no `null`/`true`/`false`, and string escapes are not decoded. A
//! backslash and the character after it are both kept verbatim, so `"a\nb"`
//! parses to the four characters `a`, `\`, `n`, `b` and serializes back to the
//! same text.

use std::collections::BTreeMap;
use std::fmt::{self, Write as _};
use std::iter::Peekable;
use std::str::{CharIndices, FromStr};

use serde::ser::{Serialize, SerializeMap, SerializeSeq, Serializer};
use thiserror::Error;

pub type Object = BTreeMap<String, JsonValue>;
pub type Array = Vec<JsonValue>;

#[derive(Debug, Clone, PartialEq)]
pub enum JsonValue {
    Integer(i64),
    Float(f64),
    String(String),
    Object(Object),
    Array(Array),
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum JsonError {
    #[error("unexpected character '{found}' at offset {offset} when {context}")]
    UnexpectedCharacter {
        found: char,
        context: &'static str,
        offset: usize,
    },
    #[error("end of input when looking for {expected}")]
    EndOfInput { expected: &'static str },
}

impl JsonValue {
    /// Parses a document. Empty (or whitespace-only) input is an empty object;
    /// anything after the first complete value is ignored.
    pub fn parse(text: &str) -> Result<JsonValue, JsonError> {
        let mut parser = Parser {
            chars: text.char_indices().peekable(),
        };

        parser.skip_whitespace();
        if parser.chars.peek().is_none() {
            return Ok(JsonValue::Object(Object::new()));
        }

        parser.value()
    }

    pub fn type_name(&self) -> &'static str {
        match self {
            JsonValue::Integer(_) => "integer",
            JsonValue::Float(_) => "float",
            JsonValue::String(_) => "string",
            JsonValue::Object(_) => "object",
            JsonValue::Array(_) => "array",
        }
    }

    pub fn as_str(&self) -> Option<&str> {
        match self {
            JsonValue::String(s) => Some(s),
            _ => None,
        }
    }

    pub fn as_integer(&self) -> Option<i64> {
        match self {
            JsonValue::Integer(i) => Some(*i),
            _ => None,
        }
    }

    pub fn as_object(&self) -> Option<&Object> {
        match self {
            JsonValue::Object(o) => Some(o),
            _ => None,
        }
    }

    pub fn as_array(&self) -> Option<&Array> {
        match self {
            JsonValue::Array(a) => Some(a),
            _ => None,
        }
    }

    fn write_to(&self, out: &mut impl fmt::Write) -> fmt::Result {
        match self {
            JsonValue::Integer(i) => write!(out, "{}", i),
            JsonValue::Float(f) => write_float(out, *f),
            JsonValue::String(s) => write!(out, "\"{}\"", s),
            JsonValue::Object(object) => {
                out.write_char('{')?;
                for (i, (key, value)) in object.iter().enumerate() {
                    if i > 0 {
                        out.write_char(',')?;
                    }
                    write!(out, "\"{}\":", key)?;
                    value.write_to(out)?;
                }
                out.write_char('}')
            }
            JsonValue::Array(array) => {
                out.write_char('[')?;
                for (i, value) in array.iter().enumerate() {
                    if i > 0 {
                        out.write_char(',')?;
                    }
                    value.write_to(out)?;
                }
                out.write_char(']')
            }
        }
    }
}

// Floats always carry a '.' so they parse back as floats.
fn write_float(out: &mut impl fmt::Write, value: f64) -> fmt::Result {
    if !value.is_finite() {
        return out.write_str("0.0");
    }

    let text = value.to_string();
    if text.contains('.') {
        out.write_str(&text)
    } else {
        write!(out, "{}.0", text)
    }
}

impl fmt::Display for JsonValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.write_to(f)
    }
}

impl FromStr for JsonValue {
    type Err = JsonError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        JsonValue::parse(s)
    }
}

impl From<i64> for JsonValue {
    fn from(value: i64) -> Self {
        JsonValue::Integer(value)
    }
}

impl From<f64> for JsonValue {
    fn from(value: f64) -> Self {
        JsonValue::Float(value)
    }
}

impl From<&str> for JsonValue {
    fn from(value: &str) -> Self {
        JsonValue::String(value.to_string())
    }
}

impl From<String> for JsonValue {
    fn from(value: String) -> Self {
        JsonValue::String(value)
    }
}

impl From<Object> for JsonValue {
    fn from(value: Object) -> Self {
        JsonValue::Object(value)
    }
}

impl From<Array> for JsonValue {
    fn from(value: Array) -> Self {
        JsonValue::Array(value)
    }
}

impl Serialize for JsonValue {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        match self {
            JsonValue::Integer(i) => serializer.serialize_i64(*i),
            JsonValue::Float(f) => serializer.serialize_f64(*f),
            JsonValue::String(s) => serializer.serialize_str(s),
            JsonValue::Object(object) => {
                let mut map = serializer.serialize_map(Some(object.len()))?;
                for (key, value) in object {
                    map.serialize_entry(key, value)?;
                }
                map.end()
            }
            JsonValue::Array(array) => {
                let mut seq = serializer.serialize_seq(Some(array.len()))?;
                for value in array {
                    seq.serialize_element(value)?;
                }
                seq.end()
            }
        }
    }
}

struct Parser<'a> {
    chars: Peekable<CharIndices<'a>>,
}

impl Parser<'_> {
    fn skip_whitespace(&mut self) {
        while let Some((_, ' ' | '\n' | '\r' | '\t')) = self.chars.peek() {
            self.chars.next();
        }
    }

    /// Skips whitespace and returns the next character without consuming it.
    fn peek_token(&mut self, expected: &'static str) -> Result<(usize, char), JsonError> {
        self.skip_whitespace();
        self.chars
            .peek()
            .copied()
            .ok_or(JsonError::EndOfInput { expected })
    }

    fn next_token(&mut self, expected: &'static str) -> Result<(usize, char), JsonError> {
        let token = self.peek_token(expected)?;
        self.chars.next();
        Ok(token)
    }

    fn value(&mut self) -> Result<JsonValue, JsonError> {
        let (offset, c) = self.peek_token("a value")?;

        match c {
            '{' => {
                self.chars.next();
                self.object().map(JsonValue::Object)
            }
            '[' => {
                self.chars.next();
                self.array().map(JsonValue::Array)
            }
            '"' => {
                self.chars.next();
                self.string().map(JsonValue::String)
            }
            '0'..='9' | '.' | '-' => Ok(self.number()),
            found => Err(JsonError::UnexpectedCharacter {
                found,
                context: "parsing a value",
                offset,
            }),
        }
    }

    fn object(&mut self) -> Result<Object, JsonError> {
        let mut object = Object::new();

        loop {
            let key = match self.next_token("an object key or '}'")? {
                (_, '"') => self.string()?,
                (_, '}') => break,
                (offset, found) => {
                    return Err(JsonError::UnexpectedCharacter {
                        found,
                        context: "parsing an object key",
                        offset,
                    })
                }
            };

            match self.next_token("':'")? {
                (_, ':') => {}
                (offset, found) => {
                    return Err(JsonError::UnexpectedCharacter {
                        found,
                        context: "looking for ':'",
                        offset,
                    })
                }
            }

            let value = self.value()?;
            // first occurrence of a duplicated key wins
            object.entry(key).or_insert(value);

            match self.next_token("',' or '}'")? {
                (_, ',') => {}
                (_, '}') => break,
                (offset, found) => {
                    return Err(JsonError::UnexpectedCharacter {
                        found,
                        context: "parsing an object",
                        offset,
                    })
                }
            }
        }

        Ok(object)
    }

    fn array(&mut self) -> Result<Array, JsonError> {
        let mut array = Array::new();

        loop {
            if let (_, ']') = self.peek_token("a value or ']'")? {
                self.chars.next();
                break;
            }

            array.push(self.value()?);

            match self.next_token("',' or ']'")? {
                (_, ',') => {}
                (_, ']') => break,
                (offset, found) => {
                    return Err(JsonError::UnexpectedCharacter {
                        found,
                        context: "parsing an array",
                        offset,
                    })
                }
            }
        }

        Ok(array)
    }

    /// Reads up to the closing quote; the opening quote is already consumed.
    fn string(&mut self) -> Result<String, JsonError> {
        let mut s = String::new();
        let mut escaped = false;

        for (_, c) in self.chars.by_ref() {
            if !escaped && c == '"' {
                return Ok(s);
            }

            escaped = !escaped && c == '\\';
            s.push(c);
        }

        Err(JsonError::EndOfInput {
            expected: "the end of a string",
        })
    }

    fn number(&mut self) -> JsonValue {
        let negative = matches!(self.chars.peek(), Some((_, '-')));
        if negative {
            self.chars.next();
        }

        let integral = self.digits();

        if !matches!(self.chars.peek(), Some((_, '.'))) {
            let text = format!("{}{}", if negative { "-" } else { "" }, integral);
            return match text.parse::<i64>() {
                Ok(i) => JsonValue::Integer(i),
                // too wide for i64 (or no digits at all)
                Err(_) if integral.is_empty() => JsonValue::Integer(0),
                Err(_) => JsonValue::Float(text.parse().unwrap_or(0.0)),
            };
        }

        self.chars.next();
        let fractional = self.digits();
        let text = format!(
            "{}{}.{}0",
            if negative { "-" } else { "" },
            if integral.is_empty() { "0" } else { &integral },
            fractional
        );

        JsonValue::Float(text.parse().unwrap_or(0.0))
    }

    fn digits(&mut self) -> String {
        let mut digits = String::new();

        while let Some(&(_, c)) = self.chars.peek() {
            if !c.is_ascii_digit() {
                break;
            }
            digits.push(c);
            self.chars.next();
        }

        digits
    }
}
