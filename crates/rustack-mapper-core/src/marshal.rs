//! Conversion between native attribute values and the DynamoDB wire format.
//!
//! A [`TypeDef`] describes how one column is stored; [`encode`] and [`decode`]
//! move a [`Value`] across the wire under that description. Numbers follow the
//! service's limits: at most 38 significant digits and a decimal magnitude in
//! `[-130, 125]`.

use std::collections::{BTreeMap, HashMap};
use std::fmt;

use bytes::Bytes;
use chrono::{DateTime, Utc};
use rustack_mapper_model::AttributeValue;
use uuid::Uuid;

use crate::schema::PathSegment;

/// Maximum number of significant digits allowed for DynamoDB numbers.
const MAX_SIGNIFICANT_DIGITS: usize = 38;

/// Largest decimal magnitude a number may have.
const MAX_MAGNITUDE: i64 = 125;

/// Smallest decimal magnitude a non-zero number may have.
const MIN_MAGNITUDE: i64 = -130;

// ---------------------------------------------------------------------------
// Error type
// ---------------------------------------------------------------------------

/// Errors produced while encoding or decoding attribute values.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum MarshalError {
    /// The value's shape does not match its declared type.
    #[error("Type mismatch: expected {expected}, found {found}")]
    TypeMismatch {
        /// Declared type.
        expected: String,
        /// What was supplied.
        found: String,
    },
    /// More significant digits than the service stores.
    #[error("Inexact number {0}: more than {MAX_SIGNIFICANT_DIGITS} significant digits")]
    Inexact(String),
    /// Magnitude above the supported range.
    #[error("Number overflow: {0}")]
    Overflow(String),
    /// Magnitude below the supported range.
    #[error("Number underflow: {0}")]
    Underflow(String),
    /// NaN or infinity.
    #[error("Non-finite number {0} cannot be stored")]
    NotFinite(String),
    /// Text that is not a decimal number at all.
    #[error("Invalid number: {0:?}")]
    InvalidNumber(String),
    /// A set whose element type is not backed by S, N or B.
    #[error("Set's typedef must be backed by one of S, N, B; got {0}")]
    InvalidSetType(String),
    /// A nested path that the declared type cannot follow.
    #[error("Cannot resolve path segment {segment} in {typedef}")]
    UnresolvedPath {
        /// The segment that failed.
        segment: String,
        /// The type it was applied to.
        typedef: String,
    },
}

// ---------------------------------------------------------------------------
// Type descriptors and native values
// ---------------------------------------------------------------------------

/// How a column is stored on the wire.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TypeDef {
    /// UTF-8 string, `S`.
    String,
    /// UUID stored as its hyphenated string, `S`.
    Uuid,
    /// Timestamp stored as RFC 3339 in UTC, `S`.
    DateTime,
    /// Arbitrary-precision decimal, `N`.
    Float,
    /// Integer, `N`. Fractional values are truncated in both directions.
    Integer,
    /// Raw bytes, `B`.
    Binary,
    /// Boolean, `BOOL`.
    Boolean,
    /// Homogeneous set; the element type must be backed by S, N or B.
    Set(Box<TypeDef>),
    /// Homogeneous list, `L`.
    List(Box<TypeDef>),
    /// Map with a fixed field schema, `M`.
    Map(Vec<(String, TypeDef)>),
    /// Map with arbitrary string keys and one value type, `M`.
    TypedMap(Box<TypeDef>),
}

impl TypeDef {
    /// Build a set type, rejecting element types that are not S/N/B backed.
    pub fn set(inner: TypeDef) -> Result<Self, MarshalError> {
        match inner.backing_type() {
            "S" | "N" | "B" => Ok(Self::Set(Box::new(inner))),
            _ => Err(MarshalError::InvalidSetType(inner.to_string())),
        }
    }

    /// Build a list type.
    #[must_use]
    pub fn list(inner: TypeDef) -> Self {
        Self::List(Box::new(inner))
    }

    /// Build a fixed-schema map type.
    pub fn map<K: Into<String>>(fields: impl IntoIterator<Item = (K, TypeDef)>) -> Self {
        Self::Map(fields.into_iter().map(|(k, t)| (k.into(), t)).collect())
    }

    /// Build a map type with arbitrary keys.
    #[must_use]
    pub fn typed_map(inner: TypeDef) -> Self {
        Self::TypedMap(Box::new(inner))
    }

    /// The DynamoDB type key values of this type are stored under.
    #[must_use]
    pub fn backing_type(&self) -> &'static str {
        match self {
            Self::String | Self::Uuid | Self::DateTime => "S",
            Self::Float | Self::Integer => "N",
            Self::Binary => "B",
            Self::Boolean => "BOOL",
            Self::Set(inner) => match inner.backing_type() {
                "N" => "NS",
                "B" => "BS",
                _ => "SS",
            },
            Self::List(_) => "L",
            Self::Map(_) | Self::TypedMap(_) => "M",
        }
    }

    /// The type of the element reached by following `path` from this type.
    pub fn at_path(&self, path: &[PathSegment]) -> Result<&TypeDef, MarshalError> {
        let mut current = self;
        for segment in path {
            current = match (current, segment) {
                (Self::List(inner), PathSegment::Index(_))
                | (Self::TypedMap(inner), PathSegment::Key(_)) => inner,
                (Self::Map(fields), PathSegment::Key(key)) => fields
                    .iter()
                    .find(|(name, _)| name == key)
                    .map(|(_, t)| t)
                    .ok_or_else(|| MarshalError::UnresolvedPath {
                        segment: segment.to_string(),
                        typedef: current.to_string(),
                    })?,
                _ => {
                    return Err(MarshalError::UnresolvedPath {
                        segment: segment.to_string(),
                        typedef: current.to_string(),
                    });
                }
            };
        }
        Ok(current)
    }
}

impl fmt::Display for TypeDef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::String => f.write_str("String"),
            Self::Uuid => f.write_str("UUID"),
            Self::DateTime => f.write_str("DateTime"),
            Self::Float => f.write_str("Float"),
            Self::Integer => f.write_str("Integer"),
            Self::Binary => f.write_str("Binary"),
            Self::Boolean => f.write_str("Boolean"),
            Self::Set(inner) => write!(f, "Set({inner})"),
            Self::List(inner) => write!(f, "List({inner})"),
            Self::Map(_) => f.write_str("Map"),
            Self::TypedMap(inner) => write!(f, "TypedMap({inner})"),
        }
    }
}

/// A native attribute value, before encoding or after decoding.
#[derive(Debug, Clone, PartialEq)]
pub enum Value {
    /// Text.
    String(String),
    /// Exact decimal text, e.g. `"1.333333333333333333333333333"`.
    Number(String),
    /// Binary floating point.
    Float(f64),
    /// Signed integer.
    Int(i64),
    /// Boolean.
    Bool(bool),
    /// Raw bytes.
    Binary(Bytes),
    /// UUID.
    Uuid(Uuid),
    /// UTC timestamp.
    DateTime(DateTime<Utc>),
    /// Set elements, in insertion order.
    Set(Vec<Value>),
    /// List elements.
    List(Vec<Value>),
    /// Map entries.
    Map(BTreeMap<String, Value>),
}

impl Value {
    /// Short name of the variant, used in type errors.
    #[must_use]
    pub fn kind(&self) -> &'static str {
        match self {
            Self::String(_) => "string",
            Self::Number(_) => "number",
            Self::Float(_) => "float",
            Self::Int(_) => "int",
            Self::Bool(_) => "bool",
            Self::Binary(_) => "binary",
            Self::Uuid(_) => "uuid",
            Self::DateTime(_) => "datetime",
            Self::Set(_) => "set",
            Self::List(_) => "list",
            Self::Map(_) => "map",
        }
    }
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::String(s) => write!(f, "{s:?}"),
            Self::Number(n) => f.write_str(n),
            Self::Float(v) => write!(f, "{v}"),
            Self::Int(v) => write!(f, "{v}"),
            Self::Bool(v) => write!(f, "{v}"),
            Self::Binary(b) => write!(f, "<{} bytes>", b.len()),
            Self::Uuid(u) => write!(f, "{u}"),
            Self::DateTime(dt) => f.write_str(&dt.to_rfc3339()),
            Self::Set(items) | Self::List(items) => {
                f.write_str("[")?;
                for (i, item) in items.iter().enumerate() {
                    if i > 0 {
                        f.write_str(", ")?;
                    }
                    write!(f, "{item}")?;
                }
                f.write_str("]")
            }
            Self::Map(entries) => {
                f.write_str("{")?;
                for (i, (k, v)) in entries.iter().enumerate() {
                    if i > 0 {
                        f.write_str(", ")?;
                    }
                    write!(f, "{k:?}: {v}")?;
                }
                f.write_str("}")
            }
        }
    }
}

impl From<&str> for Value {
    fn from(v: &str) -> Self {
        Self::String(v.to_owned())
    }
}

impl From<String> for Value {
    fn from(v: String) -> Self {
        Self::String(v)
    }
}

impl From<i64> for Value {
    fn from(v: i64) -> Self {
        Self::Int(v)
    }
}

impl From<i32> for Value {
    fn from(v: i32) -> Self {
        Self::Int(i64::from(v))
    }
}

impl From<f64> for Value {
    fn from(v: f64) -> Self {
        Self::Float(v)
    }
}

impl From<bool> for Value {
    fn from(v: bool) -> Self {
        Self::Bool(v)
    }
}

impl From<Uuid> for Value {
    fn from(v: Uuid) -> Self {
        Self::Uuid(v)
    }
}

impl From<DateTime<Utc>> for Value {
    fn from(v: DateTime<Utc>) -> Self {
        Self::DateTime(v)
    }
}

impl From<Bytes> for Value {
    fn from(v: Bytes) -> Self {
        Self::Binary(v)
    }
}

impl From<Vec<u8>> for Value {
    fn from(v: Vec<u8>) -> Self {
        Self::Binary(Bytes::from(v))
    }
}

// ---------------------------------------------------------------------------
// Encoding
// ---------------------------------------------------------------------------

fn mismatch(typedef: &TypeDef, found: &str) -> MarshalError {
    MarshalError::TypeMismatch {
        expected: typedef.to_string(),
        found: found.to_owned(),
    }
}

/// Encode a native value as a wire value of the given type.
pub fn encode(value: &Value, typedef: &TypeDef) -> Result<AttributeValue, MarshalError> {
    match (typedef, value) {
        (TypeDef::String, Value::String(s)) => Ok(AttributeValue::S(s.clone())),
        (TypeDef::Uuid, Value::Uuid(u)) => Ok(AttributeValue::S(u.hyphenated().to_string())),
        (TypeDef::DateTime, Value::DateTime(dt)) => Ok(AttributeValue::S(dt.to_rfc3339())),
        (TypeDef::Float, _) => encode_float(value).map(AttributeValue::N),
        (TypeDef::Integer, _) => encode_integer(value).map(AttributeValue::number),
        (TypeDef::Binary, Value::Binary(b)) => Ok(AttributeValue::B(b.clone())),
        (TypeDef::Boolean, Value::Bool(b)) => Ok(AttributeValue::Bool(*b)),
        (TypeDef::Set(inner), Value::Set(items)) => encode_set(inner, items),
        (TypeDef::List(inner), Value::List(items)) => items
            .iter()
            .map(|item| encode(item, inner))
            .collect::<Result<Vec<_>, _>>()
            .map(AttributeValue::L),
        (TypeDef::Map(fields), Value::Map(entries)) => {
            let mut out = HashMap::with_capacity(entries.len());
            for (name, field_type) in fields {
                if let Some(v) = entries.get(name) {
                    out.insert(name.clone(), encode(v, field_type)?);
                }
            }
            Ok(AttributeValue::M(out))
        }
        (TypeDef::TypedMap(inner), Value::Map(entries)) => entries
            .iter()
            .map(|(k, v)| Ok((k.clone(), encode(v, inner)?)))
            .collect::<Result<HashMap<_, _>, MarshalError>>()
            .map(AttributeValue::M),
        _ => Err(mismatch(typedef, value.kind())),
    }
}

fn encode_float(value: &Value) -> Result<String, MarshalError> {
    let text = match value {
        Value::Float(f) => {
            if !f.is_finite() {
                return Err(MarshalError::NotFinite(f.to_string()));
            }
            f.to_string()
        }
        Value::Int(i) => i.to_string(),
        Value::Number(n) => n.clone(),
        other => return Err(mismatch(&TypeDef::Float, other.kind())),
    };
    ParsedNumber::parse(&text)?.validate(&text)?;
    Ok(text)
}

fn encode_integer(value: &Value) -> Result<i64, MarshalError> {
    match value {
        Value::Int(i) => Ok(*i),
        Value::Float(f) => {
            if !f.is_finite() {
                return Err(MarshalError::NotFinite(f.to_string()));
            }
            ParsedNumber::parse(&f.to_string())?.truncate()
        }
        Value::Number(n) => ParsedNumber::parse(n)?.truncate(),
        other => Err(mismatch(&TypeDef::Integer, other.kind())),
    }
}

fn encode_set(inner: &TypeDef, items: &[Value]) -> Result<AttributeValue, MarshalError> {
    let encoded = items
        .iter()
        .map(|item| encode(item, inner))
        .collect::<Result<Vec<_>, _>>()?;
    match inner.backing_type() {
        "S" => Ok(AttributeValue::Ss(
            encoded.into_iter().filter_map(|v| v.as_s().map(str::to_owned)).collect(),
        )),
        "N" => Ok(AttributeValue::Ns(
            encoded.into_iter().filter_map(|v| v.as_n().map(str::to_owned)).collect(),
        )),
        "B" => Ok(AttributeValue::Bs(
            encoded.into_iter().filter_map(|v| v.as_b().cloned()).collect(),
        )),
        _ => Err(MarshalError::InvalidSetType(inner.to_string())),
    }
}

// ---------------------------------------------------------------------------
// Decoding
// ---------------------------------------------------------------------------

/// Decode a wire value of the given type.
///
/// An absent value or the `NULL` marker decodes to `Ok(None)`.
pub fn decode(
    wire: Option<&AttributeValue>,
    typedef: &TypeDef,
) -> Result<Option<Value>, MarshalError> {
    let Some(wire) = wire else {
        return Ok(None);
    };
    if wire.is_null() {
        return Ok(None);
    }

    let value = match (typedef, wire) {
        (TypeDef::String, AttributeValue::S(s)) => Value::String(s.clone()),
        (TypeDef::Uuid, AttributeValue::S(s)) => {
            Value::Uuid(Uuid::parse_str(s).map_err(|_| mismatch(typedef, "malformed uuid"))?)
        }
        (TypeDef::DateTime, AttributeValue::S(s)) => Value::DateTime(
            DateTime::parse_from_rfc3339(s)
                .map_err(|_| mismatch(typedef, "malformed timestamp"))?
                .with_timezone(&Utc),
        ),
        (TypeDef::Float, AttributeValue::N(n)) => Value::Number(n.clone()),
        (TypeDef::Integer, AttributeValue::N(n)) => Value::Int(ParsedNumber::parse(n)?.truncate()?),
        (TypeDef::Binary, AttributeValue::B(b)) => Value::Binary(b.clone()),
        (TypeDef::Boolean, AttributeValue::Bool(b)) => Value::Bool(*b),
        (TypeDef::Set(inner), AttributeValue::Ss(items)) => {
            decode_each(items.iter().cloned().map(AttributeValue::S), inner, Value::Set)?
        }
        (TypeDef::Set(inner), AttributeValue::Ns(items)) => {
            decode_each(items.iter().cloned().map(AttributeValue::N), inner, Value::Set)?
        }
        (TypeDef::Set(inner), AttributeValue::Bs(items)) => {
            decode_each(items.iter().cloned().map(AttributeValue::B), inner, Value::Set)?
        }
        (TypeDef::List(inner), AttributeValue::L(items)) => {
            decode_each(items.iter().cloned(), inner, Value::List)?
        }
        (TypeDef::Map(fields), AttributeValue::M(entries)) => {
            let mut out = BTreeMap::new();
            for (name, field_type) in fields {
                if let Some(v) = decode(entries.get(name), field_type)? {
                    out.insert(name.clone(), v);
                }
            }
            Value::Map(out)
        }
        (TypeDef::TypedMap(inner), AttributeValue::M(entries)) => {
            let mut out = BTreeMap::new();
            for (k, v) in entries {
                if let Some(v) = decode(Some(v), inner)? {
                    out.insert(k.clone(), v);
                }
            }
            Value::Map(out)
        }
        _ => return Err(mismatch(typedef, wire.type_descriptor())),
    };
    Ok(Some(value))
}

fn decode_each(
    items: impl Iterator<Item = AttributeValue>,
    inner: &TypeDef,
    wrap: fn(Vec<Value>) -> Value,
) -> Result<Value, MarshalError> {
    let mut out = Vec::new();
    for item in items {
        if let Some(v) = decode(Some(&item), inner)? {
            out.push(v);
        }
    }
    Ok(wrap(out))
}

// ---------------------------------------------------------------------------
// Number text
// ---------------------------------------------------------------------------

/// A decimal number split into sign, significant digits and exponent:
/// `value = (-1)^negative * digits * 10^exponent`.
#[derive(Debug, PartialEq, Eq)]
struct ParsedNumber {
    negative: bool,
    /// Digits without leading or trailing zeros; empty for zero.
    digits: String,
    exponent: i64,
}

impl ParsedNumber {
    fn parse(text: &str) -> Result<Self, MarshalError> {
        let invalid = || MarshalError::InvalidNumber(text.to_owned());

        let (negative, rest) = match text.strip_prefix('-') {
            Some(rest) => (true, rest),
            None => (false, text.strip_prefix('+').unwrap_or(text)),
        };
        let lowered = rest.to_ascii_lowercase();
        if matches!(lowered.as_str(), "nan" | "inf" | "infinity" | "snan") {
            return Err(MarshalError::NotFinite(text.to_owned()));
        }

        let (mantissa, explicit_exp) = match rest.find(['e', 'E']) {
            Some(pos) => (
                &rest[..pos],
                rest[pos + 1..].parse::<i64>().map_err(|_| invalid())?,
            ),
            None => (rest, 0),
        };

        let mut digits = String::with_capacity(mantissa.len());
        let mut frac_digits: i64 = 0;
        let mut seen_dot = false;
        for ch in mantissa.chars() {
            match ch {
                '.' if !seen_dot => seen_dot = true,
                '0'..='9' => {
                    digits.push(ch);
                    if seen_dot {
                        frac_digits += 1;
                    }
                }
                _ => return Err(invalid()),
            }
        }
        if digits.is_empty() {
            return Err(invalid());
        }

        let trimmed_leading = digits.trim_start_matches('0');
        let significant = trimmed_leading.trim_end_matches('0');
        #[allow(clippy::cast_possible_wrap)]
        let trailing_zeros = (trimmed_leading.len() - significant.len()) as i64;

        let exponent = if significant.is_empty() {
            0
        } else {
            explicit_exp
                .checked_sub(frac_digits)
                .and_then(|e| e.checked_add(trailing_zeros))
                .ok_or_else(|| {
                    if explicit_exp > 0 {
                        MarshalError::Overflow(text.to_owned())
                    } else {
                        MarshalError::Underflow(text.to_owned())
                    }
                })?
        };

        Ok(Self {
            negative: negative && !significant.is_empty(),
            digits: significant.to_owned(),
            exponent,
        })
    }

    /// Check the number against the service's precision and range limits.
    fn validate(&self, text: &str) -> Result<(), MarshalError> {
        if self.digits.is_empty() {
            return Ok(());
        }
        if self.digits.len() > MAX_SIGNIFICANT_DIGITS {
            return Err(MarshalError::Inexact(text.to_owned()));
        }
        #[allow(clippy::cast_possible_wrap)]
        let magnitude = self
            .exponent
            .checked_add(self.digits.len() as i64 - 1)
            .ok_or_else(|| MarshalError::Overflow(text.to_owned()))?;
        if magnitude > MAX_MAGNITUDE {
            return Err(MarshalError::Overflow(text.to_owned()));
        }
        if magnitude < MIN_MAGNITUDE {
            return Err(MarshalError::Underflow(text.to_owned()));
        }
        Ok(())
    }

    /// Integer part, truncated toward zero.
    fn truncate(&self) -> Result<i64, MarshalError> {
        let overflow = || MarshalError::Overflow(self.to_string());
        let integer_digits = if self.exponent >= 0 {
            let zeros = usize::try_from(self.exponent).map_err(|_| overflow())?;
            if self.digits.len() + zeros > 19 {
                return Err(overflow());
            }
            format!("{}{}", self.digits, "0".repeat(zeros))
        } else {
            let drop = usize::try_from(self.exponent.unsigned_abs()).unwrap_or(usize::MAX);
            if drop >= self.digits.len() {
                return Ok(0);
            }
            self.digits[..self.digits.len() - drop].to_owned()
        };
        if integer_digits.is_empty() {
            return Ok(0);
        }
        let signed = if self.negative {
            format!("-{integer_digits}")
        } else {
            integer_digits
        };
        signed.parse::<i64>().map_err(|_| overflow())
    }
}

impl fmt::Display for ParsedNumber {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.digits.is_empty() {
            return f.write_str("0");
        }
        let sign = if self.negative { "-" } else { "" };
        write!(f, "{sign}{}e{}", self.digits, self.exponent)
    }
}
