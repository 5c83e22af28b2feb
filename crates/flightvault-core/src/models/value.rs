//! Scalar field values, record identities, and comparison normalization.

use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::time::format_timestamp;

/// A single scalar column value.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", content = "value", rename_all = "snake_case")]
pub enum FieldValue {
    Null,
    Bool(bool),
    Int(i64),
    Float(#[serde(with = "float_repr")] f64),
    Text(String),
    Timestamp(DateTime<Utc>),
}

/// JSON has no NaN or infinities, so those are written as the strings
/// `"NaN"`, `"inf"` and `"-inf"`.
mod float_repr {
    use std::fmt;

    use serde::de::{self, Visitor};
    use serde::{Deserializer, Serializer};

    pub fn serialize<S: Serializer>(value: &f64, serializer: S) -> Result<S::Ok, S::Error> {
        if value.is_nan() {
            serializer.serialize_str("NaN")
        } else if value.is_infinite() {
            serializer.serialize_str(if *value > 0.0 { "inf" } else { "-inf" })
        } else {
            serializer.serialize_f64(*value)
        }
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<f64, D::Error> {
        deserializer.deserialize_any(FloatVisitor)
    }

    struct FloatVisitor;

    impl<'de> Visitor<'de> for FloatVisitor {
        type Value = f64;

        fn expecting(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
            f.write_str("a number or one of \"NaN\", \"inf\", \"-inf\"")
        }

        fn visit_f64<E: de::Error>(self, v: f64) -> Result<f64, E> {
            Ok(v)
        }

        fn visit_i64<E: de::Error>(self, v: i64) -> Result<f64, E> {
            Ok(v as f64)
        }

        fn visit_u64<E: de::Error>(self, v: u64) -> Result<f64, E> {
            Ok(v as f64)
        }

        fn visit_str<E: de::Error>(self, v: &str) -> Result<f64, E> {
            match v {
                "NaN" => Ok(f64::NAN),
                "inf" => Ok(f64::INFINITY),
                "-inf" => Ok(f64::NEG_INFINITY),
                other => Err(E::invalid_value(de::Unexpected::Str(other), &self)),
            }
        }
    }
}

/// Representation rules applied before two values are compared.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Normalization {
    /// Decimal places kept when comparing floats.
    pub float_precision: u32,
    /// Ignore leading/trailing whitespace in text.
    pub trim_strings: bool,
}

impl Default for Normalization {
    fn default() -> Self {
        Self {
            float_precision: 6,
            trim_strings: true,
        }
    }
}

/// Largest magnitude at which an f64 still represents every integer exactly.
const EXACT_INT_LIMIT: f64 = 9_007_199_254_740_992.0;

impl FieldValue {
    pub fn is_null(&self) -> bool {
        matches!(self, Self::Null)
    }

    /// Null, or text that is empty after trimming.
    pub fn is_null_or_empty(&self) -> bool {
        match self {
            Self::Null => true,
            Self::Text(s) => s.trim().is_empty(),
            _ => false,
        }
    }

    /// Numeric view of ints and floats.
    pub fn as_f64(&self) -> Option<f64> {
        match self {
            Self::Int(i) => Some(*i as f64),
            Self::Float(f) => Some(*f),
            _ => None,
        }
    }

    pub fn as_str(&self) -> Option<&str> {
        match self {
            Self::Text(s) => Some(s),
            _ => None,
        }
    }

    pub fn type_name(&self) -> &'static str {
        match self {
            Self::Null => "null",
            Self::Bool(_) => "bool",
            Self::Int(_) => "int",
            Self::Float(_) => "float",
            Self::Text(_) => "text",
            Self::Timestamp(_) => "timestamp",
        }
    }

    /// Canonical form used for equality checks.
    ///
    /// Floats are rounded to `float_precision` places and collapse to `Int`
    /// when integral, so `3`, `3.0`, and `3.0000001` (at 6 places) compare
    /// equal.
    pub fn normalized(&self, rules: &Normalization) -> FieldValue {
        match self {
            Self::Text(s) if rules.trim_strings => Self::Text(s.trim().to_string()),
            Self::Float(f) if f.is_finite() => {
                let factor = 10f64.powi(rules.float_precision.min(15) as i32);
                let scaled = f * factor;
                if !scaled.is_finite() || f.abs() >= EXACT_INT_LIMIT {
                    return Self::Float(*f);
                }
                let rounded = scaled.round() / factor;
                if rounded.fract() == 0.0 && rounded.abs() < EXACT_INT_LIMIT {
                    Self::Int(rounded as i64)
                } else {
                    Self::Float(rounded)
                }
            }
            other => other.clone(),
        }
    }

    /// Equality after normalization. NaN is equivalent to NaN.
    pub fn equivalent(&self, other: &FieldValue, rules: &Normalization) -> bool {
        match (self.normalized(rules), other.normalized(rules)) {
            (Self::Float(a), Self::Float(b)) if a.is_nan() && b.is_nan() => true,
            (a, b) => a == b,
        }
    }

    /// Identity view of this value, if it can serve as a primary key.
    pub fn to_key(&self) -> Option<RecordKey> {
        match self {
            Self::Int(i) => Some(RecordKey::Int(*i)),
            Self::Float(f) if f.fract() == 0.0 && f.abs() < EXACT_INT_LIMIT => {
                Some(RecordKey::Int(*f as i64))
            }
            Self::Text(s) if !s.trim().is_empty() => Some(RecordKey::Text(s.trim().to_string())),
            _ => None,
        }
    }
}

impl fmt::Display for FieldValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Null => write!(f, "NULL"),
            Self::Bool(b) => write!(f, "{b}"),
            Self::Int(i) => write!(f, "{i}"),
            Self::Float(x) => write!(f, "{x}"),
            Self::Text(s) => write!(f, "{s:?}"),
            Self::Timestamp(ts) => write!(f, "{}", format_timestamp(ts)),
        }
    }
}

impl From<i64> for FieldValue {
    fn from(v: i64) -> Self {
        Self::Int(v)
    }
}

impl From<i32> for FieldValue {
    fn from(v: i32) -> Self {
        Self::Int(v as i64)
    }
}

impl From<u32> for FieldValue {
    fn from(v: u32) -> Self {
        Self::Int(v as i64)
    }
}

impl From<f64> for FieldValue {
    fn from(v: f64) -> Self {
        Self::Float(v)
    }
}

impl From<bool> for FieldValue {
    fn from(v: bool) -> Self {
        Self::Bool(v)
    }
}

impl From<&str> for FieldValue {
    fn from(v: &str) -> Self {
        Self::Text(v.to_string())
    }
}

impl From<String> for FieldValue {
    fn from(v: String) -> Self {
        Self::Text(v)
    }
}

impl From<DateTime<Utc>> for FieldValue {
    fn from(v: DateTime<Utc>) -> Self {
        Self::Timestamp(v)
    }
}

impl<T: Into<FieldValue>> From<Option<T>> for FieldValue {
    fn from(v: Option<T>) -> Self {
        v.map(Into::into).unwrap_or(Self::Null)
    }
}

impl From<RecordKey> for FieldValue {
    fn from(key: RecordKey) -> Self {
        match key {
            RecordKey::Int(i) => Self::Int(i),
            RecordKey::Text(s) => Self::Text(s),
        }
    }
}

/// Primary-key identity, stable across snapshots of the same entity.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(untagged)]
pub enum RecordKey {
    Int(i64),
    Text(String),
}

impl fmt::Display for RecordKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Int(i) => write!(f, "{i}"),
            Self::Text(s) => write!(f, "{s}"),
        }
    }
}

impl From<i64> for RecordKey {
    fn from(v: i64) -> Self {
        Self::Int(v)
    }
}

impl From<i32> for RecordKey {
    fn from(v: i32) -> Self {
        Self::Int(v as i64)
    }
}

impl From<&str> for RecordKey {
    fn from(v: &str) -> Self {
        Self::Text(v.to_string())
    }
}

impl From<String> for RecordKey {
    fn from(v: String) -> Self {
        Self::Text(v)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn integral_float_equals_int() {
        let rules = Normalization::default();
        assert!(FieldValue::Float(42.0).equivalent(&FieldValue::Int(42), &rules));
        assert!(FieldValue::Float(1.000_000_04).equivalent(&FieldValue::Int(1), &rules));
        assert!(!FieldValue::Float(1.5).equivalent(&FieldValue::Int(1), &rules));
    }

    #[test]
    fn trimmed_text_is_equal_only_when_trimming() {
        let a = FieldValue::from("  Heathrow ");
        let b = FieldValue::from("Heathrow");
        assert!(a.equivalent(&b, &Normalization::default()));
        let strict = Normalization {
            trim_strings: false,
            ..Normalization::default()
        };
        assert!(!a.equivalent(&b, &strict));
    }

    #[test]
    fn nan_is_equivalent_to_nan() {
        let rules = Normalization::default();
        assert!(FieldValue::Float(f64::NAN).equivalent(&FieldValue::Float(f64::NAN), &rules));
    }

    #[test]
    fn null_and_empty_text_are_distinct_values() {
        let rules = Normalization::default();
        assert!(!FieldValue::Null.equivalent(&FieldValue::from(""), &rules));
        assert!(FieldValue::from("   ").is_null_or_empty());
    }

    #[test]
    fn keys_from_values() {
        assert_eq!(FieldValue::Int(7).to_key(), Some(RecordKey::Int(7)));
        assert_eq!(FieldValue::Float(7.0).to_key(), Some(RecordKey::Int(7)));
        assert_eq!(FieldValue::from(" LHR ").to_key(), Some(RecordKey::from("LHR")));
        assert_eq!(FieldValue::Null.to_key(), None);
        assert_eq!(FieldValue::from("").to_key(), None);
    }

    #[test]
    fn huge_floats_keep_their_difference() {
        let rules = Normalization::default();
        let a = FieldValue::Float(1e305);
        let b = FieldValue::Float(1.7e305);
        assert_eq!(a.normalized(&rules), a);
        assert!(!a.equivalent(&b, &rules));
        assert!(a.equivalent(&FieldValue::Float(1e305), &rules));
        assert!(!FieldValue::Float(f64::MAX).equivalent(&FieldValue::Float(-f64::MAX), &rules));
    }

    #[test]
    fn non_finite_floats_survive_json() {
        for (value, text) in [
            (f64::NAN, r#"{"type":"float","value":"NaN"}"#),
            (f64::INFINITY, r#"{"type":"float","value":"inf"}"#),
            (f64::NEG_INFINITY, r#"{"type":"float","value":"-inf"}"#),
        ] {
            let json = serde_json::to_string(&FieldValue::Float(value)).unwrap();
            assert_eq!(json, text);
            let back: FieldValue = serde_json::from_str(&json).unwrap();
            assert!(back.equivalent(&FieldValue::Float(value), &Normalization::default()));
        }
        let plain: FieldValue = serde_json::from_str(r#"{"type":"float","value":2.5}"#).unwrap();
        assert_eq!(plain, FieldValue::Float(2.5));
        assert!(serde_json::from_str::<FieldValue>(r#"{"type":"float","value":"two"}"#).is_err());
    }

    #[test]
    fn value_json_round_trip_keeps_type() {
        let v = FieldValue::Text("2024".to_string());
        let json = serde_json::to_string(&v).unwrap();
        assert_eq!(json, r#"{"type":"text","value":"2024"}"#);
        let back: FieldValue = serde_json::from_str(&json).unwrap();
        assert_eq!(back, v);
    }
}
