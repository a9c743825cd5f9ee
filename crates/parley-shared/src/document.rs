//! Schemaless document values exchanged with the document store.
//!
//! A [`Document`] is an id plus a [`FieldMap`]. Field values are
//! self-describing so records written by older or foreign clients can still
//! be read; the typed accessors return `None` on absence or type mismatch and
//! leave the decision of what to do about it to the caller.

use std::cmp::Ordering;
use std::collections::BTreeMap;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

pub type FieldMap = BTreeMap<String, FieldValue>;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", content = "value", rename_all = "camelCase")]
pub enum FieldValue {
    Null,
    Bool(bool),
    Integer(i64),
    Double(f64),
    String(String),
    Timestamp(DateTime<Utc>),
    Array(Vec<FieldValue>),
    /// Write placeholder, replaced by the store's clock when committed.
    ServerTimestamp,
}

impl FieldValue {
    pub fn as_str(&self) -> Option<&str> {
        match self {
            Self::String(s) => Some(s),
            _ => None,
        }
    }

    pub fn as_timestamp(&self) -> Option<DateTime<Utc>> {
        match self {
            Self::Timestamp(ts) => Some(*ts),
            _ => None,
        }
    }

    pub fn as_array(&self) -> Option<&[FieldValue]> {
        match self {
            Self::Array(items) => Some(items),
            _ => None,
        }
    }

    /// Replace server timestamp placeholders (recursively) with `now`.
    pub fn resolve_placeholders(&mut self, now: DateTime<Utc>) {
        match self {
            Self::ServerTimestamp => *self = Self::Timestamp(now),
            Self::Array(items) => items.iter_mut().for_each(|v| v.resolve_placeholders(now)),
            _ => {}
        }
    }

    fn type_rank(&self) -> u8 {
        match self {
            Self::Null => 0,
            Self::Bool(_) => 1,
            Self::Integer(_) | Self::Double(_) => 2,
            Self::Timestamp(_) => 3,
            Self::String(_) => 4,
            Self::Array(_) => 5,
            Self::ServerTimestamp => 6,
        }
    }

    /// Total order used by ordered queries: values of different types sort by
    /// type, values of the same type by their natural order.
    pub fn query_cmp(&self, other: &Self) -> Ordering {
        match (self, other) {
            (Self::Bool(a), Self::Bool(b)) => a.cmp(b),
            (Self::Integer(a), Self::Integer(b)) => a.cmp(b),
            (Self::Integer(a), Self::Double(b)) => (*a as f64).total_cmp(b),
            (Self::Double(a), Self::Integer(b)) => a.total_cmp(&(*b as f64)),
            (Self::Double(a), Self::Double(b)) => a.total_cmp(b),
            (Self::Timestamp(a), Self::Timestamp(b)) => a.cmp(b),
            (Self::String(a), Self::String(b)) => a.cmp(b),
            (Self::Array(a), Self::Array(b)) => {
                for (x, y) in a.iter().zip(b.iter()) {
                    let ord = x.query_cmp(y);
                    if ord != Ordering::Equal {
                        return ord;
                    }
                }
                a.len().cmp(&b.len())
            }
            _ => self.type_rank().cmp(&other.type_rank()),
        }
    }
}

impl From<&str> for FieldValue {
    fn from(s: &str) -> Self {
        Self::String(s.to_string())
    }
}

impl From<String> for FieldValue {
    fn from(s: String) -> Self {
        Self::String(s)
    }
}

impl From<DateTime<Utc>> for FieldValue {
    fn from(ts: DateTime<Utc>) -> Self {
        Self::Timestamp(ts)
    }
}

impl<T: Into<FieldValue>> From<Vec<T>> for FieldValue {
    fn from(items: Vec<T>) -> Self {
        Self::Array(items.into_iter().map(Into::into).collect())
    }
}

/// A stored record: store-assigned (or caller-chosen) id plus its fields.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Document {
    pub id: String,
    pub fields: FieldMap,
}

impl Document {
    pub fn new(id: impl Into<String>, fields: FieldMap) -> Self {
        Self {
            id: id.into(),
            fields,
        }
    }

    pub fn get(&self, field: &str) -> Option<&FieldValue> {
        self.fields.get(field)
    }

    pub fn get_str(&self, field: &str) -> Option<&str> {
        self.get(field).and_then(FieldValue::as_str)
    }

    pub fn get_timestamp(&self, field: &str) -> Option<DateTime<Utc>> {
        self.get(field).and_then(FieldValue::as_timestamp)
    }

    pub fn get_array(&self, field: &str) -> Option<&[FieldValue]> {
        self.get(field).and_then(FieldValue::as_array)
    }
}

/// Build a [`FieldMap`] from `key => value` pairs.
#[macro_export]
macro_rules! fields {
    ($($key:expr => $value:expr),* $(,)?) => {{
        #[allow(unused_mut)]
        let mut map = $crate::document::FieldMap::new();
        $(map.insert(($key).to_string(), $crate::document::FieldValue::from($value));)*
        map
    }};
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    #[test]
    fn test_typed_accessors_reject_mismatch() {
        let doc = Document::new(
            "d1",
            crate::fields! {
                "name" => "Ann",
                "age" => FieldValue::Integer(3),
            },
        );
        assert_eq!(doc.get_str("name"), Some("Ann"));
        assert_eq!(doc.get_str("age"), None);
        assert_eq!(doc.get_str("missing"), None);
        assert!(doc.get_timestamp("name").is_none());
    }

    #[test]
    fn test_resolve_placeholders() {
        let now = Utc.with_ymd_and_hms(2024, 3, 1, 12, 0, 0).unwrap();
        let mut v = FieldValue::Array(vec![FieldValue::ServerTimestamp, "x".into()]);
        v.resolve_placeholders(now);
        assert_eq!(
            v,
            FieldValue::Array(vec![FieldValue::Timestamp(now), "x".into()])
        );
    }

    #[test]
    fn test_query_cmp_orders_by_type_then_value() {
        let t0 = Utc.with_ymd_and_hms(2024, 3, 1, 12, 0, 0).unwrap();
        let t1 = Utc.with_ymd_and_hms(2024, 3, 2, 12, 0, 0).unwrap();
        assert_eq!(FieldValue::from(t0).query_cmp(&t1.into()), Ordering::Less);
        assert_eq!(FieldValue::Null.query_cmp(&t0.into()), Ordering::Less);
        assert_eq!(
            FieldValue::Integer(2).query_cmp(&FieldValue::Double(1.5)),
            Ordering::Greater
        );
    }

    #[test]
    fn test_json_shape() {
        let json = serde_json::to_string(&FieldValue::from("hi")).unwrap();
        assert_eq!(json, r#"{"type":"string","value":"hi"}"#);
        let back: FieldValue = serde_json::from_str(r#"{"type":"serverTimestamp"}"#).unwrap();
        assert_eq!(back, FieldValue::ServerTimestamp);
    }
}
