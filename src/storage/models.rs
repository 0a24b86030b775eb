// storage/models.rs
// Row and column value types

use chrono::{DateTime, Utc};
use serde::ser::Error as _;
use serde::{Serialize, Serializer};

/// Format for timestamps with a sub-second part. Only `DateTime64` columns
/// accept the fraction under `date_time_input_format=basic`.
pub const DATETIME_FORMAT: &str = "%Y-%m-%d %H:%M:%S%.3f";

/// Format for whole-second timestamps, accepted by plain `DateTime` columns.
pub const DATETIME_SECONDS_FORMAT: &str = "%Y-%m-%d %H:%M:%S";

/// Text form of a timestamp: whole seconds unless milliseconds are present.
pub fn format_datetime(ts: &DateTime<Utc>) -> String {
    if ts.timestamp_subsec_millis() == 0 {
        ts.format(DATETIME_SECONDS_FORMAT).to_string()
    } else {
        ts.format(DATETIME_FORMAT).to_string()
    }
}

/// One column value of a row.
///
/// The collector never looks inside values; their meaning is fixed by the
/// position they occupy in the destination table.
#[derive(Debug, Clone, PartialEq)]
pub enum Value {
    Null,
    Bool(bool),
    Int(i64),
    UInt(u64),
    Float(f64),
    String(String),
    Bytes(Vec<u8>),
    DateTime(DateTime<Utc>),
}

/// A row of positional column values.
///
/// Column count and order must match the destination table. Nothing checks
/// this until the destination appends the row to a batch.
pub type Row = Vec<Value>;

impl Value {
    /// Short type label used in error messages.
    pub fn type_name(&self) -> &'static str {
        match self {
            Value::Null => "null",
            Value::Bool(_) => "bool",
            Value::Int(_) => "int",
            Value::UInt(_) => "uint",
            Value::Float(_) => "float",
            Value::String(_) => "string",
            Value::Bytes(_) => "bytes",
            Value::DateTime(_) => "datetime",
        }
    }

    pub fn is_null(&self) -> bool {
        matches!(self, Value::Null)
    }
}

impl Serialize for Value {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        match self {
            Value::Null => serializer.serialize_none(),
            Value::Bool(b) => serializer.serialize_bool(*b),
            Value::Int(i) => serializer.serialize_i64(*i),
            Value::UInt(u) => serializer.serialize_u64(*u),
            Value::Float(f) => serializer.serialize_f64(*f),
            Value::String(s) => serializer.serialize_str(s),
            // JSON strings cannot carry arbitrary bytes
            Value::Bytes(b) => match std::str::from_utf8(b) {
                Ok(s) => serializer.serialize_str(s),
                Err(e) => Err(S::Error::custom(format!("bytes are not valid UTF-8: {e}"))),
            },
            Value::DateTime(ts) => serializer.serialize_str(&format_datetime(ts)),
        }
    }
}

macro_rules! impl_from {
    ($variant:ident: $($ty:ty),+ => $conv:ty) => {
        $(
            impl From<$ty> for Value {
                fn from(v: $ty) -> Self {
                    Value::$variant(<$conv>::from(v))
                }
            }
        )+
    };
}

impl_from!(Int: i8, i16, i32, i64 => i64);
impl_from!(UInt: u8, u16, u32, u64 => u64);
impl_from!(Float: f32, f64 => f64);
impl_from!(String: String, &str => String);
impl_from!(Bytes: Vec<u8> => Vec<u8>);

impl From<bool> for Value {
    fn from(v: bool) -> Self {
        Value::Bool(v)
    }
}

impl From<DateTime<Utc>> for Value {
    fn from(v: DateTime<Utc>) -> Self {
        Value::DateTime(v)
    }
}

impl<T: Into<Value>> From<Option<T>> for Value {
    fn from(v: Option<T>) -> Self {
        v.map_or(Value::Null, Into::into)
    }
}

/// Converts parsed JSON into a column value.
///
/// Arrays and objects are kept as their JSON text, which is what a `String`
/// or `JSON` column expects.
impl From<serde_json::Value> for Value {
    fn from(v: serde_json::Value) -> Self {
        match v {
            serde_json::Value::Null => Value::Null,
            serde_json::Value::Bool(b) => Value::Bool(b),
            serde_json::Value::Number(n) => {
                if let Some(i) = n.as_i64() {
                    Value::Int(i)
                } else if let Some(u) = n.as_u64() {
                    Value::UInt(u)
                } else {
                    Value::Float(n.as_f64().unwrap_or(f64::NAN))
                }
            }
            serde_json::Value::String(s) => Value::String(s),
            other @ (serde_json::Value::Array(_) | serde_json::Value::Object(_)) => {
                Value::String(other.to_string())
            }
        }
    }
}

/// Builds a [`Row`] from heterogeneous values.
///
/// ```
/// use ch_collector::{row, Value};
///
/// let r = row![1u32, "click", None::<i64>, 0.5];
/// assert_eq!(r.len(), 4);
/// assert_eq!(r[2], Value::Null);
/// ```
#[macro_export]
macro_rules! row {
    () => { $crate::Row::new() };
    ($($value:expr),+ $(,)?) => {
        vec![$($crate::Value::from($value)),+]
    };
}
