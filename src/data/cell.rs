//! Scalar cell values stored inside the fields of a [`Frame`][crate::data::Frame].

use std::fmt;

use serde::{Deserialize, Serialize};
use serde_json::Value;

/// The text rendering of a null cell.
///
/// Null cells are not dropped when stringifying values for display; they
/// show up under this spelling, matching what dashboard users see in the
/// variable picker.
pub const EXPLICIT_NULL: &str = "null";

/// A single scalar value held by a [`Field`][crate::data::Field].
///
/// The JSON wire format carries columns as arrays of scalars, so this is
/// deliberately a closed set: null, booleans, numbers and strings. Numbers
/// keep the [`serde_json::Number`] representation rather than forcing a
/// float, so integer cells round-trip exactly.
///
/// Anything convertible to a cell value can be collected into a field:
///
/// ```rust
/// use cnosdb_datasource::prelude::*;
///
/// let field = [Some(1u32), None, Some(3)].into_field("counts");
/// assert_eq!(field.name, "counts");
/// ```
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum CellValue {
    /// A missing or null cell.
    Null,
    /// A boolean cell.
    Bool(bool),
    /// A numeric cell, integer or floating point.
    Number(serde_json::Number),
    /// A string cell.
    String(String),
}

impl CellValue {
    /// Returns the string content of this cell, if it is a string.
    pub fn as_str(&self) -> Option<&str> {
        match self {
            Self::String(s) => Some(s),
            _ => None,
        }
    }

    /// Returns `true` if this cell is null.
    pub fn is_null(&self) -> bool {
        matches!(self, Self::Null)
    }

    /// Converts a JSON value into a cell, if it is a scalar.
    ///
    /// Arrays and objects have no cell representation and yield `None`.
    pub fn from_json(value: &Value) -> Option<Self> {
        match value {
            Value::Null => Some(Self::Null),
            Value::Bool(b) => Some(Self::Bool(*b)),
            Value::Number(n) => Some(Self::Number(n.clone())),
            Value::String(s) => Some(Self::String(s.clone())),
            Value::Array(_) | Value::Object(_) => None,
        }
    }
}

impl Default for CellValue {
    fn default() -> Self {
        Self::Null
    }
}

impl fmt::Display for CellValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Null => f.write_str(EXPLICIT_NULL),
            Self::Bool(b) => write!(f, "{b}"),
            Self::Number(n) => write!(f, "{n}"),
            Self::String(s) => f.write_str(s),
        }
    }
}

macro_rules! impl_cellvalue_for_integer {
    ($($ty:ty),* $(,)?) => {
        $(
            impl From<$ty> for CellValue {
                fn from(value: $ty) -> Self {
                    Self::Number(serde_json::Number::from(value))
                }
            }
        )*
    };
}

impl_cellvalue_for_integer!(i8, i16, i32, i64, u8, u16, u32, u64, isize, usize);

impl From<f64> for CellValue {
    /// Non-finite floats have no JSON representation and become null cells.
    fn from(value: f64) -> Self {
        serde_json::Number::from_f64(value).map_or(Self::Null, Self::Number)
    }
}

impl From<f32> for CellValue {
    fn from(value: f32) -> Self {
        f64::from(value).into()
    }
}

impl From<bool> for CellValue {
    fn from(value: bool) -> Self {
        Self::Bool(value)
    }
}

impl From<&str> for CellValue {
    fn from(value: &str) -> Self {
        Self::String(value.to_owned())
    }
}

impl From<String> for CellValue {
    fn from(value: String) -> Self {
        Self::String(value)
    }
}

impl<T> From<Option<T>> for CellValue
where
    T: Into<CellValue>,
{
    fn from(value: Option<T>) -> Self {
        value.map_or(Self::Null, Into::into)
    }
}

#[cfg(test)]
mod test {
    use pretty_assertions::assert_eq;
    use serde_json::json;

    use super::*;

    #[test]
    fn displays_canonical_forms() {
        assert_eq!(CellValue::Null.to_string(), "null");
        assert_eq!(CellValue::from(true).to_string(), "true");
        assert_eq!(CellValue::from(42u64).to_string(), "42");
        assert_eq!(CellValue::from(2.5).to_string(), "2.5");
        assert_eq!(CellValue::from("host-1").to_string(), "host-1");
    }

    #[test]
    fn non_finite_floats_become_null() {
        assert_eq!(CellValue::from(f64::NAN), CellValue::Null);
        assert_eq!(CellValue::from(f64::INFINITY), CellValue::Null);
    }

    #[test]
    fn options_map_to_null() {
        assert_eq!(CellValue::from(None::<u8>), CellValue::Null);
        assert_eq!(CellValue::from(Some("x")), CellValue::from("x"));
    }

    #[test]
    fn scalars_convert_from_json() {
        assert_eq!(CellValue::from_json(&json!(null)), Some(CellValue::Null));
        assert_eq!(
            CellValue::from_json(&json!("tag")),
            Some(CellValue::from("tag"))
        );
        assert_eq!(CellValue::from_json(&json!([1, 2])), None);
        assert_eq!(CellValue::from_json(&json!({"a": 1})), None);
    }

    #[test]
    fn serializes_untagged() {
        let cells = vec![
            CellValue::Null,
            CellValue::from(false),
            CellValue::from(7i64),
            CellValue::from("s"),
        ];
        assert_eq!(
            serde_json::to_string(&cells).expect("valid JSON"),
            r#"[null,false,7,"s"]"#
        );
        let parsed: Vec<CellValue> =
            serde_json::from_str(r#"[null,false,7,"s"]"#).expect("valid cells");
        assert_eq!(parsed, cells);
    }
}
