//! The columns of data inside a [`Frame`][crate::data::Frame].

use std::collections::BTreeMap;

use crate::data::cell::CellValue;

/// A named column of scalar values within a [`Frame`][crate::data::Frame].
///
/// The values of a field are row-aligned with the other fields of its
/// frame; [`Frame::check`][crate::data::Frame::check] verifies the
/// alignment before a frame is serialized.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct Field {
    /// The name of this field.
    pub name: String,
    /// An optional set of key-value pairs that, combined with the name,
    /// should uniquely identify a field within a frame.
    pub labels: BTreeMap<String, String>,
    pub(crate) values: Vec<CellValue>,
}

impl Field {
    /// Create a field from a name and an iterator of cell values.
    ///
    /// ```rust
    /// use cnosdb_datasource::data::Field;
    ///
    /// let field = Field::new("usage", [0.1, 0.2, 0.3]);
    /// assert_eq!(field.values().len(), 3);
    /// ```
    pub fn new<T, U>(name: impl Into<String>, values: T) -> Self
    where
        T: IntoIterator<Item = U>,
        U: Into<CellValue>,
    {
        Self {
            name: name.into(),
            labels: BTreeMap::default(),
            values: values.into_iter().map(Into::into).collect(),
        }
    }

    /// Return a new field with the given name.
    #[must_use]
    pub fn with_name(mut self, name: impl Into<String>) -> Self {
        self.name = name.into();
        self
    }

    /// Return a new field with the given labels.
    #[must_use]
    pub fn with_labels(mut self, labels: BTreeMap<String, String>) -> Self {
        self.labels = labels;
        self
    }

    /// The values of this field.
    pub fn values(&self) -> &[CellValue] {
        &self.values
    }

    /// Replace the values of this field.
    pub fn set_values<T, U>(&mut self, values: T)
    where
        T: IntoIterator<Item = U>,
        U: Into<CellValue>,
    {
        self.values = values.into_iter().map(Into::into).collect();
    }
}

/// Indicates that a type can be converted to a [`Field`].
///
/// This is the main way to create fields: any iterator of values
/// convertible to [`CellValue`] gets an `into_field` method.
///
/// ```rust
/// use cnosdb_datasource::prelude::*;
///
/// let field = ["cpu", "mem", "disk"].into_field("table_name");
/// assert_eq!(field.name, "table_name");
/// ```
#[cfg_attr(docsrs, doc(notable_trait))]
pub trait IntoField {
    /// Create a field named `name` from `self`.
    fn into_field(self, name: impl Into<String>) -> Field;
}

impl<T, U> IntoField for T
where
    T: IntoIterator<Item = U>,
    U: Into<CellValue>,
{
    fn into_field(self, name: impl Into<String>) -> Field {
        Field::new(name, self)
    }
}

#[cfg(test)]
mod test {
    use pretty_assertions::assert_eq;

    use super::*;

    #[test]
    fn builds_from_mixed_sources() {
        let field = Field::new("values", vec![CellValue::Null, CellValue::from(1u8)]);
        assert_eq!(field.values().len(), 2);
        assert!(field.values()[0].is_null());

        let field = [Some(1i64), None].into_field("opt");
        assert_eq!(field.values(), &[CellValue::from(1i64), CellValue::Null]);
    }

    #[test]
    fn set_values_replaces_contents() {
        let mut field = ["a"].into_field("names");
        field.set_values(["b", "c"]);
        assert_eq!(
            field.values(),
            &[CellValue::from("b"), CellValue::from("c")]
        );
    }
}
