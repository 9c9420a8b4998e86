//! Data frames, the tables of data passed between the host and Grafana.

use itertools::Itertools;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use serde_with::skip_serializing_none;

use crate::data::{error::Error, field::Field};

mod de;
mod ser;

/// A structured, two-dimensional data structure.
///
/// A frame is a collection of [`Field`]s named after the table or series it
/// holds, plus optional [`Metadata`]. All fields must have the same length
/// before the frame can be serialized; [`Frame::check`] verifies this and
/// returns a [`CheckedFrame`] providing access to serialization.
///
/// # Examples
///
/// Creating a frame from fields using the [`IntoFrame`] trait:
///
/// ```rust
/// use cnosdb_datasource::prelude::*;
///
/// let frame = [
///     ["2022-10-10T00:00:00", "2022-10-10T00:00:10"].into_field("time"),
///     [0.3, 0.4].into_field("usage"),
/// ]
/// .into_frame("cpu");
/// assert_eq!(frame.fields().len(), 2);
/// ```
#[derive(Clone, Debug, Default, PartialEq)]
pub struct Frame {
    /// The name of this frame.
    pub name: Option<String>,

    /// Optional metadata describing this frame.
    ///
    /// This can include custom metadata.
    pub meta: Option<Metadata>,

    /// The ID of the query that this frame answers, assigned by the host.
    pub(crate) ref_id: Option<String>,

    fields: Vec<Field>,
}

impl Frame {
    /// Create a named frame with no fields or metadata.
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: Some(name.into()),
            ..Self::default()
        }
    }

    /// Add a field to this frame, returning the updated frame.
    #[must_use]
    pub fn with_field(mut self, field: Field) -> Self {
        self.fields.push(field);
        self
    }

    /// Add several fields to this frame, returning the updated frame.
    #[must_use]
    pub fn with_fields(mut self, fields: impl IntoIterator<Item = Field>) -> Self {
        self.fields.extend(fields);
        self
    }

    /// Set the metadata of this frame, returning the updated frame.
    #[must_use]
    pub fn with_metadata(mut self, metadata: impl Into<Option<Metadata>>) -> Self {
        self.meta = metadata.into();
        self
    }

    /// Add a field to this frame.
    pub fn add_field(&mut self, field: Field) {
        self.fields.push(field);
    }

    /// The fields of this frame.
    pub fn fields(&self) -> &[Field] {
        &self.fields
    }

    /// Mutable access to the fields of this frame.
    pub fn fields_mut(&mut self) -> &mut [Field] {
        &mut self.fields
    }

    /// The ID of the query this frame answers, if assigned.
    pub fn ref_id(&self) -> Option<&str> {
        self.ref_id.as_deref()
    }

    /// Link this frame to the query it answers.
    pub fn set_ref_id(&mut self, ref_id: impl Into<String>) {
        self.ref_id = Some(ref_id.into());
    }

    /// Check that the fields of this frame are all of the same length.
    ///
    /// Serialization is only available through the returned [`CheckedFrame`],
    /// so a ragged frame can never reach the wire.
    pub fn check(&self) -> Result<CheckedFrame<'_>, Error> {
        if self.fields.iter().map(|x| x.values.len()).all_equal() {
            Ok(CheckedFrame(self))
        } else {
            Err(Error::FieldLengthMismatch {
                lengths: self
                    .fields
                    .iter()
                    .map(|x| (x.name.clone(), x.values.len()))
                    .collect(),
            })
        }
    }
}

/// A reference to a [`Frame`] whose fields were checked for equal length.
#[derive(Debug)]
pub struct CheckedFrame<'a>(pub(crate) &'a Frame);

impl CheckedFrame<'_> {
    /// Serialize this frame to JSON, including the requested parts.
    pub fn to_json(&self, include: FrameInclude) -> Result<Vec<u8>, serde_json::Error> {
        serde_json::to_vec(&ser::SerializableFrame::new(self.0, include))
    }
}

/// Which parts of a frame to include when serializing.
///
/// The split schema/data representation lets the host send the (cheap)
/// schema ahead of the data when streaming.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
#[non_exhaustive]
pub enum FrameInclude {
    /// Include both schema and data.
    All,
    /// Only include the data.
    DataOnly,
    /// Only include the schema.
    SchemaOnly,
}

/// Metadata about a [`Frame`].
#[skip_serializing_none]
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
#[non_exhaustive]
pub struct Metadata {
    /// A browsable path on the datasource.
    #[serde(default)]
    pub path: Option<String>,

    /// Custom datasource-specific values.
    #[serde(default)]
    pub custom: Option<Map<String, Value>>,

    /// Runtime query translation details, displayed in the panel inspector.
    #[serde(default)]
    pub executed_query_string: Option<String>,

    /// Additional information about the data in the frame that Grafana can
    /// display in the UI.
    #[serde(default)]
    pub notices: Option<Vec<Notice>>,
}

/// A notification to be displayed in Grafana's UI alongside a frame.
#[skip_serializing_none]
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
#[non_exhaustive]
pub struct Notice {
    /// The severity level of this notice.
    #[serde(default)]
    pub severity: Option<Severity>,

    /// Freeform descriptive text to display on the notice.
    pub text: String,
}

impl Notice {
    /// Create a notice with the given text and no severity.
    pub fn new(text: impl Into<String>) -> Self {
        Self {
            severity: None,
            text: text.into(),
        }
    }

    /// Return a new notice with the given severity.
    #[must_use]
    pub fn with_severity(mut self, severity: Severity) -> Self {
        self.severity = Some(severity);
        self
    }
}

/// The severity level of a [`Notice`].
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
#[non_exhaustive]
pub enum Severity {
    /// Informational severity.
    #[default]
    Info,
    /// Warning severity.
    Warning,
    /// Error severity.
    Error,
}

/// Indicates that a type can be converted to a [`Frame`].
///
/// ```rust
/// use cnosdb_datasource::prelude::*;
///
/// let frame = [
///     ["cpu", "mem"].into_field("table_name"),
/// ]
/// .into_frame("tables");
/// assert_eq!(frame.name.as_deref(), Some("tables"));
/// ```
#[cfg_attr(docsrs, doc(notable_trait))]
pub trait IntoFrame {
    /// Create a frame named `name` from `self`.
    fn into_frame(self, name: impl Into<String>) -> Frame;
}

impl<T> IntoFrame for T
where
    T: IntoIterator<Item = Field>,
{
    fn into_frame(self, name: impl Into<String>) -> Frame {
        Frame::new(name).with_fields(self)
    }
}

/// Indicates that a [`Frame`] can be created from this type.
///
/// This is the inverse of [`IntoFrame`], provided for situations where
/// method chaining from a constructor reads better.
pub trait FromFields<T: IntoFrame> {
    /// Create a frame named `name` from `fields`.
    fn from_fields(name: impl Into<String>, fields: T) -> Self;
}

impl<T: IntoFrame> FromFields<T> for Frame {
    fn from_fields(name: impl Into<String>, fields: T) -> Self {
        fields.into_frame(name)
    }
}

#[cfg(test)]
mod test {
    use pretty_assertions::assert_eq;

    use super::*;
    use crate::data::field::IntoField;

    #[test]
    fn check_accepts_aligned_fields() {
        let frame = [
            ["a", "b"].into_field("one"),
            [1u8, 2].into_field("two"),
        ]
        .into_frame("aligned");
        assert!(frame.check().is_ok());
    }

    #[test]
    fn check_rejects_ragged_fields() {
        let frame = [
            ["a", "b"].into_field("one"),
            [1u8].into_field("two"),
        ]
        .into_frame("ragged");
        let err = frame.check().unwrap_err();
        assert_eq!(
            err.to_string(),
            "Frame field length mismatch: one (2), two (1)"
        );
    }

    #[test]
    fn check_accepts_empty_frame() {
        assert!(Frame::new("empty").check().is_ok());
    }
}
