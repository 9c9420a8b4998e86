//! Serialization of [`Frame`]s to the split schema/data JSON wire format.

use std::collections::BTreeMap;

use serde::{Serialize, Serializer};
use serde_with::skip_serializing_none;

use crate::data::{
    cell::CellValue,
    frame::{Frame, FrameInclude, Metadata},
};

impl Serialize for Frame {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        SerializableFrame::new(self, FrameInclude::All).serialize(serializer)
    }
}

#[skip_serializing_none]
#[derive(Debug, Serialize)]
pub(super) struct SerializableFrame<'a> {
    schema: Option<SerializableFrameSchema<'a>>,
    data: Option<SerializableFrameData<'a>>,
}

impl<'a> SerializableFrame<'a> {
    pub(super) fn new(frame: &'a Frame, include: FrameInclude) -> Self {
        let schema = matches!(include, FrameInclude::All | FrameInclude::SchemaOnly).then(|| {
            SerializableFrameSchema {
                name: frame.name.as_deref(),
                ref_id: frame.ref_id.as_deref(),
                meta: &frame.meta,
                fields: frame
                    .fields()
                    .iter()
                    .map(|field| SerializableField {
                        name: &field.name,
                        labels: &field.labels,
                    })
                    .collect(),
            }
        });
        let data = matches!(include, FrameInclude::All | FrameInclude::DataOnly).then(|| {
            SerializableFrameData {
                values: frame.fields().iter().map(|field| field.values()).collect(),
            }
        });
        Self { schema, data }
    }
}

#[skip_serializing_none]
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct SerializableFrameSchema<'a> {
    name: Option<&'a str>,
    ref_id: Option<&'a str>,
    // `skip_serializing_none` only recognizes fields typed literally as
    // `Option<..>`, so the reference needs the expansion spelled out.
    #[serde(skip_serializing_if = "Option::is_none")]
    meta: &'a Option<Metadata>,
    fields: Vec<SerializableField<'a>>,
}

#[derive(Debug, Serialize)]
struct SerializableField<'a> {
    name: &'a str,
    #[serde(skip_serializing_if = "BTreeMap::is_empty")]
    labels: &'a BTreeMap<String, String>,
}

#[derive(Debug, Serialize)]
struct SerializableFrameData<'a> {
    values: Vec<&'a [CellValue]>,
}
