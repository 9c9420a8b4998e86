//! Deserialization of [`Frame`]s from the JSON wire format.
//!
//! Deserialization is deliberately tolerant: the host decorates frames
//! with keys this crate has no use for (field types, display configs,
//! entity tables), and those are ignored rather than rejected. A frame
//! missing its `schema` or `data` section still deserializes, with the
//! absent parts empty.

use std::collections::BTreeMap;

use serde::{Deserialize, Deserializer};

use crate::data::{
    cell::CellValue,
    field::Field,
    frame::{Frame, Metadata},
};

impl<'de> Deserialize<'de> for Frame {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        DeserializableFrame::deserialize(deserializer).map(Into::into)
    }
}

#[derive(Debug, Default, Deserialize)]
struct DeserializableFrame {
    #[serde(default)]
    schema: Option<DeserializableFrameSchema>,
    #[serde(default)]
    data: Option<DeserializableFrameData>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
struct DeserializableFrameSchema {
    #[serde(default)]
    name: Option<String>,
    #[serde(default)]
    ref_id: Option<String>,
    #[serde(default)]
    meta: Option<Metadata>,
    #[serde(default)]
    fields: Vec<DeserializableField>,
}

#[derive(Debug, Deserialize)]
struct DeserializableField {
    #[serde(default)]
    name: String,
    #[serde(default)]
    labels: BTreeMap<String, String>,
}

#[derive(Debug, Default, Deserialize)]
struct DeserializableFrameData {
    #[serde(default)]
    values: Vec<Vec<CellValue>>,
}

impl From<DeserializableFrame> for Frame {
    fn from(frame: DeserializableFrame) -> Self {
        let schema = frame.schema.unwrap_or_default();
        // Columns are matched to fields by position; fields beyond the
        // data get empty columns, columns beyond the fields are dropped.
        let mut columns = frame.data.unwrap_or_default().values.into_iter();
        let fields = schema
            .fields
            .into_iter()
            .map(|field| Field {
                name: field.name,
                labels: field.labels,
                values: columns.next().unwrap_or_default(),
            })
            .collect();
        Frame {
            name: schema.name,
            meta: schema.meta,
            ref_id: schema.ref_id,
            fields,
        }
    }
}

#[cfg(test)]
mod test {
    use pretty_assertions::assert_eq;
    use serde_json::from_str;

    use crate::data::*;

    #[test]
    fn deserializes_schema_and_data() {
        let frame: Frame = from_str(concat!(
            r#"{"schema":{"name":"tables","refId":"MetricQuery","fields":[{"name":"table_name"}]},"#,
            r#""data":{"values":[["cpu","mem"]]}}"#,
        ))
        .unwrap();
        assert_eq!(frame.name.as_deref(), Some("tables"));
        assert_eq!(frame.ref_id(), Some("MetricQuery"));
        assert_eq!(frame.fields().len(), 1);
        assert_eq!(frame.fields()[0].name, "table_name");
        assert_eq!(
            frame.fields()[0].values(),
            &[CellValue::from("cpu"), CellValue::from("mem")]
        );
    }

    #[test]
    fn ignores_unknown_schema_keys() {
        let frame: Frame = from_str(concat!(
            r#"{"schema":{"name":"t","fields":[{"name":"value","type":"number","#,
            r#""typeInfo":{"frame":"float64","nullable":true},"config":{"unit":"percent"}}]},"#,
            r#""data":{"values":[[1.5]],"entities":[null]}}"#,
        ))
        .unwrap();
        assert_eq!(frame.fields()[0].name, "value");
        assert_eq!(frame.fields()[0].values(), &[CellValue::from(1.5)]);
    }

    #[test]
    fn tolerates_missing_sections() {
        let frame: Frame = from_str(r#"{"schema":{"name":"only-schema","fields":[{"name":"a"}]}}"#)
            .unwrap();
        assert_eq!(frame.fields()[0].values(), &[] as &[CellValue]);

        let frame: Frame = from_str(r#"{"data":{"values":[[1,2]]}}"#).unwrap();
        assert_eq!(frame.name, None);
        assert!(frame.fields().is_empty());

        let frame: Frame = from_str("{}").unwrap();
        assert!(frame.fields().is_empty());
    }

    #[test]
    fn drops_surplus_value_columns() {
        let frame: Frame = from_str(concat!(
            r#"{"schema":{"fields":[{"name":"a"}]},"#,
            r#""data":{"values":[["x"],["orphaned"]]}}"#,
        ))
        .unwrap();
        assert_eq!(frame.fields().len(), 1);
        assert_eq!(frame.fields()[0].values(), &[CellValue::from("x")]);
    }

    #[test]
    fn round_trips_through_wire_format() {
        let mut frame = [
            [Some(1u64), None, Some(3)].into_field("count"),
            ["a", "b", "c"].into_field("tag"),
        ]
        .into_frame("series");
        frame.set_ref_id("A");
        let json = frame
            .check()
            .unwrap()
            .to_json(FrameInclude::All)
            .unwrap();
        let parsed: Frame = serde_json::from_slice(&json).unwrap();
        assert_eq!(parsed, frame);
    }
}
