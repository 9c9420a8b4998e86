/*! Metadata queries and template-variable value extraction.

Grafana dashboards fill their variable pickers by running small metadata
queries (list the tables, list the tags of a table, list the values of a
tag) and reading the answer out of an ordinary data [`Frame`]. CnosDB has
renamed the columns of those answers across releases, so extraction works
from a list of [`MetaSchema`] candidates per query shape, newest release
first; the first candidate whose columns all resolve wins.

The query shapes themselves are built by [`query`], and classified back
from their text by [`MetadataQueryKind::of`].

# Examples

```rust
use cnosdb_datasource::{meta, prelude::*};

let frame = [["cpu", "mem", "cpu"].into_field("table_name")].into_frame("tables");
let values = meta::metric_find_values(&meta::query::show_tables(), Some(&frame));
let names: Vec<_> = values.iter().map(|v| v.text.as_str()).collect();
assert_eq!(names, ["cpu", "mem"]);
```
*/

use itertools::Itertools;
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::data::Frame;

pub mod query;

/// The column keys one CnosDB release uses for a metadata query shape.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct MetaSchema {
    /// The release that answers with these columns.
    pub version: &'static str,
    /// The response columns to extract, values first.
    pub keys: &'static [&'static str],
}

/// `SHOW TABLES` column layouts, newest release first.
const SHOW_TABLES_SCHEMAS: &[MetaSchema] = &[
    MetaSchema {
        version: "2.4",
        keys: &["table_name"],
    },
    MetaSchema {
        version: "2.3.2",
        keys: &["TABLE_NAME"],
    },
    MetaSchema {
        version: "2.3.1",
        keys: &["Table"],
    },
];

/// `DESCRIBE TABLE` column layouts, newest release first.
const DESCRIBE_TABLE_SCHEMAS: &[MetaSchema] = &[
    MetaSchema {
        version: "2.4",
        keys: &["column_name", "column_type"],
    },
    MetaSchema {
        version: "2.3",
        keys: &["COLUMN_NAME", "COLUMN_TYPE"],
    },
];

/// The single-column layout of `SHOW TAG VALUES` and custom queries.
const VALUE_SCHEMAS: &[MetaSchema] = &[MetaSchema {
    version: "*",
    keys: &["value"],
}];

/// The `column_type` marking a tag column in `DESCRIBE TABLE` output.
const TAG_COLUMN_TYPE: &str = "TAG";
/// The `column_type` marking a field column in `DESCRIBE TABLE` output.
const FIELD_COLUMN_TYPE: &str = "FIELD";

/// The shapes of metadata query understood by this crate.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum MetadataQueryKind {
    /// `SHOW TABLES`, listing table names.
    Tables,
    /// A `DESCRIBE TABLE` issued for tag columns.
    TagKeys,
    /// A `DESCRIBE TABLE` issued for field columns.
    FieldNames,
    /// `SHOW TAG VALUES`, listing the values of one tag.
    TagValues,
    /// Anything else, treated as a custom single-column query.
    Custom,
}

impl MetadataQueryKind {
    /// Classify a metadata query by its prefix, case-insensitively.
    ///
    /// ```rust
    /// use cnosdb_datasource::meta::MetadataQueryKind;
    ///
    /// assert_eq!(MetadataQueryKind::of("show tables"), MetadataQueryKind::Tables);
    /// assert_eq!(MetadataQueryKind::of("SELECT 1"), MetadataQueryKind::Custom);
    /// ```
    pub fn of(query: &str) -> Self {
        let query = query.to_ascii_uppercase();
        if query.starts_with(query::SHOW_TABLES_PREFIX) {
            Self::Tables
        } else if query.starts_with(query::DESCRIBE_TAGS_PREFIX) {
            Self::TagKeys
        } else if query.starts_with(query::DESCRIBE_FIELDS_PREFIX) {
            Self::FieldNames
        } else if query.starts_with(query::SHOW_TAG_VALUES_PREFIX) {
            Self::TagValues
        } else {
            Self::Custom
        }
    }

    /// The column layout candidates for this query shape, tried in order.
    pub fn schemas(self) -> &'static [MetaSchema] {
        match self {
            Self::Tables => SHOW_TABLES_SCHEMAS,
            Self::TagKeys | Self::FieldNames => DESCRIBE_TABLE_SCHEMAS,
            Self::TagValues | Self::Custom => VALUE_SCHEMAS,
        }
    }

    /// The `column_type` rows kept by this shape, if it filters rows.
    fn row_filter(self) -> Option<&'static str> {
        match self {
            Self::TagKeys => Some(TAG_COLUMN_TYPE),
            Self::FieldNames => Some(FIELD_COLUMN_TYPE),
            _ => None,
        }
    }
}

/// A single suggestion returned to a variable picker.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct MetricFindValue {
    /// The value shown and substituted by the picker.
    pub text: String,
}

/// Extract template-variable values from the response frame of a
/// metadata query.
///
/// The query's prefix picks the [`MetaSchema`] candidates to look for and
/// whether rows are filtered by column type; values are stringified and
/// deduplicated preserving first appearance. Every degenerate input (a
/// missing frame, an unrecognized column layout, an empty result set)
/// yields an empty list rather than an error, so a misbehaving variable
/// query shows an empty picker instead of failing the dashboard.
pub fn metric_find_values(query: &str, frame: Option<&Frame>) -> Vec<MetricFindValue> {
    let Some(frame) = frame else {
        return Vec::new();
    };
    let kind = MetadataQueryKind::of(query);
    let Some(columns) = resolve_columns(frame, kind.schemas()) else {
        debug!(query, "no metadata column layout matched the frame");
        return Vec::new();
    };
    let fields = frame.fields();
    let texts: Vec<String> = match columns.as_slice() {
        &[values] => fields[values]
            .values()
            .iter()
            .map(ToString::to_string)
            .unique()
            .collect(),
        &[values, kinds] => {
            let keep = kind.row_filter();
            fields[values]
                .values()
                .iter()
                .zip(fields[kinds].values())
                .filter(|(_, kind_cell)| keep.map_or(true, |want| kind_cell.as_str() == Some(want)))
                .map(|(cell, _)| cell.to_string())
                .unique()
                .collect()
        }
        _ => Vec::new(),
    };
    texts
        .into_iter()
        .map(|text| MetricFindValue { text })
        .collect()
}

/// Find the first candidate whose columns all resolve in `frame`.
///
/// Resolution is all-or-nothing per candidate; one present and one absent
/// column means a different release, so the next candidate is tried.
fn resolve_columns(frame: &Frame, candidates: &[MetaSchema]) -> Option<Vec<usize>> {
    candidates.iter().find_map(|candidate| {
        candidate
            .keys
            .iter()
            .map(|key| frame.fields().iter().position(|field| field.name == *key))
            .collect::<Option<Vec<_>>>()
    })
}

#[cfg(test)]
mod test {
    use pretty_assertions::assert_eq;

    use super::*;
    use crate::{data::CellValue, prelude::*};

    fn texts(query: &str, frame: &Frame) -> Vec<String> {
        metric_find_values(query, Some(frame))
            .into_iter()
            .map(|v| v.text)
            .collect()
    }

    #[test]
    fn absent_frame_yields_nothing() {
        assert!(metric_find_values(&query::show_tables(), None).is_empty());
    }

    #[test]
    fn empty_result_yields_nothing() {
        let frame = [Vec::<&str>::new().into_field("table_name")].into_frame("t");
        assert_eq!(texts(&query::show_tables(), &frame), Vec::<String>::new());
    }

    #[test]
    fn unmatched_columns_yield_nothing() {
        let frame = [["x"].into_field("something_else")].into_frame("t");
        assert!(texts(&query::show_tables(), &frame).is_empty());
        assert!(texts(&query::show_tag_values("m", "k"), &frame).is_empty());
    }

    #[test]
    fn partially_matched_candidate_is_rejected() {
        // column_name without column_type matches no release's layout.
        let frame = [["ta", "fa"].into_field("column_name")].into_frame("t");
        assert!(texts(&query::describe_table_tags("m"), &frame).is_empty());
    }

    #[test]
    fn newest_layout_wins() {
        let frame = [
            ["old"].into_field("Table"),
            ["new"].into_field("table_name"),
        ]
        .into_frame("t");
        assert_eq!(texts(&query::show_tables(), &frame), ["new"]);

        let frame = [
            ["older"].into_field("Table"),
            ["mid"].into_field("TABLE_NAME"),
        ]
        .into_frame("t");
        assert_eq!(texts(&query::show_tables(), &frame), ["mid"]);
    }

    #[test]
    fn lists_tables() {
        let frame = [["cpu", "mem", "disk"].into_field("table_name")].into_frame("t");
        assert_eq!(texts(&query::show_tables(), &frame), ["cpu", "mem", "disk"]);
    }

    #[test]
    fn describe_filters_rows_by_column_type() {
        let frame = [
            ["time", "ta", "tb", "ta", "fa"].into_field("column_name"),
            ["TIME", "TAG", "TAG", "TAG", "FIELD"].into_field("column_type"),
        ]
        .into_frame("t");
        // The repeated ta row deduplicates after filtering.
        assert_eq!(texts(&query::describe_table_tags("m"), &frame), ["ta", "tb"]);
        assert_eq!(texts(&query::describe_table_fields("m"), &frame), ["fa"]);
    }

    #[test]
    fn describe_filter_is_case_strict() {
        let frame = [
            ["ta", "tb"].into_field("column_name"),
            ["tag", "TAG"].into_field("column_type"),
        ]
        .into_frame("t");
        assert_eq!(texts(&query::describe_table_tags("m"), &frame), ["tb"]);
    }

    #[test]
    fn deduplicates_preserving_first_appearance() {
        let frame = [["h2", "h1", "h2", "h3"].into_field("value")].into_frame("t");
        assert_eq!(
            texts(&query::show_tag_values("m", "host"), &frame),
            ["h2", "h1", "h3"]
        );
    }

    #[test]
    fn custom_queries_read_the_value_column() {
        let frame = [[
            CellValue::from(1u8),
            CellValue::from(2.5),
            CellValue::Null,
            CellValue::from("x"),
        ]
        .into_field("value")]
        .into_frame("t");
        assert_eq!(
            texts("SELECT DISTINCT n FROM t", &frame),
            ["1", "2.5", "null", "x"]
        );
    }

    #[test]
    fn dispatch_is_case_insensitive() {
        let frame = [["cpu"].into_field("table_name")].into_frame("t");
        assert_eq!(texts("show tables", &frame), ["cpu"]);
    }

    #[test]
    fn builders_classify_to_their_own_kind() {
        assert_eq!(
            MetadataQueryKind::of(&query::show_tables()),
            MetadataQueryKind::Tables
        );
        assert_eq!(
            MetadataQueryKind::of(&query::describe_table_tags("m")),
            MetadataQueryKind::TagKeys
        );
        assert_eq!(
            MetadataQueryKind::of(&query::describe_table_fields("m")),
            MetadataQueryKind::FieldNames
        );
        assert_eq!(
            MetadataQueryKind::of(&query::show_tag_values("m", "k")),
            MetadataQueryKind::TagValues
        );
    }
}
