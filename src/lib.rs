/*! Core types for the CnosDB Grafana data source.

This crate contains the transport-free parts of the data source: the data
model exchanged with Grafana, the query documents the editor produces,
and the construction and interpretation of CnosDB's HTTP API traffic.

- [`data`] contains the fundamental data structures, [`Frame`][data::Frame]s
  and [`Field`][data::Field]s, along with their JSON wire format.
- [`query`] is the structured query model built by the query editor and
  its rendering into CnosDB SQL.
- [`response`] converts CnosDB's SQL responses into frames.
- [`meta`] builds the metadata queries behind template-variable pickers
  and extracts the pickers' values from response frames.
- [`settings`], [`api`] and [`datasource`] turn the options of a
  configured instance into ready-to-send [`http::Request`] values.

The [`prelude`] contains some useful unambiguous traits which are helpful
when creating some structures, particularly [`Frame`][data::Frame]s and
[`Field`][data::Field]s.

Executing the requests, authentication and TLS all belong to the host
and are deliberately absent here; everything in this crate is plain data
in and plain data out.

# Example

Extracting template-variable suggestions from a metadata response frame:

```rust
use cnosdb_datasource::{meta, prelude::*};

let frame = [["cpu", "mem", "cpu"].into_field("table_name")].into_frame("tables");
let values = meta::metric_find_values(&meta::query::show_tables(), Some(&frame));
let names: Vec<_> = values.into_iter().map(|v| v.text).collect();
assert_eq!(names, ["cpu", "mem"]);
```

Rendering a query editor document into SQL:

```rust
use chrono::{TimeZone, Utc};
use cnosdb_datasource::{datasource::TimeRange, query::QueryModel};

let mut model: QueryModel = serde_json::from_str(
    r#"{
        "table": "cpu",
        "select": [[ { "type": "field", "params": ["usage"] }, { "type": "avg" } ]],
        "groupBy": [ { "type": "time", "params": ["10 minutes"] } ]
    }"#,
)?;
model.introspect()?;
let range = TimeRange {
    from: Utc.with_ymd_and_hms(2022, 10, 10, 0, 0, 0).single().unwrap(),
    to: Utc.with_ymd_and_hms(2022, 10, 17, 0, 0, 0).single().unwrap(),
};
let sql = model.build(&range)?;
assert!(sql.starts_with("SELECT DATE_BIN(INTERVAL '10 minutes', time,"));
# Ok::<_, Box<dyn std::error::Error>>(())
```
*/
#![cfg_attr(docsrs, feature(doc_notable_trait))]
#![deny(missing_docs)]

pub mod api;
pub mod data;
pub mod datasource;
pub mod meta;
pub mod query;
pub mod response;
pub mod settings;

/// Contains useful helper traits for constructing [`Field`][data::Field]s
/// and [`Frame`][data::Frame]s.
pub mod prelude {
    pub use crate::api::Api;
    pub use crate::data::{FromFields, IntoField, IntoFrame};
}
