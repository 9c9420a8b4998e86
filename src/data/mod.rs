/*! Data types used across the query and metadata paths.

Queries return [`Frame`]s of data, each holding a number of [`Field`]s.
Fields are columns of scalar [`CellValue`]s, the scalar universe of the
JSON wire format.

Frames travel as a split schema/data JSON document. Serialization goes
through [`Frame::check`], which verifies that all fields have equal
length; deserialization is tolerant of the extra keys other
implementations attach.

# Examples

```rust
use cnosdb_datasource::prelude::*;

let frame = [
    ["2022-10-10T00:00:00", "2022-10-10T00:00:10"].into_field("time"),
    [1665360000000u64, 1665360010000].into_field("epoch"),
    [Some(0.3), None].into_field("usage"),
]
.into_frame("cpu");
let json = frame
    .check()?
    .to_json(cnosdb_datasource::data::FrameInclude::All)?;
assert!(json.starts_with(br#"{"schema""#));
# Ok::<_, Box<dyn std::error::Error>>(())
```
*/

mod cell;
mod error;
mod field;
mod frame;

pub use cell::{CellValue, EXPLICIT_NULL};
pub use error::Error;
pub use field::{Field, IntoField};
pub use frame::{
    CheckedFrame, Frame, FrameInclude, FromFields, IntoFrame, Metadata, Notice, Severity,
};
