/*! Conversion of CnosDB SQL responses into data [`Frame`]s.

CnosDB answers `/api/v1/sql` with a JSON array of row objects. Grafana
wants columns, so the rows are pivoted: one field per column, rows kept
aligned by backfilling nulls for the keys a row lacks. The `time` column
is parsed from CnosDB's rendered timestamps into epoch-millisecond
number cells, the representation Grafana expects of a time field.

Failure responses are not arrays but objects carrying the server's error
text; those become [`Error::Server`] values.
*/

use std::collections::HashMap;

use chrono::NaiveDateTime;
use serde::Deserialize;
use serde_json::{Map, Value};
use thiserror::Error;
use tracing::debug;

use crate::{
    data::{CellValue, Field, Frame},
    query::QueryModel,
};

/// The column CnosDB returns timestamps in.
pub const TIME_COLUMN: &str = "time";

// Layout lengths of "2022-10-10T00:00:00" and its fractional variants,
// used to pick the parse format.
const SECONDS_LEN: usize = 19;
const MILLIS_LEN: usize = 23;
const MICROS_LEN: usize = 26;

const LAYOUT_SECONDS: &str = "%Y-%m-%dT%H:%M:%S";
const LAYOUT_SECONDS_SPACED: &str = "%Y-%m-%d %H:%M:%S";
const LAYOUT_MILLIS: &str = "%Y-%m-%dT%H:%M:%S%.3f";
const LAYOUT_MICROS: &str = "%Y-%m-%dT%H:%M:%S%.6f";
const LAYOUT_NANOS: &str = "%Y-%m-%dT%H:%M:%S%.9f";

/// Errors arising while interpreting a CnosDB response.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum Error {
    /// Occurs when the response body is not valid JSON.
    #[error("response is not valid JSON: {0}")]
    InvalidJson(#[from] serde_json::Error),
    /// Occurs when CnosDB reports a query failure.
    #[error("CnosDB error{}: {message}", .code.as_deref().map(|code| format!(" (code {code})")).unwrap_or_default())]
    Server {
        /// The server's error code, when present.
        code: Option<String>,
        /// The server's error text.
        message: String,
    },
    /// Occurs when a `time` cell holds something other than a string.
    #[error("time column holds a non-string value: {value}")]
    TimeNotAString {
        /// The offending cell.
        value: Value,
    },
    /// Occurs when a timestamp matches none of the known layouts.
    #[error("unrecognized time value {value:?}")]
    InvalidTime {
        /// The offending timestamp text.
        value: String,
        /// The parse failure of the layout picked for it.
        source: chrono::ParseError,
    },
}

/// Parse one of the timestamp renderings CnosDB uses in result sets.
///
/// The layout is picked by input length: seconds, milliseconds,
/// microseconds or nanoseconds of precision, with either a `T` or a
/// space between date and time in the seconds form.
///
/// ```rust
/// use cnosdb_datasource::response::parse_time_string;
///
/// let spaced = parse_time_string("2022-03-07 11:39:00")?;
/// let tee = parse_time_string("2022-03-07T11:39:00")?;
/// assert_eq!(spaced, tee);
/// # Ok::<_, cnosdb_datasource::response::Error>(())
/// ```
pub fn parse_time_string(value: &str) -> Result<NaiveDateTime, Error> {
    let layout = match value.len() {
        SECONDS_LEN => {
            if value.as_bytes().get(10) == Some(&b'T') {
                LAYOUT_SECONDS
            } else {
                LAYOUT_SECONDS_SPACED
            }
        }
        MILLIS_LEN => LAYOUT_MILLIS,
        MICROS_LEN => LAYOUT_MICROS,
        _ => LAYOUT_NANOS,
    };
    NaiveDateTime::parse_from_str(value, layout).map_err(|source| Error::InvalidTime {
        value: value.to_owned(),
        source,
    })
}

/// The shape of a CnosDB failure response.
#[derive(Debug, Default, Deserialize)]
struct ErrorBody {
    #[serde(default)]
    error_code: Option<String>,
    #[serde(default)]
    error_message: Option<String>,
    #[serde(default)]
    message: Option<String>,
}

impl From<ErrorBody> for Error {
    fn from(body: ErrorBody) -> Self {
        Self::Server {
            code: body.error_code,
            message: body.error_message.or(body.message).unwrap_or_default(),
        }
    }
}

/// Convert the body of a CnosDB `/api/v1/sql` response into a frame.
///
/// The frame is named after the query's table (builder queries only) and
/// leads with the `time` field; the remaining columns appear in
/// first-seen order. Cells with no scalar representation are stored as
/// null so columns stay row-aligned.
pub fn from_sql_response(body: &[u8], query: &QueryModel) -> Result<Frame, Error> {
    let mut frame = match query.table.as_deref().filter(|_| !query.raw_query) {
        Some(table) => Frame::new(table),
        None => Frame::default(),
    };
    if body.is_empty() {
        return Ok(frame.with_field(Field::new(TIME_COLUMN, Vec::<CellValue>::new())));
    }

    let rows: Vec<Map<String, Value>> = match serde_json::from_slice(body) {
        Ok(rows) => rows,
        // A non-array body is the server reporting a failure.
        Err(source) => {
            return Err(match serde_json::from_slice::<ErrorBody>(body) {
                Ok(error_body) => error_body.into(),
                Err(_) => Error::InvalidJson(source),
            });
        }
    };

    let row_count = rows.len();
    let mut time = vec![CellValue::Null; row_count];
    let mut order: Vec<String> = Vec::new();
    let mut columns: HashMap<String, Vec<CellValue>> = HashMap::new();

    for (row_index, row) in rows.iter().enumerate() {
        for (column, value) in row {
            if column == TIME_COLUMN {
                let text = value.as_str().ok_or_else(|| Error::TimeNotAString {
                    value: value.clone(),
                })?;
                let instant = parse_time_string(text)?;
                time[row_index] =
                    CellValue::Number(instant.and_utc().timestamp_millis().into());
                continue;
            }
            let cells = columns.entry(column.clone()).or_insert_with(|| {
                order.push(column.clone());
                vec![CellValue::Null; row_count]
            });
            match CellValue::from_json(value) {
                Some(cell) => cells[row_index] = cell,
                None => debug!(%column, %value, "dropping non-scalar cell"),
            }
        }
    }

    frame.add_field(Field::new(TIME_COLUMN, time));
    for column in order {
        let values = columns.remove(&column).unwrap_or_default();
        frame.add_field(Field::new(column, values));
    }
    Ok(frame)
}
