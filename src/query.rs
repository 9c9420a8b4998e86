/*! The structured query model and its SQL rendering.

The query editor stores queries as a JSON document of select chains, tag
conditions and group-by items rather than as SQL. This module
deserializes that document tolerantly, validates it and derives the
values the editor leaves implicit ([`QueryModel::introspect`]), and
renders the SQL statement sent to CnosDB ([`QueryModel::build`]).

Rendering pivots on the `time` group-by item: with one, the time column
is bucketed through `DATE_BIN` and the buckets grouped; without one the
plain `time` column is selected. `fill` is carried for the host's
post-processing but never rendered, since CnosDB's SQL has no FILL
clause.
*/

use chrono::{DateTime, Duration, Utc};
use itertools::Itertools;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use serde_with::skip_serializing_none;
use thiserror::Error;
use tracing::debug;

use crate::datasource::TimeRange;

/// The row limit applied when a query does not set one.
const DEFAULT_LIMIT: u64 = 1000;
/// The time ordering applied when a query does not set one.
const DEFAULT_ORDER: &str = "ASC";

const ITEM_FIELD: &str = "field";
const ITEM_ALIAS: &str = "alias";
const ITEM_TIME: &str = "time";
const ITEM_TAG: &str = "tag";
const ITEM_FILL: &str = "fill";

/// Errors arising while validating or rendering a query.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum Error {
    /// Occurs when a raw query carries no SQL text.
    #[error("raw query has no query text")]
    MissingQueryText,
    /// Occurs when a builder query names no table.
    #[error("query has no table")]
    MissingTable,
    /// Occurs when a select chain does not open with a one-column `field` item.
    #[error("select chain {index} does not start with a single-column field item")]
    InvalidSelect {
        /// The position of the offending chain.
        index: usize,
    },
    /// Occurs when an instant of the time range cannot be expressed in
    /// nanoseconds since the epoch.
    #[error("time {0} is outside the nanosecond-representable range")]
    TimeOutOfRange(DateTime<Utc>),
}

/// The JSON query document produced by the query editor.
///
/// Unknown keys (panel bookkeeping such as `datasourceId`, `intervalMs`
/// or `maxDataPoints`) are ignored on deserialization, and absent keys
/// default, so documents from every editor version parse.
#[skip_serializing_none]
#[derive(Clone, Debug, Default, Deserialize, Serialize)]
#[serde(rename_all = "camelCase", default)]
pub struct QueryModel {
    /// The table to query.
    pub table: Option<String>,
    /// Select chains; each chain opens with a `field` item that the
    /// following items wrap.
    pub select: Vec<Vec<SelectItem>>,
    /// Structured tag conditions on the WHERE clause.
    pub tags: Vec<TagItem>,
    /// A free-form tag expression taking precedence over `tags` when set.
    pub raw_tags_expr: Option<String>,
    /// Group-by items: a `time` bucket, tags, and a `fill` mode.
    pub group_by: Vec<SelectItem>,
    /// The resample interval; derived from the `time` group-by item when
    /// unset.
    pub interval: Option<String>,
    /// The fill mode; derived from the `fill` group-by item when unset.
    pub fill: Option<String>,
    /// `ASC` or `DESC` ordering of the time column.
    pub order_by_time: Option<String>,
    /// The maximum number of rows to return.
    pub limit: Option<Limit>,
    /// Timezone hint from the editor; carried but never rendered.
    pub tz: Option<String>,
    /// When set, `query_text` is executed verbatim.
    pub raw_query: bool,
    /// The SQL of a raw query.
    pub query_text: Option<String>,
    /// Display alias for the resulting series.
    pub alias: Option<String>,
}

/// A row limit, accepted as either a JSON number or a string.
#[derive(Clone, Debug, PartialEq, Eq, Deserialize, Serialize)]
#[serde(untagged)]
pub enum Limit {
    /// A numeric limit.
    Count(u64),
    /// A limit entered as text.
    Text(String),
}

impl std::fmt::Display for Limit {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Count(n) => write!(f, "{n}"),
            Self::Text(s) => f.write_str(s),
        }
    }
}

/// One item of a select or group-by chain.
#[derive(Clone, Debug, Default, Deserialize, Serialize)]
#[serde(default)]
pub struct SelectItem {
    /// The kind of item: `field`, `alias`, `time`, `tag`, `fill`, or the
    /// name of a function to apply.
    #[serde(rename = "type")]
    pub item_type: String,
    /// The item's parameters; their meaning depends on `item_type`.
    pub params: Vec<Value>,
}

/// One structured tag condition.
#[skip_serializing_none]
#[derive(Clone, Debug, Default, Deserialize, Serialize)]
#[serde(default)]
pub struct TagItem {
    /// The tag column compared.
    pub key: String,
    /// The comparison operator; `=` when unset.
    pub operator: Option<String>,
    /// The connective joining this condition to the previous one; `AND`
    /// when unset.
    pub condition: Option<String>,
    /// The value compared against.
    pub value: String,
}

impl QueryModel {
    /// Validate the query and derive the values the editor leaves implicit.
    ///
    /// Raw queries must carry SQL text; builder queries must name a table
    /// and open every select chain with a single-column `field` item.
    /// `interval` and `fill` are backfilled from the corresponding
    /// group-by items, but only when not already set.
    pub fn introspect(&mut self) -> Result<(), Error> {
        if self.raw_query {
            if self.query_text.as_deref().map_or(true, str::is_empty) {
                return Err(Error::MissingQueryText);
            }
            return Ok(());
        }
        if self.table.as_deref().map_or(true, str::is_empty) {
            return Err(Error::MissingTable);
        }
        for (index, chain) in self.select.iter().enumerate() {
            let opens_with_field = chain
                .first()
                .map_or(false, |item| item.item_type == ITEM_FIELD && item.params.len() == 1);
            if !opens_with_field {
                return Err(Error::InvalidSelect { index });
            }
        }
        for item in &self.group_by {
            match item.item_type.as_str() {
                ITEM_TIME if self.interval.is_none() => {
                    self.interval = item.params.first().map(render_param);
                }
                ITEM_FILL if self.fill.is_none() => {
                    self.fill = item.params.first().map(render_param);
                }
                _ => {}
            }
        }
        Ok(())
    }

    /// Render the SQL statement for this query over `range`.
    ///
    /// Callers should run [`QueryModel::introspect`] first; `build` does
    /// not re-validate select chains.
    pub fn build(&self, range: &TimeRange) -> Result<String, Error> {
        if self.raw_query {
            return self.query_text.clone().ok_or(Error::MissingQueryText);
        }
        let table = self.table.as_deref().ok_or(Error::MissingTable)?;
        let from = nanoseconds(range.from)?;
        let to = nanoseconds(range.to)?;

        let time_expr = self
            .group_by
            .iter()
            .find(|item| item.item_type == ITEM_TIME)
            .and_then(|item| item.params.first())
            .map(|bucket| {
                format!(
                    "DATE_BIN(INTERVAL '{}', time, TIMESTAMP '1970-01-01T00:00:00Z')",
                    render_param(bucket)
                )
            });

        let mut sql = String::from("SELECT ");
        match &time_expr {
            Some(bucketed) => {
                sql.push_str(bucketed);
                sql.push_str(" AS time");
            }
            None => sql.push_str("time"),
        }
        for chain in &self.select {
            sql.push_str(", ");
            sql.push_str(&select_expr(chain));
        }

        sql.push_str(&format!(
            " FROM {table} WHERE time >= {from} AND time <= {to}"
        ));
        if let Some(conditions) = self.tag_conditions() {
            sql.push_str(" AND ");
            sql.push_str(&conditions);
        }

        let tag_groups = self
            .group_by
            .iter()
            .filter(|item| item.item_type == ITEM_TAG)
            .filter_map(|item| item.params.first())
            .map(|param| format!("\"{}\"", render_param(param)))
            .collect::<Vec<_>>();
        match &time_expr {
            Some(bucketed) => {
                sql.push_str(" GROUP BY ");
                sql.push_str(bucketed);
                for group in &tag_groups {
                    sql.push_str(", ");
                    sql.push_str(group);
                }
            }
            None if !tag_groups.is_empty() => {
                sql.push_str(" GROUP BY ");
                sql.push_str(&tag_groups.iter().join(", "));
            }
            None => {}
        }

        let order = self
            .order_by_time
            .as_deref()
            .filter(|order| !order.is_empty())
            .unwrap_or(DEFAULT_ORDER);
        sql.push_str(&format!(" ORDER BY time {order}"));
        let limit = self
            .limit
            .as_ref()
            .map_or_else(|| DEFAULT_LIMIT.to_string(), ToString::to_string);
        sql.push_str(&format!(" LIMIT {limit}"));

        debug!(%sql, "built SQL statement");
        Ok(sql)
    }

    /// Apply the host's template substitution to every user-entered text
    /// slot of this query.
    ///
    /// The substitution function is injected by the caller; nothing here
    /// knows about scoped variables or a template engine.
    pub fn interpolate(&mut self, replace: impl Fn(&str) -> String) {
        if let Some(table) = &mut self.table {
            *table = replace(table);
        }
        for chain in &mut self.select {
            for item in chain {
                replace_string_params(item, &replace);
            }
        }
        for item in &mut self.group_by {
            replace_string_params(item, &replace);
        }
        for tag in &mut self.tags {
            tag.key = replace(&tag.key);
            tag.value = replace(&tag.value);
        }
        if let Some(expr) = &mut self.raw_tags_expr {
            *expr = replace(expr);
        }
        if self.raw_query {
            if let Some(text) = &mut self.query_text {
                *text = replace(text);
            }
        }
        if let Some(alias) = &mut self.alias {
            *alias = replace(alias);
        }
    }

    /// The WHERE-clause tag conditions, if any.
    ///
    /// A non-empty `raw_tags_expr` is used verbatim; otherwise the
    /// structured tags render `"key" op 'value'` joined by each tag's
    /// connective.
    fn tag_conditions(&self) -> Option<String> {
        if let Some(expr) = self.raw_tags_expr.as_deref().filter(|expr| !expr.is_empty()) {
            return Some(expr.to_owned());
        }
        if self.tags.is_empty() {
            return None;
        }
        let mut conditions = String::new();
        for (index, tag) in self.tags.iter().enumerate() {
            if index > 0 {
                conditions.push(' ');
                conditions.push_str(tag.condition.as_deref().unwrap_or("AND"));
                conditions.push(' ');
            }
            conditions.push_str(&format!(
                "\"{}\" {} '{}'",
                tag.key,
                tag.operator.as_deref().unwrap_or("="),
                tag.value
            ));
        }
        Some(conditions)
    }
}

/// Fold a select chain into a SQL expression.
///
/// The opening `field` item quotes its column; an `alias` item wraps the
/// expression in `AS "name"`; any other item applies itself as a function,
/// its params becoming trailing arguments.
fn select_expr(chain: &[SelectItem]) -> String {
    let Some((field, rest)) = chain.split_first() else {
        return String::new();
    };
    let mut expr = field
        .params
        .first()
        .map(|param| format!("\"{}\"", render_param(param)))
        .unwrap_or_default();
    for item in rest {
        expr = match item.item_type.as_str() {
            ITEM_ALIAS => format!(
                "{expr} AS \"{}\"",
                item.params.first().map(render_param).unwrap_or_default()
            ),
            function => {
                let args = std::iter::once(expr)
                    .chain(item.params.iter().map(render_param))
                    .join(", ");
                format!("{function}({args})")
            }
        };
    }
    expr
}

/// Render a select-item parameter as bare text.
///
/// Strings drop their quotes; everything else keeps its JSON rendering.
fn render_param(param: &Value) -> String {
    match param {
        Value::String(s) => s.clone(),
        other => other.to_string(),
    }
}

fn replace_string_params(item: &mut SelectItem, replace: &impl Fn(&str) -> String) {
    for param in &mut item.params {
        if let Value::String(s) = param {
            *s = replace(s);
        }
    }
}

fn nanoseconds(instant: DateTime<Utc>) -> Result<i64, Error> {
    instant
        .timestamp_nanos_opt()
        .ok_or(Error::TimeOutOfRange(instant))
}

/// Parse an interval of the form `"<count> <unit>"`.
///
/// Units match by prefix, so `second`, `seconds`, `minute`, `minutes`,
/// `hour` and `hours` are all accepted; anything else yields `None`.
pub fn parse_interval(interval: &str) -> Option<Duration> {
    let mut parts = interval.split(' ');
    let count: i64 = parts.next()?.parse().ok()?;
    let unit = parts.next()?.to_ascii_lowercase();
    if unit.starts_with("second") {
        Duration::try_seconds(count)
    } else if unit.starts_with("minute") {
        Duration::try_minutes(count)
    } else if unit.starts_with("hour") {
        Duration::try_hours(count)
    } else {
        None
    }
}
