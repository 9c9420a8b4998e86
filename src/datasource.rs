/*! The data source instance: mode-driven API selection and the glue
between the host's envelopes and this crate's extraction logic.

A [`Datasource`] is built from its
[`DataSourceOptions`][crate::settings::DataSourceOptions] and owns the
[`Api`] flavor those options select. It builds the request documents the
host sends on the instance's behalf and picks apart the response
envelopes the host hands back.
*/

use std::collections::HashMap;
use std::fmt;

use chrono::{DateTime, Utc};
use serde::Deserialize;
use serde_json::{json, Value};

use crate::{
    api::{Api, CloudApi, SqlApi},
    data::Frame,
    meta::{metric_find_values, MetricFindValue},
    settings::{CnosDbMode, DataSourceOptions},
};

/// The `refId` under which metadata queries are issued and answered.
pub const METRIC_QUERY_REF_ID: &str = "MetricQuery";

/// The time range over which a query runs.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct TimeRange {
    /// The start time of the query.
    pub from: DateTime<Utc>,
    /// The end time of the query.
    pub to: DateTime<Utc>,
}

/// One configured CnosDB data source instance.
///
/// ```rust
/// use cnosdb_datasource::{datasource::Datasource, settings::DataSourceOptions};
///
/// let mut options = DataSourceOptions::default();
/// options.host = Some("localhost".to_string());
/// options.port = Some(8902);
/// let datasource = Datasource::new(options)?.with_uid("P8E9168DE2B3A3C96");
/// let request = datasource.query_request("SELECT 1")?;
/// assert_eq!(request.uri().path(), "/api/v1/sql");
/// # Ok::<_, Box<dyn std::error::Error>>(())
/// ```
pub struct Datasource {
    uid: Option<String>,
    api: Box<dyn Api + Send + Sync>,
}

impl Datasource {
    /// Create a data source from its connection options.
    ///
    /// The options' mode picks the API flavor all requests go through.
    pub fn new(options: DataSourceOptions) -> Result<Self, crate::settings::Error> {
        let base = options.url()?;
        let api: Box<dyn Api + Send + Sync> = match options.mode {
            CnosDbMode::Private => Box::new(SqlApi::new(base, &options)),
            CnosDbMode::PublicCloud => Box::new(CloudApi::new(base, &options)),
        };
        Ok(Self { uid: None, api })
    }

    /// Attach the Grafana-assigned `uid` of this instance, carried in
    /// metadata query requests so the host routes them back here.
    #[must_use]
    pub fn with_uid(mut self, uid: impl Into<String>) -> Self {
        self.uid = Some(uid.into());
        self
    }

    /// The `/api/ds/query` body for a metadata query.
    ///
    /// The query runs as a single raw target under
    /// [`METRIC_QUERY_REF_ID`], which
    /// [`parse_metric_find_response`][Self::parse_metric_find_response]
    /// looks up again on the way back.
    pub fn metric_find_request(&self, query: &str) -> Value {
        let mut target = json!({
            "refId": METRIC_QUERY_REF_ID,
            "rawQuery": true,
            "queryText": query,
        });
        if let Some(uid) = &self.uid {
            target["datasource"] = json!({ "uid": uid });
        }
        json!({ "queries": [target] })
    }

    /// Extract variable values from the host's answer to a metadata query.
    ///
    /// Every missing link (no `MetricQuery` result, no frames in it)
    /// yields an empty list rather than an error.
    pub fn parse_metric_find_response(
        &self,
        query: &str,
        response: &QueryDataResponse,
    ) -> Vec<MetricFindValue> {
        let frame = response
            .results
            .get(METRIC_QUERY_REF_ID)
            .and_then(|result| result.frames.first());
        metric_find_values(query, frame)
    }

    /// Build the HTTP request executing `sql`.
    pub fn query_request(&self, sql: &str) -> Result<http::Request<String>, crate::api::Error> {
        self.api.build_query_request(sql)
    }

    /// Build the health-check HTTP request.
    pub fn ping_request(&self) -> Result<http::Request<String>, crate::api::Error> {
        self.api.build_ping_request()
    }
}

impl fmt::Debug for Datasource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Datasource")
            .field("uid", &self.uid)
            .finish_non_exhaustive()
    }
}

/// The host's envelope for `/api/ds/query` responses.
#[derive(Debug, Default, Deserialize)]
pub struct QueryDataResponse {
    /// The result of each query, keyed by its `refId`.
    #[serde(default)]
    pub results: HashMap<String, DataResponse>,
}

/// The result of a single query within a [`QueryDataResponse`].
#[derive(Debug, Default, Deserialize)]
pub struct DataResponse {
    /// The frames this query produced.
    #[serde(default)]
    pub frames: Vec<Frame>,
    /// The error text, if the query failed.
    #[serde(default)]
    pub error: Option<String>,
}

#[cfg(test)]
mod test {
    use pretty_assertions::assert_eq;
    use serde_json::{from_str, json};

    use super::*;
    use crate::meta;

    fn local_datasource() -> Datasource {
        let options = from_str(r#"{ "host": "localhost", "port": 8902 }"#).unwrap();
        Datasource::new(options).unwrap()
    }

    #[test]
    fn metric_find_requests_run_as_raw_queries() {
        let datasource = local_datasource().with_uid("Jn47KMS4z");
        assert_eq!(
            datasource.metric_find_request("SHOW TABLES"),
            json!({
                "queries": [{
                    "refId": "MetricQuery",
                    "rawQuery": true,
                    "queryText": "SHOW TABLES",
                    "datasource": { "uid": "Jn47KMS4z" },
                }]
            }),
        );
    }

    #[test]
    fn metric_find_requests_omit_the_uid_until_assigned() {
        let datasource = local_datasource();
        let request = datasource.metric_find_request("SHOW TABLES");
        assert_eq!(request["queries"][0].get("datasource"), None);
    }

    #[test]
    fn extracts_values_from_a_host_response() {
        let datasource = local_datasource();
        let response: QueryDataResponse = from_str(
            r#"
{
    "results": {
        "MetricQuery": {
            "frames": [{
                "schema": {
                    "name": "tables",
                    "refId": "MetricQuery",
                    "fields": [{ "name": "table_name", "type": "string" }]
                },
                "data": { "values": [["cpu", "mem", "cpu"]] }
            }]
        }
    }
}"#,
        )
        .unwrap();
        let values =
            datasource.parse_metric_find_response(&meta::query::show_tables(), &response);
        let texts: Vec<_> = values.iter().map(|v| v.text.as_str()).collect();
        assert_eq!(texts, ["cpu", "mem"]);
    }

    #[test]
    fn missing_results_are_not_an_error() {
        let datasource = local_datasource();

        let empty = QueryDataResponse::default();
        assert!(datasource
            .parse_metric_find_response("SHOW TABLES", &empty)
            .is_empty());

        let other_ref: QueryDataResponse =
            from_str(r#"{ "results": { "A": { "frames": [] } } }"#).unwrap();
        assert!(datasource
            .parse_metric_find_response("SHOW TABLES", &other_ref)
            .is_empty());

        let no_frames: QueryDataResponse =
            from_str(r#"{ "results": { "MetricQuery": { "error": "boom" } } }"#).unwrap();
        assert!(datasource
            .parse_metric_find_response("SHOW TABLES", &no_frames)
            .is_empty());
    }

    #[test]
    fn mode_selects_the_api_flavor() {
        let options: DataSourceOptions = from_str(
            r#"{ "host": "cloud.cnosdb.com", "enableHttps": true, "cnosdbMode": 1, "apiKey": "k" }"#,
        )
        .unwrap();
        let datasource = Datasource::new(options).unwrap();
        let ping = datasource.ping_request().unwrap();
        assert_eq!(
            ping.uri().to_string(),
            "https://cloud.cnosdb.com:443/api/v1/ping?apikey=k"
        );

        let ping = local_datasource().ping_request().unwrap();
        assert_eq!(ping.uri().to_string(), "http://localhost:8902/api/v1/ping");
    }
}
