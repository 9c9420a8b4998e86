/*! Construction of the HTTP requests a data source instance sends to CnosDB.

Requests are plain [`http::Request`] values. Executing them, along with
authentication, TLS and retries, is the host's business; nothing in this
module performs I/O or holds a connection.

The per-query execution knobs among the
[`DataSourceOptions`][crate::settings::DataSourceOptions] (database,
tenant, partitioning, chunking) do not vary between requests, so
[`SqlApi`] renders them into the query string once at construction.
*/

use std::fmt;

use http::{header, Method, Request, Uri};
use percent_encoding::{utf8_percent_encode, AsciiSet, CONTROLS};
use serde_json::json;
use thiserror::Error;
use tracing::debug;

use crate::settings::DataSourceOptions;

/// The path queries are POSTed to.
const SQL_PATH: &str = "/api/v1/sql";
/// The path health checks hit.
const PING_PATH: &str = "/api/v1/ping";

/// Characters escaped in query-string values.
const QUERY_VALUE: &AsciiSet = &CONTROLS
    .add(b' ')
    .add(b'"')
    .add(b'#')
    .add(b'<')
    .add(b'>')
    .add(b'%')
    .add(b'&')
    .add(b'+')
    .add(b'=')
    .add(b'?');

/// Errors arising while constructing a request.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum Error {
    /// Occurs when the assembled URI or request is invalid.
    #[error("invalid request: {0}")]
    Http(#[from] http::Error),
    /// Occurs when a request body cannot be serialized.
    #[error("invalid request body: {0}")]
    Json(#[from] serde_json::Error),
}

/// Builds the HTTP requests one CnosDB API flavor accepts.
///
/// [`SqlApi`] speaks to self-hosted deployments and [`CloudApi`] to
/// CnosDB Cloud; the [`Datasource`][crate::datasource::Datasource] picks
/// the implementation from its options.
#[cfg_attr(docsrs, doc(notable_trait))]
pub trait Api {
    /// Build the request executing `sql`.
    fn build_query_request(&self, sql: &str) -> Result<Request<String>, Error>;

    /// Build the health-check request.
    fn build_ping_request(&self) -> Result<Request<String>, Error>;
}

/// The `/api/v1/sql` API of a self-hosted CnosDB.
#[derive(Clone, Debug)]
pub struct SqlApi {
    base: Uri,
    sql_path_and_query: String,
}

impl SqlApi {
    /// Create an API rooted at `base`, rendering the execution knobs of
    /// `options` into the query string.
    pub fn new(base: Uri, options: &DataSourceOptions) -> Self {
        let mut params = Vec::new();
        if let Some(database) = options.database.as_deref().filter(|v| !v.is_empty()) {
            params.push(format!("db={}", utf8_percent_encode(database, QUERY_VALUE)));
        }
        if let Some(tenant) = options.tenant.as_deref().filter(|v| !v.is_empty()) {
            params.push(format!(
                "tenant={}",
                utf8_percent_encode(tenant, QUERY_VALUE)
            ));
        }
        if let Some(partitions) = options.target_partitions {
            params.push(format!("target_partitions={partitions}"));
        }
        if let Some(interval) = options.stream_trigger_interval.as_deref().filter(|v| !v.is_empty())
        {
            params.push(format!(
                "stream_trigger_interval={}",
                utf8_percent_encode(interval, QUERY_VALUE)
            ));
        }
        if options.use_chunked_response {
            params.push("chunked".to_owned());
        }
        let sql_path_and_query = if params.is_empty() {
            SQL_PATH.to_owned()
        } else {
            format!("{SQL_PATH}?{}", params.join("&"))
        };
        Self {
            base,
            sql_path_and_query,
        }
    }
}

impl Api for SqlApi {
    fn build_query_request(&self, sql: &str) -> Result<Request<String>, Error> {
        let uri = endpoint(&self.base, &self.sql_path_and_query)?;
        debug!(%uri, sql, "building query request");
        Ok(Request::builder()
            .method(Method::POST)
            .uri(uri)
            .header(header::ACCEPT, "application/json")
            .body(sql.to_owned())?)
    }

    fn build_ping_request(&self) -> Result<Request<String>, Error> {
        Ok(Request::builder()
            .method(Method::GET)
            .uri(endpoint(&self.base, PING_PATH)?)
            .body(String::new())?)
    }
}

/// The CnosDB Cloud API, which authenticates with an API key carried in
/// the request itself.
#[derive(Clone)]
pub struct CloudApi {
    base: Uri,
    api_key: String,
    database: String,
}

impl CloudApi {
    /// Create an API rooted at `base` for the given options.
    pub fn new(base: Uri, options: &DataSourceOptions) -> Self {
        Self {
            base,
            api_key: options.api_key.clone().unwrap_or_default(),
            database: options.database.clone().unwrap_or_default(),
        }
    }
}

impl Api for CloudApi {
    fn build_query_request(&self, sql: &str) -> Result<Request<String>, Error> {
        let body = serde_json::to_string(&json!({
            "apikey": self.api_key,
            "database": self.database,
            "sql": sql,
        }))?;
        let uri = endpoint(&self.base, SQL_PATH)?;
        debug!(%uri, sql, "building cloud query request");
        Ok(Request::builder()
            .method(Method::POST)
            .uri(uri)
            .header(header::CONTENT_TYPE, "application/json")
            .header(header::ACCEPT, "application/json")
            .body(body)?)
    }

    fn build_ping_request(&self) -> Result<Request<String>, Error> {
        let path = format!(
            "{PING_PATH}?apikey={}",
            utf8_percent_encode(&self.api_key, QUERY_VALUE)
        );
        Ok(Request::builder()
            .method(Method::GET)
            .uri(endpoint(&self.base, &path)?)
            .body(String::new())?)
    }
}

impl fmt::Debug for CloudApi {
    // The API key stays out of logs.
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CloudApi")
            .field("base", &self.base)
            .field("database", &self.database)
            .finish_non_exhaustive()
    }
}

/// Rebase `path_and_query` onto `base`, keeping its scheme and authority.
fn endpoint(base: &Uri, path_and_query: &str) -> Result<Uri, Error> {
    let mut parts = base.clone().into_parts();
    parts.path_and_query = Some(path_and_query.parse().map_err(http::Error::from)?);
    Ok(Uri::from_parts(parts).map_err(http::Error::from)?)
}
