/*! Per-instance connection options for a CnosDB data source.

These are the options Grafana stores against a configured data source
instance and hands back on every call. Deserialization ignores the keys
this crate has no business with (basic auth, TLS material and other
transport concerns stay with the host's HTTP layer).
*/

use serde::{Deserialize, Serialize};
use serde_with::skip_serializing_none;
use thiserror::Error;

/// Errors arising from invalid connection options.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum Error {
    /// Occurs when no host is configured.
    #[error("data source has no host configured")]
    MissingHost,
    /// Occurs when the configured host and port do not form a valid address.
    #[error("invalid CnosDB address {address:?}")]
    InvalidAddress {
        /// The address built from the options.
        address: String,
        /// The underlying URI parse failure.
        source: http::uri::InvalidUri,
    },
}

/// Whether an instance talks to a self-hosted CnosDB or to CnosDB Cloud.
///
/// The wire representation is the integer the config editor stores.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "u8", into = "u8")]
pub enum CnosDbMode {
    /// A self-hosted deployment, spoken to through [`SqlApi`][crate::api::SqlApi].
    #[default]
    Private,
    /// The hosted CnosDB Cloud service, spoken to through
    /// [`CloudApi`][crate::api::CloudApi].
    PublicCloud,
}

impl TryFrom<u8> for CnosDbMode {
    type Error = String;

    fn try_from(value: u8) -> Result<Self, Self::Error> {
        match value {
            0 => Ok(Self::Private),
            1 => Ok(Self::PublicCloud),
            other => Err(format!("unknown CnosDB mode {other}")),
        }
    }
}

impl From<CnosDbMode> for u8 {
    fn from(mode: CnosDbMode) -> Self {
        match mode {
            CnosDbMode::Private => 0,
            CnosDbMode::PublicCloud => 1,
        }
    }
}

/// The connection options of one data source instance.
#[skip_serializing_none]
#[derive(Clone, Debug, Default, Deserialize, Serialize)]
#[serde(rename_all = "camelCase", default)]
pub struct DataSourceOptions {
    /// Host name or IP address of the CnosDB server.
    pub host: Option<String>,
    /// Port of the CnosDB server; the scheme's default port when unset.
    pub port: Option<u16>,
    /// The database queries run against.
    pub database: Option<String>,
    /// The deployment flavor this instance talks to.
    #[serde(rename = "cnosdbMode")]
    pub mode: CnosDbMode,
    /// The tenant, for multi-tenant deployments.
    pub tenant: Option<String>,
    /// The API key authenticating [`CnosDbMode::PublicCloud`] requests.
    pub api_key: Option<String>,
    /// The `target_partitions` execution knob forwarded to the server.
    pub target_partitions: Option<u32>,
    /// The `stream_trigger_interval` execution knob forwarded to the server.
    pub stream_trigger_interval: Option<String>,
    /// Ask the server for chunked responses.
    pub use_chunked_response: bool,
    /// Connect over HTTPS instead of HTTP.
    pub enable_https: bool,
}

impl DataSourceOptions {
    /// The base URL of the server these options point at.
    ///
    /// The scheme follows `enable_https`, and the scheme's default port
    /// (443 or 80) applies when none is configured.
    pub fn url(&self) -> Result<http::Uri, Error> {
        let host = self
            .host
            .as_deref()
            .filter(|host| !host.is_empty())
            .ok_or(Error::MissingHost)?;
        let (scheme, default_port) = if self.enable_https {
            ("https", 443)
        } else {
            ("http", 80)
        };
        let address = format!("{scheme}://{host}:{}", self.port.unwrap_or(default_port));
        address
            .parse()
            .map_err(|source| Error::InvalidAddress { address, source })
    }
}

#[cfg(test)]
mod test {
    use pretty_assertions::assert_eq;
    use serde_json::from_str;

    use super::*;

    #[test]
    fn deserializes_with_defaults() {
        let options: DataSourceOptions = from_str("{}").unwrap();
        assert_eq!(options.mode, CnosDbMode::Private);
        assert_eq!(options.port, None);
        assert!(!options.enable_https);
        assert!(!options.use_chunked_response);
    }

    #[test]
    fn deserializes_editor_output() {
        let options: DataSourceOptions = from_str(
            r#"
{
    "host": "localhost",
    "port": 8902,
    "database": "public",
    "cnosdbMode": 1,
    "tenant": "cnosdb",
    "apiKey": "k",
    "targetPartitions": 4,
    "streamTriggerInterval": "once",
    "useChunkedResponse": true,
    "enableHttps": true,
    "basicAuthUser": "ignored",
    "tlsSkipVerify": true
}"#,
        )
        .unwrap();
        assert_eq!(options.host.as_deref(), Some("localhost"));
        assert_eq!(options.port, Some(8902));
        assert_eq!(options.mode, CnosDbMode::PublicCloud);
        assert_eq!(options.tenant.as_deref(), Some("cnosdb"));
        assert_eq!(options.api_key.as_deref(), Some("k"));
        assert_eq!(options.target_partitions, Some(4));
        assert_eq!(options.stream_trigger_interval.as_deref(), Some("once"));
        assert!(options.use_chunked_response);
        assert!(options.enable_https);
    }

    #[test]
    fn unknown_modes_are_rejected() {
        assert!(from_str::<DataSourceOptions>(r#"{ "cnosdbMode": 7 }"#).is_err());
    }

    #[test]
    fn url_applies_scheme_defaults() {
        let options: DataSourceOptions = from_str(r#"{ "host": "localhost" }"#).unwrap();
        let url = options.url().unwrap();
        assert_eq!(url.scheme_str(), Some("http"));
        assert_eq!(url.host(), Some("localhost"));
        assert_eq!(url.port_u16(), Some(80));

        let options: DataSourceOptions =
            from_str(r#"{ "host": "db.example.com", "enableHttps": true }"#).unwrap();
        let url = options.url().unwrap();
        assert_eq!(url.scheme_str(), Some("https"));
        assert_eq!(url.port_u16(), Some(443));

        let options: DataSourceOptions =
            from_str(r#"{ "host": "localhost", "port": 8902 }"#).unwrap();
        assert_eq!(options.url().unwrap().port_u16(), Some(8902));
    }

    #[test]
    fn url_requires_a_host() {
        let options = DataSourceOptions::default();
        assert!(matches!(options.url(), Err(Error::MissingHost)));

        let options: DataSourceOptions = from_str(r#"{ "host": "" }"#).unwrap();
        assert!(matches!(options.url(), Err(Error::MissingHost)));
    }
}
