//! Where raw chain data comes from: the seam between porting logic and the
//! remote API.

use std::future::Future;
use std::str::FromStr;
use std::time::Duration;

use dirchain_types::Hash32;
use serde::de::DeserializeOwned;
use serde::Deserialize;

use crate::PorterError;

/// Default timeout for a single API request.
const DEFAULT_TIMEOUT: Duration = Duration::from_secs(30);

/// Default connection timeout.
const DEFAULT_CONNECT_TIMEOUT: Duration = Duration::from_secs(5);

/// A source of raw, content-addressed chain data.
///
/// Implementations classify failures: [`PorterError::Transient`] for
/// anything worth retrying, [`PorterError::Malformed`] for payloads that
/// cannot be decoded.
pub trait RawSource: Send + Sync {
    /// KeyMR of the remote directory chain head.
    fn head_key_mr(&self) -> impl Future<Output = Result<Hash32, PorterError>> + Send;

    /// Raw bytes stored under `hash`.
    fn raw_data(&self, hash: &Hash32) -> impl Future<Output = Result<Vec<u8>, PorterError>> + Send;
}

#[derive(Debug, Deserialize)]
struct HeadResponse {
    #[serde(rename = "KeyMR")]
    key_mr: String,
}

#[derive(Debug, Deserialize)]
struct RawDataResponse {
    #[serde(rename = "Data")]
    data: String,
}

/// Parse a `directory-block-head` response body.
pub fn parse_head(body: &[u8]) -> Result<Hash32, PorterError> {
    let resp: HeadResponse = parse_json(body)?;
    Hash32::from_str(&resp.key_mr).map_err(|e| PorterError::Malformed(format!("KeyMR: {e}")))
}

/// Parse a `get-raw-data` response body.
pub fn parse_raw_data(body: &[u8]) -> Result<Vec<u8>, PorterError> {
    let resp: RawDataResponse = parse_json(body)?;
    hex::decode(resp.data.trim()).map_err(|e| PorterError::Malformed(format!("Data: {e}")))
}

fn parse_json<T: DeserializeOwned>(body: &[u8]) -> Result<T, PorterError> {
    serde_json::from_slice(body).map_err(|e| PorterError::Malformed(format!("response JSON: {e}")))
}

/// HTTP client for a remote node's v1 API.
///
/// - `GET {base}/v1/directory-block-head/` -> `{"KeyMR": hex}`
/// - `GET {base}/v1/get-raw-data/{hex}` -> `{"Data": hex}`
pub struct ApiClient {
    /// HTTP client (reusable connection pool).
    http_client: reqwest::Client,
    base_url: String,
}

impl ApiClient {
    pub fn new(base_url: &str) -> Self {
        Self::with_timeout(base_url, DEFAULT_TIMEOUT)
    }

    pub fn with_timeout(base_url: &str, timeout: Duration) -> Self {
        let http_client = reqwest::Client::builder()
            .timeout(timeout)
            .connect_timeout(DEFAULT_CONNECT_TIMEOUT)
            .build()
            .unwrap_or_default();
        Self {
            http_client,
            base_url: base_url.trim_end_matches('/').to_string(),
        }
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    pub fn head_url(&self) -> String {
        format!("{}/v1/directory-block-head/", self.base_url)
    }

    pub fn raw_data_url(&self, hash: &Hash32) -> String {
        format!("{}/v1/get-raw-data/{}", self.base_url, hash.to_hex())
    }

    async fn get_body(&self, url: &str) -> Result<Vec<u8>, PorterError> {
        let response = self.http_client.get(url).send().await.map_err(|e| {
            if e.is_builder() {
                PorterError::Malformed(format!("invalid request {url}: {e}"))
            } else if e.is_timeout() {
                PorterError::Transient(format!("request timed out: {e}"))
            } else if e.is_connect() {
                PorterError::Transient(format!("connection failed: {e}"))
            } else {
                PorterError::Transient(e.to_string())
            }
        })?;

        let status = response.status();
        if status.is_server_error() {
            return Err(PorterError::Transient(format!("{url} returned {status}")));
        }
        if !status.is_success() {
            let message = response.text().await.unwrap_or_default();
            return Err(PorterError::Http {
                status: status.as_u16(),
                message,
            });
        }

        let body = response
            .bytes()
            .await
            .map_err(|e| PorterError::Transient(format!("reading body of {url}: {e}")))?;
        Ok(body.to_vec())
    }
}

impl RawSource for ApiClient {
    async fn head_key_mr(&self) -> Result<Hash32, PorterError> {
        let body = self.get_body(&self.head_url()).await?;
        parse_head(&body)
    }

    async fn raw_data(&self, hash: &Hash32) -> Result<Vec<u8>, PorterError> {
        let body = self.get_body(&self.raw_data_url(hash)).await?;
        parse_raw_data(&body)
    }
}
