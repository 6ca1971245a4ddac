// TeslaMate API HTTP client
//
// Wraps `reqwest::Client` with base-URL handling, bearer auth, and
// response/envelope checking. Endpoint methods live in `cars.rs` as
// inherent methods so this module stays focused on transport mechanics.

use secrecy::SecretString;
use serde::Serialize;
use serde::de::DeserializeOwned;
use tracing::{debug, trace};
use url::Url;

use crate::error::Error;
use crate::transport::TransportConfig;

/// Raw HTTP client for the TeslaMate API.
///
/// Cheap to clone: the underlying `reqwest::Client` is reference counted.
#[derive(Clone)]
pub struct TeslaMateClient {
    http: reqwest::Client,
    base_url: Url,
    timeout_ms: u64,
}

impl TeslaMateClient {
    /// Create a client from a server URL, bearer token, and transport config.
    ///
    /// The `base_url` may carry a path prefix (e.g. `https://host/teslamate/`);
    /// endpoint paths are joined below it.
    pub fn new(
        base_url: &str,
        token: &SecretString,
        transport: &TransportConfig,
    ) -> Result<Self, Error> {
        let http = transport.build_client(token)?;
        Ok(Self {
            http,
            base_url: Self::normalize_base_url(base_url)?,
            timeout_ms: u64::try_from(transport.timeout.as_millis()).unwrap_or(u64::MAX),
        })
    }

    /// Wrap an existing `reqwest::Client` (caller manages auth headers).
    pub fn with_client(base_url: &str, http: reqwest::Client) -> Result<Self, Error> {
        Ok(Self {
            http,
            base_url: Self::normalize_base_url(base_url)?,
            timeout_ms: 0,
        })
    }

    /// The normalized server base URL (always ends with `/`).
    pub fn base_url(&self) -> &Url {
        &self.base_url
    }

    fn normalize_base_url(raw: &str) -> Result<Url, Error> {
        let mut url = Url::parse(raw)?;
        let path = url.path().trim_end_matches('/').to_owned();
        url.set_path(&format!("{path}/"));
        Ok(url)
    }

    // ── URL builder ──────────────────────────────────────────────────

    /// Join a relative path (e.g. `"v1/cars"`) onto the base URL.
    pub(crate) fn url(&self, path: &str) -> Result<Url, Error> {
        Ok(self.base_url.join(path.trim_start_matches('/'))?)
    }

    // ── HTTP verbs ───────────────────────────────────────────────────

    pub(crate) async fn get<T: DeserializeOwned>(&self, path: &str) -> Result<T, Error> {
        let url = self.url(path)?;
        debug!("GET {url}");

        let resp = self.http.get(url).send().await.map_err(|e| self.map_send(e))?;
        self.handle_response(resp).await
    }

    pub(crate) async fn post<T: DeserializeOwned, B: Serialize + Sync>(
        &self,
        path: &str,
        body: Option<&B>,
    ) -> Result<T, Error> {
        let url = self.url(path)?;
        debug!("POST {url}");

        let mut builder = self.http.post(url);
        if let Some(body) = body {
            builder = builder.json(body);
        }
        let resp = builder.send().await.map_err(|e| self.map_send(e))?;
        self.handle_response(resp).await
    }

    pub(crate) async fn put<T: DeserializeOwned>(&self, path: &str) -> Result<T, Error> {
        let url = self.url(path)?;
        debug!("PUT {url}");

        let resp = self.http.put(url).send().await.map_err(|e| self.map_send(e))?;
        self.handle_response(resp).await
    }

    // ── Response handling ────────────────────────────────────────────

    fn map_send(&self, err: reqwest::Error) -> Error {
        if err.is_timeout() && self.timeout_ms > 0 {
            Error::Timeout {
                timeout_ms: self.timeout_ms,
            }
        } else {
            Error::Transport(err)
        }
    }

    /// Check the status code and decode the JSON body.
    ///
    /// Empty bodies decode as JSON `null`, so callers expecting
    /// `serde_json::Value` accept bodiless 2xx answers.
    async fn handle_response<T: DeserializeOwned>(
        &self,
        resp: reqwest::Response,
    ) -> Result<T, Error> {
        let status = resp.status();
        let body = resp.text().await.map_err(|e| self.map_send(e))?;
        trace!(status = status.as_u16(), body = %body, "response");

        if !status.is_success() {
            return Err(Error::Api {
                status: status.as_u16(),
                message: error_message(&body),
            });
        }

        let text = if body.trim().is_empty() { "null" } else { &body };
        serde_json::from_str(text).map_err(|e| {
            let preview: String = body.chars().take(200).collect();
            Error::Deserialization {
                message: format!("{e} (body preview: {preview:?})"),
                body,
            }
        })
    }
}

/// Pull a readable message out of an error body.
///
/// TeslaMate API answers `{"error": "..."}`; anything else is truncated.
fn error_message(body: &str) -> String {
    #[derive(serde::Deserialize)]
    struct ErrorBody {
        error: Option<String>,
        message: Option<String>,
    }

    match serde_json::from_str::<ErrorBody>(body) {
        Ok(ErrorBody {
            error: Some(msg), ..
        })
        | Ok(ErrorBody {
            message: Some(msg), ..
        }) => msg,
        _ => body.chars().take(200).collect(),
    }
}
