// Transport configuration for building the reqwest::Client.
//
// TLS mode, timeout, and static headers live here so the client module
// only deals with URLs and envelopes.

use std::path::PathBuf;
use std::time::Duration;

use reqwest::header::{AUTHORIZATION, HeaderMap, HeaderName, HeaderValue};
use secrecy::{ExposeSecret, SecretString};

use crate::error::Error;

/// TLS verification mode.
#[derive(Debug, Clone)]
pub enum TlsMode {
    /// Use the system certificate store.
    System,
    /// Use a custom CA certificate from the given PEM file.
    CustomCa(PathBuf),
    /// Accept any certificate (self-hosted TeslaMate behind a self-signed proxy).
    DangerAcceptInvalid,
}

/// Transport configuration for the TeslaMate HTTP client.
#[derive(Debug, Clone)]
pub struct TransportConfig {
    pub tls: TlsMode,
    pub timeout: Duration,
    /// Extra static headers sent with every request, in `(name, value)` form.
    pub headers: Vec<(String, String)>,
}

impl Default for TransportConfig {
    fn default() -> Self {
        Self {
            tls: TlsMode::DangerAcceptInvalid,
            timeout: Duration::from_secs(3),
            headers: Vec::new(),
        }
    }
}

impl TransportConfig {
    /// Parse `key=value` header strings, splitting on the first `=`.
    ///
    /// Entries without a `=` are rejected rather than silently dropped.
    pub fn parse_headers<S: AsRef<str>>(raw: &[S]) -> Result<Vec<(String, String)>, Error> {
        raw.iter()
            .map(|entry| {
                let entry = entry.as_ref();
                entry
                    .split_once('=')
                    .map(|(k, v)| (k.trim().to_owned(), v.trim().to_owned()))
                    .filter(|(k, _)| !k.is_empty())
                    .ok_or_else(|| Error::InvalidHeader {
                        name: entry.to_owned(),
                        reason: "expected key=value".into(),
                    })
            })
            .collect()
    }

    /// Build the default header map: configured headers plus bearer auth.
    ///
    /// The `Authorization` header always wins over a configured header of
    /// the same name.
    fn default_headers(&self, token: &SecretString) -> Result<HeaderMap, Error> {
        let mut headers = HeaderMap::new();

        for (name, value) in &self.headers {
            let header_name =
                HeaderName::from_bytes(name.as_bytes()).map_err(|e| Error::InvalidHeader {
                    name: name.clone(),
                    reason: e.to_string(),
                })?;
            let header_value = HeaderValue::from_str(value).map_err(|e| Error::InvalidHeader {
                name: name.clone(),
                reason: e.to_string(),
            })?;
            headers.insert(header_name, header_value);
        }

        let mut auth = HeaderValue::from_str(&format!("Bearer {}", token.expose_secret()))
            .map_err(|e| Error::InvalidHeader {
                name: AUTHORIZATION.to_string(),
                reason: e.to_string(),
            })?;
        auth.set_sensitive(true);
        headers.insert(AUTHORIZATION, auth);

        Ok(headers)
    }

    /// Build a `reqwest::Client` carrying bearer auth and the static headers.
    pub fn build_client(&self, token: &SecretString) -> Result<reqwest::Client, Error> {
        let mut builder = reqwest::Client::builder()
            .timeout(self.timeout)
            .user_agent(concat!("matebridge/", env!("CARGO_PKG_VERSION")))
            .default_headers(self.default_headers(token)?);

        match &self.tls {
            TlsMode::System => {}
            TlsMode::CustomCa(path) => {
                let cert_pem = std::fs::read(path)
                    .map_err(|e| Error::Tls(format!("failed to read CA cert: {e}")))?;
                let cert = reqwest::Certificate::from_pem(&cert_pem)
                    .map_err(|e| Error::Tls(format!("invalid CA cert: {e}")))?;
                builder = builder.add_root_certificate(cert);
            }
            TlsMode::DangerAcceptInvalid => {
                builder = builder.danger_accept_invalid_certs(true);
            }
        }

        builder
            .build()
            .map_err(|e| Error::Tls(format!("failed to build HTTP client: {e}")))
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn parse_headers_splits_on_first_equals() {
        let parsed =
            TransportConfig::parse_headers(&["X-Proxy=abc", "Cookie=a=b; c=d"]).unwrap();
        assert_eq!(
            parsed,
            vec![
                ("X-Proxy".to_owned(), "abc".to_owned()),
                ("Cookie".to_owned(), "a=b; c=d".to_owned()),
            ]
        );
    }

    #[test]
    fn parse_headers_rejects_missing_separator() {
        let err = TransportConfig::parse_headers(&["just-a-name"]).unwrap_err();
        assert!(matches!(err, Error::InvalidHeader { .. }));
    }

    #[test]
    fn authorization_overrides_configured_header() {
        let transport = TransportConfig {
            headers: vec![("Authorization".into(), "Basic nope".into())],
            ..TransportConfig::default()
        };
        let token = SecretString::from("secret-token".to_owned());
        let headers = transport.default_headers(&token).unwrap();
        assert_eq!(headers.get(AUTHORIZATION).unwrap(), "Bearer secret-token");
        assert_eq!(headers.len(), 1);
    }
}
