// HTTP transport for the solfin API.
//
// One request in, one normalized response or error out. No retries and no
// credential handling: auth headers are attached by the caller
// (see `client.rs`).

use std::collections::BTreeMap;
use std::time::Duration;

use reqwest::header::{AUTHORIZATION, HeaderMap, HeaderValue};
use reqwest::{Method, StatusCode};
use serde::de::DeserializeOwned;
use serde_json::Value;
use tracing::{debug, trace};
use url::Url;

use crate::error::Error;

/// Error `code` the API sends with a 401 when the access token expired.
pub const TOKEN_EXPIRED_CODE: &str = "token_expired";

const DEFAULT_TIMEOUT: Duration = Duration::from_secs(30);
const DEFAULT_USER_AGENT: &str = concat!("solfin/", env!("CARGO_PKG_VERSION"));

/// Shared transport configuration for building the HTTP client.
#[derive(Debug, Clone)]
pub struct TransportConfig {
    pub base_url: Url,
    pub timeout: Duration,
    pub user_agent: String,
}

impl TransportConfig {
    pub fn new(base_url: Url) -> Self {
        Self {
            base_url,
            timeout: DEFAULT_TIMEOUT,
            user_agent: DEFAULT_USER_AGENT.to_owned(),
        }
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    /// Build a `reqwest::Client` from this config.
    pub fn build_client(&self) -> Result<reqwest::Client, Error> {
        reqwest::Client::builder()
            .timeout(self.timeout)
            .user_agent(self.user_agent.as_str())
            .build()
            .map_err(Error::Transport)
    }
}

// ── Request / response ───────────────────────────────────────────────

/// A single API call, independent of credentials.
///
/// Cheap to clone so the refresh coordinator can replay it after
/// rotating the access token.
#[derive(Debug, Clone)]
pub struct ApiRequest {
    pub method: Method,
    pub path: String,
    pub query: Vec<(String, String)>,
    pub body: Option<Value>,
    pub headers: HeaderMap,
    /// Overrides the transport-wide timeout for this call.
    pub timeout: Option<Duration>,
}

impl ApiRequest {
    pub fn new(method: Method, path: impl Into<String>) -> Self {
        Self {
            method,
            path: path.into(),
            query: Vec::new(),
            body: None,
            headers: HeaderMap::new(),
            timeout: None,
        }
    }

    pub fn get(path: impl Into<String>) -> Self {
        Self::new(Method::GET, path)
    }

    pub fn post(path: impl Into<String>, body: Value) -> Self {
        Self::new(Method::POST, path).body(body)
    }

    pub fn patch(path: impl Into<String>, body: Value) -> Self {
        Self::new(Method::PATCH, path).body(body)
    }

    pub fn body(mut self, body: Value) -> Self {
        self.body = Some(body);
        self
    }

    pub fn query(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.query.push((key.into(), value.into()));
        self
    }

    pub fn timeout(mut self, timeout: Duration) -> Self {
        self.timeout = Some(timeout);
        self
    }

    /// Attach `Authorization: Bearer <token>`, replacing any previous value.
    pub fn bearer(mut self, token: &str) -> Result<Self, Error> {
        let mut value =
            HeaderValue::from_str(&format!("Bearer {token}")).map_err(|e| Error::AuthRequired {
                message: format!("invalid access token header value: {e}"),
            })?;
        value.set_sensitive(true);
        self.headers.insert(AUTHORIZATION, value);
        Ok(self)
    }
}

/// A successful (2xx) response with its JSON body.
///
/// Empty bodies decode as `Value::Null`.
#[derive(Debug, Clone, PartialEq)]
pub struct ApiResponse {
    pub status: u16,
    pub body: Value,
}

/// A decoded payload plus the optional server-supplied success message.
#[derive(Debug, Clone, PartialEq)]
pub struct Confirmed<T> {
    pub data: T,
    pub message: Option<String>,
}

impl<T> Confirmed<T> {
    pub fn new(data: T) -> Self {
        Self {
            data,
            message: None,
        }
    }

    pub fn with_message(data: T, message: impl Into<String>) -> Self {
        Self {
            data,
            message: Some(message.into()),
        }
    }

    pub fn map<U>(self, f: impl FnOnce(T) -> U) -> Confirmed<U> {
        Confirmed {
            data: f(self.data),
            message: self.message,
        }
    }
}

impl ApiResponse {
    /// Decode the body, unwrapping the `{ "data": ..., "message": ... }`
    /// envelope when present. Bare payloads are accepted as-is.
    pub fn into_confirmed<T: DeserializeOwned>(self) -> Result<Confirmed<T>, Error> {
        let raw = self.body.to_string();
        let (data, message) = match self.body {
            Value::Object(mut map) if map.contains_key("data") => {
                let message = map
                    .remove("message")
                    .and_then(|m| m.as_str().map(str::to_owned));
                (map.remove("data").unwrap_or(Value::Null), message)
            }
            other => (other, None),
        };

        let data = serde_json::from_value(data).map_err(|e| {
            let preview = preview(&raw);
            Error::Deserialization {
                message: format!("{e} (body preview: {preview:?})"),
                body: raw.clone(),
            }
        })?;
        Ok(Confirmed { data, message })
    }
}

// ── Transport ────────────────────────────────────────────────────────

/// Thin wrapper around `reqwest::Client` bound to the API base URL.
#[derive(Debug, Clone)]
pub struct HttpTransport {
    http: reqwest::Client,
    base_url: Url,
    timeout: Duration,
}

impl HttpTransport {
    pub fn new(config: &TransportConfig) -> Result<Self, Error> {
        Ok(Self {
            http: config.build_client()?,
            base_url: config.base_url.clone(),
            timeout: config.timeout,
        })
    }

    /// Wrap a pre-built `reqwest::Client` (tests, custom TLS setups).
    pub fn with_client(http: reqwest::Client, base_url: Url) -> Self {
        Self {
            http,
            base_url,
            timeout: DEFAULT_TIMEOUT,
        }
    }

    pub fn base_url(&self) -> &Url {
        &self.base_url
    }

    /// Build `{base}/{path}` without letting a leading slash in `path`
    /// discard the base URL's own path (e.g. `/v1`).
    pub fn url(&self, path: &str) -> Result<Url, Error> {
        let base = self.base_url.as_str().trim_end_matches('/');
        let path = path.trim_start_matches('/');
        Ok(Url::parse(&format!("{base}/{path}"))?)
    }

    /// Perform one HTTP request.
    pub async fn send(&self, request: &ApiRequest) -> Result<ApiResponse, Error> {
        let url = self.url(&request.path)?;
        let timeout = request.timeout.unwrap_or(self.timeout);
        debug!(method = %request.method, %url, "sending request");

        let mut builder = self
            .http
            .request(request.method.clone(), url)
            .headers(request.headers.clone())
            .timeout(timeout);
        if !request.query.is_empty() {
            builder = builder.query(&request.query);
        }
        if let Some(body) = &request.body {
            builder = builder.json(body);
        }

        let resp = builder
            .send()
            .await
            .map_err(|e| classify_transport(e, timeout))?;
        let status = resp.status();
        let raw = resp
            .text()
            .await
            .map_err(|e| classify_transport(e, timeout))?;
        trace!(status = status.as_u16(), bytes = raw.len(), "response received");

        if !status.is_success() {
            return Err(parse_error(status, &raw));
        }

        let body = if raw.trim().is_empty() {
            Value::Null
        } else {
            serde_json::from_str(&raw).map_err(|e| {
                let preview = preview(&raw);
                Error::Deserialization {
                    message: format!("{e} (body preview: {preview:?})"),
                    body: raw.clone(),
                }
            })?
        };

        Ok(ApiResponse {
            status: status.as_u16(),
            body,
        })
    }
}

fn classify_transport(err: reqwest::Error, timeout: Duration) -> Error {
    if err.is_timeout() {
        Error::Timeout {
            timeout_ms: u64::try_from(timeout.as_millis()).unwrap_or(u64::MAX),
        }
    } else {
        Error::Transport(err)
    }
}

// ── Error responses ──────────────────────────────────────────────────

#[derive(serde::Deserialize, Default)]
struct ErrorBody {
    #[serde(default)]
    message: Option<String>,
    #[serde(default)]
    code: Option<String>,
    #[serde(default)]
    errors: Option<Value>,
}

/// Map a non-2xx response onto the error taxonomy.
pub(crate) fn parse_error(status: StatusCode, raw: &str) -> Error {
    let body: ErrorBody = serde_json::from_str(raw).unwrap_or_default();
    let fields = body.errors.as_ref().map(field_messages).unwrap_or_default();
    let fallback = || {
        let trimmed = raw.trim();
        if trimmed.is_empty() || trimmed.starts_with('{') {
            status
                .canonical_reason()
                .unwrap_or("request failed")
                .to_owned()
        } else {
            preview(trimmed)
        }
    };

    if status == StatusCode::UNAUTHORIZED {
        return match body.code.as_deref() {
            None | Some(TOKEN_EXPIRED_CODE) => Error::AuthExpired,
            Some(_) => Error::AuthRequired {
                message: body.message.unwrap_or_else(fallback),
            },
        };
    }

    if status.is_client_error() {
        let message = body
            .message
            .or_else(|| fields.values().next().cloned())
            .unwrap_or_else(fallback);
        return Error::Validation {
            status: status.as_u16(),
            message,
            fields,
        };
    }

    if status.is_server_error() {
        return Error::Server {
            status: status.as_u16(),
            message: body.message.unwrap_or_else(fallback),
        };
    }

    Error::Unknown {
        status: Some(status.as_u16()),
        message: body.message.unwrap_or_else(fallback),
    }
}

/// First 200 characters of a body, safe on multi-byte boundaries.
fn preview(raw: &str) -> String {
    raw.chars().take(200).collect()
}

/// Flatten `{ field: "msg" }` or `{ field: ["msg", ...] }` into one
/// message per field.
fn field_messages(errors: &Value) -> BTreeMap<String, String> {
    let Value::Object(map) = errors else {
        return BTreeMap::new();
    };
    map.iter()
        .filter_map(|(field, value)| {
            let message = match value {
                Value::String(s) => Some(s.clone()),
                Value::Array(items) => items.iter().find_map(|v| v.as_str().map(str::to_owned)),
                _ => None,
            }?;
            Some((field.clone(), message))
        })
        .collect()
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use serde_json::json;

    #[test]
    fn expired_code_and_bare_401_are_recoverable() {
        let err = parse_error(StatusCode::UNAUTHORIZED, r#"{"code":"token_expired"}"#);
        assert!(err.is_auth_expired());

        let err = parse_error(StatusCode::UNAUTHORIZED, "");
        assert!(err.is_auth_expired());
    }

    #[test]
    fn other_401_codes_require_sign_in() {
        let err = parse_error(
            StatusCode::UNAUTHORIZED,
            r#"{"code":"token_revoked","message":"Session revoked"}"#,
        );
        match err {
            Error::AuthRequired { message } => assert_eq!(message, "Session revoked"),
            other => panic!("expected AuthRequired, got {other:?}"),
        }
    }

    #[test]
    fn field_errors_accept_strings_and_lists() {
        let raw = json!({
            "errors": {
                "amount": ["must be positive", "too large"],
                "label": "required"
            }
        })
        .to_string();
        let err = parse_error(StatusCode::UNPROCESSABLE_ENTITY, &raw);
        match err {
            Error::Validation {
                status,
                message,
                fields,
            } => {
                assert_eq!(status, 422);
                assert_eq!(message, "must be positive");
                assert_eq!(fields.get("label").map(String::as_str), Some("required"));
            }
            other => panic!("expected Validation, got {other:?}"),
        }
    }

    #[test]
    fn server_errors_fall_back_to_plain_body() {
        let err = parse_error(StatusCode::BAD_GATEWAY, "upstream down");
        match err {
            Error::Server { status, message } => {
                assert_eq!(status, 502);
                assert_eq!(message, "upstream down");
            }
            other => panic!("expected Server, got {other:?}"),
        }
    }

    #[test]
    fn envelope_is_unwrapped_with_message() {
        let resp = ApiResponse {
            status: 201,
            body: json!({ "data": { "n": 3 }, "message": "Saved" }),
        };
        let confirmed: Confirmed<serde_json::Map<String, Value>> = resp.into_confirmed().unwrap();
        assert_eq!(confirmed.message.as_deref(), Some("Saved"));
        assert_eq!(confirmed.data.get("n"), Some(&json!(3)));
    }

    #[test]
    fn bare_payload_is_accepted() {
        let resp = ApiResponse {
            status: 200,
            body: json!([1, 2, 3]),
        };
        let confirmed: Confirmed<Vec<u8>> = resp.into_confirmed().unwrap();
        assert_eq!(confirmed.data, vec![1, 2, 3]);
        assert!(confirmed.message.is_none());
    }

    #[test]
    fn url_keeps_base_path() {
        let transport = HttpTransport::with_client(
            reqwest::Client::new(),
            Url::parse("https://api.example.com/v1/").unwrap(),
        );
        assert_eq!(
            transport.url("/accounts/42").unwrap().as_str(),
            "https://api.example.com/v1/accounts/42"
        );
    }
}
