//! Per-call request and response transforms applied by the dispatcher.
//!
//! Everything here is a pure function of the call, the session token and
//! the response; the dispatcher owns all side effects.

use reqwest::header::{HeaderMap, HeaderName, HeaderValue, CONTENT_TYPE};
use reqwest::{Method, StatusCode};
use serde_json::Value;
use url::Url;

use crate::error::DispatchError;
use crate::request::RequestOptions;

pub const AUTH_TOKEN_HEADER: &str = "x-auth-token";
pub const URL_PATH_HEADER: &str = "x-url-path";
pub const JSON_CONTENT_TYPE: &str = "application/json; charset=utf-8";
/// Path segment of the token endpoint (login and current-user lookup).
pub const TOKEN_ENDPOINT: &str = "tokens";

/// Join `path` onto `base` with exactly one `/` between them.
/// Absolute `http(s)` URLs are returned unchanged.
pub fn resolve_url(base: &Url, path: &str) -> Result<Url, DispatchError> {
    if path.starts_with("http://") || path.starts_with("https://") {
        return Url::parse(path).map_err(|e| DispatchError::InvalidRequest(format!("{path}: {e}")));
    }

    let joined = format!(
        "{}/{}",
        base.as_str().trim_end_matches('/'),
        path.trim_start_matches('/')
    );
    Url::parse(&joined).map_err(|e| DispatchError::InvalidRequest(format!("{joined}: {e}")))
}

/// The login call: it must not carry a stale or absent token.
pub fn is_token_issue(method: &Method, url: &str) -> bool {
    *method == Method::POST && references_token_endpoint(url)
}

fn references_token_endpoint(url: &str) -> bool {
    let path = url.split(['?', '#']).next().unwrap_or_default();
    path.split('/').any(|segment| segment == TOKEN_ENDPOINT)
}

/// Headers for an outgoing call.
pub fn outgoing_headers(
    options: &RequestOptions,
    token: Option<&str>,
    default_page_path: &str,
) -> Result<HeaderMap, DispatchError> {
    let mut headers = HeaderMap::new();
    headers.insert(CONTENT_TYPE, HeaderValue::from_static(JSON_CONTENT_TYPE));

    let page_path = options.page_path.as_deref().unwrap_or(default_page_path);
    headers.insert(
        HeaderName::from_static(URL_PATH_HEADER),
        header_value(page_path)?,
    );

    if let Some(token) = token.filter(|t| !t.is_empty()) {
        if !is_token_issue(&options.method, &options.url) {
            headers.insert(HeaderName::from_static(AUTH_TOKEN_HEADER), header_value(token)?);
        }
    }

    Ok(headers)
}

fn header_value(value: &str) -> Result<HeaderValue, DispatchError> {
    HeaderValue::from_str(value)
        .map_err(|e| DispatchError::InvalidRequest(format!("invalid header value: {e}")))
}

/// Response payload: JSON when it parses, the raw text otherwise, `Null` when empty.
pub fn unwrap_body(bytes: &[u8]) -> Value {
    if bytes.iter().all(u8::is_ascii_whitespace) {
        return Value::Null;
    }
    serde_json::from_slice(bytes)
        .unwrap_or_else(|_| Value::String(String::from_utf8_lossy(bytes).into_owned()))
}

pub fn classify_response(status: StatusCode, body: Value) -> Result<Value, DispatchError> {
    if status.is_success() {
        Ok(body)
    } else {
        Err(DispatchError::from_status(status, body))
    }
}

/// Any failure before a complete response arrived.
pub fn classify_transport(err: &reqwest::Error) -> DispatchError {
    let reason = if err.is_timeout() {
        "request timed out".to_string()
    } else if err.is_connect() {
        format!("connection failed: {err}")
    } else {
        err.to_string()
    };
    DispatchError::NetworkUnreachable(reason)
}
