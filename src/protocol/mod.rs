// SPDX-License-Identifier: MPL-2.0
// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Transport abstraction used by the request engine.
//!
//! A [`Transport`] performs exactly one HTTP exchange and reports the status
//! and decoded JSON body. It never retries, never interprets status codes and
//! never touches session state; all of that belongs to the
//! [`Client`](crate::Client).
//!
//! - [`HttpTransport`]: `reqwest`-backed implementation (feature `http`)

#[cfg(feature = "http")]
mod http;
#[cfg(test)]
pub(crate) mod mock;

#[cfg(feature = "http")]
pub use http::HttpTransport;

use std::fmt;
use std::future::Future;

use serde_json::Value;

use crate::error::ProtocolError;

/// Application identifier sent with every call.
pub const APP_ID: &str = "JVM/G9Nwih5BwKgNCjLxiFUQxQijAebyyg8QUHr7JOrP+tuPb8iHfRHKwTmDzHOu";
/// User agent sent with every call.
pub const USER_AGENT: &str = "okhttp/3.10.0";
/// Value of the `ApiVersion` header.
pub const API_VERSION_HEADER: &str = "5.1";
/// Brand identifier sent with every call.
pub const BRAND_ID: &str = "2";
/// Culture marker sent with every call.
pub const CULTURE: &str = "en";
/// Header carrying the session token.
pub const SECURITY_TOKEN_HEADER: &str = "SecurityToken";

/// Returns the service identification headers attached to every call.
#[must_use]
pub fn service_headers() -> [(&'static str, &'static str); 6] {
    [
        ("Content-Type", "application/json"),
        ("MyQApplicationId", APP_ID),
        ("User-Agent", USER_AGENT),
        ("ApiVersion", API_VERSION_HEADER),
        ("BrandId", BRAND_ID),
        ("Culture", CULTURE),
    ]
}

/// HTTP method of an API call.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Method {
    /// `GET`
    Get,
    /// `POST`
    Post,
    /// `PUT`
    Put,
    /// `PATCH`
    Patch,
    /// `DELETE`
    Delete,
}

impl Method {
    /// Returns the method name as sent on the wire.
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Get => "GET",
            Self::Post => "POST",
            Self::Put => "PUT",
            Self::Patch => "PATCH",
            Self::Delete => "DELETE",
        }
    }
}

impl fmt::Display for Method {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A fully resolved HTTP request handed to a [`Transport`].
#[derive(Debug, Clone, PartialEq)]
pub struct ApiRequest {
    /// HTTP method.
    pub method: Method,
    /// Absolute URL.
    pub url: String,
    /// Request headers, in sending order.
    pub headers: Vec<(String, String)>,
    /// Query string parameters.
    pub query: Vec<(String, String)>,
    /// Optional JSON body.
    pub body: Option<Value>,
}

impl ApiRequest {
    /// Returns the value of the first header named `name` (case-insensitive).
    #[must_use]
    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers
            .iter()
            .find(|(key, _)| key.eq_ignore_ascii_case(name))
            .map(|(_, value)| value.as_str())
    }
}

/// Status and decoded body of a completed HTTP exchange.
#[derive(Debug, Clone, PartialEq)]
pub struct ApiResponse {
    /// HTTP status code.
    pub status: u16,
    /// Decoded JSON body; `{}` when the body was empty or not JSON.
    pub body: Value,
}

impl ApiResponse {
    /// Creates a response from a status and an already decoded body.
    #[must_use]
    pub fn new(status: u16, body: Value) -> Self {
        Self { status, body }
    }

    /// Creates a response by decoding a raw body leniently.
    #[must_use]
    pub fn from_text(status: u16, text: &str) -> Self {
        Self::new(status, decode_body(text))
    }

    /// Returns whether the status is in the 2xx range.
    #[must_use]
    pub fn is_success(&self) -> bool {
        (200..300).contains(&self.status)
    }

    /// Returns whether the service rejected the call's authorization.
    #[must_use]
    pub fn is_unauthorized(&self) -> bool {
        self.status == 401
    }

    /// Returns the service-provided error description, if any.
    #[must_use]
    pub fn description(&self) -> Option<&str> {
        self.body.get("description").and_then(Value::as_str)
    }
}

/// Decodes a response body, treating empty or malformed input as `{}`.
#[must_use]
pub fn decode_body(text: &str) -> Value {
    match serde_json::from_str::<Value>(text) {
        Ok(Value::Null) | Err(_) => Value::Object(serde_json::Map::new()),
        Ok(value) => value,
    }
}

/// Reads an identifier that the service sends either as a string or a number.
#[must_use]
pub(crate) fn identifier(value: &Value) -> Option<String> {
    match value {
        Value::String(id) => Some(id.clone()),
        Value::Number(id) => Some(id.to_string()),
        _ => None,
    }
}

/// A single-shot HTTP exchange with the cloud service.
///
/// Implementations must not retry and must report non-2xx statuses as a
/// regular [`ApiResponse`]; only failures to complete the exchange (DNS,
/// connection, timeout) are errors.
pub trait Transport: Send + Sync {
    /// Sends `request` and returns the status and decoded body.
    ///
    /// # Errors
    ///
    /// Returns `ProtocolError` if no response could be obtained.
    fn send(
        &self,
        request: ApiRequest,
    ) -> impl Future<Output = Result<ApiResponse, ProtocolError>> + Send;
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn identifiers_from_strings_and_numbers() {
        assert_eq!(identifier(&json!("abc")).as_deref(), Some("abc"));
        assert_eq!(identifier(&json!(77)).as_deref(), Some("77"));
        assert_eq!(identifier(&json!(null)), None);
        assert_eq!(identifier(&json!({ "Id": 1 })), None);
    }

    #[test]
    fn decode_empty_body() {
        assert_eq!(decode_body(""), json!({}));
    }

    #[test]
    fn decode_html_body() {
        assert_eq!(decode_body("<html>Bad Gateway</html>"), json!({}));
    }

    #[test]
    fn decode_null_body() {
        assert_eq!(decode_body("null"), json!({}));
    }

    #[test]
    fn response_description() {
        let response = ApiResponse::from_text(500, r#"{"description":"Backend down"}"#);
        assert!(!response.is_success());
        assert_eq!(response.description(), Some("Backend down"));
    }

    #[test]
    fn response_status_classes() {
        assert!(ApiResponse::new(204, json!({})).is_success());
        assert!(ApiResponse::new(401, json!({})).is_unauthorized());
        assert!(!ApiResponse::new(302, json!({})).is_success());
    }

    #[test]
    fn header_lookup_is_case_insensitive() {
        let request = ApiRequest {
            method: Method::Get,
            url: "https://example.test".to_string(),
            headers: vec![("SecurityToken".to_string(), "abc".to_string())],
            query: Vec::new(),
            body: None,
        };
        assert_eq!(request.header("securitytoken"), Some("abc"));
        assert_eq!(request.header("Culture"), None);
    }

    #[test]
    fn service_headers_are_fixed() {
        let headers = service_headers();
        assert!(headers.contains(&("Content-Type", "application/json")));
        assert!(headers.contains(&("BrandId", "2")));
        assert!(headers.contains(&("ApiVersion", "5.1")));
    }
}
