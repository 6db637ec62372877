use crate::common::{query::QueryParams, util::headers_to_json};
use bytes::Bytes;
use http::{header::CONTENT_TYPE, HeaderMap, HeaderValue, Method, StatusCode};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::{convert::TryFrom, fmt};

#[derive(thiserror::Error, Debug)]
pub enum Error {
    #[error("invalid status code: {0}")]
    InvalidStatusCode(u16),
    #[error("cannot serialize response body: {0}")]
    BodySerializeError(#[from] serde_json::Error),
    #[error("cannot build HTTP response: {0}")]
    ResponseConversionError(#[from] http::Error),
}

/// The engine-agnostic representation of an intercepted request.
///
/// A `NormalizedRequest` is created once per handler call and never changes afterwards.
#[derive(Debug, Clone)]
pub struct NormalizedRequest {
    url: String,
    headers: HeaderMap,
    params: QueryParams,
    request_body: Option<Value>,
    method: Method,
}

impl NormalizedRequest {
    pub fn new(
        url: String,
        headers: HeaderMap,
        params: QueryParams,
        request_body: Option<Value>,
        method: Method,
    ) -> Self {
        Self {
            url,
            headers,
            params,
            request_body,
            method,
        }
    }

    /// The full request URL, including the query string.
    pub fn url(&self) -> &str {
        &self.url
    }

    pub fn headers(&self) -> &HeaderMap {
        &self.headers
    }

    /// Query parameters, decoded and parsed from the part of the URL after the first `?`.
    pub fn params(&self) -> &QueryParams {
        &self.params
    }

    /// The request body decoded as JSON. `None` if the body was empty or not valid JSON.
    pub fn request_body(&self) -> Option<&Value> {
        self.request_body.as_ref()
    }

    pub fn method(&self) -> &Method {
        &self.method
    }

    pub fn method_str(&self) -> &str {
        self.method.as_str()
    }
}

/// A response as produced by a [`MockEngine`](crate::server::MockEngine).
#[derive(Debug, Clone, PartialEq)]
pub struct BaseResponse {
    pub status: u16,
    pub headers: HeaderMap,
    pub body: Option<Value>,
}

impl BaseResponse {
    pub fn new(status: u16) -> Self {
        Self {
            status,
            headers: HeaderMap::new(),
            body: None,
        }
    }

    /// Creates a response with a JSON body and the matching content type.
    pub fn json(status: u16, body: Value) -> Self {
        let mut headers = HeaderMap::new();
        headers.insert(CONTENT_TYPE, HeaderValue::from_static("application/json"));
        Self {
            status,
            headers,
            body: Some(body),
        }
    }
}

/// The response shape handed back to the interception layer.
#[derive(Clone, PartialEq)]
pub struct MockResponse {
    status: StatusCode,
    headers: HeaderMap,
    body: Option<Value>,
}

impl MockResponse {
    pub fn status(&self) -> StatusCode {
        self.status
    }

    pub fn headers(&self) -> &HeaderMap {
        &self.headers
    }

    pub fn body(&self) -> Option<&Value> {
        self.body.as_ref()
    }

    /// Converts this response into an [`http::Response`] with the body serialized as JSON.
    pub fn into_http_response(self) -> Result<http::Response<Bytes>, Error> {
        let mut builder = http::Response::builder().status(self.status);

        let has_content_type = self.headers.contains_key(CONTENT_TYPE);
        for (name, value) in &self.headers {
            builder = builder.header(name, value);
        }

        let body = match self.body {
            None => Bytes::new(),
            Some(value) => {
                if !has_content_type {
                    builder = builder.header(CONTENT_TYPE, "application/json");
                }
                Bytes::from(serde_json::to_vec(&value)?)
            }
        };

        Ok(builder.body(body)?)
    }
}

/// Maps the engine response field by field. The status code must be a valid HTTP status.
impl TryFrom<BaseResponse> for MockResponse {
    type Error = Error;

    fn try_from(value: BaseResponse) -> Result<Self, Self::Error> {
        let status =
            StatusCode::from_u16(value.status).map_err(|_| Error::InvalidStatusCode(value.status))?;

        Ok(MockResponse {
            status,
            headers: value.headers,
            body: value.body,
        })
    }
}

impl fmt::Debug for MockResponse {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("MockResponse")
            .field("status", &self.status.as_u16())
            .field("headers", &headers_to_json(&self.headers))
            .field("body", &self.body)
            .finish()
    }
}

/// The options of a fetch call: method, headers and raw body.
#[derive(Serialize, Deserialize, Debug, Clone, Default, PartialEq)]
pub struct RequestInit {
    pub method: Option<String>,
    #[serde(default)]
    pub headers: Vec<(String, String)>,
    pub body: Option<Bytes>,
}

impl RequestInit {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn method<S: Into<String>>(mut self, method: S) -> Self {
        self.method = Some(method.into());
        self
    }

    pub fn header<K: Into<String>, V: Into<String>>(mut self, name: K, value: V) -> Self {
        self.headers.push((name.into(), value.into()));
        self
    }

    pub fn body<B: Into<Bytes>>(mut self, body: B) -> Self {
        self.body = Some(body.into());
        self
    }

    /// Sets a JSON body and the `content-type` header.
    pub fn json_body(self, body: &Value) -> Self {
        self.header("content-type", "application/json")
            .body(body.to_string())
    }
}
