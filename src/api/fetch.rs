use std::{
    convert::TryFrom,
    sync::{
        atomic::{AtomicBool, Ordering},
        Arc,
    },
};

use bytes::Bytes;
use futures_util::future::{BoxFuture, FutureExt};
use http::{Method, Request};
use http_body_util::Full;
use serde_json::Value;

use crate::{
    api::{
        normalize::normalize_request,
        output::{render_exchange, LogFormat, LogSink, StderrSink},
        Error,
    },
    common::{
        data::{BaseResponse, MockResponse, NormalizedRequest, RequestInit},
        util::{parse_bool_flag, read_env, Join},
    },
    server::{BaseServer, BaseServerOptions, MockEngine},
};

/// Configuration of a [`FetchMockServer`].
///
/// `server`, `logging_enabled`, `log_format` and `log_sink` configure the adapter itself.
/// Everything else is forwarded to the default [`BaseServer`] engine, which is only
/// constructed when no pre-built engine is passed via [`server`](Self::server).
#[derive(Clone, Default)]
pub struct FetchMockServerOptions {
    server: Option<Arc<dyn MockEngine>>,
    logging_enabled: bool,
    log_format: LogFormat,
    log_sink: Option<Arc<dyn LogSink>>,
    engine: BaseServerOptions,
}

impl FetchMockServerOptions {
    pub fn new() -> Self {
        Self::default()
    }

    /// Reads the options from the environment:
    ///
    /// * `RESTMOCK_LOGGING`: `true`/`1` enables logging (default off),
    /// * `RESTMOCK_LOG_FORMAT`: `grouped` (default) or `flat`,
    /// * `RESTMOCK_BASE_URL`: base URL of the default engine.
    pub fn from_env() -> Self {
        let mut options =
            Self::new().logging_enabled(parse_bool_flag(&read_env("RESTMOCK_LOGGING", "false")));

        match read_env("RESTMOCK_LOG_FORMAT", "grouped").parse::<LogFormat>() {
            Ok(format) => options = options.log_format(format),
            Err(err) => tracing::warn!("Ignoring RESTMOCK_LOG_FORMAT: {}", err),
        }

        let base_url = read_env("RESTMOCK_BASE_URL", "");
        if !base_url.is_empty() {
            options = options.base_url(base_url);
        }

        options
    }

    /// Uses a pre-built engine instead of constructing a [`BaseServer`].
    pub fn server(mut self, server: Arc<dyn MockEngine>) -> Self {
        self.server = Some(server);
        self
    }

    /// Initial logging state. Defaults to `false`.
    pub fn logging_enabled(mut self, enabled: bool) -> Self {
        self.logging_enabled = enabled;
        self
    }

    pub fn log_format(mut self, format: LogFormat) -> Self {
        self.log_format = format;
        self
    }

    /// Where log output is written to. Defaults to [`StderrSink`].
    pub fn log_sink(mut self, sink: Arc<dyn LogSink>) -> Self {
        self.log_sink = Some(sink);
        self
    }

    /// Replaces all options forwarded to the default engine.
    pub fn engine(mut self, engine: BaseServerOptions) -> Self {
        self.engine = engine;
        self
    }

    pub fn base_url<IntoString: Into<String>>(mut self, base_url: IntoString) -> Self {
        self.engine = self.engine.base_url(base_url);
        self
    }

    pub fn identifier_name<IntoString: Into<String>>(mut self, name: IntoString) -> Self {
        self.engine = self.engine.identifier_name(name);
        self
    }

    pub fn data(mut self, data: Value) -> Self {
        self.engine = self.engine.data(data);
        self
    }

    pub fn default_query<IntoString: Into<String>>(
        mut self,
        collection: IntoString,
        query: Value,
    ) -> Self {
        self.engine = self.engine.default_query(collection, query);
        self
    }
}

struct FetchMockServerState {
    logging_enabled: AtomicBool,
    log_format: LogFormat,
    log_sink: Arc<dyn LogSink>,
    server: Arc<dyn MockEngine>,
}

/// Drives a [`MockEngine`] from a fetch-interception layer.
///
/// Clones share state, so toggling logging on one affects all of them and every handler
/// obtained from them.
///
/// ```rust
/// use restmock::{FetchMockServer, FetchMockServerOptions, RequestInit};
/// use serde_json::json;
///
/// let server = FetchMockServer::new(
///     FetchMockServerOptions::new()
///         .base_url("http://localhost:3000")
///         .data(json!({ "books": [{ "id": 1, "title": "Emma" }] })),
/// )
/// .unwrap();
///
/// let handler = server.get_handler();
/// let response = handler
///     .call("http://localhost:3000/books/1", RequestInit::new())
///     .unwrap();
///
/// assert_eq!(response.status(), 200);
/// assert_eq!(response.body(), Some(&json!({ "id": 1, "title": "Emma" })));
/// ```
#[derive(Clone)]
pub struct FetchMockServer {
    state: Arc<FetchMockServerState>,
}

impl FetchMockServer {
    pub fn new(options: FetchMockServerOptions) -> Result<Self, Error> {
        let server = match options.server {
            Some(server) => server,
            None => {
                let server = BaseServer::new(options.engine)
                    .map_err(|e| Error::Configuration(e.to_string()))?;
                Arc::new(server) as Arc<dyn MockEngine>
            }
        };

        Ok(Self {
            state: Arc::new(FetchMockServerState {
                logging_enabled: AtomicBool::new(options.logging_enabled),
                log_format: options.log_format,
                log_sink: options.log_sink.unwrap_or_else(|| Arc::new(StderrSink)),
                server,
            }),
        })
    }

    /// The engine requests are forwarded to.
    pub fn server(&self) -> &Arc<dyn MockEngine> {
        &self.state.server
    }

    pub fn is_logging_enabled(&self) -> bool {
        self.state.logging_enabled.load(Ordering::Relaxed)
    }

    /// Flips the logging flag. Takes effect on the next handler call.
    pub fn toggle_logging(&self) {
        self.state.logging_enabled.fetch_xor(true, Ordering::Relaxed);
    }

    pub fn get_handler(&self) -> FetchHandler {
        FetchHandler {
            server: self.clone(),
        }
    }

    /// Builds the [`NormalizedRequest`] for `request`, consuming its body.
    pub async fn get_normalized_request(
        &self,
        request: &mut Request<Full<Bytes>>,
    ) -> Result<NormalizedRequest, Error> {
        normalize_request(request).await
    }

    /// Prints the exchange if logging is enabled. Never fails.
    pub fn log<B>(&self, request: &Request<B>, response: &BaseResponse, normalized: &NormalizedRequest) {
        if !self.is_logging_enabled() {
            return;
        }

        let output = render_exchange(
            self.state.log_format,
            request.headers(),
            response,
            normalized,
        );

        let result = output.and_then(|text| self.state.log_sink.write(&text));
        if let Err(err) = result {
            tracing::warn!("Cannot write request log: {}", err);
        }
    }
}

/// Deprecated name of [`FetchMockServer`].
#[deprecated(note = "use FetchMockServer instead")]
pub type FetchServer = FetchMockServer;

/// A type-erased handler, for interception layers that register plain callables.
pub type BoxedFetchHandler =
    Arc<dyn Fn(String, RequestInit) -> BoxFuture<'static, Result<MockResponse, Error>> + Send + Sync>;

/// The callable registered with a fetch-interception layer.
#[derive(Clone)]
pub struct FetchHandler {
    server: FetchMockServer,
}

impl FetchHandler {
    /// Answers one intercepted fetch call: normalize, forward to the engine, log, map.
    ///
    /// Engine errors are returned as they are and nothing is logged for them.
    pub async fn call_async(&self, url: &str, init: RequestInit) -> Result<MockResponse, Error> {
        let mut request = build_request(url, init)?;
        let normalized = self.server.get_normalized_request(&mut request).await?;

        tracing::debug!(
            "Forwarding {} {} to the engine (params: {:?}, body: {:?})",
            normalized.method(),
            normalized.url(),
            normalized.params(),
            normalized.request_body()
        );

        let response = self.server.server().handle(&normalized).await?;
        self.server.log(&request, &response, &normalized);

        Ok(MockResponse::try_from(response)?)
    }

    /// Blocking version of [`call_async`](Self::call_async).
    pub fn call(&self, url: &str, init: RequestInit) -> Result<MockResponse, Error> {
        self.call_async(url, init).join()
    }

    pub fn boxed(&self) -> BoxedFetchHandler {
        let handler = self.clone();
        Arc::new(move |url: String, init: RequestInit| {
            let handler = handler.clone();
            async move { handler.call_async(&url, init).await }.boxed()
        })
    }
}

/// Builds an adapter and returns only its handler.
pub fn get_fetch_mock_handler(options: FetchMockServerOptions) -> Result<FetchHandler, Error> {
    Ok(FetchMockServer::new(options)?.get_handler())
}

fn build_request(url: &str, init: RequestInit) -> Result<Request<Full<Bytes>>, Error> {
    let method = init.method.as_deref().unwrap_or("GET").to_uppercase();
    let method = Method::from_bytes(method.as_bytes())
        .map_err(|e| Error::InvalidRequest(format!("invalid method '{}': {}", method, e)))?;

    if init.body.is_some() && (method == Method::GET || method == Method::HEAD) {
        return Err(Error::InvalidRequest(format!(
            "request with {} method cannot have a body",
            method
        )));
    }

    // Absolute URLs are serialized the way a browser would, which percent-encodes
    // characters `http::Uri` rejects (e.g. quotes in JSON query values).
    let uri = match url::Url::parse(url) {
        Ok(parsed) => parsed.to_string(),
        Err(_) => url.to_string(),
    };

    let mut builder = Request::builder().method(method).uri(uri);
    for (name, value) in &init.headers {
        builder = builder.header(name.as_str(), value.as_str());
    }

    builder
        .body(Full::new(init.body.unwrap_or_default()))
        .map_err(|e| Error::InvalidRequest(e.to_string()))
}
