//! `restmock` answers intercepted `fetch`-style calls from an in-memory REST server. It
//! contains two major components:
//!
//! * an **engine** that keeps JSON collections and single resources in memory and serves
//!   REST calls against them ([`BaseServer`](server::BaseServer)), and
//! * a **fetch adapter** ([`FetchMockServer`]) that turns `(url, options)` calls made by a
//!   fetch-interception layer into requests for the engine and relays its responses.
//!
//! # Getting Started
//! Add `restmock` in your `Cargo.toml`:
//!
//! ```toml
//! [dev-dependencies]
//! restmock = "0.1"
//! ```
//!
//! Create an adapter with some data and hand its handler to your interception layer:
//!
//! ```rust
//! use restmock::{get_fetch_mock_handler, FetchMockServerOptions, RequestInit};
//! use serde_json::json;
//!
//! let handler = get_fetch_mock_handler(
//!     FetchMockServerOptions::new()
//!         .base_url("http://localhost:3000")
//!         .data(json!({
//!             "books": [
//!                 { "id": 0, "title": "War and Peace", "author": "Tolstoy" },
//!                 { "id": 1, "title": "Emma", "author": "Austen" }
//!             ],
//!             "settings": { "language": "english" }
//!         })),
//! )
//! .unwrap();
//!
//! let response = handler
//!     .call(
//!         r#"http://localhost:3000/books?filter={"author":"Austen"}"#,
//!         RequestInit::new(),
//!     )
//!     .unwrap();
//!
//! assert_eq!(response.status(), 200);
//! assert_eq!(
//!     response.body(),
//!     Some(&json!([{ "id": 1, "title": "Emma", "author": "Austen" }]))
//! );
//! ```
//!
//! # Routes
//! The default engine serves the following routes below its base URL:
//!
//! * `GET /:collection` with the optional query parameters `filter` (a JSON object),
//!   `sort` (`field` or `["field", "ASC"|"DESC"]`) and `range` (`[start, end]`),
//! * `POST /:collection`,
//! * `GET`, `PUT`, `PATCH` and `DELETE /:collection/:id`,
//! * `GET`, `PUT` and `PATCH /:single`.
//!
//! Any other engine can be plugged in by implementing [`MockEngine`] and passing it with
//! [`FetchMockServerOptions::server`].
//!
//! # Logging
//! Every exchange can be printed for debugging, either by enabling it upfront with
//! [`FetchMockServerOptions::logging_enabled`] or by calling
//! [`FetchMockServer::toggle_logging`] at any time. The [`LogFormat`] decides whether the
//! output is grouped or flat.
//!
//! Apart from that, `restmock` logs against the `tracing` crate (with its `log`
//! compatibility enabled). For example, if you use the `env_logger` logging backend, you can
//! activate debug logging by setting the `RUST_LOG` environment variable to `debug` and
//! calling `env_logger::try_init()`.
//!
//! # Environment
//! [`FetchMockServerOptions::from_env`] reads `RESTMOCK_LOGGING`, `RESTMOCK_LOG_FORMAT` and
//! `RESTMOCK_BASE_URL`.

pub mod api;
mod common;
pub mod server;

pub use api::{
    get_fetch_mock_handler, BoxedFetchHandler, Error, FetchHandler, FetchMockServer,
    FetchMockServerOptions, LogFormat, LogSink, MemorySink, StderrSink,
};
#[allow(deprecated)]
pub use api::FetchServer;
pub use common::{
    data::{BaseResponse, MockResponse, NormalizedRequest, RequestInit},
    query::{parse_query_string, QueryParams},
    util::headers_to_json,
};
pub use server::{BaseServer, BaseServerOptions, EngineError, MockEngine, RestContext};

pub mod prelude {
    #[doc(no_inline)]
    pub use crate::{
        get_fetch_mock_handler, BaseResponse, BaseServer, BaseServerOptions, EngineError,
        FetchHandler, FetchMockServer, FetchMockServerOptions, LogFormat, MockEngine,
        MockResponse, NormalizedRequest, RequestInit, RestContext,
    };
}
