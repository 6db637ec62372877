//! The in-memory REST engine.
//!
//! [`MockEngine`] is the contract the fetch adapter relies on. [`BaseServer`] is the
//! default implementation: it keeps collections and single resources in memory and
//! answers REST calls against them.

use crate::common::{
    data::{BaseResponse, NormalizedRequest},
    query::QueryParams,
};
use async_trait::async_trait;
use http::Method;
use serde_json::Value;
use thiserror::Error;

pub mod builder;
mod filters;
mod handler;
pub mod state;

pub use builder::BaseServerOptions;
pub use handler::BaseServer;

#[derive(Error, Debug)]
pub enum EngineError {
    #[error("invalid query: {0}")]
    InvalidQuery(String),
    #[error("cannot resolve request context: {0}")]
    Context(String),
    #[error("cannot modify state: {0}")]
    State(#[from] state::Error),
    #[error("{0}")]
    Custom(String),
}

/// The REST view of a normalized request: what resource it targets and with what input.
#[derive(Debug, Clone, PartialEq)]
pub struct RestContext {
    pub method: Method,
    /// Name of the targeted collection, if the path points at one.
    pub collection: Option<String>,
    /// Name of the targeted single resource, if the path points at one.
    pub single: Option<String>,
    /// Identifier segment of `/:collection/:id` paths.
    pub id: Option<String>,
    pub params: QueryParams,
    pub request_body: Option<Value>,
}

/// An engine that answers normalized requests.
#[async_trait]
pub trait MockEngine: Send + Sync {
    /// Resolves which resource a request targets.
    fn get_context(&self, request: &NormalizedRequest) -> Result<RestContext, EngineError>;

    /// Produces the response for a request.
    async fn handle(&self, request: &NormalizedRequest) -> Result<BaseResponse, EngineError>;
}
