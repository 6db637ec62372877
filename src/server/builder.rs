use serde_json::Value;
use std::{collections::HashMap, sync::Arc};

use crate::server::{handler::BaseServer, EngineError};

pub(crate) const DEFAULT_IDENTIFIER_NAME: &str = "id";

/// Configuration of the default [`BaseServer`] engine.
///
/// The builder methods consume and return the options so they can be chained:
///
/// ```rust
/// use restmock::server::BaseServerOptions;
/// use serde_json::json;
///
/// let options = BaseServerOptions::new()
///     .base_url("http://localhost:3000")
///     .data(json!({ "books": [{ "id": 1, "title": "Emma" }] }));
/// ```
#[derive(Clone, Debug, Default)]
pub struct BaseServerOptions {
    pub(crate) base_url: Option<String>,
    pub(crate) identifier_name: Option<String>,
    pub(crate) data: Option<Value>,
    pub(crate) default_query: HashMap<String, Value>,
}

impl BaseServerOptions {
    pub fn new() -> Self {
        Self::default()
    }

    /// Prefix all REST routes live under. Requests outside of it are answered with 404.
    pub fn base_url<IntoString>(mut self, base_url: IntoString) -> Self
    where
        IntoString: Into<String>,
    {
        self.base_url = Some(base_url.into());
        self
    }

    /// Name of the field identifying collection items. Defaults to `id`.
    pub fn identifier_name<IntoString>(mut self, identifier_name: IntoString) -> Self
    where
        IntoString: Into<String>,
    {
        self.identifier_name = Some(identifier_name.into());
        self
    }

    /// Initial data: arrays become collections, objects become single resources.
    pub fn data(mut self, data: Value) -> Self {
        self.data = Some(data);
        self
    }

    /// Query (`filter`, `sort`, `range`) applied to every read of `collection`,
    /// with request parameters taking precedence.
    pub fn default_query<IntoString>(mut self, collection: IntoString, query: Value) -> Self
    where
        IntoString: Into<String>,
    {
        self.default_query.insert(collection.into(), query);
        self
    }

    pub fn build(self) -> Result<Arc<BaseServer>, EngineError> {
        Ok(Arc::new(BaseServer::new(self)?))
    }
}
