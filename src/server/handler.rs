use crate::{
    common::data::{BaseResponse, NormalizedRequest},
    server::{
        builder::{BaseServerOptions, DEFAULT_IDENTIFIER_NAME},
        filters::CollectionQuery,
        state::{identifier_to_string, RestStateManager, StateManager},
        EngineError, MockEngine, RestContext,
    },
};
use async_trait::async_trait;
use http::{header::CONTENT_RANGE, header::LOCATION, HeaderValue, Method, StatusCode};
use path_tree::PathTree;
use serde_json::Value;
use std::collections::HashMap;

enum RoutePath {
    Resource,
    Item,
}

/// The default [`MockEngine`]: an in-memory REST server over JSON collections and
/// single resources.
///
/// | Route              | Methods                     |
/// |--------------------|-----------------------------|
/// | `/:collection`     | `GET`, `POST`               |
/// | `/:collection/:id` | `GET`, `PUT`, `PATCH`, `DELETE` |
/// | `/:single`         | `GET`, `PUT`, `PATCH`       |
pub struct BaseServer {
    path_tree: PathTree<RoutePath>,
    base_url: String,
    default_query: HashMap<String, Value>,
    state: RestStateManager,
}

impl BaseServer {
    pub fn new(options: BaseServerOptions) -> Result<Self, EngineError> {
        let identifier_name = options
            .identifier_name
            .as_deref()
            .unwrap_or(DEFAULT_IDENTIFIER_NAME);
        let state = RestStateManager::from_data(identifier_name, options.data.as_ref())?;

        let mut path_tree: PathTree<RoutePath> = PathTree::new();
        #[allow(unused_must_use)]
        {
            path_tree.insert("/:name", RoutePath::Resource);
            path_tree.insert("/:name/:id", RoutePath::Item);
        }

        Ok(Self {
            path_tree,
            base_url: options
                .base_url
                .unwrap_or_default()
                .trim_end_matches('/')
                .to_string(),
            default_query: options.default_query,
            state,
        })
    }

    /// Returns all items of a collection, or `None` if there is no such collection.
    pub fn collection(&self, name: &str) -> Option<Vec<Value>> {
        self.state.get_all(name)
    }

    /// Returns a single resource, or `None` if there is no such resource.
    pub fn single(&self, name: &str) -> Option<Value> {
        self.state.get_single(name)
    }

    /// Adds (or replaces) a collection.
    pub fn add_collection(&self, name: &str, items: Vec<Value>) -> Result<(), EngineError> {
        Ok(self.state.add_collection(name, items)?)
    }

    /// Adds (or replaces) a single resource.
    pub fn add_single(&self, name: &str, value: Value) -> Result<(), EngineError> {
        Ok(self.state.add_single(name, value)?)
    }

    /// Strips the base URL, query and fragment, leaving the path the routes apply to.
    fn route_path(&self, url: &str) -> Option<String> {
        let rest = if self.base_url.is_empty() {
            match url::Url::parse(url) {
                Ok(parsed) => return Some(parsed.path().trim_end_matches('/').to_string()),
                Err(_) => url,
            }
        } else {
            url.strip_prefix(self.base_url.as_str())?
        };

        let path = rest.split(|c| c == '?' || c == '#').next().unwrap_or("");
        if !path.is_empty() && !path.starts_with('/') {
            // the base URL matched only part of a path segment
            return None;
        }

        Some(path.trim_end_matches('/').to_string())
    }

    fn read_collection(&self, name: &str, ctx: &RestContext) -> Result<BaseResponse, EngineError> {
        let items = match self.state.get_all(name) {
            None => return Ok(BaseResponse::new(StatusCode::NOT_FOUND.as_u16())),
            Some(items) => items,
        };

        let query = CollectionQuery::from_params(&ctx.params, self.default_query.get(name))?;
        let page = query.execute(items);

        let content_range = if page.items.is_empty() {
            format!("items */{}", page.total)
        } else {
            format!(
                "items {}-{}/{}",
                page.first,
                page.first + page.items.len() - 1,
                page.total
            )
        };

        let status = if page.items.len() < page.total {
            StatusCode::PARTIAL_CONTENT
        } else {
            StatusCode::OK
        };

        let mut response = BaseResponse::json(status.as_u16(), Value::Array(page.items));
        response.headers.insert(CONTENT_RANGE, header_value(&content_range)?);
        Ok(response)
    }

    fn create_item(&self, name: &str, ctx: &RestContext) -> Result<BaseResponse, EngineError> {
        let body = ctx.request_body.clone().unwrap_or(Value::Null);
        let item = self.state.add_one(name, body)?;

        let location = item
            .get(self.state.identifier_name())
            .and_then(identifier_to_string)
            .map(|id| format!("{}/{}/{}", self.base_url, name, id));

        let mut response = BaseResponse::json(StatusCode::CREATED.as_u16(), item);
        if let Some(location) = location {
            response.headers.insert(LOCATION, header_value(&location)?);
        }
        Ok(response)
    }

    fn handle_item(
        &self,
        name: &str,
        id: &str,
        ctx: &RestContext,
    ) -> Result<BaseResponse, EngineError> {
        let item = match ctx.method {
            Method::GET => self.state.get_one(name, id),
            Method::PUT | Method::PATCH => {
                let patch = ctx.request_body.clone().unwrap_or(Value::Null);
                self.state.update_one(name, id, patch)?
            }
            Method::DELETE => self.state.remove_one(name, id),
            _ => return Ok(BaseResponse::new(StatusCode::METHOD_NOT_ALLOWED.as_u16())),
        };

        Ok(found_or_not(item))
    }

    fn handle_single(&self, name: &str, ctx: &RestContext) -> Result<BaseResponse, EngineError> {
        let single = match ctx.method {
            Method::GET => self.state.get_single(name),
            Method::PUT | Method::PATCH => {
                let patch = ctx.request_body.clone().unwrap_or(Value::Null);
                self.state.update_single(name, patch)?
            }
            _ => return Ok(BaseResponse::new(StatusCode::METHOD_NOT_ALLOWED.as_u16())),
        };

        Ok(found_or_not(single))
    }
}

#[async_trait]
impl MockEngine for BaseServer {
    fn get_context(&self, request: &NormalizedRequest) -> Result<RestContext, EngineError> {
        let mut ctx = RestContext {
            method: request.method().clone(),
            collection: None,
            single: None,
            id: None,
            params: request.params().clone(),
            request_body: request.request_body().cloned(),
        };

        let path = match self.route_path(request.url()) {
            None => return Ok(ctx),
            Some(path) => path,
        };

        if let Some((route, path)) = self.path_tree.find(&path) {
            let mut name = None;
            let mut id = None;
            for (key, value) in path.params() {
                let value = decode_segment(value);
                match key {
                    "name" => name = Some(value),
                    "id" => id = Some(value),
                    _ => {}
                }
            }

            let name = name.ok_or_else(|| {
                EngineError::Context(format!("no resource name in path '{}'", request.url()))
            })?;

            match route {
                RoutePath::Resource if self.state.has_single(&name) => ctx.single = Some(name),
                RoutePath::Resource => ctx.collection = Some(name),
                RoutePath::Item => {
                    ctx.collection = Some(name);
                    ctx.id = id;
                }
            }
        }

        Ok(ctx)
    }

    async fn handle(&self, request: &NormalizedRequest) -> Result<BaseResponse, EngineError> {
        tracing::trace!("Routing incoming request: {} {}", request.method(), request.url());

        let ctx = self.get_context(request)?;

        let response = match (&ctx.single, &ctx.collection, &ctx.id) {
            (Some(single), _, _) => self.handle_single(single, &ctx)?,
            (None, Some(collection), Some(id)) => self.handle_item(collection, id, &ctx)?,
            (None, Some(collection), None) => match ctx.method {
                Method::GET => self.read_collection(collection, &ctx)?,
                Method::POST => self.create_item(collection, &ctx)?,
                _ if self.state.has_collection(collection) => {
                    BaseResponse::new(StatusCode::METHOD_NOT_ALLOWED.as_u16())
                }
                _ => BaseResponse::new(StatusCode::NOT_FOUND.as_u16()),
            },
            (None, None, _) => BaseResponse::new(StatusCode::NOT_FOUND.as_u16()),
        };

        tracing::debug!(
            "{} {} answered with status {}",
            request.method(),
            request.url(),
            response.status
        );

        Ok(response)
    }
}

fn found_or_not(value: Option<Value>) -> BaseResponse {
    match value {
        Some(value) => BaseResponse::json(StatusCode::OK.as_u16(), value),
        None => BaseResponse::new(StatusCode::NOT_FOUND.as_u16()),
    }
}

fn decode_segment(segment: &str) -> String {
    String::from_utf8_lossy(&urlencoding::decode_binary(segment.as_bytes())).into_owned()
}

fn header_value(value: &str) -> Result<HeaderValue, EngineError> {
    HeaderValue::from_str(value)
        .map_err(|e| EngineError::Custom(format!("invalid header value '{}': {}", value, e)))
}
