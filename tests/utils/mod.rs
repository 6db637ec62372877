use async_trait::async_trait;
use restmock::{BaseResponse, EngineError, MockEngine, NormalizedRequest, RestContext};
use serde_json::{json, Value};
use std::sync::Mutex;

pub const BASE_URL: &str = "http://x.test";

pub fn books_data() -> Value {
    json!({
        "books": [
            { "id": 0, "title": "War and Peace", "author": "Tolstoy", "year": 1869 },
            { "id": 1, "title": "Emma", "author": "Austen", "year": 1815 },
            { "id": 2, "title": "Dune", "author": "Herbert", "year": 1965 },
            { "id": 3, "title": "Persuasion", "author": "Austen", "year": 1817 }
        ],
        "settings": { "language": "english", "theme": "dark" }
    })
}

pub fn url(path: &str) -> String {
    format!("{}{}", BASE_URL, path)
}

/// An engine that remembers every request and always answers with the same response.
pub struct RecordingEngine {
    response: BaseResponse,
    requests: Mutex<Vec<NormalizedRequest>>,
}

impl RecordingEngine {
    pub fn new(response: BaseResponse) -> Self {
        Self {
            response,
            requests: Mutex::new(Vec::new()),
        }
    }

    pub fn requests(&self) -> Vec<NormalizedRequest> {
        self.requests.lock().unwrap().clone()
    }
}

#[async_trait]
impl MockEngine for RecordingEngine {
    fn get_context(&self, request: &NormalizedRequest) -> Result<RestContext, EngineError> {
        Ok(RestContext {
            method: request.method().clone(),
            collection: None,
            single: None,
            id: None,
            params: request.params().clone(),
            request_body: request.request_body().cloned(),
        })
    }

    async fn handle(&self, request: &NormalizedRequest) -> Result<BaseResponse, EngineError> {
        self.requests.lock().unwrap().push(request.clone());
        Ok(self.response.clone())
    }
}

/// An engine that fails every request.
pub struct FailingEngine;

#[async_trait]
impl MockEngine for FailingEngine {
    fn get_context(&self, _request: &NormalizedRequest) -> Result<RestContext, EngineError> {
        Err(EngineError::Custom("engine is down".to_string()))
    }

    async fn handle(&self, _request: &NormalizedRequest) -> Result<BaseResponse, EngineError> {
        Err(EngineError::Custom("engine is down".to_string()))
    }
}
