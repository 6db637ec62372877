use http::{Method, StatusCode};
use restmock::{
    server::state, BaseServer, BaseServerOptions, EngineError, Error, FetchHandler,
    FetchMockServerOptions, MockEngine, MockResponse, NormalizedRequest, QueryParams,
    RequestInit,
};
use serde_json::{json, Value};
use std::sync::Arc;

use crate::utils::{books_data, url, BASE_URL};

fn books_handler() -> FetchHandler {
    restmock::get_fetch_mock_handler(
        FetchMockServerOptions::new()
            .base_url(BASE_URL)
            .data(books_data()),
    )
    .unwrap()
}

fn ids(response: &MockResponse) -> Vec<i64> {
    response
        .body()
        .and_then(Value::as_array)
        .unwrap()
        .iter()
        .map(|book| book["id"].as_i64().unwrap())
        .collect()
}

#[test]
fn list_collection_test() {
    // Arrange
    let _ = env_logger::try_init();
    let handler = books_handler();

    // Act
    let response = handler.call(&url("/books"), RequestInit::new()).unwrap();

    // Assert
    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(response.headers()["content-range"], "items 0-3/4");
    assert_eq!(response.headers()["content-type"], "application/json");
    assert_eq!(ids(&response), vec![0, 1, 2, 3]);
}

#[test]
fn list_collection_with_range_is_partial_test() {
    let handler = books_handler();

    let response = handler
        .call(&url("/books?range=[1,2]"), RequestInit::new())
        .unwrap();

    assert_eq!(response.status(), StatusCode::PARTIAL_CONTENT);
    assert_eq!(response.headers()["content-range"], "items 1-2/4");
    assert_eq!(ids(&response), vec![1, 2]);
}

#[test]
fn list_collection_with_filter_and_sort_test() {
    let handler = books_handler();

    let response = handler
        .call(
            &url(r#"/books?filter={"author":"Austen"}&sort=["year","DESC"]"#),
            RequestInit::new(),
        )
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(response.headers()["content-range"], "items 0-1/2");
    assert_eq!(ids(&response), vec![3, 1]);
}

#[test]
fn list_collection_with_no_match_test() {
    let handler = books_handler();

    let response = handler
        .call(&url(r#"/books?filter={"author":"Woolf"}"#), RequestInit::new())
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(response.headers()["content-range"], "items */0");
    assert_eq!(response.body(), Some(&json!([])));
}

#[test]
fn default_query_applies_to_reads_test() {
    let handler = restmock::get_fetch_mock_handler(
        FetchMockServerOptions::new()
            .base_url(BASE_URL)
            .data(books_data())
            .default_query("books", json!({ "sort": ["title", "ASC"] })),
    )
    .unwrap();

    let response = handler.call(&url("/books"), RequestInit::new()).unwrap();
    assert_eq!(ids(&response), vec![2, 1, 3, 0]);

    let response = handler
        .call(&url("/books?sort=year"), RequestInit::new())
        .unwrap();
    assert_eq!(ids(&response), vec![1, 3, 0, 2]);
}

#[test]
fn create_read_update_delete_test() {
    let handler = books_handler();

    // Create
    let response = handler
        .call(
            &url("/books"),
            RequestInit::new()
                .method("POST")
                .json_body(&json!({ "title": "Ubik", "author": "Dick" })),
        )
        .unwrap();
    assert_eq!(response.status(), StatusCode::CREATED);
    assert_eq!(response.headers()["location"], "http://x.test/books/4");
    assert_eq!(
        response.body(),
        Some(&json!({ "id": 4, "title": "Ubik", "author": "Dick" }))
    );

    // Read
    let response = handler.call(&url("/books/4"), RequestInit::new()).unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(response.body().unwrap()["title"], "Ubik");

    // Update
    let response = handler
        .call(
            &url("/books/4"),
            RequestInit::new()
                .method("PUT")
                .json_body(&json!({ "year": 1969 })),
        )
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(
        response.body(),
        Some(&json!({ "id": 4, "title": "Ubik", "author": "Dick", "year": 1969 }))
    );

    // Delete
    let response = handler
        .call(&url("/books/4"), RequestInit::new().method("DELETE"))
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(response.body().unwrap()["id"], 4);

    let response = handler.call(&url("/books/4"), RequestInit::new()).unwrap();
    assert_eq!(response.status(), StatusCode::NOT_FOUND);
    assert_eq!(response.body(), None);
}

#[test]
fn missing_items_are_not_found_test() {
    let handler = books_handler();

    for method in &["GET", "PATCH", "DELETE"] {
        let init = if *method == "PATCH" {
            RequestInit::new().method(*method).json_body(&json!({}))
        } else {
            RequestInit::new().method(*method)
        };

        let response = handler.call(&url("/books/99"), init).unwrap();
        assert_eq!(response.status(), StatusCode::NOT_FOUND, "method {}", method);
    }
}

#[test]
fn single_resource_test() {
    let handler = books_handler();

    let response = handler.call(&url("/settings"), RequestInit::new()).unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(
        response.body(),
        Some(&json!({ "language": "english", "theme": "dark" }))
    );

    let response = handler
        .call(
            &url("/settings"),
            RequestInit::new()
                .method("PATCH")
                .json_body(&json!({ "theme": "light" })),
        )
        .unwrap();
    assert_eq!(
        response.body(),
        Some(&json!({ "language": "english", "theme": "light" }))
    );

    let response = handler
        .call(&url("/settings"), RequestInit::new().method("DELETE"))
        .unwrap();
    assert_eq!(response.status(), StatusCode::METHOD_NOT_ALLOWED);
}

#[test]
fn unknown_routes_test() {
    let handler = books_handler();

    let response = handler.call(&url("/authors"), RequestInit::new()).unwrap();
    assert_eq!(response.status(), StatusCode::NOT_FOUND);

    let response = handler
        .call("http://other.test/books", RequestInit::new())
        .unwrap();
    assert_eq!(response.status(), StatusCode::NOT_FOUND);

    let response = handler
        .call("http://x.testing/books", RequestInit::new())
        .unwrap();
    assert_eq!(response.status(), StatusCode::NOT_FOUND);

    let response = handler
        .call(&url("/books/1/reviews"), RequestInit::new())
        .unwrap();
    assert_eq!(response.status(), StatusCode::NOT_FOUND);

    let response = handler
        .call(&url("/books"), RequestInit::new().method("DELETE"))
        .unwrap();
    assert_eq!(response.status(), StatusCode::METHOD_NOT_ALLOWED);
}

#[test]
fn posting_to_a_new_collection_creates_it_test() {
    let handler = books_handler();

    let response = handler
        .call(
            &url("/authors"),
            RequestInit::new()
                .method("POST")
                .json_body(&json!({ "name": "Austen" })),
        )
        .unwrap();
    assert_eq!(response.status(), StatusCode::CREATED);

    let response = handler.call(&url("/authors"), RequestInit::new()).unwrap();
    assert_eq!(response.body(), Some(&json!([{ "id": 0, "name": "Austen" }])));
}

#[test]
fn duplicate_identifier_is_an_engine_error_test() {
    let handler = books_handler();

    let result = handler.call(
        &url("/books"),
        RequestInit::new()
            .method("POST")
            .json_body(&json!({ "id": 1, "title": "Emma again" })),
    );

    match result {
        Err(Error::Engine(EngineError::State(state::Error::DuplicateIdentifier(id)))) => {
            assert_eq!(id, "1")
        }
        other => panic!("expected duplicate identifier error, got {:?}", other),
    }
}

#[test]
fn malformed_query_is_an_engine_error_test() {
    let handler = books_handler();

    let result = handler.call(&url("/books?range=[3,1]"), RequestInit::new());

    assert!(matches!(
        result,
        Err(Error::Engine(EngineError::InvalidQuery(_)))
    ));
}

#[test]
fn custom_identifier_name_test() {
    let handler = restmock::get_fetch_mock_handler(
        FetchMockServerOptions::new().engine(
            BaseServerOptions::new()
                .base_url("http://x.test/api/")
                .identifier_name("_id")
                .data(json!({ "users": [{ "_id": "u1", "name": "Ann" }] })),
        ),
    )
    .unwrap();

    let response = handler
        .call("http://x.test/api/users/u1", RequestInit::new())
        .unwrap();
    assert_eq!(response.body(), Some(&json!({ "_id": "u1", "name": "Ann" })));

    let response = handler
        .call(
            "http://x.test/api/users",
            RequestInit::new()
                .method("POST")
                .json_body(&json!({ "name": "Bob" })),
        )
        .unwrap();
    assert_eq!(response.body(), Some(&json!({ "_id": 0, "name": "Bob" })));
}

#[test]
fn engine_without_base_url_routes_on_the_path_test() {
    let handler = restmock::get_fetch_mock_handler(
        FetchMockServerOptions::new().data(books_data()),
    )
    .unwrap();

    let response = handler
        .call("http://any.host/books/2", RequestInit::new())
        .unwrap();
    assert_eq!(response.body().unwrap()["title"], "Dune");
}

#[test]
fn get_context_test() {
    let server = BaseServer::new(
        BaseServerOptions::new()
            .base_url(BASE_URL)
            .data(books_data()),
    )
    .unwrap();

    let mut params = QueryParams::new();
    params.insert("sort".to_string(), json!("title"));

    let request = |path: &str, method: Method| {
        NormalizedRequest::new(url(path), Default::default(), params.clone(), None, method)
    };

    let ctx = server.get_context(&request("/books/3?sort=title", Method::GET)).unwrap();
    assert_eq!(ctx.collection.as_deref(), Some("books"));
    assert_eq!(ctx.id.as_deref(), Some("3"));
    assert_eq!(ctx.single, None);
    assert_eq!(ctx.params.get("sort"), Some(&json!("title")));

    let ctx = server.get_context(&request("/settings", Method::PUT)).unwrap();
    assert_eq!(ctx.single.as_deref(), Some("settings"));
    assert_eq!(ctx.collection, None);
    assert_eq!(ctx.method, Method::PUT);

    let ctx = server.get_context(&request("/", Method::GET)).unwrap();
    assert_eq!(ctx.collection, None);
    assert_eq!(ctx.single, None);
}

#[test]
fn base_server_can_be_seeded_after_construction_test() {
    let server = BaseServerOptions::new().base_url(BASE_URL).build().unwrap();
    server
        .add_collection("books", vec![json!({ "title": "Emma" })])
        .unwrap();
    server.add_single("settings", json!({ "theme": "dark" })).unwrap();

    assert_eq!(
        server.collection("books"),
        Some(vec![json!({ "id": 0, "title": "Emma" })])
    );
    assert_eq!(server.single("settings"), Some(json!({ "theme": "dark" })));
    assert_eq!(server.collection("missing"), None);

    let handler = restmock::get_fetch_mock_handler(
        FetchMockServerOptions::new().server(server as Arc<dyn MockEngine>),
    )
    .unwrap();
    let response = handler.call(&url("/books/0"), RequestInit::new()).unwrap();
    assert_eq!(response.status(), StatusCode::OK);
}

#[test]
fn exhausted_identifiers_are_an_engine_error_test() {
    let handler = restmock::get_fetch_mock_handler(
        FetchMockServerOptions::new()
            .base_url(BASE_URL)
            .data(json!({ "books": [{ "id": i64::MAX, "title": "Emma" }] })),
    )
    .unwrap();

    let result = handler.call(
        &url("/books"),
        RequestInit::new()
            .method("POST")
            .json_body(&json!({ "title": "Ubik" })),
    );
    assert!(matches!(
        result,
        Err(Error::Engine(EngineError::State(state::Error::InvalidItem(_))))
    ));

    // the engine keeps serving after the failed insert
    let response = handler.call(&url("/books"), RequestInit::new()).unwrap();
    assert_eq!(response.headers()["content-range"], "items 0-0/1");
}
