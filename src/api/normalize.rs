use crate::{
    api::Error,
    common::{data::NormalizedRequest, query::parse_query_string},
};
use http::Request;
use http_body_util::BodyExt;
use hyper::body::Body;
use serde_json::Value;
use std::fmt::Display;

/// Builds the [`NormalizedRequest`] for an intercepted request.
///
/// The body is read to the end (the request is left with an exhausted body) and parsed as
/// JSON on a best-effort basis. Only a failure to read the body is reported as an error.
pub async fn normalize_request<B>(request: &mut Request<B>) -> Result<NormalizedRequest, Error>
where
    B: Body + Unpin,
    B::Error: Display,
{
    let url = request.uri().to_string();
    let params = parse_query_string(&decode_query(query_of(&url)));

    let bytes = request
        .body_mut()
        .collect()
        .await
        .map_err(|e| Error::BodyRead(e.to_string()))?
        .to_bytes();
    let text = String::from_utf8_lossy(&bytes);

    Ok(NormalizedRequest::new(
        url,
        request.headers().clone(),
        params,
        parse_json_body(&text),
        request.method().clone(),
    ))
}

/// Everything after the first `?`, or an empty string if there is none.
fn query_of(url: &str) -> &str {
    url.split_once('?').map_or("", |(_, query)| query)
}

fn decode_query(query: &str) -> String {
    String::from_utf8_lossy(&urlencoding::decode_binary(query.as_bytes())).into_owned()
}

pub(crate) fn parse_json_body(text: &str) -> Option<Value> {
    if text.is_empty() {
        return None;
    }

    match serde_json::from_str(text) {
        Ok(value) => Some(value),
        Err(err) => {
            tracing::debug!("Request body is not JSON, ignoring it: {}", err);
            None
        }
    }
}
