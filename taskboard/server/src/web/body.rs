use axum::body::{Body, Bytes};
use axum::extract::Request;
use axum::middleware::Next;
use axum::response::Response;
use serde_json::Value;

use crate::storage::Record;

/// The parsed JSON body of a request, attached as an extension.
///
/// Holds an empty object when the body was empty, malformed or not an object.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct JsonBody(pub Record);

/// Middleware that buffers the request body and parses it as JSON.
///
/// Never rejects a request. The raw bytes are put back so later layers can
/// still read them.
pub async fn read_json_body(request: Request, next: Next) -> Response {
    let (parts, body) = request.into_parts();
    let bytes = match axum::body::to_bytes(body, usize::MAX).await {
        Ok(bytes) => bytes,
        Err(err) => {
            tracing::warn!("Failed to read request body: {}", err);
            Bytes::new()
        }
    };

    let parsed = parse_json_object(&bytes);
    let mut request = Request::from_parts(parts, Body::from(bytes));
    request.extensions_mut().insert(JsonBody(parsed));

    next.run(request).await
}

/// Parses `bytes` as a JSON object, falling back to an empty one.
pub fn parse_json_object(bytes: &[u8]) -> Record {
    match serde_json::from_slice(bytes) {
        Ok(Value::Object(record)) => record,
        _ => Record::new(),
    }
}
