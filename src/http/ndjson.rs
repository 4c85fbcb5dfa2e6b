// ABOUTME: Newline-delimited JSON responses for daemon streams.
// ABOUTME: A mid-stream failure becomes a final {"error": ...} line.

use crate::runtime::{DaemonError, ItemStream};
use axum::body::Body;
use axum::http::header;
use axum::response::{IntoResponse, Response};
use bytes::Bytes;
use futures::StreamExt;
use serde::Serialize;
use std::convert::Infallible;
use tracing::warn;

pub const MEDIA_TYPE_NDJSON: &str = "application/x-ndjson";

#[derive(Serialize)]
struct ErrorLine {
    error: String,
}

fn line(value: &impl Serialize) -> Bytes {
    let mut encoded = match serde_json::to_vec(value) {
        Ok(encoded) => encoded,
        Err(e) => {
            warn!(error = %e, "failed to encode stream item");
            serde_json::to_vec(&ErrorLine {
                error: e.to_string(),
            })
            .unwrap_or_default()
        }
    };
    encoded.push(b'\n');
    Bytes::from(encoded)
}

fn error_line(err: &DaemonError) -> Bytes {
    line(&ErrorLine {
        error: err.to_string(),
    })
}

/// Stream `items` as one JSON document per line.
///
/// Dropping the response body drops the daemon stream.
pub fn ndjson<T>(items: ItemStream<T>) -> Response
where
    T: Serialize + Send + 'static,
{
    let lines = items.map(|item| {
        Ok::<_, Infallible>(match item {
            Ok(item) => line(&item),
            Err(err) => error_line(&err),
        })
    });

    (
        [(header::CONTENT_TYPE, MEDIA_TYPE_NDJSON)],
        Body::from_stream(lines),
    )
        .into_response()
}
