use std::time::Instant;

use axum::extract::Request;
use axum::http::HeaderValue;
use axum::middleware::Next;
use axum::response::Response;
use tracing::Instrument;

use super::{REQUEST_ID_HEADER, RequestContext};

/// Attach a [`RequestContext`] to the request, run it inside a `request` span
/// and log how it went. The request id is echoed on the response.
pub async fn track_request(mut request: Request, next: Next) -> Response {
    let ctx = RequestContext::from_header(
        request
            .headers()
            .get(REQUEST_ID_HEADER)
            .and_then(|value| value.to_str().ok()),
    );
    let method = request.method().clone();
    let path = request.uri().path().to_owned();
    request.extensions_mut().insert(ctx.clone());

    let span = tracing::info_span!("request", request_id = %ctx.request_id);
    let started = Instant::now();
    let mut response = next.run(request).instrument(span.clone()).await;
    let elapsed_ms = started.elapsed().as_secs_f64() * 1000.0;

    span.in_scope(|| {
        tracing::info!(
            "HTTP {} {} completed in {:.2}ms with status {}",
            method,
            path,
            elapsed_ms,
            response.status().as_u16()
        );
    });

    if let Ok(value) = HeaderValue::from_str(&ctx.request_id) {
        response.headers_mut().insert(REQUEST_ID_HEADER, value);
    }
    response
}
