//! Middleware for logging requests and responses.

use axum::{
    body::{Body, Bytes},
    extract::Request,
    http::{request, response},
    middleware::Next,
    response::{IntoResponse, Response},
};

use crate::Error;

/// The number of bytes of a body that are logged at the `info` level.
pub const LOG_BODY_LENGTH_LIMIT: usize = 64;

/// The largest request or response body the middleware will buffer, 2 MiB.
pub const MAX_BODY_SIZE: usize = 2 * 1024 * 1024;

/// Log the request and response for each request.
///
/// Both the request and response are logged at the `info` level.
/// If the body is longer than [LOG_BODY_LENGTH_LIMIT] bytes, it is
/// truncated and the full body is logged at the `debug` level.
///
/// Bodies are passed on byte for byte, the lossy UTF-8 text is only used for
/// logging. A request body larger than [MAX_BODY_SIZE] is rejected with
/// [Error::InvalidRequestBody].
pub async fn logging_middleware(request: Request, next: Next) -> Response {
    let (parts, body) = request.into_parts();
    let bytes = match axum::body::to_bytes(body, MAX_BODY_SIZE).await {
        Ok(bytes) => bytes,
        Err(error) => {
            tracing::warn!("could not read request body: {error}");
            return Error::InvalidRequestBody(MAX_BODY_SIZE).into_response();
        }
    };
    log_request(&parts, &body_text(&bytes));

    let request = Request::from_parts(parts, Body::from(bytes));
    let response = next.run(request).await;

    let (parts, body) = response.into_parts();
    let bytes = match axum::body::to_bytes(body, MAX_BODY_SIZE).await {
        Ok(bytes) => bytes,
        Err(error) => {
            tracing::error!("could not read response body: {error}");
            return Error::BodyReadError.into_response();
        }
    };
    log_response(&parts, &body_text(&bytes));

    Response::from_parts(parts, Body::from(bytes))
}

fn body_text(bytes: &Bytes) -> String {
    String::from_utf8_lossy(bytes).into_owned()
}

/// Cut `text` to at most [LOG_BODY_LENGTH_LIMIT] bytes without splitting a character.
fn truncate(text: &str) -> &str {
    if text.len() <= LOG_BODY_LENGTH_LIMIT {
        return text;
    }

    let mut end = LOG_BODY_LENGTH_LIMIT;
    while !text.is_char_boundary(end) {
        end -= 1;
    }

    &text[..end]
}

fn log_request(parts: &request::Parts, body: &str) {
    if body.len() > LOG_BODY_LENGTH_LIMIT {
        tracing::info!(
            "Received request: {parts:#?}\nbody: {:}...",
            truncate(body)
        );
        tracing::debug!("Full request body: {body:?}");
    } else {
        tracing::info!("Received request: {parts:#?}\nbody: {body:?}");
    }
}

fn log_response(parts: &response::Parts, body: &str) {
    if body.len() > LOG_BODY_LENGTH_LIMIT {
        tracing::info!(
            "Sending response: {parts:#?}\nbody: {:}...",
            truncate(body)
        );
        tracing::debug!("Full response body: {body:?}");
    } else {
        tracing::info!("Sending response: {parts:#?}\nbody: {body:?}");
    }
}

#[cfg(test)]
mod middleware_tests {
    use axum::{Router, body::Bytes, http::StatusCode, middleware, routing::post};
    use axum_test::TestServer;

    use super::{MAX_BODY_SIZE, logging_middleware};

    async fn echo(body: Bytes) -> Bytes {
        body
    }

    fn get_test_server() -> TestServer {
        let router = Router::new()
            .route("/echo", post(echo))
            .layer(middleware::from_fn(logging_middleware));

        TestServer::new(router)
    }

    #[tokio::test]
    async fn invalid_utf8_is_passed_on_unchanged() {
        let server = get_test_server();
        let body = Bytes::from_static(b"{\"name\":\"A\xff\"}");

        let response = server.post("/echo").bytes(body.clone()).await;

        response.assert_status_ok();
        assert_eq!(response.as_bytes(), &body);
    }

    #[tokio::test]
    async fn oversized_request_body_is_rejected() {
        let server = get_test_server();
        let body = Bytes::from(vec![b'a'; MAX_BODY_SIZE + 1]);

        let response = server.post("/echo").bytes(body).await;

        response.assert_status(StatusCode::BAD_REQUEST);
    }
}

#[cfg(test)]
mod tests {
    use super::{LOG_BODY_LENGTH_LIMIT, truncate};

    #[test]
    fn short_text_is_unchanged() {
        assert_eq!(truncate("query { categories { id } }"), "query { categories { id } }");
    }

    #[test]
    fn long_text_is_cut_at_limit() {
        let text = "a".repeat(100);

        assert_eq!(truncate(&text).len(), LOG_BODY_LENGTH_LIMIT);
    }

    #[test]
    fn does_not_split_characters() {
        let text = format!("{}é", "a".repeat(LOG_BODY_LENGTH_LIMIT - 1));

        assert_eq!(truncate(&text).len(), LOG_BODY_LENGTH_LIMIT - 1);
    }
}
