//! HTTP surface: `GET /weather?city=<name>` and `GET /health`.

use std::collections::HashMap;
use std::sync::Arc;

use axum::{
    extract::{rejection::QueryRejection, Query, State},
    http::{header, StatusCode},
    response::{IntoResponse, Response},
    routing::get,
    Router,
};
use tower_http::trace::TraceLayer;

use crate::handler::{HandlerResponse, RequestHandler};

/// Build the application router around a shared handler.
pub fn router(handler: Arc<RequestHandler>) -> Router {
    Router::new()
        .route("/weather", get(get_weather))
        .route("/health", get(health))
        .layer(TraceLayer::new_for_http())
        .with_state(handler)
}

/// Query parameters are read as a single-value map. A repeated key keeps its
/// last value; an unreadable query string counts as no `city` at all.
async fn get_weather(
    State(handler): State<Arc<RequestHandler>>,
    query: Result<Query<HashMap<String, String>>, QueryRejection>,
) -> HandlerResponse {
    let params = match query {
        Ok(Query(params)) => params,
        Err(rejection) => {
            tracing::debug!("Unreadable query string: {}", rejection);
            HashMap::new()
        }
    };

    handler.handle(params.get("city").map(String::as_str)).await
}

async fn health() -> &'static str {
    "ok"
}

impl IntoResponse for HandlerResponse {
    fn into_response(self) -> Response {
        let status =
            StatusCode::from_u16(self.status).unwrap_or(StatusCode::INTERNAL_SERVER_ERROR);

        match self.body {
            Some(body) => (status, [(header::CONTENT_TYPE, "application/json")], body).into_response(),
            None => status.into_response(),
        }
    }
}

#[cfg(test)]
mod tests {
    #![allow(clippy::unwrap_used, clippy::expect_used)]
    use super::*;
    use axum::body::Body;
    use axum::http::Request;
    use http_body_util::BodyExt;
    use tower::ServiceExt;

    #[tokio::test]
    async fn test_handler_response_into_response() {
        let response = HandlerResponse {
            status: 200,
            body: Some(r#"{"City":"Seattle"}"#.to_string()),
        }
        .into_response();

        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(
            response.headers().get(header::CONTENT_TYPE).unwrap(),
            "application/json"
        );
        let body = response.into_body().collect().await.unwrap().to_bytes();
        assert_eq!(&body[..], br#"{"City":"Seattle"}"#);
    }

    #[tokio::test]
    async fn test_error_response_has_empty_body() {
        let response = HandlerResponse {
            status: 400,
            body: None,
        }
        .into_response();

        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
        let body = response.into_body().collect().await.unwrap().to_bytes();
        assert!(body.is_empty());
    }

    #[tokio::test]
    async fn test_health_route() {
        let app = Router::new().route("/health", get(health));

        let response = app
            .oneshot(Request::builder().uri("/health").body(Body::empty()).unwrap())
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::OK);
        let body = response.into_body().collect().await.unwrap().to_bytes();
        assert_eq!(&body[..], b"ok");
    }
}
