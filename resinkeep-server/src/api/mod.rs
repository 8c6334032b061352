//! REST + WebSocket API, mounted under `/api/v1`.
//!
//! # Endpoints
//!
//! - `GET    /health`                        – liveness probe
//! - `GET    /vendor`                        – search vendors (WebSocket: all vendor events)
//! - `POST   /vendor`                        – create a vendor
//! - `GET    /vendor/{id}`                   – one vendor (WebSocket: its events)
//! - `PATCH  /vendor/{id}`                   – partial update
//! - `DELETE /vendor/{id}`                   – delete, 403 while material types use it
//! - `GET|POST /material_type`, `GET|PATCH|DELETE /material_type/{id}` – same shape
//! - `GET|POST /container`, `GET|PATCH|DELETE /container/{id}`         – same shape
//! - `PUT    /container/{id}/use`            – consume by weight or length
//! - `GET    /material`, `/article-number`, `/location`, `/lot-number` – distinct values
//!
//! Searches report the number of matches in the `x-total-count` header.

use axum::{
    Json, Router,
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::{get, put},
};
use resinkeep_core::DomainError;
use resinkeep_core::query::QueryError;
use resinkeep_sdk::objects::{Message, TOTAL_COUNT_HEADER};
use serde::Serialize;

use crate::state::AppState;

mod container;
mod extractors;
mod material_type;
mod misc;
mod vendor;
mod ws;

/// Build the API router.
pub fn router() -> Router<AppState> {
    Router::new()
        .route("/health", get(misc::health))
        .route("/vendor", get(vendor::find_vendors).post(vendor::create_vendor))
        .route(
            "/vendor/{id}",
            get(vendor::get_vendor)
                .patch(vendor::update_vendor)
                .delete(vendor::delete_vendor),
        )
        .route(
            "/material_type",
            get(material_type::find_material_types).post(material_type::create_material_type),
        )
        .route(
            "/material_type/{id}",
            get(material_type::get_material_type)
                .patch(material_type::update_material_type)
                .delete(material_type::delete_material_type),
        )
        .route(
            "/container",
            get(container::find_containers).post(container::create_container),
        )
        .route(
            "/container/{id}",
            get(container::get_container)
                .patch(container::update_container)
                .delete(container::delete_container),
        )
        .route("/container/{id}/use", put(container::use_container))
        .route("/material", get(misc::materials))
        .route("/article-number", get(misc::article_numbers))
        .route("/location", get(misc::locations))
        .route("/lot-number", get(misc::lot_numbers))
}

/// A search page: the items as a JSON array, the total in a header.
fn paged<T: Serialize>(items: Vec<T>, total: u64) -> Response {
    ([(TOTAL_COUNT_HEADER, total.to_string())], Json(items)).into_response()
}

fn deleted() -> Json<Message> {
    Json(Message::new("Success!"))
}

// ---------------------------------------------------------------------------
// Error handling
// ---------------------------------------------------------------------------

/// Errors returned by API handlers. Bodies are `{"message": "..."}`.
#[derive(Debug)]
pub(crate) enum ApiError {
    Domain(DomainError),
    /// The request could not be decoded by an extractor.
    Rejected { status: StatusCode, message: String },
}

impl From<DomainError> for ApiError {
    fn from(err: DomainError) -> Self {
        ApiError::Domain(err)
    }
}

impl From<QueryError> for ApiError {
    fn from(err: QueryError) -> Self {
        ApiError::Domain(err.into())
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (status, message) = match self {
            ApiError::Domain(err) => match err {
                DomainError::Validation(_) | DomainError::Create(_) => {
                    (StatusCode::BAD_REQUEST, err.to_string())
                }
                DomainError::NotFound { .. } => (StatusCode::NOT_FOUND, err.to_string()),
                DomainError::DeleteBlocked { .. } => (StatusCode::FORBIDDEN, err.to_string()),
                DomainError::Store(e) => {
                    tracing::error!(error = %e, "API store error");
                    (
                        StatusCode::INTERNAL_SERVER_ERROR,
                        "internal server error".to_string(),
                    )
                }
            },
            ApiError::Rejected { status, message } => (status, message),
        };
        (status, Json(Message::new(message))).into_response()
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use axum::body::Body;
    use axum::http::{HeaderMap, Method, Request};
    use resinkeep_core::broker::NotificationBroker;
    use resinkeep_core::store::MemoryStore;
    use serde_json::{Value, json};
    use tower::ServiceExt;

    use super::*;
    use crate::server::build_router;

    fn app() -> Router {
        build_router(AppState::new(
            Arc::new(MemoryStore::new()),
            NotificationBroker::default(),
        ))
    }

    async fn send(
        app: &Router,
        method: Method,
        uri: &str,
        body: Option<Value>,
    ) -> (StatusCode, HeaderMap, Value) {
        let request = Request::builder().method(method).uri(uri);
        let request = match body {
            Some(body) => request
                .header("content-type", "application/json")
                .body(Body::from(body.to_string())),
            None => request.body(Body::empty()),
        }
        .unwrap();
        let response = app.clone().oneshot(request).await.unwrap();
        let status = response.status();
        let headers = response.headers().clone();
        let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .unwrap();
        let value = if bytes.is_empty() {
            Value::Null
        } else {
            serde_json::from_slice(&bytes).unwrap()
        };
        (status, headers, value)
    }

    async fn create(app: &Router, uri: &str, body: Value) -> Value {
        let (status, _, value) = send(app, Method::POST, uri, Some(body)).await;
        assert_eq!(status, StatusCode::OK, "{value}");
        value
    }

    fn total(headers: &HeaderMap) -> u64 {
        headers[TOTAL_COUNT_HEADER].to_str().unwrap().parse().unwrap()
    }

    #[tokio::test]
    async fn test_health() {
        let (status, _, body) = send(&app(), Method::GET, "/api/v1/health", None).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["status"], "healthy");
    }

    #[tokio::test]
    async fn test_vendor_lifecycle() {
        let app = app();
        let acme = create(&app, "/api/v1/vendor", json!({"name": "Acme", "comment": "resin"})).await;
        create(&app, "/api/v1/vendor", json!({"name": "Elegoo"})).await;
        let id = acme["id"].as_i64().unwrap();

        let (status, headers, body) = send(&app, Method::GET, "/api/v1/vendor?name=acm", None).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(total(&headers), 1);
        assert_eq!(body[0]["name"], "Acme");

        let (status, _, body) = send(
            &app,
            Method::PATCH,
            &format!("/api/v1/vendor/{id}"),
            Some(json!({"comment": null})),
        )
        .await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["name"], "Acme");
        assert!(body.get("comment").is_none());

        let (status, _, body) = send(&app, Method::DELETE, &format!("/api/v1/vendor/{id}"), None).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["message"], "Success!");

        let (status, _, body) = send(&app, Method::GET, &format!("/api/v1/vendor/{id}"), None).await;
        assert_eq!(status, StatusCode::NOT_FOUND);
        assert!(body["message"].as_str().unwrap().contains("vendor"));
    }

    #[tokio::test]
    async fn test_container_flow() {
        let app = app();
        let acme = create(&app, "/api/v1/vendor", json!({"name": "Acme"})).await;
        let resin = create(
            &app,
            "/api/v1/material_type",
            json!({
                "name": "Grey",
                "vendor_id": acme["id"],
                "density": 1.1,
                "diameter": 1.75,
                "weight": 1000.0,
                "color_hex": "#808080"
            }),
        )
        .await;
        assert_eq!(resin["color_hex"], "808080");
        assert_eq!(resin["vendor"]["name"], "Acme");

        let bottle = create(
            &app,
            "/api/v1/container",
            json!({"material_type_id": resin["id"], "remaining_weight": 800.0, "location": "Shelf A"}),
        )
        .await;
        assert_eq!(bottle["used_weight"], 200.0);
        let id = bottle["id"].as_i64().unwrap();

        let (status, _, body) = send(
            &app,
            Method::PUT,
            &format!("/api/v1/container/{id}/use"),
            Some(json!({"use_weight": 50.0})),
        )
        .await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["used_weight"], 250.0);
        assert_eq!(body["remaining_weight"], 750.0);
        assert!(body["last_used"].is_string());

        let (status, headers, body) = send(
            &app,
            Method::GET,
            "/api/v1/container?vendor_name=acme&sort=used_weight:desc&limit=10",
            None,
        )
        .await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(total(&headers), 1);
        assert_eq!(body[0]["material_type"]["vendor"]["id"], acme["id"]);

        let (_, _, locations) = send(&app, Method::GET, "/api/v1/location", None).await;
        assert_eq!(locations, json!(["Shelf A"]));

        let (status, _, body) = send(
            &app,
            Method::DELETE,
            &format!("/api/v1/material_type/{}", resin["id"]),
            None,
        )
        .await;
        assert_eq!(status, StatusCode::FORBIDDEN);
        assert!(body["message"].is_string());
    }

    #[tokio::test]
    async fn test_pagination_header() {
        let app = app();
        for name in ["a", "b", "c", "d", "e"] {
            create(&app, "/api/v1/vendor", json!({"name": name})).await;
        }
        let (_, headers, body) = send(
            &app,
            Method::GET,
            "/api/v1/vendor?sort=name:asc&limit=2&offset=3",
            None,
        )
        .await;
        assert_eq!(total(&headers), 5);
        let names: Vec<&str> = body
            .as_array()
            .unwrap()
            .iter()
            .map(|v| v["name"].as_str().unwrap())
            .collect();
        assert_eq!(names, vec!["d", "e"]);

        let (_, headers, body) = send(&app, Method::GET, "/api/v1/vendor?limit=2&offset=10", None).await;
        assert_eq!(total(&headers), 5);
        assert_eq!(body, json!([]));
    }

    #[tokio::test]
    async fn test_error_statuses() {
        let app = app();

        let (status, _, _) = send(&app, Method::GET, "/api/v1/vendor?sort=name:sideways", None).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);

        let (status, _, _) = send(&app, Method::GET, "/api/v1/vendor?sort=nickname:asc", None).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);

        let (status, _, body) = send(&app, Method::GET, "/api/v1/vendor?limit=many", None).await;
        assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);
        assert!(body["message"].is_string());

        let (status, _, _) = send(&app, Method::POST, "/api/v1/vendor", Some(json!({"comment": "no name"}))).await;
        assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);

        let (status, _, _) = send(&app, Method::GET, "/api/v1/container/abc", None).await;
        assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);

        let resin = create(
            &app,
            "/api/v1/material_type",
            json!({"density": 1.1, "diameter": 1.75}),
        )
        .await;
        let (status, _, _) = send(
            &app,
            Method::POST,
            "/api/v1/container",
            Some(json!({"material_type_id": resin["id"], "remaining_weight": 10.0})),
        )
        .await;
        assert_eq!(status, StatusCode::BAD_REQUEST);

        let (status, _, _) = send(
            &app,
            Method::PUT,
            "/api/v1/container/1/use",
            Some(json!({})),
        )
        .await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
    }
}
