use std::net::SocketAddr;

use axum::Router;
use tower_http::{cors::CorsLayer, trace::TraceLayer};

use crate::state::AppState;
use crate::{auth, health, payments, search, upload, users, webhook};

pub fn build_app(state: AppState) -> Router {
    Router::new()
        .nest(
            "/api",
            Router::new()
                .merge(auth::router())
                .merge(users::router())
                .merge(payments::router())
                .merge(search::router())
                .merge(webhook::router())
                .merge(upload::router())
                .merge(health::router()),
        )
        .with_state(state)
        .layer(CorsLayer::permissive())
        .layer(
            TraceLayer::new_for_http()
                .make_span_with(|req: &axum::http::Request<_>| {
                    let method = req.method().clone();
                    let uri = req.uri().clone();
                    tracing::info_span!("http_request", %method, uri = %uri)
                })
                .on_response(
                    |res: &axum::http::Response<_>,
                     _latency: std::time::Duration,
                     span: &tracing::Span| {
                        let status = res.status();
                        span.record("status", tracing::field::display(status));
                        if status.is_server_error() {
                            tracing::error!(%status, "response");
                        } else {
                            tracing::info!(%status, "response");
                        }
                    },
                ),
        )
}

pub async fn serve(app: Router) -> anyhow::Result<()> {
    let addr: SocketAddr = format!(
        "{}:{}",
        std::env::var("APP_HOST").unwrap_or_else(|_| "0.0.0.0".into()),
        std::env::var("APP_PORT").unwrap_or_else(|_| "8080".into())
    )
    .parse()?;

    tracing::info!("listening on {}", addr);
    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app).await?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::body::Body;
    use axum::http::{header, Request, StatusCode};
    use http_body_util::BodyExt;
    use tower::ServiceExt;

    async fn json_body(response: axum::response::Response) -> serde_json::Value {
        let bytes = response.into_body().collect().await.unwrap().to_bytes();
        serde_json::from_slice(&bytes).unwrap()
    }

    fn post_json(uri: &str, body: &str) -> Request<Body> {
        Request::post(uri)
            .header(header::CONTENT_TYPE, "application/json")
            .body(Body::from(body.to_string()))
            .unwrap()
    }

    /// Session cookies from a response, folded into a Cookie header value.
    fn session_cookies(response: &axum::response::Response) -> String {
        response
            .headers()
            .get_all(header::SET_COOKIE)
            .iter()
            .filter_map(|v| v.to_str().ok())
            .filter_map(|v| v.split(';').next())
            .collect::<Vec<_>>()
            .join("; ")
    }

    #[tokio::test]
    async fn payments_listing_filters_and_paginates() {
        let app = build_app(AppState::fake());
        let response = app
            .oneshot(
                Request::get("/api/payments?status=completed&sortBy=amount&sortOrder=asc")
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);

        let body = json_body(response).await;
        assert_eq!(body["pagination"]["total"], 3);
        assert_eq!(body["statistics"]["completed"], 3);
        let amounts: Vec<f64> = body["payments"]
            .as_array()
            .unwrap()
            .iter()
            .map(|p| p["amount"].as_f64().unwrap())
            .collect();
        assert_eq!(amounts, vec![150.0, 200.0, 300.0]);
        assert_eq!(body["filters"]["sortBy"], "amount");
    }

    #[tokio::test]
    async fn payment_by_id_handles_bad_and_missing_ids() {
        let app = build_app(AppState::fake());
        let response = app
            .clone()
            .oneshot(Request::get("/api/payments/not-a-number").body(Body::empty()).unwrap())
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
        assert_eq!(json_body(response).await["error"], "Invalid payment ID");

        let response = app
            .oneshot(Request::get("/api/payments/999").body(Body::empty()).unwrap())
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::NOT_FOUND);
    }

    #[tokio::test]
    async fn payment_status_patch_validates_the_closed_set() {
        let app = build_app(AppState::fake());
        let response = app
            .clone()
            .oneshot(
                Request::patch("/api/payments/2")
                    .header(header::CONTENT_TYPE, "application/json")
                    .body(Body::from(r#"{"status":"refunded"}"#))
                    .unwrap(),
            )
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(json_body(response).await["payment"]["status"], "refunded");

        let response = app
            .oneshot(
                Request::patch("/api/payments/2")
                    .header(header::CONTENT_TYPE, "application/json")
                    .body(Body::from(r#"{"status":"sideways"}"#))
                    .unwrap(),
            )
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    }

    #[tokio::test]
    async fn search_requires_a_query() {
        let app = build_app(AppState::fake());
        let response = app
            .clone()
            .oneshot(Request::get("/api/search").body(Body::empty()).unwrap())
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);

        let response = app
            .oneshot(Request::get("/api/search?q=laptop").body(Body::empty()).unwrap())
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        let body = json_body(response).await;
        assert_eq!(body["results"][0]["type"], "product");
        assert_eq!(body["results"][0]["name"], "Laptop Pro");
    }

    #[tokio::test]
    async fn webhook_rejects_bad_signature_and_accepts_signed() {
        let app = build_app(AppState::fake());
        let payload = r#"{"event":"order.created"}"#;

        let response = app
            .clone()
            .oneshot(
                Request::post("/api/webhook")
                    .header("x-signature", "sha256=Ym9ndXM=")
                    .body(Body::from(payload))
                    .unwrap(),
            )
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::UNAUTHORIZED);

        let signature = crate::webhook::sign("demo-secret", payload.as_bytes());
        let response = app
            .oneshot(
                Request::post("/api/webhook")
                    .header("x-signature", signature)
                    .header("x-event-type", "order.created")
                    .body(Body::from(payload))
                    .unwrap(),
            )
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(json_body(response).await["event"], "order.created");
    }

    #[tokio::test]
    async fn signed_webhook_with_non_json_body_is_a_400() {
        let app = build_app(AppState::fake());
        let payload = "not json";
        let signature = crate::webhook::sign("demo-secret", payload.as_bytes());
        let response = app
            .oneshot(
                Request::post("/api/webhook")
                    .header("x-signature", signature)
                    .body(Body::from(payload))
                    .unwrap(),
            )
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    }

    #[tokio::test]
    async fn upload_round_trip_and_missing_file() {
        let app = build_app(AppState::fake());

        let boundary = "test-boundary";
        let body = format!(
            "--{boundary}\r\n\
             Content-Disposition: form-data; name=\"file\"; filename=\"note.txt\"\r\n\
             Content-Type: text/plain\r\n\r\n\
             hello world\r\n\
             --{boundary}\r\n\
             Content-Disposition: form-data; name=\"description\"\r\n\r\n\
             a note\r\n\
             --{boundary}--\r\n"
        );
        let response = app
            .clone()
            .oneshot(
                Request::post("/api/upload")
                    .header(
                        header::CONTENT_TYPE,
                        format!("multipart/form-data; boundary={boundary}"),
                    )
                    .body(Body::from(body))
                    .unwrap(),
            )
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        let body = json_body(response).await;
        assert_eq!(body["file"]["name"], "note.txt");
        assert_eq!(body["file"]["size"], 11);
        assert_eq!(body["file"]["description"], "a note");
        assert_eq!(body["file"]["url"], "/uploads/note.txt");

        let empty = format!("--{boundary}--\r\n");
        let response = app
            .oneshot(
                Request::post("/api/upload")
                    .header(
                        header::CONTENT_TYPE,
                        format!("multipart/form-data; boundary={boundary}"),
                    )
                    .body(Body::from(empty))
                    .unwrap(),
            )
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
        assert_eq!(json_body(response).await["error"], "No file provided");
    }

    #[tokio::test]
    async fn upload_with_oversized_declared_length_gets_the_size_error() {
        let app = build_app(AppState::fake());
        let boundary = "test-boundary";
        let response = app
            .oneshot(
                Request::post("/api/upload")
                    .header(
                        header::CONTENT_TYPE,
                        format!("multipart/form-data; boundary={boundary}"),
                    )
                    .header(header::CONTENT_LENGTH, "10485760")
                    .body(Body::from(format!("--{boundary}--\r\n")))
                    .unwrap(),
            )
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
        assert_eq!(
            json_body(response).await["error"],
            "File size exceeds 5MB limit"
        );
    }

    #[sqlx::test]
    async fn register_login_me_round_trip(pool: sqlx::PgPool) {
        let app = build_app(AppState::with_pool(pool));

        let response = app
            .clone()
            .oneshot(post_json(
                "/api/auth/register",
                r#"{"email":"alice@example.com","password":"password123"}"#,
            ))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::CREATED);
        let cookies = session_cookies(&response);
        assert!(cookies.contains("user_id="));
        assert!(cookies.contains("username=alice"));
        let body = json_body(response).await;
        assert_eq!(body["user"]["username"], "alice");
        let id = body["user"]["id"].as_i64().unwrap();
        assert!(body["user"].get("passwordHash").is_none());
        assert!(body["user"].get("password_hash").is_none());

        let response = app
            .clone()
            .oneshot(post_json(
                "/api/auth/login",
                r#"{"email":"alice@example.com","password":"password123"}"#,
            ))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        let cookies = session_cookies(&response);
        assert_eq!(json_body(response).await["user"]["id"].as_i64(), Some(id));

        let response = app
            .clone()
            .oneshot(
                Request::get("/api/auth/me")
                    .header(header::COOKIE, cookies)
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(json_body(response).await["user"]["id"].as_i64(), Some(id));

        let response = app
            .oneshot(Request::get("/api/auth/me").body(Body::empty()).unwrap())
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
    }

    #[sqlx::test]
    async fn duplicate_email_and_username_conflict(pool: sqlx::PgPool) {
        let app = build_app(AppState::with_pool(pool));

        let response = app
            .clone()
            .oneshot(post_json(
                "/api/auth/register",
                r#"{"email":"bob@example.com","password":"password123"}"#,
            ))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::CREATED);

        // Same email again.
        let response = app
            .clone()
            .oneshot(post_json(
                "/api/auth/register",
                r#"{"email":"bob@example.com","password":"password456"}"#,
            ))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::CONFLICT);
        assert_eq!(
            json_body(response).await["error"],
            "User already exists with this email or username"
        );

        // Fresh email, but the username "bob" is taken.
        let response = app
            .oneshot(post_json(
                "/api/auth/register",
                r#"{"email":"robert@example.com","password":"password123","username":"bob"}"#,
            ))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::CONFLICT);
    }

    #[sqlx::test]
    async fn login_failures_are_indistinguishable(pool: sqlx::PgPool) {
        let app = build_app(AppState::with_pool(pool));

        let response = app
            .clone()
            .oneshot(post_json(
                "/api/auth/register",
                r#"{"email":"carol@example.com","password":"password123"}"#,
            ))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::CREATED);

        let wrong_password = app
            .clone()
            .oneshot(post_json(
                "/api/auth/login",
                r#"{"email":"carol@example.com","password":"wrong-password"}"#,
            ))
            .await
            .unwrap();
        let unknown_email = app
            .oneshot(post_json(
                "/api/auth/login",
                r#"{"email":"nobody@example.com","password":"password123"}"#,
            ))
            .await
            .unwrap();

        assert_eq!(wrong_password.status(), StatusCode::UNAUTHORIZED);
        assert_eq!(unknown_email.status(), StatusCode::UNAUTHORIZED);
        assert_eq!(
            json_body(wrong_password).await,
            json_body(unknown_email).await
        );
    }

    #[sqlx::test]
    async fn register_rejects_header_unsafe_usernames(pool: sqlx::PgPool) {
        let app = build_app(AppState::with_pool(pool));

        let response = app
            .oneshot(post_json(
                "/api/auth/register",
                r#"{"email":"mallory@example.com","password":"password123","username":"bob; Domain=evil.com; Secure"}"#,
            ))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
        // No session cookies may be issued for a rejected name.
        assert!(response.headers().get(header::SET_COOKIE).is_none());
    }

    #[tokio::test]
    async fn upload_usage_doc_is_served() {
        let app = build_app(AppState::fake());
        let response = app
            .oneshot(Request::get("/api/upload").body(Body::empty()).unwrap())
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(json_body(response).await["limits"]["maxFileSize"], "5MB");
    }
}
