#![allow(dead_code)]

use std::sync::Arc;

use axum::{
    body::Body,
    http::{header, Method, Request, StatusCode},
    response::Response,
    Router,
};
use chrono::Duration;
use http_body_util::BodyExt;
use kuizzz::{
    auth::hash_password,
    db::{self, queries, Role},
    server::app::{router, AppState},
    settings::Settings,
};
use serde_json::Value;
use sqlx::SqlitePool;
use tower::ServiceExt;

pub struct TestApp {
    pub pool: SqlitePool,
    pub router: Router,
}

pub async fn create_test_db() -> SqlitePool {
    let pool = db::in_memory().await.expect("failed to open test database");
    db::run_migrations(&pool)
        .await
        .expect("failed to migrate test database");
    pool
}

pub async fn spawn_app() -> TestApp {
    spawn_app_with(Settings::defaults().expect("default settings")).await
}

pub async fn spawn_app_with(settings: Settings) -> TestApp {
    let pool = create_test_db().await;
    let state = AppState {
        pool: pool.clone(),
        settings: Arc::new(settings),
    };
    TestApp {
        pool,
        router: router(state),
    }
}

impl TestApp {
    /// Creates a user with `roles` and returns a session token for them.
    pub async fn login_as(&self, username: &str, roles: &[Role]) -> String {
        let hash = hash_password("password123").unwrap();
        let id = queries::users::create_user(
            &self.pool,
            username,
            username,
            &format!("{username}@example.com"),
            Some(hash.as_str()),
            roles,
        )
        .await
        .unwrap();
        queries::sessions::create_session(&self.pool, id, Duration::hours(1))
            .await
            .unwrap()
    }

    pub async fn request(
        &self,
        method: Method,
        uri: &str,
        token: Option<&str>,
        body: Option<Value>,
    ) -> (StatusCode, Value) {
        let mut builder = Request::builder().method(method).uri(uri);
        if let Some(token) = token {
            builder = builder.header(header::AUTHORIZATION, format!("Bearer {token}"));
        }
        let request = match body {
            Some(body) => builder
                .header(header::CONTENT_TYPE, "application/json")
                .body(Body::from(body.to_string()))
                .unwrap(),
            None => builder.body(Body::empty()).unwrap(),
        };
        let response = self.router.clone().oneshot(request).await.unwrap();
        let status = response.status();
        let bytes = response.into_body().collect().await.unwrap().to_bytes();
        let json = if bytes.is_empty() {
            Value::Null
        } else {
            serde_json::from_slice(&bytes).unwrap_or(Value::String(
                String::from_utf8_lossy(&bytes).into_owned(),
            ))
        };
        (status, json)
    }

    pub async fn send(&self, request: Request<Body>) -> Response {
        self.router.clone().oneshot(request).await.unwrap()
    }

    pub async fn get(&self, uri: &str, token: Option<&str>) -> (StatusCode, Value) {
        self.request(Method::GET, uri, token, None).await
    }

    pub async fn post(&self, uri: &str, token: Option<&str>, body: Value) -> (StatusCode, Value) {
        self.request(Method::POST, uri, token, Some(body)).await
    }

    pub async fn put(&self, uri: &str, token: Option<&str>, body: Value) -> (StatusCode, Value) {
        self.request(Method::PUT, uri, token, Some(body)).await
    }

    pub async fn delete(&self, uri: &str, token: Option<&str>) -> (StatusCode, Value) {
        self.request(Method::DELETE, uri, token, None).await
    }
}
