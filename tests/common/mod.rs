#![allow(dead_code)]

use async_trait::async_trait;
use axum::body::Body;
use axum::http::{header, Method, Request, StatusCode};
use axum::Router;
use parking_lot::RwLock;
use rust_decimal::Decimal;
use serde_json::Value;
use sqlx::PgPool;
use std::sync::Arc;
use tower::ServiceExt;
use tower_sessions::MemoryStore;

use storefront::auth::Accounts;
use storefront::config::SessionSettings;
use storefront::database::MIGRATOR;
use storefront::model::{ProductId, ProductInput};
use storefront::{
    http, AppState, InMemoryUnitOfWork, TransactionAware, TransactionResult, UnitOfWork,
    UnitOfWorkSession,
};

/// Connects to `DATABASE_URL`, applies migrations and empties every table.
pub async fn setup_database() -> PgPool {
    let url = std::env::var("DATABASE_URL").expect("DATABASE_URL must be set");
    let pool = PgPool::connect(&url)
        .await
        .expect("Failed to connect to database");

    MIGRATOR.run(&pool).await.expect("Failed to run migrations");
    sqlx::query("TRUNCATE product, users, order_line RESTART IDENTITY")
        .execute(&pool)
        .await
        .expect("Failed to truncate tables");

    pool
}

pub fn product(name: &str, quantity: i32) -> ProductInput {
    ProductInput {
        name: name.to_string(),
        description: None,
        price: Decimal::new(250, 2),
        quantity,
        image_url: None,
    }
}

/// Observer recording which lifecycle callback it received.
#[derive(Default)]
pub struct TrackingObserver {
    committed: RwLock<bool>,
    rolled_back: RwLock<bool>,
}

impl TrackingObserver {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    pub fn is_committed(&self) -> bool {
        *self.committed.read()
    }

    pub fn is_rolled_back(&self) -> bool {
        *self.rolled_back.read()
    }
}

#[async_trait]
impl TransactionAware for TrackingObserver {
    async fn on_commit(&self) -> TransactionResult<()> {
        *self.committed.write() = true;
        Ok(())
    }

    async fn on_rollback(&self) -> TransactionResult<()> {
        *self.rolled_back.write() = true;
        Ok(())
    }
}

/// The full application over the in-memory store.
pub struct TestApp {
    pub store: InMemoryUnitOfWork,
    router: Router,
}

pub struct TestResponse {
    pub status: StatusCode,
    pub body: Value,
    pub cookie: Option<String>,
}

impl TestApp {
    pub fn new() -> Self {
        let store = InMemoryUnitOfWork::new();
        let state = AppState::new(store.clone(), "public", "private/admin.html");
        let router = http::app(state, MemoryStore::default(), SessionSettings::default());
        Self { store, router }
    }

    pub async fn request(
        &self,
        method: Method,
        path: &str,
        body: Option<Value>,
        cookie: Option<&str>,
    ) -> TestResponse {
        let mut builder = Request::builder().method(method).uri(path);
        if let Some(cookie) = cookie {
            builder = builder.header(header::COOKIE, cookie);
        }
        let request = match body {
            Some(body) => builder
                .header(header::CONTENT_TYPE, "application/json")
                .body(Body::from(body.to_string())),
            None => builder.body(Body::empty()),
        }
        .expect("Failed to build request");

        self.send(request).await
    }

    pub async fn send(&self, request: Request<Body>) -> TestResponse {
        let response = self
            .router
            .clone()
            .oneshot(request)
            .await
            .expect("Router is infallible");

        let status = response.status();
        let cookie = response
            .headers()
            .get(header::SET_COOKIE)
            .and_then(|value| value.to_str().ok())
            .and_then(|value| value.split(';').next())
            .map(str::to_string);
        let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .expect("Failed to read body");
        let body = serde_json::from_slice(&bytes)
            .unwrap_or_else(|_| Value::String(String::from_utf8_lossy(&bytes).into_owned()));

        TestResponse {
            status,
            body,
            cookie,
        }
    }

    pub async fn get(&self, path: &str, cookie: Option<&str>) -> TestResponse {
        self.request(Method::GET, path, None, cookie).await
    }

    pub async fn post(&self, path: &str, body: Value, cookie: Option<&str>) -> TestResponse {
        self.request(Method::POST, path, Some(body), cookie).await
    }

    /// Creates an account directly in the store.
    pub async fn seed_user(&self, username: &str, password: &str, is_admin: bool) {
        let accounts = Accounts::new(&self.store);
        let created = if is_admin {
            accounts.create_admin(username, password).await
        } else {
            accounts.register(username, password).await
        };
        created.expect("Failed to seed user");
    }

    pub async fn seed_product(&self, name: &str, quantity: i32) -> ProductId {
        let session = self.store.begin().await.expect("Failed to begin");
        let id = session
            .products()
            .insert(&product(name, quantity))
            .await
            .expect("Failed to seed product");
        session.commit().await.expect("Failed to commit");
        id
    }

    pub async fn stock(&self, id: ProductId) -> i32 {
        let session = self.store.begin().await.expect("Failed to begin");
        session
            .inventory()
            .get_stock(id)
            .await
            .expect("Failed to read stock")
    }

    /// Logs in and returns the session cookie.
    pub async fn login(&self, username: &str, password: &str) -> String {
        let response = self
            .post(
                "/login",
                serde_json::json!({ "username": username, "password": password }),
                None,
            )
            .await;
        assert_eq!(response.status, StatusCode::OK, "login failed: {}", response.body);
        response.cookie.expect("login sets a session cookie")
    }
}
