//! End-to-end test harness for the Tindahan orders API.
//!
//! # Running Tests
//!
//! ```bash
//! # Migrate a scratch database and start the server
//! cargo run -p tindahan-cli -- migrate
//! cargo run -p tindahan-api
//!
//! # Run the ignored end-to-end tests against it
//! cargo test -p tindahan-integration-tests -- --ignored
//! ```
//!
//! # Environment Variables
//!
//! - `API_BASE_URL` - Server under test (default: `http://localhost:3000`)
//! - `API_DATABASE_URL` / `DATABASE_URL` - Same database the server uses
//! - `API_JWT_SECRET` - Same secret the server verifies tokens with
//!
//! Every test seeds its own user and products with unique values, so tests
//! can run in parallel against a shared database.

use chrono::Duration;
use reqwest::{Client, RequestBuilder};
use secrecy::{ExposeSecret, SecretString};
use serde_json::Value;
use sqlx::PgPool;
use uuid::Uuid;

use tindahan_api::config::{database_url_from_env, jwt_secret_from_env};
use tindahan_api::services::auth::{Claims, issue_token};
use tindahan_core::{Money, ProductId, UserId};

/// Shared handles for one end-to-end test.
pub struct TestContext {
    pub client: Client,
    pub base_url: String,
    pub pool: PgPool,
    jwt_secret: SecretString,
}

/// A seeded user and a bearer header for them.
pub struct TestUser {
    pub id: UserId,
    pub email: String,
    pub bearer: String,
}

impl TestContext {
    /// Connect to the database and build an HTTP client.
    ///
    /// # Panics
    ///
    /// Panics if the environment is incomplete or the database is unreachable.
    pub async fn new() -> Self {
        let base_url =
            std::env::var("API_BASE_URL").unwrap_or_else(|_| "http://localhost:3000".to_string());
        let database_url = database_url_from_env().expect("database URL must be set");
        let jwt_secret = jwt_secret_from_env().expect("API_JWT_SECRET must be set");

        let pool = PgPool::connect(database_url.expose_secret())
            .await
            .expect("Failed to connect to test database");

        Self {
            client: Client::new(),
            base_url,
            pool,
            jwt_secret,
        }
    }

    /// Absolute URL for `path`.
    #[must_use]
    pub fn url(&self, path: &str) -> String {
        format!("{}{path}", self.base_url.trim_end_matches('/'))
    }

    /// Insert a user with a unique email and mint a token for them.
    ///
    /// # Panics
    ///
    /// Panics if the insert or signing fails.
    pub async fn seed_user(&self) -> TestUser {
        let email = format!("it-{}@example.ph", Uuid::new_v4().simple());
        let id: i32 = sqlx::query_scalar("INSERT INTO shop.users (email) VALUES ($1) RETURNING id")
            .bind(&email)
            .fetch_one(&self.pool)
            .await
            .expect("Failed to seed user");
        let id = UserId::new(id);

        let claims = Claims::new(id, email.clone(), Duration::hours(1));
        let token = issue_token(&self.jwt_secret, &claims).expect("Failed to sign token");

        TestUser {
            id,
            email,
            bearer: format!("Bearer {token}"),
        }
    }

    /// Insert a product with the given price and variant stock JSON.
    ///
    /// # Panics
    ///
    /// Panics if the insert fails.
    pub async fn seed_product(&self, price: i64, variants: &str) -> ProductId {
        let name = format!("Test Barong {}", Uuid::new_v4().simple());
        let id: i32 = sqlx::query_scalar(
            r"
            INSERT INTO shop.products (name, brand, price, variants, stock_quantity)
            VALUES ($1, 'Tindahan', $2, $3, 100)
            RETURNING id
            ",
        )
        .bind(&name)
        .bind(Money::from_units(price))
        .bind(variants)
        .fetch_one(&self.pool)
        .await
        .expect("Failed to seed product");
        ProductId::new(id)
    }

    /// Current variant stock of a product, parsed.
    ///
    /// # Panics
    ///
    /// Panics if the product is missing or its variants are not JSON.
    pub async fn variants_of(&self, product: ProductId) -> Value {
        let raw: Option<String> =
            sqlx::query_scalar("SELECT variants FROM shop.products WHERE id = $1")
                .bind(product)
                .fetch_one(&self.pool)
                .await
                .expect("Failed to read product");
        serde_json::from_str(&raw.unwrap_or_default()).expect("variants should be JSON")
    }

    /// Number of orders owned by `user`.
    ///
    /// # Panics
    ///
    /// Panics if the query fails.
    pub async fn order_count(&self, user: &TestUser) -> i64 {
        sqlx::query_scalar("SELECT COUNT(*) FROM shop.orders WHERE user_id = $1")
            .bind(user.id)
            .fetch_one(&self.pool)
            .await
            .expect("Failed to count orders")
    }

    /// Number of addresses owned by `user`.
    ///
    /// # Panics
    ///
    /// Panics if the query fails.
    pub async fn address_count(&self, user: &TestUser) -> i64 {
        sqlx::query_scalar("SELECT COUNT(*) FROM shop.addresses WHERE user_id = $1")
            .bind(user.id)
            .fetch_one(&self.pool)
            .await
            .expect("Failed to count addresses")
    }

    /// `GET path` as `user`.
    #[must_use]
    pub fn get(&self, user: &TestUser, path: &str) -> RequestBuilder {
        self.client
            .get(self.url(path))
            .header("authorization", &user.bearer)
    }

    /// `POST path` as `user` with a JSON body.
    #[must_use]
    pub fn post(&self, user: &TestUser, path: &str, body: &Value) -> RequestBuilder {
        self.client
            .post(self.url(path))
            .header("authorization", &user.bearer)
            .json(body)
    }

    /// `POST path` as `user` with JSON text sent exactly as given.
    #[must_use]
    pub fn post_raw(&self, user: &TestUser, path: &str, body: &str) -> RequestBuilder {
        self.client
            .post(self.url(path))
            .header("authorization", &user.bearer)
            .header("content-type", "application/json")
            .body(body.to_owned())
    }

    /// `PUT path` as `user` with a JSON body.
    #[must_use]
    pub fn put(&self, user: &TestUser, path: &str, body: &Value) -> RequestBuilder {
        self.client
            .put(self.url(path))
            .header("authorization", &user.bearer)
            .json(body)
    }

    /// `DELETE path` as `user`.
    #[must_use]
    pub fn delete(&self, user: &TestUser, path: &str) -> RequestBuilder {
        self.client
            .delete(self.url(path))
            .header("authorization", &user.bearer)
    }
}
