//! HTTP client for end-to-end tests
//!
//! Wraps reqwest and provides methods for the server endpoints.
//! When API routes or request formats change, update only this file.

use super::constants::*;
use reqwest::Response;
use serde_json::{json, Value};
use std::time::Duration;

/// HTTP test client with cookie-based session management
pub struct TestClient {
    /// The underlying reqwest client (public for custom requests in tests)
    pub client: reqwest::Client,
    /// The base URL of the test server
    pub base_url: String,
}

#[allow(dead_code)]
impl TestClient {
    /// Creates a new unauthenticated client
    pub fn new(base_url: String) -> Self {
        let client = reqwest::Client::builder()
            .cookie_store(true)
            .timeout(Duration::from_secs(REQUEST_TIMEOUT_SECS))
            .build()
            .expect("Failed to build reqwest client");

        Self { client, base_url }
    }

    async fn logged_in(base_url: String, handle: &str, password: &str) -> Self {
        let client = Self::new(base_url);

        let response = client.login(handle, password).await;
        assert_eq!(
            response.status(),
            reqwest::StatusCode::CREATED,
            "Authentication of {} failed: {:?}",
            handle,
            response.text().await
        );

        client
    }

    /// Creates a client pre-authenticated as a regular user
    pub async fn authenticated(base_url: String) -> Self {
        Self::logged_in(base_url, TEST_USER, TEST_PASS).await
    }

    /// Creates a client pre-authenticated as an admin user
    pub async fn authenticated_admin(base_url: String) -> Self {
        Self::logged_in(base_url, ADMIN_USER, ADMIN_PASS).await
    }

    /// Creates a client pre-authenticated as a user without roles
    pub async fn authenticated_reader(base_url: String) -> Self {
        Self::logged_in(base_url, READER_USER, READER_PASS).await
    }

    // ========================================================================
    // Generic requests
    // ========================================================================

    fn url(&self, path: &str) -> String {
        format!("{}{}", self.base_url, path)
    }

    pub async fn get(&self, path: &str) -> Response {
        self.client
            .get(self.url(path))
            .send()
            .await
            .expect("GET request failed")
    }

    pub async fn post_json(&self, path: &str, body: &Value) -> Response {
        self.client
            .post(self.url(path))
            .json(body)
            .send()
            .await
            .expect("POST request failed")
    }

    pub async fn put_json(&self, path: &str, body: &Value) -> Response {
        self.client
            .put(self.url(path))
            .json(body)
            .send()
            .await
            .expect("PUT request failed")
    }

    pub async fn patch_json(&self, path: &str, body: &Value) -> Response {
        self.client
            .patch(self.url(path))
            .json(body)
            .send()
            .await
            .expect("PATCH request failed")
    }

    pub async fn delete(&self, path: &str) -> Response {
        self.client
            .delete(self.url(path))
            .send()
            .await
            .expect("DELETE request failed")
    }

    // ========================================================================
    // Authentication Endpoints
    // ========================================================================

    /// POST /v1/auth/login
    pub async fn login(&self, handle: &str, password: &str) -> Response {
        self.post_json(
            "/v1/auth/login",
            &json!({
                "user_handle": handle,
                "password": password,
            }),
        )
        .await
    }

    /// GET /v1/auth/logout
    pub async fn logout(&self) -> Response {
        self.get("/v1/auth/logout").await
    }

    /// GET /v1/auth/session
    pub async fn get_session(&self) -> Response {
        self.get("/v1/auth/session").await
    }

    // ========================================================================
    // Archive Endpoints
    // ========================================================================

    /// GET /api/poets?{query}
    pub async fn list_poets(&self, query: &str) -> Response {
        self.get(&format!("/api/poets?{}", query)).await
    }

    /// GET /api/poets/{id}
    pub async fn get_poet(&self, id: i64) -> Response {
        self.get(&format!("/api/poets/{}", id)).await
    }

    /// POST /api/poets
    pub async fn create_poet(&self, body: &Value) -> Response {
        self.post_json("/api/poets", body).await
    }

    /// GET /api/categories/{id}
    pub async fn get_category(&self, id: i64) -> Response {
        self.get(&format!("/api/categories/{}", id)).await
    }

    /// GET /api/poems/{id}
    pub async fn get_poem(&self, id: i64) -> Response {
        self.get(&format!("/api/poems/{}", id)).await
    }

    /// GET /api/poems/search?q={q}
    pub async fn search_poems(&self, q: &str) -> Response {
        self.client
            .get(self.url("/api/poems/search"))
            .query(&[("q", q)])
            .send()
            .await
            .expect("Search request failed")
    }

    // ========================================================================
    // User Endpoints
    // ========================================================================

    /// GET /api/favorites
    pub async fn list_favorites(&self) -> Response {
        self.get("/api/favorites").await
    }

    /// POST /api/favorites
    pub async fn add_favorite(&self, poem: i64, verse: i64) -> Response {
        self.post_json("/api/favorites", &json!({"poem": poem, "verse": verse}))
            .await
    }

    /// POST /api/favorites/toggle
    pub async fn toggle_favorite(&self, body: &Value) -> Response {
        self.post_json("/api/favorites/toggle", body).await
    }

    /// GET /api/settings/me
    pub async fn get_settings(&self) -> Response {
        self.get("/api/settings/me").await
    }

    /// POST /api/settings/me
    pub async fn save_settings(&self, body: &Value) -> Response {
        self.post_json("/api/settings/me", body).await
    }

    // ========================================================================
    // Pages
    // ========================================================================

    /// GET /pages/{path}
    pub async fn get_page(&self, path: &str) -> Response {
        self.get(&format!("/pages/{}", path)).await
    }
}
