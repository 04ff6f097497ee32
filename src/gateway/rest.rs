//! HTTP gateway for the hosted backend.
//!
//! Speaks the backend's REST dialect: `eq.`/`in.` query operators and
//! `Prefer` headers for the relational store, token-grant endpoints for
//! auth, and object endpoints for storage. Not exercised by the test
//! suite; the in-memory doubles stand in for it there.

use std::collections::HashMap;
use std::sync::Mutex;

use async_trait::async_trait;
use reqwest::Client;
use serde::Deserialize;
use serde_json::Value;

use crate::config::GalleryConfig;

use super::{
    AuthGateway, AuthUser, Filter, GatewayError, GatewayResult, Row, SelectQuery, SessionCallback,
    StorageGateway, TableGateway,
};

pub struct RestGateway {
    http: Client,
    base_url: String,
    anon_key: String,
    access_token: Mutex<Option<String>>,
    session: Mutex<Option<AuthUser>>,
    listeners: Mutex<Vec<SessionCallback>>,
}

impl RestGateway {
    pub fn new(config: &GalleryConfig) -> Self {
        Self {
            http: Client::new(),
            base_url: config.backend_url.trim_end_matches('/').to_string(),
            anon_key: config.anon_key.clone(),
            access_token: Mutex::new(None),
            session: Mutex::new(None),
            listeners: Mutex::new(Vec::new()),
        }
    }

    fn table_url(&self, table: &str) -> String {
        format!("{}/rest/v1/{}", self.base_url, table)
    }

    fn bearer(&self) -> String {
        self.access_token
            .lock()
            .unwrap()
            .clone()
            .unwrap_or_else(|| self.anon_key.clone())
    }

    fn notify(&self, user: Option<AuthUser>) {
        let listeners = self.listeners.lock().unwrap();
        for listener in listeners.iter() {
            listener(user.clone());
        }
    }

    fn set_session(&self, token: Option<String>, user: Option<AuthUser>) {
        *self.access_token.lock().unwrap() = token;
        *self.session.lock().unwrap() = user.clone();
        self.notify(user);
    }

    async fn error_from_response(response: reqwest::Response) -> GatewayError {
        let status = response.status();
        let body: Value = response.json().await.unwrap_or(Value::Null);
        GatewayError::Backend {
            code: body
                .get("code")
                .and_then(Value::as_str)
                .unwrap_or(status.as_str())
                .to_string(),
            message: body
                .get("message")
                .and_then(Value::as_str)
                .unwrap_or("request rejected")
                .to_string(),
            hint: body
                .get("hint")
                .and_then(Value::as_str)
                .map(str::to_string),
        }
    }
}

/// Render a JSON value as a filter literal (`eq.42`, `eq.user-1`).
fn literal(value: &Value) -> String {
    match value {
        Value::String(s) => s.clone(),
        other => other.to_string(),
    }
}

/// Render a value for an `in.(...)` list; strings are quoted.
fn list_literal(value: &Value) -> String {
    match value {
        Value::String(s) => format!("\"{s}\""),
        other => other.to_string(),
    }
}

fn filter_pairs(filters: &[Filter]) -> Vec<(String, String)> {
    filters
        .iter()
        .map(|filter| match filter {
            Filter::Eq(column, value) => (column.clone(), format!("eq.{}", literal(value))),
            Filter::In(column, values) => {
                let joined: Vec<String> = values.iter().map(list_literal).collect();
                (column.clone(), format!("in.({})", joined.join(",")))
            }
            Filter::IsNull(column) => (column.clone(), "is.null".to_string()),
            Filter::NotNull(column) => (column.clone(), "not.is.null".to_string()),
        })
        .collect()
}

fn content_range_total(response: &reqwest::Response) -> u64 {
    response
        .headers()
        .get("content-range")
        .and_then(|v| v.to_str().ok())
        .and_then(|s| s.rsplit('/').next())
        .and_then(|total| total.parse().ok())
        .unwrap_or(0)
}

#[async_trait]
impl TableGateway for RestGateway {
    async fn select(&self, table: &str, query: SelectQuery) -> GatewayResult<Vec<Row>> {
        let mut pairs = filter_pairs(&query.filters);
        if let Some(order) = &query.order {
            let direction = if order.ascending { "asc" } else { "desc" };
            pairs.push(("order".to_string(), format!("{}.{}", order.column, direction)));
        }
        if let Some(limit) = query.limit {
            pairs.push(("limit".to_string(), limit.to_string()));
        }

        let response = self
            .http
            .get(self.table_url(table))
            .query(&pairs)
            .header("apikey", self.anon_key.as_str())
            .bearer_auth(self.bearer())
            .send()
            .await?;

        if !response.status().is_success() {
            return Err(Self::error_from_response(response).await);
        }
        Ok(response.json().await?)
    }

    async fn insert(&self, table: &str, row: Row) -> GatewayResult<Row> {
        let response = self
            .http
            .post(self.table_url(table))
            .header("apikey", self.anon_key.as_str())
            .bearer_auth(self.bearer())
            .header("Prefer", "return=representation")
            .json(&vec![Value::Object(row)])
            .send()
            .await?;

        if !response.status().is_success() {
            return Err(Self::error_from_response(response).await);
        }
        let mut rows: Vec<Row> = response.json().await?;
        rows.pop().ok_or_else(|| GatewayError::Backend {
            code: "empty_representation".to_string(),
            message: "insert returned no row".to_string(),
            hint: None,
        })
    }

    async fn update(&self, table: &str, changes: Row, filters: Vec<Filter>) -> GatewayResult<Vec<Row>> {
        let response = self
            .http
            .patch(self.table_url(table))
            .query(&filter_pairs(&filters))
            .header("apikey", self.anon_key.as_str())
            .bearer_auth(self.bearer())
            .header("Prefer", "return=representation")
            .json(&Value::Object(changes))
            .send()
            .await?;

        if !response.status().is_success() {
            return Err(Self::error_from_response(response).await);
        }
        Ok(response.json().await?)
    }

    async fn delete(&self, table: &str, filters: Vec<Filter>) -> GatewayResult<u64> {
        let response = self
            .http
            .delete(self.table_url(table))
            .query(&filter_pairs(&filters))
            .header("apikey", self.anon_key.as_str())
            .bearer_auth(self.bearer())
            .header("Prefer", "count=exact")
            .send()
            .await?;

        if !response.status().is_success() {
            return Err(Self::error_from_response(response).await);
        }
        Ok(content_range_total(&response))
    }

    async fn upsert(
        &self,
        table: &str,
        row: Row,
        conflict: &[&str],
        ignore_duplicates: bool,
    ) -> GatewayResult<()> {
        let resolution = if ignore_duplicates {
            "resolution=ignore-duplicates"
        } else {
            "resolution=merge-duplicates"
        };
        let response = self
            .http
            .post(self.table_url(table))
            .query(&[("on_conflict", conflict.join(","))])
            .header("apikey", self.anon_key.as_str())
            .bearer_auth(self.bearer())
            .header("Prefer", resolution)
            .json(&vec![Value::Object(row)])
            .send()
            .await?;

        if !response.status().is_success() {
            return Err(Self::error_from_response(response).await);
        }
        Ok(())
    }

    async fn count(&self, table: &str, filters: Vec<Filter>) -> GatewayResult<u64> {
        let response = self
            .http
            .head(self.table_url(table))
            .query(&filter_pairs(&filters))
            .header("apikey", self.anon_key.as_str())
            .bearer_auth(self.bearer())
            .header("Prefer", "count=exact")
            .send()
            .await?;

        if !response.status().is_success() {
            return Err(Self::error_from_response(response).await);
        }
        Ok(content_range_total(&response))
    }
}

#[derive(Deserialize)]
struct TokenResponse {
    #[serde(default)]
    access_token: Option<String>,
    user: RestUser,
}

#[derive(Deserialize)]
struct RestUser {
    id: String,
    #[serde(default)]
    email: Option<String>,
    #[serde(default)]
    user_metadata: HashMap<String, Value>,
}

impl From<RestUser> for AuthUser {
    fn from(user: RestUser) -> Self {
        AuthUser {
            id: user.id,
            email: user.email.unwrap_or_default(),
            metadata: user.user_metadata,
        }
    }
}

#[async_trait]
impl AuthGateway for RestGateway {
    async fn session(&self) -> Option<AuthUser> {
        self.session.lock().unwrap().clone()
    }

    async fn sign_up(&self, email: &str, password: &str) -> GatewayResult<AuthUser> {
        let response = self
            .http
            .post(format!("{}/auth/v1/signup", self.base_url))
            .header("apikey", self.anon_key.as_str())
            .json(&serde_json::json!({ "email": email, "password": password }))
            .send()
            .await?;

        if !response.status().is_success() {
            return Err(Self::error_from_response(response).await);
        }
        let token: TokenResponse = response.json().await?;
        let user = AuthUser::from(token.user);
        self.set_session(token.access_token, Some(user.clone()));
        Ok(user)
    }

    async fn sign_in(&self, email: &str, password: &str) -> GatewayResult<AuthUser> {
        let response = self
            .http
            .post(format!(
                "{}/auth/v1/token?grant_type=password",
                self.base_url
            ))
            .header("apikey", self.anon_key.as_str())
            .json(&serde_json::json!({ "email": email, "password": password }))
            .send()
            .await?;

        if !response.status().is_success() {
            return Err(Self::error_from_response(response).await);
        }
        let token: TokenResponse = response.json().await?;
        let user = AuthUser::from(token.user);
        self.set_session(token.access_token, Some(user.clone()));
        Ok(user)
    }

    async fn sign_out(&self) -> GatewayResult<()> {
        let response = self
            .http
            .post(format!("{}/auth/v1/logout", self.base_url))
            .header("apikey", self.anon_key.as_str())
            .bearer_auth(self.bearer())
            .send()
            .await?;

        // Local state is cleared even if the server-side revoke failed.
        self.set_session(None, None);

        if !response.status().is_success() {
            return Err(Self::error_from_response(response).await);
        }
        Ok(())
    }

    fn subscribe(&self, callback: SessionCallback) {
        self.listeners.lock().unwrap().push(callback);
    }
}

#[async_trait]
impl StorageGateway for RestGateway {
    async fn upload(
        &self,
        bucket: &str,
        path: &str,
        bytes: &[u8],
        content_type: &str,
    ) -> GatewayResult<()> {
        let response = self
            .http
            .post(format!(
                "{}/storage/v1/object/{}/{}",
                self.base_url, bucket, path
            ))
            .header("apikey", self.anon_key.as_str())
            .bearer_auth(self.bearer())
            .header("Content-Type", content_type)
            .body(bytes.to_vec())
            .send()
            .await?;

        if !response.status().is_success() {
            return Err(Self::error_from_response(response).await);
        }
        Ok(())
    }

    fn public_url(&self, bucket: &str, path: &str) -> String {
        format!(
            "{}/storage/v1/object/public/{}/{}",
            self.base_url, bucket, path
        )
    }

    async fn remove(&self, bucket: &str, path: &str) -> GatewayResult<()> {
        let response = self
            .http
            .delete(format!(
                "{}/storage/v1/object/{}/{}",
                self.base_url, bucket, path
            ))
            .header("apikey", self.anon_key.as_str())
            .bearer_auth(self.bearer())
            .send()
            .await?;

        if !response.status().is_success() {
            return Err(Self::error_from_response(response).await);
        }
        Ok(())
    }
}
