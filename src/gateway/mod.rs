//! Remote Data Gateway
//!
//! Opaque interface to the hosted backend: a table-style relational store,
//! an auth service, and bucket-scoped object storage. Services never talk
//! HTTP directly; they go through these traits so tests can swap in the
//! in-memory doubles from [`memory`].

use std::collections::HashMap;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use thiserror::Error;

pub mod memory;
pub mod rest;

pub use memory::{MemoryAuth, MemoryGateway, MemoryStorage};
pub use rest::RestGateway;

/// A single table row as returned by the backend.
pub type Row = serde_json::Map<String, Value>;

/// Postgres unique-violation code, surfaced by the backend on duplicate
/// inserts into uniqueness-constrained join tables.
pub const UNIQUE_VIOLATION: &str = "23505";

#[derive(Error, Debug)]
pub enum GatewayError {
    #[error("backend error {code}: {message}")]
    Backend {
        code: String,
        message: String,
        hint: Option<String>,
    },
    #[error("transport error: {0}")]
    Transport(String),
    #[error("serialization error: {0}")]
    Serde(#[from] serde_json::Error),
    #[error("validation error: {0}")]
    Validation(String),
}

impl GatewayError {
    pub fn is_unique_violation(&self) -> bool {
        matches!(self, GatewayError::Backend { code, .. } if code == UNIQUE_VIOLATION)
    }
}

impl From<reqwest::Error> for GatewayError {
    fn from(err: reqwest::Error) -> Self {
        GatewayError::Transport(err.to_string())
    }
}

pub type GatewayResult<T> = Result<T, GatewayError>;

/// A single filter condition on a column.
#[derive(Debug, Clone)]
pub enum Filter {
    Eq(String, Value),
    In(String, Vec<Value>),
    IsNull(String),
    NotNull(String),
}

#[derive(Debug, Clone)]
pub struct Order {
    pub column: String,
    pub ascending: bool,
}

/// Declarative read query: filters, at most one order column, optional limit.
#[derive(Debug, Clone, Default)]
pub struct SelectQuery {
    pub filters: Vec<Filter>,
    pub order: Option<Order>,
    pub limit: Option<usize>,
}

impl SelectQuery {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn eq(mut self, column: &str, value: impl Into<Value>) -> Self {
        self.filters.push(Filter::Eq(column.to_string(), value.into()));
        self
    }

    pub fn in_list(mut self, column: &str, values: Vec<Value>) -> Self {
        self.filters.push(Filter::In(column.to_string(), values));
        self
    }

    pub fn is_null(mut self, column: &str) -> Self {
        self.filters.push(Filter::IsNull(column.to_string()));
        self
    }

    pub fn not_null(mut self, column: &str) -> Self {
        self.filters.push(Filter::NotNull(column.to_string()));
        self
    }

    pub fn order_asc(mut self, column: &str) -> Self {
        self.order = Some(Order {
            column: column.to_string(),
            ascending: true,
        });
        self
    }

    pub fn order_desc(mut self, column: &str) -> Self {
        self.order = Some(Order {
            column: column.to_string(),
            ascending: false,
        });
        self
    }

    pub fn limit(mut self, limit: usize) -> Self {
        self.limit = Some(limit);
        self
    }
}

/// Table-style read/write operations against the hosted relational store.
#[async_trait]
pub trait TableGateway: Send + Sync {
    async fn select(&self, table: &str, query: SelectQuery) -> GatewayResult<Vec<Row>>;

    /// Insert one row; returns the stored row (with generated id/timestamp).
    async fn insert(&self, table: &str, row: Row) -> GatewayResult<Row>;

    /// Apply `changes` to every row matching `filters`; returns updated rows.
    async fn update(&self, table: &str, changes: Row, filters: Vec<Filter>) -> GatewayResult<Vec<Row>>;

    /// Delete matching rows; returns how many were removed.
    async fn delete(&self, table: &str, filters: Vec<Filter>) -> GatewayResult<u64>;

    /// Uniqueness-constrained upsert. With `ignore_duplicates` a conflicting
    /// row is left untouched and the call succeeds (toggle idempotence
    /// depends on this).
    async fn upsert(
        &self,
        table: &str,
        row: Row,
        conflict: &[&str],
        ignore_duplicates: bool,
    ) -> GatewayResult<()>;

    /// Exact count of matching rows.
    async fn count(&self, table: &str, filters: Vec<Filter>) -> GatewayResult<u64>;
}

/// Identity delivered by the hosted auth service.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct AuthUser {
    pub id: String,
    pub email: String,
    #[serde(default)]
    pub metadata: HashMap<String, Value>,
}

/// Callback invoked on every session change.
pub type SessionCallback = Box<dyn Fn(Option<AuthUser>) + Send + Sync>;

#[async_trait]
pub trait AuthGateway: Send + Sync {
    /// Current session, if any.
    async fn session(&self) -> Option<AuthUser>;

    async fn sign_up(&self, email: &str, password: &str) -> GatewayResult<AuthUser>;
    async fn sign_in(&self, email: &str, password: &str) -> GatewayResult<AuthUser>;
    async fn sign_out(&self) -> GatewayResult<()>;

    /// Register a listener for session changes. Listeners stay registered
    /// for the life of the gateway.
    fn subscribe(&self, callback: SessionCallback);
}

/// Bucket-scoped object storage.
#[async_trait]
pub trait StorageGateway: Send + Sync {
    async fn upload(
        &self,
        bucket: &str,
        path: &str,
        bytes: &[u8],
        content_type: &str,
    ) -> GatewayResult<()>;

    /// Publicly fetchable URL for an object. Pure string construction, no
    /// network round trip.
    fn public_url(&self, bucket: &str, path: &str) -> String;

    async fn remove(&self, bucket: &str, path: &str) -> GatewayResult<()>;
}
