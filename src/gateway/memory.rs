//! In-memory gateway doubles for tests.
//!
//! Mirrors the hosted backend's observable behavior: integer id sequences,
//! unique constraints that reject duplicates with the Postgres `23505`
//! code, ignore-duplicates upserts, and per-table fault injection so tests
//! can exercise the degraded paths.

use std::collections::{HashMap, HashSet};
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering as AtomicOrdering};
use std::sync::Mutex;

use async_trait::async_trait;
use chrono::Utc;
use serde_json::Value;
use uuid::Uuid;

use super::{
    AuthGateway, AuthUser, Filter, GatewayError, GatewayResult, Row, SelectQuery, SessionCallback,
    StorageGateway, TableGateway, UNIQUE_VIOLATION,
};

#[derive(Default)]
struct Table {
    rows: Vec<Row>,
    next_id: i64,
}

#[derive(Default)]
struct Tables {
    tables: HashMap<String, Table>,
    unique: HashMap<String, Vec<Vec<String>>>,
    failing: HashSet<String>,
}

/// In-memory relational store double.
pub struct MemoryGateway {
    inner: Mutex<Tables>,
    ops: AtomicU64,
}

impl MemoryGateway {
    pub fn new() -> Self {
        Self {
            inner: Mutex::new(Tables::default()),
            ops: AtomicU64::new(0),
        }
    }

    /// Gateway preconfigured with the gallery schema's unique constraints.
    pub fn with_gallery_schema() -> Self {
        let gateway = Self::new();
        gateway.add_unique("likes", &["user_id", "artwork_id"]);
        gateway.add_unique("comment_likes", &["user_id", "comment_id"]);
        gateway.add_unique("user_favorites", &["user_id", "artwork_id"]);
        gateway.add_unique("follows", &["follower_id", "following_id"]);
        gateway.add_unique("profiles", &["id"]);
        gateway
    }

    pub fn add_unique(&self, table: &str, columns: &[&str]) {
        let mut inner = self.inner.lock().unwrap();
        inner
            .unique
            .entry(table.to_string())
            .or_default()
            .push(columns.iter().map(|c| c.to_string()).collect());
    }

    /// Make every operation on `table` fail with a backend error.
    pub fn set_failing(&self, table: &str, failing: bool) {
        let mut inner = self.inner.lock().unwrap();
        if failing {
            inner.failing.insert(table.to_string());
        } else {
            inner.failing.remove(table);
        }
    }

    /// Total number of gateway operations issued, for asserting that a
    /// short-circuited call performed no round trip.
    pub fn op_count(&self) -> u64 {
        self.ops.load(AtomicOrdering::SeqCst)
    }

    fn check_available(inner: &Tables, table: &str) -> GatewayResult<()> {
        if inner.failing.contains(table) {
            return Err(GatewayError::Backend {
                code: "XX000".to_string(),
                message: format!("table {table} is unavailable"),
                hint: None,
            });
        }
        Ok(())
    }

    fn unique_conflict(inner: &Tables, table: &str, row: &Row) -> bool {
        let Some(constraints) = inner.unique.get(table) else {
            return false;
        };
        let Some(existing) = inner.tables.get(table) else {
            return false;
        };
        constraints.iter().any(|columns| {
            existing.rows.iter().any(|candidate| {
                columns.iter().all(|col| {
                    row.get(col).is_some() && row.get(col) == candidate.get(col)
                })
            })
        })
    }

    fn record_op(&self) {
        self.ops.fetch_add(1, AtomicOrdering::SeqCst);
    }
}

impl Default for MemoryGateway {
    fn default() -> Self {
        Self::new()
    }
}

fn matches(row: &Row, filter: &Filter) -> bool {
    match filter {
        Filter::Eq(column, value) => row.get(column) == Some(value),
        Filter::In(column, values) => row
            .get(column)
            .map(|v| values.contains(v))
            .unwrap_or(false),
        Filter::IsNull(column) => row.get(column).map(Value::is_null).unwrap_or(true),
        Filter::NotNull(column) => row.get(column).map(|v| !v.is_null()).unwrap_or(false),
    }
}

fn matches_all(row: &Row, filters: &[Filter]) -> bool {
    filters.iter().all(|f| matches(row, f))
}

fn cmp_values(a: &Value, b: &Value) -> std::cmp::Ordering {
    use std::cmp::Ordering;
    match (a, b) {
        (Value::Number(x), Value::Number(y)) => x
            .as_f64()
            .partial_cmp(&y.as_f64())
            .unwrap_or(Ordering::Equal),
        (Value::String(x), Value::String(y)) => x.cmp(y),
        (Value::Bool(x), Value::Bool(y)) => x.cmp(y),
        (Value::Null, Value::Null) => Ordering::Equal,
        (Value::Null, _) => Ordering::Less,
        (_, Value::Null) => Ordering::Greater,
        _ => Ordering::Equal,
    }
}

#[async_trait]
impl TableGateway for MemoryGateway {
    async fn select(&self, table: &str, query: SelectQuery) -> GatewayResult<Vec<Row>> {
        self.record_op();
        let inner = self.inner.lock().unwrap();
        Self::check_available(&inner, table)?;

        let mut rows: Vec<Row> = inner
            .tables
            .get(table)
            .map(|t| {
                t.rows
                    .iter()
                    .filter(|row| matches_all(row, &query.filters))
                    .cloned()
                    .collect()
            })
            .unwrap_or_default();

        if let Some(order) = &query.order {
            rows.sort_by(|a, b| {
                let ordering = cmp_values(
                    a.get(&order.column).unwrap_or(&Value::Null),
                    b.get(&order.column).unwrap_or(&Value::Null),
                );
                if order.ascending {
                    ordering
                } else {
                    ordering.reverse()
                }
            });
        }

        if let Some(limit) = query.limit {
            rows.truncate(limit);
        }
        Ok(rows)
    }

    async fn insert(&self, table: &str, mut row: Row) -> GatewayResult<Row> {
        self.record_op();
        let mut inner = self.inner.lock().unwrap();
        Self::check_available(&inner, table)?;

        if Self::unique_conflict(&inner, table, &row) {
            return Err(GatewayError::Backend {
                code: UNIQUE_VIOLATION.to_string(),
                message: format!("duplicate key value violates unique constraint on {table}"),
                hint: None,
            });
        }

        let entry = inner.tables.entry(table.to_string()).or_default();
        if !row.contains_key("id") {
            entry.next_id += 1;
            row.insert("id".to_string(), Value::from(entry.next_id));
        }
        if !row.contains_key("created_at") {
            row.insert(
                "created_at".to_string(),
                Value::from(Utc::now().to_rfc3339()),
            );
        }
        entry.rows.push(row.clone());
        Ok(row)
    }

    async fn update(&self, table: &str, changes: Row, filters: Vec<Filter>) -> GatewayResult<Vec<Row>> {
        self.record_op();
        let mut inner = self.inner.lock().unwrap();
        Self::check_available(&inner, table)?;

        let mut updated = Vec::new();
        if let Some(entry) = inner.tables.get_mut(table) {
            for row in entry.rows.iter_mut() {
                if matches_all(row, &filters) {
                    for (key, value) in &changes {
                        row.insert(key.clone(), value.clone());
                    }
                    updated.push(row.clone());
                }
            }
        }
        Ok(updated)
    }

    async fn delete(&self, table: &str, filters: Vec<Filter>) -> GatewayResult<u64> {
        self.record_op();
        let mut inner = self.inner.lock().unwrap();
        Self::check_available(&inner, table)?;

        let Some(entry) = inner.tables.get_mut(table) else {
            return Ok(0);
        };
        let before = entry.rows.len();
        entry.rows.retain(|row| !matches_all(row, &filters));
        Ok((before - entry.rows.len()) as u64)
    }

    async fn upsert(
        &self,
        table: &str,
        row: Row,
        conflict: &[&str],
        ignore_duplicates: bool,
    ) -> GatewayResult<()> {
        self.record_op();
        let mut inner = self.inner.lock().unwrap();
        Self::check_available(&inner, table)?;

        let existing_index = inner.tables.get(table).and_then(|entry| {
            entry.rows.iter().position(|candidate| {
                conflict
                    .iter()
                    .all(|col| row.get(*col).is_some() && row.get(*col) == candidate.get(*col))
            })
        });

        match existing_index {
            Some(index) => {
                if !ignore_duplicates {
                    let entry = inner.tables.get_mut(table).unwrap();
                    for (key, value) in &row {
                        entry.rows[index].insert(key.clone(), value.clone());
                    }
                }
                Ok(())
            }
            None => {
                let entry = inner.tables.entry(table.to_string()).or_default();
                let mut row = row;
                if !row.contains_key("id") {
                    entry.next_id += 1;
                    row.insert("id".to_string(), Value::from(entry.next_id));
                }
                entry.rows.push(row);
                Ok(())
            }
        }
    }

    async fn count(&self, table: &str, filters: Vec<Filter>) -> GatewayResult<u64> {
        self.record_op();
        let inner = self.inner.lock().unwrap();
        Self::check_available(&inner, table)?;

        Ok(inner
            .tables
            .get(table)
            .map(|t| t.rows.iter().filter(|row| matches_all(row, &filters)).count())
            .unwrap_or(0) as u64)
    }
}

/// In-memory auth double with password accounts and push notifications.
pub struct MemoryAuth {
    accounts: Mutex<HashMap<String, (String, AuthUser)>>,
    session: Mutex<Option<AuthUser>>,
    listeners: Mutex<Vec<SessionCallback>>,
}

impl MemoryAuth {
    pub fn new() -> Self {
        Self {
            accounts: Mutex::new(HashMap::new()),
            session: Mutex::new(None),
            listeners: Mutex::new(Vec::new()),
        }
    }

    /// Force the session from the outside, simulating a push from the
    /// hosted auth service (token refresh, sign-in from another tab).
    pub fn set_session(&self, user: Option<AuthUser>) {
        *self.session.lock().unwrap() = user.clone();
        self.notify(user);
    }

    fn notify(&self, user: Option<AuthUser>) {
        let listeners = self.listeners.lock().unwrap();
        for listener in listeners.iter() {
            listener(user.clone());
        }
    }
}

impl Default for MemoryAuth {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl AuthGateway for MemoryAuth {
    async fn session(&self) -> Option<AuthUser> {
        self.session.lock().unwrap().clone()
    }

    async fn sign_up(&self, email: &str, password: &str) -> GatewayResult<AuthUser> {
        let user = AuthUser {
            id: Uuid::new_v4().to_string(),
            email: email.to_string(),
            metadata: HashMap::new(),
        };
        {
            let mut accounts = self.accounts.lock().unwrap();
            if accounts.contains_key(email) {
                return Err(GatewayError::Backend {
                    code: "user_already_exists".to_string(),
                    message: format!("account {email} already registered"),
                    hint: None,
                });
            }
            accounts.insert(email.to_string(), (password.to_string(), user.clone()));
        }
        *self.session.lock().unwrap() = Some(user.clone());
        self.notify(Some(user.clone()));
        Ok(user)
    }

    async fn sign_in(&self, email: &str, password: &str) -> GatewayResult<AuthUser> {
        let user = {
            let accounts = self.accounts.lock().unwrap();
            match accounts.get(email) {
                Some((stored, user)) if stored == password => user.clone(),
                _ => {
                    return Err(GatewayError::Backend {
                        code: "invalid_credentials".to_string(),
                        message: "invalid email or password".to_string(),
                        hint: None,
                    })
                }
            }
        };
        *self.session.lock().unwrap() = Some(user.clone());
        self.notify(Some(user.clone()));
        Ok(user)
    }

    async fn sign_out(&self) -> GatewayResult<()> {
        *self.session.lock().unwrap() = None;
        self.notify(None);
        Ok(())
    }

    fn subscribe(&self, callback: SessionCallback) {
        self.listeners.lock().unwrap().push(callback);
    }
}

/// In-memory object storage double.
pub struct MemoryStorage {
    objects: Mutex<HashMap<String, Vec<u8>>>,
    failing: AtomicBool,
}

impl MemoryStorage {
    pub fn new() -> Self {
        Self {
            objects: Mutex::new(HashMap::new()),
            failing: AtomicBool::new(false),
        }
    }

    pub fn set_failing(&self, failing: bool) {
        self.failing.store(failing, AtomicOrdering::SeqCst);
    }

    pub fn object(&self, bucket: &str, path: &str) -> Option<Vec<u8>> {
        self.objects
            .lock()
            .unwrap()
            .get(&format!("{bucket}/{path}"))
            .cloned()
    }
}

impl Default for MemoryStorage {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl StorageGateway for MemoryStorage {
    async fn upload(
        &self,
        bucket: &str,
        path: &str,
        bytes: &[u8],
        _content_type: &str,
    ) -> GatewayResult<()> {
        if self.failing.load(AtomicOrdering::SeqCst) {
            return Err(GatewayError::Backend {
                code: "storage_unavailable".to_string(),
                message: format!("bucket {bucket} is unavailable"),
                hint: None,
            });
        }
        self.objects
            .lock()
            .unwrap()
            .insert(format!("{bucket}/{path}"), bytes.to_vec());
        Ok(())
    }

    fn public_url(&self, bucket: &str, path: &str) -> String {
        format!("memory://storage/{bucket}/{path}")
    }

    async fn remove(&self, bucket: &str, path: &str) -> GatewayResult<()> {
        self.objects
            .lock()
            .unwrap()
            .remove(&format!("{bucket}/{path}"));
        Ok(())
    }
}
