//! Artwork fetchers and mutations.
//!
//! The fetch path is the canonical hydration sequence: one primary query
//! for the artwork rows, then one batched lookup per related concern
//! (owner profiles, like counts, comment counts), merged in memory with
//! the primary ordering preserved. Auxiliary failures degrade to
//! placeholder profiles and zero counts instead of failing the fetch.

use std::collections::HashMap;
use std::sync::Arc;

use chrono::Utc;
use serde_json::Value;

use crate::gateway::{Filter, Row, SelectQuery, TableGateway};
use crate::models::{Artwork, ArtworkPatch, NewArtwork, Profile};

use super::{valid_row_id, valid_user_id, ARTWORKS, COMMENTS, LIKES};

#[derive(Clone)]
pub struct ArtworkService {
    gateway: Arc<dyn TableGateway>,
    profiles: super::ProfileService,
}

impl ArtworkService {
    pub fn new(gateway: Arc<dyn TableGateway>) -> Self {
        let profiles = super::ProfileService::new(gateway.clone());
        Self { gateway, profiles }
    }

    /// Full feed, newest first.
    pub async fn list(&self) -> Vec<Artwork> {
        self.fetch(SelectQuery::new().order_desc("created_at")).await
    }

    /// One user's works, newest first.
    pub async fn list_by_user(&self, user_id: &str) -> Vec<Artwork> {
        if !valid_user_id(user_id) {
            log::warn!("list_by_user called with a blank user id");
            return Vec::new();
        }
        self.fetch(
            SelectQuery::new()
                .eq("user_id", user_id)
                .order_desc("created_at"),
        )
        .await
    }

    /// Fetch a specific id set, returned in the order given (used for the
    /// favorites join).
    pub async fn by_ids(&self, ids: &[i64]) -> Vec<Artwork> {
        if ids.is_empty() {
            return Vec::new();
        }
        let values = ids.iter().map(|id| Value::from(*id)).collect();
        let mut artworks = self
            .fetch(SelectQuery::new().in_list("id", values))
            .await;

        let position: HashMap<i64, usize> =
            ids.iter().enumerate().map(|(i, id)| (*id, i)).collect();
        artworks.sort_by_key(|a| position.get(&a.id).copied().unwrap_or(usize::MAX));
        artworks
    }

    async fn fetch(&self, query: SelectQuery) -> Vec<Artwork> {
        let rows = match self.gateway.select(ARTWORKS, query).await {
            Ok(rows) => rows,
            Err(e) => {
                log::error!("artwork query failed: {e}");
                return Vec::new();
            }
        };
        self.hydrate(rows).await
    }

    async fn hydrate(&self, rows: Vec<Row>) -> Vec<Artwork> {
        let mut artworks: Vec<Artwork> = rows
            .into_iter()
            .filter_map(|row| match serde_json::from_value(Value::Object(row)) {
                Ok(artwork) => Some(artwork),
                Err(e) => {
                    log::warn!("skipping malformed artwork row: {e}");
                    None
                }
            })
            .collect();
        if artworks.is_empty() {
            return artworks;
        }

        let owner_ids: Vec<String> = artworks.iter().map(|a| a.user_id.clone()).collect();
        let profiles = self.profiles.profiles_by_id(&owner_ids).await;

        let ids: Vec<i64> = artworks.iter().map(|a| a.id).collect();
        let like_counts = self.group_counts(LIKES, "artwork_id", &ids).await;
        let comment_counts = self.group_counts(COMMENTS, "artwork_id", &ids).await;

        for artwork in &mut artworks {
            artwork.profile = profiles
                .get(&artwork.user_id)
                .cloned()
                .unwrap_or_else(|| Profile::placeholder(&artwork.user_id));
            artwork.likes_count = like_counts.get(&artwork.id).copied().unwrap_or(0);
            artwork.comments_count = comment_counts.get(&artwork.id).copied().unwrap_or(0);
        }
        artworks
    }

    /// One batched lookup over a join table, grouped by key in memory.
    /// Failure degrades to zero counts.
    async fn group_counts(&self, table: &str, column: &str, ids: &[i64]) -> HashMap<i64, i64> {
        let values = ids.iter().map(|id| Value::from(*id)).collect();
        let rows = match self
            .gateway
            .select(table, SelectQuery::new().in_list(column, values))
            .await
        {
            Ok(rows) => rows,
            Err(e) => {
                log::warn!("{table} lookup failed, counts default to zero: {e}");
                return HashMap::new();
            }
        };

        let mut counts = HashMap::new();
        for row in rows {
            if let Some(id) = row.get(column).and_then(Value::as_i64) {
                *counts.entry(id).or_insert(0) += 1;
            }
        }
        counts
    }

    pub async fn create(&self, artwork: NewArtwork) -> Option<Artwork> {
        if !valid_user_id(&artwork.user_id) || artwork.title.trim().is_empty() {
            log::error!("refusing to create artwork with blank owner or title");
            return None;
        }

        let mut row = match serde_json::to_value(&artwork) {
            Ok(Value::Object(map)) => map,
            _ => return None,
        };
        row.insert("likes_count".to_string(), Value::from(0));
        row.insert("views_count".to_string(), Value::from(0));
        row.insert("comments_count".to_string(), Value::from(0));

        let stored = match self.gateway.insert(ARTWORKS, row).await {
            Ok(stored) => stored,
            Err(e) => {
                log::error!("artwork insert failed: {e}");
                return None;
            }
        };

        match serde_json::from_value::<Artwork>(Value::Object(stored)) {
            Ok(mut created) => {
                created.profile = self.profiles.get_or_create(&created.user_id).await;
                Some(created)
            }
            Err(e) => {
                log::error!("backend returned malformed artwork row: {e}");
                None
            }
        }
    }

    pub async fn update(&self, id: i64, patch: ArtworkPatch) -> Option<Artwork> {
        if !valid_row_id(id) {
            log::warn!("update called with invalid artwork id {id}");
            return None;
        }

        let mut changes = match serde_json::to_value(&patch) {
            Ok(Value::Object(map)) => map,
            _ => return None,
        };
        changes.insert(
            "updated_at".to_string(),
            Value::from(Utc::now().to_rfc3339()),
        );

        let rows = match self
            .gateway
            .update(ARTWORKS, changes, vec![Filter::Eq("id".to_string(), Value::from(id))])
            .await
        {
            Ok(rows) => rows,
            Err(e) => {
                log::error!("artwork update failed: {e}");
                return None;
            }
        };

        let row = rows.into_iter().next()?;
        match serde_json::from_value::<Artwork>(Value::Object(row)) {
            Ok(mut updated) => {
                updated.profile = self.profiles.get_or_create(&updated.user_id).await;
                Some(updated)
            }
            Err(e) => {
                log::error!("backend returned malformed artwork row: {e}");
                None
            }
        }
    }

    pub async fn delete(&self, id: i64) -> bool {
        if !valid_row_id(id) {
            return false;
        }
        match self
            .gateway
            .delete(ARTWORKS, vec![Filter::Eq("id".to_string(), Value::from(id))])
            .await
        {
            Ok(_) => true,
            Err(e) => {
                log::error!("artwork delete failed: {e}");
                false
            }
        }
    }
}
