//! Favorites (private bookmarks).
//!
//! Favorites share the join-row shape of likes but are only ever read by
//! their owner. The favorites page fetches the id list first, then reuses
//! the artwork hydration path so favorited works carry full profiles and
//! counts, ordered by when they were favorited.

use std::sync::Arc;

use chrono::Utc;
use serde_json::Value;

use crate::gateway::{Filter, SelectQuery, TableGateway};
use crate::models::Artwork;

use super::{valid_row_id, valid_user_id, ArtworkService, FAVORITES};

#[derive(Clone)]
pub struct FavoriteService {
    gateway: Arc<dyn TableGateway>,
    artworks: ArtworkService,
}

impl FavoriteService {
    pub fn new(gateway: Arc<dyn TableGateway>) -> Self {
        let artworks = ArtworkService::new(gateway.clone());
        Self { gateway, artworks }
    }

    pub async fn add(&self, user_id: &str, artwork_id: i64) -> bool {
        if !valid_user_id(user_id) || !valid_row_id(artwork_id) {
            log::warn!("favorite called with invalid identifiers");
            return false;
        }
        let mut row = serde_json::Map::new();
        row.insert("user_id".to_string(), Value::from(user_id));
        row.insert("artwork_id".to_string(), Value::from(artwork_id));
        row.insert("created_at".to_string(), Value::from(Utc::now().to_rfc3339()));

        match self
            .gateway
            .upsert(FAVORITES, row, &["user_id", "artwork_id"], true)
            .await
        {
            Ok(()) => true,
            Err(e) => {
                log::error!("favorite upsert failed: {e}");
                false
            }
        }
    }

    pub async fn remove(&self, user_id: &str, artwork_id: i64) -> bool {
        if !valid_user_id(user_id) || !valid_row_id(artwork_id) {
            return false;
        }
        match self
            .gateway
            .delete(
                FAVORITES,
                vec![
                    Filter::Eq("user_id".to_string(), Value::from(user_id)),
                    Filter::Eq("artwork_id".to_string(), Value::from(artwork_id)),
                ],
            )
            .await
        {
            Ok(_) => true,
            Err(e) => {
                log::error!("favorite delete failed: {e}");
                false
            }
        }
    }

    pub async fn is_favorited(&self, user_id: &str, artwork_id: i64) -> bool {
        if !valid_user_id(user_id) || !valid_row_id(artwork_id) {
            return false;
        }
        let query = SelectQuery::new()
            .eq("user_id", user_id)
            .eq("artwork_id", artwork_id)
            .limit(1);
        match self.gateway.select(FAVORITES, query).await {
            Ok(rows) => !rows.is_empty(),
            Err(e) => {
                log::warn!("favorite membership check failed: {e}");
                false
            }
        }
    }

    pub async fn toggle(&self, user_id: &str, artwork_id: i64) -> bool {
        let favorited = self.is_favorited(user_id, artwork_id).await;
        if favorited {
            !self.remove(user_id, artwork_id).await
        } else {
            self.add(user_id, artwork_id).await
        }
    }

    /// Favorited artwork ids, most recently favorited first.
    pub async fn favorite_ids(&self, user_id: &str) -> Vec<i64> {
        if !valid_user_id(user_id) {
            return Vec::new();
        }
        let query = SelectQuery::new()
            .eq("user_id", user_id)
            .order_desc("created_at");
        let rows = match self.gateway.select(FAVORITES, query).await {
            Ok(rows) => rows,
            Err(e) => {
                log::error!("favorite query failed: {e}");
                return Vec::new();
            }
        };
        rows.iter()
            .filter_map(|row| row.get("artwork_id").and_then(Value::as_i64))
            .collect()
    }

    /// Fully hydrated favorited artworks in favorite order.
    pub async fn favorite_artworks(&self, user_id: &str) -> Vec<Artwork> {
        let ids = self.favorite_ids(user_id).await;
        self.artworks.by_ids(&ids).await
    }
}
