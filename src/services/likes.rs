//! Like toggles for artworks and comments.
//!
//! Likes are join rows with a uniqueness constraint on the (user, target)
//! pair. Liking goes through an ignore-duplicates upsert so repeating a
//! like is a no-op rather than an error; unliking deletes by the same
//! pair and succeeds even when no row matched.

use std::sync::Arc;

use chrono::Utc;
use serde_json::Value;

use crate::gateway::{Filter, SelectQuery, TableGateway};

use super::{valid_row_id, valid_user_id, COMMENT_LIKES, LIKES};

#[derive(Clone)]
pub struct LikeService {
    gateway: Arc<dyn TableGateway>,
}

impl LikeService {
    pub fn new(gateway: Arc<dyn TableGateway>) -> Self {
        Self { gateway }
    }

    // ==== Artwork likes ====

    pub async fn like_artwork(&self, user_id: &str, artwork_id: i64) -> bool {
        self.like(LIKES, "artwork_id", user_id, artwork_id).await
    }

    pub async fn unlike_artwork(&self, user_id: &str, artwork_id: i64) -> bool {
        self.unlike(LIKES, "artwork_id", user_id, artwork_id).await
    }

    /// Whether `user_id` has liked the artwork. Invalid ids short-circuit
    /// to false without a network call.
    pub async fn artwork_liked(&self, user_id: &str, artwork_id: i64) -> bool {
        self.liked(LIKES, "artwork_id", user_id, artwork_id).await
    }

    pub async fn artwork_like_count(&self, artwork_id: i64) -> u64 {
        self.count(LIKES, "artwork_id", artwork_id).await
    }

    /// Flip the like state: returns the new state, or the original state
    /// when the write failed.
    pub async fn toggle_artwork_like(&self, user_id: &str, artwork_id: i64) -> bool {
        let liked = self.artwork_liked(user_id, artwork_id).await;
        if liked {
            !self.unlike_artwork(user_id, artwork_id).await
        } else {
            self.like_artwork(user_id, artwork_id).await
        }
    }

    // ==== Comment likes ====

    pub async fn like_comment(&self, user_id: &str, comment_id: i64) -> bool {
        self.like(COMMENT_LIKES, "comment_id", user_id, comment_id).await
    }

    pub async fn unlike_comment(&self, user_id: &str, comment_id: i64) -> bool {
        self.unlike(COMMENT_LIKES, "comment_id", user_id, comment_id).await
    }

    pub async fn comment_liked(&self, user_id: &str, comment_id: i64) -> bool {
        self.liked(COMMENT_LIKES, "comment_id", user_id, comment_id).await
    }

    pub async fn comment_like_count(&self, comment_id: i64) -> u64 {
        self.count(COMMENT_LIKES, "comment_id", comment_id).await
    }

    pub async fn toggle_comment_like(&self, user_id: &str, comment_id: i64) -> bool {
        let liked = self.comment_liked(user_id, comment_id).await;
        if liked {
            !self.unlike_comment(user_id, comment_id).await
        } else {
            self.like_comment(user_id, comment_id).await
        }
    }

    // ==== Shared plumbing ====

    async fn like(&self, table: &str, column: &str, user_id: &str, target_id: i64) -> bool {
        if !valid_user_id(user_id) || !valid_row_id(target_id) {
            log::warn!("like called with invalid identifiers");
            return false;
        }
        let mut row = serde_json::Map::new();
        row.insert("user_id".to_string(), Value::from(user_id));
        row.insert(column.to_string(), Value::from(target_id));
        row.insert("created_at".to_string(), Value::from(Utc::now().to_rfc3339()));

        match self
            .gateway
            .upsert(table, row, &["user_id", column], true)
            .await
        {
            Ok(()) => true,
            Err(e) => {
                log::error!("{table} upsert failed: {e}");
                false
            }
        }
    }

    async fn unlike(&self, table: &str, column: &str, user_id: &str, target_id: i64) -> bool {
        if !valid_user_id(user_id) || !valid_row_id(target_id) {
            return false;
        }
        match self
            .gateway
            .delete(
                table,
                vec![
                    Filter::Eq("user_id".to_string(), Value::from(user_id)),
                    Filter::Eq(column.to_string(), Value::from(target_id)),
                ],
            )
            .await
        {
            Ok(_) => true,
            Err(e) => {
                log::error!("{table} delete failed: {e}");
                false
            }
        }
    }

    async fn liked(&self, table: &str, column: &str, user_id: &str, target_id: i64) -> bool {
        if !valid_user_id(user_id) || !valid_row_id(target_id) {
            return false;
        }
        let query = SelectQuery::new()
            .eq("user_id", user_id)
            .eq(column, target_id)
            .limit(1);
        match self.gateway.select(table, query).await {
            Ok(rows) => !rows.is_empty(),
            Err(e) => {
                log::warn!("{table} membership check failed: {e}");
                false
            }
        }
    }

    async fn count(&self, table: &str, column: &str, target_id: i64) -> u64 {
        if !valid_row_id(target_id) {
            return 0;
        }
        match self
            .gateway
            .count(
                table,
                vec![Filter::Eq(column.to_string(), Value::from(target_id))],
            )
            .await
        {
            Ok(count) => count,
            Err(e) => {
                log::warn!("{table} count failed, defaulting to zero: {e}");
                0
            }
        }
    }
}
