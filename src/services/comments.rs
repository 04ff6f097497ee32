//! Comment threading.
//!
//! A flat `comments` table becomes a two-level tree: top-level comments
//! (no parent, newest first) carry their replies (parented, oldest
//! first). Replies cannot themselves have replies; the view layer only
//! offers the reply affordance on top-level comments, there is no data
//! constraint.

use std::collections::HashMap;
use std::sync::Arc;

use serde_json::Value;

use crate::gateway::{Filter, SelectQuery, TableGateway};
use crate::models::{Comment, CommentRecord, Profile};

use super::{valid_row_id, valid_user_id, COMMENTS, COMMENT_LIKES};

/// Maximum comment length, in characters, after trimming.
pub const MAX_COMMENT_CHARS: usize = 500;

#[derive(Clone)]
pub struct CommentService {
    gateway: Arc<dyn TableGateway>,
    profiles: super::ProfileService,
}

impl CommentService {
    pub fn new(gateway: Arc<dyn TableGateway>) -> Self {
        let profiles = super::ProfileService::new(gateway.clone());
        Self { gateway, profiles }
    }

    /// All comments for an artwork as a two-level thread.
    pub async fn list_for_artwork(&self, artwork_id: i64) -> Vec<Comment> {
        if !valid_row_id(artwork_id) {
            log::warn!("comment fetch called with invalid artwork id {artwork_id}");
            return Vec::new();
        }

        let top_level = match self.fetch_records(
            SelectQuery::new()
                .eq("artwork_id", artwork_id)
                .is_null("parent_id")
                .order_desc("created_at"),
        ).await {
            Ok(records) => records,
            Err(e) => {
                log::error!("comment query failed: {e}");
                return Vec::new();
            }
        };
        if top_level.is_empty() {
            return Vec::new();
        }

        // Replies are fetched separately; losing them degrades the thread
        // to top-level comments only.
        let replies = match self.fetch_records(
            SelectQuery::new()
                .eq("artwork_id", artwork_id)
                .not_null("parent_id")
                .order_asc("created_at"),
        ).await {
            Ok(records) => records,
            Err(e) => {
                log::warn!("reply query failed, returning top-level comments only: {e}");
                Vec::new()
            }
        };

        let user_ids: Vec<String> = top_level
            .iter()
            .chain(replies.iter())
            .map(|record| record.user_id.clone())
            .collect();
        let profiles = self.profiles.profiles_by_id(&user_ids).await;

        let comment_ids: Vec<i64> = top_level
            .iter()
            .chain(replies.iter())
            .map(|record| record.id)
            .collect();
        let like_counts = self.like_counts(&comment_ids).await;

        let mut grouped: HashMap<i64, Vec<Comment>> = HashMap::new();
        for reply in replies {
            let parent = match reply.parent_id {
                Some(parent) => parent,
                None => continue,
            };
            let view = Self::to_view(reply, &profiles, &like_counts);
            grouped.entry(parent).or_default().push(view);
        }

        top_level
            .into_iter()
            .map(|record| {
                let replies = grouped.remove(&record.id).unwrap_or_default();
                let mut view = Self::to_view(record, &profiles, &like_counts);
                view.replies = replies;
                view
            })
            .collect()
    }

    /// Replies to a single comment, oldest first.
    pub async fn replies(&self, comment_id: i64) -> Vec<Comment> {
        if !valid_row_id(comment_id) {
            return Vec::new();
        }
        let records = match self.fetch_records(
            SelectQuery::new()
                .eq("parent_id", comment_id)
                .order_asc("created_at"),
        ).await {
            Ok(records) => records,
            Err(e) => {
                log::error!("reply query failed: {e}");
                return Vec::new();
            }
        };
        if records.is_empty() {
            return Vec::new();
        }

        let user_ids: Vec<String> = records.iter().map(|r| r.user_id.clone()).collect();
        let profiles = self.profiles.profiles_by_id(&user_ids).await;
        let ids: Vec<i64> = records.iter().map(|r| r.id).collect();
        let like_counts = self.like_counts(&ids).await;

        records
            .into_iter()
            .map(|record| Self::to_view(record, &profiles, &like_counts))
            .collect()
    }

    /// Create a comment or a reply. Content is validated before any
    /// network call; the author is hydrated (creating a placeholder
    /// profile if needed) so the caller can render immediately.
    pub async fn create(
        &self,
        artwork_id: i64,
        user_id: &str,
        content: &str,
        parent_id: Option<i64>,
    ) -> Option<Comment> {
        if !valid_row_id(artwork_id) || !valid_user_id(user_id) {
            log::error!("comment create called with invalid identifiers");
            return None;
        }
        let content = content.trim();
        if content.is_empty() {
            log::error!("comment content must not be empty");
            return None;
        }
        if content.chars().count() > MAX_COMMENT_CHARS {
            log::error!("comment content exceeds {MAX_COMMENT_CHARS} characters");
            return None;
        }
        if let Some(parent) = parent_id {
            if !valid_row_id(parent) {
                log::error!("comment create called with invalid parent id {parent}");
                return None;
            }
        }

        let mut row = serde_json::Map::new();
        row.insert("artwork_id".to_string(), Value::from(artwork_id));
        row.insert("user_id".to_string(), Value::from(user_id));
        row.insert("content".to_string(), Value::from(content));
        row.insert(
            "parent_id".to_string(),
            parent_id.map(Value::from).unwrap_or(Value::Null),
        );
        row.insert("likes_count".to_string(), Value::from(0));

        let stored = match self.gateway.insert(COMMENTS, row).await {
            Ok(stored) => stored,
            Err(e) => {
                log::error!("comment insert failed: {e}");
                return None;
            }
        };
        let record: CommentRecord = match serde_json::from_value(Value::Object(stored)) {
            Ok(record) => record,
            Err(e) => {
                log::error!("backend returned malformed comment row: {e}");
                return None;
            }
        };

        let author = self.profiles.get_or_create(user_id).await;
        Some(Comment {
            id: record.id,
            content: record.content,
            author: author.display().to_string(),
            avatar: author.avatar_url.clone(),
            created_at: record.created_at,
            likes: 0,
            liked: false,
            parent_id: record.parent_id,
            replies: Vec::new(),
        })
    }

    pub async fn update(&self, comment_id: i64, content: &str) -> Option<Comment> {
        if !valid_row_id(comment_id) {
            return None;
        }
        let content = content.trim();
        if content.is_empty() || content.chars().count() > MAX_COMMENT_CHARS {
            log::error!("rejecting comment update with invalid content");
            return None;
        }

        let mut changes = serde_json::Map::new();
        changes.insert("content".to_string(), Value::from(content));
        changes.insert(
            "updated_at".to_string(),
            Value::from(chrono::Utc::now().to_rfc3339()),
        );

        let rows = match self
            .gateway
            .update(
                COMMENTS,
                changes,
                vec![Filter::Eq("id".to_string(), Value::from(comment_id))],
            )
            .await
        {
            Ok(rows) => rows,
            Err(e) => {
                log::error!("comment update failed: {e}");
                return None;
            }
        };
        let record: CommentRecord =
            match serde_json::from_value(Value::Object(rows.into_iter().next()?)) {
                Ok(record) => record,
                Err(e) => {
                    log::error!("backend returned malformed comment row: {e}");
                    return None;
                }
            };

        let author = self.profiles.get_or_create(&record.user_id).await;
        let likes = self.like_counts(&[record.id]).await;
        Some(Comment {
            id: record.id,
            content: record.content,
            author: author.display().to_string(),
            avatar: author.avatar_url.clone(),
            created_at: record.created_at,
            likes: likes.get(&record.id).copied().unwrap_or(0),
            liked: false,
            parent_id: record.parent_id,
            replies: Vec::new(),
        })
    }

    pub async fn delete(&self, comment_id: i64) -> bool {
        if !valid_row_id(comment_id) {
            return false;
        }
        match self
            .gateway
            .delete(
                COMMENTS,
                vec![Filter::Eq("id".to_string(), Value::from(comment_id))],
            )
            .await
        {
            Ok(_) => true,
            Err(e) => {
                log::error!("comment delete failed: {e}");
                false
            }
        }
    }

    async fn fetch_records(
        &self,
        query: SelectQuery,
    ) -> Result<Vec<CommentRecord>, crate::gateway::GatewayError> {
        let rows = self.gateway.select(COMMENTS, query).await?;
        Ok(rows
            .into_iter()
            .filter_map(|row| match serde_json::from_value(Value::Object(row)) {
                Ok(record) => Some(record),
                Err(e) => {
                    log::warn!("skipping malformed comment row: {e}");
                    None
                }
            })
            .collect())
    }

    /// Like counts are recomputed from `comment_likes` on every read; the
    /// stored counter column is only a cache.
    async fn like_counts(&self, comment_ids: &[i64]) -> HashMap<i64, i64> {
        if comment_ids.is_empty() {
            return HashMap::new();
        }
        let values = comment_ids.iter().map(|id| Value::from(*id)).collect();
        let rows = match self
            .gateway
            .select(
                COMMENT_LIKES,
                SelectQuery::new().in_list("comment_id", values),
            )
            .await
        {
            Ok(rows) => rows,
            Err(e) => {
                log::warn!("comment like lookup failed, counts default to zero: {e}");
                return HashMap::new();
            }
        };

        let mut counts = HashMap::new();
        for row in rows {
            if let Some(id) = row.get("comment_id").and_then(Value::as_i64) {
                *counts.entry(id).or_insert(0) += 1;
            }
        }
        counts
    }

    fn to_view(
        record: CommentRecord,
        profiles: &HashMap<String, Profile>,
        like_counts: &HashMap<i64, i64>,
    ) -> Comment {
        let author = profiles
            .get(&record.user_id)
            .cloned()
            .unwrap_or_else(|| Profile::placeholder(&record.user_id));
        Comment {
            id: record.id,
            content: record.content,
            author: author.display().to_string(),
            avatar: author.avatar_url,
            created_at: record.created_at,
            likes: like_counts.get(&record.id).copied().unwrap_or(0),
            liked: false,
            parent_id: record.parent_id,
            replies: Vec::new(),
        }
    }
}
