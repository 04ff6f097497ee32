//! Follow graph.
//!
//! Follows are directed edges in a single `follows` table, unique per
//! (follower, followee) pair. Self-follows are rejected before any
//! network call, and list fetchers hydrate profiles and follower counts
//! with one batched lookup each.

use std::collections::{HashMap, HashSet};
use std::sync::Arc;

use chrono::Utc;
use serde_json::Value;

use crate::gateway::{Filter, SelectQuery, TableGateway};
use crate::models::{FollowRecord, FollowStats, FollowedProfile, Profile};

use super::{valid_user_id, FOLLOWS};

#[derive(Clone)]
pub struct FollowService {
    gateway: Arc<dyn TableGateway>,
    profiles: super::ProfileService,
}

impl FollowService {
    pub fn new(gateway: Arc<dyn TableGateway>) -> Self {
        let profiles = super::ProfileService::new(gateway.clone());
        Self { gateway, profiles }
    }

    pub async fn follow(&self, follower_id: &str, following_id: &str) -> bool {
        if !valid_user_id(follower_id) || !valid_user_id(following_id) {
            log::warn!("follow called with blank identifiers");
            return false;
        }
        if follower_id == following_id {
            log::warn!("rejecting self-follow for {follower_id}");
            return false;
        }

        let mut row = serde_json::Map::new();
        row.insert("follower_id".to_string(), Value::from(follower_id));
        row.insert("following_id".to_string(), Value::from(following_id));
        row.insert("created_at".to_string(), Value::from(Utc::now().to_rfc3339()));

        match self
            .gateway
            .upsert(FOLLOWS, row, &["follower_id", "following_id"], true)
            .await
        {
            Ok(()) => true,
            Err(e) => {
                log::error!("follow upsert failed: {e}");
                false
            }
        }
    }

    pub async fn unfollow(&self, follower_id: &str, following_id: &str) -> bool {
        if !valid_user_id(follower_id) || !valid_user_id(following_id) {
            return false;
        }
        match self
            .gateway
            .delete(
                FOLLOWS,
                vec![
                    Filter::Eq("follower_id".to_string(), Value::from(follower_id)),
                    Filter::Eq("following_id".to_string(), Value::from(following_id)),
                ],
            )
            .await
        {
            Ok(_) => true,
            Err(e) => {
                log::error!("unfollow delete failed: {e}");
                false
            }
        }
    }

    /// Edge check. A self-pair or blank id is never following, with no
    /// backend round trip.
    pub async fn is_following(&self, follower_id: &str, following_id: &str) -> bool {
        if !valid_user_id(follower_id) || !valid_user_id(following_id) {
            return false;
        }
        if follower_id == following_id {
            return false;
        }
        let query = SelectQuery::new()
            .eq("follower_id", follower_id)
            .eq("following_id", following_id)
            .limit(1);
        match self.gateway.select(FOLLOWS, query).await {
            Ok(rows) => !rows.is_empty(),
            Err(e) => {
                log::warn!("follow check failed: {e}");
                false
            }
        }
    }

    /// Follower/following totals for a profile page. Errors degrade to
    /// zero rather than failing the page.
    pub async fn stats(&self, user_id: &str) -> FollowStats {
        if !valid_user_id(user_id) {
            return FollowStats::default();
        }
        let followers = self
            .count(vec![Filter::Eq(
                "following_id".to_string(),
                Value::from(user_id),
            )])
            .await;
        let following = self
            .count(vec![Filter::Eq(
                "follower_id".to_string(),
                Value::from(user_id),
            )])
            .await;
        FollowStats {
            followers,
            following,
        }
    }

    /// Users who follow `user_id`, most recent first.
    pub async fn followers(&self, user_id: &str) -> Vec<FollowedProfile> {
        let edges = self
            .edges(SelectQuery::new().eq("following_id", user_id).order_desc("created_at"))
            .await;
        self.hydrate_edges(edges, |edge| edge.follower_id.clone()).await
    }

    /// Users `user_id` follows, most recent first.
    pub async fn following(&self, user_id: &str) -> Vec<FollowedProfile> {
        let edges = self
            .edges(SelectQuery::new().eq("follower_id", user_id).order_desc("created_at"))
            .await;
        self.hydrate_edges(edges, |edge| edge.following_id.clone()).await
    }

    /// Which of `candidate_ids` the viewer follows, answered with a single
    /// batched lookup. Missing keys mean not-following.
    pub async fn following_map(
        &self,
        follower_id: &str,
        candidate_ids: &[String],
    ) -> HashMap<String, bool> {
        let mut map: HashMap<String, bool> = candidate_ids
            .iter()
            .filter(|id| valid_user_id(id))
            .map(|id| (id.clone(), false))
            .collect();
        if !valid_user_id(follower_id) || map.is_empty() {
            return map;
        }

        let values = map.keys().map(|id| Value::from(id.as_str())).collect();
        let query = SelectQuery::new()
            .eq("follower_id", follower_id)
            .in_list("following_id", values);
        let rows = match self.gateway.select(FOLLOWS, query).await {
            Ok(rows) => rows,
            Err(e) => {
                log::warn!("follow map lookup failed: {e}");
                return map;
            }
        };
        for row in rows {
            if let Some(id) = row.get("following_id").and_then(Value::as_str) {
                if let Some(entry) = map.get_mut(id) {
                    *entry = true;
                }
            }
        }
        map
    }

    async fn count(&self, filters: Vec<Filter>) -> u64 {
        match self.gateway.count(FOLLOWS, filters).await {
            Ok(count) => count,
            Err(e) => {
                log::warn!("follow count failed, defaulting to zero: {e}");
                0
            }
        }
    }

    async fn edges(&self, query: SelectQuery) -> Vec<FollowRecord> {
        let rows = match self.gateway.select(FOLLOWS, query).await {
            Ok(rows) => rows,
            Err(e) => {
                log::error!("follow query failed: {e}");
                return Vec::new();
            }
        };
        rows.into_iter()
            .filter_map(|row| match serde_json::from_value(Value::Object(row)) {
                Ok(record) => Some(record),
                Err(e) => {
                    log::warn!("skipping malformed follow row: {e}");
                    None
                }
            })
            .collect()
    }

    /// Turn follow edges into list entries: batched profile lookup for the
    /// side of each edge `pick` selects, plus one batched follower-count
    /// lookup across all of them.
    async fn hydrate_edges<P>(&self, edges: Vec<FollowRecord>, pick: P) -> Vec<FollowedProfile>
    where
        P: Fn(&FollowRecord) -> String,
    {
        if edges.is_empty() {
            return Vec::new();
        }
        let ids: Vec<String> = edges.iter().map(&pick).collect();
        let profiles = self.profiles.profiles_by_id(&ids).await;
        let follower_counts = self.follower_counts(&ids).await;

        edges
            .into_iter()
            .map(|edge| {
                let id = pick(&edge);
                let profile = profiles
                    .get(&id)
                    .cloned()
                    .unwrap_or_else(|| Profile::placeholder(&id));
                FollowedProfile {
                    followers_count: follower_counts.get(&id).copied().unwrap_or(0),
                    followed_at: edge.created_at,
                    profile,
                }
            })
            .collect()
    }

    /// Follower counts for a set of users with one batched edge fetch.
    async fn follower_counts(&self, user_ids: &[String]) -> HashMap<String, u64> {
        let unique: HashSet<&String> = user_ids.iter().collect();
        let values = unique.iter().map(|id| Value::from(id.as_str())).collect();
        let rows = match self
            .gateway
            .select(FOLLOWS, SelectQuery::new().in_list("following_id", values))
            .await
        {
            Ok(rows) => rows,
            Err(e) => {
                log::warn!("follower count lookup failed: {e}");
                return HashMap::new();
            }
        };

        let mut counts = HashMap::new();
        for row in rows {
            if let Some(id) = row.get("following_id").and_then(Value::as_str) {
                *counts.entry(id.to_string()).or_insert(0) += 1;
            }
        }
        counts
    }
}
