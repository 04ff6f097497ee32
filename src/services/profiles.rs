//! Batched profile hydration.
//!
//! Profiles are created lazily: a user can act (upload, comment, like)
//! before any profile row exists. Fetchers substitute a deterministic
//! placeholder for the missing row and persist it in the background
//! without blocking the triggering action.

use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use serde_json::Value;

use crate::gateway::{SelectQuery, TableGateway};
use crate::models::Profile;

use super::{valid_user_id, PROFILES};

#[derive(Clone)]
pub struct ProfileService {
    gateway: Arc<dyn TableGateway>,
}

impl ProfileService {
    pub fn new(gateway: Arc<dyn TableGateway>) -> Self {
        Self { gateway }
    }

    /// One batched lookup for a set of user ids. Every requested id is
    /// present in the result: misses map to a placeholder, and the missing
    /// rows are persisted fire-and-forget.
    pub async fn profiles_by_id(&self, user_ids: &[String]) -> HashMap<String, Profile> {
        let mut unique: Vec<String> = Vec::new();
        for id in user_ids {
            if valid_user_id(id) && !unique.contains(id) {
                unique.push(id.clone());
            }
        }

        let mut found = HashMap::new();
        if unique.is_empty() {
            return found;
        }

        let query = SelectQuery::new().in_list(
            "id",
            unique.iter().map(|id| Value::from(id.as_str())).collect(),
        );
        let rows = match self.gateway.select(PROFILES, query).await {
            Ok(rows) => rows,
            Err(e) => {
                log::warn!("profile lookup failed, using placeholders: {e}");
                Vec::new()
            }
        };

        for row in rows {
            match serde_json::from_value::<Profile>(Value::Object(row)) {
                Ok(profile) => {
                    found.insert(profile.id.clone(), profile);
                }
                Err(e) => log::warn!("skipping malformed profile row: {e}"),
            }
        }

        for id in unique {
            if !found.contains_key(&id) {
                let placeholder = Profile::placeholder(&id);
                self.persist_in_background(placeholder.clone());
                found.insert(id, placeholder);
            }
        }
        found
    }

    /// Fetch a single profile, synthesizing (and persisting) a placeholder
    /// when none exists. Never returns a missing profile.
    pub async fn get_or_create(&self, user_id: &str) -> Profile {
        if !valid_user_id(user_id) {
            return Profile::default();
        }
        self.profiles_by_id(std::slice::from_ref(&user_id.to_string()))
            .await
            .remove(user_id)
            .unwrap_or_else(|| Profile::placeholder(user_id))
    }

    /// Best-effort upsert of a placeholder row. Ignore-duplicates so a real
    /// profile written concurrently is never clobbered.
    fn persist_in_background(&self, profile: Profile) {
        let gateway = self.gateway.clone();
        tokio::spawn(async move {
            let row = match serde_json::to_value(&profile) {
                Ok(Value::Object(map)) => map,
                _ => return,
            };
            let outcome = crate::retry::with_retries(2, Duration::from_millis(200), || {
                gateway.upsert(PROFILES, row.clone(), &["id"], true)
            })
            .await;
            if let Err(e) = outcome {
                log::warn!("placeholder profile for {} not persisted: {e}", profile.id);
            }
        });
    }
}
