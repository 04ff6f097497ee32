//! Popular-creators ranking.
//!
//! Derived entirely from the hydrated feed: group artworks by owner,
//! keep creators with at least two works, rank by accumulated likes.
//! No dedicated backend table exists for this.

use std::collections::HashMap;

use crate::models::Creator;

use super::ArtworkService;

/// A creator needs this many published works to be ranked.
pub const MIN_WORKS: u64 = 2;
/// Ranking size cap.
pub const MAX_CREATORS: usize = 20;
/// Most recent works kept per creator as a preview strip.
pub const PREVIEW_LIMIT: usize = 8;

#[derive(Clone)]
pub struct CreatorService {
    artworks: ArtworkService,
}

impl CreatorService {
    pub fn new(artworks: ArtworkService) -> Self {
        Self { artworks }
    }

    /// Top creators by total likes across their works. The feed is newest
    /// first, so the first works seen per creator are the preview strip.
    pub async fn popular(&self) -> Vec<Creator> {
        let feed = self.artworks.list().await;
        if feed.is_empty() {
            return Vec::new();
        }

        let mut by_owner: HashMap<String, Creator> = HashMap::new();
        for artwork in feed {
            let entry = by_owner
                .entry(artwork.user_id.clone())
                .or_insert_with(|| Creator {
                    id: artwork.user_id.clone(),
                    profile: artwork.profile.clone(),
                    works_count: 0,
                    likes_count: 0,
                    artworks: Vec::new(),
                });
            entry.works_count += 1;
            entry.likes_count += artwork.likes_count;
            if entry.artworks.len() < PREVIEW_LIMIT {
                entry.artworks.push(artwork);
            }
        }

        let mut creators: Vec<Creator> = by_owner
            .into_values()
            .filter(|creator| creator.works_count >= MIN_WORKS)
            .collect();
        creators.sort_by(|a, b| b.likes_count.cmp(&a.likes_count));
        creators.truncate(MAX_CREATORS);
        creators
    }
}
