use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Public display info for a creator, hydrated onto artworks and comments.
/// All display fields are optional; [`Profile::placeholder`] synthesizes a
/// deterministic stand-in when no profile row exists yet.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Profile {
    pub id: String,
    pub username: Option<String>,
    pub display_name: Option<String>,
    pub avatar_url: Option<String>,
}

impl Profile {
    /// Deterministic default profile for a user with no persisted row.
    pub fn placeholder(user_id: &str) -> Self {
        let prefix: String = user_id.chars().take(8).collect();
        let name = format!("artist-{prefix}");
        Self {
            id: user_id.to_string(),
            username: Some(name.clone()),
            display_name: Some(name),
            avatar_url: None,
        }
    }

    pub fn display(&self) -> &str {
        self.username
            .as_deref()
            .or(self.display_name.as_deref())
            .unwrap_or("anonymous")
    }
}

/// One image in a multi-image artwork.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ArtworkImage {
    #[serde(default)]
    pub id: Option<String>,
    pub url: String,
    #[serde(default)]
    pub alt: Option<String>,
    #[serde(default)]
    pub width: Option<u32>,
    #[serde(default)]
    pub height: Option<u32>,
    #[serde(default)]
    pub order: Option<i32>,
}

/// An uploaded artwork as stored in the `artworks` table, decorated with
/// the owner's profile after hydration.
///
/// The `*_count` columns are cache values, never authoritative; fetchers
/// recompute likes and comments from the join tables on every read.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Artwork {
    pub id: i64,
    pub title: String,
    pub prompt: String,
    #[serde(default)]
    pub description: Option<String>,
    pub image_url: String,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub images: Vec<ArtworkImage>,
    #[serde(default)]
    pub tags: Option<Vec<String>>,
    // Generation metadata; free-form because AI tools vary.
    #[serde(default)]
    pub model: Option<String>,
    #[serde(default)]
    pub steps: Option<i64>,
    #[serde(default)]
    pub cfg_scale: Option<f64>,
    #[serde(default)]
    pub sampler: Option<String>,
    #[serde(default)]
    pub seed: Option<i64>,
    pub user_id: String,
    #[serde(default)]
    pub likes_count: i64,
    #[serde(default)]
    pub views_count: i64,
    #[serde(default)]
    pub comments_count: i64,
    pub created_at: DateTime<Utc>,
    /// Hydrated owner info; a placeholder when no profile row exists.
    #[serde(default)]
    pub profile: Profile,
}

/// Fields supplied when uploading a new artwork. Counters start at zero
/// and `id`/`created_at` come from the backend.
#[derive(Debug, Clone, Serialize)]
pub struct NewArtwork {
    pub title: String,
    pub prompt: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    pub image_url: String,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub images: Vec<ArtworkImage>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub tags: Option<Vec<String>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub model: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub steps: Option<i64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub cfg_scale: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub sampler: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub seed: Option<i64>,
    pub user_id: String,
}

impl NewArtwork {
    pub fn new(user_id: &str, title: &str, prompt: &str, image_url: &str) -> Self {
        Self {
            title: title.to_string(),
            prompt: prompt.to_string(),
            description: None,
            image_url: image_url.to_string(),
            images: Vec::new(),
            tags: None,
            model: None,
            steps: None,
            cfg_scale: None,
            sampler: None,
            seed: None,
            user_id: user_id.to_string(),
        }
    }
}

/// Partial update for an artwork; unset fields are left untouched.
#[derive(Debug, Clone, Default, Serialize)]
pub struct ArtworkPatch {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub prompt: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub image_url: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub tags: Option<Vec<String>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub model: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub steps: Option<i64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub cfg_scale: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub sampler: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub seed: Option<i64>,
}

/// Raw comment row from the `comments` table.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CommentRecord {
    pub id: i64,
    pub artwork_id: i64,
    pub user_id: String,
    #[serde(default)]
    pub parent_id: Option<i64>,
    pub content: String,
    #[serde(default)]
    pub likes_count: i64,
    pub created_at: DateTime<Utc>,
}

/// Hydrated comment as rendered in a thread: author resolved, like count
/// recomputed, replies attached (one level only).
#[derive(Debug, Clone, Serialize)]
pub struct Comment {
    pub id: i64,
    pub content: String,
    pub author: String,
    pub avatar: Option<String>,
    pub created_at: DateTime<Utc>,
    pub likes: i64,
    pub liked: bool,
    pub parent_id: Option<i64>,
    pub replies: Vec<Comment>,
}

/// Raw follow edge from the `follows` table.
#[derive(Debug, Clone, Deserialize)]
pub struct FollowRecord {
    pub follower_id: String,
    pub following_id: String,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct FollowStats {
    pub followers: u64,
    pub following: u64,
}

/// One entry in a followers/following list.
#[derive(Debug, Clone, Serialize)]
pub struct FollowedProfile {
    pub profile: Profile,
    pub followers_count: u64,
    pub followed_at: DateTime<Utc>,
}

/// Aggregate used by the popular-creators ranking.
#[derive(Debug, Clone, Serialize)]
pub struct Creator {
    pub id: String,
    pub profile: Profile,
    pub works_count: u64,
    pub likes_count: i64,
    /// Up to eight most recent works kept as a preview.
    pub artworks: Vec<Artwork>,
}
