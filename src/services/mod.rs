//! Gallery services: entity fetchers with client-side hydration and
//! idempotent interaction toggles.
//!
//! Error policy (uniform across services): fetches never propagate errors
//! to the caller — they log and return an empty/default value; mutations
//! return a success flag that the UI uses to roll back optimistic state.

pub mod artworks;
pub mod comments;
pub mod creators;
pub mod favorites;
pub mod follows;
pub mod likes;
pub mod profiles;

pub use artworks::ArtworkService;
pub use comments::CommentService;
pub use creators::CreatorService;
pub use favorites::FavoriteService;
pub use follows::FollowService;
pub use likes::LikeService;
pub use profiles::ProfileService;

pub(crate) const ARTWORKS: &str = "artworks";
pub(crate) const PROFILES: &str = "profiles";
pub(crate) const COMMENTS: &str = "comments";
pub(crate) const LIKES: &str = "likes";
pub(crate) const COMMENT_LIKES: &str = "comment_likes";
pub(crate) const FAVORITES: &str = "user_favorites";
pub(crate) const FOLLOWS: &str = "follows";

/// Identifier validation happens before any network round trip.
pub(crate) fn valid_user_id(id: &str) -> bool {
    !id.trim().is_empty()
}

pub(crate) fn valid_row_id(id: i64) -> bool {
    id > 0
}
