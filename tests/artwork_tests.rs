use std::sync::Arc;

use serde_json::json;

use ai_gallery::gateway::{Filter, MemoryGateway, SelectQuery, TableGateway};
use ai_gallery::models::{ArtworkPatch, NewArtwork};
use ai_gallery::services::ArtworkService;

async fn seed_artwork(gateway: &MemoryGateway, user_id: &str, title: &str) -> i64 {
    let row = match json!({
        "title": title,
        "prompt": "a prompt",
        "image_url": "https://img.test/a.png",
        "user_id": user_id,
        "likes_count": 0,
        "views_count": 0,
        "comments_count": 0,
    }) {
        serde_json::Value::Object(map) => map,
        _ => unreachable!(),
    };
    let stored = gateway.insert("artworks", row).await.unwrap();
    stored.get("id").and_then(serde_json::Value::as_i64).unwrap()
}

async fn seed_profile(gateway: &MemoryGateway, user_id: &str, username: &str) {
    let row = match json!({
        "id": user_id,
        "username": username,
        "display_name": username,
        "avatar_url": null,
    }) {
        serde_json::Value::Object(map) => map,
        _ => unreachable!(),
    };
    gateway.insert("profiles", row).await.unwrap();
}

async fn seed_like(gateway: &MemoryGateway, user_id: &str, artwork_id: i64) {
    let row = match json!({"user_id": user_id, "artwork_id": artwork_id}) {
        serde_json::Value::Object(map) => map,
        _ => unreachable!(),
    };
    gateway.insert("likes", row).await.unwrap();
}

#[tokio::test]
async fn test_feed_hydrates_profiles_and_counts() {
    let gateway = Arc::new(MemoryGateway::with_gallery_schema());
    seed_profile(&gateway, "alice", "alice-art").await;
    let id = seed_artwork(&gateway, "alice", "Dawn").await;
    seed_like(&gateway, "bob", id).await;
    seed_like(&gateway, "carol", id).await;

    let service = ArtworkService::new(gateway.clone());
    let feed = service.list().await;

    assert_eq!(feed.len(), 1);
    assert_eq!(feed[0].title, "Dawn");
    assert_eq!(feed[0].profile.username.as_deref(), Some("alice-art"));
    assert_eq!(feed[0].likes_count, 2);
    assert_eq!(feed[0].comments_count, 0);
}

#[tokio::test]
async fn test_counts_are_recomputed_not_read_from_columns() {
    let gateway = Arc::new(MemoryGateway::with_gallery_schema());
    let id = seed_artwork(&gateway, "alice", "Dawn").await;

    // Corrupt the cached counter; the fetcher must ignore it.
    let mut changes = serde_json::Map::new();
    changes.insert("likes_count".to_string(), json!(999));
    gateway
        .update(
            "artworks",
            changes,
            vec![Filter::Eq("id".to_string(), json!(id))],
        )
        .await
        .unwrap();
    seed_like(&gateway, "bob", id).await;

    let service = ArtworkService::new(gateway.clone());
    let feed = service.list().await;
    assert_eq!(feed[0].likes_count, 1);
}

#[tokio::test]
async fn test_missing_profile_becomes_placeholder_and_is_persisted() {
    let gateway = Arc::new(MemoryGateway::with_gallery_schema());
    seed_artwork(&gateway, "user-without-profile", "Dusk").await;

    let service = ArtworkService::new(gateway.clone());
    let feed = service.list().await;

    assert_eq!(
        feed[0].profile.username.as_deref(),
        Some("artist-user-wit")
    );

    // The placeholder write is fire-and-forget on a spawned task.
    tokio::time::sleep(std::time::Duration::from_millis(50)).await;
    let rows = gateway
        .select(
            "profiles",
            SelectQuery::new().eq("id", "user-without-profile"),
        )
        .await
        .unwrap();
    assert_eq!(rows.len(), 1);
}

#[tokio::test]
async fn test_primary_failure_returns_empty_feed() {
    let gateway = Arc::new(MemoryGateway::with_gallery_schema());
    seed_artwork(&gateway, "alice", "Dawn").await;
    gateway.set_failing("artworks", true);

    let service = ArtworkService::new(gateway.clone());
    assert!(service.list().await.is_empty());
}

#[tokio::test]
async fn test_auxiliary_failure_degrades_to_placeholders() {
    let gateway = Arc::new(MemoryGateway::with_gallery_schema());
    seed_profile(&gateway, "alice", "alice-art").await;
    let id = seed_artwork(&gateway, "alice", "Dawn").await;
    seed_like(&gateway, "bob", id).await;
    gateway.set_failing("profiles", true);
    gateway.set_failing("likes", true);

    let service = ArtworkService::new(gateway.clone());
    let feed = service.list().await;

    // The feed still renders with placeholder data.
    assert_eq!(feed.len(), 1);
    assert_eq!(feed[0].profile.username.as_deref(), Some("artist-alice"));
    assert_eq!(feed[0].likes_count, 0);
}

#[tokio::test]
async fn test_by_ids_preserves_requested_order() {
    let gateway = Arc::new(MemoryGateway::with_gallery_schema());
    let a = seed_artwork(&gateway, "alice", "first").await;
    let b = seed_artwork(&gateway, "alice", "second").await;
    let c = seed_artwork(&gateway, "alice", "third").await;

    let service = ArtworkService::new(gateway.clone());
    let works = service.by_ids(&[c, a, b]).await;

    let titles: Vec<&str> = works.iter().map(|w| w.title.as_str()).collect();
    assert_eq!(titles, vec!["third", "first", "second"]);
}

#[tokio::test]
async fn test_create_update_delete_roundtrip() {
    let gateway = Arc::new(MemoryGateway::with_gallery_schema());
    let service = ArtworkService::new(gateway.clone());

    let created = service
        .create(NewArtwork::new("alice", "Dawn", "sunrise over hills", "https://img.test/a.png"))
        .await
        .unwrap();
    assert_eq!(created.likes_count, 0);
    assert_eq!(created.profile.id, "alice");

    let patch = ArtworkPatch {
        title: Some("Dawn, revised".to_string()),
        ..Default::default()
    };
    let updated = service.update(created.id, patch).await.unwrap();
    assert_eq!(updated.title, "Dawn, revised");

    assert!(service.delete(created.id).await);
    assert!(service.list().await.is_empty());
}

#[tokio::test]
async fn test_create_rejects_blank_owner_without_network() {
    let gateway = Arc::new(MemoryGateway::with_gallery_schema());
    let service = ArtworkService::new(gateway.clone());

    let result = service
        .create(NewArtwork::new("  ", "Dawn", "prompt", "https://img.test/a.png"))
        .await;
    assert!(result.is_none());
    assert_eq!(gateway.op_count(), 0);
}

#[tokio::test]
async fn test_list_by_user_filters_and_sorts() {
    let gateway = Arc::new(MemoryGateway::with_gallery_schema());
    seed_artwork(&gateway, "alice", "hers").await;
    seed_artwork(&gateway, "bob", "his").await;

    let service = ArtworkService::new(gateway.clone());
    let works = service.list_by_user("alice").await;
    assert_eq!(works.len(), 1);
    assert_eq!(works[0].title, "hers");

    assert!(service.list_by_user("").await.is_empty());
}
