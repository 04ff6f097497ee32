use std::sync::Arc;

use serde_json::json;

use ai_gallery::gateway::{MemoryGateway, TableGateway};
use ai_gallery::optimistic::optimistic_toggle;
use ai_gallery::services::{FavoriteService, LikeService};

async fn seed_artwork(gateway: &MemoryGateway, title: &str) -> i64 {
    let row = match json!({
        "title": title,
        "prompt": "a prompt",
        "image_url": "https://img.test/a.png",
        "user_id": "alice",
    }) {
        serde_json::Value::Object(map) => map,
        _ => unreachable!(),
    };
    let stored = gateway.insert("artworks", row).await.unwrap();
    stored.get("id").and_then(serde_json::Value::as_i64).unwrap()
}

#[tokio::test]
async fn test_repeated_likes_store_one_row() {
    let gateway = Arc::new(MemoryGateway::with_gallery_schema());
    let artwork = seed_artwork(&gateway, "Dawn").await;
    let service = LikeService::new(gateway.clone());

    assert!(service.like_artwork("bob", artwork).await);
    assert!(service.like_artwork("bob", artwork).await);
    assert!(service.like_artwork("bob", artwork).await);

    assert_eq!(service.artwork_like_count(artwork).await, 1);
}

#[tokio::test]
async fn test_unlike_without_a_like_succeeds() {
    let gateway = Arc::new(MemoryGateway::with_gallery_schema());
    let artwork = seed_artwork(&gateway, "Dawn").await;
    let service = LikeService::new(gateway.clone());

    assert!(service.unlike_artwork("bob", artwork).await);
    assert_eq!(service.artwork_like_count(artwork).await, 0);
}

#[tokio::test]
async fn test_toggle_cycles_end_in_consistent_state() {
    let gateway = Arc::new(MemoryGateway::with_gallery_schema());
    let artwork = seed_artwork(&gateway, "Dawn").await;
    let service = LikeService::new(gateway.clone());

    // like, unlike, like again
    assert!(service.toggle_artwork_like("bob", artwork).await);
    assert!(!service.toggle_artwork_like("bob", artwork).await);
    assert!(service.toggle_artwork_like("bob", artwork).await);

    assert!(service.artwork_liked("bob", artwork).await);
    assert_eq!(service.artwork_like_count(artwork).await, 1);
}

#[tokio::test]
async fn test_comment_likes_are_independent_of_artwork_likes() {
    let gateway = Arc::new(MemoryGateway::with_gallery_schema());
    let artwork = seed_artwork(&gateway, "Dawn").await;
    let service = LikeService::new(gateway.clone());

    assert!(service.like_artwork("bob", artwork).await);
    assert!(service.like_comment("bob", 7).await);

    assert_eq!(service.artwork_like_count(artwork).await, 1);
    assert_eq!(service.comment_like_count(7).await, 1);
    assert!(service.comment_liked("bob", 7).await);
    assert!(!service.comment_liked("carol", 7).await);
}

#[tokio::test]
async fn test_invalid_identifiers_short_circuit() {
    let gateway = Arc::new(MemoryGateway::with_gallery_schema());
    let service = LikeService::new(gateway.clone());

    assert!(!service.like_artwork("", 1).await);
    assert!(!service.like_artwork("bob", 0).await);
    assert!(!service.artwork_liked("", 1).await);
    assert_eq!(service.artwork_like_count(-1).await, 0);

    assert_eq!(gateway.op_count(), 0);
}

#[tokio::test]
async fn test_optimistic_like_reverts_when_backend_fails() {
    let gateway = Arc::new(MemoryGateway::with_gallery_schema());
    let artwork = seed_artwork(&gateway, "Dawn").await;
    let service = LikeService::new(gateway.clone());
    gateway.set_failing("likes", true);

    let mut liked = false;
    let mut count = 10;
    let settled = optimistic_toggle(
        liked,
        |state| {
            liked = state;
            count += if state { 1 } else { -1 };
        },
        service.like_artwork("bob", artwork),
    )
    .await;

    assert!(!settled);
    assert!(!liked);
    assert_eq!(count, 10);
}

#[tokio::test]
async fn test_favorite_toggle_roundtrip() {
    let gateway = Arc::new(MemoryGateway::with_gallery_schema());
    let artwork = seed_artwork(&gateway, "Dawn").await;
    let service = FavoriteService::new(gateway.clone());

    assert!(service.toggle("bob", artwork).await);
    assert!(service.is_favorited("bob", artwork).await);
    assert!(service.add("bob", artwork).await);

    assert!(!service.toggle("bob", artwork).await);
    assert!(!service.is_favorited("bob", artwork).await);
}

#[tokio::test]
async fn test_favorite_artworks_keep_favorite_order() {
    let gateway = Arc::new(MemoryGateway::with_gallery_schema());
    let a = seed_artwork(&gateway, "first-favorited").await;
    let b = seed_artwork(&gateway, "second-favorited").await;
    let service = FavoriteService::new(gateway.clone());

    assert!(service.add("bob", a).await);
    tokio::time::sleep(std::time::Duration::from_millis(5)).await;
    assert!(service.add("bob", b).await);

    let ids = service.favorite_ids("bob").await;
    assert_eq!(ids, vec![b, a]);

    let works = service.favorite_artworks("bob").await;
    let titles: Vec<&str> = works.iter().map(|w| w.title.as_str()).collect();
    assert_eq!(titles, vec!["second-favorited", "first-favorited"]);
}

#[tokio::test]
async fn test_favorites_are_scoped_to_their_owner() {
    let gateway = Arc::new(MemoryGateway::with_gallery_schema());
    let artwork = seed_artwork(&gateway, "Dawn").await;
    let service = FavoriteService::new(gateway.clone());

    assert!(service.add("bob", artwork).await);
    assert!(!service.is_favorited("carol", artwork).await);
    assert!(service.favorite_ids("carol").await.is_empty());
}
