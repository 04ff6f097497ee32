use std::sync::Arc;

use serde_json::json;

use ai_gallery::gateway::{MemoryGateway, TableGateway};
use ai_gallery::services::creators::{MAX_CREATORS, MIN_WORKS, PREVIEW_LIMIT};
use ai_gallery::services::{ArtworkService, CreatorService};

async fn seed_artwork(gateway: &MemoryGateway, user_id: &str, title: &str) -> i64 {
    let row = match json!({
        "title": title,
        "prompt": "a prompt",
        "image_url": "https://img.test/a.png",
        "user_id": user_id,
    }) {
        serde_json::Value::Object(map) => map,
        _ => unreachable!(),
    };
    let stored = gateway.insert("artworks", row).await.unwrap();
    stored.get("id").and_then(serde_json::Value::as_i64).unwrap()
}

async fn seed_likes(gateway: &MemoryGateway, artwork_id: i64, count: usize) {
    for i in 0..count {
        let row = match json!({"user_id": format!("fan-{artwork_id}-{i}"), "artwork_id": artwork_id}) {
            serde_json::Value::Object(map) => map,
            _ => unreachable!(),
        };
        gateway.insert("likes", row).await.unwrap();
    }
}

fn service(gateway: &Arc<MemoryGateway>) -> CreatorService {
    CreatorService::new(ArtworkService::new(gateway.clone()))
}

#[tokio::test]
async fn test_single_work_creators_are_excluded() {
    let gateway = Arc::new(MemoryGateway::with_gallery_schema());
    seed_artwork(&gateway, "alice", "a1").await;
    seed_artwork(&gateway, "alice", "a2").await;
    seed_artwork(&gateway, "bob", "b1").await;

    let creators = service(&gateway).popular().await;
    assert_eq!(creators.len(), 1);
    assert_eq!(creators[0].id, "alice");
    assert_eq!(creators[0].works_count, MIN_WORKS);
}

#[tokio::test]
async fn test_ranking_is_by_accumulated_likes() {
    let gateway = Arc::new(MemoryGateway::with_gallery_schema());
    let a1 = seed_artwork(&gateway, "alice", "a1").await;
    seed_artwork(&gateway, "alice", "a2").await;
    let b1 = seed_artwork(&gateway, "bob", "b1").await;
    let b2 = seed_artwork(&gateway, "bob", "b2").await;

    seed_likes(&gateway, a1, 2).await;
    seed_likes(&gateway, b1, 3).await;
    seed_likes(&gateway, b2, 1).await;

    let creators = service(&gateway).popular().await;
    assert_eq!(creators.len(), 2);
    assert_eq!(creators[0].id, "bob");
    assert_eq!(creators[0].likes_count, 4);
    assert_eq!(creators[1].id, "alice");
    assert_eq!(creators[1].likes_count, 2);
}

#[tokio::test]
async fn test_preview_strip_caps_at_the_most_recent_works() {
    let gateway = Arc::new(MemoryGateway::with_gallery_schema());
    for i in 0..(PREVIEW_LIMIT + 3) {
        seed_artwork(&gateway, "alice", &format!("work-{i}")).await;
        tokio::time::sleep(std::time::Duration::from_millis(2)).await;
    }

    let creators = service(&gateway).popular().await;
    assert_eq!(creators.len(), 1);
    assert_eq!(creators[0].works_count, (PREVIEW_LIMIT + 3) as u64);
    assert_eq!(creators[0].artworks.len(), PREVIEW_LIMIT);
    // Newest first, so the last-seeded work leads the strip.
    assert_eq!(
        creators[0].artworks[0].title,
        format!("work-{}", PREVIEW_LIMIT + 2)
    );
}

#[tokio::test]
async fn test_ranking_is_capped() {
    let gateway = Arc::new(MemoryGateway::with_gallery_schema());
    for creator in 0..(MAX_CREATORS + 5) {
        let owner = format!("creator-{creator}");
        seed_artwork(&gateway, &owner, "one").await;
        seed_artwork(&gateway, &owner, "two").await;
    }

    let creators = service(&gateway).popular().await;
    assert_eq!(creators.len(), MAX_CREATORS);
}

#[tokio::test]
async fn test_empty_feed_yields_no_creators() {
    let gateway = Arc::new(MemoryGateway::with_gallery_schema());
    assert!(service(&gateway).popular().await.is_empty());
}
