use std::sync::Arc;

use serde_json::json;

use ai_gallery::gateway::{MemoryGateway, TableGateway};
use ai_gallery::services::comments::MAX_COMMENT_CHARS;
use ai_gallery::services::CommentService;

async fn seed_artwork(gateway: &MemoryGateway) -> i64 {
    let row = match json!({
        "title": "Dawn",
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

async fn seed_comment_like(gateway: &MemoryGateway, user_id: &str, comment_id: i64) {
    let row = match json!({"user_id": user_id, "comment_id": comment_id}) {
        serde_json::Value::Object(map) => map,
        _ => unreachable!(),
    };
    gateway.insert("comment_likes", row).await.unwrap();
}

#[tokio::test]
async fn test_replies_nest_under_their_parent_only() {
    let gateway = Arc::new(MemoryGateway::with_gallery_schema());
    let artwork = seed_artwork(&gateway).await;
    let service = CommentService::new(gateway.clone());

    let first = service
        .create(artwork, "bob", "lovely light", None)
        .await
        .unwrap();
    let second = service
        .create(artwork, "carol", "what model?", None)
        .await
        .unwrap();
    let reply = service
        .create(artwork, "alice", "thanks!", Some(first.id))
        .await
        .unwrap();

    let thread = service.list_for_artwork(artwork).await;

    // Two top-level comments; the reply appears only inside its parent.
    assert_eq!(thread.len(), 2);
    let parent = thread.iter().find(|c| c.id == first.id).unwrap();
    assert_eq!(parent.replies.len(), 1);
    assert_eq!(parent.replies[0].id, reply.id);
    let other = thread.iter().find(|c| c.id == second.id).unwrap();
    assert!(other.replies.is_empty());
    assert!(!thread.iter().any(|c| c.id == reply.id));
}

#[tokio::test]
async fn test_reply_ordering_is_oldest_first() {
    let gateway = Arc::new(MemoryGateway::with_gallery_schema());
    let artwork = seed_artwork(&gateway).await;
    let service = CommentService::new(gateway.clone());

    let top = service.create(artwork, "bob", "top", None).await.unwrap();
    let r1 = service
        .create(artwork, "carol", "first reply", Some(top.id))
        .await
        .unwrap();
    let r2 = service
        .create(artwork, "dave", "second reply", Some(top.id))
        .await
        .unwrap();

    let replies = service.replies(top.id).await;
    assert_eq!(replies.len(), 2);
    assert_eq!(replies[0].id, r1.id);
    assert_eq!(replies[1].id, r2.id);
}

#[tokio::test]
async fn test_comment_like_counts_come_from_join_table() {
    let gateway = Arc::new(MemoryGateway::with_gallery_schema());
    let artwork = seed_artwork(&gateway).await;
    let service = CommentService::new(gateway.clone());

    let comment = service.create(artwork, "bob", "nice", None).await.unwrap();
    seed_comment_like(&gateway, "carol", comment.id).await;
    seed_comment_like(&gateway, "dave", comment.id).await;

    let thread = service.list_for_artwork(artwork).await;
    assert_eq!(thread[0].likes, 2);
}

#[tokio::test]
async fn test_author_resolves_to_placeholder_without_profile() {
    let gateway = Arc::new(MemoryGateway::with_gallery_schema());
    let artwork = seed_artwork(&gateway).await;
    let service = CommentService::new(gateway.clone());

    let comment = service.create(artwork, "mystery", "hello", None).await.unwrap();
    assert_eq!(comment.author, "artist-mystery");

    let thread = service.list_for_artwork(artwork).await;
    assert_eq!(thread[0].author, "artist-mystery");
}

#[tokio::test]
async fn test_content_validation_blocks_the_network() {
    let gateway = Arc::new(MemoryGateway::with_gallery_schema());
    let service = CommentService::new(gateway.clone());

    assert!(service.create(1, "bob", "   ", None).await.is_none());
    let too_long = "x".repeat(MAX_COMMENT_CHARS + 1);
    assert!(service.create(1, "bob", &too_long, None).await.is_none());
    assert!(service.create(0, "bob", "hi", None).await.is_none());
    assert!(service.create(1, "", "hi", None).await.is_none());
    assert!(service.create(1, "bob", "hi", Some(0)).await.is_none());

    assert_eq!(gateway.op_count(), 0);
}

#[tokio::test]
async fn test_content_is_trimmed_and_boundary_length_accepted() {
    let gateway = Arc::new(MemoryGateway::with_gallery_schema());
    let artwork = seed_artwork(&gateway).await;
    let service = CommentService::new(gateway.clone());

    let exact = "y".repeat(MAX_COMMENT_CHARS);
    let comment = service
        .create(artwork, "bob", &format!("  {exact}  "), None)
        .await
        .unwrap();
    assert_eq!(comment.content, exact);
}

#[tokio::test]
async fn test_update_and_delete() {
    let gateway = Arc::new(MemoryGateway::with_gallery_schema());
    let artwork = seed_artwork(&gateway).await;
    let service = CommentService::new(gateway.clone());

    let comment = service.create(artwork, "bob", "first draft", None).await.unwrap();
    let updated = service.update(comment.id, "second draft").await.unwrap();
    assert_eq!(updated.content, "second draft");

    assert!(service.delete(comment.id).await);
    assert!(service.list_for_artwork(artwork).await.is_empty());
}

#[tokio::test]
async fn test_reply_failure_degrades_to_top_level_thread() {
    let gateway = Arc::new(MemoryGateway::with_gallery_schema());
    let artwork = seed_artwork(&gateway).await;
    let service = CommentService::new(gateway.clone());

    service.create(artwork, "bob", "top", None).await.unwrap();

    // Both comment queries hit the same table, so a full table failure
    // empties the thread instead.
    gateway.set_failing("comments", true);
    assert!(service.list_for_artwork(artwork).await.is_empty());
}
