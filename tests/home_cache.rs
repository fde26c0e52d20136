mod support;

use std::time::Duration;

use inkwell::application::pagination::PageNumber;

use support::{MemoryStore, feed_service, home_cache};

#[tokio::test(start_paused = true)]
async fn deleted_post_stays_visible_until_cache_is_cleared() {
    let store = MemoryStore::new();
    let author = store.user("auth").await;
    let post = store.post(&author, "Cached announcement", None).await;
    let feeds = feed_service(&store, home_cache());

    let before = feeds
        .home_fragment(PageNumber::default())
        .await
        .expect("home");
    assert!(before.contains("Cached announcement"));

    store.remove_post(post.id).await;

    let cached = feeds
        .home_fragment(PageNumber::default())
        .await
        .expect("home");
    assert_eq!(cached, before);

    feeds.clear_home_cache();
    let fresh = feeds
        .home_fragment(PageNumber::default())
        .await
        .expect("home");
    assert!(!fresh.contains("Cached announcement"));
}

#[tokio::test(start_paused = true)]
async fn cached_home_page_expires_after_twenty_seconds() {
    let store = MemoryStore::new();
    let author = store.user("auth").await;
    let post = store.post(&author, "Short lived", None).await;
    let feeds = feed_service(&store, home_cache());

    let before = feeds
        .home_fragment(PageNumber::default())
        .await
        .expect("home");
    store.remove_post(post.id).await;

    tokio::time::advance(Duration::from_secs(19)).await;
    let still_cached = feeds
        .home_fragment(PageNumber::default())
        .await
        .expect("home");
    assert_eq!(still_cached, before);

    tokio::time::advance(Duration::from_secs(2)).await;
    let expired = feeds
        .home_fragment(PageNumber::default())
        .await
        .expect("home");
    assert!(!expired.contains("Short lived"));
}

#[tokio::test(start_paused = true)]
async fn pages_are_cached_independently() {
    let store = MemoryStore::new();
    let author = store.user("auth").await;
    for index in 0..12 {
        store.post(&author, &format!("entry {index}"), None).await;
    }
    let feeds = feed_service(&store, home_cache());

    let first = feeds
        .home_fragment(PageNumber::Number(1))
        .await
        .expect("first");
    let second = feeds
        .home_fragment(PageNumber::Number(2))
        .await
        .expect("second");

    assert!(first.contains("<p>entry 11</p>"));
    assert!(!first.contains("<p>entry 1</p>"));
    assert!(second.contains("<p>entry 1</p>"));
    assert!(second.contains("<p>entry 0</p>"));
    assert!(!second.contains("<p>entry 11</p>"));
}
