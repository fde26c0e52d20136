mod support;

use inkwell::application::feed::FeedError;
use inkwell::application::pagination::PageNumber;
use inkwell::domain::viewer::Viewer;

use support::{MemoryStore, feed_service, follow_service, home_cache, viewer};

#[tokio::test]
async fn group_feed_lists_only_posts_of_that_group() {
    let store = MemoryStore::new();
    let author = store.user("auth").await;
    let test_group = store.group("Test group", "test_slug").await;
    let other_group = store.group("Other group", "other_slug").await;

    let in_group = store.post(&author, "Test text", Some(&test_group)).await;
    store.post(&author, "Elsewhere", Some(&other_group)).await;
    store.post(&author, "No group at all", None).await;

    let feeds = feed_service(&store, home_cache());
    let feed = feeds
        .group_feed("test_slug", PageNumber::default())
        .await
        .expect("group feed");

    assert_eq!(feed.group.title, "Test group");
    assert_eq!(feed.posts.window.total(), 1);
    assert_eq!(feed.posts.items.len(), 1);
    assert_eq!(feed.posts.items[0].id, in_group.id);
    let group = feed.posts.items[0].group.as_ref().expect("group attached");
    assert_eq!(group.slug, "test_slug");

    let other = feeds
        .group_feed("other_slug", PageNumber::default())
        .await
        .expect("other feed");
    assert!(other.posts.items.iter().all(|post| post.id != in_group.id));
}

#[tokio::test]
async fn unknown_group_and_profile_are_not_found() {
    let store = MemoryStore::new();
    let feeds = feed_service(&store, home_cache());

    let group = feeds.group_feed("missing", PageNumber::default()).await;
    assert!(matches!(group, Err(FeedError::NotFound("group"))));

    let profile = feeds
        .profile_feed(&Viewer::Anonymous, "ghost", PageNumber::default())
        .await;
    assert!(matches!(profile, Err(FeedError::NotFound("user"))));
}

#[tokio::test]
async fn feeds_split_into_pages_of_ten_newest_first() {
    let store = MemoryStore::new();
    let author = store.user("auth").await;
    let group = store.group("Test group", "test_slug").await;
    for index in 0..13 {
        store
            .post(&author, &format!("post number {index}"), Some(&group))
            .await;
    }

    let feeds = feed_service(&store, home_cache());

    let first = feeds
        .group_feed("test_slug", PageNumber::Number(1))
        .await
        .expect("first page");
    assert_eq!(first.posts.items.len(), 10);
    assert_eq!(first.posts.items[0].text, "post number 12");
    assert!(first.posts.window.has_next());

    let second = feeds
        .profile_feed(&Viewer::Anonymous, "auth", PageNumber::Number(2))
        .await
        .expect("second page");
    assert_eq!(second.posts.items.len(), 3);
    assert_eq!(second.post_count(), 13);
    assert_eq!(second.posts.items[2].text, "post number 0");

    let clamped = feeds
        .group_feed("test_slug", PageNumber::Number(99))
        .await
        .expect("clamped page");
    assert_eq!(clamped.posts.window.number(), 2);

    let last = feeds
        .group_feed("test_slug", PageNumber::Last)
        .await
        .expect("last page");
    assert_eq!(last.posts.items.len(), 3);
}

#[tokio::test]
async fn profile_reports_follow_state_for_viewer() {
    let store = MemoryStore::new();
    let author = store.user("auth").await;
    let reader = store.user("reader").await;
    store.post(&author, "Hello", None).await;

    let feeds = feed_service(&store, home_cache());
    let follows = follow_service(&store);

    let before = feeds
        .profile_feed(&viewer(&reader), "auth", PageNumber::default())
        .await
        .expect("profile");
    assert!(!before.following);

    follows
        .follow(&viewer(&reader), "auth")
        .await
        .expect("follow");

    let after = feeds
        .profile_feed(&viewer(&reader), "auth", PageNumber::default())
        .await
        .expect("profile");
    assert!(after.following);

    let anonymous = feeds
        .profile_feed(&Viewer::Anonymous, "auth", PageNumber::default())
        .await
        .expect("profile");
    assert!(!anonymous.following);
}

#[tokio::test]
async fn follow_feed_shows_followed_authors_only() {
    let store = MemoryStore::new();
    let author = store.user("auth").await;
    let follower = store.user("follower").await;
    let bystander = store.user("bystander").await;
    let post = store.post(&author, "For my followers", None).await;

    let feeds = feed_service(&store, home_cache());
    let follows = follow_service(&store);
    follows
        .follow(&viewer(&follower), "auth")
        .await
        .expect("follow");

    let followed = feeds
        .follow_feed(&viewer(&follower), PageNumber::default())
        .await
        .expect("follow feed");
    assert_eq!(followed.items.len(), 1);
    assert_eq!(followed.items[0].id, post.id);

    let unrelated = feeds
        .follow_feed(&viewer(&bystander), PageNumber::default())
        .await
        .expect("follow feed");
    assert!(unrelated.items.is_empty());

    let anonymous = feeds
        .follow_feed(&Viewer::Anonymous, PageNumber::default())
        .await;
    assert!(matches!(anonymous, Err(FeedError::Unauthenticated(_))));
}

#[tokio::test]
async fn post_detail_carries_comments_and_author_count() {
    let store = MemoryStore::new();
    let author = store.user("auth").await;
    store.post(&author, "First", None).await;
    let post = store.post(&author, "Second", None).await;

    let feeds = feed_service(&store, home_cache());
    let detail = feeds.post_detail(post.id).await.expect("detail");
    assert_eq!(detail.post.text, "Second");
    assert_eq!(detail.author_post_count, 2);
    assert!(detail.comments.is_empty());

    let missing = feeds.post_detail(post.id + 1000).await;
    assert!(matches!(missing, Err(FeedError::NotFound("post"))));
}
