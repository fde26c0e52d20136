use sqlx::PgPool;

use inkwell::application::repos::{
    CommentsRepo, CommentsWriteRepo, CreateCommentParams, CreateGroupParams, CreatePostParams,
    FollowsRepo, FollowsWriteRepo, GroupsRepo, GroupsWriteRepo, PostFilter, PostsRepo,
    PostsWriteRepo, RepoError, UpdatePostParams, UsersRepo, UsersWriteRepo,
};
use inkwell::domain::entities::{GroupRecord, PostRecord, UserRecord};
use inkwell::infra::db::PostgresRepositories;

async fn user(repos: &PostgresRepositories, username: &str) -> UserRecord {
    repos
        .get_or_create_user(username)
        .await
        .expect("create user")
}

async fn group(repos: &PostgresRepositories, slug: &str) -> GroupRecord {
    repos
        .create_group(CreateGroupParams {
            title: format!("Group {slug}"),
            slug: slug.to_string(),
            description: String::new(),
        })
        .await
        .expect("create group")
}

async fn post(
    repos: &PostgresRepositories,
    author: &UserRecord,
    text: &str,
    group: Option<&GroupRecord>,
) -> PostRecord {
    repos
        .create_post(CreatePostParams {
            author_id: author.id,
            text: text.to_string(),
            group_id: group.map(|group| group.id),
            image: None,
        })
        .await
        .expect("create post")
}

async fn ids(repos: &PostgresRepositories, filter: PostFilter) -> Vec<i64> {
    repos
        .list_posts(filter, 0, 50)
        .await
        .expect("list posts")
        .into_iter()
        .map(|post| post.id)
        .collect()
}

async fn row_count(pool: &PgPool, table: &str) -> i64 {
    sqlx::query_scalar(&format!("SELECT COUNT(*) FROM {table}"))
        .fetch_one(pool)
        .await
        .expect("count rows")
}

#[sqlx::test(migrations = "./migrations")]
async fn get_or_create_user_is_idempotent(pool: PgPool) {
    let repos = PostgresRepositories::new(pool.clone());

    let first = user(&repos, "auth").await;
    let second = user(&repos, "auth").await;

    assert_eq!(first.id, second.id);
    assert_eq!(row_count(&pool, "users").await, 1);
    let found = UsersRepo::find_by_username(&repos, "auth")
        .await
        .expect("lookup")
        .expect("user exists");
    assert_eq!(found.id, first.id);
}

#[sqlx::test(migrations = "./migrations")]
async fn posts_are_newest_first_with_id_as_tie_breaker(pool: PgPool) {
    let repos = PostgresRepositories::new(pool.clone());
    let author = user(&repos, "auth").await;
    let older = post(&repos, &author, "older", None).await;
    let first_tied = post(&repos, &author, "tied a", None).await;
    let second_tied = post(&repos, &author, "tied b", None).await;

    sqlx::query("UPDATE posts SET created_at = '2024-01-02T00:00:00Z' WHERE id <> $1")
        .bind(older.id)
        .execute(&pool)
        .await
        .expect("pin timestamps");
    sqlx::query("UPDATE posts SET created_at = '2024-01-01T00:00:00Z' WHERE id = $1")
        .bind(older.id)
        .execute(&pool)
        .await
        .expect("pin timestamps");

    assert_eq!(
        ids(&repos, PostFilter::All).await,
        vec![second_tied.id, first_tied.id, older.id]
    );

    let window = repos
        .list_posts(PostFilter::All, 1, 1)
        .await
        .expect("list window");
    assert_eq!(window.len(), 1);
    assert_eq!(window[0].id, first_tied.id);
    assert_eq!(window[0].author_username, "auth");
}

#[sqlx::test(migrations = "./migrations")]
async fn filters_select_group_author_and_followed_posts(pool: PgPool) {
    let repos = PostgresRepositories::new(pool);
    let alice = user(&repos, "alice").await;
    let bob = user(&repos, "bob").await;
    let reader = user(&repos, "reader").await;
    let cats = group(&repos, "cats").await;
    let dogs = group(&repos, "dogs").await;

    let alice_cats = post(&repos, &alice, "alice in cats", Some(&cats)).await;
    let bob_dogs = post(&repos, &bob, "bob in dogs", Some(&dogs)).await;
    let bob_plain = post(&repos, &bob, "bob without group", None).await;

    assert_eq!(ids(&repos, PostFilter::Group(cats.id)).await, vec![alice_cats.id]);
    assert_eq!(ids(&repos, PostFilter::Group(dogs.id)).await, vec![bob_dogs.id]);
    assert_eq!(
        ids(&repos, PostFilter::Author(bob.id)).await,
        vec![bob_plain.id, bob_dogs.id]
    );
    assert!(ids(&repos, PostFilter::FollowedBy(reader.id)).await.is_empty());

    assert!(repos.follow(reader.id, alice.id).await.expect("follow"));
    assert_eq!(
        ids(&repos, PostFilter::FollowedBy(reader.id)).await,
        vec![alice_cats.id]
    );
    assert_eq!(
        repos
            .count_posts(PostFilter::FollowedBy(reader.id))
            .await
            .expect("count"),
        1
    );
    assert_eq!(repos.count_posts(PostFilter::All).await.expect("count"), 3);

    let grouped = PostsRepo::find_by_id(&repos, alice_cats.id)
        .await
        .expect("lookup")
        .expect("post exists");
    assert_eq!(grouped.group.map(|group| group.slug), Some("cats".to_string()));
}

#[sqlx::test(migrations = "./migrations")]
async fn following_twice_keeps_one_edge(pool: PgPool) {
    let repos = PostgresRepositories::new(pool.clone());
    let author = user(&repos, "auth").await;
    let follower = user(&repos, "follower").await;

    assert!(repos.follow(follower.id, author.id).await.expect("follow"));
    assert!(!repos.follow(follower.id, author.id).await.expect("follow again"));
    assert_eq!(row_count(&pool, "follows").await, 1);
    assert!(repos.is_following(follower.id, author.id).await.expect("lookup"));
    assert!(!repos.is_following(author.id, follower.id).await.expect("lookup"));

    assert!(repos.unfollow(follower.id, author.id).await.expect("unfollow"));
    assert!(!repos.unfollow(follower.id, author.id).await.expect("unfollow again"));
    assert_eq!(row_count(&pool, "follows").await, 0);
}

#[sqlx::test(migrations = "./migrations")]
async fn deleting_a_group_keeps_its_posts(pool: PgPool) {
    let repos = PostgresRepositories::new(pool.clone());
    let author = user(&repos, "auth").await;
    let cats = group(&repos, "cats").await;
    let kept = post(&repos, &author, "outlives the group", Some(&cats)).await;

    assert!(repos.delete_group("cats").await.expect("delete group"));
    assert!(!repos.delete_group("cats").await.expect("delete again"));

    let stored = PostsRepo::find_by_id(&repos, kept.id)
        .await
        .expect("lookup")
        .expect("post kept");
    assert!(stored.group.is_none());
    assert_eq!(row_count(&pool, "posts").await, 1);
}

#[sqlx::test(migrations = "./migrations")]
async fn deleting_a_user_cascades(pool: PgPool) {
    let repos = PostgresRepositories::new(pool.clone());
    let author = user(&repos, "auth").await;
    let reader = user(&repos, "reader").await;
    let own = post(&repos, &author, "by the author", None).await;
    let other = post(&repos, &reader, "by the reader", None).await;

    for (post_id, author_id) in [(own.id, reader.id), (other.id, author.id), (other.id, reader.id)] {
        repos
            .create_comment(CreateCommentParams {
                post_id,
                author_id,
                text: "comment".to_string(),
            })
            .await
            .expect("create comment");
    }
    repos.follow(reader.id, author.id).await.expect("follow");
    repos.follow(author.id, reader.id).await.expect("follow");

    assert!(repos.delete_user("auth").await.expect("delete user"));

    assert_eq!(row_count(&pool, "users").await, 1);
    assert_eq!(ids(&repos, PostFilter::All).await, vec![other.id]);
    assert_eq!(row_count(&pool, "follows").await, 0);
    let remaining = repos.list_for_post(other.id).await.expect("comments");
    assert_eq!(remaining.len(), 1);
    assert_eq!(remaining[0].author_username, "reader");
    assert_eq!(row_count(&pool, "comments").await, 1);
}

#[sqlx::test(migrations = "./migrations")]
async fn update_keeps_author_and_timestamp(pool: PgPool) {
    let repos = PostgresRepositories::new(pool);
    let author = user(&repos, "auth").await;
    let cats = group(&repos, "cats").await;
    let original = post(&repos, &author, "before", None).await;

    let updated = repos
        .update_post(UpdatePostParams {
            id: original.id,
            text: "after".to_string(),
            group_id: Some(cats.id),
            image: Some("posts/abc-cat.gif".to_string()),
        })
        .await
        .expect("update post");

    assert_eq!(updated.id, original.id);
    assert_eq!(updated.author_id, author.id);
    assert_eq!(updated.created_at, original.created_at);
    assert_eq!(updated.text, "after");
    assert_eq!(updated.group.map(|group| group.id), Some(cats.id));
    assert_eq!(updated.image.as_deref(), Some("posts/abc-cat.gif"));
}

#[sqlx::test(migrations = "./migrations")]
async fn duplicate_slugs_and_dangling_references_are_classified(pool: PgPool) {
    let repos = PostgresRepositories::new(pool);
    group(&repos, "cats").await;

    let duplicate = repos
        .create_group(CreateGroupParams {
            title: "Cats again".to_string(),
            slug: "cats".to_string(),
            description: String::new(),
        })
        .await;
    assert!(matches!(duplicate, Err(RepoError::Duplicate { .. })));

    let dangling = repos
        .create_post(CreatePostParams {
            author_id: 4242,
            text: "nobody wrote this".to_string(),
            group_id: None,
            image: None,
        })
        .await;
    assert!(matches!(dangling, Err(RepoError::InvalidInput { .. })));

    assert!(
        GroupsRepo::find_by_slug(&repos, "cats")
            .await
            .expect("lookup")
            .is_some()
    );
}
