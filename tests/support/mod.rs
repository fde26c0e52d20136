#![allow(dead_code)]

use std::{num::NonZeroU32, num::NonZeroUsize, sync::Arc, time::Duration};

use async_trait::async_trait;
use axum::http::HeaderName;
use time::{Duration as TimeDuration, OffsetDateTime};
use tokio::sync::Mutex;

use inkwell::application::feed::FeedService;
use inkwell::application::follow::FollowService;
use inkwell::application::groups::GroupService;
use inkwell::application::posts::PostService;
use inkwell::application::repos::{
    CommentsRepo, CommentsWriteRepo, CreateCommentParams, CreateGroupParams, CreatePostParams,
    FollowsRepo, FollowsWriteRepo, GroupsRepo, GroupsWriteRepo, HealthRepo, PostFilter,
    PostsRepo, PostsWriteRepo, RepoError, UpdatePostParams, UsersRepo, UsersWriteRepo,
};
use inkwell::application::users::UserService;
use inkwell::cache::{PageCache, TtlPageCache};
use inkwell::config::AuthSettings;
use inkwell::domain::entities::{
    CommentRecord, GroupRecord, PostGroupRef, PostRecord, UserRecord,
};
use inkwell::domain::viewer::Viewer;
use inkwell::infra::http::{AdminState, HttpState};
use inkwell::infra::uploads::UploadStorage;

pub const USER_HEADER: &str = "x-remote-user";
pub const LOGIN_URL: &str = "/auth/login/";

#[derive(Default)]
struct State {
    next_id: i64,
    clock: i64,
    users: Vec<UserRecord>,
    groups: Vec<GroupRecord>,
    posts: Vec<StoredPost>,
    comments: Vec<StoredComment>,
    follows: Vec<(i64, i64)>,
    fail_post_writes: bool,
}

#[derive(Clone)]
struct StoredPost {
    id: i64,
    text: String,
    created_at: OffsetDateTime,
    author_id: i64,
    group_id: Option<i64>,
    image: Option<String>,
}

#[derive(Clone)]
struct StoredComment {
    id: i64,
    post_id: i64,
    author_id: i64,
    text: String,
    created_at: OffsetDateTime,
}

impl State {
    fn next_id(&mut self) -> i64 {
        self.next_id += 1;
        self.next_id
    }

    /// Strictly increasing timestamps so newest-first ordering is deterministic.
    fn tick(&mut self) -> OffsetDateTime {
        self.clock += 1;
        OffsetDateTime::UNIX_EPOCH + TimeDuration::days(20_000) + TimeDuration::seconds(self.clock)
    }

    fn username(&self, id: i64) -> String {
        self.users
            .iter()
            .find(|user| user.id == id)
            .map(|user| user.username.clone())
            .unwrap_or_default()
    }

    fn hydrate(&self, post: &StoredPost) -> PostRecord {
        let group = post.group_id.and_then(|group_id| {
            self.groups
                .iter()
                .find(|group| group.id == group_id)
                .map(|group| PostGroupRef {
                    id: group.id,
                    slug: group.slug.clone(),
                    title: group.title.clone(),
                })
        });
        PostRecord {
            id: post.id,
            text: post.text.clone(),
            created_at: post.created_at,
            author_id: post.author_id,
            author_username: self.username(post.author_id),
            group,
            image: post.image.clone(),
        }
    }

    fn matches(&self, post: &StoredPost, filter: PostFilter) -> bool {
        match filter {
            PostFilter::All => true,
            PostFilter::Group(group_id) => post.group_id == Some(group_id),
            PostFilter::Author(author_id) => post.author_id == author_id,
            PostFilter::FollowedBy(user_id) => self
                .follows
                .iter()
                .any(|(follower, author)| *follower == user_id && *author == post.author_id),
        }
    }
}

/// In-memory stand-in for the Postgres repositories.
#[derive(Default)]
pub struct MemoryStore {
    state: Mutex<State>,
}

impl MemoryStore {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    pub async fn user(&self, username: &str) -> UserRecord {
        self.get_or_create_user(username)
            .await
            .expect("user created")
    }

    pub async fn group(&self, title: &str, slug: &str) -> GroupRecord {
        self.create_group(CreateGroupParams {
            title: title.to_string(),
            slug: slug.to_string(),
            description: format!("About {title}"),
        })
        .await
        .expect("group created")
    }

    pub async fn post(&self, author: &UserRecord, text: &str, group: Option<&GroupRecord>) -> PostRecord {
        self.create_post(CreatePostParams {
            author_id: author.id,
            text: text.to_string(),
            group_id: group.map(|group| group.id),
            image: None,
        })
        .await
        .expect("post created")
    }

    pub async fn remove_post(&self, post_id: i64) {
        let mut state = self.state.lock().await;
        state.posts.retain(|post| post.id != post_id);
        state.comments.retain(|comment| comment.post_id != post_id);
    }

    /// Make every later post insert or update fail with a timeout.
    pub async fn fail_post_writes(&self) {
        self.state.lock().await.fail_post_writes = true;
    }

    pub async fn follow_count(&self) -> usize {
        self.state.lock().await.follows.len()
    }

    pub async fn post_count(&self) -> usize {
        self.state.lock().await.posts.len()
    }

    pub async fn comment_count(&self) -> usize {
        self.state.lock().await.comments.len()
    }
}

#[async_trait]
impl UsersRepo for MemoryStore {
    async fn find_by_id(&self, id: i64) -> Result<Option<UserRecord>, RepoError> {
        let state = self.state.lock().await;
        Ok(state.users.iter().find(|user| user.id == id).cloned())
    }

    async fn find_by_username(&self, username: &str) -> Result<Option<UserRecord>, RepoError> {
        let state = self.state.lock().await;
        Ok(state
            .users
            .iter()
            .find(|user| user.username == username)
            .cloned())
    }
}

#[async_trait]
impl UsersWriteRepo for MemoryStore {
    async fn get_or_create_user(&self, username: &str) -> Result<UserRecord, RepoError> {
        let mut state = self.state.lock().await;
        if let Some(user) = state.users.iter().find(|user| user.username == username) {
            return Ok(user.clone());
        }
        let user = UserRecord {
            id: state.next_id(),
            username: username.to_string(),
            created_at: state.tick(),
        };
        state.users.push(user.clone());
        Ok(user)
    }

    async fn delete_user(&self, username: &str) -> Result<bool, RepoError> {
        let mut state = self.state.lock().await;
        let Some(id) = state
            .users
            .iter()
            .find(|user| user.username == username)
            .map(|user| user.id)
        else {
            return Ok(false);
        };
        let removed_posts: Vec<i64> = state
            .posts
            .iter()
            .filter(|post| post.author_id == id)
            .map(|post| post.id)
            .collect();
        state.users.retain(|user| user.id != id);
        state.posts.retain(|post| post.author_id != id);
        state.comments.retain(|comment| {
            comment.author_id != id && !removed_posts.contains(&comment.post_id)
        });
        state
            .follows
            .retain(|(follower, author)| *follower != id && *author != id);
        Ok(true)
    }
}

#[async_trait]
impl GroupsRepo for MemoryStore {
    async fn list_groups(&self) -> Result<Vec<GroupRecord>, RepoError> {
        let state = self.state.lock().await;
        let mut groups = state.groups.clone();
        groups.sort_by(|a, b| {
            a.title
                .to_lowercase()
                .cmp(&b.title.to_lowercase())
                .then_with(|| a.slug.cmp(&b.slug))
        });
        Ok(groups)
    }

    async fn find_by_id(&self, id: i64) -> Result<Option<GroupRecord>, RepoError> {
        let state = self.state.lock().await;
        Ok(state.groups.iter().find(|group| group.id == id).cloned())
    }

    async fn find_by_slug(&self, slug: &str) -> Result<Option<GroupRecord>, RepoError> {
        let state = self.state.lock().await;
        Ok(state.groups.iter().find(|group| group.slug == slug).cloned())
    }
}

#[async_trait]
impl GroupsWriteRepo for MemoryStore {
    async fn create_group(&self, params: CreateGroupParams) -> Result<GroupRecord, RepoError> {
        let mut state = self.state.lock().await;
        if state.groups.iter().any(|group| group.slug == params.slug) {
            return Err(RepoError::Duplicate {
                constraint: "groups_slug_key".to_string(),
            });
        }
        let group = GroupRecord {
            id: state.next_id(),
            title: params.title,
            slug: params.slug,
            description: params.description,
        };
        state.groups.push(group.clone());
        Ok(group)
    }

    async fn delete_group(&self, slug: &str) -> Result<bool, RepoError> {
        let mut state = self.state.lock().await;
        let Some(id) = state
            .groups
            .iter()
            .find(|group| group.slug == slug)
            .map(|group| group.id)
        else {
            return Ok(false);
        };
        state.groups.retain(|group| group.id != id);
        for post in state.posts.iter_mut() {
            if post.group_id == Some(id) {
                post.group_id = None;
            }
        }
        Ok(true)
    }
}

#[async_trait]
impl PostsRepo for MemoryStore {
    async fn count_posts(&self, filter: PostFilter) -> Result<u64, RepoError> {
        let state = self.state.lock().await;
        Ok(state
            .posts
            .iter()
            .filter(|post| state.matches(post, filter))
            .count() as u64)
    }

    async fn list_posts(
        &self,
        filter: PostFilter,
        offset: u64,
        limit: u32,
    ) -> Result<Vec<PostRecord>, RepoError> {
        let state = self.state.lock().await;
        let mut posts: Vec<&StoredPost> = state
            .posts
            .iter()
            .filter(|post| state.matches(post, filter))
            .collect();
        posts.sort_by(|a, b| b.created_at.cmp(&a.created_at).then(b.id.cmp(&a.id)));
        Ok(posts
            .into_iter()
            .skip(offset as usize)
            .take(limit as usize)
            .map(|post| state.hydrate(post))
            .collect())
    }

    async fn find_by_id(&self, id: i64) -> Result<Option<PostRecord>, RepoError> {
        let state = self.state.lock().await;
        Ok(state
            .posts
            .iter()
            .find(|post| post.id == id)
            .map(|post| state.hydrate(post)))
    }
}

#[async_trait]
impl PostsWriteRepo for MemoryStore {
    async fn create_post(&self, params: CreatePostParams) -> Result<PostRecord, RepoError> {
        let mut state = self.state.lock().await;
        if state.fail_post_writes {
            return Err(RepoError::Timeout);
        }
        let post = StoredPost {
            id: state.next_id(),
            text: params.text,
            created_at: state.tick(),
            author_id: params.author_id,
            group_id: params.group_id,
            image: params.image,
        };
        state.posts.push(post.clone());
        Ok(state.hydrate(&post))
    }

    async fn update_post(&self, params: UpdatePostParams) -> Result<PostRecord, RepoError> {
        let mut state = self.state.lock().await;
        if state.fail_post_writes {
            return Err(RepoError::Timeout);
        }
        let post = state
            .posts
            .iter_mut()
            .find(|post| post.id == params.id)
            .ok_or(RepoError::NotFound)?;
        post.text = params.text;
        post.group_id = params.group_id;
        post.image = params.image;
        let post = post.clone();
        Ok(state.hydrate(&post))
    }
}

#[async_trait]
impl CommentsRepo for MemoryStore {
    async fn list_for_post(&self, post_id: i64) -> Result<Vec<CommentRecord>, RepoError> {
        let state = self.state.lock().await;
        Ok(state
            .comments
            .iter()
            .filter(|comment| comment.post_id == post_id)
            .map(|comment| CommentRecord {
                id: comment.id,
                post_id: comment.post_id,
                author_id: comment.author_id,
                author_username: state.username(comment.author_id),
                text: comment.text.clone(),
                created_at: comment.created_at,
            })
            .collect())
    }
}

#[async_trait]
impl CommentsWriteRepo for MemoryStore {
    async fn create_comment(
        &self,
        params: CreateCommentParams,
    ) -> Result<CommentRecord, RepoError> {
        let mut state = self.state.lock().await;
        let comment = StoredComment {
            id: state.next_id(),
            post_id: params.post_id,
            author_id: params.author_id,
            text: params.text,
            created_at: state.tick(),
        };
        state.comments.push(comment.clone());
        Ok(CommentRecord {
            id: comment.id,
            post_id: comment.post_id,
            author_id: comment.author_id,
            author_username: state.username(comment.author_id),
            text: comment.text,
            created_at: comment.created_at,
        })
    }
}

#[async_trait]
impl FollowsRepo for MemoryStore {
    async fn is_following(&self, user_id: i64, author_id: i64) -> Result<bool, RepoError> {
        let state = self.state.lock().await;
        Ok(state.follows.contains(&(user_id, author_id)))
    }
}

#[async_trait]
impl FollowsWriteRepo for MemoryStore {
    async fn follow(&self, user_id: i64, author_id: i64) -> Result<bool, RepoError> {
        let mut state = self.state.lock().await;
        if state.follows.contains(&(user_id, author_id)) {
            return Ok(false);
        }
        state.follows.push((user_id, author_id));
        Ok(true)
    }

    async fn unfollow(&self, user_id: i64, author_id: i64) -> Result<bool, RepoError> {
        let mut state = self.state.lock().await;
        let before = state.follows.len();
        state
            .follows
            .retain(|edge| *edge != (user_id, author_id));
        Ok(state.follows.len() != before)
    }
}

#[async_trait]
impl HealthRepo for MemoryStore {
    async fn health_check(&self) -> Result<(), RepoError> {
        Ok(())
    }
}

pub fn viewer(user: &UserRecord) -> Viewer {
    Viewer::Authenticated(user.clone())
}

pub fn page_size() -> NonZeroU32 {
    NonZeroU32::new(10).expect("non-zero")
}

pub fn home_cache() -> Arc<dyn PageCache> {
    Arc::new(TtlPageCache::new(NonZeroUsize::new(16).expect("non-zero")))
}

pub fn feed_service(store: &Arc<MemoryStore>, cache: Arc<dyn PageCache>) -> FeedService {
    FeedService::new(
        store.clone(),
        store.clone(),
        store.clone(),
        store.clone(),
        store.clone(),
        cache,
        page_size(),
        Duration::from_secs(20),
    )
}

pub fn follow_service(store: &Arc<MemoryStore>) -> FollowService {
    FollowService::new(store.clone(), store.clone())
}

pub fn post_service(store: &Arc<MemoryStore>, uploads: Arc<UploadStorage>) -> PostService {
    PostService::new(
        store.clone(),
        store.clone(),
        store.clone(),
        store.clone(),
        uploads,
    )
}

pub fn upload_storage(dir: &tempfile::TempDir) -> Arc<UploadStorage> {
    Arc::new(UploadStorage::new(dir.path().to_path_buf()).expect("upload storage"))
}

pub fn http_state(store: &Arc<MemoryStore>, uploads: Arc<UploadStorage>) -> HttpState {
    HttpState {
        feed: Arc::new(feed_service(store, home_cache())),
        follows: Arc::new(follow_service(store)),
        posts: Arc::new(post_service(store, uploads.clone())),
        users: Arc::new(UserService::new(store.clone())),
        health: store.clone(),
        upload_storage: uploads,
        auth: AuthSettings {
            user_header: HeaderName::from_static(USER_HEADER),
            login_url: LOGIN_URL.to_string(),
        },
    }
}

/// Admin surface sharing `feed` (and so its home cache) with a public router.
pub fn admin_state(store: &Arc<MemoryStore>, feed: Arc<FeedService>) -> AdminState {
    AdminState {
        groups: Arc::new(GroupService::new(store.clone(), store.clone())),
        users: Arc::new(UserService::new(store.clone())),
        feed,
        health: store.clone(),
    }
}
