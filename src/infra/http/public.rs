use std::{io::ErrorKind, sync::Arc};

use axum::{
    Extension, Router,
    body::Body,
    extract::{DefaultBodyLimit, Path, Query, State},
    http::{
        HeaderValue, StatusCode, Uri,
        header::{CACHE_CONTROL, CONTENT_LENGTH, CONTENT_TYPE, X_CONTENT_TYPE_OPTIONS},
    },
    middleware,
    response::{IntoResponse, Response},
    routing::{get, post},
};
use bytes::Bytes;
use serde::Deserialize;
use tracing::error;

use crate::{
    application::{
        error::HttpError,
        feed::{FeedError, FeedService},
        follow::FollowService,
        pagination::PageNumber,
        posts::PostService,
        repos::HealthRepo,
        users::UserService,
    },
    config::AuthSettings,
    domain::viewer::Viewer,
    infra::uploads::{UploadStorage, UploadStorageError},
    presentation::views::{
        self, CommentView, FollowTemplate, FollowView, GroupTemplate, GroupView, HomeView,
        IndexTemplate, LayoutChrome, LayoutContext, PostCard, PostDetailTemplate, PostDetailView,
        ProfileTemplate, ProfileView, render_not_found_response, render_template_response,
    },
};

use super::{
    auth::{can_follow, login_redirect, require_login, resolve_viewer},
    db_health_response, follow,
    middleware::{log_responses, set_request_context},
    posts, repo_error_to_http, route_with_slash,
};

const GROUP_EMPTY_MESSAGE: &str = "No posts in this group yet.";
const PROFILE_EMPTY_MESSAGE: &str = "This author has not posted yet.";
const FOLLOW_EMPTY_MESSAGE: &str = "Authors you follow have not posted yet.";

#[derive(Clone)]
pub struct HttpState {
    pub feed: Arc<FeedService>,
    pub follows: Arc<FollowService>,
    pub posts: Arc<PostService>,
    pub users: Arc<UserService>,
    pub health: Arc<dyn HealthRepo>,
    pub upload_storage: Arc<UploadStorage>,
    pub auth: AuthSettings,
}

impl HttpState {
    pub(super) fn chrome(&self, viewer: &Viewer) -> LayoutChrome {
        LayoutChrome::for_viewer(viewer, &self.auth.login_url)
    }
}

pub fn build_router(state: HttpState, upload_body_limit: usize) -> Router {
    let mut open = Router::new().route("/", get(index));
    open = route_with_slash(open, "/group/{slug}/", get(group_posts));
    open = route_with_slash(open, "/profile/{username}/", get(profile));
    open = route_with_slash(open, "/posts/{post_id}/", get(post_detail));

    let mut protected = Router::new();
    protected = route_with_slash(protected, "/follow/", get(follow_index));
    protected = route_with_slash(
        protected,
        "/create/",
        get(posts::post_create_form)
            .post(posts::post_create)
            .layer(DefaultBodyLimit::max(upload_body_limit)),
    );
    protected = route_with_slash(
        protected,
        "/posts/{post_id}/edit/",
        get(posts::post_edit_form)
            .post(posts::post_edit)
            .layer(DefaultBodyLimit::max(upload_body_limit)),
    );
    protected = route_with_slash(
        protected,
        "/posts/{post_id}/comment/",
        post(posts::add_comment),
    );
    protected = route_with_slash(
        protected,
        "/profile/{username}/follow/",
        get(follow::profile_follow).post(follow::profile_follow),
    );
    protected = route_with_slash(
        protected,
        "/profile/{username}/unfollow/",
        get(follow::profile_unfollow).post(follow::profile_unfollow),
    );
    let protected =
        protected.route_layer(middleware::from_fn_with_state(state.clone(), require_login));

    open.merge(protected)
        .route("/media/{*path}", get(serve_media))
        .route("/_health/db", get(public_health))
        .fallback(fallback_router)
        .layer(middleware::from_fn_with_state(state.clone(), resolve_viewer))
        .with_state(state)
        .layer(middleware::from_fn(log_responses))
        .layer(middleware::from_fn(set_request_context))
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct PageQuery {
    page: Option<String>,
}

impl PageQuery {
    fn number(&self) -> PageNumber {
        PageNumber::parse(self.page.as_deref())
    }
}

/// Numeric path segment; anything else is treated as an unknown resource.
pub(super) fn parse_post_id(raw: &str) -> Option<i64> {
    raw.parse::<i64>().ok().filter(|id| *id > 0)
}

async fn index(
    State(state): State<HttpState>,
    Extension(viewer): Extension<Viewer>,
    Query(query): Query<PageQuery>,
    uri: Uri,
) -> Response {
    let chrome = state.chrome(&viewer);
    match state.feed.home_fragment(query.number()).await {
        Ok(feed_html) => {
            let view = LayoutContext::new(chrome, HomeView { feed_html });
            render_template_response(IndexTemplate { view }, StatusCode::OK)
        }
        Err(err) => feed_error_to_response(&state, err, chrome, &uri),
    }
}

async fn group_posts(
    State(state): State<HttpState>,
    Extension(viewer): Extension<Viewer>,
    Path(slug): Path<String>,
    Query(query): Query<PageQuery>,
    uri: Uri,
) -> Response {
    let chrome = state.chrome(&viewer);
    let feed = match state.feed.group_feed(&slug, query.number()).await {
        Ok(feed) => feed,
        Err(err) => return feed_error_to_response(&state, err, chrome, &uri),
    };

    let feed_html = match views::render_feed(&feed.posts, GROUP_EMPTY_MESSAGE) {
        Ok(html) => html,
        Err(err) => return HttpError::from(err).into_response(),
    };
    let chrome = chrome.with_title(feed.group.title.clone());
    let view = LayoutContext::new(chrome, GroupView::new(&feed.group, feed_html));
    render_template_response(GroupTemplate { view }, StatusCode::OK)
}

async fn profile(
    State(state): State<HttpState>,
    Extension(viewer): Extension<Viewer>,
    Path(username): Path<String>,
    Query(query): Query<PageQuery>,
    uri: Uri,
) -> Response {
    let chrome = state.chrome(&viewer);
    let feed = match state
        .feed
        .profile_feed(&viewer, &username, query.number())
        .await
    {
        Ok(feed) => feed,
        Err(err) => return feed_error_to_response(&state, err, chrome, &uri),
    };

    let feed_html = match views::render_feed(&feed.posts, PROFILE_EMPTY_MESSAGE) {
        Ok(html) => html,
        Err(err) => return HttpError::from(err).into_response(),
    };
    let content = ProfileView {
        username: feed.author.username.clone(),
        post_count: feed.post_count(),
        following: feed.following,
        can_follow: can_follow(&viewer, &feed.author.username),
        feed_html,
    };
    let chrome = chrome.with_title(format!("Posts by {}", feed.author.username));
    let view = LayoutContext::new(chrome, content);
    render_template_response(ProfileTemplate { view }, StatusCode::OK)
}

async fn follow_index(
    State(state): State<HttpState>,
    Extension(viewer): Extension<Viewer>,
    Query(query): Query<PageQuery>,
    uri: Uri,
) -> Response {
    let chrome = state.chrome(&viewer);
    let page = match state.feed.follow_feed(&viewer, query.number()).await {
        Ok(page) => page,
        Err(err) => return feed_error_to_response(&state, err, chrome, &uri),
    };

    let feed_html = match views::render_feed(&page, FOLLOW_EMPTY_MESSAGE) {
        Ok(html) => html,
        Err(err) => return HttpError::from(err).into_response(),
    };
    let view = LayoutContext::new(chrome.with_title("Following"), FollowView { feed_html });
    render_template_response(FollowTemplate { view }, StatusCode::OK)
}

async fn post_detail(
    State(state): State<HttpState>,
    Extension(viewer): Extension<Viewer>,
    Path(post_id): Path<String>,
    uri: Uri,
) -> Response {
    let chrome = state.chrome(&viewer);
    let Some(post_id) = parse_post_id(&post_id) else {
        return render_not_found_response(chrome, uri.path());
    };

    let detail = match state.feed.post_detail(post_id).await {
        Ok(detail) => detail,
        Err(err) => return feed_error_to_response(&state, err, chrome, &uri),
    };

    let card = PostCard::from(&detail.post);
    let content = PostDetailView {
        can_edit: viewer
            .user()
            .is_some_and(|user| user.id == detail.post.author_id),
        can_comment: viewer.is_authenticated(),
        author_post_count: detail.author_post_count,
        comments: detail.comments.iter().map(CommentView::from).collect(),
        post: card,
    };
    let chrome = chrome.with_title(content.post.excerpt.clone());
    let view = LayoutContext::new(chrome, content);
    render_template_response(PostDetailTemplate { view }, StatusCode::OK)
}

async fn serve_media(State(state): State<HttpState>, Path(path): Path<String>) -> Response {
    const SOURCE: &str = "infra::http::public::serve_media";

    match state.upload_storage.read(&path).await {
        Ok(bytes) => build_media_response(&path, bytes),
        Err(UploadStorageError::InvalidPath) => HttpError::new(
            SOURCE,
            StatusCode::NOT_FOUND,
            "Media not found",
            "The requested file is not available",
        )
        .into_response(),
        Err(UploadStorageError::Io(err)) if err.kind() == ErrorKind::NotFound => HttpError::new(
            SOURCE,
            StatusCode::NOT_FOUND,
            "Media not found",
            "The requested file is not available",
        )
        .into_response(),
        Err(err) => {
            error!(
                target = SOURCE,
                path = %path,
                error = %err,
                "failed to read stored media"
            );
            HttpError::new(
                SOURCE,
                StatusCode::INTERNAL_SERVER_ERROR,
                "Failed to read media file",
                err.to_string(),
            )
            .into_response()
        }
    }
}

fn build_media_response(path: &str, bytes: Bytes) -> Response {
    let length = bytes.len();
    let mut response = Response::new(Body::from(bytes));
    *response.status_mut() = StatusCode::OK;

    let headers = response.headers_mut();
    let content_type = media_content_type(path);
    if let Ok(value) = HeaderValue::from_str(&content_type) {
        headers.insert(CONTENT_TYPE, value);
    }
    headers.insert(X_CONTENT_TYPE_OPTIONS, HeaderValue::from_static("nosniff"));
    if let Ok(value) = HeaderValue::from_str(&length.to_string()) {
        headers.insert(CONTENT_LENGTH, value);
    }
    headers.insert(
        CACHE_CONTROL,
        HeaderValue::from_static("public, max-age=31536000, immutable"),
    );

    response
}

/// Stored media is only ever served as an image; anything else is a download.
fn media_content_type(path: &str) -> String {
    let mime = mime_guess::from_path(path).first_or_octet_stream();
    if mime.type_() == mime_guess::mime::IMAGE && mime.subtype() != mime_guess::mime::SVG {
        mime.to_string()
    } else {
        mime_guess::mime::APPLICATION_OCTET_STREAM.to_string()
    }
}

async fn fallback_router(
    State(state): State<HttpState>,
    Extension(viewer): Extension<Viewer>,
    uri: Uri,
) -> Response {
    render_not_found_response(state.chrome(&viewer), uri.path())
}

fn feed_error_to_response(
    state: &HttpState,
    err: FeedError,
    chrome: LayoutChrome,
    uri: &Uri,
) -> Response {
    match err {
        FeedError::NotFound(_) => render_not_found_response(chrome, uri.path()),
        FeedError::Unauthenticated(_) => login_redirect(&state.auth.login_url, uri),
        FeedError::Render(err) => HttpError::from(err).into_response(),
        FeedError::Repo(err) => {
            repo_error_to_http("infra::http::public::feed", err).into_response()
        }
    }
}

async fn public_health(State(state): State<HttpState>) -> Response {
    db_health_response(state.health.health_check().await)
}
