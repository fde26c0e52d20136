use crate::application::error::{ErrorReport, HttpError};
use crate::application::pagination::{Page, PageWindow};
use crate::domain::entities::{CommentRecord, GroupRecord, PostRecord};
use crate::domain::posts::excerpt;
use crate::domain::viewer::Viewer;
use askama::{Error as AskamaError, Template};
use axum::{
    http::StatusCode,
    response::{Html, IntoResponse, Response},
};
use thiserror::Error;
use time::{
    OffsetDateTime, format_description::well_known::Rfc3339, macros::format_description,
};

/// Public URL prefix stored media is served under.
pub const MEDIA_URL_PREFIX: &str = "/media/";

const SITE_TITLE: &str = "Inkwell";

#[derive(Debug, Error)]
#[error("{public_message}")]
pub struct TemplateRenderError {
    pub(crate) source: &'static str,
    pub(crate) public_message: &'static str,
    #[source]
    pub(crate) error: AskamaError,
}

impl TemplateRenderError {
    pub fn new(source: &'static str, public_message: &'static str, error: AskamaError) -> Self {
        Self {
            source,
            public_message,
            error,
        }
    }
}

impl From<TemplateRenderError> for HttpError {
    fn from(err: TemplateRenderError) -> Self {
        let TemplateRenderError {
            source,
            public_message,
            error,
        } = err;

        HttpError::from_error(
            source,
            StatusCode::INTERNAL_SERVER_ERROR,
            public_message,
            &error,
        )
    }
}

/// Render a template to a string, tagging failures with `source`.
pub fn render_to_string<T: Template>(
    template: &T,
    source: &'static str,
) -> Result<String, TemplateRenderError> {
    template
        .render()
        .map_err(|err| TemplateRenderError::new(source, "Template rendering failed", err))
}

pub fn render_template<T: Template>(template: T) -> Result<Html<String>, HttpError> {
    render_to_string(&template, "presentation::views::render_template")
        .map(Html)
        .map_err(HttpError::from)
}

pub fn render_template_response<T: Template>(template: T, status: StatusCode) -> Response {
    match render_template(template) {
        Ok(html) => (status, html).into_response(),
        Err(err) => err.into_response(),
    }
}

pub fn render_not_found_response(chrome: LayoutChrome, path: &str) -> Response {
    let content = ErrorPageView::not_found(path);
    let view = LayoutContext::new(chrome.with_title("Page not found"), content);
    let mut response = render_template_response(ErrorTemplate { view }, StatusCode::NOT_FOUND);
    ErrorReport::from_message(
        "presentation::views::render_not_found_response",
        StatusCode::NOT_FOUND,
        format!("no resource at `{path}`"),
    )
    .attach(&mut response);
    response
}

#[derive(Clone)]
pub struct NavigationLinkView {
    pub label: String,
    pub href: String,
}

#[derive(Clone)]
pub struct LayoutChrome {
    pub site_title: String,
    pub title: String,
    pub viewer: Option<String>,
    pub navigation: Vec<NavigationLinkView>,
}

impl LayoutChrome {
    /// Navigation for the current viewer; anonymous visitors get a login link.
    pub fn for_viewer(viewer: &Viewer, login_url: &str) -> Self {
        let mut navigation = vec![NavigationLinkView {
            label: "Home".to_string(),
            href: "/".to_string(),
        }];

        match viewer.username() {
            Some(username) => {
                navigation.push(NavigationLinkView {
                    label: "Following".to_string(),
                    href: "/follow/".to_string(),
                });
                navigation.push(NavigationLinkView {
                    label: "New post".to_string(),
                    href: "/create/".to_string(),
                });
                navigation.push(NavigationLinkView {
                    label: "My profile".to_string(),
                    href: format!("/profile/{username}/"),
                });
            }
            None => navigation.push(NavigationLinkView {
                label: "Log in".to_string(),
                href: login_url.to_string(),
            }),
        }

        Self {
            site_title: SITE_TITLE.to_string(),
            title: SITE_TITLE.to_string(),
            viewer: viewer.username().map(str::to_string),
            navigation,
        }
    }

    pub fn with_title(self, title: impl Into<String>) -> Self {
        Self {
            title: format!("{} | {}", title.into(), self.site_title),
            ..self
        }
    }
}

#[derive(Clone)]
pub struct LayoutContext<T> {
    pub site_title: String,
    pub title: String,
    pub viewer: Option<String>,
    pub navigation: Vec<NavigationLinkView>,
    pub content: T,
}

impl<T> LayoutContext<T> {
    pub fn new(chrome: LayoutChrome, content: T) -> Self {
        Self {
            site_title: chrome.site_title,
            title: chrome.title,
            viewer: chrome.viewer,
            navigation: chrome.navigation,
            content,
        }
    }
}

#[derive(Clone)]
pub struct GroupBadge {
    pub slug: String,
    pub title: String,
}

#[derive(Clone)]
pub struct PostCard {
    pub id: i64,
    pub text: String,
    pub excerpt: String,
    pub author: String,
    pub group: Option<GroupBadge>,
    pub image_url: Option<String>,
    pub published: String,
    pub iso_date: String,
}

impl From<&PostRecord> for PostCard {
    fn from(post: &PostRecord) -> Self {
        Self {
            id: post.id,
            text: post.text.clone(),
            excerpt: excerpt(&post.text),
            author: post.author_username.clone(),
            group: post.group.as_ref().map(|group| GroupBadge {
                slug: group.slug.clone(),
                title: group.title.clone(),
            }),
            image_url: post.image.as_deref().map(media_url),
            published: display_date(post.created_at),
            iso_date: iso_date(post.created_at),
        }
    }
}

#[derive(Clone)]
pub struct PageLink {
    pub number: u64,
    pub is_current: bool,
}

#[derive(Clone)]
pub struct PaginatorView {
    pub number: u64,
    pub num_pages: u64,
    pub previous: Option<u64>,
    pub next: Option<u64>,
    pub pages: Vec<PageLink>,
}

impl PaginatorView {
    pub fn is_paginated(&self) -> bool {
        self.num_pages > 1
    }
}

impl From<&PageWindow> for PaginatorView {
    fn from(window: &PageWindow) -> Self {
        Self {
            number: window.number(),
            num_pages: window.num_pages(),
            previous: window.previous_number(),
            next: window.next_number(),
            pages: (1..=window.num_pages())
                .map(|number| PageLink {
                    number,
                    is_current: number == window.number(),
                })
                .collect(),
        }
    }
}

pub struct FeedView {
    pub posts: Vec<PostCard>,
    pub paginator: PaginatorView,
    pub empty_message: &'static str,
}

/// The post list and paginator shared by every feed page.
#[derive(Template)]
#[template(path = "partials/feed.html")]
pub struct FeedFragmentTemplate {
    pub feed: FeedView,
}

/// Render one page of posts with its paginator.
pub fn render_feed(
    page: &Page<PostRecord>,
    empty_message: &'static str,
) -> Result<String, TemplateRenderError> {
    let template = FeedFragmentTemplate {
        feed: FeedView {
            posts: page.items.iter().map(PostCard::from).collect(),
            paginator: PaginatorView::from(&page.window),
            empty_message,
        },
    };
    render_to_string(&template, "presentation::views::render_feed")
}

pub struct HomeView {
    pub feed_html: String,
}

#[derive(Template)]
#[template(path = "index.html")]
pub struct IndexTemplate {
    pub view: LayoutContext<HomeView>,
}

pub struct GroupView {
    pub title: String,
    pub slug: String,
    pub description: String,
    pub feed_html: String,
}

impl GroupView {
    pub fn new(group: &GroupRecord, feed_html: String) -> Self {
        Self {
            title: group.title.clone(),
            slug: group.slug.clone(),
            description: group.description.clone(),
            feed_html,
        }
    }
}

#[derive(Template)]
#[template(path = "group.html")]
pub struct GroupTemplate {
    pub view: LayoutContext<GroupView>,
}

pub struct ProfileView {
    pub username: String,
    pub post_count: u64,
    pub following: bool,
    /// Follow controls are shown to signed-in visitors looking at someone else.
    pub can_follow: bool,
    pub feed_html: String,
}

#[derive(Template)]
#[template(path = "profile.html")]
pub struct ProfileTemplate {
    pub view: LayoutContext<ProfileView>,
}

pub struct FollowView {
    pub feed_html: String,
}

#[derive(Template)]
#[template(path = "follow.html")]
pub struct FollowTemplate {
    pub view: LayoutContext<FollowView>,
}

pub struct CommentView {
    pub author: String,
    pub text: String,
    pub published: String,
}

impl From<&CommentRecord> for CommentView {
    fn from(comment: &CommentRecord) -> Self {
        Self {
            author: comment.author_username.clone(),
            text: comment.text.clone(),
            published: display_date(comment.created_at),
        }
    }
}

pub struct PostDetailView {
    pub post: PostCard,
    pub author_post_count: u64,
    pub comments: Vec<CommentView>,
    pub can_edit: bool,
    pub can_comment: bool,
}

#[derive(Template)]
#[template(path = "post_detail.html")]
pub struct PostDetailTemplate {
    pub view: LayoutContext<PostDetailView>,
}

pub struct GroupOption {
    pub id: i64,
    pub title: String,
    pub selected: bool,
}

#[derive(Default)]
pub struct FormErrorsView {
    pub text: Vec<String>,
    pub group: Vec<String>,
    pub image: Vec<String>,
}

impl FormErrorsView {
    pub fn is_empty(&self) -> bool {
        self.text.is_empty() && self.group.is_empty() && self.image.is_empty()
    }
}

pub struct PostFormView {
    pub is_edit: bool,
    pub action: String,
    pub text: String,
    pub groups: Vec<GroupOption>,
    pub current_image: Option<String>,
    pub errors: FormErrorsView,
}

#[derive(Template)]
#[template(path = "post_form.html")]
pub struct PostFormTemplate {
    pub view: LayoutContext<PostFormView>,
}

pub struct ErrorPageView {
    pub title: String,
    pub message: String,
    pub path: String,
}

impl ErrorPageView {
    pub fn not_found(path: &str) -> Self {
        Self {
            title: "Page not found".to_string(),
            message: "The page you requested does not exist.".to_string(),
            path: path.to_string(),
        }
    }
}

#[derive(Template)]
#[template(path = "error.html")]
pub struct ErrorTemplate {
    pub view: LayoutContext<ErrorPageView>,
}

pub fn media_url(stored_path: &str) -> String {
    format!("{MEDIA_URL_PREFIX}{stored_path}")
}

fn display_date(value: OffsetDateTime) -> String {
    value
        .format(format_description!("[day] [month repr:short] [year]"))
        .unwrap_or_default()
}

fn iso_date(value: OffsetDateTime) -> String {
    value.format(&Rfc3339).unwrap_or_default()
}
