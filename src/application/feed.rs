use std::{num::NonZeroU32, sync::Arc, time::Duration};

use thiserror::Error;
use tracing::debug;

use crate::application::pagination::{Page, PageNumber, PageWindow};
use crate::application::repos::{
    CommentsRepo, FollowsRepo, GroupsRepo, PostFilter, PostsRepo, RepoError, UsersRepo,
};
use crate::cache::PageCache;
use crate::domain::entities::{CommentRecord, GroupRecord, PostRecord, UserRecord};
use crate::domain::viewer::{AuthRequired, Viewer};
use crate::presentation::views::{self, TemplateRenderError};

const HOME_EMPTY_MESSAGE: &str = "No posts yet.";

#[derive(Debug, Error)]
pub enum FeedError {
    #[error("{0} not found")]
    NotFound(&'static str),
    #[error(transparent)]
    Unauthenticated(#[from] AuthRequired),
    #[error(transparent)]
    Render(#[from] TemplateRenderError),
    #[error(transparent)]
    Repo(#[from] RepoError),
}

pub struct GroupFeed {
    pub group: GroupRecord,
    pub posts: Page<PostRecord>,
}

pub struct ProfileFeed {
    pub author: UserRecord,
    pub posts: Page<PostRecord>,
    /// Whether the viewer follows `author`; always false for anonymous viewers.
    pub following: bool,
}

impl ProfileFeed {
    pub fn post_count(&self) -> u64 {
        self.posts.window.total()
    }
}

pub struct PostDetail {
    pub post: PostRecord,
    pub comments: Vec<CommentRecord>,
    pub author_post_count: u64,
}

/// Read side of the site: every paginated feed plus the post detail view.
#[derive(Clone)]
pub struct FeedService {
    users: Arc<dyn UsersRepo>,
    groups: Arc<dyn GroupsRepo>,
    posts: Arc<dyn PostsRepo>,
    comments: Arc<dyn CommentsRepo>,
    follows: Arc<dyn FollowsRepo>,
    home_cache: Arc<dyn PageCache>,
    page_size: NonZeroU32,
    home_ttl: Duration,
}

impl FeedService {
    #[allow(clippy::too_many_arguments)]
    pub fn new(
        users: Arc<dyn UsersRepo>,
        groups: Arc<dyn GroupsRepo>,
        posts: Arc<dyn PostsRepo>,
        comments: Arc<dyn CommentsRepo>,
        follows: Arc<dyn FollowsRepo>,
        home_cache: Arc<dyn PageCache>,
        page_size: NonZeroU32,
        home_ttl: Duration,
    ) -> Self {
        Self {
            users,
            groups,
            posts,
            comments,
            follows,
            home_cache,
            page_size,
            home_ttl,
        }
    }

    /// Rendered post list and paginator of the home feed.
    ///
    /// Renderings are served from the page cache while their window lasts,
    /// regardless of later writes.
    pub async fn home_fragment(&self, page: PageNumber) -> Result<String, FeedError> {
        let key = home_cache_key(page);
        if let Some(html) = self.home_cache.get(&key) {
            debug!(target = "inkwell::feed", %key, "home feed served from cache");
            return Ok(html);
        }

        let posts = self.paginate(PostFilter::All, page).await?;
        let html = views::render_feed(&posts, HOME_EMPTY_MESSAGE)?;
        self.home_cache.set(&key, html.clone(), self.home_ttl);
        Ok(html)
    }

    pub fn clear_home_cache(&self) {
        self.home_cache.clear();
    }

    pub async fn group_feed(&self, slug: &str, page: PageNumber) -> Result<GroupFeed, FeedError> {
        let group = self
            .groups
            .find_by_slug(slug)
            .await?
            .ok_or(FeedError::NotFound("group"))?;
        let posts = self.paginate(PostFilter::Group(group.id), page).await?;
        Ok(GroupFeed { group, posts })
    }

    pub async fn profile_feed(
        &self,
        viewer: &Viewer,
        username: &str,
        page: PageNumber,
    ) -> Result<ProfileFeed, FeedError> {
        let author = self
            .users
            .find_by_username(username)
            .await?
            .ok_or(FeedError::NotFound("user"))?;
        let posts = self.paginate(PostFilter::Author(author.id), page).await?;
        let following = match viewer.user() {
            Some(user) => self.follows.is_following(user.id, author.id).await?,
            None => false,
        };

        Ok(ProfileFeed {
            author,
            posts,
            following,
        })
    }

    /// Posts by every author the viewer follows. Empty when the viewer follows nobody.
    pub async fn follow_feed(
        &self,
        viewer: &Viewer,
        page: PageNumber,
    ) -> Result<Page<PostRecord>, FeedError> {
        let user = viewer.require_user()?;
        self.paginate(PostFilter::FollowedBy(user.id), page).await
    }

    pub async fn post_detail(&self, post_id: i64) -> Result<PostDetail, FeedError> {
        let post = self
            .posts
            .find_by_id(post_id)
            .await?
            .ok_or(FeedError::NotFound("post"))?;
        let comments = self.comments.list_for_post(post.id).await?;
        let author_post_count = self
            .posts
            .count_posts(PostFilter::Author(post.author_id))
            .await?;

        Ok(PostDetail {
            post,
            comments,
            author_post_count,
        })
    }

    async fn paginate(
        &self,
        filter: PostFilter,
        page: PageNumber,
    ) -> Result<Page<PostRecord>, FeedError> {
        let total = self.posts.count_posts(filter).await?;
        let window = PageWindow::resolve(total, self.page_size, page);
        let items = if window.is_empty() {
            Vec::new()
        } else {
            self.posts
                .list_posts(filter, window.offset(), window.limit())
                .await?
        };
        Ok(Page::new(items, window))
    }
}

fn home_cache_key(page: PageNumber) -> String {
    format!("home:page={}", page.cache_label())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn cache_key_varies_by_requested_page() {
        assert_eq!(home_cache_key(PageNumber::Number(1)), "home:page=1");
        assert_eq!(home_cache_key(PageNumber::Last), "home:page=last");
        assert_ne!(
            home_cache_key(PageNumber::Number(1)),
            home_cache_key(PageNumber::Number(2))
        );
    }
}
