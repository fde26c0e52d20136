use std::sync::Arc;

use thiserror::Error;
use tracing::info;

use crate::application::repos::{FollowsWriteRepo, RepoError, UsersRepo};
use crate::domain::entities::UserRecord;
use crate::domain::viewer::{AuthRequired, Viewer};

#[derive(Debug, Error)]
pub enum FollowError {
    #[error("user not found")]
    NotFound,
    #[error(transparent)]
    Unauthenticated(#[from] AuthRequired),
    #[error(transparent)]
    Repo(#[from] RepoError),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FollowOutcome {
    Created,
    AlreadyFollowing,
    SelfFollow,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UnfollowOutcome {
    Removed,
    NotFollowing,
}

/// Maintains the follower graph between users.
#[derive(Clone)]
pub struct FollowService {
    users: Arc<dyn UsersRepo>,
    follows: Arc<dyn FollowsWriteRepo>,
}

impl FollowService {
    pub fn new(users: Arc<dyn UsersRepo>, follows: Arc<dyn FollowsWriteRepo>) -> Self {
        Self { users, follows }
    }

    /// Follow `username`. Following yourself or an author you already follow changes nothing.
    pub async fn follow(
        &self,
        viewer: &Viewer,
        username: &str,
    ) -> Result<FollowOutcome, FollowError> {
        let user = viewer.require_user()?;
        let author = self.resolve_author(username).await?;

        if author.id == user.id {
            return Ok(FollowOutcome::SelfFollow);
        }

        if self.follows.follow(user.id, author.id).await? {
            info!(
                target = "inkwell::follow",
                follower = %user.username,
                author = %author.username,
                "follow created"
            );
            Ok(FollowOutcome::Created)
        } else {
            Ok(FollowOutcome::AlreadyFollowing)
        }
    }

    pub async fn unfollow(
        &self,
        viewer: &Viewer,
        username: &str,
    ) -> Result<UnfollowOutcome, FollowError> {
        let user = viewer.require_user()?;
        let author = self.resolve_author(username).await?;

        if self.follows.unfollow(user.id, author.id).await? {
            info!(
                target = "inkwell::follow",
                follower = %user.username,
                author = %author.username,
                "follow removed"
            );
            Ok(UnfollowOutcome::Removed)
        } else {
            Ok(UnfollowOutcome::NotFollowing)
        }
    }

    async fn resolve_author(&self, username: &str) -> Result<UserRecord, FollowError> {
        self.users
            .find_by_username(username)
            .await?
            .ok_or(FollowError::NotFound)
    }
}
