use std::sync::Arc;

use thiserror::Error;
use tracing::{info, warn};

use crate::application::repos::{RepoError, UsersWriteRepo};
use crate::domain::{users::validate_username, viewer::Viewer};

#[derive(Debug, Error)]
pub enum UserError {
    #[error("user not found")]
    NotFound,
    #[error(transparent)]
    Repo(#[from] RepoError),
}

/// Resolves request identities and manages accounts.
#[derive(Clone)]
pub struct UserService {
    users: Arc<dyn UsersWriteRepo>,
}

impl UserService {
    pub fn new(users: Arc<dyn UsersWriteRepo>) -> Self {
        Self { users }
    }

    /// Turn the identity asserted by the authenticating proxy into a viewer.
    ///
    /// Unknown usernames are provisioned on first sight. A missing, blank or
    /// malformed identity yields an anonymous viewer.
    pub async fn identify(&self, asserted: Option<&str>) -> Result<Viewer, UserError> {
        let Some(raw) = asserted.filter(|value| !value.trim().is_empty()) else {
            return Ok(Viewer::Anonymous);
        };

        let username = match validate_username(raw) {
            Ok(username) => username,
            Err(err) => {
                warn!(target = "inkwell::auth", error = %err, "ignoring malformed identity");
                return Ok(Viewer::Anonymous);
            }
        };

        let user = self.users.get_or_create_user(username).await?;
        Ok(Viewer::Authenticated(user))
    }

    /// Remove a user with all of their posts, comments and follow edges.
    pub async fn delete_user(&self, username: &str) -> Result<(), UserError> {
        if !self.users.delete_user(username).await? {
            return Err(UserError::NotFound);
        }
        info!(target = "inkwell::users", %username, "user deleted");
        Ok(())
    }
}
