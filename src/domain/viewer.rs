//! The identity a request is served for.

use thiserror::Error;

use super::entities::UserRecord;

#[derive(Debug, Error, Clone, Copy, PartialEq, Eq)]
#[error("authentication required")]
pub struct AuthRequired;

#[derive(Debug, Clone, Default)]
pub enum Viewer {
    #[default]
    Anonymous,
    Authenticated(UserRecord),
}

impl Viewer {
    pub fn user(&self) -> Option<&UserRecord> {
        match self {
            Viewer::Anonymous => None,
            Viewer::Authenticated(user) => Some(user),
        }
    }

    pub fn require_user(&self) -> Result<&UserRecord, AuthRequired> {
        self.user().ok_or(AuthRequired)
    }

    pub fn is_authenticated(&self) -> bool {
        self.user().is_some()
    }

    pub fn username(&self) -> Option<&str> {
        self.user().map(|user| user.username.as_str())
    }
}
