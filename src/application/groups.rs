use std::sync::Arc;

use thiserror::Error;
use tracing::info;

use crate::application::repos::{CreateGroupParams, GroupsRepo, GroupsWriteRepo, RepoError};
use crate::domain::{self, entities::GroupRecord, error::DomainError};

#[derive(Debug, Error)]
pub enum GroupError {
    #[error(transparent)]
    Domain(#[from] DomainError),
    #[error("group slug `{0}` is already taken")]
    SlugTaken(String),
    #[error("group not found")]
    NotFound,
    #[error(transparent)]
    Repo(#[from] RepoError),
}

#[derive(Debug, Clone)]
pub struct CreateGroupCommand {
    pub title: String,
    pub slug: Option<String>,
    pub description: String,
}

/// Operator-facing management of groups.
#[derive(Clone)]
pub struct GroupService {
    reader: Arc<dyn GroupsRepo>,
    writer: Arc<dyn GroupsWriteRepo>,
}

impl GroupService {
    pub fn new(reader: Arc<dyn GroupsRepo>, writer: Arc<dyn GroupsWriteRepo>) -> Self {
        Self { reader, writer }
    }

    pub async fn list(&self) -> Result<Vec<GroupRecord>, GroupError> {
        Ok(self.reader.list_groups().await?)
    }

    /// Create a group, deriving the slug from the title when none is given.
    pub async fn create(&self, command: CreateGroupCommand) -> Result<GroupRecord, GroupError> {
        let title = domain::groups::validate_title(&command.title)?;
        let slug = match command
            .slug
            .as_deref()
            .map(str::trim)
            .filter(|slug| !slug.is_empty())
        {
            Some(slug) => slug.to_string(),
            None => domain::groups::derive_slug(&title)?,
        };
        domain::groups::validate_slug(&slug)?;

        let params = CreateGroupParams {
            title,
            slug: slug.clone(),
            description: command.description.trim().to_string(),
        };
        let group = match self.writer.create_group(params).await {
            Ok(group) => group,
            Err(RepoError::Duplicate { .. }) => return Err(GroupError::SlugTaken(slug)),
            Err(err) => return Err(err.into()),
        };

        info!(
            target = "inkwell::groups",
            group_id = group.id,
            slug = %group.slug,
            "group created"
        );
        Ok(group)
    }

    /// Delete a group; its posts stay published without a group.
    pub async fn delete(&self, slug: &str) -> Result<(), GroupError> {
        if !self.writer.delete_group(slug).await? {
            return Err(GroupError::NotFound);
        }
        info!(target = "inkwell::groups", %slug, "group deleted");
        Ok(())
    }
}
