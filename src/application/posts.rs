//! Post authoring and commenting.

use std::{path::Path, sync::Arc};

use bytes::Bytes;
use imagesize::ImageType;
use metrics::counter;
use thiserror::Error;
use tracing::{info, warn};

use crate::application::repos::{
    CommentsWriteRepo, CreateCommentParams, CreatePostParams, GroupsRepo, PostsRepo,
    PostsWriteRepo, RepoError, UpdatePostParams,
};
use crate::domain::entities::{CommentRecord, GroupRecord, PostRecord};
use crate::domain::posts::{TEXT_REQUIRED, normalize_text};
use crate::domain::viewer::{AuthRequired, Viewer};
use crate::infra::uploads::{POST_IMAGE_NAMESPACE, UploadStorage, UploadStorageError};

pub const INVALID_GROUP_CHOICE: &str =
    "Select a valid choice. That choice is not one of the available choices.";
pub const INVALID_IMAGE: &str =
    "Upload a valid image. The file you uploaded was either not an image or a corrupted image.";
pub const EMPTY_IMAGE: &str = "The submitted file is empty.";
pub const INVALID_IMAGE_EXTENSION: &str =
    "File extension is not allowed. Allowed extensions are: bmp, gif, jpeg, jpg, png, webp.";

const IMAGE_EXTENSIONS: &[&str] = &["bmp", "gif", "jpeg", "jpg", "png", "webp"];

#[derive(Debug, Error)]
pub enum PostError {
    #[error("{0} not found")]
    NotFound(&'static str),
    #[error(transparent)]
    Unauthenticated(#[from] AuthRequired),
    #[error("failed to store image: {0}")]
    Storage(#[from] UploadStorageError),
    #[error(transparent)]
    Repo(#[from] RepoError),
}

#[derive(Debug, Clone)]
pub struct ImageUpload {
    pub filename: String,
    pub bytes: Bytes,
}

/// Values submitted through the post form.
#[derive(Debug, Clone, Default)]
pub struct PostForm {
    pub text: String,
    /// Raw value of the group select; empty means no group.
    pub group: Option<String>,
    pub image: Option<ImageUpload>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PostFormErrors {
    pub text: Vec<String>,
    pub group: Vec<String>,
    pub image: Vec<String>,
}

impl PostFormErrors {
    pub fn is_empty(&self) -> bool {
        self.text.is_empty() && self.group.is_empty() && self.image.is_empty()
    }
}

/// What the form shows when it is rendered again.
#[derive(Debug, Clone, Default)]
pub struct PostFormState {
    pub text: String,
    pub group_id: Option<i64>,
    pub current_image: Option<String>,
    pub errors: PostFormErrors,
}

impl PostFormState {
    pub fn for_post(post: &PostRecord) -> Self {
        Self {
            text: post.text.clone(),
            group_id: post.group.as_ref().map(|group| group.id),
            current_image: post.image.clone(),
            errors: PostFormErrors::default(),
        }
    }
}

#[derive(Debug)]
pub enum PostOutcome {
    Saved(PostRecord),
    Invalid(PostFormState),
    /// The viewer may not edit this post; nothing was changed.
    NotAuthor(PostRecord),
}

#[derive(Debug)]
pub enum EditFormOutcome {
    Form(PostFormState),
    NotAuthor(PostRecord),
}

#[derive(Debug)]
pub enum CommentOutcome {
    Created(CommentRecord),
    Discarded,
}

struct ValidatedPost {
    text: String,
    group_id: Option<i64>,
    image: Option<ImageUpload>,
}

#[derive(Clone)]
pub struct PostService {
    groups: Arc<dyn GroupsRepo>,
    posts: Arc<dyn PostsRepo>,
    writer: Arc<dyn PostsWriteRepo>,
    comments: Arc<dyn CommentsWriteRepo>,
    uploads: Arc<UploadStorage>,
}

impl PostService {
    pub fn new(
        groups: Arc<dyn GroupsRepo>,
        posts: Arc<dyn PostsRepo>,
        writer: Arc<dyn PostsWriteRepo>,
        comments: Arc<dyn CommentsWriteRepo>,
        uploads: Arc<UploadStorage>,
    ) -> Self {
        Self {
            groups,
            posts,
            writer,
            comments,
            uploads,
        }
    }

    /// Groups offered by the group select, in title order.
    pub async fn group_choices(&self) -> Result<Vec<GroupRecord>, PostError> {
        Ok(self.groups.list_groups().await?)
    }

    pub async fn create_post(
        &self,
        viewer: &Viewer,
        form: PostForm,
    ) -> Result<PostOutcome, PostError> {
        let user = viewer.require_user()?;

        let validated = match self.validate(&form).await? {
            Ok(validated) => validated,
            Err(errors) => {
                return Ok(PostOutcome::Invalid(rejected_state(&form, None, errors)));
            }
        };

        let image = self.store_image(validated.image).await?;
        let created = self
            .writer
            .create_post(CreatePostParams {
                author_id: user.id,
                text: validated.text,
                group_id: validated.group_id,
                image: image.clone(),
            })
            .await;
        let post = match created {
            Ok(post) => post,
            Err(err) => {
                if let Some(stored) = image.as_deref() {
                    self.discard_image(stored).await;
                }
                return Err(err.into());
            }
        };

        counter!("inkwell_posts_created_total").increment(1);
        info!(
            target = "inkwell::posts",
            post_id = post.id,
            author = %user.username,
            "post created"
        );
        Ok(PostOutcome::Saved(post))
    }

    /// Pre-filled form for the post's author.
    pub async fn edit_form(
        &self,
        viewer: &Viewer,
        post_id: i64,
    ) -> Result<EditFormOutcome, PostError> {
        let user = viewer.require_user()?;
        let post = self.find_post(post_id).await?;
        if post.author_id != user.id {
            return Ok(EditFormOutcome::NotAuthor(post));
        }
        Ok(EditFormOutcome::Form(PostFormState::for_post(&post)))
    }

    /// Replace text, group and image of an existing post. Without a new image the
    /// stored one is kept.
    pub async fn edit_post(
        &self,
        viewer: &Viewer,
        post_id: i64,
        form: PostForm,
    ) -> Result<PostOutcome, PostError> {
        let user = viewer.require_user()?;
        let post = self.find_post(post_id).await?;
        if post.author_id != user.id {
            return Ok(PostOutcome::NotAuthor(post));
        }

        let validated = match self.validate(&form).await? {
            Ok(validated) => validated,
            Err(errors) => {
                return Ok(PostOutcome::Invalid(rejected_state(
                    &form,
                    post.image.clone(),
                    errors,
                )));
            }
        };

        let replacement = self.store_image(validated.image).await?;
        let image = replacement.clone().or_else(|| post.image.clone());
        let updated = match self
            .writer
            .update_post(UpdatePostParams {
                id: post.id,
                text: validated.text,
                group_id: validated.group_id,
                image,
            })
            .await
        {
            Ok(updated) => updated,
            Err(err) => {
                if let Some(stored) = replacement.as_deref() {
                    self.discard_image(stored).await;
                }
                return Err(err.into());
            }
        };

        if let (Some(_), Some(previous)) = (replacement, post.image.as_deref()) {
            self.discard_image(previous).await;
        }

        info!(
            target = "inkwell::posts",
            post_id = updated.id,
            author = %user.username,
            "post updated"
        );
        Ok(PostOutcome::Saved(updated))
    }

    /// Attach a comment to a post. Blank comments are dropped without an error.
    pub async fn add_comment(
        &self,
        viewer: &Viewer,
        post_id: i64,
        text: &str,
    ) -> Result<CommentOutcome, PostError> {
        let user = viewer.require_user()?;
        let post = self.find_post(post_id).await?;

        let Ok(text) = normalize_text(text) else {
            return Ok(CommentOutcome::Discarded);
        };

        let comment = self
            .comments
            .create_comment(CreateCommentParams {
                post_id: post.id,
                author_id: user.id,
                text,
            })
            .await?;

        counter!("inkwell_comments_created_total").increment(1);
        info!(
            target = "inkwell::posts",
            post_id = post.id,
            author = %user.username,
            "comment added"
        );
        Ok(CommentOutcome::Created(comment))
    }

    async fn find_post(&self, post_id: i64) -> Result<PostRecord, PostError> {
        self.posts
            .find_by_id(post_id)
            .await?
            .ok_or(PostError::NotFound("post"))
    }

    async fn validate(
        &self,
        form: &PostForm,
    ) -> Result<Result<ValidatedPost, PostFormErrors>, PostError> {
        let mut errors = PostFormErrors::default();

        let text = match normalize_text(&form.text) {
            Ok(text) => Some(text),
            Err(_) => {
                errors.text.push(TEXT_REQUIRED.to_string());
                None
            }
        };

        let group_id = match parse_group_choice(form.group.as_deref()) {
            Ok(None) => None,
            Ok(Some(id)) => match self.groups.find_by_id(id).await? {
                Some(group) => Some(group.id),
                None => {
                    errors.group.push(INVALID_GROUP_CHOICE.to_string());
                    None
                }
            },
            Err(()) => {
                errors.group.push(INVALID_GROUP_CHOICE.to_string());
                None
            }
        };

        let image = match submitted_image(form.image.as_ref()) {
            Ok(image) => image,
            Err(message) => {
                errors.image.push(message.to_string());
                None
            }
        };

        match text {
            Some(text) if errors.is_empty() => Ok(Ok(ValidatedPost {
                text,
                group_id,
                image,
            })),
            _ => Ok(Err(errors)),
        }
    }

    async fn store_image(&self, image: Option<ImageUpload>) -> Result<Option<String>, PostError> {
        let Some(image) = image else {
            return Ok(None);
        };
        let stored = self
            .uploads
            .store(POST_IMAGE_NAMESPACE, &image.filename, image.bytes)
            .await?;
        info!(
            target = "inkwell::uploads",
            path = %stored.stored_path,
            size = stored.size_bytes,
            checksum = %stored.checksum,
            "post image stored"
        );
        Ok(Some(stored.stored_path))
    }

    /// Best-effort removal of an image no post refers to.
    async fn discard_image(&self, stored_path: &str) {
        if let Err(err) = self.uploads.delete(stored_path).await {
            warn!(
                target = "inkwell::uploads",
                path = %stored_path,
                error = %err,
                "failed to remove unreferenced post image"
            );
        }
    }
}

fn rejected_state(
    form: &PostForm,
    current_image: Option<String>,
    errors: PostFormErrors,
) -> PostFormState {
    PostFormState {
        text: form.text.clone(),
        group_id: parse_group_choice(form.group.as_deref()).ok().flatten(),
        current_image,
        errors,
    }
}

/// `Ok(None)` for an empty select, `Err` for anything that is not an id.
fn parse_group_choice(raw: Option<&str>) -> Result<Option<i64>, ()> {
    match raw.map(str::trim) {
        None | Some("") => Ok(None),
        Some(value) => value.parse::<i64>().map(Some).map_err(|_| ()),
    }
}

/// A file input left blank arrives as an empty part with no name.
///
/// Accepted uploads are renamed after the format found in their bytes, so the
/// stored extension (and the content type media is served with) never comes
/// from the client.
fn submitted_image(image: Option<&ImageUpload>) -> Result<Option<ImageUpload>, &'static str> {
    let Some(image) = image else {
        return Ok(None);
    };
    if image.bytes.is_empty() {
        return if image.filename.is_empty() {
            Ok(None)
        } else {
            Err(EMPTY_IMAGE)
        };
    }

    let name = Path::new(&image.filename);
    let claimed = name
        .extension()
        .and_then(|ext| ext.to_str())
        .map(str::to_ascii_lowercase);
    if !claimed.is_some_and(|ext| IMAGE_EXTENSIONS.contains(&ext.as_str())) {
        return Err(INVALID_IMAGE_EXTENSION);
    }

    let detected = imagesize::image_type(&image.bytes)
        .ok()
        .and_then(stored_extension)
        .ok_or(INVALID_IMAGE)?;
    imagesize::blob_size(&image.bytes).map_err(|_| INVALID_IMAGE)?;

    let stem = name
        .file_stem()
        .and_then(|stem| stem.to_str())
        .unwrap_or("image");
    Ok(Some(ImageUpload {
        filename: format!("{stem}.{detected}"),
        bytes: image.bytes.clone(),
    }))
}

fn stored_extension(kind: ImageType) -> Option<&'static str> {
    match kind {
        ImageType::Bmp => Some("bmp"),
        ImageType::Gif => Some("gif"),
        ImageType::Jpeg => Some("jpg"),
        ImageType::Png => Some("png"),
        ImageType::Webp => Some("webp"),
        _ => None,
    }
}
