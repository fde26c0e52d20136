//! Post authoring and comment handlers.

use axum::{
    Extension, Form,
    extract::{Path, State},
    http::{StatusCode, Uri},
    response::{IntoResponse, Response},
};
use axum_extra::extract::Multipart;
use serde::Deserialize;
use tracing::warn;

use crate::application::{
    error::HttpError,
    posts::{EditFormOutcome, ImageUpload, PostError, PostForm, PostFormState, PostOutcome},
};
use crate::domain::{entities::GroupRecord, viewer::Viewer};
use crate::infra::uploads::UploadStorageError;
use crate::presentation::views::{
    FormErrorsView, GroupOption, LayoutContext, PostFormTemplate, PostFormView, media_url,
    render_not_found_response, render_template_response,
};

use super::{
    auth::{login_redirect, profile_location, see_other},
    public::{HttpState, parse_post_id},
    repo_error_to_http,
};

const SOURCE: &str = "infra::http::posts";

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
pub(super) struct CommentForm {
    text: String,
}

pub(super) async fn post_create_form(
    State(state): State<HttpState>,
    Extension(viewer): Extension<Viewer>,
) -> Response {
    render_form(&state, &viewer, PostFormState::default(), None).await
}

pub(super) async fn post_create(
    State(state): State<HttpState>,
    Extension(viewer): Extension<Viewer>,
    uri: Uri,
    mut multipart: Multipart,
) -> Response {
    let form = match read_post_form(&mut multipart).await {
        Ok(form) => form,
        Err(err) => return err.into_response(),
    };

    match state.posts.create_post(&viewer, form).await {
        Ok(PostOutcome::Saved(post)) => see_other(&profile_location(&post.author_username)),
        Ok(PostOutcome::Invalid(form)) => render_form(&state, &viewer, form, None).await,
        Ok(PostOutcome::NotAuthor(post)) => see_other(&detail_location(post.id)),
        Err(err) => post_error_to_response(&state, &viewer, err, &uri),
    }
}

pub(super) async fn post_edit_form(
    State(state): State<HttpState>,
    Extension(viewer): Extension<Viewer>,
    Path(post_id): Path<String>,
    uri: Uri,
) -> Response {
    let Some(post_id) = parse_post_id(&post_id) else {
        return render_not_found_response(state.chrome(&viewer), uri.path());
    };

    match state.posts.edit_form(&viewer, post_id).await {
        Ok(EditFormOutcome::Form(form)) => render_form(&state, &viewer, form, Some(post_id)).await,
        Ok(EditFormOutcome::NotAuthor(post)) => see_other(&detail_location(post.id)),
        Err(err) => post_error_to_response(&state, &viewer, err, &uri),
    }
}

pub(super) async fn post_edit(
    State(state): State<HttpState>,
    Extension(viewer): Extension<Viewer>,
    Path(post_id): Path<String>,
    uri: Uri,
    mut multipart: Multipart,
) -> Response {
    let Some(post_id) = parse_post_id(&post_id) else {
        return render_not_found_response(state.chrome(&viewer), uri.path());
    };

    let form = match read_post_form(&mut multipart).await {
        Ok(form) => form,
        Err(err) => return err.into_response(),
    };

    match state.posts.edit_post(&viewer, post_id, form).await {
        Ok(PostOutcome::Saved(post)) | Ok(PostOutcome::NotAuthor(post)) => {
            see_other(&detail_location(post.id))
        }
        Ok(PostOutcome::Invalid(form)) => render_form(&state, &viewer, form, Some(post_id)).await,
        Err(err) => post_error_to_response(&state, &viewer, err, &uri),
    }
}

pub(super) async fn add_comment(
    State(state): State<HttpState>,
    Extension(viewer): Extension<Viewer>,
    Path(post_id): Path<String>,
    uri: Uri,
    Form(form): Form<CommentForm>,
) -> Response {
    let Some(post_id) = parse_post_id(&post_id) else {
        return render_not_found_response(state.chrome(&viewer), uri.path());
    };

    match state.posts.add_comment(&viewer, post_id, &form.text).await {
        Ok(_) => see_other(&detail_location(post_id)),
        Err(err) => post_error_to_response(&state, &viewer, err, &uri),
    }
}

fn detail_location(post_id: i64) -> String {
    format!("/posts/{post_id}/")
}

async fn render_form(
    state: &HttpState,
    viewer: &Viewer,
    form: PostFormState,
    editing: Option<i64>,
) -> Response {
    let groups = match state.posts.group_choices().await {
        Ok(groups) => groups,
        Err(err) => {
            return HttpError::from_error(
                SOURCE,
                StatusCode::INTERNAL_SERVER_ERROR,
                "Failed to load groups",
                &err,
            )
            .into_response();
        }
    };

    let (title, action) = match editing {
        Some(post_id) => ("Edit post", format!("/posts/{post_id}/edit/")),
        None => ("New post", "/create/".to_string()),
    };
    let content = form_view(form, &groups, editing.is_some(), action);
    let view = LayoutContext::new(state.chrome(viewer).with_title(title), content);
    render_template_response(PostFormTemplate { view }, StatusCode::OK)
}

fn form_view(
    form: PostFormState,
    groups: &[GroupRecord],
    is_edit: bool,
    action: String,
) -> PostFormView {
    PostFormView {
        is_edit,
        action,
        text: form.text,
        groups: groups
            .iter()
            .map(|group| GroupOption {
                id: group.id,
                title: group.title.clone(),
                selected: form.group_id == Some(group.id),
            })
            .collect(),
        current_image: form.current_image.as_deref().map(media_url),
        errors: FormErrorsView {
            text: form.errors.text,
            group: form.errors.group,
            image: form.errors.image,
        },
    }
}

async fn read_post_form(multipart: &mut Multipart) -> Result<PostForm, HttpError> {
    let mut form = PostForm::default();

    loop {
        let field = match multipart.next_field().await {
            Ok(Some(field)) => field,
            Ok(None) => break,
            Err(err) => {
                let status = err.status();
                warn!(
                    target = SOURCE,
                    status = status.as_u16(),
                    error = %err,
                    "failed to read multipart payload"
                );
                let message = if status == StatusCode::PAYLOAD_TOO_LARGE {
                    "Upload too large"
                } else {
                    "Invalid form data"
                };
                return Err(HttpError::from_error(SOURCE, status, message, &err));
            }
        };

        let name = field.name().map(str::to_string);
        match name.as_deref() {
            Some("text") => {
                form.text = field.text().await.map_err(|err| {
                    HttpError::from_error(SOURCE, err.status(), "Invalid form data", &err)
                })?;
            }
            Some("group") => {
                let value = field.text().await.map_err(|err| {
                    HttpError::from_error(SOURCE, err.status(), "Invalid form data", &err)
                })?;
                form.group = Some(value);
            }
            Some("image") => {
                let filename = field.file_name().unwrap_or_default().to_string();
                let bytes = field.bytes().await.map_err(|err| {
                    HttpError::from_error(SOURCE, err.status(), "Invalid form data", &err)
                })?;
                form.image = Some(ImageUpload { filename, bytes });
            }
            _ => continue,
        }
    }

    Ok(form)
}

fn post_error_to_response(
    state: &HttpState,
    viewer: &Viewer,
    err: PostError,
    uri: &Uri,
) -> Response {
    match err {
        PostError::NotFound(_) => render_not_found_response(state.chrome(viewer), uri.path()),
        PostError::Unauthenticated(_) => login_redirect(&state.auth.login_url, uri),
        PostError::Storage(UploadStorageError::EmptyPayload) => HttpError::new(
            SOURCE,
            StatusCode::BAD_REQUEST,
            "Uploaded file is empty",
            "image payload was empty",
        )
        .into_response(),
        PostError::Storage(err) => HttpError::from_error(
            SOURCE,
            StatusCode::INTERNAL_SERVER_ERROR,
            "Failed to store image",
            &err,
        )
        .into_response(),
        PostError::Repo(err) => repo_error_to_http(SOURCE, err).into_response(),
    }
}
