use axum::{
    Extension,
    extract::{Path, State},
    http::Uri,
    response::{IntoResponse, Response},
};

use crate::application::follow::FollowError;
use crate::domain::viewer::Viewer;
use crate::presentation::views::render_not_found_response;

use super::{
    auth::{login_redirect, profile_location, see_other},
    public::HttpState,
    repo_error_to_http,
};

pub(super) async fn profile_follow(
    State(state): State<HttpState>,
    Extension(viewer): Extension<Viewer>,
    Path(username): Path<String>,
    uri: Uri,
) -> Response {
    match state.follows.follow(&viewer, &username).await {
        Ok(_) => see_other(&profile_location(&username)),
        Err(err) => follow_error_to_response(&state, &viewer, err, &uri),
    }
}

pub(super) async fn profile_unfollow(
    State(state): State<HttpState>,
    Extension(viewer): Extension<Viewer>,
    Path(username): Path<String>,
    uri: Uri,
) -> Response {
    match state.follows.unfollow(&viewer, &username).await {
        Ok(_) => see_other(&profile_location(&username)),
        Err(err) => follow_error_to_response(&state, &viewer, err, &uri),
    }
}

fn follow_error_to_response(
    state: &HttpState,
    viewer: &Viewer,
    err: FollowError,
    uri: &Uri,
) -> Response {
    match err {
        FollowError::NotFound => render_not_found_response(state.chrome(viewer), uri.path()),
        FollowError::Unauthenticated(_) => login_redirect(&state.auth.login_url, uri),
        FollowError::Repo(err) => {
            repo_error_to_http("infra::http::follow", err).into_response()
        }
    }
}
