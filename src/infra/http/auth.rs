//! Request identity: the authenticating proxy asserts a username in a header.

use axum::{
    body::Body,
    extract::State,
    http::{HeaderValue, Request, StatusCode, Uri, header::LOCATION},
    middleware::Next,
    response::{IntoResponse, Response},
};
use url::form_urlencoded;

use crate::application::{error::HttpError, users::UserError};
use crate::domain::viewer::Viewer;

use super::{public::HttpState, repo_error_to_http};

const SOURCE: &str = "infra::http::auth::resolve_viewer";

/// Attach the request's [`Viewer`] to the request and response extensions.
pub async fn resolve_viewer(
    State(state): State<HttpState>,
    mut request: Request<Body>,
    next: Next,
) -> Response {
    let asserted = request
        .headers()
        .get(&state.auth.user_header)
        .and_then(|value| value.to_str().ok())
        .map(str::to_string);

    let viewer = match state.users.identify(asserted.as_deref()).await {
        Ok(viewer) => viewer,
        Err(UserError::Repo(err)) => return repo_error_to_http(SOURCE, err).into_response(),
        Err(err) => {
            return HttpError::from_error(
                SOURCE,
                StatusCode::INTERNAL_SERVER_ERROR,
                "Failed to resolve identity",
                &err,
            )
            .into_response();
        }
    };

    request.extensions_mut().insert(viewer.clone());
    let mut response = next.run(request).await;
    response.extensions_mut().insert(viewer);
    response
}

/// Route guard for pages that need a signed-in viewer.
///
/// Runs before the handler's extractors, so an anonymous request is redirected
/// to the login page whatever body it carries.
pub async fn require_login(
    State(state): State<HttpState>,
    request: Request<Body>,
    next: Next,
) -> Response {
    let signed_in = request
        .extensions()
        .get::<Viewer>()
        .is_some_and(Viewer::is_authenticated);
    if !signed_in {
        return login_redirect(&state.auth.login_url, request.uri());
    }
    next.run(request).await
}

/// 303 redirect to `location`.
pub fn see_other(location: &str) -> Response {
    let mut response = StatusCode::SEE_OTHER.into_response();
    if let Ok(value) = HeaderValue::from_str(location) {
        response.headers_mut().insert(LOCATION, value);
    }
    response
}

/// Send an anonymous visitor to the login page, remembering where they were headed.
pub fn login_redirect(login_url: &str, uri: &Uri) -> Response {
    see_other(&login_location(login_url, uri))
}

fn login_location(login_url: &str, uri: &Uri) -> String {
    let next = uri
        .path_and_query()
        .map(|value| value.as_str())
        .unwrap_or("/");
    let query = form_urlencoded::Serializer::new(String::new())
        .append_pair("next", next)
        .finish();
    let separator = if login_url.contains('?') { '&' } else { '?' };
    format!("{login_url}{separator}{query}")
}

/// Profile path for `username`, percent-encoded for a `Location` header.
pub fn profile_location(username: &str) -> String {
    let segment: String = form_urlencoded::byte_serialize(username.as_bytes()).collect();
    format!("/profile/{segment}/")
}

/// Whether a signed-in viewer other than `username` is looking at the page.
pub fn can_follow(viewer: &Viewer, username: &str) -> bool {
    viewer
        .username()
        .is_some_and(|current| current != username)
}
