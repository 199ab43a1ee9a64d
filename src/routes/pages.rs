use axum::{
    extract::{OriginalUri, State},
    response::{Html, IntoResponse, Redirect, Response},
    routing::get,
    Router,
};
use axum::http::{header::AUTHORIZATION, HeaderMap};
use axum_extra::{headers::Cookie, typed_header::TypedHeader};

use crate::state::AppState;

const SESSION_COOKIE_NAME: &str = "session";

/// Browser-facing shell pages. The landing and privacy pages stay public;
/// everything else bounces unauthenticated navigations to the sign-in page
/// with a `redirect_url` pointing back at the original destination.
pub fn page_router() -> Router<AppState> {
    Router::new()
        .route("/", get(landing))
        .route("/privacy", get(privacy))
        .route("/sign-in", get(sign_in))
        .route("/dashboard", get(protected_page))
        .route("/clients", get(protected_page))
        .route("/settings", get(protected_page))
        .route("/billing", get(protected_page))
}

async fn landing() -> Html<&'static str> {
    Html("<!doctype html><title>Renditions</title><h1>Business personal property, handled.</h1>")
}

async fn privacy() -> Html<&'static str> {
    Html("<!doctype html><title>Privacy</title><h1>Privacy policy</h1>")
}

async fn sign_in() -> Html<&'static str> {
    Html("<!doctype html><title>Sign in</title><h1>Sign in</h1>")
}

async fn protected_page(
    State(state): State<AppState>,
    OriginalUri(uri): OriginalUri,
    headers: HeaderMap,
    cookies: Option<TypedHeader<Cookie>>,
) -> Response {
    if has_valid_session(&state, &headers, cookies.as_ref()) {
        return Html("<!doctype html><title>Renditions</title><div id=\"app\"></div>")
            .into_response();
    }

    let target = uri
        .path_and_query()
        .map(|pq| pq.as_str())
        .unwrap_or_else(|| uri.path());
    let encoded = percent_encoding::utf8_percent_encode(target, percent_encoding::NON_ALPHANUMERIC);
    let sign_in_path = state.config.sign_in_path.as_str();
    Redirect::temporary(&format!("{sign_in_path}?redirect_url={encoded}")).into_response()
}

fn has_valid_session(
    state: &AppState,
    headers: &HeaderMap,
    cookies: Option<&TypedHeader<Cookie>>,
) -> bool {
    let bearer = headers
        .get(AUTHORIZATION)
        .and_then(|value| value.to_str().ok())
        .and_then(|value| value.strip_prefix("Bearer "));

    let cookie_token = cookies.and_then(|jar| jar.get(SESSION_COOKIE_NAME));

    match bearer.or(cookie_token) {
        Some(token) => state.jwt.verify_token(token).is_ok(),
        None => false,
    }
}
