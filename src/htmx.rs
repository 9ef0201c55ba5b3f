/// HTMX utils
use axum::http::HeaderMap;

/// Fragments go to htmx; anything else (a reload, a bookmarked URL) gets the
/// full page.
pub fn is_request(headers: &HeaderMap) -> bool {
    headers.contains_key("Hx-Request")
}
