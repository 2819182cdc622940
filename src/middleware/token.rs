use axum::http::HeaderMap;
use axum::http::header::{AUTHORIZATION, COOKIE};

/// Pull the ID token out of a request.
///
/// Tried in order, first hit wins:
/// 1) header: `Authorization: Bearer <token>`
/// 2) cookie: `<cookie_name>=<token>`
pub fn extract_token(headers: &HeaderMap, cookie_name: &str) -> Option<String> {
    bearer_token(headers)
        .or_else(|| cookie_token(headers, cookie_name))
        .map(str::to_owned)
}

fn bearer_token(headers: &HeaderMap) -> Option<&str> {
    headers
        .get(AUTHORIZATION)?
        .to_str()
        .ok()?
        .strip_prefix("Bearer ")
        .filter(|token| !token.is_empty())
}

/// The first cookie pair whose trimmed text starts with `<name>=` is used, and
/// its value is everything after the first `=`, taken as-is (no URL decoding).
fn cookie_token<'a>(headers: &'a HeaderMap, name: &str) -> Option<&'a str> {
    headers
        .get_all(COOKIE)
        .iter()
        .filter_map(|v| v.to_str().ok())
        .flat_map(|header| header.split(';'))
        .find(|pair| {
            pair.trim_start()
                .strip_prefix(name)
                .is_some_and(|rest| rest.starts_with('='))
        })
        .and_then(|pair| pair.split_once('='))
        .map(|(_, value)| value)
        .filter(|value| !value.is_empty())
}
