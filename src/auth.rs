//!
//! Caller identity for upstream requests.
//!
//! The gateway attributes every request to a user name. Callers pass it as
//! the bearer token; nothing is verified here, the upstream enforces access.
//!
//! Authors:
//!   Jaro <yarenty@gmail.com>
//!
//! Copyright (c) 2026 SkyCorp

/* --- uses ------------------------------------------------------------------------------------ */

use axum::http::HeaderMap;
use axum::http::header::AUTHORIZATION;

/* --- constants ------------------------------------------------------------------------------ */

/** placeholder token sent by clients that insist on an API key */
const NOOP_TOKEN: &str = "noop";

/* --- start of code -------------------------------------------------------------------------- */

///
/// Resolves the upstream user from request headers.
///
/// # Arguments
///  * `headers` - inbound request headers
///  * `default_user` - user for requests without a usable bearer token
///
/// # Returns
///  * the bearer token, or `default_user` when it is missing, empty or `noop`
pub fn user_from_headers(headers: &HeaderMap, default_user: &str) -> String {
    headers
        .get(AUTHORIZATION)
        .and_then(|value| value.to_str().ok())
        .and_then(bearer_token)
        .filter(|token| !token.eq_ignore_ascii_case(NOOP_TOKEN))
        .map(str::to_string)
        .unwrap_or_else(|| default_user.to_string())
}

fn bearer_token(header: &str) -> Option<&str> {
    let (scheme, token) = header.trim().split_once(' ')?;
    if !scheme.eq_ignore_ascii_case("bearer") {
        return None;
    }
    let token = token.trim();
    (!token.is_empty()).then_some(token)
}

/* --- tests ----------------------------------------------------------------------------------- */

#[cfg(test)]
mod tests {
    use super::*;
    use axum::http::HeaderValue;

    fn headers(value: &str) -> HeaderMap {
        let mut headers = HeaderMap::new();
        headers.insert(AUTHORIZATION, HeaderValue::from_str(value).unwrap());
        headers
    }

    #[test]
    fn test_bearer_token_is_user() {
        assert_eq!(user_from_headers(&headers("Bearer alice"), "toolbridge"), "alice");
        assert_eq!(user_from_headers(&headers("bearer  bob "), "toolbridge"), "bob");
    }

    #[test]
    fn test_fallback_to_default_user() {
        assert_eq!(user_from_headers(&HeaderMap::new(), "toolbridge"), "toolbridge");
        assert_eq!(user_from_headers(&headers("Bearer noop"), "toolbridge"), "toolbridge");
        assert_eq!(user_from_headers(&headers("Basic abc"), "toolbridge"), "toolbridge");
        assert_eq!(user_from_headers(&headers("Bearer "), "toolbridge"), "toolbridge");
    }
}
