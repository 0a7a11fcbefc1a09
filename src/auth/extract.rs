/// Locating the session token on an inbound request
///
/// An `Authorization: Bearer` header takes precedence. Otherwise the session
/// cookies are scanned in order and the first non-empty value is used.

/// Session cookie names, secure and plain, current and legacy convention
pub const SESSION_COOKIE_NAMES: [&str; 4] = [
    "__Secure-authjs.session-token",
    "authjs.session-token",
    "__Secure-next-auth.session-token",
    "next-auth.session-token",
];

const BEARER_SCHEME: &str = "bearer";

pub fn default_cookie_names() -> Vec<String> {
    SESSION_COOKIE_NAMES.iter().map(|name| name.to_string()).collect()
}

/// Token from an `Authorization` header value, if it uses the Bearer scheme
pub fn bearer_token(header: &str) -> Option<&str> {
    let (scheme, token) = header.trim().split_once(' ')?;
    if !scheme.eq_ignore_ascii_case(BEARER_SCHEME) {
        return None;
    }
    let token = token.trim();
    (!token.is_empty()).then_some(token)
}

/// Pick the token for a request
///
/// # Arguments
/// * `authorization` - Raw `Authorization` header, if any
/// * `cookie_names` - Cookie names to try, in priority order
/// * `cookie` - Cookie lookup by name
pub fn extract_token<F>(
    authorization: Option<&str>,
    cookie_names: &[String],
    cookie: F,
) -> Option<String>
where
    F: Fn(&str) -> Option<String>,
{
    if let Some(token) = authorization.and_then(bearer_token) {
        return Some(token.to_string());
    }

    cookie_names
        .iter()
        .filter_map(|name| cookie(name))
        .find(|value| !value.is_empty())
}
