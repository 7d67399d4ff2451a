use axum::http::{header, HeaderMap};

/// Cookie carrying the opaque session token.
pub const SESSION_COOKIE: &str = "postline_session";
/// Cookie carrying the one-shot flash notice code.
pub const FLASH_COOKIE: &str = "postline_flash";

/// Build a `Set-Cookie` value. All cookies here are HttpOnly, SameSite=Lax
/// and scoped to the whole site.
pub fn build(name: &str, value: &str, max_age_secs: Option<i64>, secure: bool) -> String {
    let mut cookie = format!("{}={}; HttpOnly; SameSite=Lax; Path=/", name, value);
    if secure {
        cookie.push_str("; Secure");
    }
    if let Some(max_age) = max_age_secs {
        cookie.push_str(&format!("; Max-Age={}", max_age));
    }
    cookie
}

/// Build a `Set-Cookie` value that expires the cookie immediately.
pub fn build_removal(name: &str) -> String {
    format!("{}=; HttpOnly; SameSite=Lax; Path=/; Max-Age=0", name)
}

/// Extract a cookie value from the request headers.
pub fn extract(headers: &HeaderMap, name: &str) -> Option<String> {
    headers
        .get(header::COOKIE)?
        .to_str()
        .ok()?
        .split(';')
        .find_map(|pair| {
            let (key, value) = pair.trim().split_once('=')?;
            (key == name).then(|| value.to_string())
        })
}
