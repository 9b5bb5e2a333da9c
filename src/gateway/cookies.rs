//! Session cookie helpers.

use axum::http::{header, HeaderMap, HeaderValue};
use cookie::{Cookie, SameSite};

/// Value of the cookie named `name` from the request's `Cookie` headers.
pub fn read(headers: &HeaderMap, name: &str) -> Option<String> {
    headers
        .get_all(header::COOKIE)
        .iter()
        .filter_map(|v| v.to_str().ok())
        .flat_map(Cookie::split_parse)
        .filter_map(Result::ok)
        .find(|c| c.name() == name)
        .map(|c| c.value().to_owned())
        .filter(|v| !v.is_empty())
}

/// `Set-Cookie` value binding `name` to `token`, httponly, for the whole site.
pub fn session(name: &str, token: &str) -> Option<HeaderValue> {
    let mut cookie = Cookie::new(name.to_owned(), token.to_owned());
    cookie.set_path("/");
    cookie.set_http_only(true);
    cookie.set_same_site(SameSite::Lax);
    HeaderValue::from_str(&cookie.to_string()).ok()
}

/// `Set-Cookie` value that makes the browser drop `name`.
pub fn removal(name: &str) -> Option<HeaderValue> {
    let mut cookie = Cookie::new(name.to_owned(), "");
    cookie.set_path("/");
    cookie.set_http_only(true);
    cookie.make_removal();
    HeaderValue::from_str(&cookie.to_string()).ok()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn headers(cookie_header: &str) -> HeaderMap {
        let mut headers = HeaderMap::new();
        headers.insert(header::COOKIE, HeaderValue::from_str(cookie_header).unwrap());
        headers
    }

    #[test]
    fn reads_named_cookie_among_others() {
        let h = headers("theme=dark; session_id=abc123; lang=en");
        assert_eq!(read(&h, "session_id").as_deref(), Some("abc123"));
        assert_eq!(read(&h, "theme").as_deref(), Some("dark"));
        assert!(read(&h, "missing").is_none());
    }

    #[test]
    fn empty_value_reads_as_absent() {
        assert!(read(&headers("session_id="), "session_id").is_none());
        assert!(read(&HeaderMap::new(), "session_id").is_none());
    }

    #[test]
    fn session_cookie_is_httponly() {
        let value = session("session_id", "tok").unwrap();
        let text = value.to_str().unwrap();
        assert!(text.starts_with("session_id=tok"));
        assert!(text.contains("HttpOnly"));
        assert!(text.contains("Path=/"));
        assert!(text.contains("SameSite=Lax"));
    }

    #[test]
    fn removal_cookie_expires_immediately() {
        let value = removal("session_id").unwrap();
        let text = value.to_str().unwrap();
        assert!(text.starts_with("session_id="));
        assert!(text.contains("Max-Age=0"));
    }
}
