use axum::http::{header, HeaderMap, HeaderValue};
use axum::response::{IntoResponse, Response};
use axum::Json;
use cookie::{Cookie, SameSite};
use serde::Serialize;
use tracing::warn;

use crate::session::OpenedSession;

pub const SESSION_COOKIE: &str = "session_id";

/// Session token sent by the client, if any.
pub fn session_id(headers: &HeaderMap) -> Option<String> {
    headers
        .get_all(header::COOKIE)
        .iter()
        .filter_map(|value| value.to_str().ok())
        .flat_map(Cookie::split_parse)
        .filter_map(|cookie| cookie.ok())
        .find(|cookie| cookie.name() == SESSION_COOKIE)
        .map(|cookie| cookie.value().to_string())
}

fn session_cookie(id: &str) -> String {
    Cookie::build((SESSION_COOKIE, id))
        .path("/")
        .http_only(true)
        .same_site(SameSite::Lax)
        .build()
        .to_string()
}

/// JSON body, plus a `Set-Cookie` header when the session was just issued.
pub fn success<T: Serialize>(data: T, session: &OpenedSession) -> Response {
    let mut response = Json(data).into_response();
    if session.issued {
        match HeaderValue::from_str(&session_cookie(&session.id)) {
            Ok(value) => {
                response.headers_mut().append(header::SET_COOKIE, value);
            }
            Err(err) => warn!(error = %err, "could not encode session cookie"),
        }
    }
    response
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn session_id_is_read_among_other_cookies() {
        let mut headers = HeaderMap::new();
        headers.insert(
            header::COOKIE,
            HeaderValue::from_static("theme=dark; session_id=abc-123; lang=nl"),
        );
        assert_eq!(session_id(&headers).as_deref(), Some("abc-123"));
        assert_eq!(session_id(&HeaderMap::new()), None);
    }

    #[test]
    fn new_sessions_get_a_cookie() {
        let issued = OpenedSession { id: "abc".to_string(), issued: true };
        let response = success(serde_json::json!({"ok": true}), &issued);
        let cookie = response.headers()[header::SET_COOKIE].to_str().unwrap();
        assert!(cookie.starts_with("session_id=abc"));
        assert!(cookie.contains("HttpOnly"));

        let known = OpenedSession { id: "abc".to_string(), issued: false };
        let response = success(serde_json::json!({"ok": true}), &known);
        assert!(response.headers().get(header::SET_COOKIE).is_none());
    }
}
