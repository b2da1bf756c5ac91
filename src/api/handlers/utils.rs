//! Header parsing shared by the auth handlers.

use axum::http::{HeaderMap, header::AUTHORIZATION};

pub(crate) const REQUEST_ID_HEADER: &str = "x-request-id";

/// Extract a client IP for rate limiting, preferring the first `X-Forwarded-For` hop.
pub(crate) fn extract_client_ip(headers: &HeaderMap) -> Option<String> {
    headers
        .get("x-forwarded-for")
        .and_then(|value| value.to_str().ok())
        .and_then(|value| value.split(',').next())
        .map(str::trim)
        .filter(|value| !value.is_empty())
        .map(str::to_string)
}

/// Token from `Authorization: Bearer <token>`; any other scheme counts as absent.
pub(crate) fn extract_bearer_token(headers: &HeaderMap) -> Option<&str> {
    let value = headers.get(AUTHORIZATION)?.to_str().ok()?;
    let (scheme, token) = value.trim().split_once(' ')?;
    if !scheme.eq_ignore_ascii_case("bearer") {
        return None;
    }
    Some(token.trim()).filter(|token| !token.is_empty())
}

pub(crate) fn request_id(headers: &HeaderMap) -> Option<String> {
    headers
        .get(REQUEST_ID_HEADER)
        .and_then(|value| value.to_str().ok())
        .map(str::to_string)
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::http::HeaderValue;

    fn with_header(name: &'static str, value: &'static str) -> HeaderMap {
        let mut headers = HeaderMap::new();
        headers.insert(name, HeaderValue::from_static(value));
        headers
    }

    #[test]
    fn client_ip_uses_first_forwarded_hop() {
        let headers = with_header("x-forwarded-for", " 203.0.113.7 , 10.0.0.1");
        assert_eq!(extract_client_ip(&headers), Some("203.0.113.7".to_string()));
    }

    #[test]
    fn client_ip_ignores_empty_forwarded_header() {
        assert_eq!(extract_client_ip(&with_header("x-forwarded-for", " ")), None);
        assert_eq!(extract_client_ip(&HeaderMap::new()), None);
    }

    #[test]
    fn bearer_scheme_is_case_insensitive() {
        for value in ["Bearer abc.def.ghi", "bearer abc.def.ghi", "BEARER  abc.def.ghi "] {
            let headers = with_header("authorization", value);
            assert_eq!(extract_bearer_token(&headers), Some("abc.def.ghi"), "{value}");
        }
    }

    #[test]
    fn other_schemes_and_empty_tokens_are_absent() {
        for value in ["Basic dXNlcjpwYXNz", "Bearer", "Bearer   ", "abc.def.ghi"] {
            let headers = with_header("authorization", value);
            assert_eq!(extract_bearer_token(&headers), None, "{value}");
        }
        assert_eq!(extract_bearer_token(&HeaderMap::new()), None);
    }
}
