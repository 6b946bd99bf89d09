//! Parameter extraction for signed requests
//!
//! The signed parameter set is the query string plus, for
//! `application/x-www-form-urlencoded` bodies, the form fields. Form fields
//! win over query fields of the same name; within one source the first
//! occurrence wins.
//!
//! Security values are read from `X-Timestamp` / `X-Nonce` / `X-Sign`
//! first and fall back to the `timestamp` / `nonce` / `sign` parameters
//! only when the header is absent. A header that is present but not
//! visible ASCII is rejected rather than skipped.

use axum::body::{to_bytes, Body};
use axum::http::{header, HeaderMap, Request};
use turnstile_auth_core::{
    AuthError, Params, SignedRequest, NONCE_PARAM, SIGNATURE_PARAM, TIMESTAMP_PARAM,
};

use crate::error::AuthRejection;

pub const TIMESTAMP_HEADER: &str = "x-timestamp";
pub const NONCE_HEADER: &str = "x-nonce";
pub const SIGN_HEADER: &str = "x-sign";

/// Largest form body buffered for signing
pub const DEFAULT_BODY_LIMIT: usize = 64 * 1024;

const FORM_CONTENT_TYPE: &str = "application/x-www-form-urlencoded";

/// Build the security view of a request.
///
/// Form bodies are buffered and put back, so the returned request can be
/// passed on unchanged.
pub async fn extract_signed_request(
    req: Request<Body>,
    body_limit: usize,
) -> Result<(Request<Body>, SignedRequest), AuthRejection> {
    let mut params = req.uri().query().map(parse_pairs).unwrap_or_default();

    let req = if is_form(req.headers()) {
        let (parts, body) = req.into_parts();
        let bytes = to_bytes(body, body_limit).await.map_err(|e| {
            tracing::debug!("Failed to read form body: {}", e);
            AuthRejection::InvalidBody
        })?;

        let form = std::str::from_utf8(&bytes).map_err(|_| AuthRejection::InvalidBody)?;
        params.extend(parse_pairs(form));

        Request::from_parts(parts, Body::from(bytes))
    } else {
        req
    };

    let headers = req.headers();
    let timestamp = resolve(headers, TIMESTAMP_HEADER, &params, TIMESTAMP_PARAM)?;
    let nonce = resolve(headers, NONCE_HEADER, &params, NONCE_PARAM)?;
    let sign = resolve(headers, SIGN_HEADER, &params, SIGNATURE_PARAM)?;

    let signed = SignedRequest {
        params,
        timestamp,
        nonce,
        sign,
    };

    Ok((req, signed))
}

/// Header value if present, else the parameter of the same role
fn resolve(
    headers: &HeaderMap,
    header_name: &str,
    params: &Params,
    param: &'static str,
) -> Result<Option<String>, AuthRejection> {
    match headers.get(header_name) {
        Some(value) => value
            .to_str()
            .map(|v| Some(v.to_owned()))
            .map_err(|_| AuthRejection::from(AuthError::BadFormat(param))),
        None => Ok(params.get(param).cloned()),
    }
}

fn parse_pairs(raw: &str) -> Params {
    let mut params = Params::new();
    for (key, value) in serde_urlencoded::from_str::<Vec<(String, String)>>(raw).unwrap_or_default() {
        params.entry(key).or_insert(value);
    }
    params
}

fn is_form(headers: &HeaderMap) -> bool {
    headers
        .get(header::CONTENT_TYPE)
        .and_then(|v| v.to_str().ok())
        .is_some_and(|ct| ct.starts_with(FORM_CONTENT_TYPE))
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::http::HeaderValue;
    use http_body_util::BodyExt;

    #[tokio::test]
    async fn test_query_params_and_fallback() {
        let req = Request::builder()
            .uri("/me?zone=hall&timestamp=100&nonce=abc&sign=ff")
            .body(Body::empty())
            .unwrap();

        let (_, signed) = extract_signed_request(req, DEFAULT_BODY_LIMIT).await.unwrap();
        assert_eq!(signed.params.get("zone").map(String::as_str), Some("hall"));
        assert_eq!(signed.timestamp.as_deref(), Some("100"));
        assert_eq!(signed.nonce.as_deref(), Some("abc"));
        assert_eq!(signed.sign.as_deref(), Some("ff"));
    }

    #[tokio::test]
    async fn test_headers_take_precedence() {
        let req = Request::builder()
            .uri("/me?timestamp=100&nonce=from-query")
            .header("X-Timestamp", "200")
            .header("X-Nonce", "from-header")
            .header("X-Sign", "aa")
            .body(Body::empty())
            .unwrap();

        let (_, signed) = extract_signed_request(req, DEFAULT_BODY_LIMIT).await.unwrap();
        assert_eq!(signed.timestamp.as_deref(), Some("200"));
        assert_eq!(signed.nonce.as_deref(), Some("from-header"));
        assert_eq!(signed.sign.as_deref(), Some("aa"));

        // The signed set carries the resolved values
        let canonical = signed.canonical_params("200", "from-header");
        assert_eq!(canonical.get("nonce").map(String::as_str), Some("from-header"));
    }

    #[tokio::test]
    async fn test_form_body_is_read_and_restored() {
        let req = Request::builder()
            .method("POST")
            .uri("/zones?page=2")
            .header("content-type", "application/x-www-form-urlencoded")
            .body(Body::from("name=Living+Room&page=3"))
            .unwrap();

        let (req, signed) = extract_signed_request(req, DEFAULT_BODY_LIMIT).await.unwrap();
        assert_eq!(signed.params.get("name").map(String::as_str), Some("Living Room"));
        assert_eq!(signed.params.get("page").map(String::as_str), Some("3"));

        let body = req.into_body().collect().await.unwrap().to_bytes();
        assert_eq!(&body[..], b"name=Living+Room&page=3");
    }

    #[tokio::test]
    async fn test_repeated_key_keeps_first_value() {
        let req = Request::builder()
            .method("POST")
            .uri("/me?zone=first&zone=second&page=1")
            .header("content-type", "application/x-www-form-urlencoded")
            .body(Body::from("page=2&page=3"))
            .unwrap();

        let (_, signed) = extract_signed_request(req, DEFAULT_BODY_LIMIT).await.unwrap();
        assert_eq!(signed.params.get("zone").map(String::as_str), Some("first"));
        // Form still overrides query, first form value wins
        assert_eq!(signed.params.get("page").map(String::as_str), Some("2"));
    }

    #[tokio::test]
    async fn test_unreadable_header_is_bad_format() {
        let req = Request::builder()
            .uri("/me?nonce=from-query")
            .header("X-Nonce", HeaderValue::from_bytes(b"caf\xe9").unwrap())
            .body(Body::empty())
            .unwrap();

        let result = extract_signed_request(req, DEFAULT_BODY_LIMIT).await;
        assert!(matches!(
            result,
            Err(AuthRejection::Auth(AuthError::BadFormat("nonce")))
        ));
    }

    #[tokio::test]
    async fn test_json_body_not_signed() {
        let req = Request::builder()
            .method("POST")
            .uri("/zones")
            .header("content-type", "application/json")
            .body(Body::from(r#"{"name":"x"}"#))
            .unwrap();

        let (_, signed) = extract_signed_request(req, DEFAULT_BODY_LIMIT).await.unwrap();
        assert!(signed.params.is_empty());
    }

    #[tokio::test]
    async fn test_oversized_form_rejected() {
        let req = Request::builder()
            .method("POST")
            .uri("/zones")
            .header("content-type", "application/x-www-form-urlencoded")
            .body(Body::from("a=".to_string() + &"x".repeat(64)))
            .unwrap();

        let result = extract_signed_request(req, 16).await;
        assert!(matches!(result, Err(AuthRejection::InvalidBody)));
    }
}
