//! Response synthesis for the fake backend
//!
//! Both API styles resolve every request through [`resolve_mock_response`].
//! Randomness only touches token and id values, never the status logic.

use autolab_common::{Interception, MockResponse};
use rand::Rng;
use regex::Regex;
use serde_json::{json, Map, Value};

pub const API_KEY_HEADER: &str = "x-api-key";
pub const API_KEY: &str = "top-secret-key-123";

const BASE36: &[u8] = b"0123456789abcdefghijklmnopqrstuvwxyz";

/// Compute what the fake backend answers for one request
pub fn resolve_mock_response<R: Rng + ?Sized>(
    method: &str,
    url: &str,
    body: Option<&Value>,
    headers: &Map<String, Value>,
    interceptions: &[Interception],
    rng: &mut R,
) -> MockResponse {
    if let Some(interception) = find_interception(method, url, interceptions) {
        return MockResponse::new(
            interception.response.status,
            decode_body(&interception.response.body),
        );
    }

    if url.contains("/api/auth/token") {
        return MockResponse::new(
            200,
            json!({
                "access_token": format!("mock_jwt_access_token_{}", random_base36(rng, 6)),
                "token_type": "Bearer",
                "expires_in": 3600,
                "refresh_token": "mock_refresh_token",
            }),
        );
    }

    if url.contains("/api/secure-data") {
        let authorized = header(headers, API_KEY_HEADER).map_or(false, |v| v == API_KEY);
        return if authorized {
            MockResponse::new(200, json!({ "secret": "The password is \"blue-falcon\"" }))
        } else {
            MockResponse::new(401, json!({ "error": "Unauthorized: Invalid API Key" }))
        };
    }

    if method.eq_ignore_ascii_case("POST") {
        let mut echo = Map::new();
        echo.insert("id".to_string(), json!(rng.gen_range(0..1000)));
        if let Some(Value::Object(fields)) = body.map(decode_body) {
            echo.extend(fields);
        }
        return MockResponse::new(201, Value::Object(echo));
    }

    MockResponse::new(
        200,
        json!({ "id": 1, "name": "John Doe", "email": "john@example.com" }),
    )
}

/// Latest registered interception matching the request
pub fn find_interception<'a>(
    method: &str,
    url: &str,
    interceptions: &'a [Interception],
) -> Option<&'a Interception> {
    interceptions.iter().rev().find(|i| {
        i.method
            .as_deref()
            .map_or(true, |m| m.eq_ignore_ascii_case(method))
            && glob_matches(&i.glob, url)
    })
}

/// Match a URL against a route glob.
///
/// `**` spans any characters, `*` stops at `/`, `?` is one character. The
/// pattern may match any suffix of the URL's path; the query, the fragment
/// and a trailing slash are ignored.
pub fn glob_matches(glob: &str, url: &str) -> bool {
    let path = url.split(['?', '#']).next().unwrap_or(url);
    let trimmed = path.trim_end_matches('/');
    let path = if trimmed.is_empty() { path } else { trimmed };

    let mut pattern = String::with_capacity(glob.len() * 2);
    let mut chars = glob.chars().peekable();
    while let Some(c) = chars.next() {
        match c {
            '*' if chars.peek() == Some(&'*') => {
                chars.next();
                pattern.push_str(".*");
            }
            '*' => pattern.push_str("[^/]*"),
            '?' => pattern.push('.'),
            other => pattern.push_str(&regex::escape(&other.to_string())),
        }
    }
    pattern.push('$');

    match Regex::new(&pattern) {
        Ok(re) => re.is_match(path),
        Err(_) => path.ends_with(glob),
    }
}

/// A string holding JSON is parsed; anything else is returned as is
pub fn decode_body(body: &Value) -> Value {
    match body {
        Value::String(text) => serde_json::from_str(text).unwrap_or_else(|_| body.clone()),
        other => other.clone(),
    }
}

/// Case-insensitive header lookup
pub fn header<'a>(headers: &'a Map<String, Value>, name: &str) -> Option<&'a str> {
    headers
        .iter()
        .find(|(k, _)| k.eq_ignore_ascii_case(name))
        .and_then(|(_, v)| v.as_str())
}

fn random_base36<R: Rng + ?Sized>(rng: &mut R, len: usize) -> String {
    (0..len)
        .map(|_| BASE36[rng.gen_range(0..BASE36.len())] as char)
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::rngs::StdRng;
    use rand::SeedableRng;

    fn rng() -> StdRng {
        StdRng::seed_from_u64(3)
    }

    fn headers(pairs: &[(&str, &str)]) -> Map<String, Value> {
        pairs
            .iter()
            .map(|(k, v)| (k.to_string(), json!(v)))
            .collect()
    }

    fn shape(value: &Value) -> Vec<String> {
        value
            .as_object()
            .map(|o| o.keys().cloned().collect())
            .unwrap_or_default()
    }

    #[test]
    fn test_glob_matching() {
        assert!(glob_matches("**/api/data", "/api/data"));
        assert!(glob_matches("**/api/data", "https://example.com/api/data"));
        assert!(glob_matches("/api/*", "/api/users"));
        assert!(!glob_matches("/api/*", "/api/users/1"));
        assert!(glob_matches("/api/user?", "/api/users"));
        assert!(!glob_matches("**/api/v1/user", "/api/v2/profile"));
    }

    #[test]
    fn test_glob_ignores_query_fragment_and_trailing_slash() {
        assert!(glob_matches("**/api/data", "/api/data?page=2"));
        assert!(glob_matches("**/api/data", "https://x.com/api/data/"));
        assert!(glob_matches("**/api/data", "/api/data#top"));
        assert!(glob_matches("/api/*", "/api/users/?sort=name"));
        assert!(!glob_matches("**/api/data", "/api/database?x=/api/data"));
    }

    #[test]
    fn test_interception_covers_query_strings() {
        let interceptions = vec![Interception {
            glob: "**/api/data".to_string(),
            method: None,
            response: MockResponse::new(500, json!({"error": "down"})),
        }];
        for url in ["/api/data?page=2", "https://x.com/api/data/"] {
            let response = resolve_mock_response("GET", url, None, &Map::new(), &interceptions, &mut rng());
            assert_eq!(response.status, 500, "{}", url);
        }
    }

    #[test]
    fn test_token_endpoint() {
        let response = resolve_mock_response(
            "POST",
            "/api/auth/token",
            Some(&json!({"code": "abc"})),
            &Map::new(),
            &[],
            &mut rng(),
        );
        assert_eq!(response.status, 200);
        assert_eq!(response.body["token_type"], "Bearer");
        assert_eq!(response.body["expires_in"], 3600);
        let token = response.body["access_token"].as_str().unwrap();
        assert!(token.starts_with("mock_jwt_access_token_"));
        assert!(token.len() > "mock_jwt_access_token_".len());
    }

    #[test]
    fn test_secure_data_requires_exact_key() {
        for name in ["x-api-key", "X-API-KEY", "X-Api-Key"] {
            let ok = resolve_mock_response(
                "GET",
                "/api/secure-data",
                None,
                &headers(&[(name, API_KEY)]),
                &[],
                &mut rng(),
            );
            assert_eq!(ok.status, 200);
            assert_eq!(ok.body["secret"], "The password is \"blue-falcon\"");
        }

        for hdrs in [headers(&[]), headers(&[("x-api-key", "wrong")]), headers(&[("authorization", API_KEY)])] {
            let denied = resolve_mock_response("GET", "/api/secure-data", None, &hdrs, &[], &mut rng());
            assert_eq!(denied.status, 401);
            assert_eq!(denied.body["error"], "Unauthorized: Invalid API Key");
        }
    }

    #[test]
    fn test_post_echoes_body_with_id() {
        let body = json!({"name": "Widget", "qty": 2});
        let response = resolve_mock_response("post", "/api/items", Some(&body), &Map::new(), &[], &mut rng());
        assert_eq!(response.status, 201);
        assert_eq!(response.body["name"], "Widget");
        assert!(response.body["id"].is_number());
    }

    #[test]
    fn test_default_get_record() {
        let response = resolve_mock_response("GET", "/api/users/1", None, &Map::new(), &[], &mut rng());
        assert_eq!(response, MockResponse::new(200, json!({"id": 1, "name": "John Doe", "email": "john@example.com"})));
    }

    #[test]
    fn test_latest_matching_interception_wins() {
        let interceptions = vec![
            Interception {
                glob: "**/api/data".to_string(),
                method: None,
                response: MockResponse::new(200, json!({"data": "first"})),
            },
            Interception {
                glob: "**/api/data".to_string(),
                method: None,
                response: MockResponse::new(500, json!("{\"error\":\"boom\"}")),
            },
            Interception {
                glob: "**/api/other".to_string(),
                method: None,
                response: MockResponse::new(204, Value::Null),
            },
        ];
        let response = resolve_mock_response("GET", "/api/data", None, &Map::new(), &interceptions, &mut rng());
        assert_eq!(response.status, 500);
        assert_eq!(response.body, json!({"error": "boom"}));
    }

    #[test]
    fn test_interception_method_filter() {
        let interceptions = vec![Interception {
            glob: "**/api/data".to_string(),
            method: Some("POST".to_string()),
            response: MockResponse::new(503, Value::Null),
        }];
        let response = resolve_mock_response("GET", "/api/data", None, &Map::new(), &interceptions, &mut rng());
        assert_eq!(response.status, 200);
    }

    #[test]
    fn test_deterministic_status_and_shape() {
        let cases: Vec<(&str, &str, Option<Value>)> = vec![
            ("POST", "/api/auth/token", Some(json!({"code": "x"}))),
            ("GET", "/api/secure-data", None),
            ("POST", "/api/orders", Some(json!({"sku": "a"}))),
            ("GET", "/api/users/2", None),
        ];
        let mut first = StdRng::seed_from_u64(1);
        let mut second = StdRng::seed_from_u64(99);
        for (method, url, body) in cases {
            let a = resolve_mock_response(method, url, body.as_ref(), &Map::new(), &[], &mut first);
            let b = resolve_mock_response(method, url, body.as_ref(), &Map::new(), &[], &mut second);
            assert_eq!(a.status, b.status);
            assert_eq!(shape(&a.body), shape(&b.body));
        }
    }
}
