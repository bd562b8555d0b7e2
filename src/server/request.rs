use may_minihttp::Request;
use serde_json::Value;
use std::collections::HashMap;
use std::io::Read;
use tracing::{debug, warn};

/// What the client sent as a body.
#[derive(Debug, Clone, PartialEq)]
pub enum RequestBody {
    Empty,
    Json(Value),
    /// Bytes that do not parse as JSON, with the parser's message.
    Invalid(String),
}

impl RequestBody {
    pub fn from_bytes(bytes: &[u8]) -> Self {
        if bytes.is_empty() {
            return RequestBody::Empty;
        }
        match serde_json::from_slice(bytes) {
            Ok(v) => RequestBody::Json(v),
            Err(e) => RequestBody::Invalid(e.to_string()),
        }
    }

    pub fn into_json(self) -> Option<Value> {
        match self {
            RequestBody::Json(v) => Some(v),
            _ => None,
        }
    }
}

/// Request data extracted from the wire, independent of `may_minihttp`.
#[derive(Debug, Clone, PartialEq)]
pub struct ParsedRequest {
    pub method: String,
    /// Path without the query string.
    pub path: String,
    /// Lowercased header names.
    pub headers: HashMap<String, String>,
    pub query_params: HashMap<String, String>,
    pub body: RequestBody,
}

impl ParsedRequest {
    /// `raw_path` may carry a query string, which is split off and decoded.
    pub fn new(method: &str, raw_path: &str) -> Self {
        let (path, query) = match raw_path.split_once('?') {
            Some((p, q)) => (p, Some(q)),
            None => (raw_path, None),
        };
        ParsedRequest {
            method: method.to_string(),
            path: if path.is_empty() { "/".to_string() } else { path.to_string() },
            headers: HashMap::new(),
            query_params: query.map(parse_query_string).unwrap_or_default(),
            body: RequestBody::Empty,
        }
    }

    pub fn with_header(mut self, name: &str, value: &str) -> Self {
        self.headers.insert(name.to_ascii_lowercase(), value.to_string());
        self
    }

    pub fn with_body(mut self, bytes: &[u8]) -> Self {
        self.body = RequestBody::from_bytes(bytes);
        self
    }

    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers.get(&name.to_ascii_lowercase()).map(String::as_str)
    }
}

/// Decode `a=1&b=two` into a map. Later duplicates win.
pub fn parse_query_string(query: &str) -> HashMap<String, String> {
    url::form_urlencoded::parse(query.as_bytes())
        .map(|(k, v)| (k.into_owned(), v.into_owned()))
        .collect()
}

pub fn parse_request(req: Request) -> ParsedRequest {
    let method = req.method().to_string();
    let raw_path = req.path().to_string();

    let mut parsed = ParsedRequest::new(&method, &raw_path);
    for h in req.headers().iter() {
        parsed.headers.insert(
            h.name.to_ascii_lowercase(),
            String::from_utf8_lossy(h.value).into_owned(),
        );
    }

    let mut bytes = Vec::new();
    parsed.body = match req.body().read_to_end(&mut bytes) {
        Ok(_) => RequestBody::from_bytes(&bytes),
        Err(e) => {
            warn!(method = %method, path = %parsed.path, error = %e, "Failed to read request body");
            RequestBody::Invalid(e.to_string())
        }
    };

    debug!(
        method = %parsed.method,
        path = %parsed.path,
        header_count = parsed.headers.len(),
        query_param_count = parsed.query_params.len(),
        body_bytes = bytes.len(),
        "HTTP request parsed"
    );
    parsed
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_query_string_split() {
        let req = ParsedRequest::new("GET", "/items/1?verbose=true&tag=a%20b");
        assert_eq!(req.path, "/items/1");
        assert_eq!(req.query_params.get("verbose").map(String::as_str), Some("true"));
        assert_eq!(req.query_params.get("tag").map(String::as_str), Some("a b"));
    }

    #[test]
    fn test_body_classification() {
        assert_eq!(RequestBody::from_bytes(b""), RequestBody::Empty);
        assert_eq!(
            RequestBody::from_bytes(br#"{"name":"book"}"#),
            RequestBody::Json(json!({"name": "book"}))
        );
        assert!(matches!(RequestBody::from_bytes(b"{oops"), RequestBody::Invalid(_)));
        assert_eq!(RequestBody::from_bytes(b"null"), RequestBody::Json(Value::Null));
    }

    #[test]
    fn test_headers_are_case_insensitive() {
        let req = ParsedRequest::new("GET", "/health").with_header("X-Request-Id", "abc");
        assert_eq!(req.header("x-request-id"), Some("abc"));
        assert_eq!(req.header("X-REQUEST-ID"), Some("abc"));
    }
}
