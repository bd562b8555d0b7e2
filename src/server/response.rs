use crate::dispatcher::HandlerResponse;
use may_minihttp::Response;
use serde_json::Value;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ContentType {
    Json,
    Yaml,
    PlainText,
}

impl ContentType {
    pub fn as_str(&self) -> &'static str {
        match self {
            ContentType::Json => "application/json",
            ContentType::Yaml => "text/yaml",
            ContentType::PlainText => "text/plain; version=0.0.4",
        }
    }

    fn header_line(&self) -> &'static str {
        match self {
            ContentType::Json => "Content-Type: application/json",
            ContentType::Yaml => "Content-Type: text/yaml",
            ContentType::PlainText => "Content-Type: text/plain; version=0.0.4",
        }
    }
}

/// A fully rendered response, ready to be written to the socket.
#[derive(Debug, Clone, PartialEq)]
pub struct ServiceResponse {
    pub status: u16,
    pub content_type: ContentType,
    pub body: Vec<u8>,
}

impl ServiceResponse {
    pub fn json(status: u16, body: &Value) -> Self {
        ServiceResponse {
            status,
            content_type: ContentType::Json,
            body: body.to_string().into_bytes(),
        }
    }

    pub fn text(status: u16, content_type: ContentType, body: impl Into<Vec<u8>>) -> Self {
        ServiceResponse {
            status,
            content_type,
            body: body.into(),
        }
    }

    /// Body parsed back as JSON, `None` for non-JSON bodies.
    pub fn body_json(&self) -> Option<Value> {
        serde_json::from_slice(&self.body).ok()
    }
}

impl From<HandlerResponse> for ServiceResponse {
    fn from(resp: HandlerResponse) -> Self {
        ServiceResponse::json(resp.status, &resp.body)
    }
}

pub fn status_reason(status: u16) -> &'static str {
    match status {
        200 => "OK",
        201 => "Created",
        204 => "No Content",
        400 => "Bad Request",
        404 => "Not Found",
        405 => "Method Not Allowed",
        422 => "Unprocessable Entity",
        500 => "Internal Server Error",
        503 => "Service Unavailable",
        _ => "Unknown",
    }
}

pub fn write_response(res: &mut Response, resp: ServiceResponse) {
    res.status_code(resp.status as usize, status_reason(resp.status));
    res.header(resp.content_type.header_line());
    res.body_vec(resp.body);
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_status_reason() {
        assert_eq!(status_reason(200), "OK");
        assert_eq!(status_reason(405), "Method Not Allowed");
        assert_eq!(status_reason(422), "Unprocessable Entity");
    }

    #[test]
    fn test_from_handler_response() {
        let resp = ServiceResponse::from(HandlerResponse::json(404, json!({"detail": "not found"})));
        assert_eq!(resp.status, 404);
        assert_eq!(resp.content_type, ContentType::Json);
        assert_eq!(resp.body_json(), Some(json!({"detail": "not found"})));
    }
}
