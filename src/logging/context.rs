use uuid::Uuid;

/// Response and request header carrying the correlation id.
pub const REQUEST_ID_HEADER: &str = "x-request-id";

/// Per-request values handed explicitly through the service layer.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RequestContext {
    pub request_id: String,
}

impl RequestContext {
    /// Use the caller's id if one was supplied and non-blank, otherwise mint a UUID.
    pub fn from_header(value: Option<&str>) -> Self {
        let request_id = match value.map(str::trim) {
            Some(id) if !id.is_empty() => id.to_string(),
            _ => Uuid::new_v4().to_string(),
        };
        Self { request_id }
    }
}
