//! Success shapes produced by bound endpoints
//!
//! - **200 OK** - [`Success`], JSON body
//! - **201 Created** - [`Created`], JSON body and `Location` of the new resource
//! - **202 Accepted** - [`Accepted`], JSON body and `Location` to poll
//! - **204 No Content** - [`NoContent`], empty body
//!
//! Commands bound with a result return the closed [`CommandResponse`], so the
//! shape is chosen by the [`SuccessStatus`] fixed at bind time and never by
//! the result value.

use axum::{
    http::{header, HeaderValue, StatusCode},
    response::{IntoResponse, Response},
    Json,
};
use percent_encoding::{utf8_percent_encode, AsciiSet, CONTROLS};
use serde::Serialize;

use crate::error::{Error, Result};

// ============================================================================
// 200 OK
// ============================================================================

/// HTTP 200 OK response with a JSON body
#[derive(Debug, Clone, PartialEq)]
pub struct Success<T> {
    data: T,
}

impl<T> Success<T> {
    /// Create a new 200 OK response
    pub fn new(data: T) -> Self {
        Self { data }
    }

    /// The response body
    pub fn data(&self) -> &T {
        &self.data
    }

    /// Consume into the response body
    pub fn into_inner(self) -> T {
        self.data
    }
}

impl<T: Serialize> IntoResponse for Success<T> {
    fn into_response(self) -> Response {
        (StatusCode::OK, Json(self.data)).into_response()
    }
}

// ============================================================================
// 201 Created
// ============================================================================

/// HTTP 201 Created response
///
/// Carries a `Location` header pointing to the created resource.
#[derive(Debug, Clone, PartialEq)]
pub struct Created<T> {
    data: T,
    location: String,
}

impl<T> Created<T> {
    /// Create a new 201 Created response
    pub fn new(data: T, location: impl Into<String>) -> Self {
        Self {
            data,
            location: location.into(),
        }
    }

    /// The response body
    pub fn data(&self) -> &T {
        &self.data
    }

    /// The `Location` header value
    pub fn location(&self) -> &str {
        &self.location
    }
}

impl<T: Serialize> IntoResponse for Created<T> {
    fn into_response(self) -> Response {
        with_location(
            (StatusCode::CREATED, Json(self.data)).into_response(),
            &self.location,
        )
    }
}

// ============================================================================
// 202 Accepted
// ============================================================================

/// HTTP 202 Accepted response
///
/// The resource may not exist yet, so `Location` names the collection the
/// request was accepted into.
#[derive(Debug, Clone, PartialEq)]
pub struct Accepted<T> {
    data: T,
    location: String,
}

impl<T> Accepted<T> {
    /// Create a new 202 Accepted response
    pub fn new(data: T, location: impl Into<String>) -> Self {
        Self {
            data,
            location: location.into(),
        }
    }

    /// The response body
    pub fn data(&self) -> &T {
        &self.data
    }

    /// The `Location` header value
    pub fn location(&self) -> &str {
        &self.location
    }
}

impl<T: Serialize> IntoResponse for Accepted<T> {
    fn into_response(self) -> Response {
        with_location(
            (StatusCode::ACCEPTED, Json(self.data)).into_response(),
            &self.location,
        )
    }
}

// ============================================================================
// 204 No Content
// ============================================================================

/// HTTP 204 No Content response
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct NoContent;

impl IntoResponse for NoContent {
    fn into_response(self) -> Response {
        StatusCode::NO_CONTENT.into_response()
    }
}

fn with_location(mut response: Response, location: &str) -> Response {
    match HeaderValue::from_str(location) {
        Ok(value) => {
            response.headers_mut().insert(header::LOCATION, value);
        }
        Err(_) => {
            tracing::warn!(location, "Location is not a valid header value; omitted");
        }
    }
    response
}

// ============================================================================
// Command results
// ============================================================================

/// Success status accepted by command endpoints that return a result
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SuccessStatus {
    /// 200, result in the body
    Ok,
    /// 201, result in the body and `Location` of the created resource
    Created,
    /// 202, result in the body and `Location` of the collection
    Accepted,
}

impl SuccessStatus {
    /// The HTTP status this shape responds with
    pub const fn status_code(self) -> StatusCode {
        match self {
            SuccessStatus::Ok => StatusCode::OK,
            SuccessStatus::Created => StatusCode::CREATED,
            SuccessStatus::Accepted => StatusCode::ACCEPTED,
        }
    }
}

impl TryFrom<StatusCode> for SuccessStatus {
    type Error = Error;

    fn try_from(status: StatusCode) -> Result<Self> {
        match status {
            StatusCode::OK => Ok(SuccessStatus::Ok),
            StatusCode::CREATED => Ok(SuccessStatus::Created),
            StatusCode::ACCEPTED => Ok(SuccessStatus::Accepted),
            other => Err(Error::UnsupportedSuccessStatus {
                status: other.as_u16(),
            }),
        }
    }
}

impl TryFrom<u16> for SuccessStatus {
    type Error = Error;

    fn try_from(status: u16) -> Result<Self> {
        StatusCode::from_u16(status)
            .map_err(|_| Error::UnsupportedSuccessStatus { status })
            .and_then(SuccessStatus::try_from)
    }
}

/// Identity of a created resource, appended to the route pattern for 201
///
/// Results without an identity return `None`; the `Location` then falls back
/// to the pattern itself.
pub trait ResourceId {
    /// Identifier rendered into the `Location` header
    fn resource_id(&self) -> Option<String>;
}

impl ResourceId for () {
    fn resource_id(&self) -> Option<String> {
        None
    }
}

impl ResourceId for uuid::Uuid {
    fn resource_id(&self) -> Option<String> {
        Some(self.to_string())
    }
}

impl ResourceId for String {
    fn resource_id(&self) -> Option<String> {
        Some(self.clone())
    }
}

impl ResourceId for u64 {
    fn resource_id(&self) -> Option<String> {
        Some(self.to_string())
    }
}

impl<T: ResourceId> ResourceId for Option<T> {
    fn resource_id(&self) -> Option<String> {
        self.as_ref().and_then(ResourceId::resource_id)
    }
}

// Characters escaped in a single path segment; non-ASCII is always escaped
const PATH_SEGMENT: &AsciiSet = &CONTROLS
    .add(b' ')
    .add(b'"')
    .add(b'#')
    .add(b'%')
    .add(b'/')
    .add(b'<')
    .add(b'>')
    .add(b'?')
    .add(b'\\')
    .add(b'`')
    .add(b'{')
    .add(b'}');

/// `Location` of a created resource: `<base><pattern>/<id>`
///
/// The id is percent-encoded as one path segment, so `x/y` never points at
/// a nested resource.
pub fn created_location(base: &str, pattern: &str, id: Option<&str>) -> String {
    match id {
        Some(id) => format!(
            "{base}{}/{}",
            pattern.trim_end_matches('/'),
            utf8_percent_encode(id, PATH_SEGMENT)
        ),
        None => format!("{base}{pattern}"),
    }
}

/// `Location` of an accepted request: `<base><pattern>`
pub fn accepted_location(base: &str, pattern: &str) -> String {
    format!("{base}{pattern}")
}

/// One success shape for a command that returns a result
#[derive(Debug, Clone, PartialEq)]
pub enum CommandResponse<T> {
    /// 200 OK
    Ok(Success<T>),
    /// 201 Created
    Created(Created<T>),
    /// 202 Accepted
    Accepted(Accepted<T>),
}

impl<T> CommandResponse<T> {
    /// The HTTP status of this shape
    pub fn status_code(&self) -> StatusCode {
        match self {
            CommandResponse::Ok(_) => StatusCode::OK,
            CommandResponse::Created(_) => StatusCode::CREATED,
            CommandResponse::Accepted(_) => StatusCode::ACCEPTED,
        }
    }

    /// The response body
    pub fn data(&self) -> &T {
        match self {
            CommandResponse::Ok(r) => r.data(),
            CommandResponse::Created(r) => r.data(),
            CommandResponse::Accepted(r) => r.data(),
        }
    }

    /// The `Location` header value, absent for 200
    pub fn location(&self) -> Option<&str> {
        match self {
            CommandResponse::Ok(_) => None,
            CommandResponse::Created(r) => Some(r.location()),
            CommandResponse::Accepted(r) => Some(r.location()),
        }
    }
}

impl<T: Serialize> IntoResponse for CommandResponse<T> {
    fn into_response(self) -> Response {
        match self {
            CommandResponse::Ok(r) => r.into_response(),
            CommandResponse::Created(r) => r.into_response(),
            CommandResponse::Accepted(r) => r.into_response(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde::Deserialize;

    #[derive(Serialize, Deserialize)]
    struct TestData {
        id: u64,
        name: String,
    }

    #[test]
    fn test_created_response() {
        let data = TestData {
            id: 1,
            name: "Test".to_string(),
        };
        let response = Created::new(data, "/test/1").into_response();
        assert_eq!(response.status(), StatusCode::CREATED);
        assert_eq!(response.headers().get(header::LOCATION).unwrap(), "/test/1");
    }

    #[test]
    fn test_accepted_response() {
        let response = Accepted::new(TestData { id: 2, name: "Queued".into() }, "/imports")
            .into_response();
        assert_eq!(response.status(), StatusCode::ACCEPTED);
        assert_eq!(response.headers().get(header::LOCATION).unwrap(), "/imports");
    }

    #[test]
    fn test_no_content_response() {
        let response = NoContent.into_response();
        assert_eq!(response.status(), StatusCode::NO_CONTENT);
    }

    #[test]
    fn test_invalid_location_is_omitted() {
        let response = Created::new(1u8, "/bad\nvalue").into_response();
        assert_eq!(response.status(), StatusCode::CREATED);
        assert!(response.headers().get(header::LOCATION).is_none());
    }

    #[test]
    fn test_success_status_accepts_only_200_201_202() {
        assert_eq!(SuccessStatus::try_from(StatusCode::OK).unwrap(), SuccessStatus::Ok);
        assert_eq!(SuccessStatus::try_from(201u16).unwrap(), SuccessStatus::Created);
        assert_eq!(
            SuccessStatus::try_from(StatusCode::ACCEPTED).unwrap(),
            SuccessStatus::Accepted
        );

        for status in [204u16, 301, 401, 500] {
            assert!(matches!(
                SuccessStatus::try_from(status),
                Err(Error::UnsupportedSuccessStatus { status: s }) if s == status
            ));
        }
        assert!(SuccessStatus::try_from(42u16).is_err());
    }

    #[test]
    fn test_created_location() {
        assert_eq!(created_location("", "/products", Some("abc-123")), "/products/abc-123");
        assert_eq!(created_location("", "/products/", Some("abc-123")), "/products/abc-123");
        assert_eq!(
            created_location("https://api.example.com", "/products", Some("7")),
            "https://api.example.com/products/7"
        );
        assert_eq!(created_location("", "/products", None), "/products");
        assert_eq!(accepted_location("", "/imports"), "/imports");
    }

    #[test]
    fn test_created_location_encodes_id_as_one_segment() {
        assert_eq!(created_location("", "/products", Some("a b")), "/products/a%20b");
        assert_eq!(created_location("", "/products", Some("x/y?z")), "/products/x%2Fy%3Fz");
        assert_eq!(created_location("", "/products", Some("café")), "/products/caf%C3%A9");
        assert_eq!(created_location("", "/products", Some("50%#1")), "/products/50%25%231");
        assert_eq!(created_location("", "/products", Some("sku-1_a.b~c")), "/products/sku-1_a.b~c");
    }

    #[test]
    fn test_command_response_accessors() {
        let response = CommandResponse::Created(Created::new(5u64, "/things/5"));
        assert_eq!(response.status_code(), StatusCode::CREATED);
        assert_eq!(*response.data(), 5);
        assert_eq!(response.location(), Some("/things/5"));

        let response = CommandResponse::Ok(Success::new(5u64));
        assert_eq!(response.location(), None);
        assert_eq!(response.into_response().status(), StatusCode::OK);
    }

    #[test]
    fn test_resource_id_of_optional() {
        assert_eq!(Some(9u64).resource_id(), Some("9".to_string()));
        assert_eq!(None::<u64>.resource_id(), None);
        assert_eq!(().resource_id(), None);
    }
}
