//! Response construction
//!
//! Every response carries a `Date` header. Bodies come with a
//! `Content-Length`/`Content-Type` pair, 201 responses with a `Location`.
//! 304, 400, 404 and 500 carry a fixed HTML page; 201, 204 and 501 carry
//! nothing. Responses to HEAD keep their headers but drop the body.

use super::date;
use super::status::resource_name;
use super::{HttpRequest, HttpResponse, Method, ResourceStore, Result, Status, WriteMode};

pub const NOT_MODIFIED_PAGE: &str = "<!DOCTYPE html>\n<html>\n<head><title>304 Not Modified</title></head>\n<body><h1>Not Modified</h1><p>The resource has not changed since the requested date.</p></body>\n</html>\n";

pub const BAD_REQUEST_PAGE: &str = "<!DOCTYPE html>\n<html>\n<head><title>400 Bad Request</title></head>\n<body><h1>Bad Request</h1><p>The server could not understand the request.</p></body>\n</html>\n";

pub const NOT_FOUND_PAGE: &str = "<!DOCTYPE html>\n<html>\n<head><title>404 Not Found</title></head>\n<body><h1>Not Found</h1><p>The requested resource does not exist on this server.</p></body>\n</html>\n";

pub const INTERNAL_ERROR_PAGE: &str = "<!DOCTYPE html>\n<html>\n<head><title>500 Internal Server Error</title></head>\n<body><h1>Internal Server Error</h1><p>The server failed to complete the request.</p></body>\n</html>\n";

/// Media type for a resource, from its extension
///
/// `.jpg` is `image/jpeg`, `.png` and `.gif` are `image/<ext>`, anything
/// else is `text/<ext>`.
pub fn content_type_for(name: &str) -> String {
    let file = name.rsplit('/').next().unwrap_or(name);
    let extension = file.rsplit('.').next().unwrap_or(file);

    match extension {
        "jpg" => "image/jpeg".to_string(),
        "png" | "gif" => format!("image/{}", extension),
        _ => format!("text/{}", extension),
    }
}

/// Fixed page attached to a status, if any
pub fn error_page(status: Status) -> Option<&'static str> {
    match status.code() {
        304 => Some(NOT_MODIFIED_PAGE),
        400 => Some(BAD_REQUEST_PAGE),
        404 => Some(NOT_FOUND_PAGE),
        500 => Some(INTERNAL_ERROR_PAGE),
        _ => None,
    }
}

/// Turns status decisions into serialized-ready responses
#[derive(Debug, Clone)]
pub struct ResponseBuilder {
    origin: String,
}

impl ResponseBuilder {
    /// `origin` is the `http://host:port` prefix used in `Location` headers
    pub fn new(origin: impl Into<String>) -> Self {
        ResponseBuilder {
            origin: origin.into(),
        }
    }

    /// The `http://host:port` prefix
    pub fn origin(&self) -> &str {
        &self.origin
    }

    /// Persist a PUT/POST body for a 201 or 204 decision.
    ///
    /// Must run before the response is sent so a follow-up request on the
    /// same connection sees the new contents.
    pub fn apply_write(
        &self,
        request: &HttpRequest,
        status: Status,
        store: &dyn ResourceStore,
    ) -> Result<()> {
        let mode = match (status, request.method()) {
            (Status::CREATED, _) => WriteMode::Create,
            (Status::NO_CONTENT, Method::Put) => WriteMode::Overwrite,
            (Status::NO_CONTENT, Method::Post) => WriteMode::Append,
            _ => return Ok(()),
        };

        store.write(resource_name(request.target()), request.body(), mode)
    }

    /// Build the response for `request` given its decided status
    pub fn build(
        &self,
        request: &HttpRequest,
        status: Status,
        store: &dyn ResourceStore,
    ) -> Result<HttpResponse> {
        let name = resource_name(request.target());

        let response = match status {
            Status::OK => {
                let body = store.read(name)?;
                self.with_body(status, &content_type_for(name), body)
            }
            Status::CREATED => HttpResponse::builder()
                .status(status)
                .header("Date", date::now())
                .header("Location", format!("{}{}", self.origin, name))
                .build(),
            _ => self.status_only(status),
        };

        Ok(for_method(request, response))
    }

    /// [`status_only`](Self::status_only) answering `request`, so a HEAD
    /// still gets no body
    pub fn failure(&self, request: &HttpRequest, status: Status) -> HttpResponse {
        for_method(request, self.status_only(status))
    }

    /// Response for a status that needs no request context: the fixed page
    /// if the status has one, otherwise just the `Date` header
    pub fn status_only(&self, status: Status) -> HttpResponse {
        match error_page(status) {
            Some(page) => self.with_body(status, "text/html", page.as_bytes().to_vec()),
            None => HttpResponse::builder()
                .status(status)
                .header("Date", date::now())
                .build(),
        }
    }

    fn with_body(&self, status: Status, content_type: &str, body: Vec<u8>) -> HttpResponse {
        HttpResponse::builder()
            .status(status)
            .header("Date", date::now())
            .header("Content-Length", body.len().to_string())
            .header("Content-Type", content_type)
            .body(body)
            .build()
    }
}

fn for_method(request: &HttpRequest, response: HttpResponse) -> HttpResponse {
    if request.method() == Method::Head {
        without_body(response)
    } else {
        response
    }
}

fn without_body(response: HttpResponse) -> HttpResponse {
    HttpResponse::builder()
        .version(response.version())
        .status(response.status())
        .reason(response.reason())
        .headers(response.headers().clone())
        .build()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::http::store::MemoryStore;

    fn builder() -> ResponseBuilder {
        ResponseBuilder::new("http://127.0.0.1:5055")
    }

    fn request(method: Method, target: &str, body: &[u8]) -> HttpRequest {
        HttpRequest::builder()
            .method(method)
            .target(target)
            .body(body.to_vec())
            .build()
    }

    #[test]
    fn test_content_types() {
        assert_eq!(content_type_for("/photo.jpg"), "image/jpeg");
        assert_eq!(content_type_for("/logo.png"), "image/png");
        assert_eq!(content_type_for("/anim.gif"), "image/gif");
        assert_eq!(content_type_for("/index.html"), "text/html");
        assert_eq!(content_type_for("/style.css"), "text/css");
    }

    #[test]
    fn test_ok_response_carries_file() {
        let store = MemoryStore::new().with("/index.html", "<p>hi</p>");
        let resp = builder()
            .build(&request(Method::Get, "/", b""), Status::OK, &store)
            .unwrap();

        assert_eq!(resp.status(), Status::OK);
        assert_eq!(resp.body(), b"<p>hi</p>");
        assert_eq!(resp.headers().get("Content-Length"), Some("9"));
        assert_eq!(resp.headers().get("Content-Type"), Some("text/html"));
        assert!(resp.headers().get("Date").is_some_and(|d| d.ends_with("GMT")));
    }

    #[test]
    fn test_head_drops_body_keeps_length() {
        let store = MemoryStore::new().with("/index.html", "<p>hi</p>");
        let resp = builder()
            .build(&request(Method::Head, "/index.html", b""), Status::OK, &store)
            .unwrap();

        assert!(resp.body().is_empty());
        assert_eq!(resp.headers().get("Content-Length"), Some("9"));
    }

    #[test]
    fn test_created_has_location_and_no_body() {
        let store = MemoryStore::new();
        let resp = builder()
            .build(&request(Method::Put, "/new.html", b"x"), Status::CREATED, &store)
            .unwrap();

        assert_eq!(
            resp.headers().get("Location"),
            Some("http://127.0.0.1:5055/new.html")
        );
        assert!(resp.body().is_empty());
        assert!(resp.headers().get("Content-Length").is_none());
    }

    #[test]
    fn test_error_pages() {
        let b = builder();
        for status in [Status::NOT_MODIFIED, Status::BAD_REQUEST, Status::NOT_FOUND, Status::INTERNAL_SERVER_ERROR] {
            let resp = b.status_only(status);
            assert_eq!(resp.body(), error_page(status).unwrap().as_bytes());
            assert_eq!(resp.headers().get("Content-Type"), Some("text/html"));
        }

        for status in [Status::NO_CONTENT, Status::NOT_IMPLEMENTED] {
            let resp = b.status_only(status);
            assert!(resp.body().is_empty());
            assert_eq!(resp.headers().len(), 1);
        }
    }

    #[test]
    fn test_failure_for_head_has_no_body() {
        let b = builder();
        let head = b.failure(&request(Method::Head, "/", b""), Status::INTERNAL_SERVER_ERROR);
        let get = b.failure(&request(Method::Get, "/", b""), Status::INTERNAL_SERVER_ERROR);

        assert!(head.body().is_empty());
        assert_eq!(head.headers().get("Content-Length"), get.headers().get("Content-Length"));
        assert_eq!(get.body(), error_page(Status::INTERNAL_SERVER_ERROR).unwrap().as_bytes());
    }

    #[test]
    fn test_apply_write_modes() {
        let store = MemoryStore::new();
        let b = builder();

        b.apply_write(&request(Method::Put, "/a.html", b"one"), Status::CREATED, &store)
            .unwrap();
        b.apply_write(&request(Method::Post, "/a.html", b"two"), Status::NO_CONTENT, &store)
            .unwrap();
        assert_eq!(store.read("/a.html").unwrap(), b"onetwo");

        b.apply_write(&request(Method::Put, "/a.html", b"three"), Status::NO_CONTENT, &store)
            .unwrap();
        assert_eq!(store.read("/a.html").unwrap(), b"three");

        b.apply_write(&request(Method::Put, "/a.html", b"ignored"), Status::NOT_IMPLEMENTED, &store)
            .unwrap();
        assert_eq!(store.read("/a.html").unwrap(), b"three");
    }
}
