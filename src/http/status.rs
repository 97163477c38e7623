//! Status decisions for validated requests
//!
//! | method    | outcome                                                    |
//! |-----------|------------------------------------------------------------|
//! | HEAD      | 404 if the resource is missing, else 200                   |
//! | GET       | 404 if missing, 304 if `If-Modified-Since` is not older than the last-modified time, else 200 |
//! | PUT/POST  | 501 unless `Content-Type` is `text/html`, 201 if missing, else 204 |
//!
//! The engine only decides. Writing PUT/POST bodies is left to the caller.

use super::date::{is_not_older, parse_http_date};
use super::{FreshnessTable, HttpRequest, Method, ResourceStore, Result, Status};
use std::sync::Arc;

/// Resource served for the bare `/` target
pub const DEFAULT_DOCUMENT: &str = "/index.html";

/// The only media type accepted for PUT and POST bodies
pub const ACCEPTED_CONTENT_TYPE: &str = "text/html";

/// Map a request target onto a resource name
pub fn resource_name(target: &str) -> &str {
    if target == "/" {
        DEFAULT_DOCUMENT
    } else {
        target
    }
}

/// Decides the status code of a validated request
#[derive(Clone)]
pub struct StatusEngine {
    freshness: Arc<dyn FreshnessTable>,
}

impl StatusEngine {
    /// Create an engine answering conditional GETs from `freshness`
    pub fn new(freshness: Arc<dyn FreshnessTable>) -> Self {
        StatusEngine { freshness }
    }

    /// Decide the status for `request` against `store`.
    ///
    /// Fails only when an `If-Modified-Since` value cannot be parsed.
    pub fn decide(&self, request: &HttpRequest, store: &dyn ResourceStore) -> Result<Status> {
        let name = resource_name(request.target());

        match request.method() {
            Method::Head => Ok(Self::existing(store, name)),
            Method::Get => self.decide_get(request, store, name),
            Method::Put | Method::Post => Ok(Self::decide_write(request, store, name)),
        }
    }

    fn existing(store: &dyn ResourceStore, name: &str) -> Status {
        if store.exists(name) {
            Status::OK
        } else {
            Status::NOT_FOUND
        }
    }

    fn decide_get(
        &self,
        request: &HttpRequest,
        store: &dyn ResourceStore,
        name: &str,
    ) -> Result<Status> {
        if !store.exists(name) {
            return Ok(Status::NOT_FOUND);
        }

        let Some(since) = request.headers().get("If-Modified-Since") else {
            return Ok(Status::OK);
        };
        let supplied = parse_http_date(since)?;

        match self.freshness.last_modified(name) {
            Some(last_modified) if is_not_older(supplied, last_modified) => {
                Ok(Status::NOT_MODIFIED)
            }
            _ => Ok(Status::OK),
        }
    }

    fn decide_write(request: &HttpRequest, store: &dyn ResourceStore, name: &str) -> Status {
        let content_type = request.headers().get("Content-Type").map(str::trim);
        if content_type != Some(ACCEPTED_CONTENT_TYPE) {
            return Status::NOT_IMPLEMENTED;
        }

        if store.exists(name) {
            Status::NO_CONTENT
        } else {
            Status::CREATED
        }
    }
}
