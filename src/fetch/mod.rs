//! Client-side document fetching
//!
//! [`fetch_document`] runs one client invocation: send the request, mirror
//! the response body, and for HTML documents fetch and mirror every embedded
//! image, rewriting the document to point at the local copies.

pub mod extract;
pub mod mirror;
pub mod orchestrator;
pub mod target;

pub use extract::{ImgExtractor, ReferenceExtractor};
pub use mirror::Mirror;
pub use orchestrator::{FetchReport, FetchedResource, Orchestrator, ResourceFetcher, TcpFetcher};
pub use target::{local_name, Target};

use crate::config::ClientConfig;
use crate::http::{client, Error, HttpClient, HttpResponse, Method, Result, SessionOps};
use std::path::PathBuf;
use tracing::{info, warn};

/// Everything one invocation produced
#[derive(Debug)]
pub struct FetchOutcome {
    pub response: HttpResponse,
    /// Mirrored primary document, if one was written
    pub document: Option<PathBuf>,
    /// Mirrored embedded resources, in fetch order
    pub resources: Vec<PathBuf>,
    /// References that could not be fetched or written
    pub failed: Vec<(String, Error)>,
}

/// Connect to `target`, run [`fetch_document`], then disconnect
pub fn run(
    method: Method,
    target: &Target,
    port: u16,
    body: &[u8],
    config: &ClientConfig,
) -> Result<FetchOutcome> {
    let port = target.port_or(port);
    let mut client =
        client::connect(target.host(), port)?.with_header_read_size(config.header_read_size);

    let orchestrator = Orchestrator::new(ImgExtractor, TcpFetcher::new(port), target.host(), port);
    let mirror = Mirror::new(&config.output_dir, target.host());

    let outcome = fetch_document(&mut client, method, target, body, &orchestrator, &mirror);
    client.disconnect();
    outcome
}

/// Issue `method` for `target` over `client` and mirror the result.
///
/// GET bodies are written as the primary document; HTML ones first have
/// their images fetched and rewritten. PUT and POST bodies are written when
/// the server sent one. HEAD writes nothing.
pub fn fetch_document<S, E, F>(
    client: &mut HttpClient<S>,
    method: Method,
    target: &Target,
    body: &[u8],
    orchestrator: &Orchestrator<E, F>,
    mirror: &Mirror,
) -> Result<FetchOutcome>
where
    S: SessionOps,
    E: ReferenceExtractor,
    F: ResourceFetcher,
{
    let response = client.request(method, target.path(), body, false)?;
    info!(
        method = %method,
        target = %target,
        status = response.status().code(),
        length = response.body().len(),
        "response received"
    );

    let mut outcome = FetchOutcome {
        response,
        document: None,
        resources: Vec::new(),
        failed: Vec::new(),
    };

    match method {
        Method::Head => {}
        Method::Put | Method::Post if outcome.response.body().is_empty() => {}
        Method::Get if is_html(&outcome.response) => {
            let charset = client.charset();
            let text = charset.decode(outcome.response.body());
            let report = orchestrator.fetch_all(client, &text);
            outcome.failed = report.failed;

            for resource in &report.fetched {
                match mirror.write_resource(resource) {
                    Ok(file) => outcome.resources.push(file),
                    Err(e) => {
                        warn!(reference = %resource.reference, error = %e, "resource not written");
                        outcome.failed.push((resource.reference.clone(), e));
                    }
                }
            }

            let rewritten = mirror::rewrite(&text, &report.fetched);
            let file = mirror.write_document(target.document_path(), &charset.encode(&rewritten))?;
            outcome.document = Some(file);
        }
        _ => {
            let file = mirror.write_document(target.document_path(), outcome.response.body())?;
            outcome.document = Some(file);
        }
    }

    Ok(outcome)
}

fn is_html(response: &HttpResponse) -> bool {
    response
        .headers()
        .get_ignore_case("Content-Type")
        .map_or(true, |ct| ct.trim().to_ascii_lowercase().starts_with("text/html"))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::http::session::MemorySessionOps;

    fn response(content_type: &str, body: &[u8]) -> Vec<u8> {
        let mut out = format!(
            "HTTP/1.1 200 OK\r\nContent-Type: {}\r\nContent-Length: {}\r\n\r\n",
            content_type,
            body.len()
        )
        .into_bytes();
        out.extend_from_slice(body);
        out
    }

    fn no_remote(_: &Target) -> Result<Vec<u8>> {
        Err(Error::Resolve("unexpected".to_string()))
    }

    #[test]
    fn test_get_mirrors_document_and_images() {
        let out = tempfile::tempdir().unwrap();
        let page = br#"<html><img src="pics/a.png"></html>"#;
        let ops = MemorySessionOps::from_segments([
            response("text/html", page),
            response("image/png", b"PNG"),
        ]);
        let mut client = HttpClient::new(ops, "localhost");
        let target = Target::parse("localhost/").unwrap();
        let orchestrator = Orchestrator::new(ImgExtractor, no_remote, "localhost", 5055);
        let mirror = Mirror::new(out.path(), "localhost");

        let outcome =
            fetch_document(&mut client, Method::Get, &target, &[], &orchestrator, &mirror).unwrap();

        assert!(outcome.failed.is_empty());
        let doc = outcome.document.unwrap();
        assert_eq!(doc, out.path().join("localhost/index.html"));
        assert_eq!(
            std::fs::read_to_string(doc).unwrap(),
            r#"<html><img src="a.png"></html>"#
        );
        assert_eq!(outcome.resources, [out.path().join("localhost/a.png")]);
        assert_eq!(std::fs::read(&outcome.resources[0]).unwrap(), b"PNG");
    }

    #[test]
    fn test_non_html_get_is_written_raw() {
        let out = tempfile::tempdir().unwrap();
        let ops = MemorySessionOps::from_segments([response("image/png", b"<img src=x>")]);
        let mut client = HttpClient::new(ops, "localhost");
        let target = Target::parse("localhost/logo.png").unwrap();
        let orchestrator = Orchestrator::new(ImgExtractor, no_remote, "localhost", 5055);
        let mirror = Mirror::new(out.path(), "localhost");

        let outcome =
            fetch_document(&mut client, Method::Get, &target, &[], &orchestrator, &mirror).unwrap();

        assert!(outcome.resources.is_empty());
        assert_eq!(std::fs::read(outcome.document.unwrap()).unwrap(), b"<img src=x>");
    }

    #[test]
    fn test_head_writes_nothing() {
        let out = tempfile::tempdir().unwrap();
        let ops = MemorySessionOps::from_segments([
            b"HTTP/1.1 200 OK\r\nContent-Length: 10\r\n\r\n".to_vec(),
        ]);
        let mut client = HttpClient::new(ops, "localhost");
        let target = Target::parse("localhost").unwrap();
        let orchestrator = Orchestrator::new(ImgExtractor, no_remote, "localhost", 5055);
        let mirror = Mirror::new(out.path(), "localhost");

        let outcome =
            fetch_document(&mut client, Method::Head, &target, &[], &orchestrator, &mirror).unwrap();

        assert!(outcome.document.is_none());
        assert!(!mirror.host_dir().exists());
    }

    #[test]
    fn test_put_created_has_nothing_to_write() {
        let out = tempfile::tempdir().unwrap();
        let ops = MemorySessionOps::from_segments([
            b"HTTP/1.1 201 Created\r\nLocation: http://localhost:5055/n.html\r\n\r\n".to_vec(),
        ]);
        let mut client = HttpClient::new(ops, "localhost");
        let target = Target::parse("localhost/n.html").unwrap();
        let orchestrator = Orchestrator::new(ImgExtractor, no_remote, "localhost", 5055);
        let mirror = Mirror::new(out.path(), "localhost");

        let outcome =
            fetch_document(&mut client, Method::Put, &target, b"<p>n</p>", &orchestrator, &mirror)
                .unwrap();

        assert_eq!(outcome.response.status().code(), 201);
        assert!(outcome.document.is_none());
    }
}
