//! Embedded-resource fetching
//!
//! References are fetched one at a time, in the order the extractor found
//! them. Same-origin references reuse the connection the document came in
//! on; the last reference asks the server to close it. Cross-origin
//! references go through a [`ResourceFetcher`], which runs a complete
//! connect, request, disconnect cycle before the next reference starts.

use super::extract::ReferenceExtractor;
use super::target::{local_name, Target};
use crate::http::client;
use crate::http::{Error, HttpClient, Result, SessionOps};
use tracing::{debug, info, warn};

/// Fetches one resource from another origin
pub trait ResourceFetcher {
    fn fetch_resource(&self, target: &Target) -> Result<Vec<u8>>;
}

impl<F> ResourceFetcher for F
where
    F: Fn(&Target) -> Result<Vec<u8>>,
{
    fn fetch_resource(&self, target: &Target) -> Result<Vec<u8>> {
        self(target)
    }
}

/// Opens a fresh TCP connection per resource
#[derive(Debug, Clone, Copy)]
pub struct TcpFetcher {
    default_port: u16,
}

impl TcpFetcher {
    /// Targets without an explicit port are fetched from `default_port`
    pub fn new(default_port: u16) -> Self {
        TcpFetcher { default_port }
    }
}

impl ResourceFetcher for TcpFetcher {
    fn fetch_resource(&self, target: &Target) -> Result<Vec<u8>> {
        let mut client = client::connect(target.host(), target.port_or(self.default_port))?;
        let response = client.get(target.path(), true);
        client.disconnect();
        Ok(response?.into_body())
    }
}

/// One embedded resource and where it goes on disk
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FetchedResource {
    /// The reference as it appears in the document
    pub reference: String,
    /// Final path segment, used as the file name
    pub local_name: String,
    pub bytes: Vec<u8>,
}

/// Outcome of fetching every reference of a document
#[derive(Debug, Default)]
pub struct FetchReport {
    pub fetched: Vec<FetchedResource>,
    pub failed: Vec<(String, Error)>,
}

/// Where a reference is fetched from
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Route {
    /// Over the document's own connection, at this path
    SameConnection(String),
    /// Over a new connection
    Remote(Target),
}

/// Drives extraction and fetching for one origin
pub struct Orchestrator<E, F> {
    extractor: E,
    fetcher: F,
    host: String,
    port: u16,
}

impl<E: ReferenceExtractor, F: ResourceFetcher> Orchestrator<E, F> {
    /// Documents handled by this orchestrator came from `host:port`
    pub fn new(extractor: E, fetcher: F, host: impl Into<String>, port: u16) -> Self {
        Orchestrator {
            extractor,
            fetcher,
            host: host.into(),
            port,
        }
    }

    /// Decide how `reference` is fetched.
    ///
    /// Relative references get a leading `/`.
    pub fn route(&self, reference: &str) -> Result<Route> {
        if !Target::is_absolute(reference) {
            let path = if reference.starts_with('/') {
                reference.to_string()
            } else {
                format!("/{}", reference)
            };
            return Ok(Route::SameConnection(path));
        }

        let target = Target::parse(reference)?;
        if target.same_origin(&self.host, self.port, self.port) {
            Ok(Route::SameConnection(target.path().to_string()))
        } else {
            Ok(Route::Remote(target))
        }
    }

    /// Fetch every reference in `document`.
    ///
    /// A failed remote fetch is recorded and skipped. A failure on the
    /// document's own connection ends the run, since that connection can no
    /// longer be framed; references after it are not attempted.
    pub fn fetch_all<S: SessionOps>(
        &self,
        client: &mut HttpClient<S>,
        document: &str,
    ) -> FetchReport {
        let references = self.extractor.extract(document);
        let last = references.len().saturating_sub(1);
        let mut report = FetchReport::default();

        debug!(host = %self.host, count = references.len(), "references extracted");

        for (index, reference) in references.iter().enumerate() {
            let route = match self.route(reference) {
                Ok(route) => route,
                Err(e) => {
                    warn!(reference = %reference, error = %e, "unusable reference");
                    report.failed.push((reference.clone(), e));
                    continue;
                }
            };

            let result = match &route {
                Route::SameConnection(path) => client
                    .get(path, index == last)
                    .map(|response| response.into_body()),
                Route::Remote(target) => self.fetcher.fetch_resource(target),
            };

            match result {
                Ok(bytes) => {
                    info!(reference = %reference, length = bytes.len(), "resource fetched");
                    report.fetched.push(FetchedResource {
                        reference: reference.clone(),
                        local_name: local_name(reference),
                        bytes,
                    });
                }
                Err(e) => {
                    warn!(reference = %reference, error = %e, "resource fetch failed");
                    let fatal = matches!(route, Route::SameConnection(_)) && e.is_transport();
                    report.failed.push((reference.clone(), e));
                    if fatal {
                        break;
                    }
                }
            }
        }

        report
    }
}
