//! Fetch targets and local names
//!
//! Accepted forms: `www.host.tld/path`, `host/path`, `host`, `host:port/path`
//! and any of those behind `http://`. A missing path means `/`.

use crate::http::status::DEFAULT_DOCUMENT;
use crate::http::{Error, Result};
use std::fmt;

const HTTP_SCHEME: &str = "http://";

/// Host, optional port and path of a document to fetch
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Target {
    host: String,
    port: Option<u16>,
    path: String,
}

impl Target {
    /// Split a target into host, port and path
    pub fn parse(input: &str) -> Result<Self> {
        let rest = input.trim();
        let rest = rest.strip_prefix(HTTP_SCHEME).unwrap_or(rest);

        let (authority, path) = match rest.find('/') {
            Some(i) => (&rest[..i], &rest[i..]),
            None => (rest, "/"),
        };

        let (host, port) = match authority.rsplit_once(':') {
            Some((host, port)) => {
                let port = port
                    .parse::<u16>()
                    .map_err(|_| Error::InvalidTarget(format!("bad port in {}", input)))?;
                (host, Some(port))
            }
            None => (authority, None),
        };

        if host.is_empty() {
            return Err(Error::InvalidTarget(format!("no host in {}", input)));
        }

        Ok(Target {
            host: host.to_string(),
            port,
            path: path.to_string(),
        })
    }

    /// Whether `reference` names a document by absolute `http://` URL
    pub fn is_absolute(reference: &str) -> bool {
        reference.starts_with(HTTP_SCHEME)
    }

    pub fn host(&self) -> &str {
        &self.host
    }

    pub fn port(&self) -> Option<u16> {
        self.port
    }

    pub fn path(&self) -> &str {
        &self.path
    }

    /// Port to connect to, falling back to `default`
    pub fn port_or(&self, default: u16) -> u16 {
        self.port.unwrap_or(default)
    }

    /// Path the primary document is mirrored under; `/` becomes
    /// `/index.html`
    pub fn document_path(&self) -> &str {
        if self.path == "/" {
            DEFAULT_DOCUMENT
        } else {
            &self.path
        }
    }

    /// Same host and effective port
    pub fn same_origin(&self, host: &str, port: u16, default_port: u16) -> bool {
        self.host.eq_ignore_ascii_case(host) && self.port_or(default_port) == port
    }
}

impl fmt::Display for Target {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.port {
            Some(port) => write!(f, "{}{}:{}{}", HTTP_SCHEME, self.host, port, self.path),
            None => write!(f, "{}{}{}", HTTP_SCHEME, self.host, self.path),
        }
    }
}

/// Final path segment of a reference, used as its file name on disk.
///
/// `/` names the default document.
pub fn local_name(reference: &str) -> String {
    let path = if Target::is_absolute(reference) {
        match Target::parse(reference) {
            Ok(target) => target.path,
            Err(_) => reference.to_string(),
        }
    } else {
        reference.to_string()
    };

    if path == "/" || path.is_empty() {
        return DEFAULT_DOCUMENT.trim_start_matches('/').to_string();
    }

    path.rsplit('/').next().unwrap_or(&path).to_string()
}
