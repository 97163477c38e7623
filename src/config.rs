//! Server and client configuration
//!
//! Both configurations are plain values built once at startup and only read
//! afterwards. Defaults reproduce the fixed settings the binaries use when
//! given no flags.

use crate::http::{CLIENT_HEADER_READ_SIZE, DEFAULT_HTTP_PORT, SERVER_HEADER_READ_SIZE};
use std::net::{IpAddr, Ipv4Addr, SocketAddr};
use std::path::PathBuf;

/// Server configuration
#[derive(Debug, Clone)]
pub struct ServerConfig {
    /// Address the listener binds
    pub bind_addr: SocketAddr,
    /// Directory resources are served from and written to
    pub document_root: PathBuf,
    /// Host advertised in `Location` headers; the bound IP when unset
    pub public_host: Option<String>,
    /// Bytes requested per read while looking for the end of a header block
    pub header_read_size: usize,
}

impl Default for ServerConfig {
    fn default() -> Self {
        ServerConfig {
            bind_addr: SocketAddr::new(IpAddr::V4(Ipv4Addr::UNSPECIFIED), DEFAULT_HTTP_PORT),
            document_root: PathBuf::from("."),
            public_host: None,
            header_read_size: SERVER_HEADER_READ_SIZE,
        }
    }
}

impl ServerConfig {
    /// Set the bind address
    pub fn bind_addr(mut self, addr: SocketAddr) -> Self {
        self.bind_addr = addr;
        self
    }

    /// Set the port, keeping the bind IP
    pub fn port(mut self, port: u16) -> Self {
        self.bind_addr.set_port(port);
        self
    }

    /// Set the document root
    pub fn document_root(mut self, root: impl Into<PathBuf>) -> Self {
        self.document_root = root.into();
        self
    }

    /// Set the host advertised in `Location` headers
    pub fn public_host(mut self, host: impl Into<String>) -> Self {
        self.public_host = Some(host.into());
        self
    }

    /// Set the header read size (at least 1)
    pub fn header_read_size(mut self, size: usize) -> Self {
        self.header_read_size = size.max(1);
        self
    }

    /// `http://host:port` as seen by clients of a listener bound to `local`
    pub fn origin_for(&self, local: SocketAddr) -> String {
        let host = match &self.public_host {
            Some(host) => host.clone(),
            None if local.ip().is_unspecified() => "localhost".to_string(),
            None => local.ip().to_string(),
        };
        format!("http://{}:{}", host, local.port())
    }
}

/// Client configuration
#[derive(Debug, Clone)]
pub struct ClientConfig {
    /// Bytes requested per read while looking for the end of a header block
    pub header_read_size: usize,
    /// Directory fetched documents are mirrored into
    pub output_dir: PathBuf,
}

impl Default for ClientConfig {
    fn default() -> Self {
        ClientConfig {
            header_read_size: CLIENT_HEADER_READ_SIZE,
            output_dir: PathBuf::from(".."),
        }
    }
}

impl ClientConfig {
    /// Set the header read size (at least 1)
    pub fn header_read_size(mut self, size: usize) -> Self {
        self.header_read_size = size.max(1);
        self
    }

    /// Set the mirror directory
    pub fn output_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.output_dir = dir.into();
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_server_defaults() {
        let config = ServerConfig::default();
        assert_eq!(config.bind_addr.port(), 5055);
        assert_eq!(config.header_read_size, 1);
    }

    #[test]
    fn test_origin_for() {
        let local: SocketAddr = "127.0.0.1:8080".parse().unwrap();
        assert_eq!(ServerConfig::default().origin_for(local), "http://127.0.0.1:8080");

        let any: SocketAddr = "0.0.0.0:5055".parse().unwrap();
        assert_eq!(ServerConfig::default().origin_for(any), "http://localhost:5055");
        assert_eq!(
            ServerConfig::default().public_host("example.org").origin_for(any),
            "http://example.org:5055"
        );
    }

    #[test]
    fn test_client_defaults() {
        let config = ClientConfig::default().header_read_size(0);
        assert_eq!(config.header_read_size, 1);
        assert_eq!(config.output_dir, PathBuf::from(".."));
    }
}
