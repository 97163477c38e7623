//! Property tests for message framing and request validation.

use proptest::prelude::*;
use rawhttp::http::chunked::{decode_chunked_body, encode_chunked_body};
use rawhttp::http::parser::is_valid_http_request;
use rawhttp::http::server::{Incoming, ServerContext};
use rawhttp::http::session::MemorySessionOps;
use rawhttp::http::store::MemoryStore;
use rawhttp::http::{HttpClient, HttpRequest, HttpServer, StaticFreshnessTable};
use std::sync::Arc;

fn split(data: &[u8], sizes: &[usize]) -> Vec<Vec<u8>> {
    let mut segments = Vec::new();
    let mut rest = data;
    let mut i = 0;
    while !rest.is_empty() {
        let n = sizes[i % sizes.len()].min(rest.len());
        segments.push(rest[..n].to_vec());
        rest = &rest[n..];
        i += 1;
    }
    segments
}

fn context() -> Arc<ServerContext> {
    Arc::new(ServerContext::new(
        Arc::new(MemoryStore::new()),
        Arc::new(StaticFreshnessTable::demo()),
        "http://127.0.0.1:5055",
    ))
}

fn receive(segments: Vec<Vec<u8>>) -> Vec<HttpRequest> {
    let mut server = HttpServer::new(MemorySessionOps::from_segments(segments), context());
    let mut requests = Vec::new();
    while let Ok(received) = server.receive_request() {
        match received.incoming {
            Incoming::Request(request) => requests.push(request),
            Incoming::Rejected(e) => panic!("rejected: {}", e),
        }
    }
    requests
}

fn arb_body() -> impl Strategy<Value = Vec<u8>> {
    prop::collection::vec(any::<u8>(), 0..300)
}

fn arb_sizes() -> impl Strategy<Value = Vec<usize>> {
    prop::collection::vec(1usize..32, 1..16)
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(128))]

    /// Any read segmentation of the same bytes yields the same requests.
    #[test]
    fn request_framing_is_chunk_size_independent(
        body in arb_body(),
        name in "[a-z]{1,8}",
        sizes in arb_sizes(),
    ) {
        let mut wire = format!(
            "PUT /{}.html HTTP/1.1\r\nHost: localhost\r\nContent-Type: text/html\r\nContent-Length: {}\r\n\r\n",
            name,
            body.len()
        )
        .into_bytes();
        wire.extend_from_slice(&body);
        wire.extend_from_slice(b"GET / HTTP/1.1\r\nConnection: close\r\n\r\n");

        let baseline = receive(vec![wire.clone()]);
        let split_up = receive(split(&wire, &sizes));

        prop_assert_eq!(baseline.len(), 2);
        prop_assert_eq!(baseline[0].body(), &body[..]);
        prop_assert_eq!(split_up, baseline);
    }

    /// Chunked encoding then decoding yields the original bytes.
    #[test]
    fn chunked_round_trip(
        body in prop::collection::vec(any::<u8>(), 0..10_000),
        chunk_size in 1usize..5_000,
    ) {
        let encoded = encode_chunked_body(&body, chunk_size).unwrap();
        prop_assert_eq!(decode_chunked_body(&encoded).unwrap(), body);
    }

    /// The client decodes a chunked response the same way for any segmentation.
    #[test]
    fn chunked_response_is_chunk_size_independent(
        body in arb_body(),
        chunk_size in 1usize..64,
        sizes in arb_sizes(),
    ) {
        let mut wire = b"HTTP/1.1 200 OK\r\nTransfer-Encoding: chunked\r\n\r\n".to_vec();
        wire.extend(encode_chunked_body(&body, chunk_size).unwrap());

        let ops = MemorySessionOps::from_segments(split(&wire, &sizes));
        let mut client = HttpClient::new(ops, "localhost");
        let response = client.get("/", false).unwrap();

        prop_assert_eq!(response.body(), &body[..]);
    }

    /// Two-token request lines are always rejected.
    #[test]
    fn two_tokens_rejected(method in "[A-Z]{1,8}", target in "/[a-z]{0,8}") {
        prop_assert!(!is_valid_http_request(&[method.as_str(), target.as_str()]));
    }

    /// Methods outside GET, HEAD, PUT and POST are rejected.
    #[test]
    fn unknown_methods_rejected(method in "[A-Z]{1,8}") {
        prop_assume!(!["GET", "HEAD", "PUT", "POST"].contains(&method.as_str()));
        prop_assert!(!is_valid_http_request(&[method.as_str(), "/", "HTTP/1.1"]));
    }

    /// Any version other than HTTP/1.1 is rejected.
    #[test]
    fn other_versions_rejected(version in "HTTP/[0-9]\\.[0-9]") {
        prop_assume!(version != "HTTP/1.1");
        prop_assert!(!is_valid_http_request(&["GET", "/", version.as_str()]));
    }

    /// PUT and POST targets with two or more slashes are rejected.
    #[test]
    fn nested_write_targets_rejected(
        method in prop::sample::select(vec!["PUT", "POST"]),
        dir in "[a-z]{0,6}",
        file in "[a-z]{1,6}",
    ) {
        let target = format!("/{}/{}.html", dir, file);
        prop_assert!(!is_valid_http_request(&[method, target.as_str(), "HTTP/1.1"]));
        prop_assert!(is_valid_http_request(&["GET", target.as_str(), "HTTP/1.1"]));
    }
}

#[test]
fn chunked_round_trip_boundary_lengths() {
    for len in [0, 1, 4096, 4097, 3 * 4096 + 5] {
        let body: Vec<u8> = (0..len).map(|i| (i % 251) as u8).collect();
        let encoded = encode_chunked_body(&body, 4096).unwrap();
        assert_eq!(decode_chunked_body(&encoded).unwrap(), body, "length {}", len);
    }
}
