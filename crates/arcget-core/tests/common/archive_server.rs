//! Minimal HTTP/1.1 server for integration tests.
//!
//! Serves a fixed set of paths (a record manifest plus file bodies), answers
//! GET with Range as 206 Partial Content, and records every request it saw so
//! tests can assert which transfers happened and from which offset.

use std::collections::HashMap;
use std::io::{Read, Write};
use std::net::TcpListener;
use std::sync::{Arc, Mutex};
use std::thread;

#[derive(Debug, Clone, Copy)]
pub struct ServerOptions {
    /// If false, GET ignores Range and always returns 200 with the full body.
    pub support_ranges: bool,
}

impl Default for ServerOptions {
    fn default() -> Self {
        Self {
            support_ranges: true,
        }
    }
}

/// One recorded request.
#[derive(Debug, Clone)]
pub struct SeenRequest {
    pub path: String,
    /// Start offset of a `Range: bytes=N-` header, if the request had one.
    pub range_start: Option<u64>,
}

pub struct ArchiveServer {
    /// Base URL without trailing slash, e.g. "http://127.0.0.1:12345".
    pub base_url: String,
    routes: Arc<Mutex<HashMap<String, Vec<u8>>>>,
    seen: Arc<Mutex<Vec<SeenRequest>>>,
}

impl ArchiveServer {
    /// Register (or replace) the body served at `path`. Routes can be added
    /// after start, which matters for bodies that embed the server's URL.
    pub fn add_route(&self, path: &str, body: Vec<u8>) {
        self.routes
            .lock()
            .unwrap()
            .insert(path.to_string(), body);
    }

    pub fn requests(&self) -> Vec<SeenRequest> {
        self.seen.lock().unwrap().clone()
    }

    pub fn hits(&self, path: &str) -> usize {
        self.seen
            .lock()
            .unwrap()
            .iter()
            .filter(|r| r.path == path)
            .count()
    }
}

/// Starts a server in a background thread. Register bodies with `add_route`;
/// unknown paths get 404. The server runs until the process exits.
pub fn start(opts: ServerOptions) -> ArchiveServer {
    let listener = TcpListener::bind("127.0.0.1:0").expect("bind");
    let port = listener.local_addr().unwrap().port();
    let routes: Arc<Mutex<HashMap<String, Vec<u8>>>> = Arc::new(Mutex::new(HashMap::new()));
    let seen: Arc<Mutex<Vec<SeenRequest>>> = Arc::new(Mutex::new(Vec::new()));
    let routes_accept = Arc::clone(&routes);
    let seen_accept = Arc::clone(&seen);
    thread::spawn(move || {
        for stream in listener.incoming().flatten() {
            let routes = Arc::clone(&routes_accept);
            let seen = Arc::clone(&seen_accept);
            thread::spawn(move || handle(stream, &routes, &seen, opts));
        }
    });
    ArchiveServer {
        base_url: format!("http://127.0.0.1:{}", port),
        routes,
        seen,
    }
}

fn handle(
    mut stream: std::net::TcpStream,
    routes: &Mutex<HashMap<String, Vec<u8>>>,
    seen: &Mutex<Vec<SeenRequest>>,
    opts: ServerOptions,
) {
    let _ = stream.set_read_timeout(Some(std::time::Duration::from_secs(2)));
    let _ = stream.set_write_timeout(Some(std::time::Duration::from_secs(2)));
    let mut buf = [0u8; 8192];
    let n = match stream.read(&mut buf) {
        Ok(0) => return,
        Ok(n) => n,
        Err(_) => return,
    };
    let request = match std::str::from_utf8(&buf[..n]) {
        Ok(s) => s,
        Err(_) => return,
    };
    let (method, path, range_start) = parse_request(request);
    seen.lock().unwrap().push(SeenRequest {
        path: path.to_string(),
        range_start,
    });

    if !method.eq_ignore_ascii_case("GET") {
        let _ = stream.write_all(b"HTTP/1.1 405 Method Not Allowed\r\n\r\n");
        return;
    }
    let body = match routes.lock().unwrap().get(path) {
        Some(body) => body.clone(),
        None => {
            let _ = stream.write_all(b"HTTP/1.1 404 Not Found\r\nContent-Length: 0\r\n\r\n");
            return;
        }
    };
    let total = body.len() as u64;

    let (status, slice) = match range_start {
        Some(start) if opts.support_ranges => {
            if start > total {
                let _ = stream.write_all(
                    format!(
                        "HTTP/1.1 416 Range Not Satisfiable\r\nContent-Range: bytes */{}\r\nContent-Length: 0\r\n\r\n",
                        total
                    )
                    .as_bytes(),
                );
                return;
            }
            ("206 Partial Content", &body[start as usize..])
        }
        _ => ("200 OK", &body[..]),
    };

    let response = format!(
        "HTTP/1.1 {}\r\nContent-Length: {}\r\nAccept-Ranges: bytes\r\n\r\n",
        status,
        slice.len()
    );
    let _ = stream.write_all(response.as_bytes());
    let _ = stream.write_all(slice);
}

/// Returns (method, path, range start for `Range: bytes=N-`).
fn parse_request(request: &str) -> (&str, &str, Option<u64>) {
    let mut method = "";
    let mut path = "";
    let mut range_start = None;
    for (i, line) in request.lines().enumerate() {
        let line = line.trim();
        if line.is_empty() {
            break;
        }
        if i == 0 {
            let mut parts = line.split_whitespace();
            method = parts.next().unwrap_or("");
            path = parts.next().unwrap_or("");
            continue;
        }
        if let Some((name, value)) = line.split_once(':') {
            if name.trim().eq_ignore_ascii_case("range") {
                let value = value.trim();
                if let Some(ranges) = value.strip_prefix("bytes=") {
                    if let Some((start, _)) = ranges.split_once('-') {
                        range_start = start.trim().parse::<u64>().ok();
                    }
                }
            }
        }
    }
    (method, path, range_start)
}
