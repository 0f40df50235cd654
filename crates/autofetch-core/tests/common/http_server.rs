//! Minimal HTTP/1.1 server for integration tests.
//!
//! Answers every request with one fixed status line and body, and records the
//! request line of each request it sees.

use std::io::{Read, Write};
use std::net::TcpListener;
use std::sync::{Arc, Mutex};
use std::thread;

pub struct TestServer {
    pub url: String,
    pub requests: Arc<Mutex<Vec<String>>>,
}

/// Starts a server in a background thread. The server runs until the process exits.
pub fn start(status: &'static str, body: Vec<u8>) -> TestServer {
    let listener = TcpListener::bind("127.0.0.1:0").expect("bind");
    let port = listener.local_addr().unwrap().port();
    let body = Arc::new(body);
    let requests = Arc::new(Mutex::new(Vec::new()));
    let seen = Arc::clone(&requests);
    thread::spawn(move || {
        for stream in listener.incoming().flatten() {
            let body = Arc::clone(&body);
            let seen = Arc::clone(&seen);
            thread::spawn(move || handle(stream, status, &body, &seen));
        }
    });
    TestServer {
        url: format!("http://127.0.0.1:{}/payload.png", port),
        requests,
    }
}

fn handle(
    mut stream: std::net::TcpStream,
    status: &str,
    body: &[u8],
    seen: &Mutex<Vec<String>>,
) {
    let _ = stream.set_read_timeout(Some(std::time::Duration::from_secs(2)));
    let _ = stream.set_write_timeout(Some(std::time::Duration::from_secs(2)));
    let mut buf = [0u8; 8192];
    let n = match stream.read(&mut buf) {
        Ok(0) => return,
        Ok(n) => n,
        Err(_) => return,
    };
    let request = String::from_utf8_lossy(&buf[..n]);
    if let Some(line) = request.lines().next() {
        seen.lock().unwrap().push(line.trim().to_string());
    }
    let response = format!(
        "HTTP/1.1 {}\r\nContent-Length: {}\r\nConnection: close\r\n\r\n",
        status,
        body.len()
    );
    let _ = stream.write_all(response.as_bytes());
    let _ = stream.write_all(body);
}
