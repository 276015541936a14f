#![allow(dead_code)]

use std::io::{BufRead, BufReader, Read, Write};
use std::net::{SocketAddr, TcpListener};
use std::sync::Arc;
use std::thread;
use std::time::Duration;

use machine_diag_core::{CaptureDevice, DiagnosticError, DiagnosticResult, PcmStream, PipelineStage};
use machine_diag_core::DiagnosticDelegate;
use parking_lot::Mutex;

/// One HTTP request as the mock server saw it.
#[derive(Debug, Clone)]
pub struct CapturedRequest {
    pub request_line: String,
    pub headers: Vec<(String, String)>,
    pub body: Vec<u8>,
}

impl CapturedRequest {
    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers
            .iter()
            .find(|(n, _)| n.eq_ignore_ascii_case(name))
            .map(|(_, v)| v.as_str())
    }

    /// Payload of the single multipart part.
    pub fn multipart_payload(&self) -> Vec<u8> {
        let start = find(&self.body, b"\r\n\r\n").expect("part header terminator") + 4;
        let end = rfind(&self.body, b"\r\n--").expect("closing boundary");
        self.body[start..end].to_vec()
    }
}

/// Loopback HTTP/1.1 server answering exactly one request.
pub struct MockServer {
    addr: SocketAddr,
    handle: Option<thread::JoinHandle<Option<CapturedRequest>>>,
}

impl MockServer {
    pub fn respond(status: u16, body: &str) -> Self {
        Self::respond_after(Duration::ZERO, status, body)
    }

    /// Accept, read the full request, wait `delay`, then answer.
    pub fn respond_after(delay: Duration, status: u16, body: &str) -> Self {
        let listener = TcpListener::bind("127.0.0.1:0").unwrap();
        let addr = listener.local_addr().unwrap();
        let body = body.to_string();

        let handle = thread::spawn(move || {
            let (mut stream, _) = listener.accept().ok()?;
            stream.set_read_timeout(Some(Duration::from_secs(10))).ok()?;
            let captured = read_request(&mut stream)?;

            thread::sleep(delay);
            let response = format!(
                "HTTP/1.1 {} {}\r\nContent-Type: text/plain\r\nContent-Length: {}\r\nConnection: close\r\n\r\n{}",
                status,
                reason(status),
                body.len(),
                body
            );
            let _ = stream.write_all(response.as_bytes());
            let _ = stream.flush();
            Some(captured)
        });

        Self {
            addr,
            handle: Some(handle),
        }
    }

    /// Base URL without a trailing path.
    pub fn base_url(&self) -> String {
        format!("http://{}", self.addr)
    }

    pub fn predict_url(&self) -> String {
        format!("http://{}/predict", self.addr)
    }

    /// Wait for the request to be served and return it.
    pub fn captured(mut self) -> CapturedRequest {
        self.handle
            .take()
            .unwrap()
            .join()
            .unwrap()
            .expect("mock server received no request")
    }
}

/// An address nothing listens on.
pub fn closed_port_url() -> String {
    let listener = TcpListener::bind("127.0.0.1:0").unwrap();
    let addr = listener.local_addr().unwrap();
    drop(listener);
    format!("http://{}", addr)
}

fn read_request(stream: &mut std::net::TcpStream) -> Option<CapturedRequest> {
    let mut reader = BufReader::new(stream);
    let mut request_line = String::new();
    reader.read_line(&mut request_line).ok()?;

    let mut headers = Vec::new();
    loop {
        let mut line = String::new();
        reader.read_line(&mut line).ok()?;
        let line = line.trim_end();
        if line.is_empty() {
            break;
        }
        let (name, value) = line.split_once(':')?;
        headers.push((name.trim().to_string(), value.trim().to_string()));
    }

    let length = headers
        .iter()
        .find(|(n, _)| n.eq_ignore_ascii_case("content-length"))
        .and_then(|(_, v)| v.parse::<usize>().ok())
        .unwrap_or(0);
    let mut body = vec![0u8; length];
    reader.read_exact(&mut body).ok()?;

    Some(CapturedRequest {
        request_line: request_line.trim_end().to_string(),
        headers,
        body,
    })
}

fn reason(status: u16) -> &'static str {
    match status {
        200 => "OK",
        404 => "Not Found",
        500 => "Internal Server Error",
        502 => "Bad Gateway",
        503 => "Service Unavailable",
        _ => "Unknown",
    }
}

fn find(haystack: &[u8], needle: &[u8]) -> Option<usize> {
    haystack.windows(needle.len()).position(|w| w == needle)
}

fn rfind(haystack: &[u8], needle: &[u8]) -> Option<usize> {
    haystack.windows(needle.len()).rposition(|w| w == needle)
}

/// Deterministic sine-ish source; `chunk` samples per read.
pub struct ToneDevice {
    pub chunk: usize,
}

pub struct ToneStream {
    chunk: usize,
    phase: u32,
}

impl CaptureDevice for ToneDevice {
    type Stream = ToneStream;

    fn name(&self) -> String {
        "tone".into()
    }

    fn min_buffer_size(&self, _sample_rate: u32) -> Option<usize> {
        Some(self.chunk)
    }

    fn open(&mut self, _sample_rate: u32) -> Result<ToneStream, DiagnosticError> {
        Ok(ToneStream {
            chunk: self.chunk,
            phase: 0,
        })
    }
}

impl PcmStream for ToneStream {
    fn read(&mut self, buf: &mut [i16]) -> Result<usize, DiagnosticError> {
        let n = buf.len().min(self.chunk);
        for slot in &mut buf[..n] {
            *slot = ((self.phase % 64) as i16 - 32) * 512;
            self.phase += 1;
        }
        Ok(n)
    }
}

/// Delegate that records every callback.
#[derive(Default)]
pub struct RecordingDelegate {
    pub stages: Mutex<Vec<PipelineStage>>,
    pub results: Mutex<Vec<DiagnosticResult>>,
}

impl RecordingDelegate {
    pub fn shared() -> Arc<Self> {
        Arc::new(Self::default())
    }
}

impl DiagnosticDelegate for RecordingDelegate {
    fn on_stage_changed(&self, stage: PipelineStage) {
        self.stages.lock().push(stage);
    }

    fn on_result(&self, result: &DiagnosticResult) {
        self.results.lock().push(result.clone());
    }
}
