use crate::error::ServiceError;
use crate::service::{FingerspellingRequest, InferenceService, SignRequest};
use anyhow::{anyhow, Result};
use serde::de::DeserializeOwned;
use serde::Serialize;
use serde_json::json;
use std::collections::HashMap;
use std::io::{Read, Write};
use std::net::{SocketAddr, TcpListener, TcpStream};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::thread::JoinHandle;
use std::time::Duration;

/// Upper bound on headers + body. A fingerspelling request is a few hundred
/// floats per frame.
const MAX_REQUEST_BYTES: usize = 4 * 1024 * 1024;
const MAX_HEADER_BYTES: usize = 8192;

const ROUTES: [&str; 4] = ["/", "/health", "/predict", "/predict/sign"];

#[derive(Clone, Debug)]
pub struct ApiConfig {
    pub addr: String,
}

impl Default for ApiConfig {
    fn default() -> Self {
        Self {
            addr: "127.0.0.1:8000".to_string(),
        }
    }
}

#[derive(Debug)]
pub struct ApiHandle {
    pub addr: SocketAddr,
    shutdown: Arc<AtomicBool>,
    join: Option<JoinHandle<()>>,
}

impl ApiHandle {
    pub fn stop(mut self) -> Result<()> {
        self.shutdown.store(true, Ordering::SeqCst);
        if let Some(join) = self.join.take() {
            join.join()
                .map_err(|_| anyhow!("api server thread panicked"))?;
        }
        Ok(())
    }
}

pub struct ApiServer {
    cfg: ApiConfig,
    service: Arc<InferenceService>,
}

impl ApiServer {
    pub fn new(cfg: ApiConfig, service: Arc<InferenceService>) -> Self {
        Self { cfg, service }
    }

    pub fn spawn(self) -> Result<ApiHandle> {
        let configured_addr: SocketAddr = self.cfg.addr.parse()?;
        let listener = TcpListener::bind(configured_addr)?;
        let addr = listener.local_addr()?;
        listener.set_nonblocking(true)?;

        let shutdown = Arc::new(AtomicBool::new(false));
        let shutdown_thread = shutdown.clone();
        let service = self.service;
        let join = std::thread::spawn(move || {
            if let Err(err) = run_api(listener, &service, shutdown_thread) {
                log::error!("inference api stopped: {}", err);
            }
        });

        Ok(ApiHandle {
            addr,
            shutdown,
            join: Some(join),
        })
    }
}

fn run_api(
    listener: TcpListener,
    service: &InferenceService,
    shutdown: Arc<AtomicBool>,
) -> Result<()> {
    loop {
        if shutdown.load(Ordering::SeqCst) {
            break;
        }
        match listener.accept() {
            Ok((stream, _)) => {
                if let Err(err) = handle_connection(stream, service) {
                    log::warn!("inference api request failed: {}", err);
                }
            }
            Err(err) if err.kind() == std::io::ErrorKind::WouldBlock => {
                std::thread::sleep(Duration::from_millis(20));
                continue;
            }
            Err(err) => return Err(err.into()),
        }
    }
    Ok(())
}

fn handle_connection(mut stream: TcpStream, service: &InferenceService) -> Result<()> {
    stream.set_nonblocking(false)?;
    let request = match read_request(&mut stream) {
        Ok(request) => request,
        Err(RequestError::TooLarge) => {
            write_error(&mut stream, 413, "request_too_large", "request exceeds size limit")?;
            return Ok(());
        }
        Err(RequestError::Malformed(err)) => {
            write_error(&mut stream, 400, "invalid_request", &err.to_string())?;
            return Err(err);
        }
    };

    match (request.method.as_str(), request.path.as_str()) {
        ("GET", "/") => write_json(&mut stream, 200, &service_info()),
        ("GET", "/health") => write_json(&mut stream, 200, &service.health()),
        ("POST", "/predict") => {
            let Some(body) = parse_body::<FingerspellingRequest>(&mut stream, &request)? else {
                return Ok(());
            };
            respond(&mut stream, service.predict(&body))
        }
        ("POST", "/predict/sign") => {
            let Some(body) = parse_body::<SignRequest>(&mut stream, &request)? else {
                return Ok(());
            };
            respond(&mut stream, service.predict_sign(&body))
        }
        (_, path) if ROUTES.contains(&path) => {
            write_error(&mut stream, 405, "method_not_allowed", "method not allowed")
        }
        _ => write_error(&mut stream, 404, "not_found", "not found"),
    }
}

fn service_info() -> serde_json::Value {
    json!({
        "service": env!("CARGO_PKG_NAME"),
        "version": env!("CARGO_PKG_VERSION"),
        "endpoints": {
            "health": "GET /health",
            "predict": "POST /predict",
            "predict_sign": "POST /predict/sign",
        },
    })
}

/// Decode a JSON body; on failure a 400 has already been written.
fn parse_body<T: DeserializeOwned>(
    stream: &mut TcpStream,
    request: &HttpRequest,
) -> Result<Option<T>> {
    match serde_json::from_slice(&request.body) {
        Ok(body) => Ok(Some(body)),
        Err(err) => {
            write_error(stream, 400, "invalid_request", &err.to_string())?;
            Ok(None)
        }
    }
}

fn respond<T: Serialize>(stream: &mut TcpStream, result: Result<T, ServiceError>) -> Result<()> {
    match result {
        Ok(body) => write_json(stream, 200, &body),
        Err(err) => {
            if err.status() >= 500 {
                log::error!("prediction failed: {}", err);
            } else {
                log::debug!("prediction rejected: {}", err);
            }
            write_error(stream, err.status(), err.kind(), &err.to_string())
        }
    }
}

enum RequestError {
    TooLarge,
    Malformed(anyhow::Error),
}

impl From<std::io::Error> for RequestError {
    fn from(err: std::io::Error) -> Self {
        Self::Malformed(err.into())
    }
}

fn read_request(stream: &mut TcpStream) -> Result<HttpRequest, RequestError> {
    stream.set_read_timeout(Some(Duration::from_secs(5)))?;
    let mut buf = [0u8; 4096];
    let mut data = Vec::new();
    let header_end = loop {
        if let Some(pos) = data.windows(4).position(|w| w == b"\r\n\r\n") {
            break pos + 4;
        }
        if data.len() > MAX_HEADER_BYTES {
            return Err(RequestError::TooLarge);
        }
        let n = stream.read(&mut buf)?;
        if n == 0 {
            return Err(RequestError::Malformed(anyhow!("connection closed before headers")));
        }
        data.extend_from_slice(&buf[..n]);
    };

    let head = String::from_utf8_lossy(&data[..header_end]).into_owned();
    let mut lines = head.split("\r\n");
    let request_line = lines
        .next()
        .ok_or_else(|| RequestError::Malformed(anyhow!("empty request")))?;
    let mut parts = request_line.split_whitespace();
    let method = parts
        .next()
        .ok_or_else(|| RequestError::Malformed(anyhow!("missing method")))?;
    let raw_path = parts
        .next()
        .ok_or_else(|| RequestError::Malformed(anyhow!("missing path")))?;
    let mut headers = HashMap::new();
    for line in lines {
        if line.is_empty() {
            break;
        }
        if let Some((k, v)) = line.split_once(':') {
            headers.insert(k.trim().to_lowercase(), v.trim().to_string());
        }
    }

    let content_length = match headers.get("content-length") {
        Some(value) => value
            .parse::<usize>()
            .map_err(|_| RequestError::Malformed(anyhow!("invalid content-length")))?,
        None => 0,
    };
    match header_end.checked_add(content_length) {
        Some(total) if total <= MAX_REQUEST_BYTES => {}
        _ => return Err(RequestError::TooLarge),
    }
    let mut body = data.split_off(header_end);
    while body.len() < content_length {
        let n = stream.read(&mut buf)?;
        if n == 0 {
            return Err(RequestError::Malformed(anyhow!("request body truncated")));
        }
        body.extend_from_slice(&buf[..n]);
    }
    body.truncate(content_length);

    let path = raw_path.split('?').next().unwrap_or(raw_path).to_string();
    Ok(HttpRequest {
        method: method.to_string(),
        path,
        body,
    })
}

fn write_json<T: Serialize + ?Sized>(stream: &mut TcpStream, status: u16, body: &T) -> Result<()> {
    let payload = serde_json::to_vec(body)?;
    write_response(stream, status, "application/json", &payload)
}

fn write_error(stream: &mut TcpStream, status: u16, kind: &str, detail: &str) -> Result<()> {
    write_json(stream, status, &json!({ "error": kind, "detail": detail }))
}

fn write_response(
    stream: &mut TcpStream,
    status: u16,
    content_type: &str,
    body: &[u8],
) -> Result<()> {
    let status_line = match status {
        200 => "HTTP/1.1 200 OK",
        400 => "HTTP/1.1 400 Bad Request",
        404 => "HTTP/1.1 404 Not Found",
        405 => "HTTP/1.1 405 Method Not Allowed",
        413 => "HTTP/1.1 413 Payload Too Large",
        422 => "HTTP/1.1 422 Unprocessable Entity",
        503 => "HTTP/1.1 503 Service Unavailable",
        _ => "HTTP/1.1 500 Internal Server Error",
    };
    let header = format!(
        "{status_line}\r\nContent-Type: {content_type}\r\nContent-Length: {len}\r\nCache-Control: no-store\r\nConnection: close\r\n\r\n",
        status_line = status_line,
        content_type = content_type,
        len = body.len()
    );
    stream.write_all(header.as_bytes())?;
    stream.write_all(body)?;
    Ok(())
}

#[derive(Debug)]
struct HttpRequest {
    method: String,
    path: String,
    body: Vec<u8>,
}
