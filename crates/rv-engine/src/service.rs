//! Minimal HTTP/1.1 front end for the analyzer.
//!
//! Routes:
//! - `GET /health`
//! - `POST /risk` with a JSON [`RiskRequest`] body

use std::time::Duration;

use serde::Serialize;
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::{TcpListener, TcpStream};
use tracing::{error, info, warn};

use rv_types::{DataError, RiskError, RvError};

use crate::analyzer::{RiskAnalyzer, RiskRequest};

/// Upper bound on headers plus body.
pub const MAX_REQUEST_BYTES: usize = 64 * 1024;

pub const DEFAULT_READ_TIMEOUT_SECS: u64 = 10;

#[derive(Debug, Clone, PartialEq)]
pub struct HttpResponse {
    pub status: u16,
    pub body: String,
}

impl HttpResponse {
    fn json<T: Serialize>(status: u16, value: &T) -> Self {
        match serde_json::to_string(value) {
            Ok(body) => Self { status, body },
            Err(e) => Self::error(500, &format!("failed to encode response: {}", e)),
        }
    }

    fn error(status: u16, message: &str) -> Self {
        Self {
            status,
            body: serde_json::json!({ "error": message }).to_string(),
        }
    }

    /// Serialize as a complete HTTP/1.1 response.
    pub fn to_http(&self) -> String {
        format!(
            "HTTP/1.1 {} {}\r\nContent-Type: application/json\r\nContent-Length: {}\r\nConnection: close\r\n\r\n{}",
            self.status,
            reason_phrase(self.status),
            self.body.len(),
            self.body
        )
    }
}

fn reason_phrase(status: u16) -> &'static str {
    match status {
        200 => "OK",
        400 => "Bad Request",
        404 => "Not Found",
        405 => "Method Not Allowed",
        408 => "Request Timeout",
        413 => "Payload Too Large",
        422 => "Unprocessable Entity",
        502 => "Bad Gateway",
        504 => "Gateway Timeout",
        _ => "Internal Server Error",
    }
}

/// HTTP status for an analysis failure.
pub fn status_for(err: &RvError) -> u16 {
    match err {
        RvError::Validation(_) | RvError::Serialization(_) => 400,
        RvError::Risk(RiskError::InvalidConfidence { .. }) => 400,
        RvError::Data(DataError::NoData { .. }) => 404,
        RvError::Risk(RiskError::InsufficientData { .. })
        | RvError::Data(DataError::InvalidSeries { .. }) => 422,
        RvError::Data(DataError::Timeout { .. }) => 504,
        RvError::Data(
            DataError::Transport { .. }
            | DataError::UnexpectedStatus { .. }
            | DataError::ParseError { .. },
        ) => 502,
        _ => 500,
    }
}

/// Dispatch one parsed request.
pub async fn route(analyzer: &RiskAnalyzer, method: &str, path: &str, body: &str) -> HttpResponse {
    match (method, path) {
        ("GET", "/health") => HttpResponse::json(
            200,
            &serde_json::json!({
                "status": "ok",
                "service": "risk",
                "provider": analyzer.provider_name()
            }),
        ),
        ("POST", "/risk") => {
            let result = match serde_json::from_str::<RiskRequest>(body) {
                Ok(request) => analyzer.analyze(&request).await,
                Err(e) => Err(RvError::from(e)),
            };

            match result {
                Ok(report) => HttpResponse::json(200, &report),
                Err(e) => {
                    let status = status_for(&e);
                    if status >= 500 {
                        error!("Risk analysis failed ({}): {}", status, e);
                    } else {
                        warn!("Risk analysis rejected ({}): {}", status, e);
                    }
                    HttpResponse::error(status, &e.to_string())
                }
            }
        }
        (_, "/health") | (_, "/risk") => HttpResponse::error(405, "method not allowed"),
        _ => HttpResponse::error(404, "not found"),
    }
}

struct ParsedRequest {
    method: String,
    path: String,
    body: String,
}

/// Why a request could not be read off the socket.
#[derive(Debug)]
enum ReadError {
    /// Peer closed before sending anything.
    Closed,
    TooLarge,
    Malformed(String),
    Io(std::io::Error),
}

impl From<std::io::Error> for ReadError {
    fn from(err: std::io::Error) -> Self {
        ReadError::Io(err)
    }
}

fn find_header_end(buf: &[u8]) -> Option<usize> {
    buf.windows(4).position(|w| w == b"\r\n\r\n")
}

/// Read one request: headers, then exactly `Content-Length` bytes of body.
async fn read_request(socket: &mut TcpStream) -> Result<ParsedRequest, ReadError> {
    let mut buf = Vec::with_capacity(1024);
    let mut chunk = [0u8; 1024];

    let header_end = loop {
        if let Some(pos) = find_header_end(&buf) {
            break pos;
        }
        if buf.len() > MAX_REQUEST_BYTES {
            return Err(ReadError::TooLarge);
        }
        let n = socket.read(&mut chunk).await?;
        if n == 0 {
            return Err(if buf.is_empty() {
                ReadError::Closed
            } else {
                ReadError::Malformed("incomplete request headers".to_string())
            });
        }
        buf.extend_from_slice(&chunk[..n]);
    };

    let head = String::from_utf8_lossy(&buf[..header_end]).to_string();
    let mut lines = head.lines();
    let mut request_line = lines.next().unwrap_or_default().split_whitespace();
    let method = request_line.next().unwrap_or_default().to_string();
    let target = request_line.next().unwrap_or_default();
    let path = target.split('?').next().unwrap_or_default().to_string();

    let content_length = match lines
        .filter_map(|line| line.split_once(':'))
        .find(|(name, _)| name.trim().eq_ignore_ascii_case("content-length"))
    {
        Some((_, value)) => value.trim().parse::<usize>().map_err(|_| {
            ReadError::Malformed(format!("invalid Content-Length '{}'", value.trim()))
        })?,
        None => 0,
    };

    let body_start = header_end + 4;
    if body_start + content_length > MAX_REQUEST_BYTES {
        return Err(ReadError::TooLarge);
    }

    while buf.len() < body_start + content_length {
        let n = socket.read(&mut chunk).await?;
        if n == 0 {
            return Err(ReadError::Malformed(format!(
                "body shorter than Content-Length: got {} of {} bytes",
                buf.len() - body_start,
                content_length
            )));
        }
        buf.extend_from_slice(&chunk[..n]);
    }

    let body = String::from_utf8_lossy(&buf[body_start..body_start + content_length]).to_string();

    Ok(ParsedRequest { method, path, body })
}

async fn handle_connection(
    mut socket: TcpStream,
    analyzer: RiskAnalyzer,
    read_timeout: Duration,
) -> std::io::Result<()> {
    let response = match tokio::time::timeout(read_timeout, read_request(&mut socket)).await {
        Ok(Ok(req)) => {
            let response = route(&analyzer, &req.method, &req.path, &req.body).await;
            info!("{} {} -> {}", req.method, req.path, response.status);
            response
        }
        Ok(Err(ReadError::Closed)) => return Ok(()),
        Ok(Err(ReadError::Io(e))) => return Err(e),
        Ok(Err(ReadError::TooLarge)) => HttpResponse::error(413, "request too large"),
        Ok(Err(ReadError::Malformed(message))) => {
            warn!("Rejected malformed request: {}", message);
            HttpResponse::error(400, &message)
        }
        Err(_) => {
            warn!("No complete request within {:?}", read_timeout);
            HttpResponse::error(408, "request timeout")
        }
    };

    socket.write_all(response.to_http().as_bytes()).await?;
    socket.shutdown().await
}

/// Accept connections forever, one task per connection.
///
/// A client gets `read_timeout` to deliver its full request.
pub async fn serve(
    listener: TcpListener,
    analyzer: RiskAnalyzer,
    read_timeout: Duration,
) -> std::io::Result<()> {
    loop {
        let (socket, peer) = listener.accept().await?;
        let analyzer = analyzer.clone();

        tokio::spawn(async move {
            if let Err(e) = handle_connection(socket, analyzer, read_timeout).await {
                warn!("Connection from {} failed: {}", peer, e);
            }
        });
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use chrono::{Duration, TimeZone, Utc};
    use rust_decimal::Decimal;
    use rv_data::PriceSeriesProvider;
    use rv_types::{PricePoint, PriceSeries, RvResult, Symbol};
    use std::net::SocketAddr;
    use std::sync::Arc;
    use std::time::Duration as StdDuration;

    /// Serves a rising series for AAPL, two closes for TINY, nothing else.
    #[derive(Debug)]
    struct FixedProvider;

    #[async_trait]
    impl PriceSeriesProvider for FixedProvider {
        async fn fetch(&self, symbol: &Symbol, lookback_days: usize) -> RvResult<PriceSeries> {
            let closes: &[i64] = match symbol.as_str() {
                "AAPL" => &[100, 103, 101, 104, 102, 107],
                "TINY" => &[10, 11],
                _ => {
                    return Err(DataError::NoData {
                        symbol: symbol.to_string(),
                        reason: "unknown".into(),
                    }
                    .into())
                }
            };
            let base = Utc.with_ymd_and_hms(2024, 4, 1, 21, 0, 0).unwrap();
            let points = closes
                .iter()
                .enumerate()
                .map(|(i, &c)| PricePoint::new(base + Duration::days(i as i64), Decimal::from(c)))
                .collect();
            Ok(PriceSeries::new(symbol.clone(), points)?.tail(lookback_days))
        }

        fn name(&self) -> &str {
            "fixed"
        }

        fn config(&self) -> serde_json::Value {
            serde_json::json!({ "type": "fixed" })
        }
    }

    fn analyzer() -> RiskAnalyzer {
        RiskAnalyzer::new(Arc::new(FixedProvider))
    }

    async fn spawn_service(read_timeout: StdDuration) -> SocketAddr {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        tokio::spawn(serve(listener, analyzer(), read_timeout));
        addr
    }

    async fn read_response(stream: &mut TcpStream) -> String {
        let mut raw = String::new();
        tokio::time::timeout(StdDuration::from_secs(5), stream.read_to_string(&mut raw))
            .await
            .expect("server must answer or close")
            .unwrap();
        raw
    }

    #[tokio::test]
    async fn health_check() {
        let resp = route(&analyzer(), "GET", "/health", "").await;
        assert_eq!(resp.status, 200);
        assert!(resp.body.contains("\"status\":\"ok\""));
    }

    #[tokio::test]
    async fn risk_report_over_http() {
        let resp = route(&analyzer(), "POST", "/risk", r#"{"ticker":"aapl","days":10}"#).await;
        assert_eq!(resp.status, 200);

        let json: serde_json::Value = serde_json::from_str(&resp.body).unwrap();
        assert_eq!(json["ticker"], "AAPL");
        assert_eq!(json["last_price"], 107.0);
        assert_eq!(json["window_days"], 10);
        assert!(json["metrics"]["VaR_parametric"].is_number());
        assert!(json["metrics"].get("Sharpe_ratio").is_some());
    }

    #[tokio::test]
    async fn error_statuses() {
        let a = analyzer();
        let cases = [
            ("POST", "/risk", "not json", 400),
            ("POST", "/risk", r#"{"ticker":"AAPL","confidence":1.2}"#, 400),
            ("POST", "/risk", r#"{"ticker":"AAPL","days":1}"#, 400),
            ("POST", "/risk", r#"{"ticker":"AAPL","days":2}"#, 422),
            ("POST", "/risk", r#"{"ticker":"AAPL","days":100000000}"#, 400),
            ("POST", "/risk", r#"{"ticker":"ZZZZ"}"#, 404),
            ("POST", "/risk", r#"{"ticker":"TINY","benchmark":null}"#, 422),
            ("GET", "/risk", "", 405),
            ("GET", "/nope", "", 404),
        ];
        for (method, path, body, status) in cases {
            assert_eq!(route(&a, method, path, body).await.status, status, "{} {}", path, body);
        }
    }

    #[test]
    fn transport_family_maps_to_gateway_errors() {
        let timeout: RvError = DataError::Timeout {
            symbol: "AAPL".into(),
            timeout_secs: 20,
        }
        .into();
        let status: RvError = DataError::UnexpectedStatus {
            symbol: "AAPL".into(),
            status: "error".into(),
        }
        .into();
        assert_eq!(status_for(&timeout), 504);
        assert_eq!(status_for(&status), 502);
        assert_eq!(status_for(&RvError::Internal("x".into())), 500);
    }

    #[tokio::test]
    async fn serves_over_tcp() {
        let addr = spawn_service(StdDuration::from_secs(5)).await;

        let body = r#"{"ticker":"AAPL","benchmark":null,"days":5,"confidence":0.99}"#;
        let request = format!(
            "POST /risk HTTP/1.1\r\nHost: localhost\r\nContent-Length: {}\r\n\r\n{}",
            body.len(),
            body
        );

        let mut stream = TcpStream::connect(addr).await.unwrap();
        stream.write_all(request.as_bytes()).await.unwrap();

        let raw = read_response(&mut stream).await;

        assert!(raw.starts_with("HTTP/1.1 200 OK"));
        let payload = raw.split("\r\n\r\n").nth(1).unwrap();
        let json: serde_json::Value = serde_json::from_str(payload).unwrap();
        assert_eq!(json["confidence"], 0.99);
        assert_eq!(json["price_summary"]["observations"], 5);
    }

    #[tokio::test]
    async fn idle_connection_gets_request_timeout() {
        let addr = spawn_service(StdDuration::from_millis(200)).await;

        let mut stream = TcpStream::connect(addr).await.unwrap();
        let raw = read_response(&mut stream).await;

        assert!(raw.starts_with("HTTP/1.1 408 Request Timeout"), "{}", raw);
    }

    #[tokio::test]
    async fn stalled_body_gets_request_timeout() {
        let addr = spawn_service(StdDuration::from_millis(200)).await;

        let mut stream = TcpStream::connect(addr).await.unwrap();
        stream
            .write_all(b"POST /risk HTTP/1.1\r\nContent-Length: 100\r\n\r\n{\"ticker\"")
            .await
            .unwrap();
        let raw = read_response(&mut stream).await;

        assert!(raw.starts_with("HTTP/1.1 408"), "{}", raw);
    }

    #[tokio::test]
    async fn short_body_is_bad_request() {
        let addr = spawn_service(StdDuration::from_secs(5)).await;

        let mut stream = TcpStream::connect(addr).await.unwrap();
        stream
            .write_all(b"POST /risk HTTP/1.1\r\nContent-Length: 100\r\n\r\n{\"ticker\":\"AAPL\"}")
            .await
            .unwrap();
        stream.shutdown().await.unwrap();
        let raw = read_response(&mut stream).await;

        assert!(raw.starts_with("HTTP/1.1 400 Bad Request"), "{}", raw);
        assert!(raw.contains("shorter than Content-Length"));
    }

    #[tokio::test]
    async fn invalid_content_length_is_bad_request() {
        let addr = spawn_service(StdDuration::from_secs(5)).await;

        let mut stream = TcpStream::connect(addr).await.unwrap();
        stream
            .write_all(b"POST /risk HTTP/1.1\r\nContent-Length: lots\r\n\r\n")
            .await
            .unwrap();
        let raw = read_response(&mut stream).await;

        assert!(raw.starts_with("HTTP/1.1 400"), "{}", raw);
    }
}
