//! Blocking HTTP/1.1 client over `std::net`, with TLS from OpenSSL.
//!
//! One request per connection (`Connection: close`). The response is read to
//! EOF, up to a size cap, and parsed afterwards; chunked transfer encoding is
//! decoded and any other transfer coding is rejected. The blocking work runs
//! on tokio's blocking pool.
//!
//! The timeout bounds the whole exchange: connect, TLS handshake, write and
//! every read draw from one deadline.

use std::io::{self, Read, Write};
use std::net::{TcpStream, ToSocketAddrs};
use std::time::{Duration, Instant};

use async_trait::async_trait;
use openssl::ssl::{HandshakeError, SslConnector, SslMethod};

use super::{HttpResponse, TimestampTransport, TransportKind};
use crate::domain::constants::{MAX_TIMESTAMP_RESPONSE_BYTES, USER_AGENT};
use crate::domain::types::TimestampUrl;
use crate::infra::error::TransportError;

/// Transport that needs nothing beyond the standard library and OpenSSL.
pub struct SocketTransport {
    timeout: Duration,
}

impl SocketTransport {
    #[must_use]
    pub fn new(timeout: Duration) -> Self {
        Self { timeout }
    }
}

#[async_trait]
impl TimestampTransport for SocketTransport {
    fn kind(&self) -> TransportKind {
        TransportKind::Socket
    }

    async fn post(
        &self,
        url: &TimestampUrl,
        content_type: &str,
        body: &[u8],
    ) -> Result<HttpResponse, TransportError> {
        let url = url.clone();
        let head = request_head(&url, content_type, body.len());
        let body = body.to_vec();
        let timeout = self.timeout;

        let task = tokio::task::spawn_blocking(move || exchange(&url, &head, &body, timeout));
        match tokio::time::timeout(timeout, task).await {
            Ok(joined) => joined.map_err(|e| TransportError::Task(e.to_string()))?,
            Err(_) => Err(TransportError::Timeout(timeout)),
        }
    }
}

fn request_head(url: &TimestampUrl, content_type: &str, content_length: usize) -> String {
    format!(
        "POST {} HTTP/1.1\r\n\
         Host: {}\r\n\
         User-Agent: {USER_AGENT}\r\n\
         Content-Type: {content_type}\r\n\
         Content-Length: {content_length}\r\n\
         Connection: close\r\n\r\n",
        url.path_and_query(),
        url.host_header()
    )
}

/// Host without the brackets an IPv6 literal carries in a URL.
fn bare_host(url: &TimestampUrl) -> &str {
    url.host().trim_start_matches('[').trim_end_matches(']')
}

fn io_error(error: io::Error, timeout: Duration) -> TransportError {
    match error.kind() {
        io::ErrorKind::WouldBlock | io::ErrorKind::TimedOut => TransportError::Timeout(timeout),
        _ => TransportError::Io(error),
    }
}

/// Point in time by which the exchange has to be finished.
#[derive(Debug, Clone, Copy)]
struct Deadline {
    // None when the timeout is too large to represent as an instant
    at: Option<Instant>,
    timeout: Duration,
}

impl Deadline {
    fn new(timeout: Duration) -> Self {
        Self {
            at: Instant::now().checked_add(timeout),
            timeout,
        }
    }

    /// Time left, or `None` once the deadline has passed.
    fn remaining(&self) -> Option<Duration> {
        match self.at {
            Some(at) => at
                .checked_duration_since(Instant::now())
                .filter(|left| !left.is_zero()),
            None => Some(self.timeout),
        }
    }

    fn expired(&self) -> TransportError {
        TransportError::Timeout(self.timeout)
    }

    /// Set the socket's read and write timeouts to the time left.
    fn arm(&self, socket: &TcpStream) -> io::Result<()> {
        let left = self
            .remaining()
            .ok_or_else(|| io::Error::from(io::ErrorKind::TimedOut))?;
        socket.set_read_timeout(Some(left))?;
        socket.set_write_timeout(Some(left))
    }
}

/// Reader that re-arms the socket from the deadline before every read.
struct DeadlineReader<'s, R> {
    inner: R,
    socket: &'s TcpStream,
    deadline: Deadline,
}

impl<R: Read> Read for DeadlineReader<'_, R> {
    fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        self.deadline.arm(self.socket)?;
        self.inner.read(buf)
    }
}

fn connect(url: &TimestampUrl, deadline: Deadline) -> Result<TcpStream, TransportError> {
    let host = bare_host(url);
    let mut last_error = None;

    for addr in (host, url.port()).to_socket_addrs()? {
        let left = deadline.remaining().ok_or_else(|| deadline.expired())?;
        match TcpStream::connect_timeout(&addr, left) {
            Ok(stream) => return Ok(stream),
            Err(e) => {
                log::debug!("connect to {addr} failed: {e}");
                last_error = Some(e);
            }
        }
    }

    Err(match last_error {
        Some(e) => io_error(e, deadline.timeout),
        None => TransportError::Io(io::Error::new(
            io::ErrorKind::NotFound,
            format!("no addresses found for {host}"),
        )),
    })
}

fn handshake_error(error: HandshakeError<TcpStream>, timeout: Duration) -> TransportError {
    match error {
        HandshakeError::SetupFailure(stack) => TransportError::OpenSsl(stack),
        HandshakeError::WouldBlock(_) => TransportError::Timeout(timeout),
        HandshakeError::Failure(mid) => TransportError::Tls(mid.into_error()),
    }
}

/// Read until EOF, failing once more than `limit` bytes arrive.
fn read_capped<R: Read>(
    reader: R,
    limit: usize,
    timeout: Duration,
) -> Result<Vec<u8>, TransportError> {
    let mut raw = Vec::new();
    reader
        .take(limit as u64 + 1)
        .read_to_end(&mut raw)
        .map_err(|e| io_error(e, timeout))?;
    if raw.len() > limit {
        return Err(malformed(format!("response is larger than {limit} bytes")));
    }
    Ok(raw)
}

fn send_and_receive<S: Read + Write>(
    stream: &mut S,
    socket: &TcpStream,
    head: &str,
    body: &[u8],
    deadline: Deadline,
) -> Result<Vec<u8>, TransportError> {
    deadline
        .arm(socket)
        .and_then(|()| stream.write_all(head.as_bytes()))
        .and_then(|()| stream.write_all(body))
        .and_then(|()| stream.flush())
        .map_err(|e| io_error(e, deadline.timeout))?;

    let reader = DeadlineReader {
        inner: stream,
        socket,
        deadline,
    };
    read_capped(reader, MAX_TIMESTAMP_RESPONSE_BYTES, deadline.timeout)
}

fn exchange(
    url: &TimestampUrl,
    head: &str,
    body: &[u8],
    timeout: Duration,
) -> Result<HttpResponse, TransportError> {
    let deadline = Deadline::new(timeout);
    let mut stream = connect(url, deadline)?;
    // shares the descriptor, so timeouts set here apply to the TLS stream too
    let socket = stream.try_clone()?;
    deadline.arm(&socket).map_err(|e| io_error(e, timeout))?;

    let raw = if url.is_https() {
        let connector = SslConnector::builder(SslMethod::tls_client())?.build();
        let mut tls = connector
            .connect(bare_host(url), stream)
            .map_err(|e| handshake_error(e, timeout))?;
        send_and_receive(&mut tls, &socket, head, body, deadline)?
    } else {
        send_and_receive(&mut stream, &socket, head, body, deadline)?
    };

    log::debug!("{} bytes received from {}", raw.len(), url.host());
    parse_response(&raw)
}

fn malformed(detail: impl Into<String>) -> TransportError {
    TransportError::MalformedResponse(detail.into())
}

fn find(haystack: &[u8], needle: &[u8]) -> Option<usize> {
    haystack.windows(needle.len()).position(|w| w == needle)
}

/// Parse a complete HTTP/1.x response read up to connection close.
pub(crate) fn parse_response(raw: &[u8]) -> Result<HttpResponse, TransportError> {
    let split = find(raw, b"\r\n\r\n").ok_or_else(|| malformed("missing end of headers"))?;
    let head =
        std::str::from_utf8(&raw[..split]).map_err(|_| malformed("headers are not UTF-8"))?;
    let rest = &raw[split + 4..];

    let mut lines = head.split("\r\n");
    let status_line = lines.next().unwrap_or_default();
    let mut parts = status_line.splitn(3, ' ');
    if !parts.next().is_some_and(|v| v.starts_with("HTTP/1.")) {
        return Err(malformed(format!("bad status line '{status_line}'")));
    }
    let status: u16 = parts
        .next()
        .and_then(|s| s.parse().ok())
        .ok_or_else(|| malformed(format!("bad status line '{status_line}'")))?;
    let reason = parts.next().unwrap_or_default().to_string();

    let mut content_type = None;
    let mut content_length = None;
    let mut chunked = false;
    for line in lines {
        let (name, value) = line
            .split_once(':')
            .ok_or_else(|| malformed(format!("bad header line '{line}'")))?;
        let value = value.trim();
        if name.eq_ignore_ascii_case("content-type") {
            content_type = Some(value.to_string());
        } else if name.eq_ignore_ascii_case("content-length") {
            let length: usize = value
                .parse()
                .map_err(|_| malformed(format!("bad Content-Length '{value}'")))?;
            content_length = Some(length);
        } else if name.eq_ignore_ascii_case("transfer-encoding") {
            if !value.eq_ignore_ascii_case("chunked") {
                return Err(malformed(format!("unsupported Transfer-Encoding '{value}'")));
            }
            chunked = true;
        }
    }

    let body = if chunked {
        decode_chunked(rest)?
    } else if let Some(length) = content_length {
        rest.get(..length)
            .ok_or_else(|| {
                malformed(format!(
                    "body truncated ({} of {length} bytes)",
                    rest.len()
                ))
            })?
            .to_vec()
    } else {
        rest.to_vec()
    };

    Ok(HttpResponse {
        status,
        reason,
        content_type,
        body,
    })
}

fn decode_chunked(mut data: &[u8]) -> Result<Vec<u8>, TransportError> {
    let mut out = Vec::new();
    loop {
        let line_end = find(data, b"\r\n").ok_or_else(|| malformed("truncated chunk header"))?;
        let size_line = std::str::from_utf8(&data[..line_end])
            .map_err(|_| malformed("chunk header is not UTF-8"))?;
        // chunk extensions are ignored
        let size_hex = size_line.split(';').next().unwrap_or_default().trim();
        let size = usize::from_str_radix(size_hex, 16)
            .map_err(|_| malformed(format!("bad chunk size '{size_hex}'")))?;
        data = &data[line_end + 2..];

        if size == 0 {
            return Ok(out);
        }
        let chunk = size
            .checked_add(2)
            .and_then(|end| data.get(..end))
            .ok_or_else(|| malformed("truncated chunk"))?;
        out.extend_from_slice(&chunk[..size]);
        data = &data[size + 2..];
    }
}
