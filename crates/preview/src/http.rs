//! Just enough HTTP/1.1 for a browser fetching static files: one request per
//! connection, `GET`/`HEAD` only, every response closes the connection.

use tokio::io::{AsyncBufRead, AsyncBufReadExt, AsyncReadExt, AsyncWrite, AsyncWriteExt};

use crate::ServeError;

const MAX_HEAD_BYTES: usize = 16 * 1024;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Method {
    Get,
    Head,
    Other(String),
}

impl Method {
    fn parse(raw: &str) -> Self {
        match raw {
            "GET" => Method::Get,
            "HEAD" => Method::Head,
            other => Method::Other(other.to_string()),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Request {
    pub method: Method,
    pub target: String,
}

impl Request {
    /// Path component of the request target, still percent-encoded.
    pub fn raw_path(&self) -> &str {
        let mut target = self.target.as_str();
        if let Some(rest) = target
            .strip_prefix("http://")
            .or_else(|| target.strip_prefix("https://"))
        {
            target = rest.find('/').map(|at| &rest[at..]).unwrap_or("/");
        }
        let end = target.find(['?', '#']).unwrap_or(target.len());
        &target[..end]
    }
}

/// Read a request head. `Ok(None)` means the peer closed without sending one.
///
/// The whole head, request line included, is capped at `MAX_HEAD_BYTES`;
/// oversized or non-UTF-8 request lines are reported as malformed.
pub async fn read_request<R>(reader: &mut R) -> Result<Option<Request>, ServeError>
where
    R: AsyncBufRead + Unpin,
{
    let mut budget = MAX_HEAD_BYTES;
    let Some(line) = read_head_line(reader, &mut budget).await? else {
        return Ok(None);
    };
    let line = String::from_utf8(line).map_err(|err| {
        ServeError::MalformedRequest(format!(
            "request line is not valid UTF-8: {}",
            String::from_utf8_lossy(err.as_bytes()).trim_end()
        ))
    })?;

    let mut parts = line.split_whitespace();
    let (Some(method), Some(target), Some(version)) = (parts.next(), parts.next(), parts.next())
    else {
        return Err(ServeError::MalformedRequest(line.trim_end().to_string()));
    };
    if !version.starts_with("HTTP/1.") {
        return Err(ServeError::MalformedRequest(format!(
            "unsupported protocol {version}"
        )));
    }
    let request = Request {
        method: Method::parse(method),
        target: target.to_string(),
    };

    // Headers are irrelevant for static files; drain them up to the blank line.
    while let Some(header) = read_head_line(reader, &mut budget).await? {
        if header == b"\r\n" || header == b"\n" {
            break;
        }
    }

    Ok(Some(request))
}

/// Read one `\n`-terminated line without consuming more than `budget` bytes.
async fn read_head_line<R>(reader: &mut R, budget: &mut usize) -> Result<Option<Vec<u8>>, ServeError>
where
    R: AsyncBufRead + Unpin,
{
    if *budget == 0 {
        return Err(head_too_large());
    }
    let mut line = Vec::new();
    let read = (&mut *reader)
        .take(*budget as u64)
        .read_until(b'\n', &mut line)
        .await?;
    if read == 0 {
        return Ok(None);
    }
    if !line.ends_with(b"\n") && read == *budget {
        return Err(head_too_large());
    }
    *budget -= read;
    Ok(Some(line))
}

fn head_too_large() -> ServeError {
    ServeError::MalformedRequest(format!("request head exceeds {MAX_HEAD_BYTES} bytes"))
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Response {
    pub status: u16,
    pub headers: Vec<(&'static str, String)>,
    pub body: Vec<u8>,
}

impl Response {
    pub fn new(status: u16, content_type: &str, body: Vec<u8>) -> Self {
        Self {
            status,
            headers: vec![("Content-Type", content_type.to_string())],
            body,
        }
    }

    pub fn text(status: u16, body: impl Into<String>) -> Self {
        Self::new(status, "text/plain; charset=utf-8", body.into().into_bytes())
    }

    pub fn not_found() -> Self {
        Self::text(404, "Not Found")
    }

    pub fn with_header(mut self, name: &'static str, value: impl Into<String>) -> Self {
        self.headers.push((name, value.into()));
        self
    }
}

fn reason_phrase(status: u16) -> &'static str {
    match status {
        200 => "OK",
        400 => "Bad Request",
        404 => "Not Found",
        405 => "Method Not Allowed",
        500 => "Internal Server Error",
        _ => "",
    }
}

pub async fn write_response<W>(
    writer: &mut W,
    response: &Response,
    include_body: bool,
) -> Result<(), ServeError>
where
    W: AsyncWrite + Unpin,
{
    let mut head = format!(
        "HTTP/1.1 {} {}\r\n",
        response.status,
        reason_phrase(response.status)
    );
    for (name, value) in &response.headers {
        head.push_str(&format!("{name}: {value}\r\n"));
    }
    head.push_str(&format!("Content-Length: {}\r\n", response.body.len()));
    head.push_str("Connection: close\r\n\r\n");

    writer.write_all(head.as_bytes()).await?;
    if include_body {
        writer.write_all(&response.body).await?;
    }
    writer.flush().await?;
    Ok(())
}
