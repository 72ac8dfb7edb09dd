use std::net::{Ipv4Addr, SocketAddr};
use std::sync::Arc;
use std::time::Duration;

use percent_encoding::percent_decode_str;
use tokio::io::{AsyncRead, AsyncReadExt, AsyncWriteExt, BufReader};
use tokio::net::{TcpListener, TcpStream};
use tokio::sync::oneshot;
use tokio::task::{JoinHandle, JoinSet};
use url::Url;

use crate::http::{read_request, write_response, Method, Request, Response};
use crate::mime::content_type_for;
use crate::site::SiteRoot;
use crate::ServeError;

/// Upper bound on the lifetime of a single connection task.
pub const CONNECTION_DEADLINE: Duration = Duration::from_secs(30);

const LINGER_DEADLINE: Duration = Duration::from_secs(1);
const LINGER_BYTES: usize = 64 * 1024;

/// Static file server bound to an ephemeral loopback port.
///
/// There is no authentication, so the listener address is fixed to
/// `127.0.0.1` and not configurable.
#[derive(Debug, Clone)]
pub struct PreviewServer {
    site: Arc<SiteRoot>,
}

impl PreviewServer {
    pub fn new(site: SiteRoot) -> Self {
        Self {
            site: Arc::new(site),
        }
    }

    /// Bind the listener and start serving. Returns once the port is bound.
    pub async fn start(self) -> Result<ServerHandle, ServeError> {
        let listener = TcpListener::bind((Ipv4Addr::LOCALHOST, 0)).await?;
        let addr = listener.local_addr()?;
        let origin = origin_for(addr)?;
        tracing::info!(
            origin = %origin,
            root = %self.site.root().display(),
            base_path = self.site.base_path(),
            "preview server listening"
        );

        let (shutdown_tx, shutdown_rx) = oneshot::channel();
        let task = tokio::spawn(accept_loop(listener, self.site, shutdown_rx));
        Ok(ServerHandle {
            origin,
            addr,
            shutdown: Some(shutdown_tx),
            task: Some(task),
        })
    }
}

fn origin_for(addr: SocketAddr) -> Result<Url, ServeError> {
    Url::parse(&format!("http://{}:{}", addr.ip(), addr.port()))
        .map_err(|err| ServeError::Origin(err.to_string()))
}

/// Running server; call [`ServerHandle::close`] to stop it.
#[derive(Debug)]
pub struct ServerHandle {
    origin: Url,
    addr: SocketAddr,
    shutdown: Option<oneshot::Sender<()>>,
    task: Option<JoinHandle<()>>,
}

impl ServerHandle {
    /// `http://127.0.0.1:<port>` with no trailing path.
    pub fn origin(&self) -> &Url {
        &self.origin
    }

    pub fn local_addr(&self) -> SocketAddr {
        self.addr
    }

    pub fn is_closed(&self) -> bool {
        self.task.is_none()
    }

    /// Stop accepting, abort in-flight connections and wait for the accept
    /// loop to finish. Calling it again is a no-op.
    pub async fn close(&mut self) {
        if let Some(shutdown) = self.shutdown.take() {
            let _ = shutdown.send(());
        }
        if let Some(task) = self.task.take() {
            if let Err(err) = task.await {
                tracing::warn!(error = %err, "preview server task ended abnormally");
            }
            tracing::debug!(origin = %self.origin, "preview server closed");
        }
    }
}

impl Drop for ServerHandle {
    fn drop(&mut self) {
        if let Some(shutdown) = self.shutdown.take() {
            let _ = shutdown.send(());
        }
    }
}

async fn accept_loop(
    listener: TcpListener,
    site: Arc<SiteRoot>,
    mut shutdown: oneshot::Receiver<()>,
) {
    let mut connections = JoinSet::new();
    loop {
        tokio::select! {
            _ = &mut shutdown => break,
            accepted = listener.accept() => match accepted {
                Ok((stream, peer)) => {
                    let site = Arc::clone(&site);
                    connections.spawn(async move {
                        match tokio::time::timeout(CONNECTION_DEADLINE, serve_connection(stream, &site)).await {
                            Ok(Ok(())) => {}
                            Ok(Err(err)) => tracing::debug!(%peer, error = %err, "preview connection failed"),
                            Err(_) => tracing::debug!(%peer, "preview connection timed out"),
                        }
                    });
                }
                Err(err) => tracing::warn!(error = %err, "failed to accept preview connection"),
            },
            Some(_) = connections.join_next(), if !connections.is_empty() => {}
        }
    }
    connections.shutdown().await;
}

async fn serve_connection(mut stream: TcpStream, site: &SiteRoot) -> Result<(), ServeError> {
    let (read_half, mut write_half) = stream.split();
    let mut reader = BufReader::new(read_half);

    let request = match read_request(&mut reader).await {
        Ok(Some(request)) => request,
        Ok(None) => return Ok(()),
        Err(ServeError::MalformedRequest(reason)) => {
            tracing::debug!(%reason, "rejecting malformed preview request");
            let response = Response::text(400, format!("Bad Request: {reason}"));
            write_response(&mut write_half, &response, true).await?;
            write_half.shutdown().await?;
            discard_unread(&mut reader).await;
            return Ok(());
        }
        Err(err) => return Err(err),
    };

    let response = match respond(site, &request).await {
        Ok(response) => response,
        Err(err) => {
            tracing::warn!(target_path = %request.target, error = %err, "preview request failed");
            Response::text(500, format!("Internal server error: {err}"))
        }
    };
    tracing::debug!(target_path = %request.target, status = response.status, "preview request");
    let include_body = request.method != Method::Head;
    write_response(&mut write_half, &response, include_body).await
}

/// Swallow a bounded amount of unread input so closing the socket does not
/// reset the connection before the client has read the error response.
async fn discard_unread<R: AsyncRead + Unpin>(reader: &mut R) {
    let mut sink = [0u8; 4096];
    let drain = async {
        let mut discarded = 0;
        while discarded < LINGER_BYTES {
            match reader.read(&mut sink).await {
                Ok(0) | Err(_) => break,
                Ok(read) => discarded += read,
            }
        }
    };
    let _ = tokio::time::timeout(LINGER_DEADLINE, drain).await;
}

/// Produce the response for one request.
///
/// Missing or unreadable files become 404; only unexpected failures surface
/// as `Err` and are reported as 500 by the caller.
pub async fn respond(site: &SiteRoot, request: &Request) -> Result<Response, ServeError> {
    if let Method::Other(method) = &request.method {
        return Ok(Response::text(405, format!("Method {method} not allowed"))
            .with_header("Allow", "GET, HEAD"));
    }

    let pathname = percent_decode_str(request.raw_path())
        .decode_utf8()
        .map_err(|_| ServeError::BadPath(request.raw_path().to_string()))?;

    let Some(path) = site.resolve(&pathname).await else {
        return Ok(Response::not_found());
    };
    match tokio::fs::read(&path).await {
        Ok(data) => Ok(Response::new(200, content_type_for(&path), data)),
        Err(err) => {
            tracing::debug!(path = %path.display(), error = %err, "preview file unreadable");
            Ok(Response::not_found())
        }
    }
}
