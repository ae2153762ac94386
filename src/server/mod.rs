//! Tokio TCP front end.
//!
//! Each accepted socket gets its own task that pulls HTTP/1.x requests off the
//! wire, hands them to a handler and writes the responses back, reusing the
//! socket while both sides agree on keep-alive. [`Server::serve_until`] and
//! [`Server::run_until`] stop accepting once a shutdown future resolves.

use std::future::Future;
use std::io;
use std::net::SocketAddr;
use std::sync::Arc;

use bytes::{Buf, BytesMut};
use thiserror::Error;
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::{TcpListener, TcpStream};
use tracing::{debug, error, info, warn};

use crate::http::{
    StatusCode,
    request::{Request, RequestError},
    response::Response,
};
use crate::router::Router;

/// Errors produced by the server.
#[derive(Debug, Error)]
pub enum ServerError {
    #[error("I/O error: {0}")]
    Io(#[from] io::Error),

    #[error("failed to bind to {addr}: {source}")]
    Bind {
        addr: String,
        #[source]
        source: io::Error,
    },
}

/// Largest request (head plus declared body) a connection will buffer.
const REQUEST_LIMIT: usize = 1024 * 1024;

const READ_CHUNK: usize = 4 * 1024;

/// A bound listener.
///
/// # Examples
///
/// ```rust,no_run
/// use catfacts::context::Context;
/// use catfacts::{Response, Router, Server, StatusCode};
///
/// #[tokio::main]
/// async fn main() -> Result<(), Box<dyn std::error::Error>> {
///     let mut router = Router::new();
///     router.get("/ping", |_ctx: Context| async { Response::new(StatusCode::Ok) });
///
///     let server = Server::bind("127.0.0.1:3000").await?;
///     server.serve(router).await?;
///     Ok(())
/// }
/// ```
pub struct Server {
    listener: TcpListener,
    local_addr: SocketAddr,
}

impl Server {
    /// Binds to `addr`. Port `0` lets the OS pick a free port.
    ///
    /// # Errors
    ///
    /// Returns [`ServerError::Bind`] if the address cannot be bound.
    pub async fn bind(addr: impl AsRef<str>) -> Result<Self, ServerError> {
        let addr = addr.as_ref();
        let listener = TcpListener::bind(addr).await.map_err(|source| ServerError::Bind {
            addr: addr.to_owned(),
            source,
        })?;
        let local_addr = listener.local_addr()?;
        Ok(Self {
            listener,
            local_addr,
        })
    }

    /// The address actually bound, useful after binding port `0`.
    pub fn local_addr(&self) -> SocketAddr {
        self.local_addr
    }

    /// Serves `router` until the process ends.
    pub async fn serve(self, router: Router) -> Result<(), ServerError> {
        self.serve_until(router, std::future::pending()).await
    }

    /// Serves `router` until `shutdown` resolves.
    pub async fn serve_until<S>(self, router: Router, shutdown: S) -> Result<(), ServerError>
    where
        S: Future<Output = ()> + Send,
    {
        let router = Arc::new(router);
        self.run_until(
            move |request| {
                let router = Arc::clone(&router);
                async move { router.route(request).await }
            },
            shutdown,
        )
        .await
    }

    /// Dispatches every request to `handler` until the process ends.
    pub async fn run<H, F>(self, handler: H) -> Result<(), ServerError>
    where
        H: Fn(Request) -> F + Send + Sync + 'static,
        F: Future<Output = Response> + Send + 'static,
    {
        self.run_until(handler, std::future::pending()).await
    }

    /// Dispatches every request to `handler` until `shutdown` resolves.
    ///
    /// Shutdown stops the accept loop only; connections already open finish
    /// on their own tasks.
    ///
    /// # Errors
    ///
    /// Currently never fails: accept errors are logged and the loop continues.
    pub async fn run_until<H, F, S>(self, handler: H, shutdown: S) -> Result<(), ServerError>
    where
        H: Fn(Request) -> F + Send + Sync + 'static,
        F: Future<Output = Response> + Send + 'static,
        S: Future<Output = ()> + Send,
    {
        let handler = Arc::new(handler);
        info!(address = %self.local_addr, "catfacts listening");
        tokio::pin!(shutdown);

        loop {
            let (stream, peer) = tokio::select! {
                () = &mut shutdown => {
                    info!("shutdown requested, no longer accepting connections");
                    return Ok(());
                }
                accepted = self.listener.accept() => match accepted {
                    Ok(pair) => pair,
                    Err(e) => {
                        error!(error = %e, "accept failed");
                        continue;
                    }
                },
            };

            debug!(%peer, "connection opened");
            let conn = Connection::new(stream, peer);
            let handler = Arc::clone(&handler);
            tokio::spawn(async move {
                if let Err(e) = conn.serve(handler).await {
                    warn!(%peer, error = %e, "connection dropped");
                }
            });
        }
    }
}

// What the read side produced next.
enum Frame {
    // A complete request and the number of buffered bytes it occupies.
    Request(Request, usize),
    // The bytes cannot become a request; answer and hang up.
    Reject(Response),
    Closed,
}

struct Connection {
    stream: TcpStream,
    peer: SocketAddr,
    buf: BytesMut,
}

impl Connection {
    fn new(stream: TcpStream, peer: SocketAddr) -> Self {
        Self {
            stream,
            peer,
            buf: BytesMut::with_capacity(READ_CHUNK),
        }
    }

    async fn serve<H, F>(mut self, handler: Arc<H>) -> io::Result<()>
    where
        H: Fn(Request) -> F + Send + Sync + 'static,
        F: Future<Output = Response> + Send + 'static,
    {
        loop {
            let (request, consumed) = match self.next_frame().await? {
                Frame::Request(request, consumed) => (request, consumed),
                Frame::Reject(response) => return self.write(response.keep_alive(false)).await,
                Frame::Closed => {
                    debug!(peer = %self.peer, "connection closed by peer");
                    return Ok(());
                }
            };
            self.buf.advance(consumed);

            let keep_alive = request.is_keep_alive();
            debug!(
                peer = %self.peer,
                method = %request.method(),
                path = %request.path(),
                "dispatching request"
            );

            // Running the handler on its own task confines a panic to that task.
            let response = match tokio::spawn(handler(request)).await {
                Ok(response) => response,
                Err(e) => {
                    error!(peer = %self.peer, error = %e, "handler panicked");
                    Response::error(StatusCode::InternalServerError, "Internal Server Error")
                }
            };
            self.write(response.keep_alive(keep_alive)).await?;

            if !keep_alive {
                return Ok(());
            }
        }
    }

    async fn next_frame(&mut self) -> io::Result<Frame> {
        loop {
            if !self.buf.is_empty() {
                match Request::parse(&self.buf) {
                    Ok((request, head_len)) => {
                        let frame_len = head_len + request.content_length().unwrap_or(0);
                        if frame_len > REQUEST_LIMIT {
                            return Ok(self.reject(StatusCode::PayloadTooLarge, "Payload Too Large"));
                        }
                        if self.buf.len() >= frame_len {
                            return Ok(Frame::Request(request, frame_len));
                        }
                    }
                    Err(RequestError::Incomplete) => {}
                    Err(e) => return Ok(self.reject(StatusCode::BadRequest, &e.to_string())),
                }
            }
            if self.buf.len() > REQUEST_LIMIT {
                return Ok(self.reject(StatusCode::PayloadTooLarge, "Payload Too Large"));
            }
            if self.stream.read_buf(&mut self.buf).await? == 0 {
                return Ok(Frame::Closed);
            }
        }
    }

    fn reject(&self, status: StatusCode, message: &str) -> Frame {
        warn!(peer = %self.peer, status = status.as_u16(), reason = message, "rejecting request");
        Frame::Reject(Response::error(status, message))
    }

    async fn write(&mut self, response: Response) -> io::Result<()> {
        self.stream.write_all(&response.into_bytes()).await?;
        self.stream.flush().await
    }
}
