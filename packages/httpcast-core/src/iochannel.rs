//! Non-blocking socket wrapper exposing writable/hungup readiness and
//! send-buffer sizing.
//!
//! Everything here is a thin layer over [`tokio::net::TcpStream`]; the
//! interesting behaviour (parsing, framing, buffering) lives above this
//! module, which only exists to give the request parser and the
//! streaming bridge a non-blocking read/write surface with explicit
//! readiness polling instead of buffered async I/O.

use std::io;

use socket2::SockRef;
use tokio::io::AsyncWriteExt;
use tokio::net::TcpStream;

/// A non-blocking socket. Reads and writes never block the calling task;
/// callers wait on [`IoChannel::readable`]/[`IoChannel::writable`] first and
/// then attempt a `try_*` call, exactly mirroring the readiness-then-attempt
/// pattern of the collaborator this stands in for.
pub struct IoChannel {
    stream: TcpStream,
}

impl IoChannel {
    pub fn new(stream: TcpStream) -> Self {
        IoChannel { stream }
    }

    /// Resolves once the socket has data to read or has been closed by the
    /// peer.
    pub async fn readable(&self) -> io::Result<()> {
        self.stream.readable().await
    }

    /// Resolves once the socket can accept more bytes without blocking.
    pub async fn writable(&self) -> io::Result<()> {
        self.stream.writable().await
    }

    /// Non-blocking read. `Ok(0)` means the peer has closed its write half
    /// (hungup); `Err` with [`io::ErrorKind::WouldBlock`] means try again
    /// after the next [`readable`](Self::readable).
    pub fn try_read(&self, buf: &mut [u8]) -> io::Result<usize> {
        self.stream.try_read(buf)
    }

    /// Non-blocking write. `Err` with [`io::ErrorKind::WouldBlock`] (the
    /// Rust analogue of `EAGAIN`/`EINTR`) means zero progress, not failure.
    pub fn try_write(&self, buf: &[u8]) -> io::Result<usize> {
        self.stream.try_write(buf)
    }

    /// Sizes the kernel send buffer to match the output queue's capacity, so
    /// an idle TCP window doesn't prematurely throttle the pipeline once the
    /// connection switches to binary streaming.
    pub fn set_send_buffer_size(&self, bytes: usize) -> io::Result<()> {
        SockRef::from(&self.stream).set_send_buffer_size(bytes)
    }

    pub fn into_inner(self) -> TcpStream {
        self.stream
    }

    pub fn peer_addr(&self) -> io::Result<std::net::SocketAddr> {
        self.stream.peer_addr()
    }

    /// Mutable access to the underlying stream for buffered async writes
    /// (used before the connection has anything worth doing non-blocking
    /// writes for, i.e. while composing response headers/bodies).
    pub fn stream_mut(&mut self) -> &mut TcpStream {
        &mut self.stream
    }

    /// Half-closes the write side so no further bytes are sent, without
    /// tearing down the read side (a peer mid-read still sees a clean EOF
    /// rather than a reset).
    pub async fn shutdown_write(&mut self) -> io::Result<()> {
        self.stream.shutdown().await
    }
}
