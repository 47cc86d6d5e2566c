//! Line-oriented reader layered over an [`IoChannel`].
//!
//! Feeds the request parser one text line at a time, and doubles as
//! the write side for every response (writes go straight through here,
//! unbuffered, before the connection ever reaches binary mode). Supports
//! detaching to a raw iochannel once the request phase ends, and a
//! "close after flush" deferred close so an HTML response isn't truncated.

use std::io;

use bytes::BytesMut;
use tokio::io::AsyncWriteExt;

use crate::iochannel::IoChannel;

/// Read buffer growth increment. Header-line length is intentionally
/// unbounded: a pathological client can still send an arbitrarily long
/// line, it just costs more reallocations, not a hard failure.
const READ_CHUNK: usize = 4096;

pub struct IoLine {
    io: Option<IoChannel>,
    buf: BytesMut,
}

impl IoLine {
    pub fn new(io: IoChannel) -> Self {
        IoLine { io: Some(io), buf: BytesMut::new() }
    }

    /// Reads and returns the next newline-terminated line (CR stripped, LF
    /// consumed), or `None` on EOF. A line already queued in `buf` is
    /// returned without touching the socket.
    pub async fn next_line(&mut self) -> Option<String> {
        loop {
            if let Some(pos) = self.buf.iter().position(|&b| b == b'\n') {
                let mut line = self.buf.split_to(pos + 1);
                line.truncate(line.len() - 1); // drop the '\n'
                if line.last() == Some(&b'\r') {
                    line.truncate(line.len() - 1);
                }
                return Some(String::from_utf8_lossy(&line).into_owned());
            }

            let io = self.io.as_ref()?;
            if io.readable().await.is_err() {
                return None;
            }

            let mut chunk = [0u8; READ_CHUNK];
            match io.try_read(&mut chunk) {
                Ok(0) => return None, // EOF; any partial trailing line is discarded
                Ok(n) => self.buf.extend_from_slice(&chunk[..n]),
                Err(e) if e.kind() == io::ErrorKind::WouldBlock => continue,
                Err(_) => return None,
            }
        }
    }

    /// Writes raw bytes directly to the socket (response headers/bodies
    /// before the connection detaches to binary mode).
    pub async fn write_raw(&mut self, bytes: &[u8]) -> io::Result<()> {
        match &mut self.io {
            Some(io) => io.stream_mut().write_all(bytes).await,
            None => Err(io::Error::new(io::ErrorKind::NotConnected, "ioline already detached")),
        }
    }

    /// Schedules the connection to close once the current write has
    /// drained. Since writes above are awaited synchronously, the bytes are
    /// already flushed by the time this is called — this issues the
    /// half-close immediately rather than truncating the response.
    pub async fn defer_close(&mut self) {
        if let Some(io) = &mut self.io {
            let _ = io.shutdown_write().await;
        }
        self.io = None;
    }

    /// True once nothing is queued to write — trivially true here, since
    /// writes are awaited rather than buffered, so any drain-notification
    /// callback would fire immediately.
    pub fn is_drained(&self) -> bool {
        true
    }

    /// Detaches the underlying [`IoChannel`] for the streaming handler's
    /// switch to raw binary mode. After this call the line reader owns
    /// nothing further.
    pub fn detach_iochannel(&mut self) -> Option<IoChannel> {
        self.io.take()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tokio::io::AsyncWriteExt as _;
    use tokio::net::{TcpListener, TcpStream};

    async fn connected_pair() -> (TcpStream, TcpStream) {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        let client = TcpStream::connect(addr).await.unwrap();
        let (server, _) = listener.accept().await.unwrap();
        (client, server)
    }

    #[tokio::test]
    async fn reads_one_line_at_a_time() {
        let (mut client, server) = connected_pair().await;
        client.write_all(b"GET / HTTP/1.0\r\n\r\n").await.unwrap();

        let mut line = IoLine::new(IoChannel::new(server));
        assert_eq!(line.next_line().await.as_deref(), Some("GET / HTTP/1.0"));
        assert_eq!(line.next_line().await.as_deref(), Some(""));
    }

    #[tokio::test]
    async fn eof_yields_none() {
        let (client, server) = connected_pair().await;
        drop(client);

        let mut line = IoLine::new(IoChannel::new(server));
        assert_eq!(line.next_line().await, None);
    }
}
