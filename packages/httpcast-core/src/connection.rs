//! Connection object: the per-connection state machine from accepted
//! socket through request parsing, dispatch, and — for a streaming
//! request — the audio-to-socket write pump until the peer
//! disconnects or the subscription dies.
//!
//! Admission and the connection set live in [`crate::protocol`]; this module
//! is just what runs *inside* one already-admitted connection's task.

use std::io;
use std::sync::Arc;

use log::error;

use crate::core::AudioCore;
use crate::dispatcher;
use crate::html;
use crate::iochannel::IoChannel;
use crate::ioline::IoLine;
use crate::memblockq::MemBlockQueue;
use crate::parser::{is_blank_header_line, parse_request_line};
use crate::source_output::SourceOutput;
use crate::stream_handler::StreamOutcome;

/// Runs one connection end to end. Every exit path — EOF, malformed
/// request, peer hangup, killed subscription, or a completed non-streaming
/// response — simply returns; the caller (the protocol singleton) removes
/// the connection from its set once this future resolves, which is the
/// entirety of `unlink` for the normal, self-terminating paths.
pub async fn serve(
    core: Arc<AudioCore>,
    stream: tokio::net::TcpStream,
    pid: u32,
    live_connections: usize,
    server_token: String,
) {
    let io = IoChannel::new(stream);
    let mut line = IoLine::new(io);

    // STATE_REQUEST_LINE
    let url = loop {
        let Some(raw) = line.next_line().await else {
            return; // EOF on request read: silent unlink
        };
        match parse_request_line(&raw) {
            Some(url) => break url,
            None => {
                let _ = html::html_response(&mut line, 500, "Internal Server Error", None, &server_token).await;
                return;
            }
        }
    };

    // STATE_MIME_HEADER: swallow lines until the blank separator.
    loop {
        let Some(raw) = line.next_line().await else {
            return;
        };
        if is_blank_header_line(&raw) {
            break;
        }
    }

    // STATE_DATA
    dispatch_and_stream(&mut line, &core, &url, pid, live_connections, &server_token).await;
}

async fn dispatch_and_stream(
    line: &mut IoLine,
    core: &Arc<AudioCore>,
    url: &str,
    pid: u32,
    live_connections: usize,
    server_token: &str,
) {
    let outcome = match dispatcher::dispatch(line, core, url, pid, live_connections, server_token).await {
        Ok(outcome) => outcome,
        Err(_) => return, // write failed; peer already gone
    };

    if let StreamOutcome::Streaming { io, source_output, queue } = outcome {
        run_bridge(io, source_output, queue).await;
    }
}

/// The audio-to-socket bridge: drains pushed chunks into the output
/// queue and the queue onto the socket — two convergent paths that, on a
/// real audio engine, run on separate audio and main threads. Here
/// both paths are plain `tokio::select!` arms over the same task — the
/// producer task on the other end of `source_output`'s channel stands in
/// for the audio thread.
async fn run_bridge(io: IoChannel, mut source_output: SourceOutput, mut queue: MemBlockQueue) {
    loop {
        tokio::select! {
            biased;

            readiness = io.readable() => {
                if readiness.is_err() {
                    return;
                }
                let mut probe = [0u8; 256];
                match io.try_read(&mut probe) {
                    Ok(0) => return, // peer hungup
                    Ok(_) => {} // no request body is expected; ignore stray bytes
                    Err(e) if e.kind() == io::ErrorKind::WouldBlock => {}
                    Err(_) => return,
                }
            }

            chunk = source_output.recv() => {
                match chunk {
                    Some(bytes) => {
                        queue.push_align(bytes);
                        if do_write(&io, &mut queue).await.is_err() {
                            return;
                        }
                    }
                    None => return, // source-output killed
                }
            }

            readiness = io.writable(), if !queue.is_empty() => {
                if readiness.is_err() {
                    return;
                }
                if do_write(&io, &mut queue).await.is_err() {
                    return;
                }
            }
        }
    }
}

/// Peeks the next chunk, writes it, and drops exactly what the kernel
/// accepted. `WouldBlock` (the Rust analogue of `EINTR`/`EAGAIN`) is zero
/// progress, not an error; any other write error is logged and unlinks the
/// connection.
async fn do_write(io: &IoChannel, queue: &mut MemBlockQueue) -> Result<(), ()> {
    let Some(chunk) = queue.peek() else {
        return Ok(()); // queue empty; next push retriggers
    };

    match io.try_write(chunk) {
        Ok(n) => {
            queue.drop_bytes(n);
            Ok(())
        }
        Err(e) if e.kind() == io::ErrorKind::WouldBlock => Ok(()),
        Err(e) => {
            error!("write(): {e}");
            Err(())
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::SourceInfo;
    use crate::format::{ChannelMap, SampleFormat, SampleSpec};
    use tokio::io::{AsyncReadExt, AsyncWriteExt};
    use tokio::net::{TcpListener, TcpStream};

    async fn connected_pair() -> (TcpStream, TcpStream) {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        let client = TcpStream::connect(addr).await.unwrap();
        let (server, _) = listener.accept().await.unwrap();
        (client, server)
    }

    #[tokio::test]
    async fn non_get_request_line_yields_500() {
        let core = Arc::new(AudioCore::new("u".into(), "h".into(), "m".into(), "s".into()));
        let (mut client, server) = connected_pair().await;
        client.write_all(b"POST / HTTP/1.0\r\n\r\n").await.unwrap();

        serve(core, server, 1, 0, "httpcast/0".into()).await;

        let mut body = String::new();
        client.read_to_string(&mut body).await.unwrap();
        assert!(body.contains("500"));
        assert!(body.contains("Internal Server Error"));
    }

    #[tokio::test]
    async fn eof_before_blank_line_unlinks_silently() {
        let core = Arc::new(AudioCore::new("u".into(), "h".into(), "m".into(), "s".into()));
        let (client, server) = connected_pair().await;
        drop(client);

        // must return promptly rather than hang
        serve(core, server, 1, 0, "httpcast/0".into()).await;
    }

    #[tokio::test]
    async fn root_request_completes_and_closes() {
        let core = Arc::new(AudioCore::new("u".into(), "h".into(), "m".into(), "s".into()));
        let (mut client, server) = connected_pair().await;
        client.write_all(b"GET / HTTP/1.0\r\n\r\n").await.unwrap();

        serve(core, server, 1, 0, "httpcast/0".into()).await;

        let mut body = String::new();
        client.read_to_string(&mut body).await.unwrap();
        assert!(body.contains("200 OK"));
    }

    #[tokio::test]
    async fn streaming_request_delivers_audio_bytes() {
        let core = Arc::new(AudioCore::new("u".into(), "h".into(), "m".into(), "s".into()));
        core.add_source(SourceInfo {
            name: "mic".into(),
            description: "Mic".into(),
            sample_spec: SampleSpec { format: SampleFormat::S16BE, rate: 8000, channels: 1 },
            channel_map: ChannelMap::default_for(1),
            monitor_of: None,
            suspended: false,
        });

        let (mut client, server) = connected_pair().await;
        client.write_all(b"GET /listen/source/mic HTTP/1.0\r\n\r\n").await.unwrap();

        let handle = tokio::spawn(serve(core, server, 1, 0, "httpcast/0".into()));

        let mut buf = [0u8; 512];
        let n = tokio::time::timeout(std::time::Duration::from_secs(2), client.read(&mut buf))
            .await
            .expect("should have received bytes before timing out")
            .unwrap();
        assert!(n > 0);

        drop(client); // triggers hungup detection in the bridge
        let _ = tokio::time::timeout(std::time::Duration::from_secs(2), handle).await;
    }
}
