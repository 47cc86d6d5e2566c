//! Streaming handler: resolves a named source, negotiates its
//! format, stands up the source-output subscription and output queue, and
//! switches the connection from line mode to raw binary mode.

use std::io;

use crate::core::AudioCore;
use crate::error::HttpProtoError;
use crate::format::{self, SampleSpec};
use crate::html;
use crate::iochannel::IoChannel;
use crate::ioline::IoLine;
use crate::memblockq::MemBlockQueue;
use crate::protocol_constants::RECORD_BUFFER_SECONDS;
use crate::source_output::SourceOutput;

/// What dispatch produced: either the response was fully written and the
/// connection can close normally, or the connection has switched to binary
/// mode and the caller must run the write-pump loop over the
/// returned pieces.
pub enum StreamOutcome {
    Done,
    Streaming { io: IoChannel, source_output: SourceOutput, queue: MemBlockQueue },
}

/// Entry point for `/listen/source/<name>`.
pub async fn handle_listen_prefix(
    line: &mut IoLine,
    core: &AudioCore,
    source_name: &str,
    server_token: &str,
) -> Result<StreamOutcome, io::Error> {
    let source_output = match core.create_source_output(source_name) {
        Ok(output) => output,
        Err(err) => {
            let proto_err: HttpProtoError = err.into();
            let (code, reason) = proto_err.status();
            html::html_response(line, code, reason, None, server_token).await?;
            return Ok(StreamOutcome::Done);
        }
    };

    let spec: &SampleSpec = source_output.sample_spec();
    let max_length = (spec.bytes_per_second() * RECORD_BUFFER_SECONDS) as usize;
    let queue = MemBlockQueue::new(max_length, spec.frame_size());

    let mime = format::to_mime(spec, source_output.channel_map())
        .expect("create_source_output always returns a coerced, encodable spec");

    html::http_response(line, 200, "OK", &mime, server_token).await?;

    // Binary-mode transition: detach the line reader, hand the raw
    // iochannel and the now-activated subscription to the caller's bridge
    // loop. A drain-then-transition branch isn't needed here because every
    // write above was already awaited, so the line is always already drained.
    let io = line
        .detach_iochannel()
        .expect("line reader owns the iochannel until this point");
    io.set_send_buffer_size(queue.max_length())?;

    Ok(StreamOutcome::Streaming { io, source_output, queue })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::SourceInfo;
    use crate::format::{ChannelMap, SampleFormat};
    use tokio::io::AsyncReadExt;
    use tokio::net::{TcpListener, TcpStream};

    async fn connected_pair() -> (TcpStream, TcpStream) {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        let client = TcpStream::connect(addr).await.unwrap();
        let (server, _) = listener.accept().await.unwrap();
        (client, server)
    }

    #[tokio::test]
    async fn unknown_source_yields_404() {
        let core = AudioCore::new("u".into(), "h".into(), "m".into(), "s".into());
        let (mut client, server) = connected_pair().await;
        let mut line = IoLine::new(crate::iochannel::IoChannel::new(server));

        let outcome = handle_listen_prefix(&mut line, &core, "missing", "httpcast/0").await.unwrap();
        assert!(matches!(outcome, StreamOutcome::Done));

        let mut body = String::new();
        client.read_to_string(&mut body).await.unwrap();
        assert!(body.contains("404"));
        assert!(body.contains("Source not found"));
    }

    #[tokio::test]
    async fn known_source_switches_to_streaming_with_sized_queue() {
        let core = AudioCore::new("u".into(), "h".into(), "m".into(), "s".into());
        core.add_source(SourceInfo {
            name: "mic".into(),
            description: "Mic".into(),
            sample_spec: SampleSpec { format: SampleFormat::S16LE, rate: 44100, channels: 1 },
            channel_map: ChannelMap::default_for(1),
            monitor_of: None,
            suspended: false,
        });

        let (mut client, server) = connected_pair().await;
        let mut line = IoLine::new(crate::iochannel::IoChannel::new(server));
        let outcome = handle_listen_prefix(&mut line, &core, "mic", "httpcast/0").await.unwrap();

        match outcome {
            StreamOutcome::Streaming { queue, .. } => {
                // 5s * 44100Hz * 2 bytes (S16BE) * 1 channel
                assert_eq!(queue.max_length(), 5 * 44100 * 2);
            }
            StreamOutcome::Done => panic!("expected streaming outcome"),
        }

        let mut header = [0u8; 128];
        let n = client.read(&mut header).await.unwrap();
        let text = String::from_utf8_lossy(&header[..n]);
        assert!(text.contains("audio/L16; rate=44100; channels=1"));
    }
}
