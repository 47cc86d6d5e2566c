//! Info handlers: the four static/semi-static pages that don't
//! involve a source-output subscription. Every handler here defers the
//! connection's close until its body has been written.

use std::io;

use crate::core::AudioCore;
use crate::format::coerce_and_mime;
use crate::html;
use crate::ioline::IoLine;
use crate::protocol_constants::{APP_NAME, MIME_CSS, MIME_TEXT};

/// `/` — a small table of process identity fields, plus links to `/status`
/// and `/listen`.
pub async fn handle_root(line: &mut IoLine, core: &AudioCore, pid: u32, server_token: &str) -> io::Result<()> {
    let title = format!("{} {}", APP_NAME, env!("CARGO_PKG_VERSION"));

    html::http_response(line, 200, "OK", "text/html; charset=utf-8", server_token).await?;
    html::html_page_open(line, &title).await?;
    line.write_raw(format!("<h1>{title}</h1>\r\n<table>\r\n").as_bytes()).await?;

    html::print_field(line, "User Name:", &core.user_name).await?;
    html::print_field(line, "Host name:", &core.host_name).await?;
    html::print_field(line, "Machine ID:", &core.machine_id).await?;
    html::print_field(line, "System:", &core.system_info).await?;
    html::print_field(line, "Process ID:", &pid.to_string()).await?;

    line.write_raw(
        b"</table>\r\n\
          <p><a href=\"/status\">Show an extensive server status report</a></p>\r\n\
          <p><a href=\"/listen\">Monitor sinks and sources</a></p>\r\n",
    )
    .await?;
    html::html_page_close(line).await?;
    line.defer_close().await;
    Ok(())
}

/// `/style` — the fixed stylesheet.
pub async fn handle_css(line: &mut IoLine, server_token: &str) -> io::Result<()> {
    html::http_response(line, 200, "OK", MIME_CSS, server_token).await?;
    line.write_raw(html::STYLE_SHEET.as_bytes()).await?;
    line.defer_close().await;
    Ok(())
}

/// `/status` — plain-text process status dump.
pub async fn handle_status(
    line: &mut IoLine,
    core: &AudioCore,
    live_connections: usize,
    server_token: &str,
) -> io::Result<()> {
    html::http_response(line, 200, "OK", MIME_TEXT, server_token).await?;
    line.write_raw(core.status_report(live_connections).as_bytes()).await?;
    line.defer_close().await;
    Ok(())
}

/// `/listen` — an HTML index of every sink (linked via its monitor source's
/// name) and every source that isn't itself a sink's monitor.
pub async fn handle_listen(line: &mut IoLine, core: &AudioCore, server_token: &str) -> io::Result<()> {
    html::http_response(line, 200, "OK", "text/html; charset=utf-8", server_token).await?;
    html::html_page_open(line, "Listen").await?;
    line.write_raw(b"<h2>Sinks</h2>\r\n<p>\r\n").await?;

    for entry in core.sinks.iter() {
        let sink = entry.value();
        let title = html::escape_html(&sink.description);
        let mime = coerce_and_mime(&sink.sample_spec, &sink.channel_map);
        let row = format!(
            "<a href=\"/listen/source/{}\" title=\"{}\">{}</a><br/>\r\n",
            sink.monitor_source_name, mime, title
        );
        line.write_raw(row.as_bytes()).await?;
    }

    line.write_raw(b"</p>\r\n<h2>Sources</h2>\r\n<p>\r\n").await?;

    for entry in core.sources.iter() {
        let source = entry.value();
        if source.monitor_of.is_some() {
            continue;
        }
        let title = html::escape_html(&source.description);
        let mime = coerce_and_mime(&source.sample_spec, &source.channel_map);
        let row = format!(
            "<a href=\"/listen/source/{}\" title=\"{}\">{}</a><br/>\r\n",
            source.name, mime, title
        );
        line.write_raw(row.as_bytes()).await?;
    }

    line.write_raw(b"</p>\r\n").await?;
    html::html_page_close(line).await?;
    line.defer_close().await;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::{SinkInfo, SourceInfo};
    use crate::format::{ChannelMap, SampleFormat, SampleSpec};
    use crate::iochannel::IoChannel;
    use tokio::io::AsyncReadExt;
    use tokio::net::{TcpListener, TcpStream};

    async fn connected_pair() -> (TcpStream, TcpStream) {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        let client = TcpStream::connect(addr).await.unwrap();
        let (server, _) = listener.accept().await.unwrap();
        (client, server)
    }

    fn core() -> AudioCore {
        AudioCore::new("alice".into(), "box".into(), "abc123".into(), "Linux x86_64".into())
    }

    async fn drain(mut client: TcpStream) -> String {
        let mut buf = String::new();
        let _ = client.read_to_string(&mut buf).await;
        buf
    }

    #[tokio::test]
    async fn root_page_contains_expected_fields_and_links() {
        let (client, server) = connected_pair().await;
        let mut line = IoLine::new(IoChannel::new(server));
        handle_root(&mut line, &core(), 4242, "httpcast/0").await.unwrap();

        let body = drain(client).await;
        assert!(body.contains("Content-Type: text/html; charset=utf-8"));
        assert!(body.contains("User Name:"));
        assert!(body.contains("<a href=\"/status\">"));
        assert!(body.contains("<a href=\"/listen\">"));
    }

    #[tokio::test]
    async fn css_page_contains_the_expected_literal_rule() {
        let (client, server) = connected_pair().await;
        let mut line = IoLine::new(IoChannel::new(server));
        handle_css(&mut line, "httpcast/0").await.unwrap();

        let body = drain(client).await;
        assert!(body.contains("Content-Type: text/css"));
        assert!(body.contains("body { color: black"));
    }

    #[tokio::test]
    async fn listen_page_links_sinks_via_monitor_source_name() {
        let c = core();
        c.add_sink(SinkInfo {
            name: "speakers".into(),
            description: "Speakers".into(),
            sample_spec: SampleSpec { format: SampleFormat::S16LE, rate: 44100, channels: 2 },
            channel_map: ChannelMap::default_for(2),
            monitor_source_name: "speakers.monitor".into(),
        });
        c.add_source(SourceInfo {
            name: "speakers.monitor".into(),
            description: "Monitor of Speakers".into(),
            sample_spec: SampleSpec { format: SampleFormat::S16LE, rate: 44100, channels: 2 },
            channel_map: ChannelMap::default_for(2),
            monitor_of: Some("speakers".into()),
            suspended: false,
        });
        c.add_source(SourceInfo {
            name: "mic".into(),
            description: "Mic".into(),
            sample_spec: SampleSpec { format: SampleFormat::S16LE, rate: 44100, channels: 1 },
            channel_map: ChannelMap::default_for(1),
            monitor_of: None,
            suspended: false,
        });

        let (client, server) = connected_pair().await;
        let mut line = IoLine::new(IoChannel::new(server));
        handle_listen(&mut line, &c, "httpcast/0").await.unwrap();

        let body = drain(client).await;
        assert!(body.contains("href=\"/listen/source/speakers.monitor\""));
        assert!(body.contains("href=\"/listen/source/mic\""));
        // the monitor-of-sink source itself must not appear in the Sources section
        assert_eq!(body.matches("Monitor of Speakers").count(), 0);
    }
}
