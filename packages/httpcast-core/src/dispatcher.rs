//! URL dispatcher: routes a parsed path to its handler.

use std::io;

use log::debug;

use crate::core::AudioCore;
use crate::handlers;
use crate::html;
use crate::ioline::IoLine;
use crate::protocol_constants::{URL_CSS, URL_LISTEN, URL_LISTEN_SOURCE, URL_ROOT, URL_STATUS};
use crate::stream_handler::{self, StreamOutcome};

/// Matches `url` against the four exact routes and the one prefix route,
/// invoking the corresponding handler; anything else gets a 404.
pub async fn dispatch(
    line: &mut IoLine,
    core: &AudioCore,
    url: &str,
    pid: u32,
    live_connections: usize,
    server_token: &str,
) -> io::Result<StreamOutcome> {
    debug!("request for {url}");

    if url == URL_ROOT {
        handlers::handle_root(line, core, pid, server_token).await?;
        Ok(StreamOutcome::Done)
    } else if url == URL_CSS {
        handlers::handle_css(line, server_token).await?;
        Ok(StreamOutcome::Done)
    } else if url == URL_STATUS {
        handlers::handle_status(line, core, live_connections, server_token).await?;
        Ok(StreamOutcome::Done)
    } else if url == URL_LISTEN {
        handlers::handle_listen(line, core, server_token).await?;
        Ok(StreamOutcome::Done)
    } else if let Some(name) = url.strip_prefix(URL_LISTEN_SOURCE) {
        stream_handler::handle_listen_prefix(line, core, name, server_token).await
    } else {
        html::html_response(line, 404, "Not Found", None, server_token).await?;
        Ok(StreamOutcome::Done)
    }
}
