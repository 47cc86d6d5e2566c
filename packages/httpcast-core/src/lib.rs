//! httpcast-core - shared library for httpcast.
//!
//! This crate provides the core of a small HTTP server that exposes a
//! sound server's sinks and sources as streamable, browser-playable audio
//! endpoints: a root info page, a status page, a `/listen` index, and
//! `/listen/source/<name>` raw-audio streams, each negotiated down to a
//! format common browsers and media players can decode without a codec.
//!
//! # Architecture
//!
//! - [`format`]: sample-spec encodability checks, the fixed-ladder coercion
//!   to an MIME-streamable rate, and MIME rendering
//! - [`html`]: the fixed HTML page skeleton, stylesheet, and HTML escaping
//! - [`parser`]: request-line and header-line parsing (pure logic)
//! - [`handlers`]: the static/semi-static info pages (`/`, `/style`,
//!   `/status`, `/listen`)
//! - [`dispatcher`]: routes a parsed URL to its handler
//! - [`stream_handler`]: resolves `/listen/source/<name>` into an active
//!   streaming subscription
//! - [`connection`]: the per-connection state machine, including the
//!   audio-to-socket write pump
//! - [`protocol`]: the refcounted singleton owning the connection set and
//!   the admission cap
//! - [`core`]: the in-memory audio device registry and shared-object
//!   registry this crate's protocol layer runs against
//! - [`iochannel`], [`ioline`]: non-blocking socket I/O and line-buffered
//!   reads over it
//! - [`memblockq`]: the bounded, drop-oldest-on-overflow output queue
//! - [`source_output`]: a streaming subscription against a source, backed
//!   by a synthetic silence-producer task
//! - [`error`]: centralized error types and their HTTP status mapping
//! - [`protocol_constants`]: fixed limits, URLs, and MIME strings

#![warn(clippy::all)]

pub mod connection;
pub mod core;
pub mod dispatcher;
pub mod error;
pub mod format;
pub mod handlers;
pub mod html;
pub mod iochannel;
pub mod ioline;
pub mod memblockq;
pub mod parser;
pub mod protocol;
pub mod protocol_constants;
pub mod source_output;
pub mod stream_handler;

pub use core::{AudioCore, SharedRegistry, SinkInfo, SourceInfo};
pub use error::{CoreError, HttpProtoError};
pub use format::{ChannelMap, ChannelPosition, SampleFormat, SampleSpec};
pub use protocol::HttpProtocol;
