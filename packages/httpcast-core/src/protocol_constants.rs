//! Fixed protocol constants. These are defined by the wire protocol itself
//! and changing them changes what the server speaks on the wire, not just
//! how it's tuned.

// ─────────────────────────────────────────────────────────────────────────────
// Admission
// ─────────────────────────────────────────────────────────────────────────────

/// Hard, process-wide cap on concurrently live connections. The cap is
/// enforced at accept time: the connection over the limit never receives an
/// HTTP reply, its socket is simply released.
pub const MAX_CONNECTIONS: usize = 10;

// ─────────────────────────────────────────────────────────────────────────────
// Streaming handler
// ─────────────────────────────────────────────────────────────────────────────

/// Seconds of coerced-format audio the per-connection output queue can hold
/// before the oldest bytes are dropped.
pub const RECORD_BUFFER_SECONDS: u64 = 5;

/// Requested latency for a newly created source-output subscription, in
/// milliseconds.
pub const DEFAULT_SOURCE_LATENCY_MS: u64 = 300;

/// Cadence at which the demo audio-producer task manufactures a chunk of
/// silence for a streaming connection.
pub const SILENCE_FRAME_DURATION_MS: u64 = 10;

// ─────────────────────────────────────────────────────────────────────────────
// URL surface
// ─────────────────────────────────────────────────────────────────────────────

pub const URL_ROOT: &str = "/";
pub const URL_CSS: &str = "/style";
pub const URL_STATUS: &str = "/status";
pub const URL_LISTEN: &str = "/listen";
pub const URL_LISTEN_SOURCE: &str = "/listen/source/";

// ─────────────────────────────────────────────────────────────────────────────
// MIME types for non-audio bodies
// ─────────────────────────────────────────────────────────────────────────────

pub const MIME_HTML: &str = "text/html; charset=utf-8";
pub const MIME_TEXT: &str = "text/plain; charset=utf-8";
pub const MIME_CSS: &str = "text/css";

// ─────────────────────────────────────────────────────────────────────────────
// Identity
// ─────────────────────────────────────────────────────────────────────────────

/// Product name reported in the `Server:` header and the root page's title.
pub const APP_NAME: &str = "httpcast";

/// Shared-registry key the protocol singleton registers itself under.
pub const PROTOCOL_REGISTRY_KEY: &str = "http-protocol";
