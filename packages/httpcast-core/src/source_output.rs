//! Source-output subscription and the audio-thread-to-main-thread chunk
//! hand-off.
//!
//! A real audio core delivers pushed chunks from a genuine real-time thread.
//! This stand-in spawns a `tokio` task that manufactures silence at the
//! coerced sample rate's cadence and posts it through an unbounded `mpsc`
//! channel — the channel send is the push-path message post; the channel
//! recv on the connection side is the main thread dequeuing it.

use bytes::{Bytes, BytesMut};
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tokio::time::{interval, Duration};

use crate::format::{bytes_to_usec, ChannelMap, SampleSpec};

/// A live subscription to a source. Dropping it (or calling
/// [`kill`](Self::kill)) stops the producer task, the audio-thread analogue
/// of a kill callback that tears down the owning connection.
pub struct SourceOutput {
    sample_spec: SampleSpec,
    channel_map: ChannelMap,
    receiver: mpsc::UnboundedReceiver<Bytes>,
    producer: JoinHandle<()>,
    requested_latency_ms: u64,
}

impl SourceOutput {
    pub(crate) fn new(
        sample_spec: SampleSpec,
        channel_map: ChannelMap,
        producer: JoinHandle<()>,
        receiver: mpsc::UnboundedReceiver<Bytes>,
        requested_latency_ms: u64,
    ) -> Self {
        SourceOutput { sample_spec, channel_map, receiver, producer, requested_latency_ms }
    }

    pub fn sample_spec(&self) -> &SampleSpec {
        &self.sample_spec
    }

    pub fn channel_map(&self) -> &ChannelMap {
        &self.channel_map
    }

    /// The latency requested of the subscription at creation
    /// time. The demo producer doesn't tune its cadence off this — a real
    /// source-output would — but it's recorded so the value is observable.
    pub fn requested_latency_ms(&self) -> u64 {
        self.requested_latency_ms
    }

    /// Receives the next pushed chunk, or `None` once the producer has been
    /// killed — the caller's write-pump loop treats that exactly like
    /// a kill-callback invocation and unlinks the connection.
    pub async fn recv(&mut self) -> Option<Bytes> {
        self.receiver.recv().await
    }

    /// Stops the audio-thread analogue outright, the moment the core decides
    /// this subscription should die (source removed, module unloaded).
    pub fn kill(&self) {
        self.producer.abort();
    }

    /// `bytes_to_usec(queue_length, coerced_spec)` — the latency callback
    /// reporting the backlog currently resident in the output queue.
    pub fn latency_usec(&self, queue_len: usize) -> u64 {
        bytes_to_usec(queue_len, &self.sample_spec)
    }
}

impl Drop for SourceOutput {
    fn drop(&mut self) {
        self.producer.abort();
    }
}

/// Spawns the audio-thread analogue: a task that wakes every
/// `frame_duration_ms` and posts one frame-aligned chunk of silence. Returns
/// the task's handle (for [`SourceOutput::kill`]) and the receiving half of
/// the channel the connection task drains.
pub fn spawn_silence_producer(
    spec: SampleSpec,
    frame_size: usize,
    frame_duration_ms: u64,
) -> (JoinHandle<()>, mpsc::UnboundedReceiver<Bytes>) {
    let (tx, rx) = mpsc::unbounded_channel();

    let samples_per_frame = ((spec.rate as u64 * frame_duration_ms) / 1000).max(1) as usize;
    let chunk_len = samples_per_frame * frame_size;
    let period = Duration::from_millis(frame_duration_ms.max(1));

    let handle = tokio::spawn(async move {
        let mut ticker = interval(period);
        loop {
            ticker.tick().await;
            let silence = BytesMut::zeroed(chunk_len).freeze();
            if tx.send(silence).is_err() {
                break; // receiver dropped: subscription was killed
            }
        }
    });

    (handle, rx)
}
