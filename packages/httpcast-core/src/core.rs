//! In-memory stand-in for the audio core: the device registry, name lookup,
//! and per-core shared-object registry that a real audio engine owns.
//! Real deployments would back this with an actual audio engine; this
//! crate needs only enough of it to make format negotiation, dispatch, and
//! streaming runnable and testable.

use std::any::Any;
use std::sync::Arc;

use dashmap::DashMap;

use crate::error::CoreError;
use crate::format::{ChannelMap, SampleSpec};
use crate::protocol_constants::{DEFAULT_SOURCE_LATENCY_MS, SILENCE_FRAME_DURATION_MS};
use crate::source_output::{spawn_silence_producer, SourceOutput};

/// A registered audio source: a capture device, or the monitor source of a
/// sink.
#[derive(Debug, Clone)]
pub struct SourceInfo {
    pub name: String,
    pub description: String,
    pub sample_spec: SampleSpec,
    pub channel_map: ChannelMap,
    /// Name of the sink this is the monitor of, if any. Sources that are a
    /// monitor-of-sink are excluded from `/listen`'s source listing.
    pub monitor_of: Option<String>,
    /// When true, the core refuses to create a subscription against this
    /// source, answered as a 403.
    pub suspended: bool,
}

/// A registered audio sink. `/listen` links to the sink via its monitor
/// source's name, not the sink's own name.
#[derive(Debug, Clone)]
pub struct SinkInfo {
    pub name: String,
    pub description: String,
    pub sample_spec: SampleSpec,
    pub channel_map: ChannelMap,
    pub monitor_source_name: String,
}

/// A process-wide registry of shared singletons keyed by name. The protocol
/// singleton registers itself here under `"http-protocol"`.
#[derive(Default)]
pub struct SharedRegistry {
    entries: DashMap<String, Arc<dyn Any + Send + Sync>>,
}

impl SharedRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get<T: Send + Sync + 'static>(&self, key: &str) -> Option<Arc<T>> {
        self.entries.get(key)?.clone().downcast::<T>().ok()
    }

    pub fn set<T: Send + Sync + 'static>(&self, key: &str, value: Arc<T>) {
        self.entries.insert(key.to_string(), value);
    }

    pub fn remove(&self, key: &str) {
        self.entries.remove(key);
    }
}

/// The in-memory audio core: device registries plus the shared-object
/// registry the protocol singleton lives in.
pub struct AudioCore {
    pub sources: DashMap<String, SourceInfo>,
    pub sinks: DashMap<String, SinkInfo>,
    pub registry: SharedRegistry,
    pub user_name: String,
    pub host_name: String,
    pub machine_id: String,
    pub system_info: String,
}

impl AudioCore {
    pub fn new(user_name: String, host_name: String, machine_id: String, system_info: String) -> Self {
        AudioCore {
            sources: DashMap::new(),
            sinks: DashMap::new(),
            registry: SharedRegistry::new(),
            user_name,
            host_name,
            machine_id,
            system_info,
        }
    }

    pub fn add_source(&self, info: SourceInfo) {
        self.sources.insert(info.name.clone(), info);
    }

    pub fn add_sink(&self, info: SinkInfo) {
        self.sinks.insert(info.name.clone(), info);
    }

    /// Process-wide status dump for `/status`. A full audio engine would
    /// render a much larger report (modules, clients, per-device state);
    /// this is a proportionate stand-in, not a reimplementation of it.
    pub fn status_report(&self, live_connections: usize) -> String {
        format!(
            "{} status report\n\
             sources: {}\n\
             sinks: {}\n\
             live HTTP connections: {}\n",
            crate::protocol_constants::APP_NAME,
            self.sources.len(),
            self.sinks.len(),
            live_connections,
        )
    }

    /// Looks up `source_name`, coerces its spec, and creates a subscription
    /// with its own synthetic audio-producer task.
    pub fn create_source_output(&self, source_name: &str) -> Result<SourceOutput, CoreError> {
        let info = self.sources.get(source_name).ok_or(CoreError::NoSuchSource)?;
        if info.suspended {
            return Err(CoreError::SourceSuspended);
        }

        let mut spec = info.sample_spec.clone();
        let mut map = info.channel_map.clone();
        crate::format::coerce(&mut spec, &mut map);

        let frame_size = spec.frame_size();
        let (handle, rx) = spawn_silence_producer(spec.clone(), frame_size, SILENCE_FRAME_DURATION_MS);
        Ok(SourceOutput::new(spec, map, handle, rx, DEFAULT_SOURCE_LATENCY_MS))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::format::SampleFormat;

    fn spec() -> SampleSpec {
        SampleSpec { format: SampleFormat::S16LE, rate: 44100, channels: 1 }
    }

    #[test]
    fn shared_registry_roundtrips_by_key() {
        let registry = SharedRegistry::new();
        registry.set("k", Arc::new(42u32));
        assert_eq!(*registry.get::<u32>("k").unwrap(), 42);
        assert!(registry.get::<u64>("k").is_none());

        registry.remove("k");
        assert!(registry.get::<u32>("k").is_none());
    }

    #[tokio::test]
    async fn create_source_output_fails_for_unknown_source() {
        let core = AudioCore::new("u".into(), "h".into(), "m".into(), "s".into());
        assert!(matches!(core.create_source_output("nope"), Err(CoreError::NoSuchSource)));
    }

    #[tokio::test]
    async fn create_source_output_fails_for_suspended_source() {
        let core = AudioCore::new("u".into(), "h".into(), "m".into(), "s".into());
        core.add_source(SourceInfo {
            name: "mic".into(),
            description: "Mic".into(),
            sample_spec: spec(),
            channel_map: ChannelMap::default_for(1),
            monitor_of: None,
            suspended: true,
        });
        assert!(matches!(core.create_source_output("mic"), Err(CoreError::SourceSuspended)));
    }

    #[tokio::test]
    async fn create_source_output_coerces_the_spec() {
        let core = AudioCore::new("u".into(), "h".into(), "m".into(), "s".into());
        core.add_source(SourceInfo {
            name: "mic".into(),
            description: "Mic".into(),
            sample_spec: spec(),
            channel_map: ChannelMap::default_for(1),
            monitor_of: None,
            suspended: false,
        });
        let output = core.create_source_output("mic").unwrap();
        assert_eq!(output.sample_spec().format, SampleFormat::S16BE);
    }
}
