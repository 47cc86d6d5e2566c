//! Protocol singleton: a refcounted handle registered under
//! `"http-protocol"` in the core's shared registry, owning the set of live
//! connections and enforcing the process-wide admission cap.

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use dashmap::DashMap;
use log::warn;
use tokio::net::TcpStream;
use tokio::task::AbortHandle;
use uuid::Uuid;

use crate::connection;
use crate::core::AudioCore;
use crate::protocol_constants::PROTOCOL_REGISTRY_KEY;

struct ConnectionEntry {
    module: String,
    abort: AbortHandle,
}

struct ProtocolInner {
    core: Arc<AudioCore>,
    refcount: AtomicUsize,
    connections: DashMap<Uuid, ConnectionEntry>,
    pid: u32,
    server_token: String,
    max_connections: usize,
}

/// A reference to the protocol singleton. Cloning via [`HttpProtocol::add_ref`]
/// bumps the shared refcount explicitly (as opposed to `Clone`, which would
/// silently share the `Arc` without the accounting the public refcount
/// contract requires); dropping a handle does **not** release its
/// reference — callers must call [`unref`](Self::unref) exactly once per
/// handle obtained.
pub struct HttpProtocol {
    inner: Arc<ProtocolInner>,
}

impl HttpProtocol {
    /// `protocol_get(core)`: returns an existing handle found in the core's
    /// shared registry under `"http-protocol"` with an extra reference, or
    /// lazily constructs and registers one. `max_connections` only takes
    /// effect on first construction; later callers inherit whatever cap the
    /// singleton was created with.
    pub fn get(core: Arc<AudioCore>, pid: u32, server_token: String, max_connections: usize) -> Self {
        if let Some(inner) = core.registry.get::<ProtocolInner>(PROTOCOL_REGISTRY_KEY) {
            inner.refcount.fetch_add(1, Ordering::SeqCst);
            return HttpProtocol { inner };
        }

        let inner = Arc::new(ProtocolInner {
            core: core.clone(),
            refcount: AtomicUsize::new(1),
            connections: DashMap::new(),
            pid,
            server_token,
            max_connections,
        });
        core.registry.set(PROTOCOL_REGISTRY_KEY, inner.clone());
        HttpProtocol { inner }
    }

    /// `protocol_ref(handle)`: an additional reference to the same handle.
    pub fn add_ref(&self) -> Self {
        self.inner.refcount.fetch_add(1, Ordering::SeqCst);
        HttpProtocol { inner: self.inner.clone() }
    }

    /// `protocol_unref(handle)`: releases one reference. On the final
    /// release, unlinks every remaining connection, frees the connection
    /// set, and removes the registry entry.
    pub fn unref(self) {
        if self.inner.refcount.fetch_sub(1, Ordering::SeqCst) == 1 {
            for entry in self.inner.connections.iter() {
                entry.value().abort.abort();
            }
            self.inner.connections.clear();
            self.inner.core.registry.remove(PROTOCOL_REGISTRY_KEY);
        }
    }

    /// `protocol_connect(handle, iochannel, module)`: admits one incoming
    /// TCP connection. Above `MAX_CONNECTIONS`, the socket is released with
    /// no HTTP reply and a warning is logged.
    pub fn connect(&self, stream: TcpStream, peer: String, module: String) {
        let max = self.inner.max_connections;
        if self.inner.connections.len() + 1 > max {
            warn!("Too many connections ({max}), dropping incoming connection from {peer}");
            drop(stream);
            return;
        }

        let id = Uuid::new_v4();
        let inner = self.inner.clone();
        let core = self.inner.core.clone();
        let pid = self.inner.pid;
        let server_token = self.inner.server_token.clone();

        let join = tokio::spawn(async move {
            let live = inner.connections.len();
            connection::serve(core, stream, pid, live, server_token).await;
            inner.connections.remove(&id);
        });

        self.inner.connections.insert(id, ConnectionEntry { module, abort: join.abort_handle() });
    }

    /// `protocol_disconnect(handle, module)`: unlinks every connection whose
    /// owning module equals `module` — how an unloading module revokes all
    /// of its active HTTP sessions.
    pub fn disconnect(&self, module: &str) {
        let dead: Vec<Uuid> = self
            .inner
            .connections
            .iter()
            .filter(|entry| entry.value().module == module)
            .map(|entry| *entry.key())
            .collect();

        for id in dead {
            if let Some((_, entry)) = self.inner.connections.remove(&id) {
                entry.abort.abort();
            }
        }
    }

    pub fn live_connections(&self) -> usize {
        self.inner.connections.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const CAP: usize = 10;

    fn core() -> Arc<AudioCore> {
        Arc::new(AudioCore::new("u".into(), "h".into(), "m".into(), "s".into()))
    }

    #[tokio::test]
    async fn get_twice_returns_the_same_singleton() {
        let core = core();
        let a = HttpProtocol::get(core.clone(), 1, "t".into(), CAP);
        let b = HttpProtocol::get(core.clone(), 1, "t".into(), CAP);
        assert!(Arc::ptr_eq(&a.inner, &b.inner));
        a.unref();
        b.unref();
    }

    #[tokio::test]
    async fn unref_to_zero_removes_the_registry_entry() {
        let core = core();
        let handle = HttpProtocol::get(core.clone(), 1, "t".into(), CAP);
        handle.unref();
        assert!(core.registry.get::<ProtocolInner>(PROTOCOL_REGISTRY_KEY).is_none());
    }

    #[tokio::test]
    async fn eleventh_connection_is_dropped_without_admission() {
        let core = core();
        let handle = HttpProtocol::get(core.clone(), 1, "t".into(), CAP);

        for _ in 0..CAP {
            let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
            let addr = listener.local_addr().unwrap();
            let client = TcpStream::connect(addr).await.unwrap();
            let (server, _) = listener.accept().await.unwrap();
            drop(client);
            handle.connect(server, "peer".into(), "test-module".into());
        }
        assert_eq!(handle.live_connections(), CAP);

        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        let client = TcpStream::connect(addr).await.unwrap();
        let (server, _) = listener.accept().await.unwrap();
        handle.connect(server, "peer".into(), "test-module".into());

        assert_eq!(handle.live_connections(), CAP);
        drop(client);
        handle.unref();
    }

    #[tokio::test]
    async fn disconnect_unlinks_only_matching_module() {
        let core = core();
        let handle = HttpProtocol::get(core.clone(), 1, "t".into(), CAP);

        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        let _client_a = TcpStream::connect(addr).await.unwrap();
        let (server_a, _) = listener.accept().await.unwrap();
        handle.connect(server_a, "a".into(), "module-a".into());

        let _client_b = TcpStream::connect(addr).await.unwrap();
        let (server_b, _) = listener.accept().await.unwrap();
        handle.connect(server_b, "b".into(), "module-b".into());

        handle.disconnect("module-a");
        assert_eq!(handle.live_connections(), 1);
        handle.unref();
    }
}
