//! In-memory remote binding used by the tree tests.
//!
//! `FakeServers` models a flat collection of "server" entities with call
//! counters on every remote operation, so tests can assert how often the
//! framework actually went to the control plane.

use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, AtomicU64, AtomicUsize, Ordering};
use std::sync::{Mutex, PoisonError};
use std::time::Duration;

use async_trait::async_trait;

use crate::error::{RemoteError, Result};
use crate::remote::{DraftConfig, RemoteBinding};
use crate::status::Status;
use crate::tree::{RESOURCE_GROUP_PLACEHOLDER, ResourceId};

/// Resource group used by all fixtures.
pub(crate) const TEST_GROUP: &str = "rg-test";

/// Root id for test modules, group not yet scoped.
pub(crate) fn test_parent() -> String {
    format!("/subscriptions/s1/resourceGroups/{RESOURCE_GROUP_PLACEHOLDER}")
}

/// Initializes test logging; safe to call from every test.
pub(crate) fn init_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .with_test_writer()
        .try_init();
}

/// Snapshot of one fake server.
#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) struct ServerSnapshot {
    pub name: String,
    pub group: String,
    pub state: String,
    pub capacity: u32,
}

/// Draft config for fake servers.
#[derive(Debug, Clone, Default)]
pub(crate) struct ServerConfig {
    pub capacity: Option<u32>,
    pub state: Option<String>,
}

impl DraftConfig<ServerSnapshot> for ServerConfig {
    fn is_set(&self) -> bool {
        self.capacity.is_some() || self.state.is_some()
    }

    fn differs_from(&self, current: &ServerSnapshot) -> bool {
        self.capacity.is_some_and(|capacity| capacity != current.capacity)
            || self.state.as_ref().is_some_and(|state| *state != current.state)
    }
}

/// In-memory control plane for server entities.
#[derive(Debug, Default)]
pub(crate) struct FakeServers {
    servers: Mutex<HashMap<String, ServerSnapshot>>,
    pub list_calls: AtomicUsize,
    pub get_calls: AtomicUsize,
    pub create_calls: AtomicUsize,
    pub update_calls: AtomicUsize,
    pub delete_calls: AtomicUsize,
    /// When set, the next remote call fails with a transport error.
    pub fail_next: AtomicBool,
    /// Artificial latency for `get_remote`, for racing tests.
    pub fetch_delay_ms: AtomicU64,
}

impl FakeServers {
    /// Creates a control plane pre-seeded with running servers.
    pub fn with_servers(names: &[&str]) -> Self {
        let fake = Self::default();
        for name in names {
            fake.seed(name, "running");
        }
        fake
    }

    /// Adds or replaces a server on the remote side.
    pub fn seed(&self, name: &str, state: &str) {
        self.servers_mut().insert(
            name.to_string(),
            ServerSnapshot {
                name: name.to_string(),
                group: TEST_GROUP.to_string(),
                state: state.to_string(),
                capacity: 1,
            },
        );
    }

    /// Removes a server from the remote side.
    pub fn remove_server(&self, name: &str) {
        self.servers_mut().remove(name);
    }

    fn servers_mut(&self) -> std::sync::MutexGuard<'_, HashMap<String, ServerSnapshot>> {
        self.servers.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn check_failure(&self) -> Result<()> {
        if self.fail_next.swap(false, Ordering::SeqCst) {
            Err(RemoteError::transport("injected failure").into())
        } else {
            Ok(())
        }
    }
}

#[async_trait]
impl RemoteBinding for FakeServers {
    type Snapshot = ServerSnapshot;
    type Config = ServerConfig;

    async fn list_remote(&self) -> Result<Vec<ServerSnapshot>> {
        self.list_calls.fetch_add(1, Ordering::SeqCst);
        self.check_failure()?;
        Ok(self.servers_mut().values().cloned().collect())
    }

    async fn get_remote(&self, id: &ResourceId) -> Result<Option<ServerSnapshot>> {
        self.get_calls.fetch_add(1, Ordering::SeqCst);
        let delay = self.fetch_delay_ms.load(Ordering::SeqCst);
        if delay > 0 {
            tokio::time::sleep(Duration::from_millis(delay)).await;
        }
        self.check_failure()?;
        Ok(self.servers_mut().get(id.leaf()).cloned())
    }

    async fn create_remote(
        &self,
        name: &str,
        resource_group: &str,
        config: &ServerConfig,
    ) -> Result<ServerSnapshot> {
        self.create_calls.fetch_add(1, Ordering::SeqCst);
        self.check_failure()?;
        let snapshot = ServerSnapshot {
            name: name.to_string(),
            group: resource_group.to_string(),
            state: config.state.clone().unwrap_or_else(|| "running".to_string()),
            capacity: config.capacity.unwrap_or(1),
        };
        self.servers_mut().insert(name.to_string(), snapshot.clone());
        Ok(snapshot)
    }

    async fn update_remote(
        &self,
        existing: &ServerSnapshot,
        config: &ServerConfig,
    ) -> Result<ServerSnapshot> {
        self.update_calls.fetch_add(1, Ordering::SeqCst);
        self.check_failure()?;
        let mut snapshot = existing.clone();
        if let Some(capacity) = config.capacity {
            snapshot.capacity = capacity;
        }
        if let Some(state) = &config.state {
            snapshot.state.clone_from(state);
        }
        self.servers_mut().insert(snapshot.name.clone(), snapshot.clone());
        Ok(snapshot)
    }

    async fn delete_remote(&self, id: &ResourceId) -> Result<()> {
        self.delete_calls.fetch_add(1, Ordering::SeqCst);
        self.check_failure()?;
        self.servers_mut().remove(id.leaf());
        Ok(())
    }

    fn name_of(&self, snapshot: &ServerSnapshot) -> String {
        snapshot.name.clone()
    }

    fn group_of(&self, snapshot: &ServerSnapshot) -> String {
        snapshot.group.clone()
    }

    fn status_of(&self, snapshot: &ServerSnapshot) -> Status {
        match snapshot.state.as_str() {
            "running" => Status::Running,
            "stopped" => Status::Stopped,
            _ => Status::Unknown,
        }
    }
}
