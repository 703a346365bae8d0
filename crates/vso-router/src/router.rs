//! The Capability Router: a dynamic `capability -> providers` map rebuilt
//! from live `tools/list` calls and published via `arc-swap`, so a
//! `resolve` never observes a partially rebuilt map — it sees either the
//! complete old map or the complete new one.

use std::collections::{HashMap, HashSet};
use std::sync::Arc;
use std::time::Duration;

use arc_swap::ArcSwap;
use serde_json::Value;
use tokio::sync::Mutex;
use tokio_util::sync::CancellationToken;

use vso_core::event_log::{emit_event_best_effort, EventFields};
use vso_core::ids::{Capability, ServerId};
use vso_supervisor::{LifecycleEvent, ServerStatus, Supervisor};

use crate::error::RouterError;
use crate::mapper::{parse_tool_descriptors, CapabilityMapper};
use crate::provider::{CapabilityEntry, Provider};

/// Bounded per-server deadline for a `tools/list` call during refresh.
const LIST_TOOLS_TIMEOUT: Duration = Duration::from_secs(5);

struct KnownEntries {
    by_capability: HashMap<Capability, Vec<Provider>>,
    /// Consecutive refresh cycles in which `list_tools` failed. A server
    /// retains its previously known entries for one refresh cycle, then is
    /// removed from the rebuilt map.
    misses: u32,
}

pub struct Router {
    map: ArcSwap<HashMap<Capability, Vec<Provider>>>,
    known: Mutex<HashMap<ServerId, KnownEntries>>,
    running: ArcSwap<HashSet<ServerId>>,
    supervisor: Supervisor,
    mapper: Arc<dyn CapabilityMapper>,
}

impl Router {
    pub fn new(supervisor: Supervisor, mapper: Arc<dyn CapabilityMapper>) -> Arc<Self> {
        Arc::new(Self {
            map: ArcSwap::from_pointee(HashMap::new()),
            known: Mutex::new(HashMap::new()),
            running: ArcSwap::from_pointee(HashSet::new()),
            supervisor,
            mapper,
        })
    }

    /// Spawn the periodic-refresh + lifecycle-subscription task. Call once.
    pub fn start(self: &Arc<Self>, refresh_interval: Duration, cancel: CancellationToken) {
        let router = self.clone();
        let mut events = self.supervisor.subscribe();
        tokio::spawn(async move {
            // Seed an initial snapshot so early resolves aren't starved.
            router.refresh().await;
            loop {
                tokio::select! {
                    _ = cancel.cancelled() => break,
                    _ = tokio::time::sleep(refresh_interval) => {
                        router.refresh().await;
                    }
                    event = events.recv() => {
                        match event {
                            Ok(LifecycleEvent::ServerStarted { id, .. }) => {
                                router.refresh_one(id).await;
                            }
                            Ok(LifecycleEvent::ServerStopped { id, .. })
                            | Ok(LifecycleEvent::ServerFailed { id, .. }) => {
                                router.remove_server(id).await;
                            }
                            Err(tokio::sync::broadcast::error::RecvError::Lagged(_)) => {
                                router.refresh().await;
                            }
                            Err(tokio::sync::broadcast::error::RecvError::Closed) => break,
                        }
                    }
                }
            }
        });
    }

    /// `list() -> [capability, providers]`.
    pub fn list(&self) -> Vec<CapabilityEntry> {
        self.map
            .load()
            .iter()
            .map(|(capability, providers)| CapabilityEntry {
                capability: capability.clone(),
                providers: providers.clone(),
            })
            .collect()
    }

    pub fn capability_names(&self) -> Vec<Capability> {
        self.map.load().keys().cloned().collect()
    }

    /// `resolve(capability) -> (serverID, toolName) | NotFound`.
    pub fn resolve(&self, capability: &Capability) -> Option<(ServerId, String)> {
        let running = self.running.load();
        self.map
            .load()
            .get(capability)
            .and_then(|providers| providers.iter().find(|p| running.contains(&p.server_id)))
            .map(|p| (p.server_id, p.tool_name.clone()))
    }

    /// `execute(capability, args, timeout) -> result | error`.
    pub async fn execute(
        &self,
        capability: &Capability,
        args: Value,
        timeout: Duration,
    ) -> Result<Value, RouterError> {
        let Some((server_id, tool_name)) = self.resolve(capability) else {
            return Err(RouterError::NoProvider(capability.clone()));
        };
        let Some(rpc) = self.supervisor.rpc_client(server_id).await else {
            return Err(RouterError::NoProvider(capability.clone()));
        };
        let result = rpc
            .call(
                "tools/call",
                Some(serde_json::json!({ "name": tool_name, "arguments": args })),
                timeout,
            )
            .await?;
        Ok(result)
    }

    /// Full rebuild from the supervisor's current `running` set.
    pub async fn refresh(&self) {
        let records = self.supervisor.list().await;
        let running_ids: HashSet<ServerId> = records
            .iter()
            .filter(|r| r.status == ServerStatus::Running)
            .map(|r| r.id)
            .collect();

        {
            let mut known = self.known.lock().await;
            known.retain(|id, _| running_ids.contains(id));
        }

        for id in &running_ids {
            self.fetch_and_record(*id).await;
        }

        self.running.store(Arc::new(running_ids));
        self.rebuild_published_map().await;
    }

    /// Additive refresh for one newly started server.
    async fn refresh_one(&self, id: ServerId) {
        {
            let mut running = (*self.running.load_full()).clone();
            running.insert(id);
            self.running.store(Arc::new(running));
        }
        self.fetch_and_record(id).await;
        self.rebuild_published_map().await;
    }

    async fn remove_server(&self, id: ServerId) {
        {
            let mut running = (*self.running.load_full()).clone();
            running.remove(&id);
            self.running.store(Arc::new(running));
        }
        self.known.lock().await.remove(&id);
        self.rebuild_published_map().await;
    }

    async fn fetch_and_record(&self, id: ServerId) {
        let Some(rpc) = self.supervisor.rpc_client(id).await else {
            return;
        };

        match rpc.call("tools/list", None, LIST_TOOLS_TIMEOUT).await {
            Ok(result) => {
                let mut by_capability: HashMap<Capability, Vec<Provider>> = HashMap::new();
                for tool in parse_tool_descriptors(&result) {
                    for (capability, score) in self.mapper.map(&tool) {
                        by_capability.entry(capability).or_default().push(Provider {
                            server_id: id,
                            tool_name: tool.name.clone(),
                            score,
                        });
                    }
                }
                emit_event_best_effort(EventFields {
                    level: "info",
                    source: "vso-router",
                    action: "capability_registered",
                    server_id: Some(id.to_string()),
                    result: Some(format!("{} capabilities", by_capability.len())),
                    ..Default::default()
                });
                self.known.lock().await.insert(
                    id,
                    KnownEntries {
                        by_capability,
                        misses: 0,
                    },
                );
            }
            Err(e) => {
                tracing::warn!(?id, "tools/list failed during refresh: {e}");
                let mut known = self.known.lock().await;
                match known.get_mut(&id) {
                    Some(entry) if entry.misses == 0 => entry.misses = 1,
                    Some(_) => {
                        known.remove(&id);
                    }
                    None => {}
                }
            }
        }
    }

    async fn rebuild_published_map(&self) {
        let known = self.known.lock().await;
        let mut map: HashMap<Capability, Vec<Provider>> = HashMap::new();
        for entry in known.values() {
            for (capability, providers) in &entry.by_capability {
                map.entry(capability.clone())
                    .or_default()
                    .extend(providers.iter().cloned());
            }
        }
        self.map.store(Arc::new(map));
    }
}
