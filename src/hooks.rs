//! Node hooks
//!
//! Hooks are extension points keyed by element local name. A hook is either a
//! pure [`NodeInspector`] or a [`NetworkInspector`] that gets an HTTP client.
//! Both kinds live in a caller-owned [`HookRegistry`]; a validator holds one and
//! reuses it across validation calls.

use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;

use async_trait::async_trait;
use parking_lot::RwLock;
use reqwest::Client;

use crate::error::HookError;
use crate::parser::Node;
use crate::probe::MediaFileProbe;
use crate::result::NodeAnalysisResult;
use crate::version::Version;

/// What a hook gets to see of a node.
#[derive(Debug, Clone, Copy)]
pub struct NodeContext<'a> {
    node: &'a Node,
    version: &'a Version,
}

impl<'a> NodeContext<'a> {
    pub fn new(node: &'a Node, version: &'a Version) -> Self {
        Self { node, version }
    }

    pub fn name(&self) -> &'a str {
        self.node.local_name()
    }

    /// Trimmed character data of the node.
    pub fn text(&self) -> &'a str {
        self.node.text.trim()
    }

    /// Attribute value by name; the last occurrence wins.
    pub fn attribute(&self, name: &str) -> Option<&'a str> {
        self.node.attribute(name)
    }

    /// Version declared by the document.
    pub fn version(&self) -> &'a Version {
        self.version
    }

    pub fn node(&self) -> &'a Node {
        self.node
    }
}

/// Synchronous, side-effect free node check.
///
/// Returning `None` contributes nothing. A result with an empty category lands
/// in the custom bucket.
pub trait NodeInspector: Send + Sync {
    fn inspect(&self, ctx: &NodeContext<'_>) -> Option<NodeAnalysisResult>;
}

impl<F> NodeInspector for F
where
    F: Fn(&NodeContext<'_>) -> Option<NodeAnalysisResult> + Send + Sync,
{
    fn inspect(&self, ctx: &NodeContext<'_>) -> Option<NodeAnalysisResult> {
        self(ctx)
    }
}

/// Node check that may perform network I/O.
///
/// The engine bounds every call with the configured timeout. An `Err` becomes
/// a failed custom-bucket result on that node only.
#[async_trait]
pub trait NetworkInspector: Send + Sync {
    async fn inspect(
        &self,
        ctx: &NodeContext<'_>,
        client: &Client,
    ) -> Result<Option<NodeAnalysisResult>, HookError>;
}

/// A registered hook of either kind.
#[derive(Clone)]
pub enum Hook {
    Sync(Arc<dyn NodeInspector>),
    Network(Arc<dyn NetworkInspector>),
}

impl Hook {
    pub fn sync(inspector: impl NodeInspector + 'static) -> Self {
        Hook::Sync(Arc::new(inspector))
    }

    pub fn network(inspector: impl NetworkInspector + 'static) -> Self {
        Hook::Network(Arc::new(inspector))
    }
}

impl fmt::Debug for Hook {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Hook::Sync(_) => f.write_str("Hook::Sync"),
            Hook::Network(_) => f.write_str("Hook::Network"),
        }
    }
}

type SyncHooks = HashMap<String, Vec<Arc<dyn NodeInspector>>>;
type NetworkHooks = HashMap<String, Vec<Arc<dyn NetworkInspector>>>;

/// Name-keyed hook collections, safe to share between threads.
///
/// Keys are matched case-insensitively. Lookups hand out a snapshot so
/// registrations made during a validation pass never affect it.
#[derive(Default)]
pub struct HookRegistry {
    sync: RwLock<SyncHooks>,
    network: RwLock<NetworkHooks>,
}

impl HookRegistry {
    /// An empty registry.
    pub fn new() -> Self {
        Self::default()
    }

    /// A registry with the built-in media-file asset probe.
    pub fn with_builtins() -> Self {
        let registry = Self::new();
        registry.register_builtins();
        registry
    }

    pub fn register_builtins(&self) {
        self.register_network("MediaFile", MediaFileProbe);
    }

    /// Register `hook` for `node_name`. `None` is ignored.
    pub fn register(&self, node_name: &str, hook: impl Into<Option<Hook>>) {
        match hook.into() {
            Some(Hook::Sync(inspector)) => {
                self.sync
                    .write()
                    .entry(registry_key(node_name))
                    .or_default()
                    .push(inspector);
            }
            Some(Hook::Network(inspector)) => {
                self.network
                    .write()
                    .entry(registry_key(node_name))
                    .or_default()
                    .push(inspector);
            }
            None => {}
        }
    }

    pub fn register_sync(&self, node_name: &str, inspector: impl NodeInspector + 'static) {
        self.register(node_name, Hook::sync(inspector));
    }

    pub fn register_network(&self, node_name: &str, inspector: impl NetworkInspector + 'static) {
        self.register(node_name, Hook::network(inspector));
    }

    /// Snapshot of the synchronous hooks for `node_name`, in registration order.
    pub fn sync_hooks(&self, node_name: &str) -> Vec<Arc<dyn NodeInspector>> {
        self.sync
            .read()
            .get(&registry_key(node_name))
            .cloned()
            .unwrap_or_default()
    }

    /// Snapshot of the network hooks for `node_name`, in registration order.
    pub fn network_hooks(&self, node_name: &str) -> Vec<Arc<dyn NetworkInspector>> {
        self.network
            .read()
            .get(&registry_key(node_name))
            .cloned()
            .unwrap_or_default()
    }

    /// Total number of registered hooks of both kinds.
    pub fn len(&self) -> usize {
        let sync: usize = self.sync.read().values().map(Vec::len).sum();
        let network: usize = self.network.read().values().map(Vec::len).sum();
        sync + network
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Drop every registered hook, built-ins included.
    pub fn clear(&self) {
        self.sync.write().clear();
        self.network.write().clear();
    }
}

impl fmt::Debug for HookRegistry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let sync: Vec<String> = self.sync.read().keys().cloned().collect();
        let network: Vec<String> = self.network.read().keys().cloned().collect();
        f.debug_struct("HookRegistry")
            .field("sync", &sync)
            .field("network", &network)
            .finish()
    }
}

fn registry_key(node_name: &str) -> String {
    node_name.to_lowercase()
}
