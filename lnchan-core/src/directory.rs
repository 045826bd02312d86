use core::fmt;
use std::collections::{HashMap, HashSet};
use std::sync::{Mutex, PoisonError};

use async_trait::async_trait;
use log::*;

use crate::model::NodeId;

/// Peers we are, or can get, connected to.
///
/// Calls may involve network I/O, and should not be made from the task that
/// drains channel events.
#[async_trait]
pub trait PeerDirectory: Send + Sync {
    /// A known network address for the node, if any
    async fn lookup_address(&self, node_id: &NodeId) -> Option<(String, u16)>;

    /// The nodes we currently have a connection with
    async fn connected_peers(&self) -> HashSet<NodeId>;

    /// Connect to a peer.  Failures are reported as a message for the operator.
    async fn add_peer(&self, host: &str, port: u16, node_id: &NodeId) -> Result<(), String>;

    /// A node worth opening a channel with, to pre-fill an open-channel dialog
    async fn suggest_peer(&self) -> Option<NodeId> {
        None
    }
}

/// Our own node, and the gossip view of the network
#[async_trait]
pub trait NodeDirectory: Send + Sync {
    /// Our node id, shown to the operator alongside the open-channel input
    async fn local_node_id(&self) -> Option<NodeId>;

    /// Number of nodes known from gossip
    async fn node_count(&self) -> usize;

    /// Number of channels known from gossip
    async fn channel_count(&self) -> usize;
}

/// Counts shown in the status line
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct StatusSummary {
    /// Connected peers
    pub peer_count: usize,
    /// Nodes in the gossip view
    pub node_count: usize,
    /// Channels in the gossip view
    pub channel_count: usize,
}

impl fmt::Display for StatusSummary {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} peers, {} nodes, {} channels",
            self.peer_count, self.node_count, self.channel_count
        )
    }
}

/// An in-memory directory, e.g. loaded from a config file.
///
/// `add_peer` doesn't connect anywhere, it just records the peer as connected.
#[derive(Debug, Default)]
pub struct StaticDirectory {
    addresses: HashMap<NodeId, (String, u16)>,
    connected: Mutex<HashSet<NodeId>>,
    local_node_id: Option<NodeId>,
    suggestion: Option<NodeId>,
    node_count: usize,
    channel_count: usize,
}

impl StaticDirectory {
    /// An empty directory
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a known address for a node
    pub fn with_address(mut self, node_id: NodeId, host: impl Into<String>, port: u16) -> Self {
        self.addresses.insert(node_id, (host.into(), port));
        self
    }

    /// Mark a node as already connected
    pub fn with_connected(mut self, node_id: NodeId) -> Self {
        self.connected.get_mut().unwrap_or_else(PoisonError::into_inner).insert(node_id);
        self
    }

    /// Set our own node id
    pub fn with_local_node_id(mut self, node_id: NodeId) -> Self {
        self.local_node_id = Some(node_id);
        self
    }

    /// Set the peer to suggest
    pub fn with_suggestion(mut self, node_id: NodeId) -> Self {
        self.suggestion = Some(node_id);
        self
    }

    /// Set the gossip counts
    pub fn with_gossip_counts(mut self, node_count: usize, channel_count: usize) -> Self {
        self.node_count = node_count;
        self.channel_count = channel_count;
        self
    }

    /// Number of nodes with a known address
    pub fn address_count(&self) -> usize {
        self.addresses.len()
    }
}

#[async_trait]
impl PeerDirectory for StaticDirectory {
    async fn lookup_address(&self, node_id: &NodeId) -> Option<(String, u16)> {
        self.addresses.get(node_id).cloned()
    }

    async fn connected_peers(&self) -> HashSet<NodeId> {
        self.connected.lock().unwrap_or_else(PoisonError::into_inner).clone()
    }

    async fn add_peer(&self, host: &str, port: u16, node_id: &NodeId) -> Result<(), String> {
        info!("recording peer {} at {}:{} as connected", node_id, host, port);
        self.connected.lock().unwrap_or_else(PoisonError::into_inner).insert(*node_id);
        Ok(())
    }

    async fn suggest_peer(&self) -> Option<NodeId> {
        self.suggestion
    }
}

#[async_trait]
impl NodeDirectory for StaticDirectory {
    async fn local_node_id(&self) -> Option<NodeId> {
        self.local_node_id
    }

    async fn node_count(&self) -> usize {
        self.node_count
    }

    async fn channel_count(&self) -> usize {
        self.channel_count
    }
}
