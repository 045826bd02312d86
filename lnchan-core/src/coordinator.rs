use core::fmt;
use std::sync::Arc;

use log::*;

use crate::backend::ChannelBackend;
use crate::directory::{NodeDirectory, PeerDirectory, StatusSummary};
use crate::error::{ChannelOpenError, ForceCloseError};
use crate::model::{ChannelId, NodeId};
use crate::resolver::ConnectionResolver;

/// Funding amount an open-channel dialog starts with
pub const DEFAULT_LOCAL_AMOUNT_SAT: u64 = 200_000;
/// Push amount an open-channel dialog starts with
pub const DEFAULT_PUSH_AMOUNT_SAT: u64 = 0;

/// A fully resolved network address for a peer
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ConnectionTarget {
    /// The peer
    pub node_id: NodeId,
    /// Host name or IP address
    pub host: String,
    /// TCP port
    pub port: u16,
}

impl fmt::Display for ConnectionTarget {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}@{}:{}", self.node_id, self.host, self.port)
    }
}

/// How to reach the peer named by operator input
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum ResolvedPeer {
    /// We already have a connection, no address needed
    AlreadyConnected(NodeId),
    /// We need to connect here first
    Connect(ConnectionTarget),
}

impl ResolvedPeer {
    /// The peer
    pub fn node_id(&self) -> &NodeId {
        match self {
            ResolvedPeer::AlreadyConnected(node_id) => node_id,
            ResolvedPeer::Connect(target) => &target.node_id,
        }
    }
}

/// A successful channel-open request
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct OpenResult {
    /// The peer the channel is being opened with
    pub node_id: NodeId,
    /// What the backend had to say
    pub message: String,
}

// Progress of one channel-open attempt, for logging
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
enum OpenState {
    Parsing,
    ResolvingAddress,
    Connecting,
    Opening,
    Done,
    Failed,
}

struct OpenAttempt {
    node_id: Option<NodeId>,
    state: OpenState,
}

impl OpenAttempt {
    fn new() -> Self {
        OpenAttempt { node_id: None, state: OpenState::Parsing }
    }

    fn log_prefix(&self) -> String {
        match self.node_id {
            Some(node_id) => format!("open {}", node_id),
            None => "open".to_string(),
        }
    }

    fn advance(&mut self, state: OpenState) {
        debug!("{}: {:?} -> {:?}", self.log_prefix(), self.state, state);
        self.state = state;
    }

    fn fail(&mut self, e: ChannelOpenError) -> ChannelOpenError {
        warn!("{}: failed in {:?}: {}", self.log_prefix(), self.state, e);
        self.state = OpenState::Failed;
        e
    }
}

/// Carries out an operator's request to open a channel:
/// parse the input, find and connect the peer if needed, then ask the backend.
///
/// Every call ends in exactly one success or one typed error; nothing is
/// retried here, the operator decides whether to try again.
pub struct ChannelOpenCoordinator {
    resolver: ConnectionResolver,
    peers: Arc<dyn PeerDirectory>,
    nodes: Arc<dyn NodeDirectory>,
    backend: Arc<dyn ChannelBackend>,
}

impl ChannelOpenCoordinator {
    /// Create a coordinator
    pub fn new(
        resolver: ConnectionResolver,
        peers: Arc<dyn PeerDirectory>,
        nodes: Arc<dyn NodeDirectory>,
        backend: Arc<dyn ChannelBackend>,
    ) -> Self {
        ChannelOpenCoordinator { resolver, peers, nodes, backend }
    }

    /// Open a channel with the peer named by `input_text`, which may be a
    /// connection string, an invoice or a hex node id.
    ///
    /// Amounts are in satoshi, and are expected to have been checked by the
    /// input widget.
    pub async fn open_channel(
        &self,
        input_text: &str,
        local_amount_sat: u64,
        push_amount_sat: u64,
    ) -> Result<OpenResult, ChannelOpenError> {
        let mut attempt = OpenAttempt::new();
        let result =
            self.do_open_channel(&mut attempt, input_text, local_amount_sat, push_amount_sat).await;
        match result {
            Ok(result) => {
                attempt.advance(OpenState::Done);
                info!("{}: requested: {}", attempt.log_prefix(), result.message);
                Ok(result)
            }
            Err(e) => Err(attempt.fail(e)),
        }
    }

    /// Work out how to reach the peer named by `input_text`, without connecting
    pub async fn resolve_peer(&self, input_text: &str) -> Result<ResolvedPeer, ChannelOpenError> {
        let mut attempt = OpenAttempt::new();
        let result = self.do_resolve_peer(&mut attempt, input_text).await;
        result.map_err(|e| attempt.fail(e))
    }

    /// Unilaterally close a channel
    pub async fn force_close(&self, channel_id: &ChannelId) -> Result<String, ForceCloseError> {
        info!("force-closing channel {}", channel_id);
        self.backend.force_close(channel_id).await.map_err(|msg| {
            error!("force-close of channel {} failed: {}", channel_id, msg);
            ForceCloseError(msg)
        })
    }

    /// Peer, node and channel counts for the status line
    pub async fn status_summary(&self) -> StatusSummary {
        StatusSummary {
            peer_count: self.peers.connected_peers().await.len(),
            node_count: self.nodes.node_count().await,
            channel_count: self.nodes.channel_count().await,
        }
    }

    /// Our own node id, to show next to the open-channel input
    pub async fn local_node_id(&self) -> Option<NodeId> {
        self.nodes.local_node_id().await
    }

    /// A peer to pre-fill the open-channel dialog with
    pub async fn suggest_peer(&self) -> Option<NodeId> {
        self.peers.suggest_peer().await
    }

    async fn do_open_channel(
        &self,
        attempt: &mut OpenAttempt,
        input_text: &str,
        local_amount_sat: u64,
        push_amount_sat: u64,
    ) -> Result<OpenResult, ChannelOpenError> {
        let resolved = self.do_resolve_peer(attempt, input_text).await?;
        if let ResolvedPeer::Connect(target) = &resolved {
            attempt.advance(OpenState::Connecting);
            self.peers
                .add_peer(&target.host, target.port, &target.node_id)
                .await
                .map_err(ChannelOpenError::PeerConnectFailure)?;
        }
        let node_id = *resolved.node_id();
        attempt.advance(OpenState::Opening);
        debug!(
            "{}: local {} sat, push {} sat",
            attempt.log_prefix(),
            local_amount_sat,
            push_amount_sat
        );
        let message = self
            .backend
            .open_channel(&node_id, local_amount_sat, push_amount_sat)
            .await
            .map_err(ChannelOpenError::ChannelOpenFailure)?;
        Ok(OpenResult { node_id, message })
    }

    async fn do_resolve_peer(
        &self,
        attempt: &mut OpenAttempt,
        input_text: &str,
    ) -> Result<ResolvedPeer, ChannelOpenError> {
        let parsed = self.resolver.resolve_input(input_text)?;
        let node_id = parsed.node_id;
        attempt.node_id = Some(node_id);

        if self.peers.connected_peers().await.contains(&node_id) {
            debug!("{}: already connected", attempt.log_prefix());
            return Ok(ResolvedPeer::AlreadyConnected(node_id));
        }

        attempt.advance(OpenState::ResolvingAddress);
        let (host, port) = match parsed.rest {
            Some(rest) => {
                let (host, port) = split_host_port(&rest)?;
                (host.to_string(), parse_port(port)?)
            }
            None => self
                .peers
                .lookup_address(&node_id)
                .await
                .ok_or_else(|| ChannelOpenError::UnknownNode(node_id.to_hex()))?,
        };
        Ok(ResolvedPeer::Connect(ConnectionTarget { node_id, host, port }))
    }
}

fn split_host_port(rest: &str) -> Result<(&str, &str), ChannelOpenError> {
    let mut parts = rest.split(':');
    match (parts.next(), parts.next(), parts.next()) {
        (Some(host), Some(port), None) if !host.is_empty() => Ok((host, port)),
        _ => Err(ChannelOpenError::BadConnectionStringFormat(rest.to_string())),
    }
}

fn parse_port(port: &str) -> Result<u16, ChannelOpenError> {
    port.parse().map_err(|_| ChannelOpenError::BadPort(port.to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::directory::StaticDirectory;
    use crate::util::test_utils::{make_node_id, CountingDirectory, MockBackend};
    use test_log::test;

    const NODE_HEX: &str = "0230f1b1c40e0e6d0d3e1c4f5a6b7c8d9e0f1a2b3c4d5e6f708192a3b4c5d6e7ab";

    fn node() -> NodeId {
        NodeId::from_hex(NODE_HEX).unwrap()
    }

    fn make_coordinator(
        directory: StaticDirectory,
    ) -> (ChannelOpenCoordinator, Arc<CountingDirectory>, Arc<MockBackend>) {
        let directory = Arc::new(CountingDirectory::new(directory));
        let backend = Arc::new(MockBackend::new());
        let coordinator = ChannelOpenCoordinator::new(
            ConnectionResolver::bolt11(),
            directory.clone(),
            directory.clone(),
            backend.clone(),
        );
        (coordinator, directory, backend)
    }

    #[test(tokio::test)]
    async fn connection_string_test() {
        let (coordinator, directory, backend) = make_coordinator(StaticDirectory::new());
        let input = format!("{}@10.0.0.5:9735", NODE_HEX);
        assert_eq!(
            coordinator.resolve_peer(&input).await,
            Ok(ResolvedPeer::Connect(ConnectionTarget {
                node_id: node(),
                host: "10.0.0.5".to_string(),
                port: 9735
            }))
        );
        assert_eq!(directory.lookup_count(), 0);

        let result = coordinator.open_channel(&input, 200_000, 1_000).await.unwrap();
        assert_eq!(result.node_id, node());
        assert_eq!(directory.lookup_count(), 0);
        assert_eq!(directory.added_peers(), vec![("10.0.0.5".to_string(), 9735, node())]);
        assert_eq!(backend.open_calls(), vec![(node(), 200_000, 1_000)]);
    }

    #[test(tokio::test)]
    async fn directory_address_test() {
        let (coordinator, directory, backend) =
            make_coordinator(StaticDirectory::new().with_address(node(), "node.example", 9736));
        coordinator.open_channel(NODE_HEX, 100_000, 0).await.unwrap();
        assert_eq!(directory.lookup_count(), 1);
        assert_eq!(directory.added_peers(), vec![("node.example".to_string(), 9736, node())]);
        assert_eq!(backend.open_calls(), vec![(node(), 100_000, 0)]);
    }

    #[test(tokio::test)]
    async fn explicit_address_wins_test() {
        let (coordinator, directory, _) =
            make_coordinator(StaticDirectory::new().with_address(node(), "node.example", 9736));
        let input = format!("{}@other.example:1234", NODE_HEX);
        let resolved = coordinator.resolve_peer(&input).await.unwrap();
        assert_eq!(
            resolved,
            ResolvedPeer::Connect(ConnectionTarget {
                node_id: node(),
                host: "other.example".to_string(),
                port: 1234
            })
        );
        assert_eq!(resolved.node_id(), &node());
        assert_eq!(directory.lookup_count(), 0);
    }

    #[test(tokio::test)]
    async fn already_connected_test() {
        let (coordinator, directory, backend) =
            make_coordinator(StaticDirectory::new().with_connected(node()));
        // the address is not even looked at
        let input = format!("{}@host:abc", NODE_HEX);
        coordinator.open_channel(&input, 100_000, 0).await.unwrap();
        assert_eq!(directory.lookup_count(), 0);
        assert!(directory.added_peers().is_empty());
        assert_eq!(backend.open_calls().len(), 1);
    }

    #[test(tokio::test)]
    async fn unknown_node_test() {
        let (coordinator, directory, backend) = make_coordinator(StaticDirectory::new());
        assert_eq!(
            coordinator.open_channel(NODE_HEX, 100_000, 0).await,
            Err(ChannelOpenError::UnknownNode(NODE_HEX.to_string()))
        );
        assert_eq!(directory.lookup_count(), 1);
        assert!(directory.added_peers().is_empty());
        assert!(backend.open_calls().is_empty());
    }

    #[test(tokio::test)]
    async fn bad_port_test() {
        let (coordinator, directory, backend) = make_coordinator(StaticDirectory::new());
        let input = format!("{}@host:abc", NODE_HEX);
        assert_eq!(
            coordinator.open_channel(&input, 100_000, 0).await,
            Err(ChannelOpenError::BadPort("abc".to_string()))
        );
        // out of range
        let input = format!("{}@host:70000", NODE_HEX);
        assert_eq!(
            coordinator.open_channel(&input, 100_000, 0).await,
            Err(ChannelOpenError::BadPort("70000".to_string()))
        );
        assert!(directory.added_peers().is_empty());
        assert!(backend.open_calls().is_empty());
    }

    #[test(tokio::test)]
    async fn bad_connection_string_test() {
        let (coordinator, directory, _) = make_coordinator(StaticDirectory::new());
        for rest in ["host", "host:1:2", "[::1]:9735", "", ":9735"] {
            let input = format!("{}@{}", NODE_HEX, rest);
            assert_eq!(
                coordinator.open_channel(&input, 100_000, 0).await,
                Err(ChannelOpenError::BadConnectionStringFormat(rest.to_string()))
            );
        }
        assert!(directory.added_peers().is_empty());
    }

    #[test(tokio::test)]
    async fn invalid_node_id_test() {
        let (coordinator, directory, backend) = make_coordinator(StaticDirectory::new());
        assert_eq!(
            coordinator.open_channel("xyz@host:9735", 100_000, 0).await,
            Err(ChannelOpenError::InvalidNodeId("xyz".to_string()))
        );
        assert_eq!(directory.lookup_count(), 0);
        assert!(backend.open_calls().is_empty());
    }

    #[test(tokio::test)]
    async fn peer_connect_failure_test() {
        let (coordinator, directory, backend) = make_coordinator(StaticDirectory::new());
        directory.fail_add_peer("connection refused");
        let input = format!("{}@10.0.0.5:9735", NODE_HEX);
        assert_eq!(
            coordinator.open_channel(&input, 100_000, 0).await,
            Err(ChannelOpenError::PeerConnectFailure("connection refused".to_string()))
        );
        assert!(backend.open_calls().is_empty());
    }

    #[test(tokio::test)]
    async fn backend_failure_test() {
        let (coordinator, _, backend) =
            make_coordinator(StaticDirectory::new().with_connected(node()));
        backend.fail_open("insufficient funds");
        assert_eq!(
            coordinator.open_channel(NODE_HEX, 100_000, 0).await,
            Err(ChannelOpenError::ChannelOpenFailure("insufficient funds".to_string()))
        );
        // not retried
        assert_eq!(backend.open_calls().len(), 1);
    }

    #[test(tokio::test)]
    async fn force_close_test() {
        let (coordinator, _, backend) = make_coordinator(StaticDirectory::new());
        let channel_id = ChannelId::new([1; 32]);
        assert!(coordinator.force_close(&channel_id).await.is_ok());
        backend.fail_force_close("channel not found");
        let err = coordinator.force_close(&channel_id).await.unwrap_err();
        assert_eq!(err.to_string(), "Force-close failed:\nchannel not found");
        assert_eq!(backend.force_close_calls(), vec![channel_id, channel_id]);
    }

    #[test(tokio::test)]
    async fn status_summary_test() {
        let (coordinator, _, _) = make_coordinator(
            StaticDirectory::new()
                .with_connected(make_node_id(1))
                .with_connected(make_node_id(2))
                .with_gossip_counts(100, 250)
                .with_suggestion(make_node_id(2))
                .with_local_node_id(make_node_id(9)),
        );
        assert_eq!(
            coordinator.status_summary().await,
            StatusSummary { peer_count: 2, node_count: 100, channel_count: 250 }
        );
        assert_eq!(coordinator.suggest_peer().await, Some(make_node_id(2)));
        assert_eq!(coordinator.local_node_id().await, Some(make_node_id(9)));

        let (coordinator, _, _) = make_coordinator(StaticDirectory::new());
        assert_eq!(coordinator.local_node_id().await, None);
    }

    #[test]
    fn split_host_port_test() {
        assert_eq!(split_host_port("a:1"), Ok(("a", "1")));
        assert!(split_host_port(":").is_err());
        assert!(split_host_port(":80").is_err());
        assert_eq!(split_host_port("a:"), Ok(("a", "")));
        assert!(split_host_port("a").is_err());
        assert_eq!(parse_port("9735"), Ok(9735));
        assert!(parse_port("").is_err());
        assert!(parse_port("-1").is_err());
    }

    #[test]
    fn open_attempt_test() {
        let mut attempt = OpenAttempt::new();
        assert_eq!(attempt.state, OpenState::Parsing);
        attempt.node_id = Some(make_node_id(1));
        attempt.advance(OpenState::Connecting);
        let e = ChannelOpenError::PeerConnectFailure("refused".to_string());
        assert_eq!(attempt.fail(e.clone()), e);
        assert_eq!(attempt.state, OpenState::Failed);
    }
}
