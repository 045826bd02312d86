use std::collections::{HashMap, HashSet};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

use async_trait::async_trait;

use crate::backend::ChannelBackend;
use crate::directory::{NodeDirectory, PeerDirectory, StaticDirectory};
use crate::error::DecodeError;
use crate::invoice::{DecodedInvoice, InvoiceDecoder};
use crate::model::{Channel, ChannelId, ChannelState, NodeId};

/// A mainnet BOLT-11 invoice without an amount, payable to
/// 03e7156ae33b0a208d0744199163177e909e80176e55d97a2f221ede0f934dd9ad
pub const TEST_BOLT11_INVOICE: &str = "lnbc1pvjluezsp5zyg3zyg3zyg3zyg3zyg3zyg3zyg3zyg3zyg3zyg3zyg3zyg3zygspp5qqqsyqcyq5rqwzqfqqqsyqcyq5rqwzqfqqqsyqcyq5rqwzqfqypqdpl2pkx2ctnv5sxxmmwwd5kgetjypeh2ursdae8g6twvus8g6rfwvs8qun0dfjkxaq9qrsgq357wnc5r2ueh7ck6q93dj32dlqnls087fxdwk8qakdyafkq3yap9us6v52vjjsrvywa6rt52cm9r9zqt8r2t7mlcwspyetp5h2tztugp9lfyql";

pub fn make_node_id(n: u8) -> NodeId {
    NodeId::new([n; 33])
}

pub fn make_channel_id(n: u8) -> ChannelId {
    ChannelId::new([n; 32])
}

/// A channel with peer `make_node_id(n)`, balances derived from `n`
pub fn make_channel(n: u8, state: ChannelState) -> Channel {
    Channel {
        channel_id: make_channel_id(n),
        node_id: make_node_id(n),
        local_balance_msat: n as u64 * 1_000_000,
        remote_balance_msat: n as u64 * 500_000,
        state,
    }
}

/// Decodes a fixed set of strings, and counts the calls
#[derive(Clone)]
pub struct FixedInvoiceDecoder {
    invoices: HashMap<String, NodeId>,
    count: Arc<AtomicUsize>,
}

impl FixedInvoiceDecoder {
    pub fn new(invoices: &[(&str, NodeId)]) -> Self {
        FixedInvoiceDecoder {
            invoices: invoices.iter().map(|(s, n)| (s.to_string(), *n)).collect(),
            count: Arc::new(AtomicUsize::new(0)),
        }
    }

    pub fn decode_count(&self) -> usize {
        self.count.load(Ordering::SeqCst)
    }
}

impl InvoiceDecoder for FixedInvoiceDecoder {
    fn decode(&self, text: &str) -> Result<DecodedInvoice, DecodeError> {
        self.count.fetch_add(1, Ordering::SeqCst);
        self.invoices
            .get(text)
            .map(|node_id| DecodedInvoice::new(*node_id.as_bytes()))
            .ok_or_else(|| DecodeError("not a known invoice".to_string()))
    }
}

/// Wraps a [`StaticDirectory`], recording lookups and connects
pub struct CountingDirectory {
    inner: StaticDirectory,
    lookups: AtomicUsize,
    added: Mutex<Vec<(String, u16, NodeId)>>,
    add_peer_failure: Mutex<Option<String>>,
}

impl CountingDirectory {
    pub fn new(inner: StaticDirectory) -> Self {
        CountingDirectory {
            inner,
            lookups: AtomicUsize::new(0),
            added: Mutex::new(Vec::new()),
            add_peer_failure: Mutex::new(None),
        }
    }

    /// Make subsequent `add_peer` calls fail with `msg`
    pub fn fail_add_peer(&self, msg: &str) {
        *self.add_peer_failure.lock().unwrap() = Some(msg.to_string());
    }

    pub fn lookup_count(&self) -> usize {
        self.lookups.load(Ordering::SeqCst)
    }

    /// Every `add_peer` call, successful or not
    pub fn added_peers(&self) -> Vec<(String, u16, NodeId)> {
        self.added.lock().unwrap().clone()
    }
}

#[async_trait]
impl PeerDirectory for CountingDirectory {
    async fn lookup_address(&self, node_id: &NodeId) -> Option<(String, u16)> {
        self.lookups.fetch_add(1, Ordering::SeqCst);
        self.inner.lookup_address(node_id).await
    }

    async fn connected_peers(&self) -> HashSet<NodeId> {
        self.inner.connected_peers().await
    }

    async fn add_peer(&self, host: &str, port: u16, node_id: &NodeId) -> Result<(), String> {
        self.added.lock().unwrap().push((host.to_string(), port, *node_id));
        let failure = self.add_peer_failure.lock().unwrap().clone();
        match failure {
            Some(msg) => Err(msg),
            None => self.inner.add_peer(host, port, node_id).await,
        }
    }

    async fn suggest_peer(&self) -> Option<NodeId> {
        self.inner.suggest_peer().await
    }
}

#[async_trait]
impl NodeDirectory for CountingDirectory {
    async fn local_node_id(&self) -> Option<NodeId> {
        self.inner.local_node_id().await
    }

    async fn node_count(&self) -> usize {
        self.inner.node_count().await
    }

    async fn channel_count(&self) -> usize {
        self.inner.channel_count().await
    }
}

#[derive(Default)]
struct MockBackendState {
    open_calls: Vec<(NodeId, u64, u64)>,
    force_close_calls: Vec<ChannelId>,
    open_failure: Option<String>,
    force_close_failure: Option<String>,
}

/// A channel backend that records requests and succeeds unless told otherwise
#[derive(Default)]
pub struct MockBackend {
    state: Mutex<MockBackendState>,
}

impl MockBackend {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn fail_open(&self, msg: &str) {
        self.state.lock().unwrap().open_failure = Some(msg.to_string());
    }

    pub fn fail_force_close(&self, msg: &str) {
        self.state.lock().unwrap().force_close_failure = Some(msg.to_string());
    }

    pub fn open_calls(&self) -> Vec<(NodeId, u64, u64)> {
        self.state.lock().unwrap().open_calls.clone()
    }

    pub fn force_close_calls(&self) -> Vec<ChannelId> {
        self.state.lock().unwrap().force_close_calls.clone()
    }
}

#[async_trait]
impl ChannelBackend for MockBackend {
    async fn open_channel(
        &self,
        node_id: &NodeId,
        local_amount_sat: u64,
        push_amount_sat: u64,
    ) -> Result<String, String> {
        let mut state = self.state.lock().unwrap();
        state.open_calls.push((*node_id, local_amount_sat, push_amount_sat));
        match &state.open_failure {
            Some(msg) => Err(msg.clone()),
            None => Ok(format!("opening channel with {}", node_id)),
        }
    }

    async fn force_close(&self, channel_id: &ChannelId) -> Result<String, String> {
        let mut state = self.state.lock().unwrap();
        state.force_close_calls.push(*channel_id);
        match &state.force_close_failure {
            Some(msg) => Err(msg.clone()),
            None => Ok(format!("closing transaction broadcast for {}", channel_id)),
        }
    }
}
