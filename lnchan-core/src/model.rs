use core::fmt;
use core::str::FromStr;

use bitcoin::secp256k1::PublicKey;

use crate::error::ResolutionError;

/// Length of a serialized compressed public key
pub const NODE_ID_LEN: usize = 33;

/// Length of a channel id
pub const CHANNEL_ID_LEN: usize = 32;

/// A remote node, as the 33 bytes of its compressed public key.
///
/// The bytes are not checked to be a valid curve point, so that any 33 bytes the
/// operator types can be carried to the peer directory as-is.
#[derive(Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct NodeId([u8; NODE_ID_LEN]);

impl NodeId {
    /// Wrap raw bytes
    pub const fn new(bytes: [u8; NODE_ID_LEN]) -> Self {
        NodeId(bytes)
    }

    /// Returns None unless the slice is exactly 33 bytes long
    pub fn from_slice(bytes: &[u8]) -> Option<Self> {
        bytes.try_into().ok().map(NodeId)
    }

    /// Parse from hex, requiring exactly 33 bytes
    pub fn from_hex(s: &str) -> Result<Self, ResolutionError> {
        hex::decode(s)
            .ok()
            .and_then(|bytes| Self::from_slice(&bytes))
            .ok_or_else(|| ResolutionError::InvalidNodeId(s.to_string()))
    }

    /// The raw bytes
    pub fn as_bytes(&self) -> &[u8; NODE_ID_LEN] {
        &self.0
    }

    /// Lowercase hex
    pub fn to_hex(&self) -> String {
        hex::encode(self.0)
    }
}

impl From<PublicKey> for NodeId {
    fn from(pubkey: PublicKey) -> Self {
        NodeId(pubkey.serialize())
    }
}

impl FromStr for NodeId {
    type Err = ResolutionError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::from_hex(s)
    }
}

impl fmt::Display for NodeId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.to_hex())
    }
}

impl fmt::Debug for NodeId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "NodeId({})", self.to_hex())
    }
}

/// A channel, as assigned by the channel backend
#[derive(Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ChannelId([u8; CHANNEL_ID_LEN]);

impl ChannelId {
    /// Wrap raw bytes
    pub const fn new(bytes: [u8; CHANNEL_ID_LEN]) -> Self {
        ChannelId(bytes)
    }

    /// Returns None unless the slice is exactly 32 bytes long
    pub fn from_slice(bytes: &[u8]) -> Option<Self> {
        bytes.try_into().ok().map(ChannelId)
    }

    /// The raw bytes
    pub fn as_bytes(&self) -> &[u8; CHANNEL_ID_LEN] {
        &self.0
    }
}

impl fmt::Display for ChannelId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&hex::encode(self.0))
    }
}

impl fmt::Debug for ChannelId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "ChannelId({})", hex::encode(self.0))
    }
}

/// Lifecycle state of a channel, as reported by the backend
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum ChannelState {
    /// Funding negotiated, waiting for confirmation
    Opening,
    /// Usable for payments
    Open,
    /// Cooperative close in progress
    Closing,
    /// Unilateral close in progress
    ForceClosing,
    /// Closing transaction confirmed
    Closed,
    /// Our outputs have been swept
    Redeemed,
}

impl ChannelState {
    /// Every state, in lifecycle order
    pub const ALL: [ChannelState; 6] = [
        ChannelState::Opening,
        ChannelState::Open,
        ChannelState::Closing,
        ChannelState::ForceClosing,
        ChannelState::Closed,
        ChannelState::Redeemed,
    ];

    /// The inverse of [`ChannelState::as_str`]
    pub fn from_label(label: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|state| state.as_str() == label)
    }

    /// Label shown to the operator
    pub fn as_str(&self) -> &'static str {
        match self {
            ChannelState::Opening => "OPENING",
            ChannelState::Open => "OPEN",
            ChannelState::Closing => "CLOSING",
            ChannelState::ForceClosing => "FORCE_CLOSING",
            ChannelState::Closed => "CLOSED",
            ChannelState::Redeemed => "REDEEMED",
        }
    }
}

impl fmt::Display for ChannelState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A channel with a remote node.
///
/// Always replaced as a whole, never field by field.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Channel {
    /// Unique key
    pub channel_id: ChannelId,
    /// The counterparty
    pub node_id: NodeId,
    /// Our side of the balance
    pub local_balance_msat: u64,
    /// Their side of the balance
    pub remote_balance_msat: u64,
    /// Where the channel is in its lifecycle
    pub state: ChannelState,
}

impl Channel {
    /// Display-ready fields
    pub fn row(&self) -> ChannelRow {
        ChannelRow {
            channel_id: self.channel_id,
            node_id: self.node_id.to_hex(),
            local_balance_sat: self.local_balance_msat / 1000,
            remote_balance_sat: self.remote_balance_msat / 1000,
            state: self.state.as_str(),
        }
    }
}

/// The columns of a channel list entry.  Balances are rounded down to the satoshi.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ChannelRow {
    /// Kept so a row can be mapped back to its channel, e.g. for force-close
    pub channel_id: ChannelId,
    /// Counterparty node id, hex
    pub node_id: String,
    /// Our balance
    pub local_balance_sat: u64,
    /// Their balance
    pub remote_balance_sat: u64,
    /// State label
    pub state: &'static str,
}
