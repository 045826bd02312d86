use thiserror::Error;

/// Operator input could not be turned into a node id
#[derive(Clone, Debug, PartialEq, Eq, Error)]
pub enum ResolutionError {
    /// The candidate node id is not 33 bytes of hex.  Carries the candidate.
    #[error("Invalid node ID, must be 33 bytes and hexadecimal")]
    InvalidNodeId(String),
}

/// An invoice could not be decoded
///
/// Never escapes the resolver, where it just means the input is not an invoice.
#[derive(Clone, Debug, PartialEq, Eq, Error)]
#[error("invoice decode failed: {0}")]
pub struct DecodeError(pub String);

/// A channel-open attempt failed
#[derive(Clone, Debug, PartialEq, Eq, Error)]
pub enum ChannelOpenError {
    /// The candidate node id is not 33 bytes of hex
    #[error("Invalid node ID, must be 33 bytes and hexadecimal")]
    InvalidNodeId(String),
    /// The part after `@` is not `host:port`
    #[error("Connection strings must be in <node_pubkey>@<host>:<port> format")]
    BadConnectionStringFormat(String),
    /// No explicit address was given and the directory has none.  Carries the node id hex.
    #[error("Unknown node: {0}")]
    UnknownNode(String),
    /// The port is not a decimal number
    #[error("Port number must be decimal")]
    BadPort(String),
    /// The peer directory could not connect to the peer
    #[error("Could not connect to peer: {0}")]
    PeerConnectFailure(String),
    /// The channel backend refused or failed to open the channel
    #[error("Channel open failed: {0}")]
    ChannelOpenFailure(String),
}

impl From<ResolutionError> for ChannelOpenError {
    fn from(e: ResolutionError) -> Self {
        match e {
            ResolutionError::InvalidNodeId(s) => ChannelOpenError::InvalidNodeId(s),
        }
    }
}

/// The channel backend failed to force-close a channel
#[derive(Clone, Debug, PartialEq, Eq, Error)]
#[error("Force-close failed:\n{0}")]
pub struct ForceCloseError(pub String);
