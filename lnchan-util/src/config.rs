use std::fs::read_to_string;
use std::io;
use std::path::{Path, PathBuf};

use lnchan::{Channel, ChannelId, ChannelState, NodeId, StaticDirectory};
use log::*;
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Data directory used when neither the command line nor the config file set one
pub const DEFAULT_DIR: &str = ".lnchan";

/// Log level used when neither the command line nor the config file set one
pub const DEFAULT_LOG_LEVEL: &str = "info";

/// The config file could not be loaded, or holds an invalid entry
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("could not read {path}: {source}")]
    Io {
        path: String,
        #[source]
        source: io::Error,
    },
    #[error("could not parse config: {0}")]
    Parse(#[from] toml::de::Error),
    #[error("invalid node id {0:?}")]
    InvalidNodeId(String),
    #[error("invalid address {0:?}, expected <host>:<port>")]
    InvalidAddress(String),
    #[error("invalid channel id {0:?}")]
    InvalidChannelId(String),
    #[error("invalid channel state {0:?}")]
    InvalidChannelState(String),
}

#[derive(Serialize, Deserialize, Debug, Default, Clone, PartialEq, Eq)]
pub struct Config {
    pub datadir: Option<String>,
    pub log_level: Option<String>,
    /// Our own node id
    pub node_id: Option<String>,
    /// Node ids we are connected to
    pub connected: Option<Vec<String>>,
    /// Node id to pre-fill the open-channel input with
    pub suggest: Option<String>,

    pub gossip: Option<ConfigGossip>,
    pub node: Option<Vec<ConfigNode>>,
    pub channel: Option<Vec<ConfigChannel>>,
}

/// Gossip view counts
#[derive(Serialize, Deserialize, Debug, Default, Copy, Clone, PartialEq, Eq)]
pub struct ConfigGossip {
    pub nodes: Option<usize>,
    pub channels: Option<usize>,
}

/// A node with a known address
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Eq)]
pub struct ConfigNode {
    pub id: String,
    /// `<host>:<port>`
    pub address: String,
}

/// A channel as the backend would report it
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Eq)]
pub struct ConfigChannel {
    pub id: String,
    pub node: String,
    pub local_msat: u64,
    pub remote_msat: u64,
    pub state: String,
}

/// Read and parse a TOML config file
pub fn load_config<P: AsRef<Path>>(path: P) -> Result<Config, ConfigError> {
    let path = path.as_ref();
    let contents = read_to_string(path)
        .map_err(|source| ConfigError::Io { path: path.display().to_string(), source })?;
    let config: Config = toml::from_str(&contents)?;
    debug!("loaded config from {}", path.display());
    Ok(config)
}

fn parse_node_id(s: &str) -> Result<NodeId, ConfigError> {
    NodeId::from_hex(s).map_err(|_| ConfigError::InvalidNodeId(s.to_string()))
}

fn parse_address(s: &str) -> Result<(String, u16), ConfigError> {
    let invalid = || ConfigError::InvalidAddress(s.to_string());
    let (host, port) = s.split_once(':').ok_or_else(invalid)?;
    let port = port.parse().map_err(|_| invalid())?;
    if host.is_empty() {
        return Err(invalid());
    }
    Ok((host.to_string(), port))
}

impl Config {
    /// The data directory, with the command line taking precedence
    pub fn datadir(&self, arg: Option<&str>) -> PathBuf {
        PathBuf::from(arg.or(self.datadir.as_deref()).unwrap_or(DEFAULT_DIR))
    }

    /// The log level, with the command line taking precedence
    pub fn log_level<'a>(&'a self, arg: Option<&'a str>) -> &'a str {
        arg.or(self.log_level.as_deref()).unwrap_or(DEFAULT_LOG_LEVEL)
    }

    /// Build a peer and gossip directory from the config
    pub fn directory(&self) -> Result<StaticDirectory, ConfigError> {
        let mut directory = StaticDirectory::new();
        for node in self.node.iter().flatten() {
            let (host, port) = parse_address(&node.address)?;
            directory = directory.with_address(parse_node_id(&node.id)?, host, port);
        }
        for id in self.connected.iter().flatten() {
            directory = directory.with_connected(parse_node_id(id)?);
        }
        if let Some(node_id) = &self.node_id {
            directory = directory.with_local_node_id(parse_node_id(node_id)?);
        }
        if let Some(suggest) = &self.suggest {
            directory = directory.with_suggestion(parse_node_id(suggest)?);
        }
        let gossip = self.gossip.unwrap_or_default();
        directory = directory
            .with_gossip_counts(gossip.nodes.unwrap_or(0), gossip.channels.unwrap_or(0));
        info!("directory has {} addresses", directory.address_count());
        Ok(directory)
    }

    /// The configured channels, in file order
    pub fn channels(&self) -> Result<Vec<Channel>, ConfigError> {
        self.channel.iter().flatten().map(ConfigChannel::to_channel).collect()
    }
}

impl ConfigChannel {
    fn to_channel(&self) -> Result<Channel, ConfigError> {
        let channel_id = hex::decode(&self.id)
            .ok()
            .and_then(|bytes| ChannelId::from_slice(&bytes))
            .ok_or_else(|| ConfigError::InvalidChannelId(self.id.clone()))?;
        let state = ChannelState::from_label(&self.state)
            .ok_or_else(|| ConfigError::InvalidChannelState(self.state.clone()))?;
        Ok(Channel {
            channel_id,
            node_id: parse_node_id(&self.node)?,
            local_balance_msat: self.local_msat,
            remote_balance_msat: self.remote_msat,
            state,
        })
    }
}
