use std::collections::HashMap;

use log::*;

use crate::model::{Channel, ChannelId, ChannelRow};

/// The displayable set of channels.
///
/// Entities come only from the channel backend, via a full refresh
/// ([`ChannelRegistry::replace_all`]) or a single-channel update
/// ([`ChannelRegistry::apply_update`]).  Display order is newest first: the
/// last channel supplied by a refresh is the first one shown.
#[derive(Debug, Default)]
pub struct ChannelRegistry {
    channels: HashMap<ChannelId, Channel>,
    // display order, newest first
    order: Vec<ChannelId>,
}

impl ChannelRegistry {
    /// An empty registry
    pub fn new() -> Self {
        Self::default()
    }

    /// Discard everything and install `channels`.
    ///
    /// If the same channel id appears more than once, the later entity wins and
    /// takes the later position.
    pub fn replace_all<I: IntoIterator<Item = Channel>>(&mut self, channels: I) {
        let mut map = HashMap::new();
        let mut order = Vec::new();
        for channel in channels {
            let channel_id = channel.channel_id;
            if map.insert(channel_id, channel).is_some() {
                order.retain(|id| *id != channel_id);
            }
            order.push(channel_id);
        }
        order.reverse();
        debug!("replaced registry contents with {} channels", order.len());
        self.channels = map;
        self.order = order;
    }

    /// Overwrite a known channel in place, keeping its position.
    ///
    /// An update for a channel id we don't know is ignored, so a channel created
    /// since the last full refresh stays invisible until the next one.
    /// Returns whether anything changed.
    pub fn apply_update(&mut self, channel: Channel) -> bool {
        match self.channels.get_mut(&channel.channel_id) {
            Some(existing) => {
                *existing = channel;
                true
            }
            None => {
                debug!("ignoring update for unknown channel {}", channel.channel_id);
                false
            }
        }
    }

    /// All channels, newest first
    pub fn snapshot(&self) -> Vec<Channel> {
        self.order.iter().filter_map(|id| self.channels.get(id)).cloned().collect()
    }

    /// Display rows, newest first
    pub fn rows(&self) -> Vec<ChannelRow> {
        self.order.iter().filter_map(|id| self.channels.get(id)).map(Channel::row).collect()
    }

    /// Look up one channel
    pub fn get(&self, channel_id: &ChannelId) -> Option<&Channel> {
        self.channels.get(channel_id)
    }

    /// Number of channels
    pub fn len(&self) -> usize {
        self.channels.len()
    }

    /// Whether there are no channels
    pub fn is_empty(&self) -> bool {
        self.channels.is_empty()
    }
}
