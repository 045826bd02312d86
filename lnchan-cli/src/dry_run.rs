use async_trait::async_trait;
use lnchan::{ChannelBackend, ChannelId, NodeId};
use log::*;

/// A channel backend that doesn't talk to any node.
/// Open requests are logged and acknowledged, force-closes are refused.
pub struct DryRunBackend;

#[async_trait]
impl ChannelBackend for DryRunBackend {
    async fn open_channel(
        &self,
        node_id: &NodeId,
        local_amount_sat: u64,
        push_amount_sat: u64,
    ) -> Result<String, String> {
        info!("dry run: open {} local {} push {}", node_id, local_amount_sat, push_amount_sat);
        Ok(format!(
            "dry run: would open a {} sat channel with {}, pushing {} sat",
            local_amount_sat, node_id, push_amount_sat
        ))
    }

    async fn force_close(&self, channel_id: &ChannelId) -> Result<String, String> {
        Err(format!("dry run: no backend to close channel {}", channel_id))
    }
}
