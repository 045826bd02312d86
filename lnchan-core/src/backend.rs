use async_trait::async_trait;

use crate::model::{ChannelId, NodeId};

/// The payment-channel subsystem.
///
/// It reports channel state changes through an
/// [`EventSender`](crate::updater::EventSender) handed to it by its owner,
/// rather than through this trait.
#[async_trait]
pub trait ChannelBackend: Send + Sync {
    /// Open a channel with a connected peer, funding `local_amount_sat` and
    /// giving `push_amount_sat` of it to the peer.
    /// On success, returns a message for the operator, otherwise the reason.
    async fn open_channel(
        &self,
        node_id: &NodeId,
        local_amount_sat: u64,
        push_amount_sat: u64,
    ) -> Result<String, String>;

    /// Unilaterally close a channel.
    /// On success, returns a message for the operator, otherwise the reason.
    async fn force_close(&self, channel_id: &ChannelId) -> Result<String, String>;
}
