use log::*;
use tokio::sync::mpsc::{self, error::TryRecvError, UnboundedReceiver, UnboundedSender};
use triggered::Listener;

use crate::model::Channel;
use crate::registry::ChannelRegistry;

/// A notification from the channel backend
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum ChannelEvent {
    /// The full set of channels, replacing whatever was known
    FullRefresh(Vec<Channel>),
    /// One channel changed
    ChannelChanged(Channel),
}

/// The producer side of the channel event queue.
///
/// Cheap to clone, never blocks, and can be used from any thread.
#[derive(Clone, Debug)]
pub struct EventSender {
    sender: UnboundedSender<ChannelEvent>,
}

impl EventSender {
    /// Announce the full set of channels.  Returns false if nobody is listening anymore.
    pub fn full_refresh(&self, channels: Vec<Channel>) -> bool {
        self.send(ChannelEvent::FullRefresh(channels))
    }

    /// Announce a change to one channel.  Returns false if nobody is listening anymore.
    pub fn channel_changed(&self, channel: Channel) -> bool {
        self.send(ChannelEvent::ChannelChanged(channel))
    }

    /// Queue an event
    pub fn send(&self, event: ChannelEvent) -> bool {
        match self.sender.send(event) {
            Ok(()) => true,
            Err(_) => {
                warn!("registry updater is gone, dropping channel event");
                false
            }
        }
    }
}

/// The single consumer of channel events, and the only writer of the
/// [`ChannelRegistry`] it owns.
///
/// Events are applied strictly in arrival order, so a refresh never
/// resurrects state that a later update replaced, and vice versa.
pub struct RegistryUpdater {
    registry: ChannelRegistry,
    receiver: UnboundedReceiver<ChannelEvent>,
}

impl RegistryUpdater {
    /// Create an updater with an empty registry, and the sender to hand to the backend
    pub fn new() -> (Self, EventSender) {
        let (sender, receiver) = mpsc::unbounded_channel();
        (RegistryUpdater { registry: ChannelRegistry::new(), receiver }, EventSender { sender })
    }

    /// The registry, as of the last applied event
    pub fn registry(&self) -> &ChannelRegistry {
        &self.registry
    }

    /// Apply one event to the registry
    pub fn apply(&mut self, event: ChannelEvent) {
        match event {
            ChannelEvent::FullRefresh(channels) => self.registry.replace_all(channels),
            ChannelEvent::ChannelChanged(channel) => {
                self.registry.apply_update(channel);
            }
        }
    }

    /// Apply everything queued so far without waiting.  Returns the number of events applied.
    pub fn drain(&mut self) -> usize {
        let mut count = 0;
        loop {
            match self.receiver.try_recv() {
                Ok(event) => {
                    self.apply(event);
                    count += 1;
                }
                Err(TryRecvError::Empty) | Err(TryRecvError::Disconnected) => break,
            }
        }
        if count > 0 {
            debug!("applied {} channel events", count);
        }
        count
    }

    /// Wait for the next event and apply it.
    /// Returns false once every [`EventSender`] has been dropped and the queue is empty.
    pub async fn apply_next(&mut self) -> bool {
        match self.receiver.recv().await {
            Some(event) => {
                self.apply(event);
                true
            }
            None => false,
        }
    }

    /// Apply events as they arrive, calling `on_change` after each one, until
    /// shutdown is signalled or every sender is gone.
    pub async fn run<F: FnMut(&ChannelRegistry)>(
        &mut self,
        shutdown_signal: Listener,
        mut on_change: F,
    ) {
        info!("registry updater started");
        loop {
            let shutdown_signal_clone = shutdown_signal.clone();
            tokio::select! {
                applied = self.apply_next() => {
                    if !applied {
                        info!("all channel event senders are gone");
                        break;
                    }
                    on_change(&self.registry);
                }
                _ = shutdown_signal_clone => break,
            }
        }
        info!("registry updater stopped");
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::ChannelState;
    use crate::util::test_utils::make_channel;
    use std::thread;
    use test_log::test;

    #[test]
    fn drain_in_arrival_order_test() {
        let (mut updater, sender) = RegistryUpdater::new();
        let c1 = make_channel(1, ChannelState::Opening);
        let c1_open = make_channel(1, ChannelState::Open);

        // refresh, then update: the update wins
        assert!(sender.full_refresh(vec![c1.clone()]));
        assert!(sender.channel_changed(c1_open.clone()));
        assert_eq!(updater.drain(), 2);
        assert_eq!(updater.registry().snapshot(), vec![c1_open.clone()]);

        // update, then refresh: the refresh wins
        assert!(sender.channel_changed(c1_open));
        assert!(sender.full_refresh(vec![c1.clone()]));
        assert_eq!(updater.drain(), 2);
        assert_eq!(updater.registry().snapshot(), vec![c1]);

        assert_eq!(updater.drain(), 0);
    }

    #[test]
    fn update_before_refresh_is_lost_test() {
        let (mut updater, sender) = RegistryUpdater::new();
        let c1 = make_channel(1, ChannelState::Opening);
        sender.channel_changed(c1.clone());
        assert_eq!(updater.drain(), 1);
        assert!(updater.registry().is_empty());
    }

    #[test]
    fn producer_thread_test() {
        let (mut updater, sender) = RegistryUpdater::new();
        let handle = thread::spawn(move || {
            sender.full_refresh((1..=3).map(|n| make_channel(n, ChannelState::Opening)).collect());
            for n in 1..=3 {
                sender.channel_changed(make_channel(n, ChannelState::Open));
            }
        });
        handle.join().unwrap();
        assert_eq!(updater.drain(), 4);
        let snapshot = updater.registry().snapshot();
        assert_eq!(snapshot.len(), 3);
        assert!(snapshot.iter().all(|c| c.state == ChannelState::Open));
    }

    #[test]
    fn send_after_updater_dropped_test() {
        let (updater, sender) = RegistryUpdater::new();
        drop(updater);
        assert!(!sender.channel_changed(make_channel(1, ChannelState::Open)));
    }

    #[test(tokio::test)]
    async fn run_until_senders_gone_test() {
        let (mut updater, sender) = RegistryUpdater::new();
        let (_trigger, listener) = triggered::trigger();
        let producer = tokio::spawn(async move {
            sender.full_refresh(vec![make_channel(1, ChannelState::Opening)]);
            sender.channel_changed(make_channel(1, ChannelState::Open));
        });
        let mut seen = Vec::new();
        updater.run(listener, |registry| seen.push(registry.snapshot()[0].state)).await;
        producer.await.unwrap();
        assert_eq!(seen, vec![ChannelState::Opening, ChannelState::Open]);
    }

    #[test(tokio::test)]
    async fn run_until_shutdown_test() {
        let (mut updater, _sender) = RegistryUpdater::new();
        let (trigger, listener) = triggered::trigger();
        trigger.trigger();
        let mut calls = 0;
        updater.run(listener, |_| calls += 1).await;
        assert_eq!(calls, 0);
    }
}
