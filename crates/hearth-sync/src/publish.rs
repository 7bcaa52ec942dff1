use std::sync::{Arc, Mutex};

use hearth_db::Database;
use hearth_types::events::ChatEvent;
use hearth_types::models::Message;
use hearth_types::ChannelId;
use tracing::warn;
use uuid::Uuid;

use crate::{fanout, SyncError};

/// Pub/sub transport seam.
///
/// A destination is a user id; the transport owns a private queue per user
/// and promises at-least-once delivery with no cross-queue leakage. The live
/// implementation is the gateway dispatcher; tests use [`MemorySink`].
pub trait EventSink: Send + Sync {
    fn deliver(&self, destination: Uuid, event: ChatEvent) -> anyhow::Result<()>;
}

/// Publishes events to resolved destinations.
///
/// Fire-and-forget from the caller's perspective: transport errors are logged
/// and swallowed so they can never abort the persistence write that triggered
/// them. A missed delivery is repaired by the client's next reload.
#[derive(Clone)]
pub struct EventPublisher {
    sink: Arc<dyn EventSink>,
}

impl EventPublisher {
    pub fn new(sink: Arc<dyn EventSink>) -> Self {
        Self { sink }
    }

    pub fn publish(&self, destination: Uuid, event: ChatEvent) {
        if let Err(err) = self.sink.deliver(destination, event) {
            warn!("event delivery to {destination} failed: {err}");
        }
    }

    pub fn publish_all(&self, destinations: &[Uuid], event: &ChatEvent) {
        for dest in destinations {
            self.publish(*dest, event.clone());
        }
    }
}

/// Resolve destinations for a stored message and deliver `NewMessage` to each
/// participant's private queue. Returns how many destinations were resolved.
pub fn fan_out_message(
    db: &Database,
    publisher: &EventPublisher,
    message: &Message,
) -> Result<usize, SyncError> {
    let destinations = fanout::message_destinations(db, &message.channel_id)?;
    let event = ChatEvent::NewMessage {
        channel_id: message.channel_id.clone(),
        message: message.clone(),
    };
    publisher.publish_all(&destinations, &event);
    Ok(destinations.len())
}

/// Relay a typing signal to every channel participant. Receivers drop their
/// own echo; everything else renders or clears the indicator.
pub fn fan_out_typing(
    db: &Database,
    publisher: &EventPublisher,
    channel: &ChannelId,
    user_id: Uuid,
    username: &str,
    is_typing: bool,
) -> Result<usize, SyncError> {
    let destinations = fanout::message_destinations(db, channel)?;
    let event = ChatEvent::UserTyping {
        channel_id: channel.clone(),
        user_id,
        username: username.to_string(),
        is_typing,
    };
    publisher.publish_all(&destinations, &event);
    Ok(destinations.len())
}

/// In-process sink that records every delivery, in order.
#[derive(Default)]
pub struct MemorySink {
    deliveries: Mutex<Vec<(Uuid, ChatEvent)>>,
}

impl MemorySink {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn deliveries(&self) -> Vec<(Uuid, ChatEvent)> {
        self.deliveries.lock().expect("sink lock poisoned").clone()
    }

    /// Events delivered to one user's private queue.
    pub fn for_user(&self, user: Uuid) -> Vec<ChatEvent> {
        self.deliveries()
            .into_iter()
            .filter(|(dest, _)| *dest == user)
            .map(|(_, event)| event)
            .collect()
    }
}

impl EventSink for MemorySink {
    fn deliver(&self, destination: Uuid, event: ChatEvent) -> anyhow::Result<()> {
        self.deliveries
            .lock()
            .expect("sink lock poisoned")
            .push((destination, event));
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;

    fn uid(n: u128) -> Uuid {
        Uuid::from_u128(n)
    }

    fn message(channel: &ChannelId, sender: Uuid, body: &str) -> Message {
        Message {
            id: Uuid::new_v4(),
            channel_id: channel.clone(),
            sender_id: sender,
            sender_username: "ana".into(),
            body: body.into(),
            created_at: Utc::now(),
            read_at: None,
        }
    }

    #[test]
    fn direct_message_reaches_exactly_the_two_participants() {
        let db = Database::open_in_memory().unwrap();
        let sink = Arc::new(MemorySink::new());
        let publisher = EventPublisher::new(sink.clone());

        let chan = ChannelId::direct(uid(1), uid(2));
        let sent = fan_out_message(&db, &publisher, &message(&chan, uid(1), "hi")).unwrap();

        assert_eq!(sent, 2);
        assert_eq!(sink.for_user(uid(1)).len(), 1);
        assert_eq!(sink.for_user(uid(2)).len(), 1);
        // An uninvolved user observes nothing.
        assert!(sink.for_user(uid(3)).is_empty());
    }

    #[test]
    fn malformed_channel_skips_delivery_entirely() {
        let db = Database::open_in_memory().unwrap();
        let sink = Arc::new(MemorySink::new());
        let publisher = EventPublisher::new(sink.clone());

        let bad = ChannelId::from("dm:broken".to_string());
        assert!(fan_out_message(&db, &publisher, &message(&bad, uid(1), "hi")).is_err());
        assert!(sink.deliveries().is_empty());
    }

    #[test]
    fn typing_relay_reaches_all_participants() {
        let db = Database::open_in_memory().unwrap();
        let sink = Arc::new(MemorySink::new());
        let publisher = EventPublisher::new(sink.clone());

        let chan = ChannelId::direct(uid(1), uid(2));
        fan_out_typing(&db, &publisher, &chan, uid(1), "ana", true).unwrap();

        let events = sink.for_user(uid(2));
        assert!(matches!(
            events.as_slice(),
            [ChatEvent::UserTyping { is_typing: true, .. }]
        ));
    }
}
