// 📡 Event Relay - card-reader status fan-out
//
// The card reader POSTs its status; every connected browser gets a copy.
// Independent of the registry.

use serde::{Deserialize, Serialize};
use tokio::sync::broadcast;
use tracing::{debug, warn};

/// Buffered events per subscriber before it starts lagging
pub const DEFAULT_CAPACITY: usize = 64;

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "event", content = "data", rename_all = "kebab-case")]
pub enum CardEvent {
    CardInserted,
    CardRemoved,
    CardData(serde_json::Value),
}

impl CardEvent {
    /// Map a reader status tag to an event. Unknown tags yield `None`.
    pub fn from_status(status: &str, data: serde_json::Value) -> Option<Self> {
        match status {
            "inserted" => Some(CardEvent::CardInserted),
            "removed" => Some(CardEvent::CardRemoved),
            "card-data" => Some(CardEvent::CardData(data)),
            _ => None,
        }
    }

    pub fn name(&self) -> &'static str {
        match self {
            CardEvent::CardInserted => "card-inserted",
            CardEvent::CardRemoved => "card-removed",
            CardEvent::CardData(_) => "card-data",
        }
    }
}

/// Body of `POST /card-event`
#[derive(Debug, Deserialize)]
pub struct CardEventRequest {
    #[serde(default)]
    pub status: String,
    #[serde(default)]
    pub data: serde_json::Value,
}

#[derive(Clone)]
pub struct EventRelay {
    sender: broadcast::Sender<CardEvent>,
}

impl Default for EventRelay {
    fn default() -> Self {
        Self::new(DEFAULT_CAPACITY)
    }
}

impl EventRelay {
    pub fn new(capacity: usize) -> Self {
        let (sender, _) = broadcast::channel(capacity);
        EventRelay { sender }
    }

    /// Returns how many subscribers the event reached. No subscribers is not an error.
    pub fn publish(&self, event: CardEvent) -> usize {
        let name = event.name();
        match self.sender.send(event) {
            Ok(reached) => {
                debug!(event = name, subscribers = reached, "card event relayed");
                reached
            }
            Err(_) => {
                debug!(event = name, "card event dropped, no subscribers");
                0
            }
        }
    }

    pub fn subscribe(&self) -> Subscription {
        Subscription {
            receiver: self.sender.subscribe(),
        }
    }

    pub fn subscriber_count(&self) -> usize {
        self.sender.receiver_count()
    }
}

pub struct Subscription {
    receiver: broadcast::Receiver<CardEvent>,
}

impl Subscription {
    /// Next event, or `None` once the relay is gone. A lagging subscriber
    /// skips what it missed and keeps going.
    pub async fn next(&mut self) -> Option<CardEvent> {
        loop {
            match self.receiver.recv().await {
                Ok(event) => return Some(event),
                Err(broadcast::error::RecvError::Lagged(missed)) => {
                    warn!(missed, "subscriber lagging, events skipped");
                }
                Err(broadcast::error::RecvError::Closed) => return None,
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_from_status() {
        assert_eq!(
            CardEvent::from_status("inserted", json!(null)),
            Some(CardEvent::CardInserted)
        );
        assert_eq!(
            CardEvent::from_status("removed", json!({"ignored": true})),
            Some(CardEvent::CardRemoved)
        );
        assert_eq!(
            CardEvent::from_status("card-data", json!({"id": "123"})),
            Some(CardEvent::CardData(json!({"id": "123"})))
        );
        assert_eq!(CardEvent::from_status("exploded", json!(null)), None);
    }

    #[test]
    fn test_event_wire_shape() {
        assert_eq!(
            serde_json::to_value(CardEvent::CardInserted).unwrap(),
            json!({"event": "card-inserted"})
        );
        assert_eq!(
            serde_json::to_value(CardEvent::CardData(json!({"th_name": "สมชาย"}))).unwrap(),
            json!({"event": "card-data", "data": {"th_name": "สมชาย"}})
        );
    }

    #[test]
    fn test_publish_without_subscribers() {
        let relay = EventRelay::default();
        assert_eq!(relay.publish(CardEvent::CardRemoved), 0);
    }

    #[tokio::test]
    async fn test_fan_out_to_all_subscribers() {
        let relay = EventRelay::default();
        let mut a = relay.subscribe();
        let mut b = relay.subscribe();

        assert_eq!(relay.publish(CardEvent::CardInserted), 2);

        assert_eq!(a.next().await, Some(CardEvent::CardInserted));
        assert_eq!(b.next().await, Some(CardEvent::CardInserted));
    }

    #[tokio::test]
    async fn test_lagging_subscriber_resumes() {
        let relay = EventRelay::new(2);
        let mut sub = relay.subscribe();

        relay.publish(CardEvent::CardInserted);
        relay.publish(CardEvent::CardRemoved);
        relay.publish(CardEvent::CardData(json!(1)));

        // oldest event overwritten; the rest still arrive in order
        assert_eq!(sub.next().await, Some(CardEvent::CardRemoved));
        assert_eq!(sub.next().await, Some(CardEvent::CardData(json!(1))));
    }
}
