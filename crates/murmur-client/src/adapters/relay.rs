//! In-process realtime relay.
//!
//! One tokio broadcast channel per room. Every connection gets its own peer
//! id so typing indicators can skip their originator.

use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex, MutexGuard};

use async_trait::async_trait;
use futures::stream::{self, StreamExt};
use tokio::sync::broadcast;
use tracing::{debug, warn};

use murmur_shared::protocol::{Audience, ClientEvent, ServerEvent};

use crate::collaborators::{Relay, RoomEvents};
use crate::error::{ClientError, Result};

const ROOM_CAPACITY: usize = 256;

#[derive(Debug, Clone)]
struct Envelope {
    origin: u64,
    audience: Audience,
    event: ServerEvent,
}

#[derive(Default)]
struct Hub {
    rooms: Mutex<HashMap<String, broadcast::Sender<Envelope>>>,
    next_peer: AtomicU64,
}

/// Shared relay hub. Hand each participant its own [`RelayConnection`].
#[derive(Clone, Default)]
pub struct RoomRelay {
    hub: Arc<Hub>,
}

impl RoomRelay {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn connect(&self) -> RelayConnection {
        let peer = self.hub.next_peer.fetch_add(1, Ordering::Relaxed);
        RelayConnection {
            hub: self.hub.clone(),
            peer,
        }
    }
}

pub struct RelayConnection {
    hub: Arc<Hub>,
    peer: u64,
}

impl RelayConnection {
    fn rooms(&self) -> Result<MutexGuard<'_, HashMap<String, broadcast::Sender<Envelope>>>> {
        self.hub
            .rooms
            .lock()
            .map_err(|_| ClientError::Relay("room table lock poisoned".into()))
    }
}

#[async_trait]
impl Relay for RelayConnection {
    async fn join(&self, room: &str) -> Result<RoomEvents> {
        if room.is_empty() {
            return Err(ClientError::Relay("empty room name".into()));
        }
        let rx = self
            .rooms()?
            .entry(room.to_string())
            .or_insert_with(|| broadcast::channel(ROOM_CAPACITY).0)
            .subscribe();
        debug!(peer = self.peer, room, "Joined room");

        let me = self.peer;
        let events = stream::unfold(rx, move |mut rx| async move {
            loop {
                match rx.recv().await {
                    Ok(env) if env.audience == Audience::OthersOnly && env.origin == me => continue,
                    Ok(env) => return Some((env.event, rx)),
                    Err(broadcast::error::RecvError::Lagged(skipped)) => {
                        warn!(skipped, "Relay subscriber lagged, events dropped");
                        continue;
                    }
                    Err(broadcast::error::RecvError::Closed) => return None,
                }
            }
        });
        Ok(events.boxed())
    }

    async fn publish(&self, event: ClientEvent) -> Result<()> {
        let Some((room, event, audience)) = event.into_broadcast() else {
            return Ok(());
        };

        let tx = {
            let mut rooms = self.rooms()?;
            // Nobody has joined yet: nothing to deliver.
            let Some(tx) = rooms.get(&room) else {
                return Ok(());
            };
            if tx.receiver_count() == 0 {
                rooms.remove(&room);
                debug!(room = %room, "Dropped room with no members");
                return Ok(());
            }
            tx.clone()
        };
        let delivered = tx
            .send(Envelope {
                origin: self.peer,
                audience,
                event,
            })
            .unwrap_or(0);
        debug!(peer = self.peer, room = %room, delivered, "Published relay event");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use std::time::Duration;

    use super::*;

    fn room_count(relay: &RoomRelay) -> usize {
        relay.hub.rooms.lock().unwrap().len()
    }

    #[tokio::test]
    async fn test_typing_skips_originator() {
        let relay = RoomRelay::new();
        let alice = relay.connect();
        let bob = relay.connect();

        let mut alice_events = alice.join("room").await.unwrap();
        let mut bob_events = bob.join("room").await.unwrap();

        alice
            .publish(ClientEvent::Typing {
                room: "room".into(),
                state: true,
            })
            .await
            .unwrap();

        assert_eq!(
            bob_events.next().await,
            Some(ServerEvent::Typing { state: true })
        );
        let nothing = tokio::time::timeout(Duration::from_millis(50), alice_events.next()).await;
        assert!(nothing.is_err());
    }

    #[tokio::test]
    async fn test_empty_room_rejected() {
        let relay = RoomRelay::new();
        assert!(relay.connect().join("").await.is_err());
    }

    #[tokio::test]
    async fn test_publish_without_members_is_noop() {
        let relay = RoomRelay::new();
        relay
            .connect()
            .publish(ClientEvent::Typing {
                room: "ghost".into(),
                state: false,
            })
            .await
            .unwrap();
    }

    #[tokio::test]
    async fn test_room_dropped_once_members_leave() {
        let relay = RoomRelay::new();
        let alice = relay.connect();
        let typing = || ClientEvent::Typing {
            room: "room".into(),
            state: true,
        };

        let events = alice.join("room").await.unwrap();
        alice.publish(typing()).await.unwrap();
        assert_eq!(room_count(&relay), 1);

        drop(events);
        alice.publish(typing()).await.unwrap();
        assert_eq!(room_count(&relay), 0);

        // Rejoining recreates the room.
        let mut events = alice.join("room").await.unwrap();
        relay.connect().publish(typing()).await.unwrap();
        assert_eq!(events.next().await, Some(ServerEvent::Typing { state: true }));
    }
}
