#![deny(
    unsafe_code,
    missing_docs,
    dead_code,
    unused_results,
    non_snake_case,
    unreachable_pub
)]

//! Realtime delivery of engine updates to connected clients.
//!
//! The engine publishes through the [`Broadcast`] capability without knowing
//! who listens. Two implementations ship with the crate: [`ChannelHub`] fans
//! messages out over tokio broadcast channels, and [`Recorder`] keeps every
//! delivery in memory.

use std::{
    collections::HashMap,
    fmt,
    sync::{Arc, Mutex, MutexGuard, PoisonError},
};

use dungeon_core::{HeroId, SessionId, SessionStatus, Tile, Timestamp};
use serde::{Deserialize, Serialize};
use tokio::sync::broadcast;
use tracing::trace;

/// Default number of messages buffered per channel before slow subscribers lag.
pub const DEFAULT_CHANNEL_CAPACITY: usize = 64;

/// Addressable destination of a message.
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub enum Channel {
    /// Every hero watching a session.
    Session(SessionId),
    /// A single hero.
    Hero(HeroId),
}

impl fmt::Display for Channel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Session(session) => write!(f, "session-{session}"),
            Self::Hero(hero) => write!(f, "hero-{hero}"),
        }
    }
}

/// Tone of a system message.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MessageKind {
    /// Neutral information.
    Info,
    /// Something needs attention.
    Warning,
    /// A request failed.
    Error,
    /// A request succeeded.
    Success,
}

/// Human-readable notice shown to players.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct SystemMessage {
    /// Tone of the notice.
    pub kind: MessageKind,
    /// Text shown to the player.
    pub text: String,
    /// Moment the notice was produced.
    pub created_at: Timestamp,
    /// Optional structured data for clients.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub payload: Option<serde_json::Value>,
}

impl SystemMessage {
    /// Creates a notice without payload.
    #[must_use]
    pub fn new(kind: MessageKind, text: impl Into<String>, created_at: Timestamp) -> Self {
        Self {
            kind,
            text: text.into(),
            created_at,
            payload: None,
        }
    }

    /// Attaches structured data to the notice.
    #[must_use]
    pub fn with_payload(mut self, payload: serde_json::Value) -> Self {
        self.payload = Some(payload);
        self
    }
}

/// Every message the engine publishes.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "kebab-case")]
pub enum Outbound {
    /// Tiles whose occupancy changed.
    TileDelta {
        /// Updated tiles.
        tiles: Vec<Tile>,
    },
    /// A hero stepped from one tile to another.
    HeroMoved {
        /// Hero that moved.
        hero: HeroId,
        /// Tile the hero left.
        origin: Tile,
        /// Tile the hero entered.
        destination: Tile,
    },
    /// Human-readable notice.
    System(SystemMessage),
    /// Invitation awaiting the recipient's answer.
    PartyInvite {
        /// Session the recipient is invited to.
        session: SessionId,
        /// Hero sending the invitation.
        from: HeroId,
        /// Milliseconds left to answer.
        expires_in_ms: u64,
    },
    /// The recipient's party changed and should be reloaded.
    PartyRefresh {
        /// Session whose party changed.
        session: SessionId,
    },
    /// The recipient was removed from a party.
    PartyKicked {
        /// Session the recipient was removed from.
        session: SessionId,
    },
    /// The session reached a terminal status.
    SessionEnded {
        /// Session that ended.
        session: SessionId,
        /// Terminal status.
        status: SessionStatus,
    },
}

/// Capability to push messages to clients; delivery is fire-and-forget.
pub trait Broadcast {
    /// Delivers the message to everyone watching the session.
    fn publish_to_session(&self, session: &SessionId, message: Outbound);

    /// Delivers the message to a single hero.
    fn publish_to_hero(&self, hero: &HeroId, message: Outbound);

    /// Releases whatever the implementation keeps for a session that ended.
    fn close_session(&self, _session: &SessionId) {}
}

impl<T: Broadcast + ?Sized> Broadcast for Arc<T> {
    fn publish_to_session(&self, session: &SessionId, message: Outbound) {
        (**self).publish_to_session(session, message);
    }

    fn publish_to_hero(&self, hero: &HeroId, message: Outbound) {
        (**self).publish_to_hero(hero, message);
    }

    fn close_session(&self, session: &SessionId) {
        (**self).close_session(session);
    }
}

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(PoisonError::into_inner)
}

/// Broadcast implementation backed by one tokio broadcast channel per destination.
///
/// A channel lives while someone listens: publishing to a channel whose
/// receivers are all gone forgets it, and closing a session drops its
/// channel so remaining receivers observe the end of the stream.
#[derive(Debug)]
pub struct ChannelHub {
    capacity: usize,
    channels: Mutex<HashMap<Channel, broadcast::Sender<Outbound>>>,
}

impl Default for ChannelHub {
    fn default() -> Self {
        Self::new(DEFAULT_CHANNEL_CAPACITY)
    }
}

impl ChannelHub {
    /// Creates a hub buffering `capacity` messages per channel.
    #[must_use]
    pub fn new(capacity: usize) -> Self {
        Self {
            capacity: capacity.max(1),
            channels: Mutex::new(HashMap::new()),
        }
    }

    /// Starts listening on a channel, creating it on first use.
    pub fn subscribe(&self, channel: Channel) -> broadcast::Receiver<Outbound> {
        let mut channels = lock(&self.channels);
        channels
            .entry(channel)
            .or_insert_with(|| broadcast::channel(self.capacity).0)
            .subscribe()
    }

    /// Starts listening to every message published to a session.
    pub fn subscribe_session(&self, session: &SessionId) -> broadcast::Receiver<Outbound> {
        self.subscribe(Channel::Session(session.clone()))
    }

    /// Starts listening to every message addressed to a hero.
    pub fn subscribe_hero(&self, hero: &HeroId) -> broadcast::Receiver<Outbound> {
        self.subscribe(Channel::Hero(hero.clone()))
    }

    /// Number of channels currently held open.
    #[must_use]
    pub fn channel_count(&self) -> usize {
        lock(&self.channels).len()
    }

    fn publish(&self, channel: Channel, message: Outbound) {
        let mut channels = lock(&self.channels);
        let Some(sender) = channels.get(&channel) else {
            trace!(%channel, "no subscribers, message dropped");
            return;
        };
        if sender.send(message).is_err() {
            let _ = channels.remove(&channel);
            trace!(%channel, "every subscriber left, channel released");
        }
    }
}

impl Broadcast for ChannelHub {
    fn publish_to_session(&self, session: &SessionId, message: Outbound) {
        self.publish(Channel::Session(session.clone()), message);
    }

    fn publish_to_hero(&self, hero: &HeroId, message: Outbound) {
        self.publish(Channel::Hero(hero.clone()), message);
    }

    fn close_session(&self, session: &SessionId) {
        if lock(&self.channels)
            .remove(&Channel::Session(session.clone()))
            .is_some()
        {
            trace!(%session, "session channel closed");
        }
    }
}

/// Message captured by a [`Recorder`].
#[derive(Clone, Debug, PartialEq)]
pub struct Delivery {
    /// Destination of the message.
    pub channel: Channel,
    /// Published message.
    pub message: Outbound,
}

/// Broadcast implementation that keeps every delivery in publication order.
#[derive(Debug, Default)]
pub struct Recorder {
    deliveries: Mutex<Vec<Delivery>>,
}

impl Recorder {
    /// Creates an empty recorder.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Copies every delivery recorded so far.
    #[must_use]
    pub fn deliveries(&self) -> Vec<Delivery> {
        lock(&self.deliveries).clone()
    }

    /// Removes and returns every delivery recorded so far.
    pub fn take(&self) -> Vec<Delivery> {
        std::mem::take(&mut *lock(&self.deliveries))
    }

    /// Messages recorded for one channel.
    #[must_use]
    pub fn sent_to(&self, channel: &Channel) -> Vec<Outbound> {
        lock(&self.deliveries)
            .iter()
            .filter(|delivery| &delivery.channel == channel)
            .map(|delivery| delivery.message.clone())
            .collect()
    }

    fn record(&self, channel: Channel, message: Outbound) {
        lock(&self.deliveries).push(Delivery { channel, message });
    }
}

impl Broadcast for Recorder {
    fn publish_to_session(&self, session: &SessionId, message: Outbound) {
        self.record(Channel::Session(session.clone()), message);
    }

    fn publish_to_hero(&self, hero: &HeroId, message: Outbound) {
        self.record(Channel::Hero(hero.clone()), message);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn refresh(session: &str) -> Outbound {
        Outbound::PartyRefresh {
            session: SessionId::new(session),
        }
    }

    #[tokio::test]
    async fn subscribers_receive_messages_for_their_channel_only() {
        let hub = ChannelHub::default();
        let session = SessionId::new("s-1");
        let hero = HeroId::new("h-1");
        let mut session_rx = hub.subscribe_session(&session);
        let mut hero_rx = hub.subscribe_hero(&hero);

        hub.publish_to_session(&session, refresh("s-1"));

        assert_eq!(session_rx.recv().await.expect("delivered"), refresh("s-1"));
        assert!(matches!(
            hero_rx.try_recv(),
            Err(broadcast::error::TryRecvError::Empty)
        ));
    }

    #[test]
    fn publishing_without_subscribers_is_dropped() {
        let hub = ChannelHub::default();
        hub.publish_to_hero(&HeroId::new("nobody"), refresh("s"));

        let mut late = hub.subscribe_hero(&HeroId::new("nobody"));
        assert!(matches!(
            late.try_recv(),
            Err(broadcast::error::TryRecvError::Empty)
        ));
    }

    #[test]
    fn abandoned_channels_are_released() {
        let hub = ChannelHub::default();
        let hero = HeroId::new("h");
        let listener = hub.subscribe_hero(&hero);
        let _session_rx = hub.subscribe_session(&SessionId::new("s"));
        assert_eq!(hub.channel_count(), 2);

        drop(listener);
        hub.publish_to_hero(&hero, refresh("s"));

        assert_eq!(hub.channel_count(), 1);
    }

    #[tokio::test]
    async fn closing_a_session_ends_its_stream() {
        let hub = ChannelHub::default();
        let session = SessionId::new("s");
        let mut listener = hub.subscribe_session(&session);
        hub.publish_to_session(&session, refresh("s"));

        hub.close_session(&session);

        assert_eq!(hub.channel_count(), 0);
        assert_eq!(listener.recv().await.expect("buffered"), refresh("s"));
        assert!(matches!(
            listener.recv().await,
            Err(broadcast::error::RecvError::Closed)
        ));
    }

    #[test]
    fn recorder_keeps_publication_order() {
        let recorder = Recorder::new();
        let hero = HeroId::new("h");
        recorder.publish_to_hero(&hero, refresh("a"));
        recorder.publish_to_session(&SessionId::new("a"), refresh("a"));
        recorder.publish_to_hero(&hero, refresh("b"));

        assert_eq!(
            recorder.sent_to(&Channel::Hero(hero)),
            vec![refresh("a"), refresh("b")]
        );
        assert_eq!(recorder.take().len(), 3);
        assert!(recorder.deliveries().is_empty());
    }

    #[test]
    fn messages_serialize_with_a_type_tag() {
        let message = Outbound::System(SystemMessage::new(
            MessageKind::Error,
            "Tile is busy. You cannot move in this direction.",
            Timestamp::from_millis(7),
        ));
        let encoded = serde_json::to_value(&message).expect("serialize");

        assert_eq!(encoded["type"], "system");
        assert_eq!(encoded["kind"], "error");
        assert_eq!(encoded["created_at"], 7);
        assert!(encoded.get("payload").is_none());
    }
}
