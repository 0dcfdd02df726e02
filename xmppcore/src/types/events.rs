use crate::presence::{PresenceEntry, PresenceTable, SubscriptionKind};
use crate::roster::RosterSnapshot;
use crate::stanza::error::StanzaError;
use crate::stanza::message::ChatMessage;
use serde::Serialize;
use std::sync::{Arc, PoisonError, RwLock};
use xmppcore_node::jid::Jid;
use xmppcore_node::node::Node;

/// Shares snapshot-sized payloads between handlers without deep clones.
#[derive(Debug, Clone)]
pub struct SharedData<T>(pub Arc<T>);

impl<T> SharedData<T> {
    pub fn new(data: T) -> Self {
        Self(Arc::new(data))
    }
}

impl<T> std::ops::Deref for SharedData<T> {
    type Target = T;
    fn deref(&self) -> &Self::Target {
        &self.0
    }
}

impl<T: Serialize> Serialize for SharedData<T> {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: serde::Serializer,
    {
        self.0.serialize(serializer)
    }
}

pub trait EventHandler: Send + Sync {
    fn handle_event(&self, event: &Event);
}

#[derive(Default, Clone)]
pub struct CoreEventBus {
    handlers: Arc<RwLock<Vec<Arc<dyn EventHandler>>>>,
}

impl CoreEventBus {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add_handler(&self, handler: Arc<dyn EventHandler>) {
        self.handlers
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .push(handler);
    }

    pub fn has_handlers(&self) -> bool {
        !self
            .handlers
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .is_empty()
    }

    pub fn dispatch(&self, event: &Event) {
        // Handlers may register further handlers, so don't hold the lock
        // while calling them.
        let handlers = self
            .handlers
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .clone();
        for handler in handlers {
            handler.handle_event(event);
        }
    }
}

#[derive(Debug, Clone, Serialize)]
pub enum Event {
    Online(Online),
    Disconnected(Disconnected),
    Chat(ChatMessage),
    Presence(PresenceUpdate),
    Roster(RosterUpdate),
    Error(ErrorEvent),
    /// Every inbound unit, before it is classified.
    Stanza(SharedData<Node>),
    SubscriptionRequest(SubscriptionUpdate),
    SubscriptionChanged(SubscriptionUpdate),
}

#[derive(Debug, Clone, Serialize)]
pub struct Online;

#[derive(Debug, Clone, Serialize)]
pub struct Disconnected {
    pub will_reconnect: bool,
}

#[derive(Debug, Clone, Serialize)]
pub struct PresenceUpdate {
    /// Bare address the update is keyed under.
    pub from: Jid,
    pub entry: PresenceEntry,
    /// The whole table after this update was applied.
    pub table: SharedData<PresenceTable>,
}

#[derive(Debug, Clone, Serialize)]
pub struct RosterUpdate {
    pub roster: SharedData<RosterSnapshot>,
    /// True for a server push, false for a full fetch.
    pub pushed: bool,
}

#[derive(Debug, Clone, Serialize)]
pub struct SubscriptionUpdate {
    pub from: Jid,
    pub kind: SubscriptionKind,
}

#[derive(Debug, Clone, Serialize)]
pub enum ErrorEvent {
    Transport(String),
    /// An error bounced back for a message or presence we sent.
    Stanza {
        from: Option<Jid>,
        id: Option<String>,
        error: StanzaError,
    },
}
