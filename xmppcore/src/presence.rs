//! Presence decode, the per-contact presence table and one-shot probes.

use crate::ns;
use crate::stanza::error::StanzaError;
use chrono::{DateTime, Utc};
use log::debug;
use serde::Serialize;
use std::collections::{HashMap, HashSet};
use std::fmt;
use thiserror::Error;
use xmppcore_node::builder::NodeBuilder;
use xmppcore_node::jid::Jid;
use xmppcore_node::node::Node;

/// `<show/>` values a client may publish (RFC 6121 §4.7.2.1).
pub const SHOW_VALUES: [&str; 4] = ["away", "chat", "dnd", "xa"];

#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum PresenceState {
    Available,
    Unavailable,
    /// Any `<show/>` value other than `chat`, which counts as available.
    Show(String),
}

impl PresenceState {
    pub fn derive(unavailable: bool, show: Option<&str>) -> Self {
        if unavailable {
            return PresenceState::Unavailable;
        }
        match show {
            None | Some("chat") => PresenceState::Available,
            Some(show) => PresenceState::Show(show.to_string()),
        }
    }

    pub fn is_available(&self) -> bool {
        !matches!(self, PresenceState::Unavailable)
    }
}

impl fmt::Display for PresenceState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PresenceState::Available => f.write_str("online"),
            PresenceState::Unavailable => f.write_str("offline"),
            PresenceState::Show(show) => f.write_str(show),
        }
    }
}

/// XEP-0115 entity capabilities advertised in a presence.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct EntityCaps {
    pub node: String,
    pub hash: Option<String>,
    pub ver: String,
}

/// Last-known presence of a contact. Replaced wholesale on every update.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PresenceEntry {
    pub state: PresenceState,
    pub status: Option<String>,
    pub priority: i8,
    pub caps: Option<EntityCaps>,
    /// XEP-0153 avatar hash. `Some("")` means the contact has no avatar.
    pub vcard_hash: Option<String>,
    /// Resource the update came from.
    pub resource: Option<String>,
    pub received_at: DateTime<Utc>,
}

impl PresenceEntry {
    pub fn new(state: PresenceState) -> Self {
        Self {
            state,
            status: None,
            priority: 0,
            caps: None,
            vcard_hash: None,
            resource: None,
            received_at: Utc::now(),
        }
    }
}

pub type PresenceTable = HashMap<Jid, PresenceEntry>;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum SubscriptionKind {
    Subscribe,
    Subscribed,
    Unsubscribe,
    Unsubscribed,
}

impl SubscriptionKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            SubscriptionKind::Subscribe => "subscribe",
            SubscriptionKind::Subscribed => "subscribed",
            SubscriptionKind::Unsubscribe => "unsubscribe",
            SubscriptionKind::Unsubscribed => "unsubscribed",
        }
    }

    fn parse(s: &str) -> Option<Self> {
        match s {
            "subscribe" => Some(SubscriptionKind::Subscribe),
            "subscribed" => Some(SubscriptionKind::Subscribed),
            "unsubscribe" => Some(SubscriptionKind::Unsubscribe),
            "unsubscribed" => Some(SubscriptionKind::Unsubscribed),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum PresenceStanza {
    Update { from: Jid, entry: PresenceEntry },
    Subscription { from: Jid, kind: SubscriptionKind },
    /// The server probing us; it answers on our behalf.
    Probe,
    Error { from: Option<Jid>, error: StanzaError },
    Malformed(&'static str),
}

impl PresenceStanza {
    pub fn decode(node: &Node) -> Self {
        let mut parser = node.attrs();
        let from = parser.optional_jid("from");
        let presence_type = parser.optional_string("type");

        match presence_type {
            Some("probe") => return PresenceStanza::Probe,
            Some("error") => {
                let error = node
                    .get_optional_child("error")
                    .map(StanzaError::from_node)
                    .unwrap_or_else(StanzaError::malformed);
                return PresenceStanza::Error { from, error };
            }
            _ => {}
        }

        let Some(from) = from else {
            return PresenceStanza::Malformed("presence without a valid sender");
        };

        if let Some(kind) = presence_type.and_then(SubscriptionKind::parse) {
            return PresenceStanza::Subscription {
                from: from.to_bare(),
                kind,
            };
        }

        let unavailable = match presence_type {
            None => false,
            Some("unavailable") => true,
            Some(_) => return PresenceStanza::Malformed("unknown presence type"),
        };

        let mut entry = PresenceEntry::new(PresenceState::derive(
            unavailable,
            node.child_text("show"),
        ));
        entry.status = node.child_text("status").map(str::to_string);
        entry.priority = node
            .child_text("priority")
            .and_then(|p| p.trim().parse().ok())
            .unwrap_or(0);
        entry.resource = from.resource.clone();

        for child in node.children().unwrap_or_default() {
            match (child.tag.as_str(), child.namespace()) {
                ("show" | "status" | "priority", _) => {}
                ("c", Some(ns::CAPS)) => entry.caps = parse_caps(child),
                ("x", Some(ns::VCARD_UPDATE)) => {
                    entry.vcard_hash = child
                        .get_optional_child("photo")
                        .map(|photo| photo.text().unwrap_or_default().to_string());
                }
                (tag, namespace) => {
                    debug!(target: "Client/Presence", "Ignoring presence extension <{tag}> ({namespace:?}) from {from}");
                }
            }
        }

        PresenceStanza::Update {
            from: from.to_bare(),
            entry,
        }
    }
}

fn parse_caps(node: &Node) -> Option<EntityCaps> {
    let mut attrs = node.attrs();
    Some(EntityCaps {
        node: attrs.optional_string("node")?.to_string(),
        hash: attrs.optional_string("hash").map(str::to_string),
        ver: attrs.optional_string("ver")?.to_string(),
    })
}

#[derive(Debug, Error, PartialEq, Eq)]
pub enum PresenceError {
    #[error("invalid show value '{0}'; expected one of away, chat, dnd, xa")]
    InvalidShow(String),
}

/// Where an update went after it was written into the table.
#[derive(Debug, Clone, PartialEq)]
pub enum PresenceOutcome {
    /// A pending probe claimed the update. No general event is raised.
    ProbeResolved { from: Jid, entry: PresenceEntry },
    Broadcast { from: Jid, entry: PresenceEntry },
}

#[derive(Debug, Default)]
pub struct PresenceTracker {
    table: PresenceTable,
    probes: HashSet<Jid>,
}

impl PresenceTracker {
    pub fn new() -> Self {
        Self::default()
    }

    /// Stores `entry` for `from` and decides who gets to see it.
    pub fn apply(&mut self, from: Jid, entry: PresenceEntry) -> PresenceOutcome {
        let from = from.to_bare();
        self.table.insert(from.clone(), entry.clone());
        if self.probes.remove(&from) {
            PresenceOutcome::ProbeResolved { from, entry }
        } else {
            PresenceOutcome::Broadcast { from, entry }
        }
    }

    /// Marks `jid` as awaiting a probe answer. Returns false if a probe was
    /// already outstanding.
    pub fn register_probe(&mut self, jid: &Jid) -> bool {
        self.probes.insert(jid.to_bare())
    }

    /// Withdraws an outstanding probe so the next update is broadcast again.
    /// Returns false if none was outstanding.
    pub fn cancel_probe(&mut self, jid: &Jid) -> bool {
        self.probes.remove(&jid.to_bare())
    }

    pub fn is_probing(&self, jid: &Jid) -> bool {
        self.probes.contains(&jid.to_bare())
    }

    pub fn get(&self, jid: &Jid) -> Option<&PresenceEntry> {
        self.table.get(&jid.to_bare())
    }

    pub fn table(&self) -> &PresenceTable {
        &self.table
    }

    pub fn snapshot(&self) -> PresenceTable {
        self.table.clone()
    }
}

/// `<presence/>` announcing availability, optionally with show and status.
pub fn build_presence(show: Option<&str>, status: Option<&str>) -> Result<Node, PresenceError> {
    let mut children = Vec::new();
    if let Some(show) = show {
        if !SHOW_VALUES.contains(&show) {
            return Err(PresenceError::InvalidShow(show.to_string()));
        }
        children.push(NodeBuilder::new("show").string_content(show).build());
    }
    if let Some(status) = status {
        children.push(NodeBuilder::new("status").string_content(status).build());
    }

    let builder = NodeBuilder::new("presence");
    Ok(if children.is_empty() {
        builder.build()
    } else {
        builder.children(children).build()
    })
}

pub fn build_initial_presence() -> Node {
    NodeBuilder::new("presence").build()
}

pub fn build_probe(to: &Jid) -> Node {
    NodeBuilder::new("presence")
        .attr("type", "probe")
        .attr("to", to.to_bare().to_string())
        .build()
}

pub fn build_subscription(to: &Jid, kind: SubscriptionKind) -> Node {
    NodeBuilder::new("presence")
        .attr("type", kind.as_str())
        .attr("to", to.to_bare().to_string())
        .build()
}
