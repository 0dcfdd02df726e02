use crate::ns;
use log::warn;
use serde::Serialize;
use std::collections::HashMap;
use thiserror::Error;
use xmppcore_node::jid::Jid;
use xmppcore_node::node::Node;

/// One contact on the user's roster.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct RosterEntry {
    /// Always bare.
    pub jid: Jid,
    /// `none`, `to`, `from`, `both` or `remove` (pushes only).
    pub subscription: String,
    pub name: Option<String>,
    /// `subscribe` while an outbound subscription request is pending.
    pub ask: Option<String>,
    pub groups: Vec<String>,
}

impl RosterEntry {
    pub fn new(jid: Jid, subscription: impl Into<String>) -> Self {
        Self {
            jid: jid.to_bare(),
            subscription: subscription.into(),
            name: None,
            ask: None,
            groups: Vec::new(),
        }
    }

    pub fn is_removal(&self) -> bool {
        self.subscription == "remove"
    }
}

#[derive(Debug, Error, PartialEq, Eq)]
pub enum RosterError {
    #[error("response carries no roster query")]
    MissingQuery,
    #[error("roster push from untrusted sender {0}")]
    UntrustedPush(String),
}

pub type RosterSnapshot = HashMap<Jid, RosterEntry>;

/// Parses the `<item/>` children of a `jabber:iq:roster` query. Items with a
/// missing or malformed `jid` are skipped.
pub fn parse_roster_items(query: &Node) -> Vec<RosterEntry> {
    query
        .get_children_by_tag("item")
        .filter_map(|item| {
            let mut parser = item.attrs();
            let Some(jid) = parser.optional_jid("jid") else {
                warn!(target: "Client/Roster", "Skipping roster item without a valid jid: {:?}", parser.errors);
                return None;
            };
            Some(RosterEntry {
                jid: jid.to_bare(),
                subscription: parser
                    .optional_string("subscription")
                    .unwrap_or("none")
                    .to_string(),
                name: parser.optional_string("name").map(str::to_string),
                ask: parser.optional_string("ask").map(str::to_string),
                groups: item
                    .get_children_by_tag("group")
                    .filter_map(Node::text)
                    .map(str::to_string)
                    .collect(),
            })
        })
        .collect()
}

/// Extracts the roster items from an iq carrying a roster query (a fetch
/// result or a push).
pub fn parse_roster_iq(iq: &Node) -> Result<Vec<RosterEntry>, RosterError> {
    let query = iq
        .get_child_ns("query", ns::ROSTER)
        .ok_or(RosterError::MissingQuery)?;
    Ok(parse_roster_items(query))
}

/// RFC 6121 §2.1.6: a push is only legitimate when it has no `from` or comes
/// from the user's own bare address.
pub fn check_push_sender(from: Option<&Jid>, own: &Jid) -> Result<(), RosterError> {
    match from {
        None => Ok(()),
        Some(from) if from.is_bare() && from.is_same_bare_as(own) => Ok(()),
        Some(from) => Err(RosterError::UntrustedPush(from.to_string())),
    }
}

/// The contact list, keyed by bare address.
#[derive(Debug, Clone, Default)]
pub struct RosterStore {
    entries: RosterSnapshot,
}

impl RosterStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// A full fetch is authoritative: the previous map is discarded.
    pub fn apply_result(&mut self, items: Vec<RosterEntry>) {
        self.entries = items
            .into_iter()
            .filter(|item| !item.is_removal())
            .map(|item| (item.jid.clone(), item))
            .collect();
    }

    /// A push overwrites each pushed entry wholesale, or deletes it when the
    /// subscription is `remove`. Other entries are untouched.
    pub fn apply_push(&mut self, items: Vec<RosterEntry>) {
        for item in items {
            if item.is_removal() {
                self.entries.remove(&item.jid);
            } else {
                self.entries.insert(item.jid.clone(), item);
            }
        }
    }

    pub fn get(&self, jid: &Jid) -> Option<&RosterEntry> {
        self.entries.get(&jid.to_bare())
    }

    pub fn entries(&self) -> &RosterSnapshot {
        &self.entries
    }

    pub fn snapshot(&self) -> RosterSnapshot {
        self.entries.clone()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}
