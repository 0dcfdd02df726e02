//! Typed decode of inbound stanzas.
//!
//! Each top-level node is turned into a closed set of variants before any
//! handler sees it, so handlers match on meaning instead of poking at raw
//! children and attributes.

pub mod error;
pub mod iq;
pub mod message;

pub use error::StanzaError;
pub use iq::IqStanza;
pub use message::{ChatMessage, MessageStanza};

use xmppcore_node::node::Node;

/// Coarse classification of a protocol unit.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StanzaKind {
    Message,
    Presence,
    /// `<iq type="get|set">`
    Request,
    /// `<iq type="result|error">`
    Response,
    Unknown,
}

impl StanzaKind {
    pub fn of(node: &Node) -> Self {
        match node.tag.as_str() {
            "message" => StanzaKind::Message,
            "presence" => StanzaKind::Presence,
            "iq" => match node.get_attr("type") {
                Some("get") | Some("set") => StanzaKind::Request,
                Some("result") | Some("error") => StanzaKind::Response,
                _ => StanzaKind::Unknown,
            },
            _ => StanzaKind::Unknown,
        }
    }
}
