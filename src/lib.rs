//! An XMPP session layer: typed events in, queued and correlated stanzas out.
//!
//! The transport (socket, TLS, SASL, XML framing) is plugged in through
//! [`transport::TransportFactory`]; everything above it lives here and in
//! [`xmppcore`].

pub use xmppcore::node;
pub use xmppcore::node::jid::Jid;

pub use xmppcore::types;

pub mod client;
pub mod config;
pub mod error;
pub mod features;
pub(crate) mod handlers;
pub mod keepalive;
pub mod request;
pub mod send;
pub(crate) mod session;
pub mod transport;

pub use client::Client;
pub use config::ClientConfig;
pub use error::ClientError;
pub use session::{ProbeCallback, ResponseCallback, RosterCallback};
pub use xmppcore::iq::IqSpec;
pub use xmppcore::iq::disco::Capabilities;
pub use xmppcore::presence::{PresenceEntry, PresenceState, PresenceTable};
pub use xmppcore::roster::{RosterEntry, RosterSnapshot};
pub use xmppcore::session::SessionState;
