//! Transport-agnostic session logic: stanza classification, presence and
//! roster state, the outbound queue, request correlation and the session
//! state machine. Nothing in this crate performs I/O.

pub use xmppcore_node as node;

pub mod iq;
pub mod ns;
pub mod outbound;
pub mod presence;
pub mod request;
pub mod roster;
pub mod session;
pub mod stanza;
pub mod types;
pub mod xml;
