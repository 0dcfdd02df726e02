//! Namespaces the session layer understands.

pub const CLIENT: &str = "jabber:client";
pub const ROSTER: &str = "jabber:iq:roster";
pub const DISCO_INFO: &str = "http://jabber.org/protocol/disco#info";
pub const CAPS: &str = "http://jabber.org/protocol/caps";
pub const VCARD_UPDATE: &str = "vcard-temp:x:update";
pub const PING: &str = "urn:xmpp:ping";
pub const STANZAS: &str = "urn:ietf:params:xml:ns:xmpp-stanzas";
pub const DELAY: &str = "urn:xmpp:delay";
