use super::traits::StanzaHandler;
use crate::client::Client;
use crate::session::DispatchContext;
use async_trait::async_trait;
use log::debug;
use xmppcore::node::node::Node;
use xmppcore::stanza::MessageStanza;
use xmppcore::types::events::{ErrorEvent, Event};

/// Handler for `<message>` stanzas: one-to-one chat and bounced errors.
#[derive(Default)]
pub(crate) struct MessageHandler;

#[async_trait]
impl StanzaHandler for MessageHandler {
    fn tag(&self) -> &'static str {
        "message"
    }

    async fn handle(&self, _client: &Client, ctx: &mut DispatchContext<'_>, node: &Node) -> bool {
        match MessageStanza::decode(node) {
            MessageStanza::Chat(message) => ctx.emit(Event::Chat(message)),
            MessageStanza::Error { from, id, error } => {
                debug!(target: "Client/Recv", "Message {id:?} bounced: {error}");
                ctx.emit(Event::Error(ErrorEvent::Stanza { from, id, error }));
            }
            MessageStanza::Ignored(reason) => {
                debug!(target: "Client/Recv", "Ignoring message: {reason}");
            }
        }
        true
    }
}
