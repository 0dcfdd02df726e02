use crate::client::Client;
use log::debug;
use xmppcore::node::jid::Jid;
use xmppcore::node::node::Node;
use xmppcore::stanza::message::build_chat_message;

impl Client {
    /// Writes a unit now if online, otherwise queues it for the next
    /// connection. Never waits for a reply.
    pub async fn send_node(&self, node: Node) {
        self.session.lock().await.enqueue_or_send(node).await;
    }

    /// Sends a one-to-one chat message and returns its id, which a bounced
    /// [`ErrorEvent::Stanza`](xmppcore::types::events::ErrorEvent::Stanza)
    /// will carry.
    pub async fn send_message(&self, to: &Jid, body: &str) -> String {
        let id = self.generate_request_id();
        debug!(target: "Client/Send", "Sending chat {id} to {to}");
        self.send_node(build_chat_message(to, body, &id)).await;
        id
    }
}
