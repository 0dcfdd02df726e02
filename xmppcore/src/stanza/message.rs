use super::error::StanzaError;
use serde::Serialize;
use xmppcore_node::builder::NodeBuilder;
use xmppcore_node::jid::Jid;
use xmppcore_node::node::Node;

/// A one-to-one chat message.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ChatMessage {
    /// Bare address of the sender.
    pub from: Jid,
    /// Sending resource, when the server included one.
    pub resource: Option<String>,
    pub id: Option<String>,
    pub body: String,
    pub thread: Option<String>,
}

#[derive(Debug, Clone, PartialEq)]
pub enum MessageStanza {
    Chat(ChatMessage),
    Error {
        from: Option<Jid>,
        id: Option<String>,
        error: StanzaError,
    },
    /// Nothing the session layer acts on; the reason is for debug logs.
    Ignored(&'static str),
}

impl MessageStanza {
    pub fn decode(node: &Node) -> Self {
        let mut parser = node.attrs();
        let from = parser.optional_jid("from");
        let id = parser.optional_string("id").map(str::to_string);

        match parser.optional_string("type") {
            Some("chat") => {
                let Some(body) = node.child_text("body") else {
                    return MessageStanza::Ignored("chat message without body");
                };
                let Some(from) = from else {
                    return MessageStanza::Ignored("chat message without a valid sender");
                };
                MessageStanza::Chat(ChatMessage {
                    resource: from.resource.clone(),
                    from: from.to_bare(),
                    id,
                    body: body.to_string(),
                    thread: node.child_text("thread").map(str::to_string),
                })
            }
            Some("error") => {
                let error = node
                    .get_optional_child("error")
                    .map(StanzaError::from_node)
                    .unwrap_or_else(StanzaError::malformed);
                MessageStanza::Error { from, id, error }
            }
            _ => MessageStanza::Ignored("unsupported message type"),
        }
    }
}

pub fn build_chat_message(to: &Jid, body: &str, id: &str) -> Node {
    NodeBuilder::new("message")
        .attr("to", to.to_string())
        .attr("type", "chat")
        .attr("id", id)
        .children([NodeBuilder::new("body").string_content(body).build()])
        .build()
}
